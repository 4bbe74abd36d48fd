//! SPI framing (variable data length mode)
//!
//! A frame is a three byte address phase followed by the data phase:
//! `addr[23:16]`, `addr[15:8]`, then `addr[7:0] | RW | OP`. Chip select stays
//! asserted for the whole frame, inside the critical section.

use embedded_hal::spi::SpiBus;

use super::{Hooks, Interface, IoMode};

const SPI_READ: u8 = 0x00;
const SPI_WRITE: u8 = 0x01 << 2;
const SPI_VDM_OP: u8 = 0x00;

/// Byte-level SPI link. Chip select is driven by [`Hooks`].
pub trait SpiPort {
    fn read_byte(&mut self) -> u8;

    fn write_byte(&mut self, byte: u8);

    fn read_buf(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.read_byte();
        }
    }

    fn write_buf(&mut self, buf: &[u8]) {
        for &b in buf {
            self.write_byte(b);
        }
    }

    /// Wait until every queued byte is on the wire
    fn flush(&mut self) {}
}

// =============================================================================
// CALLBACK PORT
// =============================================================================

fn default_read_byte() -> u8 {
    0
}

fn default_write_byte(_: u8) {}

/// SPI port backed by plain function pointers.
///
/// Buffer slots left unregistered fall back to looping over the byte slots.
#[derive(Debug, Clone, Copy)]
pub struct SpiCallbacks {
    read_byte: fn() -> u8,
    write_byte: fn(u8),
    read_buf: Option<fn(&mut [u8])>,
    write_buf: Option<fn(&[u8])>,
}

impl Default for SpiCallbacks {
    fn default() -> Self {
        Self {
            read_byte: default_read_byte,
            write_byte: default_write_byte,
            read_buf: None,
            write_buf: None,
        }
    }
}

impl SpiCallbacks {
    pub fn register(
        &mut self,
        read_byte: Option<fn() -> u8>,
        write_byte: Option<fn(u8)>,
        read_buf: Option<fn(&mut [u8])>,
        write_buf: Option<fn(&[u8])>,
    ) {
        self.read_byte = read_byte.unwrap_or(default_read_byte);
        self.write_byte = write_byte.unwrap_or(default_write_byte);
        self.read_buf = read_buf;
        self.write_buf = write_buf;
    }
}

impl SpiPort for SpiCallbacks {
    fn read_byte(&mut self) -> u8 {
        (self.read_byte)()
    }

    fn write_byte(&mut self, byte: u8) {
        (self.write_byte)(byte)
    }

    fn read_buf(&mut self, buf: &mut [u8]) {
        match self.read_buf {
            Some(f) => f(buf),
            None => {
                for b in buf.iter_mut() {
                    *b = (self.read_byte)();
                }
            }
        }
    }

    fn write_buf(&mut self, buf: &[u8]) {
        match self.write_buf {
            Some(f) => f(buf),
            None => buf.iter().for_each(|&b| (self.write_byte)(b)),
        }
    }
}

// =============================================================================
// EMBEDDED-HAL PORT
// =============================================================================

/// SPI port over an `embedded-hal` bus (chip select handled by [`Hooks`]).
///
/// Transfers are infallible at the chip level, so bus errors are logged and
/// counted; check [`HalSpi::faults`] after a suspicious result.
pub struct HalSpi<B> {
    bus: B,
    faults: u32,
}

impl<B: SpiBus> HalSpi<B> {
    pub fn new(bus: B) -> Self {
        Self { bus, faults: 0 }
    }

    /// Number of failed bus transfers so far
    pub fn faults(&self) -> u32 {
        self.faults
    }

    pub fn release(self) -> B {
        self.bus
    }

    fn check(&mut self, result: Result<(), B::Error>) {
        if let Err(e) = result {
            self.faults = self.faults.wrapping_add(1);
            log::error!(target: "w6100::spi", "transfer failed: {:?}", e);
        }
    }
}

impl<B: SpiBus> SpiPort for HalSpi<B> {
    fn read_byte(&mut self) -> u8 {
        let mut b = [0u8];
        let r = self.bus.read(&mut b);
        self.check(r);
        b[0]
    }

    fn write_byte(&mut self, byte: u8) {
        let r = self.bus.write(&[byte]);
        self.check(r);
    }

    fn read_buf(&mut self, buf: &mut [u8]) {
        let r = self.bus.read(buf);
        self.check(r);
    }

    fn write_buf(&mut self, buf: &[u8]) {
        let r = self.bus.write(buf);
        self.check(r);
    }

    fn flush(&mut self) {
        let r = self.bus.flush();
        self.check(r);
    }
}

// =============================================================================
// VDM FRAMING
// =============================================================================

/// Chip access over SPI in variable data length mode
pub struct SpiVdm<P> {
    port: P,
    hooks: Hooks,
}

impl<P: SpiPort> SpiVdm<P> {
    pub fn new(port: P, hooks: Hooks) -> Self {
        Self { port, hooks }
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn release(self) -> (P, Hooks) {
        (self.port, self.hooks)
    }
}

#[inline]
fn address_phase(addr: u32, rw: u8) -> [u8; 3] {
    [
        (addr >> 16) as u8,
        (addr >> 8) as u8,
        (addr as u8) | rw | SPI_VDM_OP,
    ]
}

impl<P: SpiPort> Interface for SpiVdm<P> {
    fn read(&mut self, addr: u32) -> u8 {
        let port = &mut self.port;
        self.hooks.transaction(|| {
            port.write_buf(&address_phase(addr, SPI_READ));
            let v = port.read_byte();
            port.flush();
            v
        })
    }

    fn write(&mut self, addr: u32, value: u8) {
        let [a0, a1, a2] = address_phase(addr, SPI_WRITE);
        let port = &mut self.port;
        self.hooks.transaction(|| {
            port.write_buf(&[a0, a1, a2, value]);
            port.flush();
        })
    }

    fn read_buf(&mut self, addr: u32, buf: &mut [u8]) {
        let port = &mut self.port;
        self.hooks.transaction(|| {
            port.write_buf(&address_phase(addr, SPI_READ));
            port.read_buf(buf);
            port.flush();
        })
    }

    fn write_buf(&mut self, addr: u32, buf: &[u8]) {
        let port = &mut self.port;
        self.hooks.transaction(|| {
            port.write_buf(&address_phase(addr, SPI_WRITE));
            port.write_buf(buf);
            port.flush();
        })
    }

    fn mode(&self) -> IoMode {
        IoMode::SpiVdm
    }
}
