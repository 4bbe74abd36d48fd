//! Parallel bus framing (indirect address mode)
//!
//! The address selector goes to IDM_AR0/IDM_AR1/IDM_BSR with the bus
//! address incrementing, then data moves through IDM_DR at a fixed address.

use core::ptr::{read_volatile, write_volatile};

use super::{Hooks, Interface, IoMode};
use crate::regs::{IDM_AR0, IDM_DR};

/// Host bus access at absolute bus addresses
pub trait BusPort {
    fn read_data(&mut self, addr: usize) -> u8;

    fn write_data(&mut self, addr: usize, value: u8);

    fn read_data_buf(&mut self, addr: usize, buf: &mut [u8], inc: bool) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_data(if inc { addr + i } else { addr });
        }
    }

    fn write_data_buf(&mut self, addr: usize, buf: &[u8], inc: bool) {
        for (i, &b) in buf.iter().enumerate() {
            self.write_data(if inc { addr + i } else { addr }, b);
        }
    }
}

// =============================================================================
// CALLBACK PORT
// =============================================================================

fn default_read_data(_: usize) -> u8 {
    0
}

fn default_write_data(_: usize, _: u8) {}

/// Bus port backed by plain function pointers
#[derive(Debug, Clone, Copy)]
pub struct BusCallbacks {
    read_data: fn(usize) -> u8,
    write_data: fn(usize, u8),
    read_buf: Option<fn(usize, &mut [u8], bool)>,
    write_buf: Option<fn(usize, &[u8], bool)>,
}

impl Default for BusCallbacks {
    fn default() -> Self {
        Self {
            read_data: default_read_data,
            write_data: default_write_data,
            read_buf: None,
            write_buf: None,
        }
    }
}

impl BusCallbacks {
    pub fn register(
        &mut self,
        read_data: Option<fn(usize) -> u8>,
        write_data: Option<fn(usize, u8)>,
        read_buf: Option<fn(usize, &mut [u8], bool)>,
        write_buf: Option<fn(usize, &[u8], bool)>,
    ) {
        self.read_data = read_data.unwrap_or(default_read_data);
        self.write_data = write_data.unwrap_or(default_write_data);
        self.read_buf = read_buf;
        self.write_buf = write_buf;
    }
}

impl BusPort for BusCallbacks {
    fn read_data(&mut self, addr: usize) -> u8 {
        (self.read_data)(addr)
    }

    fn write_data(&mut self, addr: usize, value: u8) {
        (self.write_data)(addr, value)
    }

    fn read_data_buf(&mut self, addr: usize, buf: &mut [u8], inc: bool) {
        match self.read_buf {
            Some(f) => f(addr, buf, inc),
            None => {
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = (self.read_data)(if inc { addr + i } else { addr });
                }
            }
        }
    }

    fn write_data_buf(&mut self, addr: usize, buf: &[u8], inc: bool) {
        match self.write_buf {
            Some(f) => f(addr, buf, inc),
            None => {
                for (i, &b) in buf.iter().enumerate() {
                    (self.write_data)(if inc { addr + i } else { addr }, b);
                }
            }
        }
    }
}

// =============================================================================
// MMIO PORT
// =============================================================================

/// Memory-mapped bus: every address is dereferenced as a volatile byte
pub struct MmioBus {
    _private: (),
}

impl MmioBus {
    /// # Safety
    /// Every address later handed to this port must be a valid, mapped
    /// device byte for the lifetime of the port.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl BusPort for MmioBus {
    fn read_data(&mut self, addr: usize) -> u8 {
        unsafe { read_volatile(addr as *const u8) }
    }

    fn write_data(&mut self, addr: usize, value: u8) {
        unsafe { write_volatile(addr as *mut u8, value) }
    }
}

// =============================================================================
// INDIRECT FRAMING
// =============================================================================

/// Chip access over a parallel bus in indirect mode
pub struct IndirectBus<B> {
    bus: B,
    hooks: Hooks,
    base: usize,
}

impl<B: BusPort> IndirectBus<B> {
    /// `base` is the bus address the chip's IDM window is decoded at
    pub fn new(bus: B, hooks: Hooks, base: usize) -> Self {
        Self { bus, hooks, base }
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn release(self) -> (B, Hooks) {
        (self.bus, self.hooks)
    }

    fn ar0(&self) -> usize {
        self.base + IDM_AR0 as usize
    }

    fn dr(&self) -> usize {
        self.base + IDM_DR as usize
    }
}

#[inline]
fn selector(addr: u32) -> [u8; 3] {
    [(addr >> 16) as u8, (addr >> 8) as u8, addr as u8]
}

impl<B: BusPort> Interface for IndirectBus<B> {
    fn read(&mut self, addr: u32) -> u8 {
        let (ar0, dr) = (self.ar0(), self.dr());
        let bus = &mut self.bus;
        self.hooks.transaction(|| {
            bus.write_data_buf(ar0, &selector(addr), true);
            bus.read_data(dr)
        })
    }

    fn write(&mut self, addr: u32, value: u8) {
        let [a0, a1, a2] = selector(addr);
        let ar0 = self.ar0();
        let bus = &mut self.bus;
        // AR0, AR1, BSR and DR are consecutive
        self.hooks
            .transaction(|| bus.write_data_buf(ar0, &[a0, a1, a2, value], true))
    }

    fn read_buf(&mut self, addr: u32, buf: &mut [u8]) {
        let (ar0, dr) = (self.ar0(), self.dr());
        let bus = &mut self.bus;
        self.hooks.transaction(|| {
            bus.write_data_buf(ar0, &selector(addr), true);
            bus.read_data_buf(dr, buf, false);
        })
    }

    fn write_buf(&mut self, addr: u32, buf: &[u8]) {
        let (ar0, dr) = (self.ar0(), self.dr());
        let bus = &mut self.bus;
        self.hooks.transaction(|| {
            bus.write_data_buf(ar0, &selector(addr), true);
            bus.write_data_buf(dr, buf, false);
        })
    }

    fn mode(&self) -> IoMode {
        IoMode::BusIndirect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::hooks::tests::{enter, exit, take_events};
    use crate::regs;
    use std::vec::Vec;

    #[derive(Default)]
    struct RecordingBus {
        writes: Vec<(usize, u8)>,
        reads: Vec<usize>,
    }

    impl BusPort for RecordingBus {
        fn read_data(&mut self, addr: usize) -> u8 {
            self.reads.push(addr);
            0x33
        }

        fn write_data(&mut self, addr: usize, value: u8) {
            self.writes.push((addr, value));
        }
    }

    const BASE: usize = 0x6000_0000;

    #[test]
    fn test_single_write_uses_four_consecutive_addresses() {
        let mut ib = IndirectBus::new(RecordingBus::default(), Hooks::new(), BASE);
        ib.write(regs::sock(0, regs::SN_CR), 0x01);
        let (bus, _) = ib.release();
        assert_eq!(
            bus.writes,
            [(BASE, 0x00), (BASE + 1, 0x10), (BASE + 2, 0x08), (BASE + 3, 0x01)]
        );
    }

    #[test]
    fn test_buffer_read_stays_on_data_register() {
        take_events();
        let hooks = Hooks::new().with_critical_section(Some(enter), Some(exit));
        let mut ib = IndirectBus::new(RecordingBus::default(), hooks, BASE);
        let mut buf = [0u8; 3];
        ib.read_buf(regs::rxbuf(1, 0x0200), &mut buf);
        assert_eq!(buf, [0x33; 3]);
        assert_eq!(take_events(), ["enter", "exit"]);
        assert_eq!(ib.mode(), IoMode::BusIndirect);

        let (bus, _) = ib.release();
        assert_eq!(bus.reads, [BASE + 3; 3]);
        assert_eq!(bus.writes.len(), 3);
    }

    #[test]
    fn test_mmio_port_against_local_window() {
        let mut window = [0u8; 4];
        let base = window.as_mut_ptr() as usize;
        let mut ib = IndirectBus::new(unsafe { MmioBus::new() }, Hooks::new(), base);
        ib.write(regs::common(regs::SIPR), 0xAB);
        assert_eq!(window, [0x41, 0x38, 0x00, 0xAB]);
        assert_eq!(ib.read(regs::common(regs::SIPR)), 0xAB);
    }

    #[test]
    fn test_callback_port_defaults() {
        let mut cb = BusCallbacks::default();
        assert_eq!(cb.read_data(0x10), 0);
        let mut buf = [1u8; 2];
        cb.read_data_buf(0, &mut buf, true);
        assert_eq!(buf, [0, 0]);
        fn fixed(_: usize) -> u8 {
            0x42
        }
        cb.register(Some(fixed), None, None, None);
        assert_eq!(cb.read_data(0), 0x42);
    }
}
