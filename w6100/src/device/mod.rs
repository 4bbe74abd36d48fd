//! Register access layer
//!
//! The driver core talks to the chip through [`Interface`]: single-byte and
//! auto-incrementing buffer transfers at a 24-bit address selector (see
//! [`crate::regs`]). Two framings are provided:
//! - [`SpiVdm`]: SPI variable-data-length mode over any [`SpiPort`]
//! - [`IndirectBus`]: parallel bus through the indirect address window

pub mod bus;
pub mod hooks;
pub mod spi;

pub use bus::{BusCallbacks, BusPort, IndirectBus, MmioBus};
pub use hooks::Hooks;
pub use spi::{HalSpi, SpiCallbacks, SpiPort, SpiVdm};

/// How the host is wired to the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// SPI, variable data length
    SpiVdm,
    /// Parallel bus, indirect address mode
    BusIndirect,
    /// Anything else (simulators, bridges)
    Other,
}

/// Register access collaborator.
///
/// Each call is one complete, atomic chip transaction.
pub trait Interface {
    /// Read one byte
    fn read(&mut self, addr: u32) -> u8;

    /// Write one byte
    fn write(&mut self, addr: u32, value: u8);

    /// Read `buf.len()` bytes starting at `addr`, offset auto-incrementing
    fn read_buf(&mut self, addr: u32, buf: &mut [u8]);

    /// Write `buf` starting at `addr`, offset auto-incrementing
    fn write_buf(&mut self, addr: u32, buf: &[u8]);

    fn mode(&self) -> IoMode {
        IoMode::Other
    }
}

impl<T: Interface + ?Sized> Interface for &mut T {
    fn read(&mut self, addr: u32) -> u8 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u32, value: u8) {
        (**self).write(addr, value)
    }

    fn read_buf(&mut self, addr: u32, buf: &mut [u8]) {
        (**self).read_buf(addr, buf)
    }

    fn write_buf(&mut self, addr: u32, buf: &[u8]) {
        (**self).write_buf(addr, buf)
    }

    fn mode(&self) -> IoMode {
        (**self).mode()
    }
}
