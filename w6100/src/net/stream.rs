//! Byte-stream view of a connected TCP socket
//!
//! Lets `embedded-io` consumers (TLS, HTTP clients, line readers) run on top
//! of a hardware socket without knowing about the chip.

use embedded_io::{ErrorType, Read, Write};

use crate::chip::{check_sn, W6100};
use crate::device::Interface;
use crate::error::SockError;
use crate::regs::SocketStatus;

/// Borrowed TCP socket implementing `embedded_io::{Read, Write}`
pub struct TcpStream<'a, I> {
    chip: &'a mut W6100<I>,
    sn: u8,
}

impl<'a, I: Interface> TcpStream<'a, I> {
    /// Wrap socket `sn`. The socket should already be connected (or
    /// accepted through `listen`).
    pub fn new(chip: &'a mut W6100<I>, sn: u8) -> Result<Self, SockError> {
        check_sn(sn)?;
        chip.check_tcp(sn)?;
        Ok(Self { chip, sn })
    }

    pub fn socket(&self) -> u8 {
        self.sn
    }

    /// Gracefully close the connection
    pub fn close(self) -> Result<(), SockError> {
        self.chip.disconnect(self.sn)
    }
}

impl<I: Interface> ErrorType for TcpStream<'_, I> {
    type Error = SockError;
}

impl<I: Interface> Read for TcpStream<'_, I> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        // peer sent FIN and everything it sent has been read
        if self.chip.sn_status(self.sn) == SocketStatus::CloseWait && self.chip.rx_received(self.sn) == 0 {
            return Ok(0);
        }
        self.chip.recv(self.sn, buf)
    }
}

impl<I: Interface> Write for TcpStream<'_, I> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.chip.send(self.sn, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
