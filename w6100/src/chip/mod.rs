//! Driver context
//!
//! [`W6100`] owns the register interface and all state the chip does not
//! keep itself: per-socket shadow state, the ephemeral port counter, DNS and
//! IP-configuration mode, and the idle hook called between register polls.
//! Socket operations live in [`crate::net`]; chip-wide control in the
//! submodules here.

use smoltcp::wire::{Ipv4Address, Ipv6Address};

use crate::config::EPHEMERAL_PORT_START;
use crate::device::{Interface, IoMode};
use crate::error::SockError;
use crate::regs::{self, Command, IpMode, PackInfo, SockInt, SocketStatus, SOCK_NUM};

pub mod control;
pub mod network;
pub mod phy;
pub mod service;

/// Chip identification string
pub const CHIP_ID: &str = "W6100";

/// Chip-wide lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipState {
    /// `init` has not completed yet
    Uninitialized,
    /// Buffers allocated; the chip may be reset again at any time
    Configured,
}

/// Driver-owned per-socket state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Shadow {
    /// Calls return `Busy` instead of spinning
    pub nonblock: bool,
    /// A TCP SEND was issued and its SENDOK not consumed yet
    pub sending: bool,
    /// Bytes of the current datagram not yet handed to the caller
    pub remained: u16,
    pub pack_info: PackInfo,
}

fn spin() {
    core::hint::spin_loop();
}

/// One W6100 chip
pub struct W6100<I> {
    pub(crate) io: I,
    idle: fn(),
    pub(crate) shadow: [Shadow; SOCK_NUM],
    pub(crate) any_port: u16,
    pub(crate) dns: Ipv4Address,
    pub(crate) dns6: Ipv6Address,
    pub(crate) ip_mode: IpMode,
    pub(crate) state: ChipState,
}

/// Reject socket numbers the chip does not have
#[inline]
pub(crate) fn check_sn(sn: u8) -> Result<usize, SockError> {
    if (sn as usize) < SOCK_NUM {
        Ok(sn as usize)
    } else {
        Err(SockError::SockNum)
    }
}

impl<I: Interface> W6100<I> {
    pub fn new(io: I) -> Self {
        Self {
            io,
            idle: spin,
            shadow: [Shadow::default(); SOCK_NUM],
            any_port: EPHEMERAL_PORT_START,
            dns: Ipv4Address::UNSPECIFIED,
            dns6: Ipv6Address::UNSPECIFIED,
            ip_mode: IpMode::empty(),
            state: ChipState::Uninitialized,
        }
    }

    /// Install the hook called between polls of a busy register.
    /// `None` restores the default spin hint.
    pub fn register_idle(&mut self, idle: Option<fn()>) {
        self.idle = idle.unwrap_or(spin);
    }

    pub fn with_idle(mut self, idle: Option<fn()>) -> Self {
        self.register_idle(idle);
        self
    }

    pub fn state(&self) -> ChipState {
        self.state
    }

    pub fn io_mode(&self) -> IoMode {
        self.io.mode()
    }

    pub fn interface(&self) -> &I {
        &self.io
    }

    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.io
    }

    pub fn release(self) -> I {
        self.io
    }

    /// Shadow state of socket `sn`
    pub fn shadow(&self, sn: u8) -> Result<Shadow, SockError> {
        Ok(self.shadow[check_sn(sn)?])
    }

    #[inline]
    pub(crate) fn idle(&self) {
        (self.idle)()
    }

    // =========================================================================
    // RAW REGISTER ACCESS
    // =========================================================================

    pub(crate) fn read_reg(&mut self, addr: u32) -> u8 {
        self.io.read(addr)
    }

    pub(crate) fn write_reg(&mut self, addr: u32, value: u8) {
        self.io.write(addr, value)
    }

    pub(crate) fn read_reg16(&mut self, addr: u32) -> u16 {
        let mut b = [0u8; 2];
        self.io.read_buf(addr, &mut b);
        u16::from_be_bytes(b)
    }

    pub(crate) fn write_reg16(&mut self, addr: u32, value: u16) {
        self.io.write_buf(addr, &value.to_be_bytes())
    }

    pub(crate) fn read_reg32(&mut self, addr: u32) -> u32 {
        let mut b = [0u8; 4];
        self.io.read_buf(addr, &mut b);
        u32::from_be_bytes(b)
    }

    pub(crate) fn read_regs<const N: usize>(&mut self, addr: u32) -> [u8; N] {
        let mut b = [0u8; N];
        self.io.read_buf(addr, &mut b);
        b
    }

    pub(crate) fn write_regs(&mut self, addr: u32, data: &[u8]) {
        self.io.write_buf(addr, data)
    }

    /// 16-bit counter the chip updates on its own; read until two reads agree
    fn read_stable16(&mut self, addr: u32) -> u16 {
        let mut val = 0;
        loop {
            let first = self.read_reg16(addr);
            if first != 0 {
                val = self.read_reg16(addr);
            }
            if val == first {
                return val;
            }
        }
    }

    // =========================================================================
    // SOCKET REGISTER HELPERS
    // =========================================================================

    pub(crate) fn sn_read(&mut self, sn: u8, offset: u16) -> u8 {
        self.read_reg(regs::sock(sn, offset))
    }

    pub(crate) fn sn_write(&mut self, sn: u8, offset: u16, value: u8) {
        self.write_reg(regs::sock(sn, offset), value)
    }

    pub(crate) fn sn_read16(&mut self, sn: u8, offset: u16) -> u16 {
        self.read_reg16(regs::sock(sn, offset))
    }

    pub(crate) fn sn_write16(&mut self, sn: u8, offset: u16, value: u16) {
        self.write_reg16(regs::sock(sn, offset), value)
    }

    pub(crate) fn sn_mode(&mut self, sn: u8) -> u8 {
        self.sn_read(sn, regs::SN_MR)
    }

    pub(crate) fn sn_status(&mut self, sn: u8) -> SocketStatus {
        SocketStatus::from(self.sn_read(sn, regs::SN_SR))
    }

    pub(crate) fn sn_interrupt(&mut self, sn: u8) -> SockInt {
        SockInt::from_bits_retain(self.sn_read(sn, regs::SN_IR))
    }

    pub(crate) fn sn_clear_interrupt(&mut self, sn: u8, bits: SockInt) {
        self.sn_write(sn, regs::SN_IRCLR, bits.bits())
    }

    /// Issue a socket command and wait for the chip to consume it
    pub(crate) fn command(&mut self, sn: u8, cmd: Command) {
        self.sn_write(sn, regs::SN_CR, cmd as u8);
        self.wait_command(sn);
    }

    pub(crate) fn wait_command(&mut self, sn: u8) {
        while self.sn_read(sn, regs::SN_CR) != 0 {
            self.idle();
        }
    }

    /// TX buffer capacity in bytes
    pub(crate) fn tx_max(&mut self, sn: u8) -> u16 {
        (self.sn_read(sn, regs::SN_TX_BSR) as u16) << 10
    }

    /// RX buffer capacity in bytes
    pub(crate) fn rx_max(&mut self, sn: u8) -> u16 {
        (self.sn_read(sn, regs::SN_RX_BSR) as u16) << 10
    }

    pub(crate) fn tx_free(&mut self, sn: u8) -> u16 {
        self.read_stable16(regs::sock(sn, regs::SN_TX_FSR))
    }

    pub(crate) fn rx_received(&mut self, sn: u8) -> u16 {
        self.read_stable16(regs::sock(sn, regs::SN_RX_RSR))
    }

    /// Copy `data` into the TX ring at TX_WR and advance it
    pub(crate) fn send_data(&mut self, sn: u8, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let ptr = self.sn_read16(sn, regs::SN_TX_WR);
        self.io.write_buf(regs::txbuf(sn, ptr), data);
        self.sn_write16(sn, regs::SN_TX_WR, ptr.wrapping_add(data.len() as u16));
    }

    /// Copy from the RX ring at RX_RD into `buf` and advance it
    pub(crate) fn recv_data(&mut self, sn: u8, buf: &mut [u8]) {
        if buf.is_empty() {
            return;
        }
        let ptr = self.sn_read16(sn, regs::SN_RX_RD);
        self.io.read_buf(regs::rxbuf(sn, ptr), buf);
        self.sn_write16(sn, regs::SN_RX_RD, ptr.wrapping_add(buf.len() as u16));
    }

    /// Advance RX_RD past `len` bytes without reading them
    pub(crate) fn recv_ignore(&mut self, sn: u8, len: u16) {
        let ptr = self.sn_read16(sn, regs::SN_RX_RD);
        self.sn_write16(sn, regs::SN_RX_RD, ptr.wrapping_add(len));
    }

    pub(crate) fn next_ephemeral_port(&mut self) -> u16 {
        let port = self.any_port;
        self.any_port = self.any_port.wrapping_add(1);
        if self.any_port == crate::config::EPHEMERAL_PORT_END {
            self.any_port = EPHEMERAL_PORT_START;
        }
        port
    }
}
