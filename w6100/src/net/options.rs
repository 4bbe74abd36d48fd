//! Socket control and options
//!
//! `ctlsocket` covers driver-side settings and the per-socket interrupt
//! registers; `setsockopt`/`getsockopt` cover the protocol parameters the
//! chip keeps per socket.

use smoltcp::wire::{IpAddress, Ipv4Address, Ipv6Address};

use crate::chip::{check_sn, W6100};
use crate::device::Interface;
use crate::error::SockError;
use crate::regs::{self, Command, PackInfo, Protocol, SockInt, SocketFlags, SocketStatus, SrcPrefer};

/// Blocking behavior of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockIoMode {
    Block,
    NonBlock,
}

/// `ctlsocket` requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketCtl {
    SetIoMode(SockIoMode),
    GetIoMode,
    GetMaxTxBuf,
    GetMaxRxBuf,
    ClearInterrupt(SockInt),
    GetInterrupt,
    SetIntMask(SockInt),
    GetIntMask,
    SetPrefer(SrcPrefer),
    GetPrefer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketCtlValue {
    Done,
    IoMode(SockIoMode),
    Size(u16),
    Interrupt(SockInt),
    Prefer(SrcPrefer),
}

/// `setsockopt` requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetSockOpt {
    Ttl(u8),
    Tos(u8),
    Mss(u16),
    DestIp(IpAddress),
    DestPort(u16),
    /// Send one keep-alive now (TCP, auto keep-alive off)
    KeepAliveSend,
    /// Auto keep-alive period in 5 s units, 0 disables
    KeepAliveAuto(u8),
}

/// `getsockopt` requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetSockOpt {
    Flag,
    Ttl,
    Tos,
    Mss,
    DestIp,
    DestPort,
    KeepAliveAuto,
    SendBuf,
    RecvBuf,
    Status,
    ExtStatus,
    RemainSize,
    PackInfo,
    Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockOptValue {
    Flags(SocketFlags),
    Byte(u8),
    Word(u16),
    Addr(IpAddress),
    Status(SocketStatus),
    PackInfo(PackInfo),
    Mode(Protocol),
}

fn check_int(bits: SockInt) -> Result<u8, SockError> {
    if bits.bits() > SockInt::all().bits() {
        return Err(SockError::Arg);
    }
    Ok(bits.bits())
}

impl<I: Interface> W6100<I> {
    pub fn ctlsocket(&mut self, sn: u8, ctl: SocketCtl) -> Result<SocketCtlValue, SockError> {
        let idx = check_sn(sn)?;
        let value = match ctl {
            SocketCtl::SetIoMode(mode) => {
                self.shadow[idx].nonblock = mode == SockIoMode::NonBlock;
                SocketCtlValue::Done
            }
            SocketCtl::GetIoMode => SocketCtlValue::IoMode(if self.shadow[idx].nonblock {
                SockIoMode::NonBlock
            } else {
                SockIoMode::Block
            }),
            SocketCtl::GetMaxTxBuf => SocketCtlValue::Size(self.tx_max(sn)),
            SocketCtl::GetMaxRxBuf => SocketCtlValue::Size(self.rx_max(sn)),
            SocketCtl::ClearInterrupt(bits) => {
                let raw = check_int(bits)?;
                self.sn_write(sn, regs::SN_IRCLR, raw);
                SocketCtlValue::Done
            }
            SocketCtl::GetInterrupt => SocketCtlValue::Interrupt(self.sn_interrupt(sn)),
            SocketCtl::SetIntMask(bits) => {
                let raw = check_int(bits)?;
                self.sn_write(sn, regs::SN_IMR, raw);
                SocketCtlValue::Done
            }
            SocketCtl::GetIntMask => {
                SocketCtlValue::Interrupt(SockInt::from_bits_retain(self.sn_read(sn, regs::SN_IMR)))
            }
            SocketCtl::SetPrefer(prefer) => {
                self.sn_write(sn, regs::SN_PSR, prefer as u8);
                SocketCtlValue::Done
            }
            SocketCtl::GetPrefer => {
                let raw = self.sn_read(sn, regs::SN_PSR);
                SocketCtlValue::Prefer(SrcPrefer::from_bits(raw).ok_or(SockError::Arg)?)
            }
        };
        Ok(value)
    }

    pub fn setsockopt(&mut self, sn: u8, opt: SetSockOpt) -> Result<(), SockError> {
        check_sn(sn)?;
        match opt {
            SetSockOpt::Ttl(ttl) => self.sn_write(sn, regs::SN_TTLR, ttl),
            SetSockOpt::Tos(tos) => self.sn_write(sn, regs::SN_TOSR, tos),
            SetSockOpt::Mss(mss) => self.sn_write16(sn, regs::SN_MSSR, mss),
            SetSockOpt::DestIp(IpAddress::Ipv4(a)) => {
                self.write_regs(regs::sock(sn, regs::SN_DIPR), &a.octets())
            }
            SetSockOpt::DestIp(IpAddress::Ipv6(a)) => {
                self.write_regs(regs::sock(sn, regs::SN_DIP6R), &a.octets())
            }
            SetSockOpt::DestPort(port) => self.sn_write16(sn, regs::SN_DPORTR, port),
            SetSockOpt::KeepAliveSend => {
                self.check_tcp(sn)?;
                if self.sn_read(sn, regs::SN_KPALVTR) != 0 {
                    return Err(SockError::SockOpt);
                }
                self.sn_write(sn, regs::SN_CR, Command::SendKeep as u8);
                while self.sn_read(sn, regs::SN_CR) != 0 {
                    if self.sn_interrupt(sn).contains(SockInt::TIMEOUT) {
                        self.sn_clear_interrupt(sn, SockInt::TIMEOUT);
                        log::warn!(target: "w6100::socket", "sock {} keep-alive timed out", sn);
                        return Err(SockError::Timeout);
                    }
                    self.idle();
                }
            }
            SetSockOpt::KeepAliveAuto(period) => {
                self.check_tcp(sn)?;
                self.sn_write(sn, regs::SN_KPALVTR, period);
            }
        }
        Ok(())
    }

    pub fn getsockopt(&mut self, sn: u8, opt: GetSockOpt) -> Result<SockOptValue, SockError> {
        let idx = check_sn(sn)?;
        let value = match opt {
            GetSockOpt::Flag => {
                let mr = self.sn_mode(sn) & SocketFlags::MR_MASK;
                let mr2 = self.sn_read(sn, regs::SN_MR2);
                let io = if self.shadow[idx].nonblock { SocketFlags::IO_NONBLOCK.bits() } else { 0 };
                SockOptValue::Flags(SocketFlags::from_bits_retain(mr | mr2 | io))
            }
            GetSockOpt::Ttl => SockOptValue::Byte(self.sn_read(sn, regs::SN_TTLR)),
            GetSockOpt::Tos => SockOptValue::Byte(self.sn_read(sn, regs::SN_TOSR)),
            GetSockOpt::Mss => SockOptValue::Word(self.sn_read16(sn, regs::SN_MSSR)),
            GetSockOpt::DestIp => {
                self.check_tcp(sn)?;
                if self.sn_read(sn, regs::SN_ESR) & regs::ESR_TCPM != 0 {
                    let b = self.read_regs::<16>(regs::sock(sn, regs::SN_DIP6R));
                    SockOptValue::Addr(IpAddress::Ipv6(Ipv6Address::from(b)))
                } else {
                    let b = self.read_regs::<4>(regs::sock(sn, regs::SN_DIPR));
                    SockOptValue::Addr(IpAddress::Ipv4(Ipv4Address::from(b)))
                }
            }
            GetSockOpt::DestPort => SockOptValue::Word(self.sn_read16(sn, regs::SN_DPORTR)),
            GetSockOpt::KeepAliveAuto => {
                self.check_tcp(sn)?;
                SockOptValue::Byte(self.sn_read(sn, regs::SN_KPALVTR))
            }
            GetSockOpt::SendBuf => SockOptValue::Word(self.tx_free(sn)),
            GetSockOpt::RecvBuf => SockOptValue::Word(self.rx_received(sn)),
            GetSockOpt::Status => SockOptValue::Status(self.sn_status(sn)),
            GetSockOpt::ExtStatus => {
                self.check_tcp(sn)?;
                SockOptValue::Byte(self.sn_read(sn, regs::SN_ESR) & regs::ESR_MASK)
            }
            GetSockOpt::RemainSize => {
                let mr = self.sn_mode(sn);
                if mr == 0 {
                    return Err(SockError::SockStatus);
                }
                if mr & 0x03 == 0x01 {
                    SockOptValue::Word(self.rx_received(sn))
                } else {
                    SockOptValue::Word(self.shadow[idx].remained)
                }
            }
            GetSockOpt::PackInfo => {
                let mr = self.sn_mode(sn);
                if mr == 0 {
                    return Err(SockError::SockStatus);
                }
                if mr & 0x03 == 0x01 {
                    return Err(SockError::SockMode);
                }
                SockOptValue::PackInfo(self.shadow[idx].pack_info)
            }
            GetSockOpt::Mode => {
                let mr = self.sn_mode(sn);
                SockOptValue::Mode(Protocol::from_mr(mr).ok_or(SockError::SockMode)?)
            }
        };
        Ok(value)
    }
}
