//! WIZnet W6100 driver
//!
//! Register-level control of the W6100 hardwired dual-stack TCP/IP chip:
//! the socket layer (TCP, UDP, IPRAW and MACRAW over eight hardware
//! sockets), chip and network configuration, PHY control and the
//! service-layer requests (ARP, ping, DAD, SLAAC, unsolicited NA).
//!
//! The chip is reached through an [`Interface`](device::Interface). SPI and
//! parallel-bus transports are provided in [`device`]; everything above
//! it is plain register traffic and never allocates.

#![cfg_attr(not(test), no_std)]

pub mod chip;
pub mod config;
pub mod device;
pub mod error;
pub mod net;
pub mod regs;

#[cfg(test)]
mod mock;

pub use chip::control::{ChipCtl, ChipCtlValue, SysClock};
pub use chip::network::{NetCtl, NetCtlValue, NetInfo, NetTimeout};
pub use chip::phy::{PhyConf, PhyDuplex, PhyLink, PhyMode, PhyPower, PhySpeed};
pub use chip::service::{NetService, Prefix, ServiceReply};
pub use chip::{ChipState, Shadow, W6100};
pub use config::Config;
pub use error::{ChipError, SockError, SOCK_OK};
pub use net::{
    GetSockOpt, Received, SetSockOpt, SockIoMode, SockOptValue, SocketCtl, SocketCtlValue,
    TcpStream,
};
pub use regs::{
    IntrKind, IpMode, NetMode, PackInfo, Protocol, SocketFlags, SocketStatus, SockInt, SrcPrefer,
    SysLock,
};
