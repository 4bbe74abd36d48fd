//! Network configuration
//!
//! Addresses, network mode, retransmission timeouts and the IPv6 source
//! preference. DNS servers and the IP-config mode have no chip register;
//! they live in the driver context.

use smoltcp::wire::{EthernetAddress, Ipv4Address, Ipv6Address};

use super::W6100;
use crate::device::Interface;
use crate::error::ChipError;
use crate::regs::{self, IpMode, NetMode, SrcPrefer};

/// Complete network identity of the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetInfo {
    pub mac: EthernetAddress,
    pub ip: Ipv4Address,
    pub gw: Ipv4Address,
    pub sn: Ipv4Address,
    pub gw6: Ipv6Address,
    pub sn6: Ipv6Address,
    pub lla: Ipv6Address,
    pub gua: Ipv6Address,
    pub dns: Ipv4Address,
    pub dns6: Ipv6Address,
    pub ipmode: IpMode,
}

impl Default for NetInfo {
    fn default() -> Self {
        Self {
            mac: EthernetAddress([0; 6]),
            ip: Ipv4Address::UNSPECIFIED,
            gw: Ipv4Address::UNSPECIFIED,
            sn: Ipv4Address::UNSPECIFIED,
            gw6: Ipv6Address::UNSPECIFIED,
            sn6: Ipv6Address::UNSPECIFIED,
            lla: Ipv6Address::UNSPECIFIED,
            gua: Ipv6Address::UNSPECIFIED,
            dns: Ipv4Address::UNSPECIFIED,
            dns6: Ipv6Address::UNSPECIFIED,
            ipmode: IpMode::empty(),
        }
    }
}

/// Retransmission settings for sockets and for the service layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetTimeout {
    pub retry_count: u8,
    /// Retry period in 100 us units
    pub time_100us: u16,
    pub sl_retry_count: u8,
    pub sl_time_100us: u16,
}

/// `ctlnetwork` requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetCtl {
    SetNetInfo(NetInfo),
    GetNetInfo,
    SetNetMode(NetMode),
    GetNetMode,
    SetTimeout(NetTimeout),
    GetTimeout,
    SetPrefer(SrcPrefer),
    GetPrefer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetCtlValue {
    Done,
    NetInfo(NetInfo),
    NetMode(NetMode),
    Timeout(NetTimeout),
    Prefer(SrcPrefer),
}

impl<I: Interface> W6100<I> {
    pub fn ctlnetwork(&mut self, ctl: NetCtl) -> Result<NetCtlValue, ChipError> {
        let value = match ctl {
            NetCtl::SetNetInfo(info) => {
                self.set_net_info(&info);
                NetCtlValue::Done
            }
            NetCtl::GetNetInfo => NetCtlValue::NetInfo(self.net_info()),
            NetCtl::SetNetMode(mode) => {
                self.set_net_mode(mode);
                NetCtlValue::Done
            }
            NetCtl::GetNetMode => NetCtlValue::NetMode(self.net_mode()),
            NetCtl::SetTimeout(timeout) => {
                self.set_timeout(&timeout);
                NetCtlValue::Done
            }
            NetCtl::GetTimeout => NetCtlValue::Timeout(self.timeout()),
            NetCtl::SetPrefer(prefer) => {
                self.set_prefer(prefer);
                NetCtlValue::Done
            }
            NetCtl::GetPrefer => NetCtlValue::Prefer(self.prefer()?),
        };
        Ok(value)
    }

    /// Write the address registers and keep DNS / IP mode in the context.
    /// The network lock must be open for the address writes to land.
    pub fn set_net_info(&mut self, info: &NetInfo) {
        self.write_regs(regs::common(regs::SHAR), &info.mac.0);
        self.write_regs(regs::common(regs::GAR), &info.gw.octets());
        self.write_regs(regs::common(regs::SUBR), &info.sn.octets());
        self.write_regs(regs::common(regs::SIPR), &info.ip.octets());
        self.write_regs(regs::common(regs::GA6R), &info.gw6.octets());
        self.write_regs(regs::common(regs::SUB6R), &info.sn6.octets());
        self.write_regs(regs::common(regs::LLAR), &info.lla.octets());
        self.write_regs(regs::common(regs::GUAR), &info.gua.octets());
        self.dns = info.dns;
        self.dns6 = info.dns6;
        self.ip_mode = info.ipmode;
        log::debug!(target: "w6100::chip", "net info: mac {} ip {} gw {} lla {}", info.mac, info.ip, info.gw, info.lla);
    }

    pub fn net_info(&mut self) -> NetInfo {
        NetInfo {
            mac: EthernetAddress(self.read_regs::<6>(regs::common(regs::SHAR))),
            gw: Ipv4Address::from(self.read_regs::<4>(regs::common(regs::GAR))),
            sn: Ipv4Address::from(self.read_regs::<4>(regs::common(regs::SUBR))),
            ip: Ipv4Address::from(self.read_regs::<4>(regs::common(regs::SIPR))),
            gw6: Ipv6Address::from(self.read_regs::<16>(regs::common(regs::GA6R))),
            sn6: Ipv6Address::from(self.read_regs::<16>(regs::common(regs::SUB6R))),
            lla: Ipv6Address::from(self.read_regs::<16>(regs::common(regs::LLAR))),
            gua: Ipv6Address::from(self.read_regs::<16>(regs::common(regs::GUAR))),
            dns: self.dns,
            dns6: self.dns6,
            ipmode: self.ip_mode,
        }
    }

    pub fn set_net_mode(&mut self, mode: NetMode) {
        let (netmr, netmr2, net4mr, net6mr) = mode.registers();
        self.write_reg(regs::common(regs::NETMR), netmr);
        self.write_reg(regs::common(regs::NETMR2), netmr2);
        self.write_reg(regs::common(regs::NET4MR), net4mr);
        self.write_reg(regs::common(regs::NET6MR), net6mr);
    }

    pub fn net_mode(&mut self) -> NetMode {
        NetMode::from_registers(
            self.read_reg(regs::common(regs::NETMR)),
            self.read_reg(regs::common(regs::NETMR2)),
            self.read_reg(regs::common(regs::NET4MR)),
            self.read_reg(regs::common(regs::NET6MR)),
        )
    }

    pub fn set_timeout(&mut self, timeout: &NetTimeout) {
        self.write_reg(regs::common(regs::RCR), timeout.retry_count);
        self.write_reg16(regs::common(regs::RTR), timeout.time_100us);
        self.write_reg(regs::common(regs::SLRCR), timeout.sl_retry_count);
        self.write_reg16(regs::common(regs::SLRTR), timeout.sl_time_100us);
    }

    pub fn timeout(&mut self) -> NetTimeout {
        NetTimeout {
            retry_count: self.read_reg(regs::common(regs::RCR)),
            time_100us: self.read_reg16(regs::common(regs::RTR)),
            sl_retry_count: self.read_reg(regs::common(regs::SLRCR)),
            sl_time_100us: self.read_reg16(regs::common(regs::SLRTR)),
        }
    }

    /// Source address selection for service-layer packets
    pub fn set_prefer(&mut self, prefer: SrcPrefer) {
        self.write_reg(regs::common(regs::SLPSR), prefer as u8);
    }

    pub fn prefer(&mut self) -> Result<SrcPrefer, ChipError> {
        SrcPrefer::from_bits(self.read_reg(regs::common(regs::SLPSR))).ok_or(ChipError::Arg)
    }
}
