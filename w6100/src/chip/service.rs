//! Network services run by the chip itself
//!
//! ARP, PING, IPv6 duplicate address detection, router solicitation and
//! unsolicited neighbor advertisement. Each one is a single SLCR command:
//! load the parameters, issue the command, wait for SLCR to clear, then wait
//! for SLIR to report how it ended.
//!
//! The RA bit of SLIR is independent of any command (the router may
//! advertise at any time), so it is ignored while waiting and left pending
//! for [`W6100::prefix`].

use smoltcp::wire::{EthernetAddress, IpAddress, Ipv6Address};

use super::W6100;
use crate::device::Interface;
use crate::error::ChipError;
use crate::regs::{self, SlCommand, SlInterrupt};

/// Router advertisement prefix information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    pub len: u8,
    pub flag: u8,
    /// Seconds
    pub valid_lifetime: u32,
    /// Seconds
    pub preferred_lifetime: u32,
    pub prefix: Ipv6Address,
}

/// `ctlnetservice` requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetService {
    Arp(IpAddress),
    Ping { id: u16, seq: u16, dest: IpAddress },
    /// Check that nobody else owns this address
    Dad(Ipv6Address),
    /// Router solicitation
    Slaac,
    UnsolicitedNa,
    GetPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceReply {
    Arp(EthernetAddress),
    Ping,
    Dad,
    Slaac(Prefix),
    UnsolicitedNa,
    Prefix(Prefix),
}

impl<I: Interface> W6100<I> {
    pub fn ctlnetservice(&mut self, service: NetService) -> Result<ServiceReply, ChipError> {
        Ok(match service {
            NetService::Arp(dest) => ServiceReply::Arp(self.arp(dest)?),
            NetService::Ping { id, seq, dest } => {
                self.ping(id, seq, dest)?;
                ServiceReply::Ping
            }
            NetService::Dad(addr) => {
                self.dad(addr)?;
                ServiceReply::Dad
            }
            NetService::Slaac => ServiceReply::Slaac(self.slaac()?),
            NetService::UnsolicitedNa => {
                self.unsolicited_na()?;
                ServiceReply::UnsolicitedNa
            }
            NetService::GetPrefix => ServiceReply::Prefix(self.prefix()?),
        })
    }

    fn write_sl_dest(&mut self, dest: &IpAddress, v4: SlCommand, v6: SlCommand) -> SlCommand {
        match dest {
            IpAddress::Ipv4(a) => {
                self.write_regs(regs::common(regs::SLDIP4R), &a.octets());
                v4
            }
            IpAddress::Ipv6(a) => {
                self.write_regs(regs::common(regs::SLDIP6R), &a.octets());
                v6
            }
        }
    }

    /// Issue a service command and return the SLIR bits it ended with
    fn run_service(&mut self, cmd: SlCommand) -> SlInterrupt {
        self.write_reg(regs::common(regs::SLCR), cmd.bits());
        while self.read_reg(regs::common(regs::SLCR)) != 0 {
            self.idle();
        }
        let fired = loop {
            let slir = SlInterrupt::from_bits_retain(self.read_reg(regs::common(regs::SLIR)));
            let fired = slir - SlInterrupt::RA;
            if !fired.is_empty() {
                break fired;
            }
            self.idle();
        };
        self.write_reg(regs::common(regs::SLIRCLR), !SlInterrupt::RA.bits());
        fired
    }

    fn check_service(&self, fired: SlInterrupt, success: SlInterrupt) -> Result<(), ChipError> {
        if fired.intersects(success) {
            Ok(())
        } else {
            log::warn!(target: "w6100::service", "service ended with SLIR {:#04x}", fired.bits());
            Err(ChipError::Service(fired))
        }
    }

    fn read_prefix(&mut self) -> Prefix {
        Prefix {
            len: self.read_reg(regs::common(regs::PLR)),
            flag: self.read_reg(regs::common(regs::PFR)),
            valid_lifetime: self.read_reg32(regs::common(regs::VLTR)),
            preferred_lifetime: self.read_reg32(regs::common(regs::PLTR)),
            prefix: Ipv6Address::from(self.read_regs::<16>(regs::common(regs::PAR))),
        }
    }

    /// Resolve the hardware address of `dest`
    pub fn arp(&mut self, dest: IpAddress) -> Result<EthernetAddress, ChipError> {
        let cmd = self.write_sl_dest(&dest, SlCommand::ARP4, SlCommand::ARP6);
        let fired = self.run_service(cmd);
        self.check_service(fired, SlInterrupt::ARP4 | SlInterrupt::ARP6)?;
        let mac = EthernetAddress(self.read_regs::<6>(regs::common(regs::SLDHAR)));
        log::debug!(target: "w6100::service", "arp {} is at {}", dest, mac);
        Ok(mac)
    }

    /// Send one echo request and wait for its reply
    pub fn ping(&mut self, id: u16, seq: u16, dest: IpAddress) -> Result<(), ChipError> {
        self.write_reg16(regs::common(regs::PINGIDR), id);
        self.write_reg16(regs::common(regs::PINGSEQR), seq);
        let cmd = self.write_sl_dest(&dest, SlCommand::PING4, SlCommand::PING6);
        let fired = self.run_service(cmd);
        self.check_service(fired, SlInterrupt::PING4 | SlInterrupt::PING6)
    }

    /// Duplicate address detection; succeeds when no neighbor answers
    pub fn dad(&mut self, addr: Ipv6Address) -> Result<(), ChipError> {
        self.write_regs(regs::common(regs::SLDIP6R), &addr.octets());
        let fired = self.run_service(SlCommand::NS);
        self.check_service(fired, SlInterrupt::TOUT)
    }

    /// Router solicitation; returns the advertised prefix
    pub fn slaac(&mut self) -> Result<Prefix, ChipError> {
        let fired = self.run_service(SlCommand::RS);
        self.check_service(fired, SlInterrupt::RS)?;
        Ok(self.read_prefix())
    }

    pub fn unsolicited_na(&mut self) -> Result<(), ChipError> {
        let fired = self.run_service(SlCommand::UNA);
        self.check_service(fired, SlInterrupt::TOUT)
    }

    /// Prefix of a pending (unsolicited) router advertisement
    pub fn prefix(&mut self) -> Result<Prefix, ChipError> {
        let slir = SlInterrupt::from_bits_retain(self.read_reg(regs::common(regs::SLIR)));
        if !slir.contains(SlInterrupt::RA) {
            return Err(ChipError::NoPrefix);
        }
        let prefix = self.read_prefix();
        self.write_reg(regs::common(regs::SLIRCLR), SlInterrupt::RA.bits());
        Ok(prefix)
    }
}
