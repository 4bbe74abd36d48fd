//! Simulated chip for tests
//!
//! A register file that reacts to socket commands, lock keys, soft reset,
//! service-layer commands and MDIO requests roughly the way the silicon
//! does. Outcomes of network events are scripted per socket.

use std::vec;
use std::vec::Vec;

use smoltcp::wire::IpAddress;

use crate::device::Interface;
use crate::regs::{self, PackInfo, SlInterrupt, SockInt, SocketStatus, SOCK_NUM};

const COMMON_SIZE: usize = 0x4300;
const SOCK_REGS: usize = 0x0400;
const RING_MAX: usize = 16 * 1024;

/// Scripted result of a network event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Timeout,
    Refused,
    Pending,
}

pub struct MockSocket {
    pub regs: Vec<u8>,
    pub tx: Vec<u8>,
    pub rx: Vec<u8>,
    pub connect: Outcome,
    pub disconnect: Outcome,
    pub send: Outcome,
    pub listen_ok: bool,
    pub keepalive_ack: bool,
    /// CR reads that still show the command before it reads zero
    pub cmd_latency: u8,
    pub commands: Vec<u8>,
    /// Payload of every SEND, in order
    pub sent: Vec<Vec<u8>>,
    pending_cr: u8,
    latency_left: u8,
}

impl MockSocket {
    fn new() -> Self {
        let mut regs = vec![0u8; SOCK_REGS];
        regs[regs::SN_TX_BSR as usize] = 2;
        regs[regs::SN_RX_BSR as usize] = 2;
        regs[regs::SN_TTLR as usize] = 0x80;
        Self {
            regs,
            tx: vec![0u8; RING_MAX],
            rx: vec![0u8; RING_MAX],
            connect: Outcome::Complete,
            disconnect: Outcome::Complete,
            send: Outcome::Complete,
            listen_ok: true,
            keepalive_ack: true,
            cmd_latency: 0,
            commands: Vec::new(),
            sent: Vec::new(),
            pending_cr: 0,
            latency_left: 0,
        }
    }

    fn reg16(&self, off: u16) -> u16 {
        let o = off as usize;
        u16::from_be_bytes([self.regs[o], self.regs[o + 1]])
    }

    fn set16(&mut self, off: u16, v: u16) {
        let o = off as usize;
        self.regs[o..o + 2].copy_from_slice(&v.to_be_bytes());
    }

    fn tx_size(&self) -> usize {
        self.regs[regs::SN_TX_BSR as usize] as usize * 1024
    }

    fn rx_size(&self) -> usize {
        self.regs[regs::SN_RX_BSR as usize] as usize * 1024
    }

    fn fsr(&self) -> u16 {
        let used = self.reg16(regs::SN_TX_WR).wrapping_sub(self.reg16(regs::SN_TX_RD));
        (self.tx_size() as u16).wrapping_sub(used)
    }

    fn rsr(&self) -> u16 {
        self.reg16(regs::SN_RX_WR).wrapping_sub(self.reg16(regs::SN_RX_RD))
    }

    fn status(&self) -> u8 {
        self.regs[regs::SN_SR as usize]
    }

    fn set_status(&mut self, raw: u8) {
        self.regs[regs::SN_SR as usize] = raw;
    }

    fn raise(&mut self, bits: SockInt) {
        self.regs[regs::SN_IR as usize] |= bits.bits();
    }

    fn read(&mut self, off: u16) -> u8 {
        match off {
            regs::SN_CR => {
                if self.latency_left > 0 {
                    self.latency_left -= 1;
                    self.pending_cr
                } else {
                    0
                }
            }
            o if o == regs::SN_TX_FSR => (self.fsr() >> 8) as u8,
            o if o == regs::SN_TX_FSR + 1 => self.fsr() as u8,
            o if o == regs::SN_RX_RSR => (self.rsr() >> 8) as u8,
            o if o == regs::SN_RX_RSR + 1 => self.rsr() as u8,
            o => self.regs.get(o as usize).copied().unwrap_or(0),
        }
    }

    fn write(&mut self, off: u16, v: u8) -> bool {
        match off {
            regs::SN_CR => {
                self.apply(v);
                false
            }
            regs::SN_IRCLR => {
                self.regs[regs::SN_IR as usize] &= !v;
                false
            }
            regs::SN_TX_BSR | regs::SN_RX_BSR => {
                self.regs[off as usize] = v;
                true
            }
            o => {
                if let Some(r) = self.regs.get_mut(o as usize) {
                    *r = v;
                }
                false
            }
        }
    }

    fn apply(&mut self, cmd: u8) {
        self.commands.push(cmd);
        self.pending_cr = cmd;
        self.latency_left = self.cmd_latency;
        let mr = self.regs[regs::SN_MR as usize] & 0x0F;
        match cmd {
            0x01 => {
                let status = match mr {
                    0x01 | 0x09 | 0x0D => SocketStatus::Init,
                    0x02 | 0x0A | 0x0E => SocketStatus::Udp,
                    0x03 => SocketStatus::IpRaw4,
                    0x0B => SocketStatus::IpRaw6,
                    0x07 => SocketStatus::MacRaw,
                    _ => SocketStatus::Closed,
                };
                for off in [regs::SN_TX_RD, regs::SN_TX_WR, regs::SN_RX_RD, regs::SN_RX_WR] {
                    self.set16(off, 0);
                }
                self.regs[regs::SN_IR as usize] = 0;
                self.set_status(status.into());
            }
            0x02 => {
                if self.status() == u8::from(SocketStatus::Init) {
                    let next = if self.listen_ok { SocketStatus::Listen } else { SocketStatus::Closed };
                    self.set_status(next.into());
                }
            }
            0x04 | 0x84 => match self.connect {
                Outcome::Complete => {
                    self.set_status(SocketStatus::Established.into());
                    self.raise(SockInt::CON);
                }
                Outcome::Timeout => {
                    self.set_status(SocketStatus::Closed.into());
                    self.raise(SockInt::TIMEOUT);
                }
                Outcome::Refused => self.set_status(SocketStatus::Closed.into()),
                Outcome::Pending => self.set_status(SocketStatus::SynSent.into()),
            },
            0x08 => match self.disconnect {
                Outcome::Complete => {
                    self.set_status(SocketStatus::Closed.into());
                    self.raise(SockInt::DISCON);
                }
                Outcome::Timeout => {
                    self.set_status(SocketStatus::FinWait.into());
                    self.raise(SockInt::TIMEOUT);
                }
                Outcome::Refused | Outcome::Pending => self.set_status(SocketStatus::FinWait.into()),
            },
            0x10 => self.set_status(SocketStatus::Closed.into()),
            0x20 | 0xA0 => {
                let rd = self.reg16(regs::SN_TX_RD);
                let wr = self.reg16(regs::SN_TX_WR);
                let size = self.tx_size().max(1);
                let n = wr.wrapping_sub(rd) as usize;
                let payload = (0..n)
                    .map(|i| self.tx[(rd as usize + i) % size])
                    .collect();
                self.sent.push(payload);
                self.set16(regs::SN_TX_RD, wr);
                match self.send {
                    Outcome::Complete => self.raise(SockInt::SENDOK),
                    Outcome::Timeout => self.raise(SockInt::TIMEOUT),
                    Outcome::Refused | Outcome::Pending => {}
                }
            }
            0x22 => {
                if !self.keepalive_ack {
                    self.raise(SockInt::TIMEOUT);
                    self.latency_left = u8::MAX;
                }
            }
            _ => {}
        }
    }
}

pub struct MockChip {
    pub common: Vec<u8>,
    pub socks: Vec<MockSocket>,
    /// Interface calls of any kind
    pub accesses: usize,
    /// Writes to Sn_TX_BSR / Sn_RX_BSR
    pub bsr_writes: usize,
    pub resets: usize,
    pub phy_resets: usize,
    /// SLIR bits raised by the next service-layer command
    pub sl_reply: SlInterrupt,
    pub sl_commands: Vec<u8>,
    /// Hardware address reported by a successful ARP
    pub arp_mac: [u8; 6],
    pub mdio: [u16; 32],
}

impl MockChip {
    pub fn new() -> Self {
        let mut common = vec![0u8; COMMON_SIZE];
        common[regs::CIDR as usize..regs::CIDR as usize + 2].copy_from_slice(&[0x61, 0x00]);
        common[regs::VER as usize..regs::VER as usize + 2].copy_from_slice(&[0x46, 0x81]);
        common[regs::SYSR as usize] = regs::SYSR_CHPL | regs::SYSR_NETL | regs::SYSR_PHYL;
        common[regs::PHYSR as usize] = regs::PHYSR_LNK;
        let mut mdio = [0u16; 32];
        mdio[regs::MII_BMCR as usize] = regs::BMCR_ANE | regs::BMCR_SPD | regs::BMCR_DPX;
        mdio[regs::MII_BMSR as usize] = regs::BMSR_LINK;
        Self {
            common,
            socks: (0..SOCK_NUM).map(|_| MockSocket::new()).collect(),
            accesses: 0,
            bsr_writes: 0,
            resets: 0,
            phy_resets: 0,
            sl_reply: SlInterrupt::TOUT,
            sl_commands: Vec::new(),
            arp_mac: [0x00, 0x08, 0xDC, 0x11, 0x22, 0x33],
            mdio,
        }
    }

    // =========================================================================
    // TEST HELPERS
    // =========================================================================

    pub fn set_common(&mut self, off: u16, data: &[u8]) {
        let o = off as usize;
        self.common[o..o + data.len()].copy_from_slice(data);
    }

    pub fn common_bytes(&self, off: u16, len: usize) -> &[u8] {
        &self.common[off as usize..off as usize + len]
    }

    /// Give the chip a local IPv4 and link-local IPv6 address
    pub fn configure_addresses(&mut self) {
        self.set_common(regs::SIPR, &[192, 168, 0, 10]);
        self.set_common(regs::LLAR, &[0xFE, 0x80, 0, 0, 0, 0, 0, 0, 0x02, 0x08, 0xDC, 0xFF, 0xFE, 0x11, 0x22, 0x33]);
    }

    pub fn sock_reg(&self, sn: u8, off: u16) -> u8 {
        self.socks[sn as usize].regs[off as usize]
    }

    pub fn set_sock_reg(&mut self, sn: u8, off: u16, v: u8) {
        self.socks[sn as usize].regs[off as usize] = v;
    }

    pub fn sock_reg16(&self, sn: u8, off: u16) -> u16 {
        self.socks[sn as usize].reg16(off)
    }

    pub fn set_sock_reg16(&mut self, sn: u8, off: u16, v: u16) {
        self.socks[sn as usize].set16(off, v)
    }

    pub fn status(&self, sn: u8) -> SocketStatus {
        SocketStatus::from(self.socks[sn as usize].status())
    }

    pub fn set_status(&mut self, sn: u8, status: SocketStatus) {
        self.socks[sn as usize].set_status(status.into())
    }

    pub fn raise(&mut self, sn: u8, bits: SockInt) {
        self.socks[sn as usize].raise(bits)
    }

    pub fn interrupt(&self, sn: u8) -> SockInt {
        SockInt::from_bits_retain(self.sock_reg(sn, regs::SN_IR))
    }

    /// Deliver raw bytes into the RX ring as if received from the wire
    pub fn push_rx(&mut self, sn: u8, data: &[u8]) {
        let s = &mut self.socks[sn as usize];
        let size = s.rx_size().max(1);
        let wr = s.reg16(regs::SN_RX_WR);
        for (i, &b) in data.iter().enumerate() {
            s.rx[(wr as usize + i) % size] = b;
        }
        s.set16(regs::SN_RX_WR, wr.wrapping_add(data.len() as u16));
    }

    /// Deliver a UDP datagram with its address/port header
    pub fn push_udp(&mut self, sn: u8, from: IpAddress, port: u16, payload: &[u8]) {
        let mut pkt = Self::head(&from, payload.len());
        pkt.extend_from_slice(&port.to_be_bytes());
        pkt.extend_from_slice(payload);
        self.push_rx(sn, &pkt);
    }

    /// Deliver an IPRAW packet (address header, no port)
    pub fn push_ipraw(&mut self, sn: u8, from: IpAddress, payload: &[u8]) {
        let mut pkt = Self::head(&from, payload.len());
        pkt.extend_from_slice(payload);
        self.push_rx(sn, &pkt);
    }

    /// Deliver a MACRAW frame whose header claims `declared` bytes
    pub fn push_macraw(&mut self, sn: u8, declared: u16, payload: &[u8]) {
        let mut pkt = vec![((declared >> 8) as u8) & 0x07, declared as u8];
        pkt.extend_from_slice(payload);
        self.push_rx(sn, &pkt);
    }

    fn head(from: &IpAddress, len: usize) -> Vec<u8> {
        let (flag, addr): (u8, Vec<u8>) = match from {
            IpAddress::Ipv4(a) => (0, a.octets().to_vec()),
            IpAddress::Ipv6(a) => (PackInfo::IPV6.bits(), a.octets().to_vec()),
        };
        let mut pkt = vec![flag | (((len >> 8) as u8) & 0x07), len as u8];
        pkt.extend_from_slice(&addr);
        pkt
    }

    // =========================================================================
    // REGISTER FILE
    // =========================================================================

    fn read_at(&mut self, addr: u32) -> u8 {
        let offset = (addr >> 8) as u16;
        let block = ((addr >> 3) & 0x1F) as u8;
        if block == regs::COMMON_BLOCK {
            return self.read_common(offset);
        }
        let sn = ((block - 1) / 4) as usize;
        let s = &mut self.socks[sn];
        match (block - 1) % 4 {
            0 => s.read(offset),
            1 => s.tx[offset as usize % s.tx_size().max(1)],
            2 => s.rx[offset as usize % s.rx_size().max(1)],
            _ => 0,
        }
    }

    fn write_at(&mut self, addr: u32, v: u8) {
        let offset = (addr >> 8) as u16;
        let block = ((addr >> 3) & 0x1F) as u8;
        if block == regs::COMMON_BLOCK {
            return self.write_common(offset, v);
        }
        let sn = ((block - 1) / 4) as usize;
        let s = &mut self.socks[sn];
        match (block - 1) % 4 {
            0 => {
                if s.write(offset, v) {
                    self.bsr_writes += 1;
                }
            }
            1 => {
                let size = s.tx_size().max(1);
                s.tx[offset as usize % size] = v;
            }
            2 => {
                let size = s.rx_size().max(1);
                s.rx[offset as usize % size] = v;
            }
            _ => {}
        }
    }

    fn read_common(&mut self, off: u16) -> u8 {
        match off {
            regs::SIR => self
                .socks
                .iter()
                .enumerate()
                .filter(|(_, s)| s.regs[regs::SN_IR as usize] != 0)
                .fold(0u8, |acc, (i, _)| acc | (1 << i)),
            regs::PHYACR => 0,
            o => self.common.get(o as usize).copied().unwrap_or(0),
        }
    }

    fn write_common(&mut self, off: u16, v: u8) {
        let sysr = regs::SYSR as usize;
        match off {
            regs::SYCR0 if v == regs::SYCR0_RST => self.soft_reset(),
            regs::IRCLR => self.common[regs::IR as usize] &= !v,
            regs::SLIRCLR => self.common[regs::SLIR as usize] &= !v,
            regs::CHPLCKR => {
                if v == regs::CHPLCKR_UNLOCK {
                    self.common[sysr] &= !regs::SYSR_CHPL;
                } else {
                    self.common[sysr] |= regs::SYSR_CHPL;
                }
            }
            regs::NETLCKR => match v {
                regs::NETLCKR_UNLOCK => self.common[sysr] &= !regs::SYSR_NETL,
                regs::NETLCKR_LOCK => self.common[sysr] |= regs::SYSR_NETL,
                _ => {}
            },
            regs::PHYLCKR => {
                if v == regs::PHYLCKR_UNLOCK {
                    self.common[sysr] &= !regs::SYSR_PHYL;
                } else {
                    self.common[sysr] |= regs::SYSR_PHYL;
                }
            }
            regs::PHYCR1 => {
                if v & regs::PHYCR1_RST != 0 {
                    self.phy_resets += 1;
                }
                self.common[off as usize] = v & !regs::PHYCR1_RST;
            }
            regs::PHYACR => self.mdio_op(v),
            regs::SLCR => self.service(v),
            o => {
                if let Some(r) = self.common.get_mut(o as usize) {
                    *r = v;
                }
            }
        }
    }

    fn soft_reset(&mut self) {
        self.resets += 1;
        for (off, len) in [
            (regs::SHAR, 6),
            (regs::GAR, 4),
            (regs::SUBR, 4),
            (regs::SIPR, 4),
            (regs::LLAR, 16),
            (regs::GUAR, 16),
            (regs::SUB6R, 16),
            (regs::GA6R, 16),
        ] {
            self.common[off as usize..off as usize + len].fill(0);
        }
        self.common[regs::SYSR as usize] = regs::SYSR_CHPL | regs::SYSR_NETL | regs::SYSR_PHYL;
    }

    fn service(&mut self, cmd: u8) {
        if cmd == 0 {
            return;
        }
        self.sl_commands.push(cmd);
        let reply = self.sl_reply;
        if reply.intersects(SlInterrupt::ARP4 | SlInterrupt::ARP6) {
            let mac = self.arp_mac;
            self.set_common(regs::SLDHAR, &mac);
        }
        self.common[regs::SLIR as usize] |= reply.bits();
        self.common[regs::SLCR as usize] = 0;
    }

    fn mdio_op(&mut self, op: u8) {
        let reg = (self.common[regs::PHYRAR as usize] & 0x1F) as usize;
        match op {
            regs::PHYACR_READ => {
                let v = self.mdio[reg];
                self.set_common(regs::PHYDOR, &v.to_be_bytes());
            }
            regs::PHYACR_WRITE => {
                let d = regs::PHYDIR as usize;
                let mut v = u16::from_be_bytes([self.common[d], self.common[d + 1]]);
                if reg == regs::MII_BMCR as usize && v & regs::BMCR_RST != 0 {
                    self.phy_resets += 1;
                    v &= !regs::BMCR_RST;
                }
                self.mdio[reg] = v;
            }
            _ => {}
        }
    }
}

impl Interface for MockChip {
    fn read(&mut self, addr: u32) -> u8 {
        self.accesses += 1;
        self.read_at(addr)
    }

    fn write(&mut self, addr: u32, value: u8) {
        self.accesses += 1;
        self.write_at(addr, value)
    }

    fn read_buf(&mut self, addr: u32, buf: &mut [u8]) {
        self.accesses += 1;
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_at(regs::offset_inc(addr, i as u16));
        }
    }

    fn write_buf(&mut self, addr: u32, buf: &[u8]) {
        self.accesses += 1;
        for (i, &b) in buf.iter().enumerate() {
            self.write_at(regs::offset_inc(addr, i as u16), b);
        }
    }
}
