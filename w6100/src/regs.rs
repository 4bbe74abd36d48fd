//! W6100 address map and register definitions.
//!
//! Every register and buffer byte is reached through a 24-bit address
//! selector: bits 23..8 carry the byte offset, bits 7..3 the block select
//! (common block, or a socket's register/TX/RX block). The transport adds
//! the read/write and operation-mode bits in 2..0 when framing a transaction.

use bitflags::bitflags;

/// Number of hardware sockets
pub const SOCK_NUM: usize = 8;

// =============================================================================
// ADDRESS ENCODING
// =============================================================================

/// Block select of the common register block
pub const COMMON_BLOCK: u8 = 0x00;

/// Block select of socket `sn`'s register block
pub const fn sock_block(sn: u8) -> u8 {
    1 + 4 * sn
}

/// Block select of socket `sn`'s TX buffer
pub const fn txbuf_block(sn: u8) -> u8 {
    2 + 4 * sn
}

/// Block select of socket `sn`'s RX buffer
pub const fn rxbuf_block(sn: u8) -> u8 {
    3 + 4 * sn
}

/// Build an address selector from a byte offset and block select
pub const fn addr(offset: u16, block: u8) -> u32 {
    ((offset as u32) << 8) | ((block as u32) << 3)
}

/// Address of a common register
pub const fn common(offset: u16) -> u32 {
    addr(offset, COMMON_BLOCK)
}

/// Address of a socket register
pub const fn sock(sn: u8, offset: u16) -> u32 {
    addr(offset, sock_block(sn))
}

/// Address of a TX ring byte at pointer `ptr`
pub const fn txbuf(sn: u8, ptr: u16) -> u32 {
    addr(ptr, txbuf_block(sn))
}

/// Address of an RX ring byte at pointer `ptr`
pub const fn rxbuf(sn: u8, ptr: u16) -> u32 {
    addr(ptr, rxbuf_block(sn))
}

/// Advance the offset part of an address selector by `n` bytes.
/// The offset wraps inside 16 bits; the block select is untouched.
pub const fn offset_inc(addr: u32, n: u16) -> u32 {
    let offset = ((addr >> 8) as u16).wrapping_add(n);
    ((offset as u32) << 8) | (addr & 0xFF)
}

// =============================================================================
// COMMON REGISTERS (offsets)
// =============================================================================

pub const CIDR: u16 = 0x0000; // Chip ID (2 bytes)
pub const VER: u16 = 0x0002; // Chip version (2 bytes)
pub const SYSR: u16 = 0x2000; // System status (lock bits)
pub const SYCR0: u16 = 0x2004; // System config 0 (soft reset)
pub const SYCR1: u16 = 0x2005; // System config 1 (IEN, clock select)

pub const IR: u16 = 0x2100; // Interrupt
pub const SIR: u16 = 0x2101; // Socket interrupt summary
pub const SLIR: u16 = 0x2102; // Service-layer interrupt
pub const IMR: u16 = 0x2104; // Interrupt mask
pub const IRCLR: u16 = 0x2108; // Interrupt clear
pub const SIMR: u16 = 0x2114; // Socket interrupt mask
pub const SLIMR: u16 = 0x2124; // Service-layer interrupt mask
pub const SLIRCLR: u16 = 0x2128; // Service-layer interrupt clear
pub const SLPSR: u16 = 0x212C; // Service-layer source-address prefer
pub const SLCR: u16 = 0x2130; // Service-layer command

pub const PHYSR: u16 = 0x3000; // PHY status
pub const PHYRAR: u16 = 0x3008; // PHY register address (MDIO)
pub const PHYDIR: u16 = 0x300C; // PHY data in (2 bytes)
pub const PHYDOR: u16 = 0x3010; // PHY data out (2 bytes)
pub const PHYACR: u16 = 0x3014; // PHY access control
pub const PHYCR0: u16 = 0x301C; // PHY control 0 (mode)
pub const PHYCR1: u16 = 0x301D; // PHY control 1 (power, TE, reset)

pub const NET6MR: u16 = 0x4000; // IPv6 network mode
pub const NETMR: u16 = 0x4001; // Network mode
pub const NETMR2: u16 = 0x4002; // Network mode 2
pub const NET4MR: u16 = 0x4003; // IPv4 network mode

pub const SHAR: u16 = 0x4120; // Source hardware address (6 bytes)
pub const GAR: u16 = 0x4130; // Gateway IPv4 (4 bytes)
pub const SUBR: u16 = 0x4134; // Subnet mask IPv4 (4 bytes)
pub const SIPR: u16 = 0x4138; // Source IPv4 (4 bytes)
pub const LLAR: u16 = 0x4140; // Link-local IPv6 (16 bytes)
pub const GUAR: u16 = 0x4150; // Global unicast IPv6 (16 bytes)
pub const SUB6R: u16 = 0x4160; // IPv6 prefix mask (16 bytes)
pub const GA6R: u16 = 0x4170; // Gateway IPv6 (16 bytes)

pub const SLDIP6R: u16 = 0x4180; // Service-layer destination IPv6 (16 bytes)
pub const SLDIP4R: u16 = 0x418C; // Service-layer destination IPv4 (4 bytes)
pub const SLDHAR: u16 = 0x4190; // Service-layer destination MAC (6 bytes)
pub const PINGIDR: u16 = 0x4198; // PING identifier (2 bytes)
pub const PINGSEQR: u16 = 0x419C; // PING sequence (2 bytes)
pub const INTPTMR: u16 = 0x41C5; // Interrupt pending time (2 bytes)

pub const PLR: u16 = 0x41D0; // Prefix length
pub const PFR: u16 = 0x41D4; // Prefix flag
pub const VLTR: u16 = 0x41D8; // Valid lifetime (4 bytes)
pub const PLTR: u16 = 0x41DC; // Preferred lifetime (4 bytes)
pub const PAR: u16 = 0x41E0; // Prefix address (16 bytes)

pub const CHPLCKR: u16 = 0x41F4; // Chip lock
pub const NETLCKR: u16 = 0x41F5; // Network lock
pub const PHYLCKR: u16 = 0x41F6; // PHY lock

pub const RTR: u16 = 0x4200; // Retransmission time (2 bytes, 100us)
pub const RCR: u16 = 0x4204; // Retransmission count
pub const SLRTR: u16 = 0x4208; // Service-layer retransmission time (2 bytes)
pub const SLRCR: u16 = 0x420C; // Service-layer retransmission count

// Indirect bus window (byte offsets from the bus base address)
pub const IDM_AR0: u32 = 0x00;
pub const IDM_AR1: u32 = 0x01;
pub const IDM_BSR: u32 = 0x02;
pub const IDM_DR: u32 = 0x03;

// SYSR bits
pub const SYSR_CHPL: u8 = 0x80;
pub const SYSR_NETL: u8 = 0x40;
pub const SYSR_PHYL: u8 = 0x20;

// SYCR0 / SYCR1 bits
pub const SYCR0_RST: u8 = 0x00;
pub const SYCR1_IEN: u8 = 0x80;
pub const SYCR1_CLKSEL: u8 = 0x01;

// Lock register keys
pub const CHPLCKR_UNLOCK: u8 = 0xCE;
pub const NETLCKR_UNLOCK: u8 = 0x3A;
pub const NETLCKR_LOCK: u8 = 0xC5;
pub const PHYLCKR_UNLOCK: u8 = 0x53;
pub const LOCK_KEY: u8 = 0xFF;

// PHY bits
pub const PHYSR_LNK: u8 = 0x01;
pub const PHYSR_DPX: u8 = 0x08; // 1: half duplex
pub const PHYSR_SPD: u8 = 0x10; // 1: 10 Mbps
pub const PHYSR_MANUAL: u8 = 0x20;
pub const PHYACR_WRITE: u8 = 0x01;
pub const PHYACR_READ: u8 = 0x02;
pub const PHYCR0_AUTO: u8 = 0x00;
pub const PHYCR0_MANUAL: u8 = 0x04;
pub const PHYCR0_10M: u8 = 0x02;
pub const PHYCR0_HALF: u8 = 0x01;
pub const PHYCR1_PWDN: u8 = 0x20;
pub const PHYCR1_TE: u8 = 0x08;
pub const PHYCR1_RST: u8 = 0x01;

// MII registers and bits (MDIO access)
pub const MII_BMCR: u8 = 0x00;
pub const MII_BMSR: u8 = 0x01;
pub const BMCR_RST: u16 = 0x8000;
pub const BMCR_SPD: u16 = 0x2000;
pub const BMCR_ANE: u16 = 0x1000;
pub const BMCR_PWDN: u16 = 0x0800;
pub const BMCR_DPX: u16 = 0x0100;
pub const BMSR_LINK: u16 = 0x0004;

// =============================================================================
// SOCKET REGISTERS (offsets inside a socket block)
// =============================================================================

pub const SN_MR: u16 = 0x0000; // Mode
pub const SN_PSR: u16 = 0x0004; // Source-address prefer
pub const SN_CR: u16 = 0x0010; // Command
pub const SN_IR: u16 = 0x0020; // Interrupt
pub const SN_IMR: u16 = 0x0024; // Interrupt mask
pub const SN_IRCLR: u16 = 0x0028; // Interrupt clear
pub const SN_SR: u16 = 0x0030; // Status
pub const SN_ESR: u16 = 0x0031; // Extended status
pub const SN_TOSR: u16 = 0x0104; // IP TOS
pub const SN_TTLR: u16 = 0x0108; // IP TTL / hop limit
pub const SN_MSSR: u16 = 0x0110; // TCP MSS (2 bytes)
pub const SN_PORTR: u16 = 0x0114; // Source port (2 bytes)
pub const SN_DIPR: u16 = 0x0120; // Destination IPv4 (4 bytes)
pub const SN_DIP6R: u16 = 0x0130; // Destination IPv6 (16 bytes)
pub const SN_DPORTR: u16 = 0x0140; // Destination port (2 bytes)
pub const SN_MR2: u16 = 0x0144; // Mode 2
pub const SN_KPALVTR: u16 = 0x0188; // Keep-alive timer (5s units)
pub const SN_TX_BSR: u16 = 0x0200; // TX buffer size (KB)
pub const SN_TX_FSR: u16 = 0x0204; // TX free size (2 bytes)
pub const SN_TX_RD: u16 = 0x0208; // TX read pointer (2 bytes)
pub const SN_TX_WR: u16 = 0x020C; // TX write pointer (2 bytes)
pub const SN_RX_BSR: u16 = 0x0220; // RX buffer size (KB)
pub const SN_RX_RSR: u16 = 0x0224; // RX received size (2 bytes)
pub const SN_RX_RD: u16 = 0x0228; // RX read pointer (2 bytes)
pub const SN_RX_WR: u16 = 0x022C; // RX write pointer (2 bytes)

// Sn_ESR bits
pub const ESR_TCPM: u8 = 0x04; // peer is IPv6
pub const ESR_TCPOP: u8 = 0x02; // passive open
pub const ESR_IP6T: u8 = 0x01; // source is the GUA
pub const ESR_MASK: u8 = 0x07;

// =============================================================================
// TYPED REGISTER VALUES
// =============================================================================

/// Socket protocol (low nibble of Sn_MR)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    Closed = 0x00,
    Tcp4 = 0x01,
    Udp4 = 0x02,
    IpRaw4 = 0x03,
    MacRaw = 0x07,
    Tcp6 = 0x09,
    Udp6 = 0x0A,
    IpRaw6 = 0x0B,
    TcpDual = 0x0D,
    UdpDual = 0x0E,
}

impl Protocol {
    /// Decode the protocol nibble of a raw Sn_MR value
    pub fn from_mr(mr: u8) -> Option<Self> {
        Some(match mr & 0x0F {
            0x00 => Self::Closed,
            0x01 => Self::Tcp4,
            0x02 => Self::Udp4,
            0x03 => Self::IpRaw4,
            0x07 => Self::MacRaw,
            0x09 => Self::Tcp6,
            0x0A => Self::Udp6,
            0x0B => Self::IpRaw6,
            0x0D => Self::TcpDual,
            0x0E => Self::UdpDual,
            _ => return None,
        })
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn is_tcp(self) -> bool {
        self.bits() & 0x03 == 0x01
    }

    pub const fn is_udp(self) -> bool {
        self.bits() & 0x03 == 0x02
    }

    pub const fn is_ipraw(self) -> bool {
        matches!(self, Self::IpRaw4 | Self::IpRaw6)
    }

    /// UDP, IPRAW or MACRAW
    pub const fn is_datagram(self) -> bool {
        !matches!(self, Self::Closed) && !self.is_tcp()
    }

    /// The mode accepts IPv6 destinations
    pub const fn accepts_ipv6(self) -> bool {
        self.bits() & 0x08 != 0
    }
}

/// Socket status (Sn_SR)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStatus {
    Closed,
    Init,
    Listen,
    SynSent,
    SynRecv,
    Established,
    FinWait,
    Closing,
    TimeWait,
    CloseWait,
    LastAck,
    Udp,
    IpRaw4,
    IpRaw6,
    MacRaw,
    /// A transient value the driver has no name for
    Other(u8),
}

impl From<u8> for SocketStatus {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => Self::Closed,
            0x13 => Self::Init,
            0x14 => Self::Listen,
            0x15 => Self::SynSent,
            0x16 => Self::SynRecv,
            0x17 => Self::Established,
            0x18 => Self::FinWait,
            0x1A => Self::Closing,
            0x1B => Self::TimeWait,
            0x1C => Self::CloseWait,
            0x1D => Self::LastAck,
            0x22 => Self::Udp,
            0x32 => Self::IpRaw4,
            0x33 => Self::IpRaw6,
            0x42 => Self::MacRaw,
            other => Self::Other(other),
        }
    }
}

impl From<SocketStatus> for u8 {
    fn from(status: SocketStatus) -> u8 {
        match status {
            SocketStatus::Closed => 0x00,
            SocketStatus::Init => 0x13,
            SocketStatus::Listen => 0x14,
            SocketStatus::SynSent => 0x15,
            SocketStatus::SynRecv => 0x16,
            SocketStatus::Established => 0x17,
            SocketStatus::FinWait => 0x18,
            SocketStatus::Closing => 0x1A,
            SocketStatus::TimeWait => 0x1B,
            SocketStatus::CloseWait => 0x1C,
            SocketStatus::LastAck => 0x1D,
            SocketStatus::Udp => 0x22,
            SocketStatus::IpRaw4 => 0x32,
            SocketStatus::IpRaw6 => 0x33,
            SocketStatus::MacRaw => 0x42,
            SocketStatus::Other(raw) => raw,
        }
    }
}

/// Socket command (Sn_CR)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Open = 0x01,
    Listen = 0x02,
    Connect = 0x04,
    Connect6 = 0x84,
    Discon = 0x08,
    Close = 0x10,
    Send = 0x20,
    Send6 = 0xA0,
    SendKeep = 0x22,
    Recv = 0x40,
}

/// Source address selection for IPv6 (Sn_PSR / SLPSR)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SrcPrefer {
    Auto = 0x00,
    Lla = 0x02,
    Gua = 0x03,
}

impl SrcPrefer {
    /// Decode a raw PSR value; 0x01 is reserved
    pub fn from_bits(raw: u8) -> Option<Self> {
        match raw & 0x03 {
            0x00 => Some(Self::Auto),
            0x02 => Some(Self::Lla),
            0x03 => Some(Self::Gua),
            _ => None,
        }
    }
}

bitflags! {
    /// Flags accepted when opening a socket.
    ///
    /// The upper nibble lands in Sn_MR and its meaning depends on the
    /// protocol, so several names share a bit. `IO_NONBLOCK` is driver
    /// state; the two low bits land in Sn_MR2.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SocketFlags: u8 {
        /// UDP: multicast
        const MULTI_ENABLE = 0x80;
        /// MACRAW: MAC filter
        const MAC_FILTER = 0x80;
        /// UDP/MACRAW: block broadcast
        const BROAD_BLOCK = 0x40;
        /// TCP: force PSH
        const FORCE_PSH = 0x40;
        /// TCP: no delayed ACK
        const NO_DELAY_ACK = 0x20;
        /// UDP multicast: IGMPv1
        const IGMP_V1 = 0x20;
        /// UDP: block solicited multicast
        const SOLICIT_BLOCK = 0x20;
        /// MACRAW: block IPv4 multicast
        const MULTI_BLOCK4 = 0x20;
        /// UDP: block unicast
        const UNI_BLOCK = 0x10;
        /// MACRAW: block IPv6 multicast
        const MULTI_BLOCK6 = 0x10;
        /// Calls on this socket return busy instead of spinning
        const IO_NONBLOCK = 0x08;
        /// UDP/IPRAW: manual destination MAC
        const DHA_MANUAL = 0x02;
        /// Force ARP before each send
        const FORCE_ARP = 0x01;
    }
}

impl SocketFlags {
    /// Bits written to Sn_MR
    pub const MR_MASK: u8 = 0xF0;
    /// Bits written to Sn_MR2
    pub const MR2_MASK: u8 = 0x03;
    /// Bit with no meaning for any protocol
    pub const RESERVED: u8 = 0x04;
}

bitflags! {
    /// Per-socket interrupt bits (Sn_IR, Sn_IMR, Sn_IRCLR)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SockInt: u8 {
        const CON = 0x01;
        const DISCON = 0x02;
        const RECV = 0x04;
        const TIMEOUT = 0x08;
        const SENDOK = 0x10;
    }
}

bitflags! {
    /// Information about the datagram being drained by `recvfrom`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PackInfo: u8 {
        const IPV6 = 0x80;
        const IPV6_ALLNODE = 0xC0;
        const IPV6_MULTI = 0xA0;
        const IPV6_LLA = 0x90;
        const COMPLETED = 0x08;
        const REMAINED = 0x04;
        const FIRST = 0x02;
    }
}

bitflags! {
    /// Service-layer command (SLCR)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlCommand: u8 {
        const ARP4 = 0x40;
        const PING4 = 0x20;
        const ARP6 = 0x10;
        const PING6 = 0x08;
        const NS = 0x04;
        const RS = 0x02;
        const UNA = 0x01;
    }
}

bitflags! {
    /// Service-layer interrupt (SLIR, SLIMR, SLIRCLR)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlInterrupt: u8 {
        const TOUT = 0x80;
        const ARP4 = 0x40;
        const PING4 = 0x20;
        const ARP6 = 0x10;
        const PING6 = 0x08;
        const NS = 0x04;
        const RS = 0x02;
        const RA = 0x01;
    }
}

bitflags! {
    /// Chip-wide interrupt view: IR in bits 0..7, SIR in 8..15, SLIR in 16..23
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntrKind: u32 {
        const PTERM = 1 << 0;
        const UNR4 = 1 << 1;
        const IPCONF = 1 << 2;
        const UNR6 = 1 << 4;
        const WOL = 1 << 7;
        const SOCK0 = 1 << 8;
        const SOCK1 = 1 << 9;
        const SOCK2 = 1 << 10;
        const SOCK3 = 1 << 11;
        const SOCK4 = 1 << 12;
        const SOCK5 = 1 << 13;
        const SOCK6 = 1 << 14;
        const SOCK7 = 1 << 15;
        const SL_RA = 1 << 16;
        const SL_RS = 1 << 17;
        const SL_NS = 1 << 18;
        const SL_PING6 = 1 << 19;
        const SL_ARP6 = 1 << 20;
        const SL_PING4 = 1 << 21;
        const SL_ARP4 = 1 << 22;
        const SL_TOUT = 1 << 23;
    }
}

impl IntrKind {
    pub fn from_parts(ir: u8, sir: u8, slir: u8) -> Self {
        Self::from_bits_retain(((slir as u32) << 16) | ((sir as u32) << 8) | ir as u32)
    }

    /// Socket summary bit for socket `sn`
    pub fn sock(sn: u8) -> Self {
        Self::from_bits_retain(1 << (8 + sn as u32))
    }

    pub fn ir(self) -> u8 {
        self.bits() as u8
    }

    pub fn sir(self) -> u8 {
        (self.bits() >> 8) as u8
    }

    pub fn slir(self) -> u8 {
        (self.bits() >> 16) as u8
    }
}

bitflags! {
    /// Subsystem lock bits, as reported by SYSR >> 5
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SysLock: u8 {
        const CHIP = 0x04;
        const NET = 0x02;
        const PHY = 0x01;
    }
}

bitflags! {
    /// How the network configuration was obtained (kept in software)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IpMode: u8 {
        const STATIC_V4 = 0x01;
        const STATIC_V6 = 0x02;
        const SLAAC_V6 = 0x04;
        const DHCP_V4 = 0x10;
        const DHCP_V6 = 0x20;
    }
}

/// Network mode registers packed as NETMR | NETMR2 << 8 | NET4MR << 16 | NET6MR << 24
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetMode(pub u32);

impl NetMode {
    pub fn from_registers(netmr: u8, netmr2: u8, net4mr: u8, net6mr: u8) -> Self {
        Self(u32::from_le_bytes([netmr, netmr2, net4mr, net6mr]))
    }

    /// (NETMR, NETMR2, NET4MR, NET6MR)
    pub fn registers(self) -> (u8, u8, u8, u8) {
        let [a, b, c, d] = self.0.to_le_bytes();
        (a, b, c, d)
    }
}
