//! Socket state machine
//!
//! Berkeley-style calls mapped onto the hardware socket registers. Every
//! command goes through the same handshake: write Sn_CR, poll it back to
//! zero, then trust Sn_SR / Sn_IR. Blocking calls poll with the idle hook in
//! between; a socket opened with [`SocketFlags::IO_NONBLOCK`] returns
//! [`SockError::Busy`] wherever a blocking call would have waited.

use smoltcp::wire::{IpAddress, Ipv4Address, Ipv6Address};

use crate::chip::{check_sn, Shadow, W6100};
use crate::config::MAX_MACRAW_FRAME;
use crate::device::Interface;
use crate::error::SockError;
use crate::regs::{self, Command, PackInfo, Protocol, SockInt, SocketFlags, SocketStatus};

/// Result of one `recvfrom` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    /// Bytes copied into the caller's buffer
    pub len: usize,
    /// Sender address; only on the call that parsed the packet header
    pub addr: Option<IpAddress>,
    /// Sender port; only for UDP, on the call that parsed the header
    pub port: Option<u16>,
    /// Packet info after this call; loop while `REMAINED` is set
    pub info: PackInfo,
}

fn is_zero(addr: &IpAddress) -> bool {
    match addr {
        IpAddress::Ipv4(a) => a.is_unspecified(),
        IpAddress::Ipv6(a) => a.is_unspecified(),
    }
}

fn is_connected(status: SocketStatus) -> bool {
    matches!(status, SocketStatus::Established | SocketStatus::CloseWait)
}

impl<I: Interface> W6100<I> {
    /// Open socket `sn` for `protocol` bound to `port` (0 picks an ephemeral
    /// port). Any previous use of the slot is closed first.
    pub fn socket(
        &mut self,
        sn: u8,
        protocol: Protocol,
        port: u16,
        flags: SocketFlags,
    ) -> Result<u8, SockError> {
        check_sn(sn)?;
        match protocol {
            Protocol::Tcp4 => {
                if self.local_ipv4().is_unspecified() {
                    return Err(SockError::SockInit);
                }
            }
            Protocol::Tcp6 => {
                if self.local_lla().is_unspecified() {
                    return Err(SockError::SockInit);
                }
            }
            Protocol::TcpDual => {
                if self.local_ipv4().is_unspecified() || self.local_lla().is_unspecified() {
                    return Err(SockError::SockInit);
                }
            }
            Protocol::Closed => return Err(SockError::SockMode),
            _ => {}
        }

        let raw = flags.bits();
        if raw & SocketFlags::RESERVED != 0 {
            return Err(SockError::SockFlag);
        }
        if raw != 0 {
            let invalid = match protocol {
                Protocol::MacRaw => flags.intersects(SocketFlags::DHA_MANUAL | SocketFlags::FORCE_ARP),
                p if p.is_tcp() => flags.intersects(SocketFlags::MULTI_ENABLE | SocketFlags::UNI_BLOCK),
                p if p.is_ipraw() => true,
                _ => false,
            };
            if invalid {
                return Err(SockError::SockFlag);
            }
        }

        self.close_socket(sn);
        self.sn_write(sn, regs::SN_MR, protocol.bits() | (raw & SocketFlags::MR_MASK));
        self.sn_write(sn, regs::SN_MR2, raw & SocketFlags::MR2_MASK);
        let port = if port == 0 { self.next_ephemeral_port() } else { port };
        self.sn_write16(sn, regs::SN_PORTR, port);
        self.command(sn, Command::Open);

        self.shadow[sn as usize] = Shadow {
            nonblock: flags.contains(SocketFlags::IO_NONBLOCK),
            ..Shadow::default()
        };

        while self.sn_status(sn) == SocketStatus::Closed {
            self.idle();
        }
        log::debug!(target: "w6100::socket", "sock {} open {:?} port {}", sn, protocol, port);
        Ok(sn)
    }

    /// Close socket `sn` and wait for the chip to report CLOSED
    pub fn close(&mut self, sn: u8) -> Result<(), SockError> {
        check_sn(sn)?;
        self.close_socket(sn);
        Ok(())
    }

    pub(crate) fn close_socket(&mut self, sn: u8) {
        self.command(sn, Command::Close);
        self.sn_clear_interrupt(sn, SockInt::from_bits_retain(0xFF));
        self.shadow[sn as usize] = Shadow::default();
        while self.sn_status(sn) != SocketStatus::Closed {
            self.idle();
        }
    }

    /// Current hardware status of socket `sn`
    pub fn status(&mut self, sn: u8) -> Result<SocketStatus, SockError> {
        check_sn(sn)?;
        Ok(self.sn_status(sn))
    }

    /// Put an initialized TCP socket into LISTEN
    pub fn listen(&mut self, sn: u8) -> Result<(), SockError> {
        check_sn(sn)?;
        if self.sn_status(sn) != SocketStatus::Init {
            return Err(SockError::SockInit);
        }
        self.command(sn, Command::Listen);
        if self.sn_status(sn) != SocketStatus::Listen {
            self.close_socket(sn);
            log::warn!(target: "w6100::socket", "sock {} failed to listen", sn);
            return Err(SockError::SockClosed);
        }
        Ok(())
    }

    /// Open a TCP connection to `addr`:`port`
    pub fn connect(&mut self, sn: u8, addr: IpAddress, port: u16) -> Result<(), SockError> {
        check_sn(sn)?;
        self.check_tcp(sn)?;
        if self.sn_status(sn) != SocketStatus::Init {
            return Err(SockError::SockInit);
        }
        if is_zero(&addr) {
            return Err(SockError::IpInvalid);
        }
        if port == 0 {
            return Err(SockError::PortZero);
        }

        self.sn_write16(sn, regs::SN_DPORTR, port);
        match addr {
            IpAddress::Ipv6(a) => {
                if self.sn_mode(sn) & 0x08 == 0 {
                    return Err(SockError::SockMode);
                }
                self.write_regs(regs::sock(sn, regs::SN_DIP6R), &a.octets());
                self.sn_write(sn, regs::SN_CR, Command::Connect6 as u8);
            }
            IpAddress::Ipv4(a) => {
                if Protocol::from_mr(self.sn_mode(sn)) == Some(Protocol::Tcp6) {
                    return Err(SockError::SockMode);
                }
                self.write_regs(regs::sock(sn, regs::SN_DIPR), &a.octets());
                self.sn_write(sn, regs::SN_CR, Command::Connect as u8);
            }
        }
        self.wait_command(sn);

        if self.shadow[sn as usize].nonblock {
            return Err(SockError::Busy);
        }

        while self.sn_status(sn) != SocketStatus::Established {
            if self.sn_interrupt(sn).contains(SockInt::TIMEOUT) {
                self.sn_clear_interrupt(sn, SockInt::TIMEOUT);
                log::warn!(target: "w6100::socket", "sock {} connect to {} timed out", sn, addr);
                return Err(SockError::Timeout);
            }
            if self.sn_status(sn) == SocketStatus::Closed {
                return Err(SockError::SockClosed);
            }
            self.idle();
        }
        log::debug!(target: "w6100::socket", "sock {} connected to {}:{}", sn, addr, port);
        Ok(())
    }

    /// Gracefully close a TCP connection
    pub fn disconnect(&mut self, sn: u8) -> Result<(), SockError> {
        check_sn(sn)?;
        self.check_tcp(sn)?;
        if self.sn_status(sn) == SocketStatus::Closed {
            return Ok(());
        }
        self.command(sn, Command::Discon);
        if self.shadow[sn as usize].nonblock {
            return Err(SockError::Busy);
        }
        while self.sn_status(sn) != SocketStatus::Closed {
            if self.sn_interrupt(sn).contains(SockInt::TIMEOUT) {
                self.close_socket(sn);
                return Err(SockError::Timeout);
            }
            self.idle();
        }
        Ok(())
    }

    /// Queue `buf` on a connected TCP socket. Returns the bytes accepted,
    /// which is less than `buf.len()` when it exceeds the TX buffer.
    pub fn send(&mut self, sn: u8, buf: &[u8]) -> Result<usize, SockError> {
        check_sn(sn)?;
        if buf.is_empty() {
            return Err(SockError::DataLen);
        }
        let len = buf.len().min(self.tx_max(sn) as usize);
        let nonblock = self.shadow[sn as usize].nonblock;

        loop {
            let free = self.tx_free(sn) as usize;
            let status = self.sn_status(sn);
            if !is_connected(status) {
                if status == SocketStatus::Closed {
                    self.close_socket(sn);
                }
                return Err(SockError::SockStatus);
            }
            if len <= free {
                break;
            }
            if nonblock {
                return Err(SockError::Busy);
            }
            self.idle();
        }

        // The previous SEND must be confirmed before the next one is issued.
        // Checked before the copy so a busy return leaves the ring untouched.
        if self.shadow[sn as usize].sending {
            loop {
                let ir = self.sn_interrupt(sn);
                if ir.contains(SockInt::SENDOK) {
                    break;
                }
                let status = self.sn_status(sn);
                if !is_connected(status) {
                    if status == SocketStatus::Closed || ir.contains(SockInt::TIMEOUT) {
                        self.close_socket(sn);
                    }
                    return Err(SockError::SockStatus);
                }
                if nonblock {
                    return Err(SockError::Busy);
                }
                self.idle();
            }
            self.sn_clear_interrupt(sn, SockInt::SENDOK);
        }

        self.send_data(sn, &buf[..len]);
        self.command(sn, Command::Send);
        self.shadow[sn as usize].sending = true;
        Ok(len)
    }

    /// Read received TCP data into `buf`
    pub fn recv(&mut self, sn: u8, buf: &mut [u8]) -> Result<usize, SockError> {
        check_sn(sn)?;
        if buf.is_empty() {
            return Err(SockError::Buffer);
        }
        let len = buf.len().min(self.rx_max(sn) as usize);
        let nonblock = self.shadow[sn as usize].nonblock;

        let available = loop {
            let received = self.rx_received(sn) as usize;
            let status = self.sn_status(sn);
            if !is_connected(status) {
                if status == SocketStatus::Closed {
                    self.close_socket(sn);
                }
                return Err(SockError::SockStatus);
            }
            if received != 0 {
                break received;
            }
            if nonblock {
                return Err(SockError::Busy);
            }
            self.idle();
        };

        let len = len.min(available);
        self.recv_data(sn, &mut buf[..len]);
        self.command(sn, Command::Recv);
        Ok(len)
    }

    /// Send one datagram. MACRAW sockets ignore `addr` and `port`.
    ///
    /// Always waits for SENDOK or TIMEOUT once the datagram is queued,
    /// whatever the socket's I/O mode.
    pub fn sendto(&mut self, sn: u8, buf: &[u8], addr: IpAddress, port: u16) -> Result<usize, SockError> {
        check_sn(sn)?;
        if buf.is_empty() {
            return Err(SockError::DataLen);
        }
        let mr = self.sn_mode(sn);
        let protocol = Protocol::from_mr(mr).ok_or(SockError::SockMode)?;
        if !protocol.is_datagram() {
            return Err(SockError::SockMode);
        }

        let cmd = if protocol == Protocol::MacRaw {
            Command::Send
        } else {
            match addr {
                IpAddress::Ipv6(a) => {
                    if !protocol.accepts_ipv6() {
                        return Err(SockError::SockMode);
                    }
                    self.write_regs(regs::sock(sn, regs::SN_DIP6R), &a.octets());
                    Command::Send6
                }
                IpAddress::Ipv4(a) => {
                    if matches!(protocol, Protocol::Udp6 | Protocol::IpRaw6) {
                        return Err(SockError::SockMode);
                    }
                    self.write_regs(regs::sock(sn, regs::SN_DIPR), &a.octets());
                    Command::Send
                }
            }
        };
        if protocol.is_udp() {
            if port == 0 {
                return Err(SockError::PortZero);
            }
            self.sn_write16(sn, regs::SN_DPORTR, port);
        }

        let len = buf.len().min(self.tx_max(sn) as usize);
        let nonblock = self.shadow[sn as usize].nonblock;
        loop {
            let free = self.tx_free(sn) as usize;
            if self.sn_status(sn) == SocketStatus::Closed {
                return Err(SockError::SockClosed);
            }
            if len <= free {
                break;
            }
            if nonblock {
                return Err(SockError::Busy);
            }
            self.idle();
        }

        self.send_data(sn, &buf[..len]);
        self.command(sn, cmd);

        loop {
            let ir = self.sn_interrupt(sn);
            if ir.contains(SockInt::SENDOK) {
                self.sn_clear_interrupt(sn, SockInt::SENDOK);
                return Ok(len);
            }
            if ir.contains(SockInt::TIMEOUT) {
                self.sn_clear_interrupt(sn, SockInt::TIMEOUT);
                log::warn!(target: "w6100::socket", "sock {} sendto {} timed out", sn, addr);
                return Err(SockError::Timeout);
            }
            self.idle();
        }
    }

    /// Receive (part of) one datagram.
    ///
    /// A datagram larger than `buf` is handed out over several calls; the
    /// address header is parsed on the first one only.
    pub fn recvfrom(&mut self, sn: u8, buf: &mut [u8]) -> Result<Received, SockError> {
        check_sn(sn)?;
        if buf.is_empty() {
            return Err(SockError::Buffer);
        }
        let idx = sn as usize;
        let mut addr = None;
        let mut port = None;

        if self.shadow[idx].remained == 0 {
            let protocol = Protocol::from_mr(self.sn_mode(sn)).ok_or(SockError::SockMode)?;
            if !protocol.is_datagram() {
                return Err(SockError::SockMode);
            }
            loop {
                let pending = self.rx_received(sn);
                if self.sn_status(sn) == SocketStatus::Closed {
                    return Err(SockError::SockClosed);
                }
                if pending != 0 {
                    self.shadow[idx].pack_info = PackInfo::empty();
                    break;
                }
                if self.shadow[idx].nonblock {
                    return Err(SockError::Busy);
                }
                self.idle();
            }

            let mut head = [0u8; 2];
            self.recv_data(sn, &mut head);
            self.command(sn, Command::Recv);
            let pack_len = (((head[0] & 0x07) as u16) << 8) | head[1] as u16;

            if protocol == Protocol::MacRaw {
                if pack_len > MAX_MACRAW_FRAME {
                    log::error!(target: "w6100::socket", "sock {} macraw frame of {} bytes, closing", sn, pack_len);
                    self.close_socket(sn);
                    return Err(SockError::FatalPackLen);
                }
            } else {
                let info = PackInfo::from_bits_retain(head[0] & 0xF8);
                self.shadow[idx].pack_info = info;
                addr = Some(if info.contains(PackInfo::IPV6) {
                    let mut b = [0u8; 16];
                    self.recv_data(sn, &mut b);
                    IpAddress::Ipv6(Ipv6Address::from(b))
                } else {
                    let mut b = [0u8; 4];
                    self.recv_data(sn, &mut b);
                    IpAddress::Ipv4(Ipv4Address::from(b))
                });
                self.command(sn, Command::Recv);
            }

            self.shadow[idx].remained = pack_len;
            self.shadow[idx].pack_info.insert(PackInfo::FIRST);

            if protocol.is_udp() {
                let mut p = [0u8; 2];
                self.recv_data(sn, &mut p);
                port = Some(u16::from_be_bytes(p));
                self.command(sn, Command::Recv);
            }
        } else {
            self.shadow[idx].pack_info.remove(PackInfo::FIRST);
        }

        let len = buf.len().min(self.shadow[idx].remained as usize);
        self.recv_data(sn, &mut buf[..len]);
        self.command(sn, Command::Recv);

        let shadow = &mut self.shadow[idx];
        shadow.remained -= len as u16;
        if shadow.remained != 0 {
            shadow.pack_info.insert(PackInfo::REMAINED);
        } else {
            shadow.pack_info.remove(PackInfo::REMAINED);
            shadow.pack_info.insert(PackInfo::COMPLETED);
        }

        Ok(Received {
            len,
            addr,
            port,
            info: shadow.pack_info,
        })
    }

    /// Offset of the first occurrence of `pattern` in the unread RX data
    pub fn peek(&mut self, sn: u8, pattern: &[u8]) -> Result<Option<usize>, SockError> {
        check_sn(sn)?;
        let received = self.rx_received(sn);
        if received == 0 || pattern.is_empty() {
            return Ok(None);
        }
        let rd = self.sn_read16(sn, regs::SN_RX_RD);
        let mut start = 0;
        let mut matched = 0;
        while start + pattern.len() <= received as usize {
            let at = rd.wrapping_add((start + matched) as u16);
            if self.read_reg(regs::rxbuf(sn, at)) == pattern[matched] {
                matched += 1;
                if matched == pattern.len() {
                    return Ok(Some(start));
                }
            } else {
                start += 1;
                matched = 0;
            }
        }
        Ok(None)
    }

    /// Drop up to `len` unread bytes. Returns how many were dropped.
    pub fn discard(&mut self, sn: u8, len: u16) -> Result<u16, SockError> {
        check_sn(sn)?;
        let len = len.min(self.rx_received(sn));
        if len != 0 {
            self.recv_ignore(sn, len);
            self.command(sn, Command::Recv);
        }
        Ok(len)
    }

    pub(crate) fn check_tcp(&mut self, sn: u8) -> Result<(), SockError> {
        if self.sn_mode(sn) & 0x03 != 0x01 {
            return Err(SockError::SockMode);
        }
        Ok(())
    }

    fn local_ipv4(&mut self) -> Ipv4Address {
        Ipv4Address::from(self.read_regs::<4>(regs::common(regs::SIPR)))
    }

    fn local_lla(&mut self) -> Ipv6Address {
        Ipv6Address::from(self.read_regs::<16>(regs::common(regs::LLAR)))
    }
}
