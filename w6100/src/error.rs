//! Driver error types
//!
//! Both enums keep the chip library's numeric sentinel available through
//! `code()` so results can be handed to code that expects the C-style
//! return values.

use core::fmt;

use crate::regs::SlInterrupt;

/// Success sentinel of the socket layer
pub const SOCK_OK: i32 = 1;

/// Socket layer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockError {
    /// Non-blocking call cannot complete yet; retry later
    Busy,
    /// Socket number out of range
    SockNum,
    /// Option not valid in the current socket state
    SockOpt,
    /// Socket not initialized, or no local address for TCP
    SockInit,
    /// Socket closed unexpectedly
    SockClosed,
    /// Operation not valid for the socket's protocol
    SockMode,
    /// Invalid open flags for the protocol
    SockFlag,
    /// Socket status does not allow the operation
    SockStatus,
    /// Invalid argument
    Arg,
    /// Port zero
    PortZero,
    /// Unspecified or mismatched address
    IpInvalid,
    /// Hardware timeout interrupt
    Timeout,
    /// Zero-length data
    DataLen,
    /// Buffer too small for the operation
    Buffer,
    /// Received frame larger than any valid MACRAW frame; socket was closed
    FatalPackLen,
}

impl SockError {
    /// Numeric sentinel of this error
    pub const fn code(self) -> i32 {
        match self {
            SockError::Busy => 0,
            SockError::SockNum => -1,
            SockError::SockOpt => -2,
            SockError::SockInit => -3,
            SockError::SockClosed => -4,
            SockError::SockMode => -5,
            SockError::SockFlag => -6,
            SockError::SockStatus => -7,
            SockError::Arg => -10,
            SockError::PortZero => -11,
            SockError::IpInvalid => -12,
            SockError::Timeout => -13,
            SockError::DataLen => -14,
            SockError::Buffer => -15,
            SockError::FatalPackLen => -1001,
        }
    }

    pub const fn is_busy(self) -> bool {
        matches!(self, SockError::Busy)
    }

    pub const fn is_fatal(self) -> bool {
        self.code() <= -1000
    }
}

impl fmt::Display for SockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SockError::Busy => "busy",
            SockError::SockNum => "invalid socket number",
            SockError::SockOpt => "invalid socket option",
            SockError::SockInit => "socket not initialized",
            SockError::SockClosed => "socket closed",
            SockError::SockMode => "invalid socket mode",
            SockError::SockFlag => "invalid socket flag",
            SockError::SockStatus => "invalid socket status",
            SockError::Arg => "invalid argument",
            SockError::PortZero => "port is zero",
            SockError::IpInvalid => "invalid ip address",
            SockError::Timeout => "timeout",
            SockError::DataLen => "invalid data length",
            SockError::Buffer => "buffer too small",
            SockError::FatalPackLen => "fatal: packet length exceeds frame size",
        };
        write!(f, "{} ({})", msg, self.code())
    }
}

impl embedded_io::Error for SockError {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind;
        match self {
            SockError::Timeout => ErrorKind::TimedOut,
            SockError::SockClosed => ErrorKind::ConnectionReset,
            SockError::SockStatus | SockError::SockInit => ErrorKind::NotConnected,
            SockError::Arg
            | SockError::SockNum
            | SockError::SockFlag
            | SockError::SockMode
            | SockError::PortZero
            | SockError::IpInvalid
            | SockError::DataLen => ErrorKind::InvalidInput,
            SockError::FatalPackLen => ErrorKind::InvalidData,
            _ => ErrorKind::Other,
        }
    }
}

/// Chip control errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipError {
    /// Buffer size arrays exceed the chip's buffer budget
    BufferBudget,
    /// A network service finished without its success bit; carries what fired
    Service(SlInterrupt),
    /// No router advertisement prefix is pending
    NoPrefix,
    /// Argument or register value outside the accepted range
    Arg,
}

impl ChipError {
    pub const fn code(self) -> i32 {
        -1
    }
}

impl fmt::Display for ChipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChipError::BufferBudget => write!(f, "buffer sizes exceed budget"),
            ChipError::Service(fired) => write!(f, "network service failed (SLIR {:#04x})", fired.bits()),
            ChipError::NoPrefix => write!(f, "no prefix pending"),
            ChipError::Arg => write!(f, "invalid argument"),
        }
    }
}
