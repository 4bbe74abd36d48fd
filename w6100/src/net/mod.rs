//! Socket layer
//!
//! The Berkeley-style API over the chip's eight hardware sockets. All calls
//! are methods on [`W6100`](crate::W6100) taking the socket number first.

pub mod options;
pub mod socket;
pub mod stream;

pub use options::{GetSockOpt, SetSockOpt, SockIoMode, SockOptValue, SocketCtl, SocketCtlValue};
pub use socket::Received;
pub use stream::TcpStream;
