//! Driver configuration
//!
//! Start-up settings applied once by [`W6100::bring_up`](crate::W6100::bring_up),
//! plus the constants the socket layer is built around.

use crate::chip::network::{NetInfo, NetTimeout};
use crate::regs::{IntrKind, SOCK_NUM};

// =============================================================================
// CONSTANTS
// =============================================================================

/// First port handed out when a socket is opened with port 0
pub const EPHEMERAL_PORT_START: u16 = 0x0400;

/// The ephemeral counter wraps back to the start on reaching this value
pub const EPHEMERAL_PORT_END: u16 = 0xFFF0;

/// Largest frame a MACRAW socket can legitimately receive
pub const MAX_MACRAW_FRAME: u16 = 1514;

/// Per-socket buffer size (KB) used when none is configured
pub const DEFAULT_BUFFER_KB: [u8; SOCK_NUM] = [2; SOCK_NUM];

/// Sum of per-socket buffer sizes accepted by `init`
pub const BUFFER_BUDGET: u16 = 2 * SOCK_NUM as u16;

// =============================================================================
// START-UP CONFIGURATION
// =============================================================================

/// Optional start-up settings; anything left `None` keeps the chip's value
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    pub idle: Option<fn()>,
    pub tx_sizes: Option<[u8; SOCK_NUM]>,
    pub rx_sizes: Option<[u8; SOCK_NUM]>,
    pub net_info: Option<NetInfo>,
    pub timeout: Option<NetTimeout>,
    pub interrupt_mask: Option<IntrKind>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idle(mut self, idle: fn()) -> Self {
        self.idle = Some(idle);
        self
    }

    pub fn buffers(mut self, tx: [u8; SOCK_NUM], rx: [u8; SOCK_NUM]) -> Self {
        self.tx_sizes = Some(tx);
        self.rx_sizes = Some(rx);
        self
    }

    pub fn net_info(mut self, info: NetInfo) -> Self {
        self.net_info = Some(info);
        self
    }

    pub fn timeout(mut self, timeout: NetTimeout) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn interrupt_mask(mut self, mask: IntrKind) -> Self {
        self.interrupt_mask = Some(mask);
        self
    }
}
