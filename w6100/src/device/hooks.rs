//! Critical-section and chip-select callbacks
//!
//! Every slot starts as a no-op. Registering `None` for a slot puts the
//! no-op back, so callers can override any subset.

fn noop() {}

/// Callback table wrapped around every chip transaction
#[derive(Debug, Clone, Copy)]
pub struct Hooks {
    cris_enter: fn(),
    cris_exit: fn(),
    cs_select: fn(),
    cs_deselect: fn(),
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

impl Hooks {
    pub const fn new() -> Self {
        Self {
            cris_enter: noop,
            cris_exit: noop,
            cs_select: noop,
            cs_deselect: noop,
        }
    }

    pub fn register_critical_section(&mut self, enter: Option<fn()>, exit: Option<fn()>) {
        self.cris_enter = enter.unwrap_or(noop);
        self.cris_exit = exit.unwrap_or(noop);
    }

    pub fn register_chip_select(&mut self, select: Option<fn()>, deselect: Option<fn()>) {
        self.cs_select = select.unwrap_or(noop);
        self.cs_deselect = deselect.unwrap_or(noop);
    }

    pub fn with_critical_section(mut self, enter: Option<fn()>, exit: Option<fn()>) -> Self {
        self.register_critical_section(enter, exit);
        self
    }

    pub fn with_chip_select(mut self, select: Option<fn()>, deselect: Option<fn()>) -> Self {
        self.register_chip_select(select, deselect);
        self
    }

    /// Run `f` inside the critical section with the chip selected
    #[inline]
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        (self.cris_enter)();
        (self.cs_select)();
        let r = f();
        (self.cs_deselect)();
        (self.cris_exit)();
        r
    }
}
