//! Chip-wide control
//!
//! Subsystem locks, software reset, buffer allocation, the packed interrupt
//! view, system clock and the `ctlwizchip` dispatcher (which also forwards
//! the PHY operations from [`super::phy`]).

use super::phy::{PhyConf, PhyLink, PhyPower};
use super::{ChipState, CHIP_ID, W6100};
use crate::config::{Config, BUFFER_BUDGET};
use crate::device::Interface;
use crate::error::ChipError;
use crate::regs::{self, IntrKind, SysLock, SOCK_NUM};

/// System clock selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysClock {
    Mhz100,
    Mhz25,
}

/// `ctlwizchip` requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipCtl {
    Lock(SysLock),
    Unlock(SysLock),
    GetSysLock,
    Reset,
    Init {
        tx: Option<[u8; SOCK_NUM]>,
        rx: Option<[u8; SOCK_NUM]>,
    },
    GetInterrupt,
    ClearInterrupt(IntrKind),
    SetIntrMask(IntrKind),
    GetIntrMask,
    /// Interrupt pending time
    SetIntrTime(u16),
    GetIntrTime,
    SetIen(bool),
    GetIen,
    GetId,
    GetVersion,
    SetSysClock(SysClock),
    GetSysClock,
    ResetPhy,
    SetPhyConf(PhyConf),
    GetPhyConf,
    GetPhyStatus,
    SetPhyPower(PhyPower),
    GetPhyPower,
    GetPhyLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipCtlValue {
    Done,
    SysLock(SysLock),
    Interrupt(IntrKind),
    IntrTime(u16),
    Ien(bool),
    Id(&'static str),
    Version(u16),
    SysClock(SysClock),
    PhyConf(PhyConf),
    PhyPower(PhyPower),
    PhyLink(PhyLink),
}

fn check_budget(sizes: &Option<[u8; SOCK_NUM]>) -> Result<(), ChipError> {
    if let Some(sizes) = sizes {
        let total: u16 = sizes.iter().map(|&kb| kb as u16).sum();
        if total > BUFFER_BUDGET {
            return Err(ChipError::BufferBudget);
        }
    }
    Ok(())
}

impl<I: Interface> W6100<I> {
    /// Create a driver and apply `config`: idle hook, reset and buffer
    /// allocation, then network info, timeouts and interrupt mask.
    pub fn bring_up(io: I, config: &Config) -> Result<Self, ChipError> {
        let mut chip = Self::new(io).with_idle(config.idle);
        chip.init(config.tx_sizes, config.rx_sizes)?;

        if config.net_info.is_some() || config.timeout.is_some() {
            let locked = chip.sys_lock();
            chip.unlock(SysLock::NET);
            if let Some(info) = &config.net_info {
                chip.set_net_info(info);
            }
            if let Some(timeout) = &config.timeout {
                chip.set_timeout(timeout);
            }
            if locked.contains(SysLock::NET) {
                chip.lock(SysLock::NET);
            }
        }
        if let Some(mask) = config.interrupt_mask {
            chip.set_interrupt_mask(mask);
        }
        Ok(chip)
    }

    pub fn ctlwizchip(&mut self, ctl: ChipCtl) -> Result<ChipCtlValue, ChipError> {
        let value = match ctl {
            ChipCtl::Lock(which) => {
                self.lock(which);
                ChipCtlValue::Done
            }
            ChipCtl::Unlock(which) => {
                self.unlock(which);
                ChipCtlValue::Done
            }
            ChipCtl::GetSysLock => ChipCtlValue::SysLock(self.sys_lock()),
            ChipCtl::Reset => {
                self.sw_reset();
                ChipCtlValue::Done
            }
            ChipCtl::Init { tx, rx } => {
                self.init(tx, rx)?;
                ChipCtlValue::Done
            }
            ChipCtl::GetInterrupt => ChipCtlValue::Interrupt(self.interrupt()),
            ChipCtl::ClearInterrupt(kind) => {
                self.clear_interrupt(kind);
                ChipCtlValue::Done
            }
            ChipCtl::SetIntrMask(mask) => {
                self.set_interrupt_mask(mask);
                ChipCtlValue::Done
            }
            ChipCtl::GetIntrMask => ChipCtlValue::Interrupt(self.interrupt_mask()),
            ChipCtl::SetIntrTime(time) => {
                self.write_reg16(regs::common(regs::INTPTMR), time);
                ChipCtlValue::Done
            }
            ChipCtl::GetIntrTime => ChipCtlValue::IntrTime(self.read_reg16(regs::common(regs::INTPTMR))),
            ChipCtl::SetIen(enable) => {
                let sycr1 = self.read_reg(regs::common(regs::SYCR1));
                let sycr1 = if enable { sycr1 | regs::SYCR1_IEN } else { sycr1 & !regs::SYCR1_IEN };
                self.write_reg(regs::common(regs::SYCR1), sycr1);
                ChipCtlValue::Done
            }
            ChipCtl::GetIen => ChipCtlValue::Ien(self.read_reg(regs::common(regs::SYCR1)) & regs::SYCR1_IEN != 0),
            ChipCtl::GetId => ChipCtlValue::Id(CHIP_ID),
            ChipCtl::GetVersion => ChipCtlValue::Version(self.read_reg16(regs::common(regs::VER))),
            ChipCtl::SetSysClock(clock) => {
                let sycr1 = self.read_reg(regs::common(regs::SYCR1));
                let sycr1 = match clock {
                    SysClock::Mhz100 => sycr1 & !regs::SYCR1_CLKSEL,
                    SysClock::Mhz25 => sycr1 | regs::SYCR1_CLKSEL,
                };
                self.write_reg(regs::common(regs::SYCR1), sycr1);
                ChipCtlValue::Done
            }
            ChipCtl::GetSysClock => {
                if self.read_reg(regs::common(regs::SYCR1)) & regs::SYCR1_CLKSEL != 0 {
                    ChipCtlValue::SysClock(SysClock::Mhz25)
                } else {
                    ChipCtlValue::SysClock(SysClock::Mhz100)
                }
            }
            ChipCtl::ResetPhy => {
                self.phy_reset();
                ChipCtlValue::Done
            }
            ChipCtl::SetPhyConf(conf) => {
                self.set_phy_conf(&conf);
                ChipCtlValue::Done
            }
            ChipCtl::GetPhyConf => ChipCtlValue::PhyConf(self.phy_conf()),
            ChipCtl::GetPhyStatus => ChipCtlValue::PhyConf(self.phy_status()),
            ChipCtl::SetPhyPower(power) => {
                self.set_phy_power(power);
                ChipCtlValue::Done
            }
            ChipCtl::GetPhyPower => ChipCtlValue::PhyPower(self.phy_power()),
            ChipCtl::GetPhyLink => ChipCtlValue::PhyLink(self.phy_link()),
        };
        Ok(value)
    }

    // =========================================================================
    // LOCKS
    // =========================================================================

    pub fn lock(&mut self, which: SysLock) {
        if which.contains(SysLock::CHIP) {
            self.write_reg(regs::common(regs::CHPLCKR), regs::LOCK_KEY);
        }
        if which.contains(SysLock::NET) {
            self.write_reg(regs::common(regs::NETLCKR), regs::NETLCKR_LOCK);
        }
        if which.contains(SysLock::PHY) {
            self.write_reg(regs::common(regs::PHYLCKR), regs::LOCK_KEY);
        }
    }

    pub fn unlock(&mut self, which: SysLock) {
        if which.contains(SysLock::CHIP) {
            self.write_reg(regs::common(regs::CHPLCKR), regs::CHPLCKR_UNLOCK);
        }
        if which.contains(SysLock::NET) {
            self.write_reg(regs::common(regs::NETLCKR), regs::NETLCKR_UNLOCK);
        }
        if which.contains(SysLock::PHY) {
            self.write_reg(regs::common(regs::PHYLCKR), regs::PHYLCKR_UNLOCK);
        }
    }

    /// Subsystems currently locked
    pub fn sys_lock(&mut self) -> SysLock {
        SysLock::from_bits_truncate(self.read_reg(regs::common(regs::SYSR)) >> 5)
    }

    // =========================================================================
    // RESET / INIT
    // =========================================================================

    /// Soft-reset the chip. Network addresses and the chip/network lock
    /// state survive the reset.
    pub fn sw_reset(&mut self) {
        let sysr = self.read_reg(regs::common(regs::SYSR));
        self.write_reg(regs::common(regs::CHPLCKR), regs::CHPLCKR_UNLOCK);

        let mac = self.read_regs::<6>(regs::common(regs::SHAR));
        let gw = self.read_regs::<4>(regs::common(regs::GAR));
        let sn = self.read_regs::<4>(regs::common(regs::SUBR));
        let ip = self.read_regs::<4>(regs::common(regs::SIPR));
        let gw6 = self.read_regs::<16>(regs::common(regs::GA6R));
        let sn6 = self.read_regs::<16>(regs::common(regs::SUB6R));
        let lla = self.read_regs::<16>(regs::common(regs::LLAR));
        let gua = self.read_regs::<16>(regs::common(regs::GUAR));

        self.write_reg(regs::common(regs::SYCR0), regs::SYCR0_RST);
        // read back to let the reset settle
        let _ = self.read_reg(regs::common(regs::SYCR0));

        self.write_reg(regs::common(regs::NETLCKR), regs::NETLCKR_UNLOCK);
        self.write_regs(regs::common(regs::SHAR), &mac);
        self.write_regs(regs::common(regs::GAR), &gw);
        self.write_regs(regs::common(regs::SUBR), &sn);
        self.write_regs(regs::common(regs::SIPR), &ip);
        self.write_regs(regs::common(regs::GA6R), &gw6);
        self.write_regs(regs::common(regs::SUB6R), &sn6);
        self.write_regs(regs::common(regs::LLAR), &lla);
        self.write_regs(regs::common(regs::GUAR), &gua);

        if sysr & regs::SYSR_CHPL != 0 {
            self.write_reg(regs::common(regs::CHPLCKR), regs::LOCK_KEY);
        }
        if sysr & regs::SYSR_NETL != 0 {
            self.write_reg(regs::common(regs::NETLCKR), regs::NETLCKR_LOCK);
        }
        log::debug!(target: "w6100::chip", "soft reset");
    }

    /// Reset the chip and allocate per-socket buffers (KB).
    ///
    /// Both arrays are checked before any size register is written, so a
    /// rejected allocation leaves the current one in place.
    pub fn init(
        &mut self,
        tx: Option<[u8; SOCK_NUM]>,
        rx: Option<[u8; SOCK_NUM]>,
    ) -> Result<(), ChipError> {
        self.sw_reset();
        check_budget(&tx)?;
        check_budget(&rx)?;

        if let Some(tx) = tx {
            for (sn, &kb) in tx.iter().enumerate() {
                self.sn_write(sn as u8, regs::SN_TX_BSR, kb);
            }
        }
        if let Some(rx) = rx {
            for (sn, &kb) in rx.iter().enumerate() {
                self.sn_write(sn as u8, regs::SN_RX_BSR, kb);
            }
        }
        self.state = ChipState::Configured;
        log::debug!(target: "w6100::chip", "init tx {:?} rx {:?}", tx, rx);
        Ok(())
    }

    // =========================================================================
    // INTERRUPTS
    // =========================================================================

    pub fn interrupt(&mut self) -> IntrKind {
        let ir = self.read_reg(regs::common(regs::IR));
        let sir = self.read_reg(regs::common(regs::SIR));
        let slir = self.read_reg(regs::common(regs::SLIR));
        IntrKind::from_parts(ir, sir, slir)
    }

    /// Clear IR and SLIR bits, and every bit of each flagged socket
    pub fn clear_interrupt(&mut self, kind: IntrKind) {
        self.write_reg(regs::common(regs::IRCLR), kind.ir());
        let sir = kind.sir();
        for sn in 0..SOCK_NUM as u8 {
            if sir & (1 << sn) != 0 {
                self.sn_write(sn, regs::SN_IRCLR, 0xFF);
            }
        }
        self.write_reg(regs::common(regs::SLIRCLR), kind.slir());
    }

    pub fn set_interrupt_mask(&mut self, mask: IntrKind) {
        self.write_reg(regs::common(regs::IMR), mask.ir());
        self.write_reg(regs::common(regs::SIMR), mask.sir());
        self.write_reg(regs::common(regs::SLIMR), mask.slir());
    }

    pub fn interrupt_mask(&mut self) -> IntrKind {
        let imr = self.read_reg(regs::common(regs::IMR));
        let simr = self.read_reg(regs::common(regs::SIMR));
        let slimr = self.read_reg(regs::common(regs::SLIMR));
        IntrKind::from_parts(imr, simr, slimr)
    }
}
