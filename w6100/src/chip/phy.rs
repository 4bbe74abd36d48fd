//! Embedded PHY control
//!
//! The PHY is reached either through the chip's own PHY registers
//! (PHYCR0/PHYCR1/PHYSR, the default) or through the MDIO bridge with
//! standard MII registers (`phy-mdio` feature). Status always comes from
//! PHYSR since that reflects the negotiated result.

use super::W6100;
use crate::device::Interface;
use crate::regs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyMode {
    Manual,
    AutoNego,
    /// 10BASE-Te
    Te,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhySpeed {
    Mbps10,
    Mbps100,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyDuplex {
    Half,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhyConf {
    pub mode: PhyMode,
    /// Ignored unless `mode` is `Manual`
    pub speed: PhySpeed,
    pub duplex: PhyDuplex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyPower {
    Normal,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyLink {
    Off,
    On,
}

impl<I: Interface> W6100<I> {
    fn phycr1(&mut self) -> u8 {
        self.read_reg(regs::common(regs::PHYCR1))
    }

    fn set_phycr1(&mut self, value: u8) {
        self.write_reg(regs::common(regs::PHYCR1), value)
    }

    fn te_enabled(&mut self) -> bool {
        self.phycr1() & regs::PHYCR1_TE != 0
    }

    /// Negotiated mode, speed and duplex as reported by PHYSR
    pub fn phy_status(&mut self) -> PhyConf {
        let sr = self.read_reg(regs::common(regs::PHYSR));
        let mode = if self.te_enabled() {
            PhyMode::Te
        } else if sr & regs::PHYSR_MANUAL != 0 {
            PhyMode::Manual
        } else {
            PhyMode::AutoNego
        };
        PhyConf {
            mode,
            speed: if sr & regs::PHYSR_SPD != 0 { PhySpeed::Mbps10 } else { PhySpeed::Mbps100 },
            duplex: if sr & regs::PHYSR_DPX != 0 { PhyDuplex::Half } else { PhyDuplex::Full },
        }
    }
}

// =============================================================================
// REGISTER-MAPPED PHY
// =============================================================================

#[cfg(not(feature = "phy-mdio"))]
impl<I: Interface> W6100<I> {
    /// Pulse the PHY reset bit. PHYCR1 sits behind the PHY lock, which is
    /// opened for the write and closed again afterwards.
    pub fn phy_reset(&mut self) {
        let value = self.phycr1() | regs::PHYCR1_RST;
        self.write_reg(regs::common(regs::PHYLCKR), regs::PHYLCKR_UNLOCK);
        self.set_phycr1(value);
        self.write_reg(regs::common(regs::PHYLCKR), regs::LOCK_KEY);
        log::debug!(target: "w6100::phy", "phy reset");
    }

    pub fn set_phy_conf(&mut self, conf: &PhyConf) {
        let cr0 = if conf.mode == PhyMode::Te {
            let cr1 = self.phycr1() | regs::PHYCR1_TE;
            self.set_phycr1(cr1);
            regs::PHYCR0_AUTO
        } else {
            let cr1 = self.phycr1() & !regs::PHYCR1_TE;
            self.set_phycr1(cr1);
            match conf.mode {
                PhyMode::AutoNego => regs::PHYCR0_AUTO,
                _ => {
                    let mut v = regs::PHYCR0_MANUAL;
                    if conf.speed == PhySpeed::Mbps10 {
                        v |= regs::PHYCR0_10M;
                    }
                    if conf.duplex == PhyDuplex::Half {
                        v |= regs::PHYCR0_HALF;
                    }
                    v
                }
            }
        };
        self.write_reg(regs::common(regs::PHYCR0), cr0);
    }

    pub fn phy_conf(&mut self) -> PhyConf {
        self.phy_status()
    }

    pub fn set_phy_power(&mut self, power: PhyPower) {
        let mut cr1 = self.phycr1();
        match power {
            PhyPower::Down => cr1 |= regs::PHYCR1_PWDN,
            PhyPower::Normal => cr1 &= !regs::PHYCR1_PWDN,
        }
        self.set_phycr1(cr1);
    }

    pub fn phy_power(&mut self) -> PhyPower {
        if self.phycr1() & regs::PHYCR1_PWDN != 0 {
            PhyPower::Down
        } else {
            PhyPower::Normal
        }
    }

    pub fn phy_link(&mut self) -> PhyLink {
        if self.read_reg(regs::common(regs::PHYSR)) & regs::PHYSR_LNK != 0 {
            PhyLink::On
        } else {
            PhyLink::Off
        }
    }
}

// =============================================================================
// MDIO-MAPPED PHY
// =============================================================================

#[cfg(feature = "phy-mdio")]
impl<I: Interface> W6100<I> {
    fn wait_mdio(&mut self) {
        while self.read_reg(regs::common(regs::PHYACR)) != 0 {
            self.idle();
        }
    }

    /// Write MII register `reg` through the MDIO bridge
    pub fn mdio_write(&mut self, reg: u8, value: u16) {
        self.write_reg(regs::common(regs::PHYRAR), reg);
        self.write_reg16(regs::common(regs::PHYDIR), value);
        self.write_reg(regs::common(regs::PHYACR), regs::PHYACR_WRITE);
        self.wait_mdio();
    }

    /// Read MII register `reg` through the MDIO bridge
    pub fn mdio_read(&mut self, reg: u8) -> u16 {
        self.write_reg(regs::common(regs::PHYRAR), reg);
        self.write_reg(regs::common(regs::PHYACR), regs::PHYACR_READ);
        self.wait_mdio();
        self.read_reg16(regs::common(regs::PHYDOR))
    }

    /// Set BMCR reset and wait for the PHY to clear it
    pub fn phy_reset(&mut self) {
        let bmcr = self.mdio_read(regs::MII_BMCR);
        self.mdio_write(regs::MII_BMCR, bmcr | regs::BMCR_RST);
        while self.mdio_read(regs::MII_BMCR) & regs::BMCR_RST != 0 {
            self.idle();
        }
        log::debug!(target: "w6100::phy", "phy reset");
    }

    pub fn set_phy_conf(&mut self, conf: &PhyConf) {
        let mut bmcr = self.mdio_read(regs::MII_BMCR);
        if conf.mode == PhyMode::Te {
            let cr1 = self.phycr1() | regs::PHYCR1_TE;
            self.set_phycr1(cr1);
            self.write_reg(regs::common(regs::PHYCR0), regs::PHYCR0_AUTO);
            return;
        }
        let cr1 = self.phycr1() & !regs::PHYCR1_TE;
        self.set_phycr1(cr1);
        if conf.mode == PhyMode::AutoNego {
            bmcr |= regs::BMCR_ANE;
        } else {
            bmcr &= !(regs::BMCR_ANE | regs::BMCR_DPX | regs::BMCR_SPD);
            if conf.duplex == PhyDuplex::Full {
                bmcr |= regs::BMCR_DPX;
            }
            if conf.speed == PhySpeed::Mbps100 {
                bmcr |= regs::BMCR_SPD;
            }
        }
        self.mdio_write(regs::MII_BMCR, bmcr);
    }

    /// Configured (not negotiated) settings from BMCR
    pub fn phy_conf(&mut self) -> PhyConf {
        let bmcr = self.mdio_read(regs::MII_BMCR);
        let mode = if self.te_enabled() {
            PhyMode::Te
        } else if bmcr & regs::BMCR_ANE != 0 {
            PhyMode::AutoNego
        } else {
            PhyMode::Manual
        };
        PhyConf {
            mode,
            speed: if bmcr & regs::BMCR_SPD != 0 { PhySpeed::Mbps100 } else { PhySpeed::Mbps10 },
            duplex: if bmcr & regs::BMCR_DPX != 0 { PhyDuplex::Full } else { PhyDuplex::Half },
        }
    }

    pub fn set_phy_power(&mut self, power: PhyPower) {
        let mut bmcr = self.mdio_read(regs::MII_BMCR);
        match power {
            PhyPower::Down => bmcr |= regs::BMCR_PWDN,
            PhyPower::Normal => bmcr &= !regs::BMCR_PWDN,
        }
        self.mdio_write(regs::MII_BMCR, bmcr);
    }

    pub fn phy_power(&mut self) -> PhyPower {
        if self.mdio_read(regs::MII_BMCR) & regs::BMCR_PWDN != 0 {
            PhyPower::Down
        } else {
            PhyPower::Normal
        }
    }

    pub fn phy_link(&mut self) -> PhyLink {
        if self.mdio_read(regs::MII_BMSR) & regs::BMSR_LINK != 0 {
            PhyLink::On
        } else {
            PhyLink::Off
        }
    }
}
