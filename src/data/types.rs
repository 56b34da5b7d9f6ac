//! Core data types for dcocal
//!
//! Register settings for both clock module families, probe results and
//! calibration outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{binary, window};

/// Clock module generation of the target device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFamily {
    /// Basic clock module (F1xx/F2xx): DCOCTL, BCSCTL1, BCSCTL2
    Basic,
    /// FLL+ clock module (F4xx): SCFI0, SCFI1, SCFQCTL, FLL_CTL0, FLL_CTL1
    FllPlus,
}

impl DeviceFamily {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Basic => "basic clock",
            Self::FllPlus => "FLL+",
        }
    }
}

/// Basic clock module registers under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicSetting {
    /// DCOCTL: DCOx in bits 5-7, MODx in bits 0-4
    pub dco: u8,
    /// RSELx, written to BCSCTL1
    pub range_select: u8,
    /// BCSCTL2 value; non-zero selects the external DCO resistor
    pub dco_resistor: u8,
}

/// FLL+ clock module registers under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FllSetting {
    pub scfi0: u8,
    pub scfi1: u8,
    pub scfqctl: u8,
    pub fll_ctl0: u8,
    pub fll_ctl1: u8,
}

/// FLL+ registers that stay constant during a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FllFixedConfig {
    #[serde(default = "default_scfqctl")]
    pub scfqctl: u8,
    #[serde(default = "default_fll_ctl0")]
    pub fll_ctl0: u8,
    #[serde(default = "default_fll_ctl1")]
    pub fll_ctl1: u8,
}

fn default_scfqctl() -> u8 {
    binary::DEFAULT_SCFQCTL
}

fn default_fll_ctl0() -> u8 {
    binary::DEFAULT_FLL_CTL0
}

fn default_fll_ctl1() -> u8 {
    binary::DEFAULT_FLL_CTL1
}

impl Default for FllFixedConfig {
    fn default() -> Self {
        Self {
            scfqctl: default_scfqctl(),
            fll_ctl0: default_fll_ctl0(),
            fll_ctl1: default_fll_ctl1(),
        }
    }
}

impl FllFixedConfig {
    /// Full register set for one point of the combined index
    pub fn setting(&self, scfi0: u8, scfi1: u8) -> FllSetting {
        FllSetting {
            scfi0,
            scfi1,
            scfqctl: self.scfqctl,
            fll_ctl0: self.fll_ctl0,
            fll_ctl1: self.fll_ctl1,
        }
    }
}

/// Oscillator control register values for one probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum RegisterSetting {
    Basic(BasicSetting),
    FllPlus(FllSetting),
}

impl RegisterSetting {
    pub fn family(&self) -> DeviceFamily {
        match self {
            Self::Basic(_) => DeviceFamily::Basic,
            Self::FllPlus(_) => DeviceFamily::FllPlus,
        }
    }

    /// Register values in probe patch order
    pub fn components(&self) -> Vec<u8> {
        match self {
            Self::Basic(s) => vec![s.dco, s.range_select, s.dco_resistor],
            Self::FllPlus(s) => vec![s.scfi0, s.scfi1, s.scfqctl, s.fll_ctl0, s.fll_ctl1],
        }
    }

    /// Inverse of `components`
    pub fn from_components(family: DeviceFamily, values: &[u8]) -> Option<Self> {
        match (family, values) {
            (DeviceFamily::Basic, &[dco, range_select, dco_resistor]) => {
                Some(Self::Basic(BasicSetting { dco, range_select, dco_resistor }))
            }
            (DeviceFamily::FllPlus, &[scfi0, scfi1, scfqctl, fll_ctl0, fll_ctl1]) => {
                Some(Self::FllPlus(FllSetting { scfi0, scfi1, scfqctl, fll_ctl0, fll_ctl1 }))
            }
            _ => None,
        }
    }
}

impl From<BasicSetting> for RegisterSetting {
    fn from(setting: BasicSetting) -> Self {
        Self::Basic(setting)
    }
}

impl From<FllSetting> for RegisterSetting {
    fn from(setting: FllSetting) -> Self {
        Self::FllPlus(setting)
    }
}

impl fmt::Display for RegisterSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(s) => write!(
                f,
                "DCOCTL={:#04x} RSEL={} BCSCTL2={:#04x}",
                s.dco, s.range_select, s.dco_resistor
            ),
            Self::FllPlus(s) => write!(
                f,
                "SCFI0={:#04x} SCFI1={:#04x} SCFQCTL={:#04x} FLL_CTL0={:#04x} FLL_CTL1={:#04x}",
                s.scfi0, s.scfi1, s.scfqctl, s.fll_ctl0, s.fll_ctl1
            ),
        }
    }
}

/// Result of one probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub frequency_hz: u32,
    /// Wall-clock execution time measured by the host, in milliseconds
    pub elapsed_ms: u32,
}

/// Acceptance window `[fmin, fmax]` in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetWindow {
    pub fmin: u32,
    pub fmax: u32,
}

impl TargetWindow {
    pub fn new(fmin: u32, fmax: u32) -> Self {
        Self { fmin, fmax }
    }

    /// Window of `target_hz * (1 - tolerance) ..= target_hz * (1 + tolerance)`
    ///
    /// The lower edge is rounded down and the upper edge up, so the window
    /// never excludes a frequency the tolerance admits.
    pub fn from_tolerance(target_hz: u32, tolerance: f64) -> Self {
        let target = f64::from(target_hz);
        let fmin = (target * (1.0 - tolerance)).floor().max(0.0);
        let fmax = (target * (1.0 + tolerance)).ceil().min(f64::from(u32::MAX));
        Self {
            fmin: fmin as u32,
            fmax: fmax as u32,
        }
    }

    pub fn contains(&self, frequency_hz: u32) -> bool {
        self.fmin <= frequency_hz && frequency_hz <= self.fmax
    }
}

impl Default for TargetWindow {
    fn default() -> Self {
        Self::from_tolerance(1_000_000, window::DEFAULT_TOLERANCE)
    }
}

/// Result of a basic clock module calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearOutcome {
    pub frequency_hz: u32,
    pub dco: u8,
    pub range_select: u8,
    pub dco_resistor: bool,
    /// Probe runs spent on the search
    pub measurements: u32,
}

/// Result of an FLL+ calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryOutcome {
    pub frequency_hz: u32,
    pub scfi0: u8,
    pub scfi1: u8,
    pub fixed: FllFixedConfig,
    /// Probe runs spent, including the confirmation run
    pub measurements: u32,
}

/// Result of a calibration run of either family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum CalibrationOutcome {
    Basic(LinearOutcome),
    FllPlus(BinaryOutcome),
}

impl CalibrationOutcome {
    pub fn frequency_hz(&self) -> u32 {
        match self {
            Self::Basic(o) => o.frequency_hz,
            Self::FllPlus(o) => o.frequency_hz,
        }
    }

    pub fn measurements(&self) -> u32 {
        match self {
            Self::Basic(o) => o.measurements,
            Self::FllPlus(o) => o.measurements,
        }
    }

    /// Register values to program into the device
    pub fn setting(&self) -> RegisterSetting {
        match self {
            Self::Basic(o) => RegisterSetting::Basic(BasicSetting {
                dco: o.dco,
                range_select: o.range_select,
                dco_resistor: u8::from(o.dco_resistor),
            }),
            Self::FllPlus(o) => RegisterSetting::FllPlus(o.fixed.setting(o.scfi0, o.scfi1)),
        }
    }
}
