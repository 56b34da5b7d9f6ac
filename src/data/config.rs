//! Calibration configuration
//!
//! Loaded from JSON:
//!
//! ```json
//! { "target_hz": 1000000, "tolerance": 0.02, "timeout_ms": 100,
//!   "device": { "family": "basic", "max_range_select": 7, "dco_resistor": false } }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::constants::{device, probe, window};
use crate::data::types::{DeviceFamily, FllFixedConfig, TargetWindow};
use crate::data::validation::{
    validate_max_range_select, validate_timeout, validate_tolerance, validate_window,
};
use crate::error::{DcoError, Result};

/// Device description used to pick the probe image and search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum DeviceProfile {
    Basic {
        max_range_select: u8,
        #[serde(default)]
        dco_resistor: bool,
    },
    FllPlus(FllFixedConfig),
}

impl DeviceProfile {
    /// F1xx basic clock module
    pub fn f1xx() -> Self {
        Self::Basic {
            max_range_select: device::F1XX_MAX_RANGE_SELECT,
            dco_resistor: false,
        }
    }

    /// F2xx basic clock module+
    pub fn f2xx() -> Self {
        Self::Basic {
            max_range_select: device::F2XX_MAX_RANGE_SELECT,
            dco_resistor: false,
        }
    }

    /// F4xx FLL+ clock module with default fixed registers
    pub fn f4xx() -> Self {
        Self::FllPlus(FllFixedConfig::default())
    }

    pub fn family(&self) -> DeviceFamily {
        match self {
            Self::Basic { .. } => DeviceFamily::Basic,
            Self::FllPlus(_) => DeviceFamily::FllPlus,
        }
    }
}

/// Parameters of one calibration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Nominal target frequency in Hz
    pub target_hz: u32,

    /// Relative tolerance around the target
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Timeout for a single probe run in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,

    pub device: DeviceProfile,
}

fn default_tolerance() -> f64 {
    window::DEFAULT_TOLERANCE
}

fn default_timeout_ms() -> u32 {
    probe::DEFAULT_TIMEOUT_MS
}

impl CalibrationConfig {
    pub fn new(target_hz: u32, device: DeviceProfile) -> Self {
        Self {
            target_hz,
            tolerance: default_tolerance(),
            timeout_ms: default_timeout_ms(),
            device,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Acceptance window derived from target and tolerance
    pub fn window(&self) -> TargetWindow {
        TargetWindow::from_tolerance(self.target_hz, self.tolerance)
    }

    /// Check every field, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.target_hz == 0 {
            return Err(DcoError::invalid_config("target_hz", "must be greater than 0"));
        }
        validate_tolerance(self.tolerance)?;
        validate_timeout(self.timeout_ms)?;
        if let DeviceProfile::Basic { max_range_select, .. } = self.device {
            validate_max_range_select(max_range_select)?;
        }
        let window = self.window();
        validate_window(window.fmin, window.fmax)
    }
}

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> Result<CalibrationConfig> {
    let content = fs::read_to_string(path).map_err(|e| DcoError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: CalibrationConfig = serde_json::from_str(&content)?;
    config.validate()?;
    debug!(path = %path.display(), target_hz = config.target_hz, "Loaded calibration config");
    Ok(config)
}
