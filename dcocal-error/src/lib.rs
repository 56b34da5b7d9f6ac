//! Unified error handling for dcocal
//!
//! This crate provides a single error type used by the probe, the calibrators
//! and the configuration layer. Transport failures are kept distinct from
//! search failures so callers can tell a lost link apart from a device that
//! cannot reach the requested frequency.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias using DcoError
pub type Result<T> = std::result::Result<T, DcoError>;

/// Why a calibration search gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationFailure {
    /// Every reachable setting measured below the window
    TooSlow,
    /// Every reachable setting measured above the window
    TooFast,
    /// The iteration cap was hit before a setting landed in the window
    NotConverged,
    /// Binary search closed its interval outside the window
    Unreachable,
}

impl fmt::Display for CalibrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TooSlow => "target not reachable, device too slow at this setting",
            Self::TooFast => "target not reachable, device too fast at this setting",
            Self::NotConverged => "tolerance too tight or search did not converge",
            Self::Unreachable => "target not reachable",
        };
        f.write_str(text)
    }
}

/// Unified error type for all dcocal operations
#[derive(thiserror::Error, Debug)]
pub enum DcoError {
    // ============================================================================
    // Debug Link Errors
    // ============================================================================
    #[error("Debug link failure during {operation}: {reason}")]
    Transport {
        operation: String,
        reason: String,
    },

    #[error("Probe did not finish within {timeout_ms} ms")]
    Timeout {
        timeout_ms: u32,
    },

    // ============================================================================
    // Measurement Errors
    // ============================================================================
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(String),

    #[error("Value {value:#04x} does not fit {register} ({bits} bits)")]
    InvalidSetting {
        register: &'static str,
        value: u8,
        bits: u8,
    },

    #[error("Probe image is for {image} devices, setting is for {setting} devices")]
    FamilyMismatch {
        image: &'static str,
        setting: &'static str,
    },

    // ============================================================================
    // Calibration Errors
    // ============================================================================
    #[error("Calibration failed: {reason} (last frequency {last_frequency_hz} Hz at {last_setting})")]
    Calibration {
        reason: CalibrationFailure,
        last_frequency_hz: u32,
        last_setting: String,
    },

    #[error("Invalid frequency window: fmin {fmin} Hz > fmax {fmax} Hz")]
    InvalidWindow {
        fmin: u32,
        fmax: u32,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },
}

impl DcoError {
    /// Create a transport error for a failed link operation
    pub fn transport(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a calibration failure carrying the last measurement
    pub fn calibration(
        reason: CalibrationFailure,
        last_frequency_hz: u32,
        last_setting: impl Into<String>,
    ) -> Self {
        Self::Calibration {
            reason,
            last_frequency_hz,
            last_setting: last_setting.into(),
        }
    }

    /// True for failures of the debug link itself (never retried)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// The search failure reason, if this is a calibration error
    pub fn calibration_failure(&self) -> Option<CalibrationFailure> {
        match self {
            Self::Calibration { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
