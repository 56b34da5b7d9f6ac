//! Input validation
//!
//! Checks frequency windows and device parameters before any probe runs.

use crate::constants::linear;
use crate::error::{DcoError, Result};

/// Validate that a window is well-formed (`fmin <= fmax`)
pub fn validate_window(fmin: u32, fmax: u32) -> Result<()> {
    if fmin > fmax {
        return Err(DcoError::InvalidWindow { fmin, fmax });
    }
    Ok(())
}

/// Validate a relative tolerance (0.0 <= tolerance < 1.0)
pub fn validate_tolerance(tolerance: f64) -> Result<()> {
    if !tolerance.is_finite() || !(0.0..1.0).contains(&tolerance) {
        return Err(DcoError::invalid_config(
            "tolerance",
            format!("{} (must be 0.0 <= tolerance < 1.0)", tolerance),
        ));
    }
    Ok(())
}

/// Validate the highest RSELx value a basic clock module supports
pub fn validate_max_range_select(max_range_select: u8) -> Result<()> {
    if max_range_select > linear::RANGE_SELECT_LIMIT {
        return Err(DcoError::invalid_config(
            "max_range_select",
            format!("{} (must be 0-{})", max_range_select, linear::RANGE_SELECT_LIMIT),
        ));
    }
    Ok(())
}

/// Validate a per-probe timeout
pub fn validate_timeout(timeout_ms: u32) -> Result<()> {
    if timeout_ms == 0 {
        return Err(DcoError::invalid_config("timeout_ms", "must be greater than 0"));
    }
    Ok(())
}
