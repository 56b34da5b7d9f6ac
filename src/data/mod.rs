//! Data types, configuration, and validation modules

mod config;
mod types;
mod validation;

pub use config::{load_config, CalibrationConfig, DeviceProfile};
pub use types::{
    BasicSetting, BinaryOutcome, CalibrationOutcome, DeviceFamily, FllFixedConfig, FllSetting,
    LinearOutcome, ProbeResult, RegisterSetting, TargetWindow,
};
pub use validation::{
    validate_max_range_select, validate_timeout, validate_tolerance, validate_window,
};
