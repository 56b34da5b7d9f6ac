//! dcocal - DCO calibration for MSP430 targets
//!
//! Tunes the digitally-controlled oscillator of a target to a frequency
//! window using nothing but a debug link: a tiny counting probe is uploaded
//! with the clock registers under test, run for a bounded time, and the loop
//! count it leaves in R15:R14 is converted to Hz.
//!
//! # Module Structure
//!
//! - `hw/` - Probe images, the debug link seam, frequency measurement
//! - `engine/` - Linear (basic clock) and binary (FLL+) searches
//! - `data/` - Register settings, outcomes, configuration, validation
//!
//! # Example
//!
//! ```no_run
//! use dcocal::{calibrate, BuiltinImages, CalibrationConfig, DebugLink, DeviceProfile};
//!
//! fn run(link: &mut impl DebugLink) -> dcocal::Result<()> {
//!     let config = CalibrationConfig::new(1_000_000, DeviceProfile::f2xx());
//!     let outcome = calibrate(link, &BuiltinImages, &config)?;
//!     println!("{} Hz with {}", outcome.frequency_hz(), outcome.setting());
//!     Ok(())
//! }
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod calibrate;
pub mod constants;
pub mod error;

pub use calibrate::{calibrate, calibrate_with_observer};
pub use data::{
    load_config, BasicSetting, BinaryOutcome, CalibrationConfig, CalibrationOutcome,
    DeviceFamily, DeviceProfile, FllFixedConfig, FllSetting, LinearOutcome, ProbeResult,
    RegisterSetting, TargetWindow,
};
pub use engine::{
    BinaryCalibrator, CalibrationObserver, LinearCalibrator, RecordingObserver, SearchStep,
    TracingObserver, Verdict,
};
pub use error::{CalibrationFailure, DcoError, Result};
pub use hw::{
    BuiltinImages, CpuRegister, DebugLink, FrequencyMeter, FrequencyProbe, ImageStore,
    PatchSlot, ProbeImage, SimulatedTarget,
};
