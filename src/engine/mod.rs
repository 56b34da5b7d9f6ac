//! Calibration engine modules
//!
//! Contains both DCO search strategies and the observers they report to.

mod binary;
mod linear;
mod observer;

pub use binary::{split_index, BinaryCalibrator};
pub use linear::LinearCalibrator;
pub use observer::{CalibrationObserver, RecordingObserver, SearchStep, TracingObserver, Verdict};
