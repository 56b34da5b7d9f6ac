//! Error types, re-exported from the shared error crate

pub use dcocal_error::{CalibrationFailure, DcoError, Result};
