//! Hardware interaction modules
//!
//! Probe images, the debug link seam, frequency measurement and a simulated
//! target.

mod image;
mod link;
mod probe;
pub mod sim;

pub use image::{BuiltinImages, ImageStore, PatchSlot, ProbeImage};
pub use link::{CpuRegister, DebugLink};
pub use probe::{frequency_from_count, FrequencyMeter, FrequencyProbe};
pub use sim::SimulatedTarget;

#[cfg(test)]
pub use link::MockDebugLink;
