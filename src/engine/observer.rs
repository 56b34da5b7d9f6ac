//! Calibration observers
//!
//! Search progress is reported to an observer passed into each calibrator
//! rather than printed behind a global debug switch.

use tracing::debug;

use crate::data::RegisterSetting;

/// Where a measurement landed relative to the acceptance window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    AboveWindow,
    BelowWindow,
    InWindow,
}

impl Verdict {
    pub fn classify(frequency_hz: u32, fmin: u32, fmax: u32) -> Self {
        if frequency_hz > fmax {
            Self::AboveWindow
        } else if frequency_hz < fmin {
            Self::BelowWindow
        } else {
            Self::InWindow
        }
    }
}

/// One measurement taken during a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStep {
    /// 1-based measurement number within the run
    pub measurement: u32,
    pub setting: RegisterSetting,
    pub frequency_hz: u32,
    pub verdict: Verdict,
    /// Step size in effect (linear search only)
    pub resolution: Option<u32>,
    /// Final re-measurement of the binary search
    pub confirmation: bool,
}

/// Receives search progress from a calibrator
pub trait CalibrationObserver {
    fn on_step(&mut self, step: &SearchStep);

    /// The linear search bracketed the target and reduced its step size
    fn on_refine(&mut self, _resolution: u32) {}
}

impl<O: CalibrationObserver + ?Sized> CalibrationObserver for &mut O {
    fn on_step(&mut self, step: &SearchStep) {
        (**self).on_step(step)
    }

    fn on_refine(&mut self, resolution: u32) {
        (**self).on_refine(resolution)
    }
}

/// Emits every step as a `tracing` debug event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CalibrationObserver for TracingObserver {
    fn on_step(&mut self, step: &SearchStep) {
        debug!(
            measurement = step.measurement,
            setting = %step.setting,
            frequency_hz = step.frequency_hz,
            verdict = ?step.verdict,
            resolution = ?step.resolution,
            confirmation = step.confirmation,
            "Calibration step"
        );
    }

    fn on_refine(&mut self, resolution: u32) {
        debug!(resolution, "Target bracketed, refining step size");
    }
}

/// Keeps every step for later inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub steps: Vec<SearchStep>,
    pub refinements: Vec<u32>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&SearchStep> {
        self.steps.last()
    }
}

impl CalibrationObserver for RecordingObserver {
    fn on_step(&mut self, step: &SearchStep) {
        self.steps.push(*step);
    }

    fn on_refine(&mut self, resolution: u32) {
        self.refinements.push(resolution);
    }
}
