//! Linear calibrator for the basic clock module
//!
//! Successive approximation over `(RSELx, DCOCTL)`. The search steps through
//! DCOCTL by `resolution`, carrying into RSELx on wrap-around. Once it has
//! seen measurements on both sides of the window the step size is halved, so
//! the search narrows in on the target the way a successive approximation
//! converter does.
//!
//! The fine structure of the basic clock module is not monotonic (modulation
//! mixes adjacent taps), which is why this is a bounded walk instead of a
//! bisection.

use tracing::{info, warn};

use crate::constants::linear;
use crate::data::{
    validate_max_range_select, validate_window, BasicSetting, LinearOutcome, RegisterSetting,
};
use crate::engine::observer::{CalibrationObserver, SearchStep, TracingObserver, Verdict};
use crate::error::{CalibrationFailure, DcoError, Result};
use crate::hw::FrequencyMeter;

/// Mutable search position, discarded after the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchState {
    dco: i32,
    range_select: i32,
    resolution: i32,
    saw_upper_bound: bool,
    saw_lower_bound: bool,
}

impl SearchState {
    fn start(max_range_select: u8) -> Self {
        Self {
            dco: linear::START_DCO,
            range_select: i32::from(max_range_select),
            resolution: linear::START_RESOLUTION,
            saw_upper_bound: false,
            saw_lower_bound: false,
        }
    }

    fn halve_resolution(&mut self) {
        self.resolution = (self.resolution / 2).max(1);
    }

    /// Halve the step once the target is bracketed; returns the new step
    fn refine_if_bracketed(&mut self) -> Option<i32> {
        if self.saw_upper_bound && self.saw_lower_bound && self.resolution > 1 {
            self.halve_resolution();
            self.saw_upper_bound = false;
            self.saw_lower_bound = false;
            return Some(self.resolution);
        }
        None
    }

    /// Move to a slower setting. False when nothing slower is left.
    fn step_down(&mut self) -> bool {
        self.saw_upper_bound = true;
        self.dco -= self.resolution;
        if self.dco < 0 {
            self.dco = linear::DCO_MAX;
            self.range_select -= 1;
            if self.range_select < 0 {
                if self.resolution <= 1 {
                    return false;
                }
                self.halve_resolution();
                self.range_select = 0;
                self.dco = 0;
            }
        }
        true
    }

    /// Move to a faster setting. False when nothing faster is left.
    fn step_up(&mut self, max_range_select: i32) -> bool {
        self.saw_lower_bound = true;
        self.dco += self.resolution;
        if self.dco > linear::DCO_MAX {
            self.dco = 0;
            self.range_select += 1;
            if self.range_select > max_range_select {
                if self.resolution <= 1 {
                    return false;
                }
                self.halve_resolution();
                self.range_select = max_range_select;
                self.dco = linear::DCO_MAX;
            }
        }
        true
    }

    fn setting(&self, dco_resistor: bool) -> BasicSetting {
        // dco and range_select are back in range after every step that
        // returned true
        BasicSetting {
            dco: self.dco as u8,
            range_select: self.range_select as u8,
            dco_resistor: u8::from(dco_resistor),
        }
    }
}

/// Calibrates basic clock module devices (F1xx/F2xx)
pub struct LinearCalibrator<M, O = TracingObserver> {
    meter: M,
    observer: O,
}

impl<M: FrequencyMeter> LinearCalibrator<M> {
    pub fn new(meter: M) -> Self {
        Self {
            meter,
            observer: TracingObserver,
        }
    }
}

impl<M: FrequencyMeter, O: CalibrationObserver> LinearCalibrator<M, O> {
    /// Replace the observer that receives search steps
    pub fn with_observer<P: CalibrationObserver>(self, observer: P) -> LinearCalibrator<M, P> {
        LinearCalibrator {
            meter: self.meter,
            observer,
        }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_parts(self) -> (M, O) {
        (self.meter, self.observer)
    }

    /// Search for a DCOCTL/RSELx pair whose frequency lies in `[fmin, fmax]`
    ///
    /// Starts at `DCOCTL = 0x60` in the highest range and gives up after 50
    /// measurements. A failure reports the frequency of the last measurement,
    /// even when the search was about to retry at a finer step.
    pub fn calibrate(
        &mut self,
        fmin: u32,
        fmax: u32,
        max_range_select: u8,
        dco_resistor: bool,
    ) -> Result<LinearOutcome> {
        validate_window(fmin, fmax)?;
        validate_max_range_select(max_range_select)?;

        let max_range = i32::from(max_range_select);
        let mut state = SearchState::start(max_range_select);
        let mut last = None;

        for measurement in 1..=linear::MAX_ITERATIONS {
            if let Some(resolution) = state.refine_if_bracketed() {
                self.observer.on_refine(resolution as u32);
            }

            let setting = state.setting(dco_resistor);
            let register_setting = RegisterSetting::Basic(setting);
            let frequency_hz = self.meter.measure(&register_setting)?.frequency_hz;
            let verdict = Verdict::classify(frequency_hz, fmin, fmax);
            last = Some((frequency_hz, register_setting));

            self.observer.on_step(&SearchStep {
                measurement,
                setting: register_setting,
                frequency_hz,
                verdict,
                resolution: Some(state.resolution as u32),
                confirmation: false,
            });

            let moved = match verdict {
                Verdict::AboveWindow => state.step_down(),
                Verdict::BelowWindow => state.step_up(max_range),
                Verdict::InWindow => {
                    info!(
                        frequency_hz,
                        dco = setting.dco,
                        range_select = setting.range_select,
                        measurement,
                        "DCO calibrated"
                    );
                    return Ok(LinearOutcome {
                        frequency_hz,
                        dco: setting.dco,
                        range_select: setting.range_select,
                        dco_resistor,
                        measurements: measurement,
                    });
                }
            };

            if !moved {
                let reason = match verdict {
                    Verdict::AboveWindow => CalibrationFailure::TooFast,
                    _ => CalibrationFailure::TooSlow,
                };
                warn!(frequency_hz, fmin, fmax, %register_setting, "{}", reason);
                return Err(DcoError::calibration(reason, frequency_hz, register_setting.to_string()));
            }
        }

        let (frequency_hz, setting) = match last {
            Some((frequency_hz, setting)) => (frequency_hz, setting.to_string()),
            None => (0, String::from("none")),
        };
        warn!(frequency_hz, fmin, fmax, "DCO search did not converge");
        Err(DcoError::calibration(CalibrationFailure::NotConverged, frequency_hz, setting))
    }
}
