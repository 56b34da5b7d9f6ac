//! Binary calibrator for the FLL+ clock module
//!
//! With the FLL frozen, the DCO tap and modulator bits form one linear
//! frequency scale. A combined index `[0, 27 << 5)` enumerates it: the low two
//! bits go to SCFI0, the rest to SCFI1. The search is a single pass of classic
//! bisection and trusts the scale to be monotonically non-decreasing.

use tracing::{info, warn};

use crate::constants::binary;
use crate::data::{validate_window, BinaryOutcome, FllFixedConfig, RegisterSetting};
use crate::engine::observer::{CalibrationObserver, SearchStep, TracingObserver, Verdict};
use crate::error::{CalibrationFailure, DcoError, Result};
use crate::hw::FrequencyMeter;

/// Open interval of combined indices still in play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchBounds {
    first: u32,
    last: u32,
}

impl SearchBounds {
    fn full() -> Self {
        Self {
            first: binary::INDEX_FIRST,
            last: binary::INDEX_LAST,
        }
    }

    fn is_open(&self) -> bool {
        self.first + 1 < self.last
    }

    fn mid(&self) -> u32 {
        (self.first + self.last) / 2
    }
}

/// Split a combined index into (SCFI0, SCFI1)
pub fn split_index(index: u32) -> (u8, u8) {
    let scfi0 = index & binary::SCFI0_MASK;
    let scfi1 = index >> binary::SCFI1_SHIFT;
    (scfi0 as u8, scfi1 as u8)
}

/// Calibrates FLL+ devices (F4xx)
pub struct BinaryCalibrator<M, O = TracingObserver> {
    meter: M,
    observer: O,
    fixed: FllFixedConfig,
}

impl<M: FrequencyMeter> BinaryCalibrator<M> {
    pub fn new(meter: M) -> Self {
        Self {
            meter,
            observer: TracingObserver,
            fixed: FllFixedConfig::default(),
        }
    }
}

impl<M: FrequencyMeter, O: CalibrationObserver> BinaryCalibrator<M, O> {
    /// Replace the observer that receives search steps
    pub fn with_observer<P: CalibrationObserver>(self, observer: P) -> BinaryCalibrator<M, P> {
        BinaryCalibrator {
            meter: self.meter,
            observer,
            fixed: self.fixed,
        }
    }

    /// Use different values for the registers that stay fixed
    pub fn with_fixed_config(mut self, fixed: FllFixedConfig) -> Self {
        self.fixed = fixed;
        self
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_parts(self) -> (M, O) {
        (self.meter, self.observer)
    }

    fn measure_index(
        &mut self,
        index: u32,
        measurement: u32,
        confirmation: bool,
        fmin: u32,
        fmax: u32,
    ) -> Result<(u32, RegisterSetting)> {
        let (scfi0, scfi1) = split_index(index);
        let setting = RegisterSetting::FllPlus(self.fixed.setting(scfi0, scfi1));
        let frequency_hz = self.meter.measure(&setting)?.frequency_hz;

        self.observer.on_step(&SearchStep {
            measurement,
            setting,
            frequency_hz,
            verdict: Verdict::classify(frequency_hz, fmin, fmax),
            resolution: None,
            confirmation,
        });
        Ok((frequency_hz, setting))
    }

    /// Search for an index whose frequency lies in `[fmin, fmax]`
    ///
    /// The final index is always measured once more after the loop, even
    /// when the loop stopped because it had just found an accepted point.
    pub fn calibrate(&mut self, fmin: u32, fmax: u32) -> Result<BinaryOutcome> {
        validate_window(fmin, fmax)?;

        let mut bounds = SearchBounds::full();
        let mut mid = bounds.first;
        let mut measurements = 0;

        while bounds.is_open() {
            mid = bounds.mid();
            measurements += 1;
            let (frequency_hz, _) = self.measure_index(mid, measurements, false, fmin, fmax)?;

            match Verdict::classify(frequency_hz, fmin, fmax) {
                Verdict::AboveWindow => bounds.last = mid,
                Verdict::BelowWindow => bounds.first = mid,
                Verdict::InWindow => break,
            }
        }

        measurements += 1;
        let (frequency_hz, setting) = self.measure_index(mid, measurements, true, fmin, fmax)?;
        if Verdict::classify(frequency_hz, fmin, fmax) != Verdict::InWindow {
            warn!(frequency_hz, fmin, fmax, %setting, "FLL+ search closed outside the window");
            return Err(DcoError::calibration(
                CalibrationFailure::Unreachable,
                frequency_hz,
                setting.to_string(),
            ));
        }

        let (scfi0, scfi1) = split_index(mid);
        info!(frequency_hz, scfi0, scfi1, measurements, "DCO calibrated");
        Ok(BinaryOutcome {
            frequency_hz,
            scfi0,
            scfi1,
            fixed: self.fixed,
            measurements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FllSetting, ProbeResult};
    use crate::engine::observer::RecordingObserver;

    fn index_of(setting: &FllSetting) -> u32 {
        (u32::from(setting.scfi1) << binary::SCFI1_SHIFT) | u32::from(setting.scfi0)
    }

    struct Model<F: Fn(u32) -> u32> {
        f: F,
        calls: u32,
    }

    impl<F: Fn(u32) -> u32> FrequencyMeter for Model<F> {
        fn measure(&mut self, setting: &RegisterSetting) -> Result<ProbeResult> {
            self.calls += 1;
            match setting {
                RegisterSetting::FllPlus(s) => Ok(ProbeResult {
                    frequency_hz: (self.f)(index_of(s)),
                    elapsed_ms: 100,
                }),
                RegisterSetting::Basic(_) => Err(DcoError::config("wrong family")),
            }
        }
    }

    fn model<F: Fn(u32) -> u32>(f: F) -> Model<F> {
        Model { f, calls: 0 }
    }

    #[test]
    fn test_split_index() {
        assert_eq!(split_index(0), (0, 0));
        assert_eq!(split_index(0b1011_0110), (0b10, 0b10_1101));
        assert_eq!(split_index(binary::INDEX_LAST - 1), (3, 215));
    }

    #[test]
    fn test_example_window() {
        let mut calibrator = BinaryCalibrator::new(model(|mid| mid * 1500));
        let outcome = calibrator.calibrate(600_000, 700_000).unwrap();

        let mid = (u32::from(outcome.scfi1) << 2) | u32::from(outcome.scfi0);
        assert!((400..=466).contains(&mid));
        assert!((600_000..=700_000).contains(&outcome.frequency_hz));
        assert!(outcome.measurements <= 11);
        assert_eq!(outcome.fixed, FllFixedConfig::default());
    }

    #[test]
    fn test_break_path_remeasures_once() {
        // 432 is the first midpoint and already inside the window
        let mut calibrator =
            BinaryCalibrator::new(model(|mid| mid * 1500)).with_observer(RecordingObserver::new());
        let outcome = calibrator.calibrate(600_000, 700_000).unwrap();

        assert_eq!(outcome.measurements, 2);
        let (meter, observer) = calibrator.into_parts();
        assert_eq!(meter.calls, 2);
        assert_eq!(observer.steps[0].setting, observer.steps[1].setting);
        assert!(!observer.steps[0].confirmation);
        assert!(observer.steps[1].confirmation);
    }

    #[test]
    fn test_measurement_count_is_logarithmic() {
        for &(fmin, fmax) in &[(10_000, 11_000), (1_292_000, 1_294_000), (300_000, 301_500), (4_500, 5_000)] {
            let mut calibrator = BinaryCalibrator::new(model(|mid| mid * 1500));
            let outcome = calibrator.calibrate(fmin, fmax).unwrap();
            assert!(fmin <= outcome.frequency_hz && outcome.frequency_hz <= fmax);
            // ceil(log2(864)) search steps plus the confirmation
            assert!(outcome.measurements <= 11, "{} measurements", outcome.measurements);
            assert_eq!(calibrator.into_parts().0.calls, outcome.measurements);
        }
    }

    #[test]
    fn test_monotonic_models_with_plateaus() {
        // non-decreasing, with flat steps every 8 indices
        let f = |mid: u32| (mid / 8) * 40_000 + 100_000;
        for target in (0..864).step_by(37) {
            let fmin = f(target);
            let mut calibrator = BinaryCalibrator::new(model(f));
            let outcome = calibrator.calibrate(fmin, fmin + 1_000).unwrap();
            assert_eq!(outcome.frequency_hz, fmin);
        }
    }

    #[test]
    fn test_unreachable_above_range() {
        let mut calibrator =
            BinaryCalibrator::new(model(|mid| mid * 1500)).with_observer(RecordingObserver::new());
        let err = calibrator.calibrate(2_000_000, 3_000_000).unwrap_err();

        assert_eq!(err.calibration_failure(), Some(CalibrationFailure::Unreachable));
        // interval closes at the top index, which is re-measured
        assert!(matches!(err, DcoError::Calibration { last_frequency_hz: 1_294_500, .. }));
        let observer = calibrator.observer();
        assert_eq!(observer.steps.len(), 11);
        assert!(observer.last().unwrap().confirmation);
    }

    #[test]
    fn test_unreachable_in_gap() {
        // 300k and 301.5k are adjacent points; nothing lands in between
        let mut calibrator = BinaryCalibrator::new(model(|mid| mid * 1500));
        let err = calibrator.calibrate(300_100, 301_400).unwrap_err();
        assert_eq!(err.calibration_failure(), Some(CalibrationFailure::Unreachable));
    }

    #[test]
    fn test_fixed_config_is_applied() {
        let fixed = FllFixedConfig { scfqctl: 0x1f, fll_ctl0: 0x80, fll_ctl1: 0x00 };
        let mut calibrator = BinaryCalibrator::new(model(|mid| mid * 1500))
            .with_fixed_config(fixed)
            .with_observer(RecordingObserver::new());
        let outcome = calibrator.calibrate(600_000, 700_000).unwrap();

        assert_eq!(outcome.fixed, fixed);
        for step in &calibrator.observer().steps {
            match step.setting {
                RegisterSetting::FllPlus(s) => {
                    assert_eq!((s.scfqctl, s.fll_ctl0, s.fll_ctl1), (0x1f, 0x80, 0x00))
                }
                RegisterSetting::Basic(_) => panic!("basic setting in FLL+ search"),
            }
        }
    }

    #[test]
    fn test_rejects_inverted_window() {
        let mut calibrator = BinaryCalibrator::new(model(|mid| mid));
        assert!(matches!(calibrator.calibrate(10, 5), Err(DcoError::InvalidWindow { .. })));
        assert_eq!(calibrator.into_parts().0.calls, 0);
    }
}
