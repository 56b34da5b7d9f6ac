//! One-call calibration entry point
//!
//! Picks the probe image and search strategy for the configured device and
//! runs the search against a debug link.

use tracing::info;

use crate::data::{CalibrationConfig, CalibrationOutcome, DeviceProfile};
use crate::engine::{BinaryCalibrator, CalibrationObserver, LinearCalibrator, TracingObserver};
use crate::error::Result;
use crate::hw::{DebugLink, FrequencyProbe, ImageStore};

/// Calibrate the target behind `link` as described by `config`
///
/// Progress is reported through `tracing`; use `calibrate_with_observer` to
/// collect it instead.
pub fn calibrate<L, S>(
    link: L,
    images: &S,
    config: &CalibrationConfig,
) -> Result<CalibrationOutcome>
where
    L: DebugLink,
    S: ImageStore + ?Sized,
{
    calibrate_with_observer(link, images, config, TracingObserver)
}

/// Like `calibrate`, reporting each search step to `observer`
pub fn calibrate_with_observer<L, S, O>(
    link: L,
    images: &S,
    config: &CalibrationConfig,
    observer: O,
) -> Result<CalibrationOutcome>
where
    L: DebugLink,
    S: ImageStore + ?Sized,
    O: CalibrationObserver,
{
    config.validate()?;
    let window = config.window();
    let image = images.load_template(config.device.family())?;
    let probe = FrequencyProbe::new(link, image).with_timeout_ms(config.timeout_ms);

    info!(
        family = config.device.family().name(),
        fmin = window.fmin,
        fmax = window.fmax,
        timeout_ms = config.timeout_ms,
        "Starting DCO calibration"
    );

    match config.device {
        DeviceProfile::Basic { max_range_select, dco_resistor } => {
            let mut calibrator = LinearCalibrator::new(probe).with_observer(observer);
            calibrator
                .calibrate(window.fmin, window.fmax, max_range_select, dco_resistor)
                .map(CalibrationOutcome::Basic)
        }
        DeviceProfile::FllPlus(fixed) => {
            let mut calibrator = BinaryCalibrator::new(probe)
                .with_fixed_config(fixed)
                .with_observer(observer);
            calibrator.calibrate(window.fmin, window.fmax).map(CalibrationOutcome::FllPlus)
        }
    }
}
