/*
 * Integration tests for dcocal
 *
 * These run complete calibrations through the probe image builder, the
 * frequency probe and a simulated target, the same path a real debug link
 * takes.
 */

use dcocal::{
    calibrate, calibrate_with_observer, load_config, BasicSetting, BinaryCalibrator,
    BuiltinImages, CalibrationConfig, CalibrationFailure, CalibrationOutcome, DcoError,
    DeviceProfile, FrequencyProbe, LinearCalibrator, ProbeImage, RecordingObserver,
    RegisterSetting, SimulatedTarget,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Basic clock model: 1 kHz per step of `range_select * 256 + dco`
fn basic_model(setting: &RegisterSetting) -> u32 {
    match setting {
        RegisterSetting::Basic(s) => (u32::from(s.range_select) * 256 + u32::from(s.dco)) * 1000,
        RegisterSetting::FllPlus(_) => 0,
    }
}

/// FLL+ model: 2 kHz per step of the combined index
fn fll_model(setting: &RegisterSetting) -> u32 {
    match setting {
        RegisterSetting::FllPlus(s) => ((u32::from(s.scfi1) << 2) | u32::from(s.scfi0)) * 2000,
        RegisterSetting::Basic(_) => 0,
    }
}

#[test]
fn test_basic_clock_calibration_end_to_end() -> anyhow::Result<()> {
    init_tracing();
    let mut target = SimulatedTarget::new(ProbeImage::basic_clock(), basic_model);

    let config = CalibrationConfig::new(2_850_000, DeviceProfile::f2xx()).with_tolerance(0.0175);
    let outcome = calibrate(&mut target, &BuiltinImages, &config)?;

    let window = config.window();
    assert!(window.contains(outcome.frequency_hz()));
    assert_eq!(target.runs(), outcome.measurements());
    match outcome {
        CalibrationOutcome::Basic(basic) => {
            let units = u32::from(basic.range_select) * 256 + u32::from(basic.dco);
            assert_eq!(units * 1000, basic.frequency_hz);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    Ok(())
}

#[test]
fn test_fll_plus_calibration_end_to_end() -> anyhow::Result<()> {
    init_tracing();
    let mut target = SimulatedTarget::new(ProbeImage::fll_plus(), fll_model);
    let mut observer = RecordingObserver::new();

    let config = CalibrationConfig::new(1_000_000, DeviceProfile::f4xx()).with_tolerance(0.01);
    let outcome = calibrate_with_observer(&mut target, &BuiltinImages, &config, &mut observer)?;

    assert!(config.window().contains(outcome.frequency_hz()));
    assert!(outcome.measurements() <= 11);
    assert_eq!(observer.steps.len() as u32, target.runs());
    assert!(observer.last().map(|s| s.confirmation).unwrap_or(false));

    match outcome.setting() {
        RegisterSetting::FllPlus(s) => {
            assert_eq!((s.scfqctl, s.fll_ctl0, s.fll_ctl1), (0x80, 0x80, 0x00));
        }
        other => panic!("unexpected setting {}", other),
    }
    Ok(())
}

#[test]
fn test_calibration_from_config_file() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"{{"target_hz": 500000, "tolerance": 0.05, "timeout_ms": 250,
            "device": {{"family": "basic", "max_range_select": 7, "dco_resistor": true}}}}"#
    )?;
    let config = load_config(file.path())?;

    let mut target = SimulatedTarget::new(ProbeImage::basic_clock(), |setting: &RegisterSetting| {
        match setting {
            // with the resistor selected the model only runs when BCSCTL2 says so
            RegisterSetting::Basic(s) if s.dco_resistor == 1 => basic_model(setting),
            _ => 0,
        }
    });
    let outcome = calibrate(&mut target, &BuiltinImages, &config)?;

    assert!(config.window().contains(outcome.frequency_hz()));
    match outcome.setting() {
        RegisterSetting::Basic(BasicSetting { dco_resistor, range_select, .. }) => {
            assert_eq!(dco_resistor, 1);
            assert!(range_select <= 7);
        }
        other => panic!("unexpected setting {}", other),
    }
    Ok(())
}

#[test]
fn test_f1xx_cannot_reach_high_target() {
    let mut target = SimulatedTarget::new(ProbeImage::basic_clock(), basic_model);
    let config = CalibrationConfig::new(3_000_000, DeviceProfile::f1xx());

    let err = calibrate(&mut target, &BuiltinImages, &config).unwrap_err();
    assert_eq!(err.calibration_failure(), Some(CalibrationFailure::TooSlow));
    assert!(err.to_string().contains("2047000 Hz"));
}

#[test]
fn test_link_loss_aborts_calibration() {
    let target = SimulatedTarget::new(ProbeImage::basic_clock(), basic_model).with_failure_after(3);
    let probe = FrequencyProbe::new(target, ProbeImage::basic_clock());
    let mut calibrator = LinearCalibrator::new(probe);

    let err = calibrator.calibrate(100_000, 110_000, 15, false).unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, DcoError::Transport { .. }));

    let (probe, _) = calibrator.into_parts();
    assert_eq!(probe.into_inner().runs(), 3);
}

#[test]
fn test_calibrators_share_probe_across_runs() -> anyhow::Result<()> {
    let mut target = SimulatedTarget::new(ProbeImage::fll_plus(), fll_model);

    for &(fmin, fmax) in &[(100_000, 104_000), (900_000, 910_000), (1_500_000, 1_600_000)] {
        let probe = FrequencyProbe::new(&mut target, ProbeImage::fll_plus()).with_timeout_ms(20);
        let mut calibrator = BinaryCalibrator::new(probe);
        let outcome = calibrator.calibrate(fmin, fmax)?;
        assert!(fmin <= outcome.frequency_hz && outcome.frequency_hz <= fmax);
    }
    Ok(())
}

#[test]
fn test_outcome_serializes_for_callers() -> anyhow::Result<()> {
    let mut target = SimulatedTarget::new(ProbeImage::basic_clock(), basic_model);
    let config = CalibrationConfig::new(1_000_000, DeviceProfile::f2xx());
    let outcome = calibrate(&mut target, &BuiltinImages, &config)?;

    let json = serde_json::to_value(outcome)?;
    assert_eq!(json["family"], "basic");
    assert_eq!(json["frequency_hz"], outcome.frequency_hz());
    Ok(())
}
