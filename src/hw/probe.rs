//! Frequency probe
//!
//! Runs a patched probe image on the target and turns the cycle counter it
//! leaves in R15:R14 into a frequency.

use tracing::trace;

use crate::constants::probe;
use crate::data::{ProbeResult, RegisterSetting};
use crate::error::{DcoError, Result};
use crate::hw::image::ProbeImage;
use crate::hw::link::{CpuRegister, DebugLink};

/// Anything that can report the DCO frequency produced by a register setting
///
/// The calibrators only talk to this trait, so a synthetic oscillator model
/// can stand in for real hardware.
pub trait FrequencyMeter {
    fn measure(&mut self, setting: &RegisterSetting) -> Result<ProbeResult>;
}

impl<M: FrequencyMeter + ?Sized> FrequencyMeter for &mut M {
    fn measure(&mut self, setting: &RegisterSetting) -> Result<ProbeResult> {
        (**self).measure(setting)
    }
}

/// Convert a loop count and elapsed time into Hz
///
/// `1000 * count * 4 / elapsed_ms`, multiplied out before the single floor
/// division.
pub fn frequency_from_count(count: u32, elapsed_ms: u32) -> Result<u32> {
    if elapsed_ms == 0 {
        return Err(DcoError::InvalidMeasurement(
            "probe reported zero elapsed time".to_string(),
        ));
    }
    let hz = probe::UNITS_PER_SECOND * u64::from(count) * probe::CYCLES_PER_ITERATION
        / u64::from(elapsed_ms);
    u32::try_from(hz).map_err(|_| {
        DcoError::InvalidMeasurement(format!(
            "{} cycles in {} ms exceeds the representable frequency",
            count, elapsed_ms
        ))
    })
}

/// Measures DCO frequency through a debug link
pub struct FrequencyProbe<L: DebugLink> {
    link: L,
    image: ProbeImage,
    timeout_ms: u32,
}

impl<L: DebugLink> FrequencyProbe<L> {
    pub fn new(link: L, image: ProbeImage) -> Self {
        Self {
            link,
            image,
            timeout_ms: probe::DEFAULT_TIMEOUT_MS,
        }
    }

    /// Set the timeout applied to each probe run
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn image(&self) -> &ProbeImage {
        &self.image
    }

    /// Give the link back to the caller
    pub fn into_inner(self) -> L {
        self.link
    }

    /// Measure with an explicit timeout for this run only
    ///
    /// Link failures are returned as-is; nothing is retried.
    pub fn measure_with_timeout(
        &mut self,
        setting: &RegisterSetting,
        timeout_ms: u32,
    ) -> Result<ProbeResult> {
        let image = self.image.build(setting)?;
        let elapsed_ms = self.link.execute(&image, timeout_ms)?;

        let lo = self.link.read_register(CpuRegister::COUNT_LO)?;
        let hi = self.link.read_register(CpuRegister::COUNT_HI)?;
        let count = u32::from(lo) | (u32::from(hi) << 16);

        let frequency_hz = frequency_from_count(count, elapsed_ms)?;
        trace!(%setting, count, elapsed_ms, frequency_hz, "Probe finished");

        Ok(ProbeResult { frequency_hz, elapsed_ms })
    }
}

impl<L: DebugLink> FrequencyMeter for FrequencyProbe<L> {
    fn measure(&mut self, setting: &RegisterSetting) -> Result<ProbeResult> {
        self.measure_with_timeout(setting, self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BasicSetting;
    use crate::hw::link::MockDebugLink;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn setting() -> RegisterSetting {
        RegisterSetting::Basic(BasicSetting { dco: 0x60, range_select: 7, dco_resistor: 0 })
    }

    #[test]
    fn test_frequency_formula() {
        assert_eq!(frequency_from_count(250_000, 1000).unwrap(), 1_000_000);
        // 1000 * 7 * 4 / 3 = 9333.33, floored after the multiply
        assert_eq!(frequency_from_count(7, 3).unwrap(), 9_333);
        assert_eq!(frequency_from_count(u32::MAX, 4000).unwrap(), u32::MAX);
        assert!(frequency_from_count(u32::MAX, 1).is_err());
        assert!(matches!(frequency_from_count(1, 0), Err(DcoError::InvalidMeasurement(_))));
    }

    #[test]
    fn test_frequency_formula_is_deterministic() {
        let first = frequency_from_count(123_457, 97).unwrap();
        let _ = frequency_from_count(1, 1).unwrap();
        assert_eq!(frequency_from_count(123_457, 97).unwrap(), first);
        assert_eq!(first, (1000u64 * 123_457 * 4 / 97) as u32);
    }

    #[test]
    fn test_measure_combines_count_registers() {
        let mut link = MockDebugLink::new();
        let mut seq = Sequence::new();
        let image = ProbeImage::basic_clock();
        let expected = image.build(&setting()).unwrap();

        link.expect_execute()
            .withf(move |bytes, timeout| bytes.to_vec() == expected && *timeout == 75)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(100));
        link.expect_read_register()
            .with(eq(CpuRegister::COUNT_LO))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(0x3880));
        link.expect_read_register()
            .with(eq(CpuRegister::COUNT_HI))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(0x0001));

        let mut probe = FrequencyProbe::new(link, image).with_timeout_ms(75);
        let result = probe.measure(&setting()).unwrap();

        // count = 0x13880 = 80000 loops in 100 ms
        assert_eq!(result, ProbeResult { frequency_hz: 3_200_000, elapsed_ms: 100 });
    }

    #[test]
    fn test_transport_failure_propagates_without_retry() {
        let mut link = MockDebugLink::new();
        link.expect_execute()
            .times(1)
            .returning(|_, _| Err(DcoError::Timeout { timeout_ms: 100 }));
        link.expect_read_register().times(0);

        let mut probe = FrequencyProbe::new(link, ProbeImage::basic_clock());
        let err = probe.measure(&setting()).unwrap_err();
        assert!(matches!(err, DcoError::Timeout { timeout_ms: 100 }));
    }

    #[test]
    fn test_register_read_failure_propagates() {
        let mut link = MockDebugLink::new();
        link.expect_execute().returning(|_, _| Ok(10));
        link.expect_read_register()
            .returning(|_| Err(DcoError::transport("read R14", "adapter unplugged")));

        let mut probe = FrequencyProbe::new(link, ProbeImage::basic_clock());
        assert!(probe.measure(&setting()).unwrap_err().is_transport());
    }

    #[test]
    fn test_invalid_setting_never_reaches_link() {
        let mut link = MockDebugLink::new();
        link.expect_execute().times(0);

        let mut probe = FrequencyProbe::new(&mut link, ProbeImage::basic_clock());
        let bad = RegisterSetting::Basic(BasicSetting { dco: 0, range_select: 0x10, dco_resistor: 0 });
        assert!(matches!(probe.measure(&bad), Err(DcoError::InvalidSetting { .. })));
    }
}
