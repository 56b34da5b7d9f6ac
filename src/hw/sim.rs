//! Simulated target
//!
//! A `DebugLink` that decodes the register values out of each uploaded probe,
//! asks an oscillator model for the resulting frequency and leaves the cycle
//! count the real counting loop would have produced in R15:R14. Useful for
//! dry runs of a calibration setup and for tests.

use tracing::debug;

use crate::constants::probe;
use crate::data::RegisterSetting;
use crate::error::{DcoError, Result};
use crate::hw::image::ProbeImage;
use crate::hw::link::{CpuRegister, DebugLink};

const REGISTER_COUNT: usize = 16;

/// Simulated MSP430 whose DCO frequency follows `model`
pub struct SimulatedTarget<F>
where
    F: FnMut(&RegisterSetting) -> u32,
{
    image: ProbeImage,
    model: F,
    registers: [u16; REGISTER_COUNT],
    runs: u32,
    fail_after: Option<u32>,
}

impl<F> SimulatedTarget<F>
where
    F: FnMut(&RegisterSetting) -> u32,
{
    /// `image` must be the probe the caller is going to upload
    pub fn new(image: ProbeImage, model: F) -> Self {
        Self {
            image,
            model,
            registers: [0; REGISTER_COUNT],
            runs: 0,
            fail_after: None,
        }
    }

    /// Drop the link after `runs` successful probe runs
    pub fn with_failure_after(mut self, runs: u32) -> Self {
        self.fail_after = Some(runs);
        self
    }

    /// Number of probe runs executed so far
    pub fn runs(&self) -> u32 {
        self.runs
    }
}

impl<F> DebugLink for SimulatedTarget<F>
where
    F: FnMut(&RegisterSetting) -> u32,
{
    fn execute(&mut self, image: &[u8], timeout_ms: u32) -> Result<u32> {
        if self.fail_after.is_some_and(|limit| self.runs >= limit) {
            return Err(DcoError::transport("execute", "simulated link lost"));
        }

        let setting = self.image.decode(image)?;
        let frequency_hz = (self.model)(&setting);

        // The probe spins until the link stops it at the timeout.
        let loops = u64::from(frequency_hz) * u64::from(timeout_ms)
            / (probe::UNITS_PER_SECOND * probe::CYCLES_PER_ITERATION);
        let count = u32::try_from(loops).unwrap_or(u32::MAX);

        self.registers[usize::from(CpuRegister::COUNT_LO.0)] = (count & 0xffff) as u16;
        self.registers[usize::from(CpuRegister::COUNT_HI.0)] = (count >> 16) as u16;
        self.runs += 1;

        debug!(%setting, frequency_hz, count, "Simulated probe run");
        Ok(timeout_ms)
    }

    fn read_register(&mut self, register: CpuRegister) -> Result<u16> {
        self.registers
            .get(usize::from(register.0))
            .copied()
            .ok_or_else(|| DcoError::transport("read register", format!("no register {}", register)))
    }
}
