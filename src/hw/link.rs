//! Debug link abstraction
//!
//! The transport that uploads a probe, runs it and reads CPU registers back
//! lives outside this crate. Implementations map their own failures onto
//! `DcoError::Transport` or `DcoError::Timeout`.

use std::fmt;

use crate::constants::probe;
use crate::error::Result;

/// CPU register number on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuRegister(pub u8);

impl CpuRegister {
    /// Low half of the probe's cycle counter
    pub const COUNT_LO: Self = Self(probe::COUNT_LO_REGISTER);
    /// High half of the probe's cycle counter
    pub const COUNT_HI: Self = Self(probe::COUNT_HI_REGISTER);
}

impl fmt::Display for CpuRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Exclusive handle to a target reached through a debug adapter
#[cfg_attr(test, mockall::automock)]
pub trait DebugLink {
    /// Upload `image`, run it until it is stopped after `timeout_ms`, and
    /// return the elapsed wall-clock time in milliseconds.
    fn execute(&mut self, image: &[u8], timeout_ms: u32) -> Result<u32>;

    /// Read a CPU register of the halted target
    fn read_register(&mut self, register: CpuRegister) -> Result<u16>;
}

impl<L: DebugLink + ?Sized> DebugLink for &mut L {
    fn execute(&mut self, image: &[u8], timeout_ms: u32) -> Result<u32> {
        (**self).execute(image, timeout_ms)
    }

    fn read_register(&mut self, register: CpuRegister) -> Result<u16> {
        (**self).read_register(register)
    }
}
