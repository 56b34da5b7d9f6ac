//! Constants and configuration values for dcocal
//!
//! Centralizes register addresses, probe layout, search parameters and
//! configuration defaults. Never use magic numbers in other files - add them
//! here first.

/// Peripheral register addresses of the clock modules
pub mod registers {
    /// Basic clock module (F1xx/F2xx)
    pub const DCOCTL: u16 = 0x0056;
    pub const BCSCTL1: u16 = 0x0057;
    pub const BCSCTL2: u16 = 0x0058;

    /// FLL+ clock module (F4xx)
    pub const SCFI0: u16 = 0x0050;
    pub const SCFI1: u16 = 0x0051;
    pub const SCFQCTL: u16 = 0x0052;
    pub const FLL_CTL0: u16 = 0x0053;
    pub const FLL_CTL1: u16 = 0x0054;

    /// Bit widths of the fields patched into the probe
    pub mod width {
        pub const DCOCTL: u8 = 8;
        /// RSELx occupies the low nibble of BCSCTL1
        pub const BCSCTL1: u8 = 4;
        pub const BCSCTL2: u8 = 8;
        pub const BYTE: u8 = 8;
    }
}

/// Frequency probe parameters
pub mod probe {
    /// CPU register holding the low half of the cycle counter
    pub const COUNT_LO_REGISTER: u8 = 14;

    /// CPU register holding the high half of the cycle counter
    pub const COUNT_HI_REGISTER: u8 = 15;

    /// CPU cycles per iteration of the counting loop (inc + adc + jmp)
    pub const CYCLES_PER_ITERATION: u64 = 4;

    /// Elapsed time is reported in milliseconds
    pub const UNITS_PER_SECOND: u64 = 1000;

    /// Default per-measurement timeout in milliseconds
    pub const DEFAULT_TIMEOUT_MS: u32 = 100;
}

/// Linear (successive approximation) search over the basic clock module
pub mod linear {
    /// Hard cap on measurements per calibration run
    pub const MAX_ITERATIONS: u32 = 50;

    /// Starting DCOx/MODx value, upper-middle of the tap range
    pub const START_DCO: i32 = 3 << 5;

    /// Initial step size
    pub const START_RESOLUTION: i32 = 128;

    /// Largest DCOCTL value
    pub const DCO_MAX: i32 = 255;

    /// Largest RSELx value on any basic clock module
    pub const RANGE_SELECT_LIMIT: u8 = 15;
}

/// Binary search over the FLL+ combined index
pub mod binary {
    /// Inclusive lower end of the combined index
    pub const INDEX_FIRST: u32 = 0;

    /// Exclusive upper end: 27 DCO taps with 32 modulation steps each
    pub const INDEX_LAST: u32 = 27 << 5;

    /// Mask selecting the SCFI0 part of the index
    pub const SCFI0_MASK: u32 = 0x3;

    /// Shift selecting the SCFI1 part of the index
    pub const SCFI1_SHIFT: u32 = 2;

    /// SCFQ_M: modulation disabled
    pub const DEFAULT_SCFQCTL: u8 = 0x80;

    /// DCOPLUS: fDCOCLK = (N + 1) * 2 * fcrystal
    pub const DEFAULT_FLL_CTL0: u8 = 0x80;

    pub const DEFAULT_FLL_CTL1: u8 = 0x00;
}

/// Device presets
pub mod device {
    /// F1xx devices expose RSEL0..RSEL2
    pub const F1XX_MAX_RANGE_SELECT: u8 = 7;

    /// F2xx devices expose RSEL0..RSEL3
    pub const F2XX_MAX_RANGE_SELECT: u8 = 15;
}

/// Target window defaults
pub mod window {
    /// Default relative tolerance around the target frequency (2%)
    pub const DEFAULT_TOLERANCE: f64 = 0.02;
}
