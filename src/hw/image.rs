//! Probe images
//!
//! A probe image is an mspgcc funclet: a short MSP430 routine, loaded at
//! 0x0200, that copies the clock register values from its data block into the
//! clock module and then spins in a 4-cycle counting loop, incrementing the
//! 32-bit counter in R15:R14 until the debug link stops the CPU. The data
//! block bytes are the "patch slots"; everything else in the template is
//! never touched.
//!
//! Templates are shared read-only. `ProbeImage::build` always returns a fresh
//! buffer, so one image can serve every measurement of a run.

use std::sync::Arc;

use crate::constants::registers::width;
use crate::data::{DeviceFamily, RegisterSetting};
use crate::error::{DcoError, Result};

/// Basic clock module probe (mspgcc `jtag/funclets/counter.S`)
///
/// ```text
///  0: 0200 020a 022a        funclet header: load, entry, end
///  6: 60 07 00 00           data: DCOCTL, BCSCTL1, BCSCTL2, pad
/// 10: c232                  dint
/// 12: 40d2 fff9 0057        mov.b 0x0207, &BCSCTL1
/// 18: 40d2 fff4 0058        mov.b 0x0208, &BCSCTL2
/// 24: 40d2 ffec 0056        mov.b 0x0206, &DCOCTL
/// 30: 430e                  clr r14
/// 32: 430f                  clr r15
/// 34: 531e                  inc r14
/// 36: 630f                  adc r15
/// 38: 3ffd                  jmp 34
/// 40: 4303                  nop
/// 42: 3fff                  jmp $
/// ```
#[rustfmt::skip]
pub const COUNTER_FUNCLET: [u8; 44] = [
    0x00, 0x02, 0x0a, 0x02, 0x2a, 0x02, 0x60, 0x07, 0x00, 0x00, 0x32, 0xc2, 0xd2, 0x40, 0xf9, 0xff,
    0x57, 0x00, 0xd2, 0x40, 0xf4, 0xff, 0x58, 0x00, 0xd2, 0x40, 0xec, 0xff, 0x56, 0x00, 0x0e, 0x43,
    0x0f, 0x43, 0x1e, 0x53, 0x0f, 0x63, 0xfd, 0x3f, 0x03, 0x43, 0xff, 0x3f,
];

const BASIC_CLOCK_SLOTS: [PatchSlot; 3] = [
    PatchSlot { register: "DCOCTL", offset: 6, bits: width::DCOCTL },
    PatchSlot { register: "BCSCTL1", offset: 7, bits: width::BCSCTL1 },
    PatchSlot { register: "BCSCTL2", offset: 8, bits: width::BCSCTL2 },
];

/// FLL+ clock module probe (mspgcc `jtag/funclets/counterplus.S`)
///
/// ```text
///  0: 0200 020c 023c        funclet header: load, entry, end
///  6: 00 0e 80 80 00 00     data: SCFI0, SCFI1, SCFQCTL, FLL_CTL0, FLL_CTL1, pad
/// 12: c232                  dint
/// 14: d072 0040             bis.b #SCG0, SR        ; freeze the FLL loop
/// 18: 40d2 fff4 0052        mov.b 0x0208, &SCFQCTL
/// 24: 40d2 ffed 0051        mov.b 0x0207, &SCFI1
/// 30: 40d2 ffe9 0053        mov.b 0x0209, &FLL_CTL0
/// 36: 40d2 ffe4 0054        mov.b 0x020a, &FLL_CTL1
/// 42: 40d2 ffda 0050        mov.b 0x0206, &SCFI0
/// 48: 430e                  clr r14
/// 50: 430f                  clr r15
/// 52: 531e                  inc r14
/// 54: 630f                  adc r15
/// 56: 3ffd                  jmp 52
/// 58: 4303                  nop
/// 60: 3fff                  jmp $
/// ```
#[rustfmt::skip]
pub const COUNTERPLUS_FUNCLET: [u8; 62] = [
    0x00, 0x02, 0x0c, 0x02, 0x3c, 0x02, 0x00, 0x0e, 0x80, 0x80, 0x00, 0x00, 0x32, 0xc2, 0x72, 0xd0,
    0x40, 0x00, 0xd2, 0x40, 0xf4, 0xff, 0x52, 0x00, 0xd2, 0x40, 0xed, 0xff, 0x51, 0x00, 0xd2, 0x40,
    0xe9, 0xff, 0x53, 0x00, 0xd2, 0x40, 0xe4, 0xff, 0x54, 0x00, 0xd2, 0x40, 0xda, 0xff, 0x50, 0x00,
    0x0e, 0x43, 0x0f, 0x43, 0x1e, 0x53, 0x0f, 0x63, 0xfd, 0x3f, 0x03, 0x43, 0xff, 0x3f,
];

const FLL_PLUS_SLOTS: [PatchSlot; 5] = [
    PatchSlot { register: "SCFI0", offset: 6, bits: width::BYTE },
    PatchSlot { register: "SCFI1", offset: 7, bits: width::BYTE },
    PatchSlot { register: "SCFQCTL", offset: 8, bits: width::BYTE },
    PatchSlot { register: "FLL_CTL0", offset: 9, bits: width::BYTE },
    PatchSlot { register: "FLL_CTL1", offset: 10, bits: width::BYTE },
];

/// One patchable byte of a probe template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSlot {
    /// Register the byte is written to
    pub register: &'static str,
    pub offset: usize,
    /// Declared width of the register field
    pub bits: u8,
}

impl PatchSlot {
    fn accepts(&self, value: u8) -> bool {
        self.bits >= 8 || u16::from(value) < (1u16 << self.bits)
    }
}

/// Immutable probe template plus its patch slots
#[derive(Debug, Clone)]
pub struct ProbeImage {
    family: DeviceFamily,
    template: Arc<[u8]>,
    slots: Arc<[PatchSlot]>,
}

impl ProbeImage {
    /// Create an image from a template and its patch slots
    ///
    /// Slots are listed in register component order and must lie inside the
    /// template.
    pub fn new(
        family: DeviceFamily,
        template: impl Into<Arc<[u8]>>,
        slots: impl Into<Arc<[PatchSlot]>>,
    ) -> Result<Self> {
        let template = template.into();
        let slots = slots.into();

        let expected = component_count(family);
        if slots.len() != expected {
            return Err(DcoError::config(format!(
                "{} probe needs {} patch slots, got {}",
                family.name(),
                expected,
                slots.len()
            )));
        }
        if let Some(slot) = slots.iter().find(|s| s.offset >= template.len()) {
            return Err(DcoError::config(format!(
                "patch slot for {} at offset {} is outside the {}-byte template",
                slot.register,
                slot.offset,
                template.len()
            )));
        }

        Ok(Self { family, template, slots })
    }

    /// Built-in probe for the basic clock module
    pub fn basic_clock() -> Self {
        Self {
            family: DeviceFamily::Basic,
            template: Arc::from(&COUNTER_FUNCLET[..]),
            slots: Arc::from(&BASIC_CLOCK_SLOTS[..]),
        }
    }

    /// Built-in probe for the FLL+ clock module
    pub fn fll_plus() -> Self {
        Self {
            family: DeviceFamily::FllPlus,
            template: Arc::from(&COUNTERPLUS_FUNCLET[..]),
            slots: Arc::from(&FLL_PLUS_SLOTS[..]),
        }
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn template(&self) -> &[u8] {
        &self.template
    }

    pub fn slots(&self) -> &[PatchSlot] {
        &self.slots
    }

    /// Copy of the template with the setting's values in the patch slots
    pub fn build(&self, setting: &RegisterSetting) -> Result<Vec<u8>> {
        if setting.family() != self.family {
            return Err(DcoError::FamilyMismatch {
                image: self.family.name(),
                setting: setting.family().name(),
            });
        }

        let mut image = self.template.to_vec();
        for (slot, value) in self.slots.iter().zip(setting.components()) {
            if !slot.accepts(value) {
                return Err(DcoError::InvalidSetting {
                    register: slot.register,
                    value,
                    bits: slot.bits,
                });
            }
            image[slot.offset] = value;
        }
        Ok(image)
    }

    /// Read the register setting back out of a built image
    pub fn decode(&self, image: &[u8]) -> Result<RegisterSetting> {
        if image.len() != self.template.len() {
            return Err(DcoError::InvalidMeasurement(format!(
                "image is {} bytes, {} probe is {} bytes",
                image.len(),
                self.family.name(),
                self.template.len()
            )));
        }
        let values: Vec<u8> = self.slots.iter().map(|slot| image[slot.offset]).collect();
        RegisterSetting::from_components(self.family, &values).ok_or_else(|| {
            DcoError::InvalidMeasurement(format!("cannot decode {} probe", self.family.name()))
        })
    }
}

fn component_count(family: DeviceFamily) -> usize {
    match family {
        DeviceFamily::Basic => BASIC_CLOCK_SLOTS.len(),
        DeviceFamily::FllPlus => FLL_PLUS_SLOTS.len(),
    }
}

/// Source of probe templates
pub trait ImageStore {
    fn load_template(&self, family: DeviceFamily) -> Result<ProbeImage>;
}

/// The probe templates shipped with this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinImages;

impl ImageStore for BuiltinImages {
    fn load_template(&self, family: DeviceFamily) -> Result<ProbeImage> {
        Ok(match family {
            DeviceFamily::Basic => ProbeImage::basic_clock(),
            DeviceFamily::FllPlus => ProbeImage::fll_plus(),
        })
    }
}
