//! Pipeline stages and their fixed per-stage properties.

use std::fmt;

/// A programmable pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Vertex,
    TessCtrl,
    TessEval,
    Geometry,
    Fragment,
    Compute,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Vertex,
        Stage::TessCtrl,
        Stage::TessEval,
        Stage::Geometry,
        Stage::Fragment,
        Stage::Compute,
    ];

    /// Short command-line mnemonic (`vert`, `frag`, ...).
    pub fn mnemonic(self) -> &'static str {
        match self {
            Stage::Vertex => "vert",
            Stage::TessCtrl => "tess_ctrl",
            Stage::TessEval => "tess_eval",
            Stage::Geometry => "geom",
            Stage::Fragment => "frag",
            Stage::Compute => "comp",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.mnemonic() == s)
    }

    /// Processor header keyword of the TGSI text form.
    pub fn processor_name(self) -> &'static str {
        match self {
            Stage::Vertex => "VERT",
            Stage::TessCtrl => "TESS_CTRL",
            Stage::TessEval => "TESS_EVAL",
            Stage::Geometry => "GEOM",
            Stage::Fragment => "FRAG",
            Stage::Compute => "COMP",
        }
    }

    pub fn from_processor_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.processor_name() == s)
    }

    /// Program type tag stored in a DKSH program header.
    pub fn program_type(self) -> u32 {
        match self {
            Stage::Vertex => 0,
            Stage::Fragment => 1,
            Stage::Geometry => 2,
            Stage::TessCtrl => 3,
            Stage::TessEval => 4,
            Stage::Compute => 5,
        }
    }

    pub fn from_program_type(tag: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.program_type() == tag)
    }

    /// Start of this stage's resource area in the driver constant buffer.
    pub fn resource_base(self) -> u16 {
        match self {
            Stage::Vertex => 0x010,
            Stage::TessCtrl => 0x1b0,
            Stage::TessEval => 0x350,
            Stage::Geometry => 0x4f0,
            Stage::Fragment => 0x690,
            Stage::Compute => 0x080,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
