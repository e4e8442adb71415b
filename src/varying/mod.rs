//! Shader-stage varyings and their hardware slot assignment.
//!
//! A stage's interface is a list of input and output varyings, each tagged
//! with a semantic role and index. The allocator in [`alloc`] turns those
//! into per-component dword slots in the attribute register file, using
//! the fixed layout in [`address`] for everything except vertex inputs and
//! fragment outputs.

pub mod address;
pub mod alloc;


use std::fmt;

use crate::stage::Stage;

pub use address::{input_address, output_address, Direction, InvalidSemantic, VaryingAddress};
pub use alloc::assign_varying_slots;

/// First chip revision (Kepler) whose fragment depth register sits one past
/// the sample mask register even when no sample mask is written.
pub const KEPLER_REVISION: u32 = 0xe0;

/// Highest index a repeated role (GENERIC, COLOR, ...) may carry.
pub const MAX_SEMANTIC_INDEX: u32 = 255;

/// Most registers a single IN or OUT declaration may span.
pub const MAX_VARYING_REGISTERS: u32 = 80;

/// The semantic role of a varying.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Color,
    BackColor,
    Fog,
    PointSize,
    Generic,
    EdgeFlag,
    PrimitiveId,
    InstanceId,
    VertexId,
    ClipDistance,
    ClipVertex,
    Texcoord,
    PointCoord,
    ViewportIndex,
    Layer,
    TessCoord,
    TessOuter,
    TessInner,
    Patch,
    Face,
    SampleId,
    SamplePos,
    SampleMask,
    InvocationId,
    /// Fragment depth output (TGSI spells it `POSITION` on a fragment output).
    FragDepth,
}

impl Semantic {
    /// The TGSI name of this semantic.
    pub fn name(self) -> &'static str {
        match self {
            Semantic::Position | Semantic::FragDepth => "POSITION",
            Semantic::Color => "COLOR",
            Semantic::BackColor => "BCOLOR",
            Semantic::Fog => "FOG",
            Semantic::PointSize => "PSIZE",
            Semantic::Generic => "GENERIC",
            Semantic::EdgeFlag => "EDGEFLAG",
            Semantic::PrimitiveId => "PRIMID",
            Semantic::InstanceId => "INSTANCEID",
            Semantic::VertexId => "VERTEXID",
            Semantic::ClipDistance => "CLIPDIST",
            Semantic::ClipVertex => "CLIPVERTEX",
            Semantic::Texcoord => "TEXCOORD",
            Semantic::PointCoord => "PCOORD",
            Semantic::ViewportIndex => "VIEWPORT_INDEX",
            Semantic::Layer => "LAYER",
            Semantic::TessCoord => "TESSCOORD",
            Semantic::TessOuter => "TESSOUTER",
            Semantic::TessInner => "TESSINNER",
            Semantic::Patch => "PATCH",
            Semantic::Face => "FACE",
            Semantic::SampleId => "SAMPLEID",
            Semantic::SamplePos => "SAMPLEPOS",
            Semantic::SampleMask => "SAMPLEMASK",
            Semantic::InvocationId => "INVOCATIONID",
        }
    }

    /// Parse a TGSI semantic name. `POSITION` always maps to
    /// [`Semantic::Position`]; the front-end rewrites fragment outputs.
    pub fn from_name(name: &str) -> Option<Self> {
        let sem = match name {
            "POSITION" => Semantic::Position,
            "COLOR" => Semantic::Color,
            "BCOLOR" => Semantic::BackColor,
            "FOG" => Semantic::Fog,
            "PSIZE" => Semantic::PointSize,
            "GENERIC" => Semantic::Generic,
            "EDGEFLAG" => Semantic::EdgeFlag,
            "PRIMID" => Semantic::PrimitiveId,
            "INSTANCEID" => Semantic::InstanceId,
            "VERTEXID" => Semantic::VertexId,
            "CLIPDIST" => Semantic::ClipDistance,
            "CLIPVERTEX" => Semantic::ClipVertex,
            "TEXCOORD" => Semantic::Texcoord,
            "PCOORD" => Semantic::PointCoord,
            "VIEWPORT_INDEX" => Semantic::ViewportIndex,
            "LAYER" => Semantic::Layer,
            "TESSCOORD" => Semantic::TessCoord,
            "TESSOUTER" => Semantic::TessOuter,
            "TESSINNER" => Semantic::TessInner,
            "PATCH" => Semantic::Patch,
            "FACE" => Semantic::Face,
            "SAMPLEID" => Semantic::SampleId,
            "SAMPLEPOS" => Semantic::SamplePos,
            "SAMPLEMASK" => Semantic::SampleMask,
            "INVOCATIONID" => Semantic::InvocationId,
            _ => return None,
        };
        Some(sem)
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Semantic::FragDepth => write!(f, "POSITION (depth)"),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// One declared input or output of a shader stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Varying {
    pub semantic: Semantic,
    pub index: u32,
    /// Live components, bit `c` for component `c` (x = bit 0).
    pub mask: u8,
    /// Hardware dword slot per component, `None` until allocated.
    pub slot: [Option<u32>; 4],
}

impl Varying {
    pub fn new(semantic: Semantic, index: u32) -> Self {
        Self {
            semantic,
            index,
            mask: 0xf,
            slot: [None; 4],
        }
    }

    pub fn with_mask(mut self, mask: u8) -> Self {
        self.mask = mask & 0xf;
        self
    }

    pub fn is_assigned(&self) -> bool {
        self.slot.iter().any(Option::is_some)
    }

    /// Assign four consecutive dwords starting at byte `offset`.
    pub(crate) fn assign_from_offset(&mut self, offset: u32) {
        for (c, slot) in self.slot.iter_mut().enumerate() {
            *slot = Some((offset + c as u32 * 4) / 4);
        }
    }
}

/// The interface of one compiled program: stage, chip revision and the
/// ordered input and output varyings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageContext {
    pub stage: Stage,
    /// Chip class revision (e.g. `0x12b` for GM20B).
    pub target: u32,
    pub inputs: Vec<Varying>,
    pub outputs: Vec<Varying>,
}

impl StageContext {
    pub fn new(stage: Stage, target: u32) -> Self {
        Self {
            stage,
            target,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<Varying>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<Varying>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Number of declared color outputs.
    pub fn num_color_outputs(&self) -> usize {
        self.outputs
            .iter()
            .filter(|v| v.semantic == Semantic::Color)
            .count()
    }

    /// Render the slot assignment as one line per varying.
    pub fn format_slots(&self) -> String {
        let mut out = String::new();
        for (dir, list) in [("IN", &self.inputs), ("OUT", &self.outputs)] {
            for (i, v) in list.iter().enumerate() {
                let slots: Vec<String> = v
                    .slot
                    .iter()
                    .map(|s| match s {
                        Some(s) => format!("{:#05x}", s),
                        None => "-".to_string(),
                    })
                    .collect();
                out.push_str(&format!(
                    "{}[{}] {}[{}] mask={:#x} slots={}\n",
                    dir,
                    i,
                    v.semantic.name(),
                    v.index,
                    v.mask,
                    slots.join(",")
                ));
            }
        }
        out
    }
}
