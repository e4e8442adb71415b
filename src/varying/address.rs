//! Fixed byte offsets of each semantic in the attribute register file.
//!
//! Repeated roles are `base + index * stride`; singleton roles ignore the
//! index. The two directions agree on every shared role. Only inputs have
//! the point-coord, tess-coord, instance-id and vertex-id system values, and
//! only outputs know edge flag, which has no hardware slot at all.

use std::fmt;

use super::{Semantic, MAX_SEMANTIC_INDEX};

/// Which side of a stage's interface a lookup is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Result of an output address lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaryingAddress {
    /// Byte offset of component x.
    Offset(u32),
    /// A recognized output the hardware has no attribute slot for.
    Unsupported,
}

/// A semantic with no address in the requested direction.
///
/// Reaching this from the allocator means the front-end and back-end
/// disagree about the interface, so callers treat it as fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidSemantic {
    pub direction: Direction,
    pub semantic: Semantic,
    /// Set when the role has an address but this index is past the last one.
    pub index: Option<u32>,
}

impl InvalidSemantic {
    fn role(direction: Direction, semantic: Semantic) -> Self {
        Self {
            direction,
            semantic,
            index: None,
        }
    }
}

impl fmt::Display for InvalidSemantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} semantic {}", self.direction, self.semantic)?;
        if let Some(index) = self.index {
            write!(f, "[{}]: index past {}", index, MAX_SEMANTIC_INDEX)?;
        }
        Ok(())
    }
}

impl std::error::Error for InvalidSemantic {}

/// `base + index * stride` for a repeated role.
fn indexed(
    direction: Direction,
    semantic: Semantic,
    index: u32,
    base: u32,
    stride: u32,
) -> Result<u32, InvalidSemantic> {
    if index > MAX_SEMANTIC_INDEX {
        return Err(InvalidSemantic {
            direction,
            semantic,
            index: Some(index),
        });
    }
    Ok(base + index * stride)
}

/// Byte offset of an input varying.
pub fn input_address(semantic: Semantic, index: u32) -> Result<u32, InvalidSemantic> {
    let at = |base, stride| indexed(Direction::Input, semantic, index, base, stride);
    let addr = match semantic {
        Semantic::TessOuter => at(0x000, 0x4)?,
        Semantic::TessInner => at(0x010, 0x4)?,
        Semantic::Patch => at(0x020, 0x10)?,
        Semantic::PrimitiveId => 0x060,
        Semantic::Layer => 0x064,
        Semantic::ViewportIndex => 0x068,
        Semantic::PointSize => 0x06c,
        Semantic::Position => 0x070,
        Semantic::Generic => at(0x080, 0x10)?,
        Semantic::Fog => 0x2e8,
        Semantic::Color => at(0x280, 0x10)?,
        Semantic::BackColor => at(0x2a0, 0x10)?,
        Semantic::ClipDistance => at(0x2c0, 0x10)?,
        Semantic::ClipVertex => 0x270,
        Semantic::PointCoord => 0x2e0,
        Semantic::TessCoord => 0x2f0,
        Semantic::InstanceId => 0x2f8,
        Semantic::VertexId => 0x2fc,
        Semantic::Texcoord => at(0x300, 0x10)?,
        Semantic::EdgeFlag
        | Semantic::Face
        | Semantic::SampleId
        | Semantic::SamplePos
        | Semantic::SampleMask
        | Semantic::InvocationId
        | Semantic::FragDepth => {
            return Err(InvalidSemantic::role(Direction::Input, semantic))
        }
    };
    Ok(addr)
}

/// Byte offset of an output varying.
pub fn output_address(semantic: Semantic, index: u32) -> Result<VaryingAddress, InvalidSemantic> {
    let at = |base, stride| indexed(Direction::Output, semantic, index, base, stride);
    let addr = match semantic {
        Semantic::TessOuter => at(0x000, 0x4)?,
        Semantic::TessInner => at(0x010, 0x4)?,
        Semantic::Patch => at(0x020, 0x10)?,
        Semantic::PrimitiveId => 0x060,
        Semantic::Layer => 0x064,
        Semantic::ViewportIndex => 0x068,
        Semantic::PointSize => 0x06c,
        Semantic::Position => 0x070,
        Semantic::Generic => at(0x080, 0x10)?,
        Semantic::Fog => 0x2e8,
        Semantic::Color => at(0x280, 0x10)?,
        Semantic::BackColor => at(0x2a0, 0x10)?,
        Semantic::ClipDistance => at(0x2c0, 0x10)?,
        Semantic::ClipVertex => 0x270,
        Semantic::Texcoord => at(0x300, 0x10)?,
        // viewport mask would live at 0x3a0
        Semantic::EdgeFlag => return Ok(VaryingAddress::Unsupported),
        Semantic::PointCoord
        | Semantic::TessCoord
        | Semantic::InstanceId
        | Semantic::VertexId
        | Semantic::Face
        | Semantic::SampleId
        | Semantic::SamplePos
        | Semantic::SampleMask
        | Semantic::InvocationId
        | Semantic::FragDepth => {
            return Err(InvalidSemantic::role(Direction::Output, semantic))
        }
    };
    Ok(VaryingAddress::Offset(addr))
}
