//! Slot allocation policies.
//!
//! Inputs: the vertex stage packs attributes by declaration order, every
//! other stage reads the fixed inter-stage layout. Outputs: the fragment
//! stage packs render targets densely into the color registers, every
//! other stage writes the fixed layout.

use super::address::{input_address, output_address, VaryingAddress};
use super::{Semantic, StageContext, Varying, KEPLER_REVISION};
use crate::stage::Stage;

/// Byte offset of the first vertex attribute.
const VERTEX_ATTRIB_BASE: u32 = 0x80;
/// Bytes per packed vertex attribute.
const VERTEX_ATTRIB_STRIDE: u32 = 0x10;
/// Render targets addressable by a fragment color output.
pub const MAX_COLOR_OUTPUTS: usize = 8;

/// Fill in `slot[]` (and `mask` for synthesized system values) of every
/// input and output of `ctx`.
///
/// The result depends only on the stage, revision and the semantics of the
/// varyings: slots from an earlier run are cleared first.
///
/// # Panics
///
/// Panics if a varying's semantic has no address in its direction, or a
/// fragment color output names a render target past the last one. Both mean
/// the front-end produced an interface this back-end cannot express.
pub fn assign_varying_slots(ctx: &mut StageContext) {
    for v in ctx.inputs.iter_mut().chain(ctx.outputs.iter_mut()) {
        v.slot = [None; 4];
    }

    if ctx.stage == Stage::Vertex {
        assign_vertex_inputs(&mut ctx.inputs);
    } else {
        assign_fixed_inputs(&mut ctx.inputs);
    }

    if ctx.stage == Stage::Fragment {
        let colors = ctx.num_color_outputs() as u32 * 4;
        assign_fragment_outputs(&mut ctx.outputs, colors, ctx.target);
    } else {
        assign_fixed_outputs(&mut ctx.outputs);
    }
}

fn input_offset(v: &Varying, index: u32) -> u32 {
    input_address(v.semantic, index).unwrap_or_else(|e| panic!("{}", e))
}

fn assign_vertex_inputs(inputs: &mut [Varying]) {
    let mut n = 0;
    for v in inputs.iter_mut() {
        match v.semantic {
            // driver-synthesized system values, not fetched from a vertex buffer
            Semantic::InstanceId | Semantic::VertexId => {
                v.mask = 0x1;
                v.slot[0] = Some(input_offset(v, 0) / 4);
            }
            _ => {
                v.assign_from_offset(VERTEX_ATTRIB_BASE + n * VERTEX_ATTRIB_STRIDE);
                n += 1;
            }
        }
    }
}

fn assign_fixed_inputs(inputs: &mut [Varying]) {
    for v in inputs.iter_mut() {
        let offset = input_offset(v, v.index);
        v.assign_from_offset(offset);
    }
}

fn assign_fragment_outputs(outputs: &mut [Varying], colors: u32, target: u32) {
    let mut count = colors;

    // Skipped render targets get no registers, so rank the present ones.
    let mut present = [false; MAX_COLOR_OUTPUTS];
    for v in outputs.iter().filter(|v| v.semantic == Semantic::Color) {
        let rt = v.index as usize;
        if rt >= MAX_COLOR_OUTPUTS {
            panic!(
                "invalid output semantic COLOR[{}]: only {} render targets",
                v.index, MAX_COLOR_OUTPUTS
            );
        }
        present[rt] = true;
    }
    let mut rank = [0u32; MAX_COLOR_OUTPUTS];
    let mut next = 0;
    for (rt, &used) in present.iter().enumerate() {
        if used {
            rank[rt] = next;
            next += 1;
        }
    }
    for v in outputs.iter_mut().filter(|v| v.semantic == Semantic::Color) {
        let base = rank[v.index as usize] * 4;
        for (c, slot) in v.slot.iter_mut().enumerate() {
            *slot = Some(base + c as u32);
        }
    }

    // The sample mask must be placed first: depth goes after it.
    if let Some(mask) = outputs
        .iter_mut()
        .find(|v| v.semantic == Semantic::SampleMask)
    {
        mask.slot[0] = Some(count);
        count += 1;
    } else if target >= KEPLER_REVISION {
        // Kepler and later keep the sample mask register reserved
        count += 1;
    }

    if let Some(depth) = outputs.iter_mut().find(|v| v.semantic == Semantic::FragDepth) {
        depth.slot[2] = Some(count);
    }
}

fn assign_fixed_outputs(outputs: &mut [Varying]) {
    for v in outputs.iter_mut() {
        match output_address(v.semantic, v.index) {
            Ok(VaryingAddress::Offset(offset)) => v.assign_from_offset(offset),
            Ok(VaryingAddress::Unsupported) => {}
            Err(e) => panic!("{}", e),
        }
    }
}
