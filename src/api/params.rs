//! Program-header stage parameters derived from the token stream.

use crate::codegen::GeneratedCode;
use crate::dksh::StageParams;
use crate::frontend::LowLevelProgram;
use crate::stage::Stage;
use crate::varying::Semantic;

// tessellation mode word
const TESS_PRIM_ISOLINES: u32 = 0x0;
const TESS_PRIM_TRIANGLES: u32 = 0x1;
const TESS_PRIM_QUADS: u32 = 0x2;
const TESS_SPACING_EQUAL: u32 = 0x00;
const TESS_SPACING_FRACTIONAL_ODD: u32 = 0x10;
const TESS_SPACING_FRACTIONAL_EVEN: u32 = 0x20;
const TESS_CW: u32 = 0x100;
const TESS_CONNECTED: u32 = 0x200;

fn flag(program: &LowLevelProgram, name: &str) -> bool {
    program.property_u32(name).is_some_and(|v| v != 0)
}

/// Tessellation domain; accepts the primitive name or its gallium number.
fn tess_domain(value: Option<&str>) -> u32 {
    match value {
        Some("LINES" | "ISOLINES" | "1") => TESS_PRIM_ISOLINES,
        Some("QUADS" | "7") => TESS_PRIM_QUADS,
        _ => TESS_PRIM_TRIANGLES,
    }
}

fn tess_spacing(value: Option<&str>) -> u32 {
    match value {
        Some("FRACTIONAL_ODD" | "0") => TESS_SPACING_FRACTIONAL_ODD,
        Some("FRACTIONAL_EVEN" | "1") => TESS_SPACING_FRACTIONAL_EVEN,
        _ => TESS_SPACING_EQUAL,
    }
}

/// Tessellator mode word: domain in bits 0-1, spacing in bits 4-5, then
/// clockwise winding and connected (non-point) output.
pub fn tess_mode(program: &LowLevelProgram) -> u32 {
    let mut mode = tess_domain(program.property("TES_PRIM_MODE"))
        | tess_spacing(program.property("TES_SPACING"));
    if flag(program, "TES_VERTEX_ORDER_CW") {
        mode |= TESS_CW;
    }
    if !flag(program, "TES_POINT_MODE") {
        mode |= TESS_CONNECTED;
    }
    mode
}

/// Fill in the stage union for a finished program. Hardware state nothing
/// here can derive stays zero.
pub fn stage_params(program: &LowLevelProgram, generated: &GeneratedCode) -> StageParams {
    match program.stage {
        Stage::Fragment => StageParams::Fragment {
            has_table_3d1: false,
            early_fragment_tests: flag(program, "FS_EARLY_DEPTH_STENCIL"),
            post_depth_coverage: flag(program, "FS_POST_DEPTH_COVERAGE"),
            sample_shading: program.reads_system_value(Semantic::SampleId)
                || program.reads_system_value(Semantic::SamplePos),
            table_3d1: [0; 4],
            param_d8: 0,
            param_65b: 0,
            param_489: 0,
        },
        Stage::TessEval => StageParams::TessEval {
            param_c8: tess_mode(program),
        },
        Stage::Compute => {
            let dim = |name| program.property_u32(name).unwrap_or(1);
            StageParams::Compute {
                block_dims: [
                    dim("CS_FIXED_BLOCK_WIDTH"),
                    dim("CS_FIXED_BLOCK_HEIGHT"),
                    dim("CS_FIXED_BLOCK_DEPTH"),
                ],
                shared_mem_sz: program.shared_memory_size(),
                local_pos_mem_sz: generated.tls_space,
                local_neg_mem_sz: 0,
                crs_sz: 0,
                num_barriers: generated.num_barriers,
            }
        }
        stage => StageParams::zeroed(stage),
    }
}
