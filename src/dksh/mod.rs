//! The DKSH module container.
//!
//! ```text
//! 0                48                        module_sz
//! | DkshHeader     | module data ...  (pad)  | ProgramHeader * num_programs |
//! ```
//!
//! Module data holds one code block per program, each 64-byte aligned and
//! followed by that program's constant buffer 1 image (also 64-byte
//! aligned). Offsets inside program headers count from the start of module
//! data. All fields are little-endian.

pub mod hash;
pub mod read;
pub mod write;


use bytemuck::{Pod, Zeroable};

use crate::stage::Stage;

pub use hash::ModuleHash;
pub use read::parse_module;
pub use write::{write_module, ModuleBuilder, ProgramData};

/// `"DKSH"` read as a little-endian u32.
pub const DKSH_MAGIC: u32 = 0x4853_4B44;
pub const DKSH_VERSION: u32 = 0;
pub const HEADER_SIZE: usize = std::mem::size_of::<DkshHeader>();
pub const PROGRAM_HEADER_SIZE: usize = std::mem::size_of::<RawProgramHeader>();
/// Alignment of code blocks, constbuf1 images and the header array.
pub const MODULE_ALIGN: usize = 64;

/// Words in the stage-specific union of a program header.
pub const STAGE_WORDS: usize = 9;

pub fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// File header, exactly as stored.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DkshHeader {
    pub magic: u32,
    pub version: u32,
    pub num_programs: u32,
    /// Header plus module data, a multiple of 64.
    pub module_sz: u32,
    pub reserved: [u32; 8],
}

/// Program header, exactly as stored. `stage` is the stage union, whose
/// interpretation depends on `program_type`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RawProgramHeader {
    pub program_type: u32,
    pub entrypoint: u32,
    pub num_gprs: u32,
    pub constbuf1_off: u32,
    pub constbuf1_sz: u32,
    pub per_warp_scratch_sz: u32,
    pub stage: [u32; STAGE_WORDS],
    pub reserved: u32,
}

const _: () = assert!(HEADER_SIZE == 48);
const _: () = assert!(PROGRAM_HEADER_SIZE == 64);

impl DkshHeader {
    /// Byte-swap every field between host and file order.
    pub(crate) fn swap_le(mut self) -> Self {
        self.magic = self.magic.to_le();
        self.version = self.version.to_le();
        self.num_programs = self.num_programs.to_le();
        self.module_sz = self.module_sz.to_le();
        for w in &mut self.reserved {
            *w = w.to_le();
        }
        self
    }
}

impl RawProgramHeader {
    pub(crate) fn swap_le(mut self) -> Self {
        self.program_type = self.program_type.to_le();
        self.entrypoint = self.entrypoint.to_le();
        self.num_gprs = self.num_gprs.to_le();
        self.constbuf1_off = self.constbuf1_off.to_le();
        self.constbuf1_sz = self.constbuf1_sz.to_le();
        self.per_warp_scratch_sz = self.per_warp_scratch_sz.to_le();
        for w in &mut self.stage {
            *w = w.to_le();
        }
        self.reserved = self.reserved.to_le();
        self
    }
}

/// Stage-specific part of a program header.
///
/// Fields named after register offsets (`param_d8`, `table_490`, ...) are
/// hardware state the driver copies verbatim; nothing in this crate derives
/// them yet, so the compile pipeline leaves them zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageParams {
    Vertex {
        alt_entrypoint: u32,
        alt_num_gprs: u32,
    },
    Fragment {
        has_table_3d1: bool,
        early_fragment_tests: bool,
        post_depth_coverage: bool,
        sample_shading: bool,
        table_3d1: [u32; 4],
        param_d8: u32,
        param_65b: u16,
        param_489: u16,
    },
    Geometry {
        flag_47c: bool,
        has_table_490: bool,
        table_490: [u32; 8],
    },
    TessCtrl,
    TessEval {
        param_c8: u32,
    },
    Compute {
        block_dims: [u32; 3],
        shared_mem_sz: u32,
        local_pos_mem_sz: u32,
        local_neg_mem_sz: u32,
        crs_sz: u32,
        num_barriers: u32,
    },
}

fn pack_bytes(bytes: [bool; 4]) -> u32 {
    u32::from_le_bytes(bytes.map(u8::from))
}

fn unpack_bytes(word: u32) -> [bool; 4] {
    word.to_le_bytes().map(|b| b != 0)
}

impl StageParams {
    /// All-zero parameters for `stage`.
    pub fn zeroed(stage: Stage) -> Self {
        Self::decode(stage, &[0; STAGE_WORDS])
    }

    pub fn stage(&self) -> Stage {
        match self {
            StageParams::Vertex { .. } => Stage::Vertex,
            StageParams::Fragment { .. } => Stage::Fragment,
            StageParams::Geometry { .. } => Stage::Geometry,
            StageParams::TessCtrl => Stage::TessCtrl,
            StageParams::TessEval { .. } => Stage::TessEval,
            StageParams::Compute { .. } => Stage::Compute,
        }
    }

    /// Lay out the stage union as nine host-order words.
    pub fn encode(&self) -> [u32; STAGE_WORDS] {
        let mut w = [0u32; STAGE_WORDS];
        match self {
            StageParams::Vertex {
                alt_entrypoint,
                alt_num_gprs,
            } => {
                w[0] = *alt_entrypoint;
                w[1] = *alt_num_gprs;
            }
            StageParams::Fragment {
                has_table_3d1,
                early_fragment_tests,
                post_depth_coverage,
                sample_shading,
                table_3d1,
                param_d8,
                param_65b,
                param_489,
            } => {
                w[0] = pack_bytes([
                    *has_table_3d1,
                    *early_fragment_tests,
                    *post_depth_coverage,
                    *sample_shading,
                ]);
                w[1..5].copy_from_slice(table_3d1);
                w[5] = *param_d8;
                w[6] = u32::from(*param_65b) | (u32::from(*param_489) << 16);
            }
            StageParams::Geometry {
                flag_47c,
                has_table_490,
                table_490,
            } => {
                w[0] = pack_bytes([*flag_47c, *has_table_490, false, false]);
                w[1..9].copy_from_slice(table_490);
            }
            StageParams::TessCtrl => {}
            StageParams::TessEval { param_c8 } => w[0] = *param_c8,
            StageParams::Compute {
                block_dims,
                shared_mem_sz,
                local_pos_mem_sz,
                local_neg_mem_sz,
                crs_sz,
                num_barriers,
            } => {
                w[0..3].copy_from_slice(block_dims);
                w[3] = *shared_mem_sz;
                w[4] = *local_pos_mem_sz;
                w[5] = *local_neg_mem_sz;
                w[6] = *crs_sz;
                w[7] = *num_barriers;
            }
        }
        w
    }

    /// Read the stage union of a `stage` program.
    pub fn decode(stage: Stage, w: &[u32; STAGE_WORDS]) -> Self {
        match stage {
            Stage::Vertex => StageParams::Vertex {
                alt_entrypoint: w[0],
                alt_num_gprs: w[1],
            },
            Stage::Fragment => {
                let [has_table_3d1, early_fragment_tests, post_depth_coverage, sample_shading] =
                    unpack_bytes(w[0]);
                StageParams::Fragment {
                    has_table_3d1,
                    early_fragment_tests,
                    post_depth_coverage,
                    sample_shading,
                    table_3d1: [w[1], w[2], w[3], w[4]],
                    param_d8: w[5],
                    param_65b: w[6] as u16,
                    param_489: (w[6] >> 16) as u16,
                }
            }
            Stage::Geometry => {
                let [flag_47c, has_table_490, _, _] = unpack_bytes(w[0]);
                let mut table_490 = [0u32; 8];
                table_490.copy_from_slice(&w[1..9]);
                StageParams::Geometry {
                    flag_47c,
                    has_table_490,
                    table_490,
                }
            }
            Stage::TessCtrl => StageParams::TessCtrl,
            Stage::TessEval => StageParams::TessEval { param_c8: w[0] },
            Stage::Compute => StageParams::Compute {
                block_dims: [w[0], w[1], w[2]],
                shared_mem_sz: w[3],
                local_pos_mem_sz: w[4],
                local_neg_mem_sz: w[5],
                crs_sz: w[6],
                num_barriers: w[7],
            },
        }
    }
}

/// A decoded program header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramHeader {
    /// Offset of the code block from the start of module data.
    pub entrypoint: u32,
    pub num_gprs: u32,
    /// Offset of the constbuf1 image from the start of module data; zero
    /// when `constbuf1_sz` is zero.
    pub constbuf1_off: u32,
    pub constbuf1_sz: u32,
    pub per_warp_scratch_sz: u32,
    pub params: StageParams,
}

impl ProgramHeader {
    pub fn stage(&self) -> Stage {
        self.params.stage()
    }

    pub fn to_raw(&self) -> RawProgramHeader {
        RawProgramHeader {
            program_type: self.stage().program_type(),
            entrypoint: self.entrypoint,
            num_gprs: self.num_gprs,
            constbuf1_off: self.constbuf1_off,
            constbuf1_sz: self.constbuf1_sz,
            per_warp_scratch_sz: self.per_warp_scratch_sz,
            stage: self.params.encode(),
            reserved: 0,
        }
    }

    /// `None` for an unknown program type tag.
    pub fn from_raw(raw: &RawProgramHeader) -> Option<Self> {
        let stage = Stage::from_program_type(raw.program_type)?;
        Some(Self {
            entrypoint: raw.entrypoint,
            num_gprs: raw.num_gprs,
            constbuf1_off: raw.constbuf1_off,
            constbuf1_sz: raw.constbuf1_sz,
            per_warp_scratch_sz: raw.per_warp_scratch_sz,
            params: StageParams::decode(stage, &raw.stage),
        })
    }
}

/// A complete module: program headers plus module data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    pub programs: Vec<ProgramHeader>,
    /// Module data including the trailing padding, so that
    /// `HEADER_SIZE + data.len()` is a multiple of 64.
    pub data: Vec<u8>,
}

impl Module {
    pub fn module_size(&self) -> u32 {
        (HEADER_SIZE + self.data.len()) as u32
    }

    pub fn header(&self) -> DkshHeader {
        DkshHeader {
            magic: DKSH_MAGIC,
            version: DKSH_VERSION,
            num_programs: self.programs.len() as u32,
            module_sz: self.module_size(),
            reserved: [0; 8],
        }
    }

    /// Total encoded size in bytes.
    pub fn file_size(&self) -> usize {
        HEADER_SIZE + self.data.len() + self.programs.len() * PROGRAM_HEADER_SIZE
    }

    /// Code of program `index`, up to its constbuf1 image, the next
    /// program, or the end of module data. Includes alignment padding.
    pub fn code_region(&self, index: usize) -> Option<&[u8]> {
        let program = self.programs.get(index)?;
        let start = program.entrypoint as usize;
        let end = if program.constbuf1_sz != 0 {
            program.constbuf1_off as usize
        } else {
            self.programs
                .iter()
                .map(|p| p.entrypoint as usize)
                .filter(|&e| e > start)
                .min()
                .unwrap_or(self.data.len())
        };
        self.data.get(start..end)
    }

    pub fn constbuf1(&self, index: usize) -> Option<&[u8]> {
        let program = self.programs.get(index)?;
        let start = program.constbuf1_off as usize;
        self.data.get(start..start + program.constbuf1_sz as usize)
    }

    pub fn hash(&self) -> ModuleHash {
        ModuleHash::of(&self.to_bytes())
    }
}
