//! The code generator collaborator and the finishing of its output.
//!
//! The back-end fills a [`ProgramInfo`] (stage interface with slots already
//! assigned, token stream, driver constant-buffer layout) and hands it to a
//! [`CodeGenerator`]. The raw code that comes back is padded to the fetch
//! granularity by [`finish`].

pub mod external;
pub mod finish;

use std::fmt;

use crate::frontend::LowLevelProgram;
use crate::stage::Stage;
use crate::varying::StageContext;

pub use external::ExternalCodegen;

/// Driver constant buffer holding draw parameters and resource handles.
pub const AUX_CONSTBUF_SLOT: u32 = 17;

/// Where the code generator finds driver-provided data in the auxiliary
/// constant buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IoBases {
    pub aux_cb_slot: u32,
    /// gl_BaseVertex, gl_BaseInstance, gl_DrawID in that order.
    pub draw_info: u16,
    /// SSBO descriptors (64-bit address, 32-bit size, padding).
    pub buf_info: u16,
    /// Texture handles (32 entries), images right after.
    pub tex_bind: u16,
    /// Framebuffer fetch texture.
    pub fbtex_bind: u16,
    /// MSAA sample position table.
    pub sample_info: u16,
    /// UBO descriptors, needed by compute which lacks hardware slots.
    pub ubo_info: u16,
}

impl IoBases {
    pub fn for_stage(stage: Stage) -> Self {
        let resbase = stage.resource_base();
        Self {
            aux_cb_slot: AUX_CONSTBUF_SLOT,
            draw_info: 0x000,
            buf_info: resbase + 0x0a0,
            tex_bind: resbase,
            fbtex_bind: 0x00c,
            sample_info: 0x830,
            ubo_info: 0x000,
        }
    }
}

/// Everything the code generator needs for one program.
#[derive(Clone, Debug)]
pub struct ProgramInfo<'a> {
    /// Stage, revision and varyings with slots assigned.
    pub interface: &'a StageContext,
    pub program: &'a LowLevelProgram,
    pub opt_level: u32,
    /// Workgroup-shared memory declared by the front-end, in bytes.
    pub shared_memory_size: u32,
    pub io: IoBases,
}

impl ProgramInfo<'_> {
    pub fn stage(&self) -> Stage {
        self.interface.stage
    }

    pub fn target(&self) -> u32 {
        self.interface.target
    }
}

/// Raw output of a successful code generation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Little-endian machine code, a whole number of 64-bit words.
    pub code: Vec<u8>,
    pub num_gprs: u32,
    /// Per-thread local memory in bytes.
    pub tls_space: u32,
    pub num_barriers: u32,
    /// Immediate data for constant buffer 1.
    pub constbuf1: Vec<u8>,
}

/// A failed code generation, carrying the generator's status code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodegenError {
    pub status: i32,
    pub detail: Option<String>,
}

impl CodegenError {
    pub fn new(status: i32) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code generation failed with status {}", self.status)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for CodegenError {}

/// Machine code generator for one target family.
pub trait CodeGenerator {
    /// Generator name used in messages.
    fn name(&self) -> &str;

    /// Generate code for a program whose varying slots are assigned.
    fn generate(&mut self, info: &ProgramInfo<'_>) -> Result<GeneratedCode, CodegenError>;
}
