//! Module assembly and serialization.

use std::path::Path;

use super::{
    align_up, Module, ProgramHeader, StageParams, HEADER_SIZE, MODULE_ALIGN,
};
use crate::diagnostic::Diagnostic;

/// Threads per warp; scratch is reserved per warp.
pub const WARP_SIZE: u32 = 32;

/// One finished program ready to be placed in a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramData {
    /// Finished machine code, a whole number of 8-word groups.
    pub code: Vec<u8>,
    pub constbuf1: Vec<u8>,
    pub num_gprs: u32,
    /// Per-thread local memory in bytes.
    pub tls_space: u32,
    pub params: StageParams,
}

/// Collects programs and lays them out in module data.
#[derive(Clone, Debug, Default)]
pub struct ModuleBuilder {
    programs: Vec<ProgramHeader>,
    data: Vec<u8>,
}

fn pad_to(data: &mut Vec<u8>, align: usize) {
    data.resize(align_up(data.len(), align), 0);
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Append a program; returns its index in the header array.
    pub fn add_program(&mut self, program: ProgramData) -> usize {
        pad_to(&mut self.data, MODULE_ALIGN);
        let entrypoint = self.data.len() as u32;
        self.data.extend_from_slice(&program.code);
        pad_to(&mut self.data, MODULE_ALIGN);

        let (constbuf1_off, constbuf1_sz) = if program.constbuf1.is_empty() {
            (0, 0)
        } else {
            let off = self.data.len() as u32;
            self.data.extend_from_slice(&program.constbuf1);
            pad_to(&mut self.data, MODULE_ALIGN);
            (off, program.constbuf1.len() as u32)
        };

        self.programs.push(ProgramHeader {
            entrypoint,
            num_gprs: program.num_gprs,
            constbuf1_off,
            constbuf1_sz,
            per_warp_scratch_sz: program.tls_space * WARP_SIZE,
            params: program.params,
        });
        self.programs.len() - 1
    }

    pub fn build(self) -> Module {
        let mut data = self.data;
        let module_sz = align_up(HEADER_SIZE + data.len(), MODULE_ALIGN);
        data.resize(module_sz - HEADER_SIZE, 0);
        Module {
            programs: self.programs,
            data,
        }
    }
}

impl Module {
    /// Encode the whole module.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.file_size());
        out.extend_from_slice(bytemuck::bytes_of(&self.header().swap_le()));
        out.extend_from_slice(&self.data);
        for program in &self.programs {
            out.extend_from_slice(bytemuck::bytes_of(&program.to_raw().swap_le()));
        }
        out
    }
}

/// Write `module` to `path` in one go.
pub fn write_module(path: &Path, module: &Module) -> Result<(), Diagnostic> {
    std::fs::write(path, module.to_bytes()).map_err(|e| {
        Diagnostic::bare(format!("cannot write '{}': {}", path.display(), e))
    })
}
