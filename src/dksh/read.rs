//! Module parsing.

use super::{
    DkshHeader, Module, ProgramHeader, RawProgramHeader, DKSH_MAGIC, DKSH_VERSION, HEADER_SIZE,
    MODULE_ALIGN, PROGRAM_HEADER_SIZE,
};
use crate::diagnostic::Diagnostic;

fn malformed(what: String) -> Diagnostic {
    Diagnostic::bare(format!("malformed DKSH module: {}", what))
}

/// Decode and validate a module.
pub fn parse_module(bytes: &[u8]) -> Result<Module, Diagnostic> {
    if bytes.len() < HEADER_SIZE {
        return Err(malformed(format!(
            "{} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_SIZE
        )));
    }
    let header = bytemuck::pod_read_unaligned::<DkshHeader>(&bytes[..HEADER_SIZE]).swap_le();

    if header.magic != DKSH_MAGIC {
        return Err(malformed(format!("bad magic {:#010x}", header.magic))
            .with_help("DKSH files start with the bytes \"DKSH\"".to_string()));
    }
    if header.version != DKSH_VERSION {
        return Err(malformed(format!("unsupported version {}", header.version)));
    }

    let module_sz = header.module_sz as usize;
    if module_sz < HEADER_SIZE || module_sz % MODULE_ALIGN != 0 {
        return Err(malformed(format!("module size {} is not a multiple of 64", module_sz)));
    }
    let headers_len = header.num_programs as usize * PROGRAM_HEADER_SIZE;
    let expected = module_sz + headers_len;
    if bytes.len() < expected {
        return Err(malformed(format!(
            "expected {} bytes for {} programs, found {}",
            expected,
            header.num_programs,
            bytes.len()
        )));
    }

    let data = bytes[HEADER_SIZE..module_sz].to_vec();
    let mut programs = Vec::with_capacity(header.num_programs as usize);
    for (i, chunk) in bytes[module_sz..expected]
        .chunks_exact(PROGRAM_HEADER_SIZE)
        .enumerate()
    {
        let raw = bytemuck::pod_read_unaligned::<RawProgramHeader>(chunk).swap_le();
        let program = ProgramHeader::from_raw(&raw).ok_or_else(|| {
            malformed(format!("program {} has unknown type {}", i, raw.program_type))
        })?;
        if program.entrypoint as usize > data.len() {
            return Err(malformed(format!(
                "program {} entrypoint {:#x} is outside module data",
                i, program.entrypoint
            )));
        }
        let cb_end = program.constbuf1_off as usize + program.constbuf1_sz as usize;
        if cb_end > data.len() {
            return Err(malformed(format!(
                "program {} constbuf1 ends at {:#x}, past module data",
                i, cb_end
            )));
        }
        programs.push(program);
    }

    Ok(Module { programs, data })
}
