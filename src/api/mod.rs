//! The compile pipeline: front-end, slot assignment, code generation,
//! finishing, and module assembly.

pub mod params;


use crate::codegen::finish::{finish, words_from_bytes, words_to_bytes};
use crate::codegen::{CodeGenerator, GeneratedCode, IoBases, ProgramInfo};
use crate::config::target::TargetConfig;
use crate::diagnostic::Diagnostic;
use crate::dksh::{Module, ModuleBuilder, ProgramData, StageParams};
use crate::frontend::{Frontend, LowLevelProgram};
use crate::stage::Stage;
use crate::varying::{assign_varying_slots, StageContext};

pub use params::stage_params;

/// Options controlling one compilation.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    pub stage: Stage,
    /// Optimization level passed through to the code generator.
    pub opt_level: u32,
    pub target_config: TargetConfig,
}

impl CompileOptions {
    pub fn for_stage(stage: Stage) -> Self {
        Self {
            stage,
            opt_level: 3,
            target_config: TargetConfig::gm20b(),
        }
    }

    pub fn with_target(mut self, target_config: TargetConfig) -> Self {
        self.target_config = target_config;
        self
    }

    pub fn with_opt_level(mut self, opt_level: u32) -> Self {
        self.opt_level = opt_level;
        self
    }
}

/// A compiled and finished program.
#[derive(Clone, Debug)]
pub struct CompiledProgram {
    pub program: LowLevelProgram,
    /// Stage interface with slots assigned.
    pub interface: StageContext,
    /// Code exactly as the generator returned it.
    pub raw_code: Vec<u8>,
    /// Finished code, a multiple of 8 words.
    pub code: Vec<u64>,
    pub num_gprs: u32,
    pub tls_space: u32,
    pub num_barriers: u32,
    pub constbuf1: Vec<u8>,
    pub params: StageParams,
}

impl CompiledProgram {
    pub fn stage(&self) -> Stage {
        self.program.stage
    }

    pub fn code_bytes(&self) -> Vec<u8> {
        words_to_bytes(&self.code)
    }

    pub fn to_program_data(&self) -> ProgramData {
        ProgramData {
            code: self.code_bytes(),
            constbuf1: self.constbuf1.clone(),
            num_gprs: self.num_gprs,
            tls_space: self.tls_space,
            params: self.params.clone(),
        }
    }

    /// A module holding just this program.
    pub fn to_module(&self) -> Module {
        let mut builder = ModuleBuilder::new();
        builder.add_program(self.to_program_data());
        builder.build()
    }
}

/// Run the whole pipeline on `source`.
///
/// Front-end diagnostics are returned unrendered; spans point into
/// `source`.
pub fn compile_with(
    frontend: &mut dyn Frontend,
    codegen: &mut dyn CodeGenerator,
    source: &str,
    options: &CompileOptions,
) -> Result<CompiledProgram, Vec<Diagnostic>> {
    let program = frontend.compile(source, options.stage)?;
    compile_program(program, codegen, options)
}

/// Assign slots, generate code and finish it for an already parsed program.
pub fn compile_program(
    program: LowLevelProgram,
    codegen: &mut dyn CodeGenerator,
    options: &CompileOptions,
) -> Result<CompiledProgram, Vec<Diagnostic>> {
    let mut interface = program.interface(options.target_config.revision);
    assign_varying_slots(&mut interface);

    let info = ProgramInfo {
        interface: &interface,
        program: &program,
        opt_level: options.opt_level,
        shared_memory_size: program.shared_memory_size(),
        io: IoBases::for_stage(program.stage),
    };
    let generated = codegen.generate(&info).map_err(|e| {
        vec![Diagnostic::bare(e.to_string())
            .with_note(format!("code generator: {}", codegen.name()))]
    })?;

    finish_generated(program, interface, generated).map_err(|d| vec![d])
}

fn finish_generated(
    program: LowLevelProgram,
    interface: StageContext,
    generated: GeneratedCode,
) -> Result<CompiledProgram, Diagnostic> {
    if generated.code.len() % 8 != 0 {
        return Err(Diagnostic::bare(format!(
            "code generator returned {} bytes, not a whole number of 64-bit instructions",
            generated.code.len()
        )));
    }
    let params = stage_params(&program, &generated);
    let code = finish(words_from_bytes(&generated.code));

    Ok(CompiledProgram {
        program,
        interface,
        raw_code: generated.code,
        code,
        num_gprs: generated.num_gprs,
        tls_space: generated.tls_space,
        num_barriers: generated.num_barriers,
        constbuf1: generated.constbuf1,
        params,
    })
}
