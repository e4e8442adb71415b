pub mod build;
pub mod inspect;

use std::path::Path;
use std::process;

use dkshc::codegen::ExternalCodegen;
use dkshc::diagnostic::Diagnostic;
use dkshc::target::TargetConfig;
use dkshc::{CompileOptions, Stage};

/// clap value parser for `--stage`.
pub fn parse_stage(s: &str) -> Result<Stage, String> {
    Stage::from_mnemonic(s).ok_or_else(|| {
        let names: Vec<&str> = Stage::ALL.iter().map(|s| s.mnemonic()).collect();
        format!("unknown stage '{}' (expected one of: {})", s, names.join(", "))
    })
}

fn exit_with(diag: &Diagnostic) -> ! {
    diag.render_plain();
    process::exit(1);
}

pub fn read_file(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| {
        eprintln!("error: cannot read '{}': {}", path.display(), e);
        process::exit(1);
    })
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Err(e) = std::fs::write(path, bytes) {
        eprintln!("error: cannot write '{}': {}", path.display(), e);
        process::exit(1);
    }
}

/// Resolve the target and build CompileOptions.
pub fn resolve_options(stage: Stage, target: &str, opt_level: u32) -> CompileOptions {
    let target_config = TargetConfig::resolve(target).unwrap_or_else(|d| exit_with(&d));
    CompileOptions::for_stage(stage)
        .with_target(target_config)
        .with_opt_level(opt_level)
}

/// The code generator given on the command line, else the target's.
pub fn resolve_codegen(cli_command: Option<&str>, target: &TargetConfig) -> ExternalCodegen {
    let line = cli_command.or(target.codegen.as_deref());
    match line.and_then(ExternalCodegen::from_command_line) {
        Some(codegen) => codegen,
        None => exit_with(
            &Diagnostic::bare(format!(
                "no code generator configured for target '{}'",
                target.name
            ))
            .with_help(format!(
                "pass --codegen <command> or set [codegen] command in targets/{}.toml",
                target.name
            )),
        ),
    }
}
