use std::path::PathBuf;
use std::process;

use clap::Args;

use dkshc::diagnostic::render_diagnostics;
use dkshc::frontend::{Frontend, TgsiFrontend};
use dkshc::Stage;

use super::{parse_stage, read_file, resolve_codegen, resolve_options, write_file};

#[derive(Args)]
pub struct BuildArgs {
    /// Input TGSI text file
    pub input: PathBuf,
    /// Pipeline stage (vert, tess_ctrl, tess_eval, geom, frag, comp)
    #[arg(long, value_parser = parse_stage)]
    pub stage: Stage,
    /// Output module (default: <input>.dksh)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Write the canonical TGSI token dump to this file
    #[arg(long, value_name = "PATH")]
    pub tgsi: Option<PathBuf>,
    /// Write the unpadded code returned by the code generator to this file
    #[arg(long, value_name = "PATH")]
    pub raw: Option<PathBuf>,
    /// GPU target (default: gm20b)
    #[arg(long, default_value = "gm20b")]
    pub target: String,
    /// Optimization level passed to the code generator
    #[arg(short = 'O', default_value_t = 3)]
    pub opt_level: u32,
    /// Code generator command line (overrides the target's)
    #[arg(long, value_name = "CMD")]
    pub codegen: Option<String>,
    /// Print the assigned varying slots
    #[arg(long)]
    pub slots: bool,
}

pub fn cmd_build(args: BuildArgs) {
    let options = resolve_options(args.stage, &args.target, args.opt_level);
    let mut codegen = resolve_codegen(args.codegen.as_deref(), &options.target_config);

    let bytes = read_file(&args.input);
    let source = String::from_utf8_lossy(&bytes).into_owned();
    let filename = args.input.to_string_lossy().to_string();

    let mut frontend = TgsiFrontend::new();
    let program = match frontend.compile(&source, args.stage) {
        Ok(p) => p,
        Err(errors) => {
            render_diagnostics(&errors, &filename, &source);
            process::exit(1);
        }
    };

    if let Some(path) = &args.tgsi {
        write_file(path, program.to_string().as_bytes());
        eprintln!("Tokens -> {} ({} tokens)", path.display(), program.token_count());
    }

    let compiled = match dkshc::compile_program(program, &mut codegen, &options) {
        Ok(c) => c,
        Err(errors) => {
            render_diagnostics(&errors, &filename, &source);
            process::exit(1);
        }
    };

    if args.slots {
        print!("{}", compiled.interface.format_slots());
    }

    if let Some(path) = &args.raw {
        write_file(path, &compiled.raw_code);
        eprintln!("Raw code -> {} ({} bytes)", path.display(), compiled.raw_code.len());
    }

    let module = compiled.to_module();
    let out_path = args.output.unwrap_or_else(|| args.input.with_extension("dksh"));
    if let Err(e) = dkshc::dksh::write_module(&out_path, &module) {
        e.render_plain();
        process::exit(1);
    }
    eprintln!(
        "Compiled -> {} ({} {} program, {} instructions, {} GPRs)",
        out_path.display(),
        options.target_config.name,
        compiled.stage(),
        compiled.code.len(),
        compiled.num_gprs
    );
    eprintln!("Hash: {}", module.hash());
}
