use std::path::PathBuf;
use std::process;

use clap::Args;

use dkshc::diagnostic::Diagnostic;
use dkshc::dksh::{parse_module, ProgramHeader, StageParams};
use dkshc::span::Span;

use super::read_file;

#[derive(Args)]
pub struct InspectArgs {
    /// DKSH module to inspect
    pub input: PathBuf,
    /// Show the full content hash
    #[arg(long)]
    pub full: bool,
}

pub fn cmd_inspect(args: InspectArgs) {
    let bytes = read_file(&args.input);
    let module = match parse_module(&bytes) {
        Ok(m) => m,
        Err(e) => {
            e.render_plain();
            process::exit(1);
        }
    };

    if bytes.len() > module.file_size() {
        Diagnostic::warning(
            format!(
                "{} trailing bytes after the program headers",
                bytes.len() - module.file_size()
            ),
            Span::dummy(),
        )
        .render_plain();
    }

    let hash = module.hash();
    if args.full {
        println!("Module: {} {}", hash.to_hex(), args.input.display());
    } else {
        println!("Module: {} {}", hash, args.input.display());
    }
    println!(
        "  {} programs, module size {:#x}, file size {:#x}",
        module.programs.len(),
        module.module_size(),
        bytes.len()
    );
    for (i, program) in module.programs.iter().enumerate() {
        println!("  [{}] {}", i, describe_program(program));
        let params = describe_params(&program.params);
        if !params.is_empty() {
            println!("      {}", params);
        }
    }
}

fn describe_program(p: &ProgramHeader) -> String {
    let mut s = format!(
        "{} entry={:#06x} gprs={} scratch={:#x}",
        p.stage(),
        p.entrypoint,
        p.num_gprs,
        p.per_warp_scratch_sz
    );
    if p.constbuf1_sz != 0 {
        s.push_str(&format!(
            " constbuf1={:#06x}+{:#x}",
            p.constbuf1_off, p.constbuf1_sz
        ));
    }
    s
}

fn describe_params(params: &StageParams) -> String {
    match params {
        StageParams::Vertex {
            alt_entrypoint,
            alt_num_gprs,
        } if *alt_num_gprs != 0 => {
            format!("alt entry={:#06x} gprs={}", alt_entrypoint, alt_num_gprs)
        }
        StageParams::Fragment {
            early_fragment_tests,
            post_depth_coverage,
            sample_shading,
            ..
        } => {
            let flags: Vec<&str> = [
                (*early_fragment_tests, "early_fragment_tests"),
                (*post_depth_coverage, "post_depth_coverage"),
                (*sample_shading, "sample_shading"),
            ]
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, name)| *name)
            .collect();
            flags.join(" ")
        }
        StageParams::TessEval { param_c8 } => format!("tess mode={:#05x}", param_c8),
        StageParams::Compute {
            block_dims,
            shared_mem_sz,
            local_pos_mem_sz,
            num_barriers,
            ..
        } => format!(
            "block={}x{}x{} shared={:#x} local={:#x} barriers={}",
            block_dims[0], block_dims[1], block_dims[2], shared_mem_sz, local_pos_mem_sz, num_barriers
        ),
        _ => String::new(),
    }
}
