//! End-to-end: TGSI text through slot assignment, a stand-in code
//! generator, finishing, and a module written to disk and read back.

use std::path::Path;

use dkshc::codegen::finish::{BRA_SELF_FIRST, NOP};
use dkshc::codegen::{CodeGenerator, CodegenError, GeneratedCode, ProgramInfo};
use dkshc::dksh::{parse_module, write_module, ModuleBuilder, StageParams};
use dkshc::frontend::TgsiFrontend;
use dkshc::target::TargetConfig;
use dkshc::{compile_with, CompileOptions, Stage};

/// Emits one instruction per TGSI instruction, tagged with its index.
struct EchoCodegen;

impl CodeGenerator for EchoCodegen {
    fn name(&self) -> &str {
        "echo"
    }

    fn generate(&mut self, info: &ProgramInfo<'_>) -> Result<GeneratedCode, CodegenError> {
        let code = (0..info.program.instructions.len() as u64)
            .flat_map(|i| (0xabcd_0000 + i).to_le_bytes())
            .collect();
        Ok(GeneratedCode {
            code,
            num_gprs: 16,
            tls_space: 0,
            num_barriers: 0,
            constbuf1: Vec::new(),
        })
    }
}

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_fragment_fixture_slots() {
    let source = fixture("passthrough.frag");
    let out = compile_with(
        &mut TgsiFrontend::new(),
        &mut EchoCodegen,
        &source,
        &CompileOptions::for_stage(Stage::Fragment),
    )
    .unwrap();

    let inputs = &out.interface.inputs;
    assert_eq!(inputs[0].slot, [Some(0x20), Some(0x21), Some(0x22), Some(0x23)]);
    assert_eq!(inputs[1].mask, 0x3);
    assert_eq!(inputs[1].slot[0], Some(0xc0));

    let outputs = &out.interface.outputs;
    assert_eq!(outputs[1].slot[0], Some(4));
    assert_eq!(outputs[2].slot, [Some(8), None, None, None]);
    assert_eq!(outputs[3].slot, [None, None, Some(9), None]);

    // 6 instructions padded to 8: a self-branch then a no-op
    assert_eq!(out.code.len(), 8);
    assert_eq!(out.code[6], 0xe240_0fff_ff87_000f);
    assert_eq!(out.code[7], NOP);
}

#[test]
fn test_vertex_fixture_slots() {
    let source = fixture("transform.vert");
    let out = compile_with(
        &mut TgsiFrontend::new(),
        &mut EchoCodegen,
        &source,
        &CompileOptions::for_stage(Stage::Vertex),
    )
    .unwrap();

    let slots = out.interface.format_slots();
    assert_eq!(
        slots,
        "IN[0] GENERIC[0] mask=0xf slots=0x020,0x021,0x022,0x023\n\
         IN[1] GENERIC[1] mask=0xf slots=0x024,0x025,0x026,0x027\n\
         OUT[0] POSITION[0] mask=0xf slots=0x01c,0x01d,0x01e,0x01f\n\
         OUT[1] GENERIC[0] mask=0xf slots=0x020,0x021,0x022,0x023\n\
         OUT[2] CLIPDIST[0] mask=0xf slots=0x0b0,0x0b1,0x0b2,0x0b3\n"
    );
    // exactly 8 instructions: no padding
    assert_eq!(out.code_bytes(), out.raw_code);
}

#[test]
fn test_module_written_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = ModuleBuilder::new();
    for (name, stage) in [("transform.vert", Stage::Vertex), ("passthrough.frag", Stage::Fragment)] {
        let compiled = compile_with(
            &mut TgsiFrontend::new(),
            &mut EchoCodegen,
            &fixture(name),
            &CompileOptions::for_stage(stage),
        )
        .unwrap();
        builder.add_program(compiled.to_program_data());
    }
    let module = builder.build();

    let path = dir.path().join("pipeline.dksh");
    write_module(&path, &module).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], b"DKSH");
    assert_eq!(bytes.len() % 64, 0);

    let parsed = parse_module(&bytes).unwrap();
    assert_eq!(parsed, module);
    assert_eq!(parsed.programs[0].stage(), Stage::Vertex);
    assert_eq!(parsed.programs[1].stage(), Stage::Fragment);
    assert_eq!(parsed.programs[1].entrypoint, 64);
    assert!(matches!(
        parsed.programs[1].params,
        StageParams::Fragment {
            early_fragment_tests: false,
            ..
        }
    ));
    assert_eq!(parsed.hash(), module.hash());
}

#[test]
fn test_kepler_target_from_file() {
    // `targets/` ships at the crate root, which is the test working directory
    let gk104 = TargetConfig::resolve("gk104").unwrap();
    let gf100 = TargetConfig::resolve("gf100").unwrap();
    let source = fixture("passthrough.frag").replace("DCL OUT[2], SAMPLEMASK\n", "");

    for (target, depth) in [(gk104, 9), (gf100, 8)] {
        let out = compile_with(
            &mut TgsiFrontend::new(),
            &mut EchoCodegen,
            &source,
            &CompileOptions::for_stage(Stage::Fragment).with_target(target),
        )
        .unwrap();
        let depth_out = out.interface.outputs.last().unwrap();
        assert_eq!(depth_out.slot[2], Some(depth));
    }
}

#[test]
fn test_single_instruction_gets_first_position_branch() {
    let source = "COMP\n  0: END\n";
    let out = compile_with(
        &mut TgsiFrontend::new(),
        &mut EchoCodegen,
        source,
        &CompileOptions::for_stage(Stage::Compute),
    )
    .unwrap();
    assert_eq!(out.code.len(), 8);
    assert_eq!(out.code[1], BRA_SELF_FIRST);
    assert_eq!(out.code[0], 0x001f_8000_fc00_07ff);
}
