use super::*;
use crate::frontend::{Frontend, SemanticDecl};
use crate::varying::Semantic;

const VERTEX: &str = "\
VERT
DCL IN[0]
DCL IN[1]
DCL SV[0], INSTANCEID
DCL OUT[0], POSITION
DCL OUT[1].xyz, GENERIC[1]
DCL CONST[0][0..3]
DCL TEMP[0..1], LOCAL
IMM[0] FLT32 { 0x00000000, 0x3f800000, 0x00000000, 0x00000000}
  0: MOV OUT[0], IN[0]
  1: MAD TEMP[0].xy, IN[1].xyyy, CONST[0][1].xyyy, IMM[0].xxxx
  2: MOV OUT[1].xyz, TEMP[0].xyxx
  3: END
";

const FRAGMENT: &str = "\
FRAG
PROPERTY FS_EARLY_DEPTH_STENCIL 1
DCL IN[0], GENERIC[0], PERSPECTIVE
DCL OUT[0], COLOR
DCL OUT[1], COLOR[2]
DCL OUT[2], POSITION
DCL SV[0], SAMPLEID
  0: MOV OUT[0], IN[0]
  1: MOV OUT[1], IN[0]
  2: MOV OUT[2].z, IN[0].xxxx
  3: END
";

fn compile(source: &str, stage: Stage) -> Result<LowLevelProgram, Vec<Diagnostic>> {
    TgsiFrontend::new().compile(source, stage)
}

#[test]
fn test_parse_vertex_program() {
    let p = compile(VERTEX, Stage::Vertex).unwrap();
    assert_eq!(p.stage, Stage::Vertex);
    assert_eq!(p.declarations.len(), 7);
    assert_eq!(p.immediates.len(), 1);
    assert_eq!(p.instructions.len(), 4);
    assert_eq!(p.token_count(), 12);

    let out1 = &p.declarations[4];
    assert_eq!(out1.file, RegisterFile::Output);
    assert_eq!(out1.mask, 0x7);
    assert_eq!(out1.semantic, Some(SemanticDecl::Known(Semantic::Generic, 1)));

    let konst = &p.declarations[5];
    assert_eq!(konst.dimension, Some(0));
    assert_eq!((konst.first, konst.last), (0, 3));

    let temp = &p.declarations[6];
    assert_eq!(temp.semantic, None);
    assert_eq!(temp.attrs, vec!["LOCAL"]);

    let mad = &p.instructions[1];
    assert_eq!(mad.opcode, "MAD");
    assert_eq!(mad.operands.len(), 4);
    assert_eq!(mad.operands[2], "CONST[0][1].xyyy");
}

#[test]
fn test_vertex_interface() {
    let p = compile(VERTEX, Stage::Vertex).unwrap();
    let ctx = p.interface(0x12b);
    assert_eq!(ctx.inputs.len(), 2);
    assert_eq!(ctx.inputs[1].semantic, Semantic::Generic);
    assert_eq!(ctx.inputs[1].index, 1);
    assert_eq!(ctx.outputs.len(), 2);
    assert_eq!(ctx.outputs[0].semantic, Semantic::Position);
    assert_eq!(ctx.outputs[1].mask, 0x7);
    assert!(p.reads_system_value(Semantic::InstanceId));
}

#[test]
fn test_fragment_position_output_is_depth() {
    let p = compile(FRAGMENT, Stage::Fragment).unwrap();
    let ctx = p.interface(0x12b);
    let roles: Vec<_> = ctx.outputs.iter().map(|v| (v.semantic, v.index)).collect();
    assert_eq!(
        roles,
        vec![
            (Semantic::Color, 0),
            (Semantic::Color, 2),
            (Semantic::FragDepth, 0)
        ]
    );
    assert_eq!(ctx.inputs[0].semantic, Semantic::Generic);
    assert_eq!(p.declarations[0].attrs, vec!["PERSPECTIVE"]);
    assert_eq!(p.property("FS_EARLY_DEPTH_STENCIL"), Some("1"));
    assert_eq!(p.property_u32("FS_EARLY_DEPTH_STENCIL"), Some(1));
    assert!(p.reads_system_value(Semantic::SampleId));
}

#[test]
fn test_declaration_range_expands() {
    let src = "GEOM\nDCL IN[0..2], GENERIC[4]\nDCL OUT[0..1], TEXCOORD[1]\n  0: END\n";
    let ctx = compile(src, Stage::Geometry).unwrap().interface(0x12b);
    let inputs: Vec<_> = ctx.inputs.iter().map(|v| v.index).collect();
    assert_eq!(inputs, vec![4, 5, 6]);
    let outputs: Vec<_> = ctx.outputs.iter().map(|v| (v.semantic, v.index)).collect();
    assert_eq!(
        outputs,
        vec![(Semantic::Texcoord, 1), (Semantic::Texcoord, 2)]
    );
}

#[test]
fn test_dump_is_reparsable() {
    let p = compile(FRAGMENT, Stage::Fragment).unwrap();
    let dump = p.to_string();
    assert!(dump.starts_with("FRAG\nPROPERTY FS_EARLY_DEPTH_STENCIL 1\n"));
    assert!(dump.contains("DCL IN[0], GENERIC, PERSPECTIVE\n"));
    assert!(dump.contains("DCL OUT[1], COLOR[2]\n"));
    assert!(dump.contains("  2: MOV OUT[2].z, IN[0].xxxx\n"));
    let again = compile(&dump, Stage::Fragment).unwrap();
    assert_eq!(again.to_string(), dump);
}

#[test]
fn test_dump_immediates_keep_hex() {
    let p = compile(VERTEX, Stage::Vertex).unwrap();
    let dump = p.to_string();
    assert!(dump.contains("IMM[0] FLT32 { 0x00000000, 0x3f800000, 0x00000000, 0x00000000}\n"));
    assert!(dump.contains("DCL OUT[1].xyz, GENERIC[1]\n"));
    assert!(dump.contains("DCL CONST[0][0..3]\n"));
}

#[test]
fn test_stage_mismatch() {
    let errs = compile(VERTEX, Stage::Fragment).unwrap_err();
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message.contains("VERT shader"));
    assert!(errs[0].message.contains("'frag'"));
}

#[test]
fn test_missing_header() {
    let errs = compile("DCL IN[0]\n  0: END\n", Stage::Vertex).unwrap_err();
    assert!(errs[0].message.contains("expected processor header"));
    let errs = compile("\n  \n", Stage::Vertex).unwrap_err();
    assert!(errs[0].message.contains("missing processor header"));
}

#[test]
fn test_errors_carry_spans() {
    let src = "VERT\nDCL BOGUS[0]\nDCL OUT[0].yx, POSITION\n  0: END\n";
    let errs = compile(src, Stage::Vertex).unwrap_err();
    assert_eq!(errs.len(), 2);
    assert!(errs[0].message.contains("unknown register file 'BOGUS'"));
    assert_eq!(errs[0].span, Span::new(9, 14));
    assert!(errs[1].message.contains("xyzw order"));
}

#[test]
fn test_unknown_semantic_on_varying() {
    let src = "VERT\nDCL OUT[0], NORMAL\n  0: END\n";
    let errs = compile(src, Stage::Vertex).unwrap_err();
    assert!(errs[0].message.contains("semantic 'NORMAL'"));

    // system values may use names without a varying role
    let src = "COMP\nPROPERTY CS_SHARED_SIZE 256\nDCL SV[0], THREAD_ID\n  0: END\n";
    let p = compile(src, Stage::Compute).unwrap();
    assert_eq!(
        p.declarations[0].semantic,
        Some(SemanticDecl::Other("THREAD_ID".to_string(), 0))
    );
    assert_eq!(p.shared_memory_size(), 256);
}

#[test]
fn test_compute_has_no_varyings() {
    let src = "COMP\nDCL IN[0], GENERIC[0]\n  0: END\n";
    let errs = compile(src, Stage::Compute).unwrap_err();
    assert!(errs[0].message.contains("no inputs or outputs"));
}

#[test]
fn test_empty_program_body() {
    let errs = compile("FRAG\nDCL OUT[0], COLOR\n", Stage::Fragment).unwrap_err();
    assert!(errs[0].message.contains("no instructions"));
}

#[test]
fn test_immediate_errors() {
    let src = "VERT\nIMM[0] FLT16 { 0 }\nIMM[1] UINT32 0, 1\n  0: END\n";
    let errs = compile(src, Stage::Vertex).unwrap_err();
    assert_eq!(errs.len(), 2);
    assert!(errs[0].message.contains("unknown immediate type 'FLT16'"));
    assert!(errs[1].message.contains("expected '{ ... }'"));
}

#[test]
fn test_comments_and_unlabelled_instructions() {
    let src = "FRAG ; header\n; whole-line comment\nDCL OUT[0], COLOR\nMOV OUT[0], IMM[0]\nEND\n";
    let p = compile(src, Stage::Fragment).unwrap();
    assert_eq!(p.instructions.len(), 2);
    assert_eq!(p.instructions[1].opcode, "END");
    assert!(p.instructions[1].operands.is_empty());
}

#[test]
fn test_frontend_context_counts_programs() {
    let mut fe = TgsiFrontend::new();
    assert_eq!(fe.name(), "tgsi");
    fe.compile(VERTEX, Stage::Vertex).unwrap();
    assert!(fe.compile(VERTEX, Stage::Geometry).is_err());
    fe.compile(FRAGMENT, Stage::Fragment).unwrap();
    assert_eq!(fe.compiled(), 2);
}

#[test]
fn test_varyings_without_a_slot_are_rejected() {
    let src = "FRAG\nDCL IN[0], FACE\nDCL OUT[0], COLOR\n  0: END\n";
    let errs = compile(src, Stage::Fragment).unwrap_err();
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].message, "invalid input semantic FACE in a frag program");
    assert_eq!(errs[0].span, Span::new(5, 20));

    let src = "GEOM\nDCL OUT[0], PCOORD\n  0: END\n";
    let errs = compile(src, Stage::Geometry).unwrap_err();
    assert!(errs[0].message.contains("invalid output semantic PCOORD"));

    let src = "FRAG\nDCL OUT[0..1], COLOR[7]\n  0: END\n";
    let errs = compile(src, Stage::Fragment).unwrap_err();
    assert!(errs[0].message.contains("COLOR[8] is past the last of 8 render targets"));

    // vertex inputs are packed, and edge flag outputs are simply skipped
    let src = "VERT\nDCL IN[0], FOG\nDCL OUT[0], EDGEFLAG\n  0: END\n";
    assert!(compile(src, Stage::Vertex).is_ok());

    let src = "VERT\nDCL OUT[0..1], GENERIC[255]\n  0: END\n";
    let errs = compile(src, Stage::Vertex).unwrap_err();
    assert_eq!(
        errs[0].message,
        "invalid output semantic GENERIC[256]: index past 255 in a vert program"
    );
}

#[test]
fn test_semantic_index_is_bounded() {
    let errs = compile("FRAG\nDCL IN[0], GENERIC[300000000]\n  0: END\n", Stage::Fragment)
        .unwrap_err();
    assert_eq!(errs[0].message, "semantic index 300000000 is past the last of 255");
    assert_eq!(errs[0].span, Span::new(24, 33));

    let errs = compile("FRAG\nDCL OUT[0..1], COLOR[4294967295]\n  0: END\n", Stage::Fragment)
        .unwrap_err();
    assert_eq!(errs[0].message, "semantic index 4294967295 is past the last of 255");
    assert_eq!(errs[0].span, Span::new(26, 36));

    let program = compile("VERT\nDCL OUT[0], GENERIC[255]\n  0: END\n", Stage::Vertex).unwrap();
    let ctx = program.interface(0x12b);
    assert_eq!(ctx.outputs[0].index, 255);
}

#[test]
fn test_varying_range_is_bounded() {
    let errs = compile("VERT\nDCL IN[0..4294967295]\n  0: END\n", Stage::Vertex).unwrap_err();
    assert_eq!(errs[0].message, "IN register 4294967295 is past the last of 80");
    assert_eq!(errs[0].span, Span::new(9, 26));

    let errs = compile("GEOM\nDCL OUT[80], GENERIC[0]\n  0: END\n", Stage::Geometry).unwrap_err();
    assert_eq!(errs[0].message, "OUT register 80 is past the last of 80");

    // other files are not varyings and keep their full range
    let program = compile("VERT\nDCL TEMP[0..4294967295]\n  0: END\n", Stage::Vertex).unwrap();
    assert_eq!(program.declarations[0].len(), u32::MAX);
    assert!(program.interface(0x12b).inputs.is_empty());

    let program = compile("VERT\nDCL IN[0..79]\n  0: END\n", Stage::Vertex).unwrap();
    assert_eq!(program.interface(0x12b).inputs.len(), 80);
}
