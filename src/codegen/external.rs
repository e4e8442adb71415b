//! Code generation delegated to an external program.
//!
//! The generator is spawned once per program. It receives the program info
//! as text on stdin: a few `key value` lines, one line per varying with its
//! assigned slots, then `tokens` followed by the TGSI dump. It answers on
//! stdout with a little-endian reply:
//!
//! ```text
//! "DKCG" | status: i32 | num_gprs | tls_space | num_barriers
//!        | code_len | constbuf1_len | code bytes | constbuf1 bytes
//! ```
//!
//! A negative status is a generation failure; the rest of the reply is then
//! ignored.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use super::{CodeGenerator, CodegenError, GeneratedCode, ProgramInfo};
use crate::varying::Varying;

pub const REPLY_MAGIC: [u8; 4] = *b"DKCG";
const REPLY_HEADER_LEN: usize = 28;

/// Status used when the generator could not be run or answered garbage.
pub const STATUS_BRIDGE_FAILURE: i32 = -1;

/// Runs `command` (plus `args`) for every program.
#[derive(Clone, Debug)]
pub struct ExternalCodegen {
    command: String,
    args: Vec<String>,
}

impl ExternalCodegen {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Build from a command line such as `"nvcg --chip gm20b"`.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = words.next()?;
        Some(Self {
            command: command.to_string(),
            args: words.map(str::to_string).collect(),
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl CodeGenerator for ExternalCodegen {
    fn name(&self) -> &str {
        &self.command
    }

    fn generate(&mut self, info: &ProgramInfo<'_>) -> Result<GeneratedCode, CodegenError> {
        let request = render_request(info);
        let bridge_error = |detail: String| CodegenError::new(STATUS_BRIDGE_FAILURE).with_detail(detail);

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| bridge_error(format!("failed to run '{}': {}", self.command, e)))?;

        // Feed stdin from its own thread so a generator that writes a large
        // reply before reading its request cannot block us on a full pipe.
        let stdin = child.stdin.take();
        let (sent, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(request.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output.map_err(|e| bridge_error(format!("wait error: {}", e)))?;
        match sent {
            Ok(Ok(())) => {}
            // the generator exited without reading everything; its reply decides
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(bridge_error(format!("failed to send program: {}", e))),
            Err(_) => return Err(bridge_error("program writer panicked".to_string())),
        }

        if !output.status.success() && output.stdout.len() < REPLY_HEADER_LEN {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let status = output.status.code().map_or(STATUS_BRIDGE_FAILURE, |c| -c.abs());
            let mut err = CodegenError::new(status);
            if !stderr.is_empty() {
                err = err.with_detail(stderr);
            }
            return Err(err);
        }

        parse_reply(&output.stdout)
    }
}

fn format_varying(dir: &str, i: usize, v: &Varying) -> String {
    let slots: Vec<String> = v
        .slot
        .iter()
        .map(|s| s.map_or_else(|| "-".to_string(), |s| format!("{:#x}", s)))
        .collect();
    format!(
        "{} {} {} {} mask={:#x} slots={}\n",
        dir,
        i,
        v.semantic.name(),
        v.index,
        v.mask,
        slots.join(",")
    )
}

/// Text form of the program info sent to the generator.
pub fn render_request(info: &ProgramInfo<'_>) -> String {
    let io = &info.io;
    let mut out = String::new();
    out.push_str(&format!("stage {}\n", info.stage()));
    out.push_str(&format!("target {:#x}\n", info.target()));
    out.push_str(&format!("opt {}\n", info.opt_level));
    out.push_str(&format!("smem {}\n", info.shared_memory_size));
    out.push_str(&format!(
        "io aux_cb={} draw={:#05x} buf={:#05x} tex={:#05x} fbtex={:#05x} sample={:#05x} ubo={:#05x}\n",
        io.aux_cb_slot, io.draw_info, io.buf_info, io.tex_bind, io.fbtex_bind, io.sample_info, io.ubo_info
    ));
    for (i, v) in info.interface.inputs.iter().enumerate() {
        out.push_str(&format_varying("in", i, v));
    }
    for (i, v) in info.interface.outputs.iter().enumerate() {
        out.push_str(&format_varying("out", i, v));
    }
    out.push_str("tokens\n");
    out.push_str(&info.program.to_string());
    out
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Decode a generator reply.
pub fn parse_reply(bytes: &[u8]) -> Result<GeneratedCode, CodegenError> {
    let malformed =
        |what: &str| CodegenError::new(STATUS_BRIDGE_FAILURE).with_detail(format!("malformed reply: {}", what));

    if bytes.len() < REPLY_HEADER_LEN {
        return Err(malformed("truncated header"));
    }
    if bytes[..4] != REPLY_MAGIC {
        return Err(malformed("bad magic"));
    }
    let status = read_u32(bytes, 4) as i32;
    if status < 0 {
        return Err(CodegenError::new(status));
    }
    let num_gprs = read_u32(bytes, 8);
    let tls_space = read_u32(bytes, 12);
    let num_barriers = read_u32(bytes, 16);
    let code_len = read_u32(bytes, 20) as usize;
    let cb1_len = read_u32(bytes, 24) as usize;

    let code_end = REPLY_HEADER_LEN + code_len;
    let cb1_end = code_end + cb1_len;
    if bytes.len() < cb1_end {
        return Err(malformed("truncated payload"));
    }
    if code_len % 8 != 0 {
        return Err(malformed("code is not a whole number of instructions"));
    }

    Ok(GeneratedCode {
        code: bytes[REPLY_HEADER_LEN..code_end].to_vec(),
        num_gprs,
        tls_space,
        num_barriers,
        constbuf1: bytes[code_end..cb1_end].to_vec(),
    })
}

/// Encode a reply; the inverse of [`parse_reply`].
pub fn encode_reply(status: i32, code: &GeneratedCode) -> Vec<u8> {
    let mut out = Vec::with_capacity(REPLY_HEADER_LEN + code.code.len() + code.constbuf1.len());
    out.extend_from_slice(&REPLY_MAGIC);
    out.extend_from_slice(&status.to_le_bytes());
    for v in [
        code.num_gprs,
        code.tls_space,
        code.num_barriers,
        code.code.len() as u32,
        code.constbuf1.len() as u32,
    ] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&code.code);
    out.extend_from_slice(&code.constbuf1);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::IoBases;
    use crate::frontend::{Frontend, TgsiFrontend};
    use crate::stage::Stage;
    use crate::varying::assign_varying_slots;

    fn sample_code() -> GeneratedCode {
        GeneratedCode {
            code: vec![0xaa; 16],
            num_gprs: 12,
            tls_space: 0x40,
            num_barriers: 1,
            constbuf1: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn test_reply_roundtrip() {
        let code = sample_code();
        let bytes = encode_reply(0, &code);
        assert_eq!(bytes.len(), REPLY_HEADER_LEN + 16 + 4);
        assert_eq!(parse_reply(&bytes).unwrap(), code);
    }

    #[test]
    fn test_reply_negative_status() {
        let bytes = encode_reply(-5, &GeneratedCode::default());
        assert_eq!(parse_reply(&bytes).unwrap_err(), CodegenError::new(-5));
    }

    #[test]
    fn test_reply_malformed() {
        let mut bytes = encode_reply(0, &sample_code());
        assert!(parse_reply(&bytes[..10]).is_err());
        assert!(parse_reply(&bytes[..bytes.len() - 1]).is_err());
        bytes[0] = b'X';
        let err = parse_reply(&bytes).unwrap_err();
        assert_eq!(err.status, STATUS_BRIDGE_FAILURE);
        assert!(err.to_string().contains("bad magic"));

        let odd = GeneratedCode {
            code: vec![0; 12],
            ..GeneratedCode::default()
        };
        assert!(parse_reply(&encode_reply(0, &odd)).is_err());
    }

    #[test]
    fn test_render_request() {
        let src = "FRAG\nDCL IN[0], GENERIC[1]\nDCL OUT[0], COLOR\n  0: MOV OUT[0], IN[0]\n  1: END\n";
        let program = TgsiFrontend::new().compile(src, Stage::Fragment).unwrap();
        let mut ctx = program.interface(0x12b);
        assign_varying_slots(&mut ctx);
        let info = ProgramInfo {
            interface: &ctx,
            program: &program,
            opt_level: 3,
            shared_memory_size: 0,
            io: IoBases::for_stage(Stage::Fragment),
        };
        let text = render_request(&info);
        assert!(text.starts_with("stage frag\ntarget 0x12b\nopt 3\nsmem 0\n"));
        assert!(text.contains("io aux_cb=17 draw=0x000 buf=0x730 tex=0x690"));
        assert!(text.contains("in 0 GENERIC 1 mask=0xf slots=0x24,0x25,0x26,0x27\n"));
        assert!(text.contains("out 0 COLOR 0 mask=0xf slots=0x0,0x1,0x2,0x3\n"));
        assert!(text.ends_with("tokens\nFRAG\nDCL IN[0], GENERIC[1]\nDCL OUT[0], COLOR\n  0: MOV OUT[0], IN[0]\n  1: END\n"));
    }

    #[test]
    fn test_missing_command_is_bridge_failure() {
        let program = TgsiFrontend::new()
            .compile("VERT\n  0: END\n", Stage::Vertex)
            .unwrap();
        let ctx = program.interface(0x12b);
        let info = ProgramInfo {
            interface: &ctx,
            program: &program,
            opt_level: 3,
            shared_memory_size: 0,
            io: IoBases::for_stage(Stage::Vertex),
        };
        let mut cg = ExternalCodegen::new("dkshc-no-such-codegen-binary");
        let err = cg.generate(&info).unwrap_err();
        assert_eq!(err.status, STATUS_BRIDGE_FAILURE);
        assert!(err.to_string().contains("failed to run"));
    }

    #[test]
    fn test_from_command_line() {
        let cg = ExternalCodegen::from_command_line("nvcg --chip gm20b").unwrap();
        assert_eq!(cg.command(), "nvcg");
        assert_eq!(cg.args, vec!["--chip", "gm20b"]);
        assert!(ExternalCodegen::from_command_line("   ").is_none());
    }
}
