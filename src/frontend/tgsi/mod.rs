//! Front-end for TGSI assembly text.
//!
//! Accepts the textual form of the TGSI token stream: a processor header
//! (`VERT`, `FRAG`, ...), then `PROPERTY`, `DCL`, `IMM` and numbered
//! instruction lines. Only the structure is checked; instruction operands
//! are passed through to the code generator as written.

mod parser;

#[cfg(test)]
mod tests;

use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::stage::Stage;
use crate::varying::alloc::MAX_COLOR_OUTPUTS;
use crate::varying::{input_address, output_address, Semantic};

use super::{Declaration, Frontend, LowLevelProgram, RegisterFile, SemanticDecl};

/// TGSI text front-end context.
#[derive(Debug, Default)]
pub struct TgsiFrontend {
    compiled: usize,
}

impl TgsiFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs compiled successfully through this context.
    pub fn compiled(&self) -> usize {
        self.compiled
    }
}

impl Frontend for TgsiFrontend {
    fn name(&self) -> &str {
        "tgsi"
    }

    fn compile(&mut self, source: &str, stage: Stage) -> Result<LowLevelProgram, Vec<Diagnostic>> {
        let program = parser::Parser::new(source).parse()?;
        check_program(&program, stage)?;
        self.compiled += 1;
        Ok(program)
    }
}

/// Why the allocator could not give this varying a slot, if it could not.
fn unplaceable(stage: Stage, decl: &Declaration, sem: Semantic, index: u32) -> Option<String> {
    let Some(last) = index.checked_add(decl.len().saturating_sub(1)) else {
        return Some(format!("{}[{}] runs past the last index", sem, index));
    };
    match (stage, decl.file) {
        // vertex attributes are packed whatever their semantic
        (Stage::Vertex, RegisterFile::Input) => None,
        (Stage::Fragment, RegisterFile::Output) => match sem {
            Semantic::Color if last as usize >= MAX_COLOR_OUTPUTS => Some(format!(
                "COLOR[{}] is past the last of {} render targets",
                last, MAX_COLOR_OUTPUTS
            )),
            _ => None,
        },
        (_, RegisterFile::Input) => input_address(sem, last)
            .err()
            .map(|e| format!("{} in a {} program", e, stage)),
        _ => output_address(sem, last)
            .err()
            .map(|e| format!("{} in a {} program", e, stage)),
    }
}

fn check_program(program: &LowLevelProgram, stage: Stage) -> Result<(), Vec<Diagnostic>> {
    let mut errors = Vec::new();
    if program.stage != stage {
        errors.push(
            Diagnostic::error(
                format!(
                    "program is a {} shader but stage '{}' was requested",
                    program.stage.processor_name(),
                    stage
                ),
                Span::new(0, program.stage.processor_name().len() as u32),
            )
            .with_help(format!(
                "pass --stage {} or change the header to {}",
                program.stage,
                stage.processor_name()
            )),
        );
    }
    for decl in &program.declarations {
        let varying = matches!(decl.file, RegisterFile::Input | RegisterFile::Output);
        match &decl.semantic {
            Some(SemanticDecl::Other(name, _)) if varying => {
                errors.push(Diagnostic::error(
                    format!(
                        "semantic '{}' cannot be used on an {} declaration",
                        name,
                        decl.file.name()
                    ),
                    decl.span,
                ));
            }
            Some(SemanticDecl::Known(sem, index)) if varying => {
                if let Some(msg) = unplaceable(stage, decl, *sem, *index) {
                    errors.push(Diagnostic::error(msg, decl.span));
                }
            }
            _ => {}
        }
        if stage == Stage::Compute && varying {
            errors.push(Diagnostic::error(
                "compute programs have no inputs or outputs".to_string(),
                decl.span,
            ));
        }
    }
    if program.instructions.is_empty() {
        errors.push(
            Diagnostic::bare("program has no instructions".to_string())
                .with_help("every program ends with END".to_string()),
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
