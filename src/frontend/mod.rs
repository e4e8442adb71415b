//! The front-end collaborator: turns shader source for one stage into a
//! low-level token stream plus the stage's declared interface.
//!
//! A front-end is an explicit context value. It is created by the caller,
//! passed by reference into every compile, and torn down when dropped;
//! nothing about it is process-global.

pub mod program;
pub mod tgsi;

use crate::diagnostic::Diagnostic;
use crate::stage::Stage;

pub use program::{
    Declaration, Immediate, Instruction, LowLevelProgram, Property, RegisterFile, SemanticDecl,
};
pub use tgsi::TgsiFrontend;

/// Compiles source text for one pipeline stage.
pub trait Frontend {
    /// Short name used in messages (e.g. "tgsi").
    fn name(&self) -> &str;

    /// Compile `source` as a `stage` program. Errors carry spans into
    /// `source` so they can be rendered against it.
    fn compile(&mut self, source: &str, stage: Stage) -> Result<LowLevelProgram, Vec<Diagnostic>>;
}
