//! The low-level token stream handed from the front-end to the code
//! generator, in TGSI terms: properties, declarations, immediates and
//! instructions.

use std::fmt;

use crate::span::Span;
use crate::stage::Stage;
use crate::varying::{Semantic, StageContext, Varying};

/// Register file of a declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterFile {
    Input,
    Output,
    SystemValue,
    Temporary,
    Constant,
    Address,
    Sampler,
    SamplerView,
    Buffer,
    Image,
    Memory,
}

impl RegisterFile {
    pub fn name(self) -> &'static str {
        match self {
            RegisterFile::Input => "IN",
            RegisterFile::Output => "OUT",
            RegisterFile::SystemValue => "SV",
            RegisterFile::Temporary => "TEMP",
            RegisterFile::Constant => "CONST",
            RegisterFile::Address => "ADDR",
            RegisterFile::Sampler => "SAMP",
            RegisterFile::SamplerView => "SVIEW",
            RegisterFile::Buffer => "BUFFER",
            RegisterFile::Image => "IMAGE",
            RegisterFile::Memory => "MEMORY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let file = match name {
            "IN" => RegisterFile::Input,
            "OUT" => RegisterFile::Output,
            "SV" => RegisterFile::SystemValue,
            "TEMP" => RegisterFile::Temporary,
            "CONST" => RegisterFile::Constant,
            "ADDR" => RegisterFile::Address,
            "SAMP" => RegisterFile::Sampler,
            "SVIEW" => RegisterFile::SamplerView,
            "BUFFER" => RegisterFile::Buffer,
            "IMAGE" => RegisterFile::Image,
            "MEMORY" => RegisterFile::Memory,
            _ => return None,
        };
        Some(file)
    }
}

/// A semantic attached to a declaration. System values may carry names
/// the varying model has no role for (`THREAD_ID`, `BLOCK_ID`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SemanticDecl {
    Known(Semantic, u32),
    Other(String, u32),
}

impl SemanticDecl {
    pub fn semantic(&self) -> Option<Semantic> {
        match self {
            SemanticDecl::Known(sem, _) => Some(*sem),
            SemanticDecl::Other(..) => None,
        }
    }

    pub fn index(&self) -> u32 {
        match self {
            SemanticDecl::Known(_, i) | SemanticDecl::Other(_, i) => *i,
        }
    }

    fn name(&self) -> &str {
        match self {
            SemanticDecl::Known(sem, _) => sem.name(),
            SemanticDecl::Other(name, _) => name,
        }
    }
}

/// `PROPERTY NAME VALUE`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
    pub span: Span,
}

/// `DCL FILE[first..last].mask, SEMANTIC[index], ATTRS...`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub file: RegisterFile,
    /// Two-dimensional files (`CONST[1][0..3]`) keep the outer index here.
    pub dimension: Option<u32>,
    pub first: u32,
    pub last: u32,
    pub mask: u8,
    pub semantic: Option<SemanticDecl>,
    /// Trailing attributes verbatim (`PERSPECTIVE`, `SHARED`, ...).
    pub attrs: Vec<String>,
    pub span: Span,
}

impl Declaration {
    /// Registers covered, or zero for a reversed range.
    pub fn len(&self) -> u32 {
        if self.last < self.first {
            return 0;
        }
        (self.last - self.first).saturating_add(1)
    }
}

/// `IMM[n] TYPE { v0, v1, ... }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Immediate {
    pub kind: String,
    /// Values verbatim, so hex-encoded floats survive a dump unchanged.
    pub values: Vec<String>,
    pub span: Span,
}

/// One instruction: opcode plus operands as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: String,
    pub operands: Vec<String>,
    pub span: Span,
}

/// A compiled stage program in low-level form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LowLevelProgram {
    pub stage: Stage,
    pub properties: Vec<Property>,
    pub declarations: Vec<Declaration>,
    pub immediates: Vec<Immediate>,
    pub instructions: Vec<Instruction>,
}

impl LowLevelProgram {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            properties: Vec::new(),
            declarations: Vec::new(),
            immediates: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// Number of top-level tokens (properties, declarations, immediates,
    /// instructions).
    pub fn token_count(&self) -> usize {
        self.properties.len()
            + self.declarations.len()
            + self.immediates.len()
            + self.instructions.len()
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .rev()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Numeric value of a property; missing or non-numeric reads as `None`.
    pub fn property_u32(&self, name: &str) -> Option<u32> {
        let value = self.property(name)?;
        match value.strip_prefix("0x") {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => value.parse().ok(),
        }
    }

    /// Bytes of workgroup-shared memory (`PROPERTY CS_SHARED_SIZE`).
    pub fn shared_memory_size(&self) -> u32 {
        if self.stage != Stage::Compute {
            return 0;
        }
        self.property_u32("CS_SHARED_SIZE").unwrap_or(0)
    }

    /// Whether a system value with the given semantic is declared.
    pub fn reads_system_value(&self, semantic: Semantic) -> bool {
        self.declarations.iter().any(|d| {
            d.file == RegisterFile::SystemValue
                && d.semantic.as_ref().and_then(SemanticDecl::semantic) == Some(semantic)
        })
    }

    /// The stage interface declared by this program: one varying per
    /// declared input or output register, in declaration order.
    pub fn interface(&self, target: u32) -> StageContext {
        let mut ctx = StageContext::new(self.stage, target);
        for decl in &self.declarations {
            let list = match decl.file {
                RegisterFile::Input => &mut ctx.inputs,
                RegisterFile::Output => &mut ctx.outputs,
                _ => continue,
            };
            let (semantic, base) = match &decl.semantic {
                Some(SemanticDecl::Known(sem, index)) => (*sem, *index),
                // vertex attributes are declared without a semantic
                _ => (Semantic::Generic, decl.first),
            };
            let semantic = match (self.stage, decl.file, semantic) {
                (Stage::Fragment, RegisterFile::Output, Semantic::Position) => Semantic::FragDepth,
                _ => semantic,
            };
            for k in 0..decl.len() {
                list.push(Varying::new(semantic, base.saturating_add(k)).with_mask(decl.mask));
            }
        }
        ctx
    }
}

fn mask_suffix(mask: u8) -> String {
    if mask == 0xf {
        return String::new();
    }
    let mut s = String::from(".");
    for (bit, ch) in ['x', 'y', 'z', 'w'].iter().enumerate() {
        if mask & (1 << bit) != 0 {
            s.push(*ch);
        }
    }
    s
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DCL {}", self.file.name())?;
        if let Some(dim) = self.dimension {
            write!(f, "[{}]", dim)?;
        }
        if self.first == self.last {
            write!(f, "[{}]", self.first)?;
        } else {
            write!(f, "[{}..{}]", self.first, self.last)?;
        }
        write!(f, "{}", mask_suffix(self.mask))?;
        if let Some(sem) = &self.semantic {
            write!(f, ", {}", sem.name())?;
            if sem.index() != 0 {
                write!(f, "[{}]", sem.index())?;
            }
        }
        for attr in &self.attrs {
            write!(f, ", {}", attr)?;
        }
        Ok(())
    }
}

impl fmt::Display for LowLevelProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.stage.processor_name())?;
        for prop in &self.properties {
            writeln!(f, "PROPERTY {} {}", prop.name, prop.value)?;
        }
        for decl in &self.declarations {
            writeln!(f, "{}", decl)?;
        }
        for (i, imm) in self.immediates.iter().enumerate() {
            writeln!(f, "IMM[{}] {} {{ {}}}", i, imm.kind, imm.values.join(", "))?;
        }
        for (i, insn) in self.instructions.iter().enumerate() {
            write!(f, "{:>3}: {}", i, insn.opcode)?;
            if !insn.operands.is_empty() {
                write!(f, " {}", insn.operands.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
