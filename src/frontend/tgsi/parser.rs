use crate::diagnostic::Diagnostic;
use crate::frontend::program::{
    Declaration, Immediate, Instruction, LowLevelProgram, Property, RegisterFile, SemanticDecl,
};
use crate::span::Span;
use crate::stage::Stage;
use crate::varying::{Semantic, MAX_SEMANTIC_INDEX, MAX_VARYING_REGISTERS};

const IMMEDIATE_KINDS: [&str; 6] = ["FLT32", "UINT32", "INT32", "FLT64", "UINT64", "INT64"];

/// Declaration attributes that are never semantics.
const DECL_ATTRS: [&str; 7] = [
    "CONSTANT",
    "LINEAR",
    "PERSPECTIVE",
    "CENTROID",
    "SAMPLE",
    "INVARIANT",
    "LOCAL",
];

pub(super) struct Parser<'src> {
    source: &'src str,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Parser<'src> {
    pub(super) fn new(source: &'src str) -> Self {
        Self {
            source,
            diagnostics: Vec::new(),
        }
    }

    pub(super) fn parse(mut self) -> Result<LowLevelProgram, Vec<Diagnostic>> {
        let mut program: Option<LowLevelProgram> = None;
        let source = self.source;

        for raw in source.lines() {
            let line = match raw.find(';') {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match program.as_mut() {
                None => match Stage::from_processor_name(line) {
                    Some(stage) => program = Some(LowLevelProgram::new(stage)),
                    None => {
                        self.error(
                            format!("expected processor header, found '{}'", line),
                            line,
                        );
                        return Err(self.diagnostics);
                    }
                },
                Some(p) => self.parse_line(p, line),
            }
        }

        let program = match program {
            Some(p) => p,
            None => {
                self.diagnostics.push(
                    Diagnostic::bare("empty program: missing processor header".to_string())
                        .with_help(
                            "start with one of VERT, TESS_CTRL, TESS_EVAL, GEOM, FRAG, COMP"
                                .to_string(),
                        ),
                );
                return Err(self.diagnostics);
            }
        };

        if self.diagnostics.is_empty() {
            Ok(program)
        } else {
            Err(self.diagnostics)
        }
    }

    // ─── Spans ─────────────────────────────────────────────────────

    /// Span of a slice borrowed from the source.
    fn span(&self, text: &str) -> Span {
        let start = (text.as_ptr() as usize).saturating_sub(self.source.as_ptr() as usize);
        Span::new(start as u32, (start + text.len()) as u32)
    }

    fn error(&mut self, message: String, at: &str) {
        let span = self.span(at);
        self.diagnostics.push(Diagnostic::error(message, span));
    }

    // ─── Lines ─────────────────────────────────────────────────────

    fn parse_line(&mut self, program: &mut LowLevelProgram, line: &'src str) {
        let (word, rest) = split_word(line);
        match word {
            "PROPERTY" => {
                if let Some(prop) = self.parse_property(line, rest) {
                    program.properties.push(prop);
                }
            }
            "DCL" => {
                if let Some(decl) = self.parse_declaration(line, rest) {
                    program.declarations.push(decl);
                }
            }
            w if w.starts_with("IMM[") => {
                if let Some(imm) = self.parse_immediate(line, rest) {
                    program.immediates.push(imm);
                }
            }
            _ => {
                if let Some(insn) = self.parse_instruction(line) {
                    program.instructions.push(insn);
                }
            }
        }
    }

    fn parse_property(&mut self, line: &'src str, rest: &'src str) -> Option<Property> {
        let mut words = rest.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some(name), Some(value), None) => Some(Property {
                name: name.to_string(),
                value: value.to_string(),
                span: self.span(line),
            }),
            _ => {
                self.error("expected 'PROPERTY <NAME> <VALUE>'".to_string(), line);
                None
            }
        }
    }

    fn parse_declaration(&mut self, line: &'src str, rest: &'src str) -> Option<Declaration> {
        let parts = split_top_level(rest);
        let Some((&reg, attrs)) = parts.split_first() else {
            self.error("expected a register after DCL".to_string(), line);
            return None;
        };
        if reg.is_empty() {
            self.error("expected a register after DCL".to_string(), line);
            return None;
        }

        let (file, dimension, first, last, mask) = self.parse_register(reg)?;
        if matches!(file, RegisterFile::Input | RegisterFile::Output)
            && last >= MAX_VARYING_REGISTERS
        {
            self.error(
                format!(
                    "{} register {} is past the last of {}",
                    file.name(),
                    last,
                    MAX_VARYING_REGISTERS
                ),
                reg,
            );
            return None;
        }

        let mut attrs = attrs.iter().copied().peekable();
        let mut semantic = None;
        if matches!(
            file,
            RegisterFile::Input | RegisterFile::Output | RegisterFile::SystemValue
        ) {
            if let Some(&candidate) = attrs.peek() {
                if !is_decl_attr(candidate) {
                    attrs.next();
                    semantic = Some(self.parse_semantic(candidate)?);
                }
            }
        }

        Some(Declaration {
            file,
            dimension,
            first,
            last,
            mask,
            semantic,
            attrs: attrs.map(str::to_string).collect(),
            span: self.span(line),
        })
    }

    fn parse_register(
        &mut self,
        reg: &'src str,
    ) -> Option<(RegisterFile, Option<u32>, u32, u32, u8)> {
        let Some(open) = reg.find('[') else {
            self.error(format!("expected '[' in register '{}'", reg), reg);
            return None;
        };
        let name = &reg[..open];
        let Some(file) = RegisterFile::from_name(name) else {
            self.error(format!("unknown register file '{}'", name), name);
            return None;
        };

        let mut groups: Vec<&'src str> = Vec::new();
        let mut tail = &reg[open..];
        while let Some(inner) = tail.strip_prefix('[') {
            let Some(close) = inner.find(']') else {
                self.error("unterminated '['".to_string(), tail);
                return None;
            };
            groups.push(&inner[..close]);
            tail = &inner[close + 1..];
        }

        let (dimension, range) = match groups.as_slice() {
            [range] => (None, *range),
            [dim, range] => (Some(self.parse_number(dim)?), *range),
            _ => {
                self.error(format!("malformed register '{}'", reg), reg);
                return None;
            }
        };

        let (first, last) = match range.split_once("..") {
            Some((a, b)) => (self.parse_number(a)?, self.parse_number(b)?),
            None => {
                let n = self.parse_number(range)?;
                (n, n)
            }
        };
        if last < first {
            self.error(format!("empty register range {}..{}", first, last), range);
            return None;
        }

        let mask = if tail.is_empty() {
            0xf
        } else if let Some(swizzle) = tail.strip_prefix('.') {
            self.parse_write_mask(swizzle)?
        } else {
            self.error(format!("unexpected '{}' after register", tail), tail);
            return None;
        };

        Some((file, dimension, first, last, mask))
    }

    fn parse_write_mask(&mut self, text: &'src str) -> Option<u8> {
        let mut mask = 0u8;
        let mut prev = None;
        for ch in text.chars() {
            let bit = match ch {
                'x' => 0,
                'y' => 1,
                'z' => 2,
                'w' => 3,
                _ => {
                    self.error(format!("invalid write mask '.{}'", text), text);
                    return None;
                }
            };
            if prev.is_some_and(|p| p >= bit) {
                self.error(
                    format!("write mask '.{}' must list components in xyzw order", text),
                    text,
                );
                return None;
            }
            prev = Some(bit);
            mask |= 1 << bit;
        }
        if mask == 0 {
            self.error("empty write mask".to_string(), text);
            return None;
        }
        Some(mask)
    }

    fn parse_semantic(&mut self, text: &'src str) -> Option<SemanticDecl> {
        let (name, index) = match text.split_once('[') {
            Some((name, rest)) => {
                let Some(idx) = rest.strip_suffix(']') else {
                    self.error(format!("malformed semantic '{}'", text), text);
                    return None;
                };
                let index = self.parse_number(idx)?;
                if index > MAX_SEMANTIC_INDEX {
                    self.error(
                        format!(
                            "semantic index {} is past the last of {}",
                            index, MAX_SEMANTIC_INDEX
                        ),
                        idx,
                    );
                    return None;
                }
                (name, index)
            }
            None => (text, 0),
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            self.error(format!("malformed semantic '{}'", text), text);
            return None;
        }
        Some(match Semantic::from_name(name) {
            Some(sem) => SemanticDecl::Known(sem, index),
            None => SemanticDecl::Other(name.to_string(), index),
        })
    }

    fn parse_immediate(&mut self, line: &'src str, rest: &'src str) -> Option<Immediate> {
        let (kind, body) = split_word(rest);
        if !IMMEDIATE_KINDS.contains(&kind) {
            self.error(format!("unknown immediate type '{}'", kind), kind);
            return None;
        }
        let inner = body
            .trim()
            .strip_prefix('{')
            .and_then(|b| b.trim_end().strip_suffix('}'));
        let Some(inner) = inner else {
            self.error("expected '{ ... }' after immediate type".to_string(), line);
            return None;
        };
        let values: Vec<String> = inner
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if values.is_empty() || values.len() > 4 {
            self.error(
                format!("immediate must have 1 to 4 values, found {}", values.len()),
                line,
            );
            return None;
        }
        Some(Immediate {
            kind: kind.to_string(),
            values,
            span: self.span(line),
        })
    }

    fn parse_instruction(&mut self, line: &'src str) -> Option<Instruction> {
        let (mut word, mut rest) = split_word(line);
        if let Some(label) = word.strip_suffix(':') {
            if label.is_empty() || !label.chars().all(|c| c.is_ascii_digit()) {
                self.error(format!("invalid instruction label '{}'", word), word);
                return None;
            }
            (word, rest) = split_word(rest);
        }
        if word.is_empty()
            || !word
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        {
            self.error(format!("expected an instruction, found '{}'", line), line);
            return None;
        }
        let operands = if rest.trim().is_empty() {
            Vec::new()
        } else {
            split_top_level(rest).into_iter().map(str::to_string).collect()
        };
        Some(Instruction {
            opcode: word.to_string(),
            operands,
            span: self.span(line),
        })
    }

    fn parse_number(&mut self, text: &'src str) -> Option<u32> {
        let trimmed = text.trim();
        match trimmed.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.error(format!("expected a number, found '{}'", trimmed), text);
                None
            }
        }
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], text[pos..].trim_start()),
        None => (text, ""),
    }
}

/// Split on commas that are not nested in brackets, braces or parentheses.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

fn is_decl_attr(text: &str) -> bool {
    DECL_ATTRS.contains(&text) || text.starts_with("ARRAY(")
}
