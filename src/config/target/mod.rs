use std::path::{Path, PathBuf};

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// GPU target configuration.
///
/// The chip revision drives the few places where slot layout differs
/// between hardware generations. A target may also name the external code
/// generator that produces machine code for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetConfig {
    /// Short identifier used on the command line (e.g. "gm20b").
    pub name: String,
    /// Human-readable name (e.g. "Tegra X1 (GM20B)").
    pub display_name: String,
    /// Architecture family, informational (e.g. "maxwell").
    pub family: String,
    /// Chip class revision (e.g. 0x12b).
    pub revision: u32,
    /// Command line of the code generator for this target.
    pub codegen: Option<String>,
}

impl TargetConfig {
    /// Built-in Tegra X1 configuration.
    pub fn gm20b() -> Self {
        Self {
            name: "gm20b".to_string(),
            display_name: "Tegra X1 (GM20B)".to_string(),
            family: "maxwell".to_string(),
            revision: 0x12b,
            codegen: None,
        }
    }

    /// Load a target configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read target config '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        Self::parse_toml(&content, path)
    }

    /// Resolve a target by name: the built-in `gm20b`, or `targets/{name}.toml`
    /// next to the binary (or up to two directories above it), then in the
    /// working directory.
    pub fn resolve(name: &str) -> Result<Self, Diagnostic> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(Diagnostic::error(
                format!("invalid target name '{}'", name),
                Span::dummy(),
            ));
        }

        if name == "gm20b" {
            return Ok(Self::gm20b());
        }

        let relative = format!("targets/{}.toml", name);

        let mut bases: Vec<PathBuf> = Vec::new();
        if let Ok(exe) = std::env::current_exe() {
            bases.extend(exe.ancestors().skip(1).take(3).map(Path::to_path_buf));
        }
        bases.push(PathBuf::new());

        if let Some(path) = bases
            .iter()
            .map(|base| base.join(&relative))
            .find(|path| path.exists())
        {
            return Self::load(&path);
        }

        Err(Diagnostic::error(
            format!("unknown target '{}' (looked for '{}')", name, relative),
            Span::dummy(),
        )
        .with_help("available targets: gm20b, gk104, gf100".to_string()))
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self, Diagnostic> {
        let err =
            |msg: String| Diagnostic::error(format!("{}: {}", path.display(), msg), Span::dummy());

        let mut name = String::new();
        let mut display_name = String::new();
        let mut family = String::new();
        let mut revision: Option<u32> = None;
        let mut codegen = String::new();
        let mut codegen_args: Vec<String> = Vec::new();

        let mut section = String::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                section = inner.trim().to_string();
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(err(format!("expected 'key = value', found '{}'", trimmed)));
            };
            let key = key.trim();
            let value = value.trim();
            let unquoted = value.trim_matches('"');

            match (section.as_str(), key) {
                ("target", "name") => name = unquoted.to_string(),
                ("target", "display_name") => display_name = unquoted.to_string(),
                ("target", "family") => family = unquoted.to_string(),
                ("target", "revision") => {
                    revision = Some(
                        parse_u32(value)
                            .ok_or_else(|| err(format!("invalid target.revision: {}", value)))?,
                    );
                }
                ("codegen", "command") => codegen = unquoted.to_string(),
                ("codegen", "args") => codegen_args = parse_string_array(value),
                _ => {}
            }
        }

        if name.is_empty() {
            return Err(err("missing target.name".to_string()));
        }
        let revision = match revision {
            Some(0) => return Err(err("target.revision must be > 0".to_string())),
            Some(r) => r,
            None => return Err(err("missing target.revision".to_string())),
        };
        if codegen.is_empty() && !codegen_args.is_empty() {
            return Err(err("codegen.args given without codegen.command".to_string()));
        }

        Ok(Self {
            display_name: if display_name.is_empty() {
                name.clone()
            } else {
                display_name
            },
            name,
            family,
            revision,
            codegen: if codegen.is_empty() {
                None
            } else {
                Some(
                    std::iter::once(codegen)
                        .chain(codegen_args)
                        .collect::<Vec<_>>()
                        .join(" "),
                )
            },
        })
    }
}

/// Decimal or `0x`-prefixed hexadecimal.
fn parse_u32(value: &str) -> Option<u32> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// `["a", "b"]` to `vec!["a", "b"]`.
fn parse_string_array(value: &str) -> Vec<String> {
    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
