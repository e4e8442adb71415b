use crate::span::Span;

/// A compiler diagnostic (error or warning).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    /// An error with no source location (I/O, configuration, codegen status).
    pub fn bare(message: String) -> Self {
        Self::error(message, Span::dummy())
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render the diagnostic to stderr using ariadne.
    ///
    /// Diagnostics without a source location are printed as a single
    /// `error: ...` line followed by their notes.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        if self.span.is_dummy() {
            self.render_plain();
            return;
        }

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        // stderr being closed is not worth aborting over
        let _ = report.finish().eprint((filename, Source::from(source)));
    }

    /// Print as `error: message` without source context.
    pub fn render_plain(&self) {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        eprintln!("{}: {}", prefix, self.message);
        for note in &self.notes {
            eprintln!("  note: {}", note);
        }
        if let Some(help) = &self.help {
            eprintln!("  help: {}", help);
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(10, 15);
        let d = Diagnostic::error("unknown semantic 'FOO'".to_string(), span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "unknown semantic 'FOO'");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
        assert!(d.is_error());
    }

    #[test]
    fn test_warning_construction() {
        let d = Diagnostic::warning("unused declaration".to_string(), Span::dummy());
        assert_eq!(d.severity, Severity::Warning);
        assert!(!d.is_error());
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::bare("code generation failed".to_string())
            .with_note("status -2".to_string())
            .with_help("re-run with --raw to inspect output".to_string())
            .with_note("stage frag".to_string());
        assert_eq!(d.notes, vec!["status -2", "stage frag"]);
        assert!(d.help.is_some());
        assert!(d.span.is_dummy());
        assert_eq!(d.to_string(), "code generation failed");
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "VERT\nDCL IN[0], BOGUS[0]\n";
        let d = Diagnostic::error("unknown semantic 'BOGUS'".to_string(), Span::new(16, 21))
            .with_note("semantics are upper-case TGSI names".to_string());
        d.render("test.tgsi", source);
    }

    #[test]
    fn test_render_diagnostics_mixed() {
        let source = "FRAG\nDCL OUT[0], COLOR\n";
        let diagnostics = vec![
            Diagnostic::warning("first".to_string(), Span::new(5, 8)),
            Diagnostic::bare("second".to_string()),
        ];
        render_diagnostics(&diagnostics, "test.tgsi", source);
    }
}
