use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::path::PathBuf;
use thiserror::Error;

/// Character offsets into the source text. Provenance only: diagnostics
/// point at it, evaluation never looks at it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }
}

/// A syntax diagnostic recorded by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(span: Span, message: String) -> Self {
        Self { message, span }
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<repl>");
        let color = Color::Yellow;

        // End-of-input diagnostics point at the last character.
        let len = source.chars().count();
        let start = self.span.start.min(len.saturating_sub(1));
        let end = self.span.end.min(len).max(start + 1);

        let result = Report::build(ReportKind::Error, filename, start)
            .with_message(format!("{}: {}", "Parse Error".fg(color), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            )
            .finish()
            .eprint((filename, Source::from(source)));

        if let Err(error) = result {
            tracing::warn!(%error, "failed to render parse diagnostic");
        }
    }
}

/// Renders a runtime error produced by evaluation. Runtime errors are
/// values without source positions, so the report carries no label.
pub fn report_runtime_error(message: &str, source: &str, filename: Option<&str>) {
    let filename = filename.unwrap_or("<repl>");

    let result = Report::<(&str, std::ops::Range<usize>)>::build(ReportKind::Error, filename, 0)
        .with_message(format!("{}: {}", "Runtime Error".fg(Color::Magenta), message))
        .finish()
        .eprint((filename, Source::from(source)));

    if let Err(error) = result {
        tracing::warn!(%error, "failed to render runtime diagnostic");
    }
}

/// Failure of a whole script run, as seen by the binary.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0} syntax error(s)")]
    Syntax(usize),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("could not read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
