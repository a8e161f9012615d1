use std::io;

use serde::Serialize;

use crate::ast::{SourceId, Span};

/// Errors that stop generation and discard all accumulated work.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("generation aborted by cancellation")]
    Aborted,
}

/// Errors loading a template bundle.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to read bundle")]
    Io(#[from] io::Error),
    #[error("failed to parse bundle")]
    Json(#[from] serde_json::Error),
    #[error("bundle has no template named `{0}`")]
    MissingRoot(SourceId),
}

/// Either failure of loading and generating a bundle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Kind of problem recorded while collecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProblemKind {
    UnresolvedInclude,
    CyclicInclude,
    MalformedDirective,
}

impl ProblemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemKind::UnresolvedInclude => "Unresolved include",
            ProblemKind::CyclicInclude => "Cyclic include",
            ProblemKind::MalformedDirective => "Malformed directive",
        }
    }

    /// Include-level problems stop expansion of the affected subtree.
    pub fn interrupts(&self) -> bool {
        matches!(self, ProblemKind::UnresolvedInclude | ProblemKind::CyclicInclude)
    }
}

/// A locally handled problem: the affected directive or include was skipped and
/// generation continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub source: SourceId,
    pub span: Span,
    pub message: String,
}

impl Problem {
    pub fn new(
        kind: ProblemKind,
        source: SourceId,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source,
            span,
            message: message.into(),
        }
    }

    /// Render as a warning with a caret line under the offending range.
    pub fn render(&self, source_text: &str, color: bool) -> String {
        let yellow = if color { "\x1b[1;33m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let (line, col) = line_col(source_text, self.span.start);
        let mut output = String::new();

        output.push_str(&format!(" file: {}:{}:{}\n", self.source, line + 1, col + 1));
        output.push_str(&format!(
            "{}warning:{} {}: {}\n",
            yellow,
            reset,
            self.kind.as_str(),
            self.message
        ));

        if let Some(source_line) = source_text.lines().nth(line) {
            let line_num = format!("{}", line + 1);
            let width = line_num.len().max(2);
            output.push_str(&format!("{}{:>width$} |{}\n", dim, "", reset, width = width));
            output.push_str(&format!(
                "{}{:>width$} |{} {}\n",
                dim,
                line_num,
                reset,
                source_line,
                width = width
            ));

            let available = source_line.chars().count().saturating_sub(col);
            let underline_len = self.span.len().min(available).max(1);
            output.push_str(&format!(
                "{}{:>width$} |{} {}{}{}{}\n",
                dim,
                "",
                reset,
                " ".repeat(col),
                yellow,
                "^".repeat(underline_len),
                reset,
                width = width
            ));
        }

        output
    }
}

/// 0-based line and character column of a byte offset.
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let col = before[line_start..].chars().count();
    (line, col)
}
