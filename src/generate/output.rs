use crate::ast::{SourceId, Span};
use crate::collect::{Piece, ProjectionKind, Section};

use super::projection::{Projection, ProjectionTable};

/// Output buffer that accumulates generated code and records projections as mapped
/// text is written.
#[derive(Debug, Default)]
pub struct Output {
    code: String,
    line_number: usize,
    projections: ProjectionTable,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add text without a projection
    pub fn push(&mut self, text: &str) {
        self.line_number += text.matches('\n').count();
        self.code.push_str(text);
    }

    /// Add text that projects onto `span` of `source`
    pub fn push_mapped(&mut self, text: &str, source: &SourceId, span: Span, kind: ProjectionKind) {
        if text.is_empty() || span.is_empty() {
            self.push(text);
            return;
        }

        let start = self.code.len();
        let line = self.line_number;
        self.push(text);
        self.projections.record(Projection {
            generated: Span::new(start, self.code.len()),
            source: source.clone(),
            original: span,
            kind,
            generated_line: line,
        });
    }

    pub fn push_piece(&mut self, piece: &Piece) {
        match piece {
            Piece::Text(text) => self.push(text),
            Piece::Mapped {
                text,
                source,
                span,
                kind,
            } => self.push_mapped(text, source, *span, *kind),
        }
    }

    pub fn push_section(&mut self, section: &Section) {
        for piece in section.pieces() {
            self.push_piece(piece);
        }
    }

    pub fn newline(&mut self) {
        self.push("\n");
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.code.len()
    }

    /// Current 0-based line
    pub fn line(&self) -> usize {
        self.line_number
    }

    pub fn finish(self) -> (String, ProjectionTable) {
        (self.code, self.projections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_text_records_projection() {
        let source = SourceId::new("a.tt");
        let mut output = Output::new();
        output.push("using ");
        output.push_mapped("System", &source, Span::new(20, 26), ProjectionKind::Code);
        output.push(";");
        output.newline();
        output.push_mapped("x", &source, Span::new(40, 41), ProjectionKind::Code);

        assert_eq!(output.line(), 1);
        let (code, projections) = output.finish();
        assert_eq!(code, "using System;\nx");

        let entries: Vec<_> = projections.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].generated, Span::new(6, 12));
        assert_eq!(entries[0].generated_line, 0);
        assert_eq!(entries[1].generated, Span::new(14, 15));
        assert_eq!(entries[1].generated_line, 1);
    }

    #[test]
    fn test_empty_range_is_not_projected() {
        let mut output = Output::new();
        output.push_mapped("abc", &SourceId::new("a.tt"), Span::new(3, 3), ProjectionKind::Code);
        assert_eq!(output.position(), 3);
        let (_, projections) = output.finish();
        assert!(projections.is_empty());
    }
}
