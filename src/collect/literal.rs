//! Literal-text emission state machine.
//!
//! Literal text between code fragments is buffered until the next fragment (or the end of
//! the current source) and then flushed as `this.Write("...");` statements, one statement
//! per source line so generated line numbers advance with the template's.

use crate::ast::{SourceId, Span, TextNode};

use super::sections::{Piece, ProjectionKind};

const WRITE_OPEN: &str = "this.Write(\"";
const WRITE_CLOSE: &str = "\");\n";

/// What ended the pending literal run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// A directive, code fragment or include follows.
    Fragment,
    /// The current source has no more nodes.
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LiteralState {
    #[default]
    AtStart,
    InLiteralRun(LiteralRun),
    AfterCodeFragment,
}

/// Buffered text nodes, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiteralRun {
    segments: Vec<(String, Span)>,
}

impl LiteralRun {
    pub fn text(&self) -> String {
        self.segments.iter().map(|(text, _)| text.as_str()).collect()
    }
}

/// Statements produced by one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralEmission {
    pub pieces: Vec<Piece>,
    /// Generated lines occupied by the statements.
    pub generated_lines: usize,
}

impl LiteralEmission {
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

impl LiteralState {
    pub fn consume_text(self, text: &TextNode) -> LiteralState {
        let mut run = match self {
            LiteralState::InLiteralRun(run) => run,
            LiteralState::AtStart | LiteralState::AfterCodeFragment => LiteralRun::default(),
        };
        if text.content.is_empty() {
            return LiteralState::InLiteralRun(run);
        }
        // Touching nodes form one segment so a source line still yields one statement.
        match run.segments.last_mut() {
            Some((content, span)) if span.end == text.span.start => {
                content.push_str(&text.content);
                span.end = text.span.end;
            }
            _ => run.segments.push((text.content.clone(), text.span)),
        }
        LiteralState::InLiteralRun(run)
    }

    /// Emit the pending run, if any. Flushing with nothing pending yields no statements.
    pub fn flush(self, boundary: Boundary, source: &SourceId) -> (LiteralState, LiteralEmission) {
        let next = match boundary {
            Boundary::Fragment => LiteralState::AfterCodeFragment,
            Boundary::EndOfInput => LiteralState::AtStart,
        };

        let LiteralState::InLiteralRun(run) = self else {
            return (next, LiteralEmission::default());
        };

        let mut emission = LiteralEmission::default();
        for (text, span) in &run.segments {
            let mut offset = 0;
            for line in text.split_inclusive('\n') {
                let line_span = span.slice(offset, offset + line.len());
                offset += line.len();

                emission.pieces.push(Piece::text(WRITE_OPEN));
                emission.pieces.push(Piece::mapped(
                    escape(line),
                    source.clone(),
                    line_span,
                    ProjectionKind::Text,
                ));
                emission.pieces.push(Piece::text(WRITE_CLOSE));
                emission.generated_lines += 1;
            }
        }

        tracing::trace!(
            source = %source,
            statements = emission.generated_lines,
            "flushed literal run"
        );
        (next, emission)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LiteralState::InLiteralRun(run) if !run.segments.is_empty())
    }
}

/// Escape text for a regular C# string literal.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\0' => escaped.push_str("\\0"),
            // C# treats these as line terminators inside literals
            '\u{85}' | '\u{2028}' | '\u{2029}' => {
                escaped.push_str(&format!("\\u{:04x}", c as u32));
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Inverse of [`escape`].
pub fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('0') => result.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => result.push(decoded),
                    None => {
                        result.push_str("\\u");
                        result.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}
