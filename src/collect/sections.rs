use serde::Serialize;

use crate::ast::{SourceId, Span};

use super::literal::{LiteralEmission, LiteralState};

/// How a projected range relates to its original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProjectionKind {
    /// Copied verbatim.
    Code,
    /// Escaped literal text; unescaping the generated range yields the original.
    Text,
}

/// One piece of generated text, optionally projected onto an original range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Mapped {
        text: String,
        source: SourceId,
        span: Span,
        kind: ProjectionKind,
    },
}

impl Piece {
    pub fn text(text: impl Into<String>) -> Self {
        Piece::Text(text.into())
    }

    /// A projected piece. Empty text or an empty range degrades to plain text so every
    /// projection covers a non-empty range.
    pub fn mapped(
        text: impl Into<String>,
        source: SourceId,
        span: Span,
        kind: ProjectionKind,
    ) -> Self {
        let text = text.into();
        if text.is_empty() || span.is_empty() {
            return Piece::Text(text);
        }
        Piece::Mapped {
            text,
            source,
            span,
            kind,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Piece::Text(text) => text,
            Piece::Mapped { text, .. } => text,
        }
    }
}

/// Ordered pieces of one logical section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pieces: Vec<Piece>,
}

impl Section {
    pub fn push(&mut self, piece: Piece) {
        self.pieces.push(piece);
    }

    pub fn extend(&mut self, pieces: impl IntoIterator<Item = Piece>) {
        self.pieces.extend(pieces);
    }

    pub fn append(&mut self, other: &mut Section) {
        self.pieces.append(&mut other.pieces);
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// The section rendered without projections.
    pub fn render(&self) -> String {
        self.pieces.iter().map(Piece::as_str).collect()
    }

    pub fn ends_with_newline(&self) -> bool {
        self.pieces
            .iter()
            .rev()
            .map(Piece::as_str)
            .find(|text| !text.is_empty())
            .is_none_or(|text| text.ends_with('\n'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Imports,
    BaseClass,
    Parameters,
    Transformation,
    Feature,
}

/// A declared template parameter, kept for initializer generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescription {
    pub type_name: String,
    pub name: String,
}

/// Sections collected from one source (the root or one include).
///
/// Pushed when an include starts expanding and merged into its parent when it ends.
#[derive(Debug, Clone)]
pub struct Accumulator {
    source: SourceId,
    pub imports: Section,
    pub base_class: Section,
    pub parameters: Section,
    pub transformation: Section,
    pub feature: Section,
    pub parameter_descriptions: Vec<ParameterDescription>,
    has_base_class: bool,
    requires_host: bool,
    transformation_lines: usize,
    pub(crate) literal: LiteralState,
}

impl Accumulator {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            imports: Section::default(),
            base_class: Section::default(),
            parameters: Section::default(),
            transformation: Section::default(),
            feature: Section::default(),
            parameter_descriptions: Vec::new(),
            has_base_class: false,
            requires_host: false,
            transformation_lines: 0,
            literal: LiteralState::AtStart,
        }
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn section(&self, kind: SectionKind) -> &Section {
        match kind {
            SectionKind::Imports => &self.imports,
            SectionKind::BaseClass => &self.base_class,
            SectionKind::Parameters => &self.parameters,
            SectionKind::Transformation => &self.transformation,
            SectionKind::Feature => &self.feature,
        }
    }

    fn section_mut(&mut self, kind: SectionKind) -> &mut Section {
        match kind {
            SectionKind::Imports => &mut self.imports,
            SectionKind::BaseClass => &mut self.base_class,
            SectionKind::Parameters => &mut self.parameters,
            SectionKind::Transformation => &mut self.transformation,
            SectionKind::Feature => &mut self.feature,
        }
    }

    pub fn append(&mut self, kind: SectionKind, piece: Piece) {
        if kind == SectionKind::Transformation {
            self.transformation_lines += piece.as_str().matches('\n').count();
        }
        self.section_mut(kind).push(piece);
    }

    /// Append flushed literal statements to the transformation section.
    pub fn append_literal(&mut self, emission: LiteralEmission) {
        self.transformation_lines += emission.generated_lines;
        self.transformation.extend(emission.pieces);
    }

    /// Move `other`'s section of `kind` to the end of ours.
    pub fn merge(&mut self, kind: SectionKind, other: &mut Accumulator) {
        if kind == SectionKind::Transformation {
            self.transformation_lines += other.transformation_lines;
            other.transformation_lines = 0;
        }
        let mut taken = std::mem::take(other.section_mut(kind));
        self.section_mut(kind).append(&mut taken);
    }

    /// Fold a finished include frame into this one, in traversal order.
    pub fn merge_frame(&mut self, mut child: Accumulator) {
        self.merge(SectionKind::Imports, &mut child);
        self.merge(SectionKind::Parameters, &mut child);
        self.merge(SectionKind::Transformation, &mut child);
        self.merge(SectionKind::Feature, &mut child);
        self.parameter_descriptions
            .append(&mut child.parameter_descriptions);

        if child.requires_host {
            self.mark_host_required();
        }
        if child.has_base_class && !self.has_base_class {
            self.has_base_class = true;
            self.merge(SectionKind::BaseClass, &mut child);
        }
    }

    pub fn mark_host_required(&mut self) {
        self.requires_host = true;
    }

    /// Capture the inherited class name; no-op once one is set.
    pub fn try_set_base_class(&mut self, name: &str, source: SourceId, span: Span) {
        if self.has_base_class {
            return;
        }
        self.has_base_class = true;
        self.base_class
            .push(Piece::mapped(name, source, span, ProjectionKind::Code));
    }

    pub fn has_base_class(&self) -> bool {
        self.has_base_class
    }

    pub fn requires_host(&self) -> bool {
        self.requires_host
    }

    /// Generated lines the transformation section occupies.
    pub fn transformation_lines(&self) -> usize {
        self.transformation_lines
    }
}
