use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Byte range within one source document (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when `offset` lies inside the span.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Sub-span relative to this span's start.
    pub fn slice(&self, from: usize, to: usize) -> Span {
        Span::new(self.start + from, self.start + to)
    }
}

/// Stable identity of one physical template (root or included).
///
/// Two identities are equal iff they name the same resolved file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for SourceId {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// A parsed template: its identity, full text and top-level nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateTree {
    pub source: SourceId,
    pub text: String,
    pub nodes: Vec<Node>,
}

impl TemplateTree {
    pub fn new(source: impl Into<SourceId>, text: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            nodes,
        }
    }

    /// Source text covered by `span`, if the span is valid for this tree.
    pub fn slice(&self, span: Span) -> Option<&str> {
        self.text.get(span.start..span.end)
    }
}

/// Template node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Directive(DirectiveNode),
    Text(TextNode),
    Code(CodeNode),
    Include(IncludeNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Directive(d) => d.span,
            Node::Text(t) => t.span,
            Node::Code(c) => c.span,
            Node::Include(i) => i.span,
        }
    }
}

/// `<#@ name attr="value" #>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveNode {
    pub name: String,
    pub name_span: Span,
    pub attributes: Vec<DirectiveAttribute>,
    pub span: Span,
}

impl DirectiveNode {
    /// First attribute with the given name (case-insensitive).
    pub fn attribute(&self, name: &str) -> Option<&DirectiveAttribute> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Attribute value trimmed of surrounding whitespace, `None` when absent or blank.
    pub fn value(&self, name: &str) -> Option<(&str, Span)> {
        self.attribute(name).and_then(DirectiveAttribute::trimmed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveAttribute {
    pub name: String,
    pub value: String,
    pub value_span: Span,
}

impl DirectiveAttribute {
    /// The value without surrounding whitespace, with its span narrowed to match.
    pub fn trimmed(&self) -> Option<(&str, Span)> {
        let leading = self.value.len() - self.value.trim_start().len();
        let trimmed = self.value.trim();
        if trimmed.is_empty() {
            return None;
        }
        let span = self.value_span.slice(leading, leading + trimmed.len());
        Some((trimmed, span))
    }
}

/// Literal template text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextNode {
    pub content: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    /// `<# ... #>`
    Statement,
    /// `<#= ... #>`
    Expression,
    /// `<#+ ... #>`
    Feature,
}

/// Embedded code fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeNode {
    pub kind: CodeKind,
    pub code: String,
    pub code_span: Span,
    pub span: Span,
}

/// `<#@ include file="..." #>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludeNode {
    pub file: String,
    pub file_span: Span,
    pub span: Span,
}
