use serde::Serialize;

use crate::ast::{SourceId, Span};
use crate::collect::{ProjectionKind, unescape};
use crate::positions::byte_to_utf16;

/// A generated range and the original range it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub generated: Span,
    pub source: SourceId,
    pub original: Span,
    pub kind: ProjectionKind,
    /// 0-based line of `generated.start` in the generated code.
    pub generated_line: usize,
}

impl Projection {
    /// Map a generated offset inside this projection to an original offset.
    ///
    /// `code` is the generated program the projection was recorded against.
    pub fn to_original(&self, code: &str, offset: usize) -> Option<usize> {
        if !self.generated.contains(offset) {
            return None;
        }
        let relative = offset - self.generated.start;
        match self.kind {
            ProjectionKind::Code => Some(self.original.start + relative),
            ProjectionKind::Text => {
                let escaped = code.get(self.generated.start..self.generated.end)?;
                let (_, original) = text_steps(escaped)
                    .into_iter()
                    .take_while(|(generated, _)| *generated <= relative)
                    .last()?;
                Some(self.original.start + original)
            }
        }
    }

    /// Map an original offset inside this projection to a generated offset.
    pub fn to_generated(&self, code: &str, offset: usize) -> Option<usize> {
        if !self.original.contains(offset) {
            return None;
        }
        let relative = offset - self.original.start;
        match self.kind {
            ProjectionKind::Code => Some(self.generated.start + relative),
            ProjectionKind::Text => {
                let escaped = code.get(self.generated.start..self.generated.end)?;
                let (generated, _) = text_steps(escaped)
                    .into_iter()
                    .take_while(|(_, original)| *original <= relative)
                    .last()?;
                Some(self.generated.start + generated)
            }
        }
    }
}

/// Offsets (generated, original) at every decoded character boundary of an escaped
/// literal, relative to the start of each.
fn text_steps(escaped: &str) -> Vec<(usize, usize)> {
    let mut steps = vec![(0, 0)];
    let (mut generated, mut original) = (0, 0);

    while generated < escaped.len() {
        let rest = &escaped[generated..];
        let mut width = match rest.strip_prefix('\\') {
            Some(after) if after.starts_with('u') => 6.min(rest.len()),
            Some(after) => 1 + after.chars().next().map_or(0, char::len_utf8),
            None => rest.chars().next().map_or(1, char::len_utf8),
        };
        while !rest.is_char_boundary(width) {
            width -= 1;
        }

        original += unescape(&rest[..width]).len();
        generated += width;
        steps.push((generated, original));
    }
    steps
}

/// Ordered, non-overlapping projections of one generated program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProjectionTable {
    entries: Vec<Projection>,
}

impl ProjectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries must arrive in generated order.
    pub fn record(&mut self, projection: Projection) {
        debug_assert!(
            self.entries
                .last()
                .is_none_or(|last| last.generated.end <= projection.generated.start),
            "projections recorded out of order"
        );
        self.entries.push(projection);
    }

    pub fn lookup_by_generated(&self, offset: usize) -> Option<&Projection> {
        let index = self
            .entries
            .partition_point(|entry| entry.generated.end <= offset);
        self.entries
            .get(index)
            .filter(|entry| entry.generated.contains(offset))
    }

    pub fn lookup_by_original(&self, source: &SourceId, offset: usize) -> Option<&Projection> {
        self.entries
            .iter()
            .find(|entry| &entry.source == source && entry.original.contains(offset))
    }

    pub fn for_source<'a>(
        &'a self,
        source: &'a SourceId,
    ) -> impl Iterator<Item = &'a Projection> + 'a {
        self.entries.iter().filter(move |entry| &entry.source == source)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Projection> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ProjectionTable {
    type Item = &'a Projection;
    type IntoIter = std::slice::Iter<'a, Projection>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A language injection for editors that host C# inside the template.
///
/// The editor concatenates `prefix + original + suffix` across a source's injections
/// (in source order) to build the virtual C# document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Injection {
    #[serde(rename = "type")]
    pub injection_type: String,
    /// Start in the template text, UTF-16.
    pub start: usize,
    /// End in the template text, UTF-16.
    pub end: usize,
    pub prefix: String,
    pub suffix: String,
}

/// Build injections for the verbatim code ranges of `source`.
///
/// Only the last injection carries a suffix. When a later source range was generated
/// before an earlier one its prefix is empty.
pub fn compute_injections(
    code: &str,
    projections: &ProjectionTable,
    source: &SourceId,
    source_text: &str,
) -> Vec<Injection> {
    let mut ranges: Vec<&Projection> = projections
        .for_source(source)
        .filter(|projection| projection.kind == ProjectionKind::Code)
        .collect();
    ranges.sort_by_key(|projection| projection.original.start);

    let mut injections = Vec::with_capacity(ranges.len());
    let mut prev_end = 0;
    let count = ranges.len();

    for (index, projection) in ranges.into_iter().enumerate() {
        let prefix = code
            .get(prev_end..projection.generated.start)
            .unwrap_or_default()
            .to_string();
        let suffix = if index + 1 == count {
            code.get(projection.generated.end..)
                .unwrap_or_default()
                .to_string()
        } else {
            String::new()
        };

        injections.push(Injection {
            injection_type: "csharp".to_string(),
            start: byte_to_utf16(source_text, projection.original.start),
            end: byte_to_utf16(source_text, projection.original.end),
            prefix,
            suffix,
        });
        prev_end = projection.generated.end;
    }

    injections
}
