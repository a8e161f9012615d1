pub mod csharp;
mod output;
mod projection;

pub use csharp::CSharpGenerator;
pub use output::Output;
pub use projection::{Injection, Projection, ProjectionTable, compute_injections};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::SourceId;
use crate::collect::{AssemblyReference, Collected};
use crate::error::{Problem, ProblemKind};

/// Shape of the generated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Navigation-only output against the shared runtime base type.
    #[default]
    CodeBehind,
    /// Compiled standalone: synthesized base class and a parameter initializer.
    Executable,
    /// Executed interactively: synthesized base class, no initializer.
    Interactive,
}

impl Variant {
    pub fn synthesizes_base_class(&self) -> bool {
        matches!(self, Variant::Executable | Variant::Interactive)
    }

    pub fn emits_initializer(&self) -> bool {
        matches!(self, Variant::Executable)
    }
}

/// Generator options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    pub variant: Variant,
    pub namespace: Option<String>,
    /// Name of the generated class (default: "GeneratedTextTransformation")
    pub class_name: Option<String>,
    /// Values for `$(Name)` macros in assembly names.
    pub macros: BTreeMap<String, String>,
}

impl GenerateOptions {
    pub fn class_name(&self) -> &str {
        self.class_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(csharp::DEFAULT_CLASS_NAME)
    }

    /// The wrapping namespace, if one is set and non-blank.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace
            .as_deref()
            .map(str::trim)
            .filter(|namespace| !namespace.is_empty())
    }
}

/// Generation result
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub code: String,
    pub projections: ProjectionTable,
    pub problems: Vec<Problem>,
    pub references: Vec<AssemblyReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_extension: Option<String>,
}

impl GenerateResult {
    pub fn lookup_by_generated(&self, offset: usize) -> Option<&Projection> {
        self.projections.lookup_by_generated(offset)
    }

    pub fn lookup_by_original(&self, source: &SourceId, offset: usize) -> Option<&Projection> {
        self.projections.lookup_by_original(source, offset)
    }

    /// Original position of a generated offset.
    pub fn original_position(&self, offset: usize) -> Option<(&SourceId, usize)> {
        let projection = self.lookup_by_generated(offset)?;
        let original = projection.to_original(&self.code, offset)?;
        Some((&projection.source, original))
    }

    /// Generated position of an original offset.
    pub fn generated_position(&self, source: &SourceId, offset: usize) -> Option<usize> {
        self.lookup_by_original(source, offset)?
            .to_generated(&self.code, offset)
    }

    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    /// Whether some include was not expanded.
    pub fn is_interrupted(&self) -> bool {
        self.problems.iter().any(|problem| problem.kind.interrupts())
    }

    pub fn problems_of(&self, kind: ProblemKind) -> impl Iterator<Item = &Problem> {
        self.problems
            .iter()
            .filter(move |problem| problem.kind == kind)
    }

    /// Editor injections for one source, given its text.
    pub fn injections(&self, source: &SourceId, source_text: &str) -> Vec<Injection> {
        compute_injections(&self.code, &self.projections, source, source_text)
    }
}

/// Generator trait - renders collected sections to code
pub trait Generator {
    fn generate(&self, collected: Collected, options: &GenerateOptions) -> GenerateResult;
}
