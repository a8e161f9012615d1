//! Template-to-C# transpiler.
//!
//! Walks a parsed text template (directives, literal text, code blocks and includes),
//! groups what it finds into sections, and assembles one C# program together with a
//! projection table that maps generated ranges back to template ranges.
//!
//! ```
//! use tea_transpiler::{Pipeline, NoIncludes, TemplateBuilder};
//!
//! let tree = TemplateBuilder::new("hello.tt")
//!     .directive("import", &[("namespace", "System.Text")])
//!     .text("Hello")
//!     .build();
//! let result = Pipeline::standard().compile(&tree, &NoIncludes).unwrap();
//! assert!(result.code.contains("using System.Text;"));
//! assert!(result.code.contains("this.Write(\"Hello\");"));
//! ```

pub mod ast;
pub mod bundle;
pub mod collect;
pub mod error;
pub mod generate;
pub mod macros;
pub mod positions;
pub mod schema;
pub mod source;
pub mod tree_builder;

use std::sync::Arc;

pub use ast::{Node, SourceId, Span, TemplateTree};
pub use bundle::TemplateBundle;
pub use collect::{AssemblyReference, Collected, Collector, ProjectionKind};
pub use error::{BundleError, Error, GenerateError, Problem, ProblemKind};
pub use generate::{
    CSharpGenerator, GenerateOptions, GenerateResult, Generator, Injection, Projection,
    ProjectionTable, Variant,
};
pub use schema::DirectiveSchema;
pub use source::{Cancellation, CancellationFlag, IncludeResolver, NeverCancelled, NoIncludes};
pub use tree_builder::TemplateBuilder;

/// Collect-then-assemble pipeline with fixed options.
///
/// Holds no per-generation state, so one pipeline can serve concurrent calls.
pub struct Pipeline {
    schema: &'static DirectiveSchema,
    options: GenerateOptions,
    cancellation: Arc<dyn Cancellation>,
}

impl Pipeline {
    pub fn new(options: GenerateOptions) -> Self {
        Self {
            schema: DirectiveSchema::standard(),
            options,
            cancellation: Arc::new(NeverCancelled),
        }
    }

    /// Default options
    pub fn standard() -> Self {
        Self::new(GenerateOptions::default())
    }

    /// Polled before every node; once it reports cancelled, `compile` returns `Aborted`.
    pub fn with_cancellation(mut self, cancellation: Arc<dyn Cancellation>) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn compile(
        &self,
        root: &TemplateTree,
        resolver: &dyn IncludeResolver,
    ) -> Result<GenerateResult, GenerateError> {
        tracing::debug!(root = %root.source, variant = ?self.options.variant, "generating");

        let collected = Collector::new(self.schema, resolver, self.cancellation.as_ref())
            .with_macros(&self.options.macros)
            .collect(root)?;

        let generator = CSharpGenerator::new(self.options.variant);
        Ok(generator.generate(collected, &self.options))
    }
}

/// Generate with the given options and no cancellation.
pub fn generate(
    root: &TemplateTree,
    resolver: &dyn IncludeResolver,
    options: &GenerateOptions,
) -> Result<GenerateResult, GenerateError> {
    Pipeline::new(options.clone()).compile(root, resolver)
}

/// Generate the root of a bundle, resolving includes within it.
///
/// The bundle's macros are added to the options' macros (options win on conflict).
pub fn generate_bundle(
    bundle: &TemplateBundle,
    options: &GenerateOptions,
) -> Result<GenerateResult, Error> {
    let root = bundle.root_tree()?;
    let mut options = options.clone();
    for (name, value) in &bundle.macros {
        options
            .macros
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }
    Ok(Pipeline::new(options).compile(root, bundle)?)
}
