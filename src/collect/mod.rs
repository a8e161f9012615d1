//! Single-pass collection of directives, literal text and code fragments into sections.

mod guard;
mod literal;
mod sections;

pub use guard::{CycleDetected, IncludeGuard};
pub use literal::{Boundary, LiteralEmission, LiteralRun, LiteralState, escape, unescape};
pub use sections::{
    Accumulator, ParameterDescription, Piece, ProjectionKind, Section, SectionKind,
};

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ast::{
    CodeKind, CodeNode, DirectiveNode, IncludeNode, Node, SourceId, Span, TemplateTree,
};
use crate::error::{GenerateError, Problem, ProblemKind};
use crate::generate::csharp::{GENERATED_CODE_ATTRIBUTE, is_keyword};
use crate::macros::expand_macros;
use crate::schema::{self, DirectiveKind, DirectiveSchema};
use crate::source::{Cancellation, IncludeResolver};

const TO_STRING_OPEN: &str = "this.Write(this.ToStringHelper.ToStringWithCulture(";
const TO_STRING_CLOSE: &str = "));\n";

static NO_MACROS: BTreeMap<String, String> = BTreeMap::new();

/// An `assembly` directive, for the caller to hand to a compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReference {
    pub name: String,
    pub source: SourceId,
    pub span: Span,
}

/// Everything one traversal produced.
#[derive(Debug, Clone)]
pub struct Collected {
    pub sections: Accumulator,
    pub problems: Vec<Problem>,
    pub references: Vec<AssemblyReference>,
    pub output_extension: Option<String>,
}

/// Walks a template tree depth-first, expanding includes in place.
///
/// All state is owned by the collector and lives for one `collect` call.
pub struct Collector<'a> {
    schema: &'a DirectiveSchema,
    resolver: &'a dyn IncludeResolver,
    cancellation: &'a dyn Cancellation,
    macros: &'a BTreeMap<String, String>,
    guard: IncludeGuard,
    current: Accumulator,
    parents: Vec<Accumulator>,
    include_depth: usize,
    root_feature_started: bool,
    seen_template_directive: bool,
    problems: Vec<Problem>,
    references: Vec<AssemblyReference>,
    output_extension: Option<String>,
}

impl<'a> Collector<'a> {
    pub fn new(
        schema: &'a DirectiveSchema,
        resolver: &'a dyn IncludeResolver,
        cancellation: &'a dyn Cancellation,
    ) -> Self {
        Self {
            schema,
            resolver,
            cancellation,
            macros: &NO_MACROS,
            guard: IncludeGuard::new(),
            current: Accumulator::new(SourceId::new("")),
            parents: Vec::new(),
            include_depth: 0,
            root_feature_started: false,
            seen_template_directive: false,
            problems: Vec::new(),
            references: Vec::new(),
            output_extension: None,
        }
    }

    /// Macros expanded in assembly names.
    pub fn with_macros(mut self, macros: &'a BTreeMap<String, String>) -> Self {
        self.macros = macros;
        self
    }

    pub fn collect(mut self, root: &TemplateTree) -> Result<Collected, GenerateError> {
        self.current = Accumulator::new(root.source.clone());
        let entered = self.guard.enter(&root.source).is_ok();
        debug_assert!(entered, "fresh guard rejected the root source");

        self.visit_nodes(root)?;
        self.flush_literal(Boundary::EndOfInput);
        self.guard.exit(&root.source);
        debug_assert_eq!(self.guard.depth(), 0);

        Ok(Collected {
            sections: self.current,
            problems: self.problems,
            references: self.references,
            output_extension: self.output_extension,
        })
    }

    fn visit_nodes(&mut self, tree: &TemplateTree) -> Result<(), GenerateError> {
        for node in &tree.nodes {
            if self.cancellation.is_cancelled() {
                tracing::debug!(
                    source = %tree.source,
                    offset = node.span().start,
                    "generation cancelled"
                );
                return Err(GenerateError::Aborted);
            }

            match node {
                Node::Text(text) => {
                    let state = std::mem::take(&mut self.current.literal);
                    self.current.literal = state.consume_text(text);
                }
                Node::Directive(directive) => {
                    self.flush_literal(Boundary::Fragment);
                    self.handle_directive(directive, &tree.source);
                }
                Node::Code(code) => {
                    self.flush_literal(Boundary::Fragment);
                    self.handle_code(code, &tree.source);
                }
                Node::Include(include) => {
                    self.flush_literal(Boundary::Fragment);
                    self.handle_include(include, &tree.source)?;
                }
            }
        }
        Ok(())
    }

    fn flush_literal(&mut self, boundary: Boundary) {
        let state = std::mem::take(&mut self.current.literal);
        let (next, emission) = state.flush(boundary, self.current.source());
        self.current.literal = next;
        if !emission.is_empty() {
            self.current.append_literal(emission);
        }
    }

    fn handle_directive(&mut self, directive: &DirectiveNode, source: &SourceId) {
        let Some(descriptor) = self.schema.lookup(&directive.name) else {
            tracing::trace!(name = %directive.name, "ignoring unknown directive");
            return;
        };

        if descriptor.kind == DirectiveKind::Include {
            // Includes must arrive as include nodes; a bare directive is never expanded.
            tracing::debug!(from = %source, "include directive was not parsed as an include");
            self.problems.push(Problem::new(
                ProblemKind::UnresolvedInclude,
                source.clone(),
                directive.name_span,
                "`include` directive was not expanded",
            ));
            return;
        }

        if let Some(missing) = descriptor
            .required_attributes()
            .find(|attr| directive.value(attr.name).is_none())
        {
            tracing::debug!(
                directive = descriptor.name,
                attribute = missing.name,
                "skipping malformed directive"
            );
            self.problems.push(Problem::new(
                ProblemKind::MalformedDirective,
                source.clone(),
                directive.name_span,
                format!(
                    "`{}` directive requires a non-empty `{}` attribute",
                    descriptor.name, missing.name
                ),
            ));
            return;
        }

        match descriptor.kind {
            DirectiveKind::Import => self.handle_import(directive, source),
            DirectiveKind::Template => self.handle_template(directive, source),
            DirectiveKind::Parameter => self.handle_parameter(directive, source),
            DirectiveKind::Output => self.handle_output(directive),
            DirectiveKind::Assembly => self.handle_assembly(directive, source),
            DirectiveKind::Include => {}
        }
    }

    /// `import` becomes a using directive.
    fn handle_import(&mut self, directive: &DirectiveNode, source: &SourceId) {
        let Some((namespace, span)) = directive.value(schema::NAMESPACE) else {
            return;
        };
        let imports = SectionKind::Imports;
        self.current.append(imports, Piece::text("using "));
        self.current.append(
            imports,
            Piece::mapped(namespace, source.clone(), span, ProjectionKind::Code),
        );
        self.current.append(imports, Piece::text(";\n"));
    }

    /// Only the first `template` directive of the whole generation counts.
    fn handle_template(&mut self, directive: &DirectiveNode, source: &SourceId) {
        if self.seen_template_directive {
            return;
        }
        self.seen_template_directive = true;

        // `trueFromBase` means the base class already declares `Host`.
        if let Some((host, _)) = directive.value(schema::HOST_SPECIFIC) {
            if host.eq_ignore_ascii_case("true") {
                self.current.mark_host_required();
            }
        }

        if let Some((inherits, span)) = directive.value(schema::INHERITS) {
            self.current.try_set_base_class(inherits, source.clone(), span);
        }
    }

    /// `parameter` becomes a property; both type and name are required.
    fn handle_parameter(&mut self, directive: &DirectiveNode, source: &SourceId) {
        let (Some((type_name, type_span)), Some((name, name_span))) = (
            directive.value(schema::TYPE),
            directive.value(schema::NAME),
        ) else {
            return;
        };

        let parameters = SectionKind::Parameters;
        self.current.append(
            parameters,
            Piece::text(format!("        {}\n", GENERATED_CODE_ATTRIBUTE)),
        );
        self.current.append(parameters, Piece::text("        private "));
        self.current.append(
            parameters,
            Piece::mapped(type_name, source.clone(), type_span, ProjectionKind::Code),
        );
        self.current.append(parameters, Piece::text(" "));
        if is_keyword(name) {
            self.current.append(parameters, Piece::text("@"));
        }
        self.current.append(
            parameters,
            Piece::mapped(name, source.clone(), name_span, ProjectionKind::Code),
        );
        self.current
            .append(parameters, Piece::text(" { get; private set; }\n"));

        self.current.parameter_descriptions.push(ParameterDescription {
            type_name: type_name.to_string(),
            name: name.to_string(),
        });
    }

    fn handle_output(&mut self, directive: &DirectiveNode) {
        if self.output_extension.is_some() {
            return;
        }
        if let Some((extension, _)) = directive.value(schema::EXTENSION) {
            self.output_extension = Some(extension.to_string());
        }
    }

    fn handle_assembly(&mut self, directive: &DirectiveNode, source: &SourceId) {
        if let Some((name, span)) = directive.value(schema::NAME) {
            self.references.push(AssemblyReference {
                name: expand_macros(name, self.macros),
                source: source.clone(),
                span,
            });
        }
    }

    /// Routes a code fragment by kind: expressions and statements go to the transform
    /// method, feature blocks to the class body.
    fn handle_code(&mut self, code: &CodeNode, source: &SourceId) {
        if code.code.is_empty() {
            return;
        }
        let mapped = Piece::mapped(
            code.code.as_str(),
            source.clone(),
            code.code_span,
            ProjectionKind::Code,
        );

        match code.kind {
            CodeKind::Expression => {
                let section = if self.root_feature_started && self.include_depth == 0 {
                    SectionKind::Feature
                } else {
                    SectionKind::Transformation
                };
                self.current.append(section, Piece::text(TO_STRING_OPEN));
                self.current.append(section, mapped);
                self.current.append(section, Piece::text(TO_STRING_CLOSE));
            }
            CodeKind::Feature => {
                if self.include_depth == 0 {
                    self.root_feature_started = true;
                }
                self.current.append(SectionKind::Feature, mapped);
                self.current.append(SectionKind::Feature, Piece::text("\n"));
            }
            CodeKind::Statement => {
                self.current.append(SectionKind::Transformation, mapped);
                self.current
                    .append(SectionKind::Transformation, Piece::text("\n"));
            }
        }
    }

    fn handle_include(
        &mut self,
        include: &IncludeNode,
        from: &SourceId,
    ) -> Result<(), GenerateError> {
        let span = if include.file_span.is_empty() {
            include.span
        } else {
            include.file_span
        };

        let resolver = self.resolver;
        let Some(target) = resolver.resolve(from, include) else {
            tracing::debug!(file = %include.file, from = %from, "unresolved include");
            self.problems.push(Problem::new(
                ProblemKind::UnresolvedInclude,
                from.clone(),
                span,
                format!("cannot resolve include `{}`", include.file),
            ));
            return Ok(());
        };

        if let Err(cycle) = self.guard.enter(&target.source) {
            tracing::debug!(file = %cycle.source, from = %from, "cyclic include");
            self.problems.push(Problem::new(
                ProblemKind::CyclicInclude,
                from.clone(),
                span,
                format!("`{}` is already being expanded", cycle.source),
            ));
            return Ok(());
        }

        self.include_depth += 1;
        debug_assert_eq!(self.guard.depth(), self.include_depth + 1);
        tracing::debug!(file = %target.source, depth = self.include_depth, "expanding include");

        let frame = Accumulator::new(target.source.clone());
        let parent = std::mem::replace(&mut self.current, frame);
        self.parents.push(parent);

        self.visit_nodes(target)?;
        self.flush_literal(Boundary::EndOfInput);

        if let Some(parent) = self.parents.pop() {
            let child = std::mem::replace(&mut self.current, parent);
            self.current.merge_frame(child);
        }
        self.include_depth -= 1;
        self.guard.exit(&target.source);
        tracing::debug!(file = %target.source, "finished include");
        Ok(())
    }
}
