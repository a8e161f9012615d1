//! Builds a `TemplateTree` while writing the matching template text.
//!
//! Every node is appended to the text in template syntax and its spans are taken from
//! the write position, so the tree and the text always agree byte for byte.

use crate::ast::{
    CodeKind, CodeNode, DirectiveAttribute, DirectiveNode, IncludeNode, Node, SourceId, Span,
    TemplateTree, TextNode,
};

pub struct TemplateBuilder {
    source: SourceId,
    text: String,
    nodes: Vec<Node>,
}

impl TemplateBuilder {
    pub fn new(source: impl Into<SourceId>) -> Self {
        Self {
            source: source.into(),
            text: String::new(),
            nodes: Vec::new(),
        }
    }

    /// Literal text
    pub fn text(mut self, content: &str) -> Self {
        let span = self.write(content);
        self.nodes.push(Node::Text(TextNode {
            content: content.to_string(),
            span,
        }));
        self
    }

    /// `<#@ name a="1" b="2" #>`
    pub fn directive(mut self, name: &str, attributes: &[(&str, &str)]) -> Self {
        let start = self.text.len();
        self.write("<#@ ");
        let name_span = self.write(name);

        let mut attrs = Vec::with_capacity(attributes.len());
        for (attr_name, value) in attributes {
            self.write(" ");
            self.write(attr_name);
            self.write("=\"");
            let value_span = self.write(value);
            self.write("\"");
            attrs.push(DirectiveAttribute {
                name: attr_name.to_string(),
                value: value.to_string(),
                value_span,
            });
        }

        self.write(" #>");
        self.nodes.push(Node::Directive(DirectiveNode {
            name: name.to_string(),
            name_span,
            attributes: attrs,
            span: Span::new(start, self.text.len()),
        }));
        self
    }

    /// `<#@ include file="..." #>`
    pub fn include(mut self, file: &str) -> Self {
        let start = self.text.len();
        self.write("<#@ include file=\"");
        let file_span = self.write(file);
        self.write("\" #>");
        self.nodes.push(Node::Include(IncludeNode {
            file: file.to_string(),
            file_span,
            span: Span::new(start, self.text.len()),
        }));
        self
    }

    /// `<# code #>`
    pub fn statement(self, code: &str) -> Self {
        self.code(CodeKind::Statement, "<#", code)
    }

    /// `<#= code #>`
    pub fn expression(self, code: &str) -> Self {
        self.code(CodeKind::Expression, "<#=", code)
    }

    /// `<#+ code #>`
    pub fn feature(self, code: &str) -> Self {
        self.code(CodeKind::Feature, "<#+", code)
    }

    pub fn build(self) -> TemplateTree {
        TemplateTree {
            source: self.source,
            text: self.text,
            nodes: self.nodes,
        }
    }

    fn code(mut self, kind: CodeKind, open: &str, code: &str) -> Self {
        let start = self.text.len();
        self.write(open);
        let code_span = self.write(code);
        self.write("#>");
        self.nodes.push(Node::Code(CodeNode {
            kind,
            code: code.to_string(),
            code_span,
            span: Span::new(start, self.text.len()),
        }));
        self
    }

    fn write(&mut self, s: &str) -> Span {
        let start = self.text.len();
        self.text.push_str(s);
        Span::new(start, self.text.len())
    }
}
