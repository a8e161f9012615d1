//! Directive schema: the known directive kinds and their recognized attributes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    /// A directive missing this attribute (or leaving it blank) is malformed.
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveDescriptor {
    pub kind: DirectiveKind,
    pub name: &'static str,
    pub attributes: &'static [AttributeDescriptor],
}

impl DirectiveDescriptor {
    /// Attribute descriptor by name (case-insensitive).
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeDescriptor> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    pub fn required_attributes(&self) -> impl Iterator<Item = &'static AttributeDescriptor> {
        self.attributes.iter().filter(|attr| attr.required)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Template,
    Parameter,
    Output,
    Assembly,
    Import,
    Include,
}

const fn optional(name: &'static str) -> AttributeDescriptor {
    AttributeDescriptor { name, required: false }
}

const fn required(name: &'static str) -> AttributeDescriptor {
    AttributeDescriptor { name, required: true }
}

pub const HOST_SPECIFIC: &str = "hostspecific";
pub const INHERITS: &str = "inherits";
pub const TYPE: &str = "type";
pub const NAME: &str = "name";
pub const EXTENSION: &str = "extension";
pub const NAMESPACE: &str = "namespace";
pub const FILE: &str = "file";

const TEMPLATE_ATTRIBUTES: &[AttributeDescriptor] = &[
    optional("language"),
    optional(HOST_SPECIFIC),
    optional(INHERITS),
    optional("culture"),
    optional("debug"),
    optional("visibility"),
    optional("linePragmas"),
    optional("compilerOptions"),
];

const PARAMETER_ATTRIBUTES: &[AttributeDescriptor] = &[required(TYPE), required(NAME)];

const OUTPUT_ATTRIBUTES: &[AttributeDescriptor] = &[optional(EXTENSION), optional("encoding")];

const ASSEMBLY_ATTRIBUTES: &[AttributeDescriptor] = &[required(NAME)];

const IMPORT_ATTRIBUTES: &[AttributeDescriptor] = &[required(NAMESPACE)];

const INCLUDE_ATTRIBUTES: &[AttributeDescriptor] = &[required(FILE), optional("once")];

const DIRECTIVES: &[DirectiveDescriptor] = &[
    DirectiveDescriptor {
        kind: DirectiveKind::Template,
        name: "template",
        attributes: TEMPLATE_ATTRIBUTES,
    },
    DirectiveDescriptor {
        kind: DirectiveKind::Parameter,
        name: "parameter",
        attributes: PARAMETER_ATTRIBUTES,
    },
    DirectiveDescriptor {
        kind: DirectiveKind::Output,
        name: "output",
        attributes: OUTPUT_ATTRIBUTES,
    },
    DirectiveDescriptor {
        kind: DirectiveKind::Assembly,
        name: "assembly",
        attributes: ASSEMBLY_ATTRIBUTES,
    },
    DirectiveDescriptor {
        kind: DirectiveKind::Import,
        name: "import",
        attributes: IMPORT_ATTRIBUTES,
    },
    DirectiveDescriptor {
        kind: DirectiveKind::Include,
        name: "include",
        attributes: INCLUDE_ATTRIBUTES,
    },
];

/// Read-only registry, safe to share between concurrent generations.
#[derive(Debug)]
pub struct DirectiveSchema {
    directives: &'static [DirectiveDescriptor],
}

static STANDARD: DirectiveSchema = DirectiveSchema {
    directives: DIRECTIVES,
};

impl DirectiveSchema {
    pub fn standard() -> &'static DirectiveSchema {
        &STANDARD
    }

    /// Directive descriptor by name (case-insensitive).
    pub fn lookup(&self, name: &str) -> Option<&'static DirectiveDescriptor> {
        self.directives
            .iter()
            .find(|directive| directive.name.eq_ignore_ascii_case(name))
    }

    pub fn attribute(
        &self,
        descriptor: &DirectiveDescriptor,
        name: &str,
    ) -> Option<&'static AttributeDescriptor> {
        descriptor.attribute(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let schema = DirectiveSchema::standard();
        let import = schema.lookup("Import").unwrap();
        assert_eq!(import.kind, DirectiveKind::Import);
        assert!(schema.lookup("CleanUp").is_none());
    }

    #[test]
    fn test_attribute_lookup() {
        let schema = DirectiveSchema::standard();
        let template = schema.lookup("template").unwrap();
        assert!(schema.attribute(template, "HostSpecific").is_some());
        assert!(schema.attribute(template, "namespace").is_none());
    }

    #[test]
    fn test_required_attributes() {
        let schema = DirectiveSchema::standard();
        let parameter = schema.lookup("parameter").unwrap();
        let names: Vec<_> = parameter.required_attributes().map(|a| a.name).collect();
        assert_eq!(names, vec!["type", "name"]);

        let template = schema.lookup("template").unwrap();
        assert_eq!(template.required_attributes().count(), 0);
    }
}
