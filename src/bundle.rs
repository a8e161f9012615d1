//! Parsed template trees stored as JSON, with include resolution between them.
//!
//! A bundle is what a parser front end hands over: every tree that a generation may
//! reach, keyed by source path, plus the macro values used by include paths.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::{IncludeNode, SourceId, TemplateTree};
use crate::error::BundleError;
use crate::macros::expand_macros;
use crate::source::IncludeResolver;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateBundle {
    pub root: SourceId,
    pub templates: Vec<TemplateTree>,
    #[serde(default)]
    pub macros: BTreeMap<String, String>,
}

impl TemplateBundle {
    pub fn new(root: TemplateTree) -> Self {
        Self {
            root: root.source.clone(),
            templates: vec![root],
            macros: BTreeMap::new(),
        }
    }

    pub fn with_template(mut self, tree: TemplateTree) -> Self {
        self.templates.push(tree);
        self
    }

    pub fn with_macro(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.macros.insert(name.into(), value.into());
        self
    }

    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, BundleError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn root_tree(&self) -> Result<&TemplateTree, BundleError> {
        self.get(&self.root)
            .ok_or_else(|| BundleError::MissingRoot(self.root.clone()))
    }

    pub fn get(&self, source: &SourceId) -> Option<&TemplateTree> {
        self.templates.iter().find(|tree| &tree.source == source)
    }
}

impl IncludeResolver for TemplateBundle {
    fn resolve(&self, from: &SourceId, include: &IncludeNode) -> Option<&TemplateTree> {
        let file = expand_macros(include.file.trim(), &self.macros);
        if file.is_empty() {
            return None;
        }
        let path = resolve_path(from.as_str(), &file);
        tracing::trace!(from = %from, file = %include.file, resolved = %path, "resolving include");
        self.get(&SourceId::new(path))
    }
}

/// Join `file` onto the directory of `from` and normalize the result.
///
/// Backslashes are treated as separators. Absolute paths ignore `from`.
pub fn resolve_path(from: &str, file: &str) -> String {
    let file = file.replace('\\', "/");
    let from = from.replace('\\', "/");

    let joined = if file.starts_with('/') {
        file
    } else {
        match from.rfind('/') {
            Some(index) => format!("{}/{}", &from[..index], file),
            None => file,
        }
    };

    let absolute = joined.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            segment => segments.push(segment),
        }
    }

    let normalized = segments.join("/");
    if absolute {
        format!("/{}", normalized)
    } else {
        normalized
    }
}
