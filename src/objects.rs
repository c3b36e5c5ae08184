//! Introspected object metadata.
//!
//! Objects describe modules, classes, functions and attributes as produced by
//! static analysis of the documented package. Aliases are references to
//! objects defined elsewhere (imports, re-exports, assignments, inherited
//! members). Both are shared read-only through [`DocObject`] handles; nothing
//! downstream of the loader mutates them.

pub mod docstring;
pub mod loader;

use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{BuildError, Result};

pub use docstring::{
    Docstring, DocstringElement, DocstringParser, DocstringSection, DocstringStyle, ExamplePart,
    SectionKind, SectionParser, SectionValue,
};
pub use loader::{
    DirectorySource, Dynamic, MemorySource, ModulesCollection, ObjectLoader, PackageDump,
    PackageSource, MAX_ALIAS_HOPS,
};

/// The kind of an introspected object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Module,
    Class,
    Function,
    Attribute,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Module => "module",
            ObjectKind::Class => "class",
            ObjectKind::Function => "function",
            ObjectKind::Attribute => "attribute",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a parameter binds its argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    PositionalOnly,
    #[default]
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

/// A function or class-constructor parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub kind: ParameterKind,
}

/// A concrete object at its definition site
#[derive(Debug, Clone)]
pub struct Object {
    pub kind: ObjectKind,
    pub name: String,
    /// Dotted path at the definition site, e.g. `pkg.sub.Foo.method`
    pub path: String,
    pub parent_path: Option<String>,
    pub docstring: Option<Docstring>,
    /// Member names in declaration order
    pub member_names: Vec<String>,
    /// Explicit export list (`__all__`), modules only
    pub exports: Option<Vec<String>>,
    /// Resolved paths of base classes, classes only
    pub bases: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub returns: Option<String>,
    pub annotation: Option<String>,
    pub value: Option<String>,
    pub labels: Vec<String>,
}

impl Object {
    pub fn is_module(&self) -> bool {
        self.kind == ObjectKind::Module
    }

    pub fn is_class(&self) -> bool {
        self.kind == ObjectKind::Class
    }

    /// Whether `name` is listed in the module's export list.
    ///
    /// Objects without an export list export nothing explicitly.
    pub fn exports_name(&self, name: &str) -> bool {
        self.exports
            .as_ref()
            .is_some_and(|names| names.iter().any(|n| n == name))
    }
}

/// A reference to an object defined elsewhere
#[derive(Debug, Clone)]
pub struct Alias {
    pub name: String,
    /// Path under which the alias is reached (display path)
    pub path: String,
    /// Path of the object declaring the alias
    pub parent_path: String,
    /// The immediate target (first hop of the chain)
    pub target_path: String,
    /// Final object at the end of the alias chain, if it could be loaded
    pub target: Option<Arc<Object>>,
    /// Set for members picked up from a base class
    pub inherited: bool,
}

/// Shared handle to an object or alias, as returned by the loader
#[derive(Debug, Clone)]
pub enum DocObject {
    Object(Arc<Object>),
    Alias(Arc<Alias>),
}

impl DocObject {
    pub fn name(&self) -> &str {
        match self {
            DocObject::Object(obj) => &obj.name,
            DocObject::Alias(alias) => &alias.name,
        }
    }

    /// The path this object was reached by.
    pub fn path(&self) -> &str {
        match self {
            DocObject::Object(obj) => &obj.path,
            DocObject::Alias(alias) => &alias.path,
        }
    }

    /// The path at the definition site.
    ///
    /// Unresolved aliases fall back to their immediate target path.
    pub fn canonical_path(&self) -> &str {
        match self {
            DocObject::Object(obj) => &obj.path,
            DocObject::Alias(alias) => match &alias.target {
                Some(target) => &target.path,
                None => &alias.target_path,
            },
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, DocObject::Alias(_))
    }

    pub fn target_path(&self) -> Option<&str> {
        match self {
            DocObject::Object(_) => None,
            DocObject::Alias(alias) => Some(&alias.target_path),
        }
    }

    /// The concrete object behind this handle.
    pub fn target(&self) -> Option<&Arc<Object>> {
        match self {
            DocObject::Object(obj) => Some(obj),
            DocObject::Alias(alias) => alias.target.as_ref(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.target().is_some()
    }

    pub fn kind(&self) -> Option<ObjectKind> {
        self.target().map(|obj| obj.kind)
    }

    /// Kind of the concrete object, failing for unresolved aliases.
    pub fn require_kind(&self) -> Result<ObjectKind> {
        match self {
            DocObject::Object(obj) => Ok(obj.kind),
            DocObject::Alias(alias) => alias
                .target
                .as_ref()
                .map(|obj| obj.kind)
                .ok_or_else(|| BuildError::UnresolvedAlias {
                    path: alias.path.clone(),
                    target: alias.target_path.clone(),
                }),
        }
    }

    pub fn is_kind(&self, kind: ObjectKind) -> bool {
        self.kind() == Some(kind)
    }

    pub fn docstring(&self) -> Option<&Docstring> {
        self.target().and_then(|obj| obj.docstring.as_ref())
    }

    pub fn parent_path(&self) -> Option<&str> {
        match self {
            DocObject::Object(obj) => obj.parent_path.as_deref(),
            DocObject::Alias(alias) => Some(&alias.parent_path),
        }
    }

    pub fn is_inherited(&self) -> bool {
        matches!(self, DocObject::Alias(alias) if alias.inherited)
    }

    /// First segment of the canonical path.
    pub fn canonical_root(&self) -> &str {
        root_module(self.canonical_path())
    }
}

impl PartialEq for DocObject {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DocObject::Object(a), DocObject::Object(b)) => Arc::ptr_eq(a, b) || a.path == b.path,
            (DocObject::Alias(a), DocObject::Alias(b)) => {
                Arc::ptr_eq(a, b) || (a.path == b.path && a.target_path == b.target_path)
            }
            _ => false,
        }
    }
}

impl Serialize for DocObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DocObject", 3)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("path", self.path())?;
        state.serialize_field("canonical_path", self.canonical_path())?;
        state.end()
    }
}

/// Root module name of a dotted or colon-separated path.
pub fn root_module(path: &str) -> &str {
    path.split(['.', ':']).next().unwrap_or(path)
}

/// Convert `pkg.mod:Class.method` into the dotted form `pkg.mod.Class.method`.
pub fn dotted_path(path: &str) -> String {
    path.replacen(':', ".", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(path: &str) -> Arc<Object> {
        let name = path.rsplit('.').next().unwrap().to_string();
        Arc::new(Object {
            kind: ObjectKind::Function,
            name,
            path: path.to_string(),
            parent_path: path.rsplit_once('.').map(|(p, _)| p.to_string()),
            docstring: None,
            member_names: Vec::new(),
            exports: None,
            bases: Vec::new(),
            parameters: Vec::new(),
            returns: None,
            annotation: None,
            value: None,
            labels: Vec::new(),
        })
    }

    #[test]
    fn test_alias_paths() {
        let target = function("pkg.sub.foo");
        let alias = DocObject::Alias(Arc::new(Alias {
            name: "foo".into(),
            path: "pkg.foo".into(),
            parent_path: "pkg".into(),
            target_path: "pkg.sub.foo".into(),
            target: Some(target),
            inherited: false,
        }));

        assert_eq!(alias.path(), "pkg.foo");
        assert_eq!(alias.canonical_path(), "pkg.sub.foo");
        assert_eq!(alias.kind(), Some(ObjectKind::Function));
        assert!(alias.is_alias());
    }

    #[test]
    fn test_unresolved_alias_kind_fails() {
        let alias = DocObject::Alias(Arc::new(Alias {
            name: "tabulate".into(),
            path: "pkg.tabulate".into(),
            parent_path: "pkg".into(),
            target_path: "tabulate.tabulate".into(),
            target: None,
            inherited: false,
        }));

        assert_eq!(alias.canonical_path(), "tabulate.tabulate");
        assert_eq!(alias.canonical_root(), "tabulate");
        assert!(matches!(
            alias.require_kind(),
            Err(BuildError::UnresolvedAlias { .. })
        ));
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(dotted_path("pkg.mod:Class.method"), "pkg.mod.Class.method");
        assert_eq!(root_module("pkg.mod:Class"), "pkg");
        assert_eq!(root_module("pkg"), "pkg");
    }
}
