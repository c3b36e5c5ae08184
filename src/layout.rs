//! The layout tree.
//!
//! A layout is parsed once from the `sections` list of the user's config and
//! then rewritten by transformers. Nodes are immutable and shared through
//! `Arc`, so a transformer that leaves a subtree alone hands back the same
//! allocation.

pub mod options;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{BuildError, Result};
use crate::objects::{DocObject, ObjectKind};
use crate::validation::{ConfigPath, ValidationIssue};

pub use options::{AutoOptions, ChildrenPolicy, MemberOrder, PackageOverride, SignatureName};

/// Any node of the layout tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Layout(Layout),
    Section(Section),
    Page(Page),
    /// A page generated for a class or module member; contents are `Doc`s only
    MemberPage(Page),
    Auto(Auto),
    Doc(Doc),
    Link(Link),
    Interlaced(Interlaced),
    Text(Text),
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Layout(_) => "layout",
            Node::Section(_) => "section",
            Node::Page(_) => "page",
            Node::MemberPage(_) => "member_page",
            Node::Auto(_) => "auto",
            Node::Doc(_) => "doc",
            Node::Link(_) => "link",
            Node::Interlaced(_) => "interlaced",
            Node::Text(_) => "text",
        }
    }

    /// The node's child sequence, if its kind has one.
    ///
    /// Each node kind holds at most one list of child nodes.
    pub fn children(&self) -> Option<(&'static str, &[Arc<Node>])> {
        match self {
            Node::Layout(layout) => Some(("sections", &layout.sections)),
            Node::Section(section) => Some(("contents", &section.contents)),
            Node::Page(page) | Node::MemberPage(page) => Some(("contents", &page.contents)),
            Node::Interlaced(interlaced) => Some(("contents", &interlaced.contents)),
            Node::Doc(doc) => doc.container().map(|c| ("members", c.members.as_slice())),
            Node::Auto(_) | Node::Link(_) | Node::Text(_) => None,
        }
    }

    /// A copy of this node with its child sequence replaced.
    pub fn with_children(&self, children: Vec<Arc<Node>>) -> Node {
        match self {
            Node::Layout(layout) => Node::Layout(Layout {
                sections: children,
                ..layout.clone()
            }),
            Node::Section(section) => Node::Section(Section {
                contents: children,
                ..section.clone()
            }),
            Node::Page(page) => Node::Page(Page {
                contents: children,
                ..page.clone()
            }),
            Node::MemberPage(page) => Node::MemberPage(Page {
                contents: children,
                ..page.clone()
            }),
            Node::Interlaced(_) => Node::Interlaced(Interlaced { contents: children }),
            Node::Doc(doc) => Node::Doc(doc.with_members(children)),
            Node::Auto(_) | Node::Link(_) | Node::Text(_) => self.clone(),
        }
    }

    /// The `package` field of nodes that carry one.
    pub fn package(&self) -> Option<&PackageOverride> {
        match self {
            Node::Layout(layout) => Some(&layout.package),
            Node::Section(section) => Some(&section.package),
            Node::Page(page) => Some(&page.package),
            Node::Auto(auto) => Some(&auto.options.package),
            _ => None,
        }
    }

    /// The `options` bag of nodes that carry one.
    pub fn options(&self) -> Option<&AutoOptions> {
        match self {
            Node::Layout(layout) => layout.options.as_ref(),
            Node::Section(section) => section.options.as_ref(),
            Node::Page(page) => page.options.as_ref(),
            _ => None,
        }
    }

    /// Name used when this node has to be given a page of its own.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Auto(auto) => Some(&auto.name),
            Node::Doc(doc) => Some(doc.name()),
            Node::Link(link) => Some(&link.name),
            Node::Interlaced(interlaced) => interlaced.contents.first().and_then(|n| n.name()),
            Node::Page(page) | Node::MemberPage(page) => Some(&page.path),
            _ => None,
        }
    }

    pub fn is_page(&self) -> bool {
        matches!(self, Node::Page(_) | Node::MemberPage(_))
    }

    pub fn as_doc(&self) -> Option<&Doc> {
        match self {
            Node::Doc(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Node::Page(page) | Node::MemberPage(page) => Some(page),
            _ => None,
        }
    }
}

/// Root of the tree
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub sections: Vec<Arc<Node>>,
    #[serde(skip_serializing_if = "PackageOverride::is_inherit")]
    pub package: PackageOverride,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<AutoOptions>,
}

/// A titled group of index entries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Section {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "PackageOverride::is_inherit")]
    pub package: PackageOverride,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<AutoOptions>,
    pub contents: Vec<Arc<Node>>,
}

impl Section {
    /// Title or subtitle, whichever is set.
    pub fn heading(&self) -> Option<&str> {
        self.title.as_deref().or(self.subtitle.as_deref())
    }
}

/// Name and description shown for a page in the index
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Summary {
    pub name: String,
    #[serde(default)]
    pub desc: String,
}

/// One output file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub path: String,
    #[serde(skip_serializing_if = "PackageOverride::is_inherit")]
    pub package: PackageOverride,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<AutoOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub flatten: bool,
    pub contents: Vec<Arc<Node>>,
}

impl Page {
    pub fn new(path: impl Into<String>, contents: Vec<Arc<Node>>) -> Self {
        Self {
            path: path.into(),
            contents,
            ..Default::default()
        }
    }

    /// The object documented by a single-entry page.
    pub fn obj(&self) -> Result<&DocObject> {
        match self.contents.as_slice() {
            [only] => match only.as_ref() {
                Node::Doc(doc) => Ok(doc.obj()),
                Node::Link(link) => Ok(&link.obj),
                other => Err(BuildError::Config(format!(
                    "Page `{}` contains a {} rather than a documented object",
                    self.path,
                    other.kind_name()
                ))),
            },
            contents => Err(BuildError::Config(format!(
                "Cannot get obj for page `{}`: it has {} content elements, but exactly one is needed",
                self.path,
                contents.len()
            ))),
        }
    }
}

/// Placeholder for an object to introspect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Auto {
    pub name: String,
    #[serde(flatten)]
    pub options: AutoOptions,
}

impl Auto {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: AutoOptions::default(),
        }
    }

    pub fn with_options(name: impl Into<String>, options: AutoOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// Shared fields of every documented object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocInfo {
    pub name: String,
    pub obj: DocObject,
    pub anchor: String,
    pub signature_name: SignatureName,
}

/// A documented class or module with its placed members
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocContainer {
    #[serde(flatten)]
    pub info: DocInfo,
    pub members: Vec<Arc<Node>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub flat: bool,
}

/// A resolved documentation unit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "doc_kind", rename_all = "lowercase")]
pub enum Doc {
    Function(DocInfo),
    Attribute(DocInfo),
    Class(DocContainer),
    Module(DocContainer),
}

impl Doc {
    /// Build the variant matching the object's kind.
    ///
    /// Members are dropped for functions and attributes.
    pub fn from_object(
        name: impl Into<String>,
        obj: DocObject,
        members: Vec<Arc<Node>>,
        flat: bool,
        anchor: Option<String>,
        signature_name: SignatureName,
    ) -> Result<Doc> {
        let kind = obj.require_kind()?;
        let info = DocInfo {
            name: name.into(),
            anchor: anchor.unwrap_or_else(|| obj.path().to_string()),
            obj,
            signature_name,
        };
        Ok(match kind {
            ObjectKind::Function => Doc::Function(info),
            ObjectKind::Attribute => Doc::Attribute(info),
            ObjectKind::Class => Doc::Class(DocContainer {
                info,
                members,
                flat,
            }),
            ObjectKind::Module => Doc::Module(DocContainer {
                info,
                members,
                flat,
            }),
        })
    }

    pub fn info(&self) -> &DocInfo {
        match self {
            Doc::Function(info) | Doc::Attribute(info) => info,
            Doc::Class(container) | Doc::Module(container) => &container.info,
        }
    }

    pub fn container(&self) -> Option<&DocContainer> {
        match self {
            Doc::Class(container) | Doc::Module(container) => Some(container),
            Doc::Function(_) | Doc::Attribute(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn obj(&self) -> &DocObject {
        &self.info().obj
    }

    pub fn anchor(&self) -> &str {
        &self.info().anchor
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Doc::Function(_) => ObjectKind::Function,
            Doc::Attribute(_) => ObjectKind::Attribute,
            Doc::Class(_) => ObjectKind::Class,
            Doc::Module(_) => ObjectKind::Module,
        }
    }

    pub fn members(&self) -> &[Arc<Node>] {
        self.container().map_or(&[], |c| c.members.as_slice())
    }

    pub fn is_flat(&self) -> bool {
        self.container().is_some_and(|c| c.flat)
    }

    pub fn with_members(&self, members: Vec<Arc<Node>>) -> Doc {
        match self {
            Doc::Class(container) => Doc::Class(DocContainer {
                members,
                ..container.clone()
            }),
            Doc::Module(container) => Doc::Module(DocContainer {
                members,
                ..container.clone()
            }),
            other => other.clone(),
        }
    }
}

/// A summary-table reference to an object documented elsewhere
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub name: String,
    pub obj: DocObject,
}

/// Functions or attributes documented together with merged sections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interlaced {
    pub contents: Vec<Arc<Node>>,
}

impl Interlaced {
    /// Check that every entry is a documented function or attribute.
    pub fn validate_docs(&self) -> Result<()> {
        for node in &self.contents {
            match node.as_ref() {
                Node::Doc(Doc::Function(_)) | Node::Doc(Doc::Attribute(_)) => {}
                Node::Doc(doc) => {
                    return Err(BuildError::Config(format!(
                        "Interlaced entries must be functions or attributes, but `{}` is a {}",
                        doc.name(),
                        doc.kind()
                    )))
                }
                other => {
                    return Err(BuildError::Config(format!(
                        "Interlaced entries must be documented objects, not {}",
                        other.kind_name()
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Literal markup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub contents: String,
}

/// An addressable entry for the inventory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub name: String,
    pub obj: DocObject,
    pub uri: String,
    pub dispname: Option<String>,
}

// parsing ---------------------------------------------------------------

impl Layout {
    /// Parse the `sections` list of the user's config.
    pub fn parse(
        sections: &[Value],
        package: PackageOverride,
        options: Option<AutoOptions>,
    ) -> Result<Layout> {
        let root = ConfigPath::root().key("sections");
        let sections = sections
            .iter()
            .enumerate()
            .map(|(i, value)| parse_section_entry(value, &root.index(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Layout {
            sections,
            package,
            options,
        })
    }

    pub fn into_node(self) -> Arc<Node> {
        Arc::new(Node::Layout(self))
    }
}

fn as_map<'a>(value: &'a Value, path: &ConfigPath) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        ValidationIssue::invalid(path, None, format!("Expected a mapping, got `{}`", value)).into()
    })
}

fn kind_of(map: &Map<String, Value>, default: &str, path: &ConfigPath) -> Result<String> {
    match map.get("kind") {
        None => Ok(default.to_string()),
        Some(Value::String(kind)) => Ok(kind.clone()),
        Some(other) => Err(ValidationIssue::invalid(
            path,
            Some("kind"),
            format!("Expected a string, got `{}`", other),
        )
        .into()),
    }
}

fn check_fields(map: &Map<String, Value>, allowed: &[&str], path: &ConfigPath) -> Result<()> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(ValidationIssue::extra(path, key).into()),
        None => Ok(()),
    }
}

fn optional_str(map: &Map<String, Value>, field: &str, path: &ConfigPath) -> Result<Option<String>> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ValidationIssue::invalid(
            path,
            Some(field),
            format!("Expected a string, got `{}`", other),
        )
        .into()),
    }
}

fn required_str(map: &Map<String, Value>, field: &str, path: &ConfigPath, kind: &str) -> Result<String> {
    optional_str(map, field, path)?.ok_or_else(|| ValidationIssue::missing(path, field, kind).into())
}

fn from_field<T: serde::de::DeserializeOwned + Default>(
    map: &Map<String, Value>,
    field: &str,
    path: &ConfigPath,
) -> Result<T> {
    match map.get(field) {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| ValidationIssue::invalid(path, Some(field), e.to_string()).into()),
    }
}

fn contents_field(map: &Map<String, Value>, path: &ConfigPath) -> Result<Vec<Arc<Node>>> {
    let list_path = path.key("contents");
    match map.get("contents") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_content(item, &list_path.index(i)))
            .collect(),
        Some(other) => Err(ValidationIssue::invalid(
            path,
            Some("contents"),
            format!("Expected a list, got `{}`", other),
        )
        .into()),
    }
}

/// An entry of the top-level `sections` list.
fn parse_section_entry(value: &Value, path: &ConfigPath) -> Result<Arc<Node>> {
    let map = as_map(value, path)?;
    match kind_of(map, "section", path)?.as_str() {
        "section" => parse_section(map, path),
        "page" => parse_page(map, path),
        other => Err(ValidationIssue::invalid(
            path,
            Some("kind"),
            format!("`{}` cannot be used in `sections`; use section or page", other),
        )
        .into()),
    }
}

/// An entry of a `contents` list. Bare strings are `Auto` entries.
pub fn parse_content(value: &Value, path: &ConfigPath) -> Result<Arc<Node>> {
    if let Value::String(name) = value {
        return Ok(Arc::new(Node::Auto(Auto::new(name.clone()))));
    }

    let map = as_map(value, path)?;
    match kind_of(map, "auto", path)?.as_str() {
        "auto" => parse_auto(map, path),
        "page" => parse_page(map, path),
        "section" => parse_section(map, path),
        "text" => {
            check_fields(map, &["kind", "contents"], path)?;
            Ok(Arc::new(Node::Text(Text {
                contents: required_str(map, "contents", path, "text")?,
            })))
        }
        "interlaced" => {
            check_fields(map, &["kind", "contents"], path)?;
            Ok(Arc::new(Node::Interlaced(Interlaced {
                contents: contents_field(map, path)?,
            })))
        }
        other => Err(ValidationIssue::invalid(
            path,
            Some("kind"),
            format!("Unknown content kind `{}`", other),
        )
        .into()),
    }
}

fn parse_auto(map: &Map<String, Value>, path: &ConfigPath) -> Result<Arc<Node>> {
    let name = required_str(map, "name", path, "auto")?;
    let mut rest = map.clone();
    rest.remove("kind");
    rest.remove("name");
    let options: AutoOptions = serde_json::from_value(Value::Object(rest))
        .map_err(|e| BuildError::from(ValidationIssue::invalid(path, None, e.to_string())))?;
    Ok(Arc::new(Node::Auto(Auto { name, options })))
}

fn parse_section(map: &Map<String, Value>, path: &ConfigPath) -> Result<Arc<Node>> {
    check_fields(
        map,
        &["kind", "title", "subtitle", "desc", "package", "options", "contents"],
        path,
    )?;
    let section = Section {
        title: optional_str(map, "title", path)?,
        subtitle: optional_str(map, "subtitle", path)?,
        desc: optional_str(map, "desc", path)?,
        package: from_field(map, "package", path)?,
        options: from_field(map, "options", path)?,
        contents: contents_field(map, path)?,
    };

    if section.title.is_some() && section.subtitle.is_some() {
        return Err(ValidationIssue::invalid(
            path,
            None,
            "Section cannot specify both title and subtitle fields",
        )
        .into());
    }
    if section.heading().is_none() && section.contents.is_empty() {
        return Err(ValidationIssue::invalid(
            path,
            None,
            "Section must specify a title, subtitle, or contents field",
        )
        .into());
    }
    Ok(Arc::new(Node::Section(section)))
}

fn parse_page(map: &Map<String, Value>, path: &ConfigPath) -> Result<Arc<Node>> {
    check_fields(
        map,
        &["kind", "path", "package", "options", "summary", "flatten", "contents"],
        path,
    )?;
    Ok(Arc::new(Node::Page(Page {
        path: required_str(map, "path", path, "page")?,
        package: from_field(map, "package", path)?,
        options: from_field(map, "options", path)?,
        summary: from_field(map, "summary", path)?,
        flatten: from_field(map, "flatten", path)?,
        contents: contents_field(map, path)?,
    })))
}
