//! Markdown renderer for blueprinted layouts.
//!
//! `render` turns pages, sections and documented objects into the body of a
//! `.qmd` file. `summarize` produces the rows of the index tables.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::RendererConfig;
use crate::error::{BuildError, Result};
use crate::interlinks::convert_rst_link_to_md;
use crate::layout::{Doc, Interlaced, Node, Page, Section, SignatureName};
use crate::objects::{
    DocObject, DocstringElement, DocstringSection, ExamplePart, ObjectKind, Parameter,
    ParameterKind, SectionKind, SectionValue,
};

lazy_static! {
    /// A bare dotted name that can be looked up as an interlink
    static ref DOTTED_NAME: Regex = Regex::new(r"^[A-Za-z_][\w.]*$").unwrap();
}

/// Suffix of every generated page
pub const PAGE_SUFFIX: &str = ".qmd";

/// Which name documented objects are shown under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayName {
    Name,
    #[default]
    Relative,
    Full,
    Canonical,
}

impl DisplayName {
    pub fn of(&self, obj: &DocObject) -> String {
        match self {
            DisplayName::Name => obj.name().to_string(),
            DisplayName::Relative => match obj.path().split_once('.') {
                Some((_, rest)) => rest.to_string(),
                None => obj.path().to_string(),
            },
            DisplayName::Full => obj.path().to_string(),
            DisplayName::Canonical => obj.canonical_path().to_string(),
        }
    }
}

impl From<SignatureName> for DisplayName {
    fn from(name: SignatureName) -> Self {
        match name {
            SignatureName::Full => DisplayName::Full,
            SignatureName::Short => DisplayName::Name,
            SignatureName::Relative => DisplayName::Relative,
        }
    }
}

/// Converts layout nodes into markup
pub trait Renderer {
    /// Full markup for a node.
    fn render(&self, node: &Node) -> Result<String>;

    /// Index-table markup for a node.
    fn summarize(&self, node: &Node) -> Result<String>;
}

/// Build the renderer named by the configuration.
pub fn renderer_from_config(config: &RendererConfig) -> Result<Box<dyn Renderer>> {
    match config.style.as_str() {
        "markdown" => Ok(Box::new(MdRenderer::new(config.clone()))),
        other => Err(BuildError::Config(format!(
            "Unsupported renderer style `{}`. The only available style is `markdown`.",
            other
        ))),
    }
}

/// Wrap a value in backticks.
pub fn escape(val: &str) -> String {
    format!("`{}`", val)
}

/// Make text safe for a single table cell.
pub fn sanitize(val: &str) -> String {
    val.replace('\n', " ")
        .replace('|', "\\|")
        .replace('[', "\\[")
        .replace(']', "\\]")
}

/// A github style table.
pub fn markdown_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = format!("| {} |\n|", header.join(" | "));
    for _ in header {
        out.push_str(" --- |");
    }
    for row in rows {
        out.push_str(&format!("\n| {} |", row.join(" | ")));
    }
    out
}

fn heading(level: usize, text: &str) -> String {
    format!("{} {}", "#".repeat(level), text)
}

fn join_parts(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Object a member entry documents or links to.
fn member_obj(node: &Node) -> Option<&DocObject> {
    match node {
        Node::Doc(doc) => Some(doc.obj()),
        Node::Link(link) => Some(&link.obj),
        Node::MemberPage(page) => page.obj().ok(),
        _ => None,
    }
}

fn has_attributes_section(obj: &DocObject) -> bool {
    obj.docstring()
        .is_some_and(|d| d.parsed.iter().any(|s| s.kind == SectionKind::Attributes))
}

/// Renders docstrings and layouts to Quarto markdown
#[derive(Debug, Clone, Default)]
pub struct MdRenderer {
    config: RendererConfig,
}

impl MdRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn render_at(&self, node: &Node, level: usize) -> Result<String> {
        match node {
            Node::Layout(layout) => {
                let parts = layout
                    .sections
                    .iter()
                    .map(|s| self.render_at(s, level))
                    .collect::<Result<Vec<_>>>()?;
                Ok(join_parts(parts))
            }
            Node::Section(section) => self.render_section(section, level),
            Node::Page(page) | Node::MemberPage(page) => self.render_page(page, level),
            Node::Doc(doc) => self.render_doc(doc, level),
            Node::Interlaced(interlaced) => self.render_interlaced(interlaced, level),
            Node::Link(link) => Ok(format!("[](`{}`)", link.name)),
            Node::Text(text) => Ok(text.contents.clone()),
            Node::Auto(_) => Err(BuildError::UnsupportedNode {
                operation: "render",
                kind: node.kind_name().to_string(),
            }),
        }
    }

    fn render_section(&self, section: &Section, level: usize) -> Result<String> {
        let mut parts = vec![heading(level, section.heading().unwrap_or_default())];
        if let Some(desc) = &section.desc {
            parts.push(desc.clone());
        }
        for child in &section.contents {
            parts.push(self.render_at(child, level + 1)?);
        }
        Ok(join_parts(parts))
    }

    fn render_page(&self, page: &Page, level: usize) -> Result<String> {
        let mut parts = Vec::new();
        if let Some(summary) = &page.summary {
            parts.push(format!("{}\n\n{}", heading(level, &summary.name), summary.desc));
        }
        for child in &page.contents {
            parts.push(self.render_at(child, level)?);
        }
        Ok(join_parts(parts))
    }

    /// The heading of a documented object, with its anchor.
    pub fn render_header(&self, doc: &Doc, level: usize) -> String {
        heading(level, &format!("{} {{ #{} }}", doc.name(), doc.anchor()))
    }

    fn render_doc(&self, doc: &Doc, level: usize) -> Result<String> {
        let display = DisplayName::from(doc.info().signature_name);
        let mut parts = vec![
            self.render_header(doc, level),
            self.render_object(doc.obj(), display, level),
        ];

        if let Some(container) = doc.container() {
            let is_class = doc.kind() == ObjectKind::Class;
            let members = &container.members;
            let of_kind = |kind: ObjectKind| -> Vec<&Node> {
                members
                    .iter()
                    .map(|m| m.as_ref())
                    .filter(|m| member_obj(m).is_some_and(|o| o.is_kind(kind)))
                    .collect()
            };

            let attrs = of_kind(ObjectKind::Attribute);
            if !attrs.is_empty() && !has_attributes_section(doc.obj()) {
                parts.push(self.member_table("Attributes", &attrs, level)?);
            }
            if !is_class {
                let classes = of_kind(ObjectKind::Class);
                if !classes.is_empty() {
                    parts.push(self.member_table("Classes", &classes, level)?);
                }
            }
            let funcs = of_kind(ObjectKind::Function);
            if !funcs.is_empty() {
                let title = if is_class { "Methods" } else { "Functions" };
                parts.push(self.member_table(title, &funcs, level)?);
            }

            let depth = if container.flat { 1 } else { 2 };
            for member in members {
                if let Node::Doc(_) = member.as_ref() {
                    parts.push(self.render_at(member, level + depth)?);
                }
            }
        }

        Ok(join_parts(parts))
    }

    fn member_table(&self, title: &str, members: &[&Node], level: usize) -> Result<String> {
        let rows = members
            .iter()
            .map(|m| self.summarize(m))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "{}\n\n| Name | Description |\n| --- | --- |\n{}",
            heading(level + 1, title),
            rows.join("\n")
        ))
    }

    fn render_interlaced(&self, interlaced: &Interlaced, level: usize) -> Result<String> {
        let docs: Vec<&Doc> = interlaced
            .contents
            .iter()
            .filter_map(|n| n.as_doc())
            .collect();
        let Some(first) = docs.first() else {
            return Ok(String::new());
        };

        let names = docs.iter().map(|d| d.name()).collect::<Vec<_>>().join(", ");
        let mut parts = vec![heading(level, &format!("{} {{ #{} }}", names, first.anchor()))];
        for doc in &docs[1..] {
            parts.push(format!("[]{{#{}}}", doc.anchor()));
        }

        if self.config.show_signature {
            let signatures = docs
                .iter()
                .map(|d| self.signature(d.obj(), DisplayName::from(d.info().signature_name)))
                .collect::<Vec<_>>();
            parts.push(signatures.join("\n\n"));
        }

        // sections with the same heading are merged in order of first appearance
        let mut merged: IndexMap<String, DocstringSection> = IndexMap::new();
        for doc in &docs {
            let Some(docstring) = doc.obj().docstring() else {
                continue;
            };
            for section in &docstring.parsed {
                let key = section.display_title().to_string();
                match merged.get_mut(&key) {
                    Some(existing) => merge_section(existing, section),
                    None => {
                        merged.insert(key, section.clone());
                    }
                }
            }
        }
        for section in merged.values() {
            parts.push(self.render_docstring_section(section, level));
        }

        Ok(join_parts(parts))
    }

    /// Signature and docstring of an object.
    pub fn render_object(&self, obj: &DocObject, display: DisplayName, level: usize) -> String {
        let mut parts = Vec::new();
        if self.config.show_signature {
            parts.push(self.signature(obj, display));
        }
        if let Some(docstring) = obj.docstring() {
            for section in &docstring.parsed {
                parts.push(self.render_docstring_section(section, level));
            }
        }
        join_parts(parts)
    }

    /// Inline-code signature of an object.
    pub fn signature(&self, obj: &DocObject, display: DisplayName) -> String {
        let name = display.of(obj);
        let Some(target) = obj.target() else {
            return escape(&name);
        };
        match target.kind {
            ObjectKind::Class | ObjectKind::Function => {
                let mut sig = format!("{}({})", name, self.render_parameters(&target.parameters));
                if self.config.show_signature_annotations {
                    if let Some(returns) = &target.returns {
                        sig.push_str(&format!(" -> {}", returns));
                    }
                }
                escape(&sig)
            }
            ObjectKind::Module | ObjectKind::Attribute => escape(&name),
        }
    }

    fn render_parameters(&self, params: &[Parameter]) -> String {
        let mut rendered: Vec<String> = params.iter().map(|p| self.render_parameter(p)).collect();

        // keyword-only parameters need a bare `*` unless `*args` already marks them
        let has_var_positional = params.iter().any(|p| p.kind == ParameterKind::VarPositional);
        if !has_var_positional {
            if let Some(i) = params.iter().position(|p| p.kind == ParameterKind::KeywordOnly) {
                rendered.insert(i, "*".to_string());
            }
        }
        rendered.join(", ")
    }

    fn render_parameter(&self, param: &Parameter) -> String {
        let glob = match param.kind {
            ParameterKind::VarKeyword => "**",
            ParameterKind::VarPositional => "*",
            _ => "",
        };
        let splat = !glob.is_empty();
        let default = param.default.as_deref().filter(|_| !splat);
        let annotation = param
            .annotation
            .as_deref()
            .filter(|_| self.config.show_signature_annotations);

        match (annotation, default) {
            (Some(ann), Some(default)) => format!("{}{}: {} = {}", glob, param.name, ann, default),
            (Some(ann), None) => format!("{}{}: {}", glob, param.name, ann),
            (None, Some(default)) => format!("{}{}={}", glob, param.name, default),
            (None, None) => format!("{}{}", glob, param.name),
        }
    }

    /// A type annotation as it appears in a table cell.
    pub fn render_annotation(&self, annotation: Option<&str>) -> String {
        match annotation {
            None => String::new(),
            Some(ann) if self.config.render_interlinks && DOTTED_NAME.is_match(ann) => {
                format!("[{}](`{}`)", ann, ann)
            }
            Some(ann) => sanitize(&html_escape::encode_text(ann)),
        }
    }

    fn render_docstring_section(&self, section: &DocstringSection, level: usize) -> String {
        let body = self.render_section_body(section);
        if section.kind == SectionKind::Text && section.title.is_none() {
            return body;
        }
        format!("{}\n\n{}", heading(level + 1, section.display_title()), body)
    }

    fn render_section_body(&self, section: &DocstringSection) -> String {
        match (&section.kind, &section.value) {
            (SectionKind::Parameters | SectionKind::OtherParameters, SectionValue::Elements(els)) => {
                let rows = els
                    .iter()
                    .map(|el| {
                        vec![
                            escape(&el.name),
                            self.render_annotation(el.annotation.as_deref()),
                            sanitize(&el.description),
                            el.default
                                .as_deref()
                                .map_or_else(|| "_required_".to_string(), escape),
                        ]
                    })
                    .collect::<Vec<_>>();
                markdown_table(&["Name", "Type", "Description", "Default"], &rows)
            }
            (SectionKind::Attributes, SectionValue::Elements(els)) => {
                let rows = els
                    .iter()
                    .map(|el| {
                        vec![
                            escape(&el.name),
                            self.render_annotation(el.annotation.as_deref()),
                            sanitize(&el.description),
                        ]
                    })
                    .collect::<Vec<_>>();
                markdown_table(&["Name", "Type", "Description"], &rows)
            }
            (_, SectionValue::Elements(els)) => self.render_typed_elements(els),
            (SectionKind::SeeAlso, SectionValue::Text(text)) => convert_rst_link_to_md(text),
            (_, SectionValue::Examples(parts)) => parts
                .iter()
                .map(|part| match part {
                    ExamplePart::Code(code) => format!("```python\n{}\n```", code),
                    ExamplePart::Text(text) => text.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            (_, SectionValue::Text(text)) => text.clone(),
        }
    }

    /// Returns, yields, raises and warns tables.
    fn render_typed_elements(&self, els: &[DocstringElement]) -> String {
        let named = els.iter().any(|el| !el.name.is_empty());
        let rows = els
            .iter()
            .map(|el| {
                let mut row = Vec::with_capacity(3);
                if named {
                    row.push(if el.name.is_empty() {
                        String::new()
                    } else {
                        escape(&el.name)
                    });
                }
                row.push(self.render_annotation(el.annotation.as_deref()));
                row.push(sanitize(&el.description));
                row
            })
            .collect::<Vec<_>>();
        if named {
            markdown_table(&["Name", "Type", "Description"], &rows)
        } else {
            markdown_table(&["Type", "Description"], &rows)
        }
    }

    fn summary_row(link: &str, description: &str) -> String {
        format!("| {} | {} |", link, sanitize(description))
    }

    /// First line of an object's leading text section.
    pub fn summarize_object(&self, obj: &DocObject) -> String {
        obj.docstring()
            .and_then(|d| d.parsed.first())
            .and_then(|section| match (&section.kind, &section.value) {
                (SectionKind::Text, SectionValue::Text(text)) => {
                    Some(text.lines().next().unwrap_or_default().to_string())
                }
                _ => None,
            })
            .unwrap_or_default()
    }

    fn summarize_doc(&self, doc: &Doc, page_path: Option<&str>, shorten: bool) -> String {
        let name = if shorten { doc.obj().name() } else { doc.name() };
        let link = match page_path {
            Some(path) => format!("[{}]({}{}#{})", name, path, PAGE_SUFFIX, doc.anchor()),
            None => format!("[{}](#{})", name, doc.anchor()),
        };
        Self::summary_row(&link, &self.summarize_object(doc.obj()))
    }

    fn summarize_in_page(&self, node: &Node, page: &Page, shorten: bool) -> Result<String> {
        match node {
            Node::Doc(doc) => Ok(self.summarize_doc(doc, Some(&page.path), shorten)),
            Node::Interlaced(interlaced) => Ok(interlaced
                .contents
                .iter()
                .filter_map(|n| n.as_doc())
                .map(|doc| self.summarize_doc(doc, Some(&page.path), shorten))
                .collect::<Vec<_>>()
                .join("\n")),
            other => self.summarize(other),
        }
    }

    fn summarize_section(&self, section: &Section) -> Result<String> {
        let head = match (&section.title, &section.subtitle) {
            (Some(title), _) => heading(2, title),
            (None, Some(subtitle)) => heading(3, subtitle),
            (None, None) => String::new(),
        };
        let mut top = vec![head];
        if let Some(desc) = &section.desc {
            top.push(desc.clone());
        }

        let mut rows = vec!["| | |\n| --- | --- |".to_string()];
        for child in &section.contents {
            rows.push(self.summarize(child)?);
        }
        Ok(format!("{}\n\n{}", join_parts(top), rows.join("\n")))
    }

    fn summarize_page(&self, page: &Page) -> Result<String> {
        if let Some(summary) = &page.summary {
            let link = format!("[{}]({}{})", summary.name, page.path, PAGE_SUFFIX);
            return Ok(Self::summary_row(&link, &summary.desc));
        }
        if page.contents.len() > 1 && !page.flatten {
            return Err(BuildError::Config(format!(
                "Cannot summarize Page `{}`. Either set its `summary` attribute with name \
                 and description details, or set `flatten` to True.",
                page.path
            )));
        }
        let rows = page
            .contents
            .iter()
            .map(|entry| self.summarize_in_page(entry, page, false))
            .collect::<Result<Vec<_>>>()?;
        Ok(rows.join("\n"))
    }
}

/// Append the entries of `other` to `into`.
fn merge_section(into: &mut DocstringSection, other: &DocstringSection) {
    match (&mut into.value, &other.value) {
        (SectionValue::Text(a), SectionValue::Text(b)) => {
            a.push_str("\n\n");
            a.push_str(b);
        }
        (SectionValue::Elements(a), SectionValue::Elements(b)) => a.extend(b.iter().cloned()),
        (SectionValue::Examples(a), SectionValue::Examples(b)) => a.extend(b.iter().cloned()),
        // mismatched shapes keep the first
        _ => {}
    }
}

impl Renderer for MdRenderer {
    fn render(&self, node: &Node) -> Result<String> {
        self.render_at(node, self.config.header_level)
    }

    fn summarize(&self, node: &Node) -> Result<String> {
        match node {
            Node::Layout(layout) => {
                let parts = layout
                    .sections
                    .iter()
                    .map(|s| self.summarize(s))
                    .collect::<Result<Vec<_>>>()?;
                Ok(parts.join("\n\n"))
            }
            Node::Section(section) => self.summarize_section(section),
            Node::Page(page) => self.summarize_page(page),
            Node::MemberPage(page) => match page.contents.first() {
                Some(entry) => self.summarize_in_page(entry, page, true),
                None => Ok(String::new()),
            },
            Node::Doc(doc) => Ok(self.summarize_doc(doc, None, false)),
            Node::Link(link) => Ok(Self::summary_row(
                &format!("[](`{}`)", link.name),
                &self.summarize_object(&link.obj),
            )),
            Node::Interlaced(interlaced) => Ok(interlaced
                .contents
                .iter()
                .filter_map(|n| n.as_doc())
                .map(|doc| self.summarize_doc(doc, None, false))
                .collect::<Vec<_>>()
                .join("\n")),
            Node::Auto(_) | Node::Text(_) => Err(BuildError::UnsupportedNode {
                operation: "summarize",
                kind: node.kind_name().to_string(),
            }),
        }
    }
}
