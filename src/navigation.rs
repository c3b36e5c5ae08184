//! Sidebar generation for the API reference.
//!
//! The sidebar is a Quarto `website.sidebar` document built from the
//! blueprinted layout: one entry for the index page, then one section per
//! titled layout section, with subtitled sections nested below the title
//! before them.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{BuildError, Result};
use crate::layout::Node;
use crate::renderer::PAGE_SUFFIX;

/// Placeholder in user sidebar contents replaced by the generated entries
pub const CONTENTS_SENTINEL: &str = "{{ contents }}";

/// One entry of a sidebar `contents` list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SidebarEntry {
    Link(String),
    Section {
        section: String,
        contents: Vec<SidebarEntry>,
    },
}

impl SidebarEntry {
    fn section(title: &str) -> Self {
        SidebarEntry::Section {
            section: title.to_string(),
            contents: Vec::new(),
        }
    }

    fn push(&mut self, entry: SidebarEntry) {
        if let SidebarEntry::Section { contents, .. } = self {
            contents.push(entry);
        }
    }

    fn extend(&mut self, entries: Vec<SidebarEntry>) {
        if let SidebarEntry::Section { contents, .. } = self {
            contents.extend(entries);
        }
    }
}

/// Builds the sidebar of one reference directory
#[derive(Debug, Clone)]
pub struct SidebarBuilder {
    dir: String,
}

impl SidebarBuilder {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }

    fn page_link(&self, path: &str) -> SidebarEntry {
        SidebarEntry::Link(format!("{}/{}{}", self.dir, path, PAGE_SUFFIX))
    }

    /// Entries generated from a blueprinted layout.
    pub fn contents(&self, layout: &Node) -> Result<Vec<SidebarEntry>> {
        let Node::Layout(layout) = layout else {
            return Err(BuildError::UnsupportedNode {
                operation: "sidebar",
                kind: layout.kind_name().to_string(),
            });
        };

        let mut contents = vec![self.page_link("index")];
        let mut current: Option<SidebarEntry> = None;

        for node in &layout.sections {
            // single-page layouts hold pages directly
            let (title, subtitle, children) = match node.as_ref() {
                Node::Section(section) => (
                    section.title.as_deref(),
                    section.subtitle.as_deref(),
                    &section.contents,
                ),
                Node::Page(page) => {
                    contents.push(self.page_link(&page.path));
                    continue;
                }
                other => {
                    return Err(BuildError::UnsupportedNode {
                        operation: "sidebar",
                        kind: other.kind_name().to_string(),
                    })
                }
            };

            let links: Vec<SidebarEntry> = children
                .iter()
                .filter_map(|child| child.as_page())
                .map(|page| self.page_link(&page.path))
                .collect();

            match (title, subtitle) {
                (Some(title), _) => {
                    contents.extend(current.take());
                    let mut entry = SidebarEntry::section(title);
                    entry.extend(links);
                    current = Some(entry);
                }
                (None, Some(subtitle)) => {
                    let mut sub = SidebarEntry::section(subtitle);
                    sub.extend(links);
                    match current.as_mut() {
                        Some(entry) => entry.push(sub),
                        // a subtitle before any title stands on its own
                        None => contents.push(sub),
                    }
                }
                (None, None) => contents.extend(links),
            }
        }
        contents.extend(current);
        Ok(contents)
    }

    /// The full sidebar document, merged with the user's sidebar options.
    pub fn build(&self, layout: &Node, options: &Mapping) -> Result<Value> {
        let generated = serde_yaml::to_value(self.contents(layout)?)?;
        let Value::Sequence(generated) = generated else {
            return Err(BuildError::Config("sidebar contents must be a list".to_string()));
        };

        let mut sidebar = options.clone();
        if !sidebar.contains_key("id") {
            sidebar.insert(Value::from("id"), Value::from(self.dir.as_str()));
        }

        match sidebar.get_mut("contents") {
            None => {
                sidebar.insert(Value::from("contents"), Value::Sequence(generated));
            }
            Some(Value::Sequence(existing)) => {
                let mut user = Value::Sequence(std::mem::take(existing));
                if !insert_contents(&mut user, &generated) {
                    if let Value::Sequence(items) = &mut user {
                        items.extend(generated);
                    }
                }
                sidebar.insert(Value::from("contents"), user);
            }
            Some(_) => {
                return Err(BuildError::Config(
                    "`sidebar.contents` must be a list".to_string(),
                ))
            }
        }

        let mut dummy = Mapping::new();
        dummy.insert(Value::from("id"), Value::from("dummy-sidebar"));

        let mut website = Mapping::new();
        website.insert(
            Value::from("sidebar"),
            Value::Sequence(vec![Value::Mapping(sidebar), Value::Mapping(dummy)]),
        );
        let mut root = Mapping::new();
        root.insert(Value::from("website"), Value::Mapping(website));
        Ok(Value::Mapping(root))
    }

    pub fn write(&self, layout: &Node, options: &Mapping, path: &Path) -> Result<()> {
        let doc = self.build(layout, options)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(&doc)?)?;
        Ok(())
    }
}

/// Replace the first sentinel found in `value` with `contents`.
fn insert_contents(value: &mut Value, contents: &[Value]) -> bool {
    match value {
        Value::Mapping(map) => map.values_mut().any(|v| insert_contents(v, contents)),
        Value::Sequence(items) => {
            for i in 0..items.len() {
                if items[i].as_str() == Some(CONTENTS_SENTINEL) {
                    items.splice(i..=i, contents.iter().cloned());
                    return true;
                }
                if insert_contents(&mut items[i], contents) {
                    return true;
                }
            }
            false
        }
        _ => false,
    }
}
