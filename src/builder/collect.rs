//! Collect pages and inventory items from a blueprinted layout.

use std::sync::Arc;

use crate::error::{BuildError, Result};
use crate::layout::{Item, Node};
use crate::transform::{transform, Ancestry, Transformer};

/// Gathers pages (post-order) and items (traversal order)
pub struct CollectTransformer {
    base_dir: String,
    pub pages: Vec<Arc<Node>>,
    pub items: Vec<Item>,
}

impl CollectTransformer {
    pub fn new(base_dir: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            pages: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl Transformer for CollectTransformer {
    fn exit(&mut self, node: Arc<Node>, ctx: &Ancestry<'_>) -> Result<Arc<Node>> {
        match node.as_ref() {
            Node::Doc(doc) => {
                let page = ctx
                    .page()
                    .and_then(|n| n.as_page())
                    .ok_or_else(|| BuildError::NoPageDetected(doc.name().to_string()))?;

                let uri = format!("{}/{}.html#{}", self.base_dir, page.path, doc.anchor());
                let obj = doc.obj();
                let display = obj.path();
                let canonical = obj.canonical_path();

                self.items.push(Item {
                    name: display.to_string(),
                    obj: obj.clone(),
                    uri: uri.clone(),
                    dispname: None,
                });
                if canonical != display {
                    self.items.push(Item {
                        name: canonical.to_string(),
                        obj: obj.clone(),
                        uri,
                        dispname: Some(display.to_string()),
                    });
                }
            }
            Node::Page(_) | Node::MemberPage(_) => self.pages.push(node.clone()),
            _ => {}
        }
        Ok(node)
    }
}

/// Pages and items of a blueprinted tree.
pub fn collect(node: &Arc<Node>, base_dir: &str) -> Result<(Vec<Arc<Node>>, Vec<Item>)> {
    let mut collector = CollectTransformer::new(base_dir);
    transform(&mut collector, node)?;
    Ok((collector.pages, collector.items))
}
