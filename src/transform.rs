//! Generic layout tree transformation.
//!
//! `visit` is the single entry point. It calls the transformer's `enter` hook,
//! whose default walks the node's child sequence, then `exit` on the result.
//! Transformers override the hooks and dispatch on the node kind.
//!
//! The ancestry chain is an explicit linked list living on the call stack:
//! each `visit` pushes a frame that disappears when the call returns, on
//! success and on error alike. Child sequences get a frame of their own, so
//! for a top-level section the chain reads `Section -> "sections" -> Layout`.

use std::sync::Arc;

use crate::error::Result;
use crate::layout::{AutoOptions, Node};

/// One level of the ancestry chain
#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    Root,
    Node(&'a Node),
    /// A child sequence field, e.g. `contents`
    Seq(&'static str),
}

impl<'a> Frame<'a> {
    pub fn node(&self) -> Option<&'a Node> {
        match self {
            Frame::Node(node) => Some(node),
            _ => None,
        }
    }
}

/// The chain of frames from the current node up to the root
#[derive(Debug, Clone, Copy)]
pub struct Ancestry<'a> {
    frame: Frame<'a>,
    parent: Option<&'a Ancestry<'a>>,
    depth: usize,
}

impl Ancestry<'static> {
    pub fn root() -> Self {
        Ancestry {
            frame: Frame::Root,
            parent: None,
            depth: 0,
        }
    }
}

impl<'a> Ancestry<'a> {
    pub fn push<'b>(&'b self, frame: Frame<'b>) -> Ancestry<'b> {
        Ancestry {
            frame,
            parent: Some(self),
            depth: self.depth + 1,
        }
    }

    pub fn frame(&self) -> Frame<'a> {
        self.frame
    }

    pub fn parent(&self) -> Option<&'a Ancestry<'a>> {
        self.parent
    }

    /// Frame `n` levels up; `ancestor(0)` is the current frame.
    pub fn ancestor(&self, n: usize) -> Option<Frame<'a>> {
        let mut current = Some(self);
        for _ in 0..n {
            current = current.and_then(|c| c.parent);
        }
        current.map(|c| c.frame)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Frames from the current one up to the root.
    pub fn frames(&self) -> impl Iterator<Item = Frame<'a>> + '_ {
        let mut current = Some(self);
        std::iter::from_fn(move || {
            let this = current?;
            current = this.parent;
            Some(this.frame)
        })
    }

    /// Node frames from the nearest up to the root.
    pub fn nodes(&self) -> impl Iterator<Item = &'a Node> + '_ {
        self.frames().filter_map(|frame| frame.node())
    }

    /// The package in effect, taken from the nearest `package` field.
    pub fn package(&self) -> Option<&'a str> {
        self.nodes()
            .find_map(|node| node.package().and_then(|p| p.resolve()))
            .flatten()
    }

    /// Ancestor `options` bags merged, nearer ones taking precedence.
    pub fn options(&self) -> AutoOptions {
        let bags: Vec<&AutoOptions> = self.nodes().filter_map(|node| node.options()).collect();
        bags.iter()
            .rev()
            .fold(AutoOptions::default(), |acc, bag| bag.merge(&acc))
    }

    /// Whether the current node sits directly in the root layout's sections.
    pub fn is_top_level_section(&self) -> bool {
        matches!(self.ancestor(1), Some(Frame::Seq("sections")))
            && matches!(self.ancestor(2), Some(Frame::Node(Node::Layout(_))))
    }

    /// Nearest enclosing page, including the current node.
    pub fn page(&self) -> Option<&'a Node> {
        self.nodes().find(|node| node.is_page())
    }
}

/// Hooks run around the structural walk
pub trait Transformer {
    /// Runs before the children are visited; the default visits them.
    fn enter(&mut self, node: &Arc<Node>, ctx: &Ancestry<'_>) -> Result<Arc<Node>> {
        walk_children(self, node, ctx)
    }

    /// Runs on the result of `enter`.
    fn exit(&mut self, node: Arc<Node>, _ctx: &Ancestry<'_>) -> Result<Arc<Node>> {
        Ok(node)
    }
}

/// Visit `node` below `parent`.
pub fn visit<T: Transformer + ?Sized>(
    transformer: &mut T,
    node: &Arc<Node>,
    parent: &Ancestry<'_>,
) -> Result<Arc<Node>> {
    let ctx = parent.push(Frame::Node(node.as_ref()));
    let entered = transformer.enter(node, &ctx)?;
    transformer.exit(entered, &ctx)
}

/// Visit every child in order, rebuilding `node` only if one changed.
pub fn walk_children<T: Transformer + ?Sized>(
    transformer: &mut T,
    node: &Arc<Node>,
    ctx: &Ancestry<'_>,
) -> Result<Arc<Node>> {
    let Some((field, children)) = node.children() else {
        return Ok(node.clone());
    };

    let seq = ctx.push(Frame::Seq(field));
    let mut changed = false;
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let new = visit(transformer, child, &seq)?;
        changed |= !Arc::ptr_eq(&new, child);
        out.push(new);
    }

    if changed {
        Ok(Arc::new(node.with_children(out)))
    } else {
        Ok(node.clone())
    }
}

/// Run a transformer over a whole tree.
pub fn transform<T: Transformer + ?Sized>(transformer: &mut T, node: &Arc<Node>) -> Result<Arc<Node>> {
    visit(transformer, node, &Ancestry::root())
}

struct KindExtractor<'k> {
    kind: &'k str,
    found: Vec<Arc<Node>>,
}

impl Transformer for KindExtractor<'_> {
    fn enter(&mut self, node: &Arc<Node>, ctx: &Ancestry<'_>) -> Result<Arc<Node>> {
        if node.kind_name() == self.kind {
            self.found.push(node.clone());
        }
        walk_children(self, node, ctx)
    }
}

/// Every node of the given kind, in traversal order.
pub fn extract_kind(node: &Arc<Node>, kind: &str) -> Vec<Arc<Node>> {
    let mut extractor = KindExtractor {
        kind,
        found: Vec::new(),
    };
    // the extractor never fails
    let _ = transform(&mut extractor, node);
    extractor.found
}
