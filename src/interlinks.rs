//! Cross references into inventories.
//!
//! References use the Sphinx role syntax,
//! ``:external+<invname>:<domain>:<role>:`<target>` ``, where every part but
//! the target is optional and the optional parts are read right to left. A
//! leading `~` on the target shortens the link text to the last path
//! component.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use serde::Serialize;

use crate::config::InterlinksConfig;
use crate::error::{BuildError, Result};
use crate::inventory::{Inventory, InventoryItem};

lazy_static::lazy_static! {
    /// rst roles such as :func:`pkg.f` or :external+np:py:class:`~numpy.ndarray`
    static ref RST_ROLE: Regex = Regex::new(
        r"(?m)((:external(\+[a-zA-Z._]+))?(:[a-zA-Z._]+)?:[a-zA-Z._]+:`~?[a-zA-Z._]+`)"
    ).unwrap();

    /// `text <ref>` style references
    static ref RST_STYLE_REF: Regex =
        Regex::new(r"^(?P<text>.+?)<(?P<ref>[a-zA-Z.\-: _]+)>").unwrap();

    /// [text](ref) style links
    static ref MD_STYLE_LINK: Regex = Regex::new(r"^\[(?P<text>.*?)\]\((?P<ref>.*?)\)").unwrap();
}

/// Percent-encoded backtick, as pandoc writes it in link targets
const ENCODED_BACKTICK: &str = "%60";

/// A parsed reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ref {
    pub target: String,
    pub role: Option<String>,
    pub domain: Option<String>,
    pub invname: Option<String>,
    pub external: bool,
}

impl Ref {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn from_string(raw: &str) -> Result<Self> {
        if !(raw.starts_with(':') || raw.starts_with('`')) {
            return Err(BuildError::RefSyntax(format!(
                "Ref must start with \":\" or \"`\".\nReceived ref string: {}",
                raw
            )));
        }
        if !raw.ends_with('`') || raw.len() < 2 {
            return Err(BuildError::RefSyntax(format!(
                "Ref must end with \"`\"\nReceived ref string: {}",
                raw
            )));
        }

        let body = &raw[..raw.len() - 1];
        let Some((params, target)) = body.rsplit_once('`') else {
            return Err(BuildError::RefSyntax(format!(
                "Ref target must be wrapped in backticks.\nReceived ref string: {}",
                raw
            )));
        };

        let mut parsed = Ref::new(target);
        if params.is_empty() {
            return Ok(parsed);
        }

        let mut parts: Vec<&str> = params.trim_matches(':').split(':').collect();
        if raw.starts_with(":external") {
            let external = parts.remove(0);
            parsed.external = true;
            parsed.invname = external.rsplit_once('+').map(|(_, name)| name.to_string());
        }

        let mut from_right = parts.into_iter().rev().filter(|p| !p.is_empty());
        parsed.role = from_right.next().map(str::to_string);
        parsed.domain = from_right.next().map(str::to_string);
        Ok(parsed)
    }

    /// Target without the `~` shortening marker.
    pub fn name(&self) -> &str {
        self.target.trim_start_matches('~')
    }

    pub fn is_shortened(&self) -> bool {
        self.target.starts_with('~')
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.external {
            f.write_str(":external")?;
            if let Some(inv) = &self.invname {
                write!(f, "+{}", inv)?;
            }
        }
        if let Some(domain) = &self.domain {
            write!(f, ":{}", domain)?;
        }
        if let Some(role) = &self.role {
            write!(f, ":{}:", role)?;
        }
        write!(f, "`{}`", self.target)
    }
}

/// Short role names mapped to the roles inventories record.
pub fn normalize_role(role: &str) -> &str {
    match role {
        "func" => "function",
        other => other,
    }
}

/// An inventory entry together with the inventory it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedItem {
    pub inv_name: String,
    pub inv_url: String,
    pub item: InventoryItem,
}

impl EnhancedItem {
    pub fn full_uri(&self) -> String {
        format!("{}{}", self.inv_url, self.item.uri.replace('$', &self.item.name))
    }

    /// An entry pointing straight at `full_url`.
    pub fn simple(inv_name: &str, full_url: &str, name: &str, role: &str) -> Self {
        Self {
            inv_name: inv_name.to_string(),
            inv_url: String::new(),
            item: InventoryItem {
                name: name.to_string(),
                domain: "py".to_string(),
                role: role.to_string(),
                priority: "1".to_string(),
                uri: full_url.to_string(),
                dispname: "-".to_string(),
            },
        }
    }

    fn matches(&self, reference: &Ref) -> bool {
        self.item.name == reference.name()
            && reference
                .role
                .as_deref()
                .map_or(true, |role| self.item.role == normalize_role(role))
            && reference
                .domain
                .as_deref()
                .map_or(true, |domain| self.item.domain == domain)
            && reference
                .invname
                .as_deref()
                .map_or(true, |inv| self.inv_name == inv)
    }
}

impl fmt::Display for EnhancedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{} in `{}`)",
            self.item.name, self.item.domain, self.item.role, self.inv_name
        )
    }
}

/// What a pandoc link becomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Element {
    Link { content: String, url: String },
    Code { content: String },
    Unchanged { content: String },
}

/// Every loaded inventory, keyed by inventory name
#[derive(Debug, Clone, Default)]
pub struct Inventories {
    registry: IndexMap<String, Vec<EnhancedItem>>,
}

impl Inventories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<EnhancedItem>) -> Self {
        let mut invs = Self::new();
        for item in items {
            invs.registry.entry(item.inv_name.clone()).or_default().push(item);
        }
        invs
    }

    /// Load the site inventory and each cached source inventory.
    pub fn from_config(config: &InterlinksConfig, root_dir: &Path) -> Result<Self> {
        let mut invs = Self::new();

        let site = Inventory::read_json(&root_dir.join(&config.site_inv))?;
        invs.load_inventory(&site, "/", "");

        for (name, source) in &config.sources {
            if source.is_local() {
                continue;
            }
            let path = config.cache_path(root_dir, name);
            let inv = Inventory::read_json(&path).map_err(|e| {
                BuildError::InvLookup(format!(
                    "Could not read inventory `{}` from {}: {}. Run the interlinks command first.",
                    name,
                    path.display(),
                    e
                ))
            })?;
            invs.load_inventory(&inv, &source.url, name);
        }
        Ok(invs)
    }

    pub fn load_inventory(&mut self, inventory: &Inventory, url: &str, invname: &str) {
        let items = inventory
            .items()
            .iter()
            .map(|item| EnhancedItem {
                inv_name: invname.to_string(),
                inv_url: url.to_string(),
                item: item.clone(),
            })
            .collect::<Vec<_>>();
        debug!("Loaded {} entries into inventory `{}`", items.len(), invname);
        self.registry.insert(invname.to_string(), items);
    }

    pub fn items(&self) -> impl Iterator<Item = &EnhancedItem> {
        self.registry.values().flatten()
    }

    /// The single entry a reference points to.
    pub fn lookup_reference(&self, reference: &Ref) -> Result<&EnhancedItem> {
        let results: Vec<&EnhancedItem> = self.items().filter(|i| i.matches(reference)).collect();
        match results.as_slice() {
            [] => Err(BuildError::InvLookup(format!(
                "Cross reference not found in an inventory file: `{}`",
                reference
            ))),
            [only] => Ok(only),
            [first, second, ..] => Err(BuildError::InvLookup(format!(
                "Cross reference matches multiple entries.\nMatching entries: {}\n\
                 Reference: {}\nTop 2 matches: \n  * {}\n  * {}",
                results.len(),
                reference,
                first,
                second
            ))),
        }
    }

    /// A link for `reference`, showing `text` when given.
    pub fn ref_to_anchor(&self, reference: &str, text: Option<&str>) -> Result<Element> {
        let reference = Ref::from_string(reference)?;
        let entry = self.lookup_reference(&reference)?;
        let url = entry.full_uri();

        let content = match text.filter(|t| !t.is_empty()) {
            Some(text) => text.to_string(),
            None => {
                let name = entry.item.display_name();
                if reference.is_shortened() {
                    name.rsplit('.').next().unwrap_or(name).to_string()
                } else {
                    name.to_string()
                }
            }
        };
        Ok(Element::Link { content, url })
    }

    /// Resolve a link target the way a pandoc filter sees it.
    ///
    /// Targets that are not references pass through unchanged. Failed
    /// lookups are logged and become inline code; syntax errors propagate.
    pub fn pandoc_ref_to_anchor(&self, reference: &str, text: Option<&str>) -> Result<Element> {
        if !(reference.starts_with(ENCODED_BACKTICK) || reference.starts_with(':')) {
            return Ok(Element::Unchanged {
                content: reference.to_string(),
            });
        }

        let decoded = reference.replace(ENCODED_BACKTICK, "`");
        match self.ref_to_anchor(&decoded, text) {
            Err(BuildError::InvLookup(msg)) => {
                warn!("InvLookupError: {}", msg);
                let content = match text.filter(|t| !t.is_empty()) {
                    Some(text) => text.to_string(),
                    None => decoded,
                };
                Ok(Element::Code { content })
            }
            other => other,
        }
    }
}

/// Split `text <ref>` into the reference and the text.
///
/// Returns the input as text with no reference when it has no `<ref>` part.
pub fn parse_rst_style_ref(full_text: &str) -> (Option<String>, String) {
    match RST_STYLE_REF.captures(full_text) {
        Some(caps) => (Some(caps["ref"].to_string()), caps["text"].to_string()),
        None => (None, full_text.to_string()),
    }
}

/// Split `[text](ref)` into the reference and the text.
pub fn parse_md_style_link(full_text: &str) -> Result<(String, String)> {
    let caps = MD_STYLE_LINK.captures(full_text).ok_or_else(|| {
        BuildError::RefSyntax(format!("Expected a markdown link, received: {}", full_text))
    })?;
    Ok((caps["ref"].to_string(), caps["text"].to_string()))
}

/// Turn rst roles in free text into empty-text markdown links.
///
/// The interlinks filter fills in the link text when the site renders.
pub fn convert_rst_link_to_md(rst: &str) -> String {
    RST_ROLE.replace_all(rst, "[]($1)").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(inv: &str, url: &str, name: &str, role: &str, uri: &str, dispname: &str) -> EnhancedItem {
        EnhancedItem {
            inv_name: inv.to_string(),
            inv_url: url.to_string(),
            item: InventoryItem {
                name: name.to_string(),
                domain: "py".to_string(),
                role: role.to_string(),
                priority: "1".to_string(),
                uri: uri.to_string(),
                dispname: dispname.to_string(),
            },
        }
    }

    fn invs() -> Inventories {
        Inventories::from_items(vec![
            item("", "/", "pkg.a_func", "function", "reference/a_func.html#$", "-"),
            item("", "/", "pkg.AClass", "class", "reference/AClass.html", "-"),
            item("other", "https://x.org/", "pkg.a_func", "function", "api/$.html", "-"),
            item("other", "https://x.org/", "other.Thing", "class", "api/thing.html", "Thing!"),
        ])
    }

    #[test]
    fn test_ref_from_string() {
        assert_eq!(Ref::from_string("`print`").unwrap(), Ref::new("print"));
        assert_eq!(
            Ref::from_string(":function:`print`").unwrap(),
            Ref {
                role: Some("function".into()),
                ..Ref::new("print")
            }
        );
        assert_eq!(
            Ref::from_string(":py:function:`print`").unwrap(),
            Ref {
                role: Some("function".into()),
                domain: Some("py".into()),
                ..Ref::new("print")
            }
        );
        assert_eq!(
            Ref::from_string(":external:function:`print`").unwrap(),
            Ref {
                role: Some("function".into()),
                external: true,
                ..Ref::new("print")
            }
        );
        assert_eq!(
            Ref::from_string(":external+abc:`print`").unwrap(),
            Ref {
                invname: Some("abc".into()),
                external: true,
                ..Ref::new("print")
            }
        );
    }

    #[test]
    fn test_ref_syntax_errors() {
        assert!(matches!(Ref::from_string("print"), Err(BuildError::RefSyntax(_))));
        assert!(matches!(Ref::from_string("`print"), Err(BuildError::RefSyntax(_))));
        assert!(matches!(Ref::from_string(":func:print`"), Err(BuildError::RefSyntax(_))));
    }

    #[test]
    fn test_lookup_filters_by_inventory() {
        let invs = invs();

        let err = invs.lookup_reference(&Ref::new("pkg.a_func")).unwrap_err();
        assert!(err.to_string().contains("multiple entries"));

        let found = invs
            .lookup_reference(&Ref::from_string(":external+other:`pkg.a_func`").unwrap())
            .unwrap();
        assert_eq!(found.full_uri(), "https://x.org/api/pkg.a_func.html");

        let err = invs.lookup_reference(&Ref::new("pkg.nope")).unwrap_err();
        assert!(matches!(err, BuildError::InvLookup(_)));
    }

    #[test]
    fn test_role_normalized() {
        let invs = Inventories::from_items(vec![item(
            "",
            "/",
            "pkg.f",
            "function",
            "f.html",
            "-",
        )]);
        assert!(invs
            .lookup_reference(&Ref::from_string(":func:`pkg.f`").unwrap())
            .is_ok());
        assert!(invs
            .lookup_reference(&Ref::from_string(":class:`pkg.f`").unwrap())
            .is_err());
    }

    #[test]
    fn test_ref_to_anchor_text() {
        let invs = invs();
        assert_eq!(
            invs.ref_to_anchor("`~pkg.AClass`", None).unwrap(),
            Element::Link {
                content: "AClass".into(),
                url: "/reference/AClass.html".into()
            }
        );
        assert_eq!(
            invs.ref_to_anchor("`pkg.AClass`", Some("the class")).unwrap(),
            Element::Link {
                content: "the class".into(),
                url: "/reference/AClass.html".into()
            }
        );
        assert_eq!(
            invs.ref_to_anchor("`other.Thing`", None).unwrap(),
            Element::Link {
                content: "Thing!".into(),
                url: "https://x.org/api/thing.html".into()
            }
        );
    }

    #[test]
    fn test_pandoc_ref_to_anchor() {
        let invs = invs();

        assert_eq!(
            invs.pandoc_ref_to_anchor("https://example.org", Some("x")).unwrap(),
            Element::Unchanged {
                content: "https://example.org".into()
            }
        );
        assert_eq!(
            invs.pandoc_ref_to_anchor("%60pkg.missing%60", None).unwrap(),
            Element::Code {
                content: "`pkg.missing`".into()
            }
        );
        assert!(matches!(
            invs.pandoc_ref_to_anchor("%60pkg.AClass", None),
            Err(BuildError::RefSyntax(_))
        ));
        assert!(matches!(
            invs.pandoc_ref_to_anchor("%60pkg.AClass%60", None).unwrap(),
            Element::Link { .. }
        ));
    }

    #[test]
    fn test_link_helpers() {
        assert_eq!(
            parse_md_style_link("[the text](`a.b`)").unwrap(),
            ("`a.b`".to_string(), "the text".to_string())
        );
        assert_eq!(
            parse_rst_style_ref("some text <a.b>"),
            (Some("a.b".to_string()), "some text ".to_string())
        );
        assert_eq!(parse_rst_style_ref("plain"), (None, "plain".to_string()));

        assert_eq!(
            convert_rst_link_to_md("See :func:`pkg.f` and :external+np:py:class:`~np.ndarray`."),
            "See [](:func:`pkg.f`) and [](:external+np:py:class:`~np.ndarray`)."
        );
    }
}
