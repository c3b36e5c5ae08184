//! Blueprinting: replace every `Auto` entry with a resolved `Doc`.
//!
//! Members of classes and modules are selected by the member-fetch policy
//! and resolved recursively, then placed according to the `children`
//! option. Top-level sections are normalized so that every entry is a page.

use std::sync::Arc;

use log::{debug, info};

use crate::error::{BuildError, Result};
use crate::layout::{
    Auto, AutoOptions, ChildrenPolicy, Doc, Layout, Link, MemberOrder, Node, PackageOverride, Page,
    Section,
};
use crate::objects::{root_module, DocObject, Dynamic, ObjectKind, ObjectLoader};
use crate::transform::{transform, visit, walk_children, Ancestry, Frame, Transformer};

/// Lookup path for `name` relative to `package`.
///
/// `:` separates the module from the member path; once either side has
/// one, the two are joined with a dot.
pub fn object_path(package: Option<&str>, name: &str) -> String {
    match package {
        None => name.to_string(),
        Some(pkg) if pkg.contains(':') || name.contains(':') => format!("{}.{}", pkg, name),
        Some(pkg) => format!("{}:{}", pkg, name),
    }
}

pub struct BlueprintTransformer<'l> {
    loader: &'l dyn ObjectLoader,
    /// Loading mode for entries that do not set `dynamic`
    dynamic: Dynamic,
}

impl<'l> BlueprintTransformer<'l> {
    pub fn new(loader: &'l dyn ObjectLoader) -> Self {
        Self {
            loader,
            dynamic: Dynamic::Static,
        }
    }

    pub fn with_dynamic(mut self, dynamic: Dynamic) -> Self {
        self.dynamic = dynamic;
        self
    }

    fn enter_auto(&mut self, auto: &Auto, ctx: &Ancestry<'_>) -> Result<Arc<Node>> {
        let path = object_path(ctx.package(), &auto.name);
        let options = auto.options.merge(&ctx.options());
        let dynamic = options.dynamic.clone().unwrap_or_else(|| self.dynamic.clone());

        debug!("Getting object for {}", path);
        let obj = self.loader.resolve(&path, &dynamic)?;
        let member_names = self.fetch_members(&options, &obj)?;

        let mut member_options = options
            .member_options
            .as_deref()
            .cloned()
            .unwrap_or_default();
        // a target applies to this entry only; members load from the target itself
        let (member_base, member_dynamic) = match &dynamic {
            Dynamic::Target(target) => (target.clone(), Dynamic::Static),
            other => (path.clone(), other.clone()),
        };
        member_options.dynamic = match member_options.dynamic {
            Some(Dynamic::Target(_)) | None => Some(member_dynamic.clone()),
            explicit => explicit,
        };
        member_options.package = PackageOverride::Set(member_base.clone());

        let policy = options.children();
        let seq = ctx.push(Frame::Seq("members"));
        let mut members = Vec::with_capacity(member_names.len());
        for name in member_names {
            let member_obj =
                self.loader.resolve(&object_path(Some(&member_base), &name), &member_dynamic)?;
            // submodules are documented on their own, never nested
            if member_obj.is_kind(ObjectKind::Module) {
                continue;
            }

            let member = Arc::new(Node::Auto(Auto::with_options(name, member_options.clone())));
            let resolved = visit(self, &member, &seq)?;
            let Node::Doc(doc) = resolved.as_ref() else {
                return Err(BuildError::UnsupportedNode {
                    operation: "blueprint member placement",
                    kind: resolved.kind_name().to_string(),
                });
            };

            let placed = match policy {
                ChildrenPolicy::Separate => Arc::new(Node::MemberPage(Page::new(
                    doc.obj().path(),
                    vec![resolved.clone()],
                ))),
                ChildrenPolicy::Embedded | ChildrenPolicy::Flat => resolved.clone(),
                ChildrenPolicy::Linked => Arc::new(Node::Link(Link {
                    name: doc.obj().path().to_string(),
                    obj: doc.obj().clone(),
                })),
            };
            members.push(placed);
        }

        let doc = Doc::from_object(
            auto.name.clone(),
            obj,
            members,
            policy == ChildrenPolicy::Flat,
            None,
            options.signature_name(),
        )?;
        Ok(Arc::new(Node::Doc(doc)))
    }

    /// Names of the members to document, in output order.
    fn fetch_members(&self, options: &AutoOptions, obj: &DocObject) -> Result<Vec<String>> {
        if let Some(members) = &options.members {
            return Ok(members.clone());
        }
        if options.include.is_some() {
            return Err(BuildError::NotImplemented(
                "include argument currently unsupported.".to_string(),
            ));
        }

        let mut candidates = if options.include_inherited() {
            self.loader.all_members(obj)?
        } else {
            self.loader.members(obj)?
        };

        let is_module = obj.is_kind(ObjectKind::Module);
        let is_class = obj.is_kind(ObjectKind::Class);

        if let Some(target) = obj.target().filter(|t| t.is_module() && t.exports.is_some()) {
            candidates.retain(|name, _| target.exports_name(name));
        }
        if !options.include_private() {
            candidates.retain(|name, _| !name.starts_with('_'));
        }
        if is_module && !options.include_imports() {
            candidates.retain(|_, member| !member.is_alias());
        }
        if is_class && !options.include_inherited() {
            let class_path = obj.canonical_path();
            candidates.retain(|_, member| {
                !member.is_alias() || member.parent_path() == Some(class_path)
            });
        }
        if !options.include_empty() {
            candidates.retain(|_, member| {
                member
                    .docstring()
                    .is_some_and(|doc| !doc.value.trim().is_empty())
            });
        }
        if !options.include_attributes() {
            candidates.retain(|_, member| !member.is_kind(ObjectKind::Attribute));
        }
        if !options.include_classes() {
            candidates.retain(|_, member| !member.is_kind(ObjectKind::Class));
        }
        if !options.include_functions() {
            candidates.retain(|_, member| !member.is_kind(ObjectKind::Function));
        }
        if let Some(exclude) = &options.exclude {
            candidates.retain(|name, _| !exclude.contains(name));
        }

        let mut names: Vec<String> = candidates.into_keys().collect();
        if options.member_order() == MemberOrder::Alphabetical {
            names.sort();
        }
        Ok(names)
    }

    /// One section listing the package's public members.
    fn auto_package_section(&self, ctx: &Ancestry<'_>) -> Result<Section> {
        let package = ctx.package().ok_or_else(|| {
            BuildError::Config(
                "No sections were given and no package is set to derive them from".to_string(),
            )
        })?;
        let dynamic = ctx.options().dynamic.unwrap_or_else(|| self.dynamic.clone());
        let obj = self.loader.resolve(package, &dynamic)?;
        let root = root_module(package);

        let mut contents = Vec::new();
        for (name, member) in self.loader.members(&obj)? {
            if name.starts_with('_') {
                continue;
            }
            if member.is_alias() && member.canonical_root() != root {
                continue;
            }
            if member.is_kind(ObjectKind::Module) {
                continue;
            }
            if let Some(target) = obj.target().filter(|t| t.exports.is_some()) {
                if !target.exports_name(&name) {
                    continue;
                }
            }
            contents.push(Arc::new(Node::Auto(Auto::new(name))));
        }

        let section = Section {
            title: Some(package.to_string()),
            desc: Some(obj.docstring().map(|d| d.first_paragraph()).unwrap_or_default()),
            contents,
            ..Default::default()
        };

        match serde_yaml::to_string(&vec![Node::Section(section.clone())]) {
            Ok(yaml) => info!("Autogenerated contents (since no section specified):\n{}", yaml),
            Err(e) => debug!("Could not render generated sections: {}", e),
        }
        Ok(section)
    }

    /// Wrap every non-page entry of a top-level section in its own page.
    fn normalize_section(&self, node: Arc<Node>, section: &Section) -> Result<Arc<Node>> {
        if section.contents.iter().all(|el| el.is_page()) {
            return Ok(node);
        }

        let contents = section
            .contents
            .iter()
            .map(|el| {
                if el.is_page() {
                    return Ok(el.clone());
                }
                let name = el.name().ok_or_else(|| {
                    BuildError::Config(format!(
                        "A {} entry cannot be placed directly in section `{}`; put it inside a page",
                        el.kind_name(),
                        section.heading().unwrap_or_default()
                    ))
                })?;
                Ok(Arc::new(Node::Page(Page::new(name, vec![el.clone()]))))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Arc::new(Node::Section(Section {
            contents,
            ..section.clone()
        })))
    }
}

impl Transformer for BlueprintTransformer<'_> {
    fn enter(&mut self, node: &Arc<Node>, ctx: &Ancestry<'_>) -> Result<Arc<Node>> {
        match node.as_ref() {
            Node::Auto(auto) => self.enter_auto(auto, ctx),
            Node::Layout(layout) if layout.sections.is_empty() => {
                let section = self.auto_package_section(ctx)?;
                let expanded = Arc::new(Node::Layout(Layout {
                    sections: vec![Arc::new(Node::Section(section))],
                    ..layout.clone()
                }));
                walk_children(self, &expanded, ctx)
            }
            _ => walk_children(self, node, ctx),
        }
    }

    fn exit(&mut self, node: Arc<Node>, ctx: &Ancestry<'_>) -> Result<Arc<Node>> {
        match node.as_ref() {
            Node::Section(section) if ctx.is_top_level_section() => {
                let section = section.clone();
                self.normalize_section(node, &section)
            }
            Node::Interlaced(interlaced) => {
                interlaced.validate_docs()?;
                Ok(node)
            }
            _ => Ok(node),
        }
    }
}

/// Resolve every `Auto` entry in `layout`.
pub fn blueprint(layout: &Arc<Node>, loader: &dyn ObjectLoader, dynamic: Dynamic) -> Result<Arc<Node>> {
    let mut transformer = BlueprintTransformer::new(loader).with_dynamic(dynamic);
    transform(&mut transformer, layout)
}

struct PagePackageStripper<'p> {
    package: &'p str,
}

impl Transformer for PagePackageStripper<'_> {
    fn exit(&mut self, node: Arc<Node>, _ctx: &Ancestry<'_>) -> Result<Arc<Node>> {
        if let Node::Page(page) = node.as_ref() {
            if let Some((first, rest)) = page.path.split_once('.') {
                if first == self.package {
                    return Ok(Arc::new(Node::Page(Page {
                        path: rest.to_string(),
                        ..page.clone()
                    })));
                }
            }
        }
        Ok(node)
    }
}

/// Remove the leading package name from page paths.
pub fn strip_package_name(node: &Arc<Node>, package: &str) -> Result<Arc<Node>> {
    transform(&mut PagePackageStripper { package }, node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{MemorySource, ModulesCollection};
    use crate::transform::extract_kind;
    use serde_json::json;

    const PKG: &str = r#"{
        "name": "pkg",
        "kind": "module",
        "docstring": "A package for tests.\n\nMore text.",
        "members": {
            "a_func": {"kind": "function", "docstring": "A function."},
            "b_func": {"kind": "function"},
            "_private": {"kind": "function", "docstring": "Hidden."},
            "sub": {"kind": "module", "members": {}},
            "AClass": {
                "kind": "class",
                "docstring": "A class.",
                "members": {
                    "z_method": {"kind": "function", "docstring": "Z."},
                    "a_method": {"kind": "function", "docstring": "A."},
                    "an_attr": {"kind": "attribute", "docstring": "Attr."},
                    "Zeta": {"kind": "function", "docstring": "Capitalized."}
                }
            },
            "imported": {"kind": "alias", "target_path": "other.thing"}
        }
    }"#;

    fn loader() -> ModulesCollection {
        ModulesCollection::new(MemorySource::new().with_json(PKG).unwrap())
    }

    fn layout(sections: serde_json::Value) -> Arc<Node> {
        let sections = sections.as_array().cloned().unwrap();
        Layout::parse(&sections, PackageOverride::set("pkg"), None)
            .unwrap()
            .into_node()
    }

    fn fetch(options: AutoOptions, path: &str) -> Result<Vec<String>> {
        let loader = loader();
        let obj = loader.resolve(path, &Dynamic::Static)?;
        BlueprintTransformer::new(&loader).fetch_members(&options, &obj)
    }

    #[test]
    fn test_object_path() {
        assert_eq!(object_path(None, "pkg.a"), "pkg.a");
        assert_eq!(object_path(Some("pkg"), "a"), "pkg:a");
        assert_eq!(object_path(Some("pkg"), "sub:a"), "pkg.sub:a");
        assert_eq!(object_path(Some("pkg:AClass"), "m"), "pkg:AClass.m");
    }

    #[test]
    fn test_lookup_error_names_path() {
        let loader = loader();
        let tree = layout(json!([{"title": "x", "contents": ["bbb.ccc"]}]));
        let err = blueprint(&tree, &loader, Dynamic::Static).unwrap_err();
        assert!(err
            .to_string()
            .contains("Does an object with the path pkg:bbb.ccc exist?"));
    }

    #[test]
    fn test_module_members_default_filters() {
        let names = fetch(AutoOptions::default(), "pkg").unwrap();
        // private, undocumented, alias and submodule members dropped
        assert_eq!(names, vec!["AClass", "a_func"]);
    }

    #[test]
    fn test_member_order() {
        let source = AutoOptions {
            member_order: Some(MemberOrder::Source),
            ..Default::default()
        };
        assert_eq!(
            fetch(source, "pkg:AClass").unwrap(),
            vec!["z_method", "a_method", "an_attr", "Zeta"]
        );
        // uppercase sorts before lowercase
        assert_eq!(
            fetch(AutoOptions::default(), "pkg:AClass").unwrap(),
            vec!["Zeta", "a_method", "an_attr", "z_method"]
        );
    }

    #[test]
    fn test_exclude_after_kind_filters() {
        let options = AutoOptions {
            include_functions: Some(true),
            include_attributes: Some(false),
            exclude: Some(vec!["z_method".into()]),
            ..Default::default()
        };
        assert_eq!(fetch(options, "pkg:AClass").unwrap(), vec!["Zeta", "a_method"]);
    }

    #[test]
    fn test_include_not_implemented() {
        let options = AutoOptions {
            include: Some(vec!["a_method".into()]),
            ..Default::default()
        };
        assert!(matches!(
            fetch(options, "pkg:AClass"),
            Err(BuildError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_explicit_members_win() {
        let options = AutoOptions {
            members: Some(vec!["z_method".into()]),
            exclude: Some(vec!["z_method".into()]),
            include: Some(vec!["x".into()]),
            ..Default::default()
        };
        assert_eq!(fetch(options, "pkg:AClass").unwrap(), vec!["z_method"]);
    }

    #[test]
    fn test_children_separate_makes_member_pages() {
        let loader = loader();
        let tree = layout(json!([{
            "title": "Classes",
            "contents": [{"name": "AClass", "children": "separate", "members": ["a_method"]}]
        }]));
        let out = blueprint(&tree, &loader, Dynamic::Static).unwrap();

        assert!(extract_kind(&out, "auto").is_empty());
        let member_pages = extract_kind(&out, "member_page");
        assert_eq!(member_pages.len(), 1);
        assert_eq!(member_pages[0].as_page().unwrap().path, "pkg.AClass.a_method");
    }

    #[test]
    fn test_children_linked_and_flat() {
        let loader = loader();
        let tree = layout(json!([{
            "title": "Classes",
            "contents": [
                {"name": "AClass", "children": "linked"},
                {"kind": "page", "path": "flat", "contents": [{"name": "AClass", "children": "flat"}]}
            ]
        }]));
        let out = blueprint(&tree, &loader, Dynamic::Static).unwrap();

        let links = extract_kind(&out, "link");
        assert_eq!(links.len(), 4);
        let docs = extract_kind(&out, "doc");
        let flat_class = docs
            .iter()
            .filter_map(|d| d.as_doc())
            .find(|d| d.kind() == ObjectKind::Class && d.is_flat());
        assert!(flat_class.is_some());
    }

    #[test]
    fn test_top_level_sections_hold_only_pages() {
        let loader = loader();
        let tree = layout(json!([{
            "title": "Mixed",
            "contents": [
                "a_func",
                {"kind": "page", "path": "prebuilt", "contents": ["AClass"]}
            ]
        }]));
        let out = blueprint(&tree, &loader, Dynamic::Static).unwrap();

        let Node::Layout(layout) = out.as_ref() else {
            panic!("expected layout");
        };
        let Node::Section(section) = layout.sections[0].as_ref() else {
            panic!("expected section");
        };
        assert!(section.contents.iter().all(|el| el.is_page()));
        assert_eq!(section.contents[0].as_page().unwrap().path, "a_func");
        assert_eq!(section.contents[1].as_page().unwrap().path, "prebuilt");
    }

    #[test]
    fn test_reblueprint_is_noop() {
        let loader = loader();
        let tree = layout(json!([{"title": "x", "contents": ["a_func", "AClass"]}]));
        let once = blueprint(&tree, &loader, Dynamic::Static).unwrap();
        let twice = blueprint(&once, &loader, Dynamic::Static).unwrap();
        assert!(Arc::ptr_eq(&once, &twice));
    }

    #[test]
    fn test_member_options_apply_to_direct_members_only() {
        let loader = loader();
        let tree = layout(json!([{
            "title": "x",
            "contents": [{
                "name": "pkg",
                "package": null,
                "member_options": {"children": "linked"}
            }]
        }]));
        let out = blueprint(&tree, &loader, Dynamic::Static).unwrap();

        let docs = extract_kind(&out, "doc");
        let module = docs[0].as_doc().unwrap();
        assert_eq!(module.kind(), ObjectKind::Module);
        let class = module
            .members()
            .iter()
            .filter_map(|m| m.as_doc())
            .find(|d| d.kind() == ObjectKind::Class)
            .unwrap();
        // the class's own members are links because of member_options
        assert!(class.members().iter().all(|m| matches!(m.as_ref(), Node::Link(_))));
        assert_eq!(class.members().len(), 4);
    }

    fn doc_named(out: &Arc<Node>, name: &str) -> Arc<Node> {
        extract_kind(out, "doc")
            .into_iter()
            .find(|n| n.as_doc().is_some_and(|d| d.name() == name))
            .unwrap()
    }

    fn member_names(doc: &Doc) -> Vec<String> {
        doc.members()
            .iter()
            .filter_map(|m| m.as_doc().map(|d| d.name().to_string()))
            .collect()
    }

    #[test]
    fn test_dynamic_target_documents_target_members() {
        let loader = loader();
        let tree = layout(json!([{
            "title": "x",
            "contents": [{"name": "renamed", "dynamic": "pkg:AClass"}]
        }]));
        let out = blueprint(&tree, &loader, Dynamic::Static).unwrap();

        let renamed = doc_named(&out, "renamed");
        let doc = renamed.as_doc().unwrap();
        assert_eq!(doc.kind(), ObjectKind::Class);
        assert_eq!(member_names(doc), vec!["Zeta", "a_method", "an_attr", "z_method"]);
        let a_method = doc_named(&out, "a_method");
        assert_eq!(a_method.as_doc().unwrap().obj().path(), "pkg.AClass.a_method");
    }

    #[test]
    fn test_dynamic_target_module_keeps_members() {
        let loader = loader();
        let tree = layout(json!([{
            "title": "x",
            "contents": [{"name": "alias_mod", "package": null, "dynamic": "pkg"}]
        }]));
        let out = blueprint(&tree, &loader, Dynamic::Static).unwrap();

        let alias_mod = doc_named(&out, "alias_mod");
        let doc = alias_mod.as_doc().unwrap();
        assert_eq!(doc.kind(), ObjectKind::Module);
        assert_eq!(member_names(doc), vec!["AClass", "a_func"]);
        let class = doc_named(&out, "AClass");
        assert_eq!(member_names(class.as_doc().unwrap()).len(), 4);
    }

    #[test]
    fn test_interlaced_rejects_class() {
        let loader = loader();
        let tree = layout(json!([{
            "title": "x",
            "contents": [{
                "kind": "page",
                "path": "grouped",
                "contents": [{"kind": "interlaced", "contents": ["a_func", "AClass"]}]
            }]
        }]));
        let err = blueprint(&tree, &loader, Dynamic::Static).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("must be functions or attributes"));
        assert!(err.to_string().contains("`AClass` is a class"));
    }

    #[test]
    fn test_interlaced_functions_in_page() {
        let loader = loader();
        let tree = layout(json!([{
            "title": "x",
            "contents": [{
                "kind": "page",
                "path": "grouped",
                "contents": [{"kind": "interlaced", "contents": ["a_func", "AClass.a_method"]}]
            }]
        }]));
        let out = blueprint(&tree, &loader, Dynamic::Static).unwrap();

        let groups = extract_kind(&out, "interlaced");
        assert_eq!(groups.len(), 1);
        let Node::Interlaced(group) = groups[0].as_ref() else {
            panic!("expected an interlaced group");
        };
        assert_eq!(group.contents.len(), 2);
        assert!(group.contents.iter().all(|el| el.as_doc().is_some()));
        assert_eq!(extract_kind(&out, "page")[0].as_page().unwrap().path, "grouped");
    }

    #[test]
    fn test_auto_package_section() {
        let loader = loader();
        let tree = Layout {
            package: PackageOverride::set("pkg"),
            ..Default::default()
        }
        .into_node();
        let out = blueprint(&tree, &loader, Dynamic::Static).unwrap();

        let Node::Layout(layout) = out.as_ref() else {
            panic!("expected layout");
        };
        assert_eq!(layout.sections.len(), 1);
        let Node::Section(section) = layout.sections[0].as_ref() else {
            panic!("expected section");
        };
        assert_eq!(section.title.as_deref(), Some("pkg"));
        assert_eq!(section.desc.as_deref(), Some("A package for tests."));
        // AClass, a_func, b_func; private, submodule and external alias excluded
        assert_eq!(section.contents.len(), 3);
    }

    #[test]
    fn test_strip_package_name() {
        let tree = Layout {
            sections: vec![Arc::new(Node::Page(Page::new("pkg.sub.thing", Vec::new())))],
            ..Default::default()
        }
        .into_node();
        let out = strip_package_name(&tree, "pkg").unwrap();
        let pages = extract_kind(&out, "page");
        assert_eq!(pages[0].as_page().unwrap().path, "sub.thing");
    }
}
