//! End-to-end tests: config on disk, package dumps, blueprint, collect and build.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use quartodoc_ultra::config::QuartoConfig;
use quartodoc_ultra::layout::{AutoOptions, ChildrenPolicy, PackageOverride};
use quartodoc_ultra::objects::{Dynamic, MemorySource, ModulesCollection, ObjectKind};
use quartodoc_ultra::transform::extract_kind;
use quartodoc_ultra::{blueprint, collect, Auto, Builder, Inventory, Layout, Node, PageFilter, Section};

const MYPKG: &str = r#"{
    "name": "mypkg",
    "kind": "module",
    "docstring": "My package.\n\nLonger description.",
    "members": {
        "AClass": {
            "kind": "class",
            "docstring": "A class.",
            "members": {
                "a_method": {"kind": "function", "docstring": "A method.", "parameters": [{"name": "self"}]},
                "b_method": {"kind": "function", "docstring": "B method."}
            }
        },
        "func": {"kind": "function", "docstring": "A function."},
        "bare": {"kind": "function"},
        "CONST": {"kind": "attribute", "docstring": "A constant.", "value": "1"},
        "_hidden": {"kind": "function", "docstring": "Hidden."},
        "__dunder__": {"kind": "attribute", "docstring": "Dunder."},
        "sub": {
            "kind": "module",
            "members": {
                "Foo": {"kind": "class", "docstring": "Foo class."}
            }
        },
        "Foo": {"kind": "alias", "target_path": "mypkg.sub:Foo"},
        "helper": {"kind": "alias", "target_path": "other:helper"}
    }
}"#;

const OTHER: &str = r#"{
    "name": "other",
    "kind": "module",
    "members": {
        "helper": {"kind": "function", "docstring": "Helps."}
    }
}"#;

fn loader() -> ModulesCollection {
    ModulesCollection::new(
        MemorySource::new()
            .with_json(MYPKG)
            .unwrap()
            .with_json(OTHER)
            .unwrap(),
    )
}

fn section(contents: Vec<Arc<Node>>) -> Arc<Node> {
    Arc::new(Node::Section(Section {
        title: Some("API".into()),
        contents,
        ..Default::default()
    }))
}

fn auto(name: &str, options: AutoOptions) -> Arc<Node> {
    Arc::new(Node::Auto(Auto::with_options(name, options)))
}

fn mypkg_layout(sections: Vec<Arc<Node>>) -> Arc<Node> {
    Layout {
        sections,
        package: PackageOverride::set("mypkg"),
        options: None,
    }
    .into_node()
}

#[test]
fn test_separate_children_end_to_end() {
    let options = AutoOptions {
        children: Some(ChildrenPolicy::Separate),
        members: Some(vec!["a_method".into()]),
        ..Default::default()
    };
    let layout = mypkg_layout(vec![section(vec![auto("AClass", options)])]);
    let bp = blueprint(&layout, &loader(), Dynamic::Static).unwrap();

    let class_doc = extract_kind(&bp, "doc")
        .into_iter()
        .find(|n| n.as_doc().is_some_and(|d| d.name() == "AClass"))
        .unwrap();
    let doc = class_doc.as_doc().unwrap();
    assert_eq!(doc.kind(), ObjectKind::Class);
    assert_eq!(doc.members().len(), 1);
    let Node::MemberPage(page) = doc.members()[0].as_ref() else {
        panic!("expected a member page");
    };
    assert_eq!(page.path, "mypkg.AClass.a_method");

    let (pages, items) = collect(&bp, "reference").unwrap();
    assert_eq!(pages.len(), 2);
    assert!(items.len() >= 2);
    assert!(extract_kind(&bp, "auto").is_empty());
}

#[test]
fn test_empty_sections_derive_package_section() {
    let bp = blueprint(&mypkg_layout(Vec::new()), &loader(), Dynamic::Static).unwrap();
    let Node::Layout(layout) = bp.as_ref() else {
        panic!("expected a layout");
    };
    assert_eq!(layout.sections.len(), 1);
    let Node::Section(section) = layout.sections[0].as_ref() else {
        panic!("expected a section");
    };
    assert_eq!(section.title.as_deref(), Some("mypkg"));
    assert_eq!(section.desc.as_deref(), Some("My package."));

    // public, non-submodule, non-external members
    let names: BTreeSet<&str> = section
        .contents
        .iter()
        .map(|page| page.as_page().unwrap().path.as_str())
        .collect();
    assert_eq!(
        names,
        BTreeSet::from(["AClass", "CONST", "Foo", "bare", "func"])
    );
}

#[test]
fn test_reexport_items_share_uri() {
    let layout = mypkg_layout(vec![section(vec![auto("Foo", AutoOptions::default())])]);
    let bp = blueprint(&layout, &loader(), Dynamic::Static).unwrap();
    let (_, items) = collect(&bp, "reference").unwrap();

    let display = items.iter().find(|i| i.name == "mypkg.Foo").unwrap();
    let canonical = items.iter().find(|i| i.name == "mypkg.sub.Foo").unwrap();
    assert_eq!(display.dispname, None);
    assert_eq!(canonical.dispname.as_deref(), Some("mypkg.Foo"));
    assert_eq!(display.uri, canonical.uri);
    assert_eq!(display.uri, "reference/Foo.html#mypkg.Foo");
}

#[test]
fn test_reblueprint_returns_same_tree() {
    let layout = mypkg_layout(vec![section(vec![auto("func", AutoOptions::default())])]);
    let loader = loader();
    let once = blueprint(&layout, &loader, Dynamic::Static).unwrap();
    let twice = blueprint(&once, &loader, Dynamic::Static).unwrap();
    assert!(Arc::ptr_eq(&once, &twice));
}

fn write_project(root: &Path, config: &str) {
    fs::create_dir_all(root.join("dumps")).unwrap();
    fs::write(root.join("dumps/mypkg.json"), MYPKG).unwrap();
    fs::write(root.join("dumps/other.json"), OTHER).unwrap();
    fs::write(root.join("_quarto.yml"), config).unwrap();
}

#[test]
fn test_build_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_project(
        root,
        r#"
project:
  type: website

quartodoc:
  package: mypkg
  version: "1.2.3"
  source_dir: dumps
  sidebar: _quartodoc-sidebar.yml
  sections:
    - title: Classes
      desc: Classes of the package.
      contents:
        - name: AClass
          children: separate
    - subtitle: Helpers
      contents: [func, Foo]
"#,
    );

    let quarto = QuartoConfig::load(&root.join("_quarto.yml")).unwrap();
    let mut builder = Builder::from_quarto_config(&quarto).unwrap();
    let stats = builder.build(&PageFilter::all()).unwrap();
    assert_eq!(stats.pages_written, 5);

    let reference = root.join("reference");
    let class_page = fs::read_to_string(reference.join("AClass.qmd")).unwrap();
    assert!(class_page.contains("# AClass { #mypkg.AClass }"));
    assert!(class_page.contains("mypkg.AClass.a_method.qmd"));

    let method_page = fs::read_to_string(reference.join("mypkg.AClass.a_method.qmd")).unwrap();
    assert!(method_page.contains("A method."));

    let index = fs::read_to_string(reference.join("index.qmd")).unwrap();
    assert!(index.contains("## Classes"));
    assert!(index.contains("### Helpers"));
    assert!(index.contains("[func](func.qmd#mypkg.func)"));

    let inventory = Inventory::read_json(&root.join("objects.json")).unwrap();
    assert_eq!(inventory.project, "mypkg");
    assert_eq!(inventory.version, "1.2.3");
    assert!(inventory
        .items()
        .iter()
        .any(|i| i.name == "mypkg.sub.Foo" && i.dispname == "mypkg.Foo"));

    let sidebar: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(root.join("_quartodoc-sidebar.yml")).unwrap())
            .unwrap();
    let contents = &sidebar["website"]["sidebar"][0]["contents"];
    assert_eq!(contents[0].as_str(), Some("reference/index.qmd"));
    assert_eq!(contents[1]["section"].as_str(), Some("Classes"));
}

#[test]
fn test_build_reports_bad_section() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_project(
        root,
        "quartodoc:\n  package: mypkg\n  source_dir: dumps\n  sections:\n    - title: A\n      subtitle: B\n      contents: [func]\n",
    );

    let quarto = QuartoConfig::load(&root.join("_quarto.yml")).unwrap();
    let err = Builder::from_quarto_config(&quarto).err().unwrap();
    let message = format!("{:#}", err);
    assert!(message.contains("Section cannot specify both title and subtitle fields"));
}

// member filter composability --------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Flags {
    private: bool,
    imports: bool,
    empty: bool,
    attributes: bool,
    classes: bool,
    functions: bool,
}

fn permissive() -> AutoOptions {
    AutoOptions {
        include_private: Some(true),
        include_imports: Some(true),
        include_empty: Some(true),
        include_attributes: Some(true),
        include_classes: Some(true),
        include_functions: Some(true),
        children: Some(ChildrenPolicy::Embedded),
        ..Default::default()
    }
}

fn member_names(options: AutoOptions) -> BTreeSet<String> {
    let layout = Layout {
        sections: vec![section(vec![auto("mypkg", options)])],
        ..Default::default()
    }
    .into_node();
    let bp = blueprint(&layout, &loader(), Dynamic::Static).unwrap();

    let root = extract_kind(&bp, "doc")
        .into_iter()
        .find(|n| n.as_doc().is_some_and(|d| d.name() == "mypkg"))
        .unwrap();
    root.as_doc()
        .unwrap()
        .members()
        .iter()
        .filter_map(|m| m.as_doc().map(|d| d.name().to_string()))
        .collect()
}

fn combined(flags: Flags) -> AutoOptions {
    AutoOptions {
        include_private: Some(flags.private),
        include_imports: Some(flags.imports),
        include_empty: Some(flags.empty),
        include_attributes: Some(flags.attributes),
        include_classes: Some(flags.classes),
        include_functions: Some(flags.functions),
        ..permissive()
    }
}

fn singles(flags: Flags) -> Vec<AutoOptions> {
    vec![
        AutoOptions { include_private: Some(flags.private), ..permissive() },
        AutoOptions { include_imports: Some(flags.imports), ..permissive() },
        AutoOptions { include_empty: Some(flags.empty), ..permissive() },
        AutoOptions { include_attributes: Some(flags.attributes), ..permissive() },
        AutoOptions { include_classes: Some(flags.classes), ..permissive() },
        AutoOptions { include_functions: Some(flags.functions), ..permissive() },
    ]
}

fn arb_flags() -> impl Strategy<Value = Flags> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(private, imports, empty, attributes, classes, functions)| Flags {
            private,
            imports,
            empty,
            attributes,
            classes,
            functions,
        })
}

#[test]
fn test_permissive_filters_keep_every_member() {
    let names = member_names(permissive());
    let expected: BTreeSet<String> = [
        "AClass", "func", "bare", "CONST", "_hidden", "__dunder__", "Foo", "helper",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(names, expected);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn member_filters_compose_as_intersection(flags in arb_flags()) {
        let together = member_names(combined(flags));

        let mut separately: Option<BTreeSet<String>> = None;
        for options in singles(flags) {
            let names = member_names(options);
            separately = Some(match separately {
                None => names,
                Some(acc) => acc.intersection(&names).cloned().collect(),
            });
        }

        prop_assert_eq!(together, separately.unwrap_or_default());
    }
}
