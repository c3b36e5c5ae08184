//! Integration tests for `build --filter` page selection.

use std::fs;
use tempfile::TempDir;

use quartodoc_ultra::config::QuartoConfig;
use quartodoc_ultra::matching::{pattern_filter, pattern_match, translate_pattern};
use quartodoc_ultra::objects::{MemorySource, ModulesCollection};
use quartodoc_ultra::{Builder, PageFilter};

#[test]
fn test_pattern_translation() {
    assert_eq!(translate_pattern("*"), "^.*$");
    assert_eq!(translate_pattern("pkg.*"), "^pkg\\..*$");
    assert_eq!(translate_pattern("**.render"), "^.*\\.render$");
    assert_eq!(translate_pattern("get_?"), "^get_.$");

    // character classes
    assert_eq!(translate_pattern("[abc]*"), "^[abc].*$");
    assert_eq!(translate_pattern("[!_]*"), "^[^_].*$");
    assert_eq!(translate_pattern("[^x]"), "^[\\^x]$");
    assert_eq!(translate_pattern("a[b"), "^a\\[b$");
}

#[test]
fn test_pattern_matching_page_paths() {
    // a star crosses dots
    assert!(pattern_match("MdRenderer.render", "MdRenderer.*").unwrap());
    assert!(pattern_match("pkg.sub.Class.method", "pkg.*").unwrap());
    assert!(pattern_match("pkg.sub.Class.method", "*method").unwrap());

    assert!(pattern_match("get_a", "get_?").unwrap());
    assert!(!pattern_match("get_ab", "get_?").unwrap());

    // case sensitive
    assert!(!pattern_match("mdrenderer.render", "MdRenderer.*").unwrap());

    // anchored at both ends
    assert!(!pattern_match("xMdRenderer", "MdRenderer").unwrap());
    assert!(!pattern_match("MdRendererx", "MdRenderer").unwrap());
}

#[test]
fn test_pattern_filter_keeps_order() {
    let names: Vec<String> = ["b_func", "a_func", "AClass", "_private"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(
        pattern_filter(&names, "*_func").unwrap(),
        vec!["b_func".to_string(), "a_func".to_string()]
    );
    assert_eq!(
        pattern_filter(&names, "[!_]*").unwrap(),
        vec!["b_func".to_string(), "a_func".to_string(), "AClass".to_string()]
    );
}

#[test]
fn test_page_filter_match_all() {
    let filter = PageFilter::default();
    assert!(filter.is_match_all());
    assert_eq!(filter.pattern(), "*");
    assert!(filter.matches(""));
    assert!(filter.matches("anything.at.all"));

    let filter = PageFilter::new("*").unwrap();
    assert!(filter.is_match_all());
}

#[test]
fn test_page_filter_selects_pages() {
    let filter = PageFilter::new("AClass*").unwrap();
    assert!(!filter.is_match_all());
    assert!(filter.matches("AClass"));
    assert!(filter.matches("AClass.a_method"));
    assert!(!filter.matches("a_func"));
}

const PKG: &str = r#"{
    "name": "pkg",
    "kind": "module",
    "members": {
        "a_func": {"kind": "function", "docstring": "A function."},
        "b_func": {"kind": "function", "docstring": "B function."},
        "AClass": {
            "kind": "class",
            "docstring": "A class.",
            "members": {
                "a_method": {"kind": "function", "docstring": "A method."}
            }
        }
    }
}"#;

const CONFIG: &str = r#"
quartodoc:
  package: pkg
  sections:
    - title: Functions
      contents: [a_func, b_func]
    - title: Classes
      contents:
        - name: AClass
          children: separate
"#;

fn builder(root: &std::path::Path) -> Builder {
    let quarto = QuartoConfig::from_yaml(CONFIG, root).unwrap();
    let loader = ModulesCollection::new(MemorySource::new().with_json(PKG).unwrap());
    Builder::new(quarto.build_config().unwrap().clone(), root, Box::new(loader)).unwrap()
}

#[test]
fn test_filtered_build_writes_matching_pages_only() {
    let temp_dir = TempDir::new().unwrap();
    let base_path = temp_dir.path();

    let mut builder = builder(base_path);
    let stats = builder.build(&PageFilter::new("*_func").unwrap()).unwrap();

    let reference = base_path.join("reference");
    assert!(reference.join("a_func.qmd").exists());
    assert!(reference.join("b_func.qmd").exists());
    assert!(!reference.join("AClass.qmd").exists());
    assert!(!reference.join("pkg.AClass.a_method.qmd").exists());
    assert_eq!(stats.pages_written, 2);
    assert_eq!(stats.pages_filtered, 2);

    // the index and inventory are written regardless of the filter
    assert!(reference.join("index.qmd").exists());
    let inventory = fs::read_to_string(base_path.join("objects.json")).unwrap();
    assert!(inventory.contains("pkg.AClass.a_method"));
}

#[test]
fn test_member_pages_match_on_object_path() {
    let temp_dir = TempDir::new().unwrap();
    let base_path = temp_dir.path();

    let mut builder = builder(base_path);
    let stats = builder.build(&PageFilter::new("pkg.AClass.*").unwrap()).unwrap();

    assert_eq!(stats.pages_written, 1);
    assert!(base_path.join("reference/pkg.AClass.a_method.qmd").exists());
    assert!(!base_path.join("reference/a_func.qmd").exists());
}

#[test]
fn test_invalid_pattern_is_config_error() {
    let err = PageFilter::new("[z-a]").unwrap_err();
    assert!(err.is_config_error());

    // an unclosed class is a literal bracket
    let filter = PageFilter::new("a[b").unwrap();
    assert!(filter.matches("a[b"));
}
