//! `_quarto.yml` loading.
//!
//! Only two top-level sections matter here: `quartodoc:` describes the API
//! reference to build and `interlinks:` lists the inventories that references
//! may point into. Everything else in the file belongs to Quarto and is
//! ignored.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::layout::{AutoOptions, PackageOverride};
use crate::objects::{DocstringStyle, Dynamic};
use crate::renderer::DisplayName;
use crate::validation::{ConfigPath, ValidationIssue};

/// Configuration filename looked up by default.
pub const CONFIG_FILENAME: &str = "_quarto.yml";

/// Default sidebar file when `sidebar` is given as a mapping without `file`.
pub const DEFAULT_SIDEBAR_FILE: &str = "_quartodoc-sidebar.yml";

/// How the reference is split into files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStyle {
    /// One index page plus one page per entry
    #[default]
    Pkgdown,
    /// Everything on the index page
    SinglePage,
}

/// Markdown renderer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub style: String,
    pub header_level: usize,
    pub show_signature: bool,
    pub show_signature_annotations: bool,
    pub display_name: DisplayName,
    pub render_interlinks: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            style: "markdown".to_string(),
            header_level: 1,
            show_signature: true,
            show_signature_annotations: false,
            display_name: DisplayName::Relative,
            render_interlinks: false,
        }
    }
}

/// `renderer:` is either a style name or a mapping of settings
#[derive(Deserialize)]
#[serde(untagged)]
enum RendererSetting {
    Style(String),
    Options(RendererConfig),
}

fn deserialize_renderer<'de, D>(deserializer: D) -> std::result::Result<RendererConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match RendererSetting::deserialize(deserializer)? {
        RendererSetting::Style(style) => RendererConfig {
            style,
            ..Default::default()
        },
        RendererSetting::Options(options) => options,
    })
}

/// Where the sidebar goes and the Quarto options it carries
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarConfig {
    pub file: String,
    /// Quarto sidebar options other than `file`
    pub options: serde_yaml::Mapping,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SidebarSetting {
    File(String),
    Options(serde_yaml::Mapping),
}

fn deserialize_sidebar<'de, D>(deserializer: D) -> std::result::Result<Option<SidebarConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let setting: Option<SidebarSetting> = Option::deserialize(deserializer)?;
    Ok(setting.map(|setting| match setting {
        SidebarSetting::File(file) => SidebarConfig {
            file,
            options: serde_yaml::Mapping::new(),
        },
        SidebarSetting::Options(mut options) => {
            let file = options
                .remove("file")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| DEFAULT_SIDEBAR_FILE.to_string());
            SidebarConfig { file, options }
        }
    }))
}

fn default_dir() -> String {
    "reference".to_string()
}

fn default_title() -> Option<String> {
    Some("Function reference".to_string())
}

fn default_out_index() -> String {
    "index.qmd".to_string()
}

/// The `quartodoc:` section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default)]
    pub package: PackageOverride,
    #[serde(default)]
    pub version: Option<String>,
    /// Output directory of the reference pages
    #[serde(default = "default_dir")]
    pub dir: String,
    /// Index page title; `null` writes no front matter
    #[serde(default = "default_title")]
    pub title: Option<String>,
    #[serde(default)]
    pub style: BuildStyle,
    /// Raw layout sections, parsed by the layout module
    #[serde(default)]
    pub sections: Vec<serde_json::Value>,
    #[serde(default)]
    pub options: Option<AutoOptions>,
    #[serde(default, deserialize_with = "deserialize_renderer")]
    pub renderer: RendererConfig,
    #[serde(default = "default_out_index")]
    pub out_index: String,
    #[serde(default, deserialize_with = "deserialize_sidebar")]
    pub sidebar: Option<SidebarConfig>,
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub rewrite_all_pages: bool,
    /// Directory holding package dump files
    #[serde(default)]
    pub source_dir: Option<String>,
    #[serde(default)]
    pub dynamic: Dynamic,
    #[serde(default)]
    pub parser: DocstringStyle,
    #[serde(default)]
    pub render_interlinks: bool,
}

impl BuildConfig {
    /// The package name, if one is set.
    pub fn package_name(&self) -> Option<&str> {
        self.package.resolve().flatten()
    }

    /// Renderer settings with the top-level interlinks switch applied.
    pub fn renderer_config(&self) -> RendererConfig {
        let mut renderer = self.renderer.clone();
        renderer.render_interlinks |= self.render_interlinks;
        renderer
    }
}

/// An external inventory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterlinkSource {
    pub url: String,
    /// Inventory file name below `url`
    #[serde(default)]
    pub inv: Option<String>,
}

impl InterlinkSource {
    /// Whether the source is this site itself.
    pub fn is_local(&self) -> bool {
        self.url == "/"
    }

    pub fn inventory_url(&self) -> String {
        format!("{}{}", self.url, self.inv.as_deref().unwrap_or("objects.inv"))
    }
}

fn default_cache() -> String {
    "_inv".to_string()
}

fn default_site_inv() -> String {
    "objects.json".to_string()
}

/// The `interlinks:` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterlinksConfig {
    #[serde(default)]
    pub sources: IndexMap<String, InterlinkSource>,
    #[serde(default = "default_cache")]
    pub cache: String,
    #[serde(default = "default_site_inv")]
    pub site_inv: String,
    /// Write the site inventory as Sphinx text instead of JSON
    #[serde(default)]
    pub fast: bool,
}

impl Default for InterlinksConfig {
    fn default() -> Self {
        Self {
            sources: IndexMap::new(),
            cache: default_cache(),
            site_inv: default_site_inv(),
            fast: false,
        }
    }
}

impl InterlinksConfig {
    /// Where the converted inventory of a source is cached.
    pub fn cache_path(&self, root: &Path, name: &str) -> PathBuf {
        root.join(&self.cache).join(format!("{}_objects.json", name))
    }
}

/// The parts of `_quarto.yml` this crate reads
#[derive(Debug, Clone)]
pub struct QuartoConfig {
    pub quartodoc: Option<BuildConfig>,
    pub interlinks: Option<InterlinksConfig>,
    /// Directory containing the config file; relative paths start here
    pub root_dir: PathBuf,
}

impl QuartoConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let root_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        debug!("Loading configuration from {}", path.display());
        Self::from_yaml(&text, root_dir)
    }

    pub fn from_yaml(text: &str, root_dir: impl Into<PathBuf>) -> Result<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(Self {
            quartodoc: section(&doc, "quartodoc")?,
            interlinks: section(&doc, "interlinks")?,
            root_dir: root_dir.into(),
        })
    }

    /// The `quartodoc:` section, which a build cannot do without.
    pub fn build_config(&self) -> Result<&BuildConfig> {
        self.quartodoc.as_ref().ok_or_else(|| {
            BuildError::Config("No `quartodoc:` section found in your _quarto.yml.".to_string())
        })
    }

    pub fn interlinks_config(&self) -> InterlinksConfig {
        self.interlinks.clone().unwrap_or_default()
    }

    /// Directory of the package dumps.
    pub fn source_dir(&self) -> PathBuf {
        match self.quartodoc.as_ref().and_then(|c| c.source_dir.as_deref()) {
            Some(dir) => self.root_dir.join(dir),
            None => self.root_dir.clone(),
        }
    }
}

fn section<T: serde::de::DeserializeOwned>(doc: &serde_yaml::Value, key: &str) -> Result<Option<T>> {
    match doc.get(key) {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(value) => serde_yaml::from_value(value.clone()).map(Some).map_err(|e| {
            ValidationIssue::invalid(&ConfigPath::root(), Some(key), e.to_string()).into()
        }),
    }
}
