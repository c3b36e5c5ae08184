use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{BuildConfig, BuildStyle, InterlinksConfig, QuartoConfig};
use crate::inventory::create_inventory;
use crate::layout::{Item, Layout, Node, Page};
use crate::matching::PageFilter;
use crate::navigation::SidebarBuilder;
use crate::objects::docstring::SectionParser;
use crate::objects::loader::{DirectorySource, ModulesCollection, ObjectLoader};
use crate::renderer::{renderer_from_config, Renderer, PAGE_SUFFIX};

pub mod blueprint;
pub mod collect;

pub use blueprint::blueprint;
pub use collect::collect;

/// Inventory version used when the config names none
pub const DEFAULT_VERSION: &str = "0.0.9999";

const DEFAULT_STYLES: &str = include_str!("../static/styles.css");

#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub pages_written: usize,
    pub pages_unchanged: usize,
    pub pages_filtered: usize,
    pub items: usize,
    pub build_time: Duration,
}

/// Writes the reference pages, index, inventory and sidebar of one config
pub struct Builder {
    config: BuildConfig,
    interlinks: InterlinksConfig,
    root_dir: PathBuf,
    layout: Arc<Node>,
    loader: Box<dyn ObjectLoader>,
    renderer: Box<dyn Renderer>,
    items: Vec<Item>,
}

impl Builder {
    pub fn new(
        config: BuildConfig,
        root_dir: impl Into<PathBuf>,
        loader: Box<dyn ObjectLoader>,
    ) -> Result<Self> {
        let layout = Self::load_layout(&config)?;
        let renderer = renderer_from_config(&config.renderer_config())?;

        Ok(Self {
            config,
            interlinks: InterlinksConfig::default(),
            root_dir: root_dir.into(),
            layout,
            loader,
            renderer,
            items: Vec::new(),
        })
    }

    /// Builder reading package dumps from the config's source directory.
    pub fn from_quarto_config(quarto: &QuartoConfig) -> Result<Self> {
        let config = quarto.build_config()?.clone();
        let source_dir = quarto.source_dir();
        debug!("Reading package dumps from {}", source_dir.display());

        let loader = ModulesCollection::new(DirectorySource::new(source_dir))
            .with_parser(SectionParser::new(config.parser));

        Ok(Self::new(config, quarto.root_dir.clone(), Box::new(loader))?
            .with_interlinks(quarto.interlinks_config()))
    }

    pub fn with_interlinks(mut self, interlinks: InterlinksConfig) -> Self {
        self.interlinks = interlinks;
        self
    }

    /// Parse the configured sections. Single-page builds put every section
    /// on the index page.
    pub fn load_layout(config: &BuildConfig) -> Result<Arc<Node>> {
        let mut layout = Layout::parse(
            &config.sections,
            config.package.clone(),
            config.options.clone(),
        )
        .context("Failed to parse the `sections` of the quartodoc config")?;

        if config.style == BuildStyle::SinglePage {
            let path = config
                .out_index
                .strip_suffix(PAGE_SUFFIX)
                .unwrap_or(&config.out_index);
            let sections = std::mem::take(&mut layout.sections);
            layout.sections = vec![Arc::new(Node::Page(Page::new(path, sections)))];
        }
        Ok(layout.into_node())
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn layout(&self) -> &Arc<Node> {
        &self.layout
    }

    /// Inventory items gathered by the last build.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    fn out_dir(&self) -> PathBuf {
        self.root_dir.join(&self.config.dir)
    }

    pub fn build(&mut self, filter: &PageFilter) -> Result<BuildStats> {
        let start_time = Instant::now();
        let mut stats = BuildStats::default();

        info!("Generating blueprint.");
        let blueprint = blueprint(&self.layout, self.loader.as_ref(), self.config.dynamic.clone())
            .context("Failed to generate the blueprint")?;

        info!("Collecting pages and inventory items.");
        let (pages, items) = collect(&blueprint, &self.config.dir)?;
        self.items = items;
        stats.items = self.items.len();

        if self.config.style == BuildStyle::Pkgdown {
            info!("Writing index");
            self.write_index(&blueprint)?;
        }

        info!("Writing docs pages");
        self.write_doc_pages(&pages, filter, &mut stats)?;

        info!("Creating inventory file");
        self.write_inventory()?;

        if let Some(sidebar) = &self.config.sidebar {
            let path = self.root_dir.join(&sidebar.file);
            info!("Writing sidebar yaml to {}", path.display());
            SidebarBuilder::new(self.config.dir.as_str())
                .write(&blueprint, &sidebar.options, &path)
                .with_context(|| format!("Failed to write sidebar: {}", path.display()))?;
        }

        if let Some(css) = &self.config.css {
            let path = self.root_dir.join(css);
            info!("Writing css styles to {}", path.display());
            write_css(&path)?;
        }

        stats.build_time = start_time.elapsed();
        info!("Build completed in {:?}", stats.build_time);
        Ok(stats)
    }

    /// Write the API index page, returning its path.
    pub fn write_index(&self, blueprint: &Node) -> Result<PathBuf> {
        info!("Summarizing docs for index page.");
        let content = self.renderer.summarize(blueprint)?;

        let mut text = String::new();
        if let Some(title) = &self.config.title {
            let meta = serde_yaml::to_string(&serde_yaml::Mapping::from_iter([(
                serde_yaml::Value::from("title"),
                serde_yaml::Value::from(title.as_str()),
            )]))?;
            text.push_str("---\n");
            text.push_str(&meta);
            text.push_str("---\n\n");
        }
        text.push_str(&content);

        let path = self.out_dir().join(&self.config.out_index);
        info!("Writing index to directory: {}", self.config.dir);
        write_file(&path, &text)?;
        Ok(path)
    }

    /// Render every page and write those that match `filter` and changed.
    pub fn write_doc_pages(
        &self,
        pages: &[Arc<Node>],
        filter: &PageFilter,
        stats: &mut BuildStats,
    ) -> Result<()> {
        let out_dir = self.out_dir();

        for node in pages {
            let Some(page) = node.as_page() else {
                continue;
            };
            info!("Rendering {}", page.path);
            let rendered = self
                .renderer
                .render(node)
                .with_context(|| format!("Failed to render page: {}", page.path))?;

            if !filter.matches(&page.path) {
                debug!("Skipping write (no filter match)");
                stats.pages_filtered += 1;
                continue;
            }

            let path = out_dir.join(format!("{}{}", page.path, PAGE_SUFFIX));
            let unchanged = !self.config.rewrite_all_pages
                && fs::read_to_string(&path).is_ok_and(|existing| existing == rendered);

            if unchanged {
                debug!("Skipping write (content unchanged)");
                stats.pages_unchanged += 1;
            } else {
                info!("Writing: {}", page.path);
                write_file(&path, &rendered)?;
                stats.pages_written += 1;
            }
        }
        Ok(())
    }

    /// Write the site inventory: JSON, or Sphinx text for fast builds.
    pub fn write_inventory(&self) -> Result<PathBuf> {
        let project = self.config.package_name().unwrap_or_default();
        let version = self.config.version.as_deref().unwrap_or(DEFAULT_VERSION);
        let inventory = create_inventory(project, version, &self.items)?;

        let mut path = self.root_dir.join(&self.interlinks.site_inv);
        if self.interlinks.fast {
            path.set_extension("txt");
            write_file(&path, &inventory.to_sphinx_text())?;
        } else {
            write_file(&path, &inventory.to_json()?)?;
        }
        debug!("Wrote {} inventory items to {}", inventory.len(), path.display());
        Ok(path)
    }
}

/// Write the default stylesheet with a generated-file note.
pub fn write_css(path: &Path) -> Result<()> {
    let note = format!(
        "/*\nThis file generated automatically by quartodoc-ultra version {}.\n\
         Modifications may be overwritten by quartodoc-ultra build. If you want to\n\
         customize styles, create a new .css file to avoid losing changes.\n*/\n\n\n",
        env!("CARGO_PKG_VERSION")
    );
    write_file(path, &format!("{}{}", note, DEFAULT_STYLES))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write: {}", path.display()))
}
