//! Quartodoc Ultra
//!
//! Generates Quarto API reference pages from dumped Python package metadata:
//! a declarative layout is resolved against the package objects, rendered to
//! markdown pages with an index, a sidebar and an object inventory.

pub mod builder;
pub mod config;
pub mod error;
pub mod interlinks;
pub mod inventory;
pub mod layout;
pub mod matching;
pub mod navigation;
pub mod objects;
pub mod renderer;
pub mod transform;
pub mod validation;

pub use builder::{blueprint, collect, BuildStats, Builder};
pub use config::{BuildConfig, InterlinksConfig, QuartoConfig};
pub use error::{BuildError, Result};
pub use interlinks::{Inventories, Ref};
pub use inventory::{convert_inventory, create_inventory, Inventory, InventoryItem};
pub use layout::{Auto, Doc, Item, Layout, Node, Page, Section};
pub use matching::PageFilter;
pub use navigation::SidebarBuilder;
pub use objects::{DocObject, ModulesCollection, ObjectLoader};
pub use renderer::{MdRenderer, Renderer};
