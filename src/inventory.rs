//! Inventory files: the index of documented objects and their URLs.
//!
//! The JSON form has this shape:
//!
//! ```json
//! {
//!   "project": "pkg", "version": "0.1.0", "count": 1,
//!   "items": [
//!     {"name": "pkg.a_func", "domain": "py", "role": "function",
//!      "priority": "1", "uri": "reference/a_func.html#pkg.a_func", "dispname": "-"}
//!   ]
//! }
//! ```
//!
//! Sphinx `objects.inv` (version 2) files carry the same entries as one line
//! each below a four line header, zlib compressed.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::layout::Item;

lazy_static::lazy_static! {
    /// One body line of a Sphinx inventory
    static ref SPHINX_LINE: Regex =
        Regex::new(r"^(.+?)\s+(\S+)\s+(-?\d+)\s+?(\S*)\s+(.*)$").unwrap();
}

/// Domain of every entry this crate creates.
pub const PY_DOMAIN: &str = "py";

/// Placeholder meaning "display the name itself".
pub const SAME_AS_NAME: &str = "-";

const SPHINX_HEADER: &str = "# Sphinx inventory version 2";
const SPHINX_COMPRESSED_NOTE: &str = "# The remainder of this file is compressed using zlib.";

/// One inventory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub domain: String,
    pub role: String,
    pub priority: String,
    pub uri: String,
    pub dispname: String,
}

impl InventoryItem {
    /// The text a link to this entry shows.
    pub fn display_name(&self) -> &str {
        if self.dispname == SAME_AS_NAME {
            &self.name
        } else {
            &self.dispname
        }
    }

    /// The uri with a trailing `$` expanded to the name.
    pub fn expanded_uri(&self) -> String {
        match self.uri.strip_suffix('$') {
            Some(stem) => format!("{}{}", stem, self.name),
            None => self.uri.clone(),
        }
    }

    fn to_sphinx_line(&self) -> String {
        format!(
            "{} {}:{} {} {} {}",
            self.name, self.domain, self.role, self.priority, self.uri, self.dispname
        )
    }

    fn from_sphinx_line(line: &str) -> Option<Self> {
        let caps = SPHINX_LINE.captures(line)?;
        let (domain, role) = caps[2].split_once(':')?;
        Some(Self {
            name: caps[1].to_string(),
            domain: domain.to_string(),
            role: role.to_string(),
            priority: caps[3].to_string(),
            uri: caps[4].to_string(),
            dispname: caps[5].trim_end().to_string(),
        })
    }
}

/// A project's inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub project: String,
    pub version: String,
    count: usize,
    items: Vec<InventoryItem>,
}

impl Inventory {
    pub fn new(project: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            version: version.into(),
            count: 0,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: InventoryItem) {
        self.items.push(item);
        self.count = self.items.len();
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut inv: Inventory = serde_json::from_str(json)?;
        if inv.count != inv.items.len() {
            warn!(
                "Inventory for {} declares {} items but holds {}",
                inv.project,
                inv.count,
                inv.items.len()
            );
            inv.count = inv.items.len();
        }
        Ok(inv)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Parse a Sphinx inventory, compressed or plain.
    pub fn from_sphinx_bytes(bytes: &[u8]) -> Result<Self> {
        let mut rest = bytes;
        let mut header = Vec::with_capacity(4);
        for _ in 0..4 {
            let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
            header.push(String::from_utf8_lossy(&rest[..end]).trim_end().to_string());
            rest = rest.get(end + 1..).unwrap_or(&[]);
        }

        if header[0] != SPHINX_HEADER {
            return Err(BuildError::Config(format!(
                "Unsupported inventory header `{}`; only version 2 inventories can be read",
                header[0]
            )));
        }
        let project = header_value(&header[1], "# Project:")?;
        let version = header_value(&header[2], "# Version:")?;

        // zlib streams open with 0x78
        let body = if rest.first() == Some(&0x78) {
            let mut body = String::new();
            ZlibDecoder::new(rest).read_to_string(&mut body)?;
            body
        } else {
            String::from_utf8_lossy(rest).into_owned()
        };

        let mut inv = Inventory::new(project, version);
        for line in body.lines().filter(|l| !l.trim().is_empty() && !l.starts_with('#')) {
            match InventoryItem::from_sphinx_line(line) {
                Some(item) => inv.push(item),
                None => warn!("Skipping malformed inventory line: {}", line),
            }
        }
        debug!("Read {} inventory entries for {}", inv.len(), inv.project);
        Ok(inv)
    }

    pub fn read_sphinx(path: &Path) -> Result<Self> {
        Self::from_sphinx_bytes(&fs::read(path)?)
    }

    fn sphinx_header(&self) -> String {
        format!(
            "{}\n# Project: {}\n# Version: {}\n{}\n",
            SPHINX_HEADER, self.project, self.version, SPHINX_COMPRESSED_NOTE
        )
    }

    fn sphinx_body(&self) -> String {
        let mut body = String::new();
        for item in &self.items {
            body.push_str(&item.to_sphinx_line());
            body.push('\n');
        }
        body
    }

    /// The uncompressed Sphinx text form (`objects.txt`).
    pub fn to_sphinx_text(&self) -> String {
        self.sphinx_header() + &self.sphinx_body()
    }

    /// The compressed Sphinx form (`objects.inv`).
    pub fn to_sphinx_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.sphinx_header().into_bytes();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(self.sphinx_body().as_bytes())?;
        out.extend(encoder.finish()?);
        Ok(out)
    }
}

fn header_value(line: &str, prefix: &str) -> Result<String> {
    line.strip_prefix(prefix)
        .map(|v| v.trim().to_string())
        .ok_or_else(|| {
            BuildError::Config(format!(
                "Malformed inventory header: expected `{}`, found `{}`",
                prefix, line
            ))
        })
}

/// Build an inventory from collected items.
pub fn create_inventory(project: &str, version: &str, items: &[Item]) -> Result<Inventory> {
    let mut inv = Inventory::new(project, version);
    for item in items {
        let role = item.obj.require_kind()?;
        inv.push(InventoryItem {
            name: item.name.clone(),
            domain: PY_DOMAIN.to_string(),
            role: role.as_str().to_string(),
            priority: "1".to_string(),
            uri: item.uri.clone(),
            dispname: item
                .dispname
                .clone()
                .unwrap_or_else(|| SAME_AS_NAME.to_string()),
        });
    }
    Ok(inv)
}

/// Convert a Sphinx inventory file to JSON.
///
/// Without `out`, the result lands next to the input with a `.json` suffix.
pub fn convert_inventory(input: &Path, out: Option<&Path>) -> Result<PathBuf> {
    let out = match out {
        Some(out) => out.to_path_buf(),
        None => input.with_extension("json"),
    };
    let inv = Inventory::read_sphinx(input)?;
    inv.write_json(&out)?;
    Ok(out)
}
