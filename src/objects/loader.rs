//! Object loading from package dumps.
//!
//! A package dump is a JSON document describing one root module: its members
//! in declaration order, docstrings, export lists, base classes and aliases.
//! `ModulesCollection` loads each root module once, on first use, and answers
//! path lookups against the flat path index built from it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::docstring::{Docstring, DocstringParser, SectionParser};
use super::{dotted_path, root_module, Alias, DocObject, Object, ObjectKind, Parameter};
use crate::error::{BuildError, Result};

/// Upper bound on alias hops before a chain is reported as cyclic
pub const MAX_ALIAS_HOPS: usize = 100;

/// How an object is loaded
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "DynamicRepr", into = "DynamicRepr")]
pub enum Dynamic {
    /// Static analysis only
    #[default]
    Static,
    /// Static analysis plus docstrings only known at import time
    Runtime,
    /// Document the object found at another path under this path
    Target(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DynamicRepr {
    Flag(bool),
    Target(String),
}

impl From<DynamicRepr> for Dynamic {
    fn from(repr: DynamicRepr) -> Self {
        match repr {
            DynamicRepr::Flag(false) => Dynamic::Static,
            DynamicRepr::Flag(true) => Dynamic::Runtime,
            DynamicRepr::Target(path) => Dynamic::Target(path),
        }
    }
}

impl From<Dynamic> for DynamicRepr {
    fn from(dynamic: Dynamic) -> Self {
        match dynamic {
            Dynamic::Static => DynamicRepr::Flag(false),
            Dynamic::Runtime => DynamicRepr::Flag(true),
            Dynamic::Target(path) => DynamicRepr::Target(path),
        }
    }
}

/// Kind tag of an entry in a package dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefKind {
    Module,
    Class,
    Function,
    Attribute,
    Alias,
}

/// One object (or alias) in a package dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDef {
    pub kind: DefKind,
    #[serde(default)]
    pub docstring: Option<String>,
    #[serde(default)]
    pub members: IndexMap<String, ObjectDef>,
    #[serde(default)]
    pub exports: Option<Vec<String>>,
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub returns: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Aliases only: dotted path of the aliased object
    #[serde(default)]
    pub target_path: Option<String>,
}

/// A root module as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDump {
    pub name: String,
    /// Docstrings only available at import time, keyed by canonical path
    #[serde(default)]
    pub runtime_docstrings: HashMap<String, String>,
    #[serde(flatten)]
    pub module: ObjectDef,
}

impl PackageDump {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Where package dumps come from
pub trait PackageSource: Send + Sync {
    /// Load the dump of a root module, `None` if this source does not have it.
    fn load(&self, root: &str) -> Result<Option<PackageDump>>;
}

/// Finds `<root>.json` dumps under a set of directories
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dirs: Vec<PathBuf>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dirs: vec![dir.into()],
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }
}

impl PackageSource for DirectorySource {
    fn load(&self, root: &str) -> Result<Option<PackageDump>> {
        let file_name = format!("{}.json", root);
        for dir in &self.dirs {
            let found = WalkDir::new(dir)
                .max_depth(3)
                .into_iter()
                .filter_map(|e| e.ok())
                .find(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == file_name);

            if let Some(entry) = found {
                debug!("Reading package data from {}", entry.path().display());
                let dump = PackageDump::from_json(&fs::read_to_string(entry.path())?)?;
                if dump.name != root {
                    return Err(BuildError::Validation(format!(
                        "{} describes package `{}`, expected `{}`",
                        entry.path().display(),
                        dump.name,
                        root
                    )));
                }
                return Ok(Some(dump));
            }
        }
        Ok(None)
    }
}

/// In-memory dumps, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    dumps: HashMap<String, PackageDump>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dump: PackageDump) {
        self.dumps.insert(dump.name.clone(), dump);
    }

    pub fn with_json(mut self, json: &str) -> Result<Self> {
        self.insert(PackageDump::from_json(json)?);
        Ok(self)
    }
}

impl PackageSource for MemorySource {
    fn load(&self, root: &str) -> Result<Option<PackageDump>> {
        Ok(self.dumps.get(root).cloned())
    }
}

/// Resolves import paths to objects and aliases
pub trait ObjectLoader {
    /// Look up `<module>[.<sub>][:<member>[.<submember>...]]`.
    fn resolve(&self, path: &str, dynamic: &Dynamic) -> Result<DocObject>;

    /// Direct members in declaration order.
    fn members(&self, obj: &DocObject) -> Result<IndexMap<String, DocObject>>;

    /// Inherited members followed by direct members.
    fn all_members(&self, obj: &DocObject) -> Result<IndexMap<String, DocObject>>;
}

#[derive(Debug)]
struct AliasEntry {
    name: String,
    target_path: String,
}

#[derive(Debug, Clone)]
enum Entry {
    Object(Arc<Object>),
    Alias(Arc<AliasEntry>),
}

#[derive(Debug)]
struct LoadedModule {
    root: Arc<Object>,
    entries: HashMap<String, Entry>,
    runtime_docstrings: HashMap<String, String>,
}

/// Memoised root modules, keyed by root module name
pub struct ModulesCollection {
    source: Box<dyn PackageSource>,
    parser: Box<dyn DocstringParser>,
    modules: RwLock<HashMap<String, Option<Arc<LoadedModule>>>>,
}

impl ModulesCollection {
    pub fn new(source: impl PackageSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            parser: Box::new(SectionParser::default()),
            modules: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_parser(mut self, parser: impl DocstringParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Names of root modules loaded so far.
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .modules
            .read()
            .iter()
            .filter(|(_, module)| module.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn module(&self, root: &str) -> Result<Option<Arc<LoadedModule>>> {
        if let Some(module) = self.modules.read().get(root) {
            return Ok(module.clone());
        }

        let loaded = match self.source.load(root)? {
            Some(dump) => {
                info!("Loading package data for {}", root);
                Some(Arc::new(self.index(dump)?))
            }
            None => {
                debug!("No package data for {}", root);
                None
            }
        };

        Ok(self
            .modules
            .write()
            .entry(root.to_string())
            .or_insert(loaded)
            .clone())
    }

    fn index(&self, dump: PackageDump) -> Result<LoadedModule> {
        let mut entries = HashMap::new();
        let root = match self.index_def(&dump.name, None, dump.name.clone(), dump.module, &mut entries)? {
            Entry::Object(obj) => obj,
            Entry::Alias(_) => {
                return Err(BuildError::Validation(format!(
                    "Package `{}` must be a module, not an alias",
                    dump.name
                )))
            }
        };
        Ok(LoadedModule {
            root,
            entries,
            runtime_docstrings: dump.runtime_docstrings,
        })
    }

    fn index_def(
        &self,
        name: &str,
        parent_path: Option<&str>,
        path: String,
        def: ObjectDef,
        entries: &mut HashMap<String, Entry>,
    ) -> Result<Entry> {
        let kind = match def.kind {
            DefKind::Alias => {
                let target_path = def.target_path.ok_or_else(|| {
                    BuildError::Validation(format!("Alias `{}` has no target_path", path))
                })?;
                let entry = Entry::Alias(Arc::new(AliasEntry {
                    name: name.to_string(),
                    target_path: dotted_path(&target_path),
                }));
                entries.insert(path, entry.clone());
                return Ok(entry);
            }
            DefKind::Module => ObjectKind::Module,
            DefKind::Class => ObjectKind::Class,
            DefKind::Function => ObjectKind::Function,
            DefKind::Attribute => ObjectKind::Attribute,
        };

        let mut member_names = Vec::with_capacity(def.members.len());
        for (child_name, child) in def.members {
            let child_path = format!("{}.{}", path, child_name);
            self.index_def(&child_name, Some(&path), child_path, child, entries)?;
            member_names.push(child_name);
        }

        let obj = Arc::new(Object {
            kind,
            name: name.to_string(),
            path: path.clone(),
            parent_path: parent_path.map(str::to_string),
            docstring: def
                .docstring
                .map(|raw| Docstring::new(raw, self.parser.as_ref())),
            member_names,
            exports: def.exports,
            bases: def.bases.iter().map(|b| dotted_path(b)).collect(),
            parameters: def.parameters,
            returns: def.returns,
            annotation: def.annotation,
            value: def.value,
            labels: def.labels,
        });
        let entry = Entry::Object(obj);
        entries.insert(path, entry.clone());
        Ok(entry)
    }

    fn entry(&self, path: &str) -> Result<Option<Entry>> {
        Ok(self
            .module(root_module(path))?
            .and_then(|module| module.entries.get(path).cloned()))
    }

    /// Member `name` of `current`, falling back to base classes.
    fn child_entry(&self, current: &Object, name: &str) -> Result<Option<Entry>> {
        if let Some(entry) = self.entry(&format!("{}.{}", current.path, name))? {
            return Ok(Some(entry));
        }
        if current.is_class() {
            for base in self.mro(current) {
                if let Some(entry) = self.entry(&format!("{}.{}", base.path, name))? {
                    return Ok(Some(entry));
                }
            }
        }
        Ok(None)
    }

    /// Walk a dotted path, passing through aliases met along the way.
    ///
    /// An alias in final position is returned as is.
    fn find_entry(&self, path: &str, hops: &mut usize, origin: &str) -> Result<Option<Entry>> {
        let mut segments = path.split('.');
        let Some(root) = segments.next() else {
            return Ok(None);
        };
        let Some(module) = self.module(root)? else {
            return Ok(None);
        };

        let rest: Vec<&str> = segments.collect();
        let mut current = module.root.clone();
        for (i, segment) in rest.iter().enumerate() {
            let last = i + 1 == rest.len();
            match self.child_entry(&current, segment)? {
                None => return Ok(None),
                Some(Entry::Object(obj)) if last => return Ok(Some(Entry::Object(obj))),
                Some(Entry::Object(obj)) => current = obj,
                Some(Entry::Alias(alias)) if last => return Ok(Some(Entry::Alias(alias))),
                Some(Entry::Alias(alias)) => match self.chase(&alias.target_path, hops, origin)? {
                    Some(obj) => current = obj,
                    None => return Ok(None),
                },
            }
        }
        Ok(Some(Entry::Object(current)))
    }

    /// Follow an alias chain to its final object.
    ///
    /// `hops` is shared across nested chases so that a cycle anywhere in the
    /// walk fails after [`MAX_ALIAS_HOPS`].
    fn chase(&self, target_path: &str, hops: &mut usize, origin: &str) -> Result<Option<Arc<Object>>> {
        let mut target = target_path.to_string();
        loop {
            *hops += 1;
            if *hops > MAX_ALIAS_HOPS {
                return Err(BuildError::CyclicAlias {
                    path: origin.to_string(),
                    hops: MAX_ALIAS_HOPS,
                });
            }
            match self.find_entry(&target, hops, origin)? {
                None => {
                    debug!("Alias target {} of {} is not available", target, origin);
                    return Ok(None);
                }
                Some(Entry::Object(obj)) => return Ok(Some(obj)),
                Some(Entry::Alias(alias)) => target = alias.target_path.clone(),
            }
        }
    }

    fn chase_tolerant(&self, target_path: &str, origin: &str) -> Option<Arc<Object>> {
        match self.chase(target_path, &mut 0, origin) {
            Ok(target) => target,
            Err(e) => {
                warn!("Leaving alias {} unresolved: {}", origin, e);
                None
            }
        }
    }

    fn find_object(&self, path: &str) -> Result<Option<Arc<Object>>> {
        let mut hops = 0;
        match self.find_entry(path, &mut hops, path)? {
            Some(Entry::Object(obj)) => Ok(Some(obj)),
            Some(Entry::Alias(alias)) => self.chase(&alias.target_path, &mut hops, path),
            None => Ok(None),
        }
    }

    /// Base classes in depth-first order, each listed once.
    fn mro(&self, class: &Object) -> Vec<Arc<Object>> {
        let mut seen = HashSet::from([class.path.clone()]);
        let mut out = Vec::new();
        self.collect_bases(class, &mut seen, &mut out);
        out
    }

    fn collect_bases(&self, class: &Object, seen: &mut HashSet<String>, out: &mut Vec<Arc<Object>>) {
        for base_path in &class.bases {
            let base = match self.find_object(base_path) {
                Ok(Some(base)) if base.is_class() => base,
                Ok(_) => {
                    warn!("Could not resolve base class {} of {}", base_path, class.path);
                    continue;
                }
                Err(e) => {
                    warn!("Could not resolve base class {} of {}: {}", base_path, class.path, e);
                    continue;
                }
            };
            if seen.insert(base.path.clone()) {
                out.push(base.clone());
                self.collect_bases(&base, seen, out);
            }
        }
    }

    fn member_object(&self, entry: Entry, path: String, parent_path: &str, inherited: bool) -> DocObject {
        match entry {
            Entry::Object(obj) if !inherited => DocObject::Object(obj),
            Entry::Object(obj) => DocObject::Alias(Arc::new(Alias {
                name: obj.name.clone(),
                path,
                parent_path: parent_path.to_string(),
                target_path: obj.path.clone(),
                target: Some(obj),
                inherited,
            })),
            Entry::Alias(alias) => {
                let target = self.chase_tolerant(&alias.target_path, &path);
                DocObject::Alias(Arc::new(Alias {
                    name: alias.name.clone(),
                    path,
                    parent_path: parent_path.to_string(),
                    target_path: alias.target_path.clone(),
                    target,
                    inherited,
                }))
            }
        }
    }

    fn with_runtime_docstring(&self, obj: DocObject) -> Result<DocObject> {
        let Some(target) = obj.target().cloned() else {
            return Ok(obj);
        };
        let Some(module) = self.module(root_module(&target.path))? else {
            return Ok(obj);
        };
        let Some(raw) = module.runtime_docstrings.get(&target.path) else {
            return Ok(obj);
        };

        debug!("Using runtime docstring for {}", target.path);
        let updated = Arc::new(Object {
            docstring: Some(Docstring::new(raw.clone(), self.parser.as_ref())),
            ..(*target).clone()
        });
        Ok(match obj {
            DocObject::Object(_) => DocObject::Object(updated),
            DocObject::Alias(alias) => DocObject::Alias(Arc::new(Alias {
                target: Some(updated),
                ..(*alias).clone()
            })),
        })
    }
}

fn split_last(path: &str) -> (String, String) {
    match path.rsplit_once('.') {
        Some((parent, name)) => (parent.to_string(), name.to_string()),
        None => (String::new(), path.to_string()),
    }
}

impl ObjectLoader for ModulesCollection {
    fn resolve(&self, path: &str, dynamic: &Dynamic) -> Result<DocObject> {
        debug!("Resolving {} ({:?})", path, dynamic);

        if let Dynamic::Target(target) = dynamic {
            let resolved = self.resolve(target, &Dynamic::Static)?;
            let (parent_path, name) = split_last(&dotted_path(path));
            return Ok(DocObject::Alias(Arc::new(Alias {
                name,
                path: dotted_path(path),
                parent_path,
                target_path: resolved.canonical_path().to_string(),
                target: resolved.target().cloned(),
                inherited: false,
            })));
        }

        let dotted = dotted_path(path);
        let mut hops = 0;
        let entry = self
            .find_entry(&dotted, &mut hops, &dotted)?
            .ok_or_else(|| BuildError::ObjectLookup {
                path: path.to_string(),
            })?;

        let (parent_path, name) = split_last(&dotted);
        let obj = match entry {
            Entry::Object(obj) if obj.path == dotted => DocObject::Object(obj),
            Entry::Object(obj) => DocObject::Alias(Arc::new(Alias {
                name,
                path: dotted.clone(),
                parent_path,
                target_path: obj.path.clone(),
                target: Some(obj),
                inherited: false,
            })),
            Entry::Alias(alias) => {
                let target = self.chase(&alias.target_path, &mut hops, &dotted)?;
                DocObject::Alias(Arc::new(Alias {
                    name,
                    path: dotted.clone(),
                    parent_path,
                    target_path: alias.target_path.clone(),
                    target,
                    inherited: false,
                }))
            }
        };

        match dynamic {
            Dynamic::Runtime => self.with_runtime_docstring(obj),
            _ => Ok(obj),
        }
    }

    fn members(&self, obj: &DocObject) -> Result<IndexMap<String, DocObject>> {
        let Some(target) = obj.target() else {
            return Ok(IndexMap::new());
        };

        let mut members = IndexMap::with_capacity(target.member_names.len());
        for name in &target.member_names {
            let path = format!("{}.{}", target.path, name);
            if let Some(entry) = self.entry(&path)? {
                members.insert(name.clone(), self.member_object(entry, path, &target.path, false));
            }
        }
        Ok(members)
    }

    fn all_members(&self, obj: &DocObject) -> Result<IndexMap<String, DocObject>> {
        let Some(target) = obj.target() else {
            return Ok(IndexMap::new());
        };

        let mut members = IndexMap::new();
        if target.is_class() {
            // farthest bases first so nearer ones override them
            for base in self.mro(target).iter().rev() {
                for name in &base.member_names {
                    if let Some(entry) = self.entry(&format!("{}.{}", base.path, name))? {
                        let path = format!("{}.{}", target.path, name);
                        members.insert(name.clone(), self.member_object(entry, path, &base.path, true));
                    }
                }
            }
        }
        for (name, member) in self.members(obj)? {
            members.insert(name, member);
        }
        Ok(members)
    }
}
