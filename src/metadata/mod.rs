//! Lazily filled catalog cache.
//!
//! One tree per [`ObjectType`], each `catalog -> schema -> object -> column`.
//! Keys are the lower-cased escaped names; entries keep the original casing.
//! Every level records whether it was ever filled, so "never asked" and
//! "asked, nothing there" stay distinguishable (see [`Lookup`]).
//!
//! The cache never talks to the driver. Callers query on [`Lookup::Unqueried`]
//! and hand the answer to the matching `extend_*`.

use std::fmt;
use std::sync::Mutex;

use crate::driver::ForeignKeyRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Table,
    View,
    Function,
    Datatype,
}

impl ObjectType {
    pub const ALL: [ObjectType; 4] = [
        ObjectType::Table,
        ObjectType::View,
        ObjectType::Function,
        ObjectType::Datatype,
    ];

    fn index(self) -> usize {
        match self {
            ObjectType::Table => 0,
            ObjectType::View => 1,
            ObjectType::Function => 2,
            ObjectType::Datatype => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Table => "table",
            ObjectType::View => "view",
            ObjectType::Function => "function",
            ObjectType::Datatype => "datatype",
        }
    }

    /// Map a driver table-type string (`TABLE`, `VIEW`, `SYSTEM TABLE`...).
    pub fn from_table_kind(kind: &str) -> Self {
        if kind.to_uppercase().contains("VIEW") {
            ObjectType::View
        } else {
            ObjectType::Table
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The parent path is not in the cache.
    Missing,
    /// The parent exists but its children were never fetched.
    Unqueried,
    /// Children as last stored; may be empty.
    Loaded(Vec<T>),
}

impl<T> Lookup<T> {
    /// `None` for a missing parent, an empty list when never fetched.
    pub fn names(self) -> Option<Vec<T>> {
        match self {
            Lookup::Missing => None,
            Lookup::Unqueried => Some(Vec::new()),
            Lookup::Loaded(v) => Some(v),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Lookup::Loaded(_))
    }
}

/// Column entry; the name is stored escaped.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub type_name: String,
    pub has_default: bool,
    pub default: Option<String>,
    pub foreign_keys: Vec<ForeignKeyRow>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            has_default: false,
            default: None,
            foreign_keys: Vec::new(),
        }
    }
}

struct Level<C> {
    loaded: bool,
    entries: Vec<(String, C)>,
}

impl<C> Default for Level<C> {
    fn default() -> Self {
        Self {
            loaded: false,
            entries: Vec::new(),
        }
    }
}

impl<C> Level<C> {
    fn get(&self, name: &str) -> Option<&C> {
        let key = name.to_lowercase();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, c)| c)
    }
}

struct Entry<C> {
    name: String,
    children: Level<C>,
}

impl<C> Entry<C> {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Level::default(),
        }
    }
}

impl<C> Level<Entry<C>> {
    fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(_, e)| e.name.clone()).collect()
    }

    fn ensure(&mut self, name: &str) -> &mut Entry<C> {
        let key = name.to_lowercase();
        let idx = match self.entries.iter().position(|(k, _)| *k == key) {
            Some(idx) => idx,
            None => {
                self.entries.push((key, Entry::new(name)));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    /// Replace the entry list, keeping the children of names that remain.
    fn replace(&mut self, names: &[String], with_blank: bool) {
        let mut old = std::mem::take(&mut self.entries);
        let blank = [String::new()];
        let extra = if with_blank && !names.is_empty() { &blank[..] } else { &blank[..0] };
        for name in names.iter().chain(extra) {
            let key = name.to_lowercase();
            if self.entries.iter().any(|(k, _)| *k == key) {
                continue;
            }
            let entry = match old.iter().position(|(k, _)| *k == key) {
                Some(i) => {
                    let (_, mut entry) = old.swap_remove(i);
                    entry.name = name.clone();
                    entry
                }
                None => Entry::new(name),
            };
            self.entries.push((key, entry));
        }
        self.loaded = true;
    }
}

type ObjectEntry = Entry<ColumnMetadata>;
type SchemaEntry = Entry<ObjectEntry>;
type CatalogEntry = Entry<SchemaEntry>;

#[derive(Default)]
struct TypeTree {
    catalogs: Level<CatalogEntry>,
}

#[derive(Default)]
struct CacheState {
    trees: [TypeTree; 4],
}

impl CacheState {
    fn tree(&self, otype: ObjectType) -> &TypeTree {
        &self.trees[otype.index()]
    }

    fn objects(&self, catalog: &str, schema: &str, otype: ObjectType) -> Option<&Level<ObjectEntry>> {
        self.tree(otype)
            .catalogs
            .get(catalog)?
            .children
            .get(schema)
            .map(|s| &s.children)
    }
}

/// Per-session metadata cache; every method takes the single internal lock.
#[derive(Default)]
pub struct MetadataCache {
    state: Mutex<CacheState>,
}

impl fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache").finish_non_exhaustive()
    }
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        *self.state.lock().unwrap() = CacheState::default();
    }

    pub fn get_catalogs(&self) -> Lookup<String> {
        let state = self.state.lock().unwrap();
        let catalogs = &state.tree(ObjectType::Table).catalogs;
        if catalogs.loaded {
            Lookup::Loaded(catalogs.names())
        } else {
            Lookup::Unqueried
        }
    }

    pub fn get_schemas(&self, catalog: &str) -> Lookup<String> {
        let state = self.state.lock().unwrap();
        match state.tree(ObjectType::Table).catalogs.get(catalog) {
            None => Lookup::Missing,
            Some(c) if !c.children.loaded => Lookup::Unqueried,
            Some(c) => Lookup::Loaded(c.children.names()),
        }
    }

    pub fn get_objects(&self, catalog: &str, schema: &str, otype: ObjectType) -> Lookup<String> {
        let state = self.state.lock().unwrap();
        let Some(cat) = state.tree(otype).catalogs.get(catalog) else {
            return Lookup::Missing;
        };
        match cat.children.get(schema) {
            // Unqualified objects of a known catalog are always worth asking for.
            None if schema.is_empty() => Lookup::Unqueried,
            None => Lookup::Missing,
            Some(s) if !s.children.loaded => Lookup::Unqueried,
            Some(s) => Lookup::Loaded(s.children.names()),
        }
    }

    pub fn get_columns(
        &self,
        catalog: &str,
        schema: &str,
        object: &str,
        otype: ObjectType,
    ) -> Lookup<ColumnMetadata> {
        let state = self.state.lock().unwrap();
        let Some(objects) = state.objects(catalog, schema, otype) else {
            return Lookup::Missing;
        };
        match objects.get(object) {
            None => Lookup::Missing,
            Some(o) if !o.children.loaded => Lookup::Unqueried,
            Some(o) => Lookup::Loaded(o.children.entries.iter().map(|(_, c)| c.clone()).collect()),
        }
    }

    /// Store the catalog list. A non-empty list gains the `""` catalog.
    pub fn extend_catalogs(&self, names: &[String]) {
        let mut state = self.state.lock().unwrap();
        for tree in state.trees.iter_mut() {
            tree.catalogs.replace(names, true);
        }
    }

    /// Store the schemas of `catalog` for every object type.
    pub fn extend_schemas(&self, catalog: &str, names: &[String]) {
        let mut state = self.state.lock().unwrap();
        for tree in state.trees.iter_mut() {
            tree.catalogs.ensure(catalog).children.replace(names, true);
        }
    }

    /// Store the objects of one type under `catalog.schema`.
    pub fn extend_objects(&self, catalog: &str, schema: &str, otype: ObjectType, names: &[String]) {
        let mut state = self.state.lock().unwrap();
        for tree in state.trees.iter_mut() {
            tree.catalogs.ensure(catalog).children.ensure(schema);
        }
        state.trees[otype.index()]
            .catalogs
            .ensure(catalog)
            .children
            .ensure(schema)
            .children
            .replace(names, false);
    }

    pub fn extend_columns(
        &self,
        catalog: &str,
        schema: &str,
        object: &str,
        otype: ObjectType,
        columns: Vec<ColumnMetadata>,
    ) {
        let mut state = self.state.lock().unwrap();
        let level = &mut state.trees[otype.index()]
            .catalogs
            .ensure(catalog)
            .children
            .ensure(schema)
            .children
            .ensure(object)
            .children;
        level.entries = Vec::new();
        for column in columns {
            let key = column.name.to_lowercase();
            if level.entries.iter().any(|(k, _)| *k == key) {
                continue;
            }
            level.entries.push((key, column));
        }
        level.loaded = true;
    }
}
