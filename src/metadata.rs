//! Metadata objects that templates are expanded against.
//!
//! A [`Catalog`] owns every object in an arena; templates only ever see a
//! borrowed [`ObjectRef`]. The set of object kinds is closed, and the
//! collections a kind owns are queried through [`ObjectKind::child_kinds`]
//! rather than by inspecting concrete types.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Every kind of object a catalog may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Server,
    Database,
    Table,
    View,
    Procedure,
    Trigger,
    Generator,
    Domain,
    Exception,
    Function,
    Index,
    Column,
    Parameter,
    Role,
    User,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 15] = [
        ObjectKind::Server,
        ObjectKind::Database,
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::Procedure,
        ObjectKind::Trigger,
        ObjectKind::Generator,
        ObjectKind::Domain,
        ObjectKind::Exception,
        ObjectKind::Function,
        ObjectKind::Index,
        ObjectKind::Column,
        ObjectKind::Parameter,
        ObjectKind::Role,
        ObjectKind::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Server => "server",
            ObjectKind::Database => "database",
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Procedure => "procedure",
            ObjectKind::Trigger => "trigger",
            ObjectKind::Generator => "generator",
            ObjectKind::Domain => "domain",
            ObjectKind::Exception => "exception",
            ObjectKind::Function => "function",
            ObjectKind::Index => "index",
            ObjectKind::Column => "column",
            ObjectKind::Parameter => "parameter",
            ObjectKind::Role => "role",
            ObjectKind::User => "user",
        }
    }

    /// Kinds of the collections an object of this kind owns.
    pub fn child_kinds(&self) -> &'static [ObjectKind] {
        match self {
            ObjectKind::Server => &[ObjectKind::Database, ObjectKind::User],
            ObjectKind::Database => &[
                ObjectKind::Table,
                ObjectKind::View,
                ObjectKind::Procedure,
                ObjectKind::Trigger,
                ObjectKind::Generator,
                ObjectKind::Domain,
                ObjectKind::Exception,
                ObjectKind::Function,
                ObjectKind::Role,
            ],
            ObjectKind::Table => &[ObjectKind::Column, ObjectKind::Index, ObjectKind::Trigger],
            ObjectKind::View => &[ObjectKind::Column, ObjectKind::Trigger],
            ObjectKind::Procedure | ObjectKind::Function => &[ObjectKind::Parameter],
            _ => &[],
        }
    }

    pub fn has_collection(&self, kind: ObjectKind) -> bool {
        self.child_kinds().contains(&kind)
    }

    /// Maps a collection name as written in templates (`column`, `columns`,
    /// `indices`, ...) to the kind of its members.
    pub fn from_collection(name: &str) -> Option<ObjectKind> {
        let name = name.trim().to_lowercase();
        let singular = match name.as_str() {
            "indices" | "indexes" => "index",
            other => other.strip_suffix('s').unwrap_or(other),
        };
        singular.parse().ok()
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ObjectKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::CatalogError(format!("unknown object kind '{s}'")))
    }
}

/// Index of an object inside its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

/// Serialized form of one object and its subtree.
#[derive(Debug, Deserialize)]
struct ObjectSpec {
    kind: ObjectKind,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    system: bool,
    #[serde(default)]
    properties: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    children: Vec<ObjectSpec>,
}

#[derive(Debug)]
struct Node {
    kind: ObjectKind,
    name: String,
    description: Option<String>,
    system: bool,
    properties: IndexMap<String, String>,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
}

/// Arena of metadata objects rooted at a single object.
#[derive(Debug)]
pub struct Catalog {
    nodes: Vec<Node>,
}

impl Catalog {
    /// Loads a catalog document (JSON or YAML) from `path`.
    ///
    /// # Errors
    /// * `Error::IoError` if the file cannot be read
    /// * `Error::CatalogError` if the document is malformed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading catalog from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(Error::IoError)?;
        content.parse()
    }

    pub fn root(&self) -> ObjectRef<'_> {
        ObjectRef { catalog: self, id: ObjectId(0) }
    }

    pub fn get(&self, id: ObjectId) -> Option<ObjectRef<'_>> {
        (id.0 < self.nodes.len()).then_some(ObjectRef { catalog: self, id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolves a `/`-separated path of names below the root.
    /// The empty path resolves to the root itself.
    pub fn resolve(&self, path: &str) -> Result<ObjectRef<'_>> {
        let mut current = self.root();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .children()
                .find(|child| child.name() == segment)
                .ok_or_else(|| Error::ObjectNotFoundError { path: path.to_string() })?;
        }
        Ok(current)
    }

    fn insert(&mut self, spec: ObjectSpec, parent: Option<ObjectId>) -> ObjectId {
        let id = ObjectId(self.nodes.len());
        let properties = spec
            .properties
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect();
        self.nodes.push(Node {
            kind: spec.kind,
            name: spec.name,
            description: spec.description,
            system: spec.system,
            properties,
            parent,
            children: Vec::new(),
        });
        for child in spec.children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }
}

impl FromStr for Catalog {
    type Err = Error;

    /// Parses a catalog document, trying JSON first and YAML second.
    fn from_str(content: &str) -> Result<Self> {
        let spec: ObjectSpec = match serde_json::from_str(content) {
            Ok(spec) => spec,
            Err(_) => serde_yaml::from_str(content)
                .map_err(|e| Error::CatalogError(format!("Invalid catalog format: {e}")))?,
        };
        let mut catalog = Catalog { nodes: Vec::new() };
        catalog.insert(spec, None);
        Ok(catalog)
    }
}

/// Borrowed handle to one object of a catalog.
#[derive(Clone, Copy)]
pub struct ObjectRef<'a> {
    catalog: &'a Catalog,
    id: ObjectId,
}

impl<'a> ObjectRef<'a> {
    fn node(&self) -> &'a Node {
        &self.catalog.nodes[self.id.0]
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.node().kind
    }

    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    pub fn description(&self) -> Option<&'a str> {
        self.node().description.as_deref()
    }

    pub fn is_system(&self) -> bool {
        self.node().system
    }

    pub fn property(&self, key: &str) -> Option<&'a str> {
        self.node().properties.get(key).map(String::as_str)
    }

    pub fn parent(&self) -> Option<ObjectRef<'a>> {
        self.node()
            .parent
            .map(|id| ObjectRef { catalog: self.catalog, id })
    }

    pub fn children(&self) -> impl Iterator<Item = ObjectRef<'a>> + 'a {
        let catalog = self.catalog;
        self.node()
            .children
            .iter()
            .map(move |&id| ObjectRef { catalog, id })
    }

    /// Children of the given kind, or nothing when this kind does not own
    /// such a collection.
    pub fn children_of(&self, kind: ObjectKind) -> Vec<ObjectRef<'a>> {
        if !self.kind().has_collection(kind) {
            return Vec::new();
        }
        self.children().filter(|child| child.kind() == kind).collect()
    }

    /// Names from below the root down to this object, `/`-separated.
    pub fn path(&self) -> String {
        let mut names = Vec::new();
        let mut current = Some(*self);
        while let Some(object) = current {
            if object.parent().is_some() {
                names.push(object.name());
            }
            current = object.parent();
        }
        names.reverse();
        names.join("/")
    }
}

impl fmt::Debug for ObjectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

impl PartialEq for ObjectRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.catalog, other.catalog) && self.id == other.id
    }
}

