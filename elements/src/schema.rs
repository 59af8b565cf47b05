//! Kind hierarchy and parent/child cardinality tables.
//!
//! DESIGN
//! ======
//! Every element kind is a string tag with an optional supertype. Relations
//! are registered per source kind and looked up by walking the source kind's
//! supertype chain until a registered entry is found, so a kind inherits the
//! relations of its nearest registered ancestor. A registered target matches
//! any kind that `is_a` that target.
//!
//! The schema is built once at startup and shared read-only through the
//! [`Catalog`](crate::catalog::Catalog); nothing here is process-global.

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;

use std::collections::HashMap;

/// Maximum-occurrence value meaning "no limit".
pub const UNBOUNDED: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown element kind: {0}")]
    UnknownKind(String),
    #[error("element kind already registered: {0}")]
    DuplicateKind(String),
}

/// Allowed relation between a source kind and a target kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cardinality {
    pub source: String,
    pub target: String,
    pub max: usize,
}

impl Cardinality {
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.max == UNBOUNDED
    }
}

/// All relations registered for one source kind, plus their summed maximum.
#[derive(Debug, Clone, Default)]
pub struct Cardinalities {
    entries: Vec<Cardinality>,
    total: usize,
}

impl Cardinalities {
    fn add(&mut self, cardinality: Cardinality) {
        self.total = if cardinality.is_unbounded() || self.total == UNBOUNDED {
            UNBOUNDED
        } else {
            self.total.saturating_add(cardinality.max)
        };
        self.entries.push(cardinality);
    }

    /// Sum of all maximum occurrences, saturating to [`UNBOUNDED`].
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cardinality> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Default)]
struct RelationMap {
    map: HashMap<String, Cardinalities>,
}

impl RelationMap {
    fn register(&mut self, source: &str, target: &str, max: usize) {
        self.map.entry(source.to_string()).or_default().add(Cardinality {
            source: source.to_string(),
            target: target.to_string(),
            max,
        });
    }
}

/// Registry of element kinds and their allowed relations.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    supertypes: HashMap<String, Option<String>>,
    children: RelationMap,
    parents: RelationMap,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind. The supertype, when given, must already be registered.
    pub fn register_kind(&mut self, kind: &str, supertype: Option<&str>) -> Result<(), SchemaError> {
        if self.supertypes.contains_key(kind) {
            return Err(SchemaError::DuplicateKind(kind.to_string()));
        }
        if let Some(sup) = supertype {
            self.require(sup)?;
        }
        self.supertypes.insert(kind.to_string(), supertype.map(str::to_string));
        Ok(())
    }

    #[must_use]
    pub fn is_registered(&self, kind: &str) -> bool {
        self.supertypes.contains_key(kind)
    }

    #[must_use]
    pub fn supertype(&self, kind: &str) -> Option<&str> {
        self.supertypes.get(kind).and_then(|s| s.as_deref())
    }

    /// The kind itself followed by each of its supertypes, nearest first.
    pub fn lineage<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        std::iter::successors(Some(kind), move |k| self.supertype(k))
    }

    /// True when `kind` equals `ancestor` or inherits from it.
    #[must_use]
    pub fn is_a(&self, kind: &str, ancestor: &str) -> bool {
        self.lineage(kind).any(|k| k == ancestor)
    }

    /// Allow up to `max` children of kind `target` under a `source`.
    pub fn register_allowed_child(&mut self, source: &str, target: &str, max: usize) -> Result<(), SchemaError> {
        self.require(source)?;
        self.require(target)?;
        self.children.register(source, target, max);
        Ok(())
    }

    /// Allow a `source` to be placed under a parent of kind `target`.
    pub fn register_allowed_parent(&mut self, source: &str, target: &str, max: usize) -> Result<(), SchemaError> {
        self.require(source)?;
        self.require(target)?;
        self.parents.register(source, target, max);
        Ok(())
    }

    #[must_use]
    pub fn child_cardinalities(&self, kind: &str) -> Option<&Cardinalities> {
        self.lookup(&self.children, kind)
    }

    #[must_use]
    pub fn parent_cardinalities(&self, kind: &str) -> Option<&Cardinalities> {
        self.lookup(&self.parents, kind)
    }

    /// First child relation of `source` whose target `child` satisfies.
    #[must_use]
    pub fn child_cardinality(&self, source: &str, child: &str) -> Option<&Cardinality> {
        self.child_cardinalities(source)?
            .iter()
            .find(|c| self.is_a(child, &c.target))
    }

    /// First parent relation of `source` whose target `parent` satisfies.
    #[must_use]
    pub fn parent_cardinality(&self, source: &str, parent: &str) -> Option<&Cardinality> {
        self.parent_cardinalities(source)?
            .iter()
            .find(|c| self.is_a(parent, &c.target))
    }

    /// Total number of children a `kind` may hold; zero for leaves.
    #[must_use]
    pub fn max_children(&self, kind: &str) -> usize {
        self.child_cardinalities(kind).map_or(0, Cardinalities::total)
    }

    #[must_use]
    pub fn is_container(&self, kind: &str) -> bool {
        self.max_children(kind) > 0
    }

    /// True when a `kind` may be placed under some parent.
    #[must_use]
    pub fn has_parents(&self, kind: &str) -> bool {
        self.parent_cardinalities(kind).is_some_and(|c| c.total() > 0)
    }

    fn lookup<'a>(&'a self, relations: &'a RelationMap, kind: &str) -> Option<&'a Cardinalities> {
        self.lineage(kind).find_map(|k| relations.map.get(k))
    }

    fn require(&self, kind: &str) -> Result<(), SchemaError> {
        if self.supertypes.contains_key(kind) {
            Ok(())
        } else {
            Err(SchemaError::UnknownKind(kind.to_string()))
        }
    }
}
