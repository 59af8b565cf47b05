//! Typed property accessors.
//!
//! Each element kind carries an [`AccessorTable`] mapping property ids to a
//! getter/setter pair. Properties with no entry fall back to the element's
//! property bag, so only properties with side effects (visibility, styling,
//! activation) need an accessor.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::element::ElementId;
use crate::property::PropertyValue;
use crate::tree::{ElementTree, TreeError};

type GetFn = dyn Fn(&ElementTree, ElementId) -> Result<Option<PropertyValue>, TreeError> + Send + Sync;
type SetFn = dyn Fn(&mut ElementTree, ElementId, Option<PropertyValue>) -> Result<(), TreeError> + Send + Sync;

/// Getter/setter pair for one property.
#[derive(Clone)]
pub struct Accessor {
    get: Arc<GetFn>,
    set: Arc<SetFn>,
}

impl Accessor {
    pub fn new<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&ElementTree, ElementId) -> Result<Option<PropertyValue>, TreeError> + Send + Sync + 'static,
        S: Fn(&mut ElementTree, ElementId, Option<PropertyValue>) -> Result<(), TreeError> + Send + Sync + 'static,
    {
        Self { get: Arc::new(get), set: Arc::new(set) }
    }

    pub fn get(&self, tree: &ElementTree, id: ElementId) -> Result<Option<PropertyValue>, TreeError> {
        (self.get)(tree, id)
    }

    pub fn set(&self, tree: &mut ElementTree, id: ElementId, value: Option<PropertyValue>) -> Result<(), TreeError> {
        (self.set)(tree, id, value)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor")
    }
}

/// Property-id to accessor lookup for one element kind.
#[derive(Debug, Clone, Default)]
pub struct AccessorTable {
    entries: HashMap<String, Accessor>,
}

impl AccessorTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: &str, accessor: Accessor) -> &mut Self {
        self.entries.insert(property.to_string(), accessor);
        self
    }

    #[must_use]
    pub fn get(&self, property: &str) -> Option<&Accessor> {
        self.entries.get(property)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
