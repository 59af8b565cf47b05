//! The injected bundle of per-type metadata an element tree consults.
//!
//! A [`Catalog`] owns the [`Schema`] (kinds and cardinalities), the
//! [`PluginRegistry`] (definitions), the [`PropertyTypeRegistry`], and the
//! per-kind accessor tables and behaviors. It is built once, wrapped in an
//! `Arc`, and handed to every [`ElementTree`](crate::tree::ElementTree).

use std::collections::HashMap;
use std::sync::Arc;

use crate::access::{Accessor, AccessorTable};
use crate::definition::{PluginDefinition, PluginRegistry};
use crate::element::Behavior;
use crate::property::PropertyTypeRegistry;
use crate::schema::{Schema, SchemaError};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schema: Schema,
    plugins: PluginRegistry,
    property_types: PropertyTypeRegistry,
    accessors: HashMap<String, AccessorTable>,
    behaviors: HashMap<String, Behavior>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind, optionally fixing the behavior its elements get.
    pub fn register_kind(
        &mut self,
        kind: &str,
        supertype: Option<&str>,
        behavior: Option<Behavior>,
    ) -> Result<(), SchemaError> {
        self.schema.register_kind(kind, supertype)?;
        if let Some(behavior) = behavior {
            self.behaviors.insert(kind.to_string(), behavior);
        }
        Ok(())
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    #[must_use]
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
        &mut self.plugins
    }

    #[must_use]
    pub fn property_types(&self) -> &PropertyTypeRegistry {
        &self.property_types
    }

    pub fn property_types_mut(&mut self) -> &mut PropertyTypeRegistry {
        &mut self.property_types
    }

    #[must_use]
    pub fn definition(&self, id: &str) -> Option<&Arc<PluginDefinition>> {
        self.plugins.get(id)
    }

    /// Behavior of the nearest ancestor kind that declares one.
    #[must_use]
    pub fn behavior(&self, kind: &str) -> Behavior {
        self.schema
            .lineage(kind)
            .find_map(|k| self.behaviors.get(k).copied())
            .unwrap_or_default()
    }

    /// Accessor table for `kind`, created on first use.
    pub fn accessors_mut(&mut self, kind: &str) -> &mut AccessorTable {
        self.accessors.entry(kind.to_string()).or_default()
    }

    /// Accessor for `property`, searching `kind` and then its supertypes.
    #[must_use]
    pub fn accessor(&self, kind: &str, property: &str) -> Option<&Accessor> {
        self.schema
            .lineage(kind)
            .find_map(|k| self.accessors.get(k).and_then(|t| t.get(property)))
    }

    /// Human label for a kind: the name of its first definition, else the tag.
    #[must_use]
    pub fn kind_label(&self, kind: &str) -> String {
        self.plugins
            .for_kind(kind)
            .map_or_else(|| kind.to_string(), |d| d.name().to_string())
    }

    /// Consistency problems between definitions, kinds, and property types.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for def in self.plugins.iter() {
            if !self.schema.is_registered(def.kind()) {
                problems.push(format!("{}: unknown element kind '{}'", def.id(), def.kind()));
            }
            for property in def.unresolved_properties(&self.property_types) {
                problems.push(format!("{}: property '{property}' has an unknown type", def.id()));
            }
        }
        problems
    }
}
