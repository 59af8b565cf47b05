//! Deferred-edit stand-ins for elements.
//!
//! An [`ElementProxy`] holds property values in a private cache. Reads and
//! writes touch only the cache; the live tree changes when the proxy is
//! realized (created or removed) and committed (cache flushed to the target).
//! Discarding an edit session is just dropping its proxies.

#[cfg(test)]
#[path = "proxy_test.rs"]
mod proxy_test;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::definition::PluginDefinition;
use crate::element::ElementId;
use crate::property::PropertyValue;
use crate::tree::{ElementTree, TreeError};

/// What a proxy stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyTarget {
    /// An element already in the tree.
    Existing(ElementId),
    /// An element to be created from the proxy's definition on realize.
    Pending,
}

#[derive(Debug, Clone)]
pub struct ElementProxy {
    definition: Arc<PluginDefinition>,
    target: ProxyTarget,
    cache: BTreeMap<String, PropertyValue>,
    deleted: bool,
}

impl ElementProxy {
    /// Proxy for an existing element, with its current values cached.
    pub fn for_element(tree: &ElementTree, id: ElementId) -> Result<Self, TreeError> {
        let element = tree.get(id).ok_or(TreeError::NotFound(id))?;
        let mut proxy = Self {
            definition: Arc::clone(element.definition()),
            target: ProxyTarget::Existing(id),
            cache: BTreeMap::new(),
            deleted: false,
        };
        proxy.revert(tree);
        Ok(proxy)
    }

    /// Proxy for an element not yet created, with declared defaults cached.
    #[must_use]
    pub fn for_definition(tree: &ElementTree, definition: Arc<PluginDefinition>) -> Self {
        let mut proxy = Self { definition, target: ProxyTarget::Pending, cache: BTreeMap::new(), deleted: false };
        proxy.revert(tree);
        proxy
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<PluginDefinition> {
        &self.definition
    }

    #[must_use]
    pub fn target(&self) -> ProxyTarget {
        self.target
    }

    /// The live element, once there is one.
    #[must_use]
    pub fn element(&self) -> Option<ElementId> {
        match self.target {
            ProxyTarget::Existing(id) => Some(id),
            ProxyTarget::Pending => None,
        }
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }

    /// Cached value of `property`.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.cache.get(property)
    }

    /// Cache a value, returning the previous one. The target is untouched.
    pub fn set(&mut self, property: &str, value: Option<PropertyValue>) -> Option<PropertyValue> {
        match value {
            Some(v) => self.cache.insert(property.to_string(), v),
            None => self.cache.remove(property),
        }
    }

    /// Reload the cache from the target, or from declared defaults when pending.
    pub fn revert(&mut self, tree: &ElementTree) {
        self.cache.clear();
        let types = tree.catalog().property_types();
        for info in self.definition.properties() {
            let value = match self.target {
                ProxyTarget::Existing(id) => tree.property_value(id, info),
                ProxyTarget::Pending => info
                    .parsed_default(types)
                    .map_err(|source| TreeError::Property { property: info.id().to_string(), source }),
            };
            match value {
                Ok(Some(v)) => {
                    self.cache.insert(info.id().to_string(), v);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, property = info.id(), definition = self.definition.id(), "failed to load proxy value");
                }
            }
        }
    }

    /// Bring the tree in line with the proxy's lifecycle state: create the
    /// element under `parent` when pending, or remove it when deleted.
    pub fn realize(&mut self, tree: &mut ElementTree, parent: ElementId) -> Result<(), TreeError> {
        match (self.deleted, self.target) {
            (false, ProxyTarget::Pending) => {
                let id = tree
                    .create_element(self.definition.id(), Some(parent), None, false)?
                    .ok_or_else(|| TreeError::CreateFailed(self.definition.id().to_string()))?;
                self.target = ProxyTarget::Existing(id);
            }
            (true, ProxyTarget::Existing(id)) => {
                tree.remove(id, true)?;
                self.target = ProxyTarget::Pending;
            }
            _ => {}
        }
        Ok(())
    }

    /// Write every cached property onto the realized target.
    ///
    /// A property that fails to apply does not stop the others; the failures
    /// are reported together once all properties were attempted.
    pub fn commit(&self, tree: &mut ElementTree) -> Result<(), TreeError> {
        let (false, ProxyTarget::Existing(id)) = (self.deleted, self.target) else {
            return Ok(());
        };
        let mut errors = Vec::new();
        for info in self.definition.properties() {
            if let Err(e) = tree.set_property_value(id, info, self.cache.get(info.id()).cloned()) {
                tracing::warn!(error = %e, property = info.id(), element = %id, "failed to commit property");
                errors.push(e);
            }
        }
        TreeError::aggregate(self.definition.name(), errors).map_or(Ok(()), Err)
    }
}
