//! Plugin definitions and the registry that looks them up.
//!
//! A [`PluginDefinition`] is the immutable per-type metadata behind every
//! element: display name, designer category, element kind, declared
//! properties, resources, and access rules. Definitions whose id starts with
//! `_` are internal; the designer hides them and never moves or deletes them.

#[cfg(test)]
#[path = "definition_test.rs"]
mod definition_test;

use std::collections::HashMap;
use std::sync::Arc;

use crate::property::{PropertyInfo, PropertyTypeRegistry};

/// Separator between levels of a designer category path.
pub const CATEGORY_SEPARATOR: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("plugin definition already registered: {0}")]
    Duplicate(String),
    #[error("plugin definition has an empty id")]
    EmptyId,
}

/// Capability check for the current user.
pub trait RoleCheck {
    fn has_role(&self, role: &str) -> bool;
}

/// Grants every role.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl RoleCheck for AllowAll {
    fn has_role(&self, _role: &str) -> bool {
        true
    }
}

/// A shell resource contributed by a plugin while it is alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginResource {
    Button { caption: String, action: String },
    Menu { path: String, action: String },
    Help { topic: String },
    Style { url: String },
    Bean { id: String },
    Command { name: String },
}

#[derive(Debug, Clone)]
pub struct PluginDefinition {
    id: String,
    name: String,
    kind: String,
    description: Option<String>,
    category: Option<String>,
    creator: Option<String>,
    version: Option<String>,
    icon: Option<String>,
    properties: Vec<PropertyInfo>,
    resources: Vec<PluginResource>,
    authorities: Vec<String>,
    requires_all: bool,
    disabled: bool,
    lazy_load: bool,
}

impl PluginDefinition {
    #[must_use]
    pub fn new(id: &str, name: &str, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            description: None,
            category: None,
            creator: None,
            version: None,
            icon: None,
            properties: Vec::new(),
            resources: Vec::new(),
            authorities: Vec::new(),
            requires_all: false,
            disabled: false,
            lazy_load: false,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    #[must_use]
    pub fn with_creator(mut self, creator: &str) -> Self {
        self.creator = Some(creator.to_string());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: PropertyInfo) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: impl IntoIterator<Item = PropertyInfo>) -> Self {
        self.properties.extend(properties);
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource: PluginResource) -> Self {
        self.resources.push(resource);
        self
    }

    #[must_use]
    pub fn with_authority(mut self, role: &str) -> Self {
        self.authorities.push(role.to_string());
        self
    }

    /// Require every listed authority instead of any one of them.
    #[must_use]
    pub fn requiring_all(mut self) -> Self {
        self.requires_all = true;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.lazy_load = true;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element kind this definition instantiates.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, id: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.id() == id)
    }

    #[must_use]
    pub fn resources(&self) -> &[PluginResource] {
        &self.resources
    }

    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.id.starts_with('_')
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn is_lazy_load(&self) -> bool {
        self.lazy_load
    }

    /// True when the current user lacks the required authorities.
    #[must_use]
    pub fn is_forbidden(&self, roles: &dyn RoleCheck) -> bool {
        if self.authorities.is_empty() {
            return false;
        }
        if self.requires_all {
            !self.authorities.iter().all(|r| roles.has_role(r))
        } else {
            !self.authorities.iter().any(|r| roles.has_role(r))
        }
    }

    #[must_use]
    pub fn has_editable_properties(&self) -> bool {
        self.properties.iter().any(PropertyInfo::is_editable)
    }

    /// Category split into its path levels, empty when uncategorized.
    #[must_use]
    pub fn category_path(&self) -> Vec<&str> {
        self.category
            .as_deref()
            .map(|c| {
                c.split(CATEGORY_SEPARATOR)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of properties whose type cannot be resolved.
    #[must_use]
    pub fn unresolved_properties(&self, types: &PropertyTypeRegistry) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|p| p.property_type(types).is_err())
            .map(PropertyInfo::id)
            .collect()
    }
}

/// Definitions indexed by id, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    by_id: HashMap<String, Arc<PluginDefinition>>,
    order: Vec<Arc<PluginDefinition>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: PluginDefinition) -> Result<Arc<PluginDefinition>, DefinitionError> {
        if definition.id.is_empty() {
            return Err(DefinitionError::EmptyId);
        }
        if self.by_id.contains_key(&definition.id) {
            return Err(DefinitionError::Duplicate(definition.id));
        }
        let definition = Arc::new(definition);
        self.by_id.insert(definition.id.clone(), Arc::clone(&definition));
        self.order.push(Arc::clone(&definition));
        Ok(definition)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<PluginDefinition>> {
        self.by_id.get(id)
    }

    /// First definition registered for `kind`; its name labels the kind.
    #[must_use]
    pub fn for_kind(&self, kind: &str) -> Option<&Arc<PluginDefinition>> {
        self.order.iter().find(|d| d.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PluginDefinition>> {
        self.order.iter()
    }

    /// Definitions sorted case-insensitively by display name.
    #[must_use]
    pub fn sorted_by_name(&self) -> Vec<&Arc<PluginDefinition>> {
        let mut defs: Vec<_> = self.order.iter().collect();
        defs.sort_by_key(|d| d.name.to_lowercase());
        defs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
