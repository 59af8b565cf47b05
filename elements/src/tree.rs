//! Arena-backed element tree: structure, cardinality checks, lifecycle hooks,
//! activation, design mode, and property access.
//!
//! DESIGN
//! ======
//! Elements are stored in slots addressed by generational [`ElementId`]s.
//! Parent/child links are ids, and the widget-to-element lookup is a side map
//! owned by the tree, so no element holds a reference to another.
//!
//! Every structural mutation is validated before anything changes: a child is
//! only attached when both the child accepts the parent and the parent accepts
//! the child. Failed checks leave the reason on the element that rejected
//! (see [`ElementTree::reject_reason`]) and surface as
//! [`TreeError::Constraint`].
//!
//! Notifications are not dispatched inline. Each mutation appends a
//! [`TreeEvent`] to a queue that the owner drains on its next turn.
//!
//! Kind-specific behavior is selected by [`Behavior`] and dispatched by
//! `match` inside the hook methods (`before_add_child`, `after_add_child`,
//! `after_remove_child`, `after_move_child`, `activate_children`,
//! `update_state`).

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::definition::{AllowAll, PluginDefinition, RoleCheck};
use crate::element::{Behavior, Element, ElementId};
use crate::property::{PropertyError, PropertyInfo, PropertyValue};
use crate::toolkit::{Toolkit, WidgetId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// A structural rule rejected the operation; carries the reject reason.
    #[error("{0}")]
    Constraint(String),
    #[error("element not found: {0}")]
    NotFound(ElementId),
    #[error("unknown plugin definition: {0}")]
    UnknownDefinition(String),
    #[error("unknown property '{property}' on {definition}")]
    UnknownProperty { definition: String, property: String },
    #[error("Cannot modify plugin definition.")]
    DefinitionLocked,
    #[error("Element has no parent.")]
    NoParent,
    #[error("Failed to create UI element {0}.")]
    CreateFailed(String),
    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("property '{property}': {source}")]
    Property {
        property: String,
        #[source]
        source: PropertyError,
    },
    /// Several failures while building one subtree; the first one seen is kept.
    #[error("{count} failures while building {definition}; first: {first}")]
    Aggregate {
        definition: String,
        count: usize,
        #[source]
        first: Box<TreeError>,
    },
}

impl TreeError {
    /// Fold collected failures into one error. A single failure is returned as is.
    #[must_use]
    pub fn aggregate(definition: &str, errors: Vec<TreeError>) -> Option<Self> {
        let count = errors.len();
        let mut errors = errors.into_iter();
        let first = errors.next()?;
        if count == 1 {
            return Some(first);
        }
        Some(Self::Aggregate { definition: definition.to_string(), count, first: Box::new(first) })
    }
}

/// Deferred notification produced by a tree mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    Created { id: ElementId, definition: String },
    Initialized { id: ElementId },
    ChildAdded { parent: ElementId, child: ElementId },
    ChildRemoved { parent: ElementId, child: ElementId },
    ChildMoved { parent: ElementId, child: ElementId, from: usize, to: usize },
    Destroyed { id: ElementId, definition: String },
    Activated { id: ElementId, active: bool },
    PropertyChanged { id: ElementId, property: String },
    DesignModeChanged { id: ElementId, design_mode: bool },
    ResourcesRegistered { id: ElementId, count: usize },
    ResourcesReleased { id: ElementId, count: usize },
}

impl TreeEvent {
    /// True for events that change the shape of the tree.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ChildAdded { .. } | Self::ChildRemoved { .. } | Self::ChildMoved { .. } | Self::Destroyed { .. }
        )
    }
}

/// Supplies serialized property values when an element is created.
pub trait PropertySource {
    /// `None` when the property is absent; `Some(None)` for an explicit null.
    fn serialized(&self, property: &str) -> Option<Option<&str>>;
}

struct Slot {
    generation: u32,
    element: Option<Element>,
}

pub struct ElementTree {
    catalog: Arc<Catalog>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    roles: Arc<dyn RoleCheck>,
    toolkit: Option<Box<dyn Toolkit>>,
    widgets: HashMap<WidgetId, ElementId>,
    events: VecDeque<TreeEvent>,
}

impl fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementTree")
            .field("elements", &self.len())
            .field("free", &self.free.len())
            .field("toolkit", &self.toolkit.is_some())
            .field("pending_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl ElementTree {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            slots: Vec::new(),
            free: Vec::new(),
            roles: Arc::new(AllowAll),
            toolkit: None,
            widgets: HashMap::new(),
            events: VecDeque::new(),
        }
    }

    /// Bind elements to widgets created through `toolkit`.
    #[must_use]
    pub fn with_toolkit(mut self, toolkit: impl Toolkit + 'static) -> Self {
        self.toolkit = Some(Box::new(toolkit));
        self
    }

    /// Use `roles` when deciding whether a definition is forbidden.
    #[must_use]
    pub fn with_roles(mut self, roles: Arc<dyn RoleCheck>) -> Self {
        self.roles = roles;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    #[must_use]
    pub fn roles(&self) -> &dyn RoleCheck {
        self.roles.as_ref()
    }

    // =========================================================================
    // ARENA
    // =========================================================================

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slots
            .get(id.idx as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.element.as_ref())
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.element.as_mut())
    }

    fn node(&self, id: ElementId) -> Result<&Element, TreeError> {
        self.get(id).ok_or(TreeError::NotFound(id))
    }

    fn node_mut(&mut self, id: ElementId) -> Result<&mut Element, TreeError> {
        self.get_mut(id).ok_or(TreeError::NotFound(id))
    }

    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.element.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn alloc(&mut self, element: Element) -> ElementId {
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.element = Some(element);
            return ElementId { idx, generation: slot.generation };
        }
        let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot { generation: 0, element: Some(element) });
        ElementId { idx, generation: 0 }
    }

    /// Drop an element's slot. Children still attached (locked ones) are orphaned.
    fn release(&mut self, id: ElementId) {
        if !self.contains(id) {
            return;
        }
        let Some(element) = self.slots[id.idx as usize].element.take() else {
            return;
        };
        for child in element.children {
            if let Some(c) = self.get_mut(child) {
                c.parent = None;
            }
        }
        if let Some(widget) = element.widget {
            self.widgets.remove(&widget);
        }
        let slot = &mut self.slots[id.idx as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.idx);
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    fn emit(&mut self, event: TreeEvent) {
        self.events.push_back(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<TreeEvent> {
        self.events.drain(..).collect()
    }

    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    /// Create an element from a definition and attach it under `parent`.
    ///
    /// Returns `Ok(None)` when the definition is forbidden for the current
    /// user or disabled. Internal definitions reuse the parent's existing
    /// child of the same kind. Values from `source` are applied between the
    /// initialization hooks; a value that fails to apply is logged and
    /// skipped. When attaching fails, the new element is discarded.
    pub fn create_element(
        &mut self,
        definition_id: &str,
        parent: Option<ElementId>,
        source: Option<&dyn PropertySource>,
        deserializing: bool,
    ) -> Result<Option<ElementId>, TreeError> {
        let definition = self
            .catalog
            .definition(definition_id)
            .cloned()
            .ok_or_else(|| TreeError::UnknownDefinition(definition_id.to_string()))?;

        if definition.is_forbidden(self.roles.as_ref()) {
            tracing::info!(plugin = definition.name(), "access to plugin is restricted");
            return Ok(None);
        }
        if definition.is_disabled() {
            tracing::info!(plugin = definition.name(), "plugin has been disabled");
            return Ok(None);
        }

        let (id, fresh) = if definition.is_internal() {
            let existing = parent.and_then(|p| self.find_child(p, definition.kind(), false));
            let Some(existing) = existing else {
                return Err(TreeError::CreateFailed(definition.id().to_string()));
            };
            (existing, false)
        } else {
            (self.instantiate(&definition), true)
        };

        tracing::trace!(element = %id, deserializing, "initializing element");

        if let Some(source) = source {
            self.apply_properties(id, source)?;
        }

        if fresh {
            if let Some(parent) = parent {
                if let Err(e) = self.add_child(parent, id) {
                    self.discard(id);
                    return Err(e);
                }
            }
        }

        self.after_initialize(id, deserializing);
        tracing::debug!(element = %id, definition = definition.id(), "element created");
        Ok(Some(id))
    }

    /// Create a parentless element, failing when the definition is unavailable.
    pub fn create_root(&mut self, definition_id: &str) -> Result<ElementId, TreeError> {
        self.create_element(definition_id, None, None, false)?
            .ok_or_else(|| TreeError::CreateFailed(definition_id.to_string()))
    }

    /// Create a fixed child the parent manages itself (such as the desktop
    /// toolbar). It is attached without hooks and locked in place.
    pub fn create_fixed_child(&mut self, parent: ElementId, definition_id: &str) -> Result<ElementId, TreeError> {
        let definition = self
            .catalog
            .definition(definition_id)
            .cloned()
            .ok_or_else(|| TreeError::UnknownDefinition(definition_id.to_string()))?;
        let id = self.instantiate(&definition);
        if let Err(e) = self.add_child_quiet(parent, id) {
            self.discard(id);
            return Err(e);
        }
        self.node_mut(id)?.locked = true;
        self.after_initialize(id, false);
        Ok(id)
    }

    /// Allocate an element, bind a widget, and apply declared defaults.
    fn instantiate(&mut self, definition: &Arc<PluginDefinition>) -> ElementId {
        let behavior = self.catalog.behavior(definition.kind());
        let id = self.alloc(Element::new(Arc::clone(definition), behavior));

        if !definition.is_internal() {
            if let Some(toolkit) = self.toolkit.as_mut() {
                let widget = toolkit.create_widget(definition.kind(), definition.name());
                toolkit.set_visible(widget, false);
                self.widgets.insert(widget, id);
                if let Some(element) = self.get_mut(id) {
                    element.widget = Some(widget);
                }
            }
        }

        self.emit(TreeEvent::Created { id, definition: definition.id().to_string() });

        for property in definition.properties() {
            let Some(default) = property.default_value() else {
                continue;
            };
            if let Err(e) = self.set_property_text(id, property, Some(default)) {
                tracing::warn!(error = %e, property = property.id(), definition = definition.id(), "failed to apply default value");
            }
        }
        id
    }

    /// Apply values from `source` to every declared property it carries.
    /// A value that fails to apply is logged and skipped.
    pub fn apply_properties(&mut self, id: ElementId, source: &dyn PropertySource) -> Result<(), TreeError> {
        let definition = Arc::clone(&self.node(id)?.definition);
        for property in definition.properties() {
            let Some(raw) = source.serialized(property.id()) else {
                continue;
            };
            if let Err(e) = self.set_property_text(id, property, raw) {
                tracing::warn!(error = %e, property = property.id(), definition = definition.id(), "failed to apply property value");
            }
        }
        Ok(())
    }

    /// Throw away a freshly created element that never made it into the tree.
    fn discard(&mut self, id: ElementId) {
        if let Some(widget) = self.get(id).and_then(|e| e.widget) {
            if let Some(toolkit) = self.toolkit.as_mut() {
                toolkit.destroy_widget(widget);
            }
        }
        self.events.retain(|e| !matches!(e, TreeEvent::Created { id: created, .. } if *created == id));
        self.release(id);
    }

    /// Confirm `definition` is the element's definition; it can never change.
    pub fn set_definition(&mut self, id: ElementId, definition: &Arc<PluginDefinition>) -> Result<(), TreeError> {
        let current = &self.node(id)?.definition;
        if Arc::ptr_eq(current, definition) || current.id() == definition.id() {
            Ok(())
        } else {
            Err(TreeError::DefinitionLocked)
        }
    }

    fn after_initialize(&mut self, id: ElementId, deserializing: bool) {
        let count = self.get(id).map_or(0, |e| e.definition.resources().len());
        if count > 0 {
            self.emit(TreeEvent::ResourcesRegistered { id, count });
        }
        tracing::trace!(element = %id, deserializing, "element initialized");
        self.emit(TreeEvent::Initialized { id });
    }

    // =========================================================================
    // STRUCTURE
    // =========================================================================

    /// Attach `child` as the last child of `parent`, running hooks.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        self.attach(parent, child, true)
    }

    /// Attach without hooks, for children the parent manages itself.
    pub fn add_child_quiet(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        self.attach(parent, child, false)
    }

    fn attach(&mut self, parent: ElementId, child: ElementId, hooks: bool) -> Result<(), TreeError> {
        self.node(parent)?;
        self.node(child)?;

        if parent == child || self.has_ancestor(parent, child) {
            return Err(TreeError::Constraint(format!(
                "{} cannot contain itself.",
                self.display_name(child)
            )));
        }
        if !self.can_accept_parent(child, parent) {
            return Err(TreeError::Constraint(self.reject_reason(child).unwrap_or_default().to_string()));
        }
        if !self.can_accept_child(parent, child) {
            return Err(TreeError::Constraint(self.reject_reason(parent).unwrap_or_default().to_string()));
        }

        if hooks {
            self.before_add_child(parent, child)?;
        }

        if let Some(old) = self.node(child)?.parent {
            self.remove_child(old, child, false)?;
            if self.node(child)?.parent.is_some() {
                return Err(TreeError::Constraint(format!(
                    "{} cannot be detached from its parent.",
                    self.display_name(child)
                )));
            }
        }

        self.node_mut(parent)?.children.push(child);
        self.update_parent(child, Some(parent));

        if hooks {
            self.after_add_child(parent, child)?;
        }
        self.emit(TreeEvent::ChildAdded { parent, child });
        Ok(())
    }

    /// Detach `child` from `parent`, destroying its subtree when `destroy`.
    ///
    /// Does nothing when `child` is not a child of `parent`. Locked and
    /// internal children stay attached and are not destroyed, though their
    /// own unprotected descendants are.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId, destroy: bool) -> Result<(), TreeError> {
        if !self.node(parent)?.children.contains(&child) {
            return Ok(());
        }
        let locked = self.node(child)?.is_protected();

        if destroy {
            self.remove_children(child)?;
            if !locked {
                self.destroy(child)?;
            }
        }

        if !locked {
            self.node_mut(parent)?.children.retain(|c| *c != child);
            self.update_parent(child, None);
            self.after_remove_child(parent, child)?;
            self.emit(TreeEvent::ChildRemoved { parent, child });
            if destroy {
                self.release(child);
            }
        }
        Ok(())
    }

    /// Remove this element from its parent, if it has one.
    pub fn remove(&mut self, id: ElementId, destroy: bool) -> Result<(), TreeError> {
        match self.node(id)?.parent {
            Some(parent) => self.remove_child(parent, id, destroy),
            None => Ok(()),
        }
    }

    /// Destroy and remove every child, last first.
    pub fn remove_children(&mut self, id: ElementId) -> Result<(), TreeError> {
        let children = self.node(id)?.children.clone();
        for child in children.into_iter().rev() {
            self.remove_child(id, child, true)?;
        }
        Ok(())
    }

    /// Release the element's resources and widget. Idempotent.
    pub fn destroy(&mut self, id: ElementId) -> Result<(), TreeError> {
        let element = self.node_mut(id)?;
        if element.destroyed {
            return Ok(());
        }
        element.destroyed = true;
        let widget = element.widget.take();
        let definition = Arc::clone(&element.definition);

        if let Some(widget) = widget {
            self.widgets.remove(&widget);
            if let Some(toolkit) = self.toolkit.as_mut() {
                toolkit.destroy_widget(widget);
            }
        }
        let count = definition.resources().len();
        if count > 0 {
            self.emit(TreeEvent::ResourcesReleased { id, count });
        }
        self.emit(TreeEvent::Destroyed { id, definition: definition.id().to_string() });
        Ok(())
    }

    /// Move to `parent`, or detach when `None`. Validation precedes detaching.
    pub fn set_parent(&mut self, id: ElementId, parent: Option<ElementId>) -> Result<(), TreeError> {
        let current = self.node(id)?.parent;
        if current == parent {
            return Ok(());
        }
        match parent {
            Some(parent) => self.add_child(parent, id),
            None => self.remove(id, false),
        }
    }

    /// Move the child at `from` so it ends up at `to`.
    pub fn move_child(&mut self, parent: ElementId, from: usize, to: usize) -> Result<(), TreeError> {
        let len = self.node(parent)?.children.len();
        for index in [from, to] {
            if index >= len {
                return Err(TreeError::IndexOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }
        let children = &mut self.node_mut(parent)?.children;
        let child = children.remove(from);
        children.insert(to, child);
        self.after_move_child(parent, child, to);
        self.emit(TreeEvent::ChildMoved { parent, child, from, to });
        Ok(())
    }

    /// Reposition this element among its siblings.
    pub fn set_index(&mut self, id: ElementId, index: usize) -> Result<(), TreeError> {
        let parent = self.node(id)?.parent.ok_or(TreeError::NoParent)?;
        let from = self.index_of(id).ok_or(TreeError::NoParent)?;
        self.move_child(parent, from, index)
    }

    fn update_parent(&mut self, child: ElementId, new_parent: Option<ElementId>) {
        let Some(old_parent) = self.get(child).map(|c| c.parent) else {
            return;
        };
        if old_parent == new_parent {
            return;
        }
        self.unbind(child);
        if let Some(c) = self.get_mut(child) {
            c.parent = new_parent;
        }
        if let Some(old) = old_parent {
            self.update_state(old);
        }
        if let Some(new) = new_parent {
            self.bind(child);
            let design_mode = self.get(new).is_some_and(|p| p.design_mode);
            self.apply_design_mode(child, design_mode);
            self.update_state(new);
        }
    }

    // =========================================================================
    // HOOKS
    // =========================================================================

    fn before_add_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        // An incoming child never stays active under an inactive parent.
        let parent_active = self.node(parent)?.activated;
        if self.node(child)?.activated && !parent_active {
            self.activate(child, false)?;
        }
        Ok(())
    }

    fn after_add_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        let node = self.node(parent)?;
        if node.behavior == Behavior::View && node.active_pane.is_none() {
            self.set_active_pane(parent, Some(child))?;
        }
        self.update_mask(parent);
        Ok(())
    }

    fn after_remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        let node = self.node(parent)?;
        if node.behavior == Behavior::View && node.active_pane == Some(child) {
            self.node_mut(parent)?.active_pane = None;
            if let Some(next) = self.fallback_pane(parent) {
                self.set_active_pane(parent, Some(next))?;
            }
        }
        self.update_mask(parent);
        Ok(())
    }

    fn after_move_child(&mut self, parent: ElementId, child: ElementId, to: usize) {
        let (Some(parent_widget), Some(widget)) = (
            self.get(parent).and_then(|p| p.widget),
            self.get(child).and_then(|c| c.widget),
        ) else {
            return;
        };
        let index = self.widget_index(parent, to);
        if let Some(toolkit) = self.toolkit.as_mut() {
            toolkit.attach(widget, parent_widget, index);
        }
    }

    // =========================================================================
    // VISUAL BINDING
    // =========================================================================

    /// Position among the parent's widget-bearing children before `index`.
    fn widget_index(&self, parent: ElementId, index: usize) -> usize {
        self.children(parent)
            .iter()
            .take(index)
            .filter(|c| self.get(**c).is_some_and(|e| e.widget.is_some()))
            .count()
    }

    fn bind(&mut self, child: ElementId) {
        let Some(element) = self.get(child) else {
            return;
        };
        let (Some(widget), Some(parent)) = (element.widget, element.parent) else {
            return;
        };
        let Some(parent_widget) = self.get(parent).and_then(|p| p.widget) else {
            return;
        };
        let index = self.index_of(child).map_or(0, |i| self.widget_index(parent, i));
        if let Some(toolkit) = self.toolkit.as_mut() {
            toolkit.attach(widget, parent_widget, index);
        }
    }

    fn unbind(&mut self, child: ElementId) {
        let Some(widget) = self.get(child).and_then(|c| c.widget) else {
            return;
        };
        if self.get(child).is_some_and(|c| c.parent.is_some()) {
            if let Some(toolkit) = self.toolkit.as_mut() {
                toolkit.detach(widget);
            }
        }
    }

    /// Element bound to `widget`, if any.
    #[must_use]
    pub fn element_for_widget(&self, widget: WidgetId) -> Option<ElementId> {
        self.widgets.get(&widget).copied()
    }

    fn with_widget(&mut self, id: ElementId, f: impl FnOnce(&mut dyn Toolkit, WidgetId)) {
        let Some(widget) = self.get(id).and_then(|e| e.widget) else {
            return;
        };
        if let Some(toolkit) = self.toolkit.as_mut() {
            f(&mut **toolkit, widget);
        }
    }

    /// Apply a style attribute to the element's widget.
    pub fn apply_style(&mut self, id: ElementId, name: &str, value: Option<&str>) {
        self.with_widget(id, |toolkit, widget| toolkit.set_style(widget, name, value));
    }

    /// Apply a hint to the element's widget. Suppressed in design mode.
    pub fn apply_hint(&mut self, id: ElementId, hint: Option<&str>) {
        if self.get(id).is_some_and(|e| e.design_mode) {
            return;
        }
        self.with_widget(id, |toolkit, widget| toolkit.set_hint(widget, hint));
    }

    fn sync_visibility(&mut self, id: ElementId) {
        let Some(element) = self.get(id) else {
            return;
        };
        let shown = element.visible && element.activated;
        self.with_widget(id, |toolkit, widget| toolkit.set_visible(widget, shown));
    }

    fn update_mask(&mut self, id: ElementId) {
        let Some(element) = self.get(id) else {
            return;
        };
        let masked = element.design_mode
            && element.children.is_empty()
            && self.catalog.schema().is_container(element.kind())
            && !element.definition.is_internal();
        if element.masked == masked {
            return;
        }
        if let Some(e) = self.get_mut(id) {
            e.masked = masked;
        }
        self.with_widget(id, |toolkit, widget| toolkit.set_mask(widget, masked));
    }

    // =========================================================================
    // CARDINALITY
    // =========================================================================

    /// Whether `parent` can take any more children at all.
    pub fn check_accept_any_child(&self, parent: ElementId) -> Result<(), String> {
        let Some(element) = self.get(parent) else {
            return Err(format!("element not found: {parent}"));
        };
        let max = self.catalog.schema().max_children(element.kind());
        if max == 0 {
            Err(format!("{} does not accept any children.", self.display_name(parent)))
        } else if element.children.len() >= max {
            Err(format!("Maximum child count exceeded for {}.", self.display_name(parent)))
        } else {
            Ok(())
        }
    }

    /// Whether `parent` can take another child of `kind`.
    pub fn check_accept_child_kind(&self, parent: ElementId, kind: &str) -> Result<(), String> {
        self.check_accept_any_child(parent)?;
        let schema = self.catalog.schema();
        let parent_kind = self.get(parent).map(Element::kind).unwrap_or_default();
        let cardinality = schema.child_cardinality(parent_kind, kind).filter(|c| c.max > 0);
        let Some(cardinality) = cardinality else {
            return Err(format!(
                "{} does not accept {} as a child.",
                self.display_name(parent),
                self.catalog.kind_label(kind)
            ));
        };
        if !cardinality.is_unbounded() && self.child_count_of_kind(parent, &cardinality.target) >= cardinality.max {
            return Err(format!(
                "{} cannot accept more than {} of {}.",
                self.display_name(parent),
                cardinality.max,
                self.catalog.kind_label(&cardinality.target)
            ));
        }
        Ok(())
    }

    pub fn check_accept_child(&self, parent: ElementId, child: ElementId) -> Result<(), String> {
        let kind = self.get(child).map(Element::kind).unwrap_or_default();
        self.check_accept_child_kind(parent, kind)
    }

    /// Whether `child` may be placed under any parent at all.
    pub fn check_accept_any_parent(&self, child: ElementId) -> Result<(), String> {
        let kind = self.get(child).map(Element::kind).unwrap_or_default();
        if self.catalog.schema().has_parents(kind) {
            Ok(())
        } else {
            Err(format!("{} does not accept any parent component.", self.display_name(child)))
        }
    }

    /// Whether `child` accepts a parent of `kind`; `parent_label` names it in the reason.
    fn check_parent_relation(&self, child: ElementId, kind: &str, parent_label: &str) -> Result<(), String> {
        self.check_accept_any_parent(child)?;
        let child_kind = self.get(child).map(Element::kind).unwrap_or_default();
        let related = self
            .catalog
            .schema()
            .parent_cardinality(child_kind, kind)
            .is_some_and(|c| c.max > 0);
        if related {
            Ok(())
        } else {
            Err(format!("{} does not accept {parent_label} as a parent.", self.display_name(child)))
        }
    }

    pub fn check_accept_parent_kind(&self, child: ElementId, kind: &str) -> Result<(), String> {
        self.check_parent_relation(child, kind, &self.catalog.kind_label(kind))
    }

    pub fn check_accept_parent(&self, child: ElementId, parent: ElementId) -> Result<(), String> {
        let kind = self.get(parent).map(Element::kind).unwrap_or_default();
        self.check_parent_relation(child, kind, &self.display_name(parent))
    }

    fn record(&mut self, id: ElementId, result: Result<(), String>) -> bool {
        let accepted = result.is_ok();
        if let Some(element) = self.get_mut(id) {
            element.reject_reason = result.err();
        }
        accepted
    }

    /// Checks `parent` against any child, updating its reject reason.
    pub fn can_accept_any_child(&mut self, parent: ElementId) -> bool {
        let result = self.check_accept_any_child(parent);
        self.record(parent, result)
    }

    pub fn can_accept_child(&mut self, parent: ElementId, child: ElementId) -> bool {
        let result = self.check_accept_child(parent, child);
        self.record(parent, result)
    }

    pub fn can_accept_child_kind(&mut self, parent: ElementId, kind: &str) -> bool {
        let result = self.check_accept_child_kind(parent, kind);
        self.record(parent, result)
    }

    pub fn can_accept_any_parent(&mut self, child: ElementId) -> bool {
        let result = self.check_accept_any_parent(child);
        self.record(child, result)
    }

    pub fn can_accept_parent(&mut self, child: ElementId, parent: ElementId) -> bool {
        let result = self.check_accept_parent(child, parent);
        self.record(child, result)
    }

    pub fn can_accept_parent_kind(&mut self, child: ElementId, kind: &str) -> bool {
        let result = self.check_accept_parent_kind(child, kind);
        self.record(child, result)
    }

    /// Reason recorded by the last acceptance check on this element.
    #[must_use]
    pub fn reject_reason(&self, id: ElementId) -> Option<&str> {
        self.get(id).and_then(|e| e.reject_reason.as_deref())
    }

    // =========================================================================
    // ACTIVATION, VISIBILITY, DESIGN MODE
    // =========================================================================

    /// Activate or inactivate the subtree: children first, then self.
    pub fn activate(&mut self, id: ElementId, active: bool) -> Result<(), TreeError> {
        self.activate_children(id, active)?;
        self.node_mut(id)?.activated = active;
        self.sync_visibility(id);
        self.emit(TreeEvent::Activated { id, active });
        if active {
            self.update_mask(id);
        }
        Ok(())
    }

    fn activate_children(&mut self, id: ElementId, active: bool) -> Result<(), TreeError> {
        let element = self.node(id)?;
        let children = element.children.clone();
        match element.behavior {
            Behavior::View => {
                let current = element.active_pane.filter(|p| children.contains(p));
                let pane = current
                    .filter(|p| self.get(*p).is_some_and(|e| e.visible))
                    .or_else(|| self.first_visible_child(id))
                    .or(current)
                    .or_else(|| self.child_at(id, 0));
                self.node_mut(id)?.active_pane = pane;
                for child in children {
                    self.activate(child, active && Some(child) == pane)?;
                }
            }
            Behavior::Base | Behavior::Desktop | Behavior::Pane => {
                for child in children {
                    self.activate(child, active)?;
                }
            }
        }
        Ok(())
    }

    /// Pane a view shows when it has no usable active pane: the first
    /// visible child, else the first child.
    fn fallback_pane(&self, view: ElementId) -> Option<ElementId> {
        self.first_visible_child(view).or_else(|| self.child_at(view, 0))
    }

    /// Make `pane` the active pane of a view, swapping activation.
    pub fn set_active_pane(&mut self, view: ElementId, pane: Option<ElementId>) -> Result<(), TreeError> {
        let element = self.node(view)?;
        if element.behavior != Behavior::View || element.active_pane == pane {
            return Ok(());
        }
        if let Some(pane) = pane {
            if !element.children.contains(&pane) {
                return Err(TreeError::Constraint(format!(
                    "{} is not a pane of {}.",
                    self.display_name(pane),
                    self.display_name(view)
                )));
            }
        }
        let view_active = element.activated;
        if let Some(old) = element.active_pane.filter(|old| self.contains(*old)) {
            self.activate(old, false)?;
        }
        self.node_mut(view)?.active_pane = pane;
        if let (Some(pane), true) = (pane, view_active) {
            self.activate(pane, true)?;
        }
        Ok(())
    }

    /// Make this element the one shown: every enclosing view selects the
    /// branch that contains it. A root element is activated instead.
    pub fn bring_to_front(&mut self, id: ElementId) -> Result<(), TreeError> {
        match self.node(id)?.parent {
            Some(parent) => {
                self.bring_to_front(parent)?;
                if self.node(parent)?.behavior == Behavior::View {
                    self.set_active_pane(parent, Some(id))?;
                }
                Ok(())
            }
            None => self.activate(id, true),
        }
    }

    pub fn set_visible(&mut self, id: ElementId, visible: bool) -> Result<(), TreeError> {
        let element = self.node_mut(id)?;
        if element.visible == visible {
            return Ok(());
        }
        element.visible = visible;
        let parent = element.parent;
        self.sync_visibility(id);
        if let Some(parent) = parent {
            self.update_state(parent);
        }
        Ok(())
    }

    pub fn set_enabled(&mut self, id: ElementId, enabled: bool) -> Result<(), TreeError> {
        let element = self.node_mut(id)?;
        if element.enabled == enabled {
            return Ok(());
        }
        element.enabled = enabled;
        let parent = element.parent;
        self.with_widget(id, |toolkit, widget| toolkit.set_enabled(widget, enabled));
        if let Some(parent) = parent {
            self.update_state(parent);
        }
        Ok(())
    }

    pub fn set_locked(&mut self, id: ElementId, locked: bool) -> Result<(), TreeError> {
        self.node_mut(id)?.locked = locked;
        Ok(())
    }

    pub fn set_auto_hide(&mut self, id: ElementId, auto_hide: bool) -> Result<(), TreeError> {
        self.node_mut(id)?.auto_hide = auto_hide;
        self.update_state(id);
        Ok(())
    }

    pub fn set_auto_enable(&mut self, id: ElementId, auto_enable: bool) -> Result<(), TreeError> {
        self.node_mut(id)?.auto_enable = auto_enable;
        self.update_state(id);
        Ok(())
    }

    /// Derive a container's enabled and visible state from its children.
    ///
    /// Disabled only when every child is disabled (with `auto_enable`), and
    /// hidden only when no child is visible (with `auto_hide`, outside design
    /// mode). Non-containers and the desktop keep their own state.
    pub fn update_state(&mut self, id: ElementId) {
        let Some(element) = self.get(id) else {
            return;
        };
        if element.behavior == Behavior::Desktop || !self.catalog.schema().is_container(element.kind()) {
            return;
        }
        let mut any_enabled = !element.auto_enable || element.children.is_empty();
        let mut any_visible = !element.auto_hide || element.design_mode;
        for child in &element.children {
            if any_enabled && any_visible {
                break;
            }
            if let Some(c) = self.get(*child) {
                any_enabled |= c.enabled;
                any_visible |= c.visible;
            }
        }
        // Both setters only fail for missing ids, which was ruled out above.
        if self.set_enabled(id, any_enabled).is_err() || self.set_visible(id, any_visible).is_err() {
            tracing::warn!(element = %id, "state update on vanished element");
        }
    }

    /// Turn design mode on or off for the whole subtree.
    pub fn set_design_mode(&mut self, id: ElementId, design_mode: bool) -> Result<(), TreeError> {
        self.node(id)?;
        self.apply_design_mode(id, design_mode);
        self.emit(TreeEvent::DesignModeChanged { id, design_mode });
        Ok(())
    }

    fn apply_design_mode(&mut self, id: ElementId, design_mode: bool) {
        let Some(element) = self.get_mut(id) else {
            return;
        };
        element.design_mode = design_mode;
        let children = element.children.clone();
        let hint = if design_mode {
            Some(element.definition.name().to_string())
        } else {
            element.props.get("hint").map(ToString::to_string)
        };
        self.with_widget(id, |toolkit, widget| {
            toolkit.set_context_menu(widget, design_mode);
            toolkit.set_hint(widget, hint.as_deref());
        });
        for child in children {
            self.apply_design_mode(child, design_mode);
        }
        self.update_mask(id);
        self.update_state(id);
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    /// Read a property through its accessor, or from the property bag.
    pub fn property_value(&self, id: ElementId, info: &PropertyInfo) -> Result<Option<PropertyValue>, TreeError> {
        let element = self.node(id)?;
        if let Some(accessor) = info.accessor() {
            return accessor.get(self, id);
        }
        if let Some(accessor) = self.catalog.accessor(element.kind(), info.id()) {
            return accessor.get(self, id);
        }
        Ok(element.props.get(info.id()).cloned())
    }

    /// Write a property, converting the value to the property's type first.
    pub fn set_property_value(
        &mut self,
        id: ElementId,
        info: &PropertyInfo,
        value: Option<PropertyValue>,
    ) -> Result<(), TreeError> {
        let kind = self.node(id)?.kind().to_string();
        let value = match value {
            Some(v) => Some(self.coerce(info, v)?),
            None => None,
        };
        let catalog = Arc::clone(&self.catalog);
        if let Some(accessor) = info.accessor() {
            accessor.set(self, id, value)?;
        } else if let Some(accessor) = catalog.accessor(&kind, info.id()) {
            accessor.set(self, id, value)?;
        } else {
            self.set_bag_value(id, info.id(), value)?;
        }
        self.emit(TreeEvent::PropertyChanged { id, property: info.id().to_string() });
        Ok(())
    }

    /// Write a property from its serialized form (`None` or the null marker clears it).
    pub fn set_property_text(&mut self, id: ElementId, info: &PropertyInfo, text: Option<&str>) -> Result<(), TreeError> {
        let value = info
            .parse_value(self.catalog.property_types(), text)
            .map_err(|source| TreeError::Property { property: info.id().to_string(), source })?;
        self.set_property_value(id, info, value)
    }

    /// Read a declared property by id.
    pub fn property(&self, id: ElementId, property: &str) -> Result<Option<PropertyValue>, TreeError> {
        let info = self.property_info(id, property)?;
        self.property_value(id, &info)
    }

    /// Write a declared property by id.
    pub fn set_property(&mut self, id: ElementId, property: &str, value: Option<PropertyValue>) -> Result<(), TreeError> {
        let info = self.property_info(id, property)?;
        self.set_property_value(id, &info, value)
    }

    fn property_info(&self, id: ElementId, property: &str) -> Result<PropertyInfo, TreeError> {
        let definition = &self.node(id)?.definition;
        definition
            .property(property)
            .cloned()
            .ok_or_else(|| TreeError::UnknownProperty {
                definition: definition.id().to_string(),
                property: property.to_string(),
            })
    }

    fn coerce(&self, info: &PropertyInfo, value: PropertyValue) -> Result<PropertyValue, TreeError> {
        match info.serializer(self.catalog.property_types()) {
            Ok(serializer) => serializer
                .convert(value)
                .map_err(|source| TreeError::Property { property: info.id().to_string(), source }),
            Err(_) => Ok(value),
        }
    }

    /// Raw property bag read, bypassing accessors.
    #[must_use]
    pub fn bag_value(&self, id: ElementId, property: &str) -> Option<PropertyValue> {
        self.get(id).and_then(|e| e.props.get(property).cloned())
    }

    /// Raw property bag write, bypassing accessors.
    pub fn set_bag_value(&mut self, id: ElementId, property: &str, value: Option<PropertyValue>) -> Result<(), TreeError> {
        let element = self.node_mut(id)?;
        match value {
            Some(v) => element.props.insert(property.to_string(), v),
            None => element.props.remove(property),
        };
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.get(id).map_or(&[], |e| e.children.as_slice())
    }

    #[must_use]
    pub fn child_count(&self, id: ElementId) -> usize {
        self.children(id).len()
    }

    #[must_use]
    pub fn child_at(&self, id: ElementId, index: usize) -> Option<ElementId> {
        self.children(id).get(index).copied()
    }

    /// Number of children that are, or inherit from, `kind`.
    #[must_use]
    pub fn child_count_of_kind(&self, id: ElementId, kind: &str) -> usize {
        let schema = self.catalog.schema();
        self.children(id)
            .iter()
            .filter_map(|c| self.get(*c))
            .filter(|c| schema.is_a(c.kind(), kind))
            .count()
    }

    #[must_use]
    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).and_then(|e| e.parent)
    }

    /// Position among the parent's children.
    #[must_use]
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    #[must_use]
    pub fn previous_sibling(&self, id: ElementId) -> Option<ElementId> {
        let parent = self.parent_of(id)?;
        let index = self.index_of(id)?;
        index.checked_sub(1).and_then(|i| self.child_at(parent, i))
    }

    #[must_use]
    pub fn next_sibling(&self, id: ElementId) -> Option<ElementId> {
        let parent = self.parent_of(id)?;
        self.child_at(parent, self.index_of(id)? + 1)
    }

    #[must_use]
    pub fn first_visible_child(&self, id: ElementId) -> Option<ElementId> {
        self.children(id).iter().copied().find(|c| self.get(*c).is_some_and(|e| e.visible))
    }

    #[must_use]
    pub fn last_visible_child(&self, id: ElementId) -> Option<ElementId> {
        self.children(id).iter().rev().copied().find(|c| self.get(*c).is_some_and(|e| e.visible))
    }

    /// Topmost ancestor (or the element itself when parentless).
    #[must_use]
    pub fn root_of(&self, id: ElementId) -> ElementId {
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            current = parent;
        }
        current
    }

    /// True when `ancestor` is a strict ancestor of `id`.
    #[must_use]
    pub fn has_ancestor(&self, id: ElementId, ancestor: ElementId) -> bool {
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent_of(p);
        }
        false
    }

    /// Nearest strict ancestor that is, or inherits from, `kind`.
    #[must_use]
    pub fn ancestor_of_kind(&self, id: ElementId, kind: &str) -> Option<ElementId> {
        let schema = self.catalog.schema();
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            if self.get(p).is_some_and(|e| schema.is_a(e.kind(), kind)) {
                return Some(p);
            }
            current = self.parent_of(p);
        }
        None
    }

    /// First child of `kind`, searching depth-first when `recurse`.
    #[must_use]
    pub fn find_child(&self, id: ElementId, kind: &str, recurse: bool) -> Option<ElementId> {
        let schema = self.catalog.schema();
        for child in self.children(id) {
            if self.get(*child).is_some_and(|e| schema.is_a(e.kind(), kind)) {
                return Some(*child);
            }
        }
        if recurse {
            return self.children(id).iter().find_map(|c| self.find_child(*c, kind, true));
        }
        None
    }

    /// The element and all descendants in pre-order.
    #[must_use]
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    #[must_use]
    pub fn is_container(&self, id: ElementId) -> bool {
        self.get(id).is_some_and(|e| self.catalog.schema().is_container(e.kind()))
    }

    /// Definition name of the element.
    #[must_use]
    pub fn display_name(&self, id: ElementId) -> String {
        self.get(id).map_or_else(String::new, |e| e.definition.name().to_string())
    }

    /// Label of this particular instance: its `label` property when set,
    /// else the display name.
    #[must_use]
    pub fn instance_name(&self, id: ElementId) -> String {
        match self.bag_value(id, "label") {
            Some(PropertyValue::Text(label)) if !label.trim().is_empty() => label,
            _ => self.display_name(id),
        }
    }
}
