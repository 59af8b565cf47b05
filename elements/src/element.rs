//! Element identity and node state.
//!
//! Elements live in the arena owned by [`ElementTree`](crate::tree::ElementTree)
//! and are addressed by [`ElementId`]: a slot index plus a generation counter,
//! so a handle to a destroyed element never aliases the element that later
//! reuses its slot. Parent and child links are stored as ids.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::definition::PluginDefinition;
use crate::property::PropertyValue;
use crate::toolkit::WidgetId;

/// Handle to an element in an [`ElementTree`](crate::tree::ElementTree).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl ElementId {
    /// Raw slot index (for diagnostics only).
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({}@gen{})", self.idx, self.generation)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.idx, self.generation)
    }
}

/// Lifecycle hook set an element kind plugs into.
///
/// - `Base`: plain element; containers derive state from their children.
/// - `Desktop`: tree root; always visible, hosts internal fixed children.
/// - `View`: activates only its active pane (tab, tree, and step views).
/// - `Pane`: page of a view; labeled, and selected by `bring_to_front`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Base,
    Desktop,
    View,
    Pane,
}

/// One node of the element tree.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) definition: Arc<PluginDefinition>,
    pub(crate) behavior: Behavior,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) props: BTreeMap<String, PropertyValue>,
    pub(crate) locked: bool,
    pub(crate) enabled: bool,
    pub(crate) visible: bool,
    pub(crate) activated: bool,
    pub(crate) design_mode: bool,
    pub(crate) auto_hide: bool,
    pub(crate) auto_enable: bool,
    pub(crate) active_pane: Option<ElementId>,
    pub(crate) reject_reason: Option<String>,
    pub(crate) widget: Option<WidgetId>,
    pub(crate) masked: bool,
    pub(crate) destroyed: bool,
}

impl Element {
    pub(crate) fn new(definition: Arc<PluginDefinition>, behavior: Behavior) -> Self {
        Self {
            definition,
            behavior,
            parent: None,
            children: Vec::new(),
            props: BTreeMap::new(),
            locked: false,
            enabled: true,
            visible: true,
            activated: false,
            design_mode: false,
            auto_hide: true,
            auto_enable: true,
            active_pane: None,
            reject_reason: None,
            widget: None,
            masked: false,
            destroyed: false,
        }
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<PluginDefinition> {
        &self.definition
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        self.definition.kind()
    }

    #[must_use]
    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    #[must_use]
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Raw property bag value.
    #[must_use]
    pub fn prop(&self, id: &str) -> Option<&PropertyValue> {
        self.props.get(id)
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    #[must_use]
    pub fn is_design_mode(&self) -> bool {
        self.design_mode
    }

    #[must_use]
    pub fn auto_hide(&self) -> bool {
        self.auto_hide
    }

    #[must_use]
    pub fn auto_enable(&self) -> bool {
        self.auto_enable
    }

    /// Active pane of a view element.
    #[must_use]
    pub fn active_pane(&self) -> Option<ElementId> {
        self.active_pane
    }

    #[must_use]
    pub fn widget(&self) -> Option<WidgetId> {
        self.widget
    }

    /// True while the design-mode mask overlay is shown.
    #[must_use]
    pub fn is_masked(&self) -> bool {
        self.masked
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Internal definitions, and locked elements, are exempt from removal.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.locked || self.definition.is_internal()
    }
}
