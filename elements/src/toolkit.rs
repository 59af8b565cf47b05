//! Visual binding between elements and the rendering toolkit.
//!
//! The element tree drives widgets through the [`Toolkit`] trait and never
//! renders anything itself. [`HeadlessToolkit`] is an in-memory implementation
//! that records the widget tree, used by the CLI and by tests to observe what
//! a real toolkit would have been asked to do.

#[cfg(test)]
#[path = "toolkit_test.rs"]
mod toolkit_test;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Opaque handle to a toolkit widget.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u32);

impl fmt::Debug for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WidgetId({})", self.0)
    }
}

/// Operations the element tree needs from a rendering toolkit.
pub trait Toolkit {
    /// Create a widget of `kind` labeled `label`.
    fn create_widget(&mut self, kind: &str, label: &str) -> WidgetId;
    /// Place `widget` at `index` under `parent`, detaching it from any prior parent.
    fn attach(&mut self, widget: WidgetId, parent: WidgetId, index: usize);
    fn detach(&mut self, widget: WidgetId);
    fn destroy_widget(&mut self, widget: WidgetId);
    fn set_visible(&mut self, widget: WidgetId, visible: bool);
    fn set_enabled(&mut self, widget: WidgetId, enabled: bool);
    /// Set or clear (`None`) a style attribute.
    fn set_style(&mut self, widget: WidgetId, name: &str, value: Option<&str>);
    fn set_hint(&mut self, widget: WidgetId, hint: Option<&str>);
    /// Show or hide the design-mode mask overlay.
    fn set_mask(&mut self, widget: WidgetId, masked: bool);
    /// Install or remove the designer context menu.
    fn set_context_menu(&mut self, widget: WidgetId, enabled: bool);
}

/// Recorded state of one headless widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetState {
    pub kind: String,
    pub label: String,
    pub parent: Option<WidgetId>,
    pub children: Vec<WidgetId>,
    pub visible: bool,
    pub enabled: bool,
    pub styles: BTreeMap<String, String>,
    pub hint: Option<String>,
    pub masked: bool,
    pub context_menu: bool,
    pub destroyed: bool,
}

/// Toolkit that keeps widgets in memory.
///
/// Clones share the same widget store, so a caller can keep a handle while
/// the tree owns another.
#[derive(Debug, Clone, Default)]
pub struct HeadlessToolkit {
    widgets: Rc<RefCell<Vec<WidgetState>>>,
}

impl HeadlessToolkit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one widget's state.
    #[must_use]
    pub fn widget(&self, id: WidgetId) -> Option<WidgetState> {
        self.widgets.borrow().get(id.0 as usize).cloned()
    }

    /// Number of widgets not yet destroyed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.widgets.borrow().iter().filter(|w| !w.destroyed).count()
    }

    /// Live widgets with no parent.
    #[must_use]
    pub fn roots(&self) -> Vec<WidgetId> {
        (0u32..)
            .zip(self.widgets.borrow().iter())
            .filter(|(_, w)| !w.destroyed && w.parent.is_none())
            .map(|(i, _)| WidgetId(i))
            .collect()
    }

    fn with_widget(&self, id: WidgetId, f: impl FnOnce(&mut WidgetState)) {
        if let Some(w) = self.widgets.borrow_mut().get_mut(id.0 as usize) {
            f(w);
        }
    }

    fn unlink(&self, widget: WidgetId) {
        let mut widgets = self.widgets.borrow_mut();
        let Some(parent) = widgets.get_mut(widget.0 as usize).and_then(|w| w.parent.take()) else {
            return;
        };
        if let Some(p) = widgets.get_mut(parent.0 as usize) {
            p.children.retain(|c| *c != widget);
        }
    }
}

impl Toolkit for HeadlessToolkit {
    fn create_widget(&mut self, kind: &str, label: &str) -> WidgetId {
        let mut widgets = self.widgets.borrow_mut();
        let id = WidgetId(u32::try_from(widgets.len()).unwrap_or(u32::MAX));
        widgets.push(WidgetState {
            kind: kind.to_string(),
            label: label.to_string(),
            parent: None,
            children: Vec::new(),
            visible: true,
            enabled: true,
            styles: BTreeMap::new(),
            hint: None,
            masked: false,
            context_menu: false,
            destroyed: false,
        });
        id
    }

    fn attach(&mut self, widget: WidgetId, parent: WidgetId, index: usize) {
        self.unlink(widget);
        let mut widgets = self.widgets.borrow_mut();
        let Some(p) = widgets.get_mut(parent.0 as usize) else {
            return;
        };
        let index = index.min(p.children.len());
        p.children.insert(index, widget);
        if let Some(w) = widgets.get_mut(widget.0 as usize) {
            w.parent = Some(parent);
        }
    }

    fn detach(&mut self, widget: WidgetId) {
        self.unlink(widget);
    }

    fn destroy_widget(&mut self, widget: WidgetId) {
        self.unlink(widget);
        let mut widgets = self.widgets.borrow_mut();
        let children = widgets
            .get_mut(widget.0 as usize)
            .map(|w| {
                w.destroyed = true;
                std::mem::take(&mut w.children)
            })
            .unwrap_or_default();
        for child in children {
            if let Some(c) = widgets.get_mut(child.0 as usize) {
                c.parent = None;
            }
        }
    }

    fn set_visible(&mut self, widget: WidgetId, visible: bool) {
        self.with_widget(widget, |w| w.visible = visible);
    }

    fn set_enabled(&mut self, widget: WidgetId, enabled: bool) {
        self.with_widget(widget, |w| w.enabled = enabled);
    }

    fn set_style(&mut self, widget: WidgetId, name: &str, value: Option<&str>) {
        self.with_widget(widget, |w| match value {
            Some(v) => {
                w.styles.insert(name.to_string(), v.to_string());
            }
            None => {
                w.styles.remove(name);
            }
        });
    }

    fn set_hint(&mut self, widget: WidgetId, hint: Option<&str>) {
        self.with_widget(widget, |w| w.hint = hint.map(str::to_string));
    }

    fn set_mask(&mut self, widget: WidgetId, masked: bool) {
        self.with_widget(widget, |w| w.masked = masked);
    }

    fn set_context_menu(&mut self, widget: WidgetId, enabled: bool) {
        self.with_widget(widget, |w| w.context_menu = enabled);
    }
}
