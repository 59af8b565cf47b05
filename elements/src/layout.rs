//! Serialized form of an element subtree.
//!
//! A [`Layout`] is the unit exchanged through the clipboard, named storage,
//! and import/export. Its root node stands for the document: when a whole
//! tree is serialized from its root element, the root's properties become the
//! document attributes and its children become the top-level nodes. Any other
//! element is serialized as a single top-level node.
//!
//! Materializing goes through [`ElementTree::create_element`] and the normal
//! `add_child` path, so cardinality rules apply to loaded content exactly as
//! they do to interactive edits.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::element::{Behavior, ElementId};
use crate::tree::{ElementTree, PropertySource, TreeError};

/// Version written to every serialized layout.
pub const LAYOUT_VERSION: &str = "4.0";

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("malformed layout: {0}")]
    Xml(String),
    #[error("{message}; {expected}")]
    InvalidTag { message: String, expected: String },
    #[error("Missing {attribute} attribute on node: {node}")]
    MissingAttribute { attribute: String, node: String },
    #[error("Unrecognized {node} type: {kind}")]
    UnknownType { node: String, kind: String },
    #[error("layout document has no root node")]
    Empty,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// One node: a definition id, ordered attributes, and children.
///
/// An attribute value of `None` is an explicit null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub definition: String,
    #[serde(default)]
    pub attributes: Vec<(String, Option<String>)>,
    #[serde(default)]
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    #[must_use]
    pub fn new(definition: &str) -> Self {
        Self { definition: definition.to_string(), ..Self::default() }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: Option<&str>) -> Self {
        self.set_attribute(name, value);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: LayoutNode) -> Self {
        self.children.push(child);
        self
    }

    /// Replace or append an attribute, keeping its original position.
    pub fn set_attribute(&mut self, name: &str, value: Option<&str>) {
        let value = value.map(str::to_string);
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// `None` when absent, `Some(None)` for an explicit null.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<Option<&str>> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_deref())
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(LayoutNode::node_count).sum::<usize>()
    }
}

impl PropertySource for LayoutNode {
    fn serialized(&self, property: &str) -> Option<Option<&str>> {
        self.attribute(property)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    name: Option<String>,
    version: String,
    root: LayoutNode,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout {
    #[must_use]
    pub fn new() -> Self {
        Self { name: None, version: LAYOUT_VERSION.to_string(), root: LayoutNode::default() }
    }

    #[must_use]
    pub fn from_root(name: Option<&str>, version: &str, root: LayoutNode) -> Self {
        Self { name: name.map(str::to_string), version: version.to_string(), root }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    /// Version the layout was read with.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Document node; its attributes belong to the desktop.
    #[must_use]
    pub fn root(&self) -> &LayoutNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut LayoutNode {
        &mut self.root
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Element kind of the first top-level node.
    #[must_use]
    pub fn root_kind(&self, catalog: &Catalog) -> Option<String> {
        let first = self.root.children.first()?;
        catalog.definition(&first.definition).map(|d| d.kind().to_string())
    }

    /// Definition ids that the catalog does not know, in document order.
    #[must_use]
    pub fn unknown_definitions(&self, catalog: &Catalog) -> Vec<String> {
        let mut unknown = Vec::new();
        let mut stack: Vec<&LayoutNode> = self.root.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if catalog.definition(&node.definition).is_none() {
                unknown.push(node.definition.clone());
            }
            stack.extend(node.children.iter().rev());
        }
        unknown
    }

    // =========================================================================
    // SERIALIZE
    // =========================================================================

    /// Capture `id` and its subtree.
    pub fn serialize(tree: &ElementTree, id: ElementId) -> Result<Self, TreeError> {
        let element = tree.get(id).ok_or(TreeError::NotFound(id))?;
        let mut layout = Self::new();
        if element.parent().is_none() {
            layout.root.attributes = attributes_of(tree, id);
            layout.root.children = tree.children(id).iter().map(|c| node_of(tree, *c)).collect();
        } else {
            layout.root.children.push(node_of(tree, id));
        }
        Ok(layout)
    }

    // =========================================================================
    // MATERIALIZE
    // =========================================================================

    /// Build the layout's elements under `parent` and activate the tree.
    /// Returns the top-level elements this call created.
    ///
    /// Internal definitions are only honored directly under the desktop,
    /// where they resolve to the desktop's existing fixed children; those are
    /// filled but never reported as created. If any top-level node fails,
    /// everything this call attached is removed again and the failures are
    /// reported together.
    pub fn materialize(&self, tree: &mut ElementTree, parent: ElementId) -> Result<Vec<ElementId>, TreeError> {
        let parent_element = tree.get(parent).ok_or(TreeError::NotFound(parent))?;
        let is_desktop = parent_element.behavior() == Behavior::Desktop;
        let parent_name = parent_element.definition().name().to_string();

        if is_desktop {
            tree.apply_properties(parent, &self.root)?;
        }

        let mut created = Vec::new();
        let mut attached = Vec::new();
        let mut errors = Vec::new();
        for node in &self.root.children {
            match materialize_node(tree, parent, node, !is_desktop, &mut attached) {
                Ok(Some(id)) => created.push(id),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        if let Some(error) = TreeError::aggregate(&parent_name, errors) {
            discard_all(tree, &attached);
            return Err(error);
        }

        if let Some(last) = tree.last_visible_child(parent) {
            let root = tree.root_of(last);
            tree.activate(root, true)?;
        }
        Ok(created)
    }

    // =========================================================================
    // JSON
    // =========================================================================

    pub fn to_json(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Build one node under `parent`. Every element a rollback would have to
/// remove is pushed onto `attached`: a fresh element once its subtree is
/// complete, or, for a reused internal element, each child built under it.
/// Returns the element when it was freshly created.
fn materialize_node(
    tree: &mut ElementTree,
    parent: ElementId,
    node: &LayoutNode,
    ignore_internal: bool,
    attached: &mut Vec<ElementId>,
) -> Result<Option<ElementId>, TreeError> {
    let definition = tree
        .catalog()
        .definition(&node.definition)
        .cloned()
        .ok_or_else(|| TreeError::UnknownDefinition(node.definition.clone()))?;

    if ignore_internal && definition.is_internal() {
        tracing::debug!(definition = definition.id(), "skipping internal element outside the desktop");
        return Ok(None);
    }

    let Some(id) = tree.create_element(definition.id(), Some(parent), Some(node), true)? else {
        return Ok(None);
    };
    let reused = definition.is_internal();

    // Children of a fresh element go with it on rollback.
    let mut nested = Vec::new();
    let children_attached = if reused { &mut *attached } else { &mut nested };
    let mark = children_attached.len();
    let mut errors = Vec::new();
    for child in &node.children {
        if let Err(e) = materialize_node(tree, id, child, false, children_attached) {
            errors.push(e);
        }
    }

    if let Some(error) = TreeError::aggregate(definition.name(), errors) {
        if reused {
            discard_all(tree, &children_attached[mark..]);
            children_attached.truncate(mark);
        } else {
            tree.remove(id, true)?;
        }
        return Err(error);
    }

    if reused {
        Ok(None)
    } else {
        attached.push(id);
        Ok(Some(id))
    }
}

/// Remove and destroy `ids`, newest first.
fn discard_all(tree: &mut ElementTree, ids: &[ElementId]) {
    for id in ids.iter().rev() {
        if let Err(e) = tree.remove(*id, true) {
            tracing::warn!(error = %e, element = %id, "failed to discard partially built element");
        }
    }
}

fn node_of(tree: &ElementTree, id: ElementId) -> LayoutNode {
    let mut node = LayoutNode::new(tree.get(id).map(|e| e.definition().id()).unwrap_or_default());
    node.attributes = attributes_of(tree, id);
    node.children = tree.children(id).iter().map(|c| node_of(tree, *c)).collect();
    node
}

/// Serializable properties whose serialized value differs from the default.
fn attributes_of(tree: &ElementTree, id: ElementId) -> Vec<(String, Option<String>)> {
    let Some(element) = tree.get(id) else {
        return Vec::new();
    };
    let types = tree.catalog().property_types();
    let mut attributes = Vec::new();

    for info in element.definition().properties() {
        if !info.is_serializable(types) {
            continue;
        }
        let value = match tree.property_value(id, info) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, property = info.id(), element = %id, "failed to read property");
                continue;
            }
        };
        let text = match (value, info.serializer(types)) {
            (Some(value), Ok(serializer)) => Some(serializer.serialize(&value)),
            _ => None,
        };
        if text.as_deref() == info.default_value() {
            continue;
        }
        attributes.push((info.id().to_string(), text));
    }
    attributes
}
