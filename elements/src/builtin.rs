//! The standard element kinds, their cardinalities, and stock definitions.
//!
//! Kind hierarchy:
//!
//! ```text
//! element
//! └── ui
//!     ├── desktop    (root; hosts ui children and the internal toolbar)
//!     ├── layout     (generic container)
//!     ├── plugin     (leaf host)
//!     ├── toolbar    (internal, fixed under the desktop)
//!     ├── tabview  / tabpane
//!     ├── treeview / treepane (tree panes nest)
//!     └── stepview / steppane (one ui child per step)
//! ```

#[cfg(test)]
#[path = "builtin_test.rs"]
mod builtin_test;

use std::sync::Arc;

use crate::access::Accessor;
use crate::catalog::Catalog;
use crate::definition::{DefinitionError, PluginDefinition};
use crate::element::{Behavior, ElementId};
use crate::property::{EditorKind, PropertyInfo, PropertyType, PropertyValue};
use crate::schema::{SchemaError, UNBOUNDED};
use crate::tree::{ElementTree, TreeError};

pub const ELEMENT: &str = "element";
pub const UI: &str = "ui";
pub const DESKTOP: &str = "desktop";
pub const LAYOUT: &str = "layout";
pub const PLUGIN: &str = "plugin";
pub const TOOLBAR: &str = "toolbar";
pub const TAB_VIEW: &str = "tabview";
pub const TAB_PANE: &str = "tabpane";
pub const TREE_VIEW: &str = "treeview";
pub const TREE_PANE: &str = "treepane";
pub const STEP_VIEW: &str = "stepview";
pub const STEP_PANE: &str = "steppane";

/// Definition id of the desktop's fixed toolbar.
pub const TOOLBAR_ID: &str = "_toolbar";

const STYLES: &[&str] = &["default", "primary", "success", "info", "warning", "danger"];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Catalog with every standard kind and definition registered.
pub fn standard_catalog() -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::new();
    register_kinds(&mut catalog)?;
    register_types(&mut catalog);
    register_accessors(&mut catalog);
    for definition in standard_definitions() {
        catalog.plugins_mut().register(definition)?;
    }
    Ok(catalog)
}

fn register_kinds(catalog: &mut Catalog) -> Result<(), SchemaError> {
    catalog.register_kind(ELEMENT, None, None)?;
    catalog.register_kind(UI, Some(ELEMENT), None)?;
    catalog.register_kind(DESKTOP, Some(UI), Some(Behavior::Desktop))?;
    catalog.register_kind(LAYOUT, Some(UI), None)?;
    catalog.register_kind(PLUGIN, Some(UI), None)?;
    catalog.register_kind(TOOLBAR, Some(UI), None)?;
    for (view, pane) in [(TAB_VIEW, TAB_PANE), (TREE_VIEW, TREE_PANE), (STEP_VIEW, STEP_PANE)] {
        catalog.register_kind(view, Some(UI), Some(Behavior::View))?;
        catalog.register_kind(pane, Some(UI), Some(Behavior::Pane))?;
    }

    let schema = catalog.schema_mut();
    schema.register_allowed_child(DESKTOP, UI, UNBOUNDED)?;

    schema.register_allowed_parent(LAYOUT, ELEMENT, 1)?;
    schema.register_allowed_child(LAYOUT, ELEMENT, UNBOUNDED)?;

    schema.register_allowed_parent(PLUGIN, ELEMENT, 1)?;

    schema.register_allowed_parent(TOOLBAR, ELEMENT, 1)?;
    schema.register_allowed_child(TOOLBAR, UI, UNBOUNDED)?;

    schema.register_allowed_parent(TAB_VIEW, UI, 1)?;
    schema.register_allowed_child(TAB_VIEW, TAB_PANE, UNBOUNDED)?;
    schema.register_allowed_parent(TAB_PANE, TAB_VIEW, 1)?;
    schema.register_allowed_child(TAB_PANE, ELEMENT, UNBOUNDED)?;

    schema.register_allowed_parent(TREE_VIEW, UI, 1)?;
    schema.register_allowed_child(TREE_VIEW, TREE_PANE, UNBOUNDED)?;
    schema.register_allowed_parent(TREE_PANE, TREE_VIEW, 1)?;
    schema.register_allowed_parent(TREE_PANE, TREE_PANE, 1)?;
    schema.register_allowed_child(TREE_PANE, ELEMENT, UNBOUNDED)?;

    schema.register_allowed_parent(STEP_VIEW, UI, 1)?;
    schema.register_allowed_child(STEP_VIEW, STEP_PANE, UNBOUNDED)?;
    schema.register_allowed_parent(STEP_PANE, STEP_VIEW, 1)?;
    schema.register_allowed_child(STEP_PANE, UI, 1)?;
    Ok(())
}

fn register_types(catalog: &mut Catalog) {
    let types = catalog.property_types_mut();
    types.register_enum("PanelStyle", STYLES);
    types.register_enum("ButtonStyle", STYLES);
    for name in ["tabs", "nodes", "steps"] {
        types.register(PropertyType::new(name, None, EditorKind::ChildTree));
    }
}

/// `color` maps to the widget background and `hint` to its tooltip.
fn register_accessors(catalog: &mut Catalog) {
    catalog
        .accessors_mut(UI)
        .insert(
            "color",
            Accessor::new(
                |tree: &ElementTree, id| Ok(tree.bag_value(id, "color")),
                |tree: &mut ElementTree, id, value: Option<PropertyValue>| {
                    let style = value.as_ref().map(ToString::to_string);
                    tree.set_bag_value(id, "color", value)?;
                    tree.apply_style(id, "background-color", style.as_deref());
                    Ok(())
                },
            ),
        )
        .insert(
            "hint",
            Accessor::new(
                |tree: &ElementTree, id| Ok(tree.bag_value(id, "hint")),
                |tree: &mut ElementTree, id, value: Option<PropertyValue>| {
                    let hint = value.as_ref().map(ToString::to_string);
                    tree.set_bag_value(id, "hint", value)?;
                    tree.apply_hint(id, hint.as_deref());
                    Ok(())
                },
            ),
        );
}

fn ui_properties() -> [PropertyInfo; 2] {
    [
        PropertyInfo::new("color", "Color").with_type("color").with_description("Background color."),
        PropertyInfo::new("hint", "Hint").with_description("Text shown when hovering."),
    ]
}

fn label_property() -> PropertyInfo {
    PropertyInfo::new("label", "Label").with_description("Caption shown for this pane.")
}

fn icon_property() -> PropertyInfo {
    PropertyInfo::new("icon", "Icon").with_type("icon")
}

/// The stock definitions, in registration order.
#[must_use]
pub fn standard_definitions() -> Vec<PluginDefinition> {
    vec![
        PluginDefinition::new(DESKTOP, "Desktop", DESKTOP)
            .with_description("Top level container of the application.")
            .with_properties([
                PropertyInfo::new("title", "Title"),
                icon_property(),
                PropertyInfo::new("style", "Style")
                    .with_type("enum")
                    .with_config("class=PanelStyle")
                    .with_default("default"),
                PropertyInfo::new("appId", "Application ID").read_only(),
            ]),
        PluginDefinition::new(TOOLBAR_ID, "Toolbar", TOOLBAR),
        PluginDefinition::new(LAYOUT, "Layout", LAYOUT)
            .with_category("Layout")
            .with_description("Groups any number of components.")
            .with_properties(ui_properties())
            .with_property(label_property()),
        PluginDefinition::new(TAB_VIEW, "Tab View", TAB_VIEW)
            .with_category("Layout\\Views")
            .with_properties(ui_properties())
            .with_properties([
                PropertyInfo::new("orientation", "Orientation")
                    .with_type("choice")
                    .with_config("values=top,bottom,left,right|readonly=true")
                    .with_default("top"),
                PropertyInfo::new("panes", "Tabs").with_type("tabs").transient(),
            ]),
        PluginDefinition::new(TAB_PANE, "Tab Pane", TAB_PANE)
            .with_category("Layout\\Views")
            .with_properties(ui_properties())
            .with_properties([label_property(), icon_property()]),
        PluginDefinition::new(TREE_VIEW, "Tree View", TREE_VIEW)
            .with_category("Layout\\Views")
            .with_properties(ui_properties())
            .with_properties([
                PropertyInfo::new("caption", "Caption"),
                PropertyInfo::new("open", "Open").with_type("boolean").with_default("true"),
                PropertyInfo::new("selectionStyle", "Selection Style")
                    .with_type("enum")
                    .with_config("class=ButtonStyle")
                    .with_default("primary"),
                PropertyInfo::new("nodes", "Nodes").with_type("nodes").transient(),
            ]),
        PluginDefinition::new(TREE_PANE, "Tree Pane", TREE_PANE)
            .with_category("Layout\\Views")
            .with_properties(ui_properties())
            .with_property(label_property()),
        PluginDefinition::new(STEP_VIEW, "Step View", STEP_VIEW)
            .with_category("Layout\\Views")
            .with_properties(ui_properties())
            .with_properties([
                PropertyInfo::new("caption", "Caption"),
                PropertyInfo::new("noNavigation", "Hide Navigation")
                    .with_type("boolean")
                    .with_default("false"),
                PropertyInfo::new("noHome", "Hide Home").with_type("boolean").with_default("false"),
                PropertyInfo::new("steps", "Steps").with_type("steps").transient(),
            ]),
        PluginDefinition::new(STEP_PANE, "Step Pane", STEP_PANE)
            .with_category("Layout\\Views")
            .with_properties(ui_properties())
            .with_properties([label_property(), icon_property()]),
        PluginDefinition::new("html", "HTML Viewer", PLUGIN)
            .with_category("General Purpose\\Viewers")
            .with_description("Displays static HTML content.")
            .with_properties(ui_properties())
            .with_properties([
                PropertyInfo::new("content", "Content"),
                PropertyInfo::new("sandbox", "Sandbox").with_type("boolean").with_default("true"),
            ]),
        PluginDefinition::new("url", "URL Viewer", PLUGIN)
            .with_category("General Purpose\\Viewers")
            .with_description("Displays the page at a URL.")
            .with_authority("PRIV_WEB_CONTENT")
            .with_properties(ui_properties())
            .with_properties([
                PropertyInfo::new("url", "URL"),
                PropertyInfo::new("refresh", "Refresh Interval")
                    .with_type("integer")
                    .with_config("min=0|max=3600")
                    .with_default("0"),
            ]),
    ]
}

/// [`standard_catalog`], ready to hand to trees.
pub fn shared_catalog() -> Result<Arc<Catalog>, CatalogError> {
    standard_catalog().map(Arc::new)
}

/// Create a desktop root with its fixed toolbar.
pub fn create_desktop(tree: &mut ElementTree) -> Result<ElementId, TreeError> {
    let desktop = tree.create_root(DESKTOP)?;
    tree.create_fixed_child(desktop, TOOLBAR_ID)?;
    Ok(desktop)
}
