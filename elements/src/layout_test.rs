use std::sync::Arc;

use super::*;
use crate::builtin::{self, create_desktop};
use crate::property::PropertyValue;

fn tree() -> ElementTree {
    ElementTree::new(Arc::new(builtin::standard_catalog().unwrap()))
}

fn add(tree: &mut ElementTree, definition: &str, parent: ElementId) -> ElementId {
    tree.create_element(definition, Some(parent), None, false).unwrap().unwrap()
}

fn set(tree: &mut ElementTree, id: ElementId, property: &str, value: &str) {
    tree.set_property(id, property, Some(PropertyValue::text(value))).unwrap();
}

/// desktop > tabview(bottom) > [tabpane A > html, tabpane B]
fn sample(tree: &mut ElementTree) -> (ElementId, ElementId, ElementId, ElementId) {
    let desktop = create_desktop(tree).unwrap();
    set(tree, desktop, "title", "Main");
    let view = add(tree, builtin::TAB_VIEW, desktop);
    set(tree, view, "orientation", "bottom");
    let a = add(tree, builtin::TAB_PANE, view);
    set(tree, a, "label", "A");
    let b = add(tree, builtin::TAB_PANE, view);
    set(tree, b, "label", "B");
    let html = add(tree, "html", a);
    set(tree, html, "content", "<p>hi</p>");
    (desktop, a, b, html)
}

// =============================================================================
// SERIALIZE
// =============================================================================

#[test]
fn root_properties_become_document_attributes() {
    let mut tree = tree();
    let (desktop, ..) = sample(&mut tree);
    let layout = Layout::serialize(&tree, desktop).unwrap();

    assert_eq!(layout.root().attribute("title"), Some(Some("Main")));
    let top: Vec<&str> = layout.root().children.iter().map(|n| n.definition.as_str()).collect();
    assert_eq!(top, vec![builtin::TOOLBAR_ID, builtin::TAB_VIEW]);
    assert_eq!(layout.root().node_count(), 6);
}

#[test]
fn non_root_element_is_a_single_node() {
    let mut tree = tree();
    let (_, a, ..) = sample(&mut tree);
    let layout = Layout::serialize(&tree, a).unwrap();
    assert!(layout.root().attributes.is_empty());
    assert_eq!(layout.root().children.len(), 1);
    assert_eq!(layout.root().children[0].attribute("label"), Some(Some("A")));
    assert_eq!(layout.root_kind(tree.catalog()).as_deref(), Some(builtin::TAB_PANE));
}

#[test]
fn default_values_are_omitted() {
    let mut tree = tree();
    let (.., html) = sample(&mut tree);
    let layout = Layout::serialize(&tree, html).unwrap();
    let node = &layout.root().children[0];
    assert_eq!(node.attribute("sandbox"), None);
    assert_eq!(node.attribute("content"), Some(Some("<p>hi</p>")));

    tree.set_property(html, "sandbox", Some(PropertyValue::Boolean(false))).unwrap();
    let layout = Layout::serialize(&tree, html).unwrap();
    let node = &layout.root().children[0];
    assert_eq!(node.attribute("sandbox"), Some(Some("false")));
}

#[test]
fn cleared_value_with_default_is_written_as_null() {
    let mut tree = tree();
    let (.., html) = sample(&mut tree);
    tree.set_property(html, "sandbox", None).unwrap();
    let layout = Layout::serialize(&tree, html).unwrap();
    let node = &layout.root().children[0];
    assert_eq!(node.attribute("sandbox"), Some(None));
}

#[test]
fn transient_properties_are_skipped() {
    let mut tree = tree();
    let (desktop, ..) = sample(&mut tree);
    let layout = Layout::serialize(&tree, desktop).unwrap();
    let view = &layout.root().children[1];
    assert_eq!(view.attribute("panes"), None);
    assert_eq!(view.attribute("orientation"), Some(Some("bottom")));
}

// =============================================================================
// MATERIALIZE
// =============================================================================

#[test]
fn round_trip_through_a_fresh_desktop() {
    let mut source = tree();
    let (desktop, ..) = sample(&mut source);
    let layout = Layout::serialize(&source, desktop).unwrap();

    let mut target = tree();
    let fresh = create_desktop(&mut target).unwrap();
    let created = layout.materialize(&mut target, fresh).unwrap();

    // The toolbar node resolves to the existing fixed toolbar.
    assert_eq!(created, vec![target.children(fresh)[1]]);
    assert_eq!(target.child_count(fresh), 2);
    assert_eq!(target.property(fresh, "title").unwrap(), Some(PropertyValue::text("Main")));
    assert_eq!(Layout::serialize(&target, fresh).unwrap(), layout);
    assert!(target.get(fresh).unwrap().is_activated());
}

#[test]
fn materialize_activates_the_active_pane_only() {
    let mut source = tree();
    let (desktop, ..) = sample(&mut source);
    let layout = Layout::serialize(&source, desktop).unwrap();

    let mut target = tree();
    let fresh = create_desktop(&mut target).unwrap();
    layout.materialize(&mut target, fresh).unwrap();
    let view = target.find_child(fresh, builtin::TAB_VIEW, false).unwrap();
    let panes = target.children(view).to_vec();
    assert!(target.get(panes[0]).unwrap().is_activated());
    assert!(!target.get(panes[1]).unwrap().is_activated());
}

#[test]
fn cut_and_paste_between_panes() {
    let mut tree = tree();
    let (_, a, b, html) = sample(&mut tree);

    let clip = Layout::serialize(&tree, html).unwrap();
    tree.remove(html, true).unwrap();
    assert_eq!(tree.child_count(a), 0);

    let pasted = clip.materialize(&mut tree, b).unwrap();
    assert_eq!(pasted.len(), 1);
    assert_eq!(tree.children(b), pasted.as_slice());
    assert_eq!(tree.property(pasted[0], "content").unwrap(), Some(PropertyValue::text("<p>hi</p>")));
}

#[test]
fn internal_nodes_are_ignored_outside_the_desktop() {
    let mut tree = tree();
    let layout_root = tree.create_root(builtin::LAYOUT).unwrap();
    let mut layout = Layout::new();
    layout.root_mut().children.push(LayoutNode::new(builtin::TOOLBAR_ID));
    assert_eq!(layout.materialize(&mut tree, layout_root).unwrap(), Vec::new());
    assert_eq!(tree.child_count(layout_root), 0);
}

#[test]
fn failed_materialize_removes_what_it_created() {
    let mut tree = tree();
    let root = tree.create_root(builtin::LAYOUT).unwrap();
    let mut layout = Layout::new();
    let children = &mut layout.root_mut().children;
    children.push(LayoutNode::new("html"));
    children.push(LayoutNode::new(builtin::TAB_PANE));
    children.push(LayoutNode::new(builtin::STEP_PANE));

    let err = layout.materialize(&mut tree, root).unwrap_err();
    assert!(matches!(err, TreeError::Aggregate { count: 2, .. }), "{err:?}");
    assert_eq!(tree.child_count(root), 0);
    assert_eq!(tree.len(), 1);
}

#[test]
fn failed_materialize_spares_what_the_toolbar_already_held() {
    let mut tree = tree();
    let desktop = create_desktop(&mut tree).unwrap();
    let toolbar = tree.children(desktop)[0];
    let existing = add(&mut tree, "html", toolbar);
    let mut layout = Layout::new();
    let children = &mut layout.root_mut().children;
    children.push(LayoutNode::new(builtin::TOOLBAR_ID).with_child(LayoutNode::new("html")));
    children.push(LayoutNode::new("no_such_plugin"));

    assert!(layout.materialize(&mut tree, desktop).is_err());
    assert!(tree.contains(toolbar));
    assert_eq!(tree.children(toolbar), &[existing]);
    assert_eq!(tree.children(desktop), &[toolbar]);
}

#[test]
fn nested_failure_discards_the_branch() {
    let mut tree = tree();
    let root = tree.create_root(builtin::LAYOUT).unwrap();
    let mut layout = Layout::new();
    layout
        .root_mut()
        .children
        .push(LayoutNode::new(builtin::TAB_VIEW).with_child(LayoutNode::new("html")));

    let err = layout.materialize(&mut tree, root).unwrap_err();
    assert!(matches!(err, TreeError::Constraint(_)), "{err:?}");
    assert_eq!(tree.child_count(root), 0);
}

#[test]
fn bad_values_are_skipped_not_fatal() {
    let mut tree = tree();
    let root = tree.create_root(builtin::LAYOUT).unwrap();
    let mut layout = Layout::new();
    layout
        .root_mut()
        .children
        .push(LayoutNode::new("url").with_attribute("refresh", Some("soon")).with_attribute("url", Some("/a")));

    let created = layout.materialize(&mut tree, root).unwrap();
    assert_eq!(tree.property(created[0], "refresh").unwrap(), Some(PropertyValue::Integer(0)));
    assert_eq!(tree.property(created[0], "url").unwrap(), Some(PropertyValue::text("/a")));
}

// =============================================================================
// DOCUMENT
// =============================================================================

#[test]
fn unknown_definitions_in_document_order() {
    let catalog = builtin::standard_catalog().unwrap();
    let mut layout = Layout::new();
    layout.root_mut().children.push(
        LayoutNode::new(builtin::LAYOUT)
            .with_child(LayoutNode::new("chart"))
            .with_child(LayoutNode::new("html")),
    );
    layout.root_mut().children.push(LayoutNode::new("grid"));
    assert_eq!(layout.unknown_definitions(&catalog), vec!["chart".to_string(), "grid".to_string()]);
    assert_eq!(layout.root_kind(&catalog).as_deref(), Some(builtin::LAYOUT));
}

#[test]
fn json_round_trip_keeps_nulls() {
    let mut layout = Layout::new();
    layout.set_name("main");
    layout
        .root_mut()
        .children
        .push(LayoutNode::new("html").with_attribute("sandbox", None).with_attribute("content", Some("x")));
    let json = layout.to_json().unwrap();
    let back = Layout::from_json(&json).unwrap();
    assert_eq!(back, layout);
    assert_eq!(back.root().children[0].attribute("sandbox"), Some(None));
}

#[test]
fn set_attribute_keeps_position() {
    let mut node = LayoutNode::new("html").with_attribute("a", Some("1")).with_attribute("b", Some("2"));
    node.set_attribute("a", Some("3"));
    assert_eq!(node.attributes[0], ("a".to_string(), Some("3".to_string())));
    assert_eq!(node.attribute("b"), Some(Some("2")));
    assert_eq!(node.attribute("c"), None);
    assert!(Layout::new().is_empty());
}
