use super::*;
use crate::builtin::{self, create_desktop};

fn setup() -> (ElementTree, ElementId) {
    let mut tree = ElementTree::new(Arc::new(builtin::standard_catalog().unwrap()));
    let desktop = create_desktop(&mut tree).unwrap();
    let view = tree.create_element(builtin::TAB_VIEW, Some(desktop), None, false).unwrap().unwrap();
    (tree, view)
}

fn pane_definition(tree: &ElementTree) -> Arc<PluginDefinition> {
    Arc::clone(tree.catalog().definition(builtin::TAB_PANE).unwrap())
}

#[test]
fn edits_stay_in_the_cache_until_commit() {
    let (mut tree, view) = setup();
    let pane = tree.create_element(builtin::TAB_PANE, Some(view), None, false).unwrap().unwrap();
    tree.set_property(pane, "label", Some(PropertyValue::text("Old"))).unwrap();

    let mut proxy = ElementProxy::for_element(&tree, pane).unwrap();
    assert_eq!(proxy.get("label"), Some(&PropertyValue::text("Old")));

    let previous = proxy.set("label", Some(PropertyValue::text("New")));
    assert_eq!(previous, Some(PropertyValue::text("Old")));
    assert_eq!(tree.property(pane, "label").unwrap(), Some(PropertyValue::text("Old")));

    proxy.commit(&mut tree).unwrap();
    assert_eq!(tree.property(pane, "label").unwrap(), Some(PropertyValue::text("New")));
}

#[test]
fn revert_reloads_from_target() {
    let (mut tree, view) = setup();
    let pane = tree.create_element(builtin::TAB_PANE, Some(view), None, false).unwrap().unwrap();
    let mut proxy = ElementProxy::for_element(&tree, pane).unwrap();
    proxy.set("label", Some(PropertyValue::text("Draft")));
    proxy.revert(&tree);
    assert_eq!(proxy.get("label"), None);
}

#[test]
fn pending_proxy_caches_defaults_and_creates_on_realize() {
    let (mut tree, view) = setup();
    let definition = Arc::clone(tree.catalog().definition(builtin::TREE_VIEW).unwrap());
    let mut proxy = ElementProxy::for_definition(&tree, definition);
    assert_eq!(proxy.target(), ProxyTarget::Pending);
    assert_eq!(proxy.get("open"), Some(&PropertyValue::Boolean(true)));

    let desktop = tree.parent_of(view).unwrap();
    proxy.set("caption", Some(PropertyValue::text("Index")));
    proxy.realize(&mut tree, desktop).unwrap();
    let id = proxy.element().unwrap();
    assert_eq!(tree.parent_of(id), Some(desktop));
    assert_eq!(tree.property(id, "caption").unwrap(), None);

    proxy.commit(&mut tree).unwrap();
    assert_eq!(tree.property(id, "caption").unwrap(), Some(PropertyValue::text("Index")));
}

#[test]
fn deleted_proxy_removes_its_element() {
    let (mut tree, view) = setup();
    let pane = tree.create_element(builtin::TAB_PANE, Some(view), None, false).unwrap().unwrap();
    let mut proxy = ElementProxy::for_element(&tree, pane).unwrap();
    proxy.set_deleted(true);
    proxy.commit(&mut tree).unwrap();
    assert!(tree.contains(pane));

    proxy.realize(&mut tree, view).unwrap();
    assert!(!tree.contains(pane));
    assert_eq!(proxy.target(), ProxyTarget::Pending);
    assert!(proxy.is_deleted());

    // A deleted pending proxy never creates anything.
    proxy.realize(&mut tree, view).unwrap();
    assert_eq!(tree.child_count(view), 0);
}

#[test]
fn realize_reports_rejected_parent() {
    let (mut tree, view) = setup();
    let desktop = tree.parent_of(view).unwrap();
    let mut proxy = ElementProxy::for_definition(&tree, pane_definition(&tree));
    assert!(matches!(proxy.realize(&mut tree, desktop), Err(TreeError::Constraint(_))));
    assert_eq!(proxy.target(), ProxyTarget::Pending);
}

#[test]
fn commit_reports_every_failure() {
    let (mut tree, view) = setup();
    let desktop = tree.parent_of(view).unwrap();
    let url = tree.create_element("url", Some(desktop), None, false).unwrap().unwrap();
    let mut proxy = ElementProxy::for_element(&tree, url).unwrap();
    proxy.set("refresh", Some(PropertyValue::text("soon")));
    proxy.set("url", Some(PropertyValue::text("/x")));

    let err = proxy.commit(&mut tree).unwrap_err();
    assert!(matches!(err, TreeError::Property { ref property, .. } if property == "refresh"), "{err:?}");
    assert_eq!(tree.property(url, "url").unwrap(), Some(PropertyValue::text("/x")));
}
