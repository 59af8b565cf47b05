use super::*;

struct Roles(&'static [&'static str]);

impl RoleCheck for Roles {
    fn has_role(&self, role: &str) -> bool {
        self.0.contains(&role)
    }
}

#[test]
fn internal_iff_underscore_prefix() {
    assert!(PluginDefinition::new("_toolbar", "Toolbar", "toolbar").is_internal());
    assert!(!PluginDefinition::new("toolbar", "Toolbar", "toolbar").is_internal());
}

#[test]
fn forbidden_with_any_authority() {
    let def = PluginDefinition::new("p", "P", "plugin")
        .with_authority("ADMIN")
        .with_authority("DESIGNER");
    assert!(!def.is_forbidden(&Roles(&["DESIGNER"])));
    assert!(def.is_forbidden(&Roles(&["USER"])));
}

#[test]
fn forbidden_when_all_required() {
    let def = PluginDefinition::new("p", "P", "plugin")
        .with_authority("ADMIN")
        .with_authority("DESIGNER")
        .requiring_all();
    assert!(def.is_forbidden(&Roles(&["DESIGNER"])));
    assert!(!def.is_forbidden(&Roles(&["DESIGNER", "ADMIN"])));
}

#[test]
fn no_authorities_never_forbidden() {
    let def = PluginDefinition::new("p", "P", "plugin");
    assert!(!def.is_forbidden(&Roles(&[])));
}

#[test]
fn category_path_splits_on_backslash() {
    let def = PluginDefinition::new("p", "P", "plugin").with_category("Clinical\\ Labs \\\\Results");
    assert_eq!(def.category_path(), vec!["Clinical", "Labs", "Results"]);
    assert!(PluginDefinition::new("q", "Q", "plugin").category_path().is_empty());
}

#[test]
fn editable_properties_detected() {
    let def = PluginDefinition::new("p", "P", "plugin").with_property(PropertyInfo::new("a", "A").read_only());
    assert!(!def.has_editable_properties());
    let def = def.with_property(PropertyInfo::new("b", "B"));
    assert!(def.has_editable_properties());
    assert_eq!(def.property("b").unwrap().name(), "B");
}

#[test]
fn unresolved_properties_listed() {
    let types = PropertyTypeRegistry::new();
    let def = PluginDefinition::new("p", "P", "plugin")
        .with_property(PropertyInfo::new("a", "A").with_type("integer"))
        .with_property(PropertyInfo::new("b", "B").with_type("hologram"));
    assert_eq!(def.unresolved_properties(&types), vec!["b"]);
}

#[test]
fn registry_rejects_duplicates_and_empty_ids() {
    let mut registry = PluginRegistry::new();
    registry.register(PluginDefinition::new("a", "A", "plugin")).unwrap();
    assert_eq!(
        registry.register(PluginDefinition::new("a", "Again", "plugin")).unwrap_err(),
        DefinitionError::Duplicate("a".into())
    );
    assert_eq!(
        registry.register(PluginDefinition::new("", "Empty", "plugin")).unwrap_err(),
        DefinitionError::EmptyId
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn registry_lookup_by_kind_returns_first_registered() {
    let mut registry = PluginRegistry::new();
    registry.register(PluginDefinition::new("tabview", "Tab View", "tabview")).unwrap();
    registry.register(PluginDefinition::new("tabview2", "Other Tabs", "tabview")).unwrap();
    assert_eq!(registry.for_kind("tabview").unwrap().id(), "tabview");
    assert!(registry.for_kind("none").is_none());
}

#[test]
fn registry_sorts_case_insensitively() {
    let mut registry = PluginRegistry::new();
    registry.register(PluginDefinition::new("b", "beta", "plugin")).unwrap();
    registry.register(PluginDefinition::new("a", "Alpha", "plugin")).unwrap();
    registry.register(PluginDefinition::new("c", "Gamma", "plugin")).unwrap();
    let names: Vec<_> = registry.sorted_by_name().iter().map(|d| d.name().to_string()).collect();
    assert_eq!(names, vec!["Alpha", "beta", "Gamma"]);
}
