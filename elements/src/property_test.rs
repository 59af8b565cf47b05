#![allow(clippy::float_cmp)]

use super::*;

struct Colors;

impl BeanResolver for Colors {
    fn resolve_values(&self, bean_id: &str) -> Option<Vec<String>> {
        (bean_id == "colors").then(|| vec!["red".to_string(), "green".to_string()])
    }
}

// =============================================================
// Serializers
// =============================================================

#[test]
fn integer_serializer_parses_and_rejects() {
    assert_eq!(Serializer::Integer.deserialize(" 42 "), Ok(PropertyValue::Integer(42)));
    assert_eq!(
        Serializer::Integer.deserialize("4x"),
        Err(PropertyError::InvalidValue { kind: "integer", value: "4x".into() })
    );
}

#[test]
fn boolean_serializer_is_lenient() {
    assert_eq!(Serializer::Boolean.deserialize("TRUE"), Ok(PropertyValue::Boolean(true)));
    assert_eq!(Serializer::Boolean.deserialize("yes"), Ok(PropertyValue::Boolean(false)));
}

#[test]
fn date_serializer_uses_epoch_millis() {
    let value = Serializer::Date.deserialize("1700000000000").unwrap();
    assert_eq!(value, PropertyValue::Date(1_700_000_000_000));
    assert_eq!(Serializer::Date.serialize(&value), "1700000000000");
}

#[test]
fn enumerated_serializer_accepts_members_only() {
    let serializer = Serializer::Enumerated(vec!["LEFT".into(), "RIGHT".into()]);
    assert_eq!(serializer.deserialize("LEFT"), Ok(PropertyValue::text("LEFT")));
    assert!(matches!(serializer.deserialize("UP"), Err(PropertyError::NotAllowed { .. })));
    assert_eq!(serializer.values().unwrap().len(), 2);
}

#[test]
fn convert_parses_text_into_native_type() {
    assert_eq!(
        Serializer::Double.convert(PropertyValue::text("2.5")),
        Ok(PropertyValue::Double(2.5))
    );
    assert_eq!(
        Serializer::Integer.convert(PropertyValue::Integer(3)),
        Ok(PropertyValue::Integer(3))
    );
    assert_eq!(
        Serializer::Text.convert(PropertyValue::Boolean(true)),
        Ok(PropertyValue::text("true"))
    );
}

#[test]
fn value_accessors() {
    assert_eq!(PropertyValue::text("a").as_text(), Some("a"));
    assert_eq!(PropertyValue::Boolean(true).as_bool(), Some(true));
    assert_eq!(PropertyValue::Integer(7).as_double(), Some(7.0));
    assert_eq!(PropertyValue::Date(5).as_integer(), Some(5));
    assert_eq!(PropertyValue::Double(1.5).as_text(), None);
}

#[test]
fn value_serde_shape() {
    let json = serde_json::to_value(PropertyValue::Integer(3)).unwrap();
    assert_eq!(json, serde_json::json!({"type": "integer", "value": 3}));
}

// =============================================================
// Registry
// =============================================================

#[test]
fn registry_has_builtin_types() {
    let registry = PropertyTypeRegistry::new();
    for name in ["text", "color", "choice", "action", "icon", "integer", "double", "boolean", "date"] {
        assert!(registry.resolve(name).is_ok(), "missing {name}");
    }
    assert_eq!(registry.resolve("boolean").unwrap().editor, EditorKind::Boolean);
}

#[test]
fn registry_builds_enum_from_class() {
    let mut registry = PropertyTypeRegistry::new();
    registry.register_enum("Alignment", &["LEFT", "CENTER", "RIGHT"]);
    let ty = registry.resolve("enum:class:Alignment").unwrap();
    assert_eq!(ty.editor, EditorKind::Enum);
    assert_eq!(ty.serializer.unwrap().values().unwrap().len(), 3);
}

#[test]
fn registry_builds_enum_from_bean() {
    let mut registry = PropertyTypeRegistry::new();
    registry.set_bean_resolver(Arc::new(Colors));
    let ty = registry.resolve("enum:bean:colors").unwrap();
    assert_eq!(ty.serializer, Some(Serializer::Enumerated(vec!["red".into(), "green".into()])));
}

#[test]
fn registry_rejects_unknown_enum_source() {
    let registry = PropertyTypeRegistry::new();
    assert_eq!(
        registry.resolve("enum:class:Missing"),
        Err(PropertyError::NotEnumerable("enum:class:Missing".into()))
    );
    assert_eq!(registry.resolve("widget"), Err(PropertyError::UnknownType("widget".into())));
}

#[test]
fn custom_types_without_serializer() {
    let mut registry = PropertyTypeRegistry::new();
    registry.register(PropertyType::new("tabs", None, EditorKind::ChildTree));
    let info = PropertyInfo::new("tabs", "Tabs").with_type("tabs");
    assert!(!info.is_serializable(&registry));
    assert!(matches!(info.serializer(&registry), Err(PropertyError::NotSerializable(_))));
}

// =============================================================
// Config and info
// =============================================================

#[test]
fn config_parses_pipe_separated_pairs() {
    let config = PropertyConfig::parse("min=1|max=10|values=a,b,,c|readonly=false|junk");
    assert_eq!(config.get_int("min"), Some(1));
    assert_eq!(config.get_double("max"), Some(10.0));
    assert_eq!(config.get_array("values", ","), vec!["a", "b", "c"]);
    assert!(!config.get_bool("readonly", true));
    assert!(config.get_bool("missing", true));
    assert_eq!(config.get("junk"), None);
}

#[test]
fn config_value_may_contain_equals() {
    let config = PropertyConfig::parse("constraint=a=b");
    assert_eq!(config.get("constraint"), Some("a=b"));
}

#[test]
fn enum_type_name_expands_from_config() {
    let info = PropertyInfo::new("align", "Alignment")
        .with_type("enum")
        .with_config("class=Alignment");
    assert_eq!(info.type_name(), "enum:class:Alignment");
    let bean = PropertyInfo::new("color", "Color").with_type("enum").with_config("bean=colors");
    assert_eq!(bean.type_name(), "enum:bean:colors");
}

#[test]
fn parse_value_honors_null_marker() {
    let registry = PropertyTypeRegistry::new();
    let info = PropertyInfo::new("size", "Size").with_type("integer");
    assert_eq!(info.parse_value(&registry, Some(NULL_VALUE)), Ok(None));
    assert_eq!(info.parse_value(&registry, None), Ok(None));
    assert_eq!(info.parse_value(&registry, Some("3")), Ok(Some(PropertyValue::Integer(3))));
}

#[test]
fn parsed_default_uses_property_type() {
    let registry = PropertyTypeRegistry::new();
    let info = PropertyInfo::new("flag", "Flag").with_type("boolean").with_default("true");
    assert_eq!(info.parsed_default(&registry), Ok(Some(PropertyValue::Boolean(true))));
    let none = PropertyInfo::new("label", "Label");
    assert_eq!(none.parsed_default(&registry), Ok(None));
}

#[test]
fn transient_and_read_only_flags() {
    let registry = PropertyTypeRegistry::new();
    let info = PropertyInfo::new("x", "X").transient().read_only();
    assert!(!info.is_serializable(&registry));
    assert!(!info.is_editable());
}
