//! Property descriptors, typed values, serializers, and the type registry.
//!
//! A [`PropertyInfo`] describes one declared property of a plugin definition.
//! Its type name resolves through the [`PropertyTypeRegistry`] to a
//! [`PropertyType`], which pairs a [`Serializer`] (string form used by layouts
//! and defaults) with the [`EditorKind`] the designer uses to edit it.
//!
//! Values travel as [`PropertyValue`]; `None` stands for a null value, which
//! layouts spell as [`NULL_VALUE`].

#[cfg(test)]
#[path = "property_test.rs"]
mod property_test;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::access::Accessor;

/// Serialized marker for an explicit null property value.
pub const NULL_VALUE: &str = "\\null\\";

/// Default property type name.
pub const DEFAULT_TYPE: &str = "text";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("invalid {kind} value '{value}'")]
    InvalidValue { kind: &'static str, value: String },
    #[error("'{value}' is not one of the allowed values")]
    NotAllowed { value: String },
    #[error("Not an enumerable type: {0}")]
    NotEnumerable(String),
    #[error("unknown property type: {0}")]
    UnknownType(String),
    #[error("property type {0} has no serializer")]
    NotSerializable(String),
    #[error("{0}")]
    Rejected(String),
}

// =============================================================================
// VALUES
// =============================================================================

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    /// Milliseconds since the Unix epoch.
    Date(i64),
}

impl PropertyValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) | Self::Date(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Short name of the value's type, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) | Self::Date(n) => write!(f, "{n}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

// =============================================================================
// SERIALIZERS
// =============================================================================

/// Converts property values to and from their layout string form.
#[derive(Debug, Clone, PartialEq)]
pub enum Serializer {
    Text,
    Integer,
    Double,
    Boolean,
    Date,
    /// Text restricted to a fixed list of members.
    Enumerated(Vec<String>),
}

impl Serializer {
    #[must_use]
    pub fn serialize(&self, value: &PropertyValue) -> String {
        value.to_string()
    }

    pub fn deserialize(&self, text: &str) -> Result<PropertyValue, PropertyError> {
        match self {
            Self::Text => Ok(PropertyValue::Text(text.to_string())),
            Self::Integer => text
                .trim()
                .parse::<i64>()
                .map(PropertyValue::Integer)
                .map_err(|_| invalid("integer", text)),
            Self::Double => text
                .trim()
                .parse::<f64>()
                .map(PropertyValue::Double)
                .map_err(|_| invalid("double", text)),
            Self::Boolean => Ok(PropertyValue::Boolean(text.trim().eq_ignore_ascii_case("true"))),
            Self::Date => text
                .trim()
                .parse::<i64>()
                .map(PropertyValue::Date)
                .map_err(|_| invalid("date", text)),
            Self::Enumerated(values) => {
                if values.iter().any(|v| v == text) {
                    Ok(PropertyValue::Text(text.to_string()))
                } else {
                    Err(PropertyError::NotAllowed { value: text.to_string() })
                }
            }
        }
    }

    /// Bring a value to this serializer's native type, parsing text when needed.
    pub fn convert(&self, value: PropertyValue) -> Result<PropertyValue, PropertyError> {
        let native = matches!(
            (self, &value),
            (Self::Text, PropertyValue::Text(_))
                | (Self::Integer, PropertyValue::Integer(_))
                | (Self::Double, PropertyValue::Double(_))
                | (Self::Boolean, PropertyValue::Boolean(_))
                | (Self::Date, PropertyValue::Date(_))
        );
        if native {
            return Ok(value);
        }
        self.deserialize(&value.to_string())
    }

    /// Members of an enumerated serializer.
    #[must_use]
    pub fn values(&self) -> Option<&[String]> {
        match self {
            Self::Enumerated(values) => Some(values),
            _ => None,
        }
    }
}

fn invalid(kind: &'static str, value: &str) -> PropertyError {
    PropertyError::InvalidValue { kind, value: value.to_string() }
}

// =============================================================================
// TYPES
// =============================================================================

/// Which designer editor handles a property type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorKind {
    Text,
    Color,
    Choice,
    Action,
    Icon,
    Integer,
    Double,
    Boolean,
    Date,
    Enum,
    /// Tree-structured editor over a container's children (tabs, nodes, steps).
    ChildTree,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyType {
    pub name: String,
    pub serializer: Option<Serializer>,
    pub editor: EditorKind,
}

impl PropertyType {
    #[must_use]
    pub fn new(name: &str, serializer: Option<Serializer>, editor: EditorKind) -> Self {
        Self { name: name.to_string(), serializer, editor }
    }
}

/// Resolves a named service to the list of values it enumerates.
pub trait BeanResolver {
    fn resolve_values(&self, bean_id: &str) -> Option<Vec<String>>;
}

/// Named property types, including on-demand `enum:` types.
#[derive(Clone)]
pub struct PropertyTypeRegistry {
    types: HashMap<String, PropertyType>,
    enums: HashMap<String, Vec<String>>,
    beans: Option<Arc<dyn BeanResolver + Send + Sync>>,
}

impl fmt::Debug for PropertyTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyTypeRegistry")
            .field("types", &self.types.len())
            .field("enums", &self.enums.keys().collect::<Vec<_>>())
            .field("beans", &self.beans.is_some())
            .finish()
    }
}

impl Default for PropertyTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyTypeRegistry {
    /// Registry preloaded with the built-in types.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self { types: HashMap::new(), enums: HashMap::new(), beans: None };
        for (name, serializer, editor) in [
            ("text", Serializer::Text, EditorKind::Text),
            ("color", Serializer::Text, EditorKind::Color),
            ("choice", Serializer::Text, EditorKind::Choice),
            ("action", Serializer::Text, EditorKind::Action),
            ("icon", Serializer::Text, EditorKind::Icon),
            ("integer", Serializer::Integer, EditorKind::Integer),
            ("double", Serializer::Double, EditorKind::Double),
            ("boolean", Serializer::Boolean, EditorKind::Boolean),
            ("date", Serializer::Date, EditorKind::Date),
        ] {
            registry.register(PropertyType::new(name, Some(serializer), editor));
        }
        registry
    }

    /// Add or replace a property type.
    pub fn register(&mut self, property_type: PropertyType) {
        self.types.insert(property_type.name.clone(), property_type);
    }

    /// Register a named enumeration usable as `enum:class:<name>`.
    pub fn register_enum(&mut self, name: &str, values: &[&str]) {
        self.enums
            .insert(name.to_string(), values.iter().map(|v| (*v).to_string()).collect());
    }

    /// Install the resolver consulted for `enum:bean:<id>` types.
    pub fn set_bean_resolver(&mut self, resolver: Arc<dyn BeanResolver + Send + Sync>) {
        self.beans = Some(resolver);
    }

    /// Look up a type by name, building `enum:` types on demand.
    pub fn resolve(&self, name: &str) -> Result<PropertyType, PropertyError> {
        if let Some(found) = self.types.get(name) {
            return Ok(found.clone());
        }
        let Some(rest) = name.strip_prefix("enum:") else {
            return Err(PropertyError::UnknownType(name.to_string()));
        };
        let values = match rest.split_once(':') {
            Some(("class", class)) => self.enums.get(class).cloned(),
            Some(("bean", bean)) => self.beans.as_ref().and_then(|r| r.resolve_values(bean)),
            _ => None,
        };
        let Some(values) = values else {
            return Err(PropertyError::NotEnumerable(name.to_string()));
        };
        Ok(PropertyType::new(name, Some(Serializer::Enumerated(values)), EditorKind::Enum))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Editor options parsed from a `key=value|key=value` string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyConfig {
    entries: BTreeMap<String, String>,
}

impl PropertyConfig {
    /// Parse a config string. Entries without `=` are ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split('|')
            .filter_map(|param| param.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { entries }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(parse_trimmed)
    }

    #[must_use]
    pub fn get_double(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(parse_trimmed)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).map_or(default, |v| v.trim().eq_ignore_ascii_case("true"))
    }

    /// Split a value on `delimiter`, dropping empty pieces.
    #[must_use]
    pub fn get_array(&self, key: &str, delimiter: &str) -> Vec<String> {
        let Some(value) = self.get(key) else {
            return Vec::new();
        };
        if delimiter.is_empty() {
            return vec![value.to_string()];
        }
        value
            .split(delimiter)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_trimmed<T: std::str::FromStr>(value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => None,
    }
}

// =============================================================================
// PROPERTY INFO
// =============================================================================

/// One declared property of a plugin definition.
#[derive(Debug, Clone)]
pub struct PropertyInfo {
    id: String,
    name: String,
    description: Option<String>,
    type_name: String,
    default: Option<String>,
    config: PropertyConfig,
    editable: bool,
    serializable: bool,
    accessor: Option<Accessor>,
}

impl PropertyInfo {
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            type_name: DEFAULT_TYPE.to_string(),
            default: None,
            config: PropertyConfig::default(),
            editable: true,
            serializable: true,
            accessor: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, type_name: &str) -> Self {
        self.type_name = type_name.to_string();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: &str) -> Self {
        self.config = PropertyConfig::parse(config);
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    #[must_use]
    pub fn transient(mut self) -> Self {
        self.serializable = false;
        self
    }

    /// Route reads and writes through `accessor` instead of the kind's table.
    #[must_use]
    pub fn with_accessor(mut self, accessor: Accessor) -> Self {
        self.accessor = Some(accessor);
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

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Effective type name. A bare `enum` type is expanded from its
    /// `class` or `bean` config option.
    #[must_use]
    pub fn type_name(&self) -> String {
        if self.type_name != "enum" {
            return self.type_name.clone();
        }
        match self.config.get("class") {
            Some(class) => format!("enum:class:{class}"),
            None => format!("enum:bean:{}", self.config.get("bean").unwrap_or_default()),
        }
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    #[must_use]
    pub fn config(&self) -> &PropertyConfig {
        &self.config
    }

    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    #[must_use]
    pub fn accessor(&self) -> Option<&Accessor> {
        self.accessor.as_ref()
    }

    /// Resolve this property's type against `types`.
    pub fn property_type(&self, types: &PropertyTypeRegistry) -> Result<PropertyType, PropertyError> {
        types.resolve(&self.type_name())
    }

    /// True when the property is flagged serializable and its type has a serializer.
    #[must_use]
    pub fn is_serializable(&self, types: &PropertyTypeRegistry) -> bool {
        self.serializable
            && self
                .property_type(types)
                .is_ok_and(|t| t.serializer.is_some())
    }

    /// Serializer for this property, or an error when it has none.
    pub fn serializer(&self, types: &PropertyTypeRegistry) -> Result<Serializer, PropertyError> {
        let property_type = self.property_type(types)?;
        property_type
            .serializer
            .ok_or(PropertyError::NotSerializable(property_type.name))
    }

    /// Parse a serialized string, honoring the null marker.
    pub fn parse_value(
        &self,
        types: &PropertyTypeRegistry,
        text: Option<&str>,
    ) -> Result<Option<PropertyValue>, PropertyError> {
        match text {
            None => Ok(None),
            Some(NULL_VALUE) => Ok(None),
            Some(text) => self.serializer(types)?.deserialize(text).map(Some),
        }
    }

    /// Parsed default value, if one is declared.
    pub fn parsed_default(&self, types: &PropertyTypeRegistry) -> Result<Option<PropertyValue>, PropertyError> {
        self.parse_value(types, self.default.as_deref())
    }
}
