//! Layout XML codec.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <layout title="Main" version="4.0" name="default">
//!   <element _type="tabview">
//!     <element _type="tabpane" label="A"/>
//!   </element>
//! </layout>
//! ```
//!
//! Layouts older than version 4.0 use the legacy form, where each tag name is
//! the definition id and there is no `_type` attribute. Trigger blocks are
//! skipped. Parsing only builds a [`Layout`]; it never touches a tree.

#[cfg(test)]
#[path = "xml_test.rs"]
mod xml_test;

use std::fmt;
use std::io::Write;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::catalog::Catalog;
use crate::layout::{LAYOUT_VERSION, Layout, LayoutError, LayoutNode};
use crate::property::NULL_VALUE;

const TYPE_ATTRIBUTE: &str = "_type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Layout,
    Element,
    Trigger,
    Condition,
    Action,
}

impl Tag {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "layout" => Some(Self::Layout),
            "element" => Some(Self::Element),
            "trigger" => Some(Self::Trigger),
            "condition" => Some(Self::Condition),
            "action" => Some(Self::Action),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Element => "element",
            Self::Trigger => "trigger",
            Self::Condition => "condition",
            Self::Action => "action",
        }
    }
}

fn xml_error(e: impl fmt::Display) -> LayoutError {
    LayoutError::Xml(e.to_string())
}

/// Check `name` against the tags allowed at this position.
fn expect_tag(name: &str, allowed: &[Tag]) -> Result<Tag, LayoutError> {
    let message = match Tag::parse(name) {
        Some(tag) if allowed.contains(&tag) => return Ok(tag),
        Some(_) => format!("Tag '{name}' is not valid at this location"),
        None => format!("Unrecognized tag '{name}' in layout"),
    };
    let names: Vec<String> = allowed.iter().map(|t| format!("'{}'", t.name())).collect();
    let expected = match names.len() {
        0 => "no tags were expected".to_string(),
        1 => format!("expected {}", names[0]),
        _ => format!("expected one of {}", names.join(", ")),
    };
    Err(LayoutError::InvalidTag { message, expected })
}

fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

/// Attributes in document order, with the null marker decoded.
fn read_attributes(start: &BytesStart<'_>) -> Result<Vec<(String, Option<String>)>, LayoutError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?;
        let value = (value != NULL_VALUE).then(|| value.into_owned());
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn take_required(
    attributes: &mut Vec<(String, Option<String>)>,
    name: &str,
    node: &str,
) -> Result<String, LayoutError> {
    let position = attributes.iter().position(|(k, _)| k == name);
    match position.map(|i| attributes.remove(i)) {
        Some((_, Some(value))) if !value.is_empty() => Ok(value),
        _ => Err(LayoutError::MissingAttribute { attribute: name.to_string(), node: node.to_string() }),
    }
}

fn take_optional(attributes: &mut Vec<(String, Option<String>)>, name: &str) -> Option<String> {
    let position = attributes.iter().position(|(k, _)| k == name)?;
    attributes.remove(position).1
}

/// True when the dotted version `version` is at least `major.minor`.
fn version_at_least(version: &str, major: u32, minor: u32) -> bool {
    let mut parts = version.split('.').map(|p| p.trim().parse::<u32>().unwrap_or(0));
    let found = (parts.next().unwrap_or(0), parts.next().unwrap_or(0));
    found >= (major, minor)
}

// =============================================================================
// PARSE
// =============================================================================

/// Parse layout XML, resolving every node's definition against `catalog`.
pub fn parse(text: &str, catalog: &Catalog) -> Result<Layout, LayoutError> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => return parse_layout(&mut reader, &start, false, catalog),
            Event::Empty(start) => return parse_layout(&mut reader, &start, true, catalog),
            Event::Eof => return Err(LayoutError::Empty),
            _ => {}
        }
    }
}

fn parse_layout(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    empty: bool,
    catalog: &Catalog,
) -> Result<Layout, LayoutError> {
    let name = tag_name(start);
    expect_tag(&name, &[Tag::Layout])?;
    let mut attributes = read_attributes(start)?;
    let version = take_required(&mut attributes, "version", &name)?;
    let layout_name = take_optional(&mut attributes, "name");
    let legacy = !version_at_least(&version, 4, 0);

    let mut root = LayoutNode { attributes, ..LayoutNode::default() };
    if !empty {
        parse_children(reader, &mut root, legacy, &[Tag::Element], catalog)?;
    }
    tracing::debug!(version = %version, legacy, nodes = root.node_count() - 1, "parsed layout");
    Ok(Layout::from_root(layout_name.as_deref(), &version, root))
}

fn parse_children(
    reader: &mut Reader<&[u8]>,
    parent: &mut LayoutNode,
    legacy: bool,
    allowed: &[Tag],
    catalog: &Catalog,
) -> Result<(), LayoutError> {
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => match open_node(&start, legacy, allowed, catalog)? {
                Some(mut node) => {
                    parse_children(reader, &mut node, legacy, &[Tag::Element, Tag::Trigger], catalog)?;
                    parent.children.push(node);
                }
                None => {
                    reader.read_to_end(start.name()).map_err(xml_error)?;
                }
            },
            Event::Empty(start) => {
                if let Some(node) = open_node(&start, legacy, allowed, catalog)? {
                    parent.children.push(node);
                }
            }
            Event::End(_) => return Ok(()),
            Event::Eof => return Err(LayoutError::Xml("unexpected end of document".to_string())),
            _ => {}
        }
    }
}

/// Build the node for `start`, or `None` for a block that is skipped.
fn open_node(
    start: &BytesStart<'_>,
    legacy: bool,
    allowed: &[Tag],
    catalog: &Catalog,
) -> Result<Option<LayoutNode>, LayoutError> {
    let name = tag_name(start);
    let mut attributes = read_attributes(start)?;

    let definition = if legacy {
        name.clone()
    } else {
        if expect_tag(&name, allowed)? == Tag::Trigger {
            tracing::debug!("skipping layout trigger");
            return Ok(None);
        }
        take_required(&mut attributes, TYPE_ATTRIBUTE, &name)?
    };

    if catalog.definition(&definition).is_none() {
        return Err(LayoutError::UnknownType { node: name, kind: definition });
    }
    Ok(Some(LayoutNode { definition, attributes, children: Vec::new() }))
}

// =============================================================================
// WRITE
// =============================================================================

/// Render `layout` as XML in the current format.
pub fn write(layout: &Layout) -> Result<String, LayoutError> {
    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(&mut buffer, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;

    let mut start = BytesStart::new("layout");
    push_attributes(&mut start, &layout.root().attributes);
    start.push_attribute(("version", LAYOUT_VERSION));
    if let Some(name) = layout.name() {
        start.push_attribute(("name", name));
    }
    write_node(&mut writer, start, "layout", &layout.root().children)?;

    String::from_utf8(buffer).map_err(xml_error)
}

fn push_attributes(start: &mut BytesStart<'_>, attributes: &[(String, Option<String>)]) {
    for (key, value) in attributes {
        start.push_attribute((key.as_str(), value.as_deref().unwrap_or(NULL_VALUE)));
    }
}

fn write_node<W: Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    tag: &str,
    children: &[LayoutNode],
) -> Result<(), LayoutError> {
    if children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }
    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    for child in children {
        let mut element = BytesStart::new(Tag::Element.name());
        element.push_attribute((TYPE_ATTRIBUTE, child.definition.as_str()));
        push_attributes(&mut element, &child.attributes);
        write_node(writer, element, Tag::Element.name(), &child.children)?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)
}

impl Layout {
    /// Parse layout XML. See [`parse`].
    pub fn from_xml(text: &str, catalog: &Catalog) -> Result<Self, LayoutError> {
        parse(text, catalog)
    }

    /// Render as layout XML. See [`write`].
    pub fn to_xml(&self) -> Result<String, LayoutError> {
        write(self)
    }
}
