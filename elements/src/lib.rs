//! Element composition model for the CareWeb desktop shell.
//!
//! This crate owns the typed tree of UI elements and everything needed to
//! build, edit, and persist it: the kind schema with parent/child
//! cardinalities, plugin definitions and their declared properties, the
//! arena-backed [`tree::ElementTree`], deferred-edit proxies, and the layout
//! format that subtrees are serialized to. Rendering is delegated through the
//! [`toolkit::Toolkit`] trait.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`schema`] | Kind hierarchy and allowed child/parent cardinalities |
//! | [`property`] | Property values, types, serializers, config, and [`property::PropertyInfo`] |
//! | [`access`] | Per-kind getter/setter tables for properties with side effects |
//! | [`definition`] | Plugin definitions, authorities, and the registry |
//! | [`catalog`] | The injected bundle of schema, registries, and accessors |
//! | [`element`] | Element ids and node state |
//! | [`toolkit`] | Widget binding trait and the headless implementation |
//! | [`tree`] | The element tree: structure, lifecycle, activation, properties |
//! | [`proxy`] | Cached stand-ins for deferred edits |
//! | [`layout`] | Serialized subtrees and materialization |
//! | [`xml`] | Layout XML reader and writer |
//! | [`builtin`] | Standard kinds and definitions |

pub mod access;
pub mod builtin;
pub mod catalog;
pub mod definition;
pub mod element;
pub mod layout;
pub mod property;
pub mod proxy;
pub mod schema;
pub mod toolkit;
pub mod tree;
pub mod xml;

pub use catalog::Catalog;
pub use element::{Behavior, Element, ElementId};
pub use layout::{Layout, LayoutError, LayoutNode};
pub use tree::{ElementTree, TreeError, TreeEvent};
