//! The built-in schema lens.
//!
//! A schema travels as a DMT (data model tree): an IPLD node of the shape
//!
//! ```text
//! { "types": { <name>: <descriptor> } }
//! ```
//!
//! where a descriptor is a map with a `"kind"` of `"struct"` (with
//! `"fields"`), `"map"` (with `"keyType"`/`"valueType"`), `"list"` (with
//! `"valueType"`), a scalar kind (`"string"`, `"int"`, `"float"`, `"bool"`,
//! `"bytes"`), `"link"` (with optional `"expectedType"`), or `"union"`.
//! Struct and map descriptors may carry a `"representation"` of `map`
//! (default), `tuple` (structs only), or `listpairs`.
//!
//! `dmt` reads descriptors out of a DMT node and renders DSL text for
//! diagnostics; `typed` builds typed views, recovers representation forms,
//! and computes the link bindings that keep typing alive across link
//! boundaries.
//!
//! The schema-DSL compiler that produces DMTs is an external collaborator;
//! this crate only consumes its output.

pub mod dmt;
pub mod typed;

pub use dmt::{Descriptor, MapRepr, ScalarKind, StructRepr, TypeTerm};
pub use typed::SchemaLens;
