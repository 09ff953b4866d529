//! Typed views over nodes.
//!
//! A `SchemaLens` is one `(schema, type name)` binding. Applying it to a
//! node yields the *typed* shape (structs and listpairs maps read as plain
//! maps); the inverse, `to_representation`, recovers the representation
//! form that serializes back to the original block.
//!
//! Round-trip invariant: for any node `n` the lens accepts,
//! `to_representation(to_typed(n))` equals `n`.
//!
//! Link preservation: when a struct field / map value / list element type is
//! a link with an `expectedType`, field access on the view does not fetch —
//! it yields the link CID *tagged* with a lens for the expected type, so the
//! walker can re-apply typing after `get_node`. Links nested more than one
//! level inside a field's shape, and union types, pass through untyped.

use std::sync::Arc;

use cid::Cid;

use dagurl_core::node::{Node, NodeMap};
use dagurl_core::{DagError, DagResult};

use super::dmt::{
    lookup_descriptor, render_dsl, resolve_term, Descriptor, MapRepr, ScalarKind, StructRepr,
};

/// One `(schema, type)` binding, cheap to clone and to re-bind to sibling
/// types of the same schema.
#[derive(Debug, Clone)]
pub struct SchemaLens {
    schema_cid: Cid,
    dmt: Arc<Node>,
    type_name: String,
}

impl SchemaLens {
    pub fn new(schema_cid: Cid, dmt: Arc<Node>, type_name: impl Into<String>) -> Self {
        Self {
            schema_cid,
            dmt,
            type_name: type_name.into(),
        }
    }

    pub fn schema_cid(&self) -> &Cid {
        &self.schema_cid
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The same schema bound to a different type name.
    pub fn rebind(&self, type_name: impl Into<String>) -> SchemaLens {
        SchemaLens {
            schema_cid: self.schema_cid,
            dmt: self.dmt.clone(),
            type_name: type_name.into(),
        }
    }

    /// The descriptor this lens is bound to.
    pub fn descriptor(&self) -> DagResult<Descriptor> {
        lookup_descriptor(&self.dmt, &self.type_name)
    }

    /// Schema DSL text for diagnostics.
    pub fn render_dsl(&self) -> String {
        render_dsl(&self.dmt)
    }

    /// Build the typed view of `node`, or `None` when the node does not
    /// match the descriptor.
    pub fn to_typed(&self, node: &Node) -> DagResult<Option<Node>> {
        let descriptor = self.descriptor()?;
        Ok(typed_view(&descriptor, node))
    }

    /// Recover the representation form of a typed view.
    ///
    /// The result is what `save_node` must receive: serialized under the
    /// original block's codec it reproduces the original bytes (for an
    /// unmodified view) or the mutated equivalent.
    pub fn to_representation(&self, view: &Node) -> DagResult<Node> {
        let descriptor = self.descriptor()?;
        representation_of(&descriptor, view)
    }

    /// The lens to apply after crossing the link stored under `name`, if
    /// the descriptor declares one (`&ExpectedType`).
    pub fn child_link_binding(&self, name: &str) -> DagResult<Option<SchemaLens>> {
        let descriptor = self.descriptor()?;
        let term = match &descriptor {
            Descriptor::Struct { fields, .. } => {
                match fields.iter().find(|(field, _)| field == name) {
                    Some((_, term)) => term.clone(),
                    None => return Ok(None),
                }
            }
            Descriptor::MapType { value_type, .. } => (**value_type).clone(),
            Descriptor::ListType { value_type } => (**value_type).clone(),
            _ => return Ok(None),
        };
        match resolve_term(&self.dmt, &term)? {
            Descriptor::LinkType {
                expected_type: Some(expected),
            } => Ok(Some(self.rebind(expected))),
            _ => Ok(None),
        }
    }
}

fn typed_view(descriptor: &Descriptor, node: &Node) -> Option<Node> {
    match descriptor {
        Descriptor::Scalar(kind) => scalar_matches(*kind, node).then(|| node.clone()),
        Descriptor::LinkType { .. } => node.is_link().then(|| node.clone()),
        Descriptor::ListType { .. } => matches!(node, Node::List(_)).then(|| node.clone()),
        Descriptor::MapType { repr, .. } => match repr {
            MapRepr::Map => matches!(node, Node::Map(_)).then(|| node.clone()),
            MapRepr::Listpairs => pairs_to_map(node).map(Node::Map),
        },
        Descriptor::Struct { fields, repr } => match repr {
            StructRepr::Map => {
                let map = node.as_map()?;
                if map.len() != fields.len() {
                    return None;
                }
                let mut view = NodeMap::new();
                for (field, _) in fields {
                    view.insert(field.clone(), map.get(field)?.clone());
                }
                Some(Node::Map(view))
            }
            StructRepr::Tuple => {
                let items = node.as_list()?;
                if items.len() != fields.len() {
                    return None;
                }
                let mut view = NodeMap::new();
                for ((field, _), item) in fields.iter().zip(items) {
                    view.insert(field.clone(), item.clone());
                }
                Some(Node::Map(view))
            }
            StructRepr::Listpairs => {
                let pairs = pairs_to_map(node)?;
                if pairs.len() != fields.len() {
                    return None;
                }
                let mut view = NodeMap::new();
                for (field, _) in fields {
                    view.insert(field.clone(), pairs.get(field)?.clone());
                }
                Some(Node::Map(view))
            }
        },
        // acknowledged gap: unions pass through untyped
        Descriptor::Union => Some(node.clone()),
    }
}

fn representation_of(descriptor: &Descriptor, view: &Node) -> DagResult<Node> {
    match descriptor {
        Descriptor::Struct { fields, repr } => match repr {
            StructRepr::Map => Ok(view.clone()),
            StructRepr::Tuple => {
                let map = require_view_map(view)?;
                let mut items = Vec::with_capacity(fields.len());
                for (field, _) in fields {
                    let value = map.get(field).ok_or_else(|| {
                        DagError::invalid_schema(format!(
                            "typed view is missing struct field: {field}"
                        ))
                    })?;
                    items.push(value.clone());
                }
                Ok(Node::List(items))
            }
            StructRepr::Listpairs => Ok(map_to_pairs(require_view_map(view)?)),
        },
        Descriptor::MapType { repr, .. } => match repr {
            MapRepr::Map => Ok(view.clone()),
            MapRepr::Listpairs => Ok(map_to_pairs(require_view_map(view)?)),
        },
        _ => Ok(view.clone()),
    }
}

fn require_view_map(view: &Node) -> DagResult<&NodeMap> {
    view.as_map()
        .ok_or_else(|| DagError::invalid_schema("typed view is not a map"))
}

fn scalar_matches(kind: ScalarKind, node: &Node) -> bool {
    matches!(
        (kind, node),
        (ScalarKind::String, Node::String(_))
            | (ScalarKind::Int, Node::Integer(_))
            | (ScalarKind::Float, Node::Float(_))
            | (ScalarKind::Bool, Node::Bool(_))
            | (ScalarKind::Bytes, Node::Bytes(_))
    )
}

/// Decode a listpairs representation (`[[k, v], ...]`) into an ordered map.
fn pairs_to_map(node: &Node) -> Option<NodeMap> {
    let items = node.as_list()?;
    let mut map = NodeMap::new();
    for item in items {
        let pair = item.as_list()?;
        if pair.len() != 2 {
            return None;
        }
        let key = pair[0].as_str()?;
        map.insert(key.to_string(), pair[1].clone());
    }
    Some(map)
}

/// Encode an ordered map as listpairs, preserving entry order.
fn map_to_pairs(map: &NodeMap) -> Node {
    Node::List(
        map.iter()
            .map(|(k, v)| Node::List(vec![Node::String(k.to_string()), v.clone()]))
            .collect(),
    )
}
