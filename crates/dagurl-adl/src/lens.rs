//! The lens pipeline.
//!
//! For one `(node, parameters)` step this composes, in order:
//! 1. link materialization (a link input is fetched before anything else)
//! 2. schema typing (`schema=<cid>;type=<name>`)
//! 3. ADL application (`adl=<name>`) — the ADL receives the schema-lensed
//!    view when both are present
//!
//! The result is a `Lensed` value: the (possibly wrapped) view plus the way
//! back to the underlying representation. Field access on a `Lensed` is an
//! explicit operation returning either a materialized child or a
//! type-tagged link — the walker never relies on transparent property
//! interception.

use std::str::FromStr;
use std::sync::Arc;

use cid::Cid;
use tracing::debug;

use dagurl_core::node::Node;
use dagurl_core::params::{Parameters, PARAM_ADL, PARAM_SCHEMA, PARAM_TYPE};
use dagurl_core::{DagError, DagResult};

use crate::schema::SchemaLens;
use crate::system::System;

/// What field access on a lensed value yields.
#[derive(Debug, Clone)]
pub enum ChildValue {
    /// A materialized child node.
    Node(Node),
    /// A link, optionally tagged with the lens to apply after loading it.
    Link {
        cid: Cid,
        binding: Option<SchemaLens>,
    },
}

/// A node viewed through at most one schema lens.
///
/// `node` is the *view* shape (what path segments index into);
/// `substrate()` recovers the representation form that serializes back to
/// the original block. ADL outputs carry no lens: their view is their own
/// substrate.
#[derive(Debug, Clone)]
pub struct Lensed {
    node: Node,
    lens: Option<SchemaLens>,
}

impl Lensed {
    /// An untyped value: view and substrate coincide.
    pub fn plain(node: Node) -> Self {
        Self { node, lens: None }
    }

    /// A schema-typed view.
    pub fn typed(node: Node, lens: SchemaLens) -> Self {
        Self {
            node,
            lens: Some(lens),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    pub fn lens(&self) -> Option<&SchemaLens> {
        self.lens.as_ref()
    }

    /// The same lens over a replacement view. Used by the patcher when it
    /// rebuilds a view with a mutated child.
    pub fn with_node(&self, node: Node) -> Lensed {
        Lensed {
            node,
            lens: self.lens.clone(),
        }
    }

    /// Explicit field access: look up `name` in the view.
    ///
    /// Maps index by key; lists index by decimal position. A missing key,
    /// an out-of-range index, or a scalar container is `PathNotFound`.
    /// A link child is returned untraversed, tagged with the expected-type
    /// lens when the schema declares one.
    pub fn child(&self, name: &str) -> DagResult<ChildValue> {
        let value = match &self.node {
            Node::Map(map) => map.get(name).cloned(),
            Node::List(items) => name
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx))
                .cloned(),
            _ => None,
        }
        .ok_or_else(|| DagError::path_not_found(name))?;

        match value {
            Node::Link(cid) => {
                let binding = match &self.lens {
                    Some(lens) => lens.child_link_binding(name)?,
                    None => None,
                };
                Ok(ChildValue::Link { cid, binding })
            }
            node => Ok(ChildValue::Node(node)),
        }
    }

    /// The representation form of the current view.
    pub fn substrate(&self) -> DagResult<Node> {
        self.substrate_of(self.node.clone())
    }

    /// The representation form of `view`, under this value's lens.
    ///
    /// The patcher mutates the view, then strips it through this before
    /// `save_node`: saving a lensed view directly would serialize the wrong
    /// shape.
    pub fn substrate_of(&self, view: Node) -> DagResult<Node> {
        match &self.lens {
            Some(lens) => lens.to_representation(&view),
            None => Ok(view),
        }
    }
}

/// Apply a schema lens to a node, failing with `SchemaMismatch` when the
/// typed view rejects it.
pub fn apply_schema(lens: SchemaLens, node: &Node) -> DagResult<Lensed> {
    match lens.to_typed(node)? {
        Some(view) => Ok(Lensed::typed(view, lens)),
        None => Err(DagError::schema_mismatch(
            lens.type_name(),
            node.to_string(),
            lens.render_dsl(),
        )),
    }
}

/// Run the full pipeline for one `(value, parameters)` step.
///
/// With empty parameters this only materializes a link input; an already
/// lensed input passes through unchanged, keeping its binding alive for
/// further descent.
pub async fn apply_lens(system: &System, input: Lensed, params: &Parameters) -> DagResult<Lensed> {
    let mut current = input;

    if let Node::Link(cid) = current.node() {
        let cid = *cid;
        debug!(cid = %cid, "materializing link before lensing");
        current = Lensed::plain(system.get_node(&cid).await?);
    }

    if let Some(schema_ref) = params.get(PARAM_SCHEMA) {
        if !schema_ref.is_empty() {
            let type_name = params
                .get(PARAM_TYPE)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    DagError::invalid_schema("schema parameter requires a type parameter")
                })?;
            let schema_cid = Cid::from_str(schema_ref)
                .map_err(|e| DagError::bad_url(format!("malformed schema CID {schema_ref:?}: {e}")))?;
            let dmt = system.get_node(&schema_cid).await?;
            debug!(schema = %schema_cid, type_name, "applying schema lens");
            let lens = SchemaLens::new(schema_cid, Arc::new(dmt), type_name);
            current = apply_schema(lens, current.node())?;
        }
    }

    if let Some(adl_name) = params.get(PARAM_ADL) {
        let adl = system.adls().lookup(adl_name)?;
        debug!(adl = adl_name, "applying ADL");
        let node = adl(current.into_node(), params.clone(), system.clone()).await?;
        current = Lensed::plain(node);
    }

    Ok(current)
}
