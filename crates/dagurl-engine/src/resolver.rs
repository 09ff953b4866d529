//! The URL walk.
//!
//! `resolve` loads the root CID's node, applies root parameters once at
//! entry, then walks the path segment by segment:
//! - field access goes through the lensed view (explicit `child` calls,
//!   never transparent property reads)
//! - a link child is recorded as `last_cid`, fetched, and — when the schema
//!   declared an expected type for it — re-typed before the walk continues
//! - each segment's own parameters run through the lens pipeline against
//!   the child they name
//!
//! At the terminus: when the caller asked for the link itself (no trailing
//! slash, no explicit override) and the final hop crossed a link, the link
//! CID is returned; otherwise the resolved node is.

use cid::Cid;
use tracing::debug;

use dagurl_adl::lens::{apply_lens, apply_schema, ChildValue, Lensed};
use dagurl_adl::system::System;
use dagurl_core::node::Node;
use dagurl_core::url::IpldUrl;
use dagurl_core::DagResult;

/// Caller-side knobs for one resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Whether a terminal link should be followed to its node. `None`
    /// defers to the URL's trailing-slash flag.
    pub resolve_final_cid: Option<bool>,
}

/// What a walk terminates in.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Node(Node),
    Link(Cid),
}

impl Resolved {
    /// The terminal value as a node (a link becomes `Node::Link`).
    pub fn into_node(self) -> Node {
        match self {
            Resolved::Node(node) => node,
            Resolved::Link(cid) => Node::Link(cid),
        }
    }
}

/// Resolve a URL with default options (the URL's trailing slash decides
/// terminal link handling).
pub async fn resolve(system: &System, url: &IpldUrl) -> DagResult<Resolved> {
    resolve_with(system, url, ResolveOptions::default()).await
}

/// Resolve a URL.
pub async fn resolve_with(
    system: &System,
    url: &IpldUrl,
    options: ResolveOptions,
) -> DagResult<Resolved> {
    let resolve_final = options.resolve_final_cid.unwrap_or(url.resolve_final());
    debug!(url = %url, resolve_final, "resolving");

    let root = system.get_node(url.cid()).await?;
    let mut current = if url.parameters().is_empty() {
        Lensed::plain(root)
    } else {
        apply_lens(system, Lensed::plain(root), url.parameters()).await?
    };

    let mut last_cid: Option<Cid> = None;

    for segment in url.segments() {
        match current.child(&segment.name)? {
            ChildValue::Link { cid, binding } => {
                debug!(segment = %segment.name, cid = %cid, "crossing link");
                last_cid = Some(cid);
                let node = system.get_node(&cid).await?;
                let loaded = match binding {
                    Some(lens) => apply_schema(lens, &node)?,
                    None => Lensed::plain(node),
                };
                current = apply_lens(system, loaded, &segment.parameters).await?;
            }
            ChildValue::Node(node) => {
                last_cid = None;
                current = apply_lens(system, Lensed::plain(node), &segment.parameters).await?;
            }
        }
    }

    if !resolve_final {
        if let Some(cid) = last_cid {
            return Ok(Resolved::Link(cid));
        }
    }
    Ok(Resolved::Node(current.into_node()))
}
