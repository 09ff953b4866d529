//! The block-store interface supplied by embedders.
//!
//! The core never touches storage directly: it reads nodes through
//! `get_node` and persists new nodes through `save_node`. Both are
//! suspension points. Implementations must be deterministic in the sense
//! that `save_node` returns a CID corresponding to the exact bytes written,
//! and `get_node(save_node(n, e))` decodes back to `n`.
//!
//! The store is append-only from this crate's point of view: patching never
//! mutates an existing block, and nothing is rolled back on failure.

use async_trait::async_trait;
use cid::Cid;

use crate::codec::Encoding;
use crate::errors::DagResult;
use crate::node::Node;

/// Async access to content-addressed blocks, decoded to nodes.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Fetch and decode the block `cid` addresses.
    async fn get_node(&self, cid: &Cid) -> DagResult<Node>;

    /// Encode `node` under `encoding`, persist it, and return its CID.
    async fn save_node(&self, node: &Node, encoding: Encoding) -> DagResult<Cid>;
}
