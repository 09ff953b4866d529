//! dagurl-core
//!
//! Core data model for URL-addressed IPLD DAGs:
//! - `Node`: the decoded in-memory form of one IPLD block, with
//!   insertion-ordered maps
//! - `Encoding`: the closed codec table (dag-cbor, dag-json)
//! - `Parameters`: the ordered multimap carried by URL authorities and
//!   path segments
//! - `IpldUrl`: the `ipld://` URL model with CID authority and segment
//!   parameters
//! - `DagError`: the shared error taxonomy
//! - `NodeStore`: the async block-store interface supplied by embedders
//!
//! This crate does no I/O. Store implementations, lensing, and the
//! resolve/patch walkers live in the higher crates.

pub mod codec;
pub mod errors;
pub mod node;
pub mod params;
pub mod store;
pub mod url;

pub use crate::errors::{DagError, DagResult};

/// Re-export of the CID type this crate is built around.
pub use cid::Cid;

/// Convenience re-exports.
pub mod prelude {
    pub use crate::codec::Encoding;
    pub use crate::node::{Node, NodeMap};
    pub use crate::params::Parameters;
    pub use crate::store::NodeStore;
    pub use crate::url::{IpldUrl, Segment};
    pub use crate::{Cid, DagError, DagResult};
}
