//! dagurl-engine
//!
//! The walkers over URL-addressed IPLD DAGs:
//! - `resolver`: traverse a URL's path from its root CID, crossing links
//!   and applying lenses per segment, returning the terminal node or link
//! - `patch` / `patcher`: JSON-Patch-shaped operations applied through a
//!   copy-on-write rebuild of every node from the mutation point back to
//!   the root, preserving each block's codec
//! - `memory`: a deterministic in-memory `NodeStore` for tests and
//!   embedders
//!
//! Both walks are strictly sequential: every store read, store write, and
//! ADL invocation is awaited before the next step.

pub mod memory;
pub mod patch;
pub mod patcher;
pub mod resolver;

pub use crate::memory::MemoryStore;
pub use crate::patch::{parse_patch_bytes, parse_patch_value, PatchOp};
pub use crate::patcher::patch;
pub use crate::resolver::{resolve, resolve_with, Resolved, ResolveOptions};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::memory::MemoryStore;
    pub use crate::patch::PatchOp;
    pub use crate::patcher::patch;
    pub use crate::resolver::{resolve, resolve_with, Resolved, ResolveOptions};
    pub use dagurl_adl::{AdlRegistry, System};
    pub use dagurl_core::prelude::*;
}
