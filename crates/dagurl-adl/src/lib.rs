//! dagurl-adl
//!
//! The lens layer: everything that reinterprets a node before the walkers
//! touch it.
//! - `AdlRegistry`: named, embedder-supplied async ADL functions
//! - `System`: the shared handle threaded through walks and handed to ADLs
//!   (store access, the registry, the multibase display set)
//! - `schema`: the built-in schema lens — DMT-driven typed views with
//!   link tagging and substrate recovery
//! - `lens`: the pipeline composing link materialization, schema typing,
//!   and ADL application for one `(node, parameters)` step
//!
//! There is no process-global state: the registry is a value owned by the
//! `System` it was built into.

pub mod lens;
pub mod registry;
pub mod schema;
pub mod system;

pub use crate::lens::{apply_lens, apply_schema, ChildValue, Lensed};
pub use crate::registry::{AdlFn, AdlRegistry};
pub use crate::schema::SchemaLens;
pub use crate::system::System;
