//! ADL registry.
//!
//! The registry stores named ADL functions and provides deterministic
//! resolution.
//!
//! Requirements:
//! - stable ordering for lookups and name listings
//! - clear errors for unknown ADLs (the error lists the known names)
//! - no global mutable state: the registry is a value threaded through the
//!   `System` handle
//!
//! An ADL function receives the node at its segment (schema-lensed if the
//! segment also carried `schema`), the full parameter set of that segment
//! (unknown keys included), and the `System` handle for nested resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use dagurl_core::node::Node;
use dagurl_core::params::Parameters;
use dagurl_core::{DagError, DagResult};

use crate::system::System;

/// A registered ADL: an async function from `(node, parameters, system)` to
/// the reinterpreted node.
pub type AdlFn =
    Arc<dyn Fn(Node, Parameters, System) -> BoxFuture<'static, DagResult<Node>> + Send + Sync>;

/// A registry of ADL functions keyed by name.
#[derive(Clone, Default)]
pub struct AdlRegistry {
    adls: BTreeMap<String, AdlFn>,
}

impl AdlRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered ADLs.
    pub fn len(&self) -> usize {
        self.adls.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.adls.is_empty()
    }

    /// Register an ADL function under `name`.
    ///
    /// The function may be any async closure over `(node, parameters,
    /// system)`; it is boxed here. Registration order does not affect
    /// resolution: the internal store is a `BTreeMap`. A later registration
    /// under the same name displaces the earlier one, which is returned.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, adl: F) -> Option<AdlFn>
    where
        F: Fn(Node, Parameters, System) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = DagResult<Node>> + Send + 'static,
    {
        let boxed: AdlFn = Arc::new(move |node, params, system| -> BoxFuture<'static, DagResult<Node>> {
            Box::pin(adl(node, params, system))
        });
        self.adls.insert(name.into(), boxed)
    }

    /// Register an already-boxed ADL function under `name`.
    pub fn register_boxed(&mut self, name: impl Into<String>, adl: AdlFn) -> Option<AdlFn> {
        self.adls.insert(name.into(), adl)
    }

    /// Get an ADL by name.
    pub fn get(&self, name: &str) -> Option<AdlFn> {
        self.adls.get(name).cloned()
    }

    /// Get an ADL by name, failing with `UnknownAdl` (listing the known
    /// names) if absent.
    pub fn lookup(&self, name: &str) -> DagResult<AdlFn> {
        self.get(name)
            .ok_or_else(|| DagError::unknown_adl(name, self.names()))
    }

    /// List registered names in deterministic order.
    pub fn names(&self) -> Vec<String> {
        self.adls.keys().cloned().collect()
    }
}

impl std::fmt::Debug for AdlRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdlRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(node: Node, _params: Parameters, _system: System) -> DagResult<Node> {
        Ok(node)
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = AdlRegistry::new();
        assert!(reg.is_empty());

        reg.register("hamt", noop);
        reg.register("fbl", noop);
        assert_eq!(reg.len(), 2);
        assert!(reg.get("hamt").is_some());
        assert_eq!(reg.names(), vec!["fbl".to_string(), "hamt".to_string()]);
    }

    #[test]
    fn unknown_adl_lists_known_names() {
        let mut reg = AdlRegistry::new();
        reg.register("hamt", noop);

        let err = match reg.lookup("missing") {
            Err(err) => err,
            Ok(_) => panic!("expected lookup to fail"),
        };
        match err {
            DagError::UnknownAdl { name, known } => {
                assert_eq!(name, "missing");
                assert_eq!(known, vec!["hamt".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reregistration_displaces() {
        let mut reg = AdlRegistry::new();
        assert!(reg.register("hamt", noop).is_none());
        assert!(reg.register("hamt", noop).is_some());
        assert_eq!(reg.len(), 1);
    }
}
