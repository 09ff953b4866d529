//! The shared system handle.
//!
//! A `System` bundles the block store, the ADL registry, and the multibase
//! display set. It is cheaply cloneable (`Arc` inside) and is the value
//! handed to ADL functions so they can resolve nested structures through
//! the same machinery.
//!
//! The core never mutates the store or the registry; concurrent resolves
//! against one `System` are safe if the underlying store is.

use std::sync::Arc;

use cid::Cid;
use multibase::Base;

use dagurl_core::codec::Encoding;
use dagurl_core::node::Node;
use dagurl_core::store::NodeStore;
use dagurl_core::DagResult;

use crate::registry::AdlRegistry;

/// Store + registry + display bases, shared across a walk.
#[derive(Clone)]
pub struct System {
    inner: Arc<SystemInner>,
}

struct SystemInner {
    store: Arc<dyn NodeStore>,
    adls: AdlRegistry,
    cid_bases: Vec<Base>,
}

impl System {
    /// A system with an empty ADL registry.
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self::with_adls(store, AdlRegistry::new())
    }

    /// A system with the given ADL registry.
    pub fn with_adls(store: Arc<dyn NodeStore>, adls: AdlRegistry) -> Self {
        Self {
            inner: Arc::new(SystemInner {
                store,
                adls,
                cid_bases: vec![Base::Base32Lower, Base::Base36Lower],
            }),
        }
    }

    /// Fetch and decode a node from the store.
    pub async fn get_node(&self, cid: &Cid) -> DagResult<Node> {
        self.inner.store.get_node(cid).await
    }

    /// Encode and persist a node, returning its CID.
    pub async fn save_node(&self, node: &Node, encoding: Encoding) -> DagResult<Cid> {
        self.inner.store.save_node(node, encoding).await
    }

    /// The underlying store.
    pub fn store(&self) -> Arc<dyn NodeStore> {
        self.inner.store.clone()
    }

    /// The ADL registry.
    pub fn adls(&self) -> &AdlRegistry {
        &self.inner.adls
    }

    /// Multibases this system displays CIDs in.
    pub fn cid_bases(&self) -> &[Base] {
        &self.inner.cid_bases
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("adls", self.adls())
            .field("cid_bases", &self.inner.cid_bases)
            .finish()
    }
}
