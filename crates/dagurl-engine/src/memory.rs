//! Deterministic in-memory node store.
//!
//! `MemoryStore` keeps encoded blocks in a mutex-guarded map and addresses
//! them by CIDv1 over sha2-256 of the exact stored bytes. It exists for
//! tests and for embedders that want a working store without wiring real
//! storage; it is not a cache and never evicts.
//!
//! Encoding is deterministic by construction:
//! - dag-cbor via ciborium, whose map value is an ordered pair list, so
//!   insertion order survives; links are tag 42 around the
//!   identity-prefixed CID bytes
//! - dag-json via serde_json with the dag-json link/bytes forms; object
//!   order is preserved end-to-end
//!
//! Saving the same node under the same encoding therefore always yields the
//! same CID, which is what the patcher's determinism invariant rests on.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use cid::Cid;
use ciborium::value::{Integer, Value};
use multihash_codetable::{Code, MultihashDigest};

use dagurl_core::codec::Encoding;
use dagurl_core::node::{node_from_json, node_to_json, Node, NodeMap};
use dagurl_core::store::NodeStore;
use dagurl_core::{DagError, DagResult};

/// dag-cbor links are tag 42 around a multibase-identity-prefixed CID.
const CBOR_LINK_TAG: u64 = 42;

/// In-memory block store addressed by CIDv1/sha2-256.
#[derive(Default)]
pub struct MemoryStore {
    blocks: Mutex<BTreeMap<Cid, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.blocks.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a block for `cid` is present.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.blocks
            .lock()
            .expect("store lock poisoned")
            .contains_key(cid)
    }

    /// Raw bytes of a stored block, if present.
    pub fn get_block(&self, cid: &Cid) -> Option<Vec<u8>> {
        self.blocks
            .lock()
            .expect("store lock poisoned")
            .get(cid)
            .cloned()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn get_node(&self, cid: &Cid) -> DagResult<Node> {
        let bytes = self
            .get_block(cid)
            .ok_or_else(|| DagError::store(format!("block not found: {cid}")))?;
        decode_block(&bytes, Encoding::from_cid(cid)?)
    }

    async fn save_node(&self, node: &Node, encoding: Encoding) -> DagResult<Cid> {
        let bytes = encode_block(node, encoding)?;
        let digest = Code::Sha2_256.digest(&bytes);
        let cid = Cid::new_v1(encoding.code(), digest);
        self.blocks
            .lock()
            .expect("store lock poisoned")
            .insert(cid, bytes);
        Ok(cid)
    }
}

/// Encode a node under `encoding`.
pub fn encode_block(node: &Node, encoding: Encoding) -> DagResult<Vec<u8>> {
    match encoding {
        Encoding::DagCbor => {
            let value = node_to_cbor(node)?;
            let mut bytes = Vec::new();
            ciborium::ser::into_writer(&value, &mut bytes)
                .map_err(|e| DagError::invalid_node(format!("dag-cbor encode failed: {e}")))?;
            Ok(bytes)
        }
        Encoding::DagJson => {
            let value = node_to_json(node)?;
            serde_json::to_vec(&value)
                .map_err(|e| DagError::invalid_node(format!("dag-json encode failed: {e}")))
        }
    }
}

/// Decode a block under `encoding`.
pub fn decode_block(bytes: &[u8], encoding: Encoding) -> DagResult<Node> {
    match encoding {
        Encoding::DagCbor => {
            let value: Value = ciborium::de::from_reader(bytes)
                .map_err(|e| DagError::invalid_node(format!("dag-cbor decode failed: {e}")))?;
            node_from_cbor(&value)
        }
        Encoding::DagJson => {
            let value: serde_json::Value = serde_json::from_slice(bytes)
                .map_err(|e| DagError::invalid_node(format!("dag-json decode failed: {e}")))?;
            node_from_json(&value)
        }
    }
}

fn node_to_cbor(node: &Node) -> DagResult<Value> {
    Ok(match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Integer(i) => Value::Integer(Integer::from(*i)),
        Node::Float(f) => Value::Float(*f),
        Node::String(s) => Value::Text(s.clone()),
        Node::Bytes(b) => Value::Bytes(b.clone()),
        Node::List(items) => Value::Array(
            items
                .iter()
                .map(node_to_cbor)
                .collect::<DagResult<Vec<_>>>()?,
        ),
        Node::Map(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (k, v) in map.iter() {
                entries.push((Value::Text(k.to_string()), node_to_cbor(v)?));
            }
            Value::Map(entries)
        }
        Node::Link(cid) => {
            let mut bytes = vec![0x00];
            bytes.extend(cid.to_bytes());
            Value::Tag(CBOR_LINK_TAG, Box::new(Value::Bytes(bytes)))
        }
    })
}

fn node_from_cbor(value: &Value) -> DagResult<Node> {
    Ok(match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(*b),
        Value::Integer(i) => Node::Integer(
            i64::try_from(*i)
                .map_err(|_| DagError::invalid_node("integer out of i64 range"))?,
        ),
        Value::Float(f) => Node::Float(*f),
        Value::Text(s) => Node::String(s.clone()),
        Value::Bytes(b) => Node::Bytes(b.clone()),
        Value::Array(items) => Node::List(
            items
                .iter()
                .map(node_from_cbor)
                .collect::<DagResult<Vec<_>>>()?,
        ),
        Value::Map(entries) => {
            let mut map = NodeMap::new();
            for (k, v) in entries {
                let key = match k {
                    Value::Text(s) => s.clone(),
                    other => {
                        return Err(DagError::invalid_node(format!(
                            "non-string map key: {other:?}"
                        )))
                    }
                };
                map.insert(key, node_from_cbor(v)?);
            }
            Node::Map(map)
        }
        Value::Tag(tag, inner) => {
            if *tag != CBOR_LINK_TAG {
                return Err(DagError::invalid_node(format!("unsupported CBOR tag: {tag}")));
            }
            let Value::Bytes(bytes) = &**inner else {
                return Err(DagError::invalid_node("link tag payload is not bytes"));
            };
            let payload = bytes
                .strip_prefix(&[0x00])
                .ok_or_else(|| DagError::invalid_node("link bytes missing identity prefix"))?;
            let cid = Cid::try_from(payload)
                .map_err(|e| DagError::invalid_node(format!("bad link CID bytes: {e}")))?;
            Node::Link(cid)
        }
        other => {
            return Err(DagError::invalid_node(format!(
                "unsupported CBOR value: {other:?}"
            )))
        }
    })
}
