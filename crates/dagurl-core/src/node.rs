//! The decoded in-memory form of one IPLD block.
//!
//! A `Node` is a scalar, a list, a string-keyed map, or a link (CID).
//! Maps preserve insertion order: re-serializing an untouched node must
//! reproduce the exact bytes that decoded it, and content addressing makes
//! key order part of the block's identity.
//!
//! A node never owns the nodes its links reach; links are resolved through
//! the store.
//!
//! The JSON bridge at the bottom follows the dag-json conventions:
//! - links travel as `{"/": "<cid>"}`
//! - bytes travel as `{"/": {"bytes": "<base64>"}}`
//!
//! Patch values and test fixtures move through this bridge, so `Node` also
//! implements `Serialize`/`Deserialize` in terms of it.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use cid::Cid;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{DagError, DagResult};

/// One decoded IPLD value.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Node>),
    Map(NodeMap),
    Link(Cid),
}

impl Node {
    /// Stable kind name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Integer(_) => "integer",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::Bytes(_) => "bytes",
            Node::List(_) => "list",
            Node::Map(_) => "map",
            Node::Link(_) => "link",
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Node::Link(_))
    }

    pub fn as_link(&self) -> Option<&Cid> {
        match self {
            Node::Link(cid) => Some(cid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&NodeMap> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(l) => Some(l),
            _ => None,
        }
    }

    /// Shallow equality as used by the `test` patch operation.
    ///
    /// Scalars compare by value, links compare by CID identity (two CIDs
    /// addressing equal content are not equal unless the CIDs are), and
    /// composite values never compare equal.
    pub fn shallow_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Null, Node::Null) => true,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::Integer(a), Node::Integer(b)) => a == b,
            (Node::Float(a), Node::Float(b)) => a == b,
            (Node::String(a), Node::String(b)) => a == b,
            (Node::Bytes(a), Node::Bytes(b)) => a == b,
            (Node::Link(a), Node::Link(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Bool(v)
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Node::Integer(v)
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Node::Float(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::String(v.to_string())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::String(v)
    }
}

impl From<Cid> for Node {
    fn from(v: Cid) -> Self {
        Node::Link(v)
    }
}

impl From<Vec<Node>> for Node {
    fn from(v: Vec<Node>) -> Self {
        Node::List(v)
    }
}

impl From<NodeMap> for Node {
    fn from(v: NodeMap) -> Self {
        Node::Map(v)
    }
}

/// String-keyed mapping with insertion order preserved.
///
/// Backed by a pair vector: lookups are linear, which is fine for the block
/// sizes this crate walks, and iteration order is exactly insertion order.
/// `insert` on an existing key replaces the value in place so the key keeps
/// its original position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeMap {
    entries: Vec<(String, Node)>,
}

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Set `key` to `value`. An existing key is replaced in place (keeping
    /// its position); a new key is appended. Returns the displaced value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) -> Option<Node> {
        let key = key.into();
        let value = value.into();
        for (k, v) in self.entries.iter_mut() {
            if *k == key {
                return Some(std::mem::replace(v, value));
            }
        }
        self.entries.push((key, value));
        None
    }

    /// Remove `key`, returning its value if present.
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Node)> for NodeMap {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        let mut map = NodeMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

// ---------------------------------------------------------------------------
// dag-json bridge
// ---------------------------------------------------------------------------

/// Convert a node to its dag-json `serde_json::Value` form.
///
/// Fails on non-finite floats, which have no JSON representation.
pub fn node_to_json(node: &Node) -> DagResult<serde_json::Value> {
    use serde_json::{Map, Number, Value};

    Ok(match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Integer(i) => Value::Number(Number::from(*i)),
        Node::Float(f) => Value::Number(
            Number::from_f64(*f)
                .ok_or_else(|| DagError::invalid_node(format!("non-finite float: {f}")))?,
        ),
        Node::String(s) => Value::String(s.clone()),
        Node::Bytes(b) => {
            let mut inner = Map::new();
            inner.insert("bytes".to_string(), Value::String(BASE64.encode(b)));
            let mut outer = Map::new();
            outer.insert("/".to_string(), Value::Object(inner));
            Value::Object(outer)
        }
        Node::List(items) => Value::Array(
            items
                .iter()
                .map(node_to_json)
                .collect::<DagResult<Vec<_>>>()?,
        ),
        Node::Map(map) => {
            let mut out = Map::new();
            for (k, v) in map.iter() {
                out.insert(k.to_string(), node_to_json(v)?);
            }
            Value::Object(out)
        }
        Node::Link(cid) => {
            let mut out = Map::new();
            out.insert("/".to_string(), Value::String(cid.to_string()));
            Value::Object(out)
        }
    })
}

/// Convert a dag-json `serde_json::Value` into a node.
///
/// A single-key `{"/": <string>}` object is a link and the string must be a
/// valid CID; `{"/": {"bytes": <string>}}` is a byte string.
pub fn node_from_json(value: &serde_json::Value) -> DagResult<Node> {
    use serde_json::Value;

    Ok(match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Node::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Node::Float(f)
            } else {
                return Err(DagError::invalid_node(format!("integer out of range: {n}")));
            }
        }
        Value::String(s) => Node::String(s.clone()),
        Value::Array(items) => Node::List(
            items
                .iter()
                .map(node_from_json)
                .collect::<DagResult<Vec<_>>>()?,
        ),
        Value::Object(obj) => {
            if obj.len() == 1 {
                if let Some(slash) = obj.get("/") {
                    match slash {
                        Value::String(s) => {
                            let cid = Cid::from_str(s).map_err(|e| {
                                DagError::invalid_node(format!("bad link CID {s:?}: {e}"))
                            })?;
                            return Ok(Node::Link(cid));
                        }
                        Value::Object(inner) => {
                            if let Some(Value::String(b64)) = inner.get("bytes") {
                                let bytes = BASE64.decode(b64).map_err(|e| {
                                    DagError::invalid_node(format!("bad base64 bytes: {e}"))
                                })?;
                                return Ok(Node::Bytes(bytes));
                            }
                            return Err(DagError::invalid_node(
                                "reserved \"/\" key with unrecognized payload",
                            ));
                        }
                        _ => {
                            return Err(DagError::invalid_node(
                                "reserved \"/\" key with unrecognized payload",
                            ))
                        }
                    }
                }
            }
            let mut map = NodeMap::new();
            for (k, v) in obj {
                map.insert(k.clone(), node_from_json(v)?);
            }
            Node::Map(map)
        }
    })
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = node_to_json(self).map_err(S::Error::custom)?;
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        node_from_json(&value).map_err(D::Error::custom)
    }
}

/// Compact printable form used in diagnostics (`SchemaMismatch`,
/// `TestFailed`). Falls back to the debug form for values that have no JSON
/// rendering.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match node_to_json(self).map(|v| serde_json::to_string(&v)) {
            Ok(Ok(s)) => f.write_str(&s),
            _ => write!(f, "{self:?}"),
        }
    }
}
