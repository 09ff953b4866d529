//! Patch operation types and parsing.
//!
//! A patch set is an ordered JSON array of operation records:
//!
//! ```json
//! [
//!   {"op": "add", "path": "/hello/0", "value": "cruel"},
//!   {"op": "move", "path": "/goodbye", "from": "/hello"}
//! ]
//! ```
//!
//! Parsing helpers operate on in-memory bytes with an explicit size limit;
//! an unknown `op` is fatal. Values decode through the dag-json bridge, so
//! patch values may contain links (`{"/": "<cid>"}`) and bytes.
//!
//! Path grammar (RFC 6902-shaped, simplified): `/a/b/c`; leading and
//! trailing `/` are trimmed; `-` as the final component of an `add` into a
//! list means "append"; numeric names on lists denote indices, on maps they
//! are string keys. There is no `~`-escaping.

use serde::{Deserialize, Serialize};

use dagurl_core::node::Node;
use dagurl_core::{DagError, DagResult};

/// Default maximum patch-set bytes accepted by `parse_patch_bytes` (1 MiB).
pub const DEFAULT_MAX_PATCH_BYTES: usize = 1024 * 1024;

/// One patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Node },
    Remove { path: String },
    Replace { path: String, value: Node },
    Copy { path: String, from: String },
    Move { path: String, from: String },
    Test { path: String, value: Node },
}

impl PatchOp {
    /// The operation's target path.
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. }
            | PatchOp::Remove { path }
            | PatchOp::Replace { path, .. }
            | PatchOp::Copy { path, .. }
            | PatchOp::Move { path, .. }
            | PatchOp::Test { path, .. } => path,
        }
    }

    /// Stable operation name.
    pub fn op_name(&self) -> &'static str {
        match self {
            PatchOp::Add { .. } => "add",
            PatchOp::Remove { .. } => "remove",
            PatchOp::Replace { .. } => "replace",
            PatchOp::Copy { .. } => "copy",
            PatchOp::Move { .. } => "move",
            PatchOp::Test { .. } => "test",
        }
    }
}

/// Parse a JSON patch set from bytes with a hard size limit.
pub fn parse_patch_bytes(bytes: &[u8], max_bytes: usize) -> DagResult<Vec<PatchOp>> {
    if bytes.len() > max_bytes {
        return Err(DagError::invalid_patch_op(format!(
            "patch payload too large ({} bytes > limit {})",
            bytes.len(),
            max_bytes
        )));
    }
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| DagError::invalid_patch_op(format!("failed to parse patch JSON: {e}")))?;
    parse_patch_value(&value)
}

/// Decode an already-parsed JSON value into a patch set.
pub fn parse_patch_value(value: &serde_json::Value) -> DagResult<Vec<PatchOp>> {
    serde_json::from_value(value.clone())
        .map_err(|e| DagError::invalid_patch_op(format!("failed to decode patch set: {e}")))
}

/// Split a patch path into its components.
///
/// Leading and trailing `/` are trimmed; the empty path has no components.
pub fn split_path(path: &str) -> Vec<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_all_ops() {
        let bytes = br#"[
            {"op": "add", "path": "/hello/0", "value": "cruel"},
            {"op": "remove", "path": "/x"},
            {"op": "replace", "path": "/y", "value": [1, 2]},
            {"op": "copy", "path": "/a", "from": "/b"},
            {"op": "move", "path": "/goodbye", "from": "/hello"},
            {"op": "test", "path": "/z", "value": null}
        ]"#;
        let ops = parse_patch_bytes(bytes, DEFAULT_MAX_PATCH_BYTES).unwrap();
        assert_eq!(ops.len(), 6);
        assert_eq!(ops[0].op_name(), "add");
        assert_eq!(ops[4].path(), "/goodbye");
        match &ops[4] {
            PatchOp::Move { from, .. } => assert_eq!(from, "/hello"),
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn unknown_op_is_fatal() {
        let bytes = br#"[{"op": "frobnicate", "path": "/x"}]"#;
        let err = parse_patch_bytes(bytes, DEFAULT_MAX_PATCH_BYTES).unwrap_err();
        assert!(matches!(err, DagError::InvalidPatchOp(_)));
    }

    #[test]
    fn size_limit_is_enforced() {
        let bytes = br#"[{"op": "remove", "path": "/x"}]"#;
        let err = parse_patch_bytes(bytes, 4).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn split_path_trims_slashes() {
        assert_eq!(split_path("/a/b/c"), vec!["a", "b", "c"]);
        assert_eq!(split_path("a/b/"), vec!["a", "b"]);
        assert_eq!(split_path("/"), Vec::<String>::new());
        assert_eq!(split_path(""), Vec::<String>::new());
    }

    #[test]
    fn values_decode_links() {
        let mh = cid::multihash::Multihash::<64>::wrap(0x12, &[1u8; 32]).unwrap();
        let cid = cid::Cid::new_v1(0x71, mh);
        let json = format!(r#"[{{"op": "add", "path": "/l", "value": {{"/": "{cid}"}}}}]"#);
        let ops = parse_patch_bytes(json.as_bytes(), DEFAULT_MAX_PATCH_BYTES).unwrap();
        match &ops[0] {
            PatchOp::Add { value, .. } => assert_eq!(value, &Node::Link(cid)),
            other => panic!("expected add, got {other:?}"),
        }
    }
}
