//! Error taxonomy shared by all dagurl crates.
//!
//! One enum, one variant per failure kind. The core performs no retries:
//! every error is fatal to the operation that raised it and surfaces to the
//! caller with the first failing step's context. Store failures are wrapped
//! and propagated as-is; nothing is rolled back (the block store is
//! append-only from this crate's point of view).

use thiserror::Error;

/// Result alias used across the workspace.
pub type DagResult<T> = Result<T, DagError>;

/// All failure kinds raised by the URL model, lens pipeline, resolver, and
/// patcher.
#[derive(Debug, Error)]
pub enum DagError {
    /// Scheme is not `ipld:`, the CID is malformed, or the multibase is
    /// unknown.
    #[error("invalid URL: {0}")]
    BadUrl(String),

    /// A walk or patch descent looked up a key that does not exist.
    #[error("path not found at segment: {segment}")]
    PathNotFound { segment: String },

    /// A typed view rejected the node it was applied to. Carries the
    /// offending node's printable form and the schema rendered back to DSL
    /// text.
    #[error("node does not match schema type {type_name}: node={node} schema={schema}")]
    SchemaMismatch {
        type_name: String,
        node: String,
        schema: String,
    },

    /// A schema DMT is structurally unusable (missing type, malformed
    /// descriptor, `schema` parameter without `type`).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// An `adl` parameter named a function that is not registered.
    #[error("unknown ADL: {name} (registered: {known:?})")]
    UnknownAdl { name: String, known: Vec<String> },

    /// A CID carries a codec outside the supported table during patch.
    #[error("unsupported codec: 0x{code:x}")]
    UnsupportedCodec { code: u64 },

    /// A patch operation is malformed: unknown `op`, empty joined path,
    /// oversized payload.
    #[error("invalid patch operation: {0}")]
    InvalidPatchOp(String),

    /// `remove` or `replace` targeted a key/index that is absent.
    #[error("missing key: {key}")]
    MissingKey { key: String },

    /// A `test` operation found a value that is not shallow-equal to the
    /// expected one.
    #[error("test failed: expected={expected} actual={actual}")]
    TestFailed { expected: String, actual: String },

    /// A node could not be bridged to or from a serialized form.
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// Wrapped failure from the underlying block store.
    #[error("store error: {0}")]
    Store(String),
}

impl DagError {
    pub fn bad_url(msg: impl Into<String>) -> Self {
        DagError::BadUrl(msg.into())
    }

    pub fn path_not_found(segment: impl Into<String>) -> Self {
        DagError::PathNotFound {
            segment: segment.into(),
        }
    }

    pub fn schema_mismatch(
        type_name: impl Into<String>,
        node: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        DagError::SchemaMismatch {
            type_name: type_name.into(),
            node: node.into(),
            schema: schema.into(),
        }
    }

    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        DagError::InvalidSchema(msg.into())
    }

    pub fn unknown_adl(name: impl Into<String>, known: Vec<String>) -> Self {
        DagError::UnknownAdl {
            name: name.into(),
            known,
        }
    }

    pub fn unsupported_codec(code: u64) -> Self {
        DagError::UnsupportedCodec { code }
    }

    pub fn invalid_patch_op(msg: impl Into<String>) -> Self {
        DagError::InvalidPatchOp(msg.into())
    }

    pub fn missing_key(key: impl Into<String>) -> Self {
        DagError::MissingKey { key: key.into() }
    }

    pub fn test_failed(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        DagError::TestFailed {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_node(msg: impl Into<String>) -> Self {
        DagError::InvalidNode(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        DagError::Store(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let e = DagError::path_not_found("goodbye");
        assert!(e.to_string().contains("goodbye"));

        let e = DagError::unknown_adl("fbl", vec!["hamt".to_string()]);
        let s = e.to_string();
        assert!(s.contains("fbl"));
        assert!(s.contains("hamt"));

        let e = DagError::unsupported_codec(0x55);
        assert!(e.to_string().contains("0x55"));
    }
}
