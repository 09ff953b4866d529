//! The closed codec table.
//!
//! Exactly two block codecs are supported: dag-cbor (`0x71`) and dag-json
//! (`0x0129`). The table is explicit and never widened silently: a CID with
//! any other codec code is fatal during patch, because the patcher must
//! re-save every node it touches under the codec of the CID it replaces.

use std::fmt;

use cid::Cid;

use crate::errors::{DagError, DagResult};

/// Multicodec code for dag-cbor.
pub const DAG_CBOR_CODE: u64 = 0x71;

/// Multicodec code for dag-json.
pub const DAG_JSON_CODE: u64 = 0x0129;

/// A supported block encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    DagCbor,
    DagJson,
}

impl Encoding {
    /// The multicodec code carried in CIDs of this encoding.
    pub fn code(&self) -> u64 {
        match self {
            Encoding::DagCbor => DAG_CBOR_CODE,
            Encoding::DagJson => DAG_JSON_CODE,
        }
    }

    /// Canonical codec name.
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::DagCbor => "dag-cbor",
            Encoding::DagJson => "dag-json",
        }
    }

    /// Reverse lookup from a multicodec code.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            DAG_CBOR_CODE => Some(Encoding::DagCbor),
            DAG_JSON_CODE => Some(Encoding::DagJson),
            _ => None,
        }
    }

    /// Reverse lookup from a codec name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "dag-cbor" => Some(Encoding::DagCbor),
            "dag-json" => Some(Encoding::DagJson),
            _ => None,
        }
    }

    /// The encoding of the block a CID addresses. Fatal for codes outside
    /// the table.
    pub fn from_cid(cid: &Cid) -> DagResult<Self> {
        Self::from_code(cid.codec()).ok_or_else(|| DagError::unsupported_codec(cid.codec()))
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
