//! Shared fixtures for the scenario suites.

#![allow(dead_code)]

use std::sync::Arc;

use dagurl_adl::{AdlRegistry, System};
use dagurl_core::codec::Encoding;
use dagurl_core::node::{node_from_json, Node};
use dagurl_core::Cid;
use dagurl_engine::MemoryStore;

pub fn system() -> System {
    System::new(Arc::new(MemoryStore::new()))
}

pub fn system_with(adls: AdlRegistry) -> System {
    System::with_adls(Arc::new(MemoryStore::new()), adls)
}

/// Build a node from dag-json-shaped literal JSON.
pub fn node(value: serde_json::Value) -> Node {
    node_from_json(&value).expect("fixture JSON must bridge to a node")
}

/// Store a fixture node and return its CID.
pub async fn put(system: &System, value: serde_json::Value, encoding: Encoding) -> Cid {
    system
        .save_node(&node(value), encoding)
        .await
        .expect("fixture save must succeed")
}

/// The listpairs map schema of the seed scenarios:
/// `type Example {String:String} representation listpairs`.
pub fn listpairs_schema() -> serde_json::Value {
    serde_json::json!({
        "types": {
            "Example": {
                "kind": "map",
                "keyType": "String",
                "valueType": "String",
                "representation": {"listpairs": {}}
            }
        }
    })
}

/// The tuple-struct-across-link schema of the seed scenarios:
/// `type Example struct {Hello String, Goodbye &NestedExample} representation tuple`
/// plus `type NestedExample struct {region String} representation tuple`.
pub fn tuple_link_schema() -> serde_json::Value {
    serde_json::json!({
        "types": {
            "Example": {
                "kind": "struct",
                "fields": {
                    "Hello": {"type": "String"},
                    "Goodbye": {"type": {"kind": "link", "expectedType": "NestedExample"}}
                },
                "representation": {"tuple": {}}
            },
            "NestedExample": {
                "kind": "struct",
                "fields": {
                    "region": {"type": "String"}
                },
                "representation": {"tuple": {}}
            }
        }
    })
}
