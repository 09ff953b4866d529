//! Patcher scenario suite.
//!
//! Copy-on-write mutations against the in-memory store: root and
//! across-link patches, schema round-trips, inverse operations, codec
//! preservation, and byte-level determinism of the produced roots.

mod support;

use dagurl_core::codec::Encoding;
use dagurl_core::node::Node;
use dagurl_core::url::IpldUrl;
use dagurl_core::DagError;
use dagurl_engine::{parse_patch_bytes, patch, resolve, PatchOp, Resolved};

use support::{listpairs_schema, node, put, system, tuple_link_schema};

fn add(path: &str, value: serde_json::Value) -> PatchOp {
    PatchOp::Add {
        path: path.to_string(),
        value: node(value),
    }
}

fn replace(path: &str, value: serde_json::Value) -> PatchOp {
    PatchOp::Replace {
        path: path.to_string(),
        value: node(value),
    }
}

fn mv(path: &str, from: &str) -> PatchOp {
    PatchOp::Move {
        path: path.to_string(),
        from: from.to_string(),
    }
}

#[tokio::test]
async fn empty_patch_set_is_identity() {
    let system = system();
    let root = put(&system, serde_json::json!({"hello": ["world"]}), Encoding::DagCbor).await;

    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();
    let out = patch(&system, &url, &[]).await.unwrap();
    assert_eq!(out, url);
    assert_eq!(out.to_url_string(), url.to_url_string());
}

#[tokio::test]
async fn patch_root_add_and_move() {
    let system = system();
    let root = put(&system, serde_json::json!({"hello": ["world"]}), Encoding::DagCbor).await;
    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();

    let ops = vec![add("/hello/0", serde_json::json!("cruel")), mv("/goodbye", "/hello")];
    let out = patch(&system, &url, &ops).await.unwrap();
    assert_ne!(out.cid(), url.cid());

    let check = IpldUrl::parse(&format!("ipld://{}/", out.cid())).unwrap();
    let resolved = resolve(&system, &check).await.unwrap();
    assert_eq!(
        resolved,
        Resolved::Node(node(serde_json::json!({"goodbye": ["cruel", "world"]})))
    );

    // determinism: replaying the same patch set from the same root yields
    // the same CID
    let again = patch(&system, &url, &ops).await.unwrap();
    assert_eq!(again.cid(), out.cid());
}

#[tokio::test]
async fn patch_across_link_preserves_codec() {
    let system = system();
    let inner = put(&system, serde_json::json!({"hello": ["world"]}), Encoding::DagCbor).await;
    let root = put(
        &system,
        serde_json::json!({"example": {"/": inner.to_string()}}),
        Encoding::DagJson,
    )
    .await;
    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();

    let ops = vec![
        add("/example/hello/0", serde_json::json!("cruel")),
        mv("/example/goodbye", "/example/hello"),
    ];
    let out = patch(&system, &url, &ops).await.unwrap();

    // the new root keeps the root's codec
    assert_eq!(out.cid().codec(), Encoding::DagJson.code());

    let check = IpldUrl::parse(&format!("ipld://{}/example/", out.cid())).unwrap();
    let resolved = resolve(&system, &check).await.unwrap();
    assert_eq!(
        resolved,
        Resolved::Node(node(serde_json::json!({"goodbye": ["cruel", "world"]})))
    );

    // the rewritten inner link is a fresh dag-cbor block
    let link_url = IpldUrl::parse(&format!("ipld://{}/example", out.cid())).unwrap();
    match resolve(&system, &link_url).await.unwrap() {
        Resolved::Link(cid) => {
            assert_ne!(cid, inner);
            assert_eq!(cid.codec(), Encoding::DagCbor.code());
        }
        other => panic!("expected link, got {other:?}"),
    }
}

#[tokio::test]
async fn patch_under_schema_listpairs() {
    let system = system();
    let schema = put(&system, listpairs_schema(), Encoding::DagCbor).await;
    let data = put(
        &system,
        serde_json::json!([["Hello", "World"], ["Goodbye", "Cyberspace"]]),
        Encoding::DagCbor,
    )
    .await;

    let url =
        IpldUrl::parse(&format!("ipld://{data};schema={schema};type=Example")).unwrap();
    let out = patch(
        &system,
        &url,
        &[replace("/Goodbye", serde_json::json!("Cruel World"))],
    )
    .await
    .unwrap();

    // through the same lens: the typed view reflects the change
    let resolved = resolve(&system, &out).await.unwrap();
    assert_eq!(
        resolved,
        Resolved::Node(node(
            serde_json::json!({"Hello": "World", "Goodbye": "Cruel World"})
        ))
    );

    // without the lens: the raw representation was re-saved as listpairs
    let raw_url = IpldUrl::parse(&format!("ipld://{}", out.cid())).unwrap();
    let raw = resolve(&system, &raw_url).await.unwrap();
    assert_eq!(
        raw,
        Resolved::Node(node(
            serde_json::json!([["Hello", "World"], ["Goodbye", "Cruel World"]])
        ))
    );
}

#[tokio::test]
async fn patch_through_schema_tagged_link() {
    let system = system();
    let schema = put(&system, tuple_link_schema(), Encoding::DagCbor).await;
    let nested = put(&system, serde_json::json!(["Cyberspace"]), Encoding::DagCbor).await;
    let root = put(
        &system,
        serde_json::json!(["Hello", {"/": nested.to_string()}]),
        Encoding::DagCbor,
    )
    .await;

    let url = IpldUrl::parse(&format!("ipld://{root};schema={schema};type=Example")).unwrap();
    let out = patch(
        &system,
        &url,
        &[replace("/Goodbye/region", serde_json::json!("Home"))],
    )
    .await
    .unwrap();

    // the nested block was stripped back to its tuple representation
    let check = IpldUrl::parse(&format!(
        "ipld://{};schema={schema};type=Example/Goodbye/",
        out.cid()
    ))
    .unwrap();
    let resolved = resolve(&system, &check).await.unwrap();
    assert_eq!(resolved, Resolved::Node(node(serde_json::json!({"region": "Home"}))));

    let raw_root = IpldUrl::parse(&format!("ipld://{}/Goodbye", out.cid())).unwrap();
    let err = resolve(&system, &raw_root).await.unwrap_err();
    // untyped, the tuple root has no "Goodbye" key
    assert!(matches!(err, DagError::PathNotFound { .. }));
}

#[tokio::test]
async fn url_segments_prefix_patch_paths() {
    let system = system();
    let inner = put(&system, serde_json::json!({"hello": ["world"]}), Encoding::DagCbor).await;
    let root = put(
        &system,
        serde_json::json!({"example": {"/": inner.to_string()}}),
        Encoding::DagCbor,
    )
    .await;

    let url = IpldUrl::parse(&format!("ipld://{root}/example")).unwrap();
    let out = patch(&system, &url, &[add("/hello/-", serde_json::json!("again"))])
        .await
        .unwrap();

    // output preserves the segment prefix and re-roots the authority
    assert_eq!(out.segments().len(), 1);
    assert_ne!(out.cid(), url.cid());

    let check = IpldUrl::parse(&format!("ipld://{}/example/hello/", out.cid())).unwrap();
    let resolved = resolve(&system, &check).await.unwrap();
    assert_eq!(
        resolved,
        Resolved::Node(node(serde_json::json!(["world", "again"])))
    );
}

#[tokio::test]
async fn inverse_operations_restore_the_root() {
    let system = system();
    let root = put(&system, serde_json::json!({"hello": ["world"]}), Encoding::DagCbor).await;
    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();

    let added = patch(&system, &url, &[add("/x", serde_json::json!(5))])
        .await
        .unwrap();
    assert_ne!(added.cid(), url.cid());

    let removed = patch(
        &system,
        &added,
        &[PatchOp::Remove {
            path: "/x".to_string(),
        }],
    )
    .await
    .unwrap();
    assert_eq!(removed.cid(), url.cid());

    // move there and back again
    let moved = patch(&system, &url, &[mv("/goodbye", "/hello")]).await.unwrap();
    let back = patch(&system, &moved, &[mv("/hello", "/goodbye")]).await.unwrap();
    assert_eq!(back.cid(), url.cid());
}

#[tokio::test]
async fn copy_duplicates_without_removing() {
    let system = system();
    let root = put(&system, serde_json::json!({"a": [1, 2]}), Encoding::DagCbor).await;
    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();

    let out = patch(
        &system,
        &url,
        &[PatchOp::Copy {
            path: "/b".to_string(),
            from: "/a".to_string(),
        }],
    )
    .await
    .unwrap();

    let check = IpldUrl::parse(&format!("ipld://{}/", out.cid())).unwrap();
    let resolved = resolve(&system, &check).await.unwrap();
    assert_eq!(
        resolved,
        Resolved::Node(node(serde_json::json!({"a": [1, 2], "b": [1, 2]})))
    );
}

#[tokio::test]
async fn copy_of_a_link_copies_the_link() {
    let system = system();
    let inner = put(&system, serde_json::json!({"x": 1}), Encoding::DagCbor).await;
    let root = put(
        &system,
        serde_json::json!({"a": {"/": inner.to_string()}}),
        Encoding::DagCbor,
    )
    .await;
    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();

    let out = patch(
        &system,
        &url,
        &[PatchOp::Copy {
            path: "/b".to_string(),
            from: "/a".to_string(),
        }],
    )
    .await
    .unwrap();

    let link_url = IpldUrl::parse(&format!("ipld://{}/b", out.cid())).unwrap();
    assert_eq!(
        resolve(&system, &link_url).await.unwrap(),
        Resolved::Link(inner)
    );
}

#[tokio::test]
async fn test_op_shallow_equality() {
    let system = system();
    let inner = put(&system, serde_json::json!({"x": 1}), Encoding::DagCbor).await;
    let root = put(
        &system,
        serde_json::json!({"hello": ["world"], "link": {"/": inner.to_string()}}),
        Encoding::DagCbor,
    )
    .await;
    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();

    // scalar match passes and leaves the root untouched
    let ok = patch(
        &system,
        &url,
        &[PatchOp::Test {
            path: "/hello/0".to_string(),
            value: node(serde_json::json!("world")),
        }],
    )
    .await
    .unwrap();
    assert_eq!(ok.cid(), url.cid());

    // link compares by CID identity
    let ok = patch(
        &system,
        &url,
        &[PatchOp::Test {
            path: "/link".to_string(),
            value: Node::Link(inner),
        }],
    )
    .await
    .unwrap();
    assert_eq!(ok.cid(), url.cid());

    // mismatch is fatal and reports both sides
    let err = patch(
        &system,
        &url,
        &[PatchOp::Test {
            path: "/hello/0".to_string(),
            value: node(serde_json::json!("cruel")),
        }],
    )
    .await
    .unwrap_err();
    match err {
        DagError::TestFailed { expected, actual } => {
            assert!(expected.contains("cruel"));
            assert!(actual.contains("world"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn remove_and_replace_require_the_key() {
    let system = system();
    let root = put(&system, serde_json::json!({"a": [1]}), Encoding::DagCbor).await;
    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();

    let err = patch(
        &system,
        &url,
        &[PatchOp::Remove {
            path: "/nope".to_string(),
        }],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DagError::MissingKey { .. }));

    let err = patch(&system, &url, &[replace("/a/5", serde_json::json!(0))])
        .await
        .unwrap_err();
    assert!(matches!(err, DagError::MissingKey { .. }));

    let err = patch(&system, &url, &[add("/a/b/c", serde_json::json!(0))])
        .await
        .unwrap_err();
    assert!(matches!(err, DagError::PathNotFound { .. }));
}

#[tokio::test]
async fn empty_joined_path_is_invalid() {
    let system = system();
    let root = put(&system, serde_json::json!({}), Encoding::DagCbor).await;
    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();

    let err = patch(&system, &url, &[add("/", serde_json::json!(1))])
        .await
        .unwrap_err();
    match err {
        DagError::InvalidPatchOp(reason) => assert!(reason.contains("empty path")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn parsed_patch_sets_drive_the_engine() {
    let system = system();
    let root = put(&system, serde_json::json!({"hello": ["world"]}), Encoding::DagCbor).await;
    let url = IpldUrl::parse(&format!("ipld://{root}")).unwrap();

    let ops = parse_patch_bytes(
        br#"[
            {"op": "add", "path": "/hello/0", "value": "cruel"},
            {"op": "move", "path": "/goodbye", "from": "/hello"}
        ]"#,
        64 * 1024,
    )
    .unwrap();

    let out = patch(&system, &url, &ops).await.unwrap();
    let check = IpldUrl::parse(&format!("ipld://{}/", out.cid())).unwrap();
    assert_eq!(
        resolve(&system, &check).await.unwrap(),
        Resolved::Node(node(serde_json::json!({"goodbye": ["cruel", "world"]})))
    );
}
