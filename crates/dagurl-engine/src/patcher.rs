//! The copy-on-write patch engine.
//!
//! Operations apply sequentially; each observes the effects of the
//! previous. The URL supplies the root CID and a leading segment list that
//! is prepended to every operation's path.
//!
//! Each mutation descends the joined segment list from the current root:
//! - a link child is fetched, lensed with its segment's parameters, and on
//!   the way back up stripped to substrate and re-saved under the codec of
//!   the CID it replaces — children are always saved before their parents
//! - an in-place child rebuilds its parent immutably
//! - at the leaf, the operation's mutator runs against `(container, name)`
//!
//! `copy` and `move` capture the `from` value with a no-link-follow read
//! before any mutation; `test` is a pure read with shallow comparison.
//! Intermediate CIDs are never exposed: the caller sees only the final URL
//! with the new root.

use cid::Cid;
use futures::future::BoxFuture;
use tracing::debug;

use dagurl_adl::lens::{apply_lens, apply_schema, ChildValue, Lensed};
use dagurl_adl::system::System;
use dagurl_core::codec::Encoding;
use dagurl_core::node::Node;
use dagurl_core::url::{IpldUrl, Segment};
use dagurl_core::{DagError, DagResult};

use crate::patch::{split_path, PatchOp};
use crate::resolver::{resolve_with, Resolved, ResolveOptions};

/// Apply an ordered patch set, returning the input URL re-rooted at the
/// final CID. An empty patch set returns the URL unchanged.
pub async fn patch(system: &System, url: &IpldUrl, ops: &[PatchOp]) -> DagResult<IpldUrl> {
    let mut root = *url.cid();
    for op in ops {
        debug!(op = op.op_name(), path = op.path(), root = %root, "applying patch operation");
        root = apply_op(system, root, url, op).await?;
    }
    let mut out = url.clone();
    out.set_cid(root)?;
    Ok(out)
}

/// A leaf mutator: what happens to `(container, name)` once the descent
/// reaches the operation's parent node.
enum Mutation {
    Add(Node),
    Remove,
    Replace(Node),
}

async fn apply_op(system: &System, root: Cid, url: &IpldUrl, op: &PatchOp) -> DagResult<Cid> {
    match op {
        PatchOp::Add { path, value } => {
            apply_mutation(system, root, url, path, &Mutation::Add(value.clone())).await
        }
        PatchOp::Remove { path } => {
            apply_mutation(system, root, url, path, &Mutation::Remove).await
        }
        PatchOp::Replace { path, value } => {
            apply_mutation(system, root, url, path, &Mutation::Replace(value.clone())).await
        }
        PatchOp::Copy { path, from } => {
            let value = read_value(system, root, url, from).await?;
            apply_mutation(system, root, url, path, &Mutation::Add(value)).await
        }
        PatchOp::Move { path, from } => {
            // the value is captured before its removal
            let value = read_value(system, root, url, from).await?;
            let root = apply_mutation(system, root, url, from, &Mutation::Remove).await?;
            apply_mutation(system, root, url, path, &Mutation::Add(value)).await
        }
        PatchOp::Test { path, value } => {
            let actual = read_value(system, root, url, path).await?;
            if actual.shallow_eq(value) {
                Ok(root)
            } else {
                Err(DagError::test_failed(value.to_string(), actual.to_string()))
            }
        }
    }
}

/// The URL's leading segments joined with a patch path's components.
fn joined_segments(url: &IpldUrl, path: &str) -> Vec<Segment> {
    let mut segments = url.segments().to_vec();
    segments.extend(split_path(path).into_iter().map(Segment::new));
    segments
}

/// Read the value at `path` against the current root, without following a
/// terminal link.
async fn read_value(system: &System, root: Cid, url: &IpldUrl, path: &str) -> DagResult<Node> {
    let mut target = url.clone();
    target.set_cid(root)?;
    target.set_segments(joined_segments(url, path));
    let resolved = resolve_with(
        system,
        &target,
        ResolveOptions {
            resolve_final_cid: Some(false),
        },
    )
    .await?;
    Ok(match resolved {
        Resolved::Node(node) => node,
        Resolved::Link(cid) => Node::Link(cid),
    })
}

async fn apply_mutation(
    system: &System,
    root: Cid,
    url: &IpldUrl,
    path: &str,
    mutation: &Mutation,
) -> DagResult<Cid> {
    let segments = joined_segments(url, path);
    if segments.is_empty() {
        return Err(DagError::invalid_patch_op("empty path"));
    }

    // root parameters apply once, at entry
    let root_node = system.get_node(&root).await?;
    let entry = if url.parameters().is_empty() {
        Lensed::plain(root_node)
    } else {
        apply_lens(system, Lensed::plain(root_node), url.parameters()).await?
    };

    let rebuilt = rebuild(system, entry, &segments, mutation).await?;
    system
        .save_node(&rebuilt, Encoding::from_cid(&root)?)
        .await
}

/// Descend the remaining segments and return the rebuilt node in
/// representation (substrate) form.
fn rebuild<'a>(
    system: &'a System,
    current: Lensed,
    segments: &'a [Segment],
    mutation: &'a Mutation,
) -> BoxFuture<'a, DagResult<Node>> {
    Box::pin(async move {
        if segments.len() == 1 {
            let mut view = current.node().clone();
            mutate(&mut view, &segments[0].name, mutation)?;
            return current.substrate_of(view);
        }

        let segment = &segments[0];
        match current.child(&segment.name)? {
            ChildValue::Link { cid, binding } => {
                let node = system.get_node(&cid).await?;
                let loaded = match binding {
                    Some(lens) => apply_schema(lens, &node)?,
                    None => Lensed::plain(node),
                };
                let child = apply_lens(system, loaded, &segment.parameters).await?;
                let new_child = rebuild(system, child, &segments[1..], mutation).await?;
                // child block saved before its parent, under its own codec
                let new_cid = system
                    .save_node(&new_child, Encoding::from_cid(&cid)?)
                    .await?;
                debug!(segment = %segment.name, old = %cid, new = %new_cid, "re-saved linked child");
                let mut view = current.node().clone();
                set_child(&mut view, &segment.name, Node::Link(new_cid))?;
                current.substrate_of(view)
            }
            ChildValue::Node(node) => {
                let child = apply_lens(system, Lensed::plain(node), &segment.parameters).await?;
                let new_child = rebuild(system, child, &segments[1..], mutation).await?;
                let mut view = current.node().clone();
                set_child(&mut view, &segment.name, new_child)?;
                current.substrate_of(view)
            }
        }
    })
}

/// Put a rebuilt child back into its parent view under `name`.
fn set_child(view: &mut Node, name: &str, child: Node) -> DagResult<()> {
    match view {
        Node::Map(map) => {
            map.insert(name, child);
            Ok(())
        }
        Node::List(items) => {
            let idx = list_index(name)?;
            match items.get_mut(idx) {
                Some(slot) => {
                    *slot = child;
                    Ok(())
                }
                None => Err(DagError::path_not_found(name)),
            }
        }
        _ => Err(DagError::path_not_found(name)),
    }
}

/// Run a leaf mutator against its parent container.
fn mutate(container: &mut Node, leaf: &str, mutation: &Mutation) -> DagResult<()> {
    match container {
        Node::Map(map) => match mutation {
            Mutation::Add(value) => {
                map.insert(leaf, value.clone());
                Ok(())
            }
            Mutation::Replace(value) => {
                if !map.contains_key(leaf) {
                    return Err(DagError::missing_key(leaf));
                }
                map.insert(leaf, value.clone());
                Ok(())
            }
            Mutation::Remove => match map.remove(leaf) {
                Some(_) => Ok(()),
                None => Err(DagError::missing_key(leaf)),
            },
        },
        Node::List(items) => match mutation {
            Mutation::Add(value) => {
                if leaf == "-" {
                    items.push(value.clone());
                    return Ok(());
                }
                let idx = list_index(leaf)?;
                if idx > items.len() {
                    return Err(DagError::path_not_found(leaf));
                }
                items.insert(idx, value.clone());
                Ok(())
            }
            Mutation::Replace(value) => {
                let idx = list_index(leaf)?;
                match items.get_mut(idx) {
                    Some(slot) => {
                        *slot = value.clone();
                        Ok(())
                    }
                    None => Err(DagError::missing_key(leaf)),
                }
            }
            Mutation::Remove => {
                let idx = list_index(leaf)?;
                if idx >= items.len() {
                    return Err(DagError::missing_key(leaf));
                }
                items.remove(idx);
                Ok(())
            }
        },
        _ => Err(DagError::path_not_found(leaf)),
    }
}

fn list_index(name: &str) -> DagResult<usize> {
    name.parse::<usize>()
        .map_err(|_| DagError::path_not_found(name))
}
