//! Persisted snapshots of a built tree.
//!
//! A snapshot is a bincode-encoded envelope:
//!
//! ```text
//! version ─ content_hash ─ term_order ─ nodes[path, name, description,
//!                                             parent, children, own_terms]
//! content_hash = hex(SHA-256(bincode(term_order) ++ bincode(nodes)))
//! ```
//!
//! Restore is all-or-nothing. The version and hash are checked first, then
//! the node list must form a single tree rooted at `""`, at most
//! [`MAX_DEPTH`] deep, with every parent link and child list agreeing.
//! Any failure is a [`TaxonomyError`].

use crate::error::TaxonomyError;
use crate::tree::{NodeId, TaxonomyNode, TaxonomyTree};
use crate::types::{TermDefinition, TermOrder};
use crate::{parent_path, path_segments, MAX_DEPTH, ROOT_PATH};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use tracing::info;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

// Field order matters: `version` must stay first so it can be read before
// the rest of the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope {
    version: u32,
    content_hash: String,
    term_order: TermOrder,
    nodes: Vec<SnapshotNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SnapshotNode {
    path: String,
    name: String,
    description: String,
    parent: Option<String>,
    children: Vec<String>,
    own_terms: Vec<TermDefinition>,
}

/// Encode `tree` as a snapshot blob.
pub fn to_bytes(tree: &TaxonomyTree) -> Result<Vec<u8>, TaxonomyError> {
    let envelope = envelope_for(tree)?;
    let bytes = bincode::serialize(&envelope)
        .map_err(|e| TaxonomyError::SnapshotEncode(e.to_string()))?;
    info!(
        nodes = envelope.nodes.len(),
        hash = %envelope.content_hash,
        bytes = bytes.len(),
        "wrote taxonomy snapshot"
    );
    Ok(bytes)
}

/// Restore a tree from a snapshot blob.
pub fn from_bytes(bytes: &[u8]) -> Result<TaxonomyTree, TaxonomyError> {
    // bincode's default options allow trailing bytes, so this only reads
    // the leading version field.
    let version: u32 =
        bincode::deserialize(bytes).map_err(|e| TaxonomyError::SnapshotDecode(e.to_string()))?;
    if version != SNAPSHOT_VERSION {
        return Err(TaxonomyError::SnapshotVersion {
            expected: SNAPSHOT_VERSION,
            actual: version,
        });
    }

    let envelope: SnapshotEnvelope =
        bincode::deserialize(bytes).map_err(|e| TaxonomyError::SnapshotDecode(e.to_string()))?;
    restore(envelope)
}

pub fn write_snapshot<W: Write>(tree: &TaxonomyTree, mut writer: W) -> Result<(), TaxonomyError> {
    let bytes = to_bytes(tree)?;
    writer
        .write_all(&bytes)
        .map_err(|e| TaxonomyError::SnapshotEncode(e.to_string()))
}

pub fn read_snapshot<R: Read>(mut reader: R) -> Result<TaxonomyTree, TaxonomyError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| TaxonomyError::SnapshotDecode(e.to_string()))?;
    from_bytes(&bytes)
}

fn envelope_for(tree: &TaxonomyTree) -> Result<SnapshotEnvelope, TaxonomyError> {
    let nodes: Vec<SnapshotNode> = tree
        .nodes()
        .iter()
        .map(|node| SnapshotNode {
            path: node.path.clone(),
            name: node.name.clone(),
            description: node.description.clone(),
            parent: node.parent.clone(),
            children: node
                .children
                .iter()
                .map(|&id| tree.node(id).path.clone())
                .collect(),
            own_terms: node.own_terms.clone(),
        })
        .collect();

    let content_hash = content_hash(tree.term_order(), &nodes)
        .map_err(|e| TaxonomyError::SnapshotEncode(e.to_string()))?;

    Ok(SnapshotEnvelope {
        version: SNAPSHOT_VERSION,
        content_hash,
        term_order: tree.term_order(),
        nodes,
    })
}

fn content_hash(term_order: TermOrder, nodes: &[SnapshotNode]) -> bincode::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(bincode::serialize(&term_order)?);
    hasher.update(bincode::serialize(nodes)?);
    Ok(hex::encode(hasher.finalize()))
}

fn restore(envelope: SnapshotEnvelope) -> Result<TaxonomyTree, TaxonomyError> {
    let computed = content_hash(envelope.term_order, &envelope.nodes)
        .map_err(|e| TaxonomyError::SnapshotDecode(e.to_string()))?;
    if computed != envelope.content_hash {
        return Err(TaxonomyError::SnapshotHash {
            recorded: envelope.content_hash,
            computed,
        });
    }

    verify_structure(&envelope.nodes)?;

    // Root first, everything else in stored order.
    let mut ordered = envelope.nodes;
    let root_pos = ordered
        .iter()
        .position(|n| n.path == ROOT_PATH)
        .ok_or(TaxonomyError::SnapshotMissingRoot)?;
    let root = ordered.remove(root_pos);
    ordered.insert(0, root);

    let ids: HashMap<String, NodeId> = ordered
        .iter()
        .enumerate()
        .map(|(i, n)| (n.path.clone(), NodeId::from_index(i)))
        .collect();

    let mut arena = Vec::with_capacity(ordered.len());
    for stored in ordered {
        let mut node = TaxonomyNode::new(&stored.path, &stored.name, stored.parent.as_deref());
        node.description = stored.description;
        node.own_terms = stored.own_terms;
        node.children = stored
            .children
            .iter()
            .map(|child| {
                ids.get(child)
                    .copied()
                    .ok_or_else(|| corrupt(child, "child does not exist"))
            })
            .collect::<Result<_, _>>()?;
        arena.push(node);
    }

    info!(
        nodes = arena.len(),
        hash = %envelope.content_hash,
        "restored taxonomy snapshot"
    );
    Ok(TaxonomyTree::from_arena(arena, envelope.term_order))
}

fn verify_structure(nodes: &[SnapshotNode]) -> Result<(), TaxonomyError> {
    let mut by_path: HashMap<&str, &SnapshotNode> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if by_path.insert(node.path.as_str(), node).is_some() {
            return Err(corrupt(&node.path, "duplicate path"));
        }
    }

    let root = by_path
        .get(ROOT_PATH)
        .ok_or(TaxonomyError::SnapshotMissingRoot)?;
    if root.parent.is_some() {
        return Err(corrupt(ROOT_PATH, "root has a parent"));
    }

    for node in nodes.iter().filter(|n| n.path != ROOT_PATH) {
        let segments = path_segments(&node.path);
        if segments.len() > MAX_DEPTH {
            return Err(corrupt(&node.path, "deeper than the level limit"));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(corrupt(&node.path, "empty path segment"));
        }
        let expected = parent_path(&node.path);
        if node.parent.as_deref() != expected {
            return Err(corrupt(&node.path, "parent does not match path"));
        }
        if !expected.is_some_and(|p| by_path.contains_key(p)) {
            return Err(corrupt(&node.path, "parent does not exist"));
        }
    }

    let mut listed = HashSet::new();
    for node in nodes {
        for child in &node.children {
            let Some(stored) = by_path.get(child.as_str()) else {
                return Err(corrupt(child, "child does not exist"));
            };
            if stored.parent.as_deref() != Some(node.path.as_str()) {
                return Err(corrupt(child, "listed under the wrong parent"));
            }
            if !listed.insert(child.as_str()) {
                return Err(corrupt(child, "listed as a child more than once"));
            }
        }
    }
    if listed.len() != nodes.len() - 1 {
        return Err(corrupt(ROOT_PATH, "node missing from its parent's children"));
    }

    Ok(())
}

fn corrupt(path: &str, reason: &str) -> TaxonomyError {
    TaxonomyError::SnapshotCorrupt {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
