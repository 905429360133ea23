//! The built taxonomy: an arena of nodes keyed by hierarchy path.
//!
//! Nodes live in one `Vec` owned by the tree. Children are indices into
//! that arena and the parent is a path lookup key, so there are no reference
//! cycles and no shared ownership. The root always sits at index 0.
//!
//! A `TaxonomyTree` only exists once [`crate::TreeBuilder::finish`] has run;
//! it is never mutated afterwards and may be shared freely between readers.

use crate::types::{TermDefinition, TermOrder};
use crate::{parent_path, path_segments, ROOT_PATH};
use std::collections::{HashMap, HashSet};

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub(crate) fn from_index(idx: usize) -> Self {
        NodeId(idx as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// =============================================================================
// NODE
// =============================================================================

/// One level of the hierarchy: root, first, second or third level.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyNode {
    pub(crate) path: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) parent: Option<String>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) own_terms: Vec<TermDefinition>,
}

impl TaxonomyNode {
    pub(crate) fn new(path: &str, name: &str, parent: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            description: String::new(),
            parent: parent.map(str::to_string),
            children: Vec::new(),
            own_terms: Vec::new(),
        }
    }

    /// Dot-joined hierarchy path; empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment (`"root"` for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Path of the parent node; `None` only for the root.
    pub fn parent_path(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Children in presentation (alphabetical) order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Terms declared directly on this node, in source order.
    pub fn own_terms(&self) -> &[TermDefinition] {
        &self.own_terms
    }

    /// Number of path segments: 0 for the root, 1..=3 otherwise.
    pub fn depth(&self) -> usize {
        path_segments(&self.path).len()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// =============================================================================
// TREE
// =============================================================================

/// A built, read-only taxonomy.
#[derive(Debug, Clone)]
pub struct TaxonomyTree {
    nodes: Vec<TaxonomyNode>,
    index: HashMap<String, NodeId>,
    term_order: TermOrder,
}

impl TaxonomyTree {
    /// Assemble a tree from an arena whose first node is the root.
    pub(crate) fn from_arena(nodes: Vec<TaxonomyNode>, term_order: TermOrder) -> Self {
        debug_assert!(nodes.first().is_some_and(|n| n.path == ROOT_PATH));
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.path.clone(), NodeId::from_index(i)))
            .collect();
        Self {
            nodes,
            index,
            term_order,
        }
    }

    pub fn root(&self) -> &TaxonomyNode {
        &self.nodes[NodeId::ROOT.index()]
    }

    pub fn get(&self, path: &str) -> Option<&TaxonomyNode> {
        self.id_of(path).map(|id| self.node(id))
    }

    pub fn id_of(&self, path: &str) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    /// Node by id. Ids are only handed out by this tree, so lookup cannot miss.
    pub fn node(&self, id: NodeId) -> &TaxonomyNode {
        &self.nodes[id.index()]
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ordering applied by [`TaxonomyTree::effective_terms`].
    pub fn term_order(&self) -> TermOrder {
        self.term_order
    }

    pub fn children<'a>(
        &'a self,
        node: &'a TaxonomyNode,
    ) -> impl Iterator<Item = &'a TaxonomyNode> + 'a {
        node.children.iter().map(|&id| self.node(id))
    }

    pub fn parent(&self, node: &TaxonomyNode) -> Option<&TaxonomyNode> {
        node.parent.as_deref().and_then(|p| self.get(p))
    }

    /// Ancestors from the parent up to and including the root.
    pub fn ancestors<'a>(
        &'a self,
        node: &'a TaxonomyNode,
    ) -> impl Iterator<Item = &'a TaxonomyNode> + 'a {
        std::iter::successors(self.parent(node), move |n| self.parent(n))
    }

    /// Depth-first, pre-order walk in presentation order.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![NodeId::ROOT],
        }
    }

    pub fn leaves(&self) -> impl Iterator<Item = &TaxonomyNode> {
        self.iter().filter(|n| n.is_leaf())
    }

    /// Every path in the tree, in arena order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.path.as_str())
    }

    /// Terms visible at `node`: its own terms plus those of every ancestor.
    ///
    /// The union is sorted by [`TermOrder`] (source row, or name then source
    /// row) and then deduplicated by name, keeping the first term in that
    /// order. Pure and repeatable; the tree is not touched.
    pub fn effective_terms<'a>(&'a self, node: &'a TaxonomyNode) -> Vec<&'a TermDefinition> {
        let mut terms: Vec<&TermDefinition> = node
            .own_terms
            .iter()
            .chain(self.ancestors(node).flat_map(|a| a.own_terms.iter()))
            .collect();

        match self.term_order {
            TermOrder::RowOrder => terms.sort_by_key(|t| t.source_row),
            TermOrder::Alphabetical => terms.sort_by(|a, b| {
                a.name
                    .cmp(&b.name)
                    .then_with(|| a.source_row.cmp(&b.source_row))
            }),
        }

        let mut seen = HashSet::new();
        terms.retain(|&t| seen.insert(t.name.as_str()));
        terms
    }

    /// [`TaxonomyTree::effective_terms`] by path; `None` if the path is unknown.
    pub fn effective_terms_at(&self, path: &str) -> Option<Vec<&TermDefinition>> {
        self.get(path).map(|n| self.effective_terms(n))
    }

    /// Parent path of `path` if that parent exists in this tree.
    pub fn resolve_parent(&self, path: &str) -> Option<&TaxonomyNode> {
        parent_path(path).and_then(|p| self.get(p))
    }

    pub(crate) fn nodes(&self) -> &[TaxonomyNode] {
        &self.nodes
    }
}

/// Iterator returned by [`TaxonomyTree::iter`].
pub struct DepthFirst<'a> {
    tree: &'a TaxonomyTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a TaxonomyNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        self.stack.extend(node.children.iter().rev().copied());
        Some(node)
    }
}
