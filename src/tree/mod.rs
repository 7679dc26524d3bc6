//! Path-indexed rooted tree.
//!
//! Nodes live in an arena of slots addressed by stable indices; each node
//! stores its segment name, its parent index, a name-ordered child map, the
//! state of its single incoming edge, and the field proxies mirrored onto
//! it. The single-parent and acyclicity guarantees are structural: there is
//! no way to express anything but a rooted tree.
//!
//! Paths are the only external identifiers. A valid path starts with the
//! separator, does not end with it, and has no empty segments; two equal
//! path strings always denote the same node.

mod traverse;

pub use traverse::{BreadthFirst, DepthFirst};

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use crate::error::{RegistryError, Result};
use crate::models::Fields;
use crate::registry::FieldMap;

/// Stable handle to a tree node. Valid until the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

/// State of the single edge terminating at a node.
///
/// The model reference is the authoritative marker that the node's path is
/// directly registered, as opposed to merely existing because a descendant
/// needed it. The reference is non-owning: a bound model can be released
/// by its owner at any time without the edge noticing.
#[derive(Default)]
pub struct EdgeState {
    model: Option<Weak<dyn Fields>>,
}

impl EdgeState {
    /// Whether a model reference is present, live or not.
    pub fn is_bound(&self) -> bool {
        self.model.is_some()
    }

    /// Upgrade to the bound model, if it is still alive.
    pub fn model(&self) -> Option<Arc<dyn Fields>> {
        self.model.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn bind(&mut self, model: Weak<dyn Fields>) {
        self.model = Some(model);
    }

    pub(crate) fn clear(&mut self) {
        self.model = None;
    }
}

struct TreeNode {
    name: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    edge: EdgeState,
    fields: FieldMap,
}

impl TreeNode {
    fn new(name: &str, parent: NodeId) -> Self {
        Self {
            name: name.to_string(),
            parent: Some(parent),
            children: BTreeMap::new(),
            edge: EdgeState::default(),
            fields: FieldMap::new(),
        }
    }

    fn root() -> Self {
        Self {
            name: String::new(),
            parent: None,
            children: BTreeMap::new(),
            edge: EdgeState::default(),
            fields: FieldMap::new(),
        }
    }
}

/// A path-indexed rooted tree with lazy node materialization.
pub struct PathTree {
    separator: char,
    slots: Vec<Option<TreeNode>>,
    free: Vec<usize>,
}

impl PathTree {
    pub fn new(separator: char) -> Self {
        Self {
            separator,
            slots: vec![Some(TreeNode::root())],
            free: Vec::new(),
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    fn validate(&self, path: &str) -> Result<()> {
        let invalid = |reason| RegistryError::InvalidPath {
            path: path.to_string(),
            reason,
        };
        if !path.starts_with(self.separator) {
            return Err(invalid("must start with the separator"));
        }
        if path.ends_with(self.separator) {
            return Err(invalid("must not end with the separator"));
        }
        if path.split(self.separator).skip(1).any(str::is_empty) {
            return Err(invalid("empty segment"));
        }
        Ok(())
    }

    /// Materialize every missing node along `path` and return the terminal
    /// node's id, plus whether this call created the terminal node.
    ///
    /// Idempotent: repeating the call returns the same id with no side
    /// effects, and shared prefixes across different paths never produce
    /// duplicate nodes.
    pub fn ensure(&mut self, path: &str) -> Result<(NodeId, bool)> {
        self.validate(path)?;
        let mut current = ROOT;
        let mut created = false;
        for segment in path.split(self.separator).skip(1) {
            match self.node(current).children.get(segment).copied() {
                Some(child) => {
                    current = child;
                    created = false;
                }
                None => {
                    let child = self.alloc(TreeNode::new(segment, current));
                    self.node_mut(current)
                        .children
                        .insert(segment.to_string(), child);
                    current = child;
                    created = true;
                }
            }
        }
        Ok((current, created))
    }

    pub fn lookup(&self, path: &str) -> Result<NodeId> {
        self.validate(path)?;
        let mut current = ROOT;
        for segment in path.split(self.separator).skip(1) {
            current = match self.node(current).children.get(segment) {
                Some(&child) => child,
                None => return Err(RegistryError::PathNotFound(path.to_string())),
            };
        }
        Ok(current)
    }

    /// Delete the node at `path` and every descendant below it.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let id = self.lookup(path)?;
        if let Some(parent) = self.node(id).parent {
            let name = self.node(id).name.clone();
            self.node_mut(parent).children.remove(&name);
        }
        let mut stack = vec![id];
        while let Some(NodeId(index)) = stack.pop() {
            let node = self.slots[index].take().expect("stale node id");
            stack.extend(node.children.into_values());
            self.free.push(index);
        }
        Ok(())
    }

    /// The path with its last segment stripped, or `None` for an immediate
    /// child of the root.
    pub fn parent(&self, path: &str) -> Result<Option<String>> {
        self.validate(path)?;
        match path.rfind(self.separator) {
            Some(0) | None => Ok(None),
            Some(index) => Ok(Some(path[..index].to_string())),
        }
    }

    /// The incoming edge of the node at `path`. Each non-root node stores
    /// the state of its single parent edge alongside it.
    pub fn edge(&self, path: &str) -> Result<&EdgeState> {
        let id = self.lookup(path)?;
        Ok(&self.node(id).edge)
    }

    /// Immediate child segment names under `path` (the root when absent),
    /// in ascending lexicographic order.
    pub fn children(&self, path: Option<&str>) -> Result<Vec<String>> {
        let id = match path {
            Some(p) => self.lookup(p)?,
            None => ROOT,
        };
        Ok(self.node(id).children.keys().cloned().collect())
    }

    /// Every non-root path. Set semantics: no duplicates, order is an
    /// implementation detail.
    pub fn nodes(&self) -> Vec<String> {
        DepthFirst::new(self, ROOT).collect()
    }

    /// Every `(parent, child)` path pair whose parent is not the root.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            stack.extend(node.children.values().copied());
            if let Some(parent) = node.parent {
                if parent != ROOT {
                    edges.push((self.path_of(parent), self.path_of(id)));
                }
            }
        }
        edges
    }

    /// Lazy pre-order depth-first walk over the descendants of `path`
    /// (the whole tree when absent).
    pub fn depth_first(&self, path: Option<&str>) -> Result<DepthFirst<'_>> {
        let start = match path {
            Some(p) => self.lookup(p)?,
            None => ROOT,
        };
        Ok(DepthFirst::new(self, start))
    }

    /// Lazy level-order walk over the descendants of `path` (the whole
    /// tree when absent).
    pub fn breadth_first(&self, path: Option<&str>) -> Result<BreadthFirst<'_>> {
        let start = match path {
            Some(p) => self.lookup(p)?,
            None => ROOT,
        };
        Ok(BreadthFirst::new(self, start))
    }

    pub(crate) fn incoming(&self, id: NodeId) -> &EdgeState {
        &self.node(id).edge
    }

    pub(crate) fn incoming_mut(&mut self, id: NodeId) -> &mut EdgeState {
        &mut self.node_mut(id).edge
    }

    pub(crate) fn fields(&self, id: NodeId) -> &FieldMap {
        &self.node(id).fields
    }

    pub(crate) fn fields_mut(&mut self, id: NodeId) -> &mut FieldMap {
        &mut self.node_mut(id).fields
    }

    /// Rebuild the full path of a node by walking parent links upward.
    pub(crate) fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            segments.push(self.node(current).name.clone());
            current = parent;
        }
        let mut path = String::new();
        for segment in segments.iter().rev() {
            path.push(self.separator);
            path.push_str(segment);
        }
        path
    }

    fn alloc(&mut self, node: TreeNode) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    fn node(&self, id: NodeId) -> &TreeNode {
        self.slots[id.0].as_ref().expect("stale node id")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        self.slots[id.0].as_mut().expect("stale node id")
    }
}
