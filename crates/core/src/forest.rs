use crate::types::{FlatRecord, Node};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::ops::Index;

/// Parent -> child edge. `position` orders siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link {
    pub position: usize,
}

/// Repairs applied while building a forest from untrusted records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    /// Declared parent missing from the snapshot; promoted to root
    pub dangling: Vec<String>,

    /// Detached to break a parent cycle; promoted to root
    pub cycles_broken: Vec<String>,

    /// Declared parent is a member; promoted to root
    pub leaf_parents: Vec<String>,

    /// Would sit below the depth cap; promoted to root with its subtree
    pub depth_capped: Vec<String>,

    /// Records dropped because their id was already used
    pub duplicates: Vec<String>,
}

impl BuildReport {
    pub fn repairs(&self) -> usize {
        self.dangling.len()
            + self.cycles_broken.len()
            + self.leaf_parents.len()
            + self.depth_capped.len()
            + self.duplicates.len()
    }

    pub fn is_clean(&self) -> bool {
        self.repairs() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForestStats {
    pub nodes: usize,
    pub roots: usize,
    pub leaves: usize,
    pub max_depth: usize,
}

/// Rooted forest built from a flat snapshot.
///
/// Structure is held in a petgraph `DiGraph` with parent -> child edges; every
/// node has at most one incoming edge. Cloning a forest is how mutations stay
/// copy-on-write.
#[derive(Debug, Clone)]
pub struct Forest {
    pub(crate) graph: DiGraph<Node, Link>,
    pub(crate) index: HashMap<String, NodeIndex>,
    pub(crate) roots: Vec<NodeIndex>,
    pub(crate) next_position: usize,
    pub(crate) max_depth: usize,
    pub(crate) report: BuildReport,
}

impl Forest {
    pub(crate) fn with_capacity(nodes: usize, max_depth: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, nodes),
            index: HashMap::with_capacity(nodes),
            roots: Vec::new(),
            next_position: 0,
            max_depth,
            report: BuildReport::default(),
        }
    }

    pub(crate) fn add_node(&mut self, node: Node) -> NodeIndex {
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Append `child` as the last child of `parent`
    pub(crate) fn link(&mut self, parent: NodeIndex, child: NodeIndex) {
        let position = self.next_position;
        self.next_position += 1;
        self.graph.add_edge(parent, child, Link { position });
    }

    /// Remove `child` from its parent's children or from the root list
    pub(crate) fn detach(&mut self, child: NodeIndex) {
        let incoming = self
            .graph
            .edges_directed(child, Direction::Incoming)
            .map(|e| e.id())
            .next();
        match incoming {
            Some(edge) => {
                self.graph.remove_edge(edge);
            }
            None => self.roots.retain(|&r| r != child),
        }
    }

    pub(crate) fn promote_to_root(&mut self, idx: NodeIndex) {
        self.detach(idx);
        self.roots.push(idx);
    }

    /// Breadth-first depth assignment for the subtree under `start`.
    ///
    /// Returns nodes whose depth would exceed `max_depth`; they are left
    /// untouched for the caller to handle.
    pub(crate) fn assign_depths(&mut self, start: NodeIndex, base: usize) -> Vec<NodeIndex> {
        let mut over_limit = Vec::new();
        let mut queue = VecDeque::from([(start, base)]);
        while let Some((idx, depth)) = queue.pop_front() {
            self.graph[idx].depth = depth;
            for child in self.children(idx) {
                if depth + 1 > self.max_depth {
                    over_limit.push(child);
                } else {
                    queue.push_back((child, depth + 1));
                }
            }
        }
        over_limit
    }

    /// Root nodes in display order
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// Children of a node in display order
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(Link, NodeIndex)> = self
            .graph
            .edges(idx)
            .map(|e| (*e.weight(), e.target()))
            .collect();
        edges.sort_unstable_by_key(|(link, _)| *link);
        edges.into_iter().map(|(_, child)| child).collect()
    }

    pub fn has_children(&self, idx: NodeIndex) -> bool {
        self.graph.edges(idx).next().is_some()
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    /// Find node index by id
    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Find node by id
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.find(id).and_then(|idx| self.node(idx))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All nodes in snapshot order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx).map(|node| (idx, node)))
    }

    /// Ancestors of a node, nearest first
    pub fn ancestors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = Vec::new();
        let mut current = self.parent(idx);
        while let Some(parent) = current {
            // Acyclic by construction; bound the walk anyway
            if chain.len() >= self.graph.node_count() {
                log::warn!("Ancestor walk exceeded node count, stopping");
                break;
            }
            chain.push(parent);
            current = self.parent(parent);
        }
        chain
    }

    /// Ancestor ids from the root down to the direct parent
    pub fn ancestry(&self, idx: NodeIndex) -> Vec<String> {
        self.ancestors(idx)
            .into_iter()
            .rev()
            .map(|a| self.graph[a].id.clone())
            .collect()
    }

    /// Every node below `idx`, breadth-first
    pub fn descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut bfs = Bfs::new(&self.graph, idx);
        let mut out = Vec::new();
        while let Some(next) = bfs.next(&self.graph) {
            if next != idx {
                out.push(next);
            }
        }
        out
    }

    /// Whether `candidate` sits inside the subtree rooted at `ancestor`
    pub fn is_descendant(&self, candidate: NodeIndex, ancestor: NodeIndex) -> bool {
        candidate != ancestor
            && petgraph::algo::has_path_connecting(&self.graph, ancestor, candidate, None)
    }

    /// Levels below `idx` in its subtree (0 for a leaf)
    pub fn subtree_height(&self, idx: NodeIndex) -> usize {
        let base = self.graph[idx].depth;
        self.descendants(idx)
            .into_iter()
            .map(|d| self.graph[d].depth.saturating_sub(base))
            .max()
            .unwrap_or(0)
    }

    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.get(id).map(|node| node.depth)
    }

    /// Depth cap this forest was built with
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn stats(&self) -> ForestStats {
        ForestStats {
            nodes: self.len(),
            roots: self.roots.len(),
            leaves: self
                .graph
                .node_indices()
                .filter(|&idx| !self.has_children(idx))
                .count(),
            max_depth: self
                .graph
                .node_indices()
                .map(|idx| self.graph[idx].depth)
                .max()
                .unwrap_or(0),
        }
    }

    /// Flat snapshot in display pre-order (parents before children)
    pub fn to_records(&self) -> Vec<FlatRecord> {
        let mut records = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeIndex> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            let node = &self.graph[idx];
            records.push(FlatRecord {
                id: node.id.clone(),
                parent_id: self.parent(idx).map(|p| self.graph[p].id.clone()),
                kind: node.kind,
                own_metrics: node.own_metrics.clone(),
            });
            stack.extend(self.children(idx).into_iter().rev());
        }
        records
    }
}

impl Index<NodeIndex> for Forest {
    type Output = Node;

    fn index(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }
}
