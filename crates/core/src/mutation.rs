use crate::error::{MutationError, Result};
use crate::forest::Forest;
use crate::types::ParentChange;
use petgraph::graph::NodeIndex;

/// Outcome of an accepted move
#[derive(Debug, Clone)]
pub struct Reparented {
    /// New forest; the input forest is untouched
    pub forest: Forest,

    /// Ids of the moved node's new ancestors, root first
    pub ancestry: Vec<String>,

    /// Linkage to persist
    pub change: ParentChange,
}

/// Validated move of a node from its current parent to another
struct Plan {
    node: NodeIndex,
    new_parent: Option<NodeIndex>,
    new_depth: usize,
}

/// Structural edits on a forest.
///
/// Every edit is all-or-nothing: either every precondition holds and a new
/// forest is returned, or a [`MutationError`] is returned and nothing changes.
pub struct MutationService;

impl MutationService {
    /// Move `node_id` (with its subtree) under `new_parent_id`, or to the
    /// root list when `new_parent_id` is `None`. The node becomes the last
    /// child of its new parent.
    pub fn reparent(
        forest: &Forest,
        node_id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<Reparented> {
        let plan = Self::plan(forest, node_id, new_parent_id)?;
        let change = ParentChange::new(node_id, new_parent_id);

        if forest.parent(plan.node) == plan.new_parent {
            log::debug!("{} already sits under {:?}, nothing to move", node_id, new_parent_id);
            return Ok(Reparented {
                ancestry: forest.ancestry(plan.node),
                forest: forest.clone(),
                change,
            });
        }

        let mut next = forest.clone();
        next.detach(plan.node);
        match plan.new_parent {
            Some(parent) => next.link(parent, plan.node),
            None => next.roots.push(plan.node),
        }
        let over_limit = next.assign_depths(plan.node, plan.new_depth);
        debug_assert!(over_limit.is_empty(), "depth limit checked in plan");

        log::debug!(
            "Moved {} under {:?} ({} node subtree, depth {})",
            node_id,
            new_parent_id,
            next.descendants(plan.node).len() + 1,
            plan.new_depth
        );

        Ok(Reparented {
            ancestry: next.ancestry(plan.node),
            forest: next,
            change,
        })
    }

    /// Promote a node (with its subtree) to a root
    pub fn detach(forest: &Forest, node_id: &str) -> Result<Reparented> {
        Self::reparent(forest, node_id, None)
    }

    /// Check a move without applying it (drop-target highlighting and the like)
    pub fn validate(forest: &Forest, node_id: &str, new_parent_id: Option<&str>) -> Result<()> {
        Self::plan(forest, node_id, new_parent_id).map(|_| ())
    }

    fn plan(forest: &Forest, node_id: &str, new_parent_id: Option<&str>) -> Result<Plan> {
        let node = forest
            .find(node_id)
            .ok_or_else(|| MutationError::not_found(node_id))?;

        let new_parent = match new_parent_id {
            None => None,
            Some(parent_id) => {
                let parent = forest
                    .find(parent_id)
                    .ok_or_else(|| MutationError::not_found(parent_id))?;
                if parent == node {
                    return Err(MutationError::SelfParent {
                        node_id: node_id.to_string(),
                    });
                }
                if forest.is_descendant(parent, node) {
                    return Err(MutationError::CycleDetected {
                        node_id: node_id.to_string(),
                        new_parent_id: parent_id.to_string(),
                    });
                }
                if forest[parent].kind.is_leaf() {
                    return Err(MutationError::LeafParent {
                        node_id: node_id.to_string(),
                        new_parent_id: parent_id.to_string(),
                    });
                }
                Some(parent)
            }
        };

        let new_depth = new_parent.map_or(0, |parent| forest[parent].depth + 1);
        let deepest = new_depth + forest.subtree_height(node);
        if deepest > forest.max_depth() {
            return Err(MutationError::DepthLimitExceeded {
                node_id: node_id.to_string(),
                depth: deepest,
                limit: forest.max_depth(),
            });
        }

        Ok(Plan {
            node,
            new_parent,
            new_depth,
        })
    }
}
