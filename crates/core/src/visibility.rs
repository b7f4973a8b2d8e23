use crate::forest::Forest;
use crate::rollup::{RolledForest, RolledMetrics};
use crate::types::{Node, NodeKind};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::HashSet;

/// Row styling discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RowKind {
    Team,
    SuperTeam,
    Member,
}

impl From<NodeKind> for RowKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Team => RowKind::Team,
            NodeKind::SuperTeam => RowKind::SuperTeam,
            NodeKind::Member => RowKind::Member,
        }
    }
}

/// One visible row of a flattened hierarchy
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRow<'a> {
    #[serde(skip)]
    pub index: NodeIndex,
    pub node: &'a Node,
    pub depth: usize,
    pub kind: RowKind,
    pub rolled: &'a RolledMetrics,
    /// Whether an expand/collapse affordance applies
    pub has_children: bool,
    pub expanded: bool,
}

/// Expand/collapse-aware linearization of a rolled forest
pub struct VisibilityFlattener;

impl VisibilityFlattener {
    /// Visible rows in pre-order.
    ///
    /// Roots are always visible. Any other node is visible only when every
    /// ancestor up to its root is in `expanded`; traversal never descends
    /// below a collapsed node, so that holds by construction.
    pub fn flatten<'a>(rolled: &'a RolledForest<'_>, expanded: &HashSet<String>) -> Vec<FlatRow<'a>> {
        let forest = rolled.forest();
        let mut rows = Vec::new();
        let mut stack: Vec<NodeIndex> = forest.roots().iter().rev().copied().collect();

        while let Some(idx) = stack.pop() {
            if rows.len() >= forest.len() {
                log::warn!("Flatten visited more rows than nodes, stopping");
                break;
            }
            let (Some(node), Some(metrics)) = (forest.node(idx), rolled.rolled(idx)) else {
                continue;
            };
            let children = forest.children(idx);
            let is_expanded = expanded.contains(&node.id);

            rows.push(FlatRow {
                index: idx,
                node,
                depth: node.depth,
                kind: node.kind.into(),
                rolled: metrics,
                has_children: !children.is_empty(),
                expanded: is_expanded,
            });

            if is_expanded {
                stack.extend(children.into_iter().rev());
            }
        }

        log::debug!("Flattened {} of {} nodes", rows.len(), forest.len());
        rows
    }

    /// Whether `id` would be emitted by [`Self::flatten`] for this expansion state
    pub fn is_visible(forest: &Forest, id: &str, expanded: &HashSet<String>) -> bool {
        let Some(idx) = forest.find(id) else {
            return false;
        };
        forest
            .ancestors(idx)
            .into_iter()
            .all(|ancestor| expanded.contains(&forest[ancestor].id))
    }

    /// Ids that must be expanded to reveal `id`, root first
    pub fn expansion_path(forest: &Forest, id: &str) -> Vec<String> {
        forest
            .find(id)
            .map(|idx| forest.ancestry(idx))
            .unwrap_or_default()
    }

    /// Expansion state with every parent expanded
    pub fn expand_all(forest: &Forest) -> HashSet<String> {
        forest
            .nodes()
            .filter(|(idx, _)| forest.has_children(*idx))
            .map(|(_, node)| node.id.clone())
            .collect()
    }
}
