use crate::config::{SiblingOrder, TreeConfig};
use crate::forest::Forest;
use crate::store::NodeStore;
use crate::types::{FlatRecord, Node};
use petgraph::graph::NodeIndex;
use std::cmp::Ordering;
use std::collections::HashSet;

type Comparator = Box<dyn Fn(&FlatRecord, &FlatRecord) -> Ordering + Send + Sync>;

/// Build a rooted forest from flat parent-linked records.
///
/// Building never fails: records that cannot be attached where they claim to
/// belong become roots, and every such repair lands in the forest's
/// [`crate::BuildReport`].
pub struct TreeBuilder {
    config: TreeConfig,
    comparator: Option<Comparator>,
}

impl TreeBuilder {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            comparator: None,
        }
    }

    /// Order siblings and roots with a custom comparator (stable: ties keep
    /// insertion order). Overrides the configured [`SiblingOrder`].
    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&FlatRecord, &FlatRecord) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Box::new(comparator));
        self
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Build forest from records
    pub fn build(&self, records: &[FlatRecord]) -> Forest {
        self.build_store(&NodeStore::new(records.iter().cloned()))
    }

    /// Build forest from an indexed snapshot
    pub fn build_store(&self, store: &NodeStore) -> Forest {
        let max_depth = self.config.max_depth.max(1);
        let mut forest = Forest::with_capacity(store.len(), max_depth);
        forest.report.duplicates = store.duplicates().to_vec();

        let ordered = self.ordered(store);

        // Phase 1: node shells. NodeIndex order == sorted record order.
        for record in &ordered {
            let mut node = Node::from_record(record);
            sanitize_metrics(&mut node);
            forest.add_node(node);
        }

        // Phase 2: parent links
        for (pos, record) in ordered.iter().enumerate() {
            let idx = NodeIndex::new(pos);
            let Some(parent_id) = record.parent_id.as_deref() else {
                forest.roots.push(idx);
                continue;
            };
            match forest.find(parent_id) {
                None => {
                    forest.report.dangling.push(record.id.clone());
                    forest.roots.push(idx);
                }
                Some(parent) if parent == idx => {
                    forest.report.cycles_broken.push(record.id.clone());
                    forest.roots.push(idx);
                }
                Some(parent) if forest[parent].kind.is_leaf() => {
                    forest.report.leaf_parents.push(record.id.clone());
                    forest.roots.push(idx);
                }
                Some(parent) => forest.link(parent, idx),
            }
        }

        break_cycles(&mut forest);

        // Phase 3: depth, re-rooting anything below the cap
        let mut pending: Vec<NodeIndex> = forest.roots.clone();
        while !pending.is_empty() {
            let mut capped = Vec::new();
            for root in pending {
                capped.extend(forest.assign_depths(root, 0));
            }
            for &idx in &capped {
                forest.report.depth_capped.push(forest[idx].id.clone());
                forest.promote_to_root(idx);
            }
            pending = capped;
        }
        forest.roots.sort_unstable_by_key(|idx| idx.index());

        log_report(&forest);
        log::info!(
            "Built forest: {} nodes, {} roots",
            forest.len(),
            forest.roots().len()
        );

        forest
    }

    fn ordered<'a>(&self, store: &'a NodeStore) -> Vec<&'a FlatRecord> {
        let mut ordered: Vec<&FlatRecord> = store.iter().collect();
        match (&self.comparator, self.config.sibling_order) {
            (Some(cmp), _) => ordered.sort_by(|a, b| cmp(*a, *b)),
            (None, SiblingOrder::Id) => ordered.sort_by(|a, b| a.id.cmp(&b.id)),
            (None, SiblingOrder::Insertion) => {}
        }
        ordered
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

/// Drop non-finite entered values so they can never reach a rollup
fn sanitize_metrics(node: &mut Node) {
    for (name, value) in node.own_metrics.iter_mut() {
        if value.is_some_and(|v| !v.is_finite()) {
            log::warn!("Ignoring non-finite {} on {}", name, node.id);
            *value = None;
        }
    }
}

/// Promote one node per parent cycle to root until every node is reachable.
///
/// A node unreachable from the roots after linking is on, or hangs below, a
/// cycle. Walking its parent chain finds the cycle; the member that came
/// first in record order is detached.
fn break_cycles(forest: &mut Forest) {
    let mut reachable: HashSet<NodeIndex> = HashSet::with_capacity(forest.len());
    for &root in &forest.roots {
        reachable.insert(root);
        reachable.extend(forest.descendants(root));
    }
    if reachable.len() == forest.len() {
        return;
    }

    for pos in 0..forest.len() {
        let idx = NodeIndex::new(pos);
        if reachable.contains(&idx) {
            continue;
        }

        let mut seen = HashSet::new();
        let mut current = idx;
        while seen.insert(current) {
            match forest.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        // `current` was seen twice, so it lies on the cycle
        let mut cycle = vec![current];
        let mut walk = forest.parent(current);
        while let Some(next) = walk {
            if next == current {
                break;
            }
            cycle.push(next);
            walk = forest.parent(next);
        }

        let Some(&victim) = cycle.iter().min_by_key(|c| c.index()) else {
            continue;
        };
        forest.report.cycles_broken.push(forest[victim].id.clone());
        forest.promote_to_root(victim);
        reachable.insert(victim);
        reachable.extend(forest.descendants(victim));
    }
}

fn log_report(forest: &Forest) {
    let report = forest.report();
    if report.is_clean() {
        return;
    }
    if !report.dangling.is_empty() {
        log::warn!(
            "Promoted {} record(s) with unknown parent to root: {:?}",
            report.dangling.len(),
            report.dangling
        );
    }
    if !report.cycles_broken.is_empty() {
        log::warn!("Broke parent cycle(s) at {:?}", report.cycles_broken);
    }
    if !report.leaf_parents.is_empty() {
        log::warn!(
            "Promoted record(s) parented by a member to root: {:?}",
            report.leaf_parents
        );
    }
    if !report.depth_capped.is_empty() {
        log::warn!(
            "Re-rooted subtree(s) below depth {}: {:?}",
            forest.max_depth(),
            report.depth_capped
        );
    }
    if !report.duplicates.is_empty() {
        log::warn!("Dropped duplicate id(s): {:?}", report.duplicates);
    }
}
