use crate::error::SpecError;
use crate::forest::Forest;
use crate::metrics::MetricSpec;
use crate::types::{Node, NodeKind};
use petgraph::graph::NodeIndex;
use petgraph::visit::DfsPostOrder;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rolled-up metrics of one node (own contribution plus counted descendants)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RolledMetrics {
    values: BTreeMap<String, f64>,
    ratios: BTreeMap<String, Option<f64>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    contributors: BTreeMap<String, usize>,
}

impl RolledMetrics {
    /// Rolled additive value; `None` if the metric is not declared additive
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Rolled ratio; `None` when undeclared or not applicable
    pub fn ratio(&self, name: &str) -> Option<f64> {
        self.ratios.get(name).copied().flatten()
    }

    /// Nodes whose entered value was counted into this rollup
    pub fn contributors(&self, name: &str) -> usize {
        self.contributors.get(name).copied().unwrap_or(0)
    }

    /// Whether any counted node actually entered a value (0 and "nothing
    /// entered" roll up to the same number but are not the same state)
    pub fn has_data(&self, name: &str) -> bool {
        self.contributors(name) > 0
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    pub fn ratios(&self) -> &BTreeMap<String, Option<f64>> {
        &self.ratios
    }

    fn add(&mut self, name: &str, value: f64, contributors: usize) {
        *self.values.entry(name.to_string()).or_insert(0.0) += value;
        if contributors > 0 {
            *self.contributors.entry(name.to_string()).or_insert(0) += contributors;
        }
    }

    fn finish_ratios(&mut self, spec: &MetricSpec) {
        for ratio in &spec.ratios {
            let numerator = self.value(&ratio.numerator).unwrap_or(0.0);
            let denominator = self.value(&ratio.denominator).unwrap_or(0.0);
            let value = ratio.evaluate(numerator, denominator, spec.zero_denominator);
            self.ratios.insert(ratio.name.clone(), value);
        }
    }
}

/// Bottom-up metric rollup over a [`Forest`]
#[derive(Debug, Clone)]
pub struct RollupCalculator {
    spec: MetricSpec,
}

impl RollupCalculator {
    pub fn new(spec: MetricSpec) -> Result<Self, SpecError> {
        spec.validate()?;
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &MetricSpec {
        &self.spec
    }

    /// Roll up every tree of the forest.
    ///
    /// Post-order with an explicit stack: each node is combined once, after
    /// all of its children, from their already-rolled values.
    pub fn rollup<'f>(&self, forest: &'f Forest) -> RolledForest<'f> {
        let mut rolled = vec![RolledMetrics::default(); forest.graph.node_count()];

        for &root in forest.roots() {
            let mut dfs = DfsPostOrder::new(&forest.graph, root);
            while let Some(idx) = dfs.next(&forest.graph) {
                let metrics = self.combine(forest, idx, &rolled);
                rolled[idx.index()] = metrics;
            }
        }

        log::debug!(
            "Rolled up {} nodes over {} metric(s)",
            rolled.len(),
            self.spec.additive.len() + self.spec.ratios.len()
        );

        RolledForest {
            forest,
            rolled,
            spec: self.spec.clone(),
        }
    }

    fn combine(&self, forest: &Forest, idx: NodeIndex, rolled: &[RolledMetrics]) -> RolledMetrics {
        let node: &Node = &forest[idx];
        // A super team's own entries are the whole subtree's contribution,
        // for every metric, entered or not
        let children = if node.kind == NodeKind::SuperTeam {
            Vec::new()
        } else {
            forest.children(idx)
        };
        let mut out = RolledMetrics::default();

        for name in &self.spec.additive {
            let own = node.own_value(name);
            out.add(name, own.unwrap_or(0.0), usize::from(own.is_some()));
            for child in &children {
                let child = &rolled[child.index()];
                out.add(name, child.value(name).unwrap_or(0.0), child.contributors(name));
            }
        }

        out.finish_ratios(&self.spec);
        out
    }
}

/// A forest annotated with per-node rollups. Borrows the forest; the forest
/// itself is never modified.
#[derive(Debug, Clone)]
pub struct RolledForest<'f> {
    forest: &'f Forest,
    rolled: Vec<RolledMetrics>,
    spec: MetricSpec,
}

impl<'f> RolledForest<'f> {
    pub fn forest(&self) -> &'f Forest {
        self.forest
    }

    pub fn spec(&self) -> &MetricSpec {
        &self.spec
    }

    pub fn rolled(&self, idx: NodeIndex) -> Option<&RolledMetrics> {
        self.rolled.get(idx.index())
    }

    pub fn rolled_by_id(&self, id: &str) -> Option<&RolledMetrics> {
        self.forest.find(id).and_then(|idx| self.rolled(idx))
    }

    /// Grand totals across all roots, ratios recomputed from the summed operands
    pub fn totals(&self) -> RolledMetrics {
        let mut totals = RolledMetrics::default();
        for name in &self.spec.additive {
            totals.add(name, 0.0, 0);
            for &root in self.forest.roots() {
                let rolled = &self.rolled[root.index()];
                totals.add(name, rolled.value(name).unwrap_or(0.0), rolled.contributors(name));
            }
        }
        totals.finish_ratios(&self.spec);
        totals
    }
}
