use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric name -> entered value; `None` means "no value entered".
pub type Metrics = BTreeMap<String, Option<f64>>;

/// Role of a node in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Derives its totals from members and child teams
    Team,

    /// Carries its own entered totals, which supersede its members'
    SuperTeam,

    /// Individual contributor or house account; always a leaf
    Member,
}

impl NodeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeKind::Team => "team",
            NodeKind::SuperTeam => "superTeam",
            NodeKind::Member => "member",
        }
    }

    pub const fn is_leaf(self) -> bool {
        matches!(self, NodeKind::Member)
    }
}

/// One record of a flat hierarchy snapshot as delivered by the fetch layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRecord {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    pub kind: NodeKind,

    #[serde(default)]
    pub own_metrics: Metrics,
}

impl FlatRecord {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            kind,
            own_metrics: Metrics::new(),
        }
    }

    pub fn team(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Team)
    }

    pub fn super_team(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::SuperTeam)
    }

    pub fn member(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Member)
    }

    /// Set parent id
    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set one entered metric (pass `None` for an explicit null)
    pub fn metric(mut self, name: impl Into<String>, value: impl Into<Option<f64>>) -> Self {
        self.own_metrics.insert(name.into(), value.into());
        self
    }
}

/// A node of a built forest.
///
/// Structure (parent and children) lives in the owning [`crate::Forest`];
/// a node only carries its identity, kind, direct contribution and depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub own_metrics: Metrics,
    pub depth: usize,
}

impl Node {
    pub(crate) fn from_record(record: &FlatRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            own_metrics: record.own_metrics.clone(),
            depth: 0,
        }
    }

    /// Entered value for a metric, `None` when absent or null
    pub fn own_value(&self, name: &str) -> Option<f64> {
        self.own_metrics.get(name).copied().flatten()
    }
}

/// Parent linkage a caller persists after a successful move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentChange {
    pub node_id: String,
    pub new_parent_id: Option<String>,
}

impl ParentChange {
    pub fn new(node_id: impl Into<String>, new_parent_id: Option<&str>) -> Self {
        Self {
            node_id: node_id.into(),
            new_parent_id: new_parent_id.map(str::to_string),
        }
    }
}
