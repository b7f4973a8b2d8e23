use serde::Serialize;
use thiserror::Error;

/// Result type for structural mutations
pub type Result<T> = std::result::Result<T, MutationError>;

/// Reasons a re-parent request is rejected.
///
/// A rejected mutation never leaves a partially applied forest behind: the
/// input forest is untouched and no new forest is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// The moved node or the requested parent does not exist
    #[error("Node not found: {node_id}")]
    NodeNotFound { node_id: String },

    /// A node was asked to become its own parent
    #[error("Node cannot be its own parent: {node_id}")]
    SelfParent { node_id: String },

    /// The requested parent sits inside the moved node's subtree
    #[error("Moving {node_id} under {new_parent_id} would create a cycle")]
    CycleDetected {
        node_id: String,
        new_parent_id: String,
    },

    /// Members are leaves and cannot own children
    #[error("Cannot attach {node_id} under member {new_parent_id}")]
    LeafParent {
        node_id: String,
        new_parent_id: String,
    },

    /// The moved subtree would reach below the configured depth cap
    #[error("Moving {node_id} would reach depth {depth}, limit is {limit}")]
    DepthLimitExceeded {
        node_id: String,
        depth: usize,
        limit: usize,
    },
}

/// Discriminant of a [`MutationError`], serialized the way screens branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MutationErrorKind {
    NodeNotFound,
    SelfParent,
    CycleDetected,
    LeafParent,
    DepthLimitExceeded,
}

/// Flat `{ kind, nodeId, details }` view of a rejected mutation.
///
/// `kind` is one of `NodeNotFound`, `SelfParent`, `CycleDetected`,
/// `LeafParent` or `DepthLimitExceeded`. The last two guard the member-leaf
/// and depth-cap invariants; consumers matching only the first three must
/// treat unknown kinds as a generic rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationErrorReport {
    pub kind: MutationErrorKind,
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl MutationError {
    pub(crate) fn not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    pub fn kind(&self) -> MutationErrorKind {
        match self {
            Self::NodeNotFound { .. } => MutationErrorKind::NodeNotFound,
            Self::SelfParent { .. } => MutationErrorKind::SelfParent,
            Self::CycleDetected { .. } => MutationErrorKind::CycleDetected,
            Self::LeafParent { .. } => MutationErrorKind::LeafParent,
            Self::DepthLimitExceeded { .. } => MutationErrorKind::DepthLimitExceeded,
        }
    }

    /// Id of the node the rejection is about
    pub fn node_id(&self) -> &str {
        match self {
            Self::NodeNotFound { node_id }
            | Self::SelfParent { node_id }
            | Self::CycleDetected { node_id, .. }
            | Self::LeafParent { node_id, .. }
            | Self::DepthLimitExceeded { node_id, .. } => node_id,
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            Self::NodeNotFound { .. } | Self::SelfParent { .. } => None,
            Self::CycleDetected { new_parent_id, .. } => {
                Some(format!("{new_parent_id} is a descendant of the moved node"))
            }
            Self::LeafParent { new_parent_id, .. } => {
                Some(format!("{new_parent_id} is a member"))
            }
            Self::DepthLimitExceeded { depth, limit, .. } => {
                Some(format!("depth {depth} exceeds limit {limit}"))
            }
        }
    }

    pub fn report(&self) -> MutationErrorReport {
        MutationErrorReport {
            kind: self.kind(),
            node_id: self.node_id().to_string(),
            details: self.details(),
        }
    }
}

/// Errors raised while validating a metric spec or engine configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// A metric was declared with an empty name
    #[error("Metric name must not be empty")]
    EmptyName,

    /// The same name is declared twice (additive and ratio names share one namespace)
    #[error("Duplicate metric name: {0}")]
    DuplicateMetric(String),

    /// A ratio refers to a metric that is not declared additive
    #[error("Ratio {ratio} references undeclared additive metric {metric}")]
    UnknownOperand { ratio: String, metric: String },

    /// A ratio scale is NaN or infinite
    #[error("Ratio {0} has a non-finite scale")]
    InvalidScale(String),

    /// Invalid tree configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SpecError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_carries_kind_and_details() {
        let err = MutationError::CycleDetected {
            node_id: "A".to_string(),
            new_parent_id: "B".to_string(),
        };
        let report = err.report();
        assert_eq!(report.kind, MutationErrorKind::CycleDetected);
        assert_eq!(report.node_id, "A");
        assert_eq!(
            report.details.as_deref(),
            Some("B is a descendant of the moved node")
        );
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = MutationError::not_found("ghost").report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "NodeNotFound");
        assert_eq!(json["nodeId"], "ghost");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn report_kinds_on_the_wire() {
        let errors = [
            MutationError::not_found("a"),
            MutationError::SelfParent {
                node_id: "a".to_string(),
            },
            MutationError::CycleDetected {
                node_id: "a".to_string(),
                new_parent_id: "b".to_string(),
            },
            MutationError::LeafParent {
                node_id: "a".to_string(),
                new_parent_id: "m".to_string(),
            },
            MutationError::DepthLimitExceeded {
                node_id: "a".to_string(),
                depth: 11,
                limit: 10,
            },
        ];
        let kinds: Vec<String> = errors
            .iter()
            .map(|e| {
                let json = serde_json::to_value(e.report()).unwrap();
                json["kind"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "NodeNotFound",
                "SelfParent",
                "CycleDetected",
                "LeafParent",
                "DepthLimitExceeded"
            ]
        );
    }
}
