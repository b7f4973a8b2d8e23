use crate::error::SpecError;
use crate::metrics::MetricSpec;
use serde::{Deserialize, Serialize};

/// Default cap on hierarchy depth (roots are depth 0)
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Upper bound accepted for `max_depth`
pub const MAX_DEPTH_LIMIT: usize = 1024;

/// How siblings (and roots) are ordered when no comparator is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SiblingOrder {
    /// Keep the order records arrived in
    #[default]
    Insertion,

    /// Sort by id, ties keep insertion order
    Id,
}

/// Tree construction behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeConfig {
    /// Deepest depth a node may sit at; deeper subtrees are re-rooted.
    ///
    /// A re-rooted subtree rolls up on its own: its metrics no longer reach
    /// the ancestors it declared, so their totals exclude it. The cut is listed
    /// in [`crate::BuildReport::depth_capped`]; forest-wide totals still count it.
    pub max_depth: usize,

    /// Sibling order used when the builder has no comparator
    pub sibling_order: SiblingOrder,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            sibling_order: SiblingOrder::Insertion,
        }
    }
}

impl TreeConfig {
    /// Org-chart sized trees (the default cap)
    pub fn strict() -> Self {
        Self::default()
    }

    /// Generous cap for deep imported hierarchies
    pub fn deep() -> Self {
        Self {
            max_depth: 64,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if self.max_depth == 0 {
            return Err(SpecError::invalid_config("maxDepth must be > 0"));
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(SpecError::invalid_config(format!(
                "maxDepth ({}) cannot exceed {}",
                self.max_depth, MAX_DEPTH_LIMIT
            )));
        }
        Ok(())
    }
}

/// Everything a screen needs to build and roll up one hierarchy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub tree: TreeConfig,
    pub metrics: MetricSpec,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), SpecError> {
        self.tree.validate()?;
        self.metrics.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(TreeConfig::default().validate().is_ok());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(TreeConfig::strict().validate().is_ok());
        assert!(TreeConfig::deep().validate().is_ok());
        assert!(TreeConfig::deep().max_depth > TreeConfig::strict().max_depth);
    }

    #[test]
    fn test_config_validation() {
        let mut config = TreeConfig {
            max_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.max_depth = MAX_DEPTH_LIMIT + 1;
        assert!(config.validate().is_err());

        config.max_depth = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_checks_metrics() {
        let config = EngineConfig {
            metrics: MetricSpec::new().additive("sales").additive("sales"),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SpecError::DuplicateMetric(_))
        ));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"tree":{"siblingOrder":"id"}}"#).unwrap();
        assert_eq!(config.tree.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.tree.sibling_order, SiblingOrder::Id);
        assert!(config.metrics.additive.is_empty());
    }
}
