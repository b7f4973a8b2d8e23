use crate::error::SpecError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What a ratio resolves to when its rolled denominator is zero or absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZeroDenominator {
    /// Report 0
    Zero,

    /// Report "not applicable" (`None`)
    #[default]
    NotApplicable,
}

impl ZeroDenominator {
    pub const fn sentinel(self) -> Option<f64> {
        match self {
            ZeroDenominator::Zero => Some(0.0),
            ZeroDenominator::NotApplicable => None,
        }
    }
}

/// A metric derived from two rolled additive metrics:
/// `numerator / denominator * scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioMetric {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl RatioMetric {
    pub fn new(
        name: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
            scale: default_scale(),
        }
    }

    /// Ratio expressed in percent (e.g. margin % = gross profit / sales * 100)
    pub fn percentage(
        name: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
    ) -> Self {
        Self {
            scale: 100.0,
            ..Self::new(name, numerator, denominator)
        }
    }

    /// Evaluate against rolled operands. Never returns NaN or infinity.
    pub fn evaluate(&self, numerator: f64, denominator: f64, policy: ZeroDenominator) -> Option<f64> {
        if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
            return policy.sentinel();
        }
        let value = numerator * self.scale / denominator;
        if value.is_finite() {
            Some(value)
        } else {
            policy.sentinel()
        }
    }
}

/// Declares which metrics are rolled up and how.
///
/// Additive metrics are summed over a subtree; ratios are recomputed at every
/// level from the rolled numerator and denominator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricSpec {
    pub additive: Vec<String>,
    pub ratios: Vec<RatioMetric>,
    pub zero_denominator: ZeroDenominator,
}

impl MetricSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn additive(mut self, name: impl Into<String>) -> Self {
        self.additive.push(name.into());
        self
    }

    pub fn ratio(mut self, ratio: RatioMetric) -> Self {
        self.ratios.push(ratio);
        self
    }

    pub fn zero_denominator(mut self, policy: ZeroDenominator) -> Self {
        self.zero_denominator = policy;
        self
    }

    pub fn is_additive(&self, name: &str) -> bool {
        self.additive.iter().any(|m| m == name)
    }

    /// Validate metric declarations
    pub fn validate(&self) -> Result<(), SpecError> {
        let mut seen = HashSet::new();
        let names = self
            .additive
            .iter()
            .chain(self.ratios.iter().map(|r| &r.name));
        for name in names {
            if name.trim().is_empty() {
                return Err(SpecError::EmptyName);
            }
            if !seen.insert(name.as_str()) {
                return Err(SpecError::DuplicateMetric(name.clone()));
            }
        }

        for ratio in &self.ratios {
            for operand in [&ratio.numerator, &ratio.denominator] {
                if !self.is_additive(operand) {
                    return Err(SpecError::UnknownOperand {
                        ratio: ratio.name.clone(),
                        metric: operand.clone(),
                    });
                }
            }
            if !ratio.scale.is_finite() {
                return Err(SpecError::InvalidScale(ratio.name.clone()));
            }
        }

        Ok(())
    }
}
