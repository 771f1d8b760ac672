use serde::{Deserialize, Serialize};

/// How opening an evaluation treats responsibility weights that do not total 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Accept any total; aggregation normalizes by the scored weights.
    #[default]
    Lenient,
    /// Reject sheets whose weights do not sum to exactly 100.
    Strict,
}

impl WeightPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lenient" => Some(Self::Lenient),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Evaluation workflow settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub weight_policy: WeightPolicy,
}
