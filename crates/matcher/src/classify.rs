use crate::config::ConfidenceConfig;
use crate::model::Confidence;

/// Score boundaries for each confidence band. Every band decision in the
/// engine goes through one instance of this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceBands {
    pub high: u8,
    pub medium: u8,
    pub low: u8,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self::from(&ConfidenceConfig::default())
    }
}

impl From<&ConfidenceConfig> for ConfidenceBands {
    fn from(c: &ConfidenceConfig) -> Self {
        Self {
            high: c.high,
            medium: c.medium,
            low: c.low,
        }
    }
}

impl ConfidenceBands {
    /// Band for `score`. `floor` is the acceptance threshold: scores below it
    /// are `NoMatch`, scores at or above it but under `low` are `VeryLow`.
    pub fn classify(&self, score: u8, floor: u8) -> Confidence {
        if score < floor {
            Confidence::NoMatch
        } else if score >= self.high {
            Confidence::High
        } else if score >= self.medium {
            Confidence::Medium
        } else if score >= self.low {
            Confidence::Low
        } else {
            Confidence::VeryLow
        }
    }
}
