//! Combines normalized features with a weight table; produces score, level and
//! per-feature contributions.

use crate::config::RiskConfig;
use crate::features::{
    FeatureMap, NormalizedFeatureVector, GLOBAL_RISK, INVENTORY_DAYS, NEG_TONE_FRAC_3D,
    NEWS_VOL_7D, PAST_DELAY_DAYS, STRIKE_FLAG_7D, WEATHER_ANOMALY_7D,
};
use serde::{Deserialize, Serialize};

/// Value assumed for a weighted feature missing from the normalized vector.
pub const NEUTRAL_VALUE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Lower bounds are inclusive.
    pub fn from_score(score: f64, config: &RiskConfig) -> Self {
        if score >= config.high_threshold {
            RiskLevel::High
        } else if score >= config.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

/// Ordered feature → weight table. Weights need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskWeightTable(FeatureMap);

impl RiskWeightTable {
    pub fn new(weights: FeatureMap) -> Self {
        Self(weights)
    }

    pub fn total(&self) -> f64 {
        self.0.sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for RiskWeightTable {
    fn default() -> Self {
        Self(
            [
                (INVENTORY_DAYS, 0.20),
                (PAST_DELAY_DAYS, 0.20),
                (NEWS_VOL_7D, 0.15),
                (NEG_TONE_FRAC_3D, 0.15),
                (STRIKE_FLAG_7D, 0.15),
                (WEATHER_ANOMALY_7D, 0.10),
                (GLOBAL_RISK, 0.05),
            ]
            .into_iter()
            .collect(),
        )
    }
}

/// Score, label and per-feature contribution for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    /// In weight-table order
    pub contributions: FeatureMap,
}

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// `score = Σ w·v` (not divided by the weight total);
    /// `contribution = w·v / Σw`.
    pub fn score(&self, normalized: &NormalizedFeatureVector, weights: &RiskWeightTable) -> RiskAssessment {
        let total = weights.total();
        let mut score = 0.0;
        let mut contributions = FeatureMap::new();
        for (k, w) in weights.iter() {
            let v = normalized.get(k).unwrap_or(NEUTRAL_VALUE);
            score += w * v;
            let c = if total != 0.0 { w * v / total } else { 0.0 };
            contributions.insert(k, c);
        }
        RiskAssessment {
            score,
            level: self.level(score),
            contributions,
        }
    }

    /// Score against the configured weight table.
    pub fn assess(&self, normalized: &NormalizedFeatureVector) -> RiskAssessment {
        self.score(normalized, &self.config.weights)
    }

    pub fn level(&self, score: f64) -> RiskLevel {
        RiskLevel::from_score(score, &self.config)
    }
}
