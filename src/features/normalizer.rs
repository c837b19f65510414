//! Streaming normalization: Welford statistics per feature, z-score, logistic squash.
//!
//! Statistics are updated with a request's raw values *before* those values
//! are normalized, so every sample pulls the mean toward itself and slightly
//! damps its own score. `observe` keeps that order under one lock.

use super::{FeatureMap, NormalizedFeatureVector, RawFeatures};
use crate::error::StoreError;
use crate::storage::{StatsBackend, StatsTable};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Lower bound on sample variance before taking the square root.
pub const VARIANCE_FLOOR: f64 = 1e-12;

/// Score returned while a feature has fewer than two samples.
const NEUTRAL: f64 = 0.5;

/// Sufficient statistics for online mean/variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    pub count: f64,
    pub mean: f64,
    #[serde(rename = "sumSquaredDeviation", alias = "M2")]
    pub sum_squared_deviation: f64,
}

impl FeatureStatistics {
    pub fn push(&mut self, value: f64) {
        self.count += 1.0;
        let delta = value - self.mean;
        self.mean += delta / self.count;
        self.sum_squared_deviation += delta * (value - self.mean);
    }

    /// Sample variance; `None` below two samples.
    pub fn variance(&self) -> Option<f64> {
        if self.count < 2.0 {
            return None;
        }
        Some(self.sum_squared_deviation / (self.count - 1.0))
    }

    pub fn normalize(&self, value: f64) -> f64 {
        let Some(var) = self.variance() else {
            return NEUTRAL;
        };
        let std = var.max(VARIANCE_FLOOR).sqrt();
        let z = (value - self.mean) / std;
        1.0 / (1.0 + (-z).exp())
    }
}

pub struct StreamingNormalizer {
    state: Mutex<StatsTable>,
    backend: Box<dyn StatsBackend>,
}

impl StreamingNormalizer {
    /// Load existing statistics from `backend` (an absent store starts empty).
    pub fn open(backend: Box<dyn StatsBackend>) -> Result<Self, StoreError> {
        let state = backend.load()?;
        debug!(features = state.len(), "loaded feature statistics");
        Ok(Self {
            state: Mutex::new(state),
            backend,
        })
    }

    /// Fold every present value into its feature's statistics, then persist the
    /// whole table. On a persistence error the in-memory update is kept.
    pub fn update(&self, raw: &RawFeatures) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::apply(&mut state, raw);
        self.backend.save(&state)
    }

    pub fn normalize(&self, key: &str, value: f64) -> f64 {
        let state = self.state.lock();
        state
            .get(key)
            .map(|s| s.normalize(value))
            .unwrap_or(NEUTRAL)
    }

    /// Update with `raw`, then normalize the same values. The returned vector
    /// follows `raw`'s order. A persistence failure is reported alongside the
    /// vector rather than discarding it.
    pub fn observe(&self, raw: &RawFeatures) -> (NormalizedFeatureVector, Option<StoreError>) {
        let mut state = self.state.lock();
        Self::apply(&mut state, raw);
        let persisted = self.backend.save(&state).err();
        if let Some(e) = &persisted {
            warn!(error = %e, "feature statistics not persisted");
        }
        let normalized: FeatureMap = raw
            .samples()
            .map(|s| {
                let v = state
                    .get(&s.key)
                    .map(|st| st.normalize(s.value))
                    .unwrap_or(NEUTRAL);
                (s.key, v)
            })
            .collect();
        (normalized, persisted)
    }

    pub fn statistics(&self, key: &str) -> Option<FeatureStatistics> {
        self.state.lock().get(key).copied()
    }

    pub fn snapshot(&self) -> StatsTable {
        self.state.lock().clone()
    }

    fn apply(state: &mut StatsTable, raw: &RawFeatures) {
        for sample in raw.samples() {
            state.entry(sample.key).or_default().push(sample.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn normalizer() -> StreamingNormalizer {
        StreamingNormalizer::open(Box::new(MemoryBackend::default())).unwrap()
    }

    #[test]
    fn neutral_until_two_samples() {
        let n = normalizer();
        assert_eq!(n.normalize("inventory_days", 1e9), 0.5);
        n.update(&RawFeatures::new().with("inventory_days", 10.0)).unwrap();
        assert_eq!(n.normalize("inventory_days", -1e9), 0.5);
        assert_eq!(n.normalize("inventory_days", 10.0), 0.5);
    }

    #[test]
    fn inventory_days_reference_values() {
        let n = normalizer();
        for v in [10.0, 20.0, 30.0] {
            n.update(&RawFeatures::new().with("inventory_days", v)).unwrap();
        }
        let s = n.statistics("inventory_days").unwrap();
        assert!((s.mean - 20.0).abs() < 1e-12);
        assert!((s.variance().unwrap() - 100.0).abs() < 1e-9);
        let v = n.normalize("inventory_days", 40.0);
        let expected = 1.0 / (1.0 + (-2.0f64).exp());
        assert!((v - expected).abs() < 1e-12);
        assert!((v - 0.8808).abs() < 1e-4);
    }

    #[test]
    fn constant_feature_uses_variance_floor() {
        let n = normalizer();
        for _ in 0..3 {
            n.update(&RawFeatures::new().with("strike_flag_7d", 0.0)).unwrap();
        }
        assert_eq!(n.normalize("strike_flag_7d", 0.0), 0.5);
        assert!(n.normalize("strike_flag_7d", 1.0) > 0.999);
    }

    #[test]
    fn observe_updates_before_normalizing() {
        let n = normalizer();
        for v in [10.0, 20.0, 30.0] {
            n.update(&RawFeatures::new().with("inventory_days", v)).unwrap();
        }
        let (out, err) = n.observe(&RawFeatures::new().with("inventory_days", 40.0));
        assert!(err.is_none());
        // 40 is already part of the history: mean 25, variance 500/3.
        let z = 15.0 / (500.0f64 / 3.0).sqrt();
        let expected = 1.0 / (1.0 + (-z).exp());
        assert!((out.get("inventory_days").unwrap() - expected).abs() < 1e-12);
        assert!(out.get("inventory_days").unwrap() < 0.8808);
    }

    #[test]
    fn persisted_field_accepts_legacy_name() {
        let s: FeatureStatistics =
            serde_json::from_str(r#"{"count":2.0,"mean":1.0,"M2":0.5}"#).unwrap();
        assert_eq!(s.sum_squared_deviation, 0.5);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("sumSquaredDeviation"));
    }
}
