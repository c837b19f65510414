//! Feature types: raw samples from producers, ordered feature maps, normalization.

mod bundle;
mod normalizer;

pub use bundle::{
    assemble_raw, CollectedFeatures, FeatureBundle, GlobalPressureFeatures, NewsFeatures,
    PoliticalFeatures, TradeEdge, TradeFeatures, WeatherFeatures,
};
pub use normalizer::{FeatureStatistics, StreamingNormalizer, VARIANCE_FLOOR};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const INVENTORY_DAYS: &str = "inventory_days";
pub const PAST_DELAY_DAYS: &str = "past_delay_days";
pub const NEWS_VOL_7D: &str = "news_vol_7d";
pub const NEG_TONE_FRAC_3D: &str = "neg_tone_frac_3d";
pub const STRIKE_FLAG_7D: &str = "strike_flag_7d";
pub const WEATHER_ANOMALY_7D: &str = "weather_anomaly_7d";
pub const GLOBAL_RISK: &str = "global_risk";

/// One scalar observation for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSample {
    pub key: String,
    pub value: f64,
}

/// Raw per-request feature values in assembly order. `None` marks a value the
/// producers could not supply; it is skipped by statistics updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeatures {
    entries: Vec<(String, Option<f64>)>,
}

impl RawFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: Option<f64>) {
        self.entries.push((key.into(), value));
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.push(key, Some(value));
        self
    }

    /// Present, finite values only.
    pub fn samples(&self) -> impl Iterator<Item = FeatureSample> + '_ {
        self.entries.iter().filter_map(|(k, v)| match v {
            Some(v) if v.is_finite() => Some(FeatureSample {
                key: k.clone(),
                value: *v,
            }),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Insertion-ordered feature → value map. Serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap {
    entries: Vec<(String, f64)>,
}

/// Feature → score in [0,1] for one request.
pub type NormalizedFeatureVector = FeatureMap;

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the value if the key exists, keeping its position.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut map = FeatureMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for FeatureMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct FeatureMapVisitor;

impl<'de> Visitor<'de> for FeatureMapVisitor {
    type Value = FeatureMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of feature name to number")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FeatureMap, A::Error> {
        let mut map = FeatureMap::new();
        while let Some((k, v)) = access.next_entry::<String, f64>()? {
            map.insert(k, v);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for FeatureMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FeatureMapVisitor)
    }
}
