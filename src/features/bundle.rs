//! Producer feature bundles and assembly of the raw feature vector.

use super::{
    RawFeatures, GLOBAL_RISK, INVENTORY_DAYS, NEG_TONE_FRAC_3D, NEWS_VOL_7D, PAST_DELAY_DAYS,
    STRIKE_FLAG_7D, WEATHER_ANOMALY_7D,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Assumed stock coverage when the trade producer returns nothing.
pub const DEFAULT_INVENTORY_DAYS: f64 = 30.0;
pub const DEFAULT_PAST_DELAY_DAYS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEdge {
    pub exporter: String,
    pub importer: String,
    pub trade_value_usd: f64,
    /// "YYYY-MM"
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeFeatures {
    pub inventory_days: Option<f64>,
    pub past_delay_days: Option<f64>,
    #[serde(default)]
    pub edges: Vec<TradeEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsFeatures {
    pub news_vol_7d: u32,
    pub neg_tone_frac_3d: f64,
    pub strike_flag_7d: u32,
    /// Source URLs
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherFeatures {
    pub weather_anomaly_7d: u32,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliticalFeatures {
    pub sanction_flag: u32,
    pub political_risk_score: f64,
    pub notes: Option<String>,
}

impl Default for PoliticalFeatures {
    fn default() -> Self {
        Self {
            sanction_flag: 0,
            political_risk_score: 0.3,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalPressureFeatures {
    pub global_risk: f64,
    /// "YYYY-MM"
    pub timestamp: Option<String>,
}

impl Default for GlobalPressureFeatures {
    fn default() -> Self {
        Self {
            global_risk: 0.2,
            timestamp: None,
        }
    }
}

/// Output of one producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureBundle {
    Trade(TradeFeatures),
    News(NewsFeatures),
    Weather(WeatherFeatures),
    Political(PoliticalFeatures),
    GlobalPressure(GlobalPressureFeatures),
}

/// Every producer's bundle for one request, after the join.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedFeatures {
    pub trade: TradeFeatures,
    pub news: NewsFeatures,
    pub weather: WeatherFeatures,
    pub political: PoliticalFeatures,
    pub global_pressure: GlobalPressureFeatures,
}

impl CollectedFeatures {
    pub fn absorb(&mut self, bundle: FeatureBundle) {
        match bundle {
            FeatureBundle::Trade(t) => self.trade = t,
            FeatureBundle::News(n) => self.news = n,
            FeatureBundle::Weather(w) => self.weather = w,
            FeatureBundle::Political(p) => self.political = p,
            FeatureBundle::GlobalPressure(g) => self.global_pressure = g,
        }
    }
}

/// Flatten the bundles into the weighted raw vector. Political signals are
/// collected but not weighted.
pub fn assemble_raw(c: &CollectedFeatures) -> RawFeatures {
    RawFeatures::new()
        .with(
            INVENTORY_DAYS,
            c.trade.inventory_days.unwrap_or(DEFAULT_INVENTORY_DAYS),
        )
        .with(
            PAST_DELAY_DAYS,
            c.trade.past_delay_days.unwrap_or(DEFAULT_PAST_DELAY_DAYS),
        )
        .with(NEWS_VOL_7D, f64::from(c.news.news_vol_7d))
        .with(NEG_TONE_FRAC_3D, c.news.neg_tone_frac_3d)
        .with(STRIKE_FLAG_7D, f64::from(c.news.strike_flag_7d))
        .with(WEATHER_ANOMALY_7D, f64::from(c.weather.weather_anomaly_7d))
        .with(GLOBAL_RISK, c.global_pressure.global_risk)
}
