//! Weather anomaly near the seller location.
//!
//! Two provider payload shapes are accepted: OpenWeather One Call
//! (`daily[].temp.day`) and WeatherAPI (`forecast.forecastday[].day.avgtemp_c`).

use super::{Coordinates, LaneContext, Producer, WeatherSource};
use crate::cache::TtlCache;
use crate::error::ProducerError;
use crate::features::{FeatureBundle, WeatherFeatures};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fewer daily temperatures than this never count as an anomaly.
const MIN_DAYS: usize = 5;
/// Deviation from the weekly mean, in population standard deviations.
const DEVIATION_LIMIT: f64 = 1.5;

fn openweather_temps(payload: &Value) -> Vec<f64> {
    payload
        .get("daily")
        .and_then(Value::as_array)
        .map(|days| {
            days.iter()
                .filter_map(|d| d.pointer("/temp/day").and_then(Value::as_f64))
                .collect()
        })
        .unwrap_or_default()
}

fn weatherapi_temps(payload: &Value) -> Vec<f64> {
    payload
        .pointer("/forecast/forecastday")
        .and_then(Value::as_array)
        .map(|days| {
            days.iter()
                .filter_map(|d| d.pointer("/day/avgtemp_c").and_then(Value::as_f64))
                .collect()
        })
        .unwrap_or_default()
}

fn any_outlier(temps: &[f64]) -> bool {
    if temps.len() < MIN_DAYS {
        return false;
    }
    let n = temps.len() as f64;
    let avg = temps.iter().sum::<f64>() / n;
    let std = (temps.iter().map(|t| (t - avg).powi(2)).sum::<f64>() / n).sqrt();
    temps.iter().any(|t| (t - avg).abs() > DEVIATION_LIMIT * std)
}

/// 1 if any day deviates from the forecast mean by more than 1.5 std, else 0.
/// The shape is chosen by the presence of a top-level `daily` key.
pub fn detect_anomaly(payload: &Value) -> u32 {
    let temps = if payload.get("daily").is_some() {
        openweather_temps(payload)
    } else {
        weatherapi_temps(payload)
    };
    u32::from(any_outlier(&temps))
}

pub struct WeatherProducer {
    source: Arc<dyn WeatherSource>,
    cache: Arc<TtlCache<String, WeatherFeatures>>,
    enabled: bool,
}

impl WeatherProducer {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        cache: Arc<TtlCache<String, WeatherFeatures>>,
        enabled: bool,
    ) -> Self {
        Self {
            source,
            cache,
            enabled,
        }
    }

    async fn fetch(&self, coords: Coordinates) -> Result<WeatherFeatures, ProducerError> {
        let payload = self.source.forecast(coords).await?;
        let shape: Vec<Value> = payload
            .as_object()
            .map(|o| o.keys().cloned().map(Value::String).collect())
            .unwrap_or_default();
        let mut details = BTreeMap::new();
        details.insert("provider".to_string(), Value::from(self.source.provider()));
        details.insert("provider_payload_shape".to_string(), Value::Array(shape));
        Ok(WeatherFeatures {
            weather_anomaly_7d: detect_anomaly(&payload),
            details,
        })
    }
}

#[async_trait]
impl Producer for WeatherProducer {
    fn name(&self) -> &'static str {
        "weather"
    }

    /// Seller coordinates, or (0, 0) when geocoding failed.
    async fn produce(&self, lane: &LaneContext) -> Result<FeatureBundle, ProducerError> {
        if !self.enabled {
            return Ok(self.neutral());
        }
        let coords = lane.seller_coords.unwrap_or((0.0, 0.0));
        let key = format!("{}|{:.4}|{:.4}", self.source.provider(), coords.0, coords.1);
        let feats = self
            .cache
            .get_or_fetch(key, || self.fetch(coords))
            .await?;
        Ok(FeatureBundle::Weather(feats))
    }

    fn neutral(&self) -> FeatureBundle {
        FeatureBundle::Weather(WeatherFeatures::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openweather_spike_is_anomaly() {
        let daily: Vec<Value> = [20.0, 21.0, 20.5, 19.5, 20.0, 35.0, 20.0]
            .iter()
            .map(|t| json!({ "temp": { "day": t } }))
            .collect();
        assert_eq!(detect_anomaly(&json!({ "daily": daily })), 1);
    }

    #[test]
    fn weatherapi_flat_week_is_not_anomaly() {
        let days: Vec<Value> = [20.0, 20.0, 20.0, 20.0, 20.0]
            .iter()
            .map(|t| json!({ "day": { "avgtemp_c": t } }))
            .collect();
        assert_eq!(detect_anomaly(&json!({ "forecast": { "forecastday": days } })), 0);
    }

    #[test]
    fn weatherapi_spike_is_anomaly() {
        let days: Vec<Value> = [10.0, 11.0, 10.0, 30.0, 10.0, 11.0]
            .iter()
            .map(|t| json!({ "day": { "avgtemp_c": t } }))
            .collect();
        assert_eq!(detect_anomaly(&json!({ "forecast": { "forecastday": days } })), 1);
    }

    #[test]
    fn short_forecast_is_not_anomaly() {
        let daily: Vec<Value> = [0.0, 40.0, 0.0, 40.0]
            .iter()
            .map(|t| json!({ "temp": { "day": t } }))
            .collect();
        assert_eq!(detect_anomaly(&json!({ "daily": daily })), 0);
        assert_eq!(detect_anomaly(&json!({})), 0);
    }
}
