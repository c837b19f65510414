//! Data producers: trade, news, weather, political, global pressure.
//! Each turns one lane into one [`FeatureBundle`] using external services
//! reached through the traits below.

mod clients;
mod global_pressure;
mod news;
mod political;
mod trade;
mod weather;

pub use clients::{HttpServices, SearchHit};
pub use global_pressure::GlobalPressureProducer;
pub use news::NewsProducer;
pub use political::PoliticalProducer;
pub use trade::TradeProducer;
pub use weather::{detect_anomaly, WeatherProducer};

use crate::cache::TtlCache;
use crate::config::EngineConfig;
use crate::error::ProducerError;
use crate::features::{FeatureBundle, NewsFeatures, WeatherFeatures};
use crate::schema::AnalyzeRequest;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Latitude, longitude
pub type Coordinates = (f64, f64);

/// Everything a producer may use for one request.
#[derive(Debug, Clone)]
pub struct LaneContext {
    pub request: AnalyzeRequest,
    pub seller_coords: Option<Coordinates>,
    pub import_coords: Option<Coordinates>,
}

#[async_trait]
pub trait Producer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn produce(&self, lane: &LaneContext) -> Result<FeatureBundle, ProducerError>;

    /// Bundle used in place of a failed result.
    fn neutral(&self) -> FeatureBundle;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, ProducerError>;
}

#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Free-text prompt in, reply text out (expected to carry JSON).
    async fn generate(&self, prompt: &str) -> Result<String, ProducerError>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, num: usize) -> Result<Vec<SearchHit>, ProducerError>;
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Raw provider payload; shape depends on the provider.
    async fn forecast(&self, coords: Coordinates) -> Result<serde_json::Value, ProducerError>;
    fn provider(&self) -> &'static str;
}

/// Remove markdown code fences (```json / ```) around a model reply.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse a reasoning reply as `T` after stripping fences. Empty text parses as `{}`.
pub fn parse_structured<T: DeserializeOwned>(
    service: &'static str,
    text: &str,
) -> Result<T, ProducerError> {
    let cleaned = strip_code_fences(text);
    let body = if cleaned.is_empty() { "{}" } else { cleaned.as_str() };
    serde_json::from_str(body).map_err(|e| ProducerError::malformed(service, e))
}

/// The five producers of one fan-out, in launch order.
pub type ProducerSet = Vec<Arc<dyn Producer>>;

/// Wire the HTTP-backed producers from config, with their caches.
pub fn http_producers(config: &EngineConfig, services: Arc<HttpServices>) -> ProducerSet {
    let ttl = Duration::from_secs(config.cache.ttl_secs);
    let news_cache: Arc<TtlCache<String, NewsFeatures>> =
        Arc::new(TtlCache::new(config.cache.news_capacity, ttl));
    let weather_cache: Arc<TtlCache<String, WeatherFeatures>> =
        Arc::new(TtlCache::new(config.cache.weather_capacity, ttl));

    let trade: Arc<dyn Producer> = Arc::new(TradeProducer::new(services.clone()));
    let news: Arc<dyn Producer> = Arc::new(NewsProducer::new(
        services.clone(),
        services.clone(),
        news_cache,
        config.sources.news,
    ));
    let weather: Arc<dyn Producer> = Arc::new(WeatherProducer::new(
        services.clone(),
        weather_cache,
        config.sources.weather,
    ));
    let political: Arc<dyn Producer> =
        Arc::new(PoliticalProducer::new(services.clone(), config.sources.political));
    let global_pressure: Arc<dyn Producer> =
        Arc::new(GlobalPressureProducer::new(services, config.sources.global_pressure));
    vec![trade, news, weather, political, global_pressure]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn fences_are_stripped_before_parsing() {
        let reply = "```json\n{\"global_risk\": 0.4}\n```";
        let v: Value = parse_structured("reasoning", reply).unwrap();
        assert_eq!(v["global_risk"], 0.4);
    }

    #[test]
    fn empty_reply_is_empty_object() {
        let v: Value = parse_structured("reasoning", "  ").unwrap();
        assert_eq!(v, serde_json::json!({}));
    }

    #[test]
    fn prose_reply_is_malformed() {
        let err = parse_structured::<Value>("reasoning", "I cannot help with that").unwrap_err();
        assert!(matches!(err, ProducerError::MalformedStructuredResponse { .. }));
    }
}
