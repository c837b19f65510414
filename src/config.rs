//! Engine configuration. JSON file first, then environment overrides.

use crate::risk::RiskWeightTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Credentials and endpoints for external data services
    pub services: ServicesConfig,
    /// HTTP and fan-out deadlines
    pub timeouts: TimeoutsConfig,
    /// Calibration state persistence
    pub scoring: ScoringConfig,
    /// Label thresholds and weight table
    pub risk: RiskConfig,
    /// Optional data sources
    pub sources: SourcesConfig,
    /// Producer result caches
    pub cache: CacheConfig,
    /// Failure handling for the fan-out
    pub orchestrator: OrchestratorConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub google_maps_api_key: String,
    pub serp_api_key: String,
    pub weather_api_key: String,
    pub gemini_api_key: String,
    pub weather_provider: WeatherProvider,
    /// Generative model variant used for structured answers
    pub gemini_model: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherProvider {
    #[default]
    OpenWeather,
    WeatherApi,
}

impl WeatherProvider {
    /// Unknown names select OpenWeather.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("weatherapi") {
            WeatherProvider::WeatherApi
        } else {
            WeatherProvider::OpenWeather
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Per-request HTTP timeout (seconds)
    pub http_timeout_secs: u64,
    /// Shared deadline for the whole producer fan-out (seconds)
    pub agent_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsBackendKind {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Per-feature statistics file
    pub state_path: PathBuf,
    pub backend: StatsBackendKind,
    /// Optional trained model; absent means the weighted blend is used
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Score at or above this is high risk (0.0–1.0)
    pub high_threshold: f64,
    /// Score at or above this is medium risk
    pub medium_threshold: f64,
    pub weights: RiskWeightTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub news: bool,
    pub weather: bool,
    pub political: bool,
    pub global_pressure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub news_capacity: usize,
    pub weather_capacity: usize,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerFailurePolicy {
    /// Replace the failed producer's bundle with its neutral default
    #[default]
    Substitute,
    /// Fail the whole analysis
    Abort,
}

impl ProducerFailurePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "substitute" => Some(Self::Substitute),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub producer_failure: ProducerFailurePolicy,
    /// Return the canned demonstration response instead of a failure
    pub demo_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            services: ServicesConfig {
                gemini_model: "gemini-2.0-flash".to_string(),
                ..ServicesConfig::default()
            },
            timeouts: TimeoutsConfig::default(),
            scoring: ScoringConfig::default(),
            risk: RiskConfig::default(),
            sources: SourcesConfig::default(),
            cache: CacheConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            agent_timeout_secs: 40,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("./data/scoring_state.json"),
            backend: StatsBackendKind::Json,
            model_path: None,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_threshold: 0.66,
            medium_threshold: 0.33,
            weights: RiskWeightTable::default(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            news: true,
            weather: true,
            political: true,
            global_pressure: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            news_capacity: 1024,
            weather_capacity: 2048,
            ttl_secs: 900,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

fn env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl EngineConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<EngineConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }

    /// Load, then apply process environment overrides.
    pub fn load_with_env(path: &std::path::Path) -> Self {
        let mut config = Self::load(path);
        config.apply_env(|k| std::env::var(k).ok());
        config
    }

    /// Override fields from env-style keys. Unparsable values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GOOGLE_MAPS_API_KEY") {
            self.services.google_maps_api_key = v;
        }
        if let Some(v) = lookup("SERP_API_KEY") {
            self.services.serp_api_key = v;
        }
        if let Some(v) = lookup("WEATHER_API_KEY") {
            self.services.weather_api_key = v;
        }
        if let Some(v) = lookup("GEMINI_API_KEY") {
            self.services.gemini_api_key = v;
        }
        if let Some(v) = lookup("WEATHER_PROVIDER") {
            self.services.weather_provider = WeatherProvider::parse(&v);
        }
        if let Some(v) = lookup("HTTP_TIMEOUT_SECONDS").and_then(|v| v.parse().ok()) {
            self.timeouts.http_timeout_secs = v;
        }
        if let Some(v) = lookup("AGENT_TIMEOUT_SECONDS").and_then(|v| v.parse().ok()) {
            self.timeouts.agent_timeout_secs = v;
        }
        if let Some(v) = lookup("SCORING_STATE_PATH") {
            self.scoring.state_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log.level = v.to_ascii_lowercase();
        }
        if let Some(v) = lookup("ENABLE_NEWS").as_deref().and_then(env_flag) {
            self.sources.news = v;
        }
        if let Some(v) = lookup("ENABLE_WEATHER").as_deref().and_then(env_flag) {
            self.sources.weather = v;
        }
        if let Some(v) = lookup("ENABLE_POLITICAL").as_deref().and_then(env_flag) {
            self.sources.political = v;
        }
        if let Some(v) = lookup("ENABLE_GLOBAL_PRESSURE").as_deref().and_then(env_flag) {
            self.sources.global_pressure = v;
        }
        if let Some(v) = lookup("DEMO_FALLBACK").as_deref().and_then(env_flag) {
            self.orchestrator.demo_fallback = v;
        }
        if let Some(v) = lookup("PRODUCER_FAILURE_POLICY")
            .as_deref()
            .and_then(ProducerFailurePolicy::parse)
        {
            self.orchestrator.producer_failure = v;
        }
    }
}
