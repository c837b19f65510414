//! Integration test: config load, statistics persistence, scoring, report formatting.

use chainrisk::{
    config::{EngineConfig, ProducerFailurePolicy, RiskConfig, WeatherProvider},
    features::{FeatureMap, RawFeatures, StreamingNormalizer},
    report::{mitigation_strategies, ReportFormatter},
    risk::{RiskEngine, RiskLevel, RiskWeightTable},
    storage::{JsonFileBackend, SqliteBackend, StatsBackend},
};
use std::collections::HashMap;
use std::path::Path;

#[test]
fn config_load_default() {
    let c = EngineConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.timeouts.agent_timeout_secs, 40);
    assert_eq!(c.timeouts.http_timeout_secs, 30);
    assert_eq!(c.cache.news_capacity, 1024);
    assert_eq!(c.cache.ttl_secs, 900);
    assert_eq!(c.risk.weights.len(), 7);
    assert!(!c.orchestrator.demo_fallback);
    assert_eq!(c.orchestrator.producer_failure, ProducerFailurePolicy::Substitute);
}

#[test]
fn config_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"timeouts": {"agent_timeout_secs": 5}, "log": {"json": false}}"#).unwrap();
    let c = EngineConfig::load(&path);
    assert_eq!(c.timeouts.agent_timeout_secs, 5);
    assert_eq!(c.timeouts.http_timeout_secs, 30);
    assert!(!c.log.json);
    assert_eq!(c.log.level, "info");
}

#[test]
fn config_env_overrides() {
    let env: HashMap<&str, &str> = [
        ("SERP_API_KEY", "serp-key"),
        ("WEATHER_PROVIDER", "WeatherAPI"),
        ("AGENT_TIMEOUT_SECONDS", "12"),
        ("HTTP_TIMEOUT_SECONDS", "not-a-number"),
        ("SCORING_STATE_PATH", "/tmp/stats.json"),
        ("ENABLE_NEWS", "false"),
        ("DEMO_FALLBACK", "1"),
        ("PRODUCER_FAILURE_POLICY", "abort"),
        ("LOG_LEVEL", "DEBUG"),
    ]
    .into_iter()
    .collect();
    let mut c = EngineConfig::default();
    c.apply_env(|k| env.get(k).map(|v| v.to_string()));

    assert_eq!(c.services.serp_api_key, "serp-key");
    assert_eq!(c.services.weather_provider, WeatherProvider::WeatherApi);
    assert_eq!(c.timeouts.agent_timeout_secs, 12);
    assert_eq!(c.timeouts.http_timeout_secs, 30);
    assert_eq!(c.scoring.state_path, Path::new("/tmp/stats.json"));
    assert!(!c.sources.news);
    assert!(c.sources.weather);
    assert!(c.orchestrator.demo_fallback);
    assert_eq!(c.orchestrator.producer_failure, ProducerFailurePolicy::Abort);
    assert_eq!(c.log.level, "debug");
}

#[test]
fn json_store_created_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("scoring_state.json");
    let backend = JsonFileBackend::new(&path);
    let table = backend.load().unwrap();
    assert!(table.is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn json_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scoring_state.json");
    {
        let n = StreamingNormalizer::open(Box::new(JsonFileBackend::new(&path))).unwrap();
        for v in [10.0, 20.0, 30.0] {
            n.update(&RawFeatures::new().with("inventory_days", v)).unwrap();
        }
    }
    let body = std::fs::read_to_string(&path).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw["inventory_days"]["count"], 3.0);
    assert_eq!(raw["inventory_days"]["mean"], 20.0);
    assert_eq!(raw["inventory_days"]["sumSquaredDeviation"], 200.0);
    assert!(!dir.path().join("scoring_state.json.tmp").exists());

    let n = StreamingNormalizer::open(Box::new(JsonFileBackend::new(&path))).unwrap();
    assert!((n.normalize("inventory_days", 40.0) - 0.8808).abs() < 1e-4);
}

#[test]
fn sqlite_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.db");
    {
        let n = StreamingNormalizer::open(Box::new(SqliteBackend::open(&path).unwrap())).unwrap();
        n.update(&RawFeatures::new().with("news_vol_7d", 4.0).with("global_risk", 0.2))
            .unwrap();
        n.update(&RawFeatures::new().with("news_vol_7d", 8.0)).unwrap();
    }
    let reopened = SqliteBackend::open(&path).unwrap().load().unwrap();
    assert_eq!(reopened.len(), 2);
    let news = reopened["news_vol_7d"];
    assert_eq!(news.count, 2.0);
    assert_eq!(news.mean, 6.0);
    assert_eq!(news.sum_squared_deviation, 8.0);
}

#[test]
fn missing_values_do_not_touch_statistics() {
    let n = StreamingNormalizer::open(Box::new(SqliteBackend::in_memory().unwrap())).unwrap();
    let mut raw = RawFeatures::new().with("global_risk", 0.4);
    raw.push("inventory_days", None);
    n.update(&raw).unwrap();
    assert!(n.statistics("inventory_days").is_none());
    assert_eq!(n.statistics("global_risk").unwrap().count, 1.0);
}

#[test]
fn neutral_vector_scores_one_half() {
    let engine = RiskEngine::new(RiskConfig::default());
    let weights = RiskWeightTable::default();
    let all_half: FeatureMap = weights.iter().map(|(k, _)| (k.to_string(), 0.5)).collect();

    let a = engine.score(&all_half, &weights);
    assert!((a.score - 0.5).abs() < 1e-12);
    assert_eq!(a.level, RiskLevel::Medium);
    for (k, w) in weights.iter() {
        assert!((a.contributions.get(k).unwrap() - w * 0.5).abs() < 1e-12);
    }
    assert!((a.contributions.sum() - a.score).abs() < 1e-12);

    // Missing features are treated as neutral.
    let empty = engine.score(&FeatureMap::new(), &weights);
    assert!((empty.score - 0.5).abs() < 1e-12);
}

#[test]
fn score_is_not_divided_by_weight_total() {
    let engine = RiskEngine::new(RiskConfig::default());
    let weights = RiskWeightTable::new([("a", 2.0), ("b", 2.0)].into_iter().collect());
    let v: FeatureMap = [("a", 0.25), ("b", 0.25)].into_iter().collect();
    let out = engine.score(&v, &weights);
    assert!((out.score - 1.0).abs() < 1e-12);
    assert_eq!(out.level, RiskLevel::High);
    assert!((out.contributions.get("a").unwrap() - 0.125).abs() < 1e-12);
}

#[test]
fn risk_label_boundaries() {
    let engine = RiskEngine::new(RiskConfig::default());
    assert_eq!(engine.level(0.66), RiskLevel::High);
    assert_eq!(engine.level(0.6599), RiskLevel::Medium);
    assert_eq!(engine.level(0.33), RiskLevel::Medium);
    assert_eq!(engine.level(0.3299), RiskLevel::Low);
    assert_eq!(engine.level(1.0), RiskLevel::High);
    assert_eq!(engine.level(0.0), RiskLevel::Low);
}

#[test]
fn explain_sorts_by_percent_with_stable_ties() {
    let formatter = ReportFormatter::new(RiskConfig::default());
    let contributions: FeatureMap = [
        ("global_risk", 0.025),
        ("inventory_days", 0.1),
        ("past_delay_days", 0.1),
        ("mystery_signal", 0.7),
        ("news_vol_7d", 0.123456),
    ]
    .into_iter()
    .collect();
    let out = formatter.explain(&contributions);
    let names: Vec<&str> = out.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["mystery_signal", "news_vol_7d", "inventory_days", "past_delay_days", "global_risk"]
    );
    assert_eq!(out[0].percent, 70.0);
    assert_eq!(out[0].level, RiskLevel::High);
    assert_eq!(out[0].impact, "Contributing risk factor");
    assert_eq!(out[1].percent, 12.35);
    assert_eq!(out[1].level, RiskLevel::Low);
    assert_eq!(out[2].impact, "Inventory coverage may be tightening");
    assert_eq!(out[4].percent, 2.5);
}

#[test]
fn factor_level_uses_contribution_not_aggregate() {
    let formatter = ReportFormatter::new(RiskConfig::default());
    let engine = RiskEngine::new(RiskConfig::default());
    let weights = RiskWeightTable::default();
    let high: FeatureMap = weights.iter().map(|(k, _)| (k.to_string(), 0.95)).collect();
    let assessment = engine.score(&high, &weights);
    assert_eq!(assessment.level, RiskLevel::High);
    let report = formatter.explain(&assessment.contributions);
    assert!(report.iter().all(|r| r.level == RiskLevel::Low));
}

#[test]
fn comprehensive_report_has_static_strategies() {
    let formatter = ReportFormatter::new(RiskConfig::default());
    let report = formatter.comprehensive(&FeatureMap::new());
    assert!(report.risk_distribution.is_empty());
    assert_eq!(report.mitigation_strategies, mitigation_strategies());
    assert!(report.mitigation_strategies.contains_key("Labor Strike Contingency"));
    assert_eq!(report.mitigation_strategies.len(), 3);
}
