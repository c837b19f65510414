//! Canned response served only when the demo fallback is switched on.
//! Values are fixed illustrations, not computed from any data.

use crate::features::FeatureMap;
use crate::risk::RiskLevel;
use crate::schema::{AnalyzeRequest, AnalyzeResponse, ComprehensiveReport, RiskFactorReport, TgnResult};
use chrono::Utc;
use uuid::Uuid;

const FEATURES: [(&str, f64); 7] = [
    ("inventory_days", 0.65),
    ("past_delay_days", 0.42),
    ("news_vol_7d", 0.78),
    ("neg_tone_frac_3d", 0.23),
    ("strike_flag_7d", 0.0),
    ("weather_anomaly_7d", 0.15),
    ("global_risk", 0.31),
];

const COMPONENTS: [(&str, f64); 7] = [
    ("inventory_days", 0.13),
    ("past_delay_days", 0.08),
    ("news_vol_7d", 0.12),
    ("neg_tone_frac_3d", 0.03),
    ("strike_flag_7d", 0.0),
    ("weather_anomaly_7d", 0.02),
    ("global_risk", 0.02),
];

/// name, level, percent, concise impact, distribution impact
const FACTORS: [(&str, RiskLevel, f64, &str, &str); 7] = [
    (
        "news_vol_7d",
        RiskLevel::High,
        26.7,
        "High volume of disruption mentions in recent news",
        "News: web search, snippet review, sentiment grading",
    ),
    (
        "inventory_days",
        RiskLevel::Medium,
        22.2,
        "Inventory coverage estimated from trade flows",
        "Trade: trade flow estimate",
    ),
    (
        "past_delay_days",
        RiskLevel::Medium,
        13.3,
        "Historical delay patterns on this lane",
        "Trade: historical delay patterns",
    ),
    (
        "neg_tone_frac_3d",
        RiskLevel::Low,
        8.9,
        "Negative sentiment in recent coverage",
        "News: recent sentiment monitoring",
    ),
    (
        "weather_anomaly_7d",
        RiskLevel::Low,
        5.6,
        "Weather anomalies near the seller location",
        "Weather: forecast anomaly detection",
    ),
    (
        "global_risk",
        RiskLevel::Low,
        5.6,
        "Global supply chain pressure",
        "Global pressure: supply chain pressure index",
    ),
    (
        "strike_flag_7d",
        RiskLevel::Low,
        0.0,
        "Labor unrest monitoring",
        "News: labor unrest detection",
    ),
];

const STRATEGIES: [(&str, &str); 5] = [
    (
        "News-Based Risk Mitigation",
        "Monitor disruption mentions and set up alerts for negative sentiment spikes.",
    ),
    (
        "Trade Flow Optimization",
        "Use trade insights to optimize inventory levels and identify alternative suppliers.",
    ),
    (
        "Weather Risk Management",
        "Monitor weather along the route and hold buffer inventory during anomalies.",
    ),
    (
        "Political Risk Assessment",
        "Track sanctions and geopolitical developments affecting the lane.",
    ),
    (
        "Global Pressure Response",
        "Anticipate global supply chain disruptions and adjust sourcing strategies.",
    ),
];

/// Fixed demonstration payload echoing `request`; fresh id and timestamp.
pub fn demo_response(request: AnalyzeRequest) -> AnalyzeResponse {
    let factors = |distribution: bool| -> Vec<RiskFactorReport> {
        FACTORS
            .iter()
            .map(|(name, level, percent, concise, dist)| RiskFactorReport {
                name: name.to_string(),
                level: *level,
                percent: *percent,
                impact: if distribution { dist } else { concise }.to_string(),
            })
            .collect()
    };

    AnalyzeResponse {
        request_id: Uuid::new_v4(),
        created_at: Utc::now(),
        inputs: request,
        features: FEATURES.into_iter().collect::<FeatureMap>(),
        tgn_result: TgnResult {
            risk_score: 0.45,
            risk_label: RiskLevel::Medium,
            risk_components: COMPONENTS.into_iter().collect::<FeatureMap>(),
        },
        concise: factors(false),
        comprehensive: ComprehensiveReport {
            risk_distribution: factors(true),
            mitigation_strategies: STRATEGIES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        },
    }
}
