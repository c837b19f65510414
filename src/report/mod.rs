//! Turns contributions into ranked, human-readable risk factors.

use crate::config::RiskConfig;
use crate::features::{
    FeatureMap, GLOBAL_RISK, INVENTORY_DAYS, NEG_TONE_FRAC_3D, NEWS_VOL_7D, PAST_DELAY_DAYS,
    STRIKE_FLAG_7D, WEATHER_ANOMALY_7D,
};
use crate::risk::RiskLevel;
use crate::schema::{ComprehensiveReport, RiskFactorReport};
use std::collections::BTreeMap;

const DEFAULT_IMPACT: &str = "Contributing risk factor";

fn impact_for(feature: &str) -> &'static str {
    match feature {
        WEATHER_ANOMALY_7D => "Recent weather anomaly near route/plant",
        STRIKE_FLAG_7D => "Labor unrest may affect ports/logistics",
        NEG_TONE_FRAC_3D => "Negative news sentiment trending",
        NEWS_VOL_7D => "High volume of disruption mentions",
        PAST_DELAY_DAYS => "Historical delays suggest risk carryover",
        INVENTORY_DAYS => "Inventory coverage may be tightening",
        GLOBAL_RISK => "Global chain pressure elevated",
        _ => DEFAULT_IMPACT,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub struct ReportFormatter {
    config: RiskConfig,
}

impl ReportFormatter {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// One entry per contribution, highest percent first. The level comes from
    /// the contribution itself, not the aggregate score, so a factor is rarely
    /// above Low. Ties keep contribution order.
    pub fn explain(&self, contributions: &FeatureMap) -> Vec<RiskFactorReport> {
        let mut out: Vec<RiskFactorReport> = contributions
            .iter()
            .map(|(name, c)| RiskFactorReport {
                name: name.to_string(),
                level: RiskLevel::from_score(c, &self.config),
                percent: round2(c * 100.0),
                impact: impact_for(name).to_string(),
            })
            .collect();
        out.sort_by(|a, b| b.percent.total_cmp(&a.percent));
        out
    }

    pub fn comprehensive(&self, contributions: &FeatureMap) -> ComprehensiveReport {
        ComprehensiveReport {
            risk_distribution: self.explain(contributions),
            mitigation_strategies: mitigation_strategies(),
        }
    }
}

/// Fixed guidance per risk category; does not depend on the scores.
pub fn mitigation_strategies() -> BTreeMap<String, String> {
    [
        (
            "Weather Risk Mitigation",
            "Plan alternate routes and maintain buffer inventory during severe weather.",
        ),
        (
            "Labor Strike Contingency",
            "Pre-negotiate slots with alternative ports and carriers.",
        ),
        (
            "Sanctions Compliance",
            "Continuously monitor regulations; pre-qualify alternate suppliers.",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
