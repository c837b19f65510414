//! Request and response payloads.

use crate::features::FeatureMap;
use crate::risk::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub component_type: String,
    pub seller_location: String,
    pub import_location: String,
    #[serde(default)]
    pub seller_name: Option<String>,
    #[serde(default)]
    pub additional_factors: BTreeMap<String, serde_json::Value>,
}

impl AnalyzeRequest {
    pub fn new(
        component_type: impl Into<String>,
        seller_location: impl Into<String>,
        import_location: impl Into<String>,
    ) -> Self {
        Self {
            component_type: component_type.into(),
            seller_location: seller_location.into(),
            import_location: import_location.into(),
            seller_name: None,
            additional_factors: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgnResult {
    pub risk_score: f64,
    pub risk_label: RiskLevel,
    pub risk_components: FeatureMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactorReport {
    pub name: String,
    pub level: RiskLevel,
    /// 0–100, two decimals
    pub percent: f64,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    pub risk_distribution: Vec<RiskFactorReport>,
    pub mitigation_strategies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub inputs: AnalyzeRequest,
    /// Normalized feature vector
    pub features: FeatureMap,
    pub tgn_result: TgnResult,
    pub concise: Vec<RiskFactorReport>,
    pub comprehensive: ComprehensiveReport,
}
