//! Global supply-chain pressure index (monthly), via the reasoning service.

use super::{parse_structured, LaneContext, Producer, Reasoner};
use crate::error::ProducerError;
use crate::features::{FeatureBundle, GlobalPressureFeatures};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

const PROMPT: &str = r#"Fetch the latest NY Fed Global Supply Chain Pressure Index (GSCPI) value (monthly).
Return strict JSON: {"global_risk": float, "timestamp": "YYYY-MM"}.
If you cannot fetch today, return the last known recent value (e.g., 0.0 to 1.0 range)."#;

#[derive(Debug, Deserialize)]
struct PressureReply {
    #[serde(default = "default_global_risk")]
    global_risk: f64,
    #[serde(default)]
    timestamp: Option<String>,
}

fn default_global_risk() -> f64 {
    0.2
}

fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}

pub struct GlobalPressureProducer {
    reasoner: Arc<dyn Reasoner>,
    enabled: bool,
}

impl GlobalPressureProducer {
    pub fn new(reasoner: Arc<dyn Reasoner>, enabled: bool) -> Self {
        Self { reasoner, enabled }
    }
}

#[async_trait]
impl Producer for GlobalPressureProducer {
    fn name(&self) -> &'static str {
        "global_pressure"
    }

    async fn produce(&self, _lane: &LaneContext) -> Result<FeatureBundle, ProducerError> {
        if !self.enabled {
            return Ok(self.neutral());
        }
        let text = self.reasoner.generate(PROMPT).await?;
        let reply: PressureReply = parse_structured("reasoning", &text)?;
        Ok(FeatureBundle::GlobalPressure(GlobalPressureFeatures {
            global_risk: reply.global_risk,
            timestamp: Some(reply.timestamp.unwrap_or_else(current_month)),
        }))
    }

    fn neutral(&self) -> FeatureBundle {
        FeatureBundle::GlobalPressure(GlobalPressureFeatures {
            timestamp: Some(current_month()),
            ..GlobalPressureFeatures::default()
        })
    }
}
