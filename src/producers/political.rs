//! Sanctions and political risk for the lane, judged by the reasoning service.

use super::{parse_structured, LaneContext, Producer, Reasoner};
use crate::error::ProducerError;
use crate::features::{FeatureBundle, PoliticalFeatures};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct PoliticalReply {
    #[serde(default)]
    sanction_flag: f64,
    #[serde(default = "default_political_risk")]
    political_risk_score: f64,
    #[serde(default)]
    notes: Option<String>,
}

fn default_political_risk() -> f64 {
    0.3
}

pub struct PoliticalProducer {
    reasoner: Arc<dyn Reasoner>,
    enabled: bool,
}

impl PoliticalProducer {
    pub fn new(reasoner: Arc<dyn Reasoner>, enabled: bool) -> Self {
        Self { reasoner, enabled }
    }

    fn prompt(lane: &LaneContext) -> String {
        let r = &lane.request;
        format!(
            r#"You are a geopolitics analyst. Considering electronics shipments for:
component="{}", seller="{}", seller_loc="{}", import_loc="{}".
Assess current sanctions and political risk in the past 30 days relevant to this lane.
Return strict JSON: {{"sanction_flag": 0 or 1, "political_risk_score": float (0-1), "notes": "short"}}
Be conservative; if uncertain, sanction_flag=0 and risk_score near 0.3."#,
            r.component_type,
            r.seller_name.as_deref().unwrap_or("unknown"),
            r.seller_location,
            r.import_location,
        )
    }
}

#[async_trait]
impl Producer for PoliticalProducer {
    fn name(&self) -> &'static str {
        "political"
    }

    async fn produce(&self, lane: &LaneContext) -> Result<FeatureBundle, ProducerError> {
        if !self.enabled {
            return Ok(self.neutral());
        }
        let text = self.reasoner.generate(&Self::prompt(lane)).await?;
        let reply: PoliticalReply = parse_structured("reasoning", &text)?;
        Ok(FeatureBundle::Political(PoliticalFeatures {
            sanction_flag: (reply.sanction_flag.max(0.0) as u32).min(1),
            political_risk_score: reply.political_risk_score.clamp(0.0, 1.0),
            notes: reply.notes,
        }))
    }

    fn neutral(&self) -> FeatureBundle {
        FeatureBundle::Political(PoliticalFeatures::default())
    }
}
