//! Trade signals (stock coverage, recent delays, lane edges) estimated by the
//! reasoning service.

use super::{parse_structured, LaneContext, Producer, Reasoner};
use crate::error::ProducerError;
use crate::features::{FeatureBundle, TradeEdge, TradeFeatures};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
struct TradeReply {
    inventory_days: Option<f64>,
    past_delay_days: Option<f64>,
    #[serde(default)]
    edges: Vec<Value>,
}

pub struct TradeProducer {
    reasoner: Arc<dyn Reasoner>,
}

impl TradeProducer {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    fn prompt(lane: &LaneContext) -> String {
        format!(
            r#"You are a supply-chain analyst. Estimate recent trade signals for "{component}" (HS 8541, 8542) between:
Seller Location: "{seller}"
Import Location: "{import}"
Return JSON with fields:
{{
  "inventory_days": float,  // 5-90 typical
  "past_delay_days": float, // 0-60 typical
  "edges": [
    {{"exporter": string, "importer": string, "trade_value_usd": float, "timestamp": "YYYY-MM"}}
  ]
}}
Be conservative; use month strings from the last 1-2 months. If unsure, give plausible conservative values."#,
            component = lane.request.component_type,
            seller = lane.request.seller_location,
            import = lane.request.import_location,
        )
    }
}

#[async_trait]
impl Producer for TradeProducer {
    fn name(&self) -> &'static str {
        "trade"
    }

    async fn produce(&self, lane: &LaneContext) -> Result<FeatureBundle, ProducerError> {
        let text = self.reasoner.generate(&Self::prompt(lane)).await?;
        let reply: TradeReply = parse_structured("reasoning", &text)?;
        // Malformed edges are dropped individually.
        let edges = reply
            .edges
            .into_iter()
            .filter_map(|e| serde_json::from_value::<TradeEdge>(e).ok())
            .collect();
        Ok(FeatureBundle::Trade(TradeFeatures {
            inventory_days: reply.inventory_days,
            past_delay_days: reply.past_delay_days,
            edges,
        }))
    }

    fn neutral(&self) -> FeatureBundle {
        FeatureBundle::Trade(TradeFeatures::default())
    }
}
