//! News-derived disruption signals: search the web for lane-related
//! disruption stories, then have the reasoning service count and grade them.

use super::{parse_structured, LaneContext, Producer, Reasoner, SearchHit, WebSearch};
use crate::cache::TtlCache;
use crate::error::ProducerError;
use crate::features::{FeatureBundle, NewsFeatures};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const SEARCH_TEMPLATES: [&str; 5] = [
    "{component} {seller} {loc} strike OR protest OR stoppage",
    "{component} {seller} {loc} delay OR disruption OR outage",
    "{component} {seller} {loc} supply chain bottleneck",
    "{component} {loc} semiconductor fab shutdown OR maintenance",
    "{seller} {loc} port congestion OR customs backlog",
];

const RESULTS_PER_QUERY: usize = 6;
const MAX_SNIPPETS: usize = 10;
const MAX_SOURCES: usize = 10;

#[derive(Debug, Deserialize)]
struct NewsReply {
    #[serde(default)]
    news_vol_7d: f64,
    #[serde(default)]
    neg_tone_frac_3d: f64,
    #[serde(default)]
    strike_flag_7d: f64,
}

pub struct NewsProducer {
    search: Arc<dyn WebSearch>,
    reasoner: Arc<dyn Reasoner>,
    cache: Arc<TtlCache<String, NewsFeatures>>,
    enabled: bool,
}

/// Queries for both ends of the lane, template by template.
pub(crate) fn build_queries(lane: &LaneContext) -> Vec<String> {
    let r = &lane.request;
    let seller = r.seller_name.as_deref().unwrap_or("");
    let mut out = Vec::with_capacity(SEARCH_TEMPLATES.len() * 2);
    for t in SEARCH_TEMPLATES {
        for loc in [&r.seller_location, &r.import_location] {
            let q = t
                .replace("{component}", &r.component_type)
                .replace("{seller}", seller)
                .replace("{loc}", loc);
            out.push(q.split_whitespace().collect::<Vec<_>>().join(" "));
        }
    }
    out
}

fn cache_key(lane: &LaneContext) -> String {
    let r = &lane.request;
    format!(
        "{}|{}|{}|{}",
        r.component_type,
        r.seller_location,
        r.import_location,
        r.seller_name.as_deref().unwrap_or("")
    )
}

fn prompt(snippets: &[String]) -> String {
    format!(
        r#"You are analyzing news snippets about supply-chain disruptions. From the provided texts, compute:
- news_vol_7d: count of distinct relevant disruption mentions in last 7 days
- neg_tone_frac_3d: fraction [0..1] of negative-toned mentions in last 3 days
- strike_flag_7d: 1 if any strike/unrest detected in last 7 days else 0
Return JSON with fields exactly: {{"news_vol_7d": int, "neg_tone_frac_3d": float, "strike_flag_7d": int}}
Texts:
{:?}"#,
        snippets
    )
}

impl NewsProducer {
    pub fn new(
        search: Arc<dyn WebSearch>,
        reasoner: Arc<dyn Reasoner>,
        cache: Arc<TtlCache<String, NewsFeatures>>,
        enabled: bool,
    ) -> Self {
        Self {
            search,
            reasoner,
            cache,
            enabled,
        }
    }

    /// Failed queries are skipped; links are de-duplicated in first-seen order.
    async fn collect_hits(&self, lane: &LaneContext) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = Vec::new();
        for q in build_queries(lane) {
            match self.search.search(&q, RESULTS_PER_QUERY).await {
                Ok(found) => {
                    for h in found {
                        if !hits.iter().any(|seen| seen.link == h.link) {
                            hits.push(h);
                        }
                    }
                }
                Err(e) => debug!(query = %q, error = %e, "news query skipped"),
            }
        }
        hits
    }

    async fn fetch(&self, lane: &LaneContext) -> Result<NewsFeatures, ProducerError> {
        let hits = self.collect_hits(lane).await;
        let snippets: Vec<String> = hits
            .iter()
            .take(MAX_SNIPPETS)
            .map(|h| {
                format!(
                    "{} {}",
                    h.title.as_deref().unwrap_or(""),
                    h.snippet.as_deref().unwrap_or("")
                )
                .trim()
                .to_string()
            })
            .collect();
        let text = self.reasoner.generate(&prompt(&snippets)).await?;
        let reply: NewsReply = parse_structured("reasoning", &text)?;
        Ok(NewsFeatures {
            news_vol_7d: reply.news_vol_7d.max(0.0) as u32,
            neg_tone_frac_3d: reply.neg_tone_frac_3d.clamp(0.0, 1.0),
            strike_flag_7d: (reply.strike_flag_7d.max(0.0) as u32).min(1),
            sources: hits.into_iter().take(MAX_SOURCES).map(|h| h.link).collect(),
        })
    }
}

#[async_trait]
impl Producer for NewsProducer {
    fn name(&self) -> &'static str {
        "news"
    }

    async fn produce(&self, lane: &LaneContext) -> Result<FeatureBundle, ProducerError> {
        if !self.enabled {
            return Ok(self.neutral());
        }
        let feats = self
            .cache
            .get_or_fetch(cache_key(lane), || self.fetch(lane))
            .await?;
        Ok(FeatureBundle::News(feats))
    }

    fn neutral(&self) -> FeatureBundle {
        FeatureBundle::News(NewsFeatures::default())
    }
}
