//! Request orchestration: geocode, fan out to producers under one deadline,
//! then normalize → score → format.
//!
//! The join is all-or-nothing. If the deadline passes before every producer
//! has answered, outstanding producer tasks are aborted and the request fails
//! with [`AnalyzeError::DeadlineExceeded`]; no partial bundle reaches the
//! normalizer.

mod demo;

pub use demo::demo_response;

use crate::config::{EngineConfig, ProducerFailurePolicy};
use crate::error::{AnalyzeError, ProducerError};
use crate::features::{assemble_raw, CollectedFeatures, FeatureBundle, StreamingNormalizer};
use crate::model::BlendModel;
use crate::producers::{self, Geocoder, HttpServices, LaneContext, ProducerSet};
use crate::report::ReportFormatter;
use crate::risk::RiskEngine;
use crate::schema::{AnalyzeRequest, AnalyzeResponse, TgnResult};
use crate::storage;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pipeline stages, logged as the request advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    FanOut,
    Joined,
    DeadlineExceeded,
    ProducerFailed,
    Normalize,
    Aggregate,
    Format,
    Done,
    Fallback,
}

/// Why a response was produced with substituted inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedReason {
    pub component: String,
    pub error: String,
}

/// Result of one analysis. `Demo` is only produced when the demo fallback is
/// enabled and carries the canned response, never pipeline output.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Success(Box<AnalyzeResponse>),
    Degraded {
        response: Box<AnalyzeResponse>,
        reasons: Vec<DegradedReason>,
    },
    Demo {
        response: Box<AnalyzeResponse>,
        cause: AnalyzeError,
    },
    Failed(AnalyzeError),
}

impl AnalysisOutcome {
    pub fn response(&self) -> Option<&AnalyzeResponse> {
        match self {
            AnalysisOutcome::Success(r) => Some(r),
            AnalysisOutcome::Degraded { response, .. } | AnalysisOutcome::Demo { response, .. } => {
                Some(response)
            }
            AnalysisOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&AnalyzeError> {
        match self {
            AnalysisOutcome::Demo { cause, .. } => Some(cause),
            AnalysisOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            AnalysisOutcome::Success(_) => "success",
            AnalysisOutcome::Degraded { .. } => "degraded",
            AnalysisOutcome::Demo { .. } => "demo",
            AnalysisOutcome::Failed(_) => "failed",
        }
    }

    /// `{"status": ..., "response"?: ..., "reasons"?: [...], "error"?: "..."}`
    pub fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        out.insert("status".into(), self.status().into());
        if let Some(r) = self.response() {
            out.insert(
                "response".into(),
                serde_json::to_value(r).unwrap_or(serde_json::Value::Null),
            );
        }
        if let AnalysisOutcome::Degraded { reasons, .. } = self {
            out.insert(
                "reasons".into(),
                serde_json::to_value(reasons).unwrap_or(serde_json::Value::Null),
            );
        }
        if let Some(e) = self.error() {
            out.insert("error".into(), e.to_string().into());
        }
        serde_json::Value::Object(out)
    }
}

pub struct Orchestrator {
    geocoder: Arc<dyn Geocoder>,
    producers: ProducerSet,
    normalizer: Arc<StreamingNormalizer>,
    model: BlendModel,
    formatter: ReportFormatter,
    deadline: Duration,
    policy: ProducerFailurePolicy,
    demo_fallback: bool,
}

impl Orchestrator {
    pub fn new(
        config: &EngineConfig,
        geocoder: Arc<dyn Geocoder>,
        producers: ProducerSet,
        normalizer: Arc<StreamingNormalizer>,
    ) -> Self {
        let engine = RiskEngine::new(config.risk.clone());
        Self {
            geocoder,
            producers,
            normalizer,
            model: BlendModel::load(config.scoring.model_path.as_deref(), engine),
            formatter: ReportFormatter::new(config.risk.clone()),
            deadline: Duration::from_secs(config.timeouts.agent_timeout_secs),
            policy: config.orchestrator.producer_failure,
            demo_fallback: config.orchestrator.demo_fallback,
        }
    }

    /// HTTP services, cached producers and the configured statistics backend.
    pub fn from_config(
        config: &EngineConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let services = Arc::new(HttpServices::new(
            config.services.clone(),
            Duration::from_secs(config.timeouts.http_timeout_secs),
        )?);
        let backend = storage::open_backend(&config.scoring)?;
        let normalizer = Arc::new(StreamingNormalizer::open(backend)?);
        let producers = producers::http_producers(config, services.clone());
        Ok(Self::new(config, services, producers, normalizer))
    }

    pub fn normalizer(&self) -> &Arc<StreamingNormalizer> {
        &self.normalizer
    }

    /// Run the pipeline and tag the result.
    pub async fn analyze(&self, request: AnalyzeRequest) -> AnalysisOutcome {
        match self.run(request.clone()).await {
            Ok((response, reasons)) if reasons.is_empty() => {
                AnalysisOutcome::Success(Box::new(response))
            }
            Ok((response, reasons)) => AnalysisOutcome::Degraded {
                response: Box::new(response),
                reasons,
            },
            Err(cause) if self.demo_fallback => {
                warn!(stage = ?Stage::Fallback, error = %cause, "serving demonstration response");
                AnalysisOutcome::Demo {
                    response: Box::new(demo_response(request)),
                    cause,
                }
            }
            Err(e) => AnalysisOutcome::Failed(e),
        }
    }

    /// The pipeline proper. Substituted producer results are listed in the
    /// returned reasons.
    pub async fn run(
        &self,
        request: AnalyzeRequest,
    ) -> Result<(AnalyzeResponse, Vec<DegradedReason>), AnalyzeError> {
        let request_id = Uuid::new_v4();
        let created_at = Utc::now();
        debug!(%request_id, stage = ?Stage::Idle, "analysis started");

        let (seller_coords, import_coords) = tokio::join!(
            self.locate(&request.seller_location),
            self.locate(&request.import_location),
        );
        let lane = Arc::new(LaneContext {
            request: request.clone(),
            seller_coords,
            import_coords,
        });

        let (collected, mut reasons) = self.fan_out(lane).await?;

        debug!(%request_id, stage = ?Stage::Normalize);
        let raw = assemble_raw(&collected);
        let (features, persisted) = self.normalizer.observe(&raw);
        if let Some(e) = persisted {
            reasons.push(DegradedReason {
                component: "statistics".to_string(),
                error: AnalyzeError::from(e).to_string(),
            });
        }

        debug!(%request_id, stage = ?Stage::Aggregate);
        let assessment = self.model.predict(&features);

        debug!(%request_id, stage = ?Stage::Format);
        let concise = self.formatter.explain(&assessment.contributions);
        let comprehensive = self.formatter.comprehensive(&assessment.contributions);

        info!(
            %request_id,
            stage = ?Stage::Done,
            score = assessment.score,
            level = assessment.level.as_str(),
            degraded = reasons.len(),
            "analysis complete"
        );
        Ok((
            AnalyzeResponse {
                request_id,
                created_at,
                inputs: request,
                features,
                tgn_result: TgnResult {
                    risk_score: assessment.score,
                    risk_label: assessment.level,
                    risk_components: assessment.contributions,
                },
                concise,
                comprehensive,
            },
            reasons,
        ))
    }

    async fn locate(&self, address: &str) -> Option<(f64, f64)> {
        match self.geocoder.geocode(address).await {
            Ok(found) => found,
            Err(e) => {
                warn!(address, error = %e, "geocoding failed");
                None
            }
        }
    }

    async fn fan_out(
        &self,
        lane: Arc<LaneContext>,
    ) -> Result<(CollectedFeatures, Vec<DegradedReason>), AnalyzeError> {
        debug!(stage = ?Stage::FanOut, producers = self.producers.len());
        let mut set = JoinSet::new();
        for (idx, producer) in self.producers.iter().enumerate() {
            let producer = producer.clone();
            let lane = lane.clone();
            set.spawn(async move { (idx, producer.produce(&lane).await) });
        }

        let mut results: Vec<Option<Result<FeatureBundle, ProducerError>>> =
            (0..self.producers.len()).map(|_| None).collect();
        let joined = tokio::time::timeout(self.deadline, async {
            while let Some(res) = set.join_next().await {
                match res {
                    Ok((idx, r)) => results[idx] = Some(r),
                    Err(e) => warn!(error = %e, "producer task did not complete"),
                }
            }
        })
        .await;

        if joined.is_err() {
            set.abort_all();
            let timeout_secs = self.deadline.as_secs();
            warn!(stage = ?Stage::DeadlineExceeded, timeout_secs, "producer fan-out timed out");
            return Err(AnalyzeError::DeadlineExceeded { timeout_secs });
        }
        debug!(stage = ?Stage::Joined);

        let mut collected = CollectedFeatures::default();
        let mut reasons = Vec::new();
        for (producer, result) in self.producers.iter().zip(results) {
            let result = result.unwrap_or(Err(ProducerError::Panicked(producer.name())));
            match result {
                Ok(bundle) => collected.absorb(bundle),
                Err(e) => match self.policy {
                    ProducerFailurePolicy::Abort => {
                        warn!(stage = ?Stage::ProducerFailed, producer = producer.name(), error = %e);
                        return Err(AnalyzeError::ProducerFailed {
                            producer: producer.name(),
                            source: e,
                        });
                    }
                    ProducerFailurePolicy::Substitute => {
                        warn!(producer = producer.name(), error = %e, "substituting neutral bundle");
                        collected.absorb(producer.neutral());
                        reasons.push(DegradedReason {
                            component: producer.name().to_string(),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }
        Ok((collected, reasons))
    }
}
