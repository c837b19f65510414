//! Supply-chain lane risk engine.
//!
//! Modular structure:
//! - [`producers`]: Trade, news, weather, political, global-pressure data producers
//! - [`cache`]: Bounded TTL cache with single-flight fetches
//! - [`features`]: Feature bundles and streaming normalization
//! - [`storage`]: Calibration statistics persistence (JSON file, SQLite)
//! - [`risk`]: Weighted risk aggregation
//! - [`model`]: Prediction model stub over the aggregator
//! - [`report`]: Human-readable risk factors and mitigation text
//! - [`orchestrator`]: Deadline-bound fan-out and the scoring pipeline
//! - [`logging`]: Structured JSON logging

pub mod cache;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod producers;
pub mod report;
pub mod risk;
pub mod schema;
pub mod storage;

pub use cache::TtlCache;
pub use config::EngineConfig;
pub use error::{AnalyzeError, ProducerError, StoreError};
pub use features::{FeatureMap, RawFeatures, StreamingNormalizer};
pub use logging::StructuredLogger;
pub use orchestrator::{AnalysisOutcome, Orchestrator};
pub use report::ReportFormatter;
pub use risk::{RiskAssessment, RiskEngine, RiskLevel, RiskWeightTable};
pub use schema::{AnalyzeRequest, AnalyzeResponse};
