//! Weighted risk aggregation and label assignment.

mod engine;

pub use engine::{RiskAssessment, RiskEngine, RiskLevel, RiskWeightTable, NEUTRAL_VALUE};
