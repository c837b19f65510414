//! Prediction model stub. Without a trained model the score is the weighted
//! blend from [`RiskEngine`], clamped to [0, 1].

use crate::features::NormalizedFeatureVector;
use crate::risk::{RiskAssessment, RiskEngine};
use std::path::Path;

pub struct BlendModel {
    engine: RiskEngine,
}

impl BlendModel {
    /// A missing or absent model path only logs; prediction always uses the blend.
    pub fn load(path: Option<&Path>, engine: RiskEngine) -> Self {
        match path {
            Some(p) if p.exists() => {
                tracing::info!(path = %p.display(), "model file present; using weighted blend until a forward pass is wired");
            }
            Some(p) => {
                tracing::warn!(path = %p.display(), "model file not found; using weighted blend");
            }
            None => {}
        }
        Self { engine }
    }

    pub fn predict(&self, normalized: &NormalizedFeatureVector) -> RiskAssessment {
        let mut out = self.engine.assess(normalized);
        out.score = out.score.clamp(0.0, 1.0);
        out.level = self.engine.level(out.score);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskConfig;
    use crate::features::FeatureMap;
    use crate::risk::{RiskLevel, RiskWeightTable};

    #[test]
    fn overweight_blend_is_clamped_and_relabelled() {
        let mut config = RiskConfig::default();
        config.weights = RiskWeightTable::new([("a", 2.0), ("b", 2.0)].into_iter().collect());
        let model = BlendModel::load(None, RiskEngine::new(config));
        let v: FeatureMap = [("a", 0.4), ("b", 0.4)].into_iter().collect();

        let out = model.predict(&v);
        assert_eq!(out.score, 1.0);
        assert_eq!(out.level, RiskLevel::High);
        assert!((out.contributions.get("a").unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn missing_model_file_still_predicts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let model = BlendModel::load(Some(path.as_path()), RiskEngine::new(RiskConfig::default()));
        let out = model.predict(&FeatureMap::new());
        assert!((out.score - 0.5).abs() < 1e-12);
        assert_eq!(out.level, RiskLevel::Medium);
    }
}
