//! Streaming statistics agree with direct computation.

use chainrisk::features::{RawFeatures, StreamingNormalizer};
use chainrisk::storage::MemoryBackend;
use proptest::prelude::*;

fn direct(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

proptest! {
    #[test]
    fn welford_matches_direct_formulas(values in prop::collection::vec(-1000.0f64..1000.0, 2..64)) {
        let n = StreamingNormalizer::open(Box::new(MemoryBackend::default())).unwrap();
        for v in &values {
            n.update(&RawFeatures::new().with("x", *v)).unwrap();
        }
        let s = n.statistics("x").unwrap();
        let (mean, var) = direct(&values);
        prop_assert_eq!(s.count, values.len() as f64);
        prop_assert!((s.mean - mean).abs() <= 1e-9 * (1.0 + mean.abs()), "mean {} vs {}", s.mean, mean);
        let got = s.variance().unwrap();
        prop_assert!((got - var).abs() <= 1e-7 * (1.0 + var.abs()), "variance {} vs {}", got, var);
    }

    #[test]
    fn normalized_values_stay_in_unit_interval(
        values in prop::collection::vec(-1000.0f64..1000.0, 0..32),
        probe in -1e6f64..1e6,
    ) {
        let n = StreamingNormalizer::open(Box::new(MemoryBackend::default())).unwrap();
        for v in &values {
            n.update(&RawFeatures::new().with("x", *v)).unwrap();
        }
        let out = n.normalize("x", probe);
        prop_assert!((0.0..=1.0).contains(&out));
        if values.len() < 2 {
            prop_assert_eq!(out, 0.5);
        }
    }
}
