//! Multiple-comparisons correction over per-vertex p-values.
//!
//! Non-finite p-values are excluded from the test count and never pass.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StatsError;

/// Outcome of a p-value correction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResult {
    /// `true` for vertices that survive the correction.
    pub mask: Vec<bool>,
    /// p-values at or below this pass. 0 when nothing passes.
    pub critical_value: f64,
    /// Number of finite p-values tested.
    pub tested: usize,
    pub significant: usize,
}

impl CorrectionResult {
    fn from_critical(p_values: &[f32], critical_value: f64, tested: usize) -> Self {
        let mask: Vec<bool> = p_values
            .iter()
            .map(|&p| p.is_finite() && tested > 0 && f64::from(p) <= critical_value)
            .collect();
        let significant = mask.iter().filter(|&&m| m).count();
        Self {
            mask,
            critical_value,
            tested,
            significant,
        }
    }
}

fn check_level(name: &'static str, value: f64) -> Result<(), StatsError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(StatsError::InvalidParameter {
            name,
            value,
            reason: "must be in (0, 1]",
        })
    }
}

/// Bonferroni: pass `p ≤ alpha / N`, where `N` counts finite p-values.
pub fn bonferroni(p_values: &[f32], alpha: f64) -> Result<CorrectionResult, StatsError> {
    check_level("alpha", alpha)?;

    let tested = p_values.iter().filter(|p| p.is_finite()).count();
    let critical = if tested > 0 {
        alpha / tested as f64
    } else {
        0.0
    };
    let result = CorrectionResult::from_critical(p_values, critical, tested);

    debug!(
        alpha,
        tested,
        significant = result.significant,
        critical = result.critical_value,
        "Bonferroni correction"
    );
    Ok(result)
}

/// Benjamini–Hochberg false discovery rate.
///
/// Sort finite p ascending and find the largest rank `k` (1-based) with
/// `p(k) ≤ k/N · q`. Everything at or below `p(k)` passes.
pub fn fdr_bh(p_values: &[f32], q: f64) -> Result<CorrectionResult, StatsError> {
    check_level("q", q)?;

    let mut sorted: Vec<f64> = p_values
        .iter()
        .filter(|p| p.is_finite())
        .map(|&p| f64::from(p))
        .collect();
    sorted.sort_unstable_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let critical = sorted
        .iter()
        .enumerate()
        .rev()
        .find(|(i, &p)| p <= (*i as f64 + 1.0) / n * q)
        .map(|(_, &p)| p);

    let result = match critical {
        Some(c) => CorrectionResult::from_critical(p_values, c, sorted.len()),
        None => CorrectionResult {
            mask: vec![false; p_values.len()],
            critical_value: 0.0,
            tested: sorted.len(),
            significant: 0,
        },
    };

    debug!(
        q,
        tested = result.tested,
        significant = result.significant,
        critical = result.critical_value,
        "FDR correction"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bonferroni_divides_by_finite_count() {
        let p = [0.001, 0.02, f32::NAN, 0.5, 0.01];
        let r = bonferroni(&p, 0.05).unwrap();
        assert_eq!(r.tested, 4);
        assert!((r.critical_value - 0.0125).abs() < 1e-12);
        assert_eq!(r.mask, vec![true, false, false, false, true]);
        assert_eq!(r.significant, 2);
    }

    #[test]
    fn bonferroni_with_no_finite_p() {
        let r = bonferroni(&[f32::NAN, f32::INFINITY], 0.05).unwrap();
        assert_eq!(r.tested, 0);
        assert_eq!(r.mask, vec![false, false]);
    }

    #[test]
    fn fdr_textbook_example() {
        // Ranks 1..=5 with q = 0.05: thresholds 0.01, 0.02, 0.03, 0.04, 0.05.
        // p(4) = 0.045 fails; p(3) = 0.025 ≤ 0.03 is the largest passing rank.
        // p(2) = 0.021 > 0.02 still passes because BH is step-up.
        let p = [0.045, 0.001, 0.6, 0.021, 0.025];
        let r = fdr_bh(&p, 0.05).unwrap();
        assert!((r.critical_value - f64::from(0.025f32)).abs() < 1e-12);
        assert_eq!(r.mask, vec![false, true, false, true, true]);
        assert_eq!(r.significant, 3);
    }

    #[test]
    fn fdr_q_one_passes_all_finite() {
        let p = [0.9, 1.0, 0.3, f32::NAN, 0.999];
        let r = fdr_bh(&p, 1.0).unwrap();
        assert_eq!(r.mask, vec![true, true, true, false, true]);
        assert_eq!(r.tested, 4);
    }

    #[test]
    fn fdr_tiny_q_passes_nothing() {
        let p = [0.001, 0.0001, 0.05];
        let r = fdr_bh(&p, 1e-12).unwrap();
        assert_eq!(r.significant, 0);
        assert_eq!(r.critical_value, 0.0);
    }

    #[test]
    fn fdr_tiny_q_keeps_exact_zero() {
        let p = [0.0, 0.2, 0.0001];
        let r = fdr_bh(&p, 1e-12).unwrap();
        assert_eq!(r.mask, vec![true, false, false]);
    }

    #[test]
    fn levels_outside_unit_interval_rejected() {
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(
                fdr_bh(&[0.1], bad),
                Err(StatsError::InvalidParameter { name: "q", .. })
            ));
            assert!(matches!(
                bonferroni(&[0.1], bad),
                Err(StatsError::InvalidParameter { name: "alpha", .. })
            ));
        }
    }
}
