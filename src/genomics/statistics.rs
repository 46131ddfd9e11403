use rayon::prelude::*;
use statrs::distribution::{Discrete, Hypergeometric};

use crate::genomics::CandidateVariant;

/// Default background base-calling error rate for long reads.
pub const DEFAULT_ERROR_RATE: f64 = 0.05;

/// p-value assigned when the test is undefined.
pub const NOT_SIGNIFICANT: f64 = 1.0;

/// Upper-tail hypergeometric p-value of `alt_count` alternate reads at depth
/// `total_depth` against an error-only sample of the same depth.
///
/// The observed reads are pooled with a pseudo-sample carrying
/// `round(error_rate * total_depth)` alternate reads; the p-value is the chance of
/// drawing at least `alt_count` alternate reads when picking `total_depth` reads from
/// the pool. Terms are summed in log space so deep columns stay finite. Degenerate
/// inputs return [`NOT_SIGNIFICANT`].
pub fn hypergeom_p_value(alt_count: u32, total_depth: u32, error_rate: f64) -> f64 {
    if total_depth == 0 || alt_count == 0 || alt_count > total_depth {
        return NOT_SIGNIFICANT;
    }
    let depth = u64::from(total_depth);
    let alt = u64::from(alt_count);
    let null_alt = (error_rate.clamp(0.0, 1.0) * depth as f64).round() as u64;
    let successes = alt + null_alt;

    let Ok(distribution) = Hypergeometric::new(2 * depth, successes, depth) else {
        return NOT_SIGNIFICANT;
    };

    let upper = successes.min(depth);
    let ln_tail = log_sum_exp((alt..=upper).map(|x| distribution.ln_pmf(x)));

    let tail = ln_tail.exp();
    if tail.is_nan() {
        NOT_SIGNIFICANT
    } else {
        tail.clamp(0.0, 1.0)
    }
}

fn log_sum_exp(terms: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = terms.clone().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.map(|term| (term - max).exp()).sum::<f64>().ln()
}

/// Benjamini–Hochberg adjustment; output is aligned with `p_values`.
///
/// Adjusted values are non-decreasing along the ascending order of raw p-values and
/// capped at 1.0.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    if m == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let mut adjusted = vec![NOT_SIGNIFICANT; m];
    let mut running_min = NOT_SIGNIFICANT;
    for (rank, &idx) in order.iter().enumerate().rev() {
        let scaled = p_values[idx] * m as f64 / (rank + 1) as f64;
        running_min = running_min.min(scaled);
        adjusted[idx] = running_min.clamp(0.0, 1.0);
    }
    adjusted
}

/// Scores the pooled candidate set.
#[derive(Debug, Clone)]
pub struct SignificanceScorer {
    error_rate: f64,
}

impl SignificanceScorer {
    /// Scorer using `error_rate` as the background alternate-read rate.
    pub fn new(error_rate: f64) -> Self {
        Self { error_rate }
    }

    /// Fill `hypergeom_p_value` for every candidate (in parallel), then
    /// `adj_p_value` with one correction over the whole set.
    ///
    /// Must see every candidate of the run: adjusted values depend on the full
    /// population.
    pub fn score(&self, mut candidates: Vec<CandidateVariant>) -> Vec<CandidateVariant> {
        candidates.par_iter_mut().for_each(|candidate| {
            candidate.hypergeom_p_value =
                hypergeom_p_value(candidate.alt_count, candidate.total_depth, self.error_rate);
        });

        let raw: Vec<f64> = candidates.iter().map(|c| c.hypergeom_p_value).collect();
        for (candidate, adjusted) in candidates.iter_mut().zip(benjamini_hochberg(&raw)) {
            candidate.adj_p_value = adjusted;
        }
        candidates
    }
}

impl Default for SignificanceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_RATE)
    }
}
