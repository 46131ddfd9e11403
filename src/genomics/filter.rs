use tracing::trace;

use crate::genomics::homopolymer::UNSCOREABLE;
use crate::genomics::{CandidateVariant, KnownPositions};

/// Coverage and allele-frequency rules applied before significance scoring.
///
/// Every rule is waived for known positions, whose frequencies are kept as observed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPolicy {
    /// Minimum long-read depth.
    pub min_cov: u32,
    /// Closed alternate-frequency interval `[low, high]`.
    pub report_pct: (f64, f64),
    /// Optional homopolymer ceiling; `None` keeps every context.
    pub max_homopolymer_pct: Option<f64>,
}

/// Why a candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Depth below `min_cov`.
    LowCoverage,
    /// Frequency outside `report_pct`.
    FrequencyOutOfRange,
    /// Short reads cover the site and never show the alternate allele.
    ShortReadRejected,
    /// Homopolymer fraction above the configured ceiling.
    Homopolymer,
}

impl FilterPolicy {
    /// Policy with the given coverage floor and frequency interval.
    pub fn new(min_cov: u32, report_pct: (f64, f64)) -> Self {
        Self {
            min_cov,
            report_pct,
            max_homopolymer_pct: None,
        }
    }

    /// Exclude candidates whose homopolymer fraction exceeds `max`.
    pub fn with_max_homopolymer_pct(mut self, max: Option<f64>) -> Self {
        self.max_homopolymer_pct = max;
        self
    }

    /// First rule a non-known candidate fails, if any.
    pub fn exclusion(&self, candidate: &CandidateVariant) -> Option<Exclusion> {
        let (low, high) = self.report_pct;
        if candidate.total_depth < self.min_cov {
            return Some(Exclusion::LowCoverage);
        }
        if candidate.alt_frequency < low || candidate.alt_frequency > high {
            return Some(Exclusion::FrequencyOutOfRange);
        }
        if candidate.short_read_rejected {
            return Some(Exclusion::ShortReadRejected);
        }
        if let Some(max) = self.max_homopolymer_pct {
            if candidate.homopolymer_pct != UNSCOREABLE && candidate.homopolymer_pct > max {
                return Some(Exclusion::Homopolymer);
            }
        }
        None
    }

    /// Mark known positions and drop every other candidate failing a rule.
    pub fn apply(
        &self,
        candidates: Vec<CandidateVariant>,
        known: &KnownPositions,
    ) -> Vec<CandidateVariant> {
        candidates
            .into_iter()
            .filter_map(|mut candidate| {
                candidate.known = known.contains(&candidate.chrom, candidate.position);
                if candidate.known {
                    return Some(candidate);
                }
                match self.exclusion(&candidate) {
                    Some(reason) => {
                        trace!(
                            chrom = %candidate.chrom,
                            position = candidate.position,
                            ?reason,
                            "candidate excluded"
                        );
                        None
                    }
                    None => Some(candidate),
                }
            })
            .collect()
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::new(100, (0.10, 0.90))
    }
}
