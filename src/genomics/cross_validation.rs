use std::collections::HashMap;
use std::sync::Arc;

use crate::genomics::candidates::{group_by_position, PositionGroup, SHORT_READ_UNAVAILABLE};
use crate::genomics::{Allele, CandidateVariant, PileupRecord};

/// Default short-read depth needed before a position counts as evaluable.
pub const DEFAULT_SHORT_READ_MIN_COV: u32 = 10;

/// Checks long-read candidates against an independent short-read pileup.
#[derive(Debug, Clone)]
pub struct ShortReadCrossValidator {
    min_cov: u32,
}

impl ShortReadCrossValidator {
    /// Validator treating positions with at least `min_cov` short reads as evaluable.
    pub fn new(min_cov: u32) -> Self {
        Self { min_cov }
    }

    /// Fill `ref_frequency_in_short_reads` and `short_read_rejected` in place.
    ///
    /// Without a short-read source every candidate keeps the unavailable sentinel.
    /// A well-covered position without a single alternate-supporting short read is
    /// marked rejected; thinly covered positions are left undecided.
    pub fn annotate(&self, candidates: &mut [CandidateVariant], short_reads: Option<&[PileupRecord]>) {
        let Some(short_reads) = short_reads else {
            for candidate in candidates.iter_mut() {
                candidate.ref_frequency_in_short_reads = SHORT_READ_UNAVAILABLE;
                candidate.short_read_rejected = false;
            }
            return;
        };

        let groups: HashMap<(Arc<str>, u32), PositionGroup<'_>> = group_by_position(short_reads)
            .into_iter()
            .map(|group| ((Arc::clone(&group.chrom), group.position), group))
            .collect();

        for candidate in candidates.iter_mut() {
            let key = (Arc::clone(&candidate.chrom), candidate.position);
            let evidence = groups
                .get(&key)
                .map(|group| (group, group.total_depth()))
                .filter(|(_, depth)| *depth > 0 && *depth >= self.min_cov);

            match evidence {
                Some((group, depth)) => {
                    let ref_count = Allele::from_base(candidate.ref_allele)
                        .map(|allele| group.count_of(allele))
                        .unwrap_or(0);
                    candidate.ref_frequency_in_short_reads = f64::from(ref_count) / f64::from(depth);
                    candidate.short_read_rejected = group.count_of(candidate.alt_allele) == 0;
                }
                None => {
                    candidate.ref_frequency_in_short_reads = SHORT_READ_UNAVAILABLE;
                    candidate.short_read_rejected = false;
                }
            }
        }
    }
}
