//! Candidate extraction from per-position pileup tallies.
//!
//! Extraction runs in two explicit stages: pileup rows are grouped by
//! `(chromosome, position)` into an ordered map, then each group is turned into
//! at most one [`CandidateVariant`] by a pure function.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::genomics::homopolymer::homopolymer_score;
use crate::genomics::{Allele, GeneRegion, PileupRecord};

/// Value of `ref_frequency_in_short_reads` when no short-read evidence is usable.
pub const SHORT_READ_UNAVAILABLE: f64 = -1.0;

/// Candidate mismatch at one reference position.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateVariant {
    /// Chromosome/contig name.
    pub chrom: Arc<str>,
    /// 1-based position.
    pub position: u32,
    /// Reference base (uppercase ASCII).
    pub ref_allele: u8,
    /// Best-supported non-reference allele.
    pub alt_allele: Allele,
    /// Reads supporting `alt_allele`.
    pub alt_count: u32,
    /// Reads supporting the reference base.
    pub ref_count: u32,
    /// Reads covering the position, every allele included.
    pub total_depth: u32,
    /// Alternate allele frequency after insertion correction.
    pub alt_frequency: f64,
    /// Reference allele frequency.
    pub ref_frequency: f64,
    /// Combined insertion and deletion frequency.
    pub indel_frequency: f64,
    /// Gene of the region that produced the candidate.
    pub gene_id: Arc<str>,
    /// Homopolymer fraction of the reference context.
    pub homopolymer_pct: f64,
    /// Reference frequency in short reads, [`SHORT_READ_UNAVAILABLE`] if not evaluable.
    pub ref_frequency_in_short_reads: f64,
    /// Short reads cover the position well and never show the alternate allele.
    pub short_read_rejected: bool,
    /// Listed as a known position.
    pub known: bool,
    /// Hypergeometric p-value (1.0 until scored).
    pub hypergeom_p_value: f64,
    /// Benjamini–Hochberg adjusted p-value (1.0 until scored).
    pub adj_p_value: f64,
}

/// Pileup rows sharing one reference position.
#[derive(Debug, Clone)]
pub struct PositionGroup<'a> {
    /// Chromosome/contig name.
    pub chrom: Arc<str>,
    /// 1-based position.
    pub position: u32,
    /// Every row observed at the position, reference rows included.
    pub records: Vec<&'a PileupRecord>,
}

impl PositionGroup<'_> {
    /// Sum of counts for each allele, indexed like [`Allele::ALL`].
    pub fn allele_counts(&self) -> [u32; 6] {
        let mut counts = [0u32; 6];
        for record in &self.records {
            let slot = &mut counts[record.allele.index()];
            *slot = slot.saturating_add(record.count);
        }
        counts
    }

    /// Summed support for one allele.
    pub fn count_of(&self, allele: Allele) -> u32 {
        self.records
            .iter()
            .filter(|record| record.allele == allele)
            .fold(0u32, |acc, record| acc.saturating_add(record.count))
    }

    /// Total depth across all alleles.
    pub fn total_depth(&self) -> u32 {
        self.records
            .iter()
            .fold(0u32, |acc, record| acc.saturating_add(record.count))
    }

    /// Reference base reported by the pileup rows.
    pub fn reference_base(&self) -> Option<u8> {
        self.records.first().map(|record| record.reference)
    }
}

/// Group pileup rows by `(chromosome, position)`, ordered by key.
pub fn group_by_position(records: &[PileupRecord]) -> Vec<PositionGroup<'_>> {
    let mut groups: BTreeMap<(Arc<str>, u32), Vec<&PileupRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((Arc::clone(&record.chrom), record.position))
            .or_default()
            .push(record);
    }
    groups
        .into_iter()
        .map(|((chrom, position), records)| PositionGroup {
            chrom,
            position,
            records,
        })
        .collect()
}

/// Alternate allele frequency with the insertion double-count correction.
///
/// An insertion is tallied both as its placeholder entry and next to the anchoring
/// reference base, so its raw share is halved. Doubling is applied only while the
/// doubled count stays below the depth.
pub fn corrected_frequency(allele: Allele, alt_count: u32, total_depth: u32) -> f64 {
    if total_depth == 0 {
        return 0.0;
    }
    let depth = f64::from(total_depth);
    match allele {
        Allele::Insertion if u64::from(alt_count) * 2 < u64::from(total_depth) => {
            f64::from(alt_count) * 2.0 / depth
        }
        _ => (f64::from(alt_count) / depth).min(1.0),
    }
}

/// Turns pileup rows of one region into candidate variants.
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    homopolymer_window: usize,
}

impl CandidateExtractor {
    /// Extractor scoring homopolymer context over `homopolymer_window` bases per side.
    pub fn new(homopolymer_window: usize) -> Self {
        Self { homopolymer_window }
    }

    /// Extract candidates for `region`. `reference` is the full sequence of the
    /// region's chromosome. Rows outside the region are ignored; an empty result
    /// is a normal outcome.
    pub fn extract(
        &self,
        records: &[PileupRecord],
        reference: &[u8],
        region: &GeneRegion,
    ) -> Vec<CandidateVariant> {
        group_by_position(records)
            .iter()
            .filter(|group| region.contains(&group.chrom, group.position))
            .filter_map(|group| self.candidate_for_group(group, reference, region))
            .collect()
    }

    fn candidate_for_group(
        &self,
        group: &PositionGroup<'_>,
        reference: &[u8],
        region: &GeneRegion,
    ) -> Option<CandidateVariant> {
        let ref_base = group.reference_base()?;
        let counts = group.allele_counts();
        let total_depth = group.total_depth();
        if total_depth == 0 {
            return None;
        }

        let mut best: Option<(Allele, u32)> = None;
        for allele in Allele::ALL {
            if allele.matches_reference(ref_base) {
                continue;
            }
            let count = counts[allele.index()];
            if count > 0 && best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((allele, count));
            }
        }
        let (alt_allele, alt_count) = best?;

        let ref_count = Allele::from_base(ref_base)
            .map(|allele| counts[allele.index()])
            .unwrap_or(0);
        let depth = f64::from(total_depth);
        let indel_count =
            counts[Allele::Insertion.index()].saturating_add(counts[Allele::Deletion.index()]);

        Some(CandidateVariant {
            chrom: Arc::clone(&group.chrom),
            position: group.position,
            ref_allele: ref_base,
            alt_allele,
            alt_count,
            ref_count,
            total_depth,
            alt_frequency: corrected_frequency(alt_allele, alt_count, total_depth),
            ref_frequency: f64::from(ref_count) / depth,
            indel_frequency: (f64::from(indel_count) / depth).min(1.0),
            gene_id: Arc::clone(&region.gene_id),
            homopolymer_pct: homopolymer_score(
                reference,
                &group.chrom,
                group.position,
                false,
                self.homopolymer_window,
            ),
            ref_frequency_in_short_reads: SHORT_READ_UNAVAILABLE,
            short_read_rejected: false,
            known: false,
            hypergeom_p_value: 1.0,
            adj_p_value: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const REFERENCE: &[u8] = b"ACGTACGTACGTACGTACGT";

    fn region() -> GeneRegion {
        GeneRegion::new("GENE1", "chr1", 1, 20)
    }

    fn record(position: u32, allele: Allele, count: u32) -> PileupRecord {
        let reference = REFERENCE[(position - 1) as usize];
        PileupRecord::new("chr1", position, allele, count, reference)
    }

    #[test]
    fn total_depth_counts_reference_rows() {
        // Position 1 is A.
        let records = vec![record(1, Allele::A, 8), record(1, Allele::T, 2)];
        let candidates = CandidateExtractor::new(5).extract(&records, REFERENCE, &region());

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.total_depth, 10);
        assert_eq!(candidate.ref_count, 8);
        assert_eq!(candidate.alt_allele, Allele::T);
        assert!((candidate.alt_frequency - 0.2).abs() < 1e-12);
        assert!((candidate.ref_frequency - 0.8).abs() < 1e-12);
        assert_eq!(candidate.gene_id.as_ref(), "GENE1");
        assert_eq!(candidate.ref_frequency_in_short_reads, SHORT_READ_UNAVAILABLE);
    }

    #[test]
    fn insertion_doubling_applies_below_half_depth() {
        assert!((corrected_frequency(Allele::Insertion, 3, 10) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn insertion_doubling_skipped_at_or_above_half_depth() {
        assert!((corrected_frequency(Allele::Insertion, 6, 10) - 0.6).abs() < 1e-12);
        assert!((corrected_frequency(Allele::Insertion, 5, 10) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_insertion_alleles_are_not_doubled() {
        assert!((corrected_frequency(Allele::Deletion, 3, 10) - 0.3).abs() < 1e-12);
        assert!((corrected_frequency(Allele::G, 3, 10) - 0.3).abs() < 1e-12);
        assert_eq!(corrected_frequency(Allele::G, 0, 0), 0.0);
    }

    #[test]
    fn insertion_candidate_uses_corrected_frequency() {
        // Position 2 is C.
        let records = vec![record(2, Allele::C, 7), record(2, Allele::Insertion, 3)];
        let candidates = CandidateExtractor::new(5).extract(&records, REFERENCE, &region());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].alt_allele, Allele::Insertion);
        assert!((candidates[0].alt_frequency - 0.6).abs() < 1e-12);
        assert!((candidates[0].indel_frequency - 0.3).abs() < 1e-12);
    }

    #[test]
    fn reference_only_positions_yield_nothing() {
        let records = vec![record(3, Allele::G, 40), record(4, Allele::T, 12)];
        let candidates = CandidateExtractor::new(5).extract(&records, REFERENCE, &region());
        assert!(candidates.is_empty());
        assert!(CandidateExtractor::new(5)
            .extract(&[], REFERENCE, &region())
            .is_empty());
    }

    #[test]
    fn ties_prefer_base_alleles_in_order() {
        let records = vec![
            record(1, Allele::A, 10),
            record(1, Allele::Deletion, 2),
            record(1, Allele::G, 2),
            record(1, Allele::C, 2),
        ];
        let candidates = CandidateExtractor::new(5).extract(&records, REFERENCE, &region());
        assert_eq!(candidates[0].alt_allele, Allele::C);
        assert_eq!(candidates[0].total_depth, 16);
    }

    #[test]
    fn rows_outside_region_are_ignored() {
        let narrow = GeneRegion::new("GENE2", "chr1", 5, 8);
        let records = vec![
            record(1, Allele::T, 3),
            record(6, Allele::A, 3),
            PileupRecord::new("chr2", 6, Allele::A, 3, b'C'),
        ];
        let candidates = CandidateExtractor::new(5).extract(&records, REFERENCE, &narrow);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].position, 6);
        assert_eq!(candidates[0].chrom.as_ref(), "chr1");
    }

    #[test]
    fn groups_are_ordered_by_position() {
        let records = vec![
            record(9, Allele::A, 1),
            record(2, Allele::A, 1),
            record(9, Allele::C, 1),
        ];
        let groups = group_by_position(&records);
        let positions: Vec<u32> = groups.iter().map(|g| g.position).collect();
        assert_eq!(positions, vec![2, 9]);
        assert_eq!(groups[1].records.len(), 2);
    }

    #[test]
    fn saturated_counts_do_not_overflow() {
        let records = vec![
            record(1, Allele::A, u32::MAX),
            record(1, Allele::T, u32::MAX),
            record(1, Allele::T, 7),
        ];
        let groups = group_by_position(&records);
        assert_eq!(groups[0].total_depth(), u32::MAX);
        assert_eq!(groups[0].count_of(Allele::T), u32::MAX);
        assert_eq!(groups[0].allele_counts()[Allele::T.index()], u32::MAX);

        let candidates = CandidateExtractor::new(5).extract(&records, REFERENCE, &region());
        assert_eq!(candidates[0].total_depth, u32::MAX);
        assert!((0.0..=1.0).contains(&candidates[0].alt_frequency));
    }

    proptest! {
        #[test]
        fn depth_equals_sum_of_allele_counts(
            counts in proptest::collection::vec(0u32..500, 6),
        ) {
            let records: Vec<PileupRecord> = Allele::ALL
                .iter()
                .zip(&counts)
                .map(|(&allele, &count)| record(1, allele, count))
                .collect();
            let expected: u32 = counts.iter().sum();

            let candidates = CandidateExtractor::new(5).extract(&records, REFERENCE, &region());
            let has_alt = counts.iter().skip(1).any(|&c| c > 0);
            prop_assert_eq!(candidates.len(), usize::from(has_alt));
            if let Some(candidate) = candidates.first() {
                prop_assert_eq!(candidate.total_depth, expected);
                prop_assert!(candidate.alt_count <= candidate.total_depth);
                prop_assert!((0.0..=1.0).contains(&candidate.alt_frequency));
            }
        }
    }
}
