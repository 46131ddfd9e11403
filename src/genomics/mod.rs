//! Genomics building blocks for long-read SNV discovery.
//!
//! Leaves first: pileup sources and the reference feed the candidate extractor,
//! which scores homopolymer context; candidates are optionally cross-checked
//! against short reads, filtered, scored for significance and assembled into the
//! final report.

mod candidates;
mod cross_validation;
mod filter;
mod homopolymer;
mod io;
mod pileup;
mod reference;
mod regions;
mod report;
mod statistics;
mod types;

pub use candidates::{
    corrected_frequency, group_by_position, CandidateExtractor, CandidateVariant, PositionGroup,
    SHORT_READ_UNAVAILABLE,
};
pub use cross_validation::{ShortReadCrossValidator, DEFAULT_SHORT_READ_MIN_COV};
pub use filter::{Exclusion, FilterPolicy};
pub use homopolymer::{homopolymer_score, DEFAULT_HOMOPOLYMER_WINDOW, UNSCOREABLE};
pub use io::{BamPileup, DEFAULT_MIN_DEPTH};
pub use pileup::{InMemoryPileup, PileupError, PileupProvider};
pub use reference::{ReferenceError, ReferenceGenome};
pub use regions::{read_gene_regions, read_known_positions, RegionListError};
pub use report::{
    assemble, ReportArtifacts, VariantReport, ALLELE_STAT_FILE, ALT_COUNT_FILE,
    FREQ_SUMMARY_FILE, REF_COUNT_FILE,
};
pub use statistics::{
    benjamini_hochberg, hypergeom_p_value, SignificanceScorer, DEFAULT_ERROR_RATE,
    NOT_SIGNIFICANT,
};
pub use types::{Allele, GeneRegion, KnownPosition, KnownPositions, PileupRecord};
