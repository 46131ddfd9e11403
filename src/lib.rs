//! # Long-read single-cell SNV discovery
//!
//! Finds candidate single-nucleotide variants in long-read alignments, scores
//! each with a hypergeometric test against a sequencing-error null, corrects for
//! multiple testing across the whole run, and filters likely artifacts.
//!
//! ## Pipeline
//!
//! 1. **Pileup**: per-region, per-position allele counts from a [`genomics::PileupProvider`]
//! 2. **Extraction**: candidate mismatches with insertion-corrected frequencies and
//!    homopolymer context
//! 3. **Cross-validation** (optional): short reads with good coverage but no
//!    alternate support reject a candidate
//! 4. **Filtering**: coverage and frequency rules, waived for known positions
//! 5. **Scoring**: per-candidate p-values, then one Benjamini–Hochberg pass over the
//!    pooled candidates of every region
//! 6. **Report**: rows sorted by adjusted p-value plus count tables
//!
//! Steps 1–4 run independently per gene region on a worker pool; step 5 waits for
//! all of them.
//!
//! ## Usage Example
//!
//! ```ignore
//! use lrsnv::{PipelineConfig, VariantPipeline};
//!
//! let pipeline = VariantPipeline::new(config, reference, Box::new(pileup))?;
//! let report = pipeline.run(&regions)?;
//! report.write_artifacts("out")?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod config; // Run parameters and input resolution
pub mod framework; // Region-parallel evaluation with a pooling barrier
pub mod genomics; // Pileups, candidates, statistics, report
pub mod pipeline; // End-to-end orchestration

pub use config::{ConfigError, PipelineConfig, ResolvedInputs, RunMetadata};
pub use genomics::{CandidateVariant, GeneRegion, KnownPosition, PileupRecord, VariantReport};
pub use pipeline::{PipelineError, VariantPipeline};
