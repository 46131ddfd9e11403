//! End-to-end SNV pipeline.
//!
//! Per region: fetch long-read pileup, extract candidates (with homopolymer
//! context), cross-check against short reads, filter. After every region is
//! done: score significance over the pooled set and assemble the report.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, PipelineConfig};
use crate::framework::{
    EvaluatorConfig, FrameworkError, RegionContext, RegionEvaluator, RegionProcessor,
};
use crate::genomics::{
    assemble, CandidateExtractor, CandidateVariant, FilterPolicy, GeneRegion, PileupError,
    PileupProvider, ReferenceGenome, ShortReadCrossValidator, SignificanceScorer, VariantReport,
};

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input could not be read; no partial report is produced.
    #[error("input unavailable: {input}: {reason}")]
    InputUnavailable {
        /// Which input failed.
        input: String,
        /// Why.
        reason: String,
    },

    /// Invalid run configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Region evaluator failure.
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}

impl From<PileupError> for PipelineError {
    fn from(err: PileupError) -> Self {
        let input = match &err {
            PileupError::Io { path, .. } => path.display().to_string(),
            PileupError::Malformed { source_name, .. }
            | PileupError::Unavailable { source_name, .. } => source_name.clone(),
        };
        PipelineError::InputUnavailable {
            input,
            reason: err.to_string(),
        }
    }
}

/// Long-read SNV pipeline over a set of gene regions.
pub struct VariantPipeline {
    config: PipelineConfig,
    reference: Arc<ReferenceGenome>,
    long_reads: Box<dyn PileupProvider>,
    short_reads: Option<Box<dyn PileupProvider>>,
    extractor: CandidateExtractor,
    validator: ShortReadCrossValidator,
    filter: FilterPolicy,
    scorer: SignificanceScorer,
}

impl std::fmt::Debug for VariantPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantPipeline")
            .field("config", &self.config)
            .field("long_reads", &self.long_reads.name())
            .field("short_reads", &self.short_reads.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl VariantPipeline {
    /// Build a pipeline; the configuration is validated here.
    pub fn new(
        config: PipelineConfig,
        reference: Arc<ReferenceGenome>,
        long_reads: Box<dyn PileupProvider>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            extractor: CandidateExtractor::new(config.homopolymer_window),
            validator: ShortReadCrossValidator::new(config.short_read_min_cov),
            filter: FilterPolicy::new(config.min_cov, config.report_pct)
                .with_max_homopolymer_pct(config.max_homopolymer_pct),
            scorer: SignificanceScorer::new(config.error_rate),
            config,
            reference,
            long_reads,
            short_reads: None,
        })
    }

    /// Cross-validate against an independent short-read pileup.
    pub fn with_short_reads(mut self, short_reads: Box<dyn PileupProvider>) -> Self {
        self.short_reads = Some(short_reads);
        self
    }

    /// Run configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every region and return the ordered report.
    pub fn run(self, regions: &[GeneRegion]) -> Result<VariantReport, PipelineError> {
        info!(
            regions = regions.len(),
            threads = self.config.threads,
            short_reads = self.short_reads.is_some(),
            "starting SNV pipeline"
        );
        let evaluator_config = EvaluatorConfig::with_threads(self.config.threads)?;
        RegionEvaluator::new(self, evaluator_config).evaluate(regions)
    }

    /// Candidates of one region after cross-validation and filtering.
    pub fn region_candidates(&self, region: &GeneRegion) -> Result<Vec<CandidateVariant>, PipelineError> {
        let reference = self.reference.sequence(&region.chrom).ok_or_else(|| {
            PipelineError::InputUnavailable {
                input: format!("reference chromosome {}", region.chrom),
                reason: format!("needed by region {region}"),
            }
        })?;

        let records = self.long_reads.fetch(region)?;
        let mut candidates = self.extractor.extract(&records, &reference, region);

        let short_records = match &self.short_reads {
            Some(provider) => Some(provider.fetch(region)?),
            None => None,
        };
        self.validator
            .annotate(&mut candidates, short_records.as_deref());

        let extracted = candidates.len();
        let kept = self.filter.apply(candidates, &self.config.known_positions);
        debug!(
            region = %region,
            pileup_rows = records.len(),
            extracted,
            kept = kept.len(),
            "region processed"
        );
        Ok(kept)
    }
}

impl RegionProcessor for VariantPipeline {
    type RegionSummary = Vec<CandidateVariant>;
    type Output = VariantReport;
    type Error = PipelineError;

    fn process_region(&self, context: &RegionContext<'_>) -> Result<Self::RegionSummary, Self::Error> {
        self.region_candidates(context.region)
    }

    fn finalize(&self, summaries: Vec<Self::RegionSummary>) -> Result<Self::Output, Self::Error> {
        let pooled = dedup_positions(summaries);
        info!(candidates = pooled.len(), "scoring pooled candidates");
        let scored = self.scorer.score(pooled);
        Ok(assemble(scored))
    }
}

/// Flatten region summaries keeping one row per `(chromosome, position)`.
///
/// Overlapping regions see the same pileup columns; the first region in input
/// order owns the position.
fn dedup_positions(summaries: Vec<Vec<CandidateVariant>>) -> Vec<CandidateVariant> {
    let mut seen: HashSet<(Arc<str>, u32)> = HashSet::new();
    let mut pooled = Vec::new();
    let mut duplicates = 0usize;
    for candidate in summaries.into_iter().flatten() {
        if seen.insert((Arc::clone(&candidate.chrom), candidate.position)) {
            pooled.push(candidate);
        } else {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        debug!(duplicates, "dropped candidates repeated by overlapping regions");
    }
    pooled
}
