use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::genomics::GeneRegion;

/// Errors raised by the region evaluator itself.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// Configuration invalid (e.g., zero threads).
    #[error("invalid evaluator configuration: {0}")]
    InvalidConfiguration(String),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Configuration for region-parallel evaluation.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Worker threads used for per-region work.
    pub threads: usize,
}

impl EvaluatorConfig {
    /// Configuration with an explicit thread count.
    pub fn with_threads(threads: usize) -> Result<Self, FrameworkError> {
        if threads == 0 {
            return Err(FrameworkError::InvalidConfiguration(
                "thread count must be > 0".to_string(),
            ));
        }
        Ok(Self { threads })
    }
}

/// Per-region metadata supplied to processors.
#[derive(Debug, Clone)]
pub struct RegionContext<'a> {
    /// 0-based index of the region in input order.
    pub region_id: usize,
    /// Region being processed.
    pub region: &'a GeneRegion,
}

/// Work split into independent regions followed by one whole-set step.
pub trait RegionProcessor: Sync {
    /// Result of one region.
    type RegionSummary: Send;
    /// Final output built from every region summary.
    type Output;
    /// Error type; evaluator failures convert into it.
    type Error: Send + From<FrameworkError>;

    /// Process one region without touching any other region's state.
    fn process_region(&self, context: &RegionContext<'_>) -> Result<Self::RegionSummary, Self::Error>;

    /// Combine all summaries, given in region input order.
    fn finalize(&self, summaries: Vec<Self::RegionSummary>) -> Result<Self::Output, Self::Error>;
}

/// Runs a [`RegionProcessor`] over a worker pool with a barrier before finalize.
#[derive(Debug)]
pub struct RegionEvaluator<P: RegionProcessor> {
    processor: P,
    config: EvaluatorConfig,
}

impl<P: RegionProcessor> RegionEvaluator<P> {
    /// Create a new evaluator.
    pub fn new(processor: P, config: EvaluatorConfig) -> Self {
        Self { processor, config }
    }

    /// Access the processor.
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Process every region in parallel, then finalize once.
    ///
    /// If any region fails, the error of the first failing region in input order
    /// is returned and `finalize` never runs.
    pub fn evaluate(&self, regions: &[GeneRegion]) -> Result<P::Output, P::Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|err| FrameworkError::ThreadPool(err.to_string()))?;

        let results: Vec<Result<P::RegionSummary, P::Error>> = pool.install(|| {
            regions
                .par_iter()
                .enumerate()
                .map(|(region_id, region)| {
                    self.processor
                        .process_region(&RegionContext { region_id, region })
                })
                .collect()
        });

        debug!(regions = regions.len(), threads = self.config.threads, "region barrier reached");
        let summaries = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        self.processor.finalize(summaries)
    }
}
