//! Region-parallel evaluation framework.
//!
//! Work is split into independent gene regions processed on a worker pool; all
//! region summaries are pooled in input order before a single whole-set
//! finalisation step.

mod region_eval;

pub use region_eval::{
    EvaluatorConfig, FrameworkError, RegionContext, RegionEvaluator, RegionProcessor,
};
