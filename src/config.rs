//! Run configuration.
//!
//! [`PipelineConfig`] holds the tuning parameters of one run. [`RunMetadata`] is the
//! JSON record a previous pipeline stage leaves behind; explicit
//! [`InputOverrides`] are layered on top of it to produce [`ResolvedInputs`].
//! For every path the order is: override, then stored metadata, then either an
//! error (required inputs) or nothing (optional inputs).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::genomics::{
    KnownPositions, DEFAULT_ERROR_RATE, DEFAULT_HOMOPOLYMER_WINDOW, DEFAULT_SHORT_READ_MIN_COV,
};

/// File name used when persisting run metadata into the output directory.
pub const RUN_METADATA_FILE: &str = "lrsnv_run.json";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Parameter outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A required input was neither given nor recorded in metadata.
    #[error("missing required input '{0}' (pass it explicitly or via run metadata)")]
    MissingInput(&'static str),

    /// Metadata file unreadable.
    #[error("failed to read run metadata {path}: {source}")]
    MetadataIo {
        /// Metadata path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Metadata file is not valid JSON for [`RunMetadata`].
    #[error("failed to parse run metadata {path}: {source}")]
    MetadataFormat {
        /// Metadata path.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Tuning parameters for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum long-read depth for reporting.
    pub min_cov: u32,
    /// Closed alternate-frequency interval for reporting.
    pub report_pct: (f64, f64),
    /// Positions reported regardless of filters.
    pub known_positions: KnownPositions,
    /// Short-read depth needed to confirm or reject a candidate.
    pub short_read_min_cov: u32,
    /// Background error rate of the significance null model.
    pub error_rate: f64,
    /// Bases on each side scored for homopolymer context.
    pub homopolymer_window: usize,
    /// Optional homopolymer ceiling used by the filter.
    pub max_homopolymer_pct: Option<f64>,
    /// Worker threads for per-region processing.
    pub threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_cov: 100,
            report_pct: (0.10, 0.90),
            known_positions: KnownPositions::new(),
            short_read_min_cov: DEFAULT_SHORT_READ_MIN_COV,
            error_rate: DEFAULT_ERROR_RATE,
            homopolymer_window: DEFAULT_HOMOPOLYMER_WINDOW,
            max_homopolymer_pct: None,
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl PipelineConfig {
    /// Set the minimum coverage.
    pub fn with_min_cov(mut self, min_cov: u32) -> Self {
        self.min_cov = min_cov;
        self
    }

    /// Set the reporting frequency interval.
    pub fn with_report_pct(mut self, low: f64, high: f64) -> Self {
        self.report_pct = (low, high);
        self
    }

    /// Set the known-position allowlist.
    pub fn with_known_positions(mut self, known: KnownPositions) -> Self {
        self.known_positions = known;
        self
    }

    /// Set the short-read coverage threshold.
    pub fn with_short_read_min_cov(mut self, min_cov: u32) -> Self {
        self.short_read_min_cov = min_cov;
        self
    }

    /// Set the background error rate.
    pub fn with_error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = error_rate;
        self
    }

    /// Set the homopolymer window.
    pub fn with_homopolymer_window(mut self, window: usize) -> Self {
        self.homopolymer_window = window;
        self
    }

    /// Set the homopolymer filter ceiling.
    pub fn with_max_homopolymer_pct(mut self, max: Option<f64>) -> Self {
        self.max_homopolymer_pct = max;
        self
    }

    /// Set the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Check every parameter range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidConfiguration(msg));
        let (low, high) = self.report_pct;
        if !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) {
            return invalid(format!("report_pct ({low}, {high}) must lie within [0, 1]"));
        }
        if low > high {
            return invalid(format!("report_pct low {low} exceeds high {high}"));
        }
        if !(self.error_rate > 0.0 && self.error_rate < 1.0) {
            return invalid(format!("error_rate {} must lie in (0, 1)", self.error_rate));
        }
        if self.homopolymer_window == 0 {
            return invalid("homopolymer_window must be > 0".to_string());
        }
        if let Some(max) = self.max_homopolymer_pct {
            if !(0.0..=1.0).contains(&max) {
                return invalid(format!("max_homopolymer_pct {max} must lie within [0, 1]"));
            }
        }
        if self.threads == 0 {
            return invalid("threads must be > 0".to_string());
        }
        Ok(())
    }
}

/// Paths recorded by a previous pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunMetadata {
    /// Reference FASTA.
    pub genome_fa: Option<PathBuf>,
    /// Gene-region list.
    #[serde(alias = "annotation")]
    pub regions: Option<PathBuf>,
    /// Long-read BAM.
    pub bam: Option<PathBuf>,
    /// Long-read pileup table.
    pub pileup_tsv: Option<PathBuf>,
    /// Short-read BAM.
    pub short_read_bam: Option<PathBuf>,
    /// Short-read pileup table.
    pub short_read_pileup_tsv: Option<PathBuf>,
    /// Output directory.
    pub out_dir: Option<PathBuf>,
}

impl RunMetadata {
    /// Load metadata from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::MetadataIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::MetadataFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Persist metadata as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            ConfigError::MetadataFormat {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json).map_err(|source| ConfigError::MetadataIo {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Explicit path overrides, usually from the command line.
pub type InputOverrides = RunMetadata;

/// Where alignment evidence is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PileupSource {
    /// Indexed BAM file.
    Bam(PathBuf),
    /// Tab-separated pileup table.
    Table(PathBuf),
}

/// Inputs after layering overrides onto metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    /// Reference FASTA.
    pub genome_fa: PathBuf,
    /// Gene-region list.
    pub regions: PathBuf,
    /// Long-read evidence.
    pub long_reads: PileupSource,
    /// Optional short-read evidence.
    pub short_reads: Option<PileupSource>,
    /// Output directory.
    pub out_dir: PathBuf,
}

impl ResolvedInputs {
    /// Layer `overrides` onto `metadata`. A pileup table wins over a BAM given at
    /// the same layer.
    pub fn resolve(
        overrides: &InputOverrides,
        metadata: Option<&RunMetadata>,
    ) -> Result<Self, ConfigError> {
        let stored = metadata.cloned().unwrap_or_default();
        let pick = |explicit: &Option<PathBuf>, recorded: Option<PathBuf>| {
            explicit.clone().or(recorded)
        };

        let source = |table: Option<PathBuf>, bam: Option<PathBuf>| {
            table.map(PileupSource::Table).or(bam.map(PileupSource::Bam))
        };
        let long_reads = source(overrides.pileup_tsv.clone(), overrides.bam.clone())
            .or_else(|| source(stored.pileup_tsv.clone(), stored.bam.clone()))
            .ok_or(ConfigError::MissingInput("bam"))?;
        let short_reads = source(
            overrides.short_read_pileup_tsv.clone(),
            overrides.short_read_bam.clone(),
        )
        .or_else(|| source(stored.short_read_pileup_tsv.clone(), stored.short_read_bam.clone()));

        Ok(Self {
            genome_fa: pick(&overrides.genome_fa, stored.genome_fa)
                .ok_or(ConfigError::MissingInput("genome_fa"))?,
            regions: pick(&overrides.regions, stored.regions)
                .ok_or(ConfigError::MissingInput("regions"))?,
            long_reads,
            short_reads,
            out_dir: pick(&overrides.out_dir, stored.out_dir)
                .ok_or(ConfigError::MissingInput("out_dir"))?,
        })
    }

    /// Metadata describing these inputs, for the next stage.
    pub fn to_metadata(&self) -> RunMetadata {
        let (bam, pileup_tsv) = split_source(Some(&self.long_reads));
        let (short_read_bam, short_read_pileup_tsv) = split_source(self.short_reads.as_ref());
        RunMetadata {
            genome_fa: Some(self.genome_fa.clone()),
            regions: Some(self.regions.clone()),
            bam,
            pileup_tsv,
            short_read_bam,
            short_read_pileup_tsv,
            out_dir: Some(self.out_dir.clone()),
        }
    }
}

fn split_source(source: Option<&PileupSource>) -> (Option<PathBuf>, Option<PathBuf>) {
    match source {
        Some(PileupSource::Bam(path)) => (Some(path.clone()), None),
        Some(PileupSource::Table(path)) => (None, Some(path.clone())),
        None => (None, None),
    }
}
