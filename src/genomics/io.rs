use std::path::{Path, PathBuf};
use std::sync::Arc;

use rust_htslib::bam::{self, pileup::Indel, Read};
use tracing::{debug, warn};

use crate::genomics::{
    Allele, GeneRegion, PileupError, PileupProvider, PileupRecord, ReferenceGenome,
};

/// Default minimum column depth reported by [`BamPileup`].
pub const DEFAULT_MIN_DEPTH: u32 = 5;

const DEFAULT_MAX_DEPTH: u32 = 100_000;

/// Pileup provider reading an indexed BAM file with htslib.
///
/// Each fetch opens its own reader, so one provider can serve many worker
/// threads. Columns shallower than `min_depth` are dropped; insertions are
/// tallied at the reference base they follow.
#[derive(Debug, Clone)]
pub struct BamPileup {
    path: PathBuf,
    name: String,
    reference: Arc<ReferenceGenome>,
    min_depth: u32,
    max_depth: u32,
}

impl BamPileup {
    /// Create a provider for an indexed BAM file.
    pub fn new(path: impl AsRef<Path>, reference: Arc<ReferenceGenome>) -> Result<Self, PileupError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(PileupError::Io {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                path,
            });
        }
        Ok(Self {
            name: path.display().to_string(),
            path,
            reference,
            min_depth: DEFAULT_MIN_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    /// Override the minimum reported column depth.
    pub fn with_min_depth(mut self, min_depth: u32) -> Self {
        self.min_depth = min_depth;
        self
    }

    /// Override the htslib per-column depth cap.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    fn unavailable(&self, region: &GeneRegion, reason: impl ToString) -> PileupError {
        PileupError::Unavailable {
            source_name: self.name.clone(),
            region: region.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl PileupProvider for BamPileup {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, region: &GeneRegion) -> Result<Vec<PileupRecord>, PileupError> {
        let mut reader =
            bam::IndexedReader::from_path(&self.path).map_err(|err| self.unavailable(region, err))?;
        if reader.header().tid(region.chrom.as_bytes()).is_none() {
            warn!(region = %region, source = %self.name, "chromosome absent from BAM header");
            return Ok(Vec::new());
        }

        let start = i64::from(region.start.saturating_sub(1));
        let end = i64::from(region.end);
        reader
            .fetch((region.chrom.as_ref(), start, end))
            .map_err(|err| self.unavailable(region, err))?;

        let mut pileups = reader.pileup();
        pileups.set_max_depth(self.max_depth);

        let mut records = Vec::new();
        for column in pileups {
            let column = column.map_err(|err| self.unavailable(region, err))?;
            let position = column.pos() + 1;
            if position < region.start || position > region.end {
                continue;
            }
            let Some(reference) = self.reference.base_at(&region.chrom, position) else {
                continue;
            };

            let mut counts = [0u32; 6];
            for alignment in column.alignments() {
                let record = alignment.record();
                if record.is_secondary() || record.is_duplicate() || record.is_quality_check_failed() {
                    continue;
                }
                // Spliced reads span introns with N operations; htslib flags those as
                // deletions too, but they carry no allele.
                if alignment.is_refskip() {
                    continue;
                }
                if alignment.is_del() {
                    counts[Allele::Deletion.index()] += 1;
                } else if let Some(qpos) = alignment.qpos() {
                    if let Some(allele) = Allele::from_base(record.seq()[qpos]) {
                        counts[allele.index()] += 1;
                    }
                }
                if let Indel::Ins(_) = alignment.indel() {
                    counts[Allele::Insertion.index()] += 1;
                }
            }

            let tallied = counts.iter().fold(0u32, |acc, &count| acc.saturating_add(count));
            if tallied < self.min_depth {
                continue;
            }
            for (allele, &count) in Allele::ALL.iter().zip(&counts) {
                if count > 0 {
                    records.push(PileupRecord::new(
                        Arc::clone(&region.chrom),
                        position,
                        *allele,
                        count,
                        reference,
                    ));
                }
            }
        }

        debug!(region = %region, rows = records.len(), "fetched BAM pileup");
        Ok(records)
    }
}
