use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use thiserror::Error;
use tracing::debug;

use crate::genomics::{Allele, GeneRegion, PileupRecord};

/// Errors raised by pileup sources.
#[derive(Debug, Error)]
pub enum PileupError {
    /// The backing file could not be opened or read.
    #[error("failed to read pileup {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A pileup table row could not be parsed.
    #[error("malformed pileup row in {source_name} line {line}: {message}")]
    Malformed {
        /// Name of the pileup source.
        source_name: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the row.
        message: String,
    },

    /// The source exists but could not deliver data for a region.
    #[error("pileup {source_name} unavailable for {region}: {reason}")]
    Unavailable {
        /// Name of the pileup source.
        source_name: String,
        /// Region being fetched.
        region: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Source of per-position, per-allele read support.
///
/// Implementations must be shareable across worker threads; each call serves one
/// gene region independently of every other.
pub trait PileupProvider: Send + Sync {
    /// Human-readable name used in logs and errors (usually the file path).
    fn name(&self) -> &str;

    /// Pileup rows for every covered position in `region`, reference-matching rows
    /// included.
    fn fetch(&self, region: &GeneRegion) -> Result<Vec<PileupRecord>, PileupError>;
}

/// Pileup rows held in memory, indexed by chromosome and sorted by position.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPileup {
    name: String,
    by_chrom: HashMap<Arc<str>, Vec<PileupRecord>>,
}

impl InMemoryPileup {
    /// Build from arbitrary rows.
    pub fn new(name: impl Into<String>, records: Vec<PileupRecord>) -> Self {
        let mut by_chrom: HashMap<Arc<str>, Vec<PileupRecord>> = HashMap::new();
        for record in records {
            by_chrom
                .entry(Arc::clone(&record.chrom))
                .or_default()
                .push(record);
        }
        for rows in by_chrom.values_mut() {
            rows.sort_by_key(|record| record.position);
        }
        Self {
            name: name.into(),
            by_chrom,
        }
    }

    /// Number of rows held.
    pub fn len(&self) -> usize {
        self.by_chrom.values().map(Vec::len).sum()
    }

    /// Whether no rows are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a tab-separated pileup table, gzip-compressed when the path ends in
    /// `.gz`.
    ///
    /// Columns: `chromosome, position, allele, count, reference`. Lines starting
    /// with `#` and a leading header row are skipped.
    pub fn from_tsv(path: impl AsRef<Path>) -> Result<Self, PileupError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PileupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(MultiGzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let name = path.display().to_string();
        let records = parse_pileup_table(reader, &name)?;
        debug!(rows = records.len(), source = %name, "loaded pileup table");
        Ok(Self::new(name, records))
    }
}

impl PileupProvider for InMemoryPileup {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, region: &GeneRegion) -> Result<Vec<PileupRecord>, PileupError> {
        let Some(rows) = self.by_chrom.get(region.chrom.as_ref()) else {
            return Ok(Vec::new());
        };
        let first = rows.partition_point(|record| record.position < region.start);
        Ok(rows[first..]
            .iter()
            .take_while(|record| record.position <= region.end)
            .cloned()
            .collect())
    }
}

fn parse_pileup_table<R: Read>(reader: R, name: &str) -> Result<Vec<PileupRecord>, PileupError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);

    let malformed = |line: usize, message: String| PileupError::Malformed {
        source_name: name.to_string(),
        line,
        message,
    };

    let mut records = Vec::new();
    for (idx, row) in csv_reader.records().enumerate() {
        let row = row.map_err(|err| malformed(idx + 1, err.to_string()))?;
        let line = row.position().map_or(idx + 1, |pos| pos.line() as usize);
        if row.len() < 5 {
            return Err(malformed(line, format!("expected 5 fields, found {}", row.len())));
        }

        let chrom = row[0].trim();
        let is_header = matches!(chrom.to_ascii_lowercase().as_str(), "chromosome" | "chrom");
        if records.is_empty() && is_header {
            continue;
        }
        let position: u32 = row[1]
            .trim()
            .parse()
            .map_err(|_| malformed(line, format!("invalid position '{}'", &row[1])))?;
        if position == 0 {
            return Err(malformed(line, "positions are 1-based".to_string()));
        }
        let allele: Allele = row[2].parse().map_err(|msg| malformed(line, msg))?;
        let count: u32 = row[3]
            .trim()
            .parse()
            .map_err(|_| malformed(line, format!("invalid count '{}'", &row[3])))?;
        let reference = match row[4].trim().as_bytes() {
            [base] => *base,
            _ => return Err(malformed(line, format!("invalid reference base '{}'", &row[4]))),
        };

        records.push(PileupRecord::new(chrom, position, allele, count, reference));
    }
    Ok(records)
}
