use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or querying the reference genome.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The FASTA file could not be opened or read.
    #[error("failed to read reference {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Sequence data appeared before any `>` header line.
    #[error("reference {path} has sequence data before the first header (line {line})")]
    MissingHeader {
        /// Offending file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
    },

    /// The file contained no records.
    #[error("reference {0} contains no sequences")]
    Empty(PathBuf),
}

/// In-memory reference genome addressed by chromosome name.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGenome {
    sequences: HashMap<Arc<str>, Arc<[u8]>>,
}

impl ReferenceGenome {
    /// Create an empty reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a chromosome sequence (stored uppercase).
    pub fn insert(&mut self, chrom: impl Into<Arc<str>>, sequence: impl AsRef<[u8]>) {
        let upper = sequence.as_ref().to_ascii_uppercase();
        self.sequences
            .insert(chrom.into(), Arc::from(upper.into_boxed_slice()));
    }

    /// Sequence for `chrom`, if present.
    pub fn sequence(&self, chrom: &str) -> Option<Arc<[u8]>> {
        self.sequences.get(chrom).cloned()
    }

    /// Base at a 1-based position.
    pub fn base_at(&self, chrom: &str, position: u32) -> Option<u8> {
        let index = position.checked_sub(1)? as usize;
        self.sequences.get(chrom)?.get(index).copied()
    }

    /// Number of chromosomes loaded.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Whether no chromosomes are loaded.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Load a (multi-record) FASTA file. Header names are truncated at the first
    /// whitespace.
    pub fn from_fasta(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let io_err = |source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        };
        let reader = BufReader::new(File::open(path).map_err(io_err)?);

        let mut genome = Self::new();
        let mut current: Option<(String, Vec<u8>)> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            let line = line.trim_end();
            if let Some(header) = line.strip_prefix('>') {
                if let Some((name, seq)) = current.take() {
                    genome.insert(name, seq);
                }
                let name = header.split_whitespace().next().unwrap_or_default();
                current = Some((name.to_string(), Vec::new()));
            } else if !line.is_empty() {
                match current.as_mut() {
                    Some((_, seq)) => seq.extend_from_slice(line.trim().as_bytes()),
                    None => {
                        return Err(ReferenceError::MissingHeader {
                            path: path.to_path_buf(),
                            line: idx + 1,
                        })
                    }
                }
            }
        }
        if let Some((name, seq)) = current {
            genome.insert(name, seq);
        }

        if genome.is_empty() {
            return Err(ReferenceError::Empty(path.to_path_buf()));
        }
        debug!(chromosomes = genome.len(), path = %path.display(), "loaded reference");
        Ok(genome)
    }
}
