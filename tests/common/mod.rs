#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lrsnv::genomics::{Allele, InMemoryPileup, PileupRecord, ReferenceGenome};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("LRSNV_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set LRSNV_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Single-chromosome reference wrapped for sharing with a pipeline.
pub fn reference(chrom: &str, sequence: &str) -> Arc<ReferenceGenome> {
    let mut genome = ReferenceGenome::new();
    genome.insert(chrom, sequence);
    Arc::new(genome)
}

/// Pileup rows for one position given as `(allele, count)` pairs.
pub fn column(chrom: &str, position: u32, reference: u8, counts: &[(Allele, u32)]) -> Vec<PileupRecord> {
    counts
        .iter()
        .map(|&(allele, count)| PileupRecord::new(chrom, position, allele, count, reference))
        .collect()
}

/// In-memory pileup built from several columns.
pub fn pileup(name: &str, columns: Vec<Vec<PileupRecord>>) -> Box<InMemoryPileup> {
    Box::new(InMemoryPileup::new(name, columns.into_iter().flatten().collect()))
}
