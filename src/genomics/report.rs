use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::info;

use super::CandidateVariant;

/// File name of the merged allele statistics table.
pub const ALLELE_STAT_FILE: &str = "allele_stat.tsv.gz";
/// File name of the per-position reference count table.
pub const REF_COUNT_FILE: &str = "ref_cnt.tsv.gz";
/// File name of the per-position alternate count table.
pub const ALT_COUNT_FILE: &str = "alt_cnt.tsv.gz";
/// File name of the alternate frequency histogram.
pub const FREQ_SUMMARY_FILE: &str = "freq_summary.tsv.gz";

const ALLELE_STAT_HEADER: [&str; 10] = [
    "chromosome",
    "position",
    "ref_allele",
    "alt_allele",
    "ref_frequency",
    "ref_frequency_in_short_reads",
    "hypergeom_p_value",
    "homopolymer_pct",
    "indel_frequency",
    "adj_p_value",
];

const FREQ_BINS: usize = 20;

/// Final candidate rows ordered by adjusted p-value.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantReport {
    rows: Vec<CandidateVariant>,
}

/// Paths of the artifacts written for a report.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    /// Merged allele statistics table.
    pub allele_stat: PathBuf,
    /// Reference-allele count table.
    pub ref_counts: PathBuf,
    /// Alternate-allele count table.
    pub alt_counts: PathBuf,
    /// Frequency histogram.
    pub freq_summary: PathBuf,
}

/// Order scored candidates by adjusted p-value (ties keep input order).
pub fn assemble(scored: Vec<CandidateVariant>) -> VariantReport {
    let mut rows = scored;
    rows.sort_by(|a, b| a.adj_p_value.total_cmp(&b.adj_p_value));
    VariantReport { rows }
}

impl VariantReport {
    /// Rows in report order.
    pub fn rows(&self) -> &[CandidateVariant] {
        &self.rows
    }

    /// Number of reported candidates.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing is reported.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the merged table in canonical column order.
    pub fn write_allele_stats<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = tsv_writer(writer);
        out.write_record(ALLELE_STAT_HEADER)?;
        for row in &self.rows {
            out.write_record([
                row.chrom.to_string(),
                row.position.to_string(),
                (row.ref_allele as char).to_string(),
                row.alt_allele.to_string(),
                format_frequency(row.ref_frequency),
                format_frequency(row.ref_frequency_in_short_reads),
                format_p_value(row.hypergeom_p_value),
                format_frequency(row.homopolymer_pct),
                format_frequency(row.indel_frequency),
                format_p_value(row.adj_p_value),
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    /// Write per-position reference-allele support.
    pub fn write_ref_counts<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = tsv_writer(writer);
        out.write_record(["chromosome", "position", "ref_allele", "ref_count", "total_depth"])?;
        for row in &self.rows {
            out.write_record([
                row.chrom.to_string(),
                row.position.to_string(),
                (row.ref_allele as char).to_string(),
                row.ref_count.to_string(),
                row.total_depth.to_string(),
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    /// Write per-position alternate-allele support.
    pub fn write_alt_counts<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = tsv_writer(writer);
        out.write_record(["chromosome", "position", "alt_allele", "alt_count", "total_depth"])?;
        for row in &self.rows {
            out.write_record([
                row.chrom.to_string(),
                row.position.to_string(),
                row.alt_allele.to_string(),
                row.alt_count.to_string(),
                row.total_depth.to_string(),
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    /// Histogram of reported alternate frequencies in bins of width 0.05.
    pub fn frequency_histogram(&self) -> [usize; FREQ_BINS] {
        let mut bins = [0usize; FREQ_BINS];
        for row in &self.rows {
            let scaled = (row.alt_frequency.clamp(0.0, 1.0) * FREQ_BINS as f64).floor() as usize;
            bins[scaled.min(FREQ_BINS - 1)] += 1;
        }
        bins
    }

    /// Write the frequency histogram.
    pub fn write_freq_summary<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = tsv_writer(writer);
        out.write_record(["bin_start", "bin_end", "candidates"])?;
        let width = 1.0 / FREQ_BINS as f64;
        for (idx, count) in self.frequency_histogram().iter().enumerate() {
            out.write_record([
                format!("{:.2}", idx as f64 * width),
                format!("{:.2}", (idx + 1) as f64 * width),
                count.to_string(),
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    /// Render the merged table to a string (snapshots, stdout previews).
    pub fn render_allele_stats(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_allele_stats(&mut buffer)?;
        String::from_utf8(buffer).map_err(|_| anyhow!("rendered table is not valid UTF-8"))
    }

    /// Write all four gzip-compressed artifacts into `out_dir`.
    pub fn write_artifacts(&self, out_dir: impl AsRef<Path>) -> Result<ReportArtifacts> {
        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

        let artifacts = ReportArtifacts {
            allele_stat: out_dir.join(ALLELE_STAT_FILE),
            ref_counts: out_dir.join(REF_COUNT_FILE),
            alt_counts: out_dir.join(ALT_COUNT_FILE),
            freq_summary: out_dir.join(FREQ_SUMMARY_FILE),
        };

        write_gzip(&artifacts.allele_stat, |w| self.write_allele_stats(w))?;
        write_gzip(&artifacts.ref_counts, |w| self.write_ref_counts(w))?;
        write_gzip(&artifacts.alt_counts, |w| self.write_alt_counts(w))?;
        write_gzip(&artifacts.freq_summary, |w| self.write_freq_summary(w))?;

        info!(rows = self.len(), out_dir = %out_dir.display(), "wrote report artifacts");
        Ok(artifacts)
    }
}

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer)
}

fn write_gzip<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut GzEncoder<BufWriter<File>>) -> Result<()>,
{
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    write(&mut encoder).with_context(|| format!("failed to write {}", path.display()))?;
    encoder
        .finish()
        .and_then(|mut inner| inner.flush())
        .with_context(|| format!("failed to finish {}", path.display()))?;
    Ok(())
}

fn format_frequency(value: f64) -> String {
    format!("{value:.4}")
}

fn format_p_value(value: f64) -> String {
    format!("{value:.6e}")
}
