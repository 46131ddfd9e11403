use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::genomics::{GeneRegion, KnownPosition, KnownPositions};

/// Errors raised while reading region or known-position lists.
#[derive(Debug, Error)]
pub enum RegionListError {
    /// File could not be opened.
    #[error("failed to open {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A row could not be parsed.
    #[error("{path} line {line}: {message}")]
    Malformed {
        /// Offending file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// The region list has no rows.
    #[error("region list {0} is empty")]
    Empty(PathBuf),
}

/// Read a gene-region list: `gene_id, chromosome, start, end` (1-based inclusive,
/// tab-separated, optional header, `#` comments).
pub fn read_gene_regions(path: impl AsRef<Path>) -> Result<Vec<GeneRegion>, RegionListError> {
    let path = path.as_ref();
    let rows = read_rows(path, 4, &["gene_id", "gene"])?;

    let mut regions = Vec::with_capacity(rows.len());
    for (line, fields) in rows {
        let start = parse_coordinate(path, line, &fields[2])?;
        let end = parse_coordinate(path, line, &fields[3])?;
        if end < start {
            return Err(RegionListError::Malformed {
                path: path.to_path_buf(),
                line,
                message: format!("region end {end} precedes start {start}"),
            });
        }
        regions.push(GeneRegion::new(fields[0].as_str(), fields[1].as_str(), start, end));
    }

    if regions.is_empty() {
        return Err(RegionListError::Empty(path.to_path_buf()));
    }
    Ok(regions)
}

/// Read known positions: `chromosome, position` (1-based).
pub fn read_known_positions(path: impl AsRef<Path>) -> Result<KnownPositions, RegionListError> {
    let path = path.as_ref();
    let rows = read_rows(path, 2, &["chromosome", "chrom"])?;
    rows.into_iter()
        .map(|(line, fields)| -> Result<KnownPosition, RegionListError> {
            let position = parse_coordinate(path, line, &fields[1])?;
            Ok(KnownPosition::new(fields[0].as_str(), position))
        })
        .collect()
}

fn read_rows(
    path: &Path,
    min_fields: usize,
    header_names: &[&str],
) -> Result<Vec<(usize, Vec<String>)>, RegionListError> {
    let file = File::open(path).map_err(|source| RegionListError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|err| RegionListError::Malformed {
            path: path.to_path_buf(),
            line: idx + 1,
            message: err.to_string(),
        })?;
        let line = record.position().map_or(idx + 1, |pos| pos.line() as usize);
        let fields: Vec<String> = record.iter().map(|field| field.trim().to_string()).collect();
        if fields.iter().all(String::is_empty) {
            continue;
        }
        if rows.is_empty() && header_names.contains(&fields[0].to_ascii_lowercase().as_str()) {
            continue;
        }
        if fields.len() < min_fields {
            return Err(RegionListError::Malformed {
                path: path.to_path_buf(),
                line,
                message: format!("expected {min_fields} fields, found {}", fields.len()),
            });
        }
        rows.push((line, fields));
    }
    Ok(rows)
}

fn parse_coordinate(path: &Path, line: usize, field: &str) -> Result<u32, RegionListError> {
    match field.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(RegionListError::Malformed {
            path: path.to_path_buf(),
            line,
            message: format!("invalid 1-based coordinate '{field}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn regions_parse_with_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gene_id\tchromosome\tstart\tend\nGENE1\tchr1\t100\t200\nGENE2\tchr2\t5\t5").unwrap();

        let regions = read_gene_regions(file.path()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0], GeneRegion::new("GENE1", "chr1", 100, 200));
        assert_eq!(regions[1].len(), 1);
    }

    #[test]
    fn inverted_region_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "GENE1\tchr1\t200\t100").unwrap();
        let err = read_gene_regions(file.path()).unwrap_err();
        assert!(matches!(err, RegionListError::Malformed { line: 1, .. }));
    }

    #[test]
    fn empty_region_list_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();
        assert!(matches!(
            read_gene_regions(file.path()),
            Err(RegionListError::Empty(_))
        ));
    }

    #[test]
    fn known_positions_parse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chrom\tposition\nchr1\t42\nchrM\t3243").unwrap();
        let known = read_known_positions(file.path()).unwrap();
        assert!(known.contains("chrM", 3243));
        assert_eq!(known.len(), 2);
    }

    #[test]
    fn zero_position_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t0").unwrap();
        assert!(read_known_positions(file.path()).is_err());
    }
}
