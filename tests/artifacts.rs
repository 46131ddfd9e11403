use std::fs::{self, File};
use std::io::Read;

use flate2::read::MultiGzDecoder;
use lrsnv::config::{ResolvedInputs, RunMetadata, RUN_METADATA_FILE};
use lrsnv::genomics::{
    read_gene_regions, read_known_positions, Allele, InMemoryPileup, PileupProvider,
    ReferenceGenome, ALLELE_STAT_FILE, FREQ_SUMMARY_FILE,
};
use lrsnv::{PipelineConfig, VariantPipeline};

fn gunzip(path: &std::path::Path) -> String {
    let mut text = String::new();
    MultiGzDecoder::new(File::open(path).expect("artifact exists"))
        .read_to_string(&mut text)
        .expect("artifact is gzip text");
    text
}

#[test]
fn file_inputs_flow_through_to_compressed_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let fasta = dir.path().join("genome.fa");
    let regions_path = dir.path().join("regions.tsv");
    let pileup_path = dir.path().join("long.tsv");
    let known_path = dir.path().join("known.tsv");
    fs::write(&fasta, ">chr1 test contig\nACGTACGT\nACGTACGT\n").unwrap();
    fs::write(&regions_path, "GENE1\tchr1\t1\t8\nGENE2\tchr1\t9\t16\n").unwrap();
    fs::write(
        &pileup_path,
        "chromosome\tposition\tallele\tcount\treference\n\
         chr1\t2\tC\t30\tC\n\
         chr1\t2\tT\t10\tC\n\
         chr1\t11\tG\t39\tG\n\
         chr1\t11\tA\t1\tG\n",
    )
    .unwrap();
    fs::write(&known_path, "chr1\t11\n").unwrap();

    let reference = ReferenceGenome::from_fasta(&fasta).unwrap();
    assert_eq!(reference.base_at("chr1", 9), Some(b'A'));
    let regions = read_gene_regions(&regions_path).unwrap();
    assert_eq!(regions.len(), 2);
    let known = read_known_positions(&known_path).unwrap();
    let long_reads = InMemoryPileup::from_tsv(&pileup_path).unwrap();
    assert_eq!(long_reads.len(), 4);

    let config = PipelineConfig::default()
        .with_min_cov(20)
        .with_known_positions(known)
        .with_threads(2);
    let report = VariantPipeline::new(config, std::sync::Arc::new(reference), Box::new(long_reads))
        .unwrap()
        .run(&regions)
        .unwrap();
    assert_eq!(report.len(), 2);

    let out_dir = dir.path().join("out");
    let artifacts = report.write_artifacts(&out_dir).unwrap();
    assert_eq!(artifacts.allele_stat, out_dir.join(ALLELE_STAT_FILE));
    assert_eq!(artifacts.freq_summary, out_dir.join(FREQ_SUMMARY_FILE));

    let table = gunzip(&artifacts.allele_stat);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("chromosome\tposition\tref_allele\talt_allele"));
    assert!(lines[1..].iter().any(|line| line.starts_with("chr1\t2\tC\tT\t0.7500")));
    assert!(lines[1..].iter().any(|line| line.starts_with("chr1\t11\tG\tA\t0.9750")));

    let alt_counts = gunzip(&artifacts.alt_counts);
    assert!(alt_counts.contains("chr1\t2\tT\t10\t40"));
    let ref_counts = gunzip(&artifacts.ref_counts);
    assert!(ref_counts.contains("chr1\t11\tG\t39\t40"));

    let summary = gunzip(&artifacts.freq_summary);
    let counted: usize = summary
        .lines()
        .skip(1)
        .map(|line| line.rsplit('\t').next().unwrap().parse::<usize>().unwrap())
        .sum();
    assert_eq!(counted, 2);
}

#[test]
fn metadata_round_trips_and_overrides_win() {
    let dir = tempfile::tempdir().unwrap();
    let stored = RunMetadata {
        genome_fa: Some(dir.path().join("stored.fa")),
        regions: Some(dir.path().join("regions.tsv")),
        pileup_tsv: Some(dir.path().join("long.tsv")),
        out_dir: Some(dir.path().join("out")),
        ..RunMetadata::default()
    };
    let path = dir.path().join(RUN_METADATA_FILE);
    stored.save(&path).unwrap();
    let loaded = RunMetadata::load(&path).unwrap();
    assert_eq!(loaded, stored);

    let overrides = RunMetadata {
        genome_fa: Some(dir.path().join("override.fa")),
        ..RunMetadata::default()
    };
    let inputs = ResolvedInputs::resolve(&overrides, Some(&loaded)).unwrap();
    assert_eq!(inputs.genome_fa, dir.path().join("override.fa"));
    assert_eq!(inputs.regions, dir.path().join("regions.tsv"));
    assert!(inputs.short_reads.is_none());
}

#[test]
fn gzip_pileup_tables_are_read_transparently() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.tsv.gz");
    let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    encoder.write_all(b"chr1\t5\tA\t12\tA\nchr1\t5\tT\t3\tA\n").unwrap();
    encoder.finish().unwrap();

    let table = InMemoryPileup::from_tsv(&path).unwrap();
    let rows = table
        .fetch(&lrsnv::GeneRegion::new("G", "chr1", 1, 10))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].allele, Allele::T);
}
