mod common;

use common::{column, pileup, reference};
use lrsnv::genomics::{Allele, KnownPosition, KnownPositions, SHORT_READ_UNAVAILABLE, UNSCOREABLE};
use lrsnv::{GeneRegion, PipelineConfig, VariantPipeline};

fn permissive_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_min_cov(5)
        .with_report_pct(0.0, 1.0)
        .with_threads(2)
}

#[test]
fn minor_allele_is_reported_and_scored() {
    let long_reads = pileup(
        "long",
        vec![column("chr1", 5, b'A', &[(Allele::A, 8), (Allele::T, 2)])],
    );
    let report = VariantPipeline::new(permissive_config(), reference("chr1", "ACGTACGTAC"), long_reads)
        .expect("pipeline initialises")
        .run(&[GeneRegion::new("GENE1", "chr1", 1, 10)])
        .expect("pipeline runs");

    assert_eq!(report.len(), 1);
    let row = &report.rows()[0];
    assert_eq!(row.position, 5);
    assert_eq!(row.alt_allele, Allele::T);
    assert_eq!(row.ref_allele, b'A');
    assert!((row.alt_frequency - 0.2).abs() < 1e-12);
    assert!((row.ref_frequency - 0.8).abs() < 1e-12);
    assert_eq!(row.gene_id.as_ref(), "GENE1");
    assert_eq!(row.ref_frequency_in_short_reads, SHORT_READ_UNAVAILABLE);
    assert!(row.hypergeom_p_value > 0.0 && row.hypergeom_p_value <= 1.0);
    assert!(row.adj_p_value >= row.hypergeom_p_value);
}

#[test]
fn report_is_sorted_by_adjusted_p_value() {
    // 2/10 against an error-only sample is a coin flip; 5/10 is far stronger.
    let long_reads = pileup(
        "long",
        vec![
            column("chr1", 5, b'A', &[(Allele::A, 8), (Allele::T, 2)]),
            column("chr1", 7, b'G', &[(Allele::G, 5), (Allele::C, 5)]),
        ],
    );
    let report = VariantPipeline::new(permissive_config(), reference("chr1", "ACGTACGTAC"), long_reads)
        .unwrap()
        .run(&[GeneRegion::new("GENE1", "chr1", 1, 10)])
        .unwrap();

    let positions: Vec<u32> = report.rows().iter().map(|row| row.position).collect();
    assert_eq!(positions, vec![7, 5]);
    assert!((report.rows()[1].hypergeom_p_value - 0.5).abs() < 1e-9);
    assert!(report.rows()[0].adj_p_value <= report.rows()[1].adj_p_value);
}

#[test]
fn short_reads_without_alt_support_reject_candidate() {
    let long_reads = pileup(
        "long",
        vec![column("chr1", 5, b'A', &[(Allele::A, 8), (Allele::T, 2)])],
    );
    let short_reads = pileup("short", vec![column("chr1", 5, b'A', &[(Allele::A, 50)])]);

    let report = VariantPipeline::new(permissive_config(), reference("chr1", "ACGTACGTAC"), long_reads)
        .unwrap()
        .with_short_reads(short_reads)
        .run(&[GeneRegion::new("GENE1", "chr1", 1, 10)])
        .unwrap();

    assert!(report.is_empty());
}

#[test]
fn known_position_survives_short_read_rejection() {
    let long_reads = pileup(
        "long",
        vec![column("chr1", 5, b'A', &[(Allele::A, 8), (Allele::T, 2)])],
    );
    let short_reads = pileup("short", vec![column("chr1", 5, b'A', &[(Allele::A, 50)])]);
    let known: KnownPositions = [KnownPosition::new("chr1", 5)].into_iter().collect();

    let report = VariantPipeline::new(
        permissive_config().with_known_positions(known),
        reference("chr1", "ACGTACGTAC"),
        long_reads,
    )
    .unwrap()
    .with_short_reads(short_reads)
    .run(&[GeneRegion::new("GENE1", "chr1", 1, 10)])
    .unwrap();

    assert_eq!(report.len(), 1);
    let row = &report.rows()[0];
    assert!(row.known);
    assert!(row.short_read_rejected);
    assert_eq!(row.ref_frequency_in_short_reads, 1.0);
}

#[test]
fn short_reads_with_alt_support_keep_candidate() {
    let long_reads = pileup(
        "long",
        vec![column("chr1", 5, b'A', &[(Allele::A, 8), (Allele::T, 2)])],
    );
    let short_reads = pileup(
        "short",
        vec![column("chr1", 5, b'A', &[(Allele::A, 40), (Allele::T, 10)])],
    );

    let report = VariantPipeline::new(permissive_config(), reference("chr1", "ACGTACGTAC"), long_reads)
        .unwrap()
        .with_short_reads(short_reads)
        .run(&[GeneRegion::new("GENE1", "chr1", 1, 10)])
        .unwrap();

    assert_eq!(report.len(), 1);
    assert!((report.rows()[0].ref_frequency_in_short_reads - 0.8).abs() < 1e-12);
    assert!(!report.rows()[0].short_read_rejected);
}

#[test]
fn known_positions_bypass_coverage_and_frequency_rules() {
    let long_reads = pileup(
        "long",
        vec![
            // Depth 3, far below the default coverage floor.
            column("chr1", 3, b'G', &[(Allele::G, 2), (Allele::A, 1)]),
            // Frequency 0.02, below the default reporting interval.
            column("chr1", 6, b'C', &[(Allele::C, 49), (Allele::G, 1)]),
            // Same shape but not listed.
            column("chr1", 8, b'T', &[(Allele::T, 49), (Allele::G, 1)]),
        ],
    );
    let known: KnownPositions = [KnownPosition::new("chr1", 3), KnownPosition::new("chr1", 6)]
        .into_iter()
        .collect();

    let report = VariantPipeline::new(
        PipelineConfig::default().with_known_positions(known).with_threads(1),
        reference("chr1", "ACGTACGTAC"),
        long_reads,
    )
    .unwrap()
    .run(&[GeneRegion::new("GENE1", "chr1", 1, 10)])
    .unwrap();

    let mut positions: Vec<u32> = report.rows().iter().map(|row| row.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![3, 6]);
    assert!(report.rows().iter().all(|row| row.known));

    let low_freq = report.rows().iter().find(|row| row.position == 6).unwrap();
    assert!((low_freq.alt_frequency - 0.02).abs() < 1e-12);
}

#[test]
fn edge_positions_are_never_homopolymer_artifacts() {
    let sequence = "AAAAAAAAAA";
    let columns = [1, 5, 10]
        .iter()
        .map(|&position| column("chr1", position, b'A', &[(Allele::A, 5), (Allele::T, 5)]))
        .collect();

    let report = VariantPipeline::new(
        permissive_config().with_max_homopolymer_pct(Some(0.5)),
        reference("chr1", sequence),
        pileup("long", columns),
    )
    .unwrap()
    .run(&[GeneRegion::new("POLY", "chr1", 1, 10)])
    .unwrap();

    let mut positions: Vec<u32> = report.rows().iter().map(|row| row.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![1, 10]);
    assert!(report
        .rows()
        .iter()
        .all(|row| row.homopolymer_pct == UNSCOREABLE));
}

#[test]
fn insertion_frequency_is_doubled_below_half_depth() {
    let long_reads = pileup(
        "long",
        vec![column(
            "chr1",
            4,
            b'T',
            &[(Allele::T, 16), (Allele::Insertion, 4)],
        )],
    );
    let report = VariantPipeline::new(permissive_config(), reference("chr1", "ACGTACGTAC"), long_reads)
        .unwrap()
        .run(&[GeneRegion::new("GENE1", "chr1", 1, 10)])
        .unwrap();

    let row = &report.rows()[0];
    assert_eq!(row.alt_allele, Allele::Insertion);
    assert!((row.alt_frequency - 0.4).abs() < 1e-12);
    assert!((row.indel_frequency - 0.2).abs() < 1e-12);
}

#[test]
fn candidates_outside_every_region_are_ignored() {
    let long_reads = pileup(
        "long",
        vec![
            column("chr1", 2, b'C', &[(Allele::C, 5), (Allele::A, 5)]),
            column("chr1", 9, b'A', &[(Allele::A, 5), (Allele::G, 5)]),
        ],
    );
    let report = VariantPipeline::new(permissive_config(), reference("chr1", "ACGTACGTAC"), long_reads)
        .unwrap()
        .run(&[GeneRegion::new("GENE1", "chr1", 1, 5)])
        .unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.rows()[0].position, 2);
}
