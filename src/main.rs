use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lrsnv::config::{InputOverrides, PileupSource, RUN_METADATA_FILE};
use lrsnv::genomics::{
    homopolymer_score, read_gene_regions, read_known_positions, BamPileup, InMemoryPileup,
    KnownPositions, PileupProvider, ReferenceGenome, DEFAULT_MIN_DEPTH,
};
use lrsnv::{PipelineConfig, ResolvedInputs, RunMetadata, VariantPipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lrsnv", version, about = "Candidate SNV discovery for single-cell long reads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Call, score and report candidate SNVs over a list of gene regions.
    Call(CallArgs),
    /// Print the homopolymer score of one reference position.
    Homopolymer {
        /// Reference genome FASTA.
        #[arg(long)]
        genome_fa: PathBuf,
        /// Chromosome name.
        #[arg(long)]
        chrom: String,
        /// 1-based position.
        #[arg(long)]
        position: u32,
        /// Bases inspected on each side.
        #[arg(long, default_value_t = 5)]
        window: usize,
        /// Leave the position itself out of the window.
        #[arg(long)]
        exclude_position: bool,
    },
}

#[derive(Args, Debug)]
struct CallArgs {
    /// Run metadata JSON from a previous stage; explicit paths override it.
    #[arg(long)]
    metadata: Option<PathBuf>,
    /// Reference genome FASTA.
    #[arg(long)]
    genome_fa: Option<PathBuf>,
    /// Gene-region list (`gene_id, chromosome, start, end`).
    #[arg(long, alias = "annotation")]
    regions: Option<PathBuf>,
    /// Indexed long-read BAM.
    #[arg(long)]
    bam: Option<PathBuf>,
    /// Long-read pileup table (`chromosome, position, allele, count, reference`).
    #[arg(long)]
    pileup_tsv: Option<PathBuf>,
    /// Indexed short-read BAM used for cross-validation.
    #[arg(long)]
    short_read_bam: Option<PathBuf>,
    /// Short-read pileup table used for cross-validation.
    #[arg(long)]
    short_read_pileup_tsv: Option<PathBuf>,
    /// Output directory for report artifacts.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Minimum long-read depth.
    #[arg(long, default_value_t = 100)]
    min_cov: u32,
    /// Lower bound of the reported alternate frequency.
    #[arg(long, default_value_t = 0.10)]
    report_pct_low: f64,
    /// Upper bound of the reported alternate frequency.
    #[arg(long, default_value_t = 0.90)]
    report_pct_high: f64,
    /// Known positions (`chromosome, position`) reported regardless of filters.
    #[arg(long)]
    known_positions: Option<PathBuf>,
    /// Short-read depth needed to confirm or reject a candidate.
    #[arg(long, default_value_t = 10)]
    short_read_min_cov: u32,
    /// Background error rate of the significance null model.
    #[arg(long, default_value_t = 0.05)]
    error_rate: f64,
    /// Bases on each side scored for homopolymer context.
    #[arg(long, default_value_t = 5)]
    homopolymer_window: usize,
    /// Exclude candidates whose homopolymer fraction exceeds this value.
    #[arg(long)]
    max_homopolymer_pct: Option<f64>,
    /// Minimum column depth read from BAM pileups.
    #[arg(long, default_value_t = DEFAULT_MIN_DEPTH)]
    pileup_min_depth: u32,
    /// Worker threads (defaults to available cores).
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("lrsnv=debug,info")
    } else {
        EnvFilter::new("lrsnv=info,warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Call(args) => run_call(args)?,
        Commands::Homopolymer {
            genome_fa,
            chrom,
            position,
            window,
            exclude_position,
        } => run_homopolymer(&genome_fa, &chrom, position, window, exclude_position)?,
    }

    Ok(())
}

fn run_call(args: CallArgs) -> Result<()> {
    let metadata = args
        .metadata
        .as_ref()
        .map(|path| RunMetadata::load(path))
        .transpose()
        .context("failed to load run metadata")?;
    let overrides = InputOverrides {
        genome_fa: args.genome_fa.clone(),
        regions: args.regions.clone(),
        bam: args.bam.clone(),
        pileup_tsv: args.pileup_tsv.clone(),
        short_read_bam: args.short_read_bam.clone(),
        short_read_pileup_tsv: args.short_read_pileup_tsv.clone(),
        out_dir: args.out_dir.clone(),
    };
    let inputs = ResolvedInputs::resolve(&overrides, metadata.as_ref())?;

    let reference = Arc::new(ReferenceGenome::from_fasta(&inputs.genome_fa).with_context(|| {
        format!("failed to load reference {}", inputs.genome_fa.display())
    })?);
    let regions = read_gene_regions(&inputs.regions)
        .with_context(|| format!("failed to read regions {}", inputs.regions.display()))?;
    let known = match &args.known_positions {
        Some(path) => read_known_positions(path)
            .with_context(|| format!("failed to read known positions {}", path.display()))?,
        None => KnownPositions::new(),
    };

    let mut config = PipelineConfig::default()
        .with_min_cov(args.min_cov)
        .with_report_pct(args.report_pct_low, args.report_pct_high)
        .with_known_positions(known)
        .with_short_read_min_cov(args.short_read_min_cov)
        .with_error_rate(args.error_rate)
        .with_homopolymer_window(args.homopolymer_window)
        .with_max_homopolymer_pct(args.max_homopolymer_pct);
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }

    let long_reads = open_pileup(&inputs.long_reads, &reference, args.pileup_min_depth)?;
    let mut pipeline = VariantPipeline::new(config, Arc::clone(&reference), long_reads)
        .context("failed to initialise pipeline")?;
    if let Some(source) = &inputs.short_reads {
        pipeline = pipeline.with_short_reads(open_pileup(source, &reference, args.pileup_min_depth)?);
    }

    let report = pipeline.run(&regions).context("SNV pipeline failed")?;
    let artifacts = report.write_artifacts(&inputs.out_dir)?;
    inputs
        .to_metadata()
        .save(inputs.out_dir.join(RUN_METADATA_FILE))
        .context("failed to write run metadata")?;

    info!(
        reported = report.len(),
        table = %artifacts.allele_stat.display(),
        "SNV calling finished"
    );
    println!(
        "{} candidate SNVs reported in {}",
        report.len(),
        artifacts.allele_stat.display()
    );
    Ok(())
}

fn open_pileup(
    source: &PileupSource,
    reference: &Arc<ReferenceGenome>,
    min_depth: u32,
) -> Result<Box<dyn PileupProvider>> {
    let provider: Box<dyn PileupProvider> = match source {
        PileupSource::Bam(path) => Box::new(
            BamPileup::new(path, Arc::clone(reference))
                .with_context(|| format!("failed to open BAM {}", path.display()))?
                .with_min_depth(min_depth),
        ),
        PileupSource::Table(path) => Box::new(
            InMemoryPileup::from_tsv(path)
                .with_context(|| format!("failed to load pileup table {}", path.display()))?,
        ),
    };
    Ok(provider)
}

fn run_homopolymer(
    genome_fa: &Path,
    chrom: &str,
    position: u32,
    window: usize,
    exclude_position: bool,
) -> Result<()> {
    let reference = ReferenceGenome::from_fasta(genome_fa)
        .with_context(|| format!("failed to load reference {}", genome_fa.display()))?;
    let sequence = reference
        .sequence(chrom)
        .ok_or_else(|| anyhow::anyhow!("chromosome {chrom} not found in {}", genome_fa.display()))?;

    let score = homopolymer_score(&sequence, chrom, position, !exclude_position, window);
    println!("{chrom}\t{position}\t{score:.4}");
    Ok(())
}
