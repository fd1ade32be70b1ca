// ==============================================================================
// main.rs - Virtual Panel Entry Point
// ==============================================================================
// Description: Command line interface for panel building, sample runs and filtering
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Usage:
//   virtual-panel regions --out targets.bed
//   virtual-panel run --sample Patient_01 --r1 R1.fastq.gz --r2 R2.fastq.gz \
//       --reference hg38.fasta --known-sites dbsnp.vcf.gz --regions targets.bed
//   virtual-panel filter --table Patient_01.anno.hg38_multianno.txt --sample Patient_01
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use virtual_panel::audit::AuditLog;
use virtual_panel::config::PanelConfig;
use virtual_panel::filter::MissingFrequencyPolicy;
use virtual_panel::models::{CoordinateConvention, GeneSymbol, ReferenceBuild};
use virtual_panel::output::ReportFormat;
use virtual_panel::panel::{read_gene_list, thyroid_parathyroid_panel, GeneListError};
use virtual_panel::pipeline::{ProcessRunner, SampleInputs};
use virtual_panel::processor::{build_region_file, filter_and_report, PanelProcessor};
use virtual_panel::resolver::{CandidatePolicy, MyGeneClient};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Panel configuration file (TOML)
    #[arg(short, long, env = "PANEL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Reference genome build
    #[arg(long, value_enum, global = true)]
    build: Option<ReferenceBuild>,

    /// Flanking bases added to each side of every region
    #[arg(long, global = true)]
    padding_bp: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve gene coordinates and write the region file
    Regions {
        /// Comma-separated gene symbols (default: built-in thyroid/parathyroid panel)
        #[arg(long, value_delimiter = ',', conflicts_with = "gene_file")]
        genes: Vec<String>,

        /// File with one gene symbol per line
        #[arg(long)]
        gene_file: Option<PathBuf>,

        /// Output region file
        #[arg(short, long, default_value = "targets.bed")]
        out: PathBuf,

        /// Write 1-based inclusive coordinates instead of BED
        #[arg(long)]
        one_based: bool,

        /// Candidate selection when a gene maps to several loci
        #[arg(long, value_enum)]
        candidate_policy: Option<CandidatePolicy>,

        /// Append audit events to this JSON-lines file
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },

    /// Align, call, annotate and filter one sample
    Run {
        /// Sample identifier (used in file names and read group)
        #[arg(long, env = "SAMPLE_ID")]
        sample: String,

        /// Forward reads (FASTQ, optionally gzipped)
        #[arg(long)]
        r1: PathBuf,

        /// Reverse reads (FASTQ, optionally gzipped)
        #[arg(long)]
        r2: PathBuf,

        /// Reference genome FASTA (indexed for bwa and gatk)
        #[arg(long, env = "REFERENCE_FASTA")]
        reference: PathBuf,

        /// Known variant sites VCF (e.g., dbSNP)
        #[arg(long, env = "KNOWN_SITES_VCF")]
        known_sites: PathBuf,

        /// Region file produced by `regions`
        #[arg(long, default_value = "targets.bed")]
        regions: PathBuf,

        /// Directory for intermediate files and the audit trail
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,

        /// Report directory (default: work directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Report formats (comma-separated)
        #[arg(long, value_enum, value_delimiter = ',')]
        formats: Vec<ReportFormat>,
    },

    /// Filter an existing annotation table
    Filter {
        /// Annotated variant table (tab-separated)
        #[arg(long)]
        table: PathBuf,

        /// Sample identifier for report names
        #[arg(long, env = "SAMPLE_ID")]
        sample: String,

        /// Report directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Report formats (comma-separated)
        #[arg(long, value_enum, value_delimiter = ',')]
        formats: Vec<ReportFormat>,

        /// Treatment of variants with no population frequency
        #[arg(long, value_enum)]
        missing_frequency: Option<MissingFrequencyPolicy>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before argument parsing so `env` defaults apply
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "virtual_panel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Virtual panel workflow v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = PanelConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(build) = args.build {
        config.reference_build = build;
    }
    if let Some(padding_bp) = args.padding_bp {
        config.padding_bp = padding_bp;
    }

    match args.command {
        Command::Regions {
            genes,
            gene_file,
            out,
            one_based,
            candidate_policy,
            audit_log,
        } => {
            if one_based {
                config.coordinate_convention = CoordinateConvention::OneBasedInclusive;
            }
            if let Some(policy) = candidate_policy {
                config.candidate_policy = policy;
            }
            config.validate()?;

            let genes = gene_selection(genes, gene_file)?;
            let client = MyGeneClient::new(&config).context("Failed to create lookup client")?;
            let audit_log = audit_log.map(AuditLog::new);

            let report = build_region_file(&config, client, &genes, &out, audit_log.as_ref()).await?;
            for gene in &report.unresolved {
                warn!("Unresolved: {} ({})", gene.symbol, gene.reason);
            }
        }

        Command::Run {
            sample,
            r1,
            r2,
            reference,
            known_sites,
            regions,
            work_dir,
            out_dir,
            formats,
        } => {
            if !formats.is_empty() {
                config.report.formats = formats;
            }
            config.validate()?;

            let inputs = SampleInputs {
                sample_id: sample,
                reads_1: r1,
                reads_2: r2,
                reference,
                known_sites,
                region_file: regions,
            };
            let report_dir = out_dir.unwrap_or_else(|| work_dir.clone());

            let outcome = PanelProcessor::new(config, ProcessRunner::new())
                .process(&inputs, &work_dir, &report_dir)
                .await?;

            info!(
                "Run {} finished: {} variants shortlisted",
                outcome.run_id,
                outcome.filter.shortlist.len()
            );
            for path in outcome.filter.reports.values() {
                info!("Report: {:?}", path);
            }
        }

        Command::Filter {
            table,
            sample,
            out_dir,
            formats,
            missing_frequency,
        } => {
            if !formats.is_empty() {
                config.report.formats = formats;
            }
            if let Some(policy) = missing_frequency {
                config.filter.missing_frequency = policy;
            }
            config.validate()?;
            virtual_panel::validator::validate_sample_id(&sample)?;

            let outcome = filter_and_report(&config, &table, &sample, &out_dir, None).await?;
            for path in outcome.reports.values() {
                info!("Report: {:?}", path);
            }
        }
    }

    Ok(())
}

/// Genes from --genes, --gene-file, or the built-in panel
fn gene_selection(genes: Vec<String>, gene_file: Option<PathBuf>) -> Result<Vec<GeneSymbol>> {
    if let Some(path) = gene_file {
        return read_gene_list(&path).with_context(|| format!("Failed to read gene list {:?}", path));
    }

    if genes.is_empty() {
        info!("No genes given, using the built-in thyroid/parathyroid panel");
        return Ok(thyroid_parathyroid_panel());
    }

    let symbols: Vec<GeneSymbol> = genes.iter().filter_map(|g| GeneSymbol::parse(g)).collect();
    if symbols.is_empty() {
        return Err(GeneListError::Empty.into());
    }
    Ok(symbols)
}
