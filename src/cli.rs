use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::evaluate::{self, Mode};
use crate::ped::Pedigree;
use crate::report;
use crate::smart_reader;

#[derive(Debug, Parser)]
#[command(author, version, about = "Check pedigree consistency against a VCF stream", long_about = None)]
struct Cli {
    /// VCF file to analyze, or `-` for stdin
    #[arg(value_name = "VCF")]
    variant_file: String,

    /// Pedigree (PED) file describing the families under analysis
    #[arg(short = 'f', long, value_name = "PED")]
    family_file: Option<PathBuf>,

    /// Genotype quality required for a call to be considered
    #[arg(short = 'g', long, default_value_t = 20)]
    gq_threshold: u32,

    /// Emit results as a JSON array instead of a tab-separated table
    #[arg(long)]
    to_json: bool,

    /// Write results to this file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    outfile: Option<PathBuf>,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check Mendelian errors in all trios
    Mendel,
    /// Check variants shared between children and their fathers
    Father,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mode = match cli.command {
        Command::Mendel => Mode::Mendel,
        Command::Father => Mode::Father,
    };
    info!(
        "Running variant-integrity {} {}",
        match mode {
            Mode::Mendel => "mendel",
            Mode::Father => "father",
        },
        env!("CARGO_PKG_VERSION")
    );

    let Some(family_file) = &cli.family_file else {
        anyhow::bail!("Please provide a family file with -f/--family-file");
    };

    let ped_input = std::fs::File::open(family_file).with_context(|| {
        format!("failed to open family file at {}", family_file.display())
    })?;
    let pedigree = Pedigree::from_reader(BufReader::new(ped_input)).with_context(|| {
        format!("failed to parse family file at {}", family_file.display())
    })?;
    if pedigree.is_empty() {
        anyhow::bail!(
            "family file at {} contains no individuals",
            family_file.display()
        );
    }
    info!(
        "Families used in analysis: {}",
        pedigree
            .families()
            .iter()
            .map(|f| f.id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );

    let variant_input = smart_reader::open_variant_input(&cli.variant_file)?;
    let results = evaluate::analyze(variant_input, &pedigree, mode, cli.gq_threshold)
        .context("evaluation failed")?;

    report::write_results(&results, mode, cli.to_json, cli.outfile.as_deref())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}
