use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cratersort::lists::{read_image_list, subtract_lists, write_lines};
use cratersort::{
    build_dictionary, curate, load_catalogs, tile_name, CoordinateMatch, CurateConfig,
    IdentityResolver,
};

#[derive(Parser)]
#[command(name = "cratersort")]
#[command(about = "Crater catalog reconciliation and classifier dataset curation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every crater id in a label corpus against both catalog revisions
    BuildDictionary {
        /// Catalog revision 1 (ids used in the labels)
        #[arg(long)]
        v1: PathBuf,
        /// Catalog revision 2 (with DEGRADATION_STATE)
        #[arg(long)]
        v2: PathBuf,
        /// Directory of label files
        #[arg(short, long)]
        labels: PathBuf,
        #[arg(short, long, default_value = "crater_dictionary.csv")]
        output: PathBuf,
        /// Match v2 craters within this many degrees instead of exactly
        #[arg(long)]
        match_tolerance: Option<f64>,
    },

    /// Select, clean and rewrite tiles for classifier training
    Curate {
        /// JSON file with a full curation config; other flags are ignored when given
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "crater_dictionary.csv")]
        dictionary: PathBuf,
        /// Per-tile objectness loss table (img, obj columns)
        #[arg(long, default_value = "loss_rank.csv")]
        losses: PathBuf,
        /// Fraction of lowest-loss tiles to keep, in (0, 1]
        #[arg(short, long, default_value_t = 0.5)]
        threshold: f64,
        /// Unfiltered dataset containing images/ and labels/
        #[arg(short, long, default_value = "data")]
        source: PathBuf,
        /// Output directory (replaced on success)
        #[arg(short, long, default_value = "classifier")]
        dest: PathBuf,
        /// Keep only tiles whose every label is a classified crater
        #[arg(long)]
        clean: bool,
    },

    /// Print the tile name for a coordinate
    TileName {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },

    /// Write the entries of one list that are absent from another
    SubtractList {
        #[arg(long)]
        all: PathBuf,
        #[arg(long)]
        exclude: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::BuildDictionary {
            v1,
            v2,
            labels,
            output,
            match_tolerance,
        } => {
            let (v1, v2) = load_catalogs(&v1, &v2)?;
            let policy = match match_tolerance {
                Some(max_deg) => CoordinateMatch::Tolerance { max_deg },
                None => CoordinateMatch::Exact,
            };
            let resolver = IdentityResolver::with_policy(&v1, &v2, policy);
            let (dictionary, report) = build_dictionary(&labels, &resolver)?;
            dictionary.save_csv(&output)?;

            println!("Crater dictionary: {}", output.display());
            println!("  Craters:      {}", report.processed);
            println!("  Classified:   {}", report.classified);
            println!("  Unclassified: {}", report.unclassified);
            println!("  Missed:       {}", report.missed_count());
        }

        Commands::Curate {
            config,
            dictionary,
            losses,
            threshold,
            source,
            dest,
            clean,
        } => {
            let config = match config {
                Some(path) => CurateConfig::from_json_file(path)?,
                None => CurateConfig {
                    dictionary,
                    loss_table: losses,
                    threshold,
                    source_dir: source,
                    dest,
                    clean,
                },
            };
            let summary = curate(&config)?;

            println!("Curated dataset: {}", summary.dest.display());
            println!("  Classified craters: {}", summary.classified_craters);
            println!("  Tiles processed:    {}", summary.processed);
            println!("  Missed (no loss):   {}", summary.missed);
            println!("  Selected:           {}", summary.selected);
            if let Some(cleaned) = summary.cleaned {
                println!("  Clean:              {}", cleaned);
            }
            println!("  Images:             {}", summary.materialized);
            println!(
                "  Labels:             {} (of {} source)",
                summary.label_lines, summary.source_label_lines
            );
            println!("  Failures:           {}", summary.failures.len());
            for failure in &summary.failures {
                println!("    {}: {}", failure.tile, failure.reason);
            }
        }

        Commands::TileName {
            latitude,
            longitude,
        } => {
            println!("{}", tile_name(latitude, longitude));
        }

        Commands::SubtractList {
            all,
            exclude,
            output,
        } => {
            let all = read_image_list(&all)?;
            let exclude = read_image_list(&exclude)?;
            let remaining = subtract_lists(&all, &exclude);
            write_lines(&output, &remaining)?;
            println!(
                "{} of {} entries written to {}",
                remaining.len(),
                all.len(),
                output.display()
            );
        }
    }

    Ok(())
}
