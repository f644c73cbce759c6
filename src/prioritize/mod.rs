//! Clinical prioritization of the cross-build discordances.

pub mod config;
pub mod output;
pub mod scoring;

use std::path::PathBuf;

use clap::Parser;
use thousands::Separable;

use crate::{
    analyze::{self, cache},
    store::RocksStore,
};

use self::{config::ScoringConfig, scoring::Scorer};

/// Command line arguments for `prioritize` sub command.
#[derive(Parser, Debug)]
#[command(about = "Score and rank cross-build annotation discordances", long_about = None)]
pub struct Args {
    /// Path to the database built with `db create`.
    #[arg(long)]
    pub path_db: PathBuf,
    /// Path to the output directory, created if missing.
    #[arg(long)]
    pub path_output_dir: PathBuf,
    /// Optional YAML file with scoring weights; missing keys take the defaults.
    #[arg(long)]
    pub path_scoring_config: Option<PathBuf>,
    /// Recompute the analysis even if a cache exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
    /// Maximal number of variants to write to the table.
    #[arg(long, default_value_t = 10_000)]
    pub max_variants: usize,
    /// Minimal score of variants to write to the table.
    #[arg(long, default_value_t = 1)]
    pub min_score: u64,
    /// Number of variants to analyze at a time.
    #[arg(long, default_value_t = analyze::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

/// Main entry point for `prioritize` sub command.
pub fn run(common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!(
        "Prioritizing variants\ncommon args: {:#?}\nargs: {:#?}",
        common,
        args
    );

    let scoring_config = match &args.path_scoring_config {
        Some(path) => {
            tracing::info!("Loading scoring configuration from {}", path.display());
            ScoringConfig::from_path(path)?
        }
        None => ScoringConfig::default(),
    };

    std::fs::create_dir_all(&args.path_output_dir).map_err(|e| {
        anyhow::anyhow!(
            "could not create output directory {}: {}",
            args.path_output_dir.display(),
            e
        )
    })?;

    let cache_path = args.path_output_dir.join(cache::CACHE_FILE_NAME);
    let records = match cache::load(&cache_path, args.force) {
        Some(records) => records,
        None => {
            tracing::info!("Opening database {}", args.path_db.display());
            let store = RocksStore::open(&args.path_db)?;
            let config = analyze::ConfigBuilder::default()
                .chunk_size(args.chunk_size)
                .build()?;
            let records = analyze::analyze_all(&store, &config)?;
            cache::save(&cache_path, &records);
            records
        }
    };

    tracing::info!(
        "Scoring {} variants",
        records.len().separate_with_commas()
    );
    let scorer = Scorer::new(scoring_config);
    let scored = scorer.score_all(&records);
    let selected = output::select(&scored, args.min_score, args.max_variants);

    output::write_csv(args.path_output_dir.join(output::CSV_FILE_NAME), &selected)?;
    output::write_summary(
        args.path_output_dir.join(output::SUMMARY_FILE_NAME),
        &scored,
        selected.len(),
    )?;

    tracing::info!("Done prioritizing variants");
    Ok(())
}
