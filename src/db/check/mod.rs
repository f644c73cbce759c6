//! Verification of an annotation store.

use clap::Parser;
use thousands::Separable;

use crate::{
    common::GenomeBuild,
    store::{AnnotationStore, ComparisonRecord, RocksStore, VepAnnotation},
};

/// Command line arguments for `db check` sub command.
#[derive(Parser, Debug)]
#[command(about = "Check annotation store", long_about = None)]
pub struct Args {
    /// Path to the database to check.
    #[arg(long)]
    pub path_db: String,
    /// Number of sample variants to print.
    #[arg(long, default_value_t = 3)]
    pub sample_count: usize,
}

/// Join success counts of the comparison table against one VEP table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinStats {
    /// Comparison rows with coordinates in this build.
    pub queried: usize,
    /// Rows of those with at least one VEP record.
    pub joined: usize,
}

impl JoinStats {
    pub fn rate(&self) -> f64 {
        if self.queried == 0 {
            0.0
        } else {
            self.joined as f64 / self.queried as f64 * 100.0
        }
    }
}

/// A comparison row together with its VEP records in both builds.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Sample {
    pub comparison: ComparisonRecord,
    pub hg19: Vec<VepAnnotation>,
    pub hg38: Vec<VepAnnotation>,
}

/// Result of checking a store.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    pub comparison_count: usize,
    /// Comparison rows with a target coordinate.
    pub lifted_count: usize,
    pub hg19_join: JoinStats,
    pub hg38_join: JoinStats,
    pub samples: Vec<Sample>,
}

/// Count the comparison rows and check how many of them find VEP records.
///
/// The first `sample_count` lifted-over rows that join in both builds are kept as samples.
pub fn check_store<S: AnnotationStore + ?Sized>(
    store: &S,
    sample_count: usize,
) -> Result<Report, anyhow::Error> {
    let mut report = Report::default();
    for comparison in store.comparisons() {
        let comparison = comparison?;
        report.comparison_count += 1;

        let hg19 = store.annotations(
            GenomeBuild::Hg19,
            &comparison.source_chrom,
            comparison.source_pos,
        )?;
        report.hg19_join.queried += 1;
        if !hg19.is_empty() {
            report.hg19_join.joined += 1;
        }

        let Some((chrom, pos)) = comparison.target() else {
            continue;
        };
        report.lifted_count += 1;
        let hg38 = store.annotations(GenomeBuild::Hg38, chrom, pos)?;
        report.hg38_join.queried += 1;
        if !hg38.is_empty() {
            report.hg38_join.joined += 1;
        }

        if report.samples.len() < sample_count && !hg19.is_empty() && !hg38.is_empty() {
            report.samples.push(Sample {
                comparison,
                hg19,
                hg38,
            });
        }
    }
    Ok(report)
}

/// Main entry point for `db check` sub command.
pub fn run(common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!(
        "Checking annotation store\ncommon args: {:#?}\nargs: {:#?}",
        common,
        args
    );

    let store = RocksStore::open(&args.path_db)?;
    let meta = store.meta();
    tracing::info!("Database version: {}, created: {}", &meta.version, &meta.created);
    tracing::info!("Table sizes:");
    tracing::info!("  comparison: {}", meta.comparison_count.separate_with_commas());
    tracing::info!("  hg19_vep:   {}", meta.hg19_vep_count.separate_with_commas());
    tracing::info!("  hg38_vep:   {}", meta.hg38_vep_count.separate_with_commas());

    let report = check_store(&store, args.sample_count)?;
    if report.comparison_count != meta.comparison_count {
        tracing::warn!(
            "comparison table holds {} rows but meta data announces {}",
            report.comparison_count,
            meta.comparison_count
        );
    }
    tracing::info!(
        "Lifted over: {} of {} variants",
        report.lifted_count.separate_with_commas(),
        report.comparison_count.separate_with_commas()
    );
    for (build, stats) in [
        (GenomeBuild::Hg19, report.hg19_join),
        (GenomeBuild::Hg38, report.hg38_join),
    ] {
        tracing::info!(
            "Join with {}_vep: {} of {} variants ({:.1}%)",
            build,
            stats.joined.separate_with_commas(),
            stats.queried.separate_with_commas(),
            stats.rate()
        );
    }
    for sample in &report.samples {
        tracing::info!("Sample: {}", serde_json::to_string_pretty(sample)?);
    }

    tracing::info!("Done checking annotation store");
    Ok(())
}
