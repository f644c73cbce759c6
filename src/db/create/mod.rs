//! Creation of the annotation store from the liftover comparison and VEP TSV files.

use clap::Parser;
use thousands::Separable;

use crate::{
    common::GenomeBuild,
    store::{
        reading::{for_each_comparison, for_each_vep},
        rocks::{Meta, RocksWriter},
    },
};

/// Command line arguments for `db create` sub command.
#[derive(Parser, Debug)]
#[command(about = "Build annotation store from liftover comparison and VEP TSV files", long_about = None)]
pub struct Args {
    /// Path to the liftover comparison TSV file.
    #[arg(long)]
    pub path_comparison_tsv: String,
    /// Path to the VEP TSV output for hg19.
    #[arg(long)]
    pub path_hg19_vep_tsv: String,
    /// Path to the VEP TSV output for hg38.
    #[arg(long)]
    pub path_hg38_vep_tsv: String,
    /// Path to the output RocksDB directory.
    #[arg(long)]
    pub path_output_db: String,

    /// For debug purposes, maximal number of records to import per input file.
    #[arg(long)]
    pub max_var_count: Option<usize>,
}

/// Import all three input files into a fresh database at `args.path_output_db`.
fn import(args: &Args) -> Result<Meta, anyhow::Error> {
    tracing::info!("Opening output database {}", &args.path_output_db);
    let mut writer = RocksWriter::create(&args.path_output_db)?;

    tracing::info!("Importing comparison table ...");
    for_each_comparison(&args.path_comparison_tsv, args.max_var_count, |record| {
        writer.put_comparison(&record)
    })?;

    for (build, path) in [
        (GenomeBuild::Hg19, &args.path_hg19_vep_tsv),
        (GenomeBuild::Hg38, &args.path_hg38_vep_tsv),
    ] {
        tracing::info!("Importing {} VEP table ...", build);
        for_each_vep(path, args.max_var_count, |record| {
            writer.put_vep(build, &record)
        })?;
    }

    writer.finish()
}

/// Main entry point for `db create` sub command.
pub fn run(common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!(
        "Building annotation store\ncommon args: {:#?}\nargs: {:#?}",
        common,
        args
    );

    if std::path::Path::new(&args.path_output_db).exists() {
        anyhow::bail!(
            "output database {} already exists, refusing to overwrite",
            &args.path_output_db
        );
    }

    let before = std::time::Instant::now();
    let meta = import(args)?;
    tracing::info!(
        "Done building annotation store in {:?}: {} comparison, {} hg19 VEP, {} hg38 VEP records",
        before.elapsed(),
        meta.comparison_count.separate_with_commas(),
        meta.hg19_vep_count.separate_with_commas(),
        meta.hg38_vep_count.separate_with_commas(),
    );

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::{AnnotationStore, RocksStore};

    fn args(path_output_db: String) -> Args {
        Args {
            path_comparison_tsv: String::from("tests/data/comparison.tsv"),
            path_hg19_vep_tsv: String::from("tests/data/hg19_vep.tsv"),
            path_hg38_vep_tsv: String::from("tests/data/hg38_vep.tsv"),
            path_output_db,
            max_var_count: None,
        }
    }

    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path_output_db = format!("{}", tmp_dir.join("db").display());

        run(&Default::default(), &args(path_output_db.clone()))?;

        let store = RocksStore::open(&path_output_db)?;
        assert_eq!(store.meta().version, "0.0.0");
        assert_eq!(store.comparison_count(), Some(5));
        assert_eq!(store.comparisons().count(), 5);
        let annotations = store.annotations(GenomeBuild::Hg19, "1", 1000)?;
        assert_eq!(annotations[0].feature, "ENST00000001.3");

        Ok(())
    }

    #[test]
    fn run_refuses_existing() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path_output_db = format!("{}", tmp_dir.join("db").display());
        std::fs::create_dir_all(&path_output_db)?;

        assert!(run(&Default::default(), &args(path_output_db)).is_err());

        Ok(())
    }

    #[test]
    fn run_max_var_count() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path_output_db = format!("{}", tmp_dir.join("db").display());

        run(
            &Default::default(),
            &Args {
                max_var_count: Some(2),
                ..args(path_output_db.clone())
            },
        )?;

        let store = RocksStore::open(&path_output_db)?;
        assert_eq!(store.meta().comparison_count, 2);
        assert_eq!(store.meta().hg19_vep_count, 2);

        Ok(())
    }
}
