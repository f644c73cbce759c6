//! Result cache for the unscored analysis records.
//!
//! The cache is a gzip-compressed JSON lines file.  The first line is a [`Header`], followed by
//! one [`VariantAnalysisRecord`] per line.

use std::{
    io::{BufRead, Write},
    path::Path,
};

use thousands::Separable;

use crate::common::io::std::{open_read_maybe_gz, open_write_maybe_gz};

use super::VariantAnalysisRecord;

/// File name of the cache within the output directory.
pub const CACHE_FILE_NAME: &str = "variant_analysis_cache.jsonl.gz";

/// First line of the cache file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Header {
    /// Version of the package that wrote the cache.
    pub version: String,
    /// Number of records that follow.
    pub record_count: usize,
    /// Creation timestamp in RFC 3339.
    pub created: String,
}

fn read_records(path: &Path) -> Result<Vec<VariantAnalysisRecord>, anyhow::Error> {
    let mut lines = open_read_maybe_gz(path)?.lines();
    let header: Header = match lines.next() {
        Some(line) => serde_json::from_str(&line?)?,
        None => anyhow::bail!("empty cache file"),
    };
    if header.version != crate::common::version() {
        anyhow::bail!(
            "cache was written by version {}, this is {}",
            &header.version,
            crate::common::version()
        );
    }

    let records = lines
        .map(|line| -> Result<VariantAnalysisRecord, anyhow::Error> {
            Ok(serde_json::from_str(&line?)?)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if records.len() != header.record_count {
        anyhow::bail!(
            "cache announces {} records but holds {}",
            header.record_count,
            records.len()
        );
    }

    Ok(records)
}

/// Load the cached records from `path`.
///
/// Returns `None` if the cache is not usable: `force` is set, the file is missing, it cannot be
/// parsed, or its header does not match the content or the running version.
pub fn load<P: AsRef<Path>>(path: P, force: bool) -> Option<Vec<VariantAnalysisRecord>> {
    let path = path.as_ref();
    if force {
        tracing::info!("Ignoring cache because recomputation was forced");
        return None;
    }
    if !path.exists() {
        tracing::info!("No cache found at {}", path.display());
        return None;
    }

    match read_records(path) {
        Ok(records) => {
            tracing::info!(
                "Loaded {} cached variant analyses from {}",
                records.len().separate_with_commas(),
                path.display()
            );
            Some(records)
        }
        Err(e) => {
            tracing::warn!(
                "Could not load cache {} ({}), recomputing",
                path.display(),
                e
            );
            None
        }
    }
}

fn write_records(path: &Path, records: &[VariantAnalysisRecord]) -> Result<(), anyhow::Error> {
    let mut writer = open_write_maybe_gz(path)?;
    let header = Header {
        version: crate::common::version().to_string(),
        record_count: records.len(),
        created: chrono::Local::now().to_rfc3339(),
    };
    writeln!(writer, "{}", serde_json::to_string(&header)?)?;
    for record in records {
        writeln!(writer, "{}", serde_json::to_string(record)?)?;
    }
    writer.flush()?;
    Ok(())
}

/// Save the records to `path`.
///
/// Failures are logged and otherwise ignored; the caller keeps working on the in-memory records.
pub fn save<P: AsRef<Path>>(path: P, records: &[VariantAnalysisRecord]) {
    let path = path.as_ref();
    match write_records(path, records) {
        Ok(()) => tracing::info!(
            "Cached {} variant analyses to {}",
            records.len().separate_with_commas(),
            path.display()
        ),
        Err(e) => tracing::warn!("Could not save cache to {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::analyze::{clinical::ClinicalCategory, VariantLocus};

    fn records() -> Vec<VariantAnalysisRecord> {
        (1..=3)
            .map(|i| {
                let mut record = VariantAnalysisRecord {
                    locus: VariantLocus {
                        source_chrom: "1".into(),
                        source_pos: i * 100,
                        source_alleles: "C/T".into(),
                        target_chrom: "1".into(),
                        target_pos: i * 100 + 5,
                    },
                    ..Default::default()
                };
                record.hg38.clin_sig_normalized = ClinicalCategory::Pathogenic;
                record.hg19.gnomad_af = Some(0.25);
                record
            })
            .collect()
    }

    #[test]
    fn save_then_load() {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join(CACHE_FILE_NAME);

        save(&path, &records());

        assert_eq!(load(&path, false), Some(records()));
        assert_eq!(load(&path, true), None);
    }

    #[tracing_test::traced_test]
    #[test]
    fn load_missing() {
        let tmp_dir = temp_testdir::TempDir::default();

        assert_eq!(load(tmp_dir.join(CACHE_FILE_NAME), false), None);
        assert!(logs_contain("No cache found"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn load_corrupt() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("cache.jsonl");
        std::fs::write(&path, "this is not json\n")?;

        assert_eq!(load(&path, false), None);
        assert!(logs_contain("Could not load cache"));

        Ok(())
    }

    #[test]
    fn load_count_mismatch() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("cache.jsonl");
        let header = Header {
            version: crate::common::version().to_string(),
            record_count: 5,
            created: String::from("2024-01-01T00:00:00+00:00"),
        };
        let mut content = serde_json::to_string(&header)?;
        content.push('\n');
        for record in records() {
            content.push_str(&serde_json::to_string(&record)?);
            content.push('\n');
        }
        std::fs::write(&path, content)?;

        assert_eq!(load(&path, false), None);

        Ok(())
    }

    #[test]
    fn load_version_mismatch() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("cache.jsonl");
        let header = Header {
            version: String::from("0.0.0-other"),
            record_count: 0,
            created: String::from("2024-01-01T00:00:00+00:00"),
        };
        std::fs::write(&path, format!("{}\n", serde_json::to_string(&header)?))?;

        assert_eq!(load(&path, false), None);

        Ok(())
    }

    #[tracing_test::traced_test]
    #[test]
    fn save_to_missing_directory_only_warns() {
        let tmp_dir = temp_testdir::TempDir::default();

        save(tmp_dir.join("missing").join(CACHE_FILE_NAME), &records());

        assert!(logs_contain("Could not save cache"));
    }
}
