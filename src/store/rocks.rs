//! Annotation store backed by RocksDB.

use std::{path::Path, time::Instant};

use rocksdb::{ColumnFamily, DBWithThreadMode, Direction, IteratorMode, SingleThreaded};

use crate::common::{normalize_chrom, GenomeBuild};

use super::{AnnotationStore, ComparisonRecord, VepAnnotation};

/// Column family with the meta information.
pub const CF_META: &str = "meta";
/// Column family with the liftover comparison, keyed by insertion index.
pub const CF_COMPARISON: &str = "comparison";

/// All column families that a valid database must have.
pub const REQUIRED_CFS: &[&str] = &[CF_META, CF_COMPARISON, "hg19_vep", "hg38_vep"];

/// Key of the meta record in the meta column family.
const META_KEY: &str = "meta";

/// The database type used throughout.
pub type Db = DBWithThreadMode<SingleThreaded>;

/// Meta information written on creation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Meta {
    /// Version of the tool that built the database.
    pub version: String,
    /// Creation timestamp in RFC 3339.
    pub created: String,
    /// Number of rows in the comparison relation.
    pub comparison_count: usize,
    /// Number of rows in the hg19 VEP relation.
    pub hg19_vep_count: usize,
    /// Number of rows in the hg38 VEP relation.
    pub hg38_vep_count: usize,
}

/// Key of a comparison row: big-endian insertion index so iteration preserves input order.
pub fn comparison_key(idx: u64) -> [u8; 8] {
    idx.to_be_bytes()
}

/// Key prefix of all VEP rows at a position.
pub fn vep_key_prefix(chrom: &str, pos: i64) -> String {
    format!("{}:{:010}:", normalize_chrom(chrom), pos)
}

/// Key of one VEP row; the row index keeps multiple rows per position apart.
pub fn vep_key(chrom: &str, pos: i64, row: u64) -> String {
    format!("{}{:010}", vep_key_prefix(chrom, pos), row)
}

fn cf_handle<'a>(db: &'a Db, name: &str) -> Result<&'a ColumnFamily, anyhow::Error> {
    db.cf_handle(name)
        .ok_or_else(|| anyhow::anyhow!("column family {} not found in database", name))
}

/// Read-only annotation store on a RocksDB database built by `db create`.
pub struct RocksStore {
    db: Db,
    meta: Meta,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .field("meta", &self.meta)
            .finish()
    }
}

impl RocksStore {
    /// Open the database at `path` read-only.
    ///
    /// Fails if the path does not exist or if any of the required tables is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("database not found at {}", path.display());
        }

        let options = rocksdb::Options::default();
        let cf_names = Db::list_cf(&options, path)
            .map_err(|e| anyhow::anyhow!("could not list tables of {}: {}", path.display(), e))?;
        let missing = REQUIRED_CFS
            .iter()
            .filter(|name| !cf_names.iter().any(|cf_name| cf_name == *name))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            anyhow::bail!(
                "missing required tables in database {}: {:?}",
                path.display(),
                missing
            );
        }

        let db = Db::open_cf_for_read_only(&options, path, REQUIRED_CFS, false)?;
        let raw_meta = db
            .get_cf(cf_handle(&db, CF_META)?, META_KEY)?
            .ok_or_else(|| anyhow::anyhow!("no meta information in {}", path.display()))?;
        let meta = serde_json::from_slice(&raw_meta)?;

        Ok(Self { db, meta })
    }

    /// Meta information of the database.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }
}

impl AnnotationStore for RocksStore {
    fn comparison_count(&self) -> Option<usize> {
        Some(self.meta.comparison_count)
    }

    fn comparisons(
        &self,
    ) -> Box<dyn Iterator<Item = Result<ComparisonRecord, anyhow::Error>> + '_> {
        let cf = match cf_handle(&self.db, CF_COMPARISON) {
            Ok(cf) => cf,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };
        Box::new(
            self.db
                .iterator_cf(cf, IteratorMode::Start)
                .map(|item| -> Result<ComparisonRecord, anyhow::Error> {
                    let (_, value) = item?;
                    Ok(serde_json::from_slice(&value)?)
                }),
        )
    }

    fn annotations(
        &self,
        build: GenomeBuild,
        chrom: &str,
        pos: i64,
    ) -> Result<Vec<VepAnnotation>, anyhow::Error> {
        let cf = cf_handle(&self.db, build.vep_table())?;
        let prefix = vep_key_prefix(chrom, pos);
        let mut result = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            result.push(serde_json::from_slice(&value)?);
        }
        Ok(result)
    }
}

/// Writer used for building a fresh database.
pub struct RocksWriter {
    db: Db,
    comparison_count: u64,
    hg19_vep_count: u64,
    hg38_vep_count: u64,
}

impl RocksWriter {
    /// Create the database at `path`, tuned for bulk loading.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let mut options = rocksdb::Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);
        options.prepare_for_bulk_load();
        options.set_disable_auto_compactions(true);
        let db = Db::open_cf(&options, path, REQUIRED_CFS)?;

        Ok(Self {
            db,
            comparison_count: 0,
            hg19_vep_count: 0,
            hg38_vep_count: 0,
        })
    }

    /// Append one comparison row.
    pub fn put_comparison(&mut self, record: &ComparisonRecord) -> Result<(), anyhow::Error> {
        let cf = cf_handle(&self.db, CF_COMPARISON)?;
        self.db.put_cf(
            cf,
            comparison_key(self.comparison_count),
            serde_json::to_vec(record)?,
        )?;
        self.comparison_count += 1;
        Ok(())
    }

    /// Append one VEP row of `build`.
    pub fn put_vep(
        &mut self,
        build: GenomeBuild,
        record: &VepAnnotation,
    ) -> Result<(), anyhow::Error> {
        let count = match build {
            GenomeBuild::Hg19 => &mut self.hg19_vep_count,
            GenomeBuild::Hg38 => &mut self.hg38_vep_count,
        };
        let cf = cf_handle(&self.db, build.vep_table())?;
        self.db.put_cf(
            cf,
            vep_key(&record.chrom, record.pos, *count),
            serde_json::to_vec(record)?,
        )?;
        *count += 1;
        Ok(())
    }

    /// Write the meta information, compact, and close the database.
    pub fn finish(self) -> Result<Meta, anyhow::Error> {
        let meta = Meta {
            version: crate::common::version().to_string(),
            created: chrono::Local::now().to_rfc3339(),
            comparison_count: self.comparison_count as usize,
            hg19_vep_count: self.hg19_vep_count as usize,
            hg38_vep_count: self.hg38_vep_count as usize,
        };
        tracing::info!("Writing meta data to database");
        self.db.put_cf(
            cf_handle(&self.db, CF_META)?,
            META_KEY,
            serde_json::to_vec(&meta)?,
        )?;

        tracing::info!("Enforcing manual compaction");
        for name in REQUIRED_CFS {
            self.db
                .compact_range_cf(cf_handle(&self.db, name)?, None::<&[u8]>, None::<&[u8]>);
        }

        let compaction_start = Instant::now();
        let mut last_printed = compaction_start;
        while self
            .db
            .property_int_value(rocksdb::properties::COMPACTION_PENDING)?
            .unwrap_or(0)
            > 0
            || self
                .db
                .property_int_value(rocksdb::properties::NUM_RUNNING_COMPACTIONS)?
                .unwrap_or(0)
                > 0
        {
            std::thread::sleep(std::time::Duration::from_millis(100));
            if last_printed.elapsed() > std::time::Duration::from_millis(1000) {
                tracing::info!(
                    "... waiting for compaction for {:?}",
                    compaction_start.elapsed()
                );
                last_printed = Instant::now();
            }
        }

        Ok(meta)
    }
}
