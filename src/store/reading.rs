//! Reading of the liftover comparison and VEP TSV files.

use std::{
    collections::HashSet,
    io::{BufRead, Cursor, Read},
};

use thousands::Separable;

use crate::common::{io::std::open_read_maybe_gz, is_present, normalize_chrom};

use super::{ComparisonRecord, VepAnnotation};

/// Columns that must be present in the comparison TSV file.
pub const REQUIRED_COMPARISON_COLUMNS: &[&str] = &[
    "mapping_status",
    "source_chrom",
    "source_pos",
    "source_alleles",
    "flip",
    "swap",
    "bcftools_hg38_chrom",
    "bcftools_hg38_pos",
    "bcftools_hg38_ref",
    "bcftools_hg38_alt",
    "pos_match",
    "gt_match",
];

/// Columns that must be present in a VEP TSV file (after stripping the leading `#`).
pub const REQUIRED_VEP_COLUMNS: &[&str] = &[
    "Uploaded_variation",
    "Location",
    "Feature",
    "Feature_type",
    "Consequence",
];

/// Maximal number of skipped rows that are logged individually.
const MAX_SKIP_WARNINGS: usize = 10;

/// Raw row of the comparison TSV file, all fields optional as written by pandas.
#[derive(Debug, serde::Deserialize)]
struct ComparisonRow {
    mapping_status: Option<String>,
    source_chrom: Option<String>,
    source_pos: Option<String>,
    source_alleles: Option<String>,
    flip: Option<String>,
    swap: Option<String>,
    #[serde(default)]
    liftover_hg38_chrom: Option<String>,
    #[serde(default)]
    liftover_hg38_pos: Option<String>,
    bcftools_hg38_chrom: Option<String>,
    bcftools_hg38_pos: Option<String>,
    bcftools_hg38_ref: Option<String>,
    bcftools_hg38_alt: Option<String>,
    pos_match: Option<String>,
    gt_match: Option<String>,
}

/// Raw row of a VEP TSV file.
#[derive(Debug, serde::Deserialize)]
struct VepRow {
    #[serde(rename = "Uploaded_variation")]
    uploaded_variation: String,
    #[serde(rename = "Location")]
    location: String,
    #[serde(rename = "Feature_type", default)]
    feature_type: String,
    #[serde(rename = "Feature", default)]
    feature: String,
    #[serde(rename = "Consequence", default)]
    consequence: String,
    #[serde(rename = "IMPACT", default)]
    impact: String,
    #[serde(rename = "SYMBOL", default)]
    symbol: String,
    #[serde(rename = "SIFT", default)]
    sift: String,
    #[serde(rename = "PolyPhen", default)]
    polyphen: String,
    #[serde(rename = "gnomADg_AF", default)]
    gnomadg_af: String,
    #[serde(rename = "CLIN_SIG", default)]
    clin_sig: String,
    #[serde(rename = "HGVSc", default)]
    hgvsc: String,
    #[serde(rename = "HGVSp", default)]
    hgvsp: String,
    #[serde(rename = "CANONICAL", default)]
    canonical: String,
    #[serde(rename = "MANE_SELECT", default)]
    mane_select: String,
    #[serde(rename = "MANE_PLUS_CLINICAL", default)]
    mane_plus_clinical: String,
}

/// Counters collected while reading an input file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadStats {
    /// Records handed to the sink.
    pub records: usize,
    /// Rows skipped for lack of a usable position.
    pub skipped: usize,
    /// Rows skipped because they could not be parsed.
    pub malformed: usize,
    /// Rows skipped as duplicates.
    pub duplicates: usize,
    /// Rows whose coordinates were shifted to VEP convention.
    pub adjusted: usize,
}

/// Parse a position that may have been written as a float by pandas.
pub fn parse_pos(value: &str) -> Option<i64> {
    let value = value.trim();
    if !is_present(value) {
        return None;
    }
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|pos| pos.is_finite() && pos.fract() == 0.0)
            .map(|pos| pos as i64)
    })
}

/// Interpret a boolean-ish column value (`TRUE`, `true`, `1`).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "1.0"
    )
}

/// Convert comma-separated `REF,ALT` alleles to VEP notation.
///
/// VEP strips the common leading base of indels and writes the empty allele as `-`.
pub fn vep_alleles(alleles: &str) -> Option<(String, String)> {
    let (reference, alternative) = match alleles.split(',').collect::<Vec<_>>().as_slice() {
        [reference, alternative] => (reference.trim(), alternative.trim()),
        _ => return None,
    };

    let result = if reference.len() < alternative.len() && alternative.starts_with(reference) {
        ("-".to_string(), alternative[reference.len()..].to_string())
    } else if reference.len() > alternative.len() {
        if alternative.is_empty() {
            (reference.to_string(), "-".to_string())
        } else if reference.starts_with(alternative) {
            (reference[alternative.len()..].to_string(), "-".to_string())
        } else {
            (reference.to_string(), alternative.to_string())
        }
    } else {
        (reference.to_string(), alternative.to_string())
    };
    Some(result)
}

/// Shift a position to VEP convention: indels move by one, SNVs stay.
pub fn vep_pos(pos: i64, reference: &str, alternative: &str) -> i64 {
    if reference == "-" || alternative == "-" {
        pos + 1
    } else {
        pos
    }
}

/// Parse a VEP `Uploaded_variation` of the form `chr_pos_ref/alt`.
///
/// Returns chromosome (without `chr` prefix), position, and the `ref/alt` alleles.
pub fn parse_uploaded_variation(value: &str) -> Option<(String, i64, String)> {
    let parts = value.trim().split('_').collect::<Vec<_>>();
    (1..parts.len().saturating_sub(1))
        .find(|&i| !parts[i].is_empty() && parts[i].bytes().all(|b| b.is_ascii_digit()))
        .and_then(|i| {
            let alleles = parts[i + 1..].join("_");
            if !alleles.contains('/') {
                return None;
            }
            let chrom = parts[..i].join("_");
            let pos = parts[i].parse::<i64>().ok()?;
            Some((normalize_chrom(&chrom).to_string(), pos, alleles))
        })
}

/// Parse a VEP `Location` of the form `chrom:start` or `chrom:start-end`.
pub fn parse_location(value: &str) -> Option<(String, i64)> {
    let (chrom, range) = value.trim().split_once(':')?;
    let start = range.split('-').next()?;
    Some((normalize_chrom(chrom).to_string(), start.trim().parse::<i64>().ok()?))
}

/// Bail out if any of `required` is missing from `headers`.
fn check_columns(
    path: &str,
    kind: &str,
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<(), anyhow::Error> {
    let missing = required
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        anyhow::bail!(
            "missing required columns in {} file {}: {:?}",
            kind,
            path,
            missing
        );
    }
    Ok(())
}

/// Read the comparison TSV file and hand each usable record to `sink`.
///
/// Alleles and coordinates are converted to VEP convention.  Rows without a source position
/// are skipped, as are repeated `(source_chrom, source_pos, source_alleles)` keys.
pub fn for_each_comparison<F>(
    path: &str,
    max_count: Option<usize>,
    mut sink: F,
) -> Result<ReadStats, anyhow::Error>
where
    F: FnMut(ComparisonRecord) -> Result<(), anyhow::Error>,
{
    tracing::info!("Loading comparison data from {}", path);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(open_read_maybe_gz(path)?);
    check_columns(
        path,
        "comparison",
        reader.headers()?,
        REQUIRED_COMPARISON_COLUMNS,
    )?;

    let mut stats = ReadStats::default();
    let mut seen = HashSet::new();
    for row in reader.deserialize() {
        if max_count.is_some_and(|max_count| stats.records >= max_count) {
            tracing::warn!("Stopping after {} records as requested", stats.records);
            break;
        }
        let row: ComparisonRow = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                stats.malformed += 1;
                if stats.malformed <= MAX_SKIP_WARNINGS {
                    tracing::warn!("Skipping malformed comparison row: {}", e);
                }
                continue;
            }
        };

        let source_chrom = row.source_chrom.unwrap_or_default();
        let source_alleles = row.source_alleles.unwrap_or_default();
        let Some(source_pos) = row.source_pos.as_deref().and_then(parse_pos) else {
            stats.skipped += 1;
            if stats.skipped <= MAX_SKIP_WARNINGS {
                tracing::warn!(
                    "Skipping variant with missing source position: {}:{:?}",
                    &source_chrom,
                    &row.source_pos
                );
            }
            continue;
        };
        let liftover_hg38_pos = row.liftover_hg38_pos.as_deref().and_then(parse_pos);
        let bcftools_hg38_pos = row.bcftools_hg38_pos.as_deref().and_then(parse_pos);

        let record = match vep_alleles(&source_alleles) {
            Some((reference, alternative)) => {
                let shift = |pos: i64| vep_pos(pos, &reference, &alternative);
                if shift(source_pos) != source_pos {
                    stats.adjusted += 1;
                }
                ComparisonRecord {
                    source_pos: shift(source_pos),
                    liftover_hg38_pos: liftover_hg38_pos.map(shift),
                    bcftools_hg38_pos: bcftools_hg38_pos.map(shift),
                    source_alleles: format!("{}/{}", reference, alternative),
                    ..Default::default()
                }
            }
            None => ComparisonRecord {
                source_pos,
                liftover_hg38_pos,
                bcftools_hg38_pos,
                source_alleles: source_alleles.clone(),
                ..Default::default()
            },
        };
        let record = ComparisonRecord {
            mapping_status: row.mapping_status.unwrap_or_default(),
            source_chrom: normalize_chrom(&source_chrom).to_string(),
            flip: row.flip.unwrap_or_default(),
            swap: row.swap.unwrap_or_default(),
            liftover_hg38_chrom: row
                .liftover_hg38_chrom
                .map(|chrom| normalize_chrom(&chrom).to_string()),
            bcftools_hg38_chrom: row
                .bcftools_hg38_chrom
                .map(|chrom| normalize_chrom(&chrom).to_string()),
            bcftools_hg38_ref: row.bcftools_hg38_ref.unwrap_or_default(),
            bcftools_hg38_alt: row.bcftools_hg38_alt.unwrap_or_default(),
            pos_match: row.pos_match.as_deref().is_some_and(parse_flag),
            gt_match: row.gt_match.as_deref().is_some_and(parse_flag),
            ..record
        };

        let key = (
            record.source_chrom.clone(),
            record.source_pos,
            record.source_alleles.clone(),
        );
        if !seen.insert(key) {
            stats.duplicates += 1;
            continue;
        }

        sink(record)?;
        stats.records += 1;
    }

    tracing::info!(
        "... read {} comparison records ({} malformed, {} without position, {} duplicates, {} \
        shifted to VEP coordinates)",
        stats.records.separate_with_commas(),
        stats.malformed.separate_with_commas(),
        stats.skipped.separate_with_commas(),
        stats.duplicates.separate_with_commas(),
        stats.adjusted.separate_with_commas(),
    );
    Ok(stats)
}

/// Read the comparison TSV file into memory.
pub fn read_comparison_tsv(
    path: &str,
    max_count: Option<usize>,
) -> Result<Vec<ComparisonRecord>, anyhow::Error> {
    let mut result = Vec::new();
    for_each_comparison(path, max_count, |record| {
        result.push(record);
        Ok(())
    })?;
    Ok(result)
}

/// Skip `##` meta lines and return the `#Uploaded_variation` header without the leading `#`.
fn read_vep_header(path: &str, reader: &mut dyn BufRead) -> Result<String, anyhow::Error> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            anyhow::bail!(
                "could not find VEP header line starting with '#Uploaded_variation' in {}",
                path
            );
        }
        if line.starts_with("##") {
            continue;
        } else if line.starts_with("#Uploaded_variation") {
            return Ok(line[1..].to_string());
        } else {
            anyhow::bail!(
                "expected VEP header line starting with '#Uploaded_variation' in {}, got {:?}",
                path,
                line.trim_end()
            );
        }
    }
}

/// Read a VEP TSV file and hand each usable record to `sink`.
pub fn for_each_vep<F>(
    path: &str,
    max_count: Option<usize>,
    mut sink: F,
) -> Result<ReadStats, anyhow::Error>
where
    F: FnMut(VepAnnotation) -> Result<(), anyhow::Error>,
{
    tracing::info!("Loading VEP data from {}", path);
    let mut input = open_read_maybe_gz(path)?;
    let header = read_vep_header(path, input.as_mut())?;
    let chained: Box<dyn Read> = Box::new(Cursor::new(header.into_bytes()).chain(input));
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .quoting(false)
        .from_reader(chained);
    check_columns(path, "VEP", reader.headers()?, REQUIRED_VEP_COLUMNS)?;

    let mut stats = ReadStats::default();
    for row in reader.deserialize() {
        if max_count.is_some_and(|max_count| stats.records >= max_count) {
            tracing::warn!("Stopping after {} records as requested", stats.records);
            break;
        }
        let row: VepRow = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                stats.malformed += 1;
                if stats.malformed <= MAX_SKIP_WARNINGS {
                    tracing::warn!("Skipping malformed VEP row: {}", e);
                }
                continue;
            }
        };

        let Some((chrom, pos, alleles)) = parse_uploaded_variation(&row.uploaded_variation)
            .or_else(|| {
                parse_location(&row.location).map(|(chrom, pos)| (chrom, pos, String::new()))
            })
        else {
            stats.skipped += 1;
            if stats.skipped <= MAX_SKIP_WARNINGS {
                tracing::warn!(
                    "Skipping VEP row with unparseable variant {:?} / location {:?}",
                    &row.uploaded_variation,
                    &row.location
                );
            }
            continue;
        };

        let keep = |value: String| if is_present(&value) { value } else { String::new() };
        sink(VepAnnotation {
            chrom,
            pos,
            alleles,
            feature_type: keep(row.feature_type),
            feature: keep(row.feature),
            consequence: keep(row.consequence),
            impact: keep(row.impact),
            symbol: keep(row.symbol),
            sift: keep(row.sift),
            polyphen: keep(row.polyphen),
            gnomadg_af: Some(row.gnomadg_af.trim())
                .filter(|value| is_present(value))
                .and_then(|value| value.parse::<f64>().ok()),
            clin_sig: keep(row.clin_sig),
            hgvsc: keep(row.hgvsc),
            hgvsp: keep(row.hgvsp),
            canonical: row.canonical.trim().eq_ignore_ascii_case("YES"),
            mane_select: keep(row.mane_select),
            mane_plus_clinical: keep(row.mane_plus_clinical),
        })?;
        stats.records += 1;
    }

    tracing::info!(
        "... read {} VEP records ({} malformed, {} skipped)",
        stats.records.separate_with_commas(),
        stats.malformed.separate_with_commas(),
        stats.skipped.separate_with_commas()
    );
    Ok(stats)
}

/// Read a VEP TSV file into memory.
pub fn read_vep_tsv(
    path: &str,
    max_count: Option<usize>,
) -> Result<Vec<VepAnnotation>, anyhow::Error> {
    let mut result = Vec::new();
    for_each_vep(path, max_count, |record| {
        result.push(record);
        Ok(())
    })?;
    Ok(result)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[rstest::rstest]
    #[case("A,G", Some(("A", "G")))]
    #[case("A,AG", Some(("-", "G")))]
    #[case("AGC,A", Some(("GC", "-")))]
    #[case("AGC,", Some(("AGC", "-")))]
    #[case("AGC,TT", Some(("AGC", "TT")))]
    #[case("A/G", None)]
    #[case("A,G,T", None)]
    fn vep_alleles(#[case] input: &str, #[case] expected: Option<(&str, &str)>) {
        assert_eq!(
            super::vep_alleles(input),
            expected.map(|(r, a)| (r.to_string(), a.to_string()))
        );
    }

    #[rstest::rstest]
    #[case(100, "A", "G", 100)]
    #[case(100, "-", "G", 101)]
    #[case(100, "GC", "-", 101)]
    fn vep_pos(#[case] pos: i64, #[case] r: &str, #[case] a: &str, #[case] expected: i64) {
        assert_eq!(super::vep_pos(pos, r, a), expected);
    }

    #[rstest::rstest]
    #[case("1_69134_A/G", Some(("1", 69134, "A/G")))]
    #[case("chrX_100_-/TT", Some(("X", 100, "-/TT")))]
    #[case("rs12345", None)]
    #[case("1_abc_A/G", None)]
    fn parse_uploaded_variation(
        #[case] input: &str,
        #[case] expected: Option<(&str, i64, &str)>,
    ) {
        assert_eq!(
            super::parse_uploaded_variation(input),
            expected.map(|(c, p, a)| (c.to_string(), p, a.to_string()))
        );
    }

    #[rstest::rstest]
    #[case("1:69134", Some(("1", 69134)))]
    #[case("chr2:100-101", Some(("2", 100)))]
    #[case("garbage", None)]
    fn parse_location(#[case] input: &str, #[case] expected: Option<(&str, i64)>) {
        assert_eq!(
            super::parse_location(input),
            expected.map(|(c, p)| (c.to_string(), p))
        );
    }

    #[rstest::rstest]
    #[case("12345", Some(12345))]
    #[case("12345.0", Some(12345))]
    #[case("12345.5", None)]
    #[case("", None)]
    #[case("nan", None)]
    fn parse_pos(#[case] input: &str, #[case] expected: Option<i64>) {
        assert_eq!(super::parse_pos(input), expected);
    }

    #[test]
    fn read_comparison_tsv() -> Result<(), anyhow::Error> {
        let records = super::read_comparison_tsv("tests/data/comparison.tsv", None)?;

        // One row lacks a source position and one is a duplicate.
        assert_eq!(records.len(), 5);
        let insertion = &records[2];
        assert_eq!(insertion.source_alleles, "-/G");
        assert_eq!(insertion.source_pos, 3001);
        assert_eq!(insertion.bcftools_hg38_pos, Some(3101));
        assert!(insertion.pos_match);
        assert!(!records[1].gt_match);
        assert_eq!(records[4].bcftools_hg38_pos, None);

        Ok(())
    }

    #[tracing_test::traced_test]
    #[test]
    fn for_each_comparison_skips_malformed_rows() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("comparison.tsv");
        let mut content = std::fs::read("tests/data/comparison.tsv")?;
        content.extend_from_slice(b"UNIQUE\tchr\xff\t6000\tA,G\t\t\t\t\t\t\t\t\tTRUE\tTRUE\n");
        content.extend_from_slice(b"UNIQUE\tchr4\t7000\tA,G\t\t\tchr4\t7100\tchr4\t7100\tA\tG\tTRUE\tTRUE\n");
        std::fs::write(&path, content)?;

        let mut records = Vec::new();
        let stats = for_each_comparison(&format!("{}", path.display()), None, |record| {
            records.push(record);
            Ok(())
        })?;

        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.records, 6);
        assert_eq!(records[5].source_pos, 7000);
        assert!(logs_contain("Skipping malformed comparison row"));

        Ok(())
    }

    #[test]
    fn read_comparison_tsv_missing_columns() {
        let err = super::read_comparison_tsv("tests/data/comparison_missing_columns.tsv", None)
            .expect_err("must fail");
        assert!(format!("{}", err).contains("gt_match"));
    }

    #[test]
    fn read_vep_tsv() -> Result<(), anyhow::Error> {
        let records = super::read_vep_tsv("tests/data/hg19_vep.tsv", None)?;

        assert!(!records.is_empty());
        let first = &records[0];
        assert_eq!(first.chrom, "1");
        assert_eq!(first.pos, 1000);
        assert_eq!(first.feature, "ENST00000001.3");
        assert_eq!(first.impact, "MODERATE");
        assert_eq!(first.gnomadg_af, Some(0.0012));
        assert!(first.canonical);
        assert!(records.iter().all(|record| record.sift != "-"));

        Ok(())
    }

    #[test]
    fn read_vep_tsv_without_header() {
        let err = super::read_vep_tsv("tests/data/comparison.tsv", None).expect_err("must fail");
        assert!(format!("{}", err).contains("#Uploaded_variation"));
    }
}
