//! Commonly used code.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use parse_display::{Display, FromStr};

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug, Default)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

/// The genome builds that are compared against each other.
#[derive(
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    FromStr,
    strum::EnumIter,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GenomeBuild {
    /// The source build (GRCh37).
    Hg19,
    /// The target build (GRCh38).
    Hg38,
}

impl GenomeBuild {
    /// Name of the VEP relation for this build in the annotation store.
    pub fn vep_table(&self) -> &'static str {
        match self {
            GenomeBuild::Hg19 => "hg19_vep",
            GenomeBuild::Hg38 => "hg38_vep",
        }
    }
}

/// Strip a leading `chr` from a chromosome name.
///
/// Both relations of the annotation store key on the bare name.
pub fn normalize_chrom(chrom: &str) -> &str {
    let chrom = chrom.trim();
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

/// Returns whether a raw annotation value carries information.
///
/// VEP and pandas-exported tables use empty strings, `-`, and `nan`/`NA` as missing markers.
pub fn is_present(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "-" || value.eq_ignore_ascii_case("nan") || value == "NA")
}

/// Return the first value from `candidates` that carries information, or the empty string.
pub fn first_present<'a, I>(candidates: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|value| is_present(value))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// The version of `crossbuild-assessor` package.
#[cfg(not(test))]
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// This allows us to override the version to `0.0.0` in tests.
pub fn version() -> &'static str {
    #[cfg(test)]
    return "0.0.0";
    #[cfg(not(test))]
    return VERSION;
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn genome_build_display() -> Result<(), anyhow::Error> {
        assert_eq!(format!("{}", GenomeBuild::Hg19), "hg19");
        assert_eq!(GenomeBuild::from_str("hg38")?, GenomeBuild::Hg38);
        assert_eq!(GenomeBuild::Hg38.vep_table(), "hg38_vep");

        Ok(())
    }

    #[rstest::rstest]
    #[case("chr1", "1")]
    #[case("1", "1")]
    #[case(" chrX ", "X")]
    #[case("MT", "MT")]
    fn normalize_chrom(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(super::normalize_chrom(input), expected);
    }

    #[rstest::rstest]
    #[case("", false)]
    #[case("-", false)]
    #[case("nan", false)]
    #[case("NA", false)]
    #[case("BRCA1", true)]
    fn is_present(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(super::is_present(input), expected);
    }

    #[test]
    fn first_present_prefers_earlier_sources() {
        assert_eq!(first_present([Some("-"), Some("TP53"), Some("MDM2")]), "TP53");
        assert_eq!(first_present([None, Some(""), Some("MDM2")]), "MDM2");
        assert_eq!(first_present([None, Some("-")]), "");
    }
}
