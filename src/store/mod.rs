//! The annotation store holding the liftover comparison and the per-build VEP relations.

use std::collections::HashMap;

use crate::common::{normalize_chrom, GenomeBuild};

pub mod reading;
pub mod rocks;

pub use rocks::RocksStore;

/// One row of the liftover comparison relation.
///
/// Coordinates follow the VEP convention (SNVs at the original position, indels shifted by
/// one), which is established on ingestion.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ComparisonRecord {
    /// Mapping status reported by the liftover comparison (e.g., `UNIQUE`, `REGION`).
    pub mapping_status: String,
    /// Chromosome in the source build.
    pub source_chrom: String,
    /// Position in the source build.
    pub source_pos: i64,
    /// Alleles in the source build, `REF/ALT` in VEP notation.
    pub source_alleles: String,
    /// Strand flip flag as reported by bcftools.
    pub flip: String,
    /// Allele swap flag as reported by bcftools (`1` swapped, `-1` failed, empty for none).
    pub swap: String,
    /// Chromosome as lifted by CrossMap.
    pub liftover_hg38_chrom: Option<String>,
    /// Position as lifted by CrossMap.
    pub liftover_hg38_pos: Option<i64>,
    /// Chromosome as lifted by bcftools.
    pub bcftools_hg38_chrom: Option<String>,
    /// Position as lifted by bcftools.
    pub bcftools_hg38_pos: Option<i64>,
    /// Reference allele after bcftools liftover.
    pub bcftools_hg38_ref: String,
    /// Alternative allele after bcftools liftover.
    pub bcftools_hg38_alt: String,
    /// Whether both liftover tools agree on the position.
    pub pos_match: bool,
    /// Whether both liftover tools agree on the genotype.
    pub gt_match: bool,
}

impl ComparisonRecord {
    /// The target coordinate, if the variant was lifted over.
    pub fn target(&self) -> Option<(&str, i64)> {
        match (&self.bcftools_hg38_chrom, self.bcftools_hg38_pos) {
            (Some(chrom), Some(pos)) if crate::common::is_present(chrom) => {
                Some((chrom.as_str(), pos))
            }
            _ => None,
        }
    }

    /// Alleles after bcftools liftover in VEP notation, the source alleles if bcftools has none.
    pub fn target_alleles(&self) -> String {
        if crate::common::is_present(&self.bcftools_hg38_ref)
            && crate::common::is_present(&self.bcftools_hg38_alt)
        {
            let alleles = format!("{},{}", &self.bcftools_hg38_ref, &self.bcftools_hg38_alt);
            if let Some((reference, alternative)) = reading::vep_alleles(&alleles) {
                return format!("{}/{}", reference, alternative);
            }
        }
        self.source_alleles.clone()
    }

    /// Absolute difference between the two tools' target positions, missing ones count as 0.
    pub fn pos_difference(&self) -> i64 {
        (self.liftover_hg38_pos.unwrap_or(0) - self.bcftools_hg38_pos.unwrap_or(0)).abs()
    }
}

/// One row of a per-build VEP relation.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct VepAnnotation {
    /// Chromosome without `chr` prefix.
    pub chrom: String,
    /// Position in VEP convention.
    pub pos: i64,
    /// Alleles of the annotated variant as `REF/ALT` in VEP notation, empty if unknown.
    #[serde(default)]
    pub alleles: String,
    /// The `Feature_type` column, e.g., `Transcript` or `RegulatoryFeature`.
    pub feature_type: String,
    /// The feature identifier, for transcripts the versioned transcript ID.
    pub feature: String,
    /// Raw consequence field.
    pub consequence: String,
    /// Raw impact field.
    pub impact: String,
    /// Gene symbol.
    pub symbol: String,
    /// Raw SIFT field, e.g., `deleterious(0.01)`.
    pub sift: String,
    /// Raw PolyPhen field, e.g., `probably_damaging(0.998)`.
    pub polyphen: String,
    /// gnomAD genomes allele frequency.
    pub gnomadg_af: Option<f64>,
    /// Raw clinical significance, e.g., `pathogenic,likely_pathogenic`.
    pub clin_sig: String,
    /// HGVS coding notation.
    #[serde(default)]
    pub hgvsc: String,
    /// HGVS protein notation.
    #[serde(default)]
    pub hgvsp: String,
    /// Whether VEP flagged the transcript as canonical.
    #[serde(default)]
    pub canonical: bool,
    /// RefSeq ID if this is the MANE Select transcript.
    #[serde(default)]
    pub mane_select: String,
    /// RefSeq ID if this is a MANE Plus Clinical transcript.
    #[serde(default)]
    pub mane_plus_clinical: String,
}

impl VepAnnotation {
    /// Whether this row describes a transcript.
    pub fn is_transcript(&self) -> bool {
        self.feature_type == "Transcript"
    }

    /// Whether this row annotates `alleles`; rows or loci without allele information match.
    pub fn matches_alleles(&self, alleles: &str) -> bool {
        self.alleles.is_empty() || alleles.is_empty() || self.alleles.eq_ignore_ascii_case(alleles)
    }
}

/// Read-only access to the annotation store.
///
/// Implementations must be free of side effects so that point queries can be repeated.
pub trait AnnotationStore {
    /// Number of rows in the comparison relation, if known up front.
    fn comparison_count(&self) -> Option<usize>;

    /// Iterate the comparison relation in insertion order.
    fn comparisons(
        &self,
    ) -> Box<dyn Iterator<Item = Result<ComparisonRecord, anyhow::Error>> + '_>;

    /// All VEP rows of `build` at exactly `chrom:pos`, in insertion order.
    fn annotations(
        &self,
        build: GenomeBuild,
        chrom: &str,
        pos: i64,
    ) -> Result<Vec<VepAnnotation>, anyhow::Error>;
}

/// Annotation store held entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    comparisons: Vec<ComparisonRecord>,
    vep: HashMap<(GenomeBuild, String, i64), Vec<VepAnnotation>>,
}

impl MemoryStore {
    /// Construct from already parsed records.
    pub fn new(
        comparisons: Vec<ComparisonRecord>,
        hg19: Vec<VepAnnotation>,
        hg38: Vec<VepAnnotation>,
    ) -> Self {
        let mut result = Self {
            comparisons,
            vep: HashMap::new(),
        };
        for (build, rows) in [(GenomeBuild::Hg19, hg19), (GenomeBuild::Hg38, hg38)] {
            for row in rows {
                result
                    .vep
                    .entry((build, normalize_chrom(&row.chrom).to_string(), row.pos))
                    .or_default()
                    .push(row);
            }
        }
        result
    }

    /// Load the three relations from their TSV files.
    pub fn from_tsv(
        path_comparison: &str,
        path_hg19_vep: &str,
        path_hg38_vep: &str,
    ) -> Result<Self, anyhow::Error> {
        let comparisons = reading::read_comparison_tsv(path_comparison, None)?;
        let hg19 = reading::read_vep_tsv(path_hg19_vep, None)?;
        let hg38 = reading::read_vep_tsv(path_hg38_vep, None)?;
        Ok(Self::new(comparisons, hg19, hg38))
    }
}

impl AnnotationStore for MemoryStore {
    fn comparison_count(&self) -> Option<usize> {
        Some(self.comparisons.len())
    }

    fn comparisons(
        &self,
    ) -> Box<dyn Iterator<Item = Result<ComparisonRecord, anyhow::Error>> + '_> {
        Box::new(self.comparisons.iter().cloned().map(Ok))
    }

    fn annotations(
        &self,
        build: GenomeBuild,
        chrom: &str,
        pos: i64,
    ) -> Result<Vec<VepAnnotation>, anyhow::Error> {
        Ok(self
            .vep
            .get(&(build, normalize_chrom(chrom).to_string(), pos))
            .cloned()
            .unwrap_or_default())
    }
}
