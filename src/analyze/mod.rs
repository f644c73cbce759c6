//! Variant discordance analysis between the hg19 and hg38 VEP annotations.

pub mod ann;
pub mod cache;
pub mod clinical;
pub mod reconcile;
pub mod transcripts;

use itertools::Itertools;
use thousands::Separable;

use crate::{
    common::{first_present, GenomeBuild},
    store::{AnnotationStore, ComparisonRecord, VepAnnotation},
};

use self::{
    ann::PutativeImpact,
    clinical::{
        extract_genotype, normalize_clinical_significance, parse_polyphen, parse_sift,
        polyphen_change, sift_change, ClinicalCategory, ClinicalChange, PolyphenPrediction,
        SiftPrediction,
    },
    reconcile::{reconcile, Reconciliation},
    transcripts::{select_priority_transcript, PrioritySelection},
};

/// Default number of loci processed per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Configuration of the discordance analysis.
#[derive(Debug, Clone, derive_builder::Builder)]
#[builder(pattern = "immutable")]
pub struct Config {
    /// Number of loci to query and analyze at a time.
    #[builder(default = "DEFAULT_CHUNK_SIZE")]
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Identity of a variant across both builds.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VariantLocus {
    pub source_chrom: String,
    pub source_pos: i64,
    /// Alleles in VEP notation, e.g., `A/G` or `-/T`.
    pub source_alleles: String,
    pub target_chrom: String,
    pub target_pos: i64,
}

/// Representative annotation of a locus in one build.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BuildSummary {
    pub gene: String,
    pub consequence: String,
    /// The raw representative impact value.
    pub impact_raw: String,
    pub impact: Option<PutativeImpact>,
    pub clin_sig: String,
    pub clin_sig_normalized: ClinicalCategory,
    pub sift: String,
    pub sift_prediction: Option<SiftPrediction>,
    pub sift_score: Option<f64>,
    pub polyphen: String,
    pub polyphen_prediction: Option<PolyphenPrediction>,
    pub polyphen_score: Option<f64>,
    pub gnomad_af: Option<f64>,
}

impl BuildSummary {
    /// Pick the representative values: transcript rows first, then any row, else empty.
    pub fn from_annotations(records: &[VepAnnotation]) -> Self {
        let transcript = records.iter().find(|record| record.is_transcript());
        let any = records.first();
        let pick = |field: fn(&VepAnnotation) -> &str| {
            first_present([transcript.map(field), any.map(field)])
        };

        let impact_raw = pick(|r| r.impact.as_str());
        let clin_sig = pick(|r| r.clin_sig.as_str());
        let sift = pick(|r| r.sift.as_str());
        let polyphen = pick(|r| r.polyphen.as_str());
        let (sift_prediction, sift_score) = parse_sift(&sift);
        let (polyphen_prediction, polyphen_score) = parse_polyphen(&polyphen);

        Self {
            gene: pick(|r| r.symbol.as_str()),
            consequence: pick(|r| r.consequence.as_str()),
            impact: PutativeImpact::parse_lenient(&impact_raw),
            impact_raw,
            clin_sig_normalized: normalize_clinical_significance(&clin_sig),
            clin_sig,
            sift,
            sift_prediction,
            sift_score,
            polyphen,
            polyphen_prediction,
            polyphen_score,
            gnomad_af: transcript.or(any).and_then(|record| record.gnomadg_af),
        }
    }

    pub fn is_pathogenic(&self) -> bool {
        self.clin_sig_normalized == ClinicalCategory::Pathogenic
    }

    pub fn is_benign(&self) -> bool {
        self.clin_sig_normalized == ClinicalCategory::Benign
    }

    /// Display value of the impact; empty when missing.
    pub fn impact_label(&self) -> String {
        self.impact.map(|impact| impact.to_string()).unwrap_or_default()
    }
}

/// Discordance analysis of one locus; the unit of the result cache and the scorer's input.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VariantAnalysisRecord {
    pub locus: VariantLocus,
    pub mapping_status: String,
    /// Reference allele from the source alleles.
    pub ref_allele: String,
    /// Alternative allele from the source alleles.
    pub alt_allele: String,
    pub bcftools_hg38_ref: String,
    pub bcftools_hg38_alt: String,
    pub pos_match: bool,
    pub gt_match: bool,
    pub flip: String,
    pub swap: String,
    pub liftover_hg38_pos: Option<i64>,
    pub bcftools_hg38_pos: Option<i64>,
    pub pos_difference: i64,
    pub reconciliation: Reconciliation,
    pub hg19: BuildSummary,
    pub hg38: BuildSummary,
    pub clin_sig_change: ClinicalChange,
    /// Directional SIFT change, e.g., `TOLERATED_TO_DELETERIOUS`; empty if none.
    pub sift_change: String,
    /// Directional PolyPhen change, e.g., `BENIGN_TO_PROBABLY_DAMAGING`; empty if none.
    pub polyphen_change: String,
    pub priority_transcript: PrioritySelection,
}

impl VariantAnalysisRecord {
    /// Whether either build carries any clinical significance value.
    pub fn has_clinical_data(&self) -> bool {
        !self.hg19.clin_sig.is_empty() || !self.hg38.clin_sig.is_empty()
    }
}

/// Analyze one locus given its VEP rows in both builds.
///
/// Returns `None` if the comparison row was not lifted over.
pub fn analyze_variant(
    comparison: &ComparisonRecord,
    hg19: &[VepAnnotation],
    hg38: &[VepAnnotation],
) -> Option<VariantAnalysisRecord> {
    let (target_chrom, target_pos) = comparison.target()?;
    let (ref_allele, alt_allele) = extract_genotype(&comparison.source_alleles);

    let hg19_summary = BuildSummary::from_annotations(hg19);
    let hg38_summary = BuildSummary::from_annotations(hg38);

    Some(VariantAnalysisRecord {
        locus: VariantLocus {
            source_chrom: comparison.source_chrom.clone(),
            source_pos: comparison.source_pos,
            source_alleles: comparison.source_alleles.clone(),
            target_chrom: target_chrom.to_string(),
            target_pos,
        },
        mapping_status: comparison.mapping_status.clone(),
        ref_allele,
        alt_allele,
        bcftools_hg38_ref: comparison.bcftools_hg38_ref.clone(),
        bcftools_hg38_alt: comparison.bcftools_hg38_alt.clone(),
        pos_match: comparison.pos_match,
        gt_match: comparison.gt_match,
        flip: comparison.flip.clone(),
        swap: comparison.swap.clone(),
        liftover_hg38_pos: comparison.liftover_hg38_pos,
        bcftools_hg38_pos: comparison.bcftools_hg38_pos,
        pos_difference: comparison.pos_difference(),
        reconciliation: reconcile(hg19, hg38),
        clin_sig_change: ClinicalChange::new(
            hg19_summary.clin_sig_normalized,
            hg38_summary.clin_sig_normalized,
        ),
        sift_change: sift_change(hg19_summary.sift_prediction, hg38_summary.sift_prediction),
        polyphen_change: polyphen_change(
            hg19_summary.polyphen_prediction,
            hg38_summary.polyphen_prediction,
        ),
        priority_transcript: select_priority_transcript(hg19, hg38),
        hg19: hg19_summary,
        hg38: hg38_summary,
    })
}

/// Query the VEP rows of both builds for a comparison row and analyze it.
///
/// Rows annotating other alleles at the same position are left out.
fn analyze_one<S: AnnotationStore + ?Sized>(
    store: &S,
    comparison: &ComparisonRecord,
) -> Result<Option<VariantAnalysisRecord>, anyhow::Error> {
    let Some((target_chrom, target_pos)) = comparison.target() else {
        return Ok(None);
    };
    let target_alleles = comparison.target_alleles();
    let hg19 = store
        .annotations(
            GenomeBuild::Hg19,
            &comparison.source_chrom,
            comparison.source_pos,
        )?
        .into_iter()
        .filter(|row| row.matches_alleles(&comparison.source_alleles))
        .collect::<Vec<_>>();
    let hg38 = store
        .annotations(GenomeBuild::Hg38, target_chrom, target_pos)?
        .into_iter()
        .filter(|row| row.matches_alleles(&target_alleles))
        .collect::<Vec<_>>();
    if hg19.is_empty() && hg38.is_empty() {
        tracing::debug!(
            "no VEP annotation for {}:{} {}",
            &comparison.source_chrom,
            comparison.source_pos,
            &comparison.source_alleles
        );
    }
    Ok(analyze_variant(comparison, &hg19, &hg38))
}

/// Analyze all lifted-over loci of the store, in input order and in chunks.
pub fn analyze_all<S: AnnotationStore + ?Sized>(
    store: &S,
    config: &Config,
) -> Result<Vec<VariantAnalysisRecord>, anyhow::Error> {
    let chunk_size = config.chunk_size.max(1);
    let total = store.comparison_count();
    tracing::info!(
        "Analyzing {} variants in chunks of {}",
        total
            .map(|total| total.separate_with_commas())
            .unwrap_or_else(|| String::from("all")),
        chunk_size.separate_with_commas()
    );

    let mut result = Vec::new();
    let mut processed = 0usize;
    for (chunk_no, chunk) in (&store.comparisons().chunks(chunk_size))
        .into_iter()
        .enumerate()
    {
        let chunk = chunk.collect::<Result<Vec<_>, _>>()?;
        for comparison in &chunk {
            if let Some(record) = analyze_one(store, comparison)? {
                result.push(record);
            }
        }
        processed += chunk.len();
        tracing::info!(
            "... chunk {} done, {} variants processed, {} analyzed",
            chunk_no + 1,
            processed.separate_with_commas(),
            result.len().separate_with_commas()
        );
    }

    tracing::info!(
        "Completed analysis of {} variants",
        result.len().separate_with_commas()
    );
    Ok(result)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::MemoryStore;

    fn comparison(pos: i64, target: Option<i64>) -> ComparisonRecord {
        ComparisonRecord {
            mapping_status: "UNIQUE".into(),
            source_chrom: "17".into(),
            source_pos: pos,
            source_alleles: "G/A".into(),
            bcftools_hg38_chrom: target.map(|_| "17".into()),
            bcftools_hg38_pos: target,
            liftover_hg38_pos: target,
            pos_match: true,
            gt_match: true,
            ..Default::default()
        }
    }

    fn vep(pos: i64, feature: &str, consequence: &str, impact: &str) -> VepAnnotation {
        VepAnnotation {
            chrom: "17".into(),
            pos,
            feature_type: "Transcript".into(),
            feature: feature.into(),
            consequence: consequence.into(),
            impact: impact.into(),
            symbol: "TP53".into(),
            ..Default::default()
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(
            vec![
                comparison(100, Some(1_100)),
                comparison(200, None),
                comparison(300, Some(1_300)),
                comparison(400, Some(1_400)),
            ],
            vec![
                vep(100, "ENST01.3", "missense_variant", "MODERATE"),
                VepAnnotation {
                    clin_sig: "benign".into(),
                    sift: "tolerated(0.3)".into(),
                    ..vep(300, "ENST02.1", "synonymous_variant", "LOW")
                },
            ],
            vec![
                vep(1_100, "ENST01.5", "stop_gained", "HIGH"),
                VepAnnotation {
                    clin_sig: "pathogenic".into(),
                    sift: "deleterious(0.01)".into(),
                    ..vep(1_300, "ENST02.1", "synonymous_variant", "LOW")
                },
            ],
        )
    }

    #[test]
    fn build_summary_fallback_order() {
        let mut regulatory = vep(1, "ENSR01", "regulatory_region_variant", "MODIFIER");
        regulatory.feature_type = "RegulatoryFeature".into();
        regulatory.symbol = "-".into();
        regulatory.clin_sig = "pathogenic".into();
        let mut transcript = vep(1, "ENST01.1", "intron_variant", "MODIFIER");
        transcript.symbol = "-".into();

        let summary = BuildSummary::from_annotations(&[regulatory.clone(), transcript]);
        assert_eq!(summary.consequence, "intron_variant");
        // Transcript gene symbol is missing, so the first row of any type is used.
        assert_eq!(summary.gene, "");
        assert_eq!(summary.clin_sig, "pathogenic");
        assert!(summary.is_pathogenic());

        let summary = BuildSummary::from_annotations(&[regulatory]);
        assert_eq!(summary.consequence, "regulatory_region_variant");
        assert_eq!(summary.impact, Some(PutativeImpact::Modifier));

        assert_eq!(BuildSummary::from_annotations(&[]), BuildSummary::default());
    }

    #[test]
    fn analyze_variant_same_transcript_flip() {
        let record = analyze_variant(
            &comparison(100, Some(1_100)),
            &[vep(100, "ENST001.3", "missense_variant", "MODERATE")],
            &[vep(1_100, "ENST001.5", "stop_gained", "HIGH")],
        )
        .expect("lifted over");

        assert_eq!(record.reconciliation.same_transcript_consequence_changes, 1);
        assert_eq!(record.reconciliation.impact_changes, 1);
        assert_eq!(record.hg19.impact, Some(PutativeImpact::Moderate));
        assert_eq!(record.hg38.impact, Some(PutativeImpact::High));
        assert_eq!(format!("{}", record.clin_sig_change), "STABLE_NONE");
        assert_eq!(record.ref_allele, "G");
        assert_eq!(record.alt_allele, "A");
        assert_eq!(record.locus.target_pos, 1_100);
    }

    #[test]
    fn analyze_variant_without_vep_rows() {
        let record = analyze_variant(&comparison(100, Some(1_100)), &[], &[]).expect("lifted over");
        assert_eq!(record.reconciliation, Reconciliation::default());
        assert_eq!(record.hg19, BuildSummary::default());
        assert_eq!(record.sift_change, "");

        assert!(analyze_variant(&comparison(100, None), &[], &[]).is_none());
    }

    #[test]
    fn analyze_all_keeps_input_order() -> Result<(), anyhow::Error> {
        let records = analyze_all(&store(), &Config::default())?;

        let positions = records
            .iter()
            .map(|record| record.locus.source_pos)
            .collect::<Vec<_>>();
        assert_eq!(positions, vec![100, 300, 400]);

        let changed = &records[1];
        assert_eq!(format!("{}", changed.clin_sig_change), "BENIGN_TO_PATHOGENIC");
        assert_eq!(changed.sift_change, "TOLERATED_TO_DELETERIOUS");
        assert!(changed.hg19.is_benign());
        assert!(changed.hg38.is_pathogenic());

        Ok(())
    }

    #[test]
    fn analyze_all_separates_alleles_at_one_position() -> Result<(), anyhow::Error> {
        let store = MemoryStore::from_tsv(
            "tests/data/comparison.tsv",
            "tests/data/hg19_vep.tsv",
            "tests/data/hg38_vep.tsv",
        )?;
        let records = analyze_all(&store, &Config::default())?;

        // The `A/T` rows at the same positions annotate another allele.
        let record = &records[0];
        assert_eq!(record.locus.source_alleles, "A/G");
        assert_eq!(record.hg19.consequence, "missense_variant");
        assert_eq!(record.hg38.consequence, "stop_gained");
        assert_eq!(record.reconciliation.transcript_pairs_analyzed, 4);
        assert_eq!(
            record.reconciliation.hg19_consequences,
            vec!["intron_variant", "missense_variant"]
        );
        assert_eq!(
            record.reconciliation.hg38_consequences,
            vec!["intron_variant", "stop_gained"]
        );
        assert_eq!(record.reconciliation.same_transcript_consequence_changes, 1);
        assert_eq!(record.hg19.clin_sig_normalized, ClinicalCategory::Vus);
        assert_eq!(record.hg38.clin_sig_normalized, ClinicalCategory::Pathogenic);

        // Swapped and strand-flipped loci find their hg38 rows by the lifted alleles.
        assert_eq!(records[1].hg38.consequence, "synonymous_variant");
        assert_eq!(records[3].hg38.consequence, "missense_variant");

        Ok(())
    }

    #[rstest::rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(100)]
    fn analyze_all_is_chunk_invariant(#[case] chunk_size: usize) -> Result<(), anyhow::Error> {
        let store = store();
        let reference = analyze_all(&store, &Config::default())?;
        let config = ConfigBuilder::default().chunk_size(chunk_size).build()?;

        assert_eq!(analyze_all(&store, &config)?, reference);

        Ok(())
    }
}
