//! Export of the scored variants and the summary report.

use std::{collections::HashMap, fmt::Write as _, path::Path};

use strum::IntoEnumIterator;
use thousands::Separable;

use crate::analyze::clinical::{ClinicalCategory, ClinicalChange, ReviewPriority};

use super::scoring::{PriorityCategory, ScoredVariantRecord};

/// File name of the exported table.
pub const CSV_FILE_NAME: &str = "prioritized_variants.csv";
/// File name of the summary report.
pub const SUMMARY_FILE_NAME: &str = "variant_prioritization_summary.txt";

/// Keep the records with score at least `min_score`, sort by descending score and keep the
/// first `max_variants`.
///
/// Records of equal score keep their input order.
pub fn select(
    records: &[ScoredVariantRecord],
    min_score: u64,
    max_variants: usize,
) -> Vec<&ScoredVariantRecord> {
    let mut result = records
        .iter()
        .filter(|record| record.priority_score >= min_score)
        .collect::<Vec<_>>();
    result.sort_by(|lhs, rhs| rhs.priority_score.cmp(&lhs.priority_score));
    result.truncate(max_variants);
    result
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}

/// One row of the exported table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "Priority_Score")]
    priority_score: u64,
    #[serde(rename = "Priority_Category")]
    priority_category: PriorityCategory,
    #[serde(rename = "Chromosome")]
    chromosome: &'a str,
    #[serde(rename = "Position_hg19")]
    position_hg19: i64,
    #[serde(rename = "Alleles")]
    alleles: &'a str,
    #[serde(rename = "GT_hg19")]
    gt_hg19: String,
    #[serde(rename = "GT_hg38")]
    gt_hg38: String,
    #[serde(rename = "Mapping_Status")]
    mapping_status: &'a str,
    #[serde(rename = "Position_hg38_CrossMap")]
    position_hg38_crossmap: Option<i64>,
    #[serde(rename = "Position_hg38_bcftools")]
    position_hg38_bcftools: Option<i64>,
    #[serde(rename = "Position_Match")]
    position_match: &'static str,
    #[serde(rename = "Position_Difference")]
    position_difference: i64,
    #[serde(rename = "Genotype_Match")]
    genotype_match: &'static str,
    #[serde(rename = "Strand_Flip")]
    strand_flip: &'a str,
    #[serde(rename = "Ref_Alt_Swap")]
    ref_alt_swap: &'a str,
    #[serde(rename = "Transcript_Pairs_Analyzed")]
    transcript_pairs_analyzed: u32,
    #[serde(rename = "Same_Transcript_Consequence_Changes")]
    same_transcript_consequence_changes: u32,
    #[serde(rename = "Same_Consequence_Different_Transcripts")]
    same_consequence_different_transcripts: u32,
    #[serde(rename = "Unmatched_Consequences")]
    unmatched_consequences: u32,
    #[serde(rename = "Gene_Annotation_Changes")]
    gene_annotation_changes: u32,
    #[serde(rename = "Impact_Level_Changes")]
    impact_level_changes: u32,
    #[serde(rename = "Problematic_Transcripts_hg19")]
    problematic_transcripts_hg19: String,
    #[serde(rename = "Problematic_Transcripts_hg38")]
    problematic_transcripts_hg38: String,
    #[serde(rename = "Discordance_Summary")]
    discordance_summary: String,
    #[serde(rename = "Gene_hg19")]
    gene_hg19: &'a str,
    #[serde(rename = "Gene_hg38")]
    gene_hg38: &'a str,
    #[serde(rename = "Gene_Match")]
    gene_match: &'static str,
    #[serde(rename = "Consequence_hg19")]
    consequence_hg19: &'a str,
    #[serde(rename = "Consequence_hg38")]
    consequence_hg38: &'a str,
    #[serde(rename = "Consequence_Match")]
    consequence_match: &'static str,
    #[serde(rename = "Impact_hg19")]
    impact_hg19: &'a str,
    #[serde(rename = "Impact_hg38")]
    impact_hg38: &'a str,
    #[serde(rename = "Impact_Match")]
    impact_match: &'static str,
    #[serde(rename = "Clinical_Significance_hg19")]
    clinical_significance_hg19: &'a str,
    #[serde(rename = "Clinical_Significance_hg38")]
    clinical_significance_hg38: &'a str,
    #[serde(rename = "Clinical_Significance_Change")]
    clinical_significance_change: String,
    #[serde(rename = "gnomAD_Frequency_hg19")]
    gnomad_frequency_hg19: Option<f64>,
    #[serde(rename = "gnomAD_Frequency_hg38")]
    gnomad_frequency_hg38: Option<f64>,
    #[serde(rename = "SIFT_hg19")]
    sift_hg19: &'a str,
    #[serde(rename = "SIFT_hg38")]
    sift_hg38: &'a str,
    #[serde(rename = "SIFT_Change")]
    sift_change: &'a str,
    #[serde(rename = "PolyPhen_hg19")]
    polyphen_hg19: &'a str,
    #[serde(rename = "PolyPhen_hg38")]
    polyphen_hg38: &'a str,
    #[serde(rename = "PolyPhen_Change")]
    polyphen_change: &'a str,
    #[serde(rename = "Transcript_Relationship")]
    transcript_relationship: String,
    #[serde(rename = "Consequence_Relationship")]
    consequence_relationship: String,
    #[serde(rename = "Priority_Transcript")]
    priority_transcript: &'a str,
    #[serde(rename = "Transcript_Crossbuild_Status")]
    transcript_crossbuild_status: String,
    #[serde(rename = "HGVSc_Concordance")]
    hgvsc_concordance: String,
    #[serde(rename = "HGVSp_Concordance")]
    hgvsp_concordance: String,
    #[serde(rename = "Has_Position_Issue")]
    has_position_issue: &'static str,
    #[serde(rename = "Has_Genotype_Issue")]
    has_genotype_issue: &'static str,
    #[serde(rename = "Has_Transcript_Consequence_Issue")]
    has_transcript_consequence_issue: &'static str,
    #[serde(rename = "Has_Gene_Issue")]
    has_gene_issue: &'static str,
    #[serde(rename = "Has_Unmatched_Consequences")]
    has_unmatched_consequences: &'static str,
    #[serde(rename = "Has_Clinical_Change")]
    has_clinical_change: &'static str,
    #[serde(rename = "Has_Pathogenicity_Change")]
    has_pathogenicity_change: &'static str,
}

impl<'a> ExportRow<'a> {
    fn new(rank: usize, scored: &'a ScoredVariantRecord) -> Self {
        let record = &scored.analysis;
        let rec = &record.reconciliation;
        let (hg19, hg38) = (&record.hg19, &record.hg38);
        let priority = &record.priority_transcript;

        Self {
            rank,
            priority_score: scored.priority_score,
            priority_category: scored.priority_category,
            chromosome: &record.locus.source_chrom,
            position_hg19: record.locus.source_pos,
            alleles: &record.locus.source_alleles,
            gt_hg19: format!("{}/{}", &record.ref_allele, &record.alt_allele),
            gt_hg38: format!(
                "{}/{}",
                &record.bcftools_hg38_ref, &record.bcftools_hg38_alt
            ),
            mapping_status: &record.mapping_status,
            position_hg38_crossmap: record.liftover_hg38_pos,
            position_hg38_bcftools: record.bcftools_hg38_pos,
            position_match: yes_no(record.pos_match),
            position_difference: record.pos_difference,
            genotype_match: yes_no(record.gt_match),
            strand_flip: &record.flip,
            ref_alt_swap: &record.swap,
            transcript_pairs_analyzed: rec.transcript_pairs_analyzed,
            same_transcript_consequence_changes: rec.same_transcript_consequence_changes,
            same_consequence_different_transcripts: rec.same_consequence_different_transcripts,
            unmatched_consequences: rec.unmatched_consequences,
            gene_annotation_changes: rec.gene_changes,
            impact_level_changes: rec.impact_changes,
            problematic_transcripts_hg19: rec.problematic_transcripts_hg19.join("; "),
            problematic_transcripts_hg38: rec.problematic_transcripts_hg38.join("; "),
            discordance_summary: scored.discordance_summary_string(),
            gene_hg19: &hg19.gene,
            gene_hg38: &hg38.gene,
            gene_match: yes_no(hg19.gene == hg38.gene),
            consequence_hg19: &hg19.consequence,
            consequence_hg38: &hg38.consequence,
            consequence_match: yes_no(hg19.consequence == hg38.consequence),
            impact_hg19: &hg19.impact_raw,
            impact_hg38: &hg38.impact_raw,
            impact_match: yes_no(hg19.impact_raw == hg38.impact_raw),
            clinical_significance_hg19: &hg19.clin_sig,
            clinical_significance_hg38: &hg38.clin_sig,
            clinical_significance_change: record.clin_sig_change.to_string(),
            gnomad_frequency_hg19: hg19.gnomad_af,
            gnomad_frequency_hg38: hg38.gnomad_af,
            sift_hg19: &hg19.sift,
            sift_hg38: &hg38.sift,
            sift_change: &record.sift_change,
            polyphen_hg19: &hg19.polyphen,
            polyphen_hg38: &hg38.polyphen,
            polyphen_change: &record.polyphen_change,
            transcript_relationship: rec.transcript_relationship.to_string(),
            consequence_relationship: rec.consequence_relationship.to_string(),
            priority_transcript: priority.transcript_id.as_deref().unwrap_or_default(),
            transcript_crossbuild_status: priority.status.to_string(),
            hgvsc_concordance: priority.hgvsc_concordance.to_string(),
            hgvsp_concordance: priority.hgvsp_concordance.to_string(),
            has_position_issue: yes_no(!record.pos_match),
            has_genotype_issue: yes_no(!record.gt_match),
            has_transcript_consequence_issue: yes_no(rec.same_transcript_consequence_changes > 0),
            has_gene_issue: yes_no(rec.gene_changes > 0),
            has_unmatched_consequences: yes_no(rec.unmatched_consequences > 0),
            has_clinical_change: yes_no(!record.clin_sig_change.is_stable()),
            has_pathogenicity_change: yes_no(
                !record.sift_change.is_empty() || !record.polyphen_change.is_empty(),
            ),
        }
    }
}

/// Write the selected records to `path` as CSV, ranked from 1.
pub fn write_csv<P: AsRef<Path>>(
    path: P,
    records: &[&ScoredVariantRecord],
) -> Result<(), anyhow::Error> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| anyhow::anyhow!("could not open {} for writing: {}", path.display(), e))?;
    for (idx, record) in records.iter().enumerate() {
        writer.serialize(ExportRow::new(idx + 1, record))?;
    }
    writer.flush()?;

    tracing::info!(
        "Wrote {} prioritized variants to {}",
        records.len().separate_with_commas(),
        path.display()
    );
    Ok(())
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Score ranges of the score distribution; the final range is open.
const SCORE_BINS: &[(u64, Option<u64>)] = &[
    (0, Some(1)),
    (1, Some(10)),
    (10, Some(100)),
    (100, Some(1_000)),
    (1_000, Some(10_000)),
    (10_000, Some(100_000)),
    (100_000, None),
];

/// Count of one clinical significance transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCount {
    pub change: ClinicalChange,
    pub priority: ReviewPriority,
    pub count: usize,
}

/// Count the changing clinical significance transitions, ordered by review priority and then
/// by count descending.
pub fn clinical_transitions(records: &[ScoredVariantRecord]) -> Vec<TransitionCount> {
    let mut counts: HashMap<ClinicalChange, usize> = HashMap::new();
    for record in records {
        if !record.analysis.clin_sig_change.is_stable() {
            *counts.entry(record.analysis.clin_sig_change).or_default() += 1;
        }
    }

    let mut result = counts
        .into_iter()
        .filter_map(|(change, count)| {
            change.priority().map(|priority| TransitionCount {
                change,
                priority,
                count,
            })
        })
        .collect::<Vec<_>>();
    result.sort_by(|lhs, rhs| {
        lhs.priority
            .cmp(&rhs.priority)
            .then_with(|| rhs.count.cmp(&lhs.count))
            .then_with(|| lhs.change.to_string().cmp(&rhs.change.to_string()))
    });
    result
}

/// Render the summary report over all scored records.
pub fn render_summary(
    records: &[ScoredVariantRecord],
    exported: usize,
) -> Result<String, std::fmt::Error> {
    let total = records.len();
    let count = |pred: &dyn Fn(&ScoredVariantRecord) -> bool| -> usize {
        records.iter().filter(|record| pred(record)).count()
    };
    let mut out = String::new();

    writeln!(out, "Variant Prioritization Summary")?;
    writeln!(out, "{}", "=".repeat(30))?;
    writeln!(out)?;
    writeln!(out, "Total variants scored: {}", total.separate_with_commas())?;
    writeln!(
        out,
        "Variants in {}: {}",
        CSV_FILE_NAME,
        exported.separate_with_commas()
    )?;
    writeln!(out)?;

    writeln!(out, "Priority Category Distribution:")?;
    for category in PriorityCategory::iter().rev() {
        let n = count(&|record| record.priority_category == category);
        if n > 0 {
            writeln!(
                out,
                "  {}: {} ({:.1}%)",
                category,
                n.separate_with_commas(),
                percentage(n, total)
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "Priority Score Distribution:")?;
    for &(start, end) in SCORE_BINS {
        let n = count(&|record| {
            record.priority_score >= start && end.is_none_or(|end| record.priority_score < end)
        });
        if n > 0 {
            let range = match end {
                Some(end) if end == start + 1 => format!("{}", start),
                Some(end) => format!("{}-{}", start, end - 1),
                None => format!("{}+", start),
            };
            writeln!(
                out,
                "  Score {}: {} variants ({:.1}%)",
                range,
                n.separate_with_commas(),
                percentage(n, total)
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "Clinical Evidence Breakdown:")?;
    let evidence: [(&str, &dyn Fn(&ScoredVariantRecord) -> bool); 5] = [
        ("Clinical significance changes", &|r| {
            !r.analysis.clin_sig_change.is_stable()
        }),
        ("SIFT prediction changes", &|r| {
            !r.analysis.sift_change.is_empty()
        }),
        ("PolyPhen prediction changes", &|r| {
            !r.analysis.polyphen_change.is_empty()
        }),
        ("Variants with pathogenic evidence", &|r| {
            r.analysis.hg19.is_pathogenic() || r.analysis.hg38.is_pathogenic()
        }),
        ("Variants with benign evidence", &|r| {
            r.analysis.hg19.is_benign() || r.analysis.hg38.is_benign()
        }),
    ];
    for (label, pred) in evidence {
        writeln!(out, "  {}: {} variants", label, count(pred).separate_with_commas())?;
    }
    writeln!(out)?;

    writeln!(out, "Functional Issue Breakdown:")?;
    let functional: [(&str, &dyn Fn(&ScoredVariantRecord) -> bool); 5] = [
        ("Same transcript, different consequence", &|r| {
            r.analysis.reconciliation.same_transcript_consequence_changes > 0
        }),
        ("Gene annotation changes", &|r| {
            r.analysis.reconciliation.gene_changes > 0
        }),
        ("Impact level changes", &|r| {
            r.analysis.reconciliation.impact_changes > 0
        }),
        ("Same consequence, different transcripts", &|r| {
            r.analysis.reconciliation.same_consequence_different_transcripts > 0
        }),
        ("Unmatched consequences", &|r| {
            r.analysis.reconciliation.unmatched_consequences > 0
        }),
    ];
    for (label, pred) in functional {
        writeln!(out, "  {}: {} variants", label, count(pred).separate_with_commas())?;
    }
    writeln!(out)?;

    writeln!(out, "Clinical Significance Transitions:")?;
    writeln!(out, "  Stable annotations:")?;
    for category in ClinicalCategory::iter() {
        let n = count(&|record| {
            let change = &record.analysis.clin_sig_change;
            change.is_stable() && change.from == category
        });
        if n > 0 {
            writeln!(out, "    {}: {}", category, n.separate_with_commas())?;
        }
    }
    writeln!(out, "  Directional changes:")?;
    let transitions = clinical_transitions(records);
    if transitions.is_empty() {
        writeln!(out, "    none")?;
    }
    for transition in transitions {
        writeln!(
            out,
            "    [{}] {} -> {}: {}",
            transition.priority,
            transition.change.from,
            transition.change.to,
            transition.count.separate_with_commas()
        )?;
    }

    Ok(out)
}

/// Write the summary report to `path`.
pub fn write_summary<P: AsRef<Path>>(
    path: P,
    records: &[ScoredVariantRecord],
    exported: usize,
) -> Result<(), anyhow::Error> {
    let path = path.as_ref();
    let summary = render_summary(records, exported)?;
    std::fs::write(path, summary)
        .map_err(|e| anyhow::anyhow!("could not write summary to {}: {}", path.display(), e))?;
    tracing::info!("Wrote summary to {}", path.display());
    Ok(())
}
