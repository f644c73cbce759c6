//! Clinical priority scoring of the analysis records.

use parse_display::{Display, FromStr};

use crate::analyze::{
    ann::PutativeImpact,
    clinical::{ClinicalCategory, ReviewPriority, SiftPrediction},
    reconcile::{ConsequenceRelationship, Reconciliation},
    VariantAnalysisRecord,
};

use super::config::ScoringConfig;

/// Priority category of a scored variant.
///
/// The ordering follows urgency, so `Low < Moderate < High < Critical`.
#[derive(
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
    Display,
    FromStr,
    serde::Deserialize,
    serde::Serialize,
    strum::EnumIter,
)]
#[display(style = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityCategory {
    Low,
    Moderate,
    High,
    Critical,
}

impl From<ReviewPriority> for PriorityCategory {
    fn from(value: ReviewPriority) -> Self {
        match value {
            ReviewPriority::Critical => PriorityCategory::Critical,
            ReviewPriority::High => PriorityCategory::High,
            ReviewPriority::Moderate => PriorityCategory::Moderate,
            ReviewPriority::Low => PriorityCategory::Low,
        }
    }
}

/// An analysis record with its priority.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredVariantRecord {
    pub analysis: VariantAnalysisRecord,
    pub priority_score: u64,
    pub priority_category: PriorityCategory,
    /// Findings ordered from `CRITICAL` to `LOW` tier.
    pub discordance_summary: Vec<String>,
}

impl ScoredVariantRecord {
    /// The summary as one string, as written to the exported table.
    pub fn discordance_summary_string(&self) -> String {
        if self.discordance_summary.is_empty() {
            String::from("Position/genotype issues only")
        } else {
            self.discordance_summary.join("; ")
        }
    }
}

/// Impact levels of the two builds and the derived transition properties.
#[derive(Debug, Clone, Copy)]
struct ImpactTransition {
    hg19: Option<PutativeImpact>,
    hg38: Option<PutativeImpact>,
}

impl ImpactTransition {
    /// Transition between the representative impacts of the two builds.
    fn representative(record: &VariantAnalysisRecord) -> Self {
        Self {
            hg19: record.hg19.impact,
            hg38: record.hg38.impact,
        }
    }

    /// Transition of the most severe tier 1 pair whose impact differs.
    fn tier_one(reconciliation: &Reconciliation) -> Self {
        Self {
            hg19: reconciliation.impact_change_hg19,
            hg38: reconciliation.impact_change_hg38,
        }
    }

    fn is_change(&self) -> bool {
        self.hg19 != self.hg38
    }

    /// Distance of the severities, a missing impact counts as 0.
    fn magnitude(&self) -> u8 {
        let severity = |impact: Option<PutativeImpact>| impact.map(|i| i.severity()).unwrap_or(0);
        severity(self.hg19).abs_diff(severity(self.hg38))
    }

    /// Either build has `HIGH` or `MODERATE` impact.
    fn is_significant(&self) -> bool {
        [self.hg19, self.hg38]
            .iter()
            .flatten()
            .any(|impact| impact.is_significant())
    }

    fn either_is(&self, impact: PutativeImpact) -> bool {
        self.hg19 == Some(impact) || self.hg38 == Some(impact)
    }

    fn both_low_or_modifier(&self) -> bool {
        [self.hg19, self.hg38]
            .iter()
            .all(|impact| matches!(impact, Some(PutativeImpact::Low | PutativeImpact::Modifier)))
    }

    fn label(&self) -> String {
        let label = |impact: Option<PutativeImpact>| {
            impact
                .map(|i| i.to_string())
                .unwrap_or_else(|| String::from("NONE"))
        };
        format!("{}->{}", label(self.hg19), label(self.hg38))
    }
}

/// Findings collected while scoring, each with the tier it is reported under.
#[derive(Debug, Default)]
struct Findings(Vec<(PriorityCategory, String)>);

impl Findings {
    fn push(&mut self, tier: PriorityCategory, finding: String) {
        self.0.push((tier, finding));
    }

    /// Stable sort by descending tier.
    fn into_sorted(mut self) -> Vec<String> {
        self.0.sort_by(|(lhs, _), (rhs, _)| rhs.cmp(lhs));
        self.0.into_iter().map(|(_, finding)| finding).collect()
    }
}

/// Computes score, category, and discordance summary from the configured weights.
///
/// Scoring is a pure function of the record and the weights.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Weight of an impact transition that involves `HIGH` or `MODERATE`.
    ///
    /// Transitions missing from the table are scored by the nearest configured transition of
    /// the same magnitude.
    fn significant_transition_score(&self, transition: &ImpactTransition) -> f64 {
        use PutativeImpact::*;

        if let (Some(hg19), Some(hg38)) = (transition.hg19, transition.hg38) {
            if let Some(score) = self.config.impact_transition_score(hg19, hg38) {
                return score;
            }
        }

        let fallback = match transition.magnitude() {
            1 if transition.either_is(High) && transition.either_is(Moderate) => {
                Some((High, Moderate))
            }
            1 if transition.either_is(Moderate) && transition.either_is(Low) => {
                Some((Moderate, Low))
            }
            2 if transition.either_is(High) => Some((High, Low)),
            2 if transition.either_is(Moderate) => Some((Moderate, Modifier)),
            3 => Some((High, Modifier)),
            _ => None,
        };
        fallback
            .and_then(|(lhs, rhs)| self.config.impact_transition_score(lhs, rhs))
            .unwrap_or(0.0)
    }

    /// Score a single analysis record.
    pub fn score(&self, record: &VariantAnalysisRecord) -> ScoredVariantRecord {
        use PriorityCategory::*;

        let base = &self.config.base_scores;
        let rec = &record.reconciliation;
        let transition = ImpactTransition::representative(record);
        let impact_change = ImpactTransition::tier_one(rec);
        let clinical_priority = record.clin_sig_change.priority();
        let clinical_concern = record.clin_sig_change.concern();
        let has_sift_change = !record.sift_change.is_empty();
        let has_polyphen_change = !record.polyphen_change.is_empty();
        let significant_transition =
            rec.impact_changes > 0 && impact_change.is_change() && impact_change.is_significant();

        let mut findings = Findings::default();
        let mut score = 0.0;

        // Clinical significance.
        if let Some(priority) = clinical_priority {
            let change = &record.clin_sig_change;
            score += match (change.from, change.to) {
                (ClinicalCategory::Benign, ClinicalCategory::Pathogenic) => {
                    base.clinical_sig_benign_to_pathogenic
                }
                (ClinicalCategory::Pathogenic, ClinicalCategory::Benign) => {
                    base.clinical_sig_pathogenic_to_benign
                }
                (ClinicalCategory::Vus, ClinicalCategory::Pathogenic) => {
                    base.clinical_sig_vus_to_pathogenic
                }
                _ => base.clinical_sig_other_change,
            };
            findings.push(
                priority.into(),
                format!("Clinical significance change: {}", change),
            );
        }

        // Impact transitions.
        if rec.impact_changes > 0 {
            if significant_transition {
                score += self.significant_transition_score(&impact_change);
                let tier = if impact_change.either_is(PutativeImpact::High) {
                    Critical
                } else {
                    High
                };
                findings.push(
                    tier,
                    format!(
                        "Impact level changes: {} ({})",
                        rec.impact_changes,
                        impact_change.label()
                    ),
                );
            } else {
                score += self
                    .config
                    .impact_transition_score(PutativeImpact::Low, PutativeImpact::Modifier)
                    .unwrap_or(0.0);
                findings.push(
                    Low,
                    format!("Impact level changes: {} (annotation noise)", rec.impact_changes),
                );
            }
        }

        // Same transcript, different consequence.
        if rec.same_transcript_consequence_changes > 0 {
            score += f64::from(rec.same_transcript_consequence_changes)
                * base.same_transcript_consequence_changes;
            findings.push(
                High,
                format!(
                    "Same transcript consequence changes: {}",
                    rec.same_transcript_consequence_changes
                ),
            );
        }

        // Functional predictions.
        if has_sift_change {
            score += base.sift_change;
            findings.push(Moderate, format!("SIFT change: {}", &record.sift_change));
        }
        if has_polyphen_change {
            score += base.polyphen_change;
            findings.push(
                Moderate,
                format!("PolyPhen change: {}", &record.polyphen_change),
            );
        }

        // Gene symbols, weighted only with independent evidence.
        if rec.gene_changes > 0 {
            let has_evidence = transition.is_significant()
                || !record.clin_sig_change.is_stable()
                || has_sift_change
                || has_polyphen_change;
            let (weight, tier) = if !has_evidence {
                (base.gene_changes_minimal_weight, Low)
            } else if transition.either_is(PutativeImpact::High) {
                (base.gene_changes_high_impact, Moderate)
            } else if transition.either_is(PutativeImpact::Moderate) {
                (base.gene_changes_moderate_impact, Moderate)
            } else if transition.either_is(PutativeImpact::Low) {
                (base.gene_changes_low_impact, Moderate)
            } else {
                (base.gene_changes_mixed_impact, Moderate)
            };
            score += f64::from(rec.gene_changes) * weight;
            findings.push(tier, format!("Gene annotation changes: {}", rec.gene_changes));
        }

        // Transcript model differences.
        if rec.same_consequence_different_transcripts > 0 {
            score += f64::from(rec.same_consequence_different_transcripts)
                * base.same_consequence_different_transcripts;
            findings.push(
                Low,
                format!(
                    "Same consequence, different transcripts: {}",
                    rec.same_consequence_different_transcripts
                ),
            );
        }
        if rec.unmatched_consequences > 0 {
            score += f64::from(rec.unmatched_consequences) * base.unmatched_consequences;
            findings.push(Moderate, String::from("Unmatched consequences"));
        }
        match rec.consequence_relationship {
            ConsequenceRelationship::DisjointConsequences => {
                score += base.consequence_disjoint;
                findings.push(Moderate, String::from("Disjoint consequences"));
            }
            ConsequenceRelationship::PartialOverlapConsequences => {
                score += base.consequence_partial_overlap;
            }
            ConsequenceRelationship::Hg19SubsetOfHg38
            | ConsequenceRelationship::Hg38SubsetOfHg19 => {
                score += base.consequence_subset;
            }
            ConsequenceRelationship::Matched | ConsequenceRelationship::NoConsequences => (),
        }

        // Technical liftover issues.
        if !record.pos_match {
            score += base.position_mismatch;
            findings.push(Low, String::from("Position mismatch"));
        }
        if record.pos_difference > 10 {
            score += base.position_difference_moderate;
        }
        if record.pos_difference > 100 {
            score += base.position_difference_large;
        }
        if !record.gt_match {
            score += base.genotype_mismatch;
            findings.push(Low, String::from("Genotype mismatch"));
        }
        if record.swap.trim() == "1" {
            score += base.ref_alt_swap;
            findings.push(Low, String::from("REF/ALT swap"));
        }

        // Bonuses.
        if record.has_clinical_data() {
            score += base.has_clinical_data_bonus;
        }
        if record.mapping_status == "REGION" {
            score += base.region_mapping_bonus;
        }
        if transition.either_is(PutativeImpact::High) {
            score += base.high_impact_bonus;
        }

        score *= self.override_factor(record, &transition);

        let category = {
            let category = if clinical_concern == Some(ReviewPriority::Critical)
                || (significant_transition && impact_change.either_is(PutativeImpact::High))
            {
                Critical
            } else if significant_transition
                || clinical_concern == Some(ReviewPriority::High)
                || rec.same_transcript_consequence_changes > 0
            {
                High
            } else if has_sift_change
                || has_polyphen_change
                || rec.consequence_relationship == ConsequenceRelationship::DisjointConsequences
            {
                Moderate
            } else {
                Low
            };
            if category == High && record.clin_sig_change.is_stable() {
                Moderate
            } else {
                category
            }
        };

        let multipliers = &self.config.category_multipliers;
        let multiplier = match category {
            Critical => multipliers.critical,
            High => multipliers.high,
            Moderate => multipliers.moderate,
            Low => multipliers.low,
        };

        ScoredVariantRecord {
            analysis: record.clone(),
            priority_score: (score * multiplier).round().max(0.0) as u64,
            priority_category: category,
            discordance_summary: findings.into_sorted(),
        }
    }

    /// Factor of the clinical evidence override.
    ///
    /// Low impact variants with benign evidence are suppressed, variants with pathogenic
    /// evidence are boosted.
    fn override_factor(&self, record: &VariantAnalysisRecord, transition: &ImpactTransition) -> f64 {
        let builds = [&record.hg19, &record.hg38];
        let has_benign_evidence = builds.iter().any(|build| {
            build.is_benign()
                || build.sift.to_lowercase().contains("benign")
                || build.polyphen.to_lowercase().contains("benign")
                || build.sift_prediction == Some(SiftPrediction::Tolerated)
        });
        let has_pathogenic_evidence = transition.either_is(PutativeImpact::High)
            || builds.iter().any(|build| {
                build.is_pathogenic()
                    || build.sift.to_lowercase().contains("deleterious")
                    || build.polyphen.to_lowercase().contains("probably_damaging")
            });

        let factors = &self.config.clinical_override;
        if transition.both_low_or_modifier() && has_benign_evidence {
            factors.benign_reduction_factor
        } else if has_pathogenic_evidence {
            factors.pathogenic_boost_factor
        } else {
            1.0
        }
    }

    /// Score all records, keeping their order.
    pub fn score_all(&self, records: &[VariantAnalysisRecord]) -> Vec<ScoredVariantRecord> {
        records.iter().map(|record| self.score(record)).collect()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        analyze::{analyze_variant, clinical::ClinicalChange},
        store::{ComparisonRecord, VepAnnotation},
    };

    fn comparison() -> ComparisonRecord {
        ComparisonRecord {
            mapping_status: "UNIQUE".into(),
            source_chrom: "17".into(),
            source_pos: 7_676_154,
            source_alleles: "G/C".into(),
            bcftools_hg38_chrom: Some("17".into()),
            bcftools_hg38_pos: Some(7_676_154),
            liftover_hg38_pos: Some(7_676_154),
            pos_match: true,
            gt_match: true,
            ..Default::default()
        }
    }

    fn vep(feature: &str, consequence: &str, impact: &str) -> VepAnnotation {
        VepAnnotation {
            chrom: "17".into(),
            pos: 7_676_154,
            feature_type: "Transcript".into(),
            feature: feature.into(),
            consequence: consequence.into(),
            impact: impact.into(),
            symbol: "TP53".into(),
            ..Default::default()
        }
    }

    fn analyze(hg19: &[VepAnnotation], hg38: &[VepAnnotation]) -> VariantAnalysisRecord {
        analyze_variant(&comparison(), hg19, hg38).expect("lifted over")
    }

    #[test]
    fn identical_annotations_are_minimal() {
        let annotations = [
            vep("ENST001.3", "missense_variant", "MODERATE"),
            vep("ENST002.1", "intron_variant", "MODIFIER"),
        ];
        let record = analyze(&annotations, &annotations);
        let scored = Scorer::default().score(&record);

        assert_eq!(record.reconciliation.same_transcript_consequence_changes, 0);
        assert_eq!(record.reconciliation.impact_changes, 0);
        assert_eq!(record.reconciliation.gene_changes, 0);
        assert_eq!(record.reconciliation.unmatched_consequences, 0);
        assert_eq!(scored.priority_category, PriorityCategory::Low);
        assert_eq!(scored.priority_score, 0);
        assert_eq!(
            scored.discordance_summary_string(),
            "Position/genotype issues only"
        );
    }

    #[test]
    fn same_transcript_flip() {
        let record = analyze(
            &[vep("ENST001.3", "missense_variant", "MODERATE")],
            &[vep("ENST001.5", "stop_gained", "HIGH")],
        );
        let scored = Scorer::default().score(&record);

        assert_eq!(record.reconciliation.same_transcript_consequence_changes, 1);
        assert_eq!(record.reconciliation.impact_changes, 1);
        assert!(scored.priority_category >= PriorityCategory::High);
        // 10 (HIGH-MODERATE) + 10 (consequence) + 3 (disjoint) + 2 (HIGH bonus), boosted
        // for HIGH impact.
        assert_eq!(scored.priority_category, PriorityCategory::Critical);
        assert_eq!(scored.priority_score, 50_000);
        assert_eq!(
            scored.discordance_summary,
            vec![
                "Impact level changes: 1 (MODERATE->HIGH)",
                "Same transcript consequence changes: 1",
                "Disjoint consequences",
            ]
        );
    }

    #[test]
    fn annotation_noise_is_suppressed() {
        let record = analyze(
            &[vep("ENST001.3", "synonymous_variant", "LOW")],
            &[vep("ENST001.5", "synonymous_variant", "MODIFIER")],
        );
        let scored = Scorer::default().score(&record);

        assert_eq!(record.reconciliation.impact_changes, 1);
        assert_eq!(scored.priority_category, PriorityCategory::Low);
        assert!(scored.priority_score <= 1, "{}", scored.priority_score);
        assert_eq!(
            scored.discordance_summary,
            vec!["Impact level changes: 1 (annotation noise)"]
        );
    }

    #[test]
    fn secondary_transcript_noise_is_not_a_transition() {
        let record = analyze(
            &[
                vep("ENST01.1", "stop_gained", "HIGH"),
                vep("ENST02.1", "intron_variant", "MODIFIER"),
            ],
            &[
                vep("ENST01.1", "stop_gained", "HIGH"),
                vep("ENST02.1", "intron_variant", "LOW"),
            ],
        );
        let scored = Scorer::default().score(&record);

        assert_eq!(record.reconciliation.impact_changes, 1);
        assert_eq!(record.hg19.impact, record.hg38.impact);
        assert!(scored.priority_category <= PriorityCategory::Moderate);
        assert_eq!(scored.priority_category, PriorityCategory::Low);
        // (1 noise + 2 HIGH bonus) * 2.0
        assert_eq!(scored.priority_score, 6);
        assert_eq!(
            scored.discordance_summary,
            vec!["Impact level changes: 1 (annotation noise)"]
        );
    }

    #[test]
    fn secondary_transcript_transition_is_scored() {
        let record = analyze(
            &[
                vep("ENST01.1", "synonymous_variant", "LOW"),
                vep("ENST02.1", "missense_variant", "MODERATE"),
            ],
            &[
                vep("ENST01.1", "synonymous_variant", "LOW"),
                vep("ENST02.1", "stop_gained", "HIGH"),
            ],
        );
        let scored = Scorer::default().score(&record);

        assert_eq!(record.hg19.impact, Some(PutativeImpact::Low));
        assert_eq!(record.hg38.impact, Some(PutativeImpact::Low));
        assert_eq!(scored.priority_category, PriorityCategory::Critical);
        // 10 (HIGH-MODERATE) + 10 (consequence) + 2 (partial overlap)
        assert_eq!(scored.priority_score, 22_000);
        assert_eq!(
            scored.discordance_summary,
            vec![
                "Impact level changes: 1 (MODERATE->HIGH)",
                "Same transcript consequence changes: 1",
            ]
        );
    }

    #[test]
    fn representative_difference_without_pairs_is_not_a_transition() {
        let record = analyze(
            &[vep("ENST001.3", "missense_variant", "MODERATE")],
            &[vep("ENST002.1", "stop_gained", "HIGH")],
        );
        let scored = Scorer::default().score(&record);

        assert_ne!(record.hg19.impact, record.hg38.impact);
        assert_eq!(record.reconciliation.impact_changes, 0);
        assert_eq!(scored.priority_category, PriorityCategory::Moderate);
        // (4 unmatched + 3 disjoint + 2 HIGH bonus) * 2.0 * 10
        assert_eq!(scored.priority_score, 180);
        assert_eq!(
            scored.discordance_summary,
            vec!["Unmatched consequences", "Disjoint consequences"]
        );
    }

    #[test]
    fn pathogenic_to_benign_is_not_critical() {
        let mut hg19 = vep("ENST001.3", "intron_variant", "MODIFIER");
        hg19.clin_sig = "pathogenic".into();
        let mut hg38 = vep("ENST001.3", "intron_variant", "MODIFIER");
        hg38.clin_sig = "benign".into();
        let record = analyze(&[hg19], &[hg38]);
        let scored = Scorer::default().score(&record);

        assert_eq!(format!("{}", record.clin_sig_change), "PATHOGENIC_TO_BENIGN");
        assert_eq!(scored.priority_category, PriorityCategory::Low);
        // (8 for the change + 2 for clinical data) * 0.1
        assert_eq!(scored.priority_score, 1);
        assert_eq!(
            scored.discordance_summary,
            vec!["Clinical significance change: PATHOGENIC_TO_BENIGN"]
        );
    }

    #[test]
    fn pathogenic_boost() {
        let mut hg38 = vep("ENST001.3", "intron_variant", "MODIFIER");
        hg38.clin_sig = "pathogenic".into();
        let record = analyze(&[vep("ENST001.3", "intron_variant", "MODIFIER")], &[hg38]);
        let scored = Scorer::default().score(&record);

        assert_eq!(format!("{}", record.clin_sig_change), "NONE_TO_PATHOGENIC");
        assert_eq!(scored.priority_category, PriorityCategory::Critical);
        // (5 for the change + 2 for clinical data) * 2.0 * 1000
        assert_eq!(scored.priority_score, 14_000);
        assert_eq!(
            scored.discordance_summary,
            vec!["Clinical significance change: NONE_TO_PATHOGENIC"]
        );
    }

    #[test]
    fn benign_suppression() {
        let mut hg19 = vep("ENST001.3", "synonymous_variant", "LOW");
        hg19.sift = "tolerated(0.45)".into();
        let hg38 = vep("ENST001.3", "synonymous_variant", "MODIFIER");
        let record = VariantAnalysisRecord {
            pos_match: false,
            gt_match: false,
            ..analyze(&[hg19], &[hg38])
        };
        let scored = Scorer::default().score(&record);

        assert!(record.clin_sig_change.is_stable());
        assert_eq!(scored.priority_category, PriorityCategory::Low);
        // (1 noise + 3 position + 3 genotype) * 0.1, then rounded
        assert_eq!(scored.priority_score, 1);
    }

    #[test]
    fn scoring_is_deterministic() {
        let record = analyze(
            &[vep("ENST001.3", "missense_variant", "MODERATE")],
            &[
                vep("ENST001.5", "stop_gained", "HIGH"),
                vep("ENST009.1", "splice_region_variant", "LOW"),
            ],
        );
        let scorer = Scorer::default();

        assert_eq!(scorer.score(&record), scorer.score(&record));
    }

    #[rstest::rstest]
    #[case(ClinicalCategory::None)]
    #[case(ClinicalCategory::Vus)]
    #[case(ClinicalCategory::Pathogenic)]
    fn benign_to_pathogenic_is_monotone(#[case] stable: ClinicalCategory) {
        let base = analyze(
            &[vep("ENST001.3", "synonymous_variant", "LOW")],
            &[vep("ENST001.3", "synonymous_variant", "LOW")],
        );
        let unchanged = VariantAnalysisRecord {
            clin_sig_change: ClinicalChange::new(stable, stable),
            ..base.clone()
        };
        let flipped = VariantAnalysisRecord {
            clin_sig_change: ClinicalChange::new(
                ClinicalCategory::Benign,
                ClinicalCategory::Pathogenic,
            ),
            ..base
        };
        let scorer = Scorer::default();

        assert!(
            scorer.score(&flipped).priority_category >= scorer.score(&unchanged).priority_category
        );
        assert_eq!(
            scorer.score(&flipped).priority_category,
            PriorityCategory::Critical
        );
    }

    #[test]
    fn stable_clinical_significance_downgrades_high() {
        let record = analyze(
            &[vep("ENST001.3", "missense_variant", "MODERATE")],
            &[vep("ENST001.3", "synonymous_variant", "LOW")],
        );
        let scored = Scorer::default().score(&record);

        assert!(record.clin_sig_change.is_stable());
        assert_eq!(scored.priority_category, PriorityCategory::Moderate);
    }

    #[test]
    fn gene_changes_need_evidence() {
        let mut hg38 = vep("ENST001.3", "intron_variant", "MODIFIER");
        hg38.symbol = "TP53-AS1".into();
        let record = analyze(&[vep("ENST001.3", "intron_variant", "MODIFIER")], &[hg38]);
        let scored = Scorer::default().score(&record);

        assert_eq!(record.reconciliation.gene_changes, 1);
        assert_eq!(scored.priority_category, PriorityCategory::Low);
        // 0.1 rounds to zero
        assert_eq!(scored.priority_score, 0);
        assert_eq!(
            scored.discordance_summary,
            vec!["Gene annotation changes: 1"]
        );
    }

    #[rstest::rstest]
    #[case(PutativeImpact::High, PutativeImpact::Moderate, 10.0)]
    #[case(PutativeImpact::Modifier, PutativeImpact::High, 15.0)]
    #[case(PutativeImpact::Moderate, PutativeImpact::Modifier, 10.0)]
    fn transition_scores(
        #[case] hg19: PutativeImpact,
        #[case] hg38: PutativeImpact,
        #[case] expected: f64,
    ) {
        let transition = ImpactTransition {
            hg19: Some(hg19),
            hg38: Some(hg38),
        };

        assert_eq!(
            Scorer::default().significant_transition_score(&transition),
            expected
        );
    }

    #[test]
    fn unconfigured_transition_contributes_nothing() {
        let mut config = ScoringConfig::default();
        config.impact_transition_scores.shift_remove("HIGH-LOW");
        let transition = ImpactTransition {
            hg19: Some(PutativeImpact::Low),
            hg38: Some(PutativeImpact::High),
        };

        assert_eq!(
            Scorer::new(config).significant_transition_score(&transition),
            0.0
        );
    }

    #[test]
    fn transition_with_missing_impact() {
        let transition = ImpactTransition {
            hg19: None,
            hg38: Some(PutativeImpact::Moderate),
        };
        // Magnitude 3 from the missing side.
        assert_eq!(
            Scorer::default().significant_transition_score(&transition),
            15.0
        );
    }

    #[test]
    fn summary_is_ordered_by_tier() {
        let mut hg19 = vep("ENST001.3", "missense_variant", "MODERATE");
        hg19.clin_sig = "benign".into();
        hg19.sift = "tolerated(0.3)".into();
        let mut hg38 = vep("ENST001.3", "missense_variant", "MODERATE");
        hg38.clin_sig = "pathogenic".into();
        hg38.sift = "deleterious(0.01)".into();
        let record = VariantAnalysisRecord {
            pos_match: false,
            ..analyze(&[hg19], &[hg38])
        };
        let scored = Scorer::default().score(&record);

        assert_eq!(scored.priority_category, PriorityCategory::Critical);
        assert_eq!(
            scored.discordance_summary,
            vec![
                "Clinical significance change: BENIGN_TO_PATHOGENIC",
                "SIFT change: TOLERATED_TO_DELETERIOUS",
                "Position mismatch",
            ]
        );
    }
}
