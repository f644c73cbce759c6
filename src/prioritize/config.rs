//! Weights of the clinical priority scoring.

use std::path::Path;

use indexmap::IndexMap;

use crate::analyze::ann::PutativeImpact;

/// Weights for the impact level transitions, keyed by the unordered pair of impacts.
///
/// Keys are written as `HIGH-MODERATE` with the more severe impact first.
pub type ImpactTransitionScores = IndexMap<String, f64>;

/// Key for an impact transition in [`ImpactTransitionScores`].
pub fn impact_transition_key(lhs: PutativeImpact, rhs: PutativeImpact) -> String {
    let (first, second) = if lhs <= rhs { (lhs, rhs) } else { (rhs, lhs) };
    format!("{}-{}", first, second)
}

/// Multiplicative factors of the clinical evidence override.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClinicalOverride {
    /// Applied to low impact variants with benign evidence.
    pub benign_reduction_factor: f64,
    /// Applied to variants with pathogenic evidence.
    pub pathogenic_boost_factor: f64,
}

impl Default for ClinicalOverride {
    fn default() -> Self {
        Self {
            benign_reduction_factor: 0.1,
            pathogenic_boost_factor: 2.0,
        }
    }
}

/// Additive weights of the individual discordance signals.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BaseScores {
    pub same_transcript_consequence_changes: f64,

    pub clinical_sig_benign_to_pathogenic: f64,
    pub clinical_sig_pathogenic_to_benign: f64,
    pub clinical_sig_vus_to_pathogenic: f64,
    pub clinical_sig_other_change: f64,

    pub sift_change: f64,
    pub polyphen_change: f64,

    pub gene_changes_high_impact: f64,
    pub gene_changes_moderate_impact: f64,
    pub gene_changes_low_impact: f64,
    pub gene_changes_mixed_impact: f64,
    /// Weight of gene changes without independent evidence, i.e., likely symbol synonyms.
    pub gene_changes_minimal_weight: f64,

    pub unmatched_consequences: f64,
    pub same_consequence_different_transcripts: f64,

    pub consequence_disjoint: f64,
    pub consequence_partial_overlap: f64,
    pub consequence_subset: f64,

    pub position_mismatch: f64,
    pub genotype_mismatch: f64,
    /// Position difference above 10bp.
    pub position_difference_moderate: f64,
    /// Position difference above 100bp, added on top of the moderate weight.
    pub position_difference_large: f64,
    pub ref_alt_swap: f64,

    pub has_clinical_data_bonus: f64,
    pub region_mapping_bonus: f64,
    pub high_impact_bonus: f64,
}

impl Default for BaseScores {
    fn default() -> Self {
        Self {
            same_transcript_consequence_changes: 10.0,
            clinical_sig_benign_to_pathogenic: 10.0,
            clinical_sig_pathogenic_to_benign: 8.0,
            clinical_sig_vus_to_pathogenic: 7.0,
            clinical_sig_other_change: 5.0,
            sift_change: 5.0,
            polyphen_change: 5.0,
            gene_changes_high_impact: 8.0,
            gene_changes_moderate_impact: 4.0,
            gene_changes_low_impact: 2.0,
            gene_changes_mixed_impact: 3.0,
            gene_changes_minimal_weight: 0.1,
            unmatched_consequences: 4.0,
            same_consequence_different_transcripts: 3.0,
            consequence_disjoint: 3.0,
            consequence_partial_overlap: 2.0,
            consequence_subset: 1.0,
            position_mismatch: 3.0,
            genotype_mismatch: 3.0,
            position_difference_moderate: 2.0,
            position_difference_large: 3.0,
            ref_alt_swap: 2.0,
            has_clinical_data_bonus: 2.0,
            region_mapping_bonus: 1.0,
            high_impact_bonus: 2.0,
        }
    }
}

/// Final score multiplier per priority category.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CategoryMultipliers {
    pub critical: f64,
    pub high: f64,
    pub moderate: f64,
    pub low: f64,
}

impl Default for CategoryMultipliers {
    fn default() -> Self {
        Self {
            critical: 1000.0,
            high: 100.0,
            moderate: 10.0,
            low: 1.0,
        }
    }
}

/// The complete, immutable weight table of the scorer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub impact_transition_scores: ImpactTransitionScores,
    pub clinical_override: ClinicalOverride,
    pub base_scores: BaseScores,
    pub category_multipliers: CategoryMultipliers,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use PutativeImpact::*;

        let impact_transition_scores = [
            (High, Moderate, 10.0),
            (High, Low, 12.0),
            (High, Modifier, 15.0),
            (Moderate, Low, 8.0),
            (Moderate, Modifier, 10.0),
            (Low, Modifier, 1.0),
        ]
        .into_iter()
        .map(|(lhs, rhs, score)| (impact_transition_key(lhs, rhs), score))
        .collect();

        Self {
            impact_transition_scores,
            clinical_override: Default::default(),
            base_scores: Default::default(),
            category_multipliers: Default::default(),
        }
    }
}

impl ScoringConfig {
    /// Load the configuration from a YAML file; missing keys take the default weights.
    ///
    /// Note that a given `impact_transition_scores` table replaces the default table as a
    /// whole.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open {}: {}", path.display(), e))?;
        serde_yaml::from_reader(std::io::BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("invalid scoring configuration {}: {}", path.display(), e))
    }

    /// Weight of the transition between two impact levels, if configured.
    pub fn impact_transition_score(&self, lhs: PutativeImpact, rhs: PutativeImpact) -> Option<f64> {
        self.impact_transition_scores
            .get(&impact_transition_key(lhs, rhs))
            .copied()
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn impact_transition_key_is_unordered() {
        assert_eq!(
            impact_transition_key(PutativeImpact::Modifier, PutativeImpact::High),
            "HIGH-MODIFIER"
        );
        assert_eq!(
            impact_transition_key(PutativeImpact::High, PutativeImpact::Modifier),
            "HIGH-MODIFIER"
        );
    }

    #[test]
    fn default_transition_scores() {
        let config = ScoringConfig::default();

        assert_eq!(
            config.impact_transition_score(PutativeImpact::Moderate, PutativeImpact::High),
            Some(10.0)
        );
        assert_eq!(
            config.impact_transition_score(PutativeImpact::Low, PutativeImpact::Modifier),
            Some(1.0)
        );
        assert_eq!(
            config.impact_transition_score(PutativeImpact::Low, PutativeImpact::Low),
            None
        );
    }

    #[test]
    fn default_serializes_to_yaml() -> Result<(), anyhow::Error> {
        let yaml = serde_yaml::to_string(&ScoringConfig::default())?;

        insta::assert_snapshot!(yaml, @r"
        impact_transition_scores:
          HIGH-MODERATE: 10.0
          HIGH-LOW: 12.0
          HIGH-MODIFIER: 15.0
          MODERATE-LOW: 8.0
          MODERATE-MODIFIER: 10.0
          LOW-MODIFIER: 1.0
        clinical_override:
          benign_reduction_factor: 0.1
          pathogenic_boost_factor: 2.0
        base_scores:
          same_transcript_consequence_changes: 10.0
          clinical_sig_benign_to_pathogenic: 10.0
          clinical_sig_pathogenic_to_benign: 8.0
          clinical_sig_vus_to_pathogenic: 7.0
          clinical_sig_other_change: 5.0
          sift_change: 5.0
          polyphen_change: 5.0
          gene_changes_high_impact: 8.0
          gene_changes_moderate_impact: 4.0
          gene_changes_low_impact: 2.0
          gene_changes_mixed_impact: 3.0
          gene_changes_minimal_weight: 0.1
          unmatched_consequences: 4.0
          same_consequence_different_transcripts: 3.0
          consequence_disjoint: 3.0
          consequence_partial_overlap: 2.0
          consequence_subset: 1.0
          position_mismatch: 3.0
          genotype_mismatch: 3.0
          position_difference_moderate: 2.0
          position_difference_large: 3.0
          ref_alt_swap: 2.0
          has_clinical_data_bonus: 2.0
          region_mapping_bonus: 1.0
          high_impact_bonus: 2.0
        category_multipliers:
          critical: 1000.0
          high: 100.0
          moderate: 10.0
          low: 1.0
        ");

        Ok(())
    }

    #[test]
    fn from_path_partial() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("scoring.yaml");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "base_scores:")?;
        writeln!(file, "  sift_change: 7.5")?;
        writeln!(file, "category_multipliers:")?;
        writeln!(file, "  critical: 5000")?;
        drop(file);

        let config = ScoringConfig::from_path(&path)?;

        assert_eq!(config.base_scores.sift_change, 7.5);
        assert_eq!(config.base_scores.polyphen_change, 5.0);
        assert_eq!(config.category_multipliers.critical, 5000.0);
        assert_eq!(config.category_multipliers.high, 100.0);
        assert_eq!(
            config.impact_transition_scores,
            ScoringConfig::default().impact_transition_scores
        );

        Ok(())
    }

    #[test]
    fn from_path_invalid() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("scoring.yaml");
        std::fs::write(&path, "base_scores: [1, 2]\n")?;

        let err = ScoringConfig::from_path(&path).expect_err("must fail");
        assert!(format!("{}", err).contains("invalid scoring configuration"));

        Ok(())
    }
}
