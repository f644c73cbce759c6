//! VEP consequence terms and their putative impact.
use std::str::FromStr;

use parse_display::{Display, FromStr};
use strum::IntoEnumIterator;

/// Putative impact level.
///
/// The ordering follows declaration order, so `High < Moderate < Low < Modifier`.
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
pub enum PutativeImpact {
    High,
    Moderate,
    Low,
    Modifier,
}

impl PutativeImpact {
    /// Numeric severity used for transition magnitudes (`HIGH=4` down to `MODIFIER=1`).
    pub fn severity(&self) -> u8 {
        match self {
            PutativeImpact::High => 4,
            PutativeImpact::Moderate => 3,
            PutativeImpact::Low => 2,
            PutativeImpact::Modifier => 1,
        }
    }

    /// Whether the impact level is clinically significant, i.e., `HIGH` or `MODERATE`.
    pub fn is_significant(&self) -> bool {
        matches!(self, PutativeImpact::High | PutativeImpact::Moderate)
    }

    /// Parse a raw impact column value, yielding `None` for missing or unknown values.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        Self::from_str(value.trim().to_uppercase().as_str()).ok()
    }
}

/// Consequence terms as emitted by VEP.
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
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Consequence {
    // high impact
    TranscriptAblation,
    SpliceAcceptorVariant,
    SpliceDonorVariant,
    StopGained,
    FrameshiftVariant,
    StopLost,
    StartLost,
    TranscriptAmplification,
    FeatureElongation,
    FeatureTruncation,
    // moderate impact
    InframeInsertion,
    InframeDeletion,
    MissenseVariant,
    ProteinAlteringVariant,
    // low impact
    #[display("splice_donor_5th_base_variant")]
    #[serde(rename = "splice_donor_5th_base_variant")]
    SpliceDonor5thBaseVariant,
    SpliceRegionVariant,
    SpliceDonorRegionVariant,
    SplicePolypyrimidineTractVariant,
    IncompleteTerminalCodonVariant,
    StartRetainedVariant,
    StopRetainedVariant,
    SynonymousVariant,
    // modifier
    CodingSequenceVariant,
    #[display("mature_miRNA_variant")]
    #[serde(rename = "mature_miRNA_variant")]
    MatureMirnaVariant,
    #[display("5_prime_UTR_variant")]
    #[serde(rename = "5_prime_UTR_variant")]
    FivePrimeUtrVariant,
    #[display("3_prime_UTR_variant")]
    #[serde(rename = "3_prime_UTR_variant")]
    ThreePrimeUtrVariant,
    NonCodingTranscriptExonVariant,
    IntronVariant,
    #[display("NMD_transcript_variant")]
    #[serde(rename = "NMD_transcript_variant")]
    NmdTranscriptVariant,
    NonCodingTranscriptVariant,
    CodingTranscriptVariant,
    UpstreamGeneVariant,
    DownstreamGeneVariant,
    #[display("TFBS_ablation")]
    #[serde(rename = "TFBS_ablation")]
    TfbsAblation,
    #[display("TFBS_amplification")]
    #[serde(rename = "TFBS_amplification")]
    TfbsAmplification,
    #[display("TF_binding_site_variant")]
    #[serde(rename = "TF_binding_site_variant")]
    TfBindingSiteVariant,
    RegulatoryRegionAblation,
    RegulatoryRegionAmplification,
    RegulatoryRegionVariant,
    IntergenicVariant,
    SequenceVariant,
}

impl From<Consequence> for PutativeImpact {
    fn from(val: Consequence) -> Self {
        match val {
            Consequence::TranscriptAblation
            | Consequence::SpliceAcceptorVariant
            | Consequence::SpliceDonorVariant
            | Consequence::StopGained
            | Consequence::FrameshiftVariant
            | Consequence::StopLost
            | Consequence::StartLost
            | Consequence::TranscriptAmplification
            | Consequence::FeatureElongation
            | Consequence::FeatureTruncation => PutativeImpact::High,
            Consequence::InframeInsertion
            | Consequence::InframeDeletion
            | Consequence::MissenseVariant
            | Consequence::ProteinAlteringVariant => PutativeImpact::Moderate,
            Consequence::SpliceDonor5thBaseVariant
            | Consequence::SpliceRegionVariant
            | Consequence::SpliceDonorRegionVariant
            | Consequence::SplicePolypyrimidineTractVariant
            | Consequence::IncompleteTerminalCodonVariant
            | Consequence::StartRetainedVariant
            | Consequence::StopRetainedVariant
            | Consequence::SynonymousVariant => PutativeImpact::Low,
            Consequence::CodingSequenceVariant
            | Consequence::MatureMirnaVariant
            | Consequence::FivePrimeUtrVariant
            | Consequence::ThreePrimeUtrVariant
            | Consequence::NonCodingTranscriptExonVariant
            | Consequence::IntronVariant
            | Consequence::NmdTranscriptVariant
            | Consequence::NonCodingTranscriptVariant
            | Consequence::CodingTranscriptVariant
            | Consequence::UpstreamGeneVariant
            | Consequence::DownstreamGeneVariant
            | Consequence::TfbsAblation
            | Consequence::TfbsAmplification
            | Consequence::TfBindingSiteVariant
            | Consequence::RegulatoryRegionAblation
            | Consequence::RegulatoryRegionAmplification
            | Consequence::RegulatoryRegionVariant
            | Consequence::IntergenicVariant
            | Consequence::SequenceVariant => PutativeImpact::Modifier,
        }
    }
}

impl Consequence {
    /// Return vector of all values of `Consequence`.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    pub fn impact(&self) -> PutativeImpact {
        PutativeImpact::from(*self)
    }
}

/// Impact of a single raw consequence term; unknown terms are `MODIFIER`.
pub fn term_impact(term: &str) -> PutativeImpact {
    Consequence::from_str(term.trim())
        .map(|csq| csq.impact())
        .unwrap_or(PutativeImpact::Modifier)
}

/// Split a raw VEP consequence field (`&`- or `,`-joined terms) into trimmed terms.
pub fn split_terms(consequence: &str) -> impl Iterator<Item = &str> {
    consequence
        .split([',', '&'])
        .map(str::trim)
        .filter(|term| crate::common::is_present(term))
}
