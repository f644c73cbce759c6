//! Reconciliation of the transcript annotations of one locus across the two builds.
//!
//! Matching is greedy and runs in three tiers, each removing what it matched:
//!
//! 1. transcripts with the same version-stripped identifier are paired and compared,
//! 2. consequence terms shared by the remaining transcripts of both builds are matched,
//! 3. whatever is left is flagged if it carries a `HIGH` or `MODERATE` consequence.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use parse_display::{Display, FromStr};

use super::ann::{split_terms, term_impact, PutativeImpact};
use crate::store::VepAnnotation;

/// Strip the trailing `.N` version from a transcript identifier.
pub fn normalize_transcript_id(id: &str) -> &str {
    let id = id.trim();
    match id.rsplit_once('.') {
        Some((stem, version))
            if !stem.is_empty()
                && !version.is_empty()
                && version.bytes().all(|b| b.is_ascii_digit()) =>
        {
            stem
        }
        _ => id,
    }
}

/// Relation of the two builds' (versioned) transcript identifier sets.
#[derive(
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Display,
    FromStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRelationship {
    #[default]
    NoTranscripts,
    Matched,
    #[display("hg19_subset_of_hg38")]
    #[serde(rename = "hg19_subset_of_hg38")]
    Hg19SubsetOfHg38,
    #[display("hg38_subset_of_hg19")]
    #[serde(rename = "hg38_subset_of_hg19")]
    Hg38SubsetOfHg19,
    DisjointTranscripts,
    PartialOverlapTranscripts,
}

/// Relation of the two builds' consequence term sets.
#[derive(
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Display,
    FromStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConsequenceRelationship {
    #[default]
    NoConsequences,
    Matched,
    DisjointConsequences,
    #[display("hg19_subset_of_hg38")]
    #[serde(rename = "hg19_subset_of_hg38")]
    Hg19SubsetOfHg38,
    #[display("hg38_subset_of_hg19")]
    #[serde(rename = "hg38_subset_of_hg19")]
    Hg38SubsetOfHg19,
    PartialOverlapConsequences,
}

/// Result of reconciling the transcripts of one locus.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Reconciliation {
    /// Tier 1 pairs whose consequence differs.
    pub same_transcript_consequence_changes: u32,
    /// Tier 1 pairs whose impact differs.
    pub impact_changes: u32,
    /// hg19 impact of the most severe tier 1 impact change.
    pub impact_change_hg19: Option<PutativeImpact>,
    /// hg38 impact of the most severe tier 1 impact change.
    pub impact_change_hg38: Option<PutativeImpact>,
    /// Tier 1 pairs whose gene symbol differs.
    pub gene_changes: u32,
    /// Consequence terms matched in tier 2.
    pub same_consequence_different_transcripts: u32,
    /// Whether the tier 3 residual carries a `HIGH` or `MODERATE` term (0 or 1).
    pub unmatched_consequences: u32,
    /// `ID(consequence)` of the hg19 side of each tier 1 consequence change.
    pub problematic_transcripts_hg19: Vec<String>,
    /// `ID(consequence)` of the hg38 side of each tier 1 consequence change.
    pub problematic_transcripts_hg38: Vec<String>,
    /// Number of distinct transcripts on both sides.
    pub transcript_pairs_analyzed: u32,
    pub transcript_relationship: TranscriptRelationship,
    pub consequence_relationship: ConsequenceRelationship,
    /// Sorted consequence terms over all hg19 transcripts.
    pub hg19_consequences: Vec<String>,
    /// Sorted consequence terms over all hg38 transcripts.
    pub hg38_consequences: Vec<String>,
}

impl Reconciliation {
    /// The sorted `HIGH`/`MODERATE` consequence terms of hg19.
    pub fn hg19_high_impact_consequences(&self) -> Vec<&str> {
        significant_terms(&self.hg19_consequences)
    }

    /// The sorted `HIGH`/`MODERATE` consequence terms of hg38.
    pub fn hg38_high_impact_consequences(&self) -> Vec<&str> {
        significant_terms(&self.hg38_consequences)
    }
}

fn significant_terms(terms: &[String]) -> Vec<&str> {
    terms
        .iter()
        .map(String::as_str)
        .filter(|term| term_impact(term).is_significant())
        .collect()
}

/// Index transcripts by normalized identifier; the first record of an identifier wins.
fn by_normalized_id<'a>(transcripts: &[&'a VepAnnotation]) -> IndexMap<&'a str, &'a VepAnnotation> {
    let mut result = IndexMap::new();
    for &transcript in transcripts {
        let id = normalize_transcript_id(&transcript.feature);
        if id.is_empty() {
            continue;
        }
        result.entry(id).or_insert(transcript);
    }
    result
}

fn term_set<'a, I>(transcripts: I) -> BTreeSet<&'a str>
where
    I: IntoIterator<Item = &'a VepAnnotation>,
{
    transcripts
        .into_iter()
        .flat_map(|transcript| split_terms(&transcript.consequence))
        .collect()
}

fn transcript_relationship(
    hg19: &BTreeSet<&str>,
    hg38: &BTreeSet<&str>,
) -> TranscriptRelationship {
    if hg19.is_empty() && hg38.is_empty() {
        TranscriptRelationship::NoTranscripts
    } else if hg19 == hg38 {
        TranscriptRelationship::Matched
    } else if hg19.is_subset(hg38) {
        TranscriptRelationship::Hg19SubsetOfHg38
    } else if hg38.is_subset(hg19) {
        TranscriptRelationship::Hg38SubsetOfHg19
    } else if hg19.is_disjoint(hg38) {
        TranscriptRelationship::DisjointTranscripts
    } else {
        TranscriptRelationship::PartialOverlapTranscripts
    }
}

fn consequence_relationship(
    hg19: &BTreeSet<&str>,
    hg38: &BTreeSet<&str>,
) -> ConsequenceRelationship {
    if hg19.is_empty() && hg38.is_empty() {
        ConsequenceRelationship::NoConsequences
    } else if hg19 == hg38 {
        ConsequenceRelationship::Matched
    } else if hg19.is_disjoint(hg38) {
        ConsequenceRelationship::DisjointConsequences
    } else if hg19.is_subset(hg38) {
        ConsequenceRelationship::Hg19SubsetOfHg38
    } else if hg38.is_subset(hg19) {
        ConsequenceRelationship::Hg38SubsetOfHg19
    } else {
        ConsequenceRelationship::PartialOverlapConsequences
    }
}

/// Rank of an impact change: the more severe side first, then the distance.
fn impact_change_rank((hg19, hg38): (Option<PutativeImpact>, Option<PutativeImpact>)) -> (u8, u8) {
    let severity = |impact: Option<PutativeImpact>| impact.map(|i| i.severity()).unwrap_or(0);
    let (hg19, hg38) = (severity(hg19), severity(hg38));
    (hg19.max(hg38), hg19.abs_diff(hg38))
}

fn transcripts(records: &[VepAnnotation]) -> Vec<&VepAnnotation> {
    records
        .iter()
        .filter(|record| record.is_transcript() && !record.feature.trim().is_empty())
        .collect()
}

/// Reconcile the transcript records of one locus.
///
/// Records that are not transcripts or that have an empty identifier are ignored.
pub fn reconcile(hg19: &[VepAnnotation], hg38: &[VepAnnotation]) -> Reconciliation {
    let hg19 = transcripts(hg19);
    let hg38 = transcripts(hg38);

    let mut result = Reconciliation::default();

    let hg19_ids = hg19
        .iter()
        .map(|t| t.feature.trim())
        .collect::<BTreeSet<_>>();
    let hg38_ids = hg38
        .iter()
        .map(|t| t.feature.trim())
        .collect::<BTreeSet<_>>();
    result.transcript_pairs_analyzed = (hg19_ids.len() + hg38_ids.len()) as u32;
    result.transcript_relationship = transcript_relationship(&hg19_ids, &hg38_ids);

    let hg19_terms = term_set(hg19.iter().copied());
    let hg38_terms = term_set(hg38.iter().copied());
    result.consequence_relationship = consequence_relationship(&hg19_terms, &hg38_terms);
    result.hg19_consequences = hg19_terms.iter().map(|t| t.to_string()).collect();
    result.hg38_consequences = hg38_terms.iter().map(|t| t.to_string()).collect();

    // Tier 1: identity match on the version-stripped identifier.
    let mut hg19_rest = by_normalized_id(&hg19);
    let mut hg38_rest = by_normalized_id(&hg38);
    let mut most_severe = (None, None);
    let shared_ids = hg19_rest
        .keys()
        .filter(|id| hg38_rest.contains_key(*id))
        .copied()
        .collect::<Vec<_>>();
    for id in shared_ids {
        let (Some(lhs), Some(rhs)) = (hg19_rest.shift_remove(id), hg38_rest.shift_remove(id))
        else {
            continue;
        };
        if lhs.consequence.trim() != rhs.consequence.trim() {
            result.same_transcript_consequence_changes += 1;
            result
                .problematic_transcripts_hg19
                .push(format!("{}({})", lhs.feature.trim(), lhs.consequence.trim()));
            result
                .problematic_transcripts_hg38
                .push(format!("{}({})", rhs.feature.trim(), rhs.consequence.trim()));
        }
        if !lhs.impact.trim().eq_ignore_ascii_case(rhs.impact.trim()) {
            result.impact_changes += 1;
            let pair = (
                PutativeImpact::parse_lenient(&lhs.impact),
                PutativeImpact::parse_lenient(&rhs.impact),
            );
            if impact_change_rank(pair) > impact_change_rank(most_severe) {
                most_severe = pair;
            }
        }
        if lhs.symbol.trim() != rhs.symbol.trim() {
            result.gene_changes += 1;
        }
    }

    (result.impact_change_hg19, result.impact_change_hg38) = most_severe;

    // Tier 2: consequence terms shared between the remainders.
    let shared_terms = term_set(hg19_rest.values().copied())
        .intersection(&term_set(hg38_rest.values().copied()))
        .copied()
        .collect::<BTreeSet<_>>();
    result.same_consequence_different_transcripts = shared_terms.len() as u32;
    let carries_shared =
        |t: &&VepAnnotation| split_terms(&t.consequence).any(|term| shared_terms.contains(term));
    hg19_rest.retain(|_, t| !carries_shared(t));
    hg38_rest.retain(|_, t| !carries_shared(t));

    // Tier 3: only significant residual terms are reported.
    let residual_significant = hg19_rest
        .values()
        .chain(hg38_rest.values())
        .flat_map(|t| split_terms(&t.consequence))
        .any(|term| term_impact(term).is_significant());
    result.unmatched_consequences = u32::from(residual_significant);

    result
}
