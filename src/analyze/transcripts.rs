//! Selection of the priority transcript (MANE first, canonical fallback) and HGVS concordance.

use std::str::FromStr;

use hgvs::parser::{HgvsVariant, NoRef};
use parse_display::{Display, FromStr};

use crate::{common::is_present, store::VepAnnotation};

/// MANE annotation state of the hg38 transcripts of a locus.
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
pub enum ManeFlag {
    #[display("MANE_Select")]
    #[serde(rename = "MANE_Select")]
    ManeSelect,
    #[display("MANE_Plus_Clinical")]
    #[serde(rename = "MANE_Plus_Clinical")]
    ManePlusClinical,
    Both,
    #[default]
    None,
}

/// How the priority transcript was selected.
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
pub enum TranscriptCrossbuildStatus {
    #[display("MANE_Select_Both_Builds")]
    #[serde(rename = "MANE_Select_Both_Builds")]
    ManeSelectBothBuilds,
    #[display("MANE_Plus_Clinical_Both_Builds")]
    #[serde(rename = "MANE_Plus_Clinical_Both_Builds")]
    ManePlusClinicalBothBuilds,
    #[display("MANE_hg38_Only")]
    #[serde(rename = "MANE_hg38_Only")]
    ManeHg38Only,
    #[display("Canonical_Fallback_Both_Builds")]
    #[serde(rename = "Canonical_Fallback_Both_Builds")]
    CanonicalFallbackBothBuilds,
    #[display("No_Matching_Transcripts")]
    #[serde(rename = "No_Matching_Transcripts")]
    NoMatchingTranscripts,
    #[default]
    #[display("No_Transcripts")]
    #[serde(rename = "No_Transcripts")]
    NoTranscripts,
}

impl TranscriptCrossbuildStatus {
    /// Whether the same transcript version is annotated in both builds.
    pub fn is_matched(&self) -> bool {
        matches!(
            self,
            TranscriptCrossbuildStatus::ManeSelectBothBuilds
                | TranscriptCrossbuildStatus::ManePlusClinicalBothBuilds
                | TranscriptCrossbuildStatus::CanonicalFallbackBothBuilds
        )
    }
}

/// Concordance of an HGVS description between the builds.
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
pub enum HgvsConcordance {
    Match,
    Mismatch,
    #[default]
    #[display("No_Analysis")]
    #[serde(rename = "No_Analysis")]
    NoAnalysis,
}

/// MANE transcripts found among the hg38 annotations.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ManeSummary {
    pub flag: ManeFlag,
    /// The MANE Select transcript if any, else the first MANE Plus Clinical one.
    pub transcript_id: Option<String>,
    /// All MANE transcripts, e.g., `MANE_Select:NM_000546.6; MANE_Plus_Clinical:NM_...`.
    pub details: String,
}

/// Priority transcript selection and its HGVS comparison for one locus.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PrioritySelection {
    pub hg19_canonical_transcript: String,
    pub hg38_canonical_transcript: String,
    pub hg38_mane: ManeSummary,
    /// The hg38 MANE transcript if the same version is annotated in hg19.
    pub hg19_mane_transcript_id: Option<String>,
    pub hg19_mane_details: String,
    pub status: TranscriptCrossbuildStatus,
    /// The selected transcript, `None` unless present in both builds.
    pub transcript_id: Option<String>,
    pub hgvsc_hg19: String,
    pub hgvsc_hg38: String,
    pub hgvsp_hg19: String,
    pub hgvsp_hg38: String,
    pub hgvsc_concordance: HgvsConcordance,
    pub hgvsp_concordance: HgvsConcordance,
}

/// Summarize the MANE annotations of transcript records.
pub fn mane_summary(records: &[VepAnnotation]) -> ManeSummary {
    let mut select = Vec::new();
    let mut plus_clinical = Vec::new();
    let mut details = Vec::new();
    for record in records.iter().filter(|record| record.is_transcript()) {
        if is_present(&record.mane_select) {
            select.push(record.feature.trim().to_string());
            details.push(format!("MANE_Select:{}", record.mane_select.trim()));
        } else if is_present(&record.mane_plus_clinical) {
            plus_clinical.push(record.feature.trim().to_string());
            details.push(format!(
                "MANE_Plus_Clinical:{}",
                record.mane_plus_clinical.trim()
            ));
        }
    }

    let flag = match (select.is_empty(), plus_clinical.is_empty()) {
        (false, false) => ManeFlag::Both,
        (false, true) => ManeFlag::ManeSelect,
        (true, false) => ManeFlag::ManePlusClinical,
        (true, true) => ManeFlag::None,
    };
    ManeSummary {
        flag,
        transcript_id: select.into_iter().chain(plus_clinical).next(),
        details: details.join("; "),
    }
}

/// The first transcript flagged canonical, or the empty string.
pub fn canonical_transcript(records: &[VepAnnotation]) -> String {
    records
        .iter()
        .find(|record| record.is_transcript() && record.canonical)
        .map(|record| record.feature.trim().to_string())
        .unwrap_or_default()
}

/// Percent-decode the `=` that VEP escapes in HGVS notation.
fn unescape_hgvs(value: &str) -> String {
    value.trim().replace("%3D", "=")
}

/// Whether two HGVS descriptions denote the same change on the same versioned sequence.
///
/// Both values are parsed and compared without reference bases; unparseable values are
/// compared as strings.
pub fn hgvs_equivalent(lhs: &str, rhs: &str) -> bool {
    let (lhs, rhs) = (unescape_hgvs(lhs), unescape_hgvs(rhs));
    match (HgvsVariant::from_str(&lhs), HgvsVariant::from_str(&rhs)) {
        (Ok(lhs), Ok(rhs)) => format!("{}", NoRef(&lhs)) == format!("{}", NoRef(&rhs)),
        _ => lhs == rhs,
    }
}

/// Concordance of two HGVS values, one missing side counts as mismatch.
pub fn hgvs_concordance(hg19: &str, hg38: &str) -> HgvsConcordance {
    match (is_present(hg19), is_present(hg38)) {
        (true, true) if hgvs_equivalent(hg19, hg38) => HgvsConcordance::Match,
        (false, false) => HgvsConcordance::NoAnalysis,
        _ => HgvsConcordance::Mismatch,
    }
}

fn find_transcript<'a>(records: &'a [VepAnnotation], id: &str) -> Option<&'a VepAnnotation> {
    records
        .iter()
        .find(|record| record.is_transcript() && record.feature.trim() == id)
}

/// Select the priority transcript: MANE Select, then MANE Plus Clinical, then matching
/// canonical transcripts.  Transcript versions must match exactly.
pub fn select_priority_transcript(
    hg19: &[VepAnnotation],
    hg38: &[VepAnnotation],
) -> PrioritySelection {
    let hg38_mane = mane_summary(hg38);
    let hg19_canonical_transcript = canonical_transcript(hg19);
    let hg38_canonical_transcript = canonical_transcript(hg38);

    let hg19_mane_transcript_id = hg38_mane
        .transcript_id
        .as_deref()
        .filter(|id| find_transcript(hg19, id).is_some())
        .map(str::to_string);
    let hg19_mane_details = match (&hg19_mane_transcript_id, hg38_mane.flag) {
        (Some(id), ManeFlag::ManeSelect) => format!("MANE_Select:{}", id),
        (Some(id), ManeFlag::ManePlusClinical) => format!("MANE_Plus_Clinical:{}", id),
        (Some(id), _) => id.clone(),
        (None, _) => String::from("Not_Present"),
    };

    let (status, transcript_id) = match (&hg38_mane.transcript_id, &hg19_mane_transcript_id) {
        (Some(_), Some(id)) => {
            let status = if hg38_mane.flag == ManeFlag::ManePlusClinical {
                TranscriptCrossbuildStatus::ManePlusClinicalBothBuilds
            } else {
                TranscriptCrossbuildStatus::ManeSelectBothBuilds
            };
            (status, Some(id.clone()))
        }
        (Some(_), None) => (TranscriptCrossbuildStatus::ManeHg38Only, None),
        (None, _) => {
            if !hg19_canonical_transcript.is_empty()
                && hg19_canonical_transcript == hg38_canonical_transcript
            {
                (
                    TranscriptCrossbuildStatus::CanonicalFallbackBothBuilds,
                    Some(hg19_canonical_transcript.clone()),
                )
            } else if !hg19_canonical_transcript.is_empty()
                || !hg38_canonical_transcript.is_empty()
            {
                (TranscriptCrossbuildStatus::NoMatchingTranscripts, None)
            } else {
                (TranscriptCrossbuildStatus::NoTranscripts, None)
            }
        }
    };

    let mut result = PrioritySelection {
        hg19_canonical_transcript,
        hg38_canonical_transcript,
        hg38_mane,
        hg19_mane_transcript_id,
        hg19_mane_details,
        status,
        transcript_id,
        ..Default::default()
    };

    if let Some(id) = result.transcript_id.clone() {
        if let Some(record) = find_transcript(hg19, &id) {
            result.hgvsc_hg19 = record.hgvsc.clone();
            result.hgvsp_hg19 = record.hgvsp.clone();
        }
        if let Some(record) = find_transcript(hg38, &id) {
            result.hgvsc_hg38 = record.hgvsc.clone();
            result.hgvsp_hg38 = record.hgvsp.clone();
        }
        result.hgvsc_concordance = hgvs_concordance(&result.hgvsc_hg19, &result.hgvsc_hg38);
        result.hgvsp_concordance = hgvs_concordance(&result.hgvsp_hg19, &result.hgvsp_hg38);
    }

    result
}
