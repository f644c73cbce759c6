//! Normalization of clinical evidence: clinical significance, SIFT, and PolyPhen.

use std::str::FromStr;

use parse_display::{Display, FromStr};

use crate::common::is_present;

/// Normalized clinical significance category.
#[derive(
    Debug,
    Default,
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
#[display(style = "SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinicalCategory {
    Pathogenic,
    Benign,
    Vus,
    Risk,
    DrugResponse,
    Protective,
    Other,
    #[default]
    None,
}

/// Class of a single clinical significance term.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum TermClass {
    Pathogenic,
    Benign,
    Uncertain,
    /// Any of the non-clinical categories.
    NonClinical(ClinicalCategory),
    Unknown,
}

/// Classify one term of a clinical significance string.
///
/// Known ClinVar terms are looked up first, keyword matching is the fallback.
fn classify_term(term: &str) -> TermClass {
    let term = term.trim().to_lowercase().replace(' ', "_");
    match term.as_str() {
        "pathogenic" | "likely_pathogenic" => TermClass::Pathogenic,
        "benign" | "likely_benign" => TermClass::Benign,
        "uncertain_significance"
        | "conflicting_interpretations_of_pathogenicity"
        | "conflicting_classifications_of_pathogenicity"
        | "low_penetrance"
        | "vus" => TermClass::Uncertain,
        "established_risk_allele" | "likely_risk_allele" | "uncertain_risk_allele"
        | "risk_factor" | "risk" => TermClass::NonClinical(ClinicalCategory::Risk),
        "drug_response" => TermClass::NonClinical(ClinicalCategory::DrugResponse),
        "protective" => TermClass::NonClinical(ClinicalCategory::Protective),
        "association" | "affects" => TermClass::NonClinical(ClinicalCategory::Other),
        "not_provided" | "other" | "no_classifications_from_unflagged_records" | "none" => {
            TermClass::NonClinical(ClinicalCategory::None)
        }
        _ => {
            if ["uncertain", "conflicting", "vus", "low_penetrance"]
                .iter()
                .any(|keyword| term.contains(keyword))
            {
                TermClass::Uncertain
            } else if term.contains("risk") {
                TermClass::NonClinical(ClinicalCategory::Risk)
            } else if term.contains("drug") {
                TermClass::NonClinical(ClinicalCategory::DrugResponse)
            } else if term.contains("protective") {
                TermClass::NonClinical(ClinicalCategory::Protective)
            } else if term.contains("association") {
                TermClass::NonClinical(ClinicalCategory::Other)
            } else if term.contains("pathogenic") {
                TermClass::Pathogenic
            } else if term.contains("benign") {
                TermClass::Benign
            } else {
                TermClass::Unknown
            }
        }
    }
}

/// Normalize a raw clinical significance string to a single category.
///
/// Uncertainty is conservative: conflicting or unclassifiable evidence yields `VUS`.
pub fn normalize_clinical_significance(raw: &str) -> ClinicalCategory {
    let raw = raw.trim();
    if !is_present(raw) {
        return ClinicalCategory::None;
    }
    // Already normalized labels map to themselves.
    if let Ok(category) = ClinicalCategory::from_str(raw) {
        return category;
    }

    let terms = match raw.chars().find(|c| [',', '/', '|', ';'].contains(c)) {
        Some(sep) => raw.split(sep).filter(|t| !t.trim().is_empty()).collect(),
        None => vec![raw],
    };
    let classes = terms.into_iter().map(classify_term).collect::<Vec<_>>();

    let has = |class: TermClass| classes.contains(&class);
    let non_clinical = classes
        .iter()
        .filter_map(|class| match class {
            TermClass::NonClinical(category) => Some(*category),
            _ => None,
        })
        .collect::<Vec<_>>();
    let pathogenic = has(TermClass::Pathogenic);
    let benign = has(TermClass::Benign);

    if has(TermClass::Uncertain) || has(TermClass::Unknown) || (pathogenic && benign) {
        ClinicalCategory::Vus
    } else if (pathogenic || benign) && !non_clinical.is_empty() {
        ClinicalCategory::Vus
    } else if pathogenic {
        ClinicalCategory::Pathogenic
    } else if benign {
        ClinicalCategory::Benign
    } else {
        match non_clinical.first() {
            Some(first) if non_clinical.iter().all(|category| category == first) => *first,
            Some(_) => ClinicalCategory::Vus,
            None => ClinicalCategory::None,
        }
    }
}

/// Priority of a clinical significance transition for manual review.
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
pub enum ReviewPriority {
    Critical,
    High,
    Moderate,
    Low,
}

/// Directional change of the normalized clinical significance from hg19 to hg38.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ClinicalChange {
    pub from: ClinicalCategory,
    pub to: ClinicalCategory,
}

impl std::fmt::Display for ClinicalChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_stable() {
            write!(f, "STABLE_{}", self.from)
        } else {
            write!(f, "{}_TO_{}", self.from, self.to)
        }
    }
}

impl ClinicalChange {
    pub fn new(from: ClinicalCategory, to: ClinicalCategory) -> Self {
        Self { from, to }
    }

    pub fn is_stable(&self) -> bool {
        self.from == self.to
    }

    /// Review priority of the transition; `None` for stable significance.
    pub fn priority(&self) -> Option<ReviewPriority> {
        use ClinicalCategory as C;

        if self.is_stable() {
            return None;
        }
        let priority = match (self.from, self.to) {
            (C::Pathogenic, C::Benign) | (C::Benign, C::Pathogenic) => ReviewPriority::Critical,
            (C::Vus | C::None, C::Pathogenic) | (C::Pathogenic, C::Vus) => {
                ReviewPriority::Critical
            }
            (C::Pathogenic, C::Risk | C::Other | C::None)
            | (C::Risk | C::Other, C::Pathogenic) => ReviewPriority::High,
            (C::Benign, C::Vus) | (C::Vus, C::Benign) => ReviewPriority::Moderate,
            (C::None, C::Benign) | (C::Pathogenic | C::Benign, C::None) => {
                ReviewPriority::Moderate
            }
            (C::None, C::Vus) | (C::Vus, C::None) => ReviewPriority::Low,
            _ => ReviewPriority::Moderate,
        };
        Some(priority)
    }

    /// How concerning the direction of the change is for categorizing a variant.
    ///
    /// Unlike [`ClinicalChange::priority`], which rates every transition for review, this
    /// is `None` for reassuring directions such as pathogenic to benign.
    pub fn concern(&self) -> Option<ReviewPriority> {
        use ClinicalCategory as C;

        match (self.from, self.to) {
            (C::Benign | C::Vus | C::None, C::Pathogenic) => Some(ReviewPriority::Critical),
            (C::Pathogenic, C::Vus | C::Risk | C::Other | C::None)
            | (C::Risk | C::Other, C::Pathogenic)
            | (C::Benign, C::Vus) => Some(ReviewPriority::High),
            _ => None,
        }
    }
}

/// SIFT prediction.
#[derive(
    Debug, PartialEq, Eq, Hash, Clone, Copy, Display, FromStr, serde::Serialize, serde::Deserialize,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SiftPrediction {
    Deleterious,
    Tolerated,
}

/// PolyPhen prediction.
#[derive(
    Debug, PartialEq, Eq, Hash, Clone, Copy, Display, FromStr, serde::Serialize, serde::Deserialize,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PolyphenPrediction {
    ProbablyDamaging,
    PossiblyDamaging,
    Benign,
}

impl PolyphenPrediction {
    pub fn is_damaging(&self) -> bool {
        matches!(
            self,
            PolyphenPrediction::ProbablyDamaging | PolyphenPrediction::PossiblyDamaging
        )
    }
}

/// Extract the score in parentheses, e.g., `0.01` from `deleterious(0.01)`.
fn parenthesized_score(value: &str) -> Option<f64> {
    let start = value.find('(')?;
    let end = start + value[start..].find(')')?;
    value[start + 1..end].trim().parse().ok()
}

/// Parse a VEP SIFT value into prediction and score.
pub fn parse_sift(raw: &str) -> (Option<SiftPrediction>, Option<f64>) {
    let raw = raw.trim().to_lowercase();
    let prediction = if !is_present(&raw) {
        None
    } else if raw.contains("deleterious") {
        Some(SiftPrediction::Deleterious)
    } else if raw.contains("tolerated") {
        Some(SiftPrediction::Tolerated)
    } else {
        None
    };
    match prediction {
        Some(prediction) => (Some(prediction), parenthesized_score(&raw)),
        None => (None, None),
    }
}

/// Parse a VEP PolyPhen value into prediction and score.
pub fn parse_polyphen(raw: &str) -> (Option<PolyphenPrediction>, Option<f64>) {
    let raw = raw.trim().to_lowercase();
    let prediction = if !is_present(&raw) {
        None
    } else if raw.contains("probably_damaging") {
        Some(PolyphenPrediction::ProbablyDamaging)
    } else if raw.contains("possibly_damaging") {
        Some(PolyphenPrediction::PossiblyDamaging)
    } else if raw.contains("benign") {
        Some(PolyphenPrediction::Benign)
    } else {
        None
    };
    match prediction {
        Some(prediction) => (Some(prediction), parenthesized_score(&raw)),
        None => (None, None),
    }
}

/// Label for a SIFT change crossing the tolerated/deleterious boundary, e.g.,
/// `TOLERATED_TO_DELETERIOUS`; empty otherwise.
pub fn sift_change(hg19: Option<SiftPrediction>, hg38: Option<SiftPrediction>) -> String {
    match (hg19, hg38) {
        (Some(hg19), Some(hg38)) if hg19 != hg38 => {
            format!("{}_TO_{}", hg19, hg38).to_uppercase()
        }
        _ => String::new(),
    }
}

/// Label for a PolyPhen change crossing the benign/damaging boundary; empty otherwise.
///
/// Changes between the two damaging levels are not flagged.
pub fn polyphen_change(
    hg19: Option<PolyphenPrediction>,
    hg38: Option<PolyphenPrediction>,
) -> String {
    match (hg19, hg38) {
        (Some(hg19), Some(hg38)) if hg19.is_damaging() != hg38.is_damaging() => {
            format!("{}_TO_{}", hg19, hg38).to_uppercase()
        }
        _ => String::new(),
    }
}

/// Split a source alleles string on `/` or `,` into reference and alternative.
pub fn extract_genotype(alleles: &str) -> (String, String) {
    let alleles = alleles.trim();
    if alleles.is_empty() {
        return (String::new(), String::new());
    }
    let mut parts = if alleles.contains('/') {
        alleles.split('/')
    } else if alleles.contains(',') {
        alleles.split(',')
    } else {
        return (alleles.to_string(), String::new());
    };
    let reference = parts.next().unwrap_or_default().trim().to_string();
    let alternative = parts.next().unwrap_or_default().trim().to_string();
    (reference, alternative)
}
