//! Data model for the percentile tables and admission datasets.
//!
//! Everything here is plain data. The reference tables in [`crate::data`] are
//! built from these types once per process and only ever handed out by
//! shared reference.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One scored component of the exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Overall,
    Varc,
    Dilr,
    Qa,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Overall, Section::Varc, Section::Dilr, Section::Qa];

    /// Maximum raw marks obtainable in the section.
    pub fn max_marks(self) -> f64 {
        match self {
            Section::Overall => 204.0,
            Section::Varc => 72.0,
            Section::Dilr => 60.0,
            Section::Qa => 72.0,
        }
    }

    /// Marks as a percentage of [`Section::max_marks`].
    pub fn share_of_max(self, marks: f64) -> f64 {
        marks / self.max_marks() * 100.0
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Overall => "Overall",
            Section::Varc => "VARC",
            Section::Dilr => "DILR",
            Section::Qa => "QA",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overall" => Ok(Section::Overall),
            "varc" => Ok(Section::Varc),
            "dilr" => Ok(Section::Dilr),
            "qa" => Ok(Section::Qa),
            other => Err(format!(
                "unknown section '{other}' (expected overall, varc, dilr or qa)"
            )),
        }
    }
}

/// Qualitative trust label on a data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Maps a 0-100 confidence score onto a label.
    ///
    /// | Score   | Label  |
    /// |---------|--------|
    /// | >= 90   | High   |
    /// | >= 70   | Medium |
    /// | < 70    | Low    |
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 90 => Confidence::High,
            s if s >= 70 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        };
        f.write_str(label)
    }
}

/// A single row of a percentile/marks lookup table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingPoint {
    pub percentile: f64,
    pub marks: f64,
    pub confidence: Confidence,
    pub source: String,
}

impl MappingPoint {
    pub fn new(percentile: f64, marks: f64, confidence: Confidence, source: &str) -> Self {
        Self {
            percentile,
            marks,
            confidence,
            source: source.to_string(),
        }
    }
}

/// Institution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InstituteType {
    #[serde(rename = "Old IIM")]
    OldIim,
    #[serde(rename = "New IIM")]
    NewIim,
    #[serde(rename = "Baby IIM")]
    BabyIim,
}

impl InstituteType {
    pub fn label(self) -> &'static str {
        match self {
            InstituteType::OldIim => "Old IIM",
            InstituteType::NewIim => "New IIM",
            InstituteType::BabyIim => "Baby IIM",
        }
    }
}

impl fmt::Display for InstituteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InstituteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "old" | "oldiim" => Ok(InstituteType::OldIim),
            "new" | "newiim" => Ok(InstituteType::NewIim),
            "baby" | "babyiim" => Ok(InstituteType::BabyIim),
            _ => Err(format!(
                "unknown institute type '{s}' (expected old, new or baby)"
            )),
        }
    }
}

/// Sectional percentile cutoffs for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectionalCutoffs {
    pub varc: f64,
    pub dilr: f64,
    pub qa: f64,
}

/// Raw marks estimated to correspond to a cycle's cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EstimatedMarks {
    pub overall: u32,
    pub varc: u32,
    pub dilr: u32,
    pub qa: u32,
}

/// Selection-stage weights in percent.
///
/// By convention these add up to at most 100, which the source data does not
/// guarantee; see [`crate::filters::check_weights`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessWeights {
    pub cat: u32,
    pub pi: u32,
    pub wat: u32,
    pub academics: u32,
    pub work_exp: u32,
}

impl ProcessWeights {
    pub fn cat_weight(&self) -> u32 {
        self.cat
    }

    pub fn pi_wat_weight(&self) -> u32 {
        self.pi + self.wat
    }

    pub fn other_weight(&self) -> u32 {
        self.academics + self.work_exp
    }

    pub fn total(&self) -> u32 {
        self.cat_weight() + self.pi_wat_weight() + self.other_weight()
    }
}

/// One admission year's data for an institution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleData {
    pub overall_percentile: f64,
    pub sectional: SectionalCutoffs,
    pub estimated_marks: EstimatedMarks,
    pub process: ProcessWeights,
    pub source: String,
    pub confidence: u8,
    pub justification: String,
}

/// A primary admitting institution and its per-year cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionRecord {
    pub name: String,
    pub campus: String,
    pub established_year: u16,
    #[serde(rename = "type")]
    pub kind: InstituteType,
    pub nirf_ranking: u32,
    pub cycles: BTreeMap<u16, CycleData>,
}

impl InstitutionRecord {
    pub fn cycle(&self, year: u16) -> Option<&CycleData> {
        self.cycles.get(&year)
    }

    pub fn has_cycle(&self, year: u16) -> bool {
        self.cycles.contains_key(&year)
    }
}

/// Cutoffs published by a non-primary institute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OtherCutoff {
    pub overall: f64,
    pub varc: f64,
    pub dilr: f64,
    pub qa: f64,
}

/// Selection weights of a non-primary institute. Institutes use different
/// second-stage tests, so those are optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherProcess {
    pub cat: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gd: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spjat: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essay: Option<u32>,
    pub pi: u32,
    pub academics: u32,
    pub work_exp: u32,
}

/// A non-primary institute: a single current snapshot, no cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherInstituteRecord {
    pub name: String,
    pub programs: Vec<String>,
    pub cutoff: OtherCutoff,
    pub process: OtherProcess,
    pub fees: String,
    pub nirf_ranking: u32,
    pub source: String,
    pub confidence: u8,
}

impl OtherInstituteRecord {
    /// Parses the free-text fee into rupees.
    ///
    /// "₹20,000" is 20000 and "₹20.5 Lakhs" is 2050000. Returns `None` when no
    /// number can be found.
    pub fn fees_in_rupees(&self) -> Option<f64> {
        let digits: String = self
            .fees
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let amount: f64 = digits.parse().ok()?;
        if self.fees.to_ascii_lowercase().contains("lakh") {
            Some(amount * 100_000.0)
        } else {
            Some(amount)
        }
    }
}

/// Pointer to the curated free-resource spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSheet {
    pub name: String,
    pub url: String,
    pub description: String,
    pub categories: Vec<String>,
    pub last_updated: String,
}
