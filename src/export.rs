//! CSV and JSON export of the reference datasets.
//!
//! CSV exports are positional: every row type declares its header once and
//! produces its cells in exactly that order. All cells are quoted and
//! embedded quotes are doubled.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info};

use crate::calculator::{PercentileTableRow, SectionMarks};
use crate::data::ReferenceData;
use crate::filters::{self, DataQuality, LOW_PI_WAT_MIN_CAT_WEIGHT, SortKey, TypeFilter, WeightProfile};
use crate::interpolate::PercentileTables;
use crate::model::{InstitutionRecord, OtherInstituteRecord, ResourceSheet};

/// Category column value; only general-category cutoffs are published.
pub const DEFAULT_CATEGORY: &str = "General-Male";

/// A flat record with a fixed column order.
pub trait ExportRow {
    const HEADERS: &'static [&'static str];

    /// Cell values in [`ExportRow::HEADERS`] order.
    fn cells(&self) -> Vec<String>;
}

/// One `(institution, year)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionRow {
    pub institute: String,
    pub nirf_ranking: u32,
    pub year: u16,
    pub category: String,
    pub overall_percentile_cutoff: f64,
    pub varc_percentile: f64,
    pub dilr_percentile: f64,
    pub qa_percentile: f64,
    pub estimated_overall_marks: u32,
    pub estimated_varc_marks: u32,
    pub estimated_dilr_marks: u32,
    pub estimated_qa_marks: u32,
    pub cat_weight_pct: u32,
    pub pi_wat_weight_pct: u32,
    pub academics_weight_pct: u32,
    pub work_exp_weight_pct: u32,
    pub source_urls: String,
    pub confidence_score: u8,
}

impl ExportRow for InstitutionRow {
    const HEADERS: &'static [&'static str] = &[
        "Institute",
        "NIRF_Ranking",
        "Year",
        "Category",
        "OverallPercentileCutoff",
        "VARC_percentile",
        "DILR_percentile",
        "QA_percentile",
        "EstimatedOverallMarks",
        "EstimatedVARCMarks",
        "EstimatedDILRMarks",
        "EstimatedQAMarks",
        "CAT_weight_pct",
        "PI_WAT_weight_pct",
        "Academics_weight_pct",
        "WorkExp_weight_pct",
        "SourceURLs",
        "ConfidenceScore",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.institute.clone(),
            self.nirf_ranking.to_string(),
            self.year.to_string(),
            self.category.clone(),
            self.overall_percentile_cutoff.to_string(),
            self.varc_percentile.to_string(),
            self.dilr_percentile.to_string(),
            self.qa_percentile.to_string(),
            self.estimated_overall_marks.to_string(),
            self.estimated_varc_marks.to_string(),
            self.estimated_dilr_marks.to_string(),
            self.estimated_qa_marks.to_string(),
            self.cat_weight_pct.to_string(),
            self.pi_wat_weight_pct.to_string(),
            self.academics_weight_pct.to_string(),
            self.work_exp_weight_pct.to_string(),
            self.source_urls.clone(),
            self.confidence_score.to_string(),
        ]
    }
}

/// Expands every institution into one row per cycle, years ascending.
pub fn institution_rows(records: &[InstitutionRecord]) -> Vec<InstitutionRow> {
    records
        .iter()
        .flat_map(|record| {
            record.cycles.iter().map(move |(year, cycle)| InstitutionRow {
                institute: record.name.clone(),
                nirf_ranking: record.nirf_ranking,
                year: *year,
                category: DEFAULT_CATEGORY.to_string(),
                overall_percentile_cutoff: cycle.overall_percentile,
                varc_percentile: cycle.sectional.varc,
                dilr_percentile: cycle.sectional.dilr,
                qa_percentile: cycle.sectional.qa,
                estimated_overall_marks: cycle.estimated_marks.overall,
                estimated_varc_marks: cycle.estimated_marks.varc,
                estimated_dilr_marks: cycle.estimated_marks.dilr,
                estimated_qa_marks: cycle.estimated_marks.qa,
                cat_weight_pct: cycle.process.cat_weight(),
                pi_wat_weight_pct: cycle.process.pi_wat_weight(),
                academics_weight_pct: cycle.process.academics,
                work_exp_weight_pct: cycle.process.work_exp,
                source_urls: cycle.source.clone(),
                confidence_score: cycle.confidence,
            })
        })
        .collect()
}

/// One non-primary institute.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherInstituteRow {
    pub institute: String,
    pub programs: String,
    pub overall_cutoff: f64,
    pub varc_cutoff: f64,
    pub dilr_cutoff: f64,
    pub qa_cutoff: f64,
    pub cat_weight: u32,
    pub gd_weight: u32,
    pub pi_weight: u32,
    pub fees: String,
    pub source: String,
    pub confidence: u8,
}

impl ExportRow for OtherInstituteRow {
    const HEADERS: &'static [&'static str] = &[
        "Institute",
        "Programs",
        "OverallCutoff",
        "VARC_Cutoff",
        "DILR_Cutoff",
        "QA_Cutoff",
        "CAT_Weight",
        "GD_Weight",
        "PI_Weight",
        "Fees",
        "Source",
        "Confidence",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.institute.clone(),
            self.programs.clone(),
            self.overall_cutoff.to_string(),
            self.varc_cutoff.to_string(),
            self.dilr_cutoff.to_string(),
            self.qa_cutoff.to_string(),
            self.cat_weight.to_string(),
            self.gd_weight.to_string(),
            self.pi_weight.to_string(),
            self.fees.clone(),
            self.source.clone(),
            self.confidence.to_string(),
        ]
    }
}

/// Program names are joined with `"; "` so the cell never needs a comma.
pub fn other_institute_rows(records: &[OtherInstituteRecord]) -> Vec<OtherInstituteRow> {
    records
        .iter()
        .map(|inst| OtherInstituteRow {
            institute: inst.name.clone(),
            programs: inst.programs.join("; "),
            overall_cutoff: inst.cutoff.overall,
            varc_cutoff: inst.cutoff.varc,
            dilr_cutoff: inst.cutoff.dilr,
            qa_cutoff: inst.cutoff.qa,
            cat_weight: inst.process.cat,
            gd_weight: inst.process.gd.unwrap_or(0),
            pi_weight: inst.process.pi,
            fees: inst.fees.clone(),
            source: inst.source.clone(),
            confidence: inst.confidence,
        })
        .collect()
}

impl ExportRow for PercentileTableRow {
    const HEADERS: &'static [&'static str] = &[
        "Target Percentile",
        "Overall Marks",
        "VARC Marks",
        "DILR Marks",
        "QA Marks",
        "Overall % of Max",
        "VARC % of Max",
        "DILR % of Max",
        "QA % of Max",
    ];

    fn cells(&self) -> Vec<String> {
        let not_available = || "N/A".to_string();
        let marks = |m: Option<SectionMarks>| m.map_or_else(not_available, |m| m.marks.to_string());
        let share = |m: Option<SectionMarks>| {
            m.map_or_else(not_available, |m| format!("{:.1}%", m.share_of_max))
        };
        vec![
            format!("{}%", self.percentile),
            self.overall.marks.to_string(),
            marks(self.varc),
            marks(self.dilr),
            marks(self.qa),
            share(Some(self.overall)),
            share(self.varc),
            share(self.dilr),
            share(self.qa),
        ]
    }
}

/// Writes the header followed by `rows` to `writer`.
pub fn write_csv<W: Write, R: ExportRow>(writer: W, rows: &[R]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    writer.write_record(R::HEADERS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;

    debug!(rows = rows.len(), columns = R::HEADERS.len(), "CSV written");
    Ok(())
}

/// Renders `rows` as CSV text.
pub fn render_csv<R: ExportRow>(rows: &[R]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, rows)?;
    String::from_utf8(buffer).context("CSV output was not valid UTF-8")
}

/// Header block of the JSON export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub generated_at: String,
    pub total_institutions: usize,
    pub total_other_institutes: usize,
    pub data_source: &'static str,
    pub confidence_threshold: &'static str,
    pub max_marks: f64,
    pub target_years: Vec<u16>,
}

/// The consolidated JSON export. Borrows the reference data it describes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub metadata: Metadata,
    pub percentile_mappings: &'a PercentileTables,
    pub institutions: &'a [InstitutionRecord],
    pub other_institutes: &'a [OtherInstituteRecord],
    pub low_pi_wat_institutes: Vec<WeightProfile>,
    pub free_resource_sheet: &'a ResourceSheet,
    pub data_quality: DataQuality,
}

/// Assembles the export document with a caller-supplied timestamp.
pub fn build_document(data: &ReferenceData, generated_at: DateTime<Utc>) -> ExportDocument<'_> {
    let latest = data.mappings.latest_year();
    let low_pi_wat_institutes = latest
        .map(|year| {
            filters::low_pi_wat(
                &data.institutions,
                year,
                LOW_PI_WAT_MIN_CAT_WEIGHT,
                TypeFilter::All,
                SortKey::CatWeightDesc { year },
            )
        })
        .unwrap_or_default();

    ExportDocument {
        metadata: Metadata {
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            total_institutions: data.institutions.len(),
            total_other_institutes: data.other_institutes.len(),
            data_source: "Official IIM websites and verified sources",
            confidence_threshold: "Data with confidence score >= 70",
            max_marks: crate::model::Section::Overall.max_marks(),
            target_years: data.mappings.years(),
        },
        percentile_mappings: &data.mappings,
        institutions: &data.institutions,
        other_institutes: &data.other_institutes,
        low_pi_wat_institutes,
        free_resource_sheet: &data.resource_sheet,
        data_quality: filters::data_quality(&data.institutions),
    }
}

/// Pretty-printed (2-space indent) JSON stamped with `generated_at`.
pub fn to_json_at(data: &ReferenceData, generated_at: DateTime<Utc>) -> Result<String> {
    let document = build_document(data, generated_at);
    serde_json::to_string_pretty(&document).context("Failed to serialize export document")
}

/// Pretty-printed JSON stamped with the current time.
#[tracing::instrument(skip(data))]
pub fn to_json(data: &ReferenceData) -> Result<String> {
    let json = to_json_at(data, Utc::now())?;
    info!(bytes = json.len(), "JSON export rendered");
    Ok(json)
}
