//! Candidate-facing conversions built on the interpolation engine: required
//! marks for target percentiles, predicted percentiles for raw scores, and
//! the percentile -> marks quick-reference table.
//!
//! Inputs are validated here, before the engine runs.

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::debug;

use crate::interpolate::{LookupError, PercentileTables, Precision};
use crate::model::Section;

/// Percentiles shown in the quick-reference table.
pub const TARGET_PERCENTILES: [f64; 6] = [90.0, 95.0, 97.0, 99.0, 99.5, 99.9];

/// How hard a target percentile is to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Difficulty {
    #[serde(rename = "Extremely Difficult")]
    ExtremelyDifficult,
    #[serde(rename = "Very Difficult")]
    VeryDifficult,
    Difficult,
    Moderate,
    Achievable,
}

impl Difficulty {
    pub fn for_percentile(percentile: f64) -> Self {
        match percentile {
            p if p >= 99.0 => Difficulty::ExtremelyDifficult,
            p if p >= 95.0 => Difficulty::VeryDifficult,
            p if p >= 90.0 => Difficulty::Difficult,
            p if p >= 80.0 => Difficulty::Moderate,
            _ => Difficulty::Achievable,
        }
    }
}

/// Rejects percentiles outside `[0, 100]`.
pub fn check_percentile(section: Section, percentile: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&percentile) {
        bail!("{section} percentile must be between 0 and 100, got {percentile}");
    }
    Ok(())
}

/// Rejects marks below zero or above the section maximum.
pub fn check_marks(section: Section, marks: f64) -> Result<()> {
    let max = section.max_marks();
    if !(0.0..=max).contains(&marks) {
        bail!("{section} marks must be between 0 and {max}, got {marks}");
    }
    Ok(())
}

/// Highest raw score accepted per section by the predictor.
pub fn max_predictable_score(section: Section) -> f64 {
    match section {
        Section::Overall => 100.0,
        Section::Varc => 34.0,
        Section::Dilr => 32.0,
        Section::Qa => 34.0,
    }
}

fn check_score(section: Section, score: f64) -> Result<()> {
    let max = max_predictable_score(section);
    if !(0.0..=max).contains(&score) {
        bail!("{section} score must be between 0 and {max}, got {score}");
    }
    Ok(())
}

/// Target percentiles for the mark calculator. Sectional targets are optional.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Targets {
    pub overall: f64,
    pub varc: Option<f64>,
    pub dilr: Option<f64>,
    pub qa: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredMarks {
    pub overall: f64,
    pub varc: Option<f64>,
    pub dilr: Option<f64>,
    pub qa: Option<f64>,
    /// Sum of the sectional requirements that were asked for.
    pub total_sectional: f64,
    pub difficulty: Difficulty,
}

/// Marks needed for each target, rounded to whole marks.
///
/// A section without a table for `year` is converted with the
/// `fallback_year` table instead. Fails on out-of-range targets and when
/// neither year has the table.
pub fn required_marks(
    tables: &PercentileTables,
    year: u16,
    fallback_year: u16,
    targets: &Targets,
) -> Result<RequiredMarks> {
    check_percentile(Section::Overall, targets.overall)?;
    let sectional = [
        (Section::Varc, targets.varc),
        (Section::Dilr, targets.dilr),
        (Section::Qa, targets.qa),
    ];
    for (section, target) in sectional {
        if let Some(p) = target {
            check_percentile(section, p)?;
        }
    }

    let convert = |section: Section, percentile: f64| -> Result<f64, LookupError> {
        let marks = tables
            .table_or_fallback(year, section, fallback_year)?
            .marks_for_percentile(percentile)?;
        Ok(Precision::WholeMarks.apply(marks))
    };

    let overall = convert(Section::Overall, targets.overall)?;
    let mut sectional_marks = [None; 3];
    for (slot, (section, target)) in sectional_marks.iter_mut().zip(sectional) {
        if let Some(p) = target {
            *slot = Some(convert(section, p)?);
        }
    }
    let [varc, dilr, qa] = sectional_marks;
    let total_sectional: f64 = sectional_marks.iter().flatten().sum();

    debug!(year, overall, ?varc, ?dilr, ?qa, "Required marks computed");

    Ok(RequiredMarks {
        overall,
        varc,
        dilr,
        qa,
        total_sectional,
        difficulty: Difficulty::for_percentile(targets.overall),
    })
}

/// Raw sectional scores for the percentile predictor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionScores {
    pub varc: f64,
    pub dilr: f64,
    pub qa: f64,
}

impl SectionScores {
    pub fn total(&self) -> f64 {
        self.varc + self.dilr + self.qa
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedPercentiles {
    pub total_score: f64,
    pub varc: f64,
    pub dilr: f64,
    pub qa: f64,
    pub overall: f64,
}

/// Predicts sectional percentiles and the overall percentile of the summed
/// score, rounded to two decimals. Sections missing for `year` use the
/// `fallback_year` table.
pub fn predict_percentiles(
    tables: &PercentileTables,
    year: u16,
    fallback_year: u16,
    scores: &SectionScores,
) -> Result<PredictedPercentiles> {
    check_score(Section::Varc, scores.varc)?;
    check_score(Section::Dilr, scores.dilr)?;
    check_score(Section::Qa, scores.qa)?;

    let convert = |section: Section, score: f64| -> Result<f64, LookupError> {
        let percentile = tables
            .table_or_fallback(year, section, fallback_year)?
            .percentile_for_marks(score)?;
        Ok(Precision::TwoDecimals.apply(percentile))
    };

    let total_score = scores.total();
    Ok(PredictedPercentiles {
        total_score,
        varc: convert(Section::Varc, scores.varc)?,
        dilr: convert(Section::Dilr, scores.dilr)?,
        qa: convert(Section::Qa, scores.qa)?,
        overall: convert(Section::Overall, total_score)?,
    })
}

/// Marks for one section at one target percentile, with the share of the
/// section maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionMarks {
    pub marks: f64,
    pub share_of_max: f64,
}

/// One line of the quick-reference table. Sections without a table for the
/// year are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileTableRow {
    pub percentile: f64,
    pub overall: SectionMarks,
    pub varc: Option<SectionMarks>,
    pub dilr: Option<SectionMarks>,
    pub qa: Option<SectionMarks>,
}

/// Builds the quick-reference table for `year` over [`TARGET_PERCENTILES`].
///
/// The overall table is required; sectional tables are optional.
pub fn percentile_marks_table(
    tables: &PercentileTables,
    year: u16,
) -> Result<Vec<PercentileTableRow>, LookupError> {
    let overall = tables.table(year, Section::Overall)?;
    let sectional = |section: Section, percentile: f64| -> Option<SectionMarks> {
        let marks = tables
            .table(year, section)
            .and_then(|t| t.marks_for_percentile(percentile))
            .ok()?;
        Some(section_marks(section, marks))
    };

    TARGET_PERCENTILES
        .iter()
        .map(|&percentile| {
            let marks = overall.marks_for_percentile(percentile)?;
            Ok(PercentileTableRow {
                percentile,
                overall: section_marks(Section::Overall, marks),
                varc: sectional(Section::Varc, percentile),
                dilr: sectional(Section::Dilr, percentile),
                qa: sectional(Section::Qa, percentile),
            })
        })
        .collect()
}

fn section_marks(section: Section, marks: f64) -> SectionMarks {
    let marks = Precision::WholeMarks.apply(marks);
    SectionMarks {
        marks,
        share_of_max: section.share_of_max(marks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::reference;

    #[test]
    fn test_difficulty_boundaries() {
        assert_eq!(Difficulty::for_percentile(99.0), Difficulty::ExtremelyDifficult);
        assert_eq!(Difficulty::for_percentile(98.9), Difficulty::VeryDifficult);
        assert_eq!(Difficulty::for_percentile(90.0), Difficulty::Difficult);
        assert_eq!(Difficulty::for_percentile(80.0), Difficulty::Moderate);
        assert_eq!(Difficulty::for_percentile(50.0), Difficulty::Achievable);
    }

    #[test]
    fn test_required_marks_rounds_and_sums() {
        let tables = &reference().score_samples;
        let targets = Targets {
            overall: 96.0,
            varc: Some(95.0),
            dilr: None,
            qa: Some(94.0),
        };
        let result = required_marks(tables, 2024, 2024, &targets).unwrap();
        // 95 -> 65, 97 -> 70: 96 is halfway
        assert_eq!(result.overall, 68.0);
        assert_eq!(result.varc, Some(22.0));
        assert_eq!(result.dilr, None);
        // 93 -> 22, 95 -> 24: 94 is halfway
        assert_eq!(result.qa, Some(23.0));
        assert_eq!(result.total_sectional, 45.0);
        assert_eq!(result.difficulty, Difficulty::VeryDifficult);
    }

    #[test]
    fn test_required_marks_rejects_out_of_range() {
        let tables = &reference().score_samples;
        let targets = Targets {
            overall: 101.0,
            ..Default::default()
        };
        assert!(required_marks(tables, 2024, 2024, &targets).is_err());
    }

    #[test]
    fn test_required_marks_missing_section_without_fallback() {
        let tables = &reference().score_samples;
        let targets = Targets {
            overall: 95.0,
            varc: Some(90.0),
            ..Default::default()
        };
        let err = required_marks(tables, 2023, 2023, &targets).unwrap_err();
        assert!(err.to_string().contains("no VARC mapping for 2023"));
    }

    #[test]
    fn test_required_marks_falls_back_per_section() {
        let tables = &reference().mappings;
        let targets = Targets {
            overall: 95.0,
            varc: Some(90.0),
            ..Default::default()
        };
        let result = required_marks(tables, 2023, 2024, &targets).unwrap();
        // overall from the 2023 table, VARC from 2024
        assert_eq!(result.overall, 67.0);
        assert_eq!(result.varc, Some(20.0));
        assert_eq!(result.total_sectional, 20.0);
    }

    #[test]
    fn test_predict_percentiles_for_year_with_only_overall() {
        let tables = &reference().score_samples;
        let scores = SectionScores {
            varc: 22.0,
            dilr: 19.0,
            qa: 24.0,
        };
        let predicted = predict_percentiles(tables, 2023, 2024, &scores).unwrap();
        assert_eq!(predicted.varc, 95.0);
        assert_eq!(predicted.dilr, 94.0);
        // 2023 overall: 62 -> 93, 67 -> 95
        assert_eq!(predicted.overall, 94.2);
    }

    #[test]
    fn test_check_percentile_and_marks_bounds() {
        assert!(check_percentile(Section::Overall, 0.0).is_ok());
        assert!(check_percentile(Section::Overall, 100.0).is_ok());
        assert!(check_percentile(Section::Overall, 150.0).is_err());
        assert!(check_percentile(Section::Varc, -0.5).is_err());

        assert!(check_marks(Section::Overall, 204.0).is_ok());
        assert!(check_marks(Section::Overall, -40.0).is_err());
        assert!(check_marks(Section::Dilr, 61.0).is_err());
        assert!(check_marks(Section::Qa, 0.0).is_ok());
    }

    #[test]
    fn test_predict_percentiles() {
        let tables = &reference().score_samples;
        let scores = SectionScores {
            varc: 22.0,
            dilr: 19.0,
            qa: 24.0,
        };
        let predicted = predict_percentiles(tables, 2024, 2024, &scores).unwrap();
        assert_eq!(predicted.total_score, 65.0);
        assert_eq!(predicted.varc, 95.0);
        assert_eq!(predicted.dilr, 94.0);
        assert_eq!(predicted.qa, 95.0);
        assert_eq!(predicted.overall, 95.0);
    }

    #[test]
    fn test_predict_rejects_scores_above_section_limit() {
        let tables = &reference().score_samples;
        let scores = SectionScores {
            varc: 40.0,
            dilr: 10.0,
            qa: 10.0,
        };
        assert!(predict_percentiles(tables, 2024, 2024, &scores).is_err());
    }

    #[test]
    fn test_percentile_marks_table_2024() {
        let rows = percentile_marks_table(&reference().mappings, 2024).unwrap();
        assert_eq!(rows.len(), TARGET_PERCENTILES.len());
        assert_eq!(rows[0].overall.marks, 50.0);
        assert_eq!(rows[0].varc.unwrap().marks, 20.0);
        assert_eq!(rows[5].overall.marks, 140.0);
        // 99.9 is above the sectional tables: 32 + 0.9 * 10
        assert_eq!(rows[5].varc.unwrap().marks, 41.0);
        assert_eq!(rows[3].dilr.unwrap().share_of_max, 50.0);
    }

    #[test]
    fn test_percentile_marks_table_without_sectionals() {
        let rows = percentile_marks_table(&reference().mappings, 2022).unwrap();
        assert!(rows.iter().all(|r| r.varc.is_none() && r.qa.is_none()));
        assert!(percentile_marks_table(&reference().mappings, 2019).is_err());
    }
}
