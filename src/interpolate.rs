//! Percentile <-> marks conversion over piecewise-linear lookup tables.
//!
//! A [`PercentileTable`] is one `(year, section)` sequence of
//! [`MappingPoint`]s with strictly increasing percentiles and non-decreasing
//! marks. Inside the table range values are linearly interpolated between
//! the bracketing points; outside it a fixed slope is applied and the result
//! clamped (see the `*_PER_*` constants).
//!
//! The engine does not validate its input. Percentiles outside `0..=100`
//! or negative marks must be rejected by the caller before converting.
//! Results are never rounded here; use [`Precision`] at the call site.

use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tracing::warn;

use crate::model::{MappingPoint, Section};

/// Marks lost per percentile point below the first table entry.
pub const BELOW_RANGE_MARKS_PER_PERCENTILE: f64 = 2.0;
/// Marks gained per percentile point above the last table entry.
pub const ABOVE_RANGE_MARKS_PER_PERCENTILE: f64 = 10.0;
/// Percentile points lost per mark below the first table entry.
pub const BELOW_RANGE_PERCENTILE_PER_MARK: f64 = 2.0;
/// Percentile points gained per mark above the last table entry.
pub const ABOVE_RANGE_PERCENTILE_PER_MARK: f64 = 0.1;

/// Errors from a table lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupError {
    /// No table exists for the requested year and section.
    LookupMiss { year: u16, section: Section },
    /// The table has fewer than two points, so no segment to interpolate on.
    InsufficientData {
        year: u16,
        section: Section,
        points: usize,
    },
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LookupMiss { year, section } => {
                write!(f, "no {section} mapping for {year}")
            }
            Self::InsufficientData {
                year,
                section,
                points,
            } => write!(
                f,
                "{section} mapping for {year} has {points} point(s), at least 2 required"
            ),
        }
    }
}

impl Error for LookupError {}

/// The key a conversion is driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Percentile,
    Marks,
}

impl Axis {
    fn of(self, point: &MappingPoint) -> f64 {
        match self {
            Axis::Percentile => point.percentile,
            Axis::Marks => point.marks,
        }
    }

    fn other(self) -> Axis {
        match self {
            Axis::Percentile => Axis::Marks,
            Axis::Marks => Axis::Percentile,
        }
    }
}

/// The one rounding policy for converted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Leave the interpolated value untouched.
    #[default]
    Exact,
    /// Round to the nearest whole mark.
    WholeMarks,
    /// Round to two decimal places, as percentiles are displayed.
    TwoDecimals,
}

impl Precision {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Precision::Exact => value,
            Precision::WholeMarks => value.round(),
            Precision::TwoDecimals => (value * 100.0).round() / 100.0,
        }
    }
}

/// A borrowed `(year, section)` lookup table.
#[derive(Debug, Clone, Copy)]
pub struct PercentileTable<'a> {
    pub year: u16,
    pub section: Section,
    pub points: &'a [MappingPoint],
}

impl<'a> PercentileTable<'a> {
    pub fn new(year: u16, section: Section, points: &'a [MappingPoint]) -> Self {
        Self {
            year,
            section,
            points,
        }
    }

    /// Converts `target` on `axis` into the value on the other axis.
    pub fn value_for(&self, target: f64, axis: Axis) -> Result<f64, LookupError> {
        let points = self.points;
        if points.len() < 2 {
            return Err(LookupError::InsufficientData {
                year: self.year,
                section: self.section,
                points: points.len(),
            });
        }

        let other = axis.other();

        // Literal entries come back unchanged, free of rounding noise.
        if let Some(hit) = points.iter().find(|p| axis.of(p) == target) {
            return Ok(other.of(hit));
        }

        for pair in points.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            let (lo_key, hi_key) = (axis.of(lo), axis.of(hi));
            if target >= lo_key && target <= hi_key {
                let ratio = (target - lo_key) / (hi_key - lo_key);
                return Ok(other.of(lo) + ratio * (other.of(hi) - other.of(lo)));
            }
        }

        let first = &points[0];
        let last = &points[points.len() - 1];

        let value = if target < axis.of(first) {
            match axis {
                Axis::Percentile => (first.marks
                    - BELOW_RANGE_MARKS_PER_PERCENTILE * (first.percentile - target))
                    .max(0.0),
                Axis::Marks => (first.percentile
                    - BELOW_RANGE_PERCENTILE_PER_MARK * (first.marks - target))
                    .max(0.0),
            }
        } else {
            match axis {
                Axis::Percentile => {
                    last.marks + ABOVE_RANGE_MARKS_PER_PERCENTILE * (target - last.percentile)
                }
                Axis::Marks => (last.percentile
                    + ABOVE_RANGE_PERCENTILE_PER_MARK * (target - last.marks))
                    .min(100.0),
            }
        };

        Ok(value)
    }

    pub fn marks_for_percentile(&self, percentile: f64) -> Result<f64, LookupError> {
        self.value_for(percentile, Axis::Percentile)
    }

    pub fn percentile_for_marks(&self, marks: f64) -> Result<f64, LookupError> {
        self.value_for(marks, Axis::Marks)
    }

    /// Whether the table satisfies the lookup invariant: at least two points,
    /// strictly increasing percentiles and non-decreasing marks.
    pub fn is_well_formed(&self) -> bool {
        self.points.len() >= 2
            && self.points.windows(2).all(|pair| {
                pair[0].percentile < pair[1].percentile && pair[0].marks <= pair[1].marks
            })
    }
}

/// All lookup tables of one kind, keyed by year then section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PercentileTables {
    tables: BTreeMap<u16, BTreeMap<Section, Vec<MappingPoint>>>,
}

impl PercentileTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: u16, section: Section, points: Vec<MappingPoint>) {
        self.tables.entry(year).or_default().insert(section, points);
    }

    /// Builder-style [`PercentileTables::insert`].
    pub fn with(mut self, year: u16, section: Section, points: Vec<MappingPoint>) -> Self {
        self.insert(year, section, points);
        self
    }

    /// Years with at least one table, ascending.
    pub fn years(&self) -> Vec<u16> {
        self.tables.keys().copied().collect()
    }

    pub fn latest_year(&self) -> Option<u16> {
        self.tables.keys().next_back().copied()
    }

    pub fn sections(&self, year: u16) -> Vec<Section> {
        self.tables
            .get(&year)
            .map(|by_section| by_section.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Iterates every table, ordered by year then section.
    pub fn iter(&self) -> impl Iterator<Item = PercentileTable<'_>> {
        self.tables.iter().flat_map(|(year, by_section)| {
            by_section
                .iter()
                .map(|(section, points)| PercentileTable::new(*year, *section, points))
        })
    }

    /// Returns the exact `(year, section)` table. Never substitutes another year.
    pub fn table(&self, year: u16, section: Section) -> Result<PercentileTable<'_>, LookupError> {
        self.tables
            .get(&year)
            .and_then(|by_section| by_section.get(&section))
            .map(|points| PercentileTable::new(year, section, points))
            .ok_or(LookupError::LookupMiss { year, section })
    }

    /// Like [`PercentileTables::table`], but retries with `fallback_year` on a
    /// miss. The substitution is logged.
    pub fn table_or_fallback(
        &self,
        year: u16,
        section: Section,
        fallback_year: u16,
    ) -> Result<PercentileTable<'_>, LookupError> {
        match self.table(year, section) {
            Err(LookupError::LookupMiss { .. }) if fallback_year != year => {
                warn!(
                    year,
                    fallback_year,
                    section = %section,
                    "No mapping for requested year, using fallback year"
                );
                self.table(fallback_year, section)
            }
            other => other,
        }
    }

    pub fn value_for(
        &self,
        target: f64,
        axis: Axis,
        section: Section,
        year: u16,
    ) -> Result<f64, LookupError> {
        self.table(year, section)?.value_for(target, axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Confidence;

    fn sample_points() -> Vec<MappingPoint> {
        vec![
            MappingPoint::new(90.0, 50.0, Confidence::High, "test"),
            MappingPoint::new(95.0, 65.0, Confidence::High, "test"),
            MappingPoint::new(99.0, 95.0, Confidence::Medium, "test"),
        ]
    }

    #[test]
    fn test_interpolates_inside_segment() {
        let points = sample_points();
        let table = PercentileTable::new(2024, Section::Overall, &points);
        assert_eq!(table.marks_for_percentile(92.5).unwrap(), 57.5);
    }

    #[test]
    fn test_extrapolates_above_range() {
        let points = sample_points();
        let table = PercentileTable::new(2024, Section::Overall, &points);
        let marks = table.marks_for_percentile(99.9).unwrap();
        assert!((marks - 104.0).abs() < 1e-9);
    }

    #[test]
    fn test_extrapolates_below_range_and_clamps_at_zero() {
        let points = sample_points();
        let table = PercentileTable::new(2024, Section::Overall, &points);
        assert_eq!(table.marks_for_percentile(85.0).unwrap(), 40.0);
        assert_eq!(table.marks_for_percentile(10.0).unwrap(), 0.0);
    }

    #[test]
    fn test_endpoints_return_paired_value_exactly() {
        let points = sample_points();
        let table = PercentileTable::new(2024, Section::Overall, &points);
        for p in &points {
            assert_eq!(table.marks_for_percentile(p.percentile).unwrap(), p.marks);
            assert_eq!(table.percentile_for_marks(p.marks).unwrap(), p.percentile);
        }
    }

    #[test]
    fn test_marks_axis_extrapolation_clamps() {
        let points = sample_points();
        let table = PercentileTable::new(2024, Section::Overall, &points);
        // 40 marks below the first entry -> 90 - 2 * 10
        assert_eq!(table.percentile_for_marks(40.0).unwrap(), 70.0);
        assert_eq!(table.percentile_for_marks(0.0).unwrap(), 0.0);
        let high = table.percentile_for_marks(105.0).unwrap();
        assert!((high - 100.0).abs() < 1e-9);
        assert_eq!(table.percentile_for_marks(500.0).unwrap(), 100.0);
    }

    #[test]
    fn test_single_point_table_is_insufficient() {
        let points = vec![MappingPoint::new(90.0, 50.0, Confidence::High, "test")];
        let table = PercentileTable::new(2024, Section::Qa, &points);
        assert_eq!(
            table.marks_for_percentile(90.0),
            Err(LookupError::InsufficientData {
                year: 2024,
                section: Section::Qa,
                points: 1
            })
        );
    }

    #[test]
    fn test_missing_table_is_lookup_miss() {
        let tables = PercentileTables::new().with(2024, Section::Overall, sample_points());
        let err = tables
            .value_for(95.0, Axis::Percentile, Section::Varc, 2024)
            .unwrap_err();
        assert_eq!(
            err,
            LookupError::LookupMiss {
                year: 2024,
                section: Section::Varc
            }
        );
        assert_eq!(err.to_string(), "no VARC mapping for 2024");
    }

    #[test]
    fn test_fallback_is_explicit() {
        let tables = PercentileTables::new().with(2024, Section::Overall, sample_points());
        assert!(tables.table(2021, Section::Overall).is_err());
        let table = tables
            .table_or_fallback(2021, Section::Overall, 2024)
            .unwrap();
        assert_eq!(table.year, 2024);
    }

    #[test]
    fn test_flat_marks_segment_does_not_divide_by_zero() {
        let points = vec![
            MappingPoint::new(90.0, 50.0, Confidence::High, "test"),
            MappingPoint::new(95.0, 50.0, Confidence::High, "test"),
            MappingPoint::new(99.0, 60.0, Confidence::High, "test"),
        ];
        let table = PercentileTable::new(2024, Section::Overall, &points);
        assert!(table.is_well_formed());
        assert_eq!(table.percentile_for_marks(50.0).unwrap(), 90.0);
        assert_eq!(table.percentile_for_marks(55.0).unwrap(), 97.0);
    }

    #[test]
    fn test_precision() {
        assert_eq!(Precision::Exact.apply(57.5), 57.5);
        assert_eq!(Precision::WholeMarks.apply(57.5), 58.0);
        assert_eq!(Precision::TwoDecimals.apply(91.23456), 91.23);
    }

    #[test]
    fn test_latest_year_and_sections() {
        let tables = PercentileTables::new()
            .with(2023, Section::Overall, sample_points())
            .with(2024, Section::Overall, sample_points())
            .with(2024, Section::Qa, sample_points());
        assert_eq!(tables.latest_year(), Some(2024));
        assert_eq!(tables.years(), vec![2023, 2024]);
        assert_eq!(tables.sections(2024), vec![Section::Overall, Section::Qa]);
        assert_eq!(tables.iter().count(), 3);
    }
}
