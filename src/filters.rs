//! Filtering, sorting and derived views over the institution datasets.
//!
//! Filters and sort keys are closed enums carrying the parameters they need,
//! so e.g. a cutoff sort without a year cannot be expressed. All functions
//! are pure and keep input order wherever keys compare equal.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::model::{Confidence, InstituteType, InstitutionRecord, OtherInstituteRecord};

/// Restricts institutions to one tier, or lets all through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(InstituteType),
}

impl TypeFilter {
    pub fn matches(self, kind: InstituteType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(wanted) => wanted == kind,
        }
    }
}

/// Filter over [`InstitutionRecord`]s. Every set condition must hold.
#[derive(Debug, Clone, Default)]
pub struct InstituteFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    pub kind: TypeFilter,
    /// The record must have cycle data for this year.
    pub year: Option<u16>,
}

impl InstituteFilter {
    pub fn matches(&self, record: &InstitutionRecord) -> bool {
        let matches_search = self
            .search
            .as_deref()
            .is_none_or(|needle| contains_ignore_case(&record.name, needle));
        let matches_year = self.year.is_none_or(|year| record.has_cycle(year));
        matches_search && self.kind.matches(record.kind) && matches_year
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Lazily yields the records accepted by `filter`, in input order.
pub fn filter_institutions<'a>(
    records: &'a [InstitutionRecord],
    filter: &'a InstituteFilter,
) -> impl Iterator<Item = &'a InstitutionRecord> + 'a {
    records.iter().filter(move |r| filter.matches(r))
}

/// Sort orders for institutions. The direction is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Overall percentile cutoff for `year`, highest first.
    CutoffDesc { year: u16 },
    /// Name, lexicographic ascending.
    Name,
    /// Founding year, oldest first.
    Established,
    /// CAT weight for `year`, highest first.
    CatWeightDesc { year: u16 },
    /// Combined PI + WAT weight for `year`, lowest first.
    PiWatWeightAsc { year: u16 },
}

/// Orders present keys by `cmp` and puts records lacking the key last.
fn missing_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(a: &InstitutionRecord, b: &InstitutionRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::CutoffDesc { year } => missing_last(
            a.cycle(year).map(|c| c.overall_percentile),
            b.cycle(year).map(|c| c.overall_percentile),
            |x, y| y.total_cmp(&x),
        ),
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Established => a.established_year.cmp(&b.established_year),
        SortKey::CatWeightDesc { year } => missing_last(
            a.cycle(year).map(|c| c.process.cat_weight()),
            b.cycle(year).map(|c| c.process.cat_weight()),
            |x, y| y.cmp(&x),
        ),
        SortKey::PiWatWeightAsc { year } => missing_last(
            a.cycle(year).map(|c| c.process.pi_wat_weight()),
            b.cycle(year).map(|c| c.process.pi_wat_weight()),
            |x, y| x.cmp(&y),
        ),
    }
}

/// Stable sort: records with equal keys keep their relative order.
pub fn sort_institutions(records: &mut [&InstitutionRecord], key: SortKey) {
    records.sort_by(|a, b| compare(a, b, key));
}

/// Years with at least one admission cycle, ascending.
pub fn cycle_years(records: &[InstitutionRecord]) -> BTreeSet<u16> {
    records
        .iter()
        .flat_map(|r| r.cycles.keys().copied())
        .collect()
}

/// Keeps the first `n` items; fewer are returned untouched.
pub fn top_n<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    items.truncate(n);
    items
}

/// A row of the cutoff ranking for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub rank: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InstituteType,
    pub overall_cutoff: f64,
    pub estimated_marks: u32,
    pub cat_weight: u32,
    pub pi_wat_weight: u32,
    pub confidence: u8,
}

/// Institutions with data for `year`, ranked by overall cutoff (1 = highest).
pub fn cutoff_rankings(records: &[InstitutionRecord], year: u16) -> Vec<RankingEntry> {
    let filter = InstituteFilter {
        year: Some(year),
        ..Default::default()
    };
    let mut ranked: Vec<&InstitutionRecord> = filter_institutions(records, &filter).collect();
    sort_institutions(&mut ranked, SortKey::CutoffDesc { year });

    ranked
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let cycle = record.cycle(year)?;
            Some(RankingEntry {
                rank: i + 1,
                name: record.name.clone(),
                kind: record.kind,
                overall_cutoff: cycle.overall_percentile,
                estimated_marks: cycle.estimated_marks.overall,
                cat_weight: cycle.process.cat_weight(),
                pi_wat_weight: cycle.process.pi_wat_weight(),
                confidence: cycle.confidence,
            })
        })
        .collect()
}

/// How the selection process favours exam performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Advantage {
    #[serde(rename = "High CAT focus")]
    HighCatFocus,
    #[serde(rename = "Balanced approach")]
    Balanced,
}

impl Advantage {
    pub fn for_cat_weight(cat_weight: u32) -> Self {
        if cat_weight >= 60 {
            Advantage::HighCatFocus
        } else {
            Advantage::Balanced
        }
    }
}

/// Derived selection weights of one institution for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InstituteType,
    pub cat_weight: u32,
    pub pi_wat_weight: u32,
    pub other_weight: u32,
    pub advantage: Advantage,
}

/// Default minimum CAT weight for the low PI/WAT list.
pub const LOW_PI_WAT_MIN_CAT_WEIGHT: u32 = 55;

/// Institutions whose CAT weight for `year` is at least `min_cat_weight`,
/// restricted by `kind` and ordered by `sort` (only the year-bound keys and
/// [`SortKey::Name`] are meaningful here).
pub fn low_pi_wat(
    records: &[InstitutionRecord],
    year: u16,
    min_cat_weight: u32,
    kind: TypeFilter,
    sort: SortKey,
) -> Vec<WeightProfile> {
    let filter = InstituteFilter {
        kind,
        year: Some(year),
        ..Default::default()
    };
    let mut selected: Vec<&InstitutionRecord> = filter_institutions(records, &filter)
        .filter(|r| {
            r.cycle(year)
                .is_some_and(|c| c.process.cat_weight() >= min_cat_weight)
        })
        .collect();
    sort_institutions(&mut selected, sort);

    selected
        .into_iter()
        .filter_map(|record| weight_profile(record, year))
        .collect()
}

/// Weight projections for `record` in `year`, recomputed on every call.
pub fn weight_profile(record: &InstitutionRecord, year: u16) -> Option<WeightProfile> {
    let process = record.cycle(year)?.process;
    Some(WeightProfile {
        name: record.name.clone(),
        kind: record.kind,
        cat_weight: process.cat_weight(),
        pi_wat_weight: process.pi_wat_weight(),
        other_weight: process.other_weight(),
        advantage: Advantage::for_cat_weight(process.cat_weight()),
    })
}

/// A cycle whose process weights add up to more than 100.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightWarning {
    pub name: String,
    pub year: u16,
    pub total: u32,
}

/// Reports cycles breaking the weights-sum-to-at-most-100 convention.
/// Totals below 100 are common in the source data and not reported.
pub fn check_weights(records: &[InstitutionRecord]) -> Vec<WeightWarning> {
    records
        .iter()
        .flat_map(|record| {
            record.cycles.iter().filter_map(move |(year, cycle)| {
                let total = cycle.process.total();
                (total > 100).then(|| WeightWarning {
                    name: record.name.clone(),
                    year: *year,
                    total,
                })
            })
        })
        .collect()
}

/// Counts of institutions by the best/worst confidence across their cycles.
/// An institution is counted in every bucket one of its cycles falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}

pub fn data_quality(records: &[InstitutionRecord]) -> DataQuality {
    let count = |label: Confidence| {
        records
            .iter()
            .filter(|r| {
                r.cycles
                    .values()
                    .any(|c| Confidence::from_score(c.confidence) == label)
            })
            .count()
    };
    DataQuality {
        high_confidence: count(Confidence::High),
        medium_confidence: count(Confidence::Medium),
        low_confidence: count(Confidence::Low),
    }
}

/// Named groups of non-primary institutes, matched on the institute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherCategory {
    Fms,
    Spjimr,
    Mdi,
    Iift,
    Jbims,
    Nitie,
    Iit,
}

impl OtherCategory {
    fn needle(self) -> &'static str {
        match self {
            OtherCategory::Fms => "FMS",
            OtherCategory::Spjimr => "SPJIMR",
            OtherCategory::Mdi => "MDI",
            OtherCategory::Iift => "IIFT",
            OtherCategory::Jbims => "JBIMS",
            OtherCategory::Nitie => "NITIE",
            OtherCategory::Iit => "IIT",
        }
    }

    pub fn matches(self, record: &OtherInstituteRecord) -> bool {
        record.name.contains(self.needle())
    }
}

impl std::str::FromStr for OtherCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fms" => Ok(OtherCategory::Fms),
            "spjimr" => Ok(OtherCategory::Spjimr),
            "mdi" => Ok(OtherCategory::Mdi),
            "iift" => Ok(OtherCategory::Iift),
            "jbims" => Ok(OtherCategory::Jbims),
            "nitie" => Ok(OtherCategory::Nitie),
            "iit" => Ok(OtherCategory::Iit),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OtherFilter {
    pub search: Option<String>,
    pub category: Option<OtherCategory>,
}

impl OtherFilter {
    pub fn matches(&self, record: &OtherInstituteRecord) -> bool {
        let matches_search = self
            .search
            .as_deref()
            .is_none_or(|needle| contains_ignore_case(&record.name, needle));
        let matches_category = self.category.is_none_or(|c| c.matches(record));
        matches_search && matches_category
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherSortKey {
    /// Overall cutoff, highest first.
    CutoffDesc,
    Name,
    /// Fees in rupees, cheapest first; unparsable fees last.
    FeesAsc,
}

pub fn filter_other_institutes<'a>(
    records: &'a [OtherInstituteRecord],
    filter: &'a OtherFilter,
) -> impl Iterator<Item = &'a OtherInstituteRecord> + 'a {
    records.iter().filter(move |r| filter.matches(r))
}

pub fn sort_other_institutes(records: &mut [&OtherInstituteRecord], key: OtherSortKey) {
    records.sort_by(|a, b| match key {
        OtherSortKey::CutoffDesc => b.cutoff.overall.total_cmp(&a.cutoff.overall),
        OtherSortKey::Name => a.name.cmp(&b.name),
        OtherSortKey::FeesAsc => {
            missing_last(a.fees_in_rupees(), b.fees_in_rupees(), |x, y| x.total_cmp(&y))
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::reference;
    use crate::model::{CycleData, EstimatedMarks, ProcessWeights, SectionalCutoffs};
    use std::collections::BTreeMap;

    fn cycle(cutoff: f64, cat: u32, pi: u32, wat: u32) -> CycleData {
        CycleData {
            overall_percentile: cutoff,
            sectional: SectionalCutoffs {
                varc: 80.0,
                dilr: 80.0,
                qa: 80.0,
            },
            estimated_marks: EstimatedMarks {
                overall: 70,
                varc: 24,
                dilr: 22,
                qa: 26,
            },
            process: ProcessWeights {
                cat,
                pi,
                wat,
                academics: 10,
                work_exp: 0,
            },
            source: "https://example.org".to_string(),
            confidence: 85,
            justification: "test".to_string(),
        }
    }

    fn record(name: &str, kind: InstituteType, established: u16, cycles: Vec<(u16, CycleData)>) -> InstitutionRecord {
        InstitutionRecord {
            name: name.to_string(),
            campus: "Somewhere".to_string(),
            established_year: established,
            kind,
            nirf_ranking: 1,
            cycles: cycles.into_iter().collect::<BTreeMap<_, _>>(),
        }
    }

    fn five_records() -> Vec<InstitutionRecord> {
        vec![
            record("IIM Echo", InstituteType::NewIim, 2010, vec![(2024, cycle(90.0, 55, 25, 10))]),
            record("IIM Alpha", InstituteType::OldIim, 1961, vec![(2024, cycle(85.0, 50, 25, 10))]),
            record("IIM Delta", InstituteType::NewIim, 2011, vec![(2024, cycle(90.0, 60, 20, 10))]),
            record("IIM Charlie", InstituteType::BabyIim, 2015, vec![(2023, cycle(95.0, 45, 30, 15))]),
            record("IIM Bravo", InstituteType::OldIim, 1973, vec![(2024, cycle(92.0, 60, 20, 10))]),
        ]
    }

    fn names(records: &[&InstitutionRecord]) -> Vec<String> {
        records.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_filter_by_search_type_and_year() {
        let records = five_records();
        let filter = InstituteFilter {
            search: Some("iim e".to_string()),
            ..Default::default()
        };
        let found: Vec<_> = filter_institutions(&records, &filter).collect();
        assert_eq!(names(&found), vec!["IIM Echo"]);

        let filter = InstituteFilter {
            kind: TypeFilter::Only(InstituteType::NewIim),
            ..Default::default()
        };
        let found: Vec<_> = filter_institutions(&records, &filter).collect();
        assert_eq!(names(&found), vec!["IIM Echo", "IIM Delta"]);

        let filter = InstituteFilter {
            year: Some(2023),
            ..Default::default()
        };
        let found: Vec<_> = filter_institutions(&records, &filter).collect();
        assert_eq!(names(&found), vec!["IIM Charlie"]);
    }

    #[test]
    fn test_sort_by_cutoff_is_stable_and_missing_years_last() {
        let records = five_records();
        let mut refs: Vec<&InstitutionRecord> = records.iter().collect();
        sort_institutions(&mut refs, SortKey::CutoffDesc { year: 2024 });
        assert_eq!(
            names(&refs),
            vec!["IIM Bravo", "IIM Echo", "IIM Delta", "IIM Alpha", "IIM Charlie"]
        );
    }

    #[test]
    fn test_sort_by_name_twice_is_identical() {
        let records = five_records();
        let mut first: Vec<&InstitutionRecord> = records.iter().collect();
        sort_institutions(&mut first, SortKey::Name);
        let mut second = first.clone();
        sort_institutions(&mut second, SortKey::Name);
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first)[0], "IIM Alpha");
    }

    #[test]
    fn test_sort_by_established() {
        let records = five_records();
        let mut refs: Vec<&InstitutionRecord> = records.iter().collect();
        sort_institutions(&mut refs, SortKey::Established);
        assert_eq!(refs[0].established_year, 1961);
        assert_eq!(refs[4].established_year, 2015);
    }

    #[test]
    fn test_sort_then_filter_equals_filter_then_sort() {
        let records = five_records();
        let filter = InstituteFilter {
            kind: TypeFilter::Only(InstituteType::NewIim),
            ..Default::default()
        };
        let key = SortKey::CutoffDesc { year: 2024 };

        let mut sorted: Vec<&InstitutionRecord> = records.iter().collect();
        sort_institutions(&mut sorted, key);
        let sort_first: Vec<_> = sorted.into_iter().filter(|r| filter.matches(r)).collect();

        let mut filter_first: Vec<_> = filter_institutions(&records, &filter).collect();
        sort_institutions(&mut filter_first, key);

        assert_eq!(names(&sort_first), names(&filter_first));
    }

    #[test]
    fn test_top_n() {
        assert_eq!(top_n(vec![1, 2, 3, 4], 2), vec![1, 2]);
        assert_eq!(top_n(vec![1, 2], 10), vec![1, 2]);
    }

    #[test]
    fn test_cutoff_rankings_are_one_based() {
        let records = five_records();
        let rankings = cutoff_rankings(&records, 2024);
        assert_eq!(rankings.len(), 4);
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[0].name, "IIM Bravo");
        assert_eq!(rankings[0].pi_wat_weight, 30);
        assert_eq!(rankings[3].rank, 4);
    }

    #[test]
    fn test_low_pi_wat_threshold_and_advantage() {
        let records = five_records();
        let list = low_pi_wat(
            &records,
            2024,
            LOW_PI_WAT_MIN_CAT_WEIGHT,
            TypeFilter::All,
            SortKey::CatWeightDesc { year: 2024 },
        );
        let got: Vec<_> = list.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(got, vec!["IIM Delta", "IIM Bravo", "IIM Echo"]);
        assert_eq!(list[0].advantage, Advantage::HighCatFocus);
        assert_eq!(list[2].advantage, Advantage::Balanced);
        assert_eq!(list[2].other_weight, 10);
    }

    #[test]
    fn test_check_weights_reports_only_overflow() {
        let records = vec![record(
            "IIM Over",
            InstituteType::OldIim,
            1990,
            vec![(2024, cycle(90.0, 70, 30, 10)), (2023, cycle(90.0, 40, 20, 10))],
        )];
        let warnings = check_weights(&records);
        assert_eq!(
            warnings,
            vec![WeightWarning {
                name: "IIM Over".to_string(),
                year: 2024,
                total: 120
            }]
        );
        assert!(check_weights(&reference().institutions).is_empty());
    }

    #[test]
    fn test_cycle_years() {
        let years = cycle_years(&five_records());
        assert_eq!(years.into_iter().collect::<Vec<_>>(), vec![2023, 2024]);
        assert_eq!(
            cycle_years(&reference().institutions).into_iter().collect::<Vec<_>>(),
            vec![2023, 2024]
        );
        assert!(cycle_years(&[]).is_empty());
    }

    #[test]
    fn test_data_quality_of_reference() {
        let quality = data_quality(&reference().institutions);
        assert_eq!(quality.high_confidence, 8);
        assert_eq!(quality.medium_confidence, 13);
        assert_eq!(quality.low_confidence, 0);
    }

    #[test]
    fn test_data_quality_confidence_boundaries() {
        let with_confidence = |scores: &[(u16, u8)]| {
            let cycles = scores
                .iter()
                .map(|&(year, score)| {
                    let mut c = cycle(90.0, 50, 25, 10);
                    c.confidence = score;
                    (year, c)
                })
                .collect();
            record("IIM Test", InstituteType::NewIim, 2010, cycles)
        };
        let records = vec![
            with_confidence(&[(2024, 90)]),
            with_confidence(&[(2024, 70)]),
            with_confidence(&[(2023, 69), (2024, 89)]),
        ];

        let quality = data_quality(&records);
        assert_eq!(quality.high_confidence, 1);
        assert_eq!(quality.medium_confidence, 2);
        assert_eq!(quality.low_confidence, 1);
    }

    #[test]
    fn test_other_institute_category_and_fees_sort() {
        let data = reference();
        let filter = OtherFilter {
            category: Some(OtherCategory::Iit),
            ..Default::default()
        };
        let iits: Vec<_> = filter_other_institutes(&data.other_institutes, &filter).collect();
        assert_eq!(iits.len(), 2);

        let all = OtherFilter::default();
        let mut refs: Vec<_> = filter_other_institutes(&data.other_institutes, &all).collect();
        sort_other_institutes(&mut refs, OtherSortKey::FeesAsc);
        assert!(refs[0].name.contains("FMS"));
        assert!(refs.last().unwrap().name.contains("MDI"));

        sort_other_institutes(&mut refs, OtherSortKey::CutoffDesc);
        assert!(refs[0].name.contains("JBIMS"));
    }
}
