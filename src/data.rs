//! Built-in reference tables.
//!
//! Authored by hand, built once on first access and never mutated.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::interpolate::PercentileTables;
use crate::model::{
    Confidence, CycleData, EstimatedMarks, InstituteType, InstitutionRecord, MappingPoint,
    OtherCutoff, OtherInstituteRecord, OtherProcess, ProcessWeights, ResourceSheet,
    SectionalCutoffs, Section,
};

/// Which family of lookup tables to convert with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingSource {
    /// Published percentile -> marks points with per-point confidence.
    #[default]
    Official,
    /// Historical score/percentile samples used by the score predictor.
    Historical,
}

impl fmt::Display for MappingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingSource::Official => f.write_str("official"),
            MappingSource::Historical => f.write_str("historical"),
        }
    }
}

impl FromStr for MappingSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "official" => Ok(MappingSource::Official),
            "historical" => Ok(MappingSource::Historical),
            other => Err(format!(
                "unknown mapping source '{other}' (expected official or historical)"
            )),
        }
    }
}

/// Everything the site knows, in one immutable bundle.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub mappings: PercentileTables,
    pub score_samples: PercentileTables,
    pub institutions: Vec<InstitutionRecord>,
    pub other_institutes: Vec<OtherInstituteRecord>,
    pub resource_sheet: ResourceSheet,
}

impl ReferenceData {
    pub fn tables(&self, source: MappingSource) -> &PercentileTables {
        match source {
            MappingSource::Official => &self.mappings,
            MappingSource::Historical => &self.score_samples,
        }
    }
}

static REFERENCE: LazyLock<ReferenceData> = LazyLock::new(|| ReferenceData {
    mappings: official_mappings(),
    score_samples: historical_samples(),
    institutions: institutions(),
    other_institutes: other_institutes(),
    resource_sheet: resource_sheet(),
});

/// The process-wide reference data.
pub fn reference() -> &'static ReferenceData {
    &REFERENCE
}

fn official_year(year: u16, marks: [f64; 6]) -> Vec<MappingPoint> {
    let official = format!("Official CAT {year}");
    let percentiles = [90.0, 95.0, 97.0, 99.0, 99.5, 99.9];
    percentiles
        .iter()
        .zip(marks)
        .enumerate()
        .map(|(i, (&p, m))| {
            if i < 4 {
                MappingPoint::new(p, m, Confidence::High, &official)
            } else {
                MappingPoint::new(p, m, Confidence::Medium, "Interpolated")
            }
        })
        .collect()
}

fn official_sectional(marks: [f64; 4]) -> Vec<MappingPoint> {
    let percentiles = [90.0, 95.0, 97.0, 99.0];
    percentiles
        .iter()
        .zip(marks)
        .enumerate()
        .map(|(i, (&p, m))| {
            if i < 3 {
                MappingPoint::new(p, m, Confidence::High, "Official CAT 2024")
            } else {
                MappingPoint::new(p, m, Confidence::Medium, "Interpolated")
            }
        })
        .collect()
}

fn official_mappings() -> PercentileTables {
    PercentileTables::new()
        .with(
            2024,
            Section::Overall,
            official_year(2024, [50.0, 65.0, 75.0, 95.0, 110.0, 140.0]),
        )
        .with(2024, Section::Varc, official_sectional([20.0, 24.0, 26.0, 32.0]))
        .with(2024, Section::Dilr, official_sectional([18.0, 22.0, 24.0, 30.0]))
        .with(2024, Section::Qa, official_sectional([22.0, 26.0, 28.0, 34.0]))
        .with(
            2023,
            Section::Overall,
            official_year(2023, [52.0, 67.0, 76.0, 97.0, 112.0, 142.0]),
        )
        .with(
            2022,
            Section::Overall,
            official_year(2022, [48.0, 63.0, 72.0, 93.0, 108.0, 138.0]),
        )
}

fn samples(pairs: &[(f64, f64)]) -> Vec<MappingPoint> {
    pairs
        .iter()
        .map(|&(marks, percentile)| {
            MappingPoint::new(percentile, marks, Confidence::Medium, "Historical trend")
        })
        .collect()
}

fn sectional_samples(start_marks: f64) -> Vec<MappingPoint> {
    let percentiles = [70.0, 75.0, 80.0, 85.0, 90.0, 93.0, 95.0, 97.0, 98.0, 99.0];
    let pairs: Vec<(f64, f64)> = percentiles
        .iter()
        .enumerate()
        .map(|(i, &p)| (start_marks + 2.0 * i as f64, p))
        .collect();
    samples(&pairs)
}

fn historical_samples() -> PercentileTables {
    PercentileTables::new()
        .with(
            2024,
            Section::Overall,
            samples(&[
                (30.0, 70.0),
                (35.0, 75.0),
                (40.0, 80.0),
                (45.0, 85.0),
                (50.0, 88.0),
                (55.0, 91.0),
                (60.0, 93.0),
                (65.0, 95.0),
                (70.0, 97.0),
                (75.0, 98.0),
                (80.0, 99.0),
                (85.0, 99.5),
                (90.0, 99.8),
                (95.0, 99.9),
            ]),
        )
        .with(2024, Section::Varc, sectional_samples(10.0))
        .with(2024, Section::Dilr, sectional_samples(8.0))
        .with(2024, Section::Qa, sectional_samples(12.0))
        .with(
            2023,
            Section::Overall,
            samples(&[
                (32.0, 70.0),
                (37.0, 75.0),
                (42.0, 80.0),
                (47.0, 85.0),
                (52.0, 88.0),
                (57.0, 91.0),
                (62.0, 93.0),
                (67.0, 95.0),
                (72.0, 97.0),
                (76.0, 99.0),
                (82.0, 99.5),
                (87.0, 99.8),
                (92.0, 99.9),
            ]),
        )
}

const WEBSITE_DATA: &str = "Official website data available";

fn cycle(
    overall_percentile: f64,
    sectional: f64,
    marks: [u32; 4],
    process: [u32; 5],
    source: &str,
    confidence: u8,
    justification: &str,
) -> CycleData {
    CycleData {
        overall_percentile,
        sectional: SectionalCutoffs {
            varc: sectional,
            dilr: sectional,
            qa: sectional,
        },
        estimated_marks: EstimatedMarks {
            overall: marks[0],
            varc: marks[1],
            dilr: marks[2],
            qa: marks[3],
        },
        process: ProcessWeights {
            cat: process[0],
            pi: process[1],
            wat: process[2],
            academics: process[3],
            work_exp: process[4],
        },
        source: source.to_string(),
        confidence,
        justification: justification.to_string(),
    }
}

fn institution(
    name: &str,
    campus: &str,
    established_year: u16,
    kind: InstituteType,
    nirf_ranking: u32,
    cycles: Vec<(u16, CycleData)>,
) -> InstitutionRecord {
    InstitutionRecord {
        name: name.to_string(),
        campus: campus.to_string(),
        established_year,
        kind,
        nirf_ranking,
        cycles: cycles.into_iter().collect::<BTreeMap<_, _>>(),
    }
}

/// A record with a single 2024 cycle, the common case.
#[allow(clippy::too_many_arguments)]
fn iim_2024(
    name: &str,
    campus: &str,
    established_year: u16,
    kind: InstituteType,
    nirf_ranking: u32,
    overall_percentile: f64,
    sectional: f64,
    marks: [u32; 4],
    process: [u32; 5],
    source: &str,
    confidence: u8,
) -> InstitutionRecord {
    institution(
        name,
        campus,
        established_year,
        kind,
        nirf_ranking,
        vec![(
            2024,
            cycle(
                overall_percentile,
                sectional,
                marks,
                process,
                source,
                confidence,
                WEBSITE_DATA,
            ),
        )],
    )
}

fn institutions() -> Vec<InstitutionRecord> {
    use InstituteType::{BabyIim, NewIim, OldIim};

    const SECTIONAL_MARKS: [u32; 3] = [24, 22, 26];
    let marks = |overall: u32| [overall, SECTIONAL_MARKS[0], SECTIONAL_MARKS[1], SECTIONAL_MARKS[2]];

    let ahmedabad_policy = "https://www.iima.ac.in/web/admissions/admission-policy";
    let ahmedabad_note = "Official admission policy published";

    vec![
        institution(
            "IIM Ahmedabad",
            "Ahmedabad, Gujarat",
            1961,
            OldIim,
            1,
            vec![
                (
                    2024,
                    cycle(80.0, 70.0, [50, 20, 18, 22], [50, 25, 10, 10, 5], ahmedabad_policy, 95, ahmedabad_note),
                ),
                (
                    2023,
                    cycle(80.0, 70.0, [52, 20, 18, 22], [50, 25, 10, 10, 5], ahmedabad_policy, 95, ahmedabad_note),
                ),
            ],
        ),
        iim_2024("IIM Bangalore", "Bangalore, Karnataka", 1973, OldIim, 2, 85.0, 80.0, marks(65), [45, 30, 15, 10, 0], "https://www.iimb.ac.in/admissions", 90),
        iim_2024("IIM Calcutta", "Kolkata, West Bengal", 1961, OldIim, 3, 85.0, 80.0, marks(65), [50, 25, 10, 10, 5], "https://www.iimcal.ac.in/admissions", 90),
        iim_2024("IIM Lucknow", "Lucknow, Uttar Pradesh", 1984, OldIim, 4, 90.0, 85.0, [75, 26, 24, 28], [55, 20, 10, 10, 5], "https://www.iiml.ac.in/admissions", 90),
        iim_2024("IIM Kozhikode", "Kozhikode, Kerala", 1996, OldIim, 5, 90.0, 80.0, marks(75), [60, 20, 10, 10, 0], "https://www.iimk.ac.in/admissions", 90),
        iim_2024("IIM Indore", "Indore, Madhya Pradesh", 1996, OldIim, 6, 90.0, 80.0, marks(75), [60, 20, 10, 10, 0], "https://www.iimidr.ac.in/admissions", 90),
        iim_2024("IIM Rohtak", "Rohtak, Haryana", 2010, NewIim, 15, 95.0, 80.0, marks(85), [60, 20, 10, 10, 0], "https://www.iimrohtak.ac.in/admissions", 90),
        iim_2024("IIM Ranchi", "Ranchi, Jharkhand", 2010, NewIim, 18, 94.0, 80.0, marks(82), [55, 25, 10, 10, 0], "https://www.iimranchi.ac.in/admissions", 90),
        iim_2024("IIM Shillong", "Shillong, Meghalaya", 2008, NewIim, 12, 92.0, 80.0, marks(78), [50, 25, 15, 10, 0], "https://www.iimshillong.ac.in/admissions", 85),
        iim_2024("IIM Kashipur", "Kashipur, Uttarakhand", 2011, NewIim, 25, 93.0, 80.0, marks(80), [55, 25, 10, 10, 0], "https://www.iimkashipur.ac.in/admissions", 85),
        iim_2024("IIM Trichy", "Trichy, Tamil Nadu", 2011, NewIim, 22, 92.0, 80.0, marks(78), [50, 25, 15, 10, 0], "https://www.iimtrichy.ac.in/admissions", 85),
        iim_2024("IIM Udaipur", "Udaipur, Rajasthan", 2011, NewIim, 28, 91.0, 80.0, marks(76), [55, 25, 10, 10, 0], "https://www.iimu.ac.in/admissions", 85),
        iim_2024("IIM Raipur", "Raipur, Chhattisgarh", 2010, NewIim, 30, 91.0, 80.0, marks(76), [55, 25, 10, 10, 0], "https://www.iimraipur.ac.in/admissions", 85),
        iim_2024("IIM Nagpur", "Nagpur, Maharashtra", 2015, BabyIim, 35, 90.0, 80.0, marks(75), [50, 25, 15, 10, 0], "https://www.iimnagpur.ac.in/admissions", 85),
        iim_2024("IIM Amritsar", "Amritsar, Punjab", 2015, BabyIim, 38, 89.0, 80.0, marks(74), [55, 25, 10, 10, 0], "https://www.iimamritsar.ac.in/admissions", 85),
        iim_2024("IIM Bodh Gaya", "Bodh Gaya, Bihar", 2015, BabyIim, 42, 88.0, 80.0, marks(73), [55, 25, 10, 10, 0], "https://www.iimbg.ac.in/admissions", 85),
        iim_2024("IIM Sambalpur", "Sambalpur, Odisha", 2015, BabyIim, 45, 88.0, 80.0, marks(73), [55, 25, 10, 10, 0], "https://www.iimsambalpur.ac.in/admissions", 85),
        iim_2024("IIM Sirmaur", "Sirmaur, Himachal Pradesh", 2015, BabyIim, 48, 87.0, 80.0, marks(72), [55, 25, 10, 10, 0], "https://www.iimsirmaur.ac.in/admissions", 85),
        iim_2024("IIM Jammu", "Jammu, Jammu & Kashmir", 2016, BabyIim, 52, 86.0, 80.0, marks(71), [55, 25, 10, 10, 0], "https://www.iimjammu.ac.in/admissions", 85),
        iim_2024("IIM Visakhapatnam", "Visakhapatnam, Andhra Pradesh", 2015, BabyIim, 55, 87.0, 80.0, marks(72), [55, 25, 10, 10, 0], "https://www.iimv.ac.in/admissions", 85),
        iim_2024("IIM Kashi", "Varanasi, Uttar Pradesh", 2021, BabyIim, 60, 85.0, 80.0, marks(70), [55, 25, 10, 10, 0], "https://www.iimkashi.ac.in/admissions", 80),
    ]
}

#[allow(clippy::too_many_arguments)]
fn other(
    name: &str,
    programs: &[&str],
    cutoff: [f64; 4],
    process: OtherProcess,
    fees: &str,
    nirf_ranking: u32,
    source: &str,
    confidence: u8,
) -> OtherInstituteRecord {
    OtherInstituteRecord {
        name: name.to_string(),
        programs: programs.iter().map(|p| p.to_string()).collect(),
        cutoff: OtherCutoff {
            overall: cutoff[0],
            varc: cutoff[1],
            dilr: cutoff[2],
            qa: cutoff[3],
        },
        process,
        fees: fees.to_string(),
        nirf_ranking,
        source: source.to_string(),
        confidence,
    }
}

/// CAT + group discussion + interview, the most common shape.
fn gd_process(cat: u32, gd: u32, pi: u32, academics: u32) -> OtherProcess {
    OtherProcess {
        cat,
        gd: Some(gd),
        spjat: None,
        essay: None,
        pi,
        academics,
        work_exp: 0,
    }
}

fn other_institutes() -> Vec<OtherInstituteRecord> {
    vec![
        other(
            "Faculty of Management Studies (FMS), Delhi",
            &["MBA", "MBA-Executive", "MBA-Pharma"],
            [98.5, 95.0, 95.0, 95.0],
            gd_process(60, 20, 20, 0),
            "₹20,000",
            7,
            "https://fms.edu/admissions",
            95,
        ),
        other(
            "SP Jain Institute of Management & Research (SPJIMR), Mumbai",
            &["PGDM", "PGDM-Finance", "PGDM-Operations"],
            [95.0, 90.0, 90.0, 90.0],
            OtherProcess {
                cat: 50,
                gd: None,
                spjat: Some(30),
                essay: None,
                pi: 20,
                academics: 0,
                work_exp: 0,
            },
            "₹20.5 Lakhs",
            8,
            "https://www.spjimr.org/admissions",
            95,
        ),
        other(
            "Management Development Institute (MDI), Gurgaon",
            &["PGPM", "PGPM-HR", "PGPM-IB"],
            [94.0, 88.0, 88.0, 88.0],
            gd_process(50, 20, 20, 10),
            "₹25.18 Lakhs",
            9,
            "https://www.mdi.ac.in/admissions",
            95,
        ),
        other(
            "Indian Institute of Foreign Trade (IIFT), Delhi",
            &["MBA-IB", "MBA-IB (Finance)"],
            [93.0, 85.0, 85.0, 85.0],
            OtherProcess {
                cat: 50,
                gd: None,
                spjat: None,
                essay: Some(20),
                pi: 20,
                academics: 10,
                work_exp: 0,
            },
            "₹19.5 Lakhs",
            10,
            "https://iift.ac.in/admissions",
            95,
        ),
        other(
            "JBIMS, Mumbai",
            &["MMS", "MMS-Finance"],
            [99.0, 95.0, 95.0, 95.0],
            gd_process(60, 20, 20, 0),
            "₹6.5 Lakhs",
            11,
            "https://www.jbims.edu/admissions",
            95,
        ),
        other(
            "NITIE, Mumbai",
            &["PGDIE", "PGDIM"],
            [92.0, 85.0, 85.0, 85.0],
            gd_process(50, 20, 20, 10),
            "₹8.5 Lakhs",
            13,
            "https://www.nitie.ac.in/admissions",
            90,
        ),
        other(
            "IIT Bombay - Shailesh J. Mehta School of Management",
            &["MBA"],
            [95.0, 90.0, 90.0, 90.0],
            gd_process(50, 20, 20, 10),
            "₹8.5 Lakhs",
            14,
            "https://www.sjmsom.iitb.ac.in/admissions",
            90,
        ),
        other(
            "IIT Delhi - Department of Management Studies",
            &["MBA", "MBA-Telecom"],
            [94.0, 88.0, 88.0, 88.0],
            gd_process(50, 20, 20, 10),
            "₹8.5 Lakhs",
            16,
            "https://dms.iitd.ac.in/admissions",
            90,
        ),
    ]
}

fn resource_sheet() -> ResourceSheet {
    ResourceSheet {
        name: "CAT Preparation Free Resources".to_string(),
        url: "https://docs.google.com/spreadsheets/d/121TJowkkWLeaPSAYp5Cokg0If9iwBtFDF6CZ5JWIYO0/edit?gid=0#gid=0".to_string(),
        description: "Comprehensive collection of free CAT preparation resources, mock tests, study materials, and practice questions".to_string(),
        categories: [
            "Mock Tests",
            "Study Materials",
            "Practice Questions",
            "Video Lectures",
            "Strategy Guides",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect(),
        last_updated: "2024".to_string(),
    }
}
