//! CLI entry point for the CAT cutoff tool.
//!
//! Provides subcommands for converting between percentiles and marks,
//! browsing institution cutoffs, and exporting the datasets to CSV/JSON.

use anyhow::{Context, Result, bail};
use cat_cutoffs::calculator::{self, SectionScores, Targets};
use cat_cutoffs::config::Settings;
use cat_cutoffs::data::{MappingSource, ReferenceData, reference};
use cat_cutoffs::download::{MimeType, SaveOptions, save_as_file};
use cat_cutoffs::export::{self, institution_rows, other_institute_rows, render_csv};
use cat_cutoffs::filters::{
    self, InstituteFilter, LOW_PI_WAT_MIN_CAT_WEIGHT, OtherCategory, OtherFilter, OtherSortKey,
    SortKey, TypeFilter,
};
use cat_cutoffs::interpolate::{PercentileTables, Precision};
use cat_cutoffs::model::{InstituteType, Section};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const INSTITUTIONS_CSV: &str = "institution_admissions_data.csv";
const OTHER_INSTITUTES_CSV: &str = "other_institutes_data.csv";
const COMBINED_JSON: &str = "combined_dataset.json";
const PERCENTILE_TABLE_CSV: &str = "percentile_marks_table.csv";

#[derive(Parser)]
#[command(name = "cat_cutoffs")]
#[command(about = "CAT percentile/marks conversion and IIM cutoff data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a percentile into the marks needed for it
    Marks {
        percentile: f64,

        #[arg(short, long, default_value = "overall")]
        section: Section,

        /// Exam year (defaults to CAT_DEFAULT_YEAR, then the latest year)
        #[arg(short, long)]
        year: Option<u16>,

        #[arg(long, default_value = "official")]
        source: MappingSource,

        /// Round to whole marks
        #[arg(long, default_value_t = false)]
        round: bool,
    },
    /// Convert raw marks into a percentile
    Percentile {
        marks: f64,

        #[arg(short, long, default_value = "overall")]
        section: Section,

        #[arg(short, long)]
        year: Option<u16>,

        #[arg(long, default_value = "historical")]
        source: MappingSource,

        /// Round to two decimals
        #[arg(long, default_value_t = false)]
        round: bool,
    },
    /// Marks required for target percentiles
    Target {
        #[arg(long)]
        overall: f64,
        #[arg(long)]
        varc: Option<f64>,
        #[arg(long)]
        dilr: Option<f64>,
        #[arg(long)]
        qa: Option<f64>,

        #[arg(short, long)]
        year: Option<u16>,

        #[arg(long, default_value = "historical")]
        source: MappingSource,
    },
    /// Predict percentiles from sectional scores
    Predict {
        #[arg(long)]
        varc: f64,
        #[arg(long)]
        dilr: f64,
        #[arg(long)]
        qa: f64,

        #[arg(short, long)]
        year: Option<u16>,
    },
    /// List institutions with their cutoffs
    Cutoffs {
        /// Case-insensitive name search
        #[arg(long)]
        search: Option<String>,

        /// old, new or baby
        #[arg(long = "type")]
        kind: Option<InstituteType>,

        #[arg(short, long)]
        year: Option<u16>,

        #[arg(long, value_enum, default_value_t = SortArg::Cutoff)]
        sort: SortArg,
    },
    /// Rank institutions by overall cutoff
    Rankings {
        #[arg(short, long)]
        year: Option<u16>,

        /// Only show the first N entries
        #[arg(short = 'n', long)]
        top: Option<usize>,
    },
    /// Institutions where CAT carries most of the selection weight
    LowPiwat {
        #[arg(short, long)]
        year: Option<u16>,

        #[arg(long, default_value_t = LOW_PI_WAT_MIN_CAT_WEIGHT)]
        min_cat_weight: u32,

        #[arg(long = "type")]
        kind: Option<InstituteType>,

        #[arg(long, value_enum, default_value_t = SortArg::CatWeight)]
        sort: SortArg,
    },
    /// List non-IIM institutes
    Others {
        #[arg(long)]
        search: Option<String>,

        /// fms, spjimr, mdi, iift, jbims, nitie or iit
        #[arg(long)]
        category: Option<OtherCategory>,

        #[arg(long, value_enum, default_value_t = OtherSortArg::Cutoff)]
        sort: OtherSortArg,
    },
    /// Percentile -> marks quick-reference table
    Table {
        #[arg(short, long)]
        year: Option<u16>,

        /// Also save the table as CSV
        #[arg(long, default_value_t = false)]
        csv: bool,

        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Export the datasets as CSV and JSON files
    Export {
        /// Write only one of the files
        #[arg(long, value_enum)]
        only: Option<ExportTarget>,

        /// Output directory (defaults to CAT_EXPORT_DIR)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Gzip the files (defaults to CAT_GZIP)
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Cutoff,
    Name,
    Established,
    CatWeight,
    PiWat,
}

impl SortArg {
    fn key(self, year: u16) -> SortKey {
        match self {
            SortArg::Cutoff => SortKey::CutoffDesc { year },
            SortArg::Name => SortKey::Name,
            SortArg::Established => SortKey::Established,
            SortArg::CatWeight => SortKey::CatWeightDesc { year },
            SortArg::PiWat => SortKey::PiWatWeightAsc { year },
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OtherSortArg {
    Cutoff,
    Name,
    Fees,
}

impl From<OtherSortArg> for OtherSortKey {
    fn from(arg: OtherSortArg) -> Self {
        match arg {
            OtherSortArg::Cutoff => OtherSortKey::CutoffDesc,
            OtherSortArg::Name => OtherSortKey::Name,
            OtherSortArg::Fees => OtherSortKey::FeesAsc,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportTarget {
    Institutions,
    Others,
    Json,
}

fn type_filter(kind: Option<InstituteType>) -> TypeFilter {
    kind.map_or(TypeFilter::All, TypeFilter::Only)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let settings = Settings::from_env()?;

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = settings
        .log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = settings
        .log_file_path
        .file_name()
        .unwrap_or(OsStr::new("cat_cutoffs.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    debug!(?settings, "Settings loaded");

    let cli = Cli::parse();
    let data = reference();

    for warning in filters::check_weights(&data.institutions) {
        warn!(
            institute = %warning.name,
            year = warning.year,
            total = warning.total,
            "Process weights sum above 100"
        );
    }

    match cli.command {
        Commands::Marks {
            percentile,
            section,
            year,
            source,
            round,
        } => {
            calculator::check_percentile(section, percentile)?;
            let tables = data.tables(source);
            let (year, fallback) = resolve_year(tables, year, &settings)?;
            let table = tables.table_or_fallback(year, section, fallback)?;
            let marks = table.marks_for_percentile(percentile)?;
            let precision = if round { Precision::WholeMarks } else { Precision::Exact };
            info!(
                year = table.year,
                %section,
                %source,
                percentile,
                marks = precision.apply(marks),
                "Marks for percentile"
            );
            println!("{}", precision.apply(marks));
        }
        Commands::Percentile {
            marks,
            section,
            year,
            source,
            round,
        } => {
            calculator::check_marks(section, marks)?;
            let tables = data.tables(source);
            let (year, fallback) = resolve_year(tables, year, &settings)?;
            let table = tables.table_or_fallback(year, section, fallback)?;
            let percentile = table.percentile_for_marks(marks)?;
            let precision = if round { Precision::TwoDecimals } else { Precision::Exact };
            info!(
                year = table.year,
                %section,
                %source,
                marks,
                percentile = precision.apply(percentile),
                "Percentile for marks"
            );
            println!("{}", precision.apply(percentile));
        }
        Commands::Target {
            overall,
            varc,
            dilr,
            qa,
            year,
            source,
        } => {
            let tables = data.tables(source);
            let (year, fallback) = resolve_year(tables, year, &settings)?;
            let targets = Targets {
                overall,
                varc,
                dilr,
                qa,
            };
            print_json(&calculator::required_marks(tables, year, fallback, &targets)?)?;
        }
        Commands::Predict {
            varc,
            dilr,
            qa,
            year,
        } => {
            let tables = data.tables(MappingSource::Historical);
            let (year, fallback) = resolve_year(tables, year, &settings)?;
            let scores = SectionScores { varc, dilr, qa };
            print_json(&calculator::predict_percentiles(tables, year, fallback, &scores)?)?;
        }
        Commands::Cutoffs {
            search,
            kind,
            year,
            sort,
        } => {
            let year = institution_year(data, year, &settings)?;
            let filter = InstituteFilter {
                search,
                kind: type_filter(kind),
                year: Some(year),
            };
            let mut selected: Vec<_> = filters::filter_institutions(&data.institutions, &filter).collect();
            filters::sort_institutions(&mut selected, sort.key(year));

            info!(year, total = selected.len(), "Institutions matched");
            for record in selected {
                let Some(cycle) = record.cycle(year) else {
                    continue;
                };
                info!(
                    institute = %record.name,
                    kind = %record.kind,
                    cutoff = cycle.overall_percentile,
                    varc = cycle.sectional.varc,
                    dilr = cycle.sectional.dilr,
                    qa = cycle.sectional.qa,
                    estimated_marks = cycle.estimated_marks.overall,
                    confidence = cycle.confidence,
                    "Cutoff"
                );
            }
        }
        Commands::Rankings { year, top } => {
            let year = institution_year(data, year, &settings)?;
            let rankings = filters::cutoff_rankings(&data.institutions, year);
            let rankings = match top {
                Some(n) => filters::top_n(rankings, n),
                None => rankings,
            };
            print_json(&rankings)?;
        }
        Commands::LowPiwat {
            year,
            min_cat_weight,
            kind,
            sort,
        } => {
            let year = institution_year(data, year, &settings)?;
            let profiles = filters::low_pi_wat(
                &data.institutions,
                year,
                min_cat_weight,
                type_filter(kind),
                sort.key(year),
            );
            info!(year, min_cat_weight, total = profiles.len(), "Low PI/WAT institutions");
            print_json(&profiles)?;
        }
        Commands::Others {
            search,
            category,
            sort,
        } => {
            let filter = OtherFilter { search, category };
            let mut selected: Vec<_> =
                filters::filter_other_institutes(&data.other_institutes, &filter).collect();
            filters::sort_other_institutes(&mut selected, sort.into());
            print_json(&selected)?;
        }
        Commands::Table { year, csv, dir } => {
            let year = year_with_data(&data.mappings, year, &settings)?;
            let rows = calculator::percentile_marks_table(&data.mappings, year)?;
            print_json(&rows)?;

            if csv {
                let options = SaveOptions {
                    dir: dir.unwrap_or_else(|| settings.export_dir.clone()),
                    gzip: settings.gzip,
                };
                save_as_file(&render_csv(&rows)?, PERCENTILE_TABLE_CSV, MimeType::Csv, &options);
            }
        }
        Commands::Export { only, dir, gzip } => {
            let options = SaveOptions {
                dir: dir.unwrap_or_else(|| settings.export_dir.clone()),
                gzip: gzip || settings.gzip,
            };
            export_all(data, only, &options)?;
        }
    }

    Ok(())
}

/// Picks the requested year, else `CAT_DEFAULT_YEAR`, else the latest year
/// with tables. The second value is the year to fall back to on a miss.
fn resolve_year(
    tables: &PercentileTables,
    requested: Option<u16>,
    settings: &Settings,
) -> Result<(u16, u16)> {
    let Some(latest) = tables.latest_year() else {
        bail!("No percentile tables available");
    };
    let fallback = settings.default_year.unwrap_or(latest);
    Ok((requested.unwrap_or(fallback), fallback))
}

/// Like [`resolve_year`], but substitutes the fallback year up front when
/// the requested year has no tables at all.
fn year_with_data(
    tables: &PercentileTables,
    requested: Option<u16>,
    settings: &Settings,
) -> Result<u16> {
    let (year, fallback) = resolve_year(tables, requested, settings)?;
    if tables.years().contains(&year) {
        return Ok(year);
    }
    warn!(year, fallback_year = fallback, "No data for requested year, using fallback year");
    Ok(fallback)
}

/// Year for the institution views, resolved against the years that have
/// admission cycles rather than the percentile tables.
fn institution_year(
    data: &ReferenceData,
    requested: Option<u16>,
    settings: &Settings,
) -> Result<u16> {
    let years = filters::cycle_years(&data.institutions);
    let Some(&latest) = years.last() else {
        bail!("No institution cycles available");
    };
    let fallback = settings
        .default_year
        .filter(|year| years.contains(year))
        .unwrap_or(latest);
    let year = requested.unwrap_or(fallback);
    if years.contains(&year) {
        return Ok(year);
    }
    warn!(year, fallback_year = fallback, "No cycles for requested year, using fallback year");
    Ok(fallback)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Renders and saves the export files. Rendering errors are returned; save
/// failures are logged by the download trigger.
#[tracing::instrument(skip(data, only, options), fields(dir = %options.dir.display(), gzip = options.gzip))]
fn export_all(data: &ReferenceData, only: Option<ExportTarget>, options: &SaveOptions) -> Result<()> {
    let wanted = |target: ExportTarget| only.is_none_or(|o| o == target);

    if wanted(ExportTarget::Institutions) {
        let csv = render_csv(&institution_rows(&data.institutions))?;
        save_as_file(&csv, INSTITUTIONS_CSV, MimeType::Csv, options);
    }
    if wanted(ExportTarget::Others) {
        let csv = render_csv(&other_institute_rows(&data.other_institutes))?;
        save_as_file(&csv, OTHER_INSTITUTES_CSV, MimeType::Csv, options);
    }
    if wanted(ExportTarget::Json) {
        let json = export::to_json(data)?;
        save_as_file(&json, COMBINED_JSON, MimeType::Json, options);
    }

    info!("Export finished");
    Ok(())
}
