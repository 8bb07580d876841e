//! End-to-end runs: load every input, assemble the panel, roll it up, and
//! publish the output tables.

use std::path::Path;

use tracing::{info, warn};

use crate::aggregate::{NationalAggregator, aggregate_hesitancy};
use crate::config::{CountMode, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::events::normalize_events;
use crate::ingest::{self, load_cases, load_hesitancy, load_vaccinations};
use crate::output::{OutputTables, write_outputs};
use crate::panel::{PanelInputs, assemble_panel};
use crate::population::{CountyPopulation, PopulationTables, build_population};
use crate::region::Region;
use crate::report::{Coverage, Diagnostics, RunReport};
use crate::schema::{ColumnResolver, RawTable, columns};

/// Raw input tables, read but not yet interpreted.
#[derive(Debug, Clone)]
pub struct RawInputs {
    pub cases: RawTable,
    pub vaccinations: RawTable,
    pub hesitancy: RawTable,
    /// Read without a header row; the layout is detected by content.
    pub population: RawTable,
    pub county_population: Option<RawTable>,
    pub events: RawTable,
}

impl RawInputs {
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let inputs = &config.inputs;
        let read = |name: &str, path: &Path| {
            let path = config.input(path);
            info!(table = name, path = %path.display(), "Reading input");
            RawTable::from_path(name, &path)
        };
        let read_headerless = |name: &str, path: &Path| {
            let path = config.input(path);
            info!(table = name, path = %path.display(), "Reading input");
            RawTable::headerless_from_path(name, &path)
        };

        Ok(Self {
            cases: read(ingest::CASES, &inputs.cases)?,
            vaccinations: read(ingest::VACCINATIONS, &inputs.vaccinations)?,
            hesitancy: read(ingest::HESITANCY, &inputs.hesitancy)?,
            population: read_headerless(ingest::POPULATION, &inputs.population)?,
            county_population: inputs
                .county_population
                .as_deref()
                .map(|path| read_headerless(ingest::COUNTY_POPULATION, path))
                .transpose()?,
            events: read(ingest::EVENTS, &inputs.events)?,
        })
    }
}

/// Builds the three output tables and the run report. Nothing is written.
#[tracing::instrument(skip_all, fields(csv_dir = %config.csv_dir.display()))]
pub fn run<R: ColumnResolver + ?Sized>(
    config: &PipelineConfig,
    resolver: &R,
) -> Result<(OutputTables, RunReport)> {
    config.validate()?;
    let raw = RawInputs::load(config)?;
    transform(config, &raw, resolver)
}

/// The pure part of [`run`], over tables already in memory.
pub fn transform<R: ColumnResolver + ?Sized>(
    config: &PipelineConfig,
    raw: &RawInputs,
    resolver: &R,
) -> Result<(OutputTables, RunReport)> {
    let mut diagnostics = Diagnostics::default();

    let population = build_population(&raw.population, resolver, &mut diagnostics)?;
    let counties = county_population(
        raw,
        population.counties.clone(),
        resolver,
        &mut diagnostics,
    )?;

    let cases = load_cases(&raw.cases, resolver, config.case_counts, &mut diagnostics)?;
    let vaccinations = load_vaccinations(&raw.vaccinations, resolver, &mut diagnostics)?;
    let survey = load_hesitancy(&raw.hesitancy, resolver, &mut diagnostics)?;
    let events = normalize_events(&raw.events, resolver, &mut diagnostics)?;

    let hesitancy = aggregate_hesitancy(
        &survey,
        &counties,
        config.hesitancy_reference_year,
        &mut diagnostics,
    );

    let regions = Region::declared(config.include_dc);
    let panel = assemble_panel(
        config,
        &regions,
        PanelInputs {
            cases: &cases,
            vaccinations: &vaccinations,
            hesitancy: &hesitancy,
            population: &population.states,
        },
        &mut diagnostics,
    )?;

    let aggregator = NationalAggregator::new(
        &population.states,
        &regions,
        &hesitancy,
        config.hesitancy_reference_year,
        config.vaccination_gaps,
    )
    .with_booster(vaccinations.has_booster);
    let missing = aggregator.population().missing_region_years;
    if missing > 0 {
        warn!(
            missing_region_years = missing,
            "National population excludes region-years absent from the population table"
        );
    }
    let national = aggregator.aggregate(&panel.facts);

    let report = RunReport {
        state_week_rows: panel.facts.len(),
        national_week_rows: national.len(),
        event_rows: events.len(),
        coverage: Coverage::from_facts(
            &panel.facts,
            panel.case_matches,
            panel.vaccination_matches,
        ),
        diagnostics,
    };
    let tables = OutputTables {
        state_weeks: panel.facts,
        national,
        events,
    };
    Ok((tables, report))
}

/// County populations from the dedicated file when configured, otherwise the
/// county rows of the main population file.
fn county_population<R: ColumnResolver + ?Sized>(
    raw: &RawInputs,
    fallback: CountyPopulation,
    resolver: &R,
    diagnostics: &mut Diagnostics,
) -> Result<CountyPopulation> {
    match &raw.county_population {
        Some(table) => {
            let PopulationTables { counties, .. } = build_population(table, resolver, diagnostics)?;
            if counties.is_empty() {
                warn!(table = %table.name, "County population file has no county rows");
            }
            Ok(counties)
        }
        None => Ok(fallback),
    }
}

/// Runs the pipeline and publishes its outputs into `config.output_dir`.
pub fn execute<R: ColumnResolver + ?Sized>(
    config: &PipelineConfig,
    resolver: &R,
) -> Result<RunReport> {
    let (tables, report) = run(config, resolver)?;
    write_outputs(&config.output_dir, &tables, config.gzip)?;
    report.log();
    Ok(report)
}

/// Outcome of resolving one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCheck {
    pub table: String,
    pub field: &'static str,
    pub required: bool,
    pub header: Option<String>,
}

/// Reads every input and resolves each field's column without transforming
/// anything. Every field is logged; the first missing required column is
/// returned as the error after all were checked.
#[tracing::instrument(skip_all, fields(csv_dir = %config.csv_dir.display()))]
pub fn check<R: ColumnResolver + ?Sized>(
    config: &PipelineConfig,
    resolver: &R,
) -> Result<Vec<ColumnCheck>> {
    let raw = RawInputs::load(config)?;
    let (cases_field, deaths_field) = match config.case_counts {
        CountMode::Weekly => (columns::CASES_NEW_CASES, columns::CASES_NEW_DEATHS),
        CountMode::Cumulative => (columns::CASES_TOTAL_CASES, columns::CASES_TOTAL_DEATHS),
    };
    let plan: [(&RawTable, &'static str, &[&str], bool); 14] = [
        (&raw.cases, "state", columns::CASES_STATE, true),
        (&raw.cases, "end date", columns::CASES_END_DATE, true),
        (&raw.cases, "cases", cases_field, true),
        (&raw.cases, "deaths", deaths_field, true),
        (&raw.vaccinations, "location", columns::VAX_LOCATION, true),
        (&raw.vaccinations, "date", columns::VAX_DATE, true),
        (&raw.vaccinations, "any dose", columns::VAX_ANY_DOSE, true),
        (&raw.vaccinations, "full series", columns::VAX_FULL_SERIES, true),
        (&raw.vaccinations, "booster", columns::VAX_BOOSTER, false),
        (&raw.hesitancy, "state", columns::HES_STATE, true),
        (&raw.hesitancy, "county", columns::HES_COUNTY, false),
        (&raw.hesitancy, "estimate", columns::HES_ESTIMATE, true),
        (&raw.events, "date", columns::EVENT_DATE, true),
        (&raw.events, "event", columns::EVENT_TEXT, true),
    ];

    let mut checks = Vec::with_capacity(plan.len());
    let mut first_error: Option<PipelineError> = None;
    for (table, field, candidates, required) in plan {
        let resolved = resolver.find(table, candidates);
        match (&resolved, required) {
            (Some(column), _) => {
                info!(table = %table.name, field, column = %column.header, "Resolved column")
            }
            (None, true) => {
                warn!(table = %table.name, field, ?candidates, "Required column not found");
                if first_error.is_none() {
                    first_error = resolver.require(table, candidates, field).err();
                }
            }
            (None, false) => info!(table = %table.name, field, "Optional column absent"),
        }
        checks.push(ColumnCheck {
            table: table.name.clone(),
            field,
            required,
            header: resolved.map(|c| c.header),
        });
    }

    let mut diagnostics = Diagnostics::default();
    let population = build_population(&raw.population, resolver, &mut diagnostics)?;
    info!(
        state_years = population.states.len(),
        counties = population.counties.len(),
        "Population file readable"
    );

    match first_error {
        Some(e) => Err(e),
        None => Ok(checks),
    }
}
