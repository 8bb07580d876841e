use std::fs;
use std::path::Path;

use covid_panel::config::{CountMode, PipelineConfig};
use covid_panel::error::PipelineError;
use covid_panel::ingest;
use covid_panel::pipeline::{check, execute};
use covid_panel::report::IssueKind;
use covid_panel::schema::CandidateResolver;

const CASES: &str = "\
state,end_date,new_cases,new_deaths,tot_cases,tot_deaths
CA,01/06/2021,1000,10,1000,10
CA,01/13/2021,200,2,1200,12
TX,01/13/2021,50,1,50,1
TX,01/13/2021,60,1,60,1
PR,01/13/2021,5,0,5,0
";

const VACCINATIONS: &str = "\
Date,Location,Administered_Dose1_Recip_18PlusPop_Pct,Series_Complete_18PlusPop_Pct,Additional_Doses_18Plus_Vax_Pct
01/12/2021,CA,3.0,1.0,
01/19/2021,CA,5.0,2.5,
01/05/2021,TX,2.0,0.5,
01/05/2021,US,2.2,0.6,
";

const HESITANCY: &str = "\
County Name,State,Estimated hesitant
\"Alameda County, California\",CALIFORNIA,0.08
\"Fresno County, California\",CALIFORNIA,0.2
\"Harris County, Texas\",TEXAS,0.25
";

const POPULATION: &str = "\
SUMLEV,STNAME,CTYNAME,POPESTIMATE2020,POPESTIMATE2021
040,California,California,39000000,39000000
050,California,Alameda County,1600000,1600000
050,California,Fresno County,1000000,1000000
040,Texas,Texas,29000000,29000000
";

const EVENTS: &str = "\
Date,Event,Source,Official_Source_URL
12/11/2020,Pfizer-BioNTech EUA,FDA,https://www.fda.gov/
\"May 10, 2021\",\"EUA expanded to ages 12-15\",FDA,
";

fn write_fixtures(root: &Path) -> PipelineConfig {
    let input = root.join("in");
    fs::create_dir_all(&input).unwrap();
    let config = PipelineConfig {
        csv_dir: input.clone(),
        output_dir: root.join("out"),
        start_date: "2021-01-06".parse().unwrap(),
        end_date: "2021-01-20".parse().unwrap(),
        ..PipelineConfig::default()
    };
    let files = [
        (&config.inputs.cases, CASES),
        (&config.inputs.vaccinations, VACCINATIONS),
        (&config.inputs.hesitancy, HESITANCY),
        (&config.inputs.population, POPULATION),
        (&config.inputs.events, EVENTS),
    ];
    for (name, content) in files {
        fs::write(input.join(name), content).unwrap();
    }
    config
}

/// Rows of a published CSV keyed by header name.
fn read_rows(path: &Path) -> Vec<std::collections::HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            headers
                .iter()
                .zip(r.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}

fn value(row: &std::collections::HashMap<String, String>, column: &str) -> f64 {
    row[column].parse().unwrap()
}

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path());
    let report = execute(&config, &CandidateResolver).unwrap();

    assert_eq!(report.state_week_rows, 51 * 3);
    assert_eq!(report.national_week_rows, 3);
    assert_eq!(report.event_rows, 2);
    let d = &report.diagnostics;
    assert_eq!(d.count(ingest::CASES, IssueKind::DuplicateObservation), 1);
    assert_eq!(d.count(ingest::CASES, IssueKind::UnmappableRegion), 1);
    assert_eq!(d.count(ingest::VACCINATIONS, IssueKind::UnmappableRegion), 1);
    assert_eq!(d.count(ingest::HESITANCY, IssueKind::UnmatchedCounty), 1);

    let facts = read_rows(&config.output_dir.join("state_week_fact.csv"));
    assert_eq!(facts.len(), 153);
    let keys: Vec<_> = facts
        .iter()
        .map(|r| (r["state_usps"].clone(), r["week_end_date"].clone()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let ca: Vec<_> = facts.iter().filter(|r| r["state_usps"] == "CA").collect();
    assert_eq!(ca[0]["state_fips"], "06");
    assert_eq!(ca[1]["week_end_date"], "2021-01-13");
    assert_eq!(ca[1]["weekly_cases"], "200");
    assert_eq!(ca[1]["cumulative_cases"], "1200");
    assert!((value(ca[1], "cumulative_cases_per_100k") - 3.08).abs() < 0.01);
    assert_eq!(value(ca[0], "vacc_pct_full_18p"), 0.0);
    assert_eq!(value(ca[1], "vacc_pct_full_18p"), 1.0);
    assert_eq!(value(ca[2], "vacc_pct_full_18p"), 2.5);
    assert_eq!(ca[1]["booster_pct_18p"], "");
    let expected_hesitancy = (0.08 * 1_600_000.0 + 0.2 * 1_000_000.0) / 2_600_000.0 * 100.0;
    assert!((value(ca[0], "hesitancy_pct") - expected_hesitancy).abs() < 1e-9);

    let tx: Vec<_> = facts.iter().filter(|r| r["state_usps"] == "TX").collect();
    assert_eq!(tx[1]["weekly_cases"], "50");
    assert_eq!(value(tx[0], "vacc_pct_full_18p"), 0.5);
    assert_eq!(tx[0]["hesitancy_pct"], "");

    let wy: Vec<_> = facts.iter().filter(|r| r["state_usps"] == "WY").collect();
    assert!(wy.iter().all(|r| r["population"].is_empty() && r["cases_per_100k"].is_empty()));

    let national = read_rows(&config.output_dir.join("national_week_timeseries.csv"));
    assert_eq!(national.len(), 3);
    assert_eq!(national[1]["weekly_cases"], "250");
    assert_eq!(national[1]["population"], "68000000");
    assert_eq!(national[2]["cumulative_cases"], "1250");
    let expected_full = (2.5 * 39_000_000.0) / 68_000_000.0;
    assert!((value(&national[2], "vacc_pct_full_18p") - expected_full).abs() < 1e-9);

    let events = read_rows(&config.output_dir.join("vaccine_event_markers_clean.csv"));
    assert_eq!(events[0]["date"], "2020-12-11");
    assert_eq!(events[1]["date"], "2021-05-10");
    assert_eq!(events[1]["official_source_url"], "");
}

#[test]
fn test_reruns_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_fixtures(dir.path());
    let first = dir.path().join("first");
    let second = dir.path().join("second");

    for gzip in [false, true] {
        config.gzip = gzip;
        config.output_dir = first.clone();
        execute(&config, &CandidateResolver).unwrap();
        config.output_dir = second.clone();
        execute(&config, &CandidateResolver).unwrap();
    }

    let mut names: Vec<_> = fs::read_dir(&first)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    names.sort();
    assert_eq!(names.len(), 6);
    for name in names {
        assert_eq!(
            fs::read(first.join(&name)).unwrap(),
            fs::read(second.join(&name)).unwrap(),
            "{name:?} differs"
        );
    }
}

#[test]
fn test_schema_failure_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path());
    fs::write(
        config.input(&config.inputs.cases),
        "state,week,new_cases,new_deaths\nCA,01/06/2021,1,1\n",
    )
    .unwrap();

    let err = execute(&config, &CandidateResolver).unwrap_err();
    match err {
        PipelineError::SchemaResolution {
            table, available, ..
        } => {
            assert_eq!(table, ingest::CASES);
            assert!(available.contains(&"week".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!config.output_dir.exists());
}

#[test]
fn test_schema_failure_keeps_previous_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path());
    execute(&config, &CandidateResolver).unwrap();
    let published = config.output_dir.join("state_week_fact.csv");
    let before = fs::read(&published).unwrap();

    fs::write(config.input(&config.inputs.events), "When,What\n2021-01-06,x\n").unwrap();
    assert!(execute(&config, &CandidateResolver).is_err());

    assert_eq!(fs::read(&published).unwrap(), before);
    assert_eq!(fs::read_dir(&config.output_dir).unwrap().count(), 3);
}

#[test]
fn test_excluding_dc() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_fixtures(dir.path());
    config.include_dc = false;
    let report = execute(&config, &CandidateResolver).unwrap();

    assert_eq!(report.state_week_rows, 50 * 3);
    let facts = read_rows(&config.output_dir.join("state_week_fact.csv"));
    assert!(facts.iter().all(|r| r["state_usps"] != "DC"));
}

#[test]
fn test_cumulative_case_counts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_fixtures(dir.path());
    config.case_counts = CountMode::Cumulative;
    let report = execute(&config, &CandidateResolver).unwrap();
    assert_eq!(report.diagnostics.count(ingest::CASES, IssueKind::DuplicateObservation), 1);

    let facts = read_rows(&config.output_dir.join("state_week_fact.csv"));
    let ca: Vec<_> = facts.iter().filter(|r| r["state_usps"] == "CA").collect();
    assert_eq!(ca[0]["weekly_cases"], "1000");
    assert_eq!(ca[1]["weekly_cases"], "200");
    assert!((value(ca[1], "cumulative_cases_per_100k") - 3.08).abs() < 0.01);
    assert!((value(ca[1], "cases_per_100k") - 0.513).abs() < 0.001);
}

#[test]
fn test_check_reports_resolved_columns() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path());
    let checks = check(&config, &CandidateResolver).unwrap();

    let booster = checks
        .iter()
        .find(|c| c.table == ingest::VACCINATIONS && c.field == "booster")
        .unwrap();
    assert_eq!(
        booster.header.as_deref(),
        Some("Additional_Doses_18Plus_Vax_Pct")
    );
    assert!(checks.iter().all(|c| !c.required || c.header.is_some()));
    assert!(!config.output_dir.exists());
}

#[test]
fn test_missing_booster_column_publishes_empty_booster() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path());
    fs::write(
        config.input(&config.inputs.vaccinations),
        "Date,Location,Administered_Dose1_Recip_18PlusPop_Pct,Series_Complete_18PlusPop_Pct\n\
         01/12/2021,CA,3.0,1.0\n",
    )
    .unwrap();
    execute(&config, &CandidateResolver).unwrap();

    let facts = read_rows(&config.output_dir.join("state_week_fact.csv"));
    assert!(facts.iter().all(|r| r["booster_pct_18p"].is_empty()));
    let ca: Vec<_> = facts.iter().filter(|r| r["state_usps"] == "CA").collect();
    assert_eq!(value(ca[0], "vacc_pct_full_18p"), 0.0);
    assert_eq!(value(ca[1], "vacc_pct_full_18p"), 1.0);

    let national = read_rows(&config.output_dir.join("national_week_timeseries.csv"));
    assert_eq!(national.len(), 3);
    assert!(national.iter().all(|r| r["booster_pct_18p"].is_empty()));
}
