//! Pipeline configuration.
//!
//! Stored as a JSON object on disk; every field is optional and falls back to
//! the defaults below:
//! ```json
//! {
//!   "csv_dir": "original_data",
//!   "start_date": "2021-01-06",
//!   "end_date": "2023-05-10",
//!   "vaccination_join": { "mode": "nearest", "max_gap_days": 3 },
//!   "case_counts": "cumulative"
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// How a right-hand series is matched to the week grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JoinMode {
    /// Same region and identical date.
    Exact,
    /// Same region and the closest date at most `max_gap_days` away.
    Nearest { max_gap_days: i64 },
}

/// What the case/death columns of the cases table hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMode {
    /// New cases/deaths per reporting week.
    #[default]
    Weekly,
    /// Running totals, converted to weekly increments.
    Cumulative,
}

/// Fill value for vaccination percentages on weeks with no matched report.
/// The national weighted means follow the same choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaccinationGapPolicy {
    /// "Not yet reporting" is 0% coverage.
    #[default]
    ZeroFill,
    /// Leave the week missing and exclude it from national means.
    Missing,
}

/// Input file locations, relative to [`PipelineConfig::csv_dir`] unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub cases: PathBuf,
    pub vaccinations: PathBuf,
    pub hesitancy: PathBuf,
    pub population: PathBuf,
    /// Flat census file with county rows, used to weight hesitancy. When
    /// unset, county rows of `population` are used if that file has any.
    pub county_population: Option<PathBuf>,
    pub events: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            cases: "COVID-19 Cases & Deaths by State.csv".into(),
            vaccinations: "COVID-19_Vaccinations by State.csv".into(),
            hesitancy: "Vaccine Hesitancy for COVID-19.csv".into(),
            population: "per 100k normalization.csv".into(),
            county_population: None,
            events: "COVID19_Vaccine_Event_Markers.csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub csv_dir: PathBuf,
    pub output_dir: PathBuf,
    pub inputs: InputPaths,
    /// First possible week-ending date (inclusive).
    pub start_date: NaiveDate,
    /// Last possible week-ending date (inclusive).
    pub end_date: NaiveDate,
    /// Weekday every week-ending date falls on.
    pub week_ending: Weekday,
    pub include_dc: bool,
    pub case_counts: CountMode,
    pub case_join: JoinMode,
    pub vaccination_join: JoinMode,
    pub vaccination_gaps: VaccinationGapPolicy,
    /// Population year used to weight hesitancy, both county→state and state→national.
    pub hesitancy_reference_year: i32,
    /// Write `.csv.gz` instead of `.csv`.
    pub gzip: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            csv_dir: "original_data".into(),
            output_dir: "data".into(),
            inputs: InputPaths::default(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 22).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2023, 5, 10).unwrap_or_default(),
            week_ending: Weekday::Wed,
            include_dc: true,
            case_counts: CountMode::Weekly,
            case_join: JoinMode::Exact,
            vaccination_join: JoinMode::Nearest { max_gap_days: 3 },
            vaccination_gaps: VaccinationGapPolicy::ZeroFill,
            hesitancy_reference_year: 2020,
            gzip: false,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(PipelineError::Config(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        for (name, join) in [
            ("case_join", self.case_join),
            ("vaccination_join", self.vaccination_join),
        ] {
            if let JoinMode::Nearest { max_gap_days } = join {
                if max_gap_days < 0 {
                    return Err(PipelineError::Config(format!(
                        "{name}.max_gap_days must be >= 0, got {max_gap_days}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolves an input path against `csv_dir`.
    pub fn input(&self, path: &Path) -> PathBuf {
        self.csv_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "start_date": "2021-01-06",
            "vaccination_join": { "mode": "nearest", "max_gap_days": 5 },
            "case_counts": "cumulative",
            "week_ending": "Wed",
            "inputs": { "cases": "cases.csv" }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2021, 1, 6).unwrap());
        assert_eq!(config.end_date, PipelineConfig::default().end_date);
        assert_eq!(config.vaccination_join, JoinMode::Nearest { max_gap_days: 5 });
        assert_eq!(config.case_join, JoinMode::Exact);
        assert_eq!(config.case_counts, CountMode::Cumulative);
        assert_eq!(config.inputs.cases, PathBuf::from("cases.csv"));
        assert_eq!(config.inputs.events, InputPaths::default().events);
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = PipelineConfig {
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_negative_tolerance() {
        let config = PipelineConfig {
            vaccination_join: JoinMode::Nearest { max_gap_days: -1 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_range_falls_on_wednesdays() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(chrono::Datelike::weekday(&config.start_date), Weekday::Wed);
        assert_eq!(chrono::Datelike::weekday(&config.end_date), Weekday::Wed);
    }

    #[test]
    fn test_input_resolves_against_csv_dir() {
        let config = PipelineConfig {
            csv_dir: "/data/in".into(),
            ..Default::default()
        };
        assert_eq!(
            config.input(Path::new("cases.csv")),
            PathBuf::from("/data/in/cases.csv")
        );
        assert_eq!(
            config.input(Path::new("/abs/cases.csv")),
            PathBuf::from("/abs/cases.csv")
        );
    }
}
