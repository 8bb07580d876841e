//! Candidate header names for every input field, in priority order.

pub const CASES_STATE: &[&str] = &[
    "state",
    "State",
    "STATE",
    "state_code",
    "State Code",
    "Location",
    "location",
];
pub const CASES_END_DATE: &[&str] = &[
    "end_date",
    "end date",
    "End Date",
    "END_DATE",
    "week_end_date",
    "Week End Date",
    "date_updated",
];
pub const CASES_NEW_CASES: &[&str] = &[
    "new_cases",
    "new cases",
    "New Cases",
    "NEW_CASES",
    "cases",
    "Cases",
];
pub const CASES_NEW_DEATHS: &[&str] = &[
    "new_deaths",
    "new deaths",
    "New Deaths",
    "NEW_DEATHS",
    "deaths",
    "Deaths",
];
pub const CASES_TOTAL_CASES: &[&str] = &[
    "tot_cases",
    "total_cases",
    "Total Cases",
    "cumulative_cases",
];
pub const CASES_TOTAL_DEATHS: &[&str] = &[
    "tot_deaths",
    "total_deaths",
    "Total Deaths",
    "cumulative_deaths",
];

pub const VAX_LOCATION: &[&str] = &[
    "Location",
    "location",
    "State",
    "state",
    "STATE",
    "state_code",
    "State Code",
];
pub const VAX_DATE: &[&str] = &[
    "Date",
    "date",
    "DATE",
    "week_end_date",
    "Week End Date",
    "end_date",
];
pub const VAX_ANY_DOSE: &[&str] = &[
    "Administered_Dose1_Recip_18PlusPop_Pct",
    "Administered Dose1 Recip 18PlusPop Pct",
];
pub const VAX_FULL_SERIES: &[&str] = &[
    "Series_Complete_18PlusPop_Pct",
    "Series Complete 18PlusPop Pct",
];
pub const VAX_BOOSTER: &[&str] = &[
    "Additional_Doses_18Plus_Vax_Pct",
    "Additional Doses 18Plus Vax Pct",
    "Booster_18Plus_Pct",
    "Booster 18Plus Pct",
];

pub const HES_STATE: &[&str] = &[
    "State",
    "state",
    "State Code",
    "state_code",
    "USPS",
    "usps",
    "Location",
    "location",
];
pub const HES_COUNTY: &[&str] = &[
    "County Name",
    "county_name",
    "County",
    "county",
    "CTYNAME",
];
pub const HES_ESTIMATE: &[&str] = &[
    "Estimated hesitant",
    "estimated hesitant",
    "Estimated_hesitant",
    "hesitancy",
    "Hesitancy",
];

pub const POP_STATE_NAME: &[&str] = &["STNAME", "State Name", "state_name", "State", "state"];
pub const POP_COUNTY_NAME: &[&str] = &["CTYNAME", "County Name", "county_name", "County", "county"];
pub const POP_YEAR: &[&str] = &["YEAR", "Year", "year"];
pub const POP_VALUE: &[&str] = &["POPULATION", "Population", "population", "POPESTIMATE"];

pub const EVENT_DATE: &[&str] = &["Date", "date", "DATE", "event_date", "Event Date"];
pub const EVENT_TEXT: &[&str] = &["Event", "event", "EVENT", "event_name", "Event Name"];
pub const EVENT_SOURCE: &[&str] = &["Source", "source", "SOURCE", "source_name"];
pub const EVENT_URL: &[&str] = &[
    "Official_Source_URL",
    "Official Source URL",
    "official_source_url",
    "Source_URL",
    "Source URL",
    "URL",
    "url",
];
