//! U.S. state identifiers: postal code, FIPS code and full name.

use std::fmt;

/// (postal code, FIPS code, full name), ordered by postal code.
static STATES: &[(&str, &str, &str)] = &[
    ("AK", "02", "Alaska"),
    ("AL", "01", "Alabama"),
    ("AR", "05", "Arkansas"),
    ("AZ", "04", "Arizona"),
    ("CA", "06", "California"),
    ("CO", "08", "Colorado"),
    ("CT", "09", "Connecticut"),
    ("DC", "11", "District of Columbia"),
    ("DE", "10", "Delaware"),
    ("FL", "12", "Florida"),
    ("GA", "13", "Georgia"),
    ("HI", "15", "Hawaii"),
    ("IA", "19", "Iowa"),
    ("ID", "16", "Idaho"),
    ("IL", "17", "Illinois"),
    ("IN", "18", "Indiana"),
    ("KS", "20", "Kansas"),
    ("KY", "21", "Kentucky"),
    ("LA", "22", "Louisiana"),
    ("MA", "25", "Massachusetts"),
    ("MD", "24", "Maryland"),
    ("ME", "23", "Maine"),
    ("MI", "26", "Michigan"),
    ("MN", "27", "Minnesota"),
    ("MO", "29", "Missouri"),
    ("MS", "28", "Mississippi"),
    ("MT", "30", "Montana"),
    ("NC", "37", "North Carolina"),
    ("ND", "38", "North Dakota"),
    ("NE", "31", "Nebraska"),
    ("NH", "33", "New Hampshire"),
    ("NJ", "34", "New Jersey"),
    ("NM", "35", "New Mexico"),
    ("NV", "32", "Nevada"),
    ("NY", "36", "New York"),
    ("OH", "39", "Ohio"),
    ("OK", "40", "Oklahoma"),
    ("OR", "41", "Oregon"),
    ("PA", "42", "Pennsylvania"),
    ("RI", "44", "Rhode Island"),
    ("SC", "45", "South Carolina"),
    ("SD", "46", "South Dakota"),
    ("TN", "47", "Tennessee"),
    ("TX", "48", "Texas"),
    ("UT", "49", "Utah"),
    ("VA", "51", "Virginia"),
    ("VT", "50", "Vermont"),
    ("WA", "53", "Washington"),
    ("WI", "55", "Wisconsin"),
    ("WV", "54", "West Virginia"),
    ("WY", "56", "Wyoming"),
];

/// A state (or DC). Ordering follows the postal code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(u8);

impl Region {
    pub fn postal(self) -> &'static str {
        STATES[self.0 as usize].0
    }

    pub fn fips(self) -> &'static str {
        STATES[self.0 as usize].1
    }

    pub fn is_dc(self) -> bool {
        self.postal() == "DC"
    }

    /// Every known region in postal-code order.
    pub fn all() -> impl Iterator<Item = Region> {
        (0..STATES.len()).map(|i| Region(i as u8))
    }

    /// The regions a run covers: the 50 states, plus DC when `include_dc` is set.
    pub fn declared(include_dc: bool) -> Vec<Region> {
        Region::all().filter(|r| include_dc || !r.is_dc()).collect()
    }

    pub fn from_postal(code: &str) -> Option<Region> {
        let code = code.trim();
        STATES
            .iter()
            .position(|(postal, _, _)| postal.eq_ignore_ascii_case(code))
            .map(|i| Region(i as u8))
    }

    /// Accepts `6` as well as `06`.
    pub fn from_fips(code: &str) -> Option<Region> {
        let n: u8 = code.trim().parse().ok()?;
        STATES
            .iter()
            .position(|(_, fips, _)| fips.parse::<u8>().ok() == Some(n))
            .map(|i| Region(i as u8))
    }

    pub fn from_name(name: &str) -> Option<Region> {
        let name = name.trim().trim_start_matches('.').trim();
        STATES
            .iter()
            .position(|(_, _, full)| full.eq_ignore_ascii_case(name))
            .map(|i| Region(i as u8))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.postal())
    }
}
