// 📍 Location - postal address with a canonical identity
//
// The id IS the canonical address string, computed by the constructor.
// Two locations are equal iff their ids match.

use crate::error::NormalizationError;
use crate::normalize::normalize_address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Canonical address key (see `normalize_address`)
    pub id: String,

    /// Street lines, e.g. ["123 Governors Ln", "Suite 4"]
    pub lines: Vec<String>,
    pub city: String,
    /// Two-letter state or possession abbreviation
    pub state: String,
    pub postal_code: String,
    /// Two-letter country code
    pub country: String,
}

impl Location {
    /// Build a location, computing its canonical id. Blank street lines are dropped.
    pub fn new(
        lines: Vec<String>,
        city: &str,
        state: &str,
        postal_code: &str,
        country: &str,
    ) -> Result<Self, NormalizationError> {
        let lines: Vec<String> = lines.into_iter().filter(|l| !l.trim().is_empty()).collect();
        let id = normalize_address(&lines, city, state, postal_code, country)?;

        Ok(Location {
            id,
            lines,
            city: city.to_string(),
            state: state.to_string(),
            postal_code: postal_code.to_string(),
            country: country.to_string(),
        })
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Location {}
