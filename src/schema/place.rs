use serde::{Deserialize, Serialize};

/// A free-text hierarchical place, smallest jurisdiction first:
/// `"Boston, Suffolk, Massachusetts, USA"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Place {
    pub raw: String,
    pub parts: Vec<String>,
}

impl Place {
    pub fn parse(raw: &str) -> Place {
        let parts = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Place {
            raw: raw.trim().to_string(),
            parts,
        }
    }

    /// Smallest jurisdiction (town or city), when more than a country is given.
    pub fn locality(&self) -> Option<&str> {
        if self.parts.len() >= 2 {
            self.parts.first().map(String::as_str)
        } else {
            None
        }
    }

    /// County or district, only present in four-part places.
    pub fn county(&self) -> Option<&str> {
        if self.parts.len() >= 4 {
            self.parts.get(1).map(String::as_str)
        } else {
            None
        }
    }

    /// State, province or region: the part just above the country.
    pub fn region(&self) -> Option<&str> {
        if self.parts.len() >= 3 {
            self.parts.get(self.parts.len() - 2).map(String::as_str)
        } else {
            None
        }
    }

    /// Largest jurisdiction. A single-part place is taken to be a country.
    pub fn country(&self) -> Option<&str> {
        self.parts.last().map(String::as_str)
    }

    /// Normalized country key used for comparisons between places.
    pub fn country_key(&self) -> Option<String> {
        self.country().map(normalize_country)
    }

    /// Narrative-friendly name: "City, State", "City, Country", or the raw text.
    pub fn display_name(&self) -> String {
        match (self.locality(), self.region(), self.country()) {
            (Some(city), Some(region), _) => format!("{}, {}", city, region),
            (Some(city), None, Some(country)) => format!("{}, {}", city, country),
            _ => self.raw.clone(),
        }
    }
}

/// Lowercase, strip punctuation, and fold common aliases so that
/// "USA" and "United States of America" compare equal.
pub fn normalize_country(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '.' | '\''))
        .collect::<String>()
        .to_lowercase();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    match cleaned.as_str() {
        "usa" | "us" | "america" | "united states" | "united states of america" => {
            "united states".to_string()
        }
        "uk" | "gb" | "great britain" | "britain" | "united kingdom" => {
            "united kingdom".to_string()
        }
        _ => cleaned,
    }
}
