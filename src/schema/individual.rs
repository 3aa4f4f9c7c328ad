use serde::{Deserialize, Serialize};
use std::fmt;

use super::date::CalendarPoint;
use super::event::EventId;
use super::family::FamilyId;
use super::opaque::OpaqueFact;

/// GEDCOM cross-reference of an `INDI` record, without the surrounding `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndividualId(pub String);

impl fmt::Display for IndividualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sex marker from the `SEX` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    /// `X` in GEDCOM 7.
    Other,
    Unknown,
}

impl Default for Sex {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Sex {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "M" => Self::Male,
            "F" => Self::Female,
            "X" => Self::Other,
            _ => Self::Unknown,
        }
    }
}

/// A personal name split into given names and surname.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

impl PersonName {
    /// Parse the GEDCOM form `Given Names /Surname/ Suffix`. Names without
    /// slashes take the last word as the surname.
    pub fn parse(value: &str) -> PersonName {
        let value = value.trim();
        if let Some(open) = value.find('/') {
            let given = value[..open].trim();
            let rest = &value[open + 1..];
            let surname = match rest.find('/') {
                Some(close) => rest[..close].trim(),
                None => rest.trim(),
            };
            return PersonName {
                given: non_empty(given),
                surname: non_empty(surname),
            };
        }

        let words: Vec<&str> = value.split_whitespace().collect();
        match words.len() {
            0 => PersonName::default(),
            1 => PersonName {
                given: Some(words[0].to_string()),
                surname: None,
            },
            n => PersonName {
                given: Some(words[..n - 1].join(" ")),
                surname: Some(words[n - 1].to_string()),
            },
        }
    }

    pub fn full_name(&self) -> String {
        match (&self.given, &self.surname) {
            (Some(g), Some(s)) => format!("{} {}", g, s),
            (Some(g), None) => g.clone(),
            (None, Some(s)) => s.clone(),
            (None, None) => "Unknown".to_string(),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// One entry of an occupation history, taken from an `OCCU` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupation {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<CalendarPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<CalendarPoint>,
    pub event: EventId,
}

/// A person in the family graph. Events are owned by the graph's event
/// arena; the individual holds their ids in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub id: IndividualId,
    pub name: Option<PersonName>,
    pub sex: Sex,
    pub birth: Option<EventId>,
    pub death: Option<EventId>,
    pub occupations: Vec<Occupation>,
    pub events: Vec<EventId>,
    /// `FAMC` links, as written in the record.
    pub child_of: Vec<FamilyId>,
    /// `FAMS` links, as written in the record.
    pub spouse_of: Vec<FamilyId>,
    pub notes: Vec<String>,
    pub extra: Vec<OpaqueFact>,
}

impl Individual {
    pub fn new(id: IndividualId) -> Self {
        Self {
            id,
            name: None,
            sex: Sex::Unknown,
            birth: None,
            death: None,
            occupations: Vec::new(),
            events: Vec::new(),
            child_of: Vec::new(),
            spouse_of: Vec::new(),
            notes: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Display label: the full name, or the identifier when unnamed.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) if name.given.is_some() || name.surname.is_some() => name.full_name(),
            _ => self.id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_slashed_name() {
        let n = PersonName::parse("Patrick Joseph /O'Brien/");
        assert_eq!(n.given.as_deref(), Some("Patrick Joseph"));
        assert_eq!(n.surname.as_deref(), Some("O'Brien"));
        assert_eq!(n.full_name(), "Patrick Joseph O'Brien");
    }

    #[test]
    fn parse_surname_only() {
        let n = PersonName::parse("/Murphy/");
        assert_eq!(n.given, None);
        assert_eq!(n.full_name(), "Murphy");
    }

    #[test]
    fn parse_unslashed_name() {
        let n = PersonName::parse("Mary Ann Walsh");
        assert_eq!(n.given.as_deref(), Some("Mary Ann"));
        assert_eq!(n.surname.as_deref(), Some("Walsh"));
    }

    #[test]
    fn label_falls_back_to_id() {
        let ind = Individual::new(IndividualId("I7".to_string()));
        assert_eq!(ind.label(), "I7");
    }

    #[test]
    fn sex_codes() {
        assert_eq!(Sex::from_code("m"), Sex::Male);
        assert_eq!(Sex::from_code("F"), Sex::Female);
        assert_eq!(Sex::from_code("X"), Sex::Other);
        assert_eq!(Sex::from_code("?"), Sex::Unknown);
    }
}
