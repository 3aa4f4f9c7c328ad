use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::EventId;
use super::family::FamilyId;
use super::graph::SubjectId;
use super::individual::IndividualId;

/// A typed fact value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Bool(_) => ValueKind::Bool,
            Self::Text(_) => ValueKind::Text,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Bool,
    Text,
}

/// The closed set of derived facts the classifier can reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactName {
    BirthYear,
    DeathYear,
    AgeAtDeath,
    BirthCountry,
    DeathCountry,
    CountryChanged,
    MigrationEventCount,
    SiblingCount,
    ChildCount,
    #[serde(rename = "children_under_18_at_death")]
    ChildrenUnder18AtDeath,
    MarriageCount,
    MilitaryService,
    OccupationCount,
    ParentAgeAtFirstChild,
    ApproximateDates,
    PartnerCount,
    MarriageYear,
    Divorced,
    GenerationGap,
}

impl FactName {
    pub const ALL: [FactName; 19] = [
        Self::BirthYear,
        Self::DeathYear,
        Self::AgeAtDeath,
        Self::BirthCountry,
        Self::DeathCountry,
        Self::CountryChanged,
        Self::MigrationEventCount,
        Self::SiblingCount,
        Self::ChildCount,
        Self::ChildrenUnder18AtDeath,
        Self::MarriageCount,
        Self::MilitaryService,
        Self::OccupationCount,
        Self::ParentAgeAtFirstChild,
        Self::ApproximateDates,
        Self::PartnerCount,
        Self::MarriageYear,
        Self::Divorced,
        Self::GenerationGap,
    ];

    /// Snake-case name as used in theme registries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BirthYear => "birth_year",
            Self::DeathYear => "death_year",
            Self::AgeAtDeath => "age_at_death",
            Self::BirthCountry => "birth_country",
            Self::DeathCountry => "death_country",
            Self::CountryChanged => "country_changed",
            Self::MigrationEventCount => "migration_event_count",
            Self::SiblingCount => "sibling_count",
            Self::ChildCount => "child_count",
            Self::ChildrenUnder18AtDeath => "children_under_18_at_death",
            Self::MarriageCount => "marriage_count",
            Self::MilitaryService => "military_service",
            Self::OccupationCount => "occupation_count",
            Self::ParentAgeAtFirstChild => "parent_age_at_first_child",
            Self::ApproximateDates => "approximate_dates",
            Self::PartnerCount => "partner_count",
            Self::MarriageYear => "marriage_year",
            Self::Divorced => "divorced",
            Self::GenerationGap => "generation_gap",
        }
    }

    pub fn from_name(name: &str) -> Option<FactName> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// The kind of value this fact always carries.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::BirthCountry | Self::DeathCountry => ValueKind::Text,
            Self::CountryChanged
            | Self::MilitaryService
            | Self::ApproximateDates
            | Self::Divorced => ValueKind::Bool,
            _ => ValueKind::Int,
        }
    }
}

impl fmt::Display for FactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index of a fact in a [`FactArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactId(pub u32);

/// The record a fact was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactSource {
    Individual(IndividualId),
    Family(FamilyId),
    Event(EventId),
}

/// One derived fact about one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub subject: SubjectId,
    pub name: FactName,
    pub value: Value,
    pub source: FactSource,
    /// Other facts this one was computed from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub basis: Vec<FactId>,
}

/// Append-only store of facts. Outline blocks refer to facts by id so the
/// same fact is never copied into several blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactArena {
    facts: Vec<Fact>,
}

impl FactArena {
    pub fn new() -> Self {
        Self { facts: Vec::new() }
    }

    pub fn push(&mut self, fact: Fact) -> FactId {
        let id = FactId(self.facts.len() as u32);
        self.facts.push(fact);
        id
    }

    pub fn get(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FactId, &Fact)> {
        self.facts
            .iter()
            .enumerate()
            .map(|(i, f)| (FactId(i as u32), f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for fact in FactName::ALL {
            assert_eq!(FactName::from_name(fact.name()), Some(fact));
        }
        assert_eq!(FactName::from_name("shoe_size"), None);
    }

    #[test]
    fn serde_name_matches_registry_name() {
        let json = serde_json::to_string(&FactName::ChildrenUnder18AtDeath).unwrap();
        assert_eq!(json, "\"children_under_18_at_death\"");
        for fact in FactName::ALL {
            let json = serde_json::to_string(&fact).unwrap();
            assert_eq!(json, format!("\"{}\"", fact.name()));
            assert_eq!(serde_json::from_str::<FactName>(&json).unwrap(), fact);
        }
    }

    #[test]
    fn fact_kinds() {
        assert_eq!(FactName::AgeAtDeath.kind(), ValueKind::Int);
        assert_eq!(FactName::BirthCountry.kind(), ValueKind::Text);
        assert_eq!(FactName::CountryChanged.kind(), ValueKind::Bool);
    }

    #[test]
    fn arena_ids_are_sequential() {
        let mut arena = FactArena::new();
        let subject = SubjectId::Individual(IndividualId("I1".to_string()));
        let a = arena.push(Fact {
            subject: subject.clone(),
            name: FactName::BirthYear,
            value: Value::Int(1850),
            source: FactSource::Event(EventId(0)),
            basis: Vec::new(),
        });
        let b = arena.push(Fact {
            subject,
            name: FactName::DeathYear,
            value: Value::Int(1920),
            source: FactSource::Event(EventId(1)),
            basis: Vec::new(),
        });
        assert_eq!((a, b), (FactId(0), FactId(1)));
        assert_eq!(arena.get(b).map(|f| &f.value), Some(&Value::Int(1920)));
        assert_eq!(arena.len(), 2);
    }
}
