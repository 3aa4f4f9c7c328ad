use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::{Event, EventId};
use super::family::{Family, FamilyId};
use super::individual::{Individual, IndividualId};
use super::opaque::OpaqueFact;

/// Which kind of record a subject is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubjectKind {
    Individual,
    Family,
}

/// A subject of the outline: one individual or one family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectId {
    Individual(IndividualId),
    Family(FamilyId),
}

impl SubjectId {
    pub fn kind(&self) -> SubjectKind {
        match self {
            Self::Individual(_) => SubjectKind::Individual,
            Self::Family(_) => SubjectKind::Family,
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Individual(id) => write!(f, "{}", id),
            Self::Family(id) => write!(f, "{}", id),
        }
    }
}

/// Position of each subject in an ordered subject list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectIndex(FxHashMap<SubjectId, usize>);

impl SubjectIndex {
    pub fn build<'a>(subjects: impl IntoIterator<Item = &'a SubjectId>) -> Self {
        let mut index = FxHashMap::default();
        for (position, subject) in subjects.into_iter().enumerate() {
            index.entry(subject.clone()).or_insert(position);
        }
        Self(index)
    }

    /// Record `subject` at `position` unless it is already present.
    pub fn insert(&mut self, subject: &SubjectId, position: usize) {
        self.0.entry(subject.clone()).or_insert(position);
    }

    pub fn get(&self, subject: &SubjectId) -> Option<usize> {
        self.0.get(subject).copied()
    }
}

/// Contents of the `HEAD` record that matter downstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    pub source: Option<String>,
    pub gedcom_version: Option<String>,
    pub charset: Option<String>,
    pub language: Option<String>,
}

/// The typed family graph produced by extraction.
///
/// Individuals, families and events are stored in document order. Lookup
/// by id goes through hash indexes; iteration always follows the vectors,
/// so anything derived from the graph is reproducible.
#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    pub header: Header,
    individuals: Vec<Individual>,
    families: Vec<Family>,
    events: Vec<Event>,
    /// Records the extractor does not model (SOUR, REPO, OBJE, ...).
    pub other_records: Vec<OpaqueFact>,
    individual_index: FxHashMap<IndividualId, usize>,
    family_index: FxHashMap<FamilyId, usize>,
    /// Individual → indexes of families listing them as a child.
    parent_families: FxHashMap<IndividualId, Vec<usize>>,
    /// Individual → indexes of families listing them as a partner.
    spouse_families: FxHashMap<IndividualId, Vec<usize>>,
}

impl FamilyGraph {
    /// Assemble a graph from already validated parts and build its indexes.
    /// Identifier uniqueness is the caller's responsibility.
    pub fn from_parts(
        header: Header,
        individuals: Vec<Individual>,
        families: Vec<Family>,
        events: Vec<Event>,
        other_records: Vec<OpaqueFact>,
    ) -> Self {
        let individual_index = individuals
            .iter()
            .enumerate()
            .map(|(i, ind)| (ind.id.clone(), i))
            .collect();
        let family_index = families
            .iter()
            .enumerate()
            .map(|(i, fam)| (fam.id.clone(), i))
            .collect();

        let mut parent_families: FxHashMap<IndividualId, Vec<usize>> = FxHashMap::default();
        let mut spouse_families: FxHashMap<IndividualId, Vec<usize>> = FxHashMap::default();
        for (i, fam) in families.iter().enumerate() {
            for child in &fam.children {
                let entry = parent_families.entry(child.clone()).or_default();
                if !entry.contains(&i) {
                    entry.push(i);
                }
            }
            for partner in fam.partners() {
                let entry = spouse_families.entry(partner.clone()).or_default();
                if !entry.contains(&i) {
                    entry.push(i);
                }
            }
        }

        Self {
            header,
            individuals,
            families,
            events,
            other_records,
            individual_index,
            family_index,
            parent_families,
            spouse_families,
        }
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn individual(&self, id: &IndividualId) -> Option<&Individual> {
        self.individual_index.get(id).map(|&i| &self.individuals[i])
    }

    pub fn family(&self, id: &FamilyId) -> Option<&Family> {
        self.family_index.get(id).map(|&i| &self.families[i])
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(id.0 as usize)
    }

    pub fn birth_of(&self, individual: &Individual) -> Option<&Event> {
        individual.birth.and_then(|id| self.event(id))
    }

    pub fn death_of(&self, individual: &Individual) -> Option<&Event> {
        individual.death.and_then(|id| self.event(id))
    }

    /// Families in which the individual is a child, in document order.
    pub fn parent_families_of(&self, id: &IndividualId) -> impl Iterator<Item = &Family> {
        self.parent_families
            .get(id)
            .into_iter()
            .flatten()
            .map(|&i| &self.families[i])
    }

    /// Families in which the individual is a partner, in document order.
    pub fn spouse_families_of(&self, id: &IndividualId) -> impl Iterator<Item = &Family> {
        self.spouse_families
            .get(id)
            .into_iter()
            .flatten()
            .map(|&i| &self.families[i])
    }

    /// Distinct siblings (including half-siblings) in order of first appearance.
    pub fn siblings_of(&self, id: &IndividualId) -> Vec<&IndividualId> {
        let mut siblings: Vec<&IndividualId> = Vec::new();
        let mut seen: FxHashSet<&IndividualId> = FxHashSet::default();
        for fam in self.parent_families_of(id) {
            for child in &fam.children {
                if child != id && seen.insert(child) {
                    siblings.push(child);
                }
            }
        }
        siblings
    }

    /// Distinct children across all of the individual's unions, in order.
    pub fn children_of(&self, id: &IndividualId) -> Vec<&IndividualId> {
        let mut children: Vec<&IndividualId> = Vec::new();
        let mut seen: FxHashSet<&IndividualId> = FxHashSet::default();
        for fam in self.spouse_families_of(id) {
            for child in &fam.children {
                if seen.insert(child) {
                    children.push(child);
                }
            }
        }
        children
    }

    /// Every subject in outline order: individuals, then families.
    pub fn subjects(&self) -> impl Iterator<Item = SubjectId> + '_ {
        self.individuals
            .iter()
            .map(|ind| SubjectId::Individual(ind.id.clone()))
            .chain(
                self.families
                    .iter()
                    .map(|fam| SubjectId::Family(fam.id.clone())),
            )
    }

    /// Display label for a subject: a person's name, or "A & B" for a family.
    pub fn subject_label(&self, subject: &SubjectId) -> String {
        match subject {
            SubjectId::Individual(id) => self
                .individual(id)
                .map(Individual::label)
                .unwrap_or_else(|| id.to_string()),
            SubjectId::Family(id) => {
                let Some(fam) = self.family(id) else {
                    return id.to_string();
                };
                let names: Vec<String> = fam
                    .partners()
                    .filter_map(|p| self.individual(p))
                    .map(Individual::label)
                    .collect();
                if names.is_empty() {
                    format!("Family {}", id)
                } else {
                    names.join(" & ")
                }
            }
        }
    }
}
