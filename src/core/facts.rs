/// Derived facts: per-subject values computed from the whole family graph.

use std::collections::BTreeMap;

use crate::schema::date::CalendarPoint;
use crate::schema::event::{Event, EventKind};
use crate::schema::fact::{Fact, FactArena, FactId, FactName, FactSource, Value};
use crate::schema::family::Family;
use crate::schema::graph::{FamilyGraph, SubjectId, SubjectIndex, SubjectKind};
use crate::schema::individual::Individual;

/// Age below which a child is counted as dependent at a parent's death.
const DEPENDENT_AGE: i32 = 18;

/// The facts known about one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFacts {
    pub subject: SubjectId,
    pub label: String,
    facts: BTreeMap<FactName, FactId>,
}

impl SubjectFacts {
    pub fn kind(&self) -> SubjectKind {
        self.subject.kind()
    }

    pub fn get(&self, name: FactName) -> Option<FactId> {
        self.facts.get(&name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = FactName> + '_ {
        self.facts.keys().copied()
    }
}

/// All derived facts for a graph: one arena, and per-subject indexes into
/// it in outline order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedFacts {
    pub arena: FactArena,
    subjects: Vec<SubjectFacts>,
    index: SubjectIndex,
}

impl DerivedFacts {
    /// Compute every derived fact for every subject. The graph must be
    /// fully extracted: sibling and child counts depend on the whole graph.
    pub fn derive(graph: &FamilyGraph) -> DerivedFacts {
        let mut derived = DerivedFacts::default();
        for individual in graph.individuals() {
            let mut scope = FactScope::new(
                &mut derived.arena,
                SubjectId::Individual(individual.id.clone()),
            );
            derive_individual(graph, individual, &mut scope);
            let facts = scope.finish();
            derived.push(SubjectFacts {
                subject: SubjectId::Individual(individual.id.clone()),
                label: individual.label(),
                facts,
            });
        }
        for family in graph.families() {
            let subject = SubjectId::Family(family.id.clone());
            let mut scope = FactScope::new(&mut derived.arena, subject.clone());
            derive_family(graph, family, &mut scope);
            let facts = scope.finish();
            derived.push(SubjectFacts {
                label: graph.subject_label(&subject),
                subject,
                facts,
            });
        }
        derived
    }

    fn push(&mut self, subject: SubjectFacts) {
        self.index.insert(&subject.subject, self.subjects.len());
        self.subjects.push(subject);
    }

    /// Subjects in outline order: individuals, then families.
    pub fn subjects(&self) -> &[SubjectFacts] {
        &self.subjects
    }

    pub fn subject(&self, subject: &SubjectId) -> Option<&SubjectFacts> {
        self.index.get(subject).map(|i| &self.subjects[i])
    }

    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.arena.get(id)
    }

    /// Value of a named fact for a subject, if it was derived.
    pub fn value(&self, subject: &SubjectId, name: FactName) -> Option<&Value> {
        let id = self.subject(subject)?.get(name)?;
        self.arena.get(id).map(|f| &f.value)
    }
}

/// Collects facts for one subject while they are pushed into the arena.
struct FactScope<'a> {
    arena: &'a mut FactArena,
    subject: SubjectId,
    facts: BTreeMap<FactName, FactId>,
}

impl<'a> FactScope<'a> {
    fn new(arena: &'a mut FactArena, subject: SubjectId) -> Self {
        Self {
            arena,
            subject,
            facts: BTreeMap::new(),
        }
    }

    fn add(&mut self, name: FactName, value: Value, source: FactSource) -> FactId {
        self.add_derived(name, value, source, Vec::new())
    }

    fn add_derived(
        &mut self,
        name: FactName,
        value: Value,
        source: FactSource,
        basis: Vec<FactId>,
    ) -> FactId {
        debug_assert_eq!(value.kind(), name.kind());
        let id = self.arena.push(Fact {
            subject: self.subject.clone(),
            name,
            value,
            source,
            basis,
        });
        self.facts.insert(name, id);
        id
    }

    fn finish(self) -> BTreeMap<FactName, FactId> {
        self.facts
    }
}

fn point_of(event: Option<&Event>) -> Option<CalendarPoint> {
    event.and_then(|e| e.date.as_ref()).and_then(|d| d.point())
}

fn event_source(event: &Event) -> FactSource {
    FactSource::Event(event.id)
}

/// Country of a place-bearing event, as written.
fn country_of(event: Option<&Event>) -> Option<(&Event, &str)> {
    let event = event?;
    let country = event.place.as_ref()?.country()?;
    Some((event, country))
}

fn derive_individual(graph: &FamilyGraph, individual: &Individual, scope: &mut FactScope<'_>) {
    let self_source = FactSource::Individual(individual.id.clone());
    let birth = graph.birth_of(individual);
    let death = graph.death_of(individual);
    let birth_point = point_of(birth);
    let death_point = point_of(death);

    let birth_year = match (birth, birth_point) {
        (Some(event), Some(point)) => Some(scope.add(
            FactName::BirthYear,
            Value::Int(i64::from(point.year)),
            event_source(event),
        )),
        _ => None,
    };
    let death_year = match (death, death_point) {
        (Some(event), Some(point)) => Some(scope.add(
            FactName::DeathYear,
            Value::Int(i64::from(point.year)),
            event_source(event),
        )),
        _ => None,
    };

    if let (Some(b), Some(d), Some(event)) = (birth_point, death_point, death) {
        let age = b.years_until(&d);
        // Negative ages are a chronology warning, not a fact.
        if age >= 0 {
            scope.add_derived(
                FactName::AgeAtDeath,
                Value::Int(i64::from(age)),
                event_source(event),
                birth_year.into_iter().chain(death_year).collect(),
            );
        }
    }

    let birth_country = country_of(birth).map(|(event, country)| {
        let id = scope.add(
            FactName::BirthCountry,
            Value::Text(country.to_string()),
            event_source(event),
        );
        (id, event, normalize(event))
    });
    // Burial place stands in for an unplaced death.
    let burial = individual
        .events
        .iter()
        .filter_map(|&id| graph.event(id))
        .find(|e| e.kind == EventKind::Burial);
    let death_country = country_of(death)
        .or_else(|| country_of(burial))
        .map(|(event, country)| {
            let id = scope.add(
                FactName::DeathCountry,
                Value::Text(country.to_string()),
                event_source(event),
            );
            (id, event, normalize(event))
        });
    if let (Some((bid, _, bkey)), Some((did, devent, dkey))) = (&birth_country, &death_country) {
        scope.add_derived(
            FactName::CountryChanged,
            Value::Bool(bkey != dkey),
            event_source(devent),
            vec![*bid, *did],
        );
    }

    let events: Vec<&Event> = individual
        .events
        .iter()
        .filter_map(|&id| graph.event(id))
        .collect();

    let migrations = events.iter().filter(|e| e.kind.is_migration()).count();
    scope.add(
        FactName::MigrationEventCount,
        Value::Int(migrations as i64),
        events
            .iter()
            .find(|e| e.kind.is_migration())
            .map(|e| event_source(e))
            .unwrap_or_else(|| self_source.clone()),
    );

    let military = events.iter().find(|e| e.kind == EventKind::Military);
    scope.add(
        FactName::MilitaryService,
        Value::Bool(military.is_some()),
        military
            .map(|e| event_source(e))
            .unwrap_or_else(|| self_source.clone()),
    );

    scope.add(
        FactName::OccupationCount,
        Value::Int(individual.occupations.len() as i64),
        self_source.clone(),
    );

    if birth.is_some() || death.is_some() {
        let approximate = [birth, death]
            .into_iter()
            .flatten()
            .any(|e| e.date.as_ref().map_or(true, |d| d.is_approximate()));
        scope.add(
            FactName::ApproximateDates,
            Value::Bool(approximate),
            self_source.clone(),
        );
    }

    if let Some(first_family) = graph.parent_families_of(&individual.id).next() {
        let siblings = graph.siblings_of(&individual.id);
        scope.add(
            FactName::SiblingCount,
            Value::Int(siblings.len() as i64),
            FactSource::Family(first_family.id.clone()),
        );
    }

    let unions: Vec<&Family> = graph.spouse_families_of(&individual.id).collect();
    if !unions.is_empty() {
        let children: Vec<&Individual> = graph
            .children_of(&individual.id)
            .into_iter()
            .filter_map(|id| graph.individual(id))
            .collect();
        scope.add(
            FactName::ChildCount,
            Value::Int(children.len() as i64),
            self_source.clone(),
        );

        let married: Vec<&Family> = unions
            .iter()
            .copied()
            .filter(|f| f.marriage.is_some())
            .collect();
        let own_marriages = events
            .iter()
            .filter(|e| e.kind == EventKind::Marriage)
            .count();
        scope.add(
            FactName::MarriageCount,
            Value::Int(married.len().max(own_marriages) as i64),
            self_source.clone(),
        );

        if let (Some(d), Some(death_event)) = (death_point, death) {
            let dependents = children
                .iter()
                .filter_map(|child| point_of(graph.birth_of(child)))
                .filter(|cb| {
                    let age = cb.years_until(&d);
                    (0..DEPENDENT_AGE).contains(&age)
                })
                .count();
            scope.add(
                FactName::ChildrenUnder18AtDeath,
                Value::Int(dependents as i64),
                event_source(death_event),
            );
        }

        if let Some(b) = birth_point {
            let first_child = children
                .iter()
                .filter_map(|child| {
                    let event = graph.birth_of(child)?;
                    Some((point_of(Some(event))?, event))
                })
                .min_by_key(|(point, event)| (point.sort_key(), event.id));
            if let Some((point, event)) = first_child {
                scope.add_derived(
                    FactName::ParentAgeAtFirstChild,
                    Value::Int(i64::from(b.years_until(&point))),
                    event_source(event),
                    birth_year.into_iter().collect(),
                );
            }
        }
    }
}

fn normalize(event: &Event) -> String {
    event
        .place
        .as_ref()
        .and_then(|p| p.country_key())
        .unwrap_or_default()
}

fn derive_family(graph: &FamilyGraph, family: &Family, scope: &mut FactScope<'_>) {
    let self_source = FactSource::Family(family.id.clone());

    scope.add(
        FactName::ChildCount,
        Value::Int(family.children.len() as i64),
        self_source.clone(),
    );
    scope.add(
        FactName::PartnerCount,
        Value::Int(family.partners().count() as i64),
        self_source.clone(),
    );

    let marriage = family.marriage.and_then(|id| graph.event(id));
    if let (Some(event), Some(point)) = (marriage, point_of(marriage)) {
        scope.add(
            FactName::MarriageYear,
            Value::Int(i64::from(point.year)),
            event_source(event),
        );
    }

    let divorce = family.divorce.and_then(|id| graph.event(id));
    scope.add(
        FactName::Divorced,
        Value::Bool(divorce.is_some()),
        divorce
            .map(event_source)
            .unwrap_or_else(|| self_source.clone()),
    );

    // Mean years between each partner's birth and each child's birth.
    let parent_years: Vec<i64> = family
        .partners()
        .filter_map(|p| graph.individual(p))
        .filter_map(|p| point_of(graph.birth_of(p)))
        .map(|p| i64::from(p.year))
        .collect();
    let child_years: Vec<i64> = family
        .children
        .iter()
        .filter_map(|c| graph.individual(c))
        .filter_map(|c| point_of(graph.birth_of(c)))
        .map(|p| i64::from(p.year))
        .collect();
    let pairs = (parent_years.len() * child_years.len()) as i64;
    if pairs > 0 {
        let total: i64 = parent_years
            .iter()
            .flat_map(|p| child_years.iter().map(move |c| c - p))
            .sum();
        scope.add(
            FactName::GenerationGap,
            Value::Int(rounded_div(total, pairs)),
            self_source,
        );
    }
}

/// Integer division rounding half away from zero.
fn rounded_div(total: i64, count: i64) -> i64 {
    if total >= 0 {
        (total + count / 2) / count
    } else {
        (total - count / 2) / count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extract::GedcomReader;
    use crate::schema::family::FamilyId;
    use crate::schema::individual::IndividualId;

    fn derive(text: &str) -> DerivedFacts {
        let extraction = GedcomReader::new(2024).read(text.as_bytes()).unwrap();
        DerivedFacts::derive(&extraction.graph)
    }

    fn person(id: &str) -> SubjectId {
        SubjectId::Individual(IndividualId(id.to_string()))
    }

    const EMIGRANT: &str = "\
0 HEAD
0 @I1@ INDI
1 NAME Patrick /Walsh/
1 BIRT
2 DATE 1850
2 PLAC Cork, Ireland
1 DEAT
2 DATE 1920
2 PLAC Boston, Massachusetts, USA
1 FAMC @F1@
0 @I2@ INDI
1 NAME Nora /Walsh/
1 BIRT
2 DATE 1852
1 FAMC @F1@
0 @I3@ INDI
1 NAME Michael /Walsh/
1 BIRT
2 DATE 1822
1 FAMS @F1@
0 @F1@ FAM
1 HUSB @I3@
1 CHIL @I1@
1 CHIL @I2@
0 TRLR
";

    #[test]
    fn subjects_are_indexed_by_id() {
        let facts = derive(EMIGRANT);
        assert_eq!(facts.subjects().len(), 4);
        for subject in facts.subjects() {
            assert_eq!(facts.subject(&subject.subject), Some(subject));
        }
        let family = SubjectId::Family(FamilyId("F1".to_string()));
        assert_eq!(facts.subject(&family).map(|s| s.kind()), Some(SubjectKind::Family));
        assert!(facts.subject(&person("I7")).is_none());
    }

    #[test]
    fn age_and_countries() {
        let facts = derive(EMIGRANT);
        let p = person("I1");
        assert_eq!(facts.value(&p, FactName::AgeAtDeath), Some(&Value::Int(70)));
        assert_eq!(
            facts.value(&p, FactName::BirthCountry),
            Some(&Value::Text("Ireland".to_string()))
        );
        assert_eq!(
            facts.value(&p, FactName::DeathCountry),
            Some(&Value::Text("USA".to_string()))
        );
        assert_eq!(
            facts.value(&p, FactName::CountryChanged),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn country_changed_has_basis() {
        let facts = derive(EMIGRANT);
        let subject = facts.subject(&person("I1")).unwrap();
        let changed = facts
            .fact(subject.get(FactName::CountryChanged).unwrap())
            .unwrap();
        assert_eq!(changed.basis.len(), 2);
        let names: Vec<FactName> = changed
            .basis
            .iter()
            .map(|id| facts.fact(*id).unwrap().name)
            .collect();
        assert_eq!(names, vec![FactName::BirthCountry, FactName::DeathCountry]);
    }

    #[test]
    fn unknown_facts_are_absent() {
        let facts = derive(EMIGRANT);
        let nora = person("I2");
        assert_eq!(facts.value(&nora, FactName::AgeAtDeath), None);
        assert_eq!(facts.value(&nora, FactName::CountryChanged), None);
        assert_eq!(facts.value(&nora, FactName::ChildCount), None);
        assert_eq!(
            facts.value(&nora, FactName::MigrationEventCount),
            Some(&Value::Int(0))
        );
    }

    #[test]
    fn sibling_and_child_counts() {
        let facts = derive(EMIGRANT);
        assert_eq!(
            facts.value(&person("I1"), FactName::SiblingCount),
            Some(&Value::Int(1))
        );
        assert_eq!(
            facts.value(&person("I3"), FactName::ChildCount),
            Some(&Value::Int(2))
        );
        assert_eq!(
            facts.value(&person("I3"), FactName::ParentAgeAtFirstChild),
            Some(&Value::Int(28))
        );
        assert_eq!(facts.value(&person("I3"), FactName::SiblingCount), None);
    }

    #[test]
    fn family_facts() {
        let facts = derive(EMIGRANT);
        let fam = SubjectId::Family(FamilyId("F1".to_string()));
        assert_eq!(facts.value(&fam, FactName::ChildCount), Some(&Value::Int(2)));
        assert_eq!(facts.value(&fam, FactName::PartnerCount), Some(&Value::Int(1)));
        assert_eq!(facts.value(&fam, FactName::Divorced), Some(&Value::Bool(false)));
        // (1850 - 1822 + 1852 - 1822) / 2 = 29
        assert_eq!(facts.value(&fam, FactName::GenerationGap), Some(&Value::Int(29)));
        assert_eq!(facts.value(&fam, FactName::MarriageYear), None);
    }

    #[test]
    fn dependents_at_death() {
        let text = "\
0 HEAD
0 @I1@ INDI
1 NAME Thomas /Byrne/
1 BIRT
2 DATE 12 MAR 1860
1 DEAT
2 DATE 5 JUN 1900
1 FAMS @F1@
0 @I2@ INDI
1 BIRT
2 DATE 1890
1 FAMC @F1@
0 @I3@ INDI
1 BIRT
2 DATE 1895
1 FAMC @F1@
0 @I4@ INDI
1 BIRT
2 DATE 1878
1 FAMC @F1@
0 @F1@ FAM
1 HUSB @I1@
1 CHIL @I4@
1 CHIL @I2@
1 CHIL @I3@
0 TRLR
";
        let facts = derive(text);
        let thomas = person("I1");
        assert_eq!(facts.value(&thomas, FactName::AgeAtDeath), Some(&Value::Int(40)));
        assert_eq!(
            facts.value(&thomas, FactName::ChildrenUnder18AtDeath),
            Some(&Value::Int(2))
        );
        assert_eq!(
            facts.value(&thomas, FactName::ApproximateDates),
            Some(&Value::Bool(false))
        );
    }

    #[test]
    fn military_and_migration_events() {
        let text = "\
0 HEAD
0 @I1@ INDI
1 IMMI
2 DATE 1881
1 _MILT Union Army
2 DATE 1863
0 TRLR
";
        let facts = derive(text);
        let p = person("I1");
        assert_eq!(
            facts.value(&p, FactName::MigrationEventCount),
            Some(&Value::Int(1))
        );
        assert_eq!(
            facts.value(&p, FactName::MilitaryService),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn derivation_is_reproducible() {
        assert_eq!(derive(EMIGRANT), derive(EMIGRANT));
    }

    #[test]
    fn rounding() {
        assert_eq!(rounded_div(57, 2), 29);
        assert_eq!(rounded_div(56, 2), 28);
        assert_eq!(rounded_div(-5, 2), -3);
    }
}
