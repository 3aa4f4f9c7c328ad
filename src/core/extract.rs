/// Genealogical fact extraction: record trees into a typed family graph.

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::core::gedcom::{self, ExtractError, Node};
use crate::schema::date::{CalendarPoint, DateQualifier, GedDate};
use crate::schema::event::{Event, EventId, EventKind, EventOwner};
use crate::schema::family::{Family, FamilyId};
use crate::schema::graph::{FamilyGraph, Header, SubjectId};
use crate::schema::individual::{Individual, IndividualId, Occupation, PersonName, Sex};
use crate::schema::opaque::OpaqueFact;
use crate::schema::place::Place;
use crate::schema::warning::{ChronologyIssue, LinkRole, Warning};

/// A successfully extracted document: the graph plus anything that was
/// wrong with it but did not stop extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub graph: FamilyGraph,
    pub warnings: Vec<Warning>,
}

/// Reads GEDCOM documents into [`FamilyGraph`]s.
#[derive(Debug, Clone, Copy)]
pub struct GedcomReader {
    /// Upper bound for plausible birth and death years.
    reference_year: i32,
}

impl GedcomReader {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Decode, parse, and extract a whole document. Either the full graph
    /// is returned or a fatal error; a partial graph is never observable.
    pub fn read(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        let text = gedcom::decode(bytes)?;
        let records = gedcom::parse_records(&text)?;

        let header = records
            .first()
            .map(read_header)
            .unwrap_or_default();
        gedcom::check_declared_charset(header.charset.as_deref(), &text)?;

        let mut builder = GraphBuilder::default();
        builder.header = header;
        for record in records.iter().skip(1) {
            builder.add_record(record)?;
        }

        let extraction = builder.finish(self.reference_year);
        debug!(
            individuals = extraction.graph.individuals().len(),
            families = extraction.graph.families().len(),
            events = extraction.graph.events().len(),
            warnings = extraction.warnings.len(),
            "document extracted"
        );
        Ok(extraction)
    }
}

fn read_header(head: &Node) -> Header {
    Header {
        source: head.child_value("SOUR").map(str::to_string),
        gedcom_version: head
            .child("GEDC")
            .and_then(|g| g.child_value("VERS"))
            .map(str::to_string),
        charset: head.child_value("CHAR").map(str::to_string),
        language: head.child_value("LANG").map(str::to_string),
    }
}

#[derive(Default)]
struct GraphBuilder {
    header: Header,
    individuals: Vec<Individual>,
    families: Vec<Family>,
    events: Vec<Event>,
    other_records: Vec<OpaqueFact>,
    seen_xrefs: FxHashSet<String>,
}

impl GraphBuilder {
    fn add_record(&mut self, record: &Node) -> Result<(), ExtractError> {
        if let Some(xref) = &record.xref {
            if !self.seen_xrefs.insert(xref.clone()) {
                return Err(ExtractError::DuplicateIdentifier(xref.clone()));
            }
        }

        match (record.tag.as_str(), &record.xref) {
            ("INDI", Some(xref)) => {
                let individual = self.read_individual(IndividualId(xref.clone()), record);
                self.individuals.push(individual);
            }
            ("FAM", Some(xref)) => {
                let family = self.read_family(FamilyId(xref.clone()), record);
                self.families.push(family);
            }
            ("INDI", None) | ("FAM", None) => {
                return Err(ExtractError::MalformedDocument {
                    line: record.line,
                    reason: format!("{} record without a cross-reference", record.tag),
                });
            }
            ("TRLR", _) => {}
            _ => self.other_records.push(record.to_opaque()),
        }
        Ok(())
    }

    fn read_individual(&mut self, id: IndividualId, record: &Node) -> Individual {
        let mut individual = Individual::new(id.clone());

        for node in &record.children {
            if let Some(kind) = EventKind::from_tag(&node.tag) {
                let event_id = self.push_event(kind, EventOwner::Individual(id.clone()), node);
                individual.events.push(event_id);
                self.attach_individual_event(&mut individual, event_id);
                continue;
            }

            match node.tag.as_str() {
                "NAME" if individual.name.is_none() => {
                    individual.name = Some(read_name(node));
                }
                "SEX" => {
                    individual.sex = node.value.as_deref().map(Sex::from_code).unwrap_or_default();
                }
                "FAMC" | "FAMS" => match node.pointer() {
                    Some(fam) if node.tag == "FAMC" => {
                        individual.child_of.push(FamilyId(fam.to_string()))
                    }
                    Some(fam) => individual.spouse_of.push(FamilyId(fam.to_string())),
                    None => individual.extra.push(node.to_opaque()),
                },
                "NOTE" => {
                    if let Some(text) = &node.value {
                        individual.notes.push(text.clone());
                    }
                }
                _ => individual.extra.push(node.to_opaque()),
            }
        }

        individual
    }

    fn attach_individual_event(&self, individual: &mut Individual, event_id: EventId) {
        let event = &self.events[event_id.0 as usize];
        match event.kind {
            EventKind::Birth if individual.birth.is_none() => individual.birth = Some(event_id),
            EventKind::Death if individual.death.is_none() => individual.death = Some(event_id),
            EventKind::Occupation => {
                let title = event
                    .value
                    .clone()
                    .or_else(|| event.event_type.clone())
                    .unwrap_or_else(|| "unknown occupation".to_string());
                let (start, end) = occupation_span(event.date.as_ref());
                individual.occupations.push(Occupation {
                    title,
                    start,
                    end,
                    event: event_id,
                });
            }
            _ => {}
        }
    }

    fn read_family(&mut self, id: FamilyId, record: &Node) -> Family {
        let mut family = Family::new(id.clone());

        for node in &record.children {
            if let Some(kind) = EventKind::from_tag(&node.tag) {
                let event_id = self.push_event(kind.clone(), EventOwner::Family(id.clone()), node);
                family.events.push(event_id);
                match kind {
                    EventKind::Marriage if family.marriage.is_none() => {
                        family.marriage = Some(event_id)
                    }
                    EventKind::Divorce if family.divorce.is_none() => {
                        family.divorce = Some(event_id)
                    }
                    _ => {}
                }
                continue;
            }

            let pointer = node.pointer().map(|p| IndividualId(p.to_string()));
            match (node.tag.as_str(), pointer) {
                ("HUSB", Some(p)) if family.husband.is_none() => family.husband = Some(p),
                ("WIFE", Some(p)) if family.wife.is_none() => family.wife = Some(p),
                ("CHIL", Some(p)) => family.children.push(p),
                ("NOTE", _) => {
                    if let Some(text) = &node.value {
                        family.notes.push(text.clone());
                    }
                }
                _ => family.extra.push(node.to_opaque()),
            }
        }

        family
    }

    fn push_event(&mut self, kind: EventKind, owner: EventOwner, node: &Node) -> EventId {
        let id = EventId(self.events.len() as u32);
        let mut event = Event::new(id, kind, owner);
        event.value = node.value.clone().filter(|v| v.trim() != "Y");

        for child in &node.children {
            match child.tag.as_str() {
                "DATE" => event.date = child.value.as_deref().map(GedDate::parse),
                "PLAC" => event.place = child.value.as_deref().map(Place::parse),
                "TYPE" => event.event_type = child.value.clone(),
                "NOTE" => {
                    if let Some(text) = &child.value {
                        event.notes.push(text.clone());
                    }
                }
                _ => event.extra.push(child.to_opaque()),
            }
        }

        if let EventKind::Custom(label) = &mut event.kind {
            if let Some(t) = &event.event_type {
                *label = t.clone();
            }
        }

        self.events.push(event);
        id
    }

    fn finish(self, reference_year: i32) -> Extraction {
        let mut warnings = Vec::new();
        let GraphBuilder {
            header,
            mut individuals,
            mut families,
            events,
            other_records,
            ..
        } = self;

        let known_individuals: FxHashSet<IndividualId> =
            individuals.iter().map(|i| i.id.clone()).collect();
        let known_families: FxHashSet<FamilyId> = families.iter().map(|f| f.id.clone()).collect();

        for family in &mut families {
            let holder = SubjectId::Family(family.id.clone());
            for (role, slot) in [
                (LinkRole::Husband, &mut family.husband),
                (LinkRole::Wife, &mut family.wife),
            ] {
                let missing = slot
                    .as_ref()
                    .filter(|p| !known_individuals.contains(*p))
                    .cloned();
                if let Some(partner) = missing {
                    warnings.push(dangling(&holder, role, &partner.0));
                    *slot = None;
                }
            }
            family.children.retain(|child| {
                let known = known_individuals.contains(child);
                if !known {
                    warnings.push(dangling(&holder, LinkRole::Child, &child.0));
                }
                known
            });
        }

        for individual in &mut individuals {
            let holder = SubjectId::Individual(individual.id.clone());
            for (role, links) in [
                (LinkRole::ChildOf, &mut individual.child_of),
                (LinkRole::SpouseOf, &mut individual.spouse_of),
            ] {
                links.retain(|fam| {
                    let known = known_families.contains(fam);
                    if !known {
                        warnings.push(dangling(&holder, role, &fam.0));
                    }
                    known
                });
            }
        }

        for individual in &individuals {
            let birth = individual.birth.and_then(|id| dated(&events, id));
            let death = individual.death.and_then(|id| dated(&events, id));
            warnings.extend(
                check_chronology(birth, death, reference_year)
                    .into_iter()
                    .map(|issue| Warning::Chronology {
                        individual: individual.id.clone(),
                        issue,
                    }),
            );
        }

        for w in &warnings {
            warn!(warning = %w, "data quality");
        }

        Extraction {
            graph: FamilyGraph::from_parts(header, individuals, families, events, other_records),
            warnings,
        }
    }
}

fn read_name(node: &Node) -> PersonName {
    let mut name = node
        .value
        .as_deref()
        .map(PersonName::parse)
        .unwrap_or_default();
    if let Some(given) = node.child_value("GIVN") {
        name.given = Some(given.trim().to_string());
    }
    if let Some(surname) = node.child_value("SURN") {
        name.surname = Some(surname.trim().to_string());
    }
    name
}

fn occupation_span(date: Option<&GedDate>) -> (Option<CalendarPoint>, Option<CalendarPoint>) {
    match date {
        Some(d) if matches!(d.qualifier, DateQualifier::Period | DateQualifier::Between) => {
            (d.start, d.end)
        }
        Some(d) => (d.point(), None),
        None => (None, None),
    }
}

fn dangling(holder: &SubjectId, role: LinkRole, missing: &str) -> Warning {
    Warning::ReferentialIntegrity {
        holder: holder.clone(),
        role,
        missing: missing.to_string(),
    }
}

fn dated(events: &[Event], id: EventId) -> Option<&GedDate> {
    events
        .get(id.0 as usize)
        .and_then(|e| e.date.as_ref())
        .filter(|d| d.point().is_some())
}

/// Flag, never correct, violations of birth ≤ death ≤ reference year.
/// Only precision both dates share is compared.
pub fn check_chronology(
    birth: Option<&GedDate>,
    death: Option<&GedDate>,
    reference_year: i32,
) -> Vec<ChronologyIssue> {
    let mut issues = Vec::new();
    let birth_point = birth.and_then(GedDate::point);
    let death_point = death.and_then(GedDate::point);

    if let (Some(b), Some(d), Some(bd), Some(dd)) = (birth_point, death_point, birth, death) {
        if d.compare_known(&b) == Some(std::cmp::Ordering::Less) {
            issues.push(ChronologyIssue::DeathBeforeBirth {
                birth: bd.raw.clone(),
                death: dd.raw.clone(),
            });
        }
    }
    if let (Some(b), Some(bd)) = (birth_point, birth) {
        if b.year > reference_year {
            issues.push(ChronologyIssue::BirthAfterReference {
                birth: bd.raw.clone(),
                reference_year,
            });
        }
    }
    if let (Some(d), Some(dd)) = (death_point, death) {
        if d.year > reference_year {
            issues.push(ChronologyIssue::DeathAfterReference {
                death: dd.raw.clone(),
                reference_year,
            });
        }
    }
    issues
}
