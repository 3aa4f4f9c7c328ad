/// Document-wide story summary: statistics, timeline, geographic journey,
/// historical backdrop, and insights derived from them.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::core::facts::DerivedFacts;
use crate::schema::event::{Event, EventKind, EventOwner};
use crate::schema::fact::{FactName, Value};
use crate::schema::graph::{FamilyGraph, SubjectId};

const YEARS_PER_GENERATION: i32 = 25;
const TOP_PLACES: usize = 5;

/// Historical periods offered as backdrop: (start, end, name).
const HISTORICAL_PERIODS: [(i32, i32, &str); 8] = [
    (1776, 1783, "American Revolution"),
    (1861, 1865, "American Civil War"),
    (1914, 1918, "World War I"),
    (1929, 1939, "Great Depression"),
    (1939, 1945, "World War II"),
    (1845, 1852, "Irish Potato Famine"),
    (1849, 1855, "California Gold Rush"),
    (1892, 1954, "Ellis Island Immigration"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub earliest: i32,
    pub latest: i32,
}

impl YearRange {
    pub fn span(&self) -> i32 {
        self.latest.saturating_sub(self.earliest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceCount {
    pub place: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub individuals: usize,
    pub families: usize,
    pub events: usize,
    /// Rough generation count: the dated span over 25 years, at least one.
    pub generations: u32,
    /// Mean age at death over individuals with a positive one.
    pub average_lifespan: Option<f64>,
    pub average_children_per_family: f64,
    pub top_places: Vec<PlaceCount>,
    pub date_range: Option<YearRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub year: i32,
    pub subject: SubjectId,
    pub event: String,
    pub description: String,
}

/// Why a place appears in the family's journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Birthplace,
    FinalRestingPlace,
    MarriageLocation,
    ImmigrationDestination,
    EmigrationOrigin,
    Residence,
    SignificantLocation,
}

impl Significance {
    fn of(kind: &EventKind) -> Self {
        match kind {
            EventKind::Birth => Self::Birthplace,
            EventKind::Death => Self::FinalRestingPlace,
            EventKind::Marriage => Self::MarriageLocation,
            EventKind::Immigration => Self::ImmigrationDestination,
            EventKind::Emigration => Self::EmigrationOrigin,
            EventKind::Residence => Self::Residence,
            _ => Self::SignificantLocation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyStop {
    pub place: String,
    pub year: i32,
    pub significance: Significance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalPeriod {
    pub name: String,
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationSpan {
    Extensive,
    Moderate,
    Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPattern {
    Gradual,
    Steady,
    Rapid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tendency {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Insight {
    MigrationSpan { span: MigrationSpan },
    SettlementPattern { pattern: SettlementPattern },
    FamilySize { tendency: Tendency },
    Longevity { tendency: Tendency },
    TimeSpan { years: i32 },
}

impl Insight {
    /// One-line narrator-facing phrasing.
    pub fn describe(&self) -> String {
        match self {
            Self::MigrationSpan { span } => match span {
                MigrationSpan::Extensive => "extensive - across multiple regions",
                MigrationSpan::Moderate => "moderate - within a general region",
                MigrationSpan::Minimal => "minimal - largely settled in one area",
            }
            .to_string(),
            Self::SettlementPattern { pattern } => match pattern {
                SettlementPattern::Gradual => "gradual migration over generations",
                SettlementPattern::Steady => "steady movement over decades",
                SettlementPattern::Rapid => "rapid relocation",
            }
            .to_string(),
            Self::FamilySize { tendency } => match tendency {
                Tendency::High => "Large families were common in your ancestry",
                Tendency::Low => "Your ancestors tended to have smaller families",
            }
            .to_string(),
            Self::Longevity { tendency } => match tendency {
                Tendency::High => "Your family has a history of longevity",
                Tendency::Low => "Life was harder for earlier generations",
            }
            .to_string(),
            Self::TimeSpan { years } => format!("Your family history spans {} years", years),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySummary {
    pub statistics: Statistics,
    pub timeline: Vec<TimelineEntry>,
    pub journey: Vec<JourneyStop>,
    pub historical_context: Vec<HistoricalPeriod>,
    pub insights: Vec<Insight>,
}

impl StorySummary {
    pub fn build(graph: &FamilyGraph, facts: &DerivedFacts) -> StorySummary {
        let statistics = statistics(graph, facts);
        let journey = journey(graph);
        let historical_context = statistics
            .date_range
            .map(historical_context)
            .unwrap_or_default();
        let insights = insights(&statistics, &journey);
        StorySummary {
            timeline: timeline(graph),
            statistics,
            journey,
            historical_context,
            insights,
        }
    }
}

fn owner_subject(event: &Event) -> SubjectId {
    match &event.owner {
        EventOwner::Individual(id) => SubjectId::Individual(id.clone()),
        EventOwner::Family(id) => SubjectId::Family(id.clone()),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn statistics(graph: &FamilyGraph, facts: &DerivedFacts) -> Statistics {
    let years: Vec<i32> = graph.events().iter().filter_map(Event::year).collect();
    let date_range = match (years.iter().min(), years.iter().max()) {
        (Some(&earliest), Some(&latest)) => Some(YearRange { earliest, latest }),
        _ => None,
    };
    let generations = date_range
        .map(|r| (r.span() / YEARS_PER_GENERATION).max(1))
        .unwrap_or(1) as u32;

    let lifespans: Vec<i64> = facts
        .subjects()
        .iter()
        .filter_map(|s| s.get(FactName::AgeAtDeath))
        .filter_map(|id| match facts.fact(id).map(|f| &f.value) {
            Some(Value::Int(age)) if *age > 0 => Some(*age),
            _ => None,
        })
        .collect();
    let average_lifespan = if lifespans.is_empty() {
        None
    } else {
        Some(round1(
            lifespans.iter().sum::<i64>() as f64 / lifespans.len() as f64,
        ))
    };

    let families = graph.families();
    let average_children_per_family = if families.is_empty() {
        0.0
    } else {
        let children: usize = families.iter().map(|f| f.children.len()).sum();
        round1(children as f64 / families.len() as f64)
    };

    // Counted in first-appearance order so equal counts keep document order.
    let mut top_places: Vec<PlaceCount> = Vec::new();
    let mut slots: FxHashMap<String, usize> = FxHashMap::default();
    for place in graph.events().iter().filter_map(|e| e.place.as_ref()) {
        let name = place.display_name();
        match slots.get(&name) {
            Some(&slot) => top_places[slot].count += 1,
            None => {
                slots.insert(name.clone(), top_places.len());
                top_places.push(PlaceCount {
                    place: name,
                    count: 1,
                });
            }
        }
    }
    top_places.sort_by(|a, b| b.count.cmp(&a.count));
    top_places.truncate(TOP_PLACES);

    Statistics {
        individuals: graph.individuals().len(),
        families: families.len(),
        events: graph.events().len(),
        generations,
        average_lifespan,
        average_children_per_family,
        top_places,
        date_range,
    }
}

fn describe_event(name: &str, event: &Event) -> String {
    let date = event.narrative_date();
    let mut text = match &event.kind {
        EventKind::Birth => format!("{} was born {}", name, date),
        EventKind::Death => format!("{} passed away {}", name, date),
        EventKind::Marriage => format!("{} married {}", name, date),
        EventKind::Immigration => format!("{} immigrated {}", name, date),
        EventKind::Emigration => format!("{} emigrated {}", name, date),
        EventKind::Military => format!("{} served in the military", name),
        EventKind::Occupation => format!(
            "{} worked as {}",
            name,
            event.value.as_deref().unwrap_or("unknown")
        ),
        other => format!("{} experienced {}", name, other.label()),
    };
    if let Some(place) = &event.place {
        text.push_str(" in ");
        text.push_str(&place.display_name());
    }
    text
}

/// Dated events across the graph, ordered by year then document order.
fn timeline(graph: &FamilyGraph) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = graph
        .events()
        .iter()
        .filter_map(|event| {
            let year = event.year()?;
            let subject = owner_subject(event);
            let name = graph.subject_label(&subject);
            Some(TimelineEntry {
                year,
                description: describe_event(&name, event),
                event: event.kind.label().to_string(),
                subject,
            })
        })
        .collect();
    entries.sort_by_key(|e| e.year);
    entries
}

/// First dated appearance of each distinct place.
fn journey(graph: &FamilyGraph) -> Vec<JourneyStop> {
    let mut dated: Vec<(i32, &Event)> = graph
        .events()
        .iter()
        .filter(|e| e.place.is_some())
        .filter_map(|e| Some((e.year()?, e)))
        .collect();
    dated.sort_by_key(|(year, _)| *year);

    let mut stops: Vec<JourneyStop> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    for (year, event) in dated {
        let Some(place) = event.place.as_ref().map(|p| p.display_name()) else {
            continue;
        };
        if seen.insert(place.clone()) {
            stops.push(JourneyStop {
                place,
                year,
                significance: Significance::of(&event.kind),
            });
        }
    }
    stops
}

fn historical_context(range: YearRange) -> Vec<HistoricalPeriod> {
    let mut periods: Vec<HistoricalPeriod> = HISTORICAL_PERIODS
        .iter()
        .filter(|(start, end, _)| *start <= range.latest && *end >= range.earliest)
        .map(|&(start, end, name)| HistoricalPeriod {
            name: name.to_string(),
            start,
            end,
        })
        .collect();
    periods.sort_by_key(|p| p.start);
    periods
}

fn insights(stats: &Statistics, journey: &[JourneyStop]) -> Vec<Insight> {
    let mut out = Vec::new();

    if journey.len() > 1 {
        let span = match journey.len() {
            n if n > 3 => MigrationSpan::Extensive,
            _ => MigrationSpan::Moderate,
        };
        out.push(Insight::MigrationSpan { span });

        let first = journey.iter().map(|s| s.year).min().unwrap_or_default();
        let last = journey.iter().map(|s| s.year).max().unwrap_or_default();
        let pattern = match last.saturating_sub(first) {
            y if y > 100 => SettlementPattern::Gradual,
            y if y > 50 => SettlementPattern::Steady,
            _ => SettlementPattern::Rapid,
        };
        out.push(Insight::SettlementPattern { pattern });
    }

    let children = stats.average_children_per_family;
    if children > 6.0 {
        out.push(Insight::FamilySize {
            tendency: Tendency::High,
        });
    } else if stats.families > 0 && children < 2.0 {
        out.push(Insight::FamilySize {
            tendency: Tendency::Low,
        });
    }

    match stats.average_lifespan {
        Some(avg) if avg > 70.0 => out.push(Insight::Longevity {
            tendency: Tendency::High,
        }),
        Some(avg) if avg < 50.0 => out.push(Insight::Longevity {
            tendency: Tendency::Low,
        }),
        _ => {}
    }

    if let Some(range) = stats.date_range {
        out.push(Insight::TimeSpan {
            years: range.span(),
        });
    }
    out
}
