use serde::{Deserialize, Serialize};
use std::fmt;

use super::date::GedDate;
use super::family::FamilyId;
use super::individual::IndividualId;
use super::opaque::OpaqueFact;
use super::place::Place;

/// Index of an event in the graph's event arena. Assigned in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// The kind of life event a record describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Birth,
    Christening,
    Baptism,
    Death,
    Burial,
    Cremation,
    Marriage,
    Engagement,
    Divorce,
    Annulment,
    Immigration,
    Emigration,
    Naturalization,
    Census,
    Residence,
    Occupation,
    Education,
    Graduation,
    Retirement,
    Military,
    /// Confirmation, first communion, bar/bat mitzvah, ordination and the like.
    /// Holds the source tag.
    Religious(String),
    /// `EVEN` records, keyed by their `TYPE` when given.
    Custom(String),
}

impl EventKind {
    /// Map a GEDCOM tag to an event kind. Returns `None` for tags that are
    /// not events.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "BIRT" => Self::Birth,
            "CHR" => Self::Christening,
            "BAPM" => Self::Baptism,
            "DEAT" => Self::Death,
            "BURI" => Self::Burial,
            "CREM" => Self::Cremation,
            "MARR" => Self::Marriage,
            "ENGA" => Self::Engagement,
            "DIV" => Self::Divorce,
            "ANUL" => Self::Annulment,
            "IMMI" => Self::Immigration,
            "EMIG" => Self::Emigration,
            "NATU" => Self::Naturalization,
            "CENS" => Self::Census,
            "RESI" => Self::Residence,
            "OCCU" => Self::Occupation,
            "EDUC" => Self::Education,
            "GRAD" => Self::Graduation,
            "RETI" => Self::Retirement,
            "MILI" | "_MILI" | "_MILT" => Self::Military,
            "CONF" | "FCOM" | "BARM" | "BASM" | "BLES" | "ORDN" | "CHRA" => {
                Self::Religious(tag.to_string())
            }
            "EVEN" => Self::Custom(String::new()),
            _ => return None,
        };
        Some(kind)
    }

    /// Human-readable label used in timelines.
    pub fn label(&self) -> &str {
        match self {
            Self::Birth => "birth",
            Self::Christening => "christening",
            Self::Baptism => "baptism",
            Self::Death => "death",
            Self::Burial => "burial",
            Self::Cremation => "cremation",
            Self::Marriage => "marriage",
            Self::Engagement => "engagement",
            Self::Divorce => "divorce",
            Self::Annulment => "annulment",
            Self::Immigration => "immigration",
            Self::Emigration => "emigration",
            Self::Naturalization => "naturalization",
            Self::Census => "census",
            Self::Residence => "residence",
            Self::Occupation => "occupation",
            Self::Education => "education",
            Self::Graduation => "graduation",
            Self::Retirement => "retirement",
            Self::Military => "military service",
            Self::Religious(_) => "religious ceremony",
            Self::Custom(t) if t.is_empty() => "event",
            Self::Custom(t) => t,
        }
    }

    pub fn is_migration(&self) -> bool {
        matches!(self, Self::Immigration | Self::Emigration | Self::Naturalization)
    }
}

/// Back-reference from an event to the record it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOwner {
    Individual(IndividualId),
    Family(FamilyId),
}

/// A dated, placed life event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    pub owner: EventOwner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<GedDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
    /// Value on the event line itself, e.g. the title of an `OCCU`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `TYPE` sub-record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<OpaqueFact>,
}

impl Event {
    pub fn new(id: EventId, kind: EventKind, owner: EventOwner) -> Self {
        Self {
            id,
            kind,
            owner,
            date: None,
            place: None,
            value: None,
            event_type: None,
            notes: Vec::new(),
            extra: Vec::new(),
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.date.as_ref().and_then(GedDate::year)
    }

    /// Narrative date phrase, "on an unknown date" when undated.
    pub fn narrative_date(&self) -> String {
        match &self.date {
            Some(date) => date.narrative_phrase(),
            None => "on an unknown date".to_string(),
        }
    }
}
