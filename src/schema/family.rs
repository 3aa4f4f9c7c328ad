use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::EventId;
use super::individual::IndividualId;
use super::opaque::OpaqueFact;

/// GEDCOM cross-reference of a `FAM` record, without the surrounding `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyId(pub String);

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A union of up to two partners and their children.
///
/// Partners and children are referenced by id only; the family does not
/// own the individuals. Children keep the order the document lists them in,
/// which is taken as birth order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub husband: Option<IndividualId>,
    pub wife: Option<IndividualId>,
    pub children: Vec<IndividualId>,
    pub marriage: Option<EventId>,
    pub divorce: Option<EventId>,
    pub events: Vec<EventId>,
    pub notes: Vec<String>,
    pub extra: Vec<OpaqueFact>,
}

impl Family {
    pub fn new(id: FamilyId) -> Self {
        Self {
            id,
            husband: None,
            wife: None,
            children: Vec::new(),
            marriage: None,
            divorce: None,
            events: Vec::new(),
            notes: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Partners in `HUSB`, `WIFE` order.
    pub fn partners(&self) -> impl Iterator<Item = &IndividualId> {
        self.husband.iter().chain(self.wife.iter())
    }

    pub fn has_member(&self, id: &IndividualId) -> bool {
        self.partners().any(|p| p == id) || self.children.contains(id)
    }
}
