use serde::{Deserialize, Serialize};
use std::fmt;

use super::graph::SubjectId;
use super::individual::IndividualId;

/// Which link of a record pointed at something that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRole {
    Husband,
    Wife,
    Child,
    /// `FAMC` on an individual.
    ChildOf,
    /// `FAMS` on an individual.
    SpouseOf,
}

impl LinkRole {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Husband => "HUSB",
            Self::Wife => "WIFE",
            Self::Child => "CHIL",
            Self::ChildOf => "FAMC",
            Self::SpouseOf => "FAMS",
        }
    }
}

/// A date ordering that cannot be right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "issue")]
pub enum ChronologyIssue {
    DeathBeforeBirth { birth: String, death: String },
    BirthAfterReference { birth: String, reference_year: i32 },
    DeathAfterReference { death: String, reference_year: i32 },
}

/// Recoverable problems found while processing a document. They never stop
/// the pipeline; they travel with the outline so they can be surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Warning {
    /// A record links to an identifier that is not in the document. The link
    /// was omitted and the record processed without it.
    ReferentialIntegrity {
        holder: SubjectId,
        role: LinkRole,
        missing: String,
    },
    /// Dates that violate birth ≤ death ≤ reference year. Left as recorded.
    Chronology {
        individual: IndividualId,
        #[serde(flatten)]
        issue: ChronologyIssue,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferentialIntegrity {
                holder,
                role,
                missing,
            } => write!(
                f,
                "{} {} references missing record @{}@",
                holder,
                role.tag(),
                missing
            ),
            Self::Chronology { individual, issue } => match issue {
                ChronologyIssue::DeathBeforeBirth { birth, death } => write!(
                    f,
                    "{} died ({}) before being born ({})",
                    individual, death, birth
                ),
                ChronologyIssue::BirthAfterReference {
                    birth,
                    reference_year,
                } => write!(
                    f,
                    "{} born ({}) after {}",
                    individual, birth, reference_year
                ),
                ChronologyIssue::DeathAfterReference {
                    death,
                    reference_year,
                } => write!(
                    f,
                    "{} died ({}) after {}",
                    individual, death, reference_year
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::family::FamilyId;

    #[test]
    fn display_dangling_child() {
        let w = Warning::ReferentialIntegrity {
            holder: SubjectId::Family(FamilyId("F1".to_string())),
            role: LinkRole::Child,
            missing: "I99".to_string(),
        };
        assert_eq!(w.to_string(), "F1 CHIL references missing record @I99@");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let w = Warning::Chronology {
            individual: IndividualId("I1".to_string()),
            issue: ChronologyIssue::DeathBeforeBirth {
                birth: "1900".to_string(),
                death: "1890".to_string(),
            },
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("\"kind\":\"chronology\""));
        assert!(json.contains("\"issue\":\"death_before_birth\""));
    }
}
