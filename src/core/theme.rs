/// Theme registry: loading, validation, and ranking of story themes.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::predicate::{CompareOp, Predicate};
use crate::schema::fact::{FactName, Value, ValueKind};
use crate::schema::graph::SubjectKind;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry declares no default blocks")]
    MissingDefaultBlocks,
    #[error("theme '{theme}' references unknown fact '{fact}'")]
    UnknownFact { theme: String, fact: String },
    #[error("theme '{theme}': fact '{fact}' is {expected:?} and cannot be compared with {op} {found}")]
    TypeMismatch {
        theme: String,
        fact: FactName,
        expected: ValueKind,
        op: &'static str,
        found: Value,
    },
    #[error("theme '{0}' is declared more than once")]
    DuplicateTheme(String),
    #[error("theme '{0}' has no blocks")]
    EmptyTheme(String),
    #[error("theme '{theme}' has an invalid block id '{block}'")]
    InvalidBlock { theme: String, block: String },
    #[error("theme '{theme}' outranks unknown theme '{target}'")]
    UnknownTheme { theme: String, target: String },
    #[error("theme '{theme}' outranks '{target}' but has a lower priority")]
    PriorityConflict { theme: String, target: String },
    #[error("outranks declarations form a cycle through: {}", .0.join(", "))]
    CyclicPriority(Vec<String>),
    #[error("no theme registry was provided")]
    NotProvided,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A validated story theme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub name: String,
    pub priority: u32,
    /// Themes this one must be ranked ahead of.
    pub outranks: Vec<String>,
    pub subjects: Vec<SubjectKind>,
    pub when: Predicate,
    pub blocks: Vec<String>,
}

impl Theme {
    pub fn applies_to(&self, kind: SubjectKind) -> bool {
        self.subjects.contains(&kind)
    }
}

/// The immutable set of themes plus the fallback block sequence.
///
/// `themes` keeps declaration order; `ranking` lists theme indexes in the
/// order the classifier evaluates them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeRegistry {
    pub version: String,
    pub default_blocks: Vec<String>,
    themes: Vec<Theme>,
    ranking: Vec<usize>,
}

// RON deserialization helpers: fact names arrive as strings and are
// resolved against the closed fact set during validation.

#[derive(Debug, Deserialize)]
enum RonPredicate {
    All(Vec<RonPredicate>),
    Any(Vec<RonPredicate>),
    Not(Box<RonPredicate>),
    Compare {
        fact: String,
        op: CompareOp,
        value: Value,
    },
    Present(String),
}

fn both_kinds() -> Vec<SubjectKind> {
    vec![SubjectKind::Individual, SubjectKind::Family]
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Theme")]
struct RonTheme {
    name: String,
    #[serde(default)]
    priority: u32,
    #[serde(default)]
    outranks: Vec<String>,
    #[serde(default = "both_kinds")]
    subjects: Vec<SubjectKind>,
    when: RonPredicate,
    blocks: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Registry")]
struct RonRegistry {
    #[serde(default)]
    version: String,
    default_blocks: Vec<String>,
    themes: Vec<RonTheme>,
}

fn valid_block_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace)
}

impl RonPredicate {
    fn resolve(self, theme: &str) -> Result<Predicate, RegistryError> {
        let lookup = |fact: &str| {
            FactName::from_name(fact).ok_or_else(|| RegistryError::UnknownFact {
                theme: theme.to_string(),
                fact: fact.to_string(),
            })
        };
        Ok(match self {
            Self::All(children) => Predicate::All(
                children
                    .into_iter()
                    .map(|c| c.resolve(theme))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Any(children) => Predicate::Any(
                children
                    .into_iter()
                    .map(|c| c.resolve(theme))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Not(inner) => Predicate::Not(Box::new(inner.resolve(theme)?)),
            Self::Present(fact) => Predicate::Present(lookup(&fact)?),
            Self::Compare { fact, op, value } => {
                let fact = lookup(&fact)?;
                if value.kind() != fact.kind() || !op.accepts(fact.kind()) {
                    return Err(RegistryError::TypeMismatch {
                        theme: theme.to_string(),
                        fact,
                        expected: fact.kind(),
                        op: op.symbol(),
                        found: value,
                    });
                }
                Predicate::Compare { fact, op, value }
            }
        })
    }
}

impl ThemeRegistry {
    /// Load a registry from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ThemeRegistry, RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and validate a registry from a RON string. Nothing is returned
    /// unless every theme validates.
    pub fn parse_ron(input: &str) -> Result<ThemeRegistry, RegistryError> {
        let raw: RonRegistry = ron::from_str(input)?;

        if raw.default_blocks.is_empty() {
            return Err(RegistryError::MissingDefaultBlocks);
        }
        if let Some(bad) = raw.default_blocks.iter().find(|b| !valid_block_id(b)) {
            return Err(RegistryError::InvalidBlock {
                theme: "default".to_string(),
                block: bad.clone(),
            });
        }

        let mut seen = FxHashSet::default();
        let mut themes = Vec::with_capacity(raw.themes.len());
        for ron_theme in raw.themes {
            if !seen.insert(ron_theme.name.clone()) {
                return Err(RegistryError::DuplicateTheme(ron_theme.name));
            }
            if ron_theme.blocks.is_empty() {
                return Err(RegistryError::EmptyTheme(ron_theme.name));
            }
            if let Some(bad) = ron_theme.blocks.iter().find(|b| !valid_block_id(b)) {
                return Err(RegistryError::InvalidBlock {
                    theme: ron_theme.name.clone(),
                    block: bad.clone(),
                });
            }
            let when = ron_theme.when.resolve(&ron_theme.name)?;
            themes.push(Theme {
                name: ron_theme.name,
                priority: ron_theme.priority,
                outranks: ron_theme.outranks,
                subjects: ron_theme.subjects,
                when,
                blocks: ron_theme.blocks,
            });
        }

        let ranking = rank(&themes)?;
        Ok(ThemeRegistry {
            version: raw.version,
            default_blocks: raw.default_blocks,
            themes,
            ranking,
        })
    }

    /// Themes in declaration order.
    pub fn themes(&self) -> &[Theme] {
        &self.themes
    }

    pub fn theme(&self, index: usize) -> Option<&Theme> {
        self.themes.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.name == name)
    }

    /// Theme indexes in evaluation order.
    pub fn ranking(&self) -> &[usize] {
        &self.ranking
    }

    /// Themes in evaluation order.
    pub fn ranked(&self) -> impl Iterator<Item = (usize, &Theme)> {
        self.ranking.iter().map(move |&i| (i, &self.themes[i]))
    }
}

/// Order themes by `outranks` edges; among themes whose predecessors are
/// all placed, higher priority goes first, then earlier declaration.
fn rank(themes: &[Theme]) -> Result<Vec<usize>, RegistryError> {
    let index: FxHashMap<&str, usize> = themes
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); themes.len()];
    let mut pending = vec![0usize; themes.len()];
    for (i, theme) in themes.iter().enumerate() {
        for target in &theme.outranks {
            let Some(&j) = index.get(target.as_str()) else {
                return Err(RegistryError::UnknownTheme {
                    theme: theme.name.clone(),
                    target: target.clone(),
                });
            };
            if theme.priority < themes[j].priority {
                return Err(RegistryError::PriorityConflict {
                    theme: theme.name.clone(),
                    target: target.clone(),
                });
            }
            if !successors[i].contains(&j) {
                successors[i].push(j);
                pending[j] += 1;
            }
        }
    }

    let mut ready: Vec<usize> = (0..themes.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(themes.len());
    while let Some(pos) = best_candidate(&ready, themes) {
        let next = ready.swap_remove(pos);
        order.push(next);
        for &j in &successors[next] {
            pending[j] -= 1;
            if pending[j] == 0 {
                ready.push(j);
            }
        }
    }

    if order.len() < themes.len() {
        let cycle = (0..themes.len())
            .filter(|i| pending[*i] > 0)
            .map(|i| themes[i].name.clone())
            .collect();
        return Err(RegistryError::CyclicPriority(cycle));
    }
    Ok(order)
}

/// Position in `ready` of the highest priority theme, earliest declared
/// among equals.
fn best_candidate(ready: &[usize], themes: &[Theme]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (pos, &candidate) in ready.iter().enumerate() {
        let better = match best {
            None => true,
            Some(b) => {
                let current = ready[b];
                let (cp, bp) = (themes[candidate].priority, themes[current].priority);
                cp > bp || (cp == bp && candidate < current)
            }
        };
        if better {
            best = Some(pos);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(themes: &str) -> Result<ThemeRegistry, RegistryError> {
        ThemeRegistry::parse_ron(&format!(
            r#"(version: "test", default_blocks: ["origins", "legacy"], themes: [{}])"#,
            themes
        ))
    }

    const ALWAYS: &str = "All([])";

    fn theme(name: &str, priority: u32, outranks: &str) -> String {
        format!(
            r#"(name: "{}", priority: {}, outranks: [{}], when: {}, blocks: ["{}_block"]),"#,
            name, priority, outranks, ALWAYS, name
        )
    }

    fn names(reg: &ThemeRegistry) -> Vec<&str> {
        reg.ranked().map(|(_, t)| t.name.as_str()).collect()
    }

    #[test]
    fn load_default_registry() {
        let path = std::path::PathBuf::from("theme_data/registry.ron");
        let reg = ThemeRegistry::load_from_ron(&path).unwrap();
        assert!(!reg.default_blocks.is_empty());
        assert!(reg.find("immigration").is_some());
        assert!(reg.find("large_family").is_some());
        assert_eq!(names(&reg)[0], "immigration");
    }

    #[test]
    fn priority_then_declaration_order() {
        let reg = registry(&[
            theme("a", 10, ""),
            theme("b", 50, ""),
            theme("c", 10, ""),
            theme("d", 50, ""),
        ]
        .concat())
        .unwrap();
        assert_eq!(names(&reg), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn outranks_breaks_equal_priority() {
        let reg = registry(&[theme("a", 10, ""), theme("b", 10, r#""a""#)].concat()).unwrap();
        assert_eq!(names(&reg), vec!["b", "a"]);
    }

    #[test]
    fn predicate_is_resolved() {
        let reg = registry(
            r#"(name: "young", when: Compare(fact: "age_at_death", op: Lt, value: Int(50)), blocks: ["x"])"#,
        )
        .unwrap();
        let t = reg.find("young").unwrap();
        assert_eq!(t.priority, 0);
        assert_eq!(t.subjects, vec![SubjectKind::Individual, SubjectKind::Family]);
        assert_eq!(
            t.when,
            Predicate::Compare {
                fact: FactName::AgeAtDeath,
                op: CompareOp::Lt,
                value: Value::Int(50),
            }
        );
    }

    #[test]
    fn rejects_missing_default_blocks() {
        let err = ThemeRegistry::parse_ron(r#"(default_blocks: [], themes: [])"#).unwrap_err();
        assert!(matches!(err, RegistryError::MissingDefaultBlocks));
    }

    #[test]
    fn rejects_unknown_fact() {
        let err = registry(
            r#"(name: "t", when: Present("shoe_size"), blocks: ["x"])"#,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFact { fact, .. } if fact == "shoe_size"));
    }

    #[test]
    fn rejects_type_mismatch() {
        let err = registry(
            r#"(name: "t", when: Compare(fact: "age_at_death", op: Eq, value: Text("old")), blocks: ["x"])"#,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { .. }));

        let err = registry(
            r#"(name: "t", when: Compare(fact: "birth_country", op: Gt, value: Text("A")), blocks: ["x"])"#,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { .. }));
    }

    #[test]
    fn rejects_duplicates_and_empty_themes() {
        let err = registry(&[theme("a", 1, ""), theme("a", 2, "")].concat()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTheme(name) if name == "a"));

        let err = registry(r#"(name: "t", when: All([]), blocks: [])"#).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyTheme(name) if name == "t"));
    }

    #[test]
    fn rejects_bad_outranks() {
        let err = registry(&theme("a", 1, r#""ghost""#)).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTheme { .. }));

        let err = registry(&[theme("a", 1, r#""b""#), theme("b", 5, "")].concat()).unwrap_err();
        assert!(matches!(err, RegistryError::PriorityConflict { .. }));

        let err = registry(&[theme("a", 1, r#""b""#), theme("b", 1, r#""a""#)].concat())
            .unwrap_err();
        match err {
            RegistryError::CyclicPriority(names) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("expected CyclicPriority, got {other}"),
        }
    }

    #[test]
    fn malformed_ron_is_reported() {
        let err = ThemeRegistry::parse_ron("(default_blocks: [").unwrap_err();
        assert!(matches!(err, RegistryError::Ron(_)));
    }
}
