/// Narrative block composition: matched themes into a de-duplicated,
/// provenance-annotated block sequence per subject.

use serde::{Deserialize, Serialize};

use crate::core::classifier::{Classification, SubjectThemes};
use crate::core::facts::{DerivedFacts, SubjectFacts};
use crate::core::summary::StorySummary;
use crate::core::theme::ThemeRegistry;
use crate::schema::fact::{Fact, FactArena, FactId};
use crate::schema::graph::{SubjectId, SubjectIndex};
use crate::schema::warning::Warning;

/// One narrative block in a subject's outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineBlock {
    pub block: String,
    /// Theme that first contributed the block; `None` for default blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Later themes that contributed the same block.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_from: Vec<String>,
    /// Facts justifying the block, as indexes into [`Outline::facts`].
    pub evidence: Vec<FactId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectOutline {
    pub subject: SubjectId,
    pub label: String,
    /// Matched themes in rank order.
    pub themes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub undetermined_themes: Vec<String>,
    /// True when no theme matched and the default blocks were used.
    pub fallback: bool,
    pub blocks: Vec<OutlineBlock>,
}

impl SubjectOutline {
    pub fn block_ids(&self) -> Vec<&str> {
        self.blocks.iter().map(|b| b.block.as_str()).collect()
    }
}

/// The hand-off artifact for a whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OutlineRecord")]
pub struct Outline {
    pub registry_version: String,
    pub reference_year: i32,
    subjects: Vec<SubjectOutline>,
    /// Every derived fact; block evidence indexes into this.
    pub facts: FactArena,
    pub warnings: Vec<Warning>,
    pub summary: StorySummary,
    #[serde(skip)]
    index: SubjectIndex,
}

/// Serialized shape of an [`Outline`]; the subject index is rebuilt on load.
#[derive(Deserialize)]
struct OutlineRecord {
    registry_version: String,
    reference_year: i32,
    subjects: Vec<SubjectOutline>,
    facts: FactArena,
    warnings: Vec<Warning>,
    summary: StorySummary,
}

impl From<OutlineRecord> for Outline {
    fn from(record: OutlineRecord) -> Self {
        Outline::new(
            record.registry_version,
            record.reference_year,
            record.subjects,
            record.facts,
            record.warnings,
            record.summary,
        )
    }
}

impl Outline {
    pub fn new(
        registry_version: String,
        reference_year: i32,
        subjects: Vec<SubjectOutline>,
        facts: FactArena,
        warnings: Vec<Warning>,
        summary: StorySummary,
    ) -> Self {
        let index = SubjectIndex::build(subjects.iter().map(|s| &s.subject));
        Self {
            registry_version,
            reference_year,
            subjects,
            facts,
            warnings,
            summary,
            index,
        }
    }

    /// Subject outlines in document order: individuals, then families.
    pub fn subjects(&self) -> &[SubjectOutline] {
        &self.subjects
    }

    pub fn subject(&self, subject: &SubjectId) -> Option<&SubjectOutline> {
        self.index.get(subject).map(|i| &self.subjects[i])
    }

    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(id)
    }

    /// Resolve a block's evidence to the facts themselves.
    pub fn provenance(&self, block: &OutlineBlock) -> Vec<&Fact> {
        block
            .evidence
            .iter()
            .filter_map(|id| self.facts.get(*id))
            .collect()
    }

    /// Compact JSON. Identical outlines serialize to identical bytes.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Outline, serde_json::Error> {
        serde_json::from_str(json)
    }
}

pub struct Composer<'a> {
    registry: &'a ThemeRegistry,
}

impl<'a> Composer<'a> {
    pub fn new(registry: &'a ThemeRegistry) -> Self {
        Self { registry }
    }

    /// Compose every subject. `classification` must come from the same
    /// `facts`, so both list subjects in the same order.
    pub fn compose(&self, facts: &DerivedFacts, classification: &Classification) -> Vec<SubjectOutline> {
        facts
            .subjects()
            .iter()
            .enumerate()
            .map(|(position, subject)| {
                let themes = classification
                    .subjects()
                    .get(position)
                    .filter(|t| t.subject == subject.subject)
                    .or_else(|| classification.subject(&subject.subject));
                match themes {
                    Some(themes) => self.compose_subject(subject, themes),
                    None => self.compose_subject(
                        subject,
                        &SubjectThemes {
                            subject: subject.subject.clone(),
                            matched: Vec::new(),
                            undetermined: Vec::new(),
                        },
                    ),
                }
            })
            .collect()
    }

    pub fn compose_subject(&self, subject: &SubjectFacts, themes: &SubjectThemes) -> SubjectOutline {
        let theme_name = |index: usize| {
            self.registry
                .theme(index)
                .map(|t| t.name.clone())
                .unwrap_or_default()
        };

        let mut blocks: Vec<OutlineBlock> = Vec::new();
        for matched in &themes.matched {
            let Some(theme) = self.registry.theme(matched.theme) else {
                continue;
            };
            for block in &theme.blocks {
                match blocks.iter_mut().find(|b| &b.block == block) {
                    Some(kept) => {
                        if kept.theme.as_deref() != Some(theme.name.as_str())
                            && !kept.also_from.contains(&theme.name)
                        {
                            kept.also_from.push(theme.name.clone());
                        }
                        for id in &matched.evidence {
                            if !kept.evidence.contains(id) {
                                kept.evidence.push(*id);
                            }
                        }
                    }
                    None => blocks.push(OutlineBlock {
                        block: block.clone(),
                        theme: Some(theme.name.clone()),
                        also_from: Vec::new(),
                        evidence: matched.evidence.clone(),
                    }),
                }
            }
        }

        let fallback = blocks.is_empty();
        if fallback {
            for block in &self.registry.default_blocks {
                if blocks.iter().all(|b| &b.block != block) {
                    blocks.push(OutlineBlock {
                        block: block.clone(),
                        theme: None,
                        also_from: Vec::new(),
                        evidence: Vec::new(),
                    });
                }
            }
        }

        SubjectOutline {
            subject: subject.subject.clone(),
            label: subject.label.clone(),
            themes: themes.matched.iter().map(|m| theme_name(m.theme)).collect(),
            undetermined_themes: themes.undetermined.iter().map(|&i| theme_name(i)).collect(),
            fallback,
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{Classifier, ThemeMatch};
    use crate::core::extract::GedcomReader;

    const REGISTRY: &str = r#"(
        version: "test",
        default_blocks: ["origins", "legacy"],
        themes: [
            (name: "first", priority: 5, when: All([]), blocks: ["a", "shared", "b"]),
            (name: "second", priority: 5, when: All([]), blocks: ["shared", "c"]),
            (name: "never", priority: 9, when: Any([]), blocks: ["z"]),
        ],
    )"#;

    const DOC: &str = "\
0 HEAD
0 @I1@ INDI
1 NAME Ada /Lind/
1 BIRT
2 DATE 1801
0 TRLR
";

    fn setup() -> (ThemeRegistry, DerivedFacts) {
        let registry = ThemeRegistry::parse_ron(REGISTRY).unwrap();
        let extraction = GedcomReader::new(2024).read(DOC.as_bytes()).unwrap();
        (registry, DerivedFacts::derive(&extraction.graph))
    }

    #[test]
    fn stable_dedup_keeps_first_position() {
        let (registry, facts) = setup();
        let classification = Classifier::new(&registry).classify(&facts);
        let outlines = Composer::new(&registry).compose(&facts, &classification);
        let ada = &outlines[0];
        assert_eq!(ada.block_ids(), vec!["a", "shared", "b", "c"]);
        assert_eq!(ada.themes, vec!["first", "second"]);
        assert!(!ada.fallback);

        let shared = &ada.blocks[1];
        assert_eq!(shared.theme.as_deref(), Some("first"));
        assert_eq!(shared.also_from, vec!["second"]);
    }

    #[test]
    fn no_match_uses_default_blocks() {
        let (registry, facts) = setup();
        let themes = SubjectThemes {
            subject: facts.subjects()[0].subject.clone(),
            matched: Vec::new(),
            undetermined: Vec::new(),
        };
        let outline = Composer::new(&registry).compose_subject(&facts.subjects()[0], &themes);
        assert!(outline.fallback);
        assert_eq!(outline.block_ids(), vec!["origins", "legacy"]);
        assert!(outline.blocks.iter().all(|b| b.theme.is_none()));
    }

    #[test]
    fn evidence_merges_into_kept_block() {
        let (registry, facts) = setup();
        let subject = &facts.subjects()[0];
        let birth = subject.get(crate::schema::fact::FactName::BirthYear).unwrap();
        let occupations = subject
            .get(crate::schema::fact::FactName::OccupationCount)
            .unwrap();
        let themes = SubjectThemes {
            subject: subject.subject.clone(),
            matched: vec![
                ThemeMatch {
                    theme: 0,
                    evidence: vec![birth],
                },
                ThemeMatch {
                    theme: 1,
                    evidence: vec![occupations, birth],
                },
            ],
            undetermined: Vec::new(),
        };
        let outline = Composer::new(&registry).compose_subject(subject, &themes);
        assert_eq!(outline.blocks[1].evidence, vec![birth, occupations]);
        assert_eq!(outline.blocks[0].evidence, vec![birth]);
    }

    #[test]
    fn unclassified_subjects_fall_back() {
        let (registry, facts) = setup();
        let outlines = Composer::new(&registry).compose(&facts, &Classification::default());
        assert_eq!(outlines.len(), facts.subjects().len());
        assert!(outlines.iter().all(|o| o.fallback));
    }

    #[test]
    fn composition_is_idempotent() {
        let (registry, facts) = setup();
        let classification = Classifier::new(&registry).classify(&facts);
        let composer = Composer::new(&registry);
        assert_eq!(
            composer.compose(&facts, &classification),
            composer.compose(&facts, &classification)
        );
    }
}
