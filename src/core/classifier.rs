/// Story-theme classification of every subject against the registry.

use serde::Serialize;
use tracing::debug;

use crate::core::facts::DerivedFacts;
use crate::core::predicate::Truth;
use crate::core::theme::ThemeRegistry;
use crate::schema::fact::FactId;
use crate::schema::graph::{SubjectId, SubjectIndex};

/// A theme that matched, with the facts that made it true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeMatch {
    /// Index into the registry's declaration order.
    pub theme: usize,
    pub evidence: Vec<FactId>,
}

/// Classification result for one subject. `matched` is in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectThemes {
    pub subject: SubjectId,
    pub matched: Vec<ThemeMatch>,
    /// Themes whose predicate could not be decided for lack of facts.
    pub undetermined: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    subjects: Vec<SubjectThemes>,
    #[serde(skip)]
    index: SubjectIndex,
}

impl Classification {
    fn push(&mut self, themes: SubjectThemes) {
        self.index.insert(&themes.subject, self.subjects.len());
        self.subjects.push(themes);
    }

    /// Per-subject results in the order of the classified facts.
    pub fn subjects(&self) -> &[SubjectThemes] {
        &self.subjects
    }

    pub fn subject(&self, subject: &SubjectId) -> Option<&SubjectThemes> {
        self.index.get(subject).map(|i| &self.subjects[i])
    }
}

pub struct Classifier<'a> {
    registry: &'a ThemeRegistry,
}

impl<'a> Classifier<'a> {
    pub fn new(registry: &'a ThemeRegistry) -> Self {
        Self { registry }
    }

    /// Evaluate every applicable theme for every subject, in subject order.
    pub fn classify(&self, facts: &DerivedFacts) -> Classification {
        let mut out = Classification::default();
        for subject in facts.subjects() {
            let mut themes = SubjectThemes {
                subject: subject.subject.clone(),
                matched: Vec::new(),
                undetermined: Vec::new(),
            };
            for (index, theme) in self.registry.ranked() {
                if !theme.applies_to(subject.kind()) {
                    continue;
                }
                let eval = theme.when.evaluate(subject, &facts.arena);
                match eval.truth {
                    Truth::True => themes.matched.push(ThemeMatch {
                        theme: index,
                        evidence: eval.evidence,
                    }),
                    Truth::Unknown => themes.undetermined.push(index),
                    Truth::False => {}
                }
            }
            debug!(
                subject = %subject.subject,
                matched = themes.matched.len(),
                undetermined = themes.undetermined.len(),
                "classified subject"
            );
            out.push(themes);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extract::GedcomReader;
    use crate::schema::individual::IndividualId;

    const REGISTRY: &str = r#"(
        version: "test",
        default_blocks: ["origins"],
        themes: [
            (name: "late", priority: 1, subjects: [Individual],
             when: Compare(fact: "age_at_death", op: Gt, value: Int(60)), blocks: ["late"]),
            (name: "moved", priority: 5, subjects: [Individual],
             when: Compare(fact: "country_changed", op: Eq, value: Bool(true)), blocks: ["moved"]),
            (name: "anyone", priority: 1,
             when: All([]), blocks: ["anyone"]),
            (name: "families", priority: 9, subjects: [Family],
             when: All([]), blocks: ["families"]),
        ],
    )"#;

    const DOC: &str = "\
0 HEAD
0 @I1@ INDI
1 BIRT
2 DATE 1800
2 PLAC Lyon, France
1 DEAT
2 DATE 1870
2 PLAC Quebec, Canada
1 FAMS @F1@
0 @I2@ INDI
1 FAMS @F1@
0 @F1@ FAM
1 HUSB @I1@
1 WIFE @I2@
0 TRLR
";

    fn classify() -> (ThemeRegistry, Classification) {
        let registry = ThemeRegistry::parse_ron(REGISTRY).unwrap();
        let extraction = GedcomReader::new(2024).read(DOC.as_bytes()).unwrap();
        let facts = DerivedFacts::derive(&extraction.graph);
        let classification = Classifier::new(&registry).classify(&facts);
        (registry, classification)
    }

    fn names(registry: &ThemeRegistry, indexes: impl Iterator<Item = usize>) -> Vec<String> {
        indexes
            .map(|i| registry.theme(i).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn matches_in_rank_order() {
        let (registry, c) = classify();
        let first = c
            .subject(&SubjectId::Individual(IndividualId("I1".to_string())))
            .unwrap();
        assert_eq!(
            names(&registry, first.matched.iter().map(|m| m.theme)),
            vec!["moved", "late", "anyone"]
        );
        assert!(first.undetermined.is_empty());
    }

    #[test]
    fn unknown_facts_leave_theme_undetermined() {
        let (registry, c) = classify();
        let second = &c.subjects()[1];
        assert_eq!(names(&registry, second.matched.iter().map(|m| m.theme)), vec!["anyone"]);
        assert_eq!(
            names(&registry, second.undetermined.iter().copied()),
            vec!["moved", "late"]
        );
    }

    #[test]
    fn subject_kind_filter() {
        let (registry, c) = classify();
        assert_eq!(c.subjects().len(), 3);
        for themes in c.subjects() {
            assert_eq!(c.subject(&themes.subject), Some(themes));
        }
        assert!(c
            .subject(&SubjectId::Individual(IndividualId("I9".to_string())))
            .is_none());
        let family = &c.subjects()[2];
        assert_eq!(
            names(&registry, family.matched.iter().map(|m| m.theme)),
            vec!["families", "anyone"]
        );
    }

    #[test]
    fn evidence_points_at_deciding_fact() {
        let (_, c) = classify();
        let moved = &c.subjects()[0].matched[0];
        assert_eq!(moved.evidence.len(), 1);
    }
}
