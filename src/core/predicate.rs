/// Theme trigger predicates: a typed expression tree over derived facts,
/// evaluated with three-valued logic.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::core::facts::SubjectFacts;
use crate::schema::fact::{FactArena, FactId, FactName, Value, ValueKind};

/// Comparison operators usable in a [`Predicate::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Whether this operator is meaningful for values of `kind`. Only
    /// integers are ordered.
    pub fn accepts(&self, kind: ValueKind) -> bool {
        match self {
            Self::Eq | Self::Ne => true,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => kind == ValueKind::Int,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn holds(&self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
        }
    }
}

/// Kleene truth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn not(self) -> Truth {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }

    fn from_bool(b: bool) -> Truth {
        if b {
            Self::True
        } else {
            Self::False
        }
    }
}

/// A declarative trigger condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// True when every child is true. Empty is true.
    All(Vec<Predicate>),
    /// True when any child is true. Empty is false.
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare {
        fact: FactName,
        op: CompareOp,
        value: Value,
    },
    /// True when the fact was derived for the subject. Never unknown.
    Present(FactName),
}

/// Outcome of evaluating a predicate against one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub truth: Truth,
    /// Facts that decided the outcome, in first-use order without repeats.
    pub evidence: Vec<FactId>,
}

impl Evaluation {
    fn new(truth: Truth) -> Self {
        Self {
            truth,
            evidence: Vec::new(),
        }
    }

    fn absorb(&mut self, other: &Evaluation) {
        for id in &other.evidence {
            if !self.evidence.contains(id) {
                self.evidence.push(*id);
            }
        }
    }
}

impl Predicate {
    /// Every fact name this predicate mentions, in tree order.
    pub fn facts(&self) -> Vec<FactName> {
        let mut out = Vec::new();
        self.collect_facts(&mut out);
        out
    }

    fn collect_facts(&self, out: &mut Vec<FactName>) {
        match self {
            Self::All(children) | Self::Any(children) => {
                for child in children {
                    child.collect_facts(out);
                }
            }
            Self::Not(inner) => inner.collect_facts(out),
            Self::Compare { fact, .. } | Self::Present(fact) => {
                if !out.contains(fact) {
                    out.push(*fact);
                }
            }
        }
    }

    pub fn evaluate(&self, subject: &SubjectFacts, arena: &FactArena) -> Evaluation {
        match self {
            Self::All(children) => {
                let results: Vec<Evaluation> = children
                    .iter()
                    .map(|c| c.evaluate(subject, arena))
                    .collect();
                let truth = if results.iter().any(|r| r.truth == Truth::False) {
                    Truth::False
                } else if results.iter().any(|r| r.truth == Truth::Unknown) {
                    Truth::Unknown
                } else {
                    Truth::True
                };
                let mut eval = Evaluation::new(truth);
                for r in &results {
                    if truth != Truth::False || r.truth == Truth::False {
                        eval.absorb(r);
                    }
                }
                eval
            }
            Self::Any(children) => {
                let results: Vec<Evaluation> = children
                    .iter()
                    .map(|c| c.evaluate(subject, arena))
                    .collect();
                let truth = if results.iter().any(|r| r.truth == Truth::True) {
                    Truth::True
                } else if results.iter().any(|r| r.truth == Truth::Unknown) {
                    Truth::Unknown
                } else {
                    Truth::False
                };
                let mut eval = Evaluation::new(truth);
                for r in &results {
                    if truth != Truth::True || r.truth == Truth::True {
                        eval.absorb(r);
                    }
                }
                eval
            }
            Self::Not(inner) => {
                let inner = inner.evaluate(subject, arena);
                Evaluation {
                    truth: inner.truth.not(),
                    evidence: inner.evidence,
                }
            }
            Self::Present(fact) => match subject.get(*fact) {
                Some(id) => Evaluation {
                    truth: Truth::True,
                    evidence: vec![id],
                },
                None => Evaluation::new(Truth::False),
            },
            Self::Compare { fact, op, value } => {
                let Some((id, actual)) = subject
                    .get(*fact)
                    .and_then(|id| arena.get(id).map(|f| (id, &f.value)))
                else {
                    return Evaluation::new(Truth::Unknown);
                };
                match compare(actual, *op, value) {
                    Some(holds) => Evaluation {
                        truth: Truth::from_bool(holds),
                        evidence: vec![id],
                    },
                    None => Evaluation::new(Truth::Unknown),
                }
            }
        }
    }
}

/// `None` when the operands cannot be compared with `op`.
fn compare(actual: &Value, op: CompareOp, expected: &Value) -> Option<bool> {
    match (actual, expected) {
        (Value::Int(a), Value::Int(b)) => Some(op.holds(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) if op.accepts(ValueKind::Bool) => {
            Some(op.holds(a.cmp(b)))
        }
        (Value::Text(a), Value::Text(b)) if op.accepts(ValueKind::Text) => {
            Some(op.holds(a.to_lowercase().cmp(&b.to_lowercase())))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::facts::DerivedFacts;
    use crate::core::extract::GedcomReader;

    const DOC: &str = "\
0 HEAD
0 @I1@ INDI
1 NAME Anna /Berg/
1 BIRT
2 DATE 1870
2 PLAC Bergen, Norway
1 DEAT
2 DATE 1910
2 PLAC Duluth, Minnesota, USA
0 @I2@ INDI
1 NAME Unknown /Berg/
0 TRLR
";

    fn derived() -> DerivedFacts {
        let extraction = GedcomReader::new(2024).read(DOC.as_bytes()).unwrap();
        DerivedFacts::derive(&extraction.graph)
    }

    fn cmp(fact: FactName, op: CompareOp, value: Value) -> Predicate {
        Predicate::Compare { fact, op, value }
    }

    #[test]
    fn compare_int() {
        let facts = derived();
        let anna = &facts.subjects()[0];
        let young = cmp(FactName::AgeAtDeath, CompareOp::Lt, Value::Int(50));
        let eval = young.evaluate(anna, &facts.arena);
        assert_eq!(eval.truth, Truth::True);
        assert_eq!(eval.evidence, vec![anna.get(FactName::AgeAtDeath).unwrap()]);

        let old = cmp(FactName::AgeAtDeath, CompareOp::Gt, Value::Int(85));
        assert_eq!(old.evaluate(anna, &facts.arena).truth, Truth::False);
    }

    #[test]
    fn text_equality_ignores_case() {
        let facts = derived();
        let p = cmp(
            FactName::BirthCountry,
            CompareOp::Eq,
            Value::Text("NORWAY".to_string()),
        );
        assert_eq!(p.evaluate(&facts.subjects()[0], &facts.arena).truth, Truth::True);
    }

    #[test]
    fn absent_fact_is_unknown() {
        let facts = derived();
        let nobody = &facts.subjects()[1];
        let p = cmp(FactName::AgeAtDeath, CompareOp::Lt, Value::Int(50));
        assert_eq!(p.evaluate(nobody, &facts.arena).truth, Truth::Unknown);
        assert_eq!(
            Predicate::Not(Box::new(p)).evaluate(nobody, &facts.arena).truth,
            Truth::Unknown
        );
        assert_eq!(
            Predicate::Present(FactName::AgeAtDeath)
                .evaluate(nobody, &facts.arena)
                .truth,
            Truth::False
        );
    }

    #[test]
    fn kleene_connectives() {
        let facts = derived();
        let nobody = &facts.subjects()[1];
        let unknown = cmp(FactName::AgeAtDeath, CompareOp::Lt, Value::Int(50));
        let falsy = cmp(FactName::OccupationCount, CompareOp::Gt, Value::Int(0));
        let truthy = cmp(FactName::MilitaryService, CompareOp::Eq, Value::Bool(false));

        let any = Predicate::Any(vec![unknown.clone(), truthy.clone()]);
        assert_eq!(any.evaluate(nobody, &facts.arena).truth, Truth::True);
        let any = Predicate::Any(vec![unknown.clone(), falsy.clone()]);
        assert_eq!(any.evaluate(nobody, &facts.arena).truth, Truth::Unknown);

        let all = Predicate::All(vec![unknown.clone(), falsy]);
        assert_eq!(all.evaluate(nobody, &facts.arena).truth, Truth::False);
        let all = Predicate::All(vec![unknown, truthy]);
        assert_eq!(all.evaluate(nobody, &facts.arena).truth, Truth::Unknown);

        assert_eq!(Predicate::All(vec![]).evaluate(nobody, &facts.arena).truth, Truth::True);
        assert_eq!(Predicate::Any(vec![]).evaluate(nobody, &facts.arena).truth, Truth::False);
    }

    #[test]
    fn any_keeps_only_supporting_evidence() {
        let facts = derived();
        let anna = &facts.subjects()[0];
        let p = Predicate::Any(vec![
            cmp(FactName::MilitaryService, CompareOp::Eq, Value::Bool(true)),
            cmp(FactName::CountryChanged, CompareOp::Eq, Value::Bool(true)),
        ]);
        let eval = p.evaluate(anna, &facts.arena);
        assert_eq!(eval.truth, Truth::True);
        assert_eq!(eval.evidence, vec![anna.get(FactName::CountryChanged).unwrap()]);
    }

    #[test]
    fn ordering_ops_reject_non_integers() {
        assert!(CompareOp::Ge.accepts(ValueKind::Int));
        assert!(!CompareOp::Ge.accepts(ValueKind::Text));
        assert!(CompareOp::Ne.accepts(ValueKind::Bool));
    }

    #[test]
    fn fact_names_are_collected_once() {
        let p = Predicate::All(vec![
            Predicate::Present(FactName::AgeAtDeath),
            Predicate::Not(Box::new(cmp(
                FactName::AgeAtDeath,
                CompareOp::Ge,
                Value::Int(50),
            ))),
            cmp(FactName::ChildCount, CompareOp::Ge, Value::Int(1)),
        ]);
        assert_eq!(p.facts(), vec![FactName::AgeAtDeath, FactName::ChildCount]);
    }
}
