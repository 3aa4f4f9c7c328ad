/// Property tests: outlines are deterministic, never empty, and
/// de-duplicated in first-contribution order for any document shape.

use lineage_narrative::core::pipeline::OutlineEngine;
use lineage_narrative::core::theme::ThemeRegistry;
use proptest::prelude::*;

const PLACES: [&str; 5] = [
    "Cork, Ireland",
    "Boston, Massachusetts, USA",
    "Hamburg, Germany",
    "Liverpool, Lancashire, England",
    "New York, New York, United States",
];

#[derive(Debug, Clone)]
struct Person {
    birth: Option<i32>,
    lifespan: Option<i32>,
    birth_place: Option<usize>,
    death_place: Option<usize>,
    emigrated: bool,
    served: bool,
}

#[derive(Debug, Clone)]
struct Union {
    husband: usize,
    wife: Option<usize>,
    children: Vec<usize>,
}

fn person() -> impl Strategy<Value = Person> {
    (
        prop::option::of(1700i32..1950),
        prop::option::of(0i32..100),
        prop::option::of(0usize..PLACES.len()),
        prop::option::of(0usize..PLACES.len()),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(birth, lifespan, birth_place, death_place, emigrated, served)| Person {
                birth,
                lifespan,
                birth_place,
                death_place,
                emigrated,
                served,
            },
        )
}

fn union() -> impl Strategy<Value = Union> {
    (
        0usize..12,
        prop::option::of(0usize..12),
        prop::collection::vec(0usize..14, 0..10),
    )
        .prop_map(|(husband, wife, children)| Union {
            husband,
            wife,
            children,
        })
}

/// Render people and unions as GEDCOM. Out-of-range indexes become
/// dangling references on purpose.
fn render(people: &[Person], unions: &[Union]) -> String {
    let mut out = String::from("0 HEAD\n1 CHAR UTF-8\n");
    for (i, p) in people.iter().enumerate() {
        out.push_str(&format!("0 @I{}@ INDI\n1 NAME Person{} /Test/\n", i, i));
        if let Some(year) = p.birth {
            out.push_str(&format!("1 BIRT\n2 DATE {}\n", year));
            if let Some(place) = p.birth_place {
                out.push_str(&format!("2 PLAC {}\n", PLACES[place]));
            }
            if let Some(span) = p.lifespan {
                out.push_str(&format!("1 DEAT\n2 DATE {}\n", year + span));
                if let Some(place) = p.death_place {
                    out.push_str(&format!("2 PLAC {}\n", PLACES[place]));
                }
            }
        }
        if p.emigrated {
            out.push_str("1 EMIG\n");
        }
        if p.served {
            out.push_str("1 _MILT Infantry\n");
        }
        for (f, u) in unions.iter().enumerate() {
            if u.children.contains(&i) {
                out.push_str(&format!("1 FAMC @F{}@\n", f));
            }
            if u.husband == i || u.wife == Some(i) {
                out.push_str(&format!("1 FAMS @F{}@\n", f));
            }
        }
    }
    for (f, u) in unions.iter().enumerate() {
        out.push_str(&format!("0 @F{}@ FAM\n1 HUSB @I{}@\n", f, u.husband));
        if let Some(wife) = u.wife {
            out.push_str(&format!("1 WIFE @I{}@\n", wife));
        }
        for child in &u.children {
            out.push_str(&format!("1 CHIL @I{}@\n", child));
        }
    }
    out.push_str("0 TRLR\n");
    out
}

fn engine() -> OutlineEngine {
    OutlineEngine::builder()
        .registry_path("theme_data/registry.ron")
        .reference_year(2024)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn outline_is_deterministic(
        people in prop::collection::vec(person(), 1..12),
        unions in prop::collection::vec(union(), 0..4),
    ) {
        let doc = render(&people, &unions);
        let engine = engine();
        let first = engine.outline(doc.as_bytes()).unwrap().to_json().unwrap();
        let second = engine.outline(doc.as_bytes()).unwrap().to_json().unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_subject_has_unique_blocks(
        people in prop::collection::vec(person(), 1..12),
        unions in prop::collection::vec(union(), 0..4),
    ) {
        let doc = render(&people, &unions);
        let outline = engine().outline(doc.as_bytes()).unwrap();
        for subject in outline.subjects() {
            prop_assert!(!subject.blocks.is_empty(), "{} has no blocks", subject.subject);
            let ids = subject.block_ids();
            for (i, id) in ids.iter().enumerate() {
                prop_assert!(!ids[..i].contains(id), "{} repeats {}", subject.subject, id);
            }
            prop_assert_eq!(subject.fallback, subject.themes.is_empty());
        }
    }

    #[test]
    fn blocks_follow_first_contributing_theme(
        people in prop::collection::vec(person(), 1..12),
        unions in prop::collection::vec(union(), 0..4),
    ) {
        let engine = engine();
        let doc = render(&people, &unions);
        let outline = engine.outline(doc.as_bytes()).unwrap();
        for subject in outline.subjects().iter().filter(|s| !s.fallback) {
            let mut expected: Vec<&str> = Vec::new();
            for name in &subject.themes {
                let theme = engine.registry().find(name).unwrap();
                for block in &theme.blocks {
                    if !expected.contains(&block.as_str()) {
                        expected.push(block);
                    }
                }
            }
            prop_assert_eq!(subject.block_ids(), expected);
        }
    }

    #[test]
    fn any_year_outlines_without_panicking(birth in any::<i32>(), death in any::<i32>()) {
        let doc = format!(
            "0 HEAD\n0 @I1@ INDI\n1 BIRT\n2 DATE {}\n1 DEAT\n2 DATE ABT {}\n0 TRLR\n",
            birth, death
        );
        let outline = engine().outline(doc.as_bytes()).unwrap();
        prop_assert_eq!(outline.subjects().len(), 1);
    }

    #[test]
    fn equal_priorities_keep_declaration_order(
        priorities in prop::collection::vec(0u32..4, 1..8),
    ) {
        let themes: String = priorities
            .iter()
            .enumerate()
            .map(|(i, p)| format!(
                r#"(name: "t{i}", priority: {p}, when: All([]), blocks: ["b{i}"]),"#
            ))
            .collect();
        let registry = ThemeRegistry::parse_ron(&format!(
            r#"(default_blocks: ["origins"], themes: [{themes}])"#
        ))
        .unwrap();

        let mut expected: Vec<usize> = (0..priorities.len()).collect();
        expected.sort_by(|a, b| priorities[*b].cmp(&priorities[*a]).then(a.cmp(b)));
        prop_assert_eq!(registry.ranking(), expected.as_slice());
    }
}
