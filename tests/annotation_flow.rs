//! End-to-end: scan → sync → query → rename over an in-memory document

use kittmark::{
    AnnotatedDocument, AnnotationEngine, Block, EngineConfig, EntityDefinition, EntityKind,
    EntityMark, MarkOp, MemoryDocument, TextRun,
};
use proptest::prelude::*;

fn catalog() -> Vec<EntityDefinition> {
    vec![
        EntityDefinition::new("frodo", "Frodo", EntityKind::Character).with_aliases(["Mr. Frodo"]),
        EntityDefinition::new("shire", "Shire", EntityKind::Location),
        EntityDefinition::new("tom", "Том", EntityKind::Character),
        EntityDefinition::new("baker", "Baker Street", EntityKind::Location),
    ]
}

// (word, entity it mentions)
const VOCAB: &[(&str, Option<&str>)] = &[
    ("Frodo", Some("frodo")),
    ("frodo", Some("frodo")),
    ("Mr. Frodo", Some("frodo")),
    ("Shire", Some("shire")),
    ("Том", Some("tom")),
    ("Baker Street", Some("baker")),
    ("the", None),
    ("walked", None),
    ("Frodos", None),
    ("Shirebound", None),
    ("Томас", None),
    ("street", None),
    ("и", None),
];

const SEPARATORS: &[&str] = &[" ", ", ", ". ", " — "];

fn answers_to(entity: &EntityDefinition, text: &str) -> bool {
    let needle = text.to_lowercase();
    entity.search_names().any(|(name, _)| name.to_lowercase() == needle)
}

fn stale_mark() -> EntityMark {
    EntityMark {
        entity_id: "gone".to_string(),
        entity_kind: EntityKind::Item,
        entity_name: "Gone".to_string(),
    }
}

fn build_paragraphs(words: &[Vec<(usize, usize)>]) -> (Vec<String>, Vec<&'static str>) {
    let mut present = Vec::new();
    let paragraphs = words
        .iter()
        .map(|paragraph| {
            let mut text = String::new();
            for (i, &(word, sep)) in paragraph.iter().enumerate() {
                if i > 0 {
                    text.push_str(SEPARATORS[sep]);
                }
                let (token, entity) = VOCAB[word];
                text.push_str(token);
                present.extend(entity);
            }
            text
        })
        .collect();
    (paragraphs, present)
}

proptest! {
    #[test]
    fn round_trip_recovers_every_present_entity(
        words in prop::collection::vec(
            prop::collection::vec((0..VOCAB.len(), 0..SEPARATORS.len()), 1..12),
            1..4,
        )
    ) {
        let (paragraphs, present) = build_paragraphs(&words);
        let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
        let mut doc = MemoryDocument::from_paragraphs(&refs);
        let engine = AnnotationEngine::default();
        let catalog = catalog();

        let outcome = engine.scan_and_sync(&mut doc, &catalog).unwrap();
        prop_assert!(outcome.report.dropped.is_empty());

        for entity in &catalog {
            let occurrences = engine.find_occurrences(&doc, &entity.id);
            if present.contains(&entity.id.as_str()) {
                prop_assert!(!occurrences.is_empty(), "{} not recovered", entity.id);
            }
            for occurrence in &occurrences {
                prop_assert!(occurrence.from < occurrence.to);
                prop_assert!(answers_to(entity, &occurrence.text), "{:?}", occurrence.text);
            }
            let spans = outcome.spans.iter().filter(|s| s.entity_id == entity.id).count();
            prop_assert_eq!(occurrences.len(), spans);
        }
    }

    #[test]
    fn rename_keeps_every_range(
        words in prop::collection::vec(
            prop::collection::vec((0..VOCAB.len(), 0..SEPARATORS.len()), 1..12),
            1..4,
        )
    ) {
        let (paragraphs, _) = build_paragraphs(&words);
        let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
        let mut doc = MemoryDocument::from_paragraphs(&refs);
        let engine = AnnotationEngine::default();
        engine.scan_and_sync(&mut doc, &catalog()).unwrap();

        let before = engine.find_occurrences(&doc, "frodo");
        let renamed = engine.rename_propagate(&mut doc, "frodo", "Frodo Baggins").unwrap();
        let after = engine.find_occurrences(&doc, "frodo");

        prop_assert_eq!(renamed, before.len());
        prop_assert_eq!(after.len(), before.len());
        for (old, new) in before.iter().zip(&after) {
            prop_assert_eq!((old.from, old.to), (new.from, new.to));
            prop_assert_eq!(&new.mark.entity_name, "Frodo Baggins");
        }
    }

    #[test]
    fn skipping_unchanged_scans_matches_always_scanning(
        texts in prop::collection::vec(
            prop::collection::vec(
                prop::collection::vec((0..VOCAB.len(), 0..SEPARATORS.len()), 1..8),
                1..3,
            ),
            1..4,
        ),
        steps in prop::collection::vec((0..4usize, any::<bool>()), 1..10),
    ) {
        let mut cached_docs = Vec::new();
        for words in &texts {
            let (paragraphs, _) = build_paragraphs(words);
            let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
            cached_docs.push(MemoryDocument::from_paragraphs(&refs));
        }
        let mut fresh_docs = cached_docs.clone();

        let cached = AnnotationEngine::default();
        let fresh = AnnotationEngine::new(EngineConfig {
            skip_unchanged: false,
            ..EngineConfig::default()
        });
        let catalog = catalog();

        for (pick, host_edit) in steps {
            let idx = pick % texts.len();
            if host_edit {
                // Host stamps a stale mark on the first char of the document
                let op = MarkOp::Add { from: 1, to: 2, mark: stale_mark() };
                cached_docs[idx].apply_marks(std::slice::from_ref(&op)).unwrap();
                fresh_docs[idx].apply_marks(std::slice::from_ref(&op)).unwrap();
            }

            let with_skip = cached.scan_and_sync(&mut cached_docs[idx], &catalog).unwrap();
            let without = fresh.scan_and_sync(&mut fresh_docs[idx], &catalog).unwrap();

            prop_assert_eq!(&with_skip.spans, &without.spans);
            prop_assert_eq!(cached_docs[idx].blocks(), fresh_docs[idx].blocks());
        }
    }
}

#[test]
fn scenario_multi_word_names() {
    let catalog = vec![
        EntityDefinition::new("e1", "Baker Street Office", EntityKind::Location),
        EntityDefinition::new("e2", "Golden Pocket Watch", EntityKind::Item),
    ];
    let mut doc = MemoryDocument::from_paragraphs(&[
        "Watson sat in his Baker Street Office, examining the Golden Pocket Watch.",
    ]);
    let engine = AnnotationEngine::default();

    let outcome = engine.scan_and_sync(&mut doc, &catalog).unwrap();
    let spans: Vec<(&str, usize, usize)> = outcome
        .spans
        .iter()
        .map(|s| (s.matched_text.as_str(), s.start, s.end))
        .collect();
    assert_eq!(
        spans,
        vec![("Baker Street Office", 18, 37), ("Golden Pocket Watch", 53, 72)]
    );

    let office = engine.find_occurrences(&doc, "e1");
    assert_eq!((office[0].from, office[0].to), (19, 38));
    let watch = engine.find_occurrences(&doc, "e2");
    assert_eq!(watch[0].text, "Golden Pocket Watch");
}

#[test]
fn cursor_inside_cyrillic_name_resolves_exact_span() {
    let catalog = vec![EntityDefinition::new("tom", "Том", EntityKind::Character)];
    let mut doc = MemoryDocument::from_paragraphs(&["— Идём, — сказал Том."]);
    let engine = AnnotationEngine::default();
    engine.scan_and_sync(&mut doc, &catalog).unwrap();

    for cursor in 18..=21 {
        let found = engine.resolve_at(&doc, cursor, &catalog);
        assert_eq!(found.len(), 1, "cursor {}", cursor);
        assert_eq!((found[0].from, found[0].to), (18, 21));
        assert_eq!(found[0].text, "Том");
    }
    assert!(engine.resolve_at(&doc, 17, &catalog).is_empty());
    assert!(engine.resolve_at(&doc, 22, &catalog).is_empty());
}

#[test]
fn partial_words_are_not_annotated() {
    let mut doc = MemoryDocument::from_paragraphs(&["Frodos and Shirebound and Томас."]);
    let engine = AnnotationEngine::default();

    let outcome = engine.scan_and_sync(&mut doc, &catalog()).unwrap();
    assert!(outcome.spans.is_empty());
    assert_eq!(doc.revision(), 0);
}

#[test]
fn style_marks_survive_the_whole_flow() {
    let mut doc = MemoryDocument::from_blocks(vec![
        Block::new(vec![
            TextRun::plain("At "),
            TextRun::styled("Baker", &["italic"]),
            TextRun::plain(" Street, Frodo waited."),
        ]),
        Block::paragraph("The Shire was far."),
    ]);
    let engine = AnnotationEngine::default();
    let catalog = catalog();

    engine.scan_and_sync(&mut doc, &catalog).unwrap();
    let baker = engine.find_occurrences(&doc, "baker");
    assert_eq!(baker.len(), 1);
    assert_eq!(baker[0].text, "Baker Street");

    engine.rename_propagate(&mut doc, "baker", "221B Baker Street").unwrap();
    engine.clear(&mut doc).unwrap();

    let first = &doc.blocks()[0];
    assert_eq!(first.text(), "At Baker Street, Frodo waited.");
    assert!(first.runs.iter().any(|run| run.has_style("italic") && run.text == "Baker"));
    assert!(doc.text_nodes().iter().all(|node| node.entity.is_none()));
}

#[test]
fn document_loaded_from_json() {
    let json = r#"{
        "blocks": [
            { "runs": [ { "text": "Mr. Frodo " }, { "text": "returned", "marks": [ { "type": "style", "name": "bold" } ] } ] },
            { "runs": [ { "text": "to the Shire." } ] }
        ]
    }"#;
    let mut doc: MemoryDocument = serde_json::from_str(json).unwrap();
    let engine = AnnotationEngine::default();

    let outcome = engine.scan_and_sync(&mut doc, &catalog()).unwrap();
    assert_eq!(outcome.spans.len(), 2);
    assert!(outcome.spans[0].is_alias_match);

    assert!(engine.navigate_to(&mut doc, "shire").unwrap());
    assert_eq!(doc.text_between(doc.selection(), doc.selection() + 5), "Shire");
}
