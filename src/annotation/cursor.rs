//! Cursor Mention Resolver
//!
//! Given a cursor position, finds the entity marks touching it and recovers
//! each mark's full extent by walking neighbouring chars. The walk goes char
//! by char, so a mention split over several text nodes (mixed formatting, a
//! partial rename) still resolves to one range.

use serde::{Deserialize, Serialize};

use super::catalog::{find_entity, EntityDefinition};
use super::document::AnnotatedDocument;

/// An entity mention under the cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedMention {
    pub entity: EntityDefinition,
    pub from: usize,
    pub to: usize,
    pub text: String,
}

fn carries<D>(document: &D, pos: usize, entity_id: &str) -> bool
where
    D: AnnotatedDocument + ?Sized,
{
    document
        .entity_mark_on_char(pos)
        .is_some_and(|mark| mark.entity_id == entity_id)
}

/// Extent `[from, to)` of the run of chars marked `entity_id` containing `anchor`
pub fn walk_boundaries<D>(document: &D, anchor: usize, entity_id: &str) -> (usize, usize)
where
    D: AnnotatedDocument + ?Sized,
{
    let mut from = anchor;
    while from > 0 && carries(document, from - 1, entity_id) {
        from -= 1;
    }

    let mut to = anchor + 1;
    while carries(document, to, entity_id) {
        to += 1;
    }

    (from, to)
}

/// Resolve the mentions at `cursor` against `catalog`.
///
/// Marks whose entity is missing from the catalog are skipped.
pub fn resolve_at<D>(
    document: &D,
    cursor: usize,
    catalog: &[EntityDefinition],
) -> Vec<DetectedMention>
where
    D: AnnotatedDocument + ?Sized,
{
    if !document.supports_entity_marks() || cursor > document.content_size() {
        return vec![];
    }

    let mut entity_ids: Vec<String> = Vec::new();
    for mark in document.entity_marks_at(cursor) {
        if !entity_ids.contains(&mark.entity_id) {
            entity_ids.push(mark.entity_id.clone());
        }
    }

    let mut detected = Vec::new();
    for entity_id in entity_ids {
        let Some(entity) = find_entity(catalog, &entity_id) else {
            tracing::debug!(
                %entity_id,
                cursor,
                "mark references an entity no longer in the catalog"
            );
            continue;
        };

        let anchor = match cursor.checked_sub(1) {
            Some(before) if carries(document, before, &entity_id) => before,
            _ => cursor,
        };
        if !carries(document, anchor, &entity_id) {
            continue;
        }

        let (from, to) = walk_boundaries(document, anchor, &entity_id);
        detected.push(DetectedMention {
            entity: entity.clone(),
            from,
            to,
            text: document.text_between(from, to),
        });
    }

    detected
}

// =============================================================================
// Tests
// =============================================================================
