//! Identity Binder
//!
//! Queries and rewrites keyed by entity id: occurrence listing, navigation
//! and rename propagation. Occurrences are found by walking text nodes and
//! merging touching nodes that carry the same entity id. Nothing here creates
//! a new range; rename only swaps the mark's display name.

use serde::{Deserialize, Serialize};

use super::document::{AnnotatedDocument, EntityMark, MarkOp};
use super::error::Result;

/// A realized entity mark in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub from: usize,
    pub to: usize,
    pub text: String,
    /// Mark found at `from`
    pub mark: EntityMark,
}

/// Every contiguous range marked with `entity_id`, in document order
pub fn find_occurrences<D>(document: &D, entity_id: &str) -> Vec<Occurrence>
where
    D: AnnotatedDocument + ?Sized,
{
    let mut occurrences: Vec<Occurrence> = Vec::new();

    for node in document.text_nodes() {
        let Some(mark) = node.entity.filter(|mark| mark.entity_id == entity_id) else {
            continue;
        };

        match occurrences.last_mut() {
            Some(last) if last.to == node.from => {
                last.to = node.to;
                last.text.push_str(node.text);
            }
            _ => occurrences.push(Occurrence {
                from: node.from,
                to: node.to,
                text: node.text.to_string(),
                mark: mark.clone(),
            }),
        }
    }

    occurrences
}

pub fn occurrence_count<D>(document: &D, entity_id: &str) -> usize
where
    D: AnnotatedDocument + ?Sized,
{
    find_occurrences(document, entity_id).len()
}

/// Rewrite the display name on every occurrence of `entity_id`.
///
/// Ranges are kept as they are. Returns how many occurrences were rewritten;
/// nothing is dispatched when there are none.
pub fn rename_propagate<D>(document: &mut D, entity_id: &str, new_name: &str) -> Result<usize>
where
    D: AnnotatedDocument + ?Sized,
{
    if !document.supports_entity_marks() {
        tracing::warn!(entity_id, "document schema has no entity marks; rename skipped");
        return Ok(0);
    }

    let occurrences = find_occurrences(document, entity_id);
    if occurrences.is_empty() {
        return Ok(0);
    }

    let ops: Vec<MarkOp> = occurrences
        .iter()
        .flat_map(|occurrence| {
            [
                MarkOp::Remove {
                    from: occurrence.from,
                    to: occurrence.to,
                },
                MarkOp::Add {
                    from: occurrence.from,
                    to: occurrence.to,
                    mark: occurrence.mark.renamed(new_name),
                },
            ]
        })
        .collect();

    document.apply_marks(&ops)?;
    tracing::debug!(entity_id, new_name, count = occurrences.len(), "entity renamed in document");
    Ok(occurrences.len())
}

/// Move the selection to the start of the first occurrence
pub fn navigate_to<D>(document: &mut D, entity_id: &str) -> Result<bool>
where
    D: AnnotatedDocument + ?Sized,
{
    navigate_to_occurrence(document, entity_id, 0)
}

/// Move the selection to the start of occurrence `index` (0-based)
pub fn navigate_to_occurrence<D>(document: &mut D, entity_id: &str, index: usize) -> Result<bool>
where
    D: AnnotatedDocument + ?Sized,
{
    let Some(target) = find_occurrences(document, entity_id).get(index).map(|o| o.from) else {
        return Ok(false);
    };
    document.set_selection(target)?;
    Ok(true)
}

// =============================================================================
// Tests
// =============================================================================
