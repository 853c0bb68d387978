//! Annotation Synchronizer
//!
//! Replaces the whole entity-mark layer of a document with the marks implied
//! by a list of [`MentionSpan`]s, in a single `apply_marks` batch. Old marks
//! are removed and new ones added against the same pre-mutation snapshot;
//! mark ops never change text length, so no position remapping is needed.

use serde::{Deserialize, Serialize};

use super::document::{AnnotatedDocument, EntityMark, MarkOp, TextProjection};
use super::error::Result;
use super::mention::MentionSpan;

/// A span that could not be placed in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedSpan {
    pub span: MentionSpan,
    pub from: usize,
    pub to: usize,
    pub document_size: usize,
}

/// What a sync did to the document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Entity-marked text nodes cleared
    pub removed: usize,
    /// Marks written
    pub applied: usize,
    pub dropped: Vec<DroppedSpan>,
    /// The document has no entity marks in its schema; nothing was done
    pub unsupported: bool,
}

impl SyncReport {
    fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::default()
        }
    }
}

/// Make the entity-mark layer match `spans` exactly.
///
/// `projection` must be the projection the spans were computed against.
pub fn apply<D>(
    document: &mut D,
    spans: &[MentionSpan],
    projection: &TextProjection,
) -> Result<SyncReport>
where
    D: AnnotatedDocument + ?Sized,
{
    if !document.supports_entity_marks() {
        tracing::warn!("document schema has no entity marks; sync skipped");
        return Ok(SyncReport::unsupported());
    }

    let size = document.content_size();
    let mut report = SyncReport::default();

    let mut ops: Vec<MarkOp> = document
        .text_nodes()
        .into_iter()
        .filter(|node| node.entity.is_some())
        .map(|node| MarkOp::Remove {
            from: node.from,
            to: node.to,
        })
        .collect();
    report.removed = ops.len();

    for span in spans {
        let from = projection.to_document(span.start);
        let to = projection.to_document(span.end);

        if from > to || to > size {
            tracing::warn!(
                entity_id = %span.entity_id,
                from,
                to,
                size,
                "dropping mention outside the document"
            );
            report.dropped.push(DroppedSpan {
                span: span.clone(),
                from,
                to,
                document_size: size,
            });
            continue;
        }

        ops.push(MarkOp::Add {
            from,
            to,
            mark: EntityMark {
                entity_id: span.entity_id.clone(),
                entity_kind: span.entity_kind,
                entity_name: span.entity_name.clone(),
            },
        });
        report.applied += 1;
    }

    if !ops.is_empty() {
        document.apply_marks(&ops)?;
    }

    tracing::debug!(
        removed = report.removed,
        applied = report.applied,
        dropped = report.dropped.len(),
        "entity marks synchronized"
    );
    Ok(report)
}

/// Remove every entity mark
pub fn clear<D>(document: &mut D) -> Result<SyncReport>
where
    D: AnnotatedDocument + ?Sized,
{
    let projection = document.project_text();
    apply(document, &[], &projection)
}

// =============================================================================
// Tests
// =============================================================================
