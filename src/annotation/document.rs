//! Host document contract
//!
//! The engine never owns a document. It talks to one through
//! [`AnnotatedDocument`]: read text nodes and entity marks, project to plain
//! text, apply a batch of mark operations atomically, move the selection.
//!
//! # Coordinates
//! Document positions and plain-text offsets differ by a fixed structural
//! offset reported by [`TextProjection::offset`]. Convert with
//! [`TextProjection::to_document`] / [`TextProjection::to_text`]; never mix
//! the two spaces directly.

use serde::{Deserialize, Serialize};

use super::catalog::{EntityDefinition, EntityKind};
use super::error::DocumentError;

// =============================================================================
// Marks
// =============================================================================

/// Attributes of an entity mark attached to a text range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityMark {
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub entity_name: String,
}

impl EntityMark {
    pub fn for_entity(entity: &EntityDefinition) -> Self {
        Self {
            entity_id: entity.id.clone(),
            entity_kind: entity.kind,
            entity_name: entity.name.clone(),
        }
    }

    pub fn renamed(&self, entity_name: &str) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            ..self.clone()
        }
    }
}

/// One entry of an atomic mark batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MarkOp {
    /// Detach entity marks from `[from, to)`
    Remove { from: usize, to: usize },
    /// Attach `mark` to `[from, to)`, replacing any entity mark there
    Add { from: usize, to: usize, mark: EntityMark },
}

impl MarkOp {
    pub fn range(&self) -> (usize, usize) {
        match self {
            MarkOp::Remove { from, to } | MarkOp::Add { from, to, .. } => (*from, *to),
        }
    }
}

/// A text-bearing node, in document coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode<'a> {
    pub from: usize,
    pub to: usize,
    pub text: &'a str,
    pub entity: Option<&'a EntityMark>,
}

// =============================================================================
// Projection
// =============================================================================

/// Plain-text view of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextProjection {
    pub text: String,
    /// Document position of plain-text offset 0
    pub offset: usize,
}

impl TextProjection {
    pub fn to_document(&self, text_offset: usize) -> usize {
        text_offset + self.offset
    }

    /// `None` for positions before the first projected char
    pub fn to_text(&self, position: usize) -> Option<usize> {
        position.checked_sub(self.offset)
    }
}

// =============================================================================
// AnnotatedDocument
// =============================================================================

/// Document tree surface the engine depends on
pub trait AnnotatedDocument {
    /// Size of the document in position units
    fn content_size(&self) -> usize;

    /// Whether the document schema allows entity marks at all
    fn supports_entity_marks(&self) -> bool {
        true
    }

    /// Every text node in document order
    fn text_nodes(&self) -> Vec<TextNode<'_>>;

    /// Entity mark on the char occupying `[pos, pos + 1)`.
    ///
    /// `None` when `pos` is structural, out of range or unmarked.
    fn entity_mark_on_char(&self, pos: usize) -> Option<&EntityMark>;

    /// Literal text of `[from, to)`, structural positions skipped
    fn text_between(&self, from: usize, to: usize) -> String;

    fn project_text(&self) -> TextProjection;

    /// Apply every op or none of them
    fn apply_marks(&mut self, ops: &[MarkOp]) -> Result<(), DocumentError>;

    fn selection(&self) -> usize;

    fn set_selection(&mut self, pos: usize) -> Result<(), DocumentError>;

    /// Incremented once per successful `apply_marks` batch
    fn revision(&self) -> u64;

    /// Entity marks "at" a cursor position.
    ///
    /// A cursor takes the entity mark of the char before it, falling back to
    /// the char after it (start of a block, or start of a marked word).
    fn entity_marks_at(&self, pos: usize) -> Vec<&EntityMark> {
        if pos > self.content_size() {
            return vec![];
        }

        pos.checked_sub(1)
            .and_then(|before| self.entity_mark_on_char(before))
            .or_else(|| self.entity_mark_on_char(pos))
            .into_iter()
            .collect()
    }
}
