//! MemoryDocument: in-memory block/run document tree
//!
//! A document is a list of blocks (paragraphs); each block is a list of text
//! runs carrying marks. Positions count one unit per char plus one structural
//! token on each side of every block:
//!
//! ```text
//!  0   1 2 3 4   5   6   7 8 9   10
//!  <p> a b c d  </p> <p> x y z  </p>
//! ```
//!
//! The plain-text projection joins blocks with `"\n\n"`, which keeps the
//! plain → document offset at a constant `+1`.
//!
//! Mark batches are applied to a copy of the blocks and swapped in, so a
//! failed batch leaves the document untouched.

use serde::{Deserialize, Serialize};

use super::document::{AnnotatedDocument, EntityMark, MarkOp, TextNode, TextProjection};
use super::error::DocumentError;

/// Separator between blocks in the plain-text projection
const BLOCK_SEPARATOR: &str = "\n\n";

/// Plain offset 0 lands just inside the first block's open token
const STRUCTURAL_OFFSET: usize = 1;

// =============================================================================
// Tree types
// =============================================================================

/// Inline mark on a text run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    Entity(EntityMark),
    /// Any other inline formatting (bold, link, comment, ...)
    Style { name: String },
}

/// A run of text sharing one set of marks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default)]
    pub marks: Vec<Mark>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn styled(text: impl Into<String>, styles: &[&str]) -> Self {
        Self {
            text: text.into(),
            marks: styles
                .iter()
                .map(|name| Mark::Style {
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    pub fn with_entity(mut self, mark: EntityMark) -> Self {
        self.set_entity(Some(mark));
        self
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn entity(&self) -> Option<&EntityMark> {
        self.marks.iter().find_map(|mark| match mark {
            Mark::Entity(entity) => Some(entity),
            Mark::Style { .. } => None,
        })
    }

    /// Entity marks exclude each other; the entity mark is kept last
    pub fn set_entity(&mut self, mark: Option<EntityMark>) {
        self.marks.retain(|m| !matches!(m, Mark::Entity(_)));
        if let Some(mark) = mark {
            self.marks.push(Mark::Entity(mark));
        }
    }

    pub fn has_style(&self, name: &str) -> bool {
        self.marks
            .iter()
            .any(|mark| matches!(mark, Mark::Style { name: n } if n == name))
    }

    fn canonicalize(&mut self) {
        let entity = self.marks.iter().rev().find_map(|mark| match mark {
            Mark::Entity(entity) => Some(entity.clone()),
            Mark::Style { .. } => None,
        });
        self.set_entity(entity);
    }

    /// Split at `at` chars; `self` keeps the head
    fn split_off(&mut self, at: usize) -> TextRun {
        let byte = self
            .text
            .char_indices()
            .nth(at)
            .map(|(byte, _)| byte)
            .unwrap_or(self.text.len());
        TextRun {
            text: self.text.split_off(byte),
            marks: self.marks.clone(),
        }
    }
}

/// A text block (paragraph)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub runs: Vec<TextRun>,
}

impl Block {
    pub fn new(runs: Vec<TextRun>) -> Self {
        let mut block = Self { runs };
        block.normalize();
        block
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(vec![TextRun::plain(text)])
    }

    pub fn char_len(&self) -> usize {
        self.runs.iter().map(TextRun::char_len).sum()
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Drop empty runs, merge neighbours with equal marks
    fn normalize(&mut self) {
        let mut merged: Vec<TextRun> = Vec::with_capacity(self.runs.len());
        for mut run in self.runs.drain(..) {
            if run.text.is_empty() {
                continue;
            }
            run.canonicalize();
            match merged.last_mut() {
                Some(last) if last.marks == run.marks => last.text.push_str(&run.text),
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }

    /// Ensure a run boundary exists at char offset `at`
    fn split_at(&mut self, at: usize) {
        let mut run_start = 0;
        for idx in 0..self.runs.len() {
            let len = self.runs[idx].char_len();
            if at > run_start && at < run_start + len {
                let tail = self.runs[idx].split_off(at - run_start);
                self.runs.insert(idx + 1, tail);
                return;
            }
            run_start += len;
            if run_start >= at {
                return;
            }
        }
    }

    /// Apply one op to the block-local char range `[from, to)`
    fn apply(&mut self, from: usize, to: usize, op: &MarkOp) {
        self.split_at(from);
        self.split_at(to);

        let mut run_start = 0;
        for run in &mut self.runs {
            let run_end = run_start + run.char_len();
            if run_start >= from && run_end <= to {
                match op {
                    MarkOp::Remove { .. } => run.set_entity(None),
                    MarkOp::Add { mark, .. } => run.set_entity(Some(mark.clone())),
                }
            }
            run_start = run_end;
        }

        self.normalize();
    }
}

// =============================================================================
// Serialized form
// =============================================================================

/// Wire shape of a [`MemoryDocument`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentData {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub selection: usize,
    #[serde(default = "default_true")]
    pub entity_marks: bool,
}

fn default_true() -> bool {
    true
}

impl From<DocumentData> for MemoryDocument {
    fn from(data: DocumentData) -> Self {
        let mut document = MemoryDocument::from_blocks(data.blocks);
        document.entity_marks = data.entity_marks;
        document.selection = data.selection.min(document.size);
        document
    }
}

impl From<MemoryDocument> for DocumentData {
    fn from(document: MemoryDocument) -> Self {
        Self {
            blocks: document.blocks,
            selection: document.selection,
            entity_marks: document.entity_marks,
        }
    }
}

// =============================================================================
// MemoryDocument
// =============================================================================

/// In-memory annotated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DocumentData", into = "DocumentData")]
pub struct MemoryDocument {
    blocks: Vec<Block>,
    /// Content start position of each block
    starts: Vec<usize>,
    size: usize,
    selection: usize,
    revision: u64,
    entity_marks: bool,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::from_blocks(Vec::new())
    }
}

impl MemoryDocument {
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut document = Self {
            blocks,
            starts: Vec::new(),
            size: 0,
            selection: 0,
            revision: 0,
            entity_marks: true,
        };
        for block in &mut document.blocks {
            block.normalize();
        }
        document.relayout();
        document
    }

    /// One plain paragraph per string
    pub fn from_paragraphs(paragraphs: &[&str]) -> Self {
        Self::from_blocks(paragraphs.iter().map(|text| Block::paragraph(*text)).collect())
    }

    /// Toggle schema support for entity marks
    pub fn with_entity_marks(mut self, enabled: bool) -> Self {
        self.entity_marks = enabled;
        self
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn relayout(&mut self) {
        self.starts.clear();
        let mut pos = 0;
        for block in &self.blocks {
            self.starts.push(pos + 1);
            pos += block.char_len() + 2;
        }
        self.size = pos;
    }

    /// Block index and block-local offset of the char at `pos`
    fn locate(&self, pos: usize) -> Option<(usize, usize)> {
        let idx = self.starts.partition_point(|&start| start <= pos).checked_sub(1)?;
        let local = pos - self.starts[idx];
        (local < self.blocks[idx].char_len()).then_some((idx, local))
    }

    fn validate(&self, from: usize, to: usize) -> Result<(), DocumentError> {
        if from > to || to > self.size {
            return Err(DocumentError::RangeOutOfBounds {
                from,
                to,
                size: self.size,
            });
        }
        Ok(())
    }
}

impl AnnotatedDocument for MemoryDocument {
    fn content_size(&self) -> usize {
        self.size
    }

    fn supports_entity_marks(&self) -> bool {
        self.entity_marks
    }

    fn text_nodes(&self) -> Vec<TextNode<'_>> {
        let mut nodes = Vec::new();
        for (block, &start) in self.blocks.iter().zip(&self.starts) {
            let mut pos = start;
            for run in &block.runs {
                let len = run.char_len();
                nodes.push(TextNode {
                    from: pos,
                    to: pos + len,
                    text: &run.text,
                    entity: run.entity(),
                });
                pos += len;
            }
        }
        nodes
    }

    fn entity_mark_on_char(&self, pos: usize) -> Option<&EntityMark> {
        let (idx, local) = self.locate(pos)?;
        let mut run_start = 0;
        for run in &self.blocks[idx].runs {
            let run_end = run_start + run.char_len();
            if local < run_end {
                return run.entity();
            }
            run_start = run_end;
        }
        None
    }

    fn text_between(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        for node in self.text_nodes() {
            let start = from.max(node.from);
            let end = to.min(node.to);
            if start < end {
                out.extend(node.text.chars().skip(start - node.from).take(end - start));
            }
        }
        out
    }

    fn project_text(&self) -> TextProjection {
        let text = self
            .blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR);
        TextProjection {
            text,
            offset: STRUCTURAL_OFFSET,
        }
    }

    fn apply_marks(&mut self, ops: &[MarkOp]) -> Result<(), DocumentError> {
        for op in ops {
            let (from, to) = op.range();
            self.validate(from, to)?;
        }
        if ops.is_empty() {
            return Ok(());
        }

        let mut blocks = self.blocks.clone();
        for op in ops {
            let (from, to) = op.range();
            for (block, &start) in blocks.iter_mut().zip(&self.starts) {
                let end = start + block.char_len();
                let local_from = from.max(start);
                let local_to = to.min(end);
                if local_from < local_to {
                    block.apply(local_from - start, local_to - start, op);
                }
            }
        }

        self.blocks = blocks;
        self.relayout();
        self.revision += 1;
        Ok(())
    }

    fn selection(&self) -> usize {
        self.selection
    }

    fn set_selection(&mut self, pos: usize) -> Result<(), DocumentError> {
        if pos > self.size {
            return Err(DocumentError::SelectionOutOfBounds {
                pos,
                size: self.size,
            });
        }
        self.selection = pos;
        Ok(())
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

// =============================================================================
// Tests
// =============================================================================
