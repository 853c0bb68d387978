//! MentionScanner: Entity Name Matching in Plain Text
//!
//! Finds every place a catalogued entity's name or alias appears in the
//! plain-text projection of a document.
//!
//! # Matching rules
//! - Entities are tried **longest name first**, so "John Watson" claims its
//!   span before "John" gets a chance. Within one entity, longer aliases
//!   go before a shorter name ("Mr. Frodo" before "Frodo").
//! - Matching is case-insensitive and word-delimited. Word boundaries are
//!   Unicode-aware (`regex` semantics), so "Том" is found in Cyrillic prose.
//! - The first accepted span wins; later matches that overlap it are dropped.
//!
//! Offsets are counted in chars, not bytes, so they translate directly into
//! document positions.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::catalog::{EntityDefinition, EntityKind};

// =============================================================================
// Types
// =============================================================================

/// Scanner configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
    /// Require word boundaries around names that start/end with word chars
    #[serde(default = "default_true")]
    pub whole_words: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            whole_words: true,
        }
    }
}

/// A detected entity mention in plain text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MentionSpan {
    pub entity_id: String,
    pub entity_name: String,
    pub entity_kind: EntityKind,
    /// Text exactly as it appears in the document
    pub matched_text: String,
    /// Char offset, inclusive
    pub start: usize,
    /// Char offset, exclusive
    pub end: usize,
    pub is_alias_match: bool,
}

impl MentionSpan {
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        start < self.end && end > self.start
    }
}

// =============================================================================
// Char offsets
// =============================================================================

/// Byte → char offset table for one text
struct CharOffsets {
    byte_starts: Vec<usize>,
}

impl CharOffsets {
    fn new(text: &str) -> Self {
        Self {
            byte_starts: text.char_indices().map(|(byte, _)| byte).collect(),
        }
    }

    /// `byte` must sit on a char boundary (regex matches always do)
    fn char_index(&self, byte: usize) -> usize {
        match self.byte_starts.binary_search(&byte) {
            Ok(idx) | Err(idx) => idx,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// =============================================================================
// MentionScanner
// =============================================================================

/// Stateless entity mention scanner
#[derive(Debug, Clone, Default)]
pub struct MentionScanner {
    config: ScannerConfig,
}

impl MentionScanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Scan `text` for every entity in `catalog`.
    ///
    /// Output is sorted by `start` and free of overlaps.
    pub fn scan(&self, catalog: &[EntityDefinition], text: &str) -> Vec<MentionSpan> {
        if catalog.is_empty() || text.is_empty() {
            return vec![];
        }

        let offsets = CharOffsets::new(text);

        // Stable sort keeps catalog order among equal lengths
        let mut ordered: Vec<&EntityDefinition> = catalog.iter().collect();
        ordered.sort_by(|a, b| b.name.chars().count().cmp(&a.name.chars().count()));

        let mut accepted: Vec<MentionSpan> = Vec::new();

        for entity in ordered {
            let mut names: Vec<(&str, bool)> = entity
                .search_names()
                .map(|(name, is_alias)| (name.trim(), is_alias))
                .filter(|(name, _)| !name.is_empty())
                .collect();
            names.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

            let mut searched: HashSet<String> = HashSet::new();

            for (name, is_alias) in names {
                let key = if self.config.case_insensitive {
                    name.to_lowercase()
                } else {
                    name.to_string()
                };
                if !searched.insert(key) {
                    continue;
                }

                let Some(pattern) = self.compile(name) else {
                    continue;
                };

                for mat in pattern.find_iter(text) {
                    let start = offsets.char_index(mat.start());
                    let end = offsets.char_index(mat.end());

                    if accepted.iter().any(|span| span.overlaps(start, end)) {
                        continue;
                    }

                    accepted.push(MentionSpan {
                        entity_id: entity.id.clone(),
                        entity_name: entity.name.clone(),
                        entity_kind: entity.kind,
                        matched_text: mat.as_str().to_string(),
                        start,
                        end,
                        is_alias_match: is_alias,
                    });
                }
            }
        }

        accepted.sort_by_key(|span| span.start);
        accepted
    }

    /// Build the matcher for one name. Metacharacters are escaped.
    fn compile(&self, name: &str) -> Option<Regex> {
        let escaped = regex::escape(name);

        let pattern = if self.config.whole_words {
            let lead = name.chars().next().is_some_and(is_word_char);
            let trail = name.chars().last().is_some_and(is_word_char);
            format!(
                "{}{}{}",
                if lead { r"\b" } else { "" },
                escaped,
                if trail { r"\b" } else { "" }
            )
        } else {
            escaped
        };

        RegexBuilder::new(&pattern)
            .case_insensitive(self.config.case_insensitive)
            .build()
            .map_err(|e| {
                tracing::warn!(name, error = %e, "skipping entity name that failed to compile");
            })
            .ok()
    }
}

/// Scan with the default configuration
pub fn scan(catalog: &[EntityDefinition], text: &str) -> Vec<MentionSpan> {
    MentionScanner::default().scan(catalog, text)
}

// =============================================================================
// Tests
// =============================================================================
