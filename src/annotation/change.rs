//! ChangeDetector: Content-Addressable Change Detection
//!
//! Fingerprints everything a sync depends on (projected text, catalog
//! snapshot, the document's current entity-mark layer) so an identical
//! rescan can be skipped. A match means the layer already equals what the
//! sync would write, whichever document it is computed on.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::catalog::EntityDefinition;
use super::document::AnnotatedDocument;

// =============================================================================
// Types
// =============================================================================

/// Result of change detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeResult {
    /// True if the inputs differ from the last recorded fingerprint
    pub has_changed: bool,
    pub fingerprint: u64,
}

/// Hash of the inputs to one sync against `document`
pub fn fingerprint<D>(text: &str, catalog: &[EntityDefinition], document: &D) -> u64
where
    D: AnnotatedDocument + ?Sized,
{
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    catalog.hash(&mut hasher);
    document.supports_entity_marks().hash(&mut hasher);
    for node in document.text_nodes() {
        if let Some(mark) = node.entity {
            (node.from, node.to, mark).hash(&mut hasher);
        }
    }
    hasher.finish()
}

// =============================================================================
// ChangeDetector
// =============================================================================

/// Remembers the fingerprint of the last completed sync
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    last_hash: Option<u64>,
    check_count: u64,
    skip_count: u64,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `fingerprint` with the last recorded one
    pub fn check(&mut self, fingerprint: u64) -> ChangeResult {
        self.check_count += 1;

        let has_changed = self.last_hash != Some(fingerprint);
        if !has_changed {
            self.skip_count += 1;
        }

        ChangeResult {
            has_changed,
            fingerprint,
        }
    }

    /// Record the fingerprint of a finished sync
    pub fn record(&mut self, fingerprint: u64) {
        self.last_hash = Some(fingerprint);
    }

    /// Skip rate as percentage
    pub fn skip_rate(&self) -> f64 {
        if self.check_count == 0 {
            return 0.0;
        }
        (self.skip_count as f64 / self.check_count as f64) * 100.0
    }

    pub fn check_count(&self) -> u64 {
        self.check_count
    }

    pub fn skip_count(&self) -> u64 {
        self.skip_count
    }

    pub fn last_hash(&self) -> Option<u64> {
        self.last_hash
    }

    pub fn reset(&mut self) {
        self.last_hash = None;
        self.check_count = 0;
        self.skip_count = 0;
    }
}

// =============================================================================
// Tests
// =============================================================================
