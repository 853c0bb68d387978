//! AnnotationEngine: coordinator for mention scanning and annotation sync
//!
//! # Design
//! 1. `scan_and_sync` = project → scan → apply, under a busy flag so two full
//!    layer replacements never interleave
//! 2. Identical inputs (text, catalog, current entity-mark layer) skip the
//!    rescan
//! 3. The catalog is passed on every call; the engine keeps no entity state
//!
//! # Usage
//! ```rust
//! use kittmark::{AnnotationEngine, EntityDefinition, EntityKind, MemoryDocument};
//!
//! let engine = AnnotationEngine::default();
//! let mut doc = MemoryDocument::from_paragraphs(&["Frodo left the Shire."]);
//! let catalog = vec![EntityDefinition::new("e1", "Frodo", EntityKind::Character)];
//!
//! let outcome = engine.scan_and_sync(&mut doc, &catalog).unwrap();
//! assert_eq!(outcome.spans.len(), 1);
//! assert_eq!(engine.occurrence_count(&doc, "e1"), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::binder::{self, Occurrence};
use super::catalog::EntityDefinition;
use super::change::{fingerprint, ChangeDetector};
use super::cursor::{self, DetectedMention};
use super::document::AnnotatedDocument;
use super::error::{EngineError, Result};
use super::mention::{MentionScanner, MentionSpan, ScannerConfig};
use super::sync::{self, SyncReport};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// Return the cached outcome when nothing a sync depends on has changed
    #[serde(default = "default_true")]
    pub skip_unchanged: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            skip_unchanged: true,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Timing per phase, microseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTimings {
    pub total_us: u64,
    pub project_us: u64,
    pub scan_us: u64,
    pub sync_us: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub timings: ScanTimings,
    /// Input fingerprint as hex (u64 would overflow JS Number.MAX_SAFE_INTEGER)
    pub fingerprint: String,
    pub was_skipped: bool,
    /// Projected text length in chars
    pub text_length: usize,
    pub mentions_found: usize,
}

/// Result of one `scan_and_sync`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub spans: Vec<MentionSpan>,
    pub report: SyncReport,
    pub stats: ScanStats,
}

// =============================================================================
// Busy flag
// =============================================================================

/// Proof that the holder owns the engine's busy flag; released on drop
#[derive(Debug)]
pub struct ScanGuard {
    flag: Rc<Cell<bool>>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

// =============================================================================
// AnnotationEngine
// =============================================================================

#[derive(Debug, Default)]
pub struct AnnotationEngine {
    config: EngineConfig,
    scanner: MentionScanner,
    busy: Rc<Cell<bool>>,
    change_detector: RefCell<ChangeDetector>,
    last_outcome: RefCell<Option<ScanOutcome>>,
}

impl AnnotationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            scanner: MentionScanner::new(config.scanner.clone()),
            config,
            busy: Rc::new(Cell::new(false)),
            change_detector: RefCell::new(ChangeDetector::new()),
            last_outcome: RefCell::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Take the busy flag, or fail if a scan or rename already holds it
    pub fn try_begin_scan(&self) -> Result<ScanGuard> {
        if self.busy.replace(true) {
            return Err(EngineError::ScanInProgress);
        }
        Ok(ScanGuard {
            flag: Rc::clone(&self.busy),
        })
    }

    /// Forget the cached outcome so the next scan always runs
    pub fn reset(&self) {
        self.change_detector.borrow_mut().reset();
        self.last_outcome.replace(None);
    }

    /// Percentage of scans answered from cache
    pub fn skip_rate(&self) -> f64 {
        self.change_detector.borrow().skip_rate()
    }

    /// Scan the document text and replace its entity marks in one transaction
    pub fn scan_and_sync<D>(
        &self,
        document: &mut D,
        catalog: &[EntityDefinition],
    ) -> Result<ScanOutcome>
    where
        D: AnnotatedDocument + ?Sized,
    {
        let guard = self.try_begin_scan()?;
        self.scan_and_sync_with(&guard, document, catalog)
    }

    /// `scan_and_sync` for a caller that already holds the busy flag
    pub fn scan_and_sync_with<D>(
        &self,
        _guard: &ScanGuard,
        document: &mut D,
        catalog: &[EntityDefinition],
    ) -> Result<ScanOutcome>
    where
        D: AnnotatedDocument + ?Sized,
    {
        let overall_start = instant::Instant::now();

        let project_start = instant::Instant::now();
        let projection = document.project_text();
        let project_us = project_start.elapsed().as_micros() as u64;

        let change = self
            .change_detector
            .borrow_mut()
            .check(fingerprint(&projection.text, catalog, &*document));

        if self.config.skip_unchanged && !change.has_changed {
            if let Some(cached) = self.last_outcome.borrow().as_ref() {
                tracing::debug!(fingerprint = change.fingerprint, "inputs unchanged; scan skipped");
                let mut outcome = cached.clone();
                outcome.report = SyncReport::default();
                outcome.stats.was_skipped = true;
                outcome.stats.timings = ScanTimings {
                    total_us: overall_start.elapsed().as_micros() as u64,
                    project_us,
                    ..ScanTimings::default()
                };
                return Ok(outcome);
            }
        }

        let scan_start = instant::Instant::now();
        let spans = self.scanner.scan(catalog, &projection.text);
        let scan_us = scan_start.elapsed().as_micros() as u64;

        let sync_start = instant::Instant::now();
        let report = sync::apply(document, &spans, &projection)?;
        let sync_us = sync_start.elapsed().as_micros() as u64;

        let settled = fingerprint(&projection.text, catalog, &*document);
        self.change_detector.borrow_mut().record(settled);

        let outcome = ScanOutcome {
            stats: ScanStats {
                timings: ScanTimings {
                    total_us: overall_start.elapsed().as_micros() as u64,
                    project_us,
                    scan_us,
                    sync_us,
                },
                fingerprint: format!("{:x}", settled),
                was_skipped: false,
                text_length: projection.text.chars().count(),
                mentions_found: spans.len(),
            },
            spans,
            report,
        };

        tracing::debug!(
            mentions = outcome.stats.mentions_found,
            dropped = outcome.report.dropped.len(),
            total_us = outcome.stats.timings.total_us,
            "scan and sync finished"
        );

        self.last_outcome.replace(Some(outcome.clone()));
        Ok(outcome)
    }

    /// Remove every entity mark from the document
    pub fn clear<D>(&self, document: &mut D) -> Result<SyncReport>
    where
        D: AnnotatedDocument + ?Sized,
    {
        let _guard = self.try_begin_scan()?;
        sync::clear(document)
    }

    pub fn resolve_at<D>(
        &self,
        document: &D,
        cursor: usize,
        catalog: &[EntityDefinition],
    ) -> Vec<DetectedMention>
    where
        D: AnnotatedDocument + ?Sized,
    {
        cursor::resolve_at(document, cursor, catalog)
    }

    pub fn rename_propagate<D>(
        &self,
        document: &mut D,
        entity_id: &str,
        new_name: &str,
    ) -> Result<usize>
    where
        D: AnnotatedDocument + ?Sized,
    {
        let _guard = self.try_begin_scan()?;
        binder::rename_propagate(document, entity_id, new_name)
    }

    pub fn find_occurrences<D>(&self, document: &D, entity_id: &str) -> Vec<Occurrence>
    where
        D: AnnotatedDocument + ?Sized,
    {
        binder::find_occurrences(document, entity_id)
    }

    pub fn occurrence_count<D>(&self, document: &D, entity_id: &str) -> usize
    where
        D: AnnotatedDocument + ?Sized,
    {
        binder::occurrence_count(document, entity_id)
    }

    pub fn navigate_to<D>(&self, document: &mut D, entity_id: &str) -> Result<bool>
    where
        D: AnnotatedDocument + ?Sized,
    {
        binder::navigate_to(document, entity_id)
    }

    pub fn navigate_to_occurrence<D>(
        &self,
        document: &mut D,
        entity_id: &str,
        index: usize,
    ) -> Result<bool>
    where
        D: AnnotatedDocument + ?Sized,
    {
        binder::navigate_to_occurrence(document, entity_id, index)
    }
}

// =============================================================================
// Tests
// =============================================================================
