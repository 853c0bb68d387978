//! MentionEngine: JS-facing wrapper owning one in-memory document
//!
//! Catalogs, documents and results cross the boundary as plain JS objects
//! through `serde-wasm-bindgen`. The catalog is passed on every call.
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! const engine = new MentionEngine(null);
//! engine.loadDocument({ blocks: [{ runs: [{ text: 'Frodo left the Shire.' }] }] });
//!
//! const catalog = [{ id: 'e1', name: 'Frodo', kind: 'CHARACTER', aliases: [] }];
//! const outcome = await engine.scanAndSyncDeferred(catalog);
//! console.log(outcome.stats.timings.total_us);
//!
//! engine.renameEntity('e1', 'Mr. Frodo');
//! ```

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use super::binder::Occurrence;
use super::catalog::EntityDefinition;
use super::cursor::DetectedMention;
use super::document::AnnotatedDocument;
use super::engine::{AnnotationEngine, EngineConfig, ScanOutcome};
use super::error::Result;
use super::memory::MemoryDocument;
use super::sync::SyncReport;

struct EngineState {
    engine: AnnotationEngine,
    document: RefCell<MemoryDocument>,
}

#[wasm_bindgen]
pub struct MentionEngine {
    state: Rc<EngineState>,
}

impl Default for MentionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl MentionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: Rc::new(EngineState {
                engine: AnnotationEngine::new(config),
                document: RefCell::new(MemoryDocument::default()),
            }),
        }
    }

    pub fn engine(&self) -> &AnnotationEngine {
        &self.state.engine
    }

    /// Replace the owned document; the next scan always runs
    pub fn load_document(&self, document: MemoryDocument) {
        self.state.document.replace(document);
        self.state.engine.reset();
    }

    pub fn document(&self) -> Ref<'_, MemoryDocument> {
        self.state.document.borrow()
    }

    pub fn scan_and_sync(&self, catalog: &[EntityDefinition]) -> Result<ScanOutcome> {
        let mut document = self.state.document.borrow_mut();
        self.state.engine.scan_and_sync(&mut *document, catalog)
    }

    pub fn clear(&self) -> Result<SyncReport> {
        let mut document = self.state.document.borrow_mut();
        self.state.engine.clear(&mut *document)
    }

    pub fn resolve_at(&self, cursor: usize, catalog: &[EntityDefinition]) -> Vec<DetectedMention> {
        self.state.engine.resolve_at(&*self.document(), cursor, catalog)
    }

    pub fn rename_entity(&self, entity_id: &str, new_name: &str) -> Result<usize> {
        let mut document = self.state.document.borrow_mut();
        self.state.engine.rename_propagate(&mut *document, entity_id, new_name)
    }

    pub fn find_occurrences(&self, entity_id: &str) -> Vec<Occurrence> {
        self.state.engine.find_occurrences(&*self.document(), entity_id)
    }

    pub fn occurrence_count(&self, entity_id: &str) -> usize {
        self.state.engine.occurrence_count(&*self.document(), entity_id)
    }

    pub fn navigate_to(&self, entity_id: &str) -> Result<bool> {
        let mut document = self.state.document.borrow_mut();
        self.state.engine.navigate_to(&mut *document, entity_id)
    }

    pub fn navigate_to_occurrence(&self, entity_id: &str, index: usize) -> Result<bool> {
        let mut document = self.state.document.borrow_mut();
        self.state.engine.navigate_to_occurrence(&mut *document, entity_id, index)
    }

    pub fn set_selection(&self, pos: usize) -> Result<()> {
        self.state.document.borrow_mut().set_selection(pos)?;
        Ok(())
    }

    pub fn selection(&self) -> usize {
        self.document().selection()
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

fn parse_catalog(catalog: JsValue) -> std::result::Result<Vec<EntityDefinition>, JsValue> {
    serde_wasm_bindgen::from_value(catalog)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse catalog: {}", e)))
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
        web_sys::console::error_1(&format!("[MentionEngine] serialization failed: {}", e).into());
        JsValue::NULL
    })
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
impl MentionEngine {
    /// Create engine (JS binding); `null`/`undefined` config means defaults
    #[wasm_bindgen(constructor)]
    pub fn js_new(config: JsValue) -> std::result::Result<MentionEngine, JsValue> {
        if config.is_null() || config.is_undefined() {
            return Ok(Self::default());
        }
        let config: EngineConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {}", e)))?;
        Ok(Self::new(config))
    }

    /// Expects { blocks: [{ runs: [{ text, marks? }] }], selection?, entity_marks? }
    #[wasm_bindgen(js_name = "loadDocument")]
    pub fn js_load_document(&self, document: JsValue) -> std::result::Result<(), JsValue> {
        let document: MemoryDocument = serde_wasm_bindgen::from_value(document)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse document: {}", e)))?;
        self.load_document(document);
        Ok(())
    }

    #[wasm_bindgen(js_name = "document")]
    pub fn js_document(&self) -> JsValue {
        to_js(&*self.document())
    }

    /// Scan and sync now; throws if a scan is already running
    #[wasm_bindgen(js_name = "scanAndSync")]
    pub fn js_scan_and_sync(&self, catalog: JsValue) -> std::result::Result<JsValue, JsValue> {
        let catalog = parse_catalog(catalog)?;
        let outcome = self.scan_and_sync(&catalog).map_err(js_error)?;
        Ok(to_js(&outcome))
    }

    /// Scan and sync after one turn of the event loop.
    ///
    /// The busy flag is taken before yielding, so a second call made in the
    /// meantime rejects instead of queueing.
    #[wasm_bindgen(js_name = "scanAndSyncDeferred")]
    pub fn js_scan_and_sync_deferred(&self, catalog: JsValue) -> js_sys::Promise {
        let state = Rc::clone(&self.state);

        future_to_promise(async move {
            let catalog = parse_catalog(catalog)?;
            let guard = state.engine.try_begin_scan().map_err(js_error)?;

            JsFuture::from(js_sys::Promise::resolve(&JsValue::NULL)).await?;

            let outcome = {
                let mut document = state.document.borrow_mut();
                state
                    .engine
                    .scan_and_sync_with(&guard, &mut *document, &catalog)
                    .map_err(js_error)?
            };
            drop(guard);
            Ok(to_js(&outcome))
        })
    }

    #[wasm_bindgen(js_name = "clear")]
    pub fn js_clear(&self) -> std::result::Result<JsValue, JsValue> {
        let report = self.clear().map_err(js_error)?;
        Ok(to_js(&report))
    }

    /// Entities under the cursor as [{ entity, from, to, text }]
    #[wasm_bindgen(js_name = "resolveAt")]
    pub fn js_resolve_at(
        &self,
        cursor: usize,
        catalog: JsValue,
    ) -> std::result::Result<JsValue, JsValue> {
        let catalog = parse_catalog(catalog)?;
        Ok(to_js(&self.resolve_at(cursor, &catalog)))
    }

    #[wasm_bindgen(js_name = "renameEntity")]
    pub fn js_rename_entity(
        &self,
        entity_id: &str,
        new_name: &str,
    ) -> std::result::Result<usize, JsValue> {
        self.rename_entity(entity_id, new_name).map_err(js_error)
    }

    #[wasm_bindgen(js_name = "findOccurrences")]
    pub fn js_find_occurrences(&self, entity_id: &str) -> JsValue {
        to_js(&self.find_occurrences(entity_id))
    }

    #[wasm_bindgen(js_name = "navigateTo")]
    pub fn js_navigate_to(&self, entity_id: &str) -> std::result::Result<bool, JsValue> {
        self.navigate_to(entity_id).map_err(js_error)
    }

    #[wasm_bindgen(js_name = "navigateToOccurrence")]
    pub fn js_navigate_to_occurrence(
        &self,
        entity_id: &str,
        index: usize,
    ) -> std::result::Result<bool, JsValue> {
        self.navigate_to_occurrence(entity_id, index).map_err(js_error)
    }

    #[wasm_bindgen(js_name = "occurrenceCount")]
    pub fn js_occurrence_count(&self, entity_id: &str) -> usize {
        self.occurrence_count(entity_id)
    }

    #[wasm_bindgen(js_name = "setSelection")]
    pub fn js_set_selection(&self, pos: usize) -> std::result::Result<(), JsValue> {
        self.set_selection(pos).map_err(js_error)
    }

    #[wasm_bindgen(js_name = "selection")]
    pub fn js_selection(&self) -> usize {
        self.selection()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::catalog::EntityKind;
    use crate::annotation::error::{DocumentError, EngineError};

    fn catalog() -> Vec<EntityDefinition> {
        vec![
            EntityDefinition::new("e1", "Frodo", EntityKind::Character).with_aliases(["Mr. Frodo"]),
            EntityDefinition::new("e2", "Shire", EntityKind::Location),
        ]
    }

    fn loaded(paragraphs: &[&str]) -> MentionEngine {
        let engine = MentionEngine::default();
        engine.load_document(MemoryDocument::from_paragraphs(paragraphs));
        engine
    }

    // -------------------------------------------------------------------------
    // Requirement 1: Owned document round trip
    // -------------------------------------------------------------------------
    #[test]
    fn test_scan_then_query() {
        let engine = loaded(&["Mr. Frodo left the Shire.", "Frodo wept."]);

        let outcome = engine.scan_and_sync(&catalog()).unwrap();
        assert_eq!(outcome.spans.len(), 3);
        assert_eq!(engine.occurrence_count("e1"), 2);
        assert_eq!(engine.find_occurrences("e1")[0].text, "Mr. Frodo");

        let found = engine.resolve_at(5, &catalog());
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].from, found[0].to), (1, 10));
    }

    // -------------------------------------------------------------------------
    // Requirement 2: Loading a document resets change detection
    // -------------------------------------------------------------------------
    #[test]
    fn test_load_document_forces_rescan() {
        let engine = loaded(&["Frodo"]);
        engine.scan_and_sync(&catalog()).unwrap();

        engine.load_document(MemoryDocument::from_paragraphs(&["Frodo"]));
        let outcome = engine.scan_and_sync(&catalog()).unwrap();
        assert!(!outcome.stats.was_skipped);
        assert_eq!(engine.occurrence_count("e1"), 1);
    }

    // -------------------------------------------------------------------------
    // Requirement 3: Rename, navigate, selection, clear
    // -------------------------------------------------------------------------
    #[test]
    fn test_binder_operations() {
        let engine = loaded(&["Frodo left the Shire.", "Frodo wept."]);
        engine.scan_and_sync(&catalog()).unwrap();

        assert_eq!(engine.rename_entity("e1", "Frodo Baggins").unwrap(), 2);
        assert!(engine
            .find_occurrences("e1")
            .iter()
            .all(|o| o.mark.entity_name == "Frodo Baggins"));

        assert!(engine.navigate_to_occurrence("e1", 1).unwrap());
        assert_eq!(engine.selection(), 24);
        assert!(engine.navigate_to("e2").unwrap());
        assert_eq!(engine.selection(), 16);

        engine.set_selection(0).unwrap();
        assert_eq!(
            engine.set_selection(99).unwrap_err(),
            EngineError::Document(DocumentError::SelectionOutOfBounds { pos: 99, size: 36 })
        );

        assert_eq!(engine.clear().unwrap().removed, 3);
        assert_eq!(engine.occurrence_count("e1"), 0);
    }

    // -------------------------------------------------------------------------
    // Requirement 4: A held scan blocks the owned document's writers
    // -------------------------------------------------------------------------
    #[test]
    fn test_held_scan_rejects_writers() {
        let engine = loaded(&["Frodo"]);
        let guard = engine.engine().try_begin_scan().unwrap();

        assert_eq!(engine.scan_and_sync(&catalog()).unwrap_err(), EngineError::ScanInProgress);
        assert_eq!(engine.clear().unwrap_err(), EngineError::ScanInProgress);

        drop(guard);
        assert!(engine.scan_and_sync(&catalog()).is_ok());
    }
}
