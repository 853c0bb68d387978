//! KittMark: Entity Mention Annotation Engine
//!
//! A Rust/WASM engine that keeps a rich-text document's entity annotations in
//! sync with an entity catalog.
//!
//! # Architecture
//!
//! ## Annotation Components
//! - `catalog.rs` - EntityDefinition: names, aliases and kinds supplied per call
//! - `mention.rs` - MentionScanner: Unicode-aware whole-word name matching
//! - `document.rs` - AnnotatedDocument: host document contract + coordinates
//! - `memory.rs` - MemoryDocument: in-memory block/run document host
//! - `sync.rs` - Synchronizer: replace the entity-mark layer in one batch
//! - `cursor.rs` - Cursor resolver: boundary walk around a cursor
//! - `binder.rs` - Identity binder: occurrences, navigation, rename
//! - `change.rs` - ChangeDetector: skip identical rescans
//! - `engine.rs` - AnnotationEngine: scan → sync coordinator with busy flag
//! - `wasm.rs` - MentionEngine: JS bindings over an owned document
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { MentionEngine } from 'kittmark';
//!
//! await init();
//!
//! const engine = new MentionEngine({ skip_unchanged: true });
//! engine.loadDocument({ blocks: [{ runs: [{ text: 'John Watson met Holmes.' }] }] });
//!
//! const outcome = engine.scanAndSync([
//!   { id: 'e1', name: 'John Watson', kind: 'CHARACTER', aliases: ['Watson'] }
//! ]);
//!
//! console.log(outcome.spans);   // John Watson 0..11
//! console.log(outcome.report);  // removed / applied / dropped
//! console.log(outcome.stats);   // Timing per phase
//! ```

pub mod annotation;

pub use annotation::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Install panic hook and tracing subscriber for the browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(target_arch = "wasm32")]
    tracing_wasm::set_as_global_default();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("kittmark v{}", env!("CARGO_PKG_VERSION"))
}
