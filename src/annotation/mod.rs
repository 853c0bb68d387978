pub mod catalog;
pub mod mention;
pub mod document;
pub mod memory;
pub mod sync;
pub mod cursor;
pub mod binder;
pub mod change;
pub mod engine;
pub mod error;
pub mod wasm;

pub use catalog::*;
pub use mention::*;
pub use document::*;
pub use memory::*;
pub use sync::{DroppedSpan, SyncReport};
pub use cursor::*;
pub use binder::*;
pub use change::*;
pub use engine::*;
pub use error::{DocumentError, EngineError};
pub use wasm::*;
