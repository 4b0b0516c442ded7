//! 翻译系统核心模块
//!
//! ```text
//! TranslationEngine (engine.rs)
//!     ├── TextCollector (pipeline/collector.rs)
//!     ├── BatchPlanner (pipeline/batch.rs)
//!     ├── TranslationCache (storage/cache.rs)
//!     ├── PreferenceStore (storage/preference.rs)
//!     └── TranslationBackend + RequestPacer (backend.rs)
//! ```

pub mod backend;
pub mod engine;

pub use backend::{build_backend, DeepLxBackend, MyMemoryBackend, RequestPacer, TranslationBackend};
pub use engine::{PassReport, PassState, SelectionOutcome, TranslationEngine};
