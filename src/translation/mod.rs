//! 翻译模块
//!
//! 页面文本的翻译与恢复：
//! - **pipeline**: 文本来源、过滤、收集与批次规划
//! - **core**: 翻译后端与引擎状态机
//! - **storage**: 译文缓存与语言偏好
//! - **config**: 配置管理
//! - **languages**: 语言目录
//! - **ui**: 下拉菜单交互
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use page_translator::translation::{
//!     MemoryPreferenceStore, MemoryTextSource, TranslationConfig, TranslationEngine,
//! };
//! use page_translator::translation::core::build_backend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TranslationConfig::default();
//! let source = MemoryTextSource::from_texts(&["Welcome", "Getting started"]);
//! let engine = TranslationEngine::new(
//!     source,
//!     build_backend(&config)?,
//!     MemoryPreferenceStore::new(),
//!     &config,
//! );
//!
//! engine.select_language("fr").await?;
//! engine.select_language("en").await?; // 恢复原文
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod languages;
pub mod pipeline;
pub mod storage;
pub mod ui;

pub use config::{constants, BackendKind, ConfigManager, ScanMode, TranslationConfig};
pub use self::core::{
    build_backend, PassReport, PassState, SelectionOutcome, TranslationBackend,
    TranslationEngine,
};
pub use error::{ErrorCategory, ErrorSeverity, ErrorStats, TranslationError, TranslationResult};
pub use languages::{default_languages, find_language, Language};
pub use pipeline::{DomTextSource, MemoryTextSource, ScanStrategy, TextSource};
pub use storage::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use ui::{MenuCommand, MenuEvent, SelectorMenu};
