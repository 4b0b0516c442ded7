//! 存储模块
//!
//! 会话内的译文缓存与跨会话的语言偏好。

pub mod cache;
pub mod preference;

pub use cache::{CacheKey, CacheStats, TranslationCache};
pub use preference::{FilePreferenceStore, MemoryPreferenceStore, PreferenceRecord, PreferenceStore};
