//! 翻译缓存模块
//!
//! 以 (源文本, 目标语言) 为键保存译文。条目在会话内只增不减，
//! 同一键第一次写入后不再覆盖。

use std::collections::HashMap;

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub lang: String,
    pub text: String,
}

impl CacheKey {
    pub fn new(text: &str, lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
            text: text.to_string(),
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_entries: usize,
    /// 已存在而被忽略的写入
    pub ignored_inserts: u64,
}

/// 翻译缓存
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: HashMap<CacheKey, String>,
    stats: CacheStats,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询并记录命中统计
    pub fn lookup(&mut self, text: &str, lang: &str) -> Option<String> {
        self.stats.total_requests += 1;

        match self.entries.get(&CacheKey::new(text, lang)) {
            Some(translated) => {
                self.stats.cache_hits += 1;
                Some(translated.clone())
            }
            None => {
                self.stats.cache_misses += 1;
                None
            }
        }
    }

    /// 只读查询，不计入统计
    pub fn get(&self, text: &str, lang: &str) -> Option<&str> {
        self.entries
            .get(&CacheKey::new(text, lang))
            .map(String::as_str)
    }

    /// 写入译文；键已存在时保留旧值并返回 `false`
    pub fn insert(&mut self, text: &str, lang: &str, translated: String) -> bool {
        let key = CacheKey::new(text, lang);
        if self.entries.contains_key(&key) {
            self.stats.ignored_inserts += 1;
            return false;
        }

        self.entries.insert(key, translated);
        self.stats.total_entries = self.entries.len();
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_stats(&self) -> CacheStats {
        self.stats.clone()
    }
}
