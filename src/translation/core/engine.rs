//! 文本替换引擎
//!
//! 引擎持有可翻译单元、译文缓存、代次计数器和状态机，`select_language`
//! 是唯一会改动页面的入口。
//!
//! ## 状态
//!
//! ```text
//! Original ──select(非默认)──▶ Translating(lang, gen) ──完成──▶ Translated(lang)
//!     ▲                              │  ▲                              │
//!     └──────select(默认)────────────┘  └──────select(其他语言)────────┘
//! ```
//!
//! 每次选择都会让代次加一。一次翻译过程在每个 await 之后检查代次，
//! 发现已被更新的选择取代时，把拿到的译文写入缓存后直接退出，不再改动页面。
//! 单元只在 `Original` 状态下重新扫描，因此无论页面当前显示哪种语言，
//! 缓存键与恢复内容始终是扫描时的原文。

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::translation::config::TranslationConfig;
use crate::translation::error::helpers::log_error;
use crate::translation::error::{ErrorStats, TranslationError, TranslationResult};
use crate::translation::languages::{find_language, Language};
use crate::translation::pipeline::{BatchPlanner, TextCollector, TextSource, TranslatableUnit};
use crate::translation::storage::{CacheStats, PreferenceStore, TranslationCache};

use super::backend::{RequestPacer, TranslationBackend};

/// 引擎状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassState {
    /// 页面显示原文
    Original,
    /// 正在翻译到 `target`
    Translating { target: String, generation: u64 },
    /// 页面显示 `lang` 的译文（缺失的条目保持原文）
    Translated(String),
}

/// 一次翻译过程的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub lang: String,
    pub generation: u64,
    /// 可翻译单元数
    pub units: usize,
    /// 去重后的源文本数
    pub distinct_strings: usize,
    /// 直接命中缓存的源文本数
    pub cache_hits: usize,
    /// 实际发出的后端请求数（含重试与逐条回退）
    pub requests: usize,
    /// 本次新获得译文的源文本数
    pub translated_strings: usize,
    /// 最终没有译文、保持原文的源文本数
    pub failed_strings: usize,
    pub errors: ErrorStats,
    pub duration: Duration,
}

/// `select_language` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// 已恢复原文
    Restored,
    /// 目标语言已是当前语言，什么都没做
    AlreadyActive,
    /// 翻译完成
    Translated(PassReport),
    /// 中途被更新的选择取代，结果只进了缓存
    Superseded(PassReport),
}

impl SelectionOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            SelectionOutcome::Translated(report) | SelectionOutcome::Superseded(report) => {
                Some(report)
            }
            _ => None,
        }
    }
}

/// 文本替换引擎
pub struct TranslationEngine<S, B, P>
where
    S: TextSource,
{
    source: S,
    backend: B,
    preferences: P,
    config: TranslationConfig,
    collector: TextCollector,
    planner: BatchPlanner,
    pacer: RequestPacer,
    units: RefCell<Vec<TranslatableUnit<S::Location>>>,
    cache: RefCell<TranslationCache>,
    generation: Cell<u64>,
    state: RefCell<PassState>,
}

impl<S, B, P> TranslationEngine<S, B, P>
where
    S: TextSource,
    B: TranslationBackend,
    P: PreferenceStore,
{
    pub fn new(source: S, backend: B, preferences: P, config: &TranslationConfig) -> Self {
        Self {
            collector: TextCollector::new(config),
            planner: BatchPlanner::from_config(config),
            pacer: RequestPacer::new(config.min_request_interval()),
            config: config.clone(),
            source,
            backend,
            preferences,
            units: RefCell::new(Vec::new()),
            cache: RefCell::new(TranslationCache::new()),
            generation: Cell::new(0),
            state: RefCell::new(PassState::Original),
        }
    }

    /// 用指定收集器替换默认收集器
    pub fn with_collector(mut self, collector: TextCollector) -> Self {
        self.collector = collector;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn preferences(&self) -> &P {
        &self.preferences
    }

    pub fn languages(&self) -> &[Language] {
        &self.config.languages
    }

    pub fn state(&self) -> PassState {
        self.state.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// 当前选中的语言：翻译中返回目标语言
    pub fn current_language(&self) -> String {
        match &*self.state.borrow() {
            PassState::Original => self.config.default_lang.clone(),
            PassState::Translating { target, .. } => target.clone(),
            PassState::Translated(lang) => lang.clone(),
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.borrow().len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().get_stats()
    }

    /// 选择语言
    ///
    /// 只有未知语言代码会返回错误，此时页面、状态和代次都不变。
    /// 后端失败只体现在返回的统计里，受影响的单元保持原文。
    pub async fn select_language(&self, code: &str) -> TranslationResult<SelectionOutcome> {
        let language = find_language(&self.config.languages, code)
            .ok_or_else(|| TranslationError::UnknownLanguage(code.trim().to_string()))?;
        let lang = language.code.clone();
        let is_default = self.config.is_default_lang(&lang);

        let already_active = match &*self.state.borrow() {
            PassState::Original => is_default,
            PassState::Translating { target, .. } => *target == lang,
            PassState::Translated(current) => *current == lang,
        };
        if already_active {
            tracing::debug!("语言 {} 已是当前语言", lang);
            // 页面已是原文时，显式选择默认语言仍要覆盖之前保存的语言
            if is_default {
                self.save_preference_if_changed(&lang);
            }
            return Ok(SelectionOutcome::AlreadyActive);
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        if is_default {
            self.restore_originals();
            *self.state.borrow_mut() = PassState::Original;
            self.save_preference(&lang);
            tracing::info!("已恢复原文 ({} 个单元)", self.unit_count());
            return Ok(SelectionOutcome::Restored);
        }

        Ok(self.run_pass(&lang, generation).await)
    }

    /// 启动时恢复保存的语言偏好
    ///
    /// 没有保存值、保存的是默认语言或未知代码时返回 `None`。
    /// 启动延迟期间如果已经有新的选择，也不再恢复。
    pub async fn restore_saved_language(&self) -> TranslationResult<Option<SelectionOutcome>> {
        let saved = match self.preferences.load() {
            Ok(saved) => saved,
            Err(e) => {
                log_error(&e);
                return Ok(None);
            }
        };

        let Some(code) = saved else {
            return Ok(None);
        };

        if find_language(&self.config.languages, &code).is_none() {
            tracing::warn!("忽略保存的未知语言: {}", code);
            return Ok(None);
        }

        if self.config.is_default_lang(&code) {
            return Ok(None);
        }

        let generation = self.generation.get();
        let delay = self.config.startup_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.generation.get() != generation {
            tracing::debug!("启动延迟期间已有新的选择，跳过恢复 {}", code);
            return Ok(None);
        }

        tracing::info!("恢复保存的语言: {}", code);
        self.select_language(&code).await.map(Some)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.get() != generation
    }

    async fn run_pass(&self, lang: &str, generation: u64) -> SelectionOutcome {
        let started = Instant::now();

        let rediscover = matches!(*self.state.borrow(), PassState::Original);
        if rediscover {
            let units = self.collector.collect(&self.source);
            *self.units.borrow_mut() = units;
        }
        *self.state.borrow_mut() = PassState::Translating {
            target: lang.to_string(),
            generation,
        };

        let keys = BatchPlanner::distinct_keys(&self.units.borrow());
        let mut report = PassReport {
            lang: lang.to_string(),
            generation,
            units: self.unit_count(),
            distinct_strings: keys.len(),
            ..Default::default()
        };

        let missing: Vec<String> = {
            let mut cache = self.cache.borrow_mut();
            keys.into_iter()
                .filter(|key| cache.lookup(key, lang).is_none())
                .collect()
        };
        report.cache_hits = report.distinct_strings - missing.len();

        // 命中缓存的立即生效，其余先显示原文
        self.apply(lang, None);

        tracing::info!(
            "开始翻译到 {}：{} 个单元，{} 条源文本，{} 条命中缓存",
            lang,
            report.units,
            report.distinct_strings,
            report.cache_hits
        );

        for batch in self.planner.plan(missing) {
            if self.is_stale(generation) {
                return self.superseded(report, started);
            }

            let results = self.translate_items(&batch.items, lang, generation, &mut report).await;
            let resolved = self.store_results(&batch.items, results, lang);
            report.translated_strings += resolved.len();
            report.failed_strings += batch.len() - resolved.len();

            if self.is_stale(generation) {
                return self.superseded(report, started);
            }

            if resolved.len() < batch.len() {
                tracing::warn!(
                    "批次 {} 有 {} 条未能翻译，保持原文",
                    batch.id,
                    batch.len() - resolved.len()
                );
            }
            self.apply(lang, Some(&resolved));
        }

        // 最终每个单元要么是当前语言的译文，要么是原文
        self.apply(lang, None);
        *self.state.borrow_mut() = PassState::Translated(lang.to_string());
        self.save_preference(lang);

        report.duration = started.elapsed();
        tracing::info!(
            "翻译到 {} 完成：请求 {} 次，新译 {} 条，失败 {} 条，耗时 {:?}",
            lang,
            report.requests,
            report.translated_strings,
            report.failed_strings,
            report.duration
        );

        SelectionOutcome::Translated(report)
    }

    fn superseded(&self, mut report: PassReport, started: Instant) -> SelectionOutcome {
        report.duration = started.elapsed();
        tracing::warn!(
            "翻译到 {} 的过程 (代次 {}) 已被新的选择取代，丢弃结果",
            report.lang,
            report.generation
        );
        SelectionOutcome::Superseded(report)
    }

    /// 翻译一个批次；整批失败且开启逐条回退时，逐条再试
    async fn translate_items(
        &self,
        items: &[String],
        lang: &str,
        generation: u64,
        report: &mut PassReport,
    ) -> Vec<Option<String>> {
        if let Some(parts) = self.request_with_retry(items, lang, generation, report).await {
            return parts.into_iter().map(Some).collect();
        }

        let mut results = vec![None; items.len()];
        if !self.config.single_fallback || items.len() < 2 || self.is_stale(generation) {
            return results;
        }

        tracing::info!("批次失败，逐条翻译 {} 条", items.len());
        for (index, item) in items.iter().enumerate() {
            let single = std::slice::from_ref(item);
            match self.request_with_retry(single, lang, generation, report).await {
                Some(mut parts) => results[index] = parts.pop(),
                None if self.is_stale(generation) => break,
                None => {}
            }
        }

        results
    }

    async fn request_with_retry(
        &self,
        items: &[String],
        lang: &str,
        generation: u64,
        report: &mut PassReport,
    ) -> Option<Vec<String>> {
        let attempts = self.config.max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let slot = self.pacer.acquire().await;
            if self.is_stale(generation) {
                return None;
            }

            report.requests += 1;
            let result = self
                .backend
                .translate(items, &self.config.default_lang, lang)
                .await;
            drop(slot);

            let error = match result {
                Ok(parts) if parts.len() == items.len() => return Some(parts),
                Ok(parts) => TranslationError::MalformedResponse(format!(
                    "期望 {} 条译文，实际 {} 条",
                    items.len(),
                    parts.len()
                )),
                Err(e) => e,
            };

            report.errors.record_error(&error);
            tracing::warn!(
                "{} 请求失败 (第 {}/{} 次): {}",
                self.backend.name(),
                attempt,
                attempts,
                error
            );

            if !error.is_retryable() || self.is_stale(generation) {
                return None;
            }
        }

        None
    }

    /// 写入缓存，返回得到译文的源文本
    fn store_results(
        &self,
        items: &[String],
        results: Vec<Option<String>>,
        lang: &str,
    ) -> HashSet<String> {
        let mut cache = self.cache.borrow_mut();
        let mut resolved = HashSet::new();

        for (item, result) in items.iter().zip(results) {
            match result {
                Some(translated) if !translated.trim().is_empty() => {
                    cache.insert(item, lang, translated);
                    resolved.insert(item.clone());
                }
                _ => {}
            }
        }

        resolved
    }

    /// 把缓存中的译文写回单元
    ///
    /// `only` 为 `None` 时处理所有单元，缺少译文的写回原文；
    /// 否则只处理键在集合中的单元。
    fn apply(&self, lang: &str, only: Option<&HashSet<String>>) {
        let units = self.units.borrow();
        let cache = self.cache.borrow();

        for unit in units.iter() {
            if let Some(keys) = only {
                if !keys.contains(&unit.key) {
                    continue;
                }
            }

            match cache.get(&unit.key, lang) {
                Some(translated) => self.source.write(&unit.location, &unit.render(translated)),
                None => self.source.write(&unit.location, &unit.original),
            }
        }
    }

    fn restore_originals(&self) {
        for unit in self.units.borrow().iter() {
            self.source.write(&unit.location, &unit.original);
        }
    }

    fn save_preference_if_changed(&self, code: &str) {
        match self.preferences.load() {
            Ok(Some(saved)) if saved.eq_ignore_ascii_case(code) => {}
            Ok(None) if self.config.is_default_lang(code) => {}
            _ => self.save_preference(code),
        }
    }

    fn save_preference(&self, code: &str) {
        if let Err(e) = self.preferences.save(code) {
            log_error(&e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::pipeline::MemoryTextSource;
    use crate::translation::storage::MemoryPreferenceStore;
    use async_trait::async_trait;

    /// 在每条文本前加上 `[lang]`
    #[derive(Default)]
    struct TaggingBackend {
        calls: Cell<usize>,
        drop_last: Cell<bool>,
    }

    #[async_trait(?Send)]
    impl TranslationBackend for TaggingBackend {
        async fn translate(
            &self,
            texts: &[String],
            _source_lang: &str,
            target_lang: &str,
        ) -> TranslationResult<Vec<String>> {
            self.calls.set(self.calls.get() + 1);
            let mut out: Vec<String> = texts
                .iter()
                .map(|t| format!("[{}] {}", target_lang, t))
                .collect();
            if self.drop_last.get() {
                out.pop();
            }
            Ok(out)
        }

        fn name(&self) -> &str {
            "tagging"
        }
    }

    fn config() -> TranslationConfig {
        TranslationConfig {
            min_request_interval_ms: 0,
            ..TranslationConfig::default()
        }
    }

    fn engine(
        texts: &[&str],
    ) -> TranslationEngine<MemoryTextSource, TaggingBackend, MemoryPreferenceStore> {
        TranslationEngine::new(
            MemoryTextSource::from_texts(texts),
            TaggingBackend::default(),
            MemoryPreferenceStore::new(),
            &config(),
        )
    }

    #[tokio::test]
    async fn test_translate_and_restore() {
        let engine = engine(&["Home", " About ", "Home"]);

        let outcome = engine.select_language("fr").await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.units, 3);
        assert_eq!(report.distinct_strings, 2);
        assert_eq!(report.requests, 1);
        assert_eq!(
            engine.source().texts(),
            vec!["[fr] Home", " [fr] About ", "[fr] Home"]
        );
        assert_eq!(engine.state(), PassState::Translated("fr".to_string()));
        assert_eq!(engine.preferences().value().as_deref(), Some("fr"));

        assert_eq!(engine.select_language("EN").await.unwrap(), SelectionOutcome::Restored);
        assert_eq!(engine.source().texts(), vec!["Home", " About ", "Home"]);
        assert_eq!(engine.state(), PassState::Original);
        assert_eq!(engine.preferences().value().as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_same_language_is_noop() {
        let engine = engine(&["Home"]);
        engine.select_language("de").await.unwrap();
        let generation = engine.generation();

        let outcome = engine.select_language("de").await.unwrap();
        assert_eq!(outcome, SelectionOutcome::AlreadyActive);
        assert_eq!(engine.generation(), generation);
        assert_eq!(engine.backend().calls.get(), 1);
    }

    #[tokio::test]
    async fn test_unknown_language_changes_nothing() {
        let engine = engine(&["Home"]);
        let result = engine.select_language("tlh").await;

        assert!(matches!(result, Err(TranslationError::UnknownLanguage(_))));
        assert_eq!(engine.generation(), 0);
        assert_eq!(engine.state(), PassState::Original);
        assert_eq!(engine.preferences().saves(), 0);
    }

    #[tokio::test]
    async fn test_short_response_keeps_originals() {
        let engine = engine(&["Home", "About"]);
        engine.backend().drop_last.set(true);

        let outcome = engine.select_language("it").await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.failed_strings, 2);
        assert_eq!(report.requests, 2);
        assert_eq!(report.errors.total_errors, 2);
        assert_eq!(engine.source().texts(), vec!["Home", "About"]);
        assert_eq!(engine.cache_stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_selecting_default_from_original_overwrites_saved_language() {
        let engine = TranslationEngine::new(
            MemoryTextSource::from_texts(&["Home"]),
            TaggingBackend::default(),
            MemoryPreferenceStore::with_value("fr"),
            &config(),
        );

        let outcome = engine.select_language("en").await.unwrap();
        assert_eq!(outcome, SelectionOutcome::AlreadyActive);
        assert_eq!(engine.preferences().value().as_deref(), Some("en"));
        assert_eq!(engine.preferences().saves(), 1);
        assert_eq!(engine.source().texts(), vec!["Home"]);
        assert_eq!(engine.backend().calls.get(), 0);

        // 已保存默认语言时不重复写入
        engine.select_language("en").await.unwrap();
        assert_eq!(engine.preferences().saves(), 1);
    }

    #[tokio::test]
    async fn test_saved_preference_restores_language() {
        let engine = TranslationEngine::new(
            MemoryTextSource::from_texts(&["Home"]),
            TaggingBackend::default(),
            MemoryPreferenceStore::with_value("es"),
            &config(),
        );

        let outcome = engine.restore_saved_language().await.unwrap();
        assert!(matches!(outcome, Some(SelectionOutcome::Translated(_))));
        assert_eq!(engine.source().texts(), vec!["[es] Home"]);
    }
}
