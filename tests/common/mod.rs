// 集成测试公共模块
//
// 提供脚本化的翻译后端、引擎构建器和 HTML 辅助工具

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use markup5ever_rcdom::RcDom;

use page_translator::parsers::{html_to_dom, serialize_document};
use page_translator::translation::{
    MemoryPreferenceStore, MemoryTextSource, TranslationBackend, TranslationConfig,
    TranslationEngine, TranslationError, TranslationResult,
};

/// 后端收到的一次请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub texts: Vec<String>,
    pub source_lang: String,
    pub target_lang: String,
}

/// 可编排行为的测试后端
///
/// 默认把每条文本译成 `[lang] text`。
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    requests: RefCell<Vec<RecordedRequest>>,
    delays: RefCell<HashMap<String, Duration>>,
    failing_texts: RefCell<HashSet<String>>,
    mismatched_texts: RefCell<HashSet<String>>,
    fail_next: Cell<usize>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 对某个目标语言的请求延迟响应
    pub fn with_delay(self, lang: &str, delay: Duration) -> Self {
        self.delays.borrow_mut().insert(lang.to_string(), delay);
        self
    }

    /// 包含该文本的请求一律失败
    pub fn failing_on(self, text: &str) -> Self {
        self.failing_texts.borrow_mut().insert(text.to_string());
        self
    }

    /// 包含该文本的请求少返回一条译文
    pub fn mismatching_on(self, text: &str) -> Self {
        self.mismatched_texts.borrow_mut().insert(text.to_string());
        self
    }

    /// 接下来的 `count` 次请求失败
    pub fn fail_next(self, count: usize) -> Self {
        self.fail_next.set(count);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// 某条文本被请求翻译到 `lang` 的次数
    pub fn times_requested(&self, text: &str, lang: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.target_lang == lang)
            .filter(|request| request.texts.iter().any(|t| t == text))
            .count()
    }

    /// 同时在途请求数的最大值
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.get()
    }

    pub fn translation_of(text: &str, lang: &str) -> String {
        format!("[{}] {}", lang, text)
    }

    async fn respond(&self, texts: &[String], target_lang: &str) -> TranslationResult<Vec<String>> {
        let delay = self.delays.borrow().get(target_lang).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_next.get() > 0 {
            self.fail_next.set(self.fail_next.get() - 1);
            return Err(TranslationError::BackendUnavailable("scripted outage".to_string()));
        }

        if texts.iter().any(|t| self.failing_texts.borrow().contains(t)) {
            return Err(TranslationError::BackendUnavailable("connection refused".to_string()));
        }

        let mut translated: Vec<String> = texts
            .iter()
            .map(|t| Self::translation_of(t, target_lang))
            .collect();

        if texts.iter().any(|t| self.mismatched_texts.borrow().contains(t)) {
            translated.pop();
        }

        Ok(translated)
    }
}

#[async_trait(?Send)]
impl TranslationBackend for ScriptedBackend {
    async fn translate(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        self.requests.borrow_mut().push(RecordedRequest {
            texts: texts.to_vec(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        });

        self.in_flight.set(self.in_flight.get() + 1);
        self.max_in_flight
            .set(self.max_in_flight.get().max(self.in_flight.get()));

        let result = self.respond(texts, target_lang).await;

        self.in_flight.set(self.in_flight.get() - 1);
        result
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub type TestEngine = TranslationEngine<MemoryTextSource, ScriptedBackend, MemoryPreferenceStore>;

/// 测试配置：不节流
pub fn test_config() -> TranslationConfig {
    TranslationConfig {
        min_request_interval_ms: 0,
        ..TranslationConfig::default()
    }
}

/// 测试引擎构建器
pub struct EngineBuilder {
    config: TranslationConfig,
    texts: Vec<String>,
    backend: ScriptedBackend,
    preferences: MemoryPreferenceStore,
}

impl EngineBuilder {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            config: test_config(),
            texts: texts.iter().map(|t| t.to_string()).collect(),
            backend: ScriptedBackend::new(),
            preferences: MemoryPreferenceStore::new(),
        }
    }

    pub fn backend(mut self, backend: ScriptedBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn saved_language(mut self, code: &str) -> Self {
        self.preferences = MemoryPreferenceStore::with_value(code);
        self
    }

    pub fn configure<F: FnOnce(&mut TranslationConfig)>(mut self, f: F) -> Self {
        f(&mut self.config);
        self
    }

    pub fn build(self) -> TestEngine {
        let texts: Vec<&str> = self.texts.iter().map(String::as_str).collect();
        TranslationEngine::new(
            MemoryTextSource::from_texts(&texts),
            self.backend,
            self.preferences,
            &self.config,
        )
    }
}

/// HTML 测试辅助工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn create_test_dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").expect("Failed to parse test HTML")
    }

    pub fn to_string(dom: &RcDom) -> String {
        let bytes = serialize_document(dom, "utf-8").expect("Failed to serialize test DOM");
        String::from_utf8(bytes).expect("Serialized DOM should be UTF-8")
    }

    /// 带页头、导航与正文的文档页面
    pub fn create_docs_page() -> String {
        r#"<!DOCTYPE html>
<html>
<head><title>Docs</title></head>
<body>
  <header class="md-header">
    <div class="md-header__inner"><span class="md-header__title">Project</span></div>
  </header>
  <nav><a class="md-nav__link" href="/">Home</a> <a class="md-nav__link" href="/about/">About</a></nav>
  <div class="md-content">
    <h1>Getting started</h1>
    <p>Install the package first.</p>
    <p>Home</p>
    <pre><code>cargo install page-translator</code></pre>
    <p><img src="logo.png" alt="Logo"> 42</p>
    <p>https://example.com/docs</p>
  </div>
</body>
</html>"#
            .to_string()
    }

    /// 没有任何页头锚点的页面
    pub fn create_headerless_page() -> String {
        r#"<!DOCTYPE html>
<html><body><main><p>Welcome aboard</p></main></body></html>"#
            .to_string()
    }
}
