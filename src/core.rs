use std::cell::RefCell;
use std::error::Error;
use std::fmt;

use encoding_rs::Encoding;
use markup5ever_rcdom::{Handle, RcDom};

use crate::parsers::html::{
    get_charset, html_to_dom, inject_language_selector, serialize_document,
    set_menu_visibility, update_selector_label,
};
use crate::translation::error::helpers::log_error;
use crate::translation::languages::find_language;
use crate::translation::ui::{MenuCommand, MenuEvent, SelectorMenu};
use crate::translation::{
    DomTextSource, PreferenceStore, SelectionOutcome, TranslationBackend, TranslationConfig,
    TranslationEngine, TranslationError, TranslationResult,
};

/// Represents errors that can occur while processing a page
#[derive(Debug)]
pub struct PageTranslatorError {
    details: String,
}

impl PageTranslatorError {
    pub fn new(msg: &str) -> PageTranslatorError {
        PageTranslatorError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for PageTranslatorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for PageTranslatorError {}

impl From<TranslationError> for PageTranslatorError {
    fn from(error: TranslationError) -> Self {
        PageTranslatorError::new(&error.to_string())
    }
}

impl From<std::io::Error> for PageTranslatorError {
    fn from(error: std::io::Error) -> Self {
        PageTranslatorError::new(&format!("IO error: {error}"))
    }
}

/// Document-level options
#[derive(Clone, Debug)]
pub struct PageOptions {
    /// Charset to decode the input with; the document's own declaration wins when valid
    pub encoding: Option<String>,
    pub inject_selector: bool,
    /// Language to select after loading; `None` falls back to the saved preference
    pub target_lang: Option<String>,
    pub restore_saved: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            inject_selector: true,
            target_lang: None,
            restore_saved: true,
        }
    }
}

/// Extracts the charset parameter of a Content-Type value
pub fn content_type_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .map(|value| value.trim_matches('"').to_string())
        .find(|value| !value.is_empty())
}

/// 编码处理器
pub struct EncodingProcessor;

impl EncodingProcessor {
    pub fn new() -> Self {
        Self
    }

    /// 解析文档；文档内声明了有效字符集时按声明重新解析
    pub fn process_encoding(
        &self,
        input_data: &[u8],
        input_encoding: Option<String>,
    ) -> Result<(RcDom, String), PageTranslatorError> {
        let mut document_encoding = input_encoding.unwrap_or_else(|| "utf-8".to_string());
        let mut dom = html_to_dom(input_data, &document_encoding)?;

        if let Some(html_charset) = get_charset(&dom.document) {
            if !html_charset.is_empty() {
                if let Some(document_charset) =
                    Encoding::for_label_no_replacement(html_charset.as_bytes())
                {
                    if !document_charset.name().eq_ignore_ascii_case(&document_encoding) {
                        dom = html_to_dom(input_data, document_charset.name())?;
                    }
                    document_encoding = html_charset;
                }
            }
        }

        Ok((dom, document_encoding))
    }
}

impl Default for EncodingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// 一个已加载页面：文档、下拉菜单与翻译引擎
pub struct PageSession<B, P>
where
    B: TranslationBackend,
    P: PreferenceStore,
{
    dom: RcDom,
    encoding: String,
    config: TranslationConfig,
    engine: TranslationEngine<DomTextSource, B, P>,
    menu: RefCell<SelectorMenu>,
    has_selector: bool,
}

impl<B, P> PageSession<B, P>
where
    B: TranslationBackend,
    P: PreferenceStore,
{
    /// 包装已解析的文档；`inject_selector` 为真时在页头注入下拉菜单
    ///
    /// 找不到页头锚点只记录警告，翻译功能照常可用。
    pub fn new(
        dom: RcDom,
        encoding: String,
        config: &TranslationConfig,
        backend: B,
        preferences: P,
        inject_selector: bool,
    ) -> Self {
        let mut has_selector = false;

        if inject_selector {
            match find_language(&config.languages, &config.default_lang) {
                Some(current) => match inject_language_selector(
                    &dom.document,
                    &config.header_anchors,
                    &config.languages,
                    current,
                ) {
                    Ok(_) => has_selector = true,
                    Err(e) => log_error(&e),
                },
                None => log_error(&TranslationError::UnknownLanguage(config.default_lang.clone())),
            }
        }

        let source = DomTextSource::new(dom.document.clone());
        let engine = TranslationEngine::new(source, backend, preferences, config);

        Self {
            dom,
            encoding,
            config: config.clone(),
            engine,
            menu: RefCell::new(SelectorMenu::new()),
            has_selector,
        }
    }

    /// 解析字节并创建会话
    pub fn from_data(
        input_data: &[u8],
        options: &PageOptions,
        config: &TranslationConfig,
        backend: B,
        preferences: P,
    ) -> Result<Self, PageTranslatorError> {
        let (dom, encoding) =
            EncodingProcessor::new().process_encoding(input_data, options.encoding.clone())?;
        Ok(Self::new(
            dom,
            encoding,
            config,
            backend,
            preferences,
            options.inject_selector,
        ))
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn engine(&self) -> &TranslationEngine<DomTextSource, B, P> {
        &self.engine
    }

    pub fn has_selector(&self) -> bool {
        self.has_selector
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu.borrow().is_open()
    }

    /// 选择语言，先更新按钮标签再翻译
    pub async fn select_language(&self, code: &str) -> TranslationResult<SelectionOutcome> {
        let language = find_language(&self.config.languages, code)
            .ok_or_else(|| TranslationError::UnknownLanguage(code.trim().to_string()))?;

        if self.has_selector {
            update_selector_label(&self.dom.document, language);
        }

        self.engine.select_language(&language.code).await
    }

    /// 处理下拉菜单事件
    pub async fn handle_menu_event(
        &self,
        event: MenuEvent,
    ) -> TranslationResult<Option<SelectionOutcome>> {
        let (command, open) = {
            let mut menu = self.menu.borrow_mut();
            let command = menu.handle(event);
            (command, menu.is_open())
        };

        if self.has_selector {
            set_menu_visibility(&self.dom.document, open);
        }

        match command {
            Some(MenuCommand::Select(code)) => self.select_language(&code).await.map(Some),
            None => Ok(None),
        }
    }

    /// 恢复保存的语言并同步按钮标签
    pub async fn restore_saved_language(&self) -> TranslationResult<Option<SelectionOutcome>> {
        let outcome = self.engine.restore_saved_language().await?;

        if outcome.is_some() && self.has_selector {
            let current = self.engine.current_language();
            if let Some(language) = find_language(&self.config.languages, &current) {
                update_selector_label(&self.dom.document, language);
            }
        }

        Ok(outcome)
    }

    /// 序列化当前文档
    pub fn to_html(&self) -> Result<Vec<u8>, PageTranslatorError> {
        Ok(serialize_document(&self.dom, &self.encoding)?)
    }
}

/// 加载页面，按选项选择语言，返回处理后的 HTML
///
/// 未知语言代码是唯一的错误来源；后端失败时对应文本保持原文。
pub async fn translate_page_from_data<B, P>(
    input_data: &[u8],
    options: &PageOptions,
    config: &TranslationConfig,
    backend: B,
    preferences: P,
) -> Result<Vec<u8>, PageTranslatorError>
where
    B: TranslationBackend,
    P: PreferenceStore,
{
    let session = PageSession::from_data(input_data, options, config, backend, preferences)?;

    let outcome = match &options.target_lang {
        Some(code) => Some(session.select_language(code).await?),
        None if options.restore_saved => session.restore_saved_language().await?,
        None => None,
    };

    if let Some(report) = outcome.as_ref().and_then(SelectionOutcome::report) {
        if report.failed_strings > 0 {
            tracing::warn!("{} 条文本未能翻译，保持原文", report.failed_strings);
        }
    }

    session.to_html()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_translator_error_new() {
        let error = PageTranslatorError::new("test error");
        assert_eq!(error.details, "test error");
    }

    #[test]
    fn test_translation_error_converts() {
        let error: PageTranslatorError = TranslationError::UnknownLanguage("xx".into()).into();
        assert!(error.to_string().contains("xx"));
    }

    #[test]
    fn test_content_type_charset() {
        assert_eq!(
            content_type_charset("text/html; charset=\"ISO-8859-2\"").as_deref(),
            Some("ISO-8859-2")
        );
        assert_eq!(content_type_charset("text/html"), None);
        assert_eq!(content_type_charset("charset=utf-8"), None);
    }

    #[test]
    fn test_declared_charset_wins() {
        let html = b"<html><head><meta charset=\"windows-1252\"></head><body><p>Caf\xe9</p></body></html>";
        let (dom, encoding) = EncodingProcessor::new()
            .process_encoding(html, None)
            .unwrap();

        assert_eq!(encoding, "windows-1252");
        let out = serialize_document(&dom, &encoding).unwrap();
        assert!(out.windows(4).any(|w| w == b"Caf\xe9"));
    }
}
