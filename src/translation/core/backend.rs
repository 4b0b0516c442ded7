//! 翻译后端
//!
//! 引擎只依赖 [`TranslationBackend`]：输入一批字符串和目标语言，返回等长、
//! 同序的译文列表。HTTP 适配器负责拼接与拆分，数量不一致时返回
//! `MalformedResponse`。

use std::cell::Cell;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::translation::config::{BackendKind, TranslationConfig};
use crate::translation::error::helpers::malformed;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::DelimiterCodec;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// 翻译后端接口
///
/// 引擎运行在单线程上，future 不要求 `Send`。
#[async_trait(?Send)]
pub trait TranslationBackend {
    async fn translate(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<Vec<String>>;

    fn name(&self) -> &str;
}

#[async_trait(?Send)]
impl<T: TranslationBackend + ?Sized> TranslationBackend for Box<T> {
    async fn translate(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        (**self).translate(texts, source_lang, target_lang).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// 请求节流
///
/// 同一时刻只有一个请求在途；上一个请求结束后至少间隔 `interval`
/// 才发出下一个。被取代的翻译过程持有的请求也占用这个名额。
#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    slot: Mutex<()>,
    last_finished: Cell<Option<Instant>>,
}

/// 在途请求的名额，释放时记录结束时间
#[derive(Debug)]
pub struct PacerSlot<'a> {
    _slot: MutexGuard<'a, ()>,
    last_finished: &'a Cell<Option<Instant>>,
}

impl Drop for PacerSlot<'_> {
    fn drop(&mut self) {
        self.last_finished.set(Some(Instant::now()));
    }
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            slot: Mutex::new(()),
            last_finished: Cell::new(None),
        }
    }

    /// 等到名额空闲且间隔已满，返回的名额在请求结束前不要释放
    pub async fn acquire(&self) -> PacerSlot<'_> {
        let slot = self.slot.lock().await;

        if let Some(last) = self.last_finished.get() {
            let ready_at = last + self.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }

        PacerSlot {
            _slot: slot,
            last_finished: &self.last_finished,
        }
    }
}

fn build_client(config: &TranslationConfig) -> TranslationResult<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| TranslationError::ConfigError(format!("HTTP客户端创建失败: {}", e)))
}

/// 按配置创建后端
pub fn build_backend(config: &TranslationConfig) -> TranslationResult<Box<dyn TranslationBackend>> {
    let backend: Box<dyn TranslationBackend> = match config.backend {
        BackendKind::MyMemory => Box::new(MyMemoryBackend::new(config)?),
        BackendKind::DeepLx => Box::new(DeepLxBackend::new(config)?),
    };

    tracing::info!("使用翻译后端 {} ({})", backend.name(), config.api_url());
    Ok(backend)
}

fn check_status(status: StatusCode) -> TranslationResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TranslationError::BackendUnavailable(format!("HTTP状态 {}", status)))
    }
}

/// 还原后端常见的 HTML 实体转义
/// 单遍解码 HTML 实体，无法识别的 `&` 原样保留
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

// ============================================================================
// MyMemory
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    response_data: Option<MyMemoryData>,
    /// 可能是数字也可能是字符串
    response_status: Option<serde_json::Value>,
    response_details: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: Option<String>,
}

/// MyMemory 公共接口
pub struct MyMemoryBackend {
    client: Client,
    api_url: String,
    email: Option<String>,
    codec: DelimiterCodec,
}

impl MyMemoryBackend {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            api_url: config.api_url().to_string(),
            email: config.email.clone(),
            codec: DelimiterCodec::from_config(config),
        })
    }

    /// 构建查询地址
    pub fn request_url(
        &self,
        query: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<url::Url> {
        let langpair = format!("{}|{}", source_lang, target_lang);
        let mut params = vec![("q", query), ("langpair", langpair.as_str())];
        if let Some(email) = &self.email {
            params.push(("de", email.as_str()));
        }

        url::Url::parse_with_params(&self.api_url, &params)
            .map_err(|e| TranslationError::ConfigError(format!("无效的API地址: {}", e)))
    }

    fn parse_response(&self, body: &str, expected: usize) -> TranslationResult<Vec<String>> {
        let response: MyMemoryResponse = serde_json::from_str(body)?;

        let status = match &response.response_status {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        if let Some(status) = status {
            if status != 200 {
                return Err(TranslationError::BackendUnavailable(format!(
                    "MyMemory 状态 {}: {}",
                    status,
                    response.response_details.unwrap_or_default()
                )));
            }
        }

        let translated = response
            .response_data
            .and_then(|data| data.translated_text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| malformed("缺少 responseData.translatedText"))?;

        self.codec.split(&decode_entities(&translated), expected)
    }
}

#[async_trait(?Send)]
impl TranslationBackend for MyMemoryBackend {
    async fn translate(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.codec.join(texts);
        let url = self.request_url(&query, source_lang, target_lang)?;
        tracing::debug!("MyMemory 请求 {} 条，{} 字节", texts.len(), query.len());

        let response = self.client.get(url).send().await?;
        check_status(response.status())?;
        let body = response.text().await?;

        self.parse_response(&body, texts.len())
    }

    fn name(&self) -> &str {
        "mymemory"
    }
}

// ============================================================================
// DeepLX
// ============================================================================

#[derive(Debug, Serialize)]
struct DeepLxRequest<'a> {
    text: &'a str,
    source_lang: String,
    target_lang: String,
}

#[derive(Debug, Deserialize)]
struct DeepLxResponse {
    code: Option<u16>,
    data: Option<String>,
}

/// DeepLX 兼容接口
pub struct DeepLxBackend {
    client: Client,
    api_url: String,
    codec: DelimiterCodec,
}

impl DeepLxBackend {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            api_url: config.api_url().to_string(),
            codec: DelimiterCodec::from_config(config),
        })
    }

    fn parse_response(&self, body: &str, expected: usize) -> TranslationResult<Vec<String>> {
        let response: DeepLxResponse = serde_json::from_str(body)?;

        if let Some(code) = response.code {
            if code != 200 {
                return Err(TranslationError::BackendUnavailable(format!("DeepLX 状态 {}", code)));
            }
        }

        let translated = response
            .data
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| malformed("缺少 data 字段"))?;

        self.codec.split(&translated, expected)
    }
}

#[async_trait(?Send)]
impl TranslationBackend for DeepLxBackend {
    async fn translate(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let joined = self.codec.join(texts);
        let request = DeepLxRequest {
            text: &joined,
            source_lang: source_lang.to_uppercase(),
            target_lang: target_lang.to_uppercase(),
        };
        let payload = serde_json::to_string(&request)
            .map_err(|e| TranslationError::InvalidInput(format!("请求序列化失败: {}", e)))?;
        tracing::debug!("DeepLX 请求 {} 条，{} 字节", texts.len(), joined.len());

        let response = self
            .client
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;
        check_status(response.status())?;
        let body = response.text().await?;

        self.parse_response(&body, texts.len())
    }

    fn name(&self) -> &str {
        "deeplx"
    }
}
