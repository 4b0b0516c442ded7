//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值。
//! 解析顺序：默认值 → 配置文件 → 环境变量 → 命令行参数（由调用方覆盖）。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::languages::{default_languages, find_language, Language};

/// 翻译后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// MyMemory 公共接口（GET 查询参数）
    #[default]
    MyMemory,
    /// DeepLX 兼容接口（POST JSON）
    DeepLx,
}

/// 文本发现方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// 遍历所有文本节点
    #[default]
    TextNodes,
    /// 按标签和类名选取整个元素，替换其文本内容
    Elements,
}

/// 翻译配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 语言
    pub default_lang: String,
    pub languages: Vec<Language>,

    // 后端
    pub backend: BackendKind,
    pub api_url: Option<String>,
    pub email: Option<String>,
    pub request_timeout_secs: u64,

    // 批次配置
    pub max_batch_chars: usize,
    pub max_batch_items: usize,
    pub delimiter: String,

    // 节流与重试
    pub min_request_interval_ms: u64,
    pub max_retries: usize,
    pub single_fallback: bool,

    // 文本发现
    pub scan: ScanMode,
    pub min_text_length: usize,
    pub content_classes: Vec<String>,
    pub element_tags: Vec<String>,
    pub element_classes: Vec<String>,
    pub excluded_classes: Vec<String>,
    pub excluded_ids: Vec<String>,

    // 下拉菜单
    pub header_anchors: Vec<String>,

    // 语言偏好
    pub preference_key: String,
    pub preference_path: String,
    pub startup_delay_ms: u64,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            default_lang: constants::DEFAULT_LANG.to_string(),
            languages: default_languages(),

            backend: BackendKind::default(),
            api_url: None,
            email: None,
            request_timeout_secs: constants::REQUEST_TIMEOUT_SECS,

            max_batch_chars: constants::MAX_BATCH_CHARS,
            max_batch_items: constants::MAX_BATCH_ITEMS,
            delimiter: constants::DEFAULT_DELIMITER.to_string(),

            min_request_interval_ms: constants::MIN_REQUEST_INTERVAL_MS,
            max_retries: constants::MAX_RETRIES,
            single_fallback: false,

            scan: ScanMode::default(),
            min_text_length: constants::MIN_TEXT_LENGTH,
            content_classes: strings(constants::CONTENT_CLASSES),
            element_tags: strings(constants::ELEMENT_TAGS),
            element_classes: strings(constants::ELEMENT_CLASSES),
            excluded_classes: vec![constants::SELECTOR_CLASS.to_string()],
            excluded_ids: Vec::new(),

            header_anchors: strings(constants::HEADER_ANCHORS),

            preference_key: constants::PREFERENCE_KEY.to_string(),
            preference_path: constants::PREFERENCE_PATH.to_string(),
            startup_delay_ms: 0,
        }
    }
}

impl TranslationConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.max_batch_chars == 0 {
            return Err(TranslationError::ConfigError("批次字节预算不能为0".to_string()));
        }

        if self.max_batch_items == 0 {
            return Err(TranslationError::ConfigError("批次条目上限不能为0".to_string()));
        }

        if self.max_retries > constants::MAX_RETRIES_LIMIT {
            return Err(TranslationError::ConfigError(format!(
                "重试次数不能超过 {}",
                constants::MAX_RETRIES_LIMIT
            )));
        }

        if self.delimiter_token().is_empty() {
            return Err(TranslationError::ConfigError(
                "分隔符必须包含非空白字符".to_string(),
            ));
        }

        if self.languages.is_empty() {
            return Err(TranslationError::ConfigError("语言目录不能为空".to_string()));
        }

        if find_language(&self.languages, &self.default_lang).is_none() {
            return Err(TranslationError::ConfigError(format!(
                "默认语言 {} 不在语言目录中",
                self.default_lang
            )));
        }

        if let Some(url) = &self.api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(TranslationError::ConfigError(format!("无效的API地址: {}", url)));
            }
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{preference, translation, EnvVar};

        fn take<T>(result: crate::env::EnvResult<Option<T>>) -> Option<T> {
            match result {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("忽略无效的环境变量: {}", e);
                    None
                }
            }
        }

        if let Some(lang) = take(translation::DefaultLang::lookup()) {
            self.default_lang = lang;
        }

        if let Some(backend) = take(translation::Backend::lookup()) {
            self.backend = if backend == "deeplx" {
                BackendKind::DeepLx
            } else {
                BackendKind::MyMemory
            };
        }

        if let Some(api_url) = take(translation::ApiUrl::lookup()) {
            tracing::info!("环境变量覆盖 API URL: {}", api_url);
            self.api_url = Some(api_url);
        }

        if let Some(email) = take(translation::Email::lookup()) {
            self.email = Some(email);
        }

        if let Some(chars) = take(translation::MaxBatchChars::lookup()) {
            self.max_batch_chars = chars;
        }

        if let Some(items) = take(translation::MaxBatchItems::lookup()) {
            self.max_batch_items = items;
        }

        if let Some(interval) = take(translation::MinRequestIntervalMs::lookup()) {
            self.min_request_interval_ms = interval;
        }

        if let Some(retries) = take(translation::MaxRetries::lookup()) {
            self.max_retries = retries;
        }

        if let Some(single) = take(translation::SingleFallback::lookup()) {
            self.single_fallback = single;
        }

        if let Some(path) = take(preference::FilePath::lookup()) {
            self.preference_path = path;
        }
    }

    /// 实际使用的API地址
    pub fn api_url(&self) -> &str {
        match (&self.api_url, self.backend) {
            (Some(url), _) => url,
            (None, BackendKind::MyMemory) => constants::MYMEMORY_API_URL,
            (None, BackendKind::DeepLx) => constants::DEEPLX_API_URL,
        }
    }

    /// 分隔符的核心标记（去掉两端空白），用于拆分响应
    pub fn delimiter_token(&self) -> &str {
        self.delimiter.trim()
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// 展开 `~` 之后的偏好文件路径
    pub fn preference_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.preference_path).as_ref())
    }

    pub fn is_default_lang(&self, code: &str) -> bool {
        self.default_lang.eq_ignore_ascii_case(code.trim())
    }
}

/// 简化的配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 按搜索路径加载配置并应用环境变量
    pub fn new() -> TranslationResult<Self> {
        Self::load_dotenv();
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件加载配置并应用环境变量
    pub fn from_path<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        Self::load_dotenv();
        let mut config = Self::load_from_file(path.as_ref())?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    /// 从搜索路径加载配置
    fn load_config() -> TranslationResult<TranslationConfig> {
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let candidate = Path::new(expanded_path.as_ref());
            if candidate.exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(candidate);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &Path) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        parse_config(&content, path.extension().and_then(|ext| ext.to_str()))
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

/// 按扩展名解析配置内容：`json` 走 JSON，其余按 TOML
pub fn parse_config(content: &str, extension: Option<&str>) -> TranslationResult<TranslationConfig> {
    match extension {
        Some(ext) if ext.eq_ignore_ascii_case("json") => serde_json::from_str(content)
            .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e))),
        _ => Ok(toml::from_str(content)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TranslationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api_url(), constants::MYMEMORY_API_URL);
        assert_eq!(config.delimiter_token(), "|~|");
        assert!(config.is_default_lang("EN"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = parse_config(
            r#"
            backend = "deeplx"
            max_batch_chars = 4800
            scan = "elements"
            "#,
            Some("toml"),
        )
        .unwrap();

        assert_eq!(config.backend, BackendKind::DeepLx);
        assert_eq!(config.max_batch_chars, 4800);
        assert_eq!(config.scan, ScanMode::Elements);
        assert_eq!(config.api_url(), constants::DEEPLX_API_URL);
        assert_eq!(config.min_text_length, constants::MIN_TEXT_LENGTH);
    }

    #[test]
    fn test_json_config() {
        let config = parse_config(r#"{"max_retries": 0, "single_fallback": true}"#, Some("json"))
            .unwrap();
        assert_eq!(config.max_retries, 0);
        assert!(config.single_fallback);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = TranslationConfig::default();
        config.delimiter = "\n \n".to_string();
        assert!(matches!(config.validate(), Err(TranslationError::ConfigError(_))));

        let mut config = TranslationConfig::default();
        config.default_lang = "xx".to_string();
        assert!(config.validate().is_err());

        let mut config = TranslationConfig::default();
        config.max_batch_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bounds_retries() {
        let config = parse_config(r#"{"max_retries": 18446744073709551615}"#, Some("json"))
            .unwrap();
        assert!(matches!(config.validate(), Err(TranslationError::ConfigError(_))));

        let mut config = TranslationConfig::default();
        config.max_retries = constants::MAX_RETRIES_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("max_batch_chars = \"many\"", None);
        assert!(matches!(result, Err(TranslationError::ConfigError(_))));
    }
}
