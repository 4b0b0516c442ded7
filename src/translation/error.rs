//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。后端与响应错误只在一次翻译过程内部流转，
//! 不会越过 `select_language` 传给调用方。

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// 网络或传输层失败
    #[error("翻译后端不可用: {0}")]
    BackendUnavailable(String),

    /// 响应结构错误或分段数量不匹配
    #[error("翻译响应格式错误: {0}")]
    MalformedResponse(String),

    /// 页面中缺少预期的注入锚点（例如页头）
    #[error("未找到注入锚点: {0}")]
    DiscoveryTargetMissing(String),

    /// 语言目录中不存在的语言代码
    #[error("未知语言代码: {0}")]
    UnknownLanguage(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 语言偏好读写失败
    #[error("偏好存储错误: {0}")]
    PreferenceError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::BackendUnavailable(_) => true,
            TranslationError::MalformedResponse(_) => true,
            TranslationError::DiscoveryTargetMissing(_) => false,
            TranslationError::UnknownLanguage(_) => false,
            TranslationError::ConfigError(_) => false,
            TranslationError::PreferenceError(_) => false,
            TranslationError::InvalidInput(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::BackendUnavailable(_) => ErrorSeverity::Warning,
            TranslationError::MalformedResponse(_) => ErrorSeverity::Warning,
            TranslationError::DiscoveryTargetMissing(_) => ErrorSeverity::Warning,
            TranslationError::UnknownLanguage(_) => ErrorSeverity::Info,
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::PreferenceError(_) => ErrorSeverity::Error,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::BackendUnavailable(_) => ErrorCategory::Network,
            TranslationError::MalformedResponse(_) => ErrorCategory::Parsing,
            TranslationError::DiscoveryTargetMissing(_) => ErrorCategory::Document,
            TranslationError::UnknownLanguage(_) => ErrorCategory::Input,
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::PreferenceError(_) => ErrorCategory::Storage,
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Parsing,
    Document,
    Input,
    Storage,
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            TranslationError::MalformedResponse(format!("响应解码失败: {}", error))
        } else {
            TranslationError::BackendUnavailable(format!("HTTP请求失败: {}", error))
        }
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::MalformedResponse(format!("JSON解析错误: {}", error))
    }
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InvalidInput(format!("IO错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ConfigError(format!("TOML解析错误: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub by_category: HashMap<ErrorCategory, usize>,
    pub retryable_errors: usize,
}

impl ErrorStats {
    /// 记录错误
    pub fn record_error(&mut self, error: &TranslationError) {
        self.total_errors += 1;
        *self.by_category.entry(error.category()).or_insert(0) += 1;

        if error.is_retryable() {
            self.retryable_errors += 1;
        }
    }

    /// 某一类别的错误数量
    pub fn count(&self, category: ErrorCategory) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误，不改变控制流
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }

    /// 创建偏好存储错误
    pub fn preference_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::PreferenceError(msg.to_string())
    }

    /// 创建响应格式错误
    pub fn malformed<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::MalformedResponse(msg.to_string())
    }
}
