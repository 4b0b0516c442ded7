//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问。所有变量都以 `PAGE_TRANSLATOR_` 为前缀，
//! 未设置时不会覆盖配置文件中的值。

use std::env;
use std::fmt;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    /// 读取变量；未设置时返回 `Ok(None)`
    fn lookup() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }

    fn get_or_default(default: T) -> T {
        match Self::lookup() {
            Ok(Some(value)) => value,
            _ => default,
        }
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "PAGE_TRANSLATOR_LOG_LEVEL";
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;
    use crate::translation::config::constants::MAX_RETRIES_LIMIT;

    /// 页面原文语言，同时也是“恢复原文”的语言代码
    pub struct DefaultLang;
    impl EnvVar<String> for DefaultLang {
        const NAME: &'static str = "PAGE_TRANSLATOR_DEFAULT_LANG";
        const DESCRIPTION: &'static str = "Language code of the untranslated page (ISO 639-1)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_lang_code(value, Self::NAME)
        }
    }

    /// 翻译后端类型
    pub struct Backend;
    impl EnvVar<String> for Backend {
        const NAME: &'static str = "PAGE_TRANSLATOR_BACKEND";
        const DESCRIPTION: &'static str = "Translation backend: mymemory, deeplx";

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                "mymemory" => Ok("mymemory".to_string()),
                "deeplx" => Ok("deeplx".to_string()),
                other => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Unknown backend '{}'. Use: mymemory, deeplx", other),
                }),
            }
        }
    }

    /// API URL
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "PAGE_TRANSLATOR_API_URL";
        const DESCRIPTION: &'static str = "Translation API endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// MyMemory 的联系邮箱（提升免费额度）
    pub struct Email;
    impl EnvVar<String> for Email {
        const NAME: &'static str = "PAGE_TRANSLATOR_EMAIL";
        const DESCRIPTION: &'static str = "Contact e-mail sent to MyMemory as the 'de' parameter";

        fn parse(value: &str) -> EnvResult<String> {
            let email = value.trim();
            if email.contains('@') {
                Ok(email.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Not an e-mail address".to_string(),
                })
            }
        }
    }

    /// 单个批次的字节预算
    pub struct MaxBatchChars;
    impl EnvVar<usize> for MaxBatchChars {
        const NAME: &'static str = "PAGE_TRANSLATOR_MAX_BATCH_CHARS";
        const DESCRIPTION: &'static str = "Byte budget of one backend request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 100_000)
        }
    }

    /// 单个批次最多包含的字符串数
    pub struct MaxBatchItems;
    impl EnvVar<usize> for MaxBatchItems {
        const NAME: &'static str = "PAGE_TRANSLATOR_MAX_BATCH_ITEMS";
        const DESCRIPTION: &'static str = "Maximum number of strings in one backend request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 10_000)
        }
    }

    /// 两次请求之间的最小间隔
    pub struct MinRequestIntervalMs;
    impl EnvVar<u64> for MinRequestIntervalMs {
        const NAME: &'static str = "PAGE_TRANSLATOR_MIN_REQUEST_INTERVAL_MS";
        const DESCRIPTION: &'static str = "Minimum delay between two backend requests (ms)";

        fn parse(value: &str) -> EnvResult<u64> {
            value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of milliseconds".to_string(),
            })
        }
    }

    /// 批次失败后的重试次数
    pub struct MaxRetries;
    impl EnvVar<usize> for MaxRetries {
        const NAME: &'static str = "PAGE_TRANSLATOR_MAX_RETRIES";
        const DESCRIPTION: &'static str = "Retries of a failed batch before giving up";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 0, MAX_RETRIES_LIMIT)
        }
    }

    /// 批次失败后逐条翻译
    pub struct SingleFallback;
    impl EnvVar<bool> for SingleFallback {
        const NAME: &'static str = "PAGE_TRANSLATOR_SINGLE_FALLBACK";
        const DESCRIPTION: &'static str = "Translate strings one by one after a batch gives up";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }
}

/// 语言偏好相关环境变量
pub mod preference {
    use super::*;

    /// 偏好文件路径
    pub struct FilePath;
    impl EnvVar<String> for FilePath {
        const NAME: &'static str = "PAGE_TRANSLATOR_PREFERENCE_PATH";
        const DESCRIPTION: &'static str = "File that stores the last selected language";

        fn parse(value: &str) -> EnvResult<String> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(path.to_string())
        }
    }
}

fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn parse_lang_code(value: &str, var_name: &str) -> EnvResult<String> {
    let lang = value.trim().to_lowercase();
    if lang.len() == 2 && lang.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(lang)
    } else {
        Err(EnvError {
            variable: var_name.to_string(),
            message: "Language code must be 2 letters (ISO 639-1)".to_string(),
        })
    }
}

/// 生成环境变量说明文档
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    let mut push = |name: &str, description: &str| {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    };

    push(core::LogLevel::NAME, core::LogLevel::DESCRIPTION);
    push(translation::DefaultLang::NAME, translation::DefaultLang::DESCRIPTION);
    push(translation::Backend::NAME, translation::Backend::DESCRIPTION);
    push(translation::ApiUrl::NAME, translation::ApiUrl::DESCRIPTION);
    push(translation::Email::NAME, translation::Email::DESCRIPTION);
    push(translation::MaxBatchChars::NAME, translation::MaxBatchChars::DESCRIPTION);
    push(translation::MaxBatchItems::NAME, translation::MaxBatchItems::DESCRIPTION);
    push(
        translation::MinRequestIntervalMs::NAME,
        translation::MinRequestIntervalMs::DESCRIPTION,
    );
    push(translation::MaxRetries::NAME, translation::MaxRetries::DESCRIPTION);
    push(translation::SingleFallback::NAME, translation::SingleFallback::DESCRIPTION);
    push(preference::FilePath::NAME, preference::FilePath::DESCRIPTION);

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_parsing() {
        assert!(translation::SingleFallback::parse("true").unwrap());
        assert!(translation::SingleFallback::parse("YES").unwrap());
        assert!(!translation::SingleFallback::parse("0").unwrap());
        assert!(!translation::SingleFallback::parse("off").unwrap());
        assert!(translation::SingleFallback::parse("maybe").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(translation::ApiUrl::parse("http://localhost:1188/translate").is_ok());
        assert!(translation::ApiUrl::parse("https://api.mymemory.translated.net/get").is_ok());
        assert!(translation::ApiUrl::parse("ftp://example.com").is_err());
    }

    #[test]
    fn test_numeric_validation() {
        assert_eq!(translation::MaxBatchChars::parse("4800").unwrap(), 4800);
        assert!(translation::MaxBatchChars::parse("0").is_err());
        assert_eq!(translation::MaxRetries::parse("0").unwrap(), 0);
        assert!(translation::MaxRetries::parse("11").is_err());
        assert!(translation::MinRequestIntervalMs::parse("abc").is_err());
    }

    #[test]
    fn test_lang_code_validation() {
        assert_eq!(translation::DefaultLang::parse(" EN ").unwrap(), "en");
        assert!(translation::DefaultLang::parse("eng").is_err());
        assert_eq!(translation::Backend::parse("DeepLX").unwrap(), "deeplx");
        assert!(translation::Backend::parse("google").is_err());
    }

    #[test]
    fn test_unset_variable_is_none() {
        env::remove_var(translation::Email::NAME);
        assert!(matches!(translation::Email::lookup(), Ok(None)));
        assert_eq!(
            translation::MaxRetries::get_or_default(1),
            translation::MaxRetries::lookup().ok().flatten().unwrap_or(1)
        );
    }

    #[test]
    fn test_env_docs_list_every_variable() {
        let docs = generate_env_docs();
        assert!(docs.contains("PAGE_TRANSLATOR_MAX_BATCH_CHARS"));
        assert!(docs.contains("PAGE_TRANSLATOR_PREFERENCE_PATH"));
    }
}
