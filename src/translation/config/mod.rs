//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{BackendKind, ConfigManager, ScanMode, TranslationConfig};

/// 配置常量
pub mod constants {
    // 语言
    pub const DEFAULT_LANG: &str = "en";

    // 批次处理相关
    pub const MAX_BATCH_CHARS: usize = 500;
    pub const MAX_BATCH_ITEMS: usize = 50;
    pub const DEFAULT_DELIMITER: &str = "\n|~|\n";

    // 请求节流与重试
    pub const MIN_REQUEST_INTERVAL_MS: u64 = 300;
    pub const REQUEST_TIMEOUT_SECS: u64 = 20;
    pub const MAX_RETRIES: usize = 1;
    pub const MAX_RETRIES_LIMIT: usize = 10;

    // 文本过滤相关
    pub const MIN_TEXT_LENGTH: usize = 2;

    // 默认API设置
    pub const MYMEMORY_API_URL: &str = "https://api.mymemory.translated.net/get";
    pub const DEEPLX_API_URL: &str = "http://localhost:1188/translate";

    // 不包含可读文本的元素
    pub const NON_TEXT_ELEMENTS: &[&str] = &[
        "script", "style", "noscript", "template", "head", "code", "pre", "svg", "math",
        "canvas", "img", "picture", "video", "audio", "source", "track", "iframe", "embed",
        "object", "map", "area", "input", "select", "option", "textarea",
    ];

    // 元素扫描模式下的默认目标
    pub const CONTENT_CLASSES: &[&str] = &["md-content"];
    pub const ELEMENT_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "p", "li"];
    pub const ELEMENT_CLASSES: &[&str] = &["md-nav__title", "md-nav__link", "md-toc__link"];

    // 语言选择控件
    pub const SELECTOR_CLASS: &str = "language-dropdown";
    pub const HEADER_ANCHORS: &[&str] = &[".md-header__inner", ".md-header", "header"];

    // 语言偏好
    pub const PREFERENCE_KEY: &str = "page-translator-language";
    pub const PREFERENCE_PATH: &str = "~/.config/page-translator/preference.json";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "page-translator.toml",
        ".page-translator.toml",
        "page-translator.json",
        "~/.config/page-translator/config.toml",
        "/etc/page-translator/config.toml",
    ];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}

/// 加载配置，失败时回退到默认值
pub fn load_translation_config() -> TranslationConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.into_config(),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            TranslationConfig::default()
        }
    }
}
