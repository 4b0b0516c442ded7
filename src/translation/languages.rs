//! 语言目录
//!
//! 下拉菜单展示的语言代码、本地名称与旗帜字符。

use serde::{Deserialize, Serialize};

/// 单个可选语言
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
    pub flag: String,
}

impl Language {
    pub fn new(code: &str, name: &str, flag: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            flag: flag.to_string(),
        }
    }
}

/// 欧盟官方语言（代码、本地名称、旗帜）
const EU_LANGUAGES: &[(&str, &str, &str)] = &[
    ("en", "English", "🇬🇧"),
    ("bg", "Български", "🇧🇬"),
    ("hr", "Hrvatski", "🇭🇷"),
    ("cs", "Čeština", "🇨🇿"),
    ("da", "Dansk", "🇩🇰"),
    ("nl", "Nederlands", "🇳🇱"),
    ("et", "Eesti", "🇪🇪"),
    ("fi", "Suomi", "🇫🇮"),
    ("fr", "Français", "🇫🇷"),
    ("de", "Deutsch", "🇩🇪"),
    ("el", "Ελληνικά", "🇬🇷"),
    ("hu", "Magyar", "🇭🇺"),
    ("ga", "Gaeilge", "🇮🇪"),
    ("it", "Italiano", "🇮🇹"),
    ("lv", "Latviešu", "🇱🇻"),
    ("lt", "Lietuvių", "🇱🇹"),
    ("mt", "Malti", "🇲🇹"),
    ("pl", "Polski", "🇵🇱"),
    ("pt", "Português", "🇵🇹"),
    ("ro", "Română", "🇷🇴"),
    ("sk", "Slovenčina", "🇸🇰"),
    ("sl", "Slovenščina", "🇸🇮"),
    ("es", "Español", "🇪🇸"),
    ("sv", "Svenska", "🇸🇪"),
];

/// 默认语言目录
pub fn default_languages() -> Vec<Language> {
    EU_LANGUAGES
        .iter()
        .map(|&(code, name, flag)| Language::new(code, name, flag))
        .collect()
}

/// 按代码查找语言（忽略大小写）
pub fn find_language<'a>(languages: &'a [Language], code: &str) -> Option<&'a Language> {
    languages
        .iter()
        .find(|lang| lang.code.eq_ignore_ascii_case(code.trim()))
}
