//! 文本过滤器模块
//!
//! 判断一个候选位置是否需要翻译：位置上不能在排除区域或非文本元素内，
//! 文本本身要足够长、含字母，并且不是URL或邮箱。

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::translation::config::{constants, TranslationConfig};

use super::source::{Candidate, ElementInfo};

/// 文本过滤器
pub struct TextFilter {
    min_text_length: usize,
    excluded_classes: HashSet<String>,
    excluded_ids: HashSet<String>,
    non_text_elements: HashSet<String>,
    /// 缓存的正则表达式
    regex_cache: RegexCache,
}

/// 正则表达式缓存
#[derive(Default)]
struct RegexCache {
    url_regex: OnceLock<Option<Regex>>,
    email_regex: OnceLock<Option<Regex>>,
}

/// 过滤原因
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum FilterReason {
    ExcludedRegion,
    NonTextElement,
    TooShort,
    NoAlphabetic,
    IsUrl,
    IsEmail,
}

impl TextFilter {
    pub fn new(config: &TranslationConfig) -> Self {
        Self {
            min_text_length: config.min_text_length,
            excluded_classes: config.excluded_classes.iter().cloned().collect(),
            excluded_ids: config.excluded_ids.iter().cloned().collect(),
            non_text_elements: constants::NON_TEXT_ELEMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            regex_cache: RegexCache::default(),
        }
    }

    /// 判断候选位置是否需要翻译
    pub fn accepts<L>(&self, candidate: &Candidate<L>) -> bool {
        self.check(candidate).is_none()
    }

    /// 返回拒绝原因，可翻译时为 `None`
    pub fn check<L>(&self, candidate: &Candidate<L>) -> Option<FilterReason> {
        self.check_location(&candidate.ancestors)
            .or_else(|| self.check_text(&candidate.text))
    }

    /// 判断文本本身是否需要翻译
    pub fn should_translate(&self, text: &str) -> bool {
        self.check_text(text).is_none()
    }

    fn check_location(&self, ancestors: &[ElementInfo]) -> Option<FilterReason> {
        for element in ancestors {
            let excluded = element
                .id
                .as_ref()
                .is_some_and(|id| self.excluded_ids.contains(id))
                || element.classes.iter().any(|c| self.excluded_classes.contains(c));
            if excluded {
                return Some(FilterReason::ExcludedRegion);
            }

            if self.non_text_elements.contains(&element.tag) {
                return Some(FilterReason::NonTextElement);
            }
        }

        None
    }

    fn check_text(&self, text: &str) -> Option<FilterReason> {
        let trimmed = text.trim();

        if trimmed.chars().count() < self.min_text_length {
            return Some(FilterReason::TooShort);
        }

        // 纯数字或纯符号
        if !trimmed.chars().any(|c| c.is_alphabetic()) {
            return Some(FilterReason::NoAlphabetic);
        }

        if self.is_url(trimmed) {
            return Some(FilterReason::IsUrl);
        }

        if self.is_email(trimmed) {
            return Some(FilterReason::IsEmail);
        }

        None
    }

    /// 检查是否为URL
    fn is_url(&self, text: &str) -> bool {
        if text.starts_with("http://") || text.starts_with("https://") || text.starts_with("ftp://")
        {
            return true;
        }

        self.regex_cache
            .url_regex
            .get_or_init(|| Regex::new(r"^(?:[a-z][a-z0-9+.-]*://|www\.)\S+$").ok())
            .as_ref()
            .is_some_and(|re| re.is_match(text))
    }

    /// 检查是否为邮箱
    fn is_email(&self, text: &str) -> bool {
        if text.len() > 254 || !text.contains('@') || !text.contains('.') {
            return false;
        }

        self.regex_cache
            .email_regex
            .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok())
            .as_ref()
            .is_some_and(|re| re.is_match(text))
    }
}

/// 文本过滤统计
#[derive(Debug, Clone, Default)]
pub struct FilterStats {
    pub total_texts: usize,
    pub translatable_texts: usize,
    pub filtered_out: usize,
    pub by_reason: HashMap<FilterReason, usize>,
}

impl FilterStats {
    /// 记录过滤结果
    pub fn record_filter(&mut self, reason: Option<FilterReason>) {
        self.total_texts += 1;

        match reason {
            None => self.translatable_texts += 1,
            Some(reason) => {
                self.filtered_out += 1;
                *self.by_reason.entry(reason).or_insert(0) += 1;
            }
        }
    }

    pub fn count(&self, reason: FilterReason) -> usize {
        self.by_reason.get(&reason).copied().unwrap_or(0)
    }
}
