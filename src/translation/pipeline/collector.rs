//! 文本收集器模块
//!
//! 扫描文本来源，过滤后得到可翻译单元。每个单元保存扫描时的原文，
//! 之后无论页面处于哪种语言，恢复时都写回这份原文。

use crate::translation::config::{ScanMode, TranslationConfig};

use super::filters::{FilterStats, TextFilter};
use super::source::{ScanStrategy, TextSource};

/// 一个可翻译位置
#[derive(Debug, Clone)]
pub struct TranslatableUnit<L> {
    pub location: L,
    /// 扫描时的原文，整个生命周期内不变
    pub original: String,
    /// 去掉首尾空白后的文本，作为去重与缓存的键
    pub key: String,
    leading: String,
    trailing: String,
}

impl<L> TranslatableUnit<L> {
    pub fn new(location: L, original: String) -> Self {
        let key = original.trim().to_string();
        let leading_len = original.len() - original.trim_start().len();
        let trailing_len = original.len() - original.trim_end().len();
        let leading = original[..leading_len].to_string();
        let trailing = original[original.len() - trailing_len..].to_string();

        Self {
            location,
            original,
            key,
            leading,
            trailing,
        }
    }

    /// 保留原文首尾空白，替换中间内容
    pub fn render(&self, translated: &str) -> String {
        format!("{}{}{}", self.leading, translated.trim(), self.trailing)
    }
}

/// 文本收集器
pub struct TextCollector {
    filter: TextFilter,
    strategy: ScanStrategy,
}

impl TextCollector {
    pub fn new(config: &TranslationConfig) -> Self {
        let strategy = match config.scan {
            ScanMode::TextNodes => ScanStrategy::TextNodes,
            ScanMode::Elements => ScanStrategy::Elements {
                content_classes: config.content_classes.clone(),
                tags: config.element_tags.clone(),
                classes: config.element_classes.clone(),
            },
        };

        Self {
            filter: TextFilter::new(config),
            strategy,
        }
    }

    pub fn with_strategy(config: &TranslationConfig, strategy: ScanStrategy) -> Self {
        Self {
            filter: TextFilter::new(config),
            strategy,
        }
    }

    pub fn strategy(&self) -> &ScanStrategy {
        &self.strategy
    }

    /// 收集可翻译单元，按文档顺序
    pub fn collect<S: TextSource>(&self, source: &S) -> Vec<TranslatableUnit<S::Location>> {
        self.collect_with_stats(source).0
    }

    pub fn collect_with_stats<S: TextSource>(
        &self,
        source: &S,
    ) -> (Vec<TranslatableUnit<S::Location>>, FilterStats) {
        let mut stats = FilterStats::default();
        let mut units = Vec::new();

        for candidate in source.scan(&self.strategy) {
            let reason = self.filter.check(&candidate);
            stats.record_filter(reason);
            if reason.is_none() {
                units.push(TranslatableUnit::new(candidate.location, candidate.text));
            }
        }

        tracing::debug!(
            "收集到 {} 个可翻译单元，过滤掉 {} 个",
            stats.translatable_texts,
            stats.filtered_out
        );

        (units, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::config::constants;
    use crate::translation::pipeline::filters::FilterReason;
    use crate::translation::pipeline::source::{ElementInfo, MemoryTextSource};

    #[test]
    fn test_unit_keeps_surrounding_whitespace() {
        let unit = TranslatableUnit::new(0, "\n    Welcome home  ".to_string());
        assert_eq!(unit.key, "Welcome home");
        assert_eq!(unit.render("Bienvenue"), "\n    Bienvenue  ");
        assert_eq!(unit.original, "\n    Welcome home  ");
    }

    #[test]
    fn test_collect_filters_candidates() {
        let source = MemoryTextSource::from_texts(&["Home", "42", "  ", "Docs"]);
        source.push(
            "English",
            vec![
                ElementInfo::new("body"),
                ElementInfo::new("div").with_class(constants::SELECTOR_CLASS),
            ],
        );

        let collector = TextCollector::new(&TranslationConfig::default());
        let (units, stats) = collector.collect_with_stats(&source);

        let keys: Vec<&str> = units.iter().map(|u| u.key.as_str()).collect();
        assert_eq!(keys, vec!["Home", "Docs"]);
        assert_eq!(units[1].location, 3);
        assert_eq!(stats.count(FilterReason::ExcludedRegion), 1);
        assert_eq!(stats.filtered_out, 3);
    }

    #[test]
    fn test_strategy_follows_scan_mode() {
        let mut config = TranslationConfig::default();
        assert_eq!(TextCollector::new(&config).strategy(), &ScanStrategy::TextNodes);

        config.scan = ScanMode::Elements;
        assert!(matches!(
            TextCollector::new(&config).strategy(),
            ScanStrategy::Elements { .. }
        ));
    }
}
