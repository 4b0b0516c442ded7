//! 翻译批次模块
//!
//! 把去重后的待翻译文本按顺序装入批次，每个批次对应一次后端请求。
//!
//! ## 装箱规则
//!
//! - 每条文本的开销为 `文本字节数 + 分隔符字节数`
//! - 当前批次加入下一条会超出字节预算或条目上限时，先提交当前批次
//! - 单条超出预算的文本独占一个批次，不会被截断
//! - 含有分隔符标记的文本独占一个批次，避免拆分时错位
//!
//! 同一批次的文本用分隔符拼接后发送，响应按分隔符标记拆回，
//! 片段数量必须与批次条目数一致。

use std::collections::HashSet;

use crate::translation::config::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};

use super::collector::TranslatableUnit;

/// 翻译批次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 批次序号，从1开始
    pub id: usize,
    /// 按发送顺序排列的源文本
    pub items: Vec<String>,
    /// 按开销计算的批次大小
    pub size: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 分隔符编解码
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimiterCodec {
    delimiter: String,
    token: String,
}

impl DelimiterCodec {
    pub fn new(delimiter: &str) -> Self {
        Self {
            delimiter: delimiter.to_string(),
            token: delimiter.trim().to_string(),
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Self {
        Self::new(&config.delimiter)
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// 文本中是否出现了分隔符标记
    pub fn collides(&self, text: &str) -> bool {
        text.contains(&self.token)
    }

    pub fn join(&self, texts: &[String]) -> String {
        texts.join(&self.delimiter)
    }

    /// 拆分响应；单条批次不拆分
    pub fn split(&self, response: &str, expected: usize) -> TranslationResult<Vec<String>> {
        if expected == 1 {
            return Ok(vec![response.trim().to_string()]);
        }

        let parts: Vec<String> = response
            .split(self.token.as_str())
            .map(|part| part.trim().to_string())
            .collect();

        if parts.len() != expected {
            return Err(TranslationError::MalformedResponse(format!(
                "期望 {} 个片段，实际 {} 个",
                expected,
                parts.len()
            )));
        }

        Ok(parts)
    }
}

/// 批次规划器
#[derive(Debug)]
pub struct BatchPlanner {
    max_chars: usize,
    max_items: usize,
    codec: DelimiterCodec,
}

impl BatchPlanner {
    pub fn new(max_chars: usize, max_items: usize, delimiter: &str) -> Self {
        Self {
            max_chars: max_chars.max(1),
            max_items: max_items.max(1),
            codec: DelimiterCodec::new(delimiter),
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Self {
        Self::new(config.max_batch_chars, config.max_batch_items, &config.delimiter)
    }

    pub fn codec(&self) -> &DelimiterCodec {
        &self.codec
    }

    /// 单条文本的开销
    pub fn cost(&self, text: &str) -> usize {
        text.len() + self.codec.delimiter().len()
    }

    /// 按首次出现顺序去重
    pub fn distinct_keys<L>(units: &[TranslatableUnit<L>]) -> Vec<String> {
        let mut seen = HashSet::new();
        units
            .iter()
            .filter(|unit| seen.insert(unit.key.as_str()))
            .map(|unit| unit.key.clone())
            .collect()
    }

    /// 按顺序装箱
    pub fn plan(&self, texts: Vec<String>) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_size = 0;

        for text in texts {
            let cost = self.cost(&text);
            let isolated = self.codec.collides(&text);
            let oversized = cost > self.max_chars;

            if isolated || oversized {
                self.flush(&mut batches, &mut current, &mut current_size);
                self.push_batch(&mut batches, vec![text], cost);
                continue;
            }

            if !current.is_empty()
                && (current_size + cost > self.max_chars || current.len() >= self.max_items)
            {
                self.flush(&mut batches, &mut current, &mut current_size);
            }

            current_size += cost;
            current.push(text);
        }

        self.flush(&mut batches, &mut current, &mut current_size);

        tracing::debug!(
            "规划 {} 个批次（预算 {} 字节，每批最多 {} 条）",
            batches.len(),
            self.max_chars,
            self.max_items
        );

        batches
    }

    fn flush(&self, batches: &mut Vec<Batch>, current: &mut Vec<String>, size: &mut usize) {
        if !current.is_empty() {
            self.push_batch(batches, std::mem::take(current), *size);
            *size = 0;
        }
    }

    fn push_batch(&self, batches: &mut Vec<Batch>, items: Vec<String>, size: usize) {
        batches.push(Batch {
            id: batches.len() + 1,
            items,
            size,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_every_text_lands_in_exactly_one_batch() {
        let planner = BatchPlanner::new(40, 3, "\n|~|\n");
        let input = texts(&["Home", "About us", "Getting started", "Install", "Reference", "FAQ", "Blog"]);
        let batches = planner.plan(input.clone());

        let flattened: Vec<String> = batches.iter().flat_map(|b| b.items.clone()).collect();
        assert_eq!(flattened, input);
        assert!(batches.iter().all(|b| b.len() <= 3));
        assert!(batches.iter().all(|b| b.size <= 40));
    }

    #[test]
    fn test_budget_counts_delimiter() {
        // 每条开销 5 + 5 = 10
        let planner = BatchPlanner::new(20, 50, "\n|~|\n");
        let batches = planner.plan(texts(&["aaaaa", "bbbbb", "ccccc"]));

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].items, texts(&["aaaaa", "bbbbb"]));
        assert_eq!(batches[0].size, 20);
        assert_eq!(batches[1].items, texts(&["ccccc"]));
        assert_eq!(batches[1].id, 2);
    }

    #[test]
    fn test_oversized_text_gets_own_batch() {
        let planner = BatchPlanner::new(20, 50, "\n|~|\n");
        let long = "x".repeat(64);
        let batches = planner.plan(vec!["one".to_string(), long.clone(), "two".to_string()]);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].items, vec![long]);
        assert_eq!(batches[1].size, 69);
        assert_eq!(batches[2].items, texts(&["two"]));
    }

    #[test]
    fn test_text_with_delimiter_is_isolated() {
        let planner = BatchPlanner::new(500, 50, "\n|~|\n");
        let batches = planner.plan(texts(&["Alpha", "Pipe |~| inside", "Beta"]));

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].items, texts(&["Pipe |~| inside"]));
        assert_eq!(batches[0].items, texts(&["Alpha"]));
    }

    #[test]
    fn test_distinct_keys_preserve_first_occurrence() {
        let units = vec![
            TranslatableUnit::new(0, "Home".to_string()),
            TranslatableUnit::new(1, "  Docs ".to_string()),
            TranslatableUnit::new(2, "Home".to_string()),
            TranslatableUnit::new(3, "Docs".to_string()),
        ];

        assert_eq!(BatchPlanner::distinct_keys(&units), texts(&["Home", "Docs"]));
    }

    #[test]
    fn test_codec_split() {
        let codec = DelimiterCodec::new("\n|~|\n");
        let joined = codec.join(&texts(&["Home", "About"]));
        assert_eq!(joined, "Home\n|~|\nAbout");

        // 后端可能吞掉换行
        assert_eq!(
            codec.split("Accueil |~| À propos", 2).unwrap(),
            texts(&["Accueil", "À propos"])
        );
        assert!(matches!(
            codec.split("Accueil À propos", 2),
            Err(TranslationError::MalformedResponse(_))
        ));
        assert_eq!(codec.split(" a |~| b ", 1).unwrap(), texts(&["a |~| b"]));
    }
}
