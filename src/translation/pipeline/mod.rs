//! 翻译管道模块
//!
//! 文本来源 → 过滤 → 收集 → 批次规划

pub mod batch;
pub mod collector;
pub mod filters;
pub mod source;

// 重新导出主要类型
pub use batch::{Batch, BatchPlanner, DelimiterCodec};
pub use collector::{TextCollector, TranslatableUnit};
pub use filters::{FilterReason, FilterStats, TextFilter};
pub use source::{
    Candidate, DomLocation, DomTextSource, ElementInfo, MemoryTextSource, ScanStrategy,
    TextSource,
};
