//! # Page Translator
//!
//! 为文档页面注入语言选择下拉菜单，并在原文与任意目标语言之间切换页面文本。
//!
//! ## 模块组织
//!
//! - `core` - 页面会话与文档级处理流程
//! - `parsers` - HTML 解析、DOM 操作与序列化
//! - `translation` - 文本替换引擎、后端、缓存与偏好
//! - `env` - 环境变量

pub mod core;
pub mod env;
pub mod parsers;
pub mod translation;

pub use crate::core::*;
