//! # 解析器模块
//!
//! 基于 html5ever 的文档解析、DOM操作与序列化。

pub mod html;

pub use html::{get_charset, html_to_dom, serialize_document};
