//! HTML解析和处理模块
//!
//! - `dom`: 解析与基础DOM操作
//! - `metadata`: 字符编码声明
//! - `serializer`: 序列化与重新编码
//! - `selector`: 语言选择下拉菜单

pub mod dom;
pub mod metadata;
pub mod selector;
pub mod serializer;

pub use dom::{
    find_first_node, find_nodes, get_node_attr, get_node_name, get_parent_node,
    get_text_content, html_to_dom, set_node_attr, set_text_content,
};
pub use metadata::get_charset;
pub use selector::{
    find_language_selector, inject_language_selector, set_menu_visibility,
    update_selector_label,
};
pub use serializer::serialize_document;
