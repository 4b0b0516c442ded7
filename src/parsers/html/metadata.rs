//! HTML 文档元数据处理模块
//!
//! 目前只负责字符编码声明的读取，供解析阶段确定真实编码。

use markup5ever_rcdom::Handle;

use crate::core::content_type_charset;

use super::dom::{find_nodes, get_node_attr};

/// 获取文档字符编码
///
/// 支持两种格式：
/// 1. HTML5 格式：`<meta charset="utf-8">`
/// 2. HTML4 格式：`<meta http-equiv="content-type" content="text/html; charset=utf-8">`
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, &["html", "head", "meta"]).iter() {
        if let Some(meta_charset_node_attr_value) = get_node_attr(meta_node, "charset") {
            return Some(meta_charset_node_attr_value);
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(charset) = get_node_attr(meta_node, "content")
                .as_deref()
                .and_then(content_type_charset)
            {
                return Some(charset);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn test_get_charset_html5() {
        let dom = html_to_dom(b"<html><head><meta charset=\"iso-8859-2\"></head></html>", "utf-8")
            .unwrap();
        assert_eq!(get_charset(&dom.document).as_deref(), Some("iso-8859-2"));
    }

    #[test]
    fn test_get_charset_http_equiv() {
        let html = b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\"></head></html>";
        let dom = html_to_dom(html, "utf-8").unwrap();
        assert_eq!(get_charset(&dom.document).as_deref(), Some("windows-1252"));
    }

    #[test]
    fn test_get_charset_missing() {
        let dom = html_to_dom(b"<p>no head</p>", "utf-8").unwrap();
        assert!(get_charset(&dom.document).is_none());
    }
}
