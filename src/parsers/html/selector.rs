//! 语言选择下拉菜单的构建与注入
//!
//! 菜单结构：
//!
//! ```text
//! div.language-dropdown
//!   button#languageButton.language-button
//!     span#currentFlag  span#currentLanguage  span.arrow
//!   div#languageMenu.language-menu
//!     div.language-option[data-code]
//!       span.flag-menu  span.language-name
//! ```

use markup5ever_rcdom::Handle;

use crate::translation::config::constants::SELECTOR_CLASS;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::languages::Language;

use super::dom::{
    append_child, create_element_node, create_text_node, find_first_node, get_node_attr,
    get_node_name, has_class, set_node_attr, set_text_content,
};

pub const BUTTON_ID: &str = "languageButton";
pub const MENU_ID: &str = "languageMenu";
pub const CURRENT_FLAG_ID: &str = "currentFlag";
pub const CURRENT_LANGUAGE_ID: &str = "currentLanguage";

/// 页头锚点选择器：`.class`、`#id` 或标签名
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorSelector {
    Class(String),
    Id(String),
    Tag(String),
}

impl AnchorSelector {
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if let Some(class) = selector.strip_prefix('.') {
            AnchorSelector::Class(class.to_string())
        } else if let Some(id) = selector.strip_prefix('#') {
            AnchorSelector::Id(id.to_string())
        } else {
            AnchorSelector::Tag(selector.to_lowercase())
        }
    }

    pub fn matches(&self, node: &Handle) -> bool {
        match self {
            AnchorSelector::Class(class) => has_class(node, class),
            AnchorSelector::Id(id) => get_node_attr(node, "id").as_deref() == Some(id.as_str()),
            AnchorSelector::Tag(tag) => get_node_name(node) == Some(tag.as_str()),
        }
    }
}

/// 按顺序尝试锚点，返回第一个存在的节点
pub fn find_anchor(document: &Handle, anchors: &[String]) -> Option<Handle> {
    anchors.iter().find_map(|selector| {
        let selector = AnchorSelector::parse(selector);
        find_first_node(document, &|node: &Handle| selector.matches(node))
    })
}

fn find_by_id(document: &Handle, id: &str) -> Option<Handle> {
    find_first_node(document, &|node: &Handle| {
        get_node_attr(node, "id").as_deref() == Some(id)
    })
}

/// 查找已注入的下拉菜单
pub fn find_language_selector(document: &Handle) -> Option<Handle> {
    find_first_node(document, &|node: &Handle| has_class(node, SELECTOR_CLASS))
}

fn span(attrs: &[(&str, &str)], text: &str) -> Handle {
    let node = create_element_node("span", attrs);
    append_child(&node, create_text_node(text));
    node
}

/// 构建下拉菜单节点树
pub fn build_language_selector(languages: &[Language], current: &Language) -> Handle {
    let root = create_element_node("div", &[("class", SELECTOR_CLASS)]);

    let button = create_element_node(
        "button",
        &[("class", "language-button"), ("id", BUTTON_ID)],
    );
    append_child(&button, span(&[("id", CURRENT_FLAG_ID)], &current.flag));
    append_child(&button, span(&[("id", CURRENT_LANGUAGE_ID)], &current.name));
    append_child(&button, span(&[("class", "arrow")], "▼"));
    append_child(&root, button);

    let menu = create_element_node("div", &[("class", "language-menu"), ("id", MENU_ID)]);
    for language in languages {
        let option = create_element_node(
            "div",
            &[("class", "language-option"), ("data-code", language.code.as_str())],
        );
        append_child(&option, span(&[("class", "flag-menu")], &language.flag));
        append_child(&option, span(&[("class", "language-name")], &language.name));
        append_child(&menu, option);
    }
    append_child(&root, menu);

    root
}

/// 在第一个可用的页头锚点末尾注入下拉菜单
///
/// 已存在时直接返回现有节点；所有锚点都缺失时返回
/// `DiscoveryTargetMissing`，页面保持原样。
pub fn inject_language_selector(
    document: &Handle,
    anchors: &[String],
    languages: &[Language],
    current: &Language,
) -> TranslationResult<Handle> {
    if let Some(existing) = find_language_selector(document) {
        return Ok(existing);
    }

    let anchor = find_anchor(document, anchors)
        .ok_or_else(|| TranslationError::DiscoveryTargetMissing(anchors.join(", ")))?;

    let selector = build_language_selector(languages, current);
    append_child(&anchor, selector.clone());

    Ok(selector)
}

/// 更新按钮上显示的当前语言
pub fn update_selector_label(document: &Handle, language: &Language) -> bool {
    let flag = find_by_id(document, CURRENT_FLAG_ID);
    let name = find_by_id(document, CURRENT_LANGUAGE_ID);

    match (flag, name) {
        (Some(flag), Some(name)) => {
            set_text_content(&flag, &language.flag);
            set_text_content(&name, &language.name);
            true
        }
        _ => false,
    }
}

/// 同步菜单展开状态到 `style` 属性
pub fn set_menu_visibility(document: &Handle, open: bool) -> bool {
    match find_by_id(document, MENU_ID) {
        Some(menu) => {
            let display = if open { "display: block" } else { "display: none" };
            set_node_attr(&menu, "style", Some(display.to_string()));
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{get_parent_node, get_text_content, html_to_dom};
    use crate::parsers::html::serializer::serialize_document;
    use crate::translation::languages::{default_languages, find_language};

    const PAGE: &str = r#"<html><body><header class="md-header"><div class="md-header__inner">
        <span>Wiki</span></div></header><div class="md-content"><h1>Home</h1></div></body></html>"#;

    #[test]
    fn test_anchor_selector_parse() {
        assert_eq!(AnchorSelector::parse(".md-header"), AnchorSelector::Class("md-header".into()));
        assert_eq!(AnchorSelector::parse("#top"), AnchorSelector::Id("top".into()));
        assert_eq!(AnchorSelector::parse("HEADER"), AnchorSelector::Tag("header".into()));
    }

    #[test]
    fn test_inject_prefers_first_anchor() {
        let dom = html_to_dom(PAGE.as_bytes(), "utf-8").unwrap();
        let languages = default_languages();
        let anchors = vec![".md-header__inner".to_string(), "header".to_string()];

        let selector =
            inject_language_selector(&dom.document, &anchors, &languages, &languages[0]).unwrap();
        let parent = get_parent_node(&selector).unwrap();
        assert!(has_class(&parent, "md-header__inner"));

        let html = String::from_utf8(serialize_document(&dom, "utf-8").unwrap()).unwrap();
        assert!(html.contains(r#"data-code="fr""#));
        assert!(html.contains(r#"<span id="currentLanguage">English</span>"#));
    }

    #[test]
    fn test_inject_is_idempotent() {
        let dom = html_to_dom(PAGE.as_bytes(), "utf-8").unwrap();
        let languages = default_languages();
        let anchors = vec!["header".to_string()];

        inject_language_selector(&dom.document, &anchors, &languages, &languages[0]).unwrap();
        inject_language_selector(&dom.document, &anchors, &languages, &languages[0]).unwrap();

        let html = String::from_utf8(serialize_document(&dom, "utf-8").unwrap()).unwrap();
        assert_eq!(html.matches("language-dropdown").count(), 1);
    }

    #[test]
    fn test_missing_anchor_is_reported() {
        let dom = html_to_dom(b"<html><body><p>No header</p></body></html>", "utf-8").unwrap();
        let languages = default_languages();
        let result = inject_language_selector(
            &dom.document,
            &[".md-header".to_string()],
            &languages,
            &languages[0],
        );
        assert!(matches!(result, Err(TranslationError::DiscoveryTargetMissing(_))));
    }

    #[test]
    fn test_update_label_and_visibility() {
        let dom = html_to_dom(PAGE.as_bytes(), "utf-8").unwrap();
        let languages = default_languages();
        inject_language_selector(&dom.document, &["header".to_string()], &languages, &languages[0])
            .unwrap();

        let german = find_language(&languages, "de").unwrap();
        assert!(update_selector_label(&dom.document, german));
        let name = find_by_id(&dom.document, CURRENT_LANGUAGE_ID).unwrap();
        assert_eq!(get_text_content(&name), "Deutsch");

        assert!(set_menu_visibility(&dom.document, true));
        let menu = find_by_id(&dom.document, MENU_ID).unwrap();
        assert_eq!(get_node_attr(&menu, "style").as_deref(), Some("display: block"));
    }
}
