//! 文本来源抽象
//!
//! 引擎只通过 [`TextSource`] 读取和改写页面文本，不直接依赖具体的文档API。
//! 扫描结果是一串 [`Candidate`]：位置、当前文本以及从外到内的祖先元素链，
//! 是否可翻译由 `filters` 模块里的谓词决定。

use std::cell::RefCell;
use std::fmt;

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::dom::{
    get_node_attr, get_node_classes, get_node_name, get_text_content, replace_children,
    set_text_content,
};

/// 祖先元素的最小描述
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementInfo {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl ElementInfo {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn from_node(node: &Handle) -> Option<Self> {
        let tag = get_node_name(node)?;
        Some(Self {
            tag: tag.to_string(),
            id: get_node_attr(node, "id"),
            classes: get_node_classes(node),
        })
    }
}

/// 扫描得到的一个文本位置
#[derive(Debug, Clone)]
pub struct Candidate<L> {
    pub location: L,
    pub text: String,
    /// 从外到内；元素模式下最后一项是目标元素本身
    pub ancestors: Vec<ElementInfo>,
}

/// 扫描策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStrategy {
    /// 每个文本节点是一个位置
    TextNodes,
    /// 匹配的元素整体是一个位置，写入时替换其全部文本
    Elements {
        /// 仅在这些 class 的容器内匹配 `tags`
        content_classes: Vec<String>,
        tags: Vec<String>,
        /// 任意位置上带这些 class 的元素
        classes: Vec<String>,
    },
}

impl ScanStrategy {
    fn element_matches(&self, element: &ElementInfo, ancestors: &[ElementInfo]) -> bool {
        match self {
            ScanStrategy::TextNodes => false,
            ScanStrategy::Elements {
                content_classes,
                tags,
                classes,
            } => {
                if classes.iter().any(|class| element.has_class(class)) {
                    return true;
                }

                tags.iter().any(|tag| tag == &element.tag)
                    && ancestors
                        .iter()
                        .any(|a| content_classes.iter().any(|class| a.has_class(class)))
            }
        }
    }
}

/// 页面文本的读写接口
pub trait TextSource {
    type Location: Clone + fmt::Debug;

    /// 按文档顺序列出候选位置
    fn scan(&self, strategy: &ScanStrategy) -> Vec<Candidate<Self::Location>>;

    /// 改写某个位置的文本
    fn write(&self, location: &Self::Location, text: &str);
}

/// DOM 中的一个文本位置
#[derive(Clone)]
pub struct DomLocation {
    node: Handle,
    /// 元素模式下扫描时的原始文本与子节点，写回原文时恢复原有标记
    snapshot: Option<(String, Vec<Handle>)>,
}

impl fmt::Debug for DomLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.node.data {
            NodeData::Text { .. } => "#text",
            _ => get_node_name(&self.node).unwrap_or("#node"),
        };
        f.debug_struct("DomLocation")
            .field("node", &kind)
            .field("snapshot", &self.snapshot.is_some())
            .finish()
    }
}

/// 基于 html5ever DOM 的文本来源
#[derive(Clone)]
pub struct DomTextSource {
    document: Handle,
}

impl fmt::Debug for DomTextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomTextSource").finish_non_exhaustive()
    }
}

impl DomTextSource {
    pub fn new(document: Handle) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Handle {
        &self.document
    }

    fn walk_text_nodes(
        node: &Handle,
        ancestors: &mut Vec<ElementInfo>,
        out: &mut Vec<Candidate<DomLocation>>,
    ) {
        match &node.data {
            NodeData::Text { contents } => {
                out.push(Candidate {
                    location: DomLocation {
                        node: node.clone(),
                        snapshot: None,
                    },
                    text: contents.borrow().to_string(),
                    ancestors: ancestors.clone(),
                });
            }
            NodeData::Element { .. } => {
                if let Some(info) = ElementInfo::from_node(node) {
                    ancestors.push(info);
                    for child in node.children.borrow().iter() {
                        Self::walk_text_nodes(child, ancestors, out);
                    }
                    ancestors.pop();
                }
            }
            NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {}
            _ => {
                for child in node.children.borrow().iter() {
                    Self::walk_text_nodes(child, ancestors, out);
                }
            }
        }
    }

    fn walk_elements(
        node: &Handle,
        strategy: &ScanStrategy,
        ancestors: &mut Vec<ElementInfo>,
        out: &mut Vec<Candidate<DomLocation>>,
    ) {
        let info = ElementInfo::from_node(node);

        if let Some(info) = &info {
            if strategy.element_matches(info, ancestors) {
                let text = get_text_content(node);
                let children = node.children.borrow().clone();
                let mut chain = ancestors.clone();
                chain.push(info.clone());

                out.push(Candidate {
                    location: DomLocation {
                        node: node.clone(),
                        snapshot: Some((text.clone(), children)),
                    },
                    text,
                    ancestors: chain,
                });
                // 外层元素整体替换，不再收集内层匹配
                return;
            }
        }

        let pushed = info.map(|info| ancestors.push(info)).is_some();
        for child in node.children.borrow().iter() {
            Self::walk_elements(child, strategy, ancestors, out);
        }
        if pushed {
            ancestors.pop();
        }
    }
}

impl TextSource for DomTextSource {
    type Location = DomLocation;

    fn scan(&self, strategy: &ScanStrategy) -> Vec<Candidate<DomLocation>> {
        let mut out = Vec::new();
        let mut ancestors = Vec::new();

        match strategy {
            ScanStrategy::TextNodes => {
                Self::walk_text_nodes(&self.document, &mut ancestors, &mut out)
            }
            ScanStrategy::Elements { .. } => {
                Self::walk_elements(&self.document, strategy, &mut ancestors, &mut out)
            }
        }

        out
    }

    fn write(&self, location: &DomLocation, text: &str) {
        match &location.snapshot {
            Some((original, children)) if original == text => {
                replace_children(&location.node, children.clone());
            }
            _ => set_text_content(&location.node, text),
        }
    }
}

/// 内存中的文本来源，按下标寻址
#[derive(Debug, Default)]
pub struct MemoryTextSource {
    entries: RefCell<Vec<(String, Vec<ElementInfo>)>>,
}

impl MemoryTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每段文本都位于 `<body><p>` 中
    pub fn from_texts(texts: &[&str]) -> Self {
        let source = Self::new();
        for text in texts {
            source.push(text, vec![ElementInfo::new("body"), ElementInfo::new("p")]);
        }
        source
    }

    pub fn push(&self, text: &str, ancestors: Vec<ElementInfo>) -> usize {
        let mut entries = self.entries.borrow_mut();
        entries.push((text.to_string(), ancestors));
        entries.len() - 1
    }

    pub fn text(&self, index: usize) -> Option<String> {
        self.entries.borrow().get(index).map(|(text, _)| text.clone())
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

impl TextSource for MemoryTextSource {
    type Location = usize;

    fn scan(&self, _strategy: &ScanStrategy) -> Vec<Candidate<usize>> {
        self.entries
            .borrow()
            .iter()
            .enumerate()
            .map(|(index, (text, ancestors))| Candidate {
                location: index,
                text: text.clone(),
                ancestors: ancestors.clone(),
            })
            .collect()
    }

    fn write(&self, location: &usize, text: &str) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(*location) {
            entry.0 = text.to_string();
        }
    }
}
