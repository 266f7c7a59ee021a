//! 文本收集器模块
//!
//! 按文档顺序收集可翻译的文本节点。只读，不修改DOM。

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::{get_node_attr, get_parent_element_name};
use crate::translation::config::{constants, TranslationConfig};

/// 收集器配置
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 这些元素的直接文本子节点不收集
    pub skip_elements: Vec<String>,
    /// 是否遵循 HTML `translate="no"` 属性
    pub respect_translate_attr: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            skip_elements: constants::SKIP_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            respect_translate_attr: true,
        }
    }
}

impl From<&TranslationConfig> for CollectorConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            skip_elements: config
                .skip_elements
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            respect_translate_attr: config.respect_translate_attr,
        }
    }
}

/// 文本节点收集器
#[derive(Debug, Clone, Default)]
pub struct TextCollector {
    config: CollectorConfig,
}

impl TextCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// 收集 `root` 子树中的可翻译文本节点
    pub fn collect(&self, root: &Handle) -> Vec<Handle> {
        let mut nodes = Vec::new();
        let parent_tag = match root.data {
            NodeData::Text { .. } => get_parent_element_name(root),
            _ => None,
        };
        self.walk(root, parent_tag.as_deref(), false, &mut nodes);
        nodes
    }

    fn walk(
        &self,
        node: &Handle,
        parent_tag: Option<&str>,
        no_translate: bool,
        nodes: &mut Vec<Handle>,
    ) {
        match &node.data {
            NodeData::Text { contents } => {
                if no_translate || parent_tag.is_some_and(|tag| self.is_skipped(tag)) {
                    return;
                }
                if !contents.borrow().trim().is_empty() {
                    nodes.push(node.clone());
                }
            }
            NodeData::Element { name, .. } => {
                let tag = name.local.as_ref();
                let no_translate = self.translate_flag(node).unwrap_or(no_translate);
                for child in node.children.borrow().iter() {
                    self.walk(child, Some(tag), no_translate, nodes);
                }
            }
            NodeData::Document => {
                for child in node.children.borrow().iter() {
                    self.walk(child, parent_tag, no_translate, nodes);
                }
            }
            _ => {}
        }
    }

    fn is_skipped(&self, tag: &str) -> bool {
        self.config
            .skip_elements
            .iter()
            .any(|skip| skip.eq_ignore_ascii_case(tag))
    }

    /// `translate` 属性：`Some(true)` 表示禁止翻译
    fn translate_flag(&self, node: &Handle) -> Option<bool> {
        if !self.config.respect_translate_attr {
            return None;
        }
        match get_node_attr(node, "translate")?.trim().to_ascii_lowercase().as_str() {
            "no" => Some(true),
            "yes" | "" => Some(false),
            _ => None,
        }
    }
}
