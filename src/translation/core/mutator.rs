//! DOM 写入
//!
//! 按节点记录和语言缓存计算每个节点应显示的内容，只在内容不同时写入。
//! 写入不会触发变更通知。

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::{
    get_child_node_by_name, get_text_content, set_node_attr, set_text_content,
};
use crate::translation::pipeline::filters::split_whitespace_bounds;
use crate::translation::storage::{LocaleCache, NodeRecords};

/// 写入结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MutationReport {
    /// 实际写入的节点数
    pub written: usize,
    /// 内容已经正确、未写入的节点数
    pub unchanged: usize,
    /// 显示译文的节点数
    pub translated: usize,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DomMutator;

impl DomMutator {
    pub fn new() -> Self {
        Self
    }

    /// 应用缓存到节点
    ///
    /// `cache` 为 `None`，或者缓存中没有对应原文时，节点恢复原文。
    /// 译文保留原文的首尾空白。
    pub fn apply(
        &self,
        nodes: &[Handle],
        records: &mut NodeRecords,
        cache: Option<&LocaleCache>,
    ) -> MutationReport {
        let mut report = MutationReport::default();

        for node in nodes {
            let Some(record) = records.get(node) else {
                continue;
            };
            let canonical = &record.canonical_text;

            let (leading, body, trailing) = split_whitespace_bounds(canonical);
            let target = match cache.and_then(|cache| cache.peek(body)) {
                Some(translated) => {
                    report.translated += 1;
                    format!("{}{}{}", leading, translated, trailing)
                }
                None => canonical.clone(),
            };

            if get_text_content(node).as_deref() == Some(target.as_str()) {
                report.unchanged += 1;
            } else if set_text_content(node, &target) {
                report.written += 1;
            }
            records.mark_applied(node, &target);
        }

        tracing::debug!(
            "DOM 写入: {} 个节点更新, {} 个未变",
            report.written,
            report.unchanged
        );
        report
    }

    /// 将文档根元素的 `lang` 属性设为当前语言
    pub fn set_document_lang(&self, root: &Handle, locale: &str) -> bool {
        let html = match root.data {
            NodeData::Document => get_child_node_by_name(root, "html"),
            _ => None,
        };
        match html {
            Some(html) => {
                set_node_attr(&html, "lang", Some(locale.to_string()));
                true
            }
            None => false,
        }
    }
}
