//! 缓存解析
//!
//! 为收集到的节点登记原文，判断是否需要翻译，并列出当前语言
//! 缓存中缺失的原文（去重，保持首次出现的顺序）。

use std::collections::HashSet;

use markup5ever_rcdom::Handle;

use super::filters::TextFilter;
use crate::parsers::html::get_text_content;
use crate::translation::storage::{LocaleCache, NodeRecords};

/// 一次解析的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// 需要翻译的节点数
    pub translatable: usize,
    /// 被过滤掉的节点数
    pub filtered: usize,
    /// 缓存命中的节点数
    pub hits: usize,
    /// 缓存中缺失的原文
    pub missing: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct CacheResolver {
    filter: TextFilter,
}

impl CacheResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> &TextFilter {
        &self.filter
    }

    /// 解析节点
    ///
    /// `cache` 为 `None` 时（基础语言）只登记原文，不产生缺失项。
    pub fn resolve(
        &self,
        nodes: &[Handle],
        records: &mut NodeRecords,
        mut cache: Option<&mut LocaleCache>,
        base_locale: &str,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        let mut seen = HashSet::new();

        for node in nodes {
            let Some(current) = get_text_content(node) else {
                continue;
            };
            let record = records.track(node, &current, base_locale);
            let key = record.canonical_text.trim();

            if !self.filter.should_translate(key) {
                resolution.filtered += 1;
                continue;
            }
            resolution.translatable += 1;

            let Some(cache) = cache.as_deref_mut() else {
                continue;
            };
            if cache.get(key).is_some() {
                resolution.hits += 1;
            } else if seen.insert(key.to_string()) {
                resolution.missing.push(key.to_string());
            }
        }

        tracing::debug!(
            "解析 {} 个节点: {} 命中, {} 缺失, {} 跳过",
            nodes.len(),
            resolution.hits,
            resolution.missing.len(),
            resolution.filtered
        );
        resolution
    }
}
