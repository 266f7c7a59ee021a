//! 文本节点记录
//!
//! 以节点身份（`Rc` 地址）为键的旁路表，只持有 `Weak` 句柄，
//! 不延长节点寿命；节点被丢弃后记录在下一次 `prune` 时清除。

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

/// 单个文本节点的元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// 基础语言下的原文，缓存查找的稳定键
    pub canonical_text: String,
    /// 记录原文时的语言
    pub base_locale: String,
    /// 管道最后一次看到或写入的内容
    pub applied_text: Option<String>,
}

impl NodeRecord {
    pub fn new(canonical_text: String, base_locale: &str) -> Self {
        Self {
            canonical_text,
            base_locale: base_locale.to_string(),
            applied_text: None,
        }
    }

    /// 节点当前应当显示的内容
    pub fn expected_text(&self) -> &str {
        self.applied_text.as_deref().unwrap_or(&self.canonical_text)
    }
}

struct Slot {
    node: Weak<Node>,
    record: NodeRecord,
}

/// 节点记录表
#[derive(Default)]
pub struct NodeRecords {
    slots: HashMap<usize, Slot>,
}

impl std::fmt::Debug for NodeRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRecords")
            .field("len", &self.slots.len())
            .finish()
    }
}

fn identity(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}

impl NodeRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &Handle) -> Option<&NodeRecord> {
        self.slots
            .get(&identity(node))
            .filter(|slot| slot.node.strong_count() > 0)
            .map(|slot| &slot.record)
    }

    /// 登记节点的当前内容并返回其记录
    ///
    /// 首次遇到的节点以当前内容为原文。已有记录时，如果当前内容
    /// 不同于管道最后看到的内容，说明页面重新渲染了该节点，
    /// 当前内容重新确认为基础语言原文。
    pub fn track(&mut self, node: &Handle, current_text: &str, base_locale: &str) -> &NodeRecord {
        let slot = self.slots.entry(identity(node)).or_insert_with(|| Slot {
            node: Rc::downgrade(node),
            record: NodeRecord::new(current_text.to_string(), base_locale),
        });

        if slot.node.strong_count() == 0 {
            *slot = Slot {
                node: Rc::downgrade(node),
                record: NodeRecord::new(current_text.to_string(), base_locale),
            };
        } else if slot.record.expected_text() != current_text {
            tracing::trace!(
                "节点内容被外部更新: {:?} -> {:?}",
                slot.record.canonical_text,
                current_text
            );
            slot.record = NodeRecord::new(current_text.to_string(), base_locale);
        }

        &slot.record
    }

    /// 记录管道写入（或确认）的内容
    pub fn mark_applied(&mut self, node: &Handle, text: &str) {
        if let Some(slot) = self.slots.get_mut(&identity(node)) {
            slot.record.applied_text = Some(text.to_string());
        }
    }

    /// 清除已被丢弃节点的记录，返回清除数量
    pub fn prune(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.node.strong_count() > 0);
        before - self.slots.len()
    }

    /// 所有仍然存活的节点及其记录
    pub fn live_entries(&self) -> Vec<(Handle, NodeRecord)> {
        self.slots
            .values()
            .filter_map(|slot| slot.node.upgrade().map(|node| (node, slot.record.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
