//! 翻译批次管理器模块
//!
//! 将待翻译字符串按顺序切分为批次，每个批次同时受条目数和字符数限制。
//!
//! ## 分组规则
//!
//! 1. 保持输入顺序，不重排
//! 2. 加入下一条会超出任一限制时，先结束当前批次
//! 3. 字符串不会被拆开；单条超过字符上限时独占一个批次
//!
//! ## 使用示例
//!
//! ```rust
//! use dom_translator::translation::pipeline::batch::{BatchLimits, BatchManager};
//!
//! let manager = BatchManager::new(BatchLimits { max_items: 80, max_chars: 3500 });
//! let batches = manager.create_batches(vec!["Welcome".to_string()]);
//! assert_eq!(batches.len(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::translation::config::{constants, TranslationConfig};

/// 单个批次的限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_items: usize,
    /// 以 Unicode 标量值计数
    pub max_chars: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_items: constants::MAX_BATCH_ITEMS,
            max_chars: constants::MAX_BATCH_CHARS,
        }
    }
}

impl From<&TranslationConfig> for BatchLimits {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            max_items: config.max_batch_items.max(1),
            max_chars: config.max_batch_chars.max(1),
        }
    }
}

/// 翻译批次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 批次在本次分组中的序号
    pub id: usize,
    pub texts: Vec<String>,
    /// 所有文本的字符总数
    pub char_count: usize,
}

impl Batch {
    fn new(id: usize) -> Self {
        Self {
            id,
            texts: Vec::new(),
            char_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// 是否超出限制（只可能是独占批次的超长文本）
    pub fn is_oversized(&self, limits: &BatchLimits) -> bool {
        self.char_count > limits.max_chars
    }
}

/// 批次统计
#[derive(Debug, Default)]
pub struct BatchStats {
    input_items: AtomicUsize,
    output_batches: AtomicUsize,
    oversized_items: AtomicUsize,
}

impl BatchStats {
    pub fn get_input_items(&self) -> usize {
        self.input_items.load(Ordering::Relaxed)
    }

    pub fn get_output_batches(&self) -> usize {
        self.output_batches.load(Ordering::Relaxed)
    }

    pub fn get_oversized_items(&self) -> usize {
        self.oversized_items.load(Ordering::Relaxed)
    }
}

/// 批次管理器
#[derive(Debug, Default)]
pub struct BatchManager {
    limits: BatchLimits,
    stats: BatchStats,
}

impl BatchManager {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            stats: BatchStats::default(),
        }
    }

    pub fn limits(&self) -> &BatchLimits {
        &self.limits
    }

    /// 按顺序分组
    pub fn create_batches(&self, texts: Vec<String>) -> Vec<Batch> {
        let input_len = texts.len();
        let mut batches = Vec::new();
        let mut current = Batch::new(0);

        for text in texts {
            let chars = text.chars().count();

            let exceeds_items = current.len() + 1 > self.limits.max_items;
            let exceeds_chars = current.char_count + chars > self.limits.max_chars;
            if !current.is_empty() && (exceeds_items || exceeds_chars) {
                let next_id = current.id + 1;
                batches.push(std::mem::replace(&mut current, Batch::new(next_id)));
            }

            if chars > self.limits.max_chars {
                tracing::debug!("文本超过批次字符上限，单独发送: {} 字符", chars);
                self.stats.oversized_items.fetch_add(1, Ordering::Relaxed);
            }

            current.char_count += chars;
            current.texts.push(text);
        }

        if !current.is_empty() {
            batches.push(current);
        }

        self.stats.input_items.fetch_add(input_len, Ordering::Relaxed);
        self.stats
            .output_batches
            .fetch_add(batches.len(), Ordering::Relaxed);

        tracing::debug!("{} 条文本分为 {} 个批次", input_len, batches.len());
        batches
    }

    pub fn get_stats(&self) -> &BatchStats {
        &self.stats
    }
}
