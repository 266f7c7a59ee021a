//! 翻译管道模块
//!
//! 文本处理管道：收集、过滤、缓存解析和批次分组

pub mod batch;
pub mod collector;
pub mod filters;
pub mod resolver;

// 重新导出主要类型
pub use batch::{Batch, BatchLimits, BatchManager, BatchStats};
pub use collector::{CollectorConfig, TextCollector};
pub use filters::{split_whitespace_bounds, TextFilter};
pub use resolver::{CacheResolver, Resolution};
