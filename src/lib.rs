//! # dom-translator
//!
//! 把HTML文档的可见文本切换到目标语言：收集文本节点、批量请求翻译、
//! 按语言缓存译文并持久化，所有处理经串行队列执行。
//!
//! ## 模块组织
//!
//! - `env` - 类型化的环境变量
//! - `parsers` - HTML解析、节点读写和序列化
//! - `translation` - 翻译管道、缓存、调度和服务

pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use translation::{DomTranslator, PassReport, TranslationConfig, TranslationError};
