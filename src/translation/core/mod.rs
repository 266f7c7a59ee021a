//! 翻译系统核心模块
//!
//! 把管道、缓存和调度组合成完整的文档翻译流程。
//!
//! ## 架构设计
//!
//! - **服务层** (`service.rs`): `DomTranslator`，对外入口，所有处理经串行队列执行
//! - **引擎层** (`engine.rs`): 批次请求、重试和译文对齐，结果写入语言缓存
//! - **写入层** (`mutator.rs`): 根据缓存把译文或原文写回文本节点
//!
//! ## 模块依赖关系
//!
//! ```text
//! DomTranslator (service.rs)
//!     ├── SerialQueue / MutationObserver (scheduler/)
//!     ├── TextCollector (pipeline/collector.rs)
//!     ├── CacheResolver (pipeline/resolver.rs)
//!     ├── TranslationEngine (engine.rs)
//!     │       ├── BatchManager (pipeline/batch.rs)
//!     │       └── Translator (client.rs)
//!     ├── DomMutator (mutator.rs)
//!     └── LocaleStore / PersistScheduler (storage/)
//! ```

pub mod engine;
pub mod mutator;
pub mod service;

/// 翻译引擎 - 批次请求与缓存填充
pub use engine::{EngineConfig, EngineStatsSnapshot, FillReport, TranslationEngine};

/// DOM 写入
pub use mutator::{DomMutator, MutationReport};

/// 文档翻译器 - 主要的对外接口
pub use service::{DomTranslator, PassKind, PassReport, ServiceStats, ServiceStatsSnapshot};
