//! 存储模块
//!
//! 节点记录、语言缓存和本地持久化。

pub mod cache;
pub mod persist;
pub mod records;

pub use cache::{CacheStats, LocaleCache, LocaleStore};
pub use persist::{KeyValueStore, MemoryStore, PersistScheduler, RedbStore};
pub use records::{NodeRecord, NodeRecords};
