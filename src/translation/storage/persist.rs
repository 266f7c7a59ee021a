//! 本地持久化
//!
//! 键值存储抽象、内存实现与基于 redb 的磁盘实现，
//! 以及按语言去抖的写入调度。

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use redb::{Database, ReadableTable, TableDefinition};

use super::cache::LocaleStore;
use crate::translation::error::{
    helpers::{log_error, storage_error},
    TranslationResult,
};

/// 本地键值存储
pub trait KeyValueStore {
    fn get(&self, key: &str) -> TranslationResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> TranslationResult<()>;
}

/// 进程内存储，主要用于测试和无盘运行
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计的写入次数
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> TranslationResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

const CACHE_TABLE: TableDefinition<&str, &str> = TableDefinition::new("locale_caches");

/// redb 磁盘存储
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// 打开（不存在则创建）数据库文件
    pub fn open<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let db = Database::create(path.as_ref()).map_err(storage_error)?;
        tracing::debug!("已打开缓存数据库: {}", path.as_ref().display());
        Ok(Self { db })
    }
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let table = match read_txn.open_table(CACHE_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(storage_error(e)),
        };
        let value = table.get(key).map_err(storage_error)?;
        Ok(value.map(|guard| guard.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> TranslationResult<()> {
        let write_txn = self.db.begin_write().map_err(storage_error)?;
        {
            let mut table = write_txn.open_table(CACHE_TABLE).map_err(storage_error)?;
            table.insert(key, value).map_err(storage_error)?;
        }
        write_txn.commit().map_err(storage_error)?;
        Ok(())
    }
}

/// 去抖写入调度
///
/// 同一语言在一个窗口内至多安排一次写入；窗口结束时写入
/// 该语言缓存的最新快照。需要在 `LocalSet` 中使用。
pub struct PersistScheduler {
    store: Rc<RefCell<LocaleStore>>,
    pending: Rc<RefCell<HashSet<String>>>,
    delay: Duration,
}

impl PersistScheduler {
    pub fn new(store: Rc<RefCell<LocaleStore>>, delay: Duration) -> Self {
        Self {
            store,
            pending: Rc::new(RefCell::new(HashSet::new())),
            delay,
        }
    }

    /// 安排写入；窗口内已有待写入时返回 `false`
    pub fn schedule(&self, locale: &str) -> bool {
        if !self.pending.borrow_mut().insert(locale.to_string()) {
            return false;
        }

        let store = Rc::clone(&self.store);
        let pending = Rc::clone(&self.pending);
        let locale = locale.to_string();
        let delay = self.delay;

        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if pending.borrow_mut().remove(&locale) {
                if let Err(e) = store.borrow().persist(&locale) {
                    log_error(&e);
                }
            }
        });

        true
    }

    /// 立即写入所有待写入的语言
    pub fn flush(&self) -> TranslationResult<()> {
        let locales: Vec<String> = self.pending.borrow_mut().drain().collect();
        let store = self.store.borrow();
        for locale in locales {
            store.persist(&locale)?;
        }
        Ok(())
    }
}
