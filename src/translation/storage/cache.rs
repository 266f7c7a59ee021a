//! 语言缓存
//!
//! 每个目标语言一份 `原文 -> 译文` 映射。内存中按最近使用排序，
//! 不设上限；持久化时只写入最近使用的 `cap` 条。

use std::collections::HashMap;
use std::rc::Rc;

use lru::LruCache;
use serde_json::{Map, Value};

use super::persist::KeyValueStore;
use crate::translation::error::{helpers::log_error, TranslationResult};

/// 缓存统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// 单个语言的翻译缓存
pub struct LocaleCache {
    locale: String,
    entries: LruCache<String, String>,
    stats: CacheStats,
}

impl std::fmt::Debug for LocaleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleCache")
            .field("locale", &self.locale)
            .field("len", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl LocaleCache {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            entries: LruCache::unbounded(),
            stats: CacheStats::default(),
        }
    }

    /// 从持久化的 JSON 对象恢复；对象中靠后的条目视为较新
    pub fn from_json(locale: &str, json: &str) -> TranslationResult<Self> {
        let map: Map<String, Value> = serde_json::from_str(json)?;
        let mut cache = Self::new(locale);
        for (source, value) in map {
            if let Value::String(translated) = value {
                cache.entries.put(source, translated);
            }
        }
        Ok(cache)
    }

    /// 序列化最近使用的 `cap` 条，按从旧到新排列
    pub fn to_json(&self, cap: usize) -> TranslationResult<String> {
        let newest: Vec<(&String, &String)> = self.entries.iter().take(cap).collect();
        let mut map = Map::with_capacity(newest.len());
        for (source, translated) in newest.into_iter().rev() {
            map.insert(source.clone(), Value::String(translated.clone()));
        }
        Ok(serde_json::to_string(&map)?)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// 查找并刷新最近使用顺序
    pub fn get(&mut self, source: &str) -> Option<&String> {
        match self.entries.get(source) {
            Some(translated) => {
                self.stats.hits += 1;
                Some(translated)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// 只读查找，不影响顺序和统计
    pub fn peek(&self, source: &str) -> Option<&String> {
        self.entries.peek(source)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains(source)
    }

    pub fn insert(&mut self, source: String, translated: String) {
        self.stats.inserts += 1;
        self.entries.put(source, translated);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

/// 多语言缓存集合，按需从键值存储加载
pub struct LocaleStore {
    caches: HashMap<String, LocaleCache>,
    backend: Rc<dyn KeyValueStore>,
    key_prefix: String,
    persist_cap: usize,
}

impl std::fmt::Debug for LocaleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleStore")
            .field("key_prefix", &self.key_prefix)
            .field("locales", &self.caches.keys().collect::<Vec<_>>())
            .field("persist_cap", &self.persist_cap)
            .finish()
    }
}

impl LocaleStore {
    pub fn new(backend: Rc<dyn KeyValueStore>, key_prefix: &str, persist_cap: usize) -> Self {
        Self {
            caches: HashMap::new(),
            backend,
            key_prefix: key_prefix.to_string(),
            persist_cap,
        }
    }

    pub fn storage_key(&self, locale: &str) -> String {
        format!("{}{}", self.key_prefix, locale)
    }

    /// 取得语言缓存，首次访问时从存储加载
    ///
    /// 存储读取失败或内容损坏时记录日志并使用空缓存。
    pub fn cache_mut(&mut self, locale: &str) -> &mut LocaleCache {
        if !self.caches.contains_key(locale) {
            let cache = self.load(locale);
            self.caches.insert(locale.to_string(), cache);
        }
        self.caches
            .entry(locale.to_string())
            .or_insert_with(|| LocaleCache::new(locale))
    }

    pub fn cache(&self, locale: &str) -> Option<&LocaleCache> {
        self.caches.get(locale)
    }

    fn load(&self, locale: &str) -> LocaleCache {
        let key = self.storage_key(locale);
        let loaded = self.backend.get(&key).and_then(|raw| match raw {
            Some(json) => LocaleCache::from_json(locale, &json).map(Some),
            None => Ok(None),
        });

        match loaded {
            Ok(Some(cache)) => {
                tracing::debug!("已加载 {} 条 {} 缓存", cache.len(), locale);
                cache
            }
            Ok(None) => LocaleCache::new(locale),
            Err(e) => {
                log_error(&e.with_context(&key));
                LocaleCache::new(locale)
            }
        }
    }

    /// 立即写入一个语言的缓存快照
    pub fn persist(&self, locale: &str) -> TranslationResult<()> {
        let Some(cache) = self.caches.get(locale) else {
            return Ok(());
        };
        let json = cache.to_json(self.persist_cap)?;
        self.backend.set(&self.storage_key(locale), &json)?;
        tracing::debug!(
            "已持久化 {} 缓存 ({} 条)",
            locale,
            cache.len().min(self.persist_cap)
        );
        Ok(())
    }

    pub fn persist_cap(&self) -> usize {
        self.persist_cap
    }
}
