//! 翻译服务核心实现
//!
//! `DomTranslator` 是文档翻译的入口，把收集、缓存解析、批次请求、
//! DOM 写入和持久化串成一次处理（pass）。
//!
//! ## 设计要点
//!
//! 1. **串行执行**: 语言切换、刷新和变更触发的处理都进入同一个队列，
//!    按提交顺序逐个完成
//! 2. **单线程**: DOM 基于 `Rc`，服务运行在 `LocalSet` 中
//! 3. **不抛出**: 批次和存储错误记录在 [`PassReport`] 中，
//!    只有队列失效时才返回 `Err`
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use dom_translator::parsers::html::html_to_dom;
//! use dom_translator::translation::{load_translation_config, DomTranslator};
//!
//! # async fn demo() -> dom_translator::translation::TranslationResult<()> {
//! let dom = html_to_dom(b"<p>Welcome</p>", "utf-8")?;
//! let config = load_translation_config(None);
//!
//! let local = tokio::task::LocalSet::new();
//! local
//!     .run_until(async move {
//!         let translator = DomTranslator::from_config(dom.document.clone(), config)?;
//!         let report = translator.set_locale("zh").await?;
//!         println!("写入 {} 个节点", report.mutation.written);
//!         translator.flush()
//!     })
//!     .await
//! # }
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use markup5ever_rcdom::Handle;

use super::engine::{EngineConfig, FillReport, TranslationEngine};
use super::mutator::{DomMutator, MutationReport};
use crate::translation::client::{HttpTranslator, Translator};
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::error::{helpers::log_error, TranslationError, TranslationResult};
use crate::translation::pipeline::{CacheResolver, CollectorConfig, Resolution, TextCollector};
use crate::translation::scheduler::{MutationKind, MutationObserver, QueuedTask, SerialQueue};
use crate::translation::storage::{
    KeyValueStore, LocaleStore, MemoryStore, NodeRecords, PersistScheduler, RedbStore,
};

/// 处理的触发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    SetLocale,
    Refresh,
    Observed,
}

enum PassRequest {
    SetLocale(String),
    Refresh,
    Observed,
}

impl PassRequest {
    fn kind(&self) -> PassKind {
        match self {
            PassRequest::SetLocale(_) => PassKind::SetLocale,
            PassRequest::Refresh => PassKind::Refresh,
            PassRequest::Observed => PassKind::Observed,
        }
    }
}

/// 一次处理的结果
#[derive(Debug)]
pub struct PassReport {
    pub kind: PassKind,
    /// 处理时生效的语言
    pub locale: String,
    pub nodes_collected: usize,
    pub resolution: Resolution,
    pub fill: FillReport,
    pub mutation: MutationReport,
    /// 批次失败或语言无效时的错误
    pub error: Option<TranslationError>,
    pub duration: Duration,
}

impl PassReport {
    fn new(kind: PassKind, locale: &str) -> Self {
        Self {
            kind,
            locale: locale.to_string(),
            nodes_collected: 0,
            resolution: Resolution::default(),
            fill: FillReport::default(),
            mutation: MutationReport::default(),
            error: None,
            duration: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// 服务统计
#[derive(Debug, Default)]
pub struct ServiceStats {
    pub passes_completed: AtomicU64,
    pub passes_failed: AtomicU64,
    pub observed_passes: AtomicU64,
    pub nodes_written: AtomicU64,
}

impl ServiceStats {
    fn record(&self, report: &PassReport) {
        if report.is_success() {
            self.passes_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.passes_failed.fetch_add(1, Ordering::Relaxed);
        }
        if report.kind == PassKind::Observed {
            self.observed_passes.fetch_add(1, Ordering::Relaxed);
        }
        self.nodes_written
            .fetch_add(report.mutation.written as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            passes_completed: self.passes_completed.load(Ordering::Relaxed),
            passes_failed: self.passes_failed.load(Ordering::Relaxed),
            observed_passes: self.observed_passes.load(Ordering::Relaxed),
            nodes_written: self.nodes_written.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatsSnapshot {
    pub passes_completed: u64,
    pub passes_failed: u64,
    pub observed_passes: u64,
    pub nodes_written: u64,
}

struct Inner {
    config: TranslationConfig,
    root: Handle,
    locale: RefCell<String>,
    records: RefCell<NodeRecords>,
    store: Rc<RefCell<LocaleStore>>,
    persist: PersistScheduler,
    collector: TextCollector,
    resolver: CacheResolver,
    engine: TranslationEngine,
    mutator: DomMutator,
    stats: ServiceStats,
}

/// 文档翻译器
///
/// 必须在 `tokio::task::LocalSet` 中创建和使用。
pub struct DomTranslator {
    inner: Rc<Inner>,
    queue: SerialQueue,
    observer: MutationObserver,
}

impl std::fmt::Debug for DomTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomTranslator")
            .field("locale", &self.inner.locale.borrow())
            .field("queue", &self.queue)
            .field("observer", &self.observer)
            .finish()
    }
}

impl DomTranslator {
    /// 创建翻译器
    ///
    /// # 错误
    /// 配置校验失败时返回 `ConfigError`
    pub fn new(
        root: Handle,
        config: TranslationConfig,
        translator: Rc<dyn Translator>,
        storage: Rc<dyn KeyValueStore>,
    ) -> TranslationResult<Self> {
        config.validate()?;

        let store = Rc::new(RefCell::new(LocaleStore::new(
            storage,
            constants::DOM_CACHE_PREFIX,
            config.persist_cache_cap,
        )));
        let persist = PersistScheduler::new(Rc::clone(&store), config.persist_debounce());

        let inner = Rc::new(Inner {
            locale: RefCell::new(config.base_locale.clone()),
            records: RefCell::new(NodeRecords::new()),
            store,
            persist,
            collector: TextCollector::new(CollectorConfig::from(&config)),
            resolver: CacheResolver::new(),
            engine: TranslationEngine::new(translator, EngineConfig::from(&config)),
            mutator: DomMutator::new(),
            stats: ServiceStats::default(),
            root,
            config,
        });

        let queue = SerialQueue::new();
        let callback: Rc<dyn Fn()> = {
            let queue = queue.clone();
            let inner = Rc::downgrade(&inner);
            Rc::new(move || {
                if let Some(inner) = inner.upgrade() {
                    let _ = queue.submit(run_pass(inner, PassRequest::Observed));
                }
            })
        };
        let observer = MutationObserver::new(inner.config.frame_interval(), callback);

        tracing::debug!(
            "翻译器已创建: 基础语言 {}, 支持 {:?}",
            inner.config.base_locale,
            inner.config.supported_locales
        );

        Ok(Self {
            inner,
            queue,
            observer,
        })
    }

    /// 按配置创建 HTTP 翻译服务和存储
    ///
    /// 配置了 `storage_path` 时使用 redb 文件，否则使用内存存储。
    pub fn from_config(root: Handle, config: TranslationConfig) -> TranslationResult<Self> {
        let translator: Rc<dyn Translator> = Rc::new(HttpTranslator::new(&config)?);
        let storage: Rc<dyn KeyValueStore> = match &config.storage_path {
            Some(path) => Rc::new(RedbStore::open(shellexpand::tilde(path).into_owned())?),
            None => Rc::new(MemoryStore::new()),
        };
        Self::new(root, config, translator, storage)
    }

    /// 切换语言并处理整个文档
    ///
    /// 不支持的语言不会改变当前语言，错误记录在报告中。
    pub fn set_locale(&self, locale: &str) -> QueuedTask<PassReport> {
        tracing::debug!("切换语言: {}", locale);
        self.queue.submit(run_pass(
            Rc::clone(&self.inner),
            PassRequest::SetLocale(locale.to_string()),
        ))
    }

    /// 以当前语言重新处理文档
    pub fn refresh(&self) -> QueuedTask<PassReport> {
        self.queue
            .submit(run_pass(Rc::clone(&self.inner), PassRequest::Refresh))
    }

    /// 通知文档发生了变更，返回是否安排了新的处理
    pub fn notify_mutation(&self, kind: MutationKind) -> bool {
        self.observer.notify(kind)
    }

    pub fn observer(&self) -> &MutationObserver {
        &self.observer
    }

    /// 当前语言
    pub fn locale(&self) -> String {
        self.inner.locale.borrow().clone()
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.inner.config
    }

    pub fn root(&self) -> &Handle {
        &self.inner.root
    }

    /// 队列中未完成的处理数
    pub fn pending_passes(&self) -> usize {
        self.queue.depth()
    }

    pub fn tracked_nodes(&self) -> usize {
        self.inner.records.borrow().len()
    }

    /// 查询缓存中的译文
    pub fn cached_translation(&self, locale: &str, source: &str) -> Option<String> {
        self.inner
            .store
            .borrow()
            .cache(locale)
            .and_then(|cache| cache.peek(source).cloned())
    }

    pub fn cached_entries(&self, locale: &str) -> usize {
        self.inner
            .store
            .borrow()
            .cache(locale)
            .map_or(0, |cache| cache.len())
    }

    /// 立即写入所有待持久化的语言缓存
    pub fn flush(&self) -> TranslationResult<()> {
        self.inner.persist.flush()
    }

    pub fn get_stats(&self) -> ServiceStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

async fn run_pass(inner: Rc<Inner>, request: PassRequest) -> PassReport {
    let start_time = Instant::now();
    let kind = request.kind();

    if let PassRequest::SetLocale(locale) = &request {
        if !inner.config.is_supported_locale(locale) {
            let error = TranslationError::InvalidInput(format!("不支持的语言: {}", locale));
            log_error(&error);
            let mut report = PassReport::new(kind, locale);
            report.error = Some(error);
            report.duration = start_time.elapsed();
            inner.stats.record(&report);
            return report;
        }
        *inner.locale.borrow_mut() = locale.clone();
    }

    let locale = inner.locale.borrow().clone();
    let mut report = inner.process(kind, &locale).await;
    report.duration = start_time.elapsed();
    inner.stats.record(&report);

    tracing::info!(
        "{} 处理完成 ({:?}): {} 个节点, {} 条请求, {} 个写入, 用时 {:?}",
        locale,
        kind,
        report.nodes_collected,
        report.resolution.missing.len(),
        report.mutation.written,
        report.duration
    );
    report
}

impl Inner {
    async fn process(&self, kind: PassKind, locale: &str) -> PassReport {
        let mut report = PassReport::new(kind, locale);

        let pruned = self.records.borrow_mut().prune();
        if pruned > 0 {
            tracing::debug!("清除 {} 条失效节点记录", pruned);
        }

        if !self.config.enabled {
            tracing::debug!("翻译已禁用，跳过处理");
            return report;
        }

        let nodes = self.collector.collect(&self.root);
        report.nodes_collected = nodes.len();
        let is_base = self.config.is_base_locale(locale);

        report.resolution = {
            let mut records = self.records.borrow_mut();
            if is_base {
                self.resolver
                    .resolve(&nodes, &mut records, None, &self.config.base_locale)
            } else {
                let mut store = self.store.borrow_mut();
                self.resolver.resolve(
                    &nodes,
                    &mut records,
                    Some(store.cache_mut(locale)),
                    &self.config.base_locale,
                )
            }
        };

        if !report.resolution.missing.is_empty() {
            report.fill = self
                .engine
                .fill_cache(locale, report.resolution.missing.clone(), &self.store)
                .await;
            report.error = report.fill.error.take();
            if report.fill.translated > 0 {
                self.persist.schedule(locale);
            }
        }

        report.mutation = {
            let mut records = self.records.borrow_mut();
            if is_base {
                self.mutator.apply(&nodes, &mut records, None)
            } else {
                let store = self.store.borrow();
                self.mutator.apply(&nodes, &mut records, store.cache(locale))
            }
        };
        self.mutator.set_document_lang(&self.root, locale);

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::{find_nodes, get_text_content, html_to_dom};
    use futures::future::{FutureExt, LocalBoxFuture};
    use std::cell::Cell;
    use tokio::task::LocalSet;

    /// 把原文包在方括号中返回
    #[derive(Default)]
    struct Bracketing {
        calls: Cell<usize>,
    }

    impl Translator for Bracketing {
        fn translate<'a>(
            &'a self,
            _source: &'a str,
            target: &'a str,
            texts: &'a [String],
        ) -> LocalBoxFuture<'a, TranslationResult<Vec<Option<String>>>> {
            self.calls.set(self.calls.get() + 1);
            let out = texts
                .iter()
                .map(|t| Some(format!("[{}:{}]", target, t)))
                .collect();
            async move { Ok(out) }.boxed_local()
        }
    }

    fn paragraph_text(root: &Handle) -> Option<String> {
        let p = find_nodes(root, &["p"]).remove(0);
        let text = p.children.borrow()[0].clone();
        get_text_content(&text)
    }

    #[tokio::test]
    async fn test_switch_and_restore() {
        LocalSet::new()
            .run_until(async {
                let dom = html_to_dom(b"<html><body><p>Welcome</p></body></html>", "utf-8").unwrap();
                let translator = Rc::new(Bracketing::default());
                let service = DomTranslator::new(
                    dom.document.clone(),
                    TranslationConfig::default(),
                    translator.clone(),
                    Rc::new(MemoryStore::new()),
                )
                .unwrap();

                let report = service.set_locale("ta").await.unwrap();
                assert!(report.is_success());
                assert_eq!(paragraph_text(&dom.document).as_deref(), Some("[ta:Welcome]"));
                assert_eq!(service.locale(), "ta");

                service.set_locale("en").await.unwrap();
                assert_eq!(paragraph_text(&dom.document).as_deref(), Some("Welcome"));
                assert_eq!(translator.calls.get(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_unsupported_locale_is_reported() {
        LocalSet::new()
            .run_until(async {
                let dom = html_to_dom(b"<p>Welcome</p>", "utf-8").unwrap();
                let service = DomTranslator::new(
                    dom.document.clone(),
                    TranslationConfig::default(),
                    Rc::new(Bracketing::default()),
                    Rc::new(MemoryStore::new()),
                )
                .unwrap();

                let report = service.set_locale("fr").await.unwrap();
                assert!(matches!(report.error, Some(TranslationError::InvalidInput(_))));
                assert_eq!(service.locale(), "en");
                assert_eq!(service.get_stats().passes_failed, 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_disabled_config_leaves_document() {
        LocalSet::new()
            .run_until(async {
                let dom = html_to_dom(b"<p>Welcome</p>", "utf-8").unwrap();
                let config = TranslationConfig {
                    enabled: false,
                    ..TranslationConfig::default()
                };
                let service = DomTranslator::new(
                    dom.document.clone(),
                    config,
                    Rc::new(Bracketing::default()),
                    Rc::new(MemoryStore::new()),
                )
                .unwrap();

                let report = service.set_locale("zh").await.unwrap();
                assert_eq!(report.nodes_collected, 0);
                assert_eq!(paragraph_text(&dom.document).as_deref(), Some("Welcome"));
            })
            .await;
    }
}
