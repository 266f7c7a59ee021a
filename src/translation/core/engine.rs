//! 翻译引擎核心实现
//!
//! 负责把缓存中缺失的原文送往翻译服务，并把结果写回语言缓存。
//!
//! ## 工作流程
//! 1. 将缺失原文按条目数与字符数分组为批次
//! 2. 依次发送批次；同一时刻只有一个请求在途
//! 3. 按位置对齐译文，成功的条目写入缓存
//! 4. 某个批次失败时停止发送后续批次，已写入的结果保留
//!
//! ## 错误恢复
//! 可重试的错误（网络错误、超时、5xx/429）按指数退避重试，
//! 最多 `max_retry_attempts` 次尝试。默认只尝试一次。
//!
//! ## 对齐策略
//! 译文缺失、为空或返回长度不足时，对应原文不写入缓存，
//! 节点继续显示原文，下一次处理时会再次请求。

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::translation::client::Translator;
use crate::translation::config::TranslationConfig;
use crate::translation::error::{helpers::log_error, TranslationError, TranslationResult};
use crate::translation::pipeline::batch::{Batch, BatchLimits, BatchManager};
use crate::translation::storage::LocaleStore;

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 请求的源语言
    pub source_locale: String,
    pub batch_limits: BatchLimits,
    /// 每个批次的最大尝试次数（含首次）
    pub max_retry_attempts: usize,
    /// 首次重试前的等待，之后每次翻倍
    pub retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&TranslationConfig::default())
    }
}

impl From<&TranslationConfig> for EngineConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            source_locale: config.base_locale.clone(),
            batch_limits: BatchLimits::from(config),
            max_retry_attempts: config.max_retry_attempts.max(1),
            retry_delay: config.retry_delay(),
        }
    }
}

/// 一次填充缓存的结果
#[derive(Debug, Default)]
pub struct FillReport {
    /// 分组得到的批次数
    pub batches_planned: usize,
    /// 成功完成的批次数
    pub batches_completed: usize,
    /// 实际发出的请求数（含重试）
    pub requests_sent: usize,
    /// 写入缓存的条目数
    pub translated: usize,
    /// 没有可用译文的条目数
    pub unresolved: usize,
    /// 返回长度与请求不一致的批次数
    pub misaligned_batches: usize,
    /// 导致停止的错误
    pub error: Option<TranslationError>,
    pub duration: Duration,
}

impl FillReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.batches_completed == self.batches_planned
    }
}

/// 引擎统计
#[derive(Debug, Default)]
pub struct EngineStats {
    pub requests_sent: AtomicUsize,
    pub batches_completed: AtomicUsize,
    pub batches_failed: AtomicUsize,
    pub texts_translated: AtomicUsize,
    pub retries: AtomicUsize,
}

impl EngineStats {
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            texts_translated: self.texts_translated.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            ..EngineStatsSnapshot::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    pub requests_sent: usize,
    pub batches_completed: usize,
    pub batches_failed: usize,
    pub texts_translated: usize,
    pub retries: usize,
    /// 进入分批的原文条数
    pub texts_batched: usize,
    pub batches_created: usize,
    /// 超出字符上限而独占批次的原文
    pub oversized_texts: usize,
}

/// 翻译引擎
///
/// 单线程使用：翻译服务以 `Rc` 共享，缓存通过 `RefCell` 访问，
/// 借用不会跨越 `await`。
pub struct TranslationEngine {
    translator: Rc<dyn Translator>,
    batches: BatchManager,
    config: EngineConfig,
    stats: EngineStats,
}

impl TranslationEngine {
    pub fn new(translator: Rc<dyn Translator>, config: EngineConfig) -> Self {
        Self {
            translator,
            batches: BatchManager::new(config.batch_limits),
            config,
            stats: EngineStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn get_stats(&self) -> EngineStatsSnapshot {
        let batches = self.batches.get_stats();
        EngineStatsSnapshot {
            texts_batched: batches.get_input_items(),
            batches_created: batches.get_output_batches(),
            oversized_texts: batches.get_oversized_items(),
            ..self.stats.snapshot()
        }
    }

    /// 翻译缺失原文并写入 `locale` 的缓存
    ///
    /// 不返回错误：失败记录在 [`FillReport::error`] 中。
    pub async fn fill_cache(
        &self,
        locale: &str,
        missing: Vec<String>,
        store: &RefCell<LocaleStore>,
    ) -> FillReport {
        let start_time = Instant::now();
        let batches = self.batches.create_batches(missing);
        let mut report = FillReport {
            batches_planned: batches.len(),
            ..FillReport::default()
        };

        for batch in &batches {
            match self.request_with_retry(locale, batch, &mut report).await {
                Ok(results) => {
                    self.apply_results(locale, batch, results, store, &mut report);
                    report.batches_completed += 1;
                    self.stats.batches_completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    let e = e.with_context(format!("批次 {}/{}", batch.id + 1, batches.len()));
                    log_error(&e);
                    self.stats.batches_failed.fetch_add(1, Ordering::Relaxed);
                    report.error = Some(e);
                    break;
                }
            }
        }

        report.duration = start_time.elapsed();
        tracing::debug!(
            "{} 缓存填充: {}/{} 批次, {} 条写入, {} 条缺失, 用时 {:?}",
            locale,
            report.batches_completed,
            report.batches_planned,
            report.translated,
            report.unresolved,
            report.duration
        );
        report
    }

    async fn request_with_retry(
        &self,
        locale: &str,
        batch: &Batch,
        report: &mut FillReport,
    ) -> TranslationResult<Vec<Option<String>>> {
        let mut attempt = 0;
        let mut delay = self.config.retry_delay;

        loop {
            attempt += 1;
            report.requests_sent += 1;
            self.stats.requests_sent.fetch_add(1, Ordering::Relaxed);

            let result = self
                .translator
                .translate(&self.config.source_locale, locale, &batch.texts)
                .await;

            match result {
                Ok(results) => return Ok(results),
                Err(e) if e.is_retryable() && attempt < self.config.max_retry_attempts => {
                    tracing::warn!(
                        "批次 {} 第 {} 次请求失败，{:?} 后重试: {}",
                        batch.id + 1,
                        attempt,
                        delay,
                        e
                    );
                    self.stats.retries.fetch_add(1, Ordering::Relaxed);
                    sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn apply_results(
        &self,
        locale: &str,
        batch: &Batch,
        results: Vec<Option<String>>,
        store: &RefCell<LocaleStore>,
        report: &mut FillReport,
    ) {
        if results.len() != batch.len() {
            report.misaligned_batches += 1;
            tracing::warn!(
                "批次 {} 返回 {} 条译文，期望 {} 条",
                batch.id + 1,
                results.len(),
                batch.len()
            );
        }

        let mut results = results.into_iter();
        let mut translated = 0;
        let mut store = store.borrow_mut();
        let cache = store.cache_mut(locale);

        for source in &batch.texts {
            match results.next().flatten() {
                Some(translated_text) => {
                    cache.insert(source.clone(), translated_text);
                    translated += 1;
                }
                None => {
                    tracing::debug!("缺少译文，保留原文: {:?}", source);
                    report.unresolved += 1;
                }
            }
        }

        report.translated += translated;
        self.stats
            .texts_translated
            .fetch_add(translated, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::storage::MemoryStore;
    use futures::future::{FutureExt, LocalBoxFuture};
    use std::cell::Cell;
    use std::collections::VecDeque;

    /// 按脚本依次返回结果的翻译服务
    struct Scripted {
        responses: RefCell<VecDeque<TranslationResult<Vec<Option<String>>>>>,
        calls: Cell<usize>,
        requests: RefCell<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn new(responses: Vec<TranslationResult<Vec<Option<String>>>>) -> Rc<Self> {
            Rc::new(Self {
                responses: RefCell::new(responses.into()),
                calls: Cell::new(0),
                requests: RefCell::new(Vec::new()),
            })
        }
    }

    impl Translator for Scripted {
        fn translate<'a>(
            &'a self,
            _source: &'a str,
            _target: &'a str,
            texts: &'a [String],
        ) -> LocalBoxFuture<'a, TranslationResult<Vec<Option<String>>>> {
            self.calls.set(self.calls.get() + 1);
            self.requests.borrow_mut().push(texts.to_vec());
            let response = self
                .responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(texts.iter().map(|t| Some(format!("[{}]", t))).collect()));
            async move { response }.boxed_local()
        }
    }

    fn store() -> RefCell<LocaleStore> {
        RefCell::new(LocaleStore::new(
            Rc::new(MemoryStore::new()),
            "mst-dom-translation-cache:",
            2000,
        ))
    }

    fn engine(translator: Rc<Scripted>, config: EngineConfig) -> TranslationEngine {
        TranslationEngine::new(translator, config)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fills_cache_positionally() {
        let translator = Scripted::new(vec![Ok(vec![Some("欢迎".into()), Some("规划行程".into())])]);
        let store = store();
        let engine = engine(translator.clone(), EngineConfig::default());

        let report = engine
            .fill_cache("zh", strings(&["Welcome", "Plan your trip"]), &store)
            .await;

        assert!(report.is_complete());
        assert_eq!(report.translated, 2);
        let store = store.borrow();
        let cache = store.cache("zh").unwrap();
        assert_eq!(cache.peek("Plan your trip").map(String::as_str), Some("规划行程"));
        assert_eq!(translator.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_short_response_leaves_tail_uncached() {
        let translator = Scripted::new(vec![Ok(vec![Some("欢迎".into()), None])]);
        let store = store();
        let engine = engine(translator, EngineConfig::default());

        let report = engine
            .fill_cache("zh", strings(&["Welcome", "Plan", "Book now"]), &store)
            .await;

        assert_eq!(report.translated, 1);
        assert_eq!(report.unresolved, 2);
        assert_eq!(report.misaligned_batches, 1);
        assert!(report.error.is_none());
        assert_eq!(store.borrow().cache("zh").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_batches() {
        let translator = Scripted::new(vec![
            Ok(vec![Some("一".into()), Some("二".into())]),
            Err(TranslationError::BatchProcessingError("rejected".into())),
        ]);
        let store = store();
        let config = EngineConfig {
            batch_limits: BatchLimits {
                max_items: 2,
                max_chars: 3500,
            },
            ..EngineConfig::default()
        };
        let engine = engine(translator.clone(), config);

        let report = engine
            .fill_cache("zh", strings(&["one", "two", "three", "four", "five"]), &store)
            .await;

        assert_eq!(report.batches_planned, 3);
        assert_eq!(report.batches_completed, 1);
        assert!(report.error.is_some());
        assert_eq!(translator.calls.get(), 2);
        assert_eq!(store.borrow().cache("zh").unwrap().len(), 2);

        let stats = engine.get_stats();
        assert_eq!(stats.batches_failed, 1);
        assert_eq!(stats.texts_batched, 5);
        assert_eq!(stats.batches_created, 3);
        assert_eq!(stats.oversized_texts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_retryable_errors() {
        let translator = Scripted::new(vec![
            Err(TranslationError::NetworkError("reset".into())),
            Err(TranslationError::EndpointError {
                status: 502,
                message: "bad gateway".into(),
            }),
        ]);
        let store = store();
        let config = EngineConfig {
            max_retry_attempts: 3,
            ..EngineConfig::default()
        };
        let engine = engine(translator.clone(), config);

        let report = engine.fill_cache("ms", strings(&["Welcome"]), &store).await;

        assert!(report.is_complete());
        assert_eq!(report.requests_sent, 3);
        assert_eq!(engine.get_stats().retries, 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let translator = Scripted::new(vec![Err(TranslationError::EndpointError {
            status: 400,
            message: "bad request".into(),
        })]);
        let store = store();
        let config = EngineConfig {
            max_retry_attempts: 3,
            ..EngineConfig::default()
        };
        let engine = engine(translator.clone(), config);

        let report = engine.fill_cache("ms", strings(&["Welcome"]), &store).await;

        assert_eq!(report.requests_sent, 1);
        assert!(matches!(
            report.error,
            Some(TranslationError::EndpointError { status: 400, .. })
        ));
    }
}
