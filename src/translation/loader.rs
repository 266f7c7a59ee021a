//! 界面文案翻译
//!
//! 翻译一组普通字符串（按钮、提示等界面文案），与文档翻译共用翻译服务
//! 和存储，但缓存使用独立的命名空间 `mst-translation-cache:1:<locale>`。

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::translation::client::Translator;
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::core::engine::{EngineConfig, FillReport, TranslationEngine};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::{split_whitespace_bounds, TextFilter};
use crate::translation::storage::{KeyValueStore, LocaleStore, PersistScheduler};

/// 文案翻译器
///
/// 必须在 `LocalSet` 中使用。
pub struct TranslationLoader {
    config: TranslationConfig,
    store: Rc<RefCell<LocaleStore>>,
    persist: PersistScheduler,
    engine: TranslationEngine,
    filter: TextFilter,
}

impl TranslationLoader {
    pub fn new(
        config: TranslationConfig,
        translator: Rc<dyn Translator>,
        storage: Rc<dyn KeyValueStore>,
    ) -> TranslationResult<Self> {
        config.validate()?;

        let store = Rc::new(RefCell::new(LocaleStore::new(
            storage,
            constants::LOADER_CACHE_PREFIX,
            config.persist_cache_cap,
        )));
        let persist = PersistScheduler::new(Rc::clone(&store), config.persist_debounce());

        Ok(Self {
            engine: TranslationEngine::new(translator, EngineConfig::from(&config)),
            filter: TextFilter::new(),
            store,
            persist,
            config,
        })
    }

    /// 翻译一组文案，结果与输入按位置对应
    ///
    /// 没有译文的条目返回原文。只有语言不受支持时返回错误。
    pub async fn translate_texts(
        &self,
        locale: &str,
        texts: &[String],
    ) -> TranslationResult<Vec<String>> {
        if !self.config.is_supported_locale(locale) {
            return Err(TranslationError::InvalidInput(format!(
                "不支持的语言: {}",
                locale
            )));
        }
        if self.config.is_base_locale(locale) || !self.config.enabled {
            return Ok(texts.to_vec());
        }

        let missing = self.missing(locale, texts);
        if !missing.is_empty() {
            let report = self.fill(locale, missing).await;
            if report.translated > 0 {
                self.persist.schedule(locale);
            }
        }

        let store = self.store.borrow();
        let cache = store.cache(locale);
        Ok(texts
            .iter()
            .map(|text| {
                let (leading, body, trailing) = split_whitespace_bounds(text);
                match cache.and_then(|cache| cache.peek(body)) {
                    Some(translated) => format!("{}{}{}", leading, translated, trailing),
                    None => text.clone(),
                }
            })
            .collect())
    }

    /// 翻译单条文案
    pub async fn translate(&self, locale: &str, text: &str) -> TranslationResult<String> {
        let mut out = self.translate_texts(locale, &[text.to_string()]).await?;
        Ok(out.pop().unwrap_or_else(|| text.to_string()))
    }

    fn missing(&self, locale: &str, texts: &[String]) -> Vec<String> {
        let mut store = self.store.borrow_mut();
        let cache = store.cache_mut(locale);
        let mut seen = HashSet::new();

        texts
            .iter()
            .map(|text| text.trim())
            .filter(|text| self.filter.should_translate(text))
            .filter(|text| cache.get(text).is_none())
            .filter(|text| seen.insert(text.to_string()))
            .map(str::to_string)
            .collect()
    }

    async fn fill(&self, locale: &str, missing: Vec<String>) -> FillReport {
        let report = self.engine.fill_cache(locale, missing, &self.store).await;
        if let Some(e) = &report.error {
            tracing::warn!("文案翻译未完成，部分条目保留原文: {}", e);
        }
        report
    }

    pub fn flush(&self) -> TranslationResult<()> {
        self.persist.flush()
    }
}
