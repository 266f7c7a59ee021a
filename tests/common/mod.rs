// 集成测试公共模块
//
// 提供测试辅助工具和共享功能

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use markup5ever_rcdom::{Handle, RcDom};
use tokio::task::LocalSet;

use dom_translator::parsers::html::{find_nodes, get_text_content, html_to_dom};
use dom_translator::translation::config::TranslationConfig;
use dom_translator::translation::storage::{KeyValueStore, MemoryStore};
use dom_translator::translation::{
    DomTranslator, TranslationError, TranslationResult, Translator,
};

/// 在 `LocalSet` 中运行测试体
pub async fn run_local<F: Future>(future: F) -> F::Output {
    LocalSet::new().run_until(future).await
}

/// 记录的一次翻译请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub target: String,
    pub texts: Vec<String>,
}

/// 可编排的翻译服务
///
/// 词典中有的条目返回词典译文，其余返回 `[locale] 原文`。
pub struct ScriptedTranslator {
    dictionary: RefCell<HashMap<(String, String), String>>,
    omitted: RefCell<HashSet<String>>,
    failures: RefCell<VecDeque<Option<TranslationError>>>,
    delay: Cell<Option<Duration>>,
    calls: RefCell<Vec<RecordedCall>>,
    events: Rc<RefCell<Vec<String>>>,
}

impl ScriptedTranslator {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            dictionary: RefCell::new(HashMap::new()),
            omitted: RefCell::new(HashSet::new()),
            failures: RefCell::new(VecDeque::new()),
            delay: Cell::new(None),
            calls: RefCell::new(Vec::new()),
            events: Rc::new(RefCell::new(Vec::new())),
        })
    }

    pub fn with_entries(locale: &str, entries: &[(&str, &str)]) -> Rc<Self> {
        let translator = Self::new();
        for (source, translated) in entries {
            translator.add_entry(locale, source, translated);
        }
        translator
    }

    pub fn add_entry(&self, locale: &str, source: &str, translated: &str) {
        self.dictionary
            .borrow_mut()
            .insert((locale.to_string(), source.to_string()), translated.to_string());
    }

    /// 该原文的译文位置返回空
    pub fn omit(&self, source: &str) {
        self.omitted.borrow_mut().insert(source.to_string());
    }

    /// 下一次请求失败
    pub fn fail_next(&self, error: TranslationError) {
        self.failures.borrow_mut().push_back(Some(error));
    }

    /// 先成功 `successes` 次，然后失败一次
    pub fn fail_after(&self, successes: usize, error: TranslationError) {
        let mut failures = self.failures.borrow_mut();
        failures.extend((0..successes).map(|_| None));
        failures.push_back(Some(error));
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay.set(Some(delay));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn requested_texts(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .flat_map(|call| call.texts.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn lookup(&self, target: &str, text: &str) -> Option<String> {
        if self.omitted.borrow().contains(text) {
            return None;
        }
        let translated = self
            .dictionary
            .borrow()
            .get(&(target.to_string(), text.to_string()))
            .cloned()
            .unwrap_or_else(|| format!("[{}] {}", target, text));
        Some(translated)
    }
}

impl Translator for ScriptedTranslator {
    fn translate<'a>(
        &'a self,
        _source: &'a str,
        target: &'a str,
        texts: &'a [String],
    ) -> LocalBoxFuture<'a, TranslationResult<Vec<Option<String>>>> {
        self.calls.borrow_mut().push(RecordedCall {
            target: target.to_string(),
            texts: texts.to_vec(),
        });
        self.events.borrow_mut().push(format!("start:{}", target));

        let result = match self.failures.borrow_mut().pop_front() {
            Some(Some(error)) => Err(error),
            _ => Ok(texts.iter().map(|text| self.lookup(target, text)).collect()),
        };
        let delay = self.delay.get();
        let events = Rc::clone(&self.events);
        let target = target.to_string();

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            events.borrow_mut().push(format!("end:{}", target));
            result
        }
        .boxed_local()
    }
}

/// HTML测试辅助工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn create_test_dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").unwrap()
    }

    pub fn create_travel_page() -> String {
        r#"<!DOCTYPE html>
<html>
<head><title>Trips</title></head>
<body>
    <h1> Welcome </h1>
    <p>Plan your trip</p>
</body>
</html>"#
            .to_string()
    }

    pub fn create_mixed_content_page() -> String {
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Mixed</title>
    <style>body { color: red; }</style>
    <script>console.log("hello");</script>
</head>
<body>
    <p>Book now</p>
    <code>let x = 1;</code>
    <pre>raw output</pre>
    <textarea>Type here</textarea>
    <noscript>Enable scripts</noscript>
    <span>12:30</span>
    <span>(2024)</span>
    <span>X</span>
    <div translate="no">BrandName</div>
</body>
</html>"#
            .to_string()
    }

    /// 生成 `count` 个互不相同的段落
    pub fn create_page_with_paragraphs(count: usize, text_len: usize) -> String {
        let body: String = (0..count)
            .map(|i| {
                let text = format!("Item {} ", i);
                let padding = "x".repeat(text_len.saturating_sub(text.len()));
                format!("<p>{}{}</p>", text, padding)
            })
            .collect();
        format!("<html><body>{}</body></html>", body)
    }

    /// 指定元素的第一个文本子节点
    pub fn first_text(root: &Handle, tag: &str) -> Handle {
        let element = find_nodes(root, &[tag]).remove(0);
        let child = element.children.borrow()[0].clone();
        child
    }

    /// 指定元素所有文本子节点的内容
    pub fn texts_of(root: &Handle, tag: &str) -> Vec<String> {
        find_nodes(root, &[tag])
            .iter()
            .flat_map(|element| {
                element
                    .children
                    .borrow()
                    .iter()
                    .filter_map(get_text_content)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn text_of(root: &Handle, tag: &str) -> String {
        Self::texts_of(root, tag).join("")
    }
}

/// 测试环境：文档、翻译服务、存储和翻译器
pub struct TestEnvironment {
    pub dom: RcDom,
    pub translator: Rc<ScriptedTranslator>,
    pub storage: Rc<MemoryStore>,
    pub service: DomTranslator,
}

impl TestEnvironment {
    /// 需要在 `LocalSet` 中创建
    pub fn new(html: &str, config: TranslationConfig) -> Self {
        Self::with_parts(html, config, ScriptedTranslator::new(), Rc::new(MemoryStore::new()))
    }

    pub fn with_parts(
        html: &str,
        config: TranslationConfig,
        translator: Rc<ScriptedTranslator>,
        storage: Rc<MemoryStore>,
    ) -> Self {
        let dom = HtmlTestHelper::create_test_dom(html);
        let service = DomTranslator::new(
            dom.document.clone(),
            config,
            translator.clone(),
            storage.clone() as Rc<dyn KeyValueStore>,
        )
        .unwrap();

        Self {
            dom,
            translator,
            storage,
            service,
        }
    }

    pub fn root(&self) -> &Handle {
        &self.dom.document
    }
}

/// 断言辅助工具
pub struct AssertionHelper;

impl AssertionHelper {
    /// 每次请求都不超过批次限制
    pub fn assert_batches_within(calls: &[RecordedCall], max_items: usize, max_chars: usize) {
        for (i, call) in calls.iter().enumerate() {
            let chars: usize = call.texts.iter().map(|t| t.chars().count()).sum();
            assert!(
                call.texts.len() <= max_items,
                "batch {} has {} items (max {})",
                i,
                call.texts.len(),
                max_items
            );
            assert!(
                chars <= max_chars || call.texts.len() == 1,
                "batch {} has {} chars (max {})",
                i,
                chars,
                max_chars
            );
        }
    }
}
