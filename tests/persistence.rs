//! 缓存持久化集成测试
//!
//! 测试去抖写入、持久化容量、损坏数据和 redb 存储

use std::rc::Rc;
use std::time::Duration;

use serde_json::{Map, Value};

use dom_translator::parsers::html::{append_child, create_text_node, find_nodes};
use dom_translator::translation::config::TranslationConfig;
use dom_translator::translation::storage::{KeyValueStore, MemoryStore, RedbStore};
use dom_translator::translation::DomTranslator;

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{run_local, HtmlTestHelper, ScriptedTranslator, TestEnvironment};

const ZH_KEY: &str = "mst-dom-translation-cache:zh";

fn stored_map(storage: &MemoryStore, key: &str) -> Map<String, Value> {
    let raw = storage.get(key).unwrap().expect("cache should be persisted");
    serde_json::from_str(&raw).unwrap()
}

/// 去抖窗口内的多次写入合并为一次
#[tokio::test(start_paused = true)]
async fn test_persist_writes_coalesce_within_window() {
    run_local(async {
        let env = TestEnvironment::new(
            &HtmlTestHelper::create_travel_page(),
            TranslationConfig::default(),
        );

        env.service.set_locale("zh").await.unwrap();
        let body = find_nodes(env.root(), &["html", "body"]).remove(0);
        append_child(&body, create_text_node("Hotels"));
        env.service.refresh().await.unwrap();

        assert_eq!(env.storage.writes(), 0);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(env.storage.writes(), 1);
        let map = stored_map(&env.storage, ZH_KEY);
        assert_eq!(map.len(), 4);
        assert_eq!(map.get("Hotels"), Some(&Value::String("[zh] Hotels".into())));

        // 没有新译文时不再写入
        env.service.refresh().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(env.storage.writes(), 1);
    })
    .await;
}

/// 持久化的条目数不超过容量，保留最近使用的条目
#[tokio::test]
async fn test_persisted_cache_respects_cap() {
    run_local(async {
        let config = TranslationConfig {
            persist_cache_cap: 3,
            ..TranslationConfig::default()
        };
        let env = TestEnvironment::new(&HtmlTestHelper::create_page_with_paragraphs(5, 8), config);

        env.service.set_locale("zh").await.unwrap();
        env.service.flush().unwrap();

        let map = stored_map(&env.storage, ZH_KEY);
        assert_eq!(map.len(), 3);
        assert!(map.contains_key("Item 4 x"));
        assert!(!map.contains_key("Item 0 x"));
        // 内存中的缓存不受容量限制
        assert_eq!(env.service.cached_entries("zh"), 5);
    })
    .await;
}

/// 损坏的持久化数据视为空缓存
#[tokio::test]
async fn test_malformed_stored_cache_is_ignored() {
    run_local(async {
        let storage = Rc::new(MemoryStore::new());
        storage.set(ZH_KEY, "{\"Welcome\": ").unwrap();

        let env = TestEnvironment::with_parts(
            &HtmlTestHelper::create_travel_page(),
            TranslationConfig::default(),
            ScriptedTranslator::new(),
            storage,
        );

        let report = env.service.set_locale("zh").await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.resolution.missing.len(), 3);
        assert_eq!(HtmlTestHelper::text_of(env.root(), "p"), "[zh] Plan your trip");

        env.service.flush().unwrap();
        assert_eq!(stored_map(&env.storage, ZH_KEY).len(), 3);
    })
    .await;
}

/// 已持久化的缓存在新的翻译器中直接命中
#[tokio::test]
async fn test_persisted_cache_is_reused_across_instances() {
    run_local(async {
        let storage = Rc::new(MemoryStore::new());

        let first = TestEnvironment::with_parts(
            &HtmlTestHelper::create_travel_page(),
            TranslationConfig::default(),
            ScriptedTranslator::new(),
            Rc::clone(&storage),
        );
        first.service.set_locale("ms").await.unwrap();
        first.service.flush().unwrap();

        let second = TestEnvironment::with_parts(
            &HtmlTestHelper::create_travel_page(),
            TranslationConfig::default(),
            ScriptedTranslator::new(),
            Rc::clone(&storage),
        );
        let report = second.service.set_locale("ms").await.unwrap();

        assert_eq!(second.translator.call_count(), 0);
        assert_eq!(report.resolution.hits, 3);
        assert_eq!(HtmlTestHelper::text_of(second.root(), "p"), "[ms] Plan your trip");
    })
    .await;
}

/// redb 文件存储在重新打开后保留缓存
#[tokio::test]
async fn test_redb_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.redb");

    run_local(async {
        let translator = ScriptedTranslator::with_entries("ta", &[("Welcome", "வரவேற்பு")]);
        let dom = HtmlTestHelper::create_test_dom(&HtmlTestHelper::create_travel_page());
        let service = DomTranslator::new(
            dom.document.clone(),
            TranslationConfig::default(),
            translator,
            Rc::new(RedbStore::open(&path).unwrap()),
        )
        .unwrap();

        service.set_locale("ta").await.unwrap();
        service.flush().unwrap();
    })
    .await;

    run_local(async {
        let translator = ScriptedTranslator::new();
        let dom = HtmlTestHelper::create_test_dom(&HtmlTestHelper::create_travel_page());
        let service = DomTranslator::new(
            dom.document.clone(),
            TranslationConfig::default(),
            translator.clone(),
            Rc::new(RedbStore::open(&path).unwrap()),
        )
        .unwrap();

        service.set_locale("ta").await.unwrap();

        assert_eq!(translator.call_count(), 0);
        assert_eq!(HtmlTestHelper::text_of(&dom.document, "h1"), " வரவேற்பு ");
    })
    .await;
}

/// 配置了 storage_path 时 from_config 使用磁盘存储
#[tokio::test]
async fn test_from_config_uses_storage_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pages.redb");
    let config = TranslationConfig {
        storage_path: Some(path.to_string_lossy().into_owned()),
        ..TranslationConfig::default()
    };

    run_local(async {
        let dom = HtmlTestHelper::create_test_dom(&HtmlTestHelper::create_travel_page());
        let service = DomTranslator::from_config(dom.document.clone(), config).unwrap();

        let report = service.set_locale("en").await.unwrap();
        assert!(report.is_success());
        service.flush().unwrap();
    })
    .await;

    assert!(path.exists());
    println!("✅ 磁盘缓存路径测试通过");
}
