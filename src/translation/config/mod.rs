//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslationConfig};

/// 配置常量
pub mod constants {
    // 语言相关
    pub const BASE_LOCALE: &str = "en";
    pub const SUPPORTED_LOCALES: &[&str] = &["en", "zh", "ms", "ta"];

    // 批次处理相关
    pub const MAX_BATCH_ITEMS: usize = 80;
    pub const MAX_BATCH_CHARS: usize = 3500;

    // 默认API设置
    pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api";
    pub const TRANSLATE_ENDPOINT: &str = "/external/translate.php";
    pub const REQUEST_FORMAT: &str = "text";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 1;
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

    // 缓存与持久化
    pub const DOM_CACHE_PREFIX: &str = "mst-dom-translation-cache:";
    pub const LOADER_CACHE_PREFIX: &str = "mst-translation-cache:1:";
    pub const PERSIST_CACHE_CAP: usize = 2000;
    pub const PERSIST_DEBOUNCE_MS: u64 = 250;

    // 观察器：一帧的间隔
    pub const FRAME_INTERVAL_MS: u64 = 16;

    // 跳过的元素
    pub const SKIP_ELEMENTS: &[&str] = &["script", "style", "noscript", "textarea", "code", "pre"];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "dom-translator.toml",
        ".dom-translator.toml",
        "~/.config/dom-translator/config.toml",
        "/etc/dom-translator/config.toml",
    ];
}

/// 加载配置，失败时回退到默认值
pub fn load_translation_config(api_base: Option<&str>) -> TranslationConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.with_api_base(api_base),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            TranslationConfig::default_with_api(api_base)
        }
    }
}
