//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::env::EnvVar;
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译管道配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 基础配置
    pub enabled: bool,
    pub base_locale: String,
    pub supported_locales: Vec<String>,
    pub api_base: String,

    // 请求配置
    pub request_timeout_secs: u64,
    pub max_retry_attempts: usize,
    pub retry_delay_ms: u64,

    // 批次配置
    pub max_batch_items: usize,
    pub max_batch_chars: usize,

    // 缓存配置
    pub persist_cache_cap: usize,
    pub persist_debounce_ms: u64,
    /// redb 数据库文件；为空时只使用内存存储
    pub storage_path: Option<String>,

    // 收集与调度
    pub skip_elements: Vec<String>,
    pub respect_translate_attr: bool,
    pub frame_interval_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_locale: constants::BASE_LOCALE.to_string(),
            supported_locales: constants::SUPPORTED_LOCALES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            api_base: constants::DEFAULT_API_BASE.to_string(),

            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retry_attempts: constants::DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_delay_ms: constants::DEFAULT_RETRY_DELAY_MS,

            max_batch_items: constants::MAX_BATCH_ITEMS,
            max_batch_chars: constants::MAX_BATCH_CHARS,

            persist_cache_cap: constants::PERSIST_CACHE_CAP,
            persist_debounce_ms: constants::PERSIST_DEBOUNCE_MS,
            storage_path: None,

            skip_elements: constants::SKIP_ELEMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            respect_translate_attr: true,
            frame_interval_ms: constants::FRAME_INTERVAL_MS,
        }
    }
}

impl TranslationConfig {
    /// 创建带指定API地址的默认配置
    pub fn default_with_api(api_base: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(base) = api_base {
            config.api_base = base.to_string();
        }
        config
    }

    /// 翻译接口的完整地址
    pub fn translate_url(&self) -> String {
        format!(
            "{}{}",
            self.api_base.trim_end_matches('/'),
            constants::TRANSLATE_ENDPOINT
        )
    }

    pub fn is_base_locale(&self, locale: &str) -> bool {
        locale == self.base_locale
    }

    pub fn is_supported_locale(&self, locale: &str) -> bool {
        self.supported_locales.iter().any(|l| l == locale)
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.max_batch_items == 0 {
            return Err(TranslationError::ConfigError("批次条目上限不能为0".to_string()));
        }

        if self.max_batch_chars == 0 {
            return Err(TranslationError::ConfigError("批次字符上限不能为0".to_string()));
        }

        if self.max_retry_attempts == 0 {
            return Err(TranslationError::ConfigError("请求尝试次数至少为1".to_string()));
        }

        if self.persist_cache_cap == 0 {
            return Err(TranslationError::ConfigError("持久化缓存容量不能为0".to_string()));
        }

        if !self.is_supported_locale(&self.base_locale) {
            return Err(TranslationError::ConfigError(format!(
                "基础语言 {} 不在支持列表中",
                self.base_locale
            )));
        }

        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(TranslationError::ConfigError(format!(
                "API地址必须以 http:// 或 https:// 开头: {}",
                self.api_base
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    ///
    /// 已设置但无效的变量记录警告后忽略，保留原值。
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{storage, translation};

        if let Some(enabled) = env_override::<_, translation::Enabled>() {
            self.enabled = enabled;
        }

        if let Some(api_base) = env_override::<_, translation::ApiBase>() {
            self.api_base = api_base;
            tracing::info!("环境变量覆盖 API 地址: {}", self.api_base);
        }

        if let Some(locales) = env_override::<_, translation::SupportedLocales>() {
            self.supported_locales = locales;
        }

        if let Some(max_items) = env_override::<_, translation::MaxBatchItems>() {
            self.max_batch_items = max_items;
        }

        if let Some(max_chars) = env_override::<_, translation::MaxBatchChars>() {
            self.max_batch_chars = max_chars;
        }

        if let Some(timeout) = env_override::<_, translation::RequestTimeout>() {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Some(path) = env_override::<_, storage::DatabasePath>() {
            self.storage_path = Some(path);
        }

        if let Some(cap) = env_override::<_, storage::PersistCap>() {
            self.persist_cache_cap = cap;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// 读取一个环境变量覆盖；未设置或无效时返回 `None`
fn env_override<T, V: EnvVar<T>>() -> Option<T> {
    match V::get() {
        Ok(value) => Some(value),
        Err(e) => {
            if V::is_set() {
                tracing::warn!("忽略无效的环境变量: {}", e);
            }
            None
        }
    }
}

/// 简化的配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 加载文件、`.env` 和环境变量，最后做校验
    pub fn new() -> TranslationResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从显式指定的文件创建
    pub fn from_file<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let mut config = Self::load_from_file(path.as_ref())?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    /// 在已加载配置的基础上替换API地址
    pub fn with_api_base(&self, api_base: Option<&str>) -> TranslationConfig {
        let mut config = self.config.clone();
        if let Some(base) = api_base {
            config.api_base = base.to_string();
        }
        config
    }

    fn load_config() -> TranslationResult<TranslationConfig> {
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(Path::new(expanded_path.as_ref()));
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    fn load_from_file(path: &Path) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.extension().is_some_and(|ext| ext == "toml") {
            Ok(toml::from_str(&content)?)
        } else {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        }
    }

    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
