//! 翻译模块
//!
//! 将HTML文档中的可见文本切换到目标语言，采用清晰的模块化架构：
//! - **core**: 翻译服务、引擎和DOM写入
//! - **pipeline**: 文本处理管道（收集、过滤、缓存解析、批次）
//! - **scheduler**: 串行任务队列和变更观察
//! - **storage**: 节点记录、语言缓存和持久化
//! - **client**: 远程翻译接口
//! - **loader**: 界面文案翻译
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use dom_translator::translation::{translate_html, TranslationConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let html = b"<html><body><p>Welcome</p></body></html>";
//! let local = tokio::task::LocalSet::new();
//! let (output, report) = local
//!     .run_until(translate_html(html, None, "zh", TranslationConfig::default()))
//!     .await?;
//! println!("{} 字节, {} 个节点", output.len(), report.nodes_collected);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 远程翻译接口
pub mod client;

/// 配置管理模块 - 处理翻译相关的所有配置
pub mod config;

/// 核心模块 - 翻译服务、引擎与DOM写入
pub mod core;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 界面文案翻译
pub mod loader;

/// 文本处理管道模块 - 文本收集、过滤、缓存解析和批次处理
pub mod pipeline;

/// 调度模块 - 串行队列与变更观察
pub mod scheduler;

/// 存储管理模块 - 节点记录、语言缓存与持久化
pub mod storage;

// ============================================================================
// 公共API导出
// ============================================================================

pub use client::{HttpTranslator, Translator};
pub use config::{load_translation_config, ConfigManager, TranslationConfig};
pub use core::{DomTranslator, PassKind, PassReport, TranslationEngine};
pub use error::{TranslationError, TranslationResult};
pub use loader::TranslationLoader;
pub use scheduler::{MutationKind, MutationObserver};
pub use storage::{KeyValueStore, MemoryStore, RedbStore};

use crate::parsers::html::{get_charset, html_to_dom, serialize_document};

/// 翻译一份HTML文档并序列化
///
/// 未指定编码时先按 UTF-8 解析，再使用文档 `<meta charset>` 声明的编码。
/// 必须在 `LocalSet` 中调用。
pub async fn translate_html(
    data: &[u8],
    encoding: Option<&str>,
    locale: &str,
    config: TranslationConfig,
) -> TranslationResult<(Vec<u8>, PassReport)> {
    let encoding = match encoding {
        Some(encoding) => encoding.to_string(),
        None => {
            let sniffed = html_to_dom(data, "utf-8").map_err(parse_error)?;
            get_charset(&sniffed.document).unwrap_or_else(|| "utf-8".to_string())
        }
    };

    let dom = html_to_dom(data, &encoding).map_err(parse_error)?;
    let translator = DomTranslator::from_config(dom.document.clone(), config)?;

    let report = translator.set_locale(locale).await?;
    if let Err(e) = translator.flush() {
        error::helpers::log_error(&e);
    }

    let output = serialize_document(&dom, &encoding)
        .map_err(|e| TranslationError::SerializationError(format!("序列化文档失败: {}", e)))?;
    Ok((output, report))
}

fn parse_error(error: std::io::Error) -> TranslationError {
    TranslationError::ParseError(format!("解析HTML失败: {}", error))
}
