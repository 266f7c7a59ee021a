//! 远程翻译接口
//!
//! `Translator` 是引擎与翻译服务之间的接缝。`HttpTranslator` 调用
//! `POST {api_base}/external/translate.php`，按位置返回每条原文的译文。

use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::translation::config::{constants, TranslationConfig};
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译服务
///
/// 返回值与 `texts` 按位置对应；某一位置为 `None` 表示该条没有可用译文。
/// 返回的长度可能与请求不一致，由调用方处理。
pub trait Translator {
    fn translate<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
        texts: &'a [String],
    ) -> LocalBoxFuture<'a, TranslationResult<Vec<Option<String>>>>;
}

/// 请求体
#[derive(Debug, Serialize)]
pub struct TranslateRequest<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub texts: &'a [String],
    pub format: &'a str,
}

/// 响应体
#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub translations: Vec<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TranslateResponse {
    /// 取出按位置排列的译文
    ///
    /// 条目可以是 `{"translatedText": ..}`、`{"input": .., "translatedText": ..}`
    /// 或直接是字符串；空串和其他形状视为缺失。
    pub fn into_translations(self) -> TranslationResult<Vec<Option<String>>> {
        if !self.ok {
            let message = self.error.unwrap_or_else(|| "响应未标记 ok".to_string());
            return Err(TranslationError::BatchProcessingError(message));
        }

        Ok(self.translations.into_iter().map(entry_text).collect())
    }
}

fn entry_text(entry: Value) -> Option<String> {
    let text = match entry {
        Value::String(text) => text,
        Value::Object(mut map) => match map.remove("translatedText") {
            Some(Value::String(text)) => text,
            _ => return None,
        },
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// 基于 reqwest 的翻译客户端
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: reqwest::Client,
    url: String,
}

impl HttpTranslator {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("无法创建HTTP客户端: {}", e)))?;

        Ok(Self::with_client(client, config.translate_url()))
    }

    pub fn with_client(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    async fn send(
        &self,
        source: &str,
        target: &str,
        texts: &[String],
    ) -> TranslationResult<Vec<Option<String>>> {
        let request = TranslateRequest {
            source,
            target,
            texts,
            format: constants::REQUEST_FORMAT,
        };

        tracing::debug!("请求翻译: {} -> {}, {} 条", source, target, texts.len());

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<无法读取响应体: {}>", e));
            return Err(TranslationError::EndpointError {
                status: status.as_u16(),
                message,
            });
        }

        let body: TranslateResponse = response.json().await?;
        body.into_translations()
    }
}

impl Translator for HttpTranslator {
    fn translate<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
        texts: &'a [String],
    ) -> LocalBoxFuture<'a, TranslationResult<Vec<Option<String>>>> {
        self.send(source, target, texts).boxed_local()
    }
}
