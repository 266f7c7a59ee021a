//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }

    /// 变量是否已设置（不论能否解析）
    fn is_set() -> bool {
        env::var_os(Self::NAME).is_some()
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "DOM_TRANSLATOR_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 翻译功能启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "DOM_TRANSLATOR_ENABLED";
        const DEFAULT: Option<bool> = None;
        const DESCRIPTION: &'static str = "Enable translation functionality";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 翻译接口基础地址
    pub struct ApiBase;
    impl EnvVar<String> for ApiBase {
        const NAME: &'static str = "DOM_TRANSLATOR_API_BASE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "Base URL of the backend hosting /external/translate.php";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API base must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 支持的语言列表（逗号分隔）
    pub struct SupportedLocales;
    impl EnvVar<Vec<String>> for SupportedLocales {
        const NAME: &'static str = "DOM_TRANSLATOR_LOCALES";
        const DEFAULT: Option<Vec<String>> = None;
        const DESCRIPTION: &'static str = "Comma separated locale codes, e.g. en,zh,ms,ta";

        fn parse(value: &str) -> EnvResult<Vec<String>> {
            let locales: Vec<String> = value
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();

            if locales.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "At least one locale is required".to_string(),
                });
            }

            Ok(locales)
        }
    }

    /// 每批最大条目数
    pub struct MaxBatchItems;
    impl EnvVar<usize> for MaxBatchItems {
        const NAME: &'static str = "DOM_TRANSLATOR_MAX_BATCH_ITEMS";
        const DEFAULT: Option<usize> = None;
        const DESCRIPTION: &'static str = "Maximum strings per translate request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 1000)
        }
    }

    /// 每批最大字符数
    pub struct MaxBatchChars;
    impl EnvVar<usize> for MaxBatchChars {
        const NAME: &'static str = "DOM_TRANSLATOR_MAX_BATCH_CHARS";
        const DEFAULT: Option<usize> = None;
        const DESCRIPTION: &'static str = "Maximum cumulative characters per translate request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 100, 50000)
        }
    }

    /// 请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "DOM_TRANSLATOR_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Translate request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value, Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }
}

/// 存储相关环境变量
pub mod storage {
    use super::*;

    /// redb 数据库路径
    pub struct DatabasePath;
    impl EnvVar<String> for DatabasePath {
        const NAME: &'static str = "DOM_TRANSLATOR_CACHE_DB";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path of the redb file holding persisted locale caches";

        fn parse(value: &str) -> EnvResult<String> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(shellexpand::tilde(path).into_owned())
        }
    }

    /// 持久化条目上限
    pub struct PersistCap;
    impl EnvVar<usize> for PersistCap {
        const NAME: &'static str = "DOM_TRANSLATOR_PERSIST_CAP";
        const DEFAULT: Option<usize> = None;
        const DESCRIPTION: &'static str = "Maximum entries written per persisted locale cache";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 100_000)
        }
    }
}

fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let entries: [(&str, &str); 9] = [
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (translation::Enabled::NAME, translation::Enabled::DESCRIPTION),
        (translation::ApiBase::NAME, translation::ApiBase::DESCRIPTION),
        (translation::SupportedLocales::NAME, translation::SupportedLocales::DESCRIPTION),
        (translation::MaxBatchItems::NAME, translation::MaxBatchItems::DESCRIPTION),
        (translation::MaxBatchChars::NAME, translation::MaxBatchChars::DESCRIPTION),
        (translation::RequestTimeout::NAME, translation::RequestTimeout::DESCRIPTION),
        (storage::DatabasePath::NAME, storage::DatabasePath::DESCRIPTION),
        (storage::PersistCap::NAME, storage::PersistCap::DESCRIPTION),
    ];

    let mut docs = String::from("# Environment Variables\n\n");
    for (name, description) in entries {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }
    docs
}
