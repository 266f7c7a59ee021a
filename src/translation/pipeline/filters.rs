//! 文本过滤器模块
//!
//! 判断一段规范文本是否需要送去翻译

use std::sync::OnceLock;

use regex::Regex;

/// 纯 ASCII 数字、空白与常见标点组成的文本不翻译
const NON_TRANSLATABLE_PATTERN: &str = r"^[0-9\s.,:;!?()\-_/\\]+$";

fn non_translatable_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(NON_TRANSLATABLE_PATTERN).expect("NON_TRANSLATABLE_PATTERN is a valid regex")
    })
}

/// 文本过滤器
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFilter;

impl TextFilter {
    pub fn new() -> Self {
        Self
    }

    /// 判断文本是否需要翻译
    ///
    /// 以去掉首尾空白后的内容为准：空串、单个字符、
    /// 以及只含 ASCII 数字与标点的文本都会被跳过。
    /// 长度按 UTF-16 码元计，代理对字符（如 emoji）算两个。
    pub fn should_translate(&self, text: &str) -> bool {
        let trimmed = text.trim();

        if trimmed.encode_utf16().nth(1).is_none() {
            return false;
        }

        !non_translatable_regex().is_match(trimmed)
    }
}

/// 拆分首尾空白，返回 `(前导空白, 正文, 尾随空白)`
pub fn split_whitespace_bounds(text: &str) -> (&str, &str, &str) {
    let start = text.len() - text.trim_start().len();
    let end = text.trim_end().len().max(start);
    (&text[..start], &text[start..end], &text[end..])
}
