// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 超时类错误的原因描述
pub const REASON_TIMEOUT: &str = "Timeout while loading page";
/// 网络类错误（DNS、连接失败）的原因描述
pub const REASON_NETWORK: &str = "Network Error";
/// 其他未归类错误的原因描述
pub const REASON_UNEXPECTED: &str = "Unexpected Error";

/// 错误消息中代表超时的片段
const TIMEOUT_PATTERNS: [&str; 3] = ["timeout", "timed out", "err_timed_out"];

/// 错误消息中代表DNS/连接失败的片段
const NETWORK_PATTERNS: [&str; 10] = [
    "err_name_not_resolved",
    "name not resolved",
    "dns",
    "failed to lookup address",
    "err_connection",
    "connection refused",
    "connection reset",
    "err_address_unreachable",
    "err_internet_disconnected",
    "network is unreachable",
];

/// HTTP状态
///
/// 成功取得响应时为状态码，导航失败时为哨兵值 `"error"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    /// 终端响应的状态码
    Code(u16),
    /// 导航失败，没有可用的状态码
    Error,
}

impl HttpStatus {
    pub fn code(&self) -> Option<u16> {
        match self {
            HttpStatus::Code(code) => Some(*code),
            HttpStatus::Error => None,
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpStatus::Code(code) => write!(f, "{}", code),
            HttpStatus::Error => write!(f, "error"),
        }
    }
}

impl Serialize for HttpStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HttpStatus::Code(code) => serializer.serialize_u16(*code),
            HttpStatus::Error => serializer.serialize_str("error"),
        }
    }
}

impl<'de> Deserialize<'de> for HttpStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u16),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Ok(HttpStatus::Code(code)),
            Repr::Text(text) if text == "error" => Ok(HttpStatus::Error),
            Repr::Text(text) => text
                .parse::<u16>()
                .map(HttpStatus::Code)
                .map_err(|_| serde::de::Error::custom(format!("invalid status: {}", text))),
        }
    }
}

/// 单个URL的检查结论
///
/// 每个被实际尝试的URL恰好对应一条结论；因取消而跳过的URL没有结论。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// 被检查的URL
    pub url: String,
    /// HTTP状态码或 `"error"`
    pub status: HttpStatus,
    /// 是否判定为“确实不存在”（真404或软404）
    pub is_real_not_found: bool,
    /// 人类可读的判定原因
    pub reason: String,
    /// 页面标题，可能为空
    pub title: String,
    /// 错误信息，可能为空
    pub error: String,
}

impl CheckResult {
    /// 根据页面抓取结果构造结论
    pub fn from_page(
        url: impl Into<String>,
        status: u16,
        is_real_not_found: bool,
        reason: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            status: HttpStatus::Code(status),
            is_real_not_found,
            reason: reason.into(),
            title: title.into(),
            error: String::new(),
        }
    }

    /// 根据导航/分类错误构造结论
    ///
    /// 保守策略：出错的页面一律视为“不存在”（`is_real_not_found = true`），
    /// 即使原因可能只是暂时的网络故障。原因按错误消息归类。
    pub fn from_error(url: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            url: url.into(),
            status: HttpStatus::Error,
            is_real_not_found: true,
            reason: error_reason(&message).to_string(),
            title: String::new(),
            error: message,
        }
    }
}

/// 按错误消息的模式归类错误原因
pub fn error_reason(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if TIMEOUT_PATTERNS.iter().any(|p| lower.contains(p)) {
        REASON_TIMEOUT
    } else if NETWORK_PATTERNS.iter().any(|p| lower.contains(p)) {
        REASON_NETWORK
    } else {
        REASON_UNEXPECTED
    }
}
