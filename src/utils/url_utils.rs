// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::Url;

/// 从URL中提取主机键（authority：host[:port]）
///
/// 同一主机键的请求共享礼貌间隔与单并发槽位。
/// 无法解析的URL整体作为主机键，保证它们也被串行化。
pub fn host_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) => match url.host_str() {
            Some(host) => match url.port() {
                Some(port) => format!("{}:{}", host.to_ascii_lowercase(), port),
                None => host.to_ascii_lowercase(),
            },
            None => trimmed.to_string(),
        },
        Err(_) => trimmed.to_string(),
    }
}

/// 将文本形式的URL列表规范化为有序列表
///
/// 文本本身是JSON字符串数组时按JSON解析，否则按换行切分；
/// 每一项去除首尾空白，丢弃空行。
pub fn parse_url_list(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
            return clean_urls(list);
        }
    }

    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 去除空白项并修剪每个URL
pub fn clean_urls<I>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}
