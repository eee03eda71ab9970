// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::utils::url_utils::{clean_urls, parse_url_list};

/// URL输入：字符串数组，或一段文本（JSON数组文本或按行分隔）
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UrlsInput {
    List(Vec<String>),
    Text(String),
    /// 其他任何JSON值，在用例中被拒绝
    Invalid(serde_json::Value),
}

impl UrlsInput {
    /// 规范化为有序URL列表，输入形状不合法时返回 `None`
    pub fn into_urls(self) -> Option<Vec<String>> {
        match self {
            UrlsInput::List(list) => Some(clean_urls(list)),
            UrlsInput::Text(text) => Some(parse_url_list(&text)),
            UrlsInput::Invalid(serde_json::Value::Null) => Some(Vec::new()),
            UrlsInput::Invalid(_) => None,
        }
    }
}

/// 批量检查请求
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequestDto {
    #[serde(default)]
    pub urls: Option<UrlsInput>,
    /// 运行标识，缺省或为空时自动生成
    #[serde(default)]
    pub run_id: Option<String>,
    /// 返回结果后是否关闭运行
    #[serde(default)]
    pub close: bool,
}

/// 取消请求
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequestDto {
    #[serde(default)]
    pub run_id: Option<String>,
}
