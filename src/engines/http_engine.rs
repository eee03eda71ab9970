// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::engines::traits::{EngineError, FetchRequest, PageFetcher, PageSnapshot};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::error::Error as StdError;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP抓取引擎
///
/// 基于reqwest实现的纯HTTP引擎，不执行JavaScript。
/// 适合服务端渲染的页面，也用于本地测试。
pub struct HttpEngine {
    client: reqwest::Client,
}

impl HttpEngine {
    /// 创建新的HTTP引擎
    ///
    /// # 参数
    ///
    /// * `user_agent` - 请求使用的User-Agent
    pub fn new(user_agent: &str) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        Ok(Self { client })
    }

    async fn load(&self, request: &FetchRequest) -> Result<PageSnapshot, EngineError> {
        let response = self
            .client
            .get(&request.url)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, request))?;

        let status_code = response.status().as_u16();
        let content = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, request))?;

        let (title, body_text) = extract_text(&content);
        Ok(PageSnapshot {
            status_code,
            title,
            body_text,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpEngine {
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<PageSnapshot, EngineError> {
        let start = Instant::now();
        let snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = self.load(request) => result?,
        };

        debug!(
            url = %request.url,
            status = snapshot.status_code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "HTTP fetch finished"
        );
        Ok(snapshot)
    }

    fn supports_cancellation(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// 将reqwest错误映射为引擎错误
fn map_reqwest_error(error: reqwest::Error, request: &FetchRequest) -> EngineError {
    if error.is_timeout() {
        return EngineError::Timeout(request.timeout);
    }

    let message = error_chain(&error);
    if error.is_connect() {
        let lower = message.to_lowercase();
        if lower.contains("dns") || lower.contains("lookup") || lower.contains("resolve") {
            EngineError::Dns(message)
        } else {
            EngineError::ConnectionRefused(message)
        }
    } else {
        EngineError::Navigation(message)
    }
}

/// 拼接错误及其来源链
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// 从HTML中提取标题和正文文本
pub fn extract_text(html: &str) -> (String, String) {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default();

    let body_text = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default();

    (title, body_text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "http_engine_test.rs"]
mod tests;
