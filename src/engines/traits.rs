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

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// 引擎错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// 页面加载超时
    #[error("Navigation timeout after {0:?}")]
    Timeout(Duration),
    /// DNS解析失败
    #[error("DNS error: {0}")]
    Dns(String),
    /// 连接被拒绝或重置
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),
    /// 其他导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 导航因取消而中止
    #[error("Navigation cancelled")]
    Cancelled,
    /// 引擎无法启动或连接（浏览器启动失败、远程实例不可达）
    ///
    /// 这不是某个URL的问题，调度器会中止整个运行而不是逐条记录结论。
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
    /// 引擎自身错误
    #[error("Engine error: {0}")]
    Other(String),
}

impl EngineError {
    /// 是否为取消信号
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Timeout(_))
    }

    /// 引擎整体不可用，而非单个页面失败
    pub fn is_unavailable(&self) -> bool {
        matches!(self, EngineError::Unavailable(_))
    }

    /// 根据底层错误消息归类
    ///
    /// 浏览器只给出 `net::ERR_*` 风格的字符串，这里按消息内容分桶。
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let upper = message.to_uppercase();
        if upper.contains("ERR_NAME_NOT_RESOLVED") || upper.contains("DNS") {
            EngineError::Dns(message)
        } else if upper.contains("ERR_CONNECTION_REFUSED")
            || upper.contains("ERR_CONNECTION_RESET")
            || upper.contains("CONNECTION REFUSED")
        {
            EngineError::ConnectionRefused(message)
        } else if upper.contains("ERR_TIMED_OUT") || upper.contains("TIMEOUT") {
            EngineError::Navigation(format!("timeout: {}", message))
        } else {
            EngineError::Navigation(message)
        }
    }
}

/// 页面抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: String,
    /// 超时时间
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

/// 页面快照
///
/// 导航结束后的终端响应状态，以及渲染后的标题和正文文本
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    /// HTTP状态码
    pub status_code: u16,
    /// 页面标题
    pub title: String,
    /// 渲染后的正文文本
    pub body_text: String,
}

/// 页面抓取特质
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 导航到URL并返回页面快照
    ///
    /// 支持取消的引擎应监听 `cancel`，在取消时自行释放页面资源并返回 `EngineError::Cancelled`。
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<PageSnapshot, EngineError>;

    /// 引擎是否自行处理取消
    ///
    /// 返回 `false` 时调度器会在外层让抓取与取消信号竞速，先到者胜。
    fn supports_cancellation(&self) -> bool {
        false
    }

    /// 将共享的浏览界面重置为中性状态
    async fn reset(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// 引擎名称
    fn name(&self) -> &'static str;
}
