// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{EngineError, FetchRequest, PageFetcher, PageSnapshot};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 提取正文文本的脚本
const BODY_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

/// 关闭标签页的最长等待时间
const PAGE_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// 浏览器抓取引擎
///
/// 基于chromiumoxide实现。浏览器进程在第一次抓取时启动（或连接远程实例）并复用，
/// 每次检查打开一个全新的标签页，用完即关，坏掉的页面不会影响后续检查。
pub struct BrowserEngine {
    browser: OnceCell<Browser>,
    /// 抓取持有读锁直到标签页关闭，重置需要写锁
    page_gate: RwLock<()>,
    remote_debugging_url: Option<String>,
    user_agent: String,
}

impl BrowserEngine {
    /// 创建新的浏览器引擎
    ///
    /// # 参数
    ///
    /// * `remote_debugging_url` - 远程Chrome调试地址，`None` 时本地启动
    /// * `user_agent` - 每个页面使用的User-Agent
    pub fn new(remote_debugging_url: Option<String>, user_agent: impl Into<String>) -> Self {
        Self {
            browser: OnceCell::new(),
            page_gate: RwLock::new(()),
            remote_debugging_url,
            user_agent: user_agent.into(),
        }
    }

    // Launches Chrome (or connects to a remote one) on first use.
    async fn browser(&self) -> Result<&Browser, EngineError> {
        self.browser
            .get_or_try_init(|| async {
                let (browser, mut handler) = if let Some(ref url) = self.remote_debugging_url {
                    info!("Connecting to remote Chrome instance at: {}", url);
                    Browser::connect(url.as_str()).await.map_err(|e| {
                        EngineError::Unavailable(format!(
                            "Failed to connect to remote Chrome: {}",
                            e
                        ))
                    })?
                } else {
                    let config = BrowserConfig::builder()
                        .no_sandbox()
                        .request_timeout(Duration::from_secs(30))
                        .arg("--disable-gpu")
                        .arg("--disable-dev-shm-usage")
                        .build()
                        .map_err(EngineError::Unavailable)?;

                    Browser::launch(config).await.map_err(|e| {
                        EngineError::Unavailable(format!("Failed to launch Chrome: {}", e))
                    })?
                };

                // Spawn a handler to process browser events
                tokio::spawn(async move {
                    while let Some(h) = handler.next().await {
                        if h.is_err() {
                            break;
                        }
                    }
                });

                Ok(browser)
            })
            .await
    }

    // Keeps the tab in `opened` so the caller can close it even if this future is dropped.
    async fn open_and_load(
        &self,
        browser: &Browser,
        request: &FetchRequest,
        opened: &mut Option<Page>,
    ) -> Result<PageSnapshot, EngineError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;
        let page = opened.insert(page);
        self.load(page, request).await
    }

    async fn load(&self, page: &Page, request: &FetchRequest) -> Result<PageSnapshot, EngineError> {
        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;

        // goto waits for the load event by default
        let navigated = page
            .goto(request.url.as_str())
            .await
            .map_err(|e| EngineError::from_message(e.to_string()))?;

        let status_code = navigated
            .wait_for_navigation_response()
            .await
            .map_err(|e| EngineError::from_message(e.to_string()))?
            .and_then(|req| req.response.as_ref().map(|resp| resp.status))
            .and_then(|status| u16::try_from(status).ok())
            .unwrap_or(0);

        let title = page
            .get_title()
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?
            .unwrap_or_default();

        let body_text = page
            .evaluate(BODY_TEXT_SCRIPT)
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?
            .into_value::<String>()
            .unwrap_or_default();

        Ok(PageSnapshot {
            status_code,
            title,
            body_text,
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserEngine {
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<PageSnapshot, EngineError> {
        let start = Instant::now();
        // 等待重置、启动浏览器、开页和加载共用同一个期限
        let deadline = tokio::time::Instant::now() + request.timeout;

        let _in_use = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => return Err(EngineError::Timeout(request.timeout)),
            guard = self.page_gate.read() => guard,
        };
        let browser = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => {
                return Err(EngineError::Unavailable(format!(
                    "Chrome did not start within {:?}",
                    request.timeout
                )));
            }
            browser = self.browser() => browser?,
        };

        let mut opened = None;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(EngineError::Timeout(request.timeout)),
            result = self.open_and_load(browser, request, &mut opened) => result,
        };

        // 无论成功、失败还是取消，页面都在这里关闭
        if let Some(page) = opened {
            match tokio::time::timeout(PAGE_CLOSE_TIMEOUT, page.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(url = %request.url, "Failed to close page: {}", e),
                Err(_) => warn!(url = %request.url, "Timed out closing page"),
            }
        }

        if let Ok(snapshot) = &outcome {
            debug!(
                url = %request.url,
                status = snapshot.status_code,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Browser fetch finished"
            );
        }
        outcome
    }

    fn supports_cancellation(&self) -> bool {
        true
    }

    /// 关闭所有残留的标签页
    ///
    /// 浏览器在各个运行之间共享，仍有检查在进行时跳过重置。
    async fn reset(&self) -> Result<(), EngineError> {
        let Some(browser) = self.browser.get() else {
            return Ok(());
        };
        // Held until every stale tab is closed so no fetch can open one meanwhile.
        let Ok(_exclusive) = self.page_gate.try_write() else {
            debug!("Skipping browser reset while pages are in use");
            return Ok(());
        };

        let pages = browser
            .pages()
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;
        for page in pages {
            match tokio::time::timeout(PAGE_CLOSE_TIMEOUT, page.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to close page during reset: {}", e),
                Err(_) => warn!("Timed out closing page during reset"),
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
