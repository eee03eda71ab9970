// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod browser_engine;
pub mod http_engine;
pub mod traits;

use crate::config::settings::{EngineKind, EngineSettings};
use std::sync::Arc;
use traits::{EngineError, PageFetcher};

/// 根据配置创建页面抓取引擎
pub fn build_fetcher(settings: &EngineSettings) -> Result<Arc<dyn PageFetcher>, EngineError> {
    let fetcher: Arc<dyn PageFetcher> = match settings.kind {
        EngineKind::Browser => Arc::new(browser_engine::BrowserEngine::new(
            settings.remote_debugging_url.clone(),
            settings.user_agent.clone(),
        )),
        EngineKind::Http => Arc::new(http_engine::HttpEngine::new(&settings.user_agent)?),
    };
    Ok(fetcher)
}
