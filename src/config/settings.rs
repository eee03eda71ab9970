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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含服务器、调度、礼貌间隔、重试、抓取引擎、导出和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 调度器配置
    pub scheduler: SchedulerSettings,
    /// 礼貌间隔配置
    pub politeness: PolitenessSettings,
    /// 重试配置
    pub retry: RetrySettings,
    /// 抓取引擎配置
    pub engine: EngineSettings,
    /// 导出配置
    pub export: ExportSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 调度器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// 全局并发槽位数
    pub global_concurrency: usize,
    /// 单次页面抓取超时时间（秒）
    pub fetch_timeout_secs: u64,
}

impl SchedulerSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// 礼貌间隔配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessSettings {
    /// 同一主机两次请求之间的最小间隔（毫秒）
    pub min_delay_ms: u64,
    /// 附加随机抖动上限（毫秒）
    pub jitter_ms: u64,
}

/// 重试配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// 最大尝试次数（包含第一次）
    pub max_attempts: u32,
    /// 初始退避时间（毫秒）
    pub base_backoff_ms: u64,
    /// 最大退避时间（毫秒）
    pub max_backoff_ms: u64,
    /// 退避附加抖动上限（毫秒）
    pub jitter_ms: u64,
}

/// 抓取引擎类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// 基于chromiumoxide的浏览器渲染引擎
    Browser,
    /// 基于reqwest的纯HTTP引擎（不执行JavaScript）
    Http,
}

/// 抓取引擎配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// 引擎类型 (browser, http)
    pub kind: EngineKind,
    /// 远程Chrome调试地址（可选，未设置时本地启动浏览器）
    pub remote_debugging_url: Option<String>,
    /// 请求使用的User-Agent
    pub user_agent: String,
}

/// 导出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    /// 表格导出文件路径，每次检查完成后覆盖写入
    pub path: String,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用Prometheus指标导出
    pub enabled: bool,
    /// 指标监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("DEADLINK").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅使用内置默认值构建配置
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default scheduler settings
            .set_default("scheduler.global_concurrency", 3)?
            .set_default("scheduler.fetch_timeout_secs", 30)?
            // Default politeness settings
            .set_default("politeness.min_delay_ms", 900)?
            .set_default("politeness.jitter_ms", 700)?
            // Default retry settings
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_backoff_ms", 2000)?
            .set_default("retry.max_backoff_ms", 60_000)?
            .set_default("retry.jitter_ms", 500)?
            // Default engine settings
            .set_default("engine.kind", "browser")?
            .set_default(
                "engine.user_agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            )?
            // Default export settings
            .set_default("export.path", "./results.csv")?
            // Default metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}
