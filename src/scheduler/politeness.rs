// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::settings::PolitenessSettings;

/// 礼貌间隔配置
#[derive(Debug, Clone)]
pub struct PolitenessConfig {
    /// 同一主机两次请求之间的最小间隔
    pub min_delay: Duration,
    /// 附加的随机抖动上限（均匀分布于 `[0, jitter]`）
    pub jitter: Duration,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(900),
            jitter: Duration::from_millis(700),
        }
    }
}

impl From<&PolitenessSettings> for PolitenessConfig {
    fn from(settings: &PolitenessSettings) -> Self {
        Self {
            min_delay: Duration::from_millis(settings.min_delay_ms),
            jitter: Duration::from_millis(settings.jitter_ms),
        }
    }
}

impl PolitenessConfig {
    /// 本次等待的有效间隔（最小间隔 + 随机抖动）
    fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.min_delay;
        }
        let jitter_ms = rand::random_range(0..=self.jitter.as_millis() as u64);
        self.min_delay + Duration::from_millis(jitter_ms)
    }
}

/// 礼貌闸门
///
/// 记录每个主机最近一次请求的开始时间，保证同一主机的请求间隔不小于
/// `min_delay`（抖动只会增加间隔）。调用方必须已经持有该主机的并发槽位，
/// 这样“读取上次时间 - 等待 - 写入本次时间”不会与同主机的其他请求交错。
/// 主机记录在进程生命周期内一直保留，所有运行共享。
#[derive(Debug, Default)]
pub struct PolitenessGate {
    config: PolitenessConfig,
    last_fetch: Mutex<HashMap<String, Instant>>,
}

/// 等待被取消
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitCancelled;

impl PolitenessGate {
    pub fn new(config: PolitenessConfig) -> Self {
        Self {
            config,
            last_fetch: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PolitenessConfig {
        &self.config
    }

    /// 挂起直到可以礼貌地访问 `host`，然后记录本次访问时间
    ///
    /// 主机的第一次访问不等待。等待期间取消会立即返回 `WaitCancelled`，且不记录时间。
    pub async fn wait_polite(
        &self,
        host: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WaitCancelled> {
        let next_allowed = self
            .last_fetch
            .lock()
            .get(host)
            .map(|last| *last + self.config.effective_delay());

        if let Some(next_allowed) = next_allowed {
            let now = Instant::now();
            if next_allowed > now {
                debug!(
                    host,
                    wait_ms = (next_allowed - now).as_millis() as u64,
                    "Waiting for politeness interval"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(WaitCancelled),
                    _ = tokio::time::sleep_until(next_allowed) => {}
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(WaitCancelled);
        }

        self.last_fetch.lock().insert(host.to_string(), Instant::now());
        Ok(())
    }

    /// 主机最近一次请求的开始时间
    pub fn last_fetch(&self, host: &str) -> Option<Instant> {
        self.last_fetch.lock().get(host).copied()
    }

    /// 已知主机数量
    pub fn known_hosts(&self) -> usize {
        self.last_fetch.lock().len()
    }
}
