// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use crate::config::settings::RetrySettings;

/// 被视为限流/反爬拦截的HTTP状态码
pub const BLOCKED_STATUS_CODES: [u16; 2] = [403, 429];

/// 重试策略配置
///
/// 只针对单个URL生效：遇到限流信号时按指数退避重新尝试，
/// 尝试次数有上限，超过上限后最后一次的结果按正常流程分类。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数（包含第一次）
    pub max_attempts: u32,
    /// 初始退避时间
    pub base_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
    /// 附加的随机抖动上限
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(2000),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: Duration::from_millis(500),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_backoff: Duration::from_millis(settings.base_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            backoff_multiplier: 2.0,
            jitter: Duration::from_millis(settings.jitter_ms),
        }
    }
}

impl RetryPolicy {
    /// 创建标准重试策略
    pub fn standard() -> Self {
        Self::default()
    }

    /// 不带抖动的策略，退避时间完全确定
    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    /// 计算第 `attempt` 次尝试失败后的退避时间
    ///
    /// `base * multiplier^(attempt-1)`，受 `max_backoff` 限制，再加上 `[0, jitter]` 的抖动。
    /// 抖动只会增加等待时间。
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let backoff_secs = self.base_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = Duration::from_secs_f64(backoff_secs.min(self.max_backoff.as_secs_f64()));

        if self.jitter.is_zero() {
            return capped;
        }

        let jitter_ms = rand::random_range(0..=self.jitter.as_millis() as u64);
        capped + Duration::from_millis(jitter_ms)
    }

    /// 是否应该重试
    pub fn should_retry(&self, attempt: u32, status: u16) -> bool {
        attempt < self.max_attempts && is_blocked_status(status)
    }
}

/// 判断状态码是否为限流/拒绝访问信号
pub fn is_blocked_status(status: u16) -> bool {
    BLOCKED_STATUS_CODES.contains(&status)
}
