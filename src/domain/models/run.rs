// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 随机后缀长度
const RUN_TOKEN_LEN: usize = 8;

/// 生成运行标识
///
/// 格式为 `run-<毫秒时间戳>-<随机串>`
pub fn generate_run_id() -> String {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RUN_TOKEN_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("run-{}-{}", Utc::now().timestamp_millis(), token)
}

/// 批量运行的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// 已注册，尚未派发任何URL
    Idle,
    /// 正在逐个派发URL
    Dispatching,
    /// 不再派发，等待已派发的检查完成
    Draining,
    /// 显式关闭，取消登记已移除
    Closed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Dispatching => "dispatching",
            RunState::Draining => "draining",
            RunState::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}
