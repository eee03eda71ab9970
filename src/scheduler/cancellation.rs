// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 取消登记表
///
/// 运行标识到取消令牌的映射。令牌在每个挂起点被监听，
/// 取消请求会立即唤醒正在等待的检查，而不是等到下一轮派发。
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    runs: DashMap<String, CancellationToken>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记运行并返回它的取消令牌
    ///
    /// 已存在的条目保持原样：先被取消、后开始的运行仍然是已取消状态。
    pub fn register(&self, run_id: &str) -> CancellationToken {
        self.runs
            .entry(run_id.to_string())
            .or_default()
            .clone()
    }

    /// 标记运行为已取消（幂等），未知的运行会被创建为已取消
    ///
    /// 返回本次调用是否改变了状态；并发的重复取消只有一个会得到 `true`。
    pub fn mark_cancelled(&self, run_id: &str) -> bool {
        // the entry guard serializes concurrent cancels of the same run
        let token = self.runs.entry(run_id.to_string()).or_default();
        let newly = !token.is_cancelled();
        token.cancel();
        if newly {
            debug!(run_id, "Run marked as cancelled");
        }
        newly
    }

    /// 查询运行是否已取消，未知运行返回 `false`
    pub fn is_cancelled(&self, run_id: &str) -> bool {
        self.runs
            .get(run_id)
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }

    /// 移除运行的登记
    pub fn forget(&self, run_id: &str) {
        self.runs.remove(run_id);
    }

    /// 当前登记的运行数量
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
