// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 调度器错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// 运行已被取消
    #[error("运行已取消: {0}")]
    Cancelled(String),

    /// 并发槽位池已关闭
    #[error("并发槽位池已关闭")]
    PoolClosed,

    /// 调度器自身记账出错，整个运行中止
    #[error("调度记账错误: {0}")]
    Bookkeeping(String),

    /// 抓取引擎无法启动或连接，整个运行中止
    #[error("抓取引擎不可用: {0}")]
    EngineUnavailable(String),
}

impl SchedulerError {
    /// 是否为取消信号（而非真正的错误）
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SchedulerError::Cancelled(_))
    }
}

/// 结果导出错误类型
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("导出文件写入失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("导出路径无效: {0}")]
    InvalidPath(String),
}
