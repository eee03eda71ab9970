// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 调度模块
///
/// 负责决定“何时抓取哪个URL”：
/// - 准入控制（admission）：全局与每主机两级并发槽位
/// - 礼貌间隔（politeness）：同一主机相邻请求的最小间隔加抖动
/// - 取消登记（cancellation）：按运行标识的协作式取消
/// - 结果汇总（aggregator）：按提交顺序收集结论并导出
/// - 批量运行器（batch_runner）：把以上部件组合成每个URL的检查流水线
pub mod admission;
pub mod aggregator;
pub mod batch_runner;
pub mod cancellation;
pub mod politeness;

pub use batch_runner::{BatchOutcome, BatchRunner, SchedulerConfig};
