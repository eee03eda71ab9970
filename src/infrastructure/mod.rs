// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施模块
///
/// 提供结果文件导出与Prometheus指标导出
pub mod export;
pub mod metrics;
