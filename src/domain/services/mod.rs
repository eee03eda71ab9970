// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 分类器（classifier）：站点相关的软404文本规则
/// - 判定服务（verdict_service）：把页面快照变成检查结论的规则
pub mod classifier;
pub mod verdict_service;
