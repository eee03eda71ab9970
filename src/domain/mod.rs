// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：检查结果、运行标识与运行状态
/// - 服务（services）：软404分类器与结果判定规则
///
/// 领域层只描述“一个URL检查的结论是什么”，
/// 不关心抓取如何调度、何时执行。
pub mod models;
pub mod services;
