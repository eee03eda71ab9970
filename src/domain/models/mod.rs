// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// - 检查结果（check_result）：每个被尝试的URL对应一条结论
/// - 运行（run）：一次批量检查的标识与生命周期状态
pub mod check_result;
pub mod run;
