// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 把HTTP请求翻译成调度器的一次批量运行，并负责导出结果
pub mod dto;
pub mod use_cases;
