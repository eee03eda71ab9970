// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含检查用例与请求数据结构
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含检查结论模型、软404分类器与判定规则
pub mod domain;

/// 引擎模块
///
/// 实现浏览器与纯HTTP两种页面抓取引擎
pub mod engines;

/// 基础设施模块
///
/// 提供结果导出与指标导出
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由和处理器
pub mod presentation;

/// 调度模块
///
/// 实现并发准入、礼貌间隔、取消与批量运行
pub mod scheduler;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;
