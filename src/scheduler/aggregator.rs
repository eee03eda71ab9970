// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::domain::models::check_result::CheckResult;

/// 表格导出的表头
pub const CSV_HEADER: [&str; 6] = ["URL", "Status", "isReal404", "Reason", "Title", "Error"];

/// 结果汇总器
///
/// 检查按完成顺序记录，但以提交序号为键保存，
/// 因此无论完成顺序如何、运行是否提前终止，取出的列表都按提交顺序排列。
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Mutex<BTreeMap<usize, CheckResult>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录第 `index` 个URL的结论
    ///
    /// 同一序号重复记录时保留第一次的结论。
    pub fn record(&self, index: usize, result: CheckResult) -> bool {
        let mut results = self.results.lock();
        if results.contains_key(&index) {
            return false;
        }
        results.insert(index, result);
        true
    }

    /// 已记录的结论数量
    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    /// 按提交顺序返回当前所有结论
    pub fn results(&self) -> Vec<CheckResult> {
        self.results.lock().values().cloned().collect()
    }

    /// 取出全部结论（按提交顺序）
    pub fn into_results(self) -> Vec<CheckResult> {
        self.results.into_inner().into_values().collect()
    }

    /// 生成表格导出文本
    pub fn to_csv(&self) -> String {
        render_csv(&self.results())
    }
}

/// 将结论渲染为CSV：表头加每条结论一行，所有字段加双引号，内部双引号翻倍
pub fn render_csv(results: &[CheckResult]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|s| s.to_string()));
    for result in results {
        push_row(
            &mut out,
            [
                result.url.clone(),
                result.status.to_string(),
                result.is_real_not_found.to_string(),
                result.reason.clone(),
                result.title.clone(),
                result.error.clone(),
            ],
        );
    }
    out
}

fn push_row<I>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = String>,
{
    let row = fields
        .into_iter()
        .map(|field| quote(&field))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&row);
    out.push('\n');
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
