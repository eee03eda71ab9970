// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::models::check_result::CheckResult;
use crate::scheduler::aggregator::render_csv;
use crate::utils::errors::ExportError;

/// 本地CSV导出器
///
/// 每次写入都整体覆盖目标文件。
#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写出表头与全部结论
    pub async fn write(&self, results: &[CheckResult]) -> Result<(), ExportError> {
        if self.path.as_os_str().is_empty() {
            return Err(ExportError::InvalidPath(String::new()));
        }

        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(&self.path).await?;
        file.write_all(render_csv(results).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
