// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    application::dto::check_request::{CancelRequestDto, CheckRequestDto, UrlsInput},
    domain::models::{check_result::CheckResult, run::generate_run_id},
    infrastructure::export::CsvExporter,
    scheduler::{aggregator::ResultAggregator, BatchOutcome, BatchRunner},
};

#[derive(Error, Debug)]
pub enum CheckUseCaseError {
    #[error("runId is required")]
    MissingRunId,
    #[error("urls must be an array of strings or a string")]
    InvalidUrls,
}

/// 一次检查请求的结果
#[derive(Debug, Clone)]
pub struct CheckResponse {
    /// 实际使用的运行标识
    pub run_id: String,
    /// 按提交顺序排列的结论
    pub results: Vec<CheckResult>,
    /// 运行摘要，空输入时为 `None`
    pub outcome: Option<BatchOutcome>,
}

pub struct CheckUseCase {
    runner: Arc<BatchRunner>,
    exporter: CsvExporter,
}

impl CheckUseCase {
    pub fn new(runner: Arc<BatchRunner>, exporter: CsvExporter) -> Self {
        Self { runner, exporter }
    }

    pub fn runner(&self) -> &Arc<BatchRunner> {
        &self.runner
    }

    /// 执行一次批量检查
    ///
    /// 无论运行是否被取消或中止，已得到的结论都会写入导出文件并返回。
    pub async fn check(&self, dto: CheckRequestDto) -> Result<CheckResponse, CheckUseCaseError> {
        let urls = dto
            .urls
            .map(UrlsInput::into_urls)
            .unwrap_or(Some(Vec::new()))
            .ok_or(CheckUseCaseError::InvalidUrls)?;

        let run_id = match dto.run_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => generate_run_id(),
        };

        if urls.is_empty() {
            info!(run_id = %run_id, "Empty URL list, nothing to check");
            self.export(&run_id, &[]).await;
            return Ok(CheckResponse {
                run_id,
                results: Vec::new(),
                outcome: None,
            });
        }

        let aggregator = Arc::new(ResultAggregator::new());
        let outcome = self.runner.run(&run_id, urls, aggregator.clone()).await;
        if let Some(fatal) = &outcome.fatal {
            warn!(run_id = %run_id, "Run aborted: {}", fatal);
        }

        let results = aggregator.results();
        self.export(&run_id, &results).await;

        let outcome = if dto.close {
            let state = self.runner.close_run(&run_id).await;
            BatchOutcome { state, ..outcome }
        } else {
            outcome
        };

        Ok(CheckResponse {
            run_id,
            results,
            outcome: Some(outcome),
        })
    }

    /// 取消运行
    pub fn cancel(&self, dto: CancelRequestDto) -> Result<String, CheckUseCaseError> {
        let run_id = dto
            .run_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(CheckUseCaseError::MissingRunId)?;

        self.runner.cancel_run(&run_id);
        Ok(run_id)
    }

    async fn export(&self, run_id: &str, results: &[CheckResult]) {
        match self.exporter.write(results).await {
            Ok(()) => info!(
                run_id,
                rows = results.len(),
                path = %self.exporter.path().display(),
                "Results exported"
            ),
            Err(e) => warn!(run_id, "Failed to export results: {}", e),
        }
    }
}
