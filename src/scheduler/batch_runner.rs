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

use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::settings::Settings;
use crate::domain::models::check_result::CheckResult;
use crate::domain::models::run::RunState;
use crate::domain::services::classifier::Classifier;
use crate::domain::services::verdict_service;
use crate::engines::traits::{EngineError, FetchRequest, PageFetcher, PageSnapshot};
use crate::scheduler::admission::{AdmissionController, GlobalSlot};
use crate::scheduler::aggregator::ResultAggregator;
use crate::scheduler::cancellation::CancellationRegistry;
use crate::scheduler::politeness::{PolitenessConfig, PolitenessGate};
use crate::utils::errors::SchedulerError;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::url_utils::host_key;

/// 自行处理取消和超时的引擎超出期限后，调度器再额外等待的时间
const ENGINE_GRACE: Duration = Duration::from_secs(5);

/// 调度器配置
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 全局并发槽位数
    pub global_concurrency: usize,
    /// 单次抓取超时
    pub fetch_timeout: Duration,
    /// 礼貌间隔
    pub politeness: PolitenessConfig,
    /// 重试策略
    pub retry: RetryPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            global_concurrency: 3,
            fetch_timeout: Duration::from_secs(30),
            politeness: PolitenessConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&Settings> for SchedulerConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            global_concurrency: settings.scheduler.global_concurrency,
            fetch_timeout: settings.scheduler.fetch_timeout(),
            politeness: PolitenessConfig::from(&settings.politeness),
            retry: RetryPolicy::from(&settings.retry),
        }
    }
}

/// 一次批量运行的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub run_id: String,
    /// 运行结束时所处的状态
    pub state: RunState,
    /// 提交的URL数量
    pub submitted: usize,
    /// 实际派发的URL数量
    pub dispatched: usize,
    /// 产生结论的URL数量
    pub completed: usize,
    /// 是否因取消而提前结束
    pub cancelled: bool,
    /// 调度器自身的致命错误
    pub fatal: Option<String>,
}

/// 批量运行器
///
/// 进程内唯一的共享调度实例：并发槽位、主机礼貌记录与取消登记表在所有运行之间共享，
/// 同时进行的运行争用同一份全局和主机预算。
///
/// 每个URL的流水线：全局槽位 → 主机槽位 → 礼貌间隔 → 抓取与分类（含重试）→
/// 释放主机槽位 → 释放全局槽位 → 记录结论。所有挂起点都监听运行的取消令牌。
pub struct BatchRunner {
    admission: AdmissionController,
    politeness: PolitenessGate,
    cancellations: CancellationRegistry,
    retry: RetryPolicy,
    fetch_timeout: Duration,
    fetcher: Arc<dyn PageFetcher>,
    classifier: Arc<dyn Classifier>,
}

impl BatchRunner {
    /// 创建新的批量运行器
    pub fn new(
        config: SchedulerConfig,
        fetcher: Arc<dyn PageFetcher>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            admission: AdmissionController::new(config.global_concurrency),
            politeness: PolitenessGate::new(config.politeness),
            cancellations: CancellationRegistry::new(),
            retry: config.retry,
            fetch_timeout: config.fetch_timeout,
            fetcher,
            classifier,
        }
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn politeness(&self) -> &PolitenessGate {
        &self.politeness
    }

    pub fn cancellations(&self) -> &CancellationRegistry {
        &self.cancellations
    }

    /// 登记运行（未见过的运行登记为未取消）
    pub fn register_run(&self, run_id: &str) -> CancellationToken {
        self.cancellations.register(run_id)
    }

    /// 取消运行
    pub fn cancel_run(&self, run_id: &str) {
        if self.cancellations.mark_cancelled(run_id) {
            counter!("deadlink_runs_cancelled_total").increment(1);
        }
        info!(run_id, "Run cancellation requested");
    }

    /// 显式关闭运行：移除取消登记并重置抓取引擎的共享界面
    pub async fn close_run(&self, run_id: &str) -> RunState {
        self.cancellations.forget(run_id);
        if let Err(e) = self.fetcher.reset().await {
            warn!(run_id, "Failed to reset {} engine: {}", self.fetcher.name(), e);
        }
        info!(run_id, "Run closed");
        RunState::Closed
    }

    /// 执行一次批量运行
    ///
    /// 流式准入：每拿到一个全局槽位就派发下一个URL，在途数量不超过全局容量。
    /// 派发前检查取消；取消后进入 `Draining`，只等待已派发的检查结束。
    /// 结论写入 `aggregator`，按提交顺序读取。
    ///
    /// 抓取引擎不可用或检查任务异常时运行中止：停止派发，已派发的检查被叫停，
    /// 已有结论保留，错误写入 `BatchOutcome::fatal`。
    pub async fn run(
        self: &Arc<Self>,
        run_id: &str,
        urls: Vec<String>,
        aggregator: Arc<ResultAggregator>,
    ) -> BatchOutcome {
        let cancel = self.register_run(run_id);
        // Cancelled on user cancel or on a run-level fatal error.
        let abort = cancel.child_token();
        let submitted = urls.len();
        let mut state = RunState::Idle;
        let mut tasks = JoinSet::new();
        let mut dispatched = 0usize;
        let mut fatal: Option<String> = None;

        info!(run_id, submitted, engine = self.fetcher.name(), "Starting batch run");
        state = transition(run_id, state, RunState::Dispatching);

        for (index, url) in urls.into_iter().enumerate() {
            if abort.is_cancelled() {
                break;
            }

            let global = match self.admission.acquire_global(run_id, &abort).await {
                Ok(slot) => slot,
                Err(SchedulerError::Cancelled(_)) => break,
                Err(e) => {
                    error!(run_id, "Failed to acquire global slot: {}", e);
                    fatal = Some(e.to_string());
                    break;
                }
            };

            while let Some(joined) = tasks.try_join_next() {
                record_task_end(run_id, joined, &abort, &mut fatal);
            }
            if fatal.is_some() || abort.is_cancelled() {
                break;
            }

            dispatched += 1;
            gauge!("deadlink_fetches_in_flight").set(self.admission.in_flight() as f64);

            let runner = Arc::clone(self);
            let abort = abort.clone();
            let aggregator = aggregator.clone();
            let run_id = run_id.to_string();
            tasks.spawn(async move {
                runner
                    .check_url(&run_id, index, url, global, &abort, &aggregator)
                    .await
            });
        }

        state = transition(run_id, state, RunState::Draining);
        while let Some(joined) = tasks.join_next().await {
            record_task_end(run_id, joined, &abort, &mut fatal);
        }
        gauge!("deadlink_fetches_in_flight").set(self.admission.in_flight() as f64);

        let outcome = BatchOutcome {
            run_id: run_id.to_string(),
            state,
            submitted,
            dispatched,
            completed: aggregator.len(),
            cancelled: cancel.is_cancelled(),
            fatal,
        };
        info!(
            run_id,
            submitted = outcome.submitted,
            dispatched = outcome.dispatched,
            completed = outcome.completed,
            cancelled = outcome.cancelled,
            "Batch run finished"
        );
        outcome
    }

    /// 单个URL的完整流水线，全局槽位在主机槽位之后释放
    ///
    /// 返回错误表示整个运行必须中止，此时不记录结论。
    #[instrument(skip_all, fields(run_id = %run_id, index = index, url = %url))]
    async fn check_url(
        &self,
        run_id: &str,
        index: usize,
        url: String,
        global: GlobalSlot,
        cancel: &CancellationToken,
        aggregator: &ResultAggregator,
    ) -> Result<(), SchedulerError> {
        let host = host_key(&url);
        let outcome = self.check_with_host_slot(run_id, &url, &host, cancel).await;
        if outcome.is_err() {
            // stop the dispatcher before it can reuse this slot
            cancel.cancel();
        }
        drop(global);

        match outcome? {
            Some(result) => {
                let label = if result.status.code().is_some() { "page" } else { "error" };
                counter!("deadlink_checks_total", "outcome" => label).increment(1);
                debug!(status = %result.status, reason = %result.reason, "Check finished");
                aggregator.record(index, result);
            }
            None => debug!("Check aborted by cancellation"),
        }
        Ok(())
    }

    /// 持有主机槽位完成礼貌等待、抓取与重试
    ///
    /// 返回 `Ok(None)` 表示被取消，不产生结论；引擎不可用时返回错误。
    async fn check_with_host_slot(
        &self,
        run_id: &str,
        url: &str,
        host: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<CheckResult>, SchedulerError> {
        let _host_slot = match self.admission.acquire_host(host, run_id, cancel).await {
            Ok(slot) => slot,
            Err(e) if e.is_cancelled() => return Ok(None),
            Err(e) => return Ok(Some(CheckResult::from_error(url, e.to_string()))),
        };

        let mut attempt = 1u32;
        loop {
            if self.politeness.wait_polite(host, cancel).await.is_err() {
                return Ok(None);
            }

            let snapshot = match self.fetch_once(url, cancel).await {
                Ok(snapshot) => snapshot,
                Err(EngineError::Cancelled) => return Ok(None),
                Err(EngineError::Unavailable(msg)) => {
                    error!("Fetch engine {} is unavailable: {}", self.fetcher.name(), msg);
                    return Err(SchedulerError::EngineUnavailable(msg));
                }
                Err(e) => {
                    warn!(attempt, "Fetch failed: {}", e);
                    return Ok(Some(CheckResult::from_error(url, e.to_string())));
                }
            };

            if !self.retry.should_retry(attempt, snapshot.status_code) {
                return Ok(Some(verdict_service::evaluate(
                    url,
                    &snapshot,
                    self.classifier.as_ref(),
                )));
            }

            let backoff = self.retry.calculate_backoff(attempt);
            warn!(
                attempt,
                status = snapshot.status_code,
                backoff_ms = backoff.as_millis() as u64,
                "Blocked by target, backing off before retry"
            );
            counter!("deadlink_check_retries_total").increment(1);
            drop(snapshot);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(backoff) => {}
            }
            attempt += 1;
        }
    }

    /// 执行一次抓取
    ///
    /// 引擎自行处理取消时先让它自己收尾，超出期限 `ENGINE_GRACE` 后仍未返回则强行放弃；
    /// 否则直接与取消信号和超时竞速。
    async fn fetch_once(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<PageSnapshot, EngineError> {
        let request = FetchRequest::new(url, self.fetch_timeout);
        if self.fetcher.supports_cancellation() {
            let overstayed = async {
                cancel.cancelled().await;
                tokio::time::sleep(ENGINE_GRACE).await;
            };
            let deadline = self.fetch_timeout + ENGINE_GRACE;
            return tokio::select! {
                biased;
                result = tokio::time::timeout(deadline, self.fetcher.fetch(&request, cancel)) => {
                    result.unwrap_or_else(|_| {
                        warn!("{} engine overran its fetch timeout", self.fetcher.name());
                        Err(EngineError::Timeout(self.fetch_timeout))
                    })
                }
                _ = overstayed => {
                    warn!("{} engine ignored cancellation", self.fetcher.name());
                    Err(EngineError::Cancelled)
                }
            };
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            result = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&request, cancel)) => {
                result.unwrap_or(Err(EngineError::Timeout(self.fetch_timeout)))
            }
        }
    }
}

fn transition(run_id: &str, from: RunState, to: RunState) -> RunState {
    debug!(run_id, %from, %to, "Run state transition");
    to
}

fn record_task_end(
    run_id: &str,
    joined: Result<Result<(), SchedulerError>, tokio::task::JoinError>,
    abort: &CancellationToken,
    fatal: &mut Option<String>,
) {
    let failure = match joined {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(e) => SchedulerError::Bookkeeping(e.to_string()),
    };
    error!(run_id, "Aborting run: {}", failure);
    abort.cancel();
    fatal.get_or_insert_with(|| failure.to_string());
}
