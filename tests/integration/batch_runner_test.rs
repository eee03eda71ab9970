// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::mock_fetcher::{MockFetcher, Scripted};
use super::helpers::{default_config, distinct_host_urls, fast_config, runner};
use deadlinkrs::domain::models::check_result::HttpStatus;
use deadlinkrs::domain::models::run::RunState;
use deadlinkrs::engines::traits::EngineError;
use deadlinkrs::scheduler::aggregator::ResultAggregator;
use deadlinkrs::scheduler::SchedulerConfig;
use deadlinkrs::utils::retry_policy::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}

/// 真404被判定为不存在
#[tokio::test(start_paused = true)]
async fn test_real_404_is_reported() {
    let url = "https://example.com/real-404-page";
    let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(50)).script(url, vec![Scripted::status(404)]));
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());

    let outcome = runner.run("run-a", urls(&[url]), aggregator.clone()).await;
    let results = aggregator.results();

    assert_eq!(outcome.completed, 1);
    assert_eq!(results[0].status, HttpStatus::Code(404));
    assert!(results[0].is_real_not_found);
    assert_eq!(results[0].reason, "Page Not Found (404)");
}

/// 同一主机的请求串行且间隔不小于最小间隔
#[tokio::test(start_paused = true)]
async fn test_same_host_is_serialized_and_spaced() {
    let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(100)));
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());

    let list = urls(&[
        "https://same.example.com/a",
        "https://same.example.com/b",
        "https://same.example.com/c",
    ]);
    runner.run("run-b", list, aggregator.clone()).await;

    let starts = fetcher.starts();
    assert_eq!(starts.len(), 3);
    assert_eq!(fetcher.peak_per_host(), 1);
    for pair in starts.windows(2) {
        let spacing = pair[1].1 - pair[0].1;
        assert!(spacing >= Duration::from_millis(900), "spacing {:?}", spacing);
    }
    assert_eq!(aggregator.len(), 3);
}

/// 全局在途数量不超过容量，结果按提交顺序排列
#[tokio::test(start_paused = true)]
async fn test_global_bound_and_submission_order() {
    let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(500)));
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());
    let list = distinct_host_urls(10);

    let outcome = runner.run("run-c", list.clone(), aggregator.clone()).await;

    assert_eq!(fetcher.peak_in_flight(), 3);
    assert_eq!(runner.admission().in_flight(), 0);
    assert_eq!(outcome.dispatched, 10);
    assert_eq!(outcome.completed, 10);
    assert_eq!(outcome.state, RunState::Draining);
    assert!(!outcome.cancelled);
    assert!(outcome.fatal.is_none());

    let result_urls: Vec<String> = aggregator.results().into_iter().map(|r| r.url).collect();
    assert_eq!(result_urls, list);
}

/// 完成两个后取消：结论数量介于 2 和 2 + 容量之间，且迅速结束
#[tokio::test(start_paused = true)]
async fn test_cancel_mid_run() {
    let fetcher = Arc::new(MockFetcher::new(Duration::from_secs(1)));
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());

    let handle = {
        let runner = runner.clone();
        let aggregator = aggregator.clone();
        tokio::spawn(async move { runner.run("run-d", distinct_host_urls(10), aggregator).await })
    };

    while aggregator.len() < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let cancelled_at = Instant::now();
    runner.cancel_run("run-d");

    let outcome = handle.await.unwrap();
    assert!(cancelled_at.elapsed() <= Duration::from_millis(200));
    assert!(outcome.cancelled);
    assert!(outcome.completed >= 2 && outcome.completed <= 5, "completed {}", outcome.completed);
    assert!(outcome.dispatched < 10);
    assert_eq!(aggregator.len(), outcome.completed);
    assert_eq!(runner.admission().in_flight(), 0);
    assert_eq!(fetcher.in_flight(), 0);
    assert!(runner.cancellations().is_cancelled("run-d"));
}

/// 运行开始前已取消：什么也不派发
#[tokio::test(start_paused = true)]
async fn test_run_cancelled_before_start() {
    let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(10)));
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());

    runner.cancel_run("run-early");
    let outcome = runner.run("run-early", distinct_host_urls(4), aggregator.clone()).await;

    assert_eq!(outcome.dispatched, 0);
    assert!(aggregator.is_empty());
    assert!(fetcher.starts().is_empty());
    assert!(outcome.cancelled);
}

/// 限流状态最多尝试三次，退避约 2s 然后 4s，最后一次按正常流程分类
#[tokio::test(start_paused = true)]
async fn test_retry_bound_and_backoff() {
    let url = "https://blocked.example.com/";
    let fetcher = Arc::new(MockFetcher::new(Duration::ZERO).script(
        url,
        vec![
            Scripted::status(429),
            Scripted::status(403),
            Scripted::status(429),
            Scripted::status(200),
        ],
    ));
    let config = SchedulerConfig {
        retry: RetryPolicy::standard().without_jitter(),
        ..default_config(3)
    };
    let runner = runner(fetcher.clone(), config);
    let aggregator = Arc::new(ResultAggregator::new());

    runner.run("run-retry", urls(&[url]), aggregator.clone()).await;

    let attempts = fetcher.attempts_for(url);
    assert_eq!(attempts.len(), 3);
    let first_gap = attempts[1] - attempts[0];
    let second_gap = attempts[2] - attempts[1];
    assert!(first_gap >= Duration::from_secs(2) && first_gap < Duration::from_millis(2100));
    assert!(second_gap >= Duration::from_secs(4) && second_gap < Duration::from_millis(4100));

    let result = &aggregator.results()[0];
    assert_eq!(result.status, HttpStatus::Code(429));
    assert!(!result.is_real_not_found);
    assert_eq!(result.reason, "HTTP Error (429)");
}

/// 重试后成功
#[tokio::test(start_paused = true)]
async fn test_retry_then_success() {
    let url = "https://flaky.example.com/";
    let fetcher = Arc::new(
        MockFetcher::new(Duration::ZERO).script(url, vec![Scripted::status(403), Scripted::status(200)]),
    );
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());

    runner.run("run-flaky", urls(&[url]), aggregator.clone()).await;

    assert_eq!(fetcher.attempts_for(url).len(), 2);
    assert_eq!(aggregator.results()[0].reason, "Page Exists");
}

/// 退避期间取消会立即结束
#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff() {
    let url = "https://blocked.example.com/";
    let fetcher = Arc::new(MockFetcher::new(Duration::ZERO).script(url, vec![Scripted::status(429)]));
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());

    let handle = {
        let runner = runner.clone();
        let aggregator = aggregator.clone();
        tokio::spawn(async move { runner.run("run-backoff", urls(&[url]), aggregator).await })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    runner.cancel_run("run-backoff");
    let cancelled_at = Instant::now();
    let outcome = handle.await.unwrap();

    assert!(cancelled_at.elapsed() <= Duration::from_millis(200));
    assert_eq!(fetcher.attempts_for(url).len(), 1);
    assert_eq!(outcome.completed, 0);
}

/// 抓取错误变成 "error" 结论，且采用保守判定
#[tokio::test(start_paused = true)]
async fn test_fetch_errors_become_results() {
    let fetcher = Arc::new(
        MockFetcher::new(Duration::from_millis(10))
            .script(
                "https://a.example.com/",
                vec![Scripted::Fail(EngineError::Dns("net::ERR_NAME_NOT_RESOLVED".into()))],
            )
            .script(
                "https://b.example.com/",
                vec![Scripted::Fail(EngineError::Other("Target closed".into()))],
            ),
    );
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());

    let outcome = runner
        .run(
            "run-errors",
            urls(&["https://a.example.com/", "https://b.example.com/", "https://c.example.com/"]),
            aggregator.clone(),
        )
        .await;

    let results = aggregator.results();
    assert!(outcome.fatal.is_none());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, HttpStatus::Error);
    assert!(results[0].is_real_not_found);
    assert_eq!(results[0].reason, "Network Error");
    assert!(results[0].error.contains("ERR_NAME_NOT_RESOLVED"));
    assert_eq!(results[1].reason, "Unexpected Error");
    assert_eq!(results[2].reason, "Page Exists");
}

/// 单次抓取超时归入超时类错误
#[tokio::test(start_paused = true)]
async fn test_fetch_timeout() {
    let fetcher = Arc::new(MockFetcher::new(Duration::from_secs(60)));
    let config = SchedulerConfig {
        fetch_timeout: Duration::from_secs(1),
        ..default_config(3)
    };
    let runner = runner(fetcher.clone(), config);
    let aggregator = Arc::new(ResultAggregator::new());

    runner
        .run("run-timeout", urls(&["https://slow.example.com/"]), aggregator.clone())
        .await;

    let result = &aggregator.results()[0];
    assert_eq!(result.status, HttpStatus::Error);
    assert_eq!(result.reason, "Timeout while loading page");
    assert_eq!(fetcher.in_flight(), 0);
}

/// 引擎无法启动时整个运行中止，不为任何URL记录结论
#[tokio::test(start_paused = true)]
async fn test_unavailable_engine_aborts_run() {
    let list = distinct_host_urls(5);
    let mut fetcher = MockFetcher::new(Duration::from_millis(50));
    for url in &list {
        fetcher = fetcher.script(
            url,
            vec![Scripted::Fail(EngineError::Unavailable(
                "Failed to launch Chrome: no binary".into(),
            ))],
        );
    }
    let fetcher = Arc::new(fetcher);
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());

    let outcome = runner.run("run-no-browser", list, aggregator.clone()).await;

    let fatal = outcome.fatal.expect("engine failure should abort the run");
    assert!(fatal.contains("no binary"), "{}", fatal);
    assert_eq!(outcome.completed, 0);
    assert_eq!(aggregator.len(), 0);
    assert!(outcome.dispatched < 5);
    assert!(!outcome.cancelled);
    assert!(!runner.cancellations().is_cancelled("run-no-browser"));
    assert_eq!(runner.admission().in_flight(), 0);
}

/// 引擎不可用时，同一运行中正在进行的其他检查也被叫停
#[tokio::test(start_paused = true)]
async fn test_unavailable_engine_stops_in_flight_checks() {
    let list = distinct_host_urls(4);
    let fetcher = Arc::new(
        MockFetcher::new(Duration::from_millis(50))
            .script(&list[0], vec![Scripted::Fail(EngineError::Unavailable("gone".into()))])
            .script(&list[1], vec![Scripted::Hang]),
    );
    let runner = runner(fetcher.clone(), default_config(2));
    let aggregator = Arc::new(ResultAggregator::new());

    let started = Instant::now();
    let outcome = runner.run("run-engine-lost", list, aggregator.clone()).await;

    assert!(outcome.fatal.is_some());
    assert_eq!(outcome.completed, 0);
    assert_eq!(outcome.dispatched, 2);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(fetcher.in_flight(), 0);
}

/// 声称自行处理取消的引擎卡住时，调度器在宽限期后放弃它
#[tokio::test(start_paused = true)]
async fn test_engine_ignoring_cancellation_is_abandoned() {
    let url = "https://stuck.example.com/";
    let fetcher = Arc::new(
        MockFetcher::new(Duration::ZERO)
            .claiming_cancellation()
            .script(url, vec![Scripted::Hang]),
    );
    let runner = runner(fetcher.clone(), default_config(3));
    let aggregator = Arc::new(ResultAggregator::new());

    let canceller = {
        let runner = runner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            runner.cancel_run("run-stuck");
            Instant::now()
        })
    };

    let outcome = runner.run("run-stuck", urls(&[url]), aggregator.clone()).await;
    let cancelled_at = canceller.await.unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.completed, 0);
    assert!(cancelled_at.elapsed() <= Duration::from_secs(6));
    assert_eq!(fetcher.in_flight(), 0);
    assert_eq!(runner.admission().in_flight(), 0);
}

/// 声称自行处理超时的引擎超时后仍不返回，按超时记录
#[tokio::test(start_paused = true)]
async fn test_engine_overrunning_timeout_is_abandoned() {
    let url = "https://stuck.example.com/";
    let fetcher = Arc::new(
        MockFetcher::new(Duration::ZERO)
            .claiming_cancellation()
            .script(url, vec![Scripted::Hang]),
    );
    let config = SchedulerConfig {
        fetch_timeout: Duration::from_secs(1),
        ..default_config(3)
    };
    let runner = runner(fetcher.clone(), config);
    let aggregator = Arc::new(ResultAggregator::new());

    let started = Instant::now();
    runner
        .run("run-overrun", urls(&[url]), aggregator.clone())
        .await;

    let result = &aggregator.results()[0];
    assert_eq!(result.status, HttpStatus::Error);
    assert_eq!(result.reason, "Timeout while loading page");
    assert!(started.elapsed() <= Duration::from_secs(7));
    assert_eq!(fetcher.in_flight(), 0);
}

/// 检查任务panic会中止运行，但已有结论仍然保留
#[tokio::test(start_paused = true)]
async fn test_task_panic_aborts_run_with_partial_results() {
    let list = distinct_host_urls(5);
    let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(100)).script(&list[0], vec![Scripted::Panic]));
    let runner = runner(fetcher.clone(), default_config(1));
    let aggregator = Arc::new(ResultAggregator::new());

    let outcome = runner.run("run-panic", list, aggregator.clone()).await;

    assert!(outcome.fatal.is_some());
    assert!(outcome.dispatched < 5);
    assert_eq!(outcome.completed, aggregator.len());
    assert_eq!(runner.admission().in_flight(), 0);
}

/// 并发运行共享同一份全局预算
#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_share_global_budget() {
    let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(300)));
    let runner = runner(fetcher.clone(), default_config(3));

    let first: Vec<String> = (0..5).map(|i| format!("https://first{}.example.com/", i)).collect();
    let second: Vec<String> = (0..5).map(|i| format!("https://second{}.example.com/", i)).collect();
    let first_results = Arc::new(ResultAggregator::new());
    let second_results = Arc::new(ResultAggregator::new());

    let (a, b) = tokio::join!(
        runner.run("run-1", first, first_results.clone()),
        runner.run("run-2", second, second_results.clone()),
    );

    assert_eq!(fetcher.peak_in_flight(), 3);
    assert_eq!(a.completed, 5);
    assert_eq!(b.completed, 5);
}

/// 取消一个运行不影响另一个运行
#[tokio::test(start_paused = true)]
async fn test_cancellation_is_scoped_to_run() {
    let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(200)));
    let runner = runner(fetcher.clone(), default_config(2));
    let kept = Arc::new(ResultAggregator::new());
    let dropped = Arc::new(ResultAggregator::new());

    let canceller = {
        let runner = runner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            runner.cancel_run("run-dropped");
        })
    };

    let (kept_outcome, dropped_outcome) = tokio::join!(
        runner.run("run-kept", distinct_host_urls(4), kept.clone()),
        runner.run(
            "run-dropped",
            (0..4).map(|i| format!("https://other{}.example.com/", i)).collect(),
            dropped.clone(),
        ),
    );
    canceller.await.unwrap();

    assert_eq!(kept_outcome.completed, 4);
    assert!(!kept_outcome.cancelled);
    assert!(dropped_outcome.cancelled);
    assert!(dropped_outcome.completed < 4);
}

/// 同一主机的礼貌记录跨运行共享
#[tokio::test(start_paused = true)]
async fn test_politeness_is_shared_across_runs() {
    let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(10)));
    let runner = runner(fetcher.clone(), default_config(3));

    runner
        .run("run-x", urls(&["https://shared.example.com/1"]), Arc::new(ResultAggregator::new()))
        .await;
    runner
        .run("run-y", urls(&["https://shared.example.com/2"]), Arc::new(ResultAggregator::new()))
        .await;

    let starts = fetcher.starts();
    assert!(starts[1].1 - starts[0].1 >= Duration::from_millis(900));
}

/// 关闭运行会移除取消登记并重置引擎
#[tokio::test]
async fn test_close_run_forgets_and_resets() {
    let fetcher = Arc::new(MockFetcher::new(Duration::ZERO));
    let runner = runner(fetcher.clone(), fast_config(3));

    runner
        .run("run-close", distinct_host_urls(2), Arc::new(ResultAggregator::new()))
        .await;
    runner.cancel_run("run-close");
    assert!(runner.cancellations().is_cancelled("run-close"));

    let state = runner.close_run("run-close").await;

    assert_eq!(state, RunState::Closed);
    assert!(!runner.cancellations().is_cancelled("run-close"));
    assert!(runner.cancellations().is_empty());
    assert_eq!(fetcher.resets(), 1);
}
