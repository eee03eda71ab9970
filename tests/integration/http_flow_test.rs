// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::fast_config;
use axum::{http::StatusCode, response::Html, routing::get, Router};
use deadlinkrs::domain::models::check_result::HttpStatus;
use deadlinkrs::domain::services::classifier::PatternClassifier;
use deadlinkrs::engines::http_engine::HttpEngine;
use deadlinkrs::scheduler::aggregator::ResultAggregator;
use deadlinkrs::scheduler::BatchRunner;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn start_site(limited_hits: Arc<AtomicUsize>) -> String {
    let app = Router::new()
        .route(
            "/ok",
            get(|| async { Html("<html><head><title>Home</title></head><body>Welcome back</body></html>") }),
        )
        .route(
            "/gone",
            get(|| async { (StatusCode::GONE, Html("<html><body>removed</body></html>")) }),
        )
        .route(
            "/soft",
            get(|| async {
                Html("<html><head><title>Page Not Found | Example</title></head><body>Try the search box</body></html>")
            }),
        )
        .route(
            "/limited",
            get(move || {
                let hits = limited_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::TOO_MANY_REQUESTS, Html("<html><body>slow down</body></html>"))
                }
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// 使用真实HTTP引擎走完整条流水线
#[tokio::test]
async fn test_http_engine_pipeline_classifies_pages() {
    let limited_hits = Arc::new(AtomicUsize::new(0));
    let base = start_site(limited_hits.clone()).await;

    let fetcher = Arc::new(HttpEngine::new("deadlinkrs-test").unwrap());
    let classifier = Arc::new(PatternClassifier::new().unwrap());
    let runner = Arc::new(BatchRunner::new(fast_config(2), fetcher, classifier));
    let aggregator = Arc::new(ResultAggregator::new());

    let urls = vec![
        format!("{}/ok", base),
        format!("{}/gone", base),
        format!("{}/soft", base),
        format!("{}/limited", base),
        "http://127.0.0.1:1/unreachable".to_string(),
    ];
    let outcome = runner.run("run-http-flow", urls, aggregator.clone()).await;
    let results = aggregator.results();

    assert_eq!(outcome.completed, 5);

    assert_eq!(results[0].status, HttpStatus::Code(200));
    assert_eq!(results[0].title, "Home");
    assert_eq!(results[0].reason, "Page Exists");

    assert_eq!(results[1].status, HttpStatus::Code(410));
    assert!(results[1].is_real_not_found);
    assert_eq!(results[1].reason, "Page Gone (410)");

    assert!(results[2].is_real_not_found);
    assert_eq!(results[2].reason, "Soft 404: not-found title");

    assert_eq!(results[3].status, HttpStatus::Code(429));
    assert_eq!(results[3].reason, "HTTP Error (429)");
    assert_eq!(limited_hits.load(Ordering::SeqCst), 3);

    assert_eq!(results[4].status, HttpStatus::Error);
    assert!(results[4].is_real_not_found);
    assert_eq!(results[4].reason, "Network Error");
}
