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

use deadlinkrs::application::use_cases::check_use_case::CheckUseCase;
use deadlinkrs::config::settings::Settings;
use deadlinkrs::domain::services::classifier::PatternClassifier;
use deadlinkrs::engines::build_fetcher;
use deadlinkrs::infrastructure::export::CsvExporter;
use deadlinkrs::infrastructure::metrics;
use deadlinkrs::presentation::routes;
use deadlinkrs::scheduler::{BatchRunner, SchedulerConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use deadlinkrs::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting deadlinkrs...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // Initialize Prometheus Metrics
    metrics::init_metrics(&settings.metrics);

    // 3. Initialize fetch engine and classifier
    let fetcher = build_fetcher(&settings.engine)?;
    let classifier = Arc::new(PatternClassifier::new()?);
    info!(
        "Fetch engine '{}' ready, {} soft-404 rules loaded",
        fetcher.name(),
        classifier.rule_count()
    );

    // 4. Initialize the shared scheduler
    let config = SchedulerConfig::from(&settings);
    info!(
        "Scheduler: {} global slots, {:?} fetch timeout",
        config.global_concurrency, config.fetch_timeout
    );
    let runner = Arc::new(BatchRunner::new(config, fetcher, classifier));
    let use_case = Arc::new(CheckUseCase::new(
        runner,
        CsvExporter::new(&settings.export.path),
    ));

    // 5. Start server
    let app = routes::routes(use_case);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
