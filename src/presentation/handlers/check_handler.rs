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

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::{
    application::{
        dto::check_request::{CancelRequestDto, CheckRequestDto},
        use_cases::check_use_case::CheckUseCase,
    },
    presentation::errors::AppError,
};

/// 响应中携带实际运行标识的头
pub const RUN_ID_HEADER: HeaderName = HeaderName::from_static("x-run-id");

/// 批量检查URL
///
/// 阻塞到运行结束（完成、取消或中止），返回按提交顺序排列的结论数组。
pub async fn check(
    Extension(use_case): Extension<Arc<CheckUseCase>>,
    payload: Result<Json<CheckRequestDto>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(dto) = payload?;
    let response = use_case.check(dto).await?;

    info!(
        run_id = %response.run_id,
        results = response.results.len(),
        "Check request completed"
    );

    let mut http_response = Json(response.results).into_response();
    if let Ok(value) = HeaderValue::from_str(&response.run_id) {
        http_response.headers_mut().insert(RUN_ID_HEADER, value);
    }
    Ok(http_response)
}

/// 取消运行
pub async fn cancel(
    Extension(use_case): Extension<Arc<CheckUseCase>>,
    payload: Result<Json<CancelRequestDto>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(dto) = payload?;
    use_case.cancel(dto)?;
    Ok(Json(json!({ "ok": true })))
}

/// 存活探测
pub async fn ping() -> Json<Value> {
    Json(json!({ "ok": true, "message": "pong" }))
}

/// 原样返回请求体
pub async fn echo(payload: Result<Json<Value>, JsonRejection>) -> Result<Json<Value>, AppError> {
    let Json(body) = payload?;
    Ok(Json(body))
}
