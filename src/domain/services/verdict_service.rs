// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::check_result::CheckResult;
use crate::domain::services::classifier::Classifier;
use crate::engines::traits::PageSnapshot;

pub const REASON_NOT_FOUND: &str = "Page Not Found (404)";
pub const REASON_GONE: &str = "Page Gone (410)";
pub const REASON_EXISTS: &str = "Page Exists";

/// 根据页面快照得出检查结论
///
/// 1. 404/410 直接判定为不存在；
/// 2. 否则交给分类器识别软404；
/// 3. 其余 >= 400 的状态码记为HTTP错误，但不判定为不存在；
/// 4. 剩下的视为页面存在。
pub fn evaluate(url: &str, snapshot: &PageSnapshot, classifier: &dyn Classifier) -> CheckResult {
    let status = snapshot.status_code;
    let title = snapshot.title.as_str();

    match status {
        404 => return CheckResult::from_page(url, status, true, REASON_NOT_FOUND, title),
        410 => return CheckResult::from_page(url, status, true, REASON_GONE, title),
        _ => {}
    }

    let verdict = classifier.classify(url, &snapshot.body_text, title);
    if verdict.is_fake_not_found {
        return CheckResult::from_page(url, status, true, verdict.reason, title);
    }

    if status >= 400 {
        CheckResult::from_page(url, status, false, format!("HTTP Error ({})", status), title)
    } else {
        CheckResult::from_page(url, status, false, REASON_EXISTS, title)
    }
}
