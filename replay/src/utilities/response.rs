use reqwest::StatusCode;
use tracing::debug;

use crate::config::SuccessRange;
use crate::domain::response::{AnalysisResponse, Outcome, RequestFailure};

/// Longest error body kept in a failure detail.
const MAX_DETAIL_CHARS: usize = 200;

/// Turns a received response into an outcome. The body is only inspected for
/// display: it never changes whether a status counts as a success.
pub fn build_outcome(
    res_type: &str,
    res_status: StatusCode,
    res_text: &str,
    success_range: SuccessRange,
) -> Outcome {
    if success_range.accepts(res_status) {
        let analysis = if is_json(res_type) {
            match serde_json::from_str::<AnalysisResponse>(res_text) {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    debug!(error = %e, "success body is not an analysis response");
                    None
                }
            }
        } else {
            None
        };
        return Outcome::Success { analysis };
    }

    Outcome::Failure(RequestFailure::UnexpectedStatus {
        status: res_status.as_u16(),
        detail: error_detail(res_type, res_text),
    })
}

fn is_json(res_type: &str) -> bool {
    res_type.starts_with("application/json")
}

/// FastAPI puts its error text under `detail`; other bodies are kept as text.
fn error_detail(res_type: &str, res_text: &str) -> Option<String> {
    if res_text.trim().is_empty() {
        return None;
    }
    if is_json(res_type) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(res_text) {
            let detail = match value.get("detail") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => value.to_string(),
            };
            return Some(truncate(&detail));
        }
    }
    Some(truncate(res_text.trim()))
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DETAIL_CHARS {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(MAX_DETAIL_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
