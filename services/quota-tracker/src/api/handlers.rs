use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{
        header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER},
        StatusCode,
    },
    Json,
};
use chrono::{DateTime, NaiveTime, Utc};
use tracing::error;

use crate::tracker::{QuotaError, UsageSnapshot};

use super::types::{ConsumeQuotaRequest, ConsumeQuotaResponse, ErrorResponse};
use super::ApiState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Consumes one request of the caller's daily allowance.
///
/// A denial is a successful response with `allowed: false`; the HTTP status
/// stays 200 and the caller decides how to refuse (the chat API maps it to
/// 429 toward the end user). Storage failures surface as 500, which callers
/// must treat as "not allowed".
pub async fn consume_quota(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ConsumeQuotaRequest>,
) -> Result<(HeaderMap, Json<ConsumeQuotaResponse>), (StatusCode, Json<ErrorResponse>)> {
    if request.user_id.trim().is_empty() {
        return Err(bad_request("invalid_user_id", "user_id cannot be empty"));
    }

    let decision = state
        .tracker
        .consume(&request.user_id)
        .map_err(map_quota_error)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(state.tracker.daily_limit()),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(decision.remaining),
    );
    if !decision.allowed {
        let retry_secs = seconds_to_next_window(Utc::now());
        headers.insert(RETRY_AFTER, HeaderValue::from(retry_secs));
    }

    Ok((headers, Json(decision.into())))
}

pub async fn get_quota(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<String>,
) -> ApiResult<UsageSnapshot> {
    match state.tracker.usage(&user_id) {
        Ok(Some(snapshot)) => Ok(Json(snapshot)),
        Ok(None) => Err(not_found("user_not_found", "user has no usage record")),
        Err(QuotaError::InvalidUserId) => {
            Err(bad_request("invalid_user_id", "user_id cannot be empty"))
        }
        Err(err) => Err(internal_error(err)),
    }
}

pub async fn list_quotas(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<UsageSnapshot>> {
    state.tracker.all_usage().map(Json).map_err(internal_error)
}

pub async fn health_check() -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "quota-tracker"
    })))
}

/// Whole seconds until the next UTC midnight, rounded up so a client that
/// waits the advertised time always lands in the next window.
fn seconds_to_next_window(now: DateTime<Utc>) -> u64 {
    let Some(tomorrow) = now.date_naive().succ_opt() else {
        return 0;
    };
    let next_window = tomorrow.and_time(NaiveTime::MIN).and_utc();
    let millis = (next_window - now).num_milliseconds().max(0);
    ((millis + 999) / 1000) as u64
}

fn map_quota_error(err: QuotaError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        QuotaError::InvalidUserId => bad_request("invalid_user_id", "user_id cannot be empty"),
        QuotaError::StorageError(err) => internal_error(err),
    }
}

fn bad_request(code: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        }),
    )
}

fn not_found(code: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        }),
    )
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, Json<ErrorResponse>) {
    error!(error = %err, "quota API internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal server error".to_string(),
            code: "internal_error".to_string(),
            details: Some(serde_json::json!({ "message": err.to_string() })),
        }),
    )
}
