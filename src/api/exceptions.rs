//! Exception list and status updates.
//!
//! - `GET /api/exceptions` - filter by `type`, `severity`, `status`,
//!   `stockCode`, `startDate`, `endDate`
//! - `POST /api/exceptions` - `updateStatus` or `batchUpdate`

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ActionBody, ActionResponse, ApiError, AppState, FilterQuery, StatusAck};
use crate::filter::{matches_stock, matches_tag, TimeRange};
use crate::models::{AnomalyType, Exception, ExceptionStatus, Severity};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub stock_code: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExceptionFilters {
    pub types: Vec<&'static str>,
    pub severities: Vec<&'static str>,
    pub statuses: Vec<&'static str>,
}

impl ExceptionFilters {
    fn vocabulary() -> Self {
        Self {
            types: AnomalyType::ALL.iter().map(|t| t.as_str()).collect(),
            severities: Severity::ALL.iter().map(|s| s.as_str()).collect(),
            statuses: ExceptionStatus::ALL.iter().map(|s| s.as_str()).collect(),
        }
    }
}

/// Counts over the whole store, regardless of filters.
#[derive(Debug, Default, Serialize)]
pub struct ExceptionSummary {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub resolved: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ExceptionSummary {
    fn of(rows: &[Exception]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match row.status {
                ExceptionStatus::Pending => summary.pending += 1,
                ExceptionStatus::Processing => summary.processing += 1,
                ExceptionStatus::Resolved => summary.resolved += 1,
            }
            match row.severity {
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Serialize)]
pub struct ExceptionListResponse {
    pub data: Vec<Exception>,
    pub total: usize,
    pub filters: ExceptionFilters,
    pub summary: ExceptionSummary,
}

pub fn filter_exceptions(rows: &[Exception], query: &ExceptionQuery) -> Vec<Exception> {
    let range = TimeRange::from_params(query.start_date.as_deref(), query.end_date.as_deref());
    rows.iter()
        .filter(|e| matches_tag(query.kind.as_deref(), e.kind.as_str()))
        .filter(|e| matches_tag(query.severity.as_deref(), e.severity.as_str()))
        .filter(|e| matches_tag(query.status.as_deref(), e.status.as_str()))
        .filter(|e| matches_stock(query.stock_code.as_deref(), &e.stock_code, &e.stock_name))
        .filter(|e| range.contains(e.time))
        .cloned()
        .collect()
}

/// GET /api/exceptions
pub async fn list_exceptions(
    State(state): State<AppState>,
    FilterQuery(query): FilterQuery<ExceptionQuery>,
) -> Json<ExceptionListResponse> {
    let rows = state.store.exceptions.read();
    let data = filter_exceptions(&rows, &query);

    Json(ExceptionListResponse {
        total: data.len(),
        data,
        filters: ExceptionFilters::vocabulary(),
        summary: ExceptionSummary::of(&rows),
    })
}

// ===== Actions =====

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ExceptionAction {
    UpdateStatus { id: i64, data: StatusUpdate },
    BatchUpdate { data: BatchStatusUpdate },
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ExceptionStatus,
}

#[derive(Debug, Deserialize)]
pub struct BatchStatusUpdate {
    pub ids: Vec<i64>,
    pub status: ExceptionStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAck {
    pub count: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ExceptionActionData {
    Status(StatusAck<ExceptionStatus>),
    Batch(BatchAck),
}

/// Apply an action to the exception list. Status overwrites are
/// unconditional; only an unknown id in `updateStatus` is rejected.
pub fn apply_exception_action(
    rows: &mut [Exception],
    action: ExceptionAction,
    now: DateTime<Utc>,
) -> Result<ActionResponse<ExceptionActionData>, ApiError> {
    match action {
        ExceptionAction::UpdateStatus { id, data } => {
            let Some(exception) = rows.iter_mut().find(|e| e.id == id) else {
                debug!(id, "updateStatus on unknown exception");
                return Err(ApiError::InvalidAction);
            };
            exception.status = data.status;
            info!(id, status = data.status.as_str(), "Exception status updated");

            Ok(ActionResponse::ok(
                format!("异常 {} 状态已更新为 {}", id, data.status.as_str()),
                ExceptionActionData::Status(StatusAck {
                    id,
                    status: data.status,
                    updated_at: now,
                }),
            ))
        }
        ExceptionAction::BatchUpdate { data } => {
            let mut matched = 0;
            for exception in rows.iter_mut().filter(|e| data.ids.contains(&e.id)) {
                exception.status = data.status;
                matched += 1;
            }
            info!(
                requested = data.ids.len(),
                matched,
                status = data.status.as_str(),
                "Exception batch update"
            );

            Ok(ActionResponse::ok(
                format!("已批量处理 {} 条异常", data.ids.len()),
                ExceptionActionData::Batch(BatchAck {
                    count: data.ids.len(),
                    updated_at: now,
                }),
            ))
        }
    }
}

/// POST /api/exceptions
pub async fn post_exception_action(
    State(state): State<AppState>,
    ActionBody(action): ActionBody<ExceptionAction>,
) -> Result<Json<ActionResponse<ExceptionActionData>>, ApiError> {
    let mut rows = state.store.exceptions.write();
    apply_exception_action(&mut rows, action, Utc::now()).map(Json)
}
