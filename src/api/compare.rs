//! Multi-source consistency comparisons.
//!
//! `GET /api/compare` lists the seeded comparisons; with `action=detail` it
//! synthesizes a fresh field-by-field comparison of one stock instead.
//! POST actions only acknowledge: no comparison job is ever scheduled.

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ActionBody, ActionResponse, ApiError, AppState, FilterQuery};
use crate::filter::{matches_stock, matches_tag};
use crate::mock::{detail_comparison, DATA_SOURCES};
use crate::models::{CompareType, Comparison, ComparisonStatus};

const DEFAULT_STOCK: &str = "000001";
const ESTIMATED_DURATION: &str = "2-5分钟";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareQuery {
    pub action: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub stock_code: Option<String>,
    pub compare_type: Option<String>,
    /// Comma-separated source names.
    pub data_sources: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareSummary {
    pub total_comparisons: usize,
    pub inconsistent_records: usize,
    pub consistency_rate: f64,
    pub last_update_time: Option<DateTime<Utc>>,
}

impl CompareSummary {
    fn of(rows: &[Comparison]) -> Self {
        let inconsistent = rows
            .iter()
            .filter(|c| c.status == ComparisonStatus::Inconsistent)
            .count();
        let consistency_rate = if rows.is_empty() {
            100.0
        } else {
            (rows.len() - inconsistent) as f64 / rows.len() as f64 * 100.0
        };

        Self {
            total_comparisons: rows.len(),
            inconsistent_records: inconsistent,
            consistency_rate,
            last_update_time: rows.iter().map(|c| c.compare_time).max(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareListResponse {
    pub summary: CompareSummary,
    pub data_sources: Vec<&'static str>,
    pub compare_types: Vec<&'static str>,
    pub recent_comparisons: Vec<Comparison>,
    pub total: usize,
}

pub fn filter_comparisons(rows: &[Comparison], query: &CompareQuery) -> Vec<Comparison> {
    rows.iter()
        .filter(|c| matches_tag(query.kind.as_deref(), c.compare_type.as_str()))
        .filter(|c| matches_tag(query.status.as_deref(), c.status.as_str()))
        .filter(|c| matches_stock(query.stock_code.as_deref(), &c.stock_code, &c.stock_name))
        .cloned()
        .collect()
}

/// Requested sources in order, each once, or every known source when none
/// are named.
fn requested_sources(param: Option<&str>) -> Vec<String> {
    let mut named: Vec<String> = Vec::new();
    for source in param.unwrap_or_default().split(',').map(str::trim) {
        if !source.is_empty() && !named.iter().any(|s| s == source) {
            named.push(source.to_string());
        }
    }

    if named.is_empty() {
        DATA_SOURCES.iter().map(|s| s.to_string()).collect()
    } else {
        named
    }
}

/// GET /api/compare
pub async fn get_compare(
    State(state): State<AppState>,
    FilterQuery(query): FilterQuery<CompareQuery>,
) -> Result<Response, ApiError> {
    if query.action.as_deref() == Some("detail") {
        let stock_code = query
            .stock_code
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_STOCK);
        let compare_type = match query.compare_type.as_deref() {
            None | Some("") => CompareType::Price,
            Some(label) => CompareType::parse(label).ok_or_else(|| {
                debug!(compare_type = label, "Unknown compare type");
                ApiError::InvalidAction
            })?,
        };
        let sources = requested_sources(query.data_sources.as_deref());

        let detail = state.store.with_rng(|rng| {
            detail_comparison(rng, stock_code, compare_type, sources, Utc::now())
        });
        return Ok(Json(detail).into_response());
    }

    let rows = state.store.comparisons.read();
    let recent = filter_comparisons(&rows, &query);

    Ok(Json(CompareListResponse {
        summary: CompareSummary::of(&rows),
        data_sources: DATA_SOURCES.to_vec(),
        compare_types: CompareType::ALL.iter().map(|t| t.as_str()).collect(),
        total: recent.len(),
        recent_comparisons: recent,
    })
    .into_response())
}

// ===== Actions =====

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CompareAction {
    StartCompare { data: CompareTask },
    AcceptDifference { data: DifferenceRef },
    CreateException { data: DifferenceReport },
}

/// Comparisons are addressed by numeric id or by stock code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonRef {
    Id(i64),
    Code(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareTask {
    #[serde(default)]
    pub stock_codes: Vec<String>,
    pub compare_type: Option<CompareType>,
    #[serde(default)]
    pub data_sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferenceRef {
    pub comparison_id: ComparisonRef,
    pub field: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferenceReport {
    pub comparison_id: ComparisonRef,
    pub field: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAck {
    pub task_id: i64,
    pub stock_codes: Vec<String>,
    pub compare_type: Option<CompareType>,
    pub data_sources: Vec<String>,
    pub status: &'static str,
    pub start_time: DateTime<Utc>,
    pub estimated_duration: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptAck {
    pub comparison_id: ComparisonRef,
    pub field: String,
    pub status: &'static str,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionAck {
    pub exception_id: i64,
    pub comparison_id: ComparisonRef,
    pub field: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CompareActionData {
    Task(TaskAck),
    Accepted(AcceptAck),
    Exception(ExceptionAck),
}

pub fn apply_compare_action(action: CompareAction, now: DateTime<Utc>) -> ActionResponse<CompareActionData> {
    match action {
        CompareAction::StartCompare { data } => {
            let task_id = now.timestamp_millis();
            info!(
                task_id,
                stocks = data.stock_codes.len(),
                sources = data.data_sources.len(),
                "Compare task acknowledged"
            );
            ActionResponse::ok(
                "对比任务已启动",
                CompareActionData::Task(TaskAck {
                    task_id,
                    stock_codes: data.stock_codes,
                    compare_type: data.compare_type,
                    data_sources: data.data_sources,
                    status: "running",
                    start_time: now,
                    estimated_duration: ESTIMATED_DURATION,
                }),
            )
        }
        CompareAction::AcceptDifference { data } => {
            info!(comparison = ?data.comparison_id, field = %data.field, "Difference accepted");
            ActionResponse::ok(
                "差异已标记为可接受",
                CompareActionData::Accepted(AcceptAck {
                    comparison_id: data.comparison_id,
                    field: data.field,
                    status: "accepted",
                    updated_at: now,
                }),
            )
        }
        CompareAction::CreateException { data } => {
            info!(comparison = ?data.comparison_id, field = %data.field, "Exception raised from comparison");
            ActionResponse::ok(
                "异常记录已创建",
                CompareActionData::Exception(ExceptionAck {
                    exception_id: now.timestamp_millis(),
                    comparison_id: data.comparison_id,
                    field: data.field,
                    description: data.description,
                    created_at: now,
                }),
            )
        }
    }
}

/// POST /api/compare
pub async fn post_compare_action(
    ActionBody(action): ActionBody<CompareAction>,
) -> Json<ActionResponse<CompareActionData>> {
    Json(apply_compare_action(action, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::generate_comparisons;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    fn rows() -> Vec<Comparison> {
        generate_comparisons(&mut ChaCha8Rng::seed_from_u64(5), 20, Utc::now())
    }

    #[test]
    fn test_sources_default_and_blank_entries() {
        assert_eq!(requested_sources(None).len(), 3);
        assert_eq!(requested_sources(Some("")).len(), 3);
        assert_eq!(requested_sources(Some("Wind,,Bloomberg,")), vec!["Wind", "Bloomberg"]);
        assert_eq!(
            requested_sources(Some("Bloomberg,Wind,Bloomberg, Wind")),
            vec!["Bloomberg", "Wind"]
        );
        assert_eq!(requested_sources(Some("Wind,Wind")), vec!["Wind"]);
    }

    #[test]
    fn test_summary_counts_whole_store() {
        let rows = rows();
        let summary = CompareSummary::of(&rows);
        let inconsistent = rows
            .iter()
            .filter(|c| !c.discrepancies.is_empty())
            .count();
        assert_eq!(summary.total_comparisons, 20);
        assert_eq!(summary.inconsistent_records, inconsistent);
        assert_eq!(summary.last_update_time, Some(rows[0].compare_time));

        let empty = CompareSummary::of(&[]);
        assert_eq!(empty.consistency_rate, 100.0);
        assert_eq!(empty.last_update_time, None);
    }

    #[test]
    fn test_filters() {
        let rows = rows();
        let q = CompareQuery {
            status: Some("inconsistent".to_string()),
            ..CompareQuery::default()
        };
        assert!(filter_comparisons(&rows, &q)
            .iter()
            .all(|c| c.status == ComparisonStatus::Inconsistent));

        let q = CompareQuery {
            kind: Some("all".to_string()),
            status: Some("all".to_string()),
            ..CompareQuery::default()
        };
        assert_eq!(filter_comparisons(&rows, &q).len(), rows.len());

        let q = CompareQuery {
            kind: Some("其他".to_string()),
            ..CompareQuery::default()
        };
        assert!(filter_comparisons(&rows, &q).is_empty());
    }

    #[test]
    fn test_start_compare_ack() {
        let action: CompareAction = serde_json::from_value(json!({
            "action": "startCompare",
            "data": {"stockCodes": ["000001"], "compareType": "财务数据", "dataSources": ["Wind"]}
        }))
        .unwrap();
        let now = Utc::now();
        let value = serde_json::to_value(apply_compare_action(action, now)).unwrap();
        assert_eq!(value["message"], json!("对比任务已启动"));
        assert_eq!(value["data"]["taskId"], json!(now.timestamp_millis()));
        assert_eq!(value["data"]["status"], json!("running"));
        assert_eq!(value["data"]["compareType"], json!("财务数据"));
        assert_eq!(value["data"]["estimatedDuration"], json!("2-5分钟"));
    }

    #[test]
    fn test_difference_actions_echo_reference() {
        let accept: CompareAction = serde_json::from_value(json!({
            "action": "acceptDifference",
            "data": {"comparisonId": 7, "field": "收盘价"}
        }))
        .unwrap();
        let value = serde_json::to_value(apply_compare_action(accept, Utc::now())).unwrap();
        assert_eq!(value["data"]["comparisonId"], json!(7));
        assert_eq!(value["data"]["status"], json!("accepted"));

        let report: CompareAction = serde_json::from_value(json!({
            "action": "createException",
            "data": {"comparisonId": "600519", "field": "净利润", "description": "差异过大"}
        }))
        .unwrap();
        let value = serde_json::to_value(apply_compare_action(report, Utc::now())).unwrap();
        assert_eq!(value["message"], json!("异常记录已创建"));
        assert_eq!(value["data"]["comparisonId"], json!("600519"));
        assert!(value["data"]["exceptionId"].is_i64());
    }

    #[test]
    fn test_unknown_compare_action_rejected() {
        let parsed = serde_json::from_value::<CompareAction>(json!({"action": "cancel", "data": {}}));
        assert!(parsed.is_err());
    }
}
