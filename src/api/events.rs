//! Corporate-action events and their audit timelines.
//!
//! - `GET /api/events` - filter by `type`, `status`, `stockCode`,
//!   `startDate`, `endDate`
//! - `POST /api/events` - `retry` (failed only) or `rollback` (completed only)

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ActionBody, ActionResponse, ApiError, AppState, FilterQuery, StatusAck};
use crate::filter::{matches_stock, matches_tag, TimeRange};
use crate::models::{Event, EventStatus, EventType, TimelineEntry};

const USER_ACTOR: &str = "用户";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub stock_code: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventFilters {
    pub types: Vec<&'static str>,
    pub statuses: Vec<&'static str>,
}

#[derive(Debug, Default, Serialize)]
pub struct EventSummary {
    pub total: usize,
    pub completed: usize,
    pub processing: usize,
    pub failed: usize,
    pub pending: usize,
}

impl EventSummary {
    fn of(rows: &[Event]) -> Self {
        let count = |status: EventStatus| rows.iter().filter(|e| e.status == status).count();
        Self {
            total: rows.len(),
            completed: count(EventStatus::Completed),
            processing: count(EventStatus::Processing),
            failed: count(EventStatus::Failed),
            pending: count(EventStatus::Pending),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub data: Vec<Event>,
    pub total: usize,
    pub filters: EventFilters,
    pub summary: EventSummary,
}

pub fn filter_events(rows: &[Event], query: &EventQuery) -> Vec<Event> {
    let range = TimeRange::from_params(query.start_date.as_deref(), query.end_date.as_deref());
    rows.iter()
        .filter(|e| matches_tag(query.kind.as_deref(), e.kind.as_str()))
        .filter(|e| matches_tag(query.status.as_deref(), e.status.as_str()))
        .filter(|e| matches_stock(query.stock_code.as_deref(), &e.stock_code, &e.stock_name))
        .filter(|e| range.contains(e.trigger_time))
        .cloned()
        .collect()
}

/// GET /api/events
pub async fn list_events(
    State(state): State<AppState>,
    FilterQuery(query): FilterQuery<EventQuery>,
) -> Json<EventListResponse> {
    let rows = state.store.events.read();
    let data = filter_events(&rows, &query);

    Json(EventListResponse {
        total: data.len(),
        data,
        filters: EventFilters {
            types: EventType::ALL.iter().map(|t| t.as_str()).collect(),
            statuses: EventStatus::ALL.iter().map(|s| s.as_str()).collect(),
        },
        summary: EventSummary::of(&rows),
    })
}

// ===== Actions =====

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EventAction {
    Retry { id: i64 },
    Rollback { id: i64 },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackAck {
    pub id: i64,
    pub action: &'static str,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EventActionData {
    Retry(StatusAck<EventStatus>),
    Rollback(RollbackAck),
}

fn user_entry(now: DateTime<Utc>, action: &str, details: &str, status: EventStatus) -> TimelineEntry {
    TimelineEntry {
        time: now,
        action: action.to_string(),
        details: details.to_string(),
        actor: USER_ACTOR.to_string(),
        status,
    }
}

/// Apply a lifecycle action. An unknown id or a status the action does not
/// accept leaves the event untouched and yields [`ApiError::InvalidAction`].
pub fn apply_event_action(
    rows: &mut [Event],
    action: EventAction,
    now: DateTime<Utc>,
) -> Result<ActionResponse<EventActionData>, ApiError> {
    match action {
        EventAction::Retry { id } => {
            let event = find_in_status(rows, id, EventStatus::Failed, "retry")?;
            event.status = EventStatus::Processing;
            event.timeline.push(user_entry(
                now,
                "重新处理",
                "手动触发重新处理",
                EventStatus::Processing,
            ));
            info!(id, "Event retry started");

            Ok(ActionResponse::ok(
                "事件已重新开始处理",
                EventActionData::Retry(StatusAck {
                    id,
                    status: EventStatus::Processing,
                    updated_at: now,
                }),
            ))
        }
        EventAction::Rollback { id } => {
            let event = find_in_status(rows, id, EventStatus::Completed, "rollback")?;
            event.timeline.push(user_entry(
                now,
                "数据回滚",
                "回滚数据变更",
                EventStatus::Completed,
            ));
            info!(id, "Event rollback logged");

            Ok(ActionResponse::ok(
                "数据回滚操作已完成",
                EventActionData::Rollback(RollbackAck {
                    id,
                    action: "rollback",
                    updated_at: now,
                }),
            ))
        }
    }
}

fn find_in_status<'a>(
    rows: &'a mut [Event],
    id: i64,
    required: EventStatus,
    action: &str,
) -> Result<&'a mut Event, ApiError> {
    match rows.iter_mut().find(|e| e.id == id) {
        Some(event) if event.status == required => Ok(event),
        Some(event) => {
            debug!(id, action, status = event.status.as_str(), "Event not in required status");
            Err(ApiError::InvalidAction)
        }
        None => {
            debug!(id, action, "Unknown event");
            Err(ApiError::InvalidAction)
        }
    }
}

/// POST /api/events
pub async fn post_event_action(
    State(state): State<AppState>,
    ActionBody(action): ActionBody<EventAction>,
) -> Result<Json<ActionResponse<EventActionData>>, ApiError> {
    let mut rows = state.store.events.write();
    apply_event_action(&mut rows, action, Utc::now()).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::generate_events;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rows() -> Vec<Event> {
        generate_events(&mut ChaCha8Rng::seed_from_u64(42), 24, Utc::now())
    }

    fn first_with(rows: &[Event], status: EventStatus) -> i64 {
        rows.iter().find(|e| e.status == status).map(|e| e.id).unwrap()
    }

    #[test]
    fn test_retry_failed_event() {
        let mut rows = rows();
        let id = first_with(&rows, EventStatus::Failed);
        let before = rows.iter().find(|e| e.id == id).unwrap().timeline.len();

        apply_event_action(&mut rows, EventAction::Retry { id }, Utc::now()).unwrap();

        let event = rows.iter().find(|e| e.id == id).unwrap();
        assert_eq!(event.status, EventStatus::Processing);
        assert_eq!(event.timeline.len(), before + 1);
        let last = event.timeline.last().unwrap();
        assert_eq!(last.action, "重新处理");
        assert_eq!(last.actor, USER_ACTOR);
    }

    #[test]
    fn test_retry_rejected_unless_failed() {
        let mut rows = rows();
        for status in [EventStatus::Completed, EventStatus::Processing, EventStatus::Pending] {
            let id = first_with(&rows, status);
            let snapshot = serde_json::to_value(&rows).unwrap();
            assert!(apply_event_action(&mut rows, EventAction::Retry { id }, Utc::now()).is_err());
            assert_eq!(serde_json::to_value(&rows).unwrap(), snapshot);
        }
    }

    #[test]
    fn test_rollback_appends_without_status_change() {
        let mut rows = rows();
        let before = rows[0].timeline.len();
        apply_event_action(&mut rows, EventAction::Rollback { id: 1 }, Utc::now()).unwrap();
        apply_event_action(&mut rows, EventAction::Rollback { id: 1 }, Utc::now()).unwrap();
        assert_eq!(rows[0].status, EventStatus::Completed);
        assert_eq!(rows[0].timeline.len(), before + 2);
        assert_eq!(rows[0].timeline.last().unwrap().action, "数据回滚");
    }

    #[test]
    fn test_rollback_rejected_unless_completed() {
        let mut rows = rows();
        let id = first_with(&rows, EventStatus::Failed);
        assert!(apply_event_action(&mut rows, EventAction::Rollback { id }, Utc::now()).is_err());
        assert!(apply_event_action(&mut rows, EventAction::Rollback { id: 404 }, Utc::now()).is_err());
    }

    #[test]
    fn test_filters() {
        let rows = rows();
        let by_code = EventQuery {
            stock_code: Some("000001".to_string()),
            ..EventQuery::default()
        };
        assert!(filter_events(&rows, &by_code).iter().all(|e| e.stock_code.contains("000001")));

        let future = EventQuery {
            start_date: Some("2999-01-01".to_string()),
            ..EventQuery::default()
        };
        assert!(filter_events(&rows, &future).is_empty());

        let garbage = EventQuery {
            end_date: Some("not-a-date".to_string()),
            ..EventQuery::default()
        };
        assert!(filter_events(&rows, &garbage).is_empty());
    }
}
