//! Dashboard overview with the newest exceptions.

use axum::extract::State;
use axum::response::Json;
use chrono::Utc;
use serde::Serialize;

use super::AppState;
use crate::filter::sort_newest_first;
use crate::mock::generate_dashboard;
use crate::models::{DashboardData, Exception};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub overview: DashboardData,
    pub recent_exceptions: Vec<Exception>,
}

/// Newest `limit` exceptions, reflecting any status changes made so far.
pub fn recent_exceptions(rows: &[Exception], limit: usize) -> Vec<Exception> {
    let mut recent = rows.to_vec();
    sort_newest_first(&mut recent, |e| e.time);
    recent.truncate(limit);
    recent
}

/// GET /api/dashboard
///
/// Headline numbers and the trend are regenerated on every call.
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardResponse> {
    let overview = state.store.with_rng(|rng| generate_dashboard(rng, Utc::now()));
    let recent = recent_exceptions(&state.store.exceptions.read(), state.config.recent_exception_limit);

    Json(DashboardResponse {
        overview,
        recent_exceptions: recent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::generate_exceptions;
    use crate::models::ExceptionStatus;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_recent_exceptions_newest_first() {
        let mut rows = generate_exceptions(&mut ChaCha8Rng::seed_from_u64(3), 30, Utc::now());
        rows.reverse();
        let recent = recent_exceptions(&rows, 10);
        assert_eq!(recent.len(), 10);
        assert!(recent.windows(2).all(|w| w[0].time >= w[1].time));
        let newest = rows.iter().map(|e| e.time).max().unwrap();
        assert_eq!(recent[0].time, newest);
    }

    #[test]
    fn test_recent_exceptions_see_live_status() {
        let mut rows = generate_exceptions(&mut ChaCha8Rng::seed_from_u64(3), 5, Utc::now());
        for e in rows.iter_mut() {
            e.status = ExceptionStatus::Resolved;
        }
        let recent = recent_exceptions(&rows, 10);
        assert_eq!(recent.len(), 5);
        assert!(recent.iter().all(|e| e.status == ExceptionStatus::Resolved));
    }

    #[test]
    fn test_response_is_flat() {
        let overview = generate_dashboard(&mut ChaCha8Rng::seed_from_u64(1), Utc::now());
        let value = serde_json::to_value(DashboardResponse {
            overview,
            recent_exceptions: Vec::new(),
        })
        .unwrap();
        assert_eq!(value["summary"]["totalStocks"], serde_json::json!(1000));
        assert_eq!(value["exceptionTrend"].as_array().unwrap().len(), 7);
        assert_eq!(value["dataSourceStatus"].as_array().unwrap().len(), 3);
        assert!(value["recentExceptions"].is_array());
    }
}
