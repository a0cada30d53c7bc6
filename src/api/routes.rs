use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::health::{HealthSnapshot, HealthState};
use crate::config::RECENT_PICKS_LIMIT;
use crate::db::models::PickLogRecord;
use crate::db::SqlitePickLog;
use crate::error::AppError;

#[derive(Clone)]
pub struct ApiState {
    pub log: Arc<SqlitePickLog>,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/picks", get(get_picks))
        .with_state(state)
}

#[derive(Deserialize)]
pub struct PicksQuery {
    pub limit: Option<i64>,
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthSnapshot> {
    Json(state.health.snapshot())
}

async fn get_picks(
    State(state): State<ApiState>,
    Query(params): Query<PicksQuery>,
) -> Result<Json<Vec<PickLogRecord>>, AppError> {
    let limit = params.limit.unwrap_or(RECENT_PICKS_LIMIT).clamp(1, 500);
    let rows = state.log.recent(limit).await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use serde_json::Value;
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::db::pick_log::DurableLog;
    use crate::types::LogRow;

    async fn memory_pool() -> sqlx::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn seeded_router(pool: sqlx::SqlitePool, rows: usize) -> Router {
        let log = Arc::new(SqlitePickLog::new(pool));
        for i in 0..rows {
            log.append(&LogRow {
                date: "20-Oct-2026".to_string(),
                match_label: format!("Home {i} vs Away {i}"),
                prediction: "Home win".to_string(),
                confidence: 55,
                result: LogRow::PENDING.to_string(),
                fixture_id: Some(i.to_string()),
            })
            .await
            .unwrap();
        }
        router(ApiState { log, health: Arc::new(HealthState::new()) })
    }

    async fn request(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_reports_counters() {
        let app = seeded_router(memory_pool().await, 0).await;
        let (status, body) = request(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cycle_running"], false);
        assert_eq!(body["cycles_completed"], 0);
        assert_eq!(body["log_backfill_pending"], 0);
    }

    #[tokio::test]
    async fn picks_default_to_recent_limit_newest_first() {
        let app = seeded_router(memory_pool().await, 60).await;
        let (status, body) = request(&app, "/picks").await;
        assert_eq!(status, StatusCode::OK);
        let picks = body.as_array().unwrap();
        assert_eq!(picks.len(), RECENT_PICKS_LIMIT as usize);
        assert_eq!(picks[0]["match_label"], "Home 59 vs Away 59");
        assert_eq!(picks[0]["fixture_id"], "59");
        assert_eq!(picks[0]["result"], "Pending");
        assert_eq!(picks[0]["confidence"], 55);
        assert!(picks[0]["logged_at"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn picks_limit_is_clamped() {
        let app = seeded_router(memory_pool().await, 3).await;

        let (_, body) = request(&app, "/picks?limit=2").await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = request(&app, "/picks?limit=0").await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = request(&app, "/picks?limit=-5").await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = request(&app, "/picks?limit=100000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unreadable_log_is_a_server_error() {
        let pool = memory_pool().await;
        let app = seeded_router(pool.clone(), 1).await;
        pool.close().await;

        let (status, _) = request(&app, "/picks").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_errors_map_to_bad_gateway() {
        let status = AppError::Upstream("quota".to_string()).into_response().status();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let status = AppError::Config("x".to_string()).into_response().status();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
