//! # 헬스체크(Health Check) 핸들러
//!
//! - `GET /api/v1/health` → `{ "status": "ok", "database": "ok" }`
//!
//! 데이터베이스에 `SELECT 1`을 보내 연결 풀이 살아있는지도 함께 확인합니다.
//! DB가 응답하지 않으면 503과 `"database": "unavailable"`을 반환합니다.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::meetings::AppState;

/// `GET /health` — 서버와 데이터베이스 상태를 확인합니다.
///
/// 인증이 필요 없는 유일한 엔드포인트입니다.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "ok" })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, services::events::EventHub};
    use std::time::Duration;

    #[tokio::test]
    async fn reports_ok_with_a_live_pool() {
        let state = AppState {
            pool: test_pool().await,
            jwt_secret: "test-secret".to_string(),
            events: EventHub::default(),
            mutual_write_retries: 3,
            event_poll_timeout: Duration::from_millis(10),
        };
        let (status, Json(body)) = health_check(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "ok");

        state.pool.close().await;
        let (status, Json(body)) = health_check(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
    }
}
