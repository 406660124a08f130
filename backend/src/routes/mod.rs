//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들과 API 라우터를 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `meetings`: 약속 협상 세션 핸들러 (제출, 합의, 거절, 확정, 이벤트)

pub mod health;
pub mod meetings;

use axum::{
    routing::{get, post, put},
    Router,
};
use meetings::AppState;

/// `/api/v1` 아래에 중첩될 라우터를 만듭니다.
///
/// main.rs와 라우트 테스트가 같은 라우터를 사용합니다.
/// 경로 파라미터는 axum 0.8 문법(`{match_id}`)을 따릅니다.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/meetings/{match_id}", get(meetings::get_session))
        .route(
            "/meetings/{match_id}/preferences",
            put(meetings::submit_preferences),
        )
        .route(
            "/meetings/{match_id}/preferences/me",
            get(meetings::get_my_preferences),
        )
        .route(
            "/meetings/{match_id}/first-entry",
            get(meetings::check_first_entry),
        )
        .route("/meetings/{match_id}/mutual", post(meetings::resolve_mutual))
        .route(
            "/meetings/{match_id}/fixed",
            get(meetings::check_fixed_details),
        )
        // 같은 경로에 GET(조회)과 POST(확정)를 함께 매핑
        .route(
            "/meetings/{match_id}/final",
            get(meetings::get_final_meeting).post(meetings::finalize_meeting),
        )
        .route(
            "/meetings/{match_id}/rejections",
            post(meetings::reject_categories),
        )
        .route(
            "/meetings/{match_id}/rejections/me",
            get(meetings::check_rejection_status),
        )
        .route("/meetings/{match_id}/events", get(meetings::poll_events))
        .route("/health", get(health::health_check))
        .with_state(state)
}
