//! # 약속 협상 라우트 핸들러
//!
//! 모바일 앱의 약속 잡기 화면이 호출하는 HTTP 핸들러들입니다.
//! 모든 엔드포인트는 Bearer 토큰이 필요하고(`AuthParty`),
//! 호출한 사람이 경로의 매치 ID에 포함된 당사자여야 합니다.
//!
//! ## 엔드포인트
//! | 메서드 | 경로 | 핸들러 |
//! |--------|------|--------|
//! | GET  | /api/v1/meetings/{match_id} | `get_session` |
//! | PUT  | /api/v1/meetings/{match_id}/preferences | `submit_preferences` |
//! | GET  | /api/v1/meetings/{match_id}/preferences/me | `get_my_preferences` |
//! | GET  | /api/v1/meetings/{match_id}/first-entry | `check_first_entry` |
//! | POST | /api/v1/meetings/{match_id}/mutual | `resolve_mutual` |
//! | GET  | /api/v1/meetings/{match_id}/fixed | `check_fixed_details` |
//! | POST | /api/v1/meetings/{match_id}/final | `finalize_meeting` |
//! | GET  | /api/v1/meetings/{match_id}/final | `get_final_meeting` |
//! | POST | /api/v1/meetings/{match_id}/rejections | `reject_categories` |
//! | GET  | /api/v1/meetings/{match_id}/rejections/me | `check_rejection_status` |
//! | GET  | /api/v1/meetings/{match_id}/events | `poll_events` |
//!
//! ## 화면에서의 사용 흐름
//! ```text
//! 1. 후보 선택 → PUT preferences
//! 2. GET first-entry가 false면 → POST mutual
//! 3. GET fixed가 모두 true면 → POST final
//! 4. 마음에 안 드는 카테고리 → POST rejections
//! 5. 상대방 행동 대기 → GET events (롱폴링)
//! ```

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthParty,
    models::*,
    services::events::{EventHub, MeetingEvent},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::time::Duration;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 필드들은 모두 clone이 싼 타입입니다 (풀과 이벤트 허브는 내부적으로 Arc 공유).
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀
    pub pool: SqlitePool,
    /// JWT 토큰 검증용 비밀키
    pub jwt_secret: String,
    /// 세션 이벤트 발행/구독
    pub events: EventHub,
    /// 합의 기록 쓰기 충돌 시 재시도 횟수
    pub mutual_write_retries: u32,
    /// 이벤트 롱폴링 최대 대기 시간
    pub event_poll_timeout: Duration,
}

/// 경로의 매치 ID를 해석하고, 호출자가 그 매치의 당사자인지 확인합니다.
fn authorize(match_id: &str, party: &AuthParty) -> Result<MatchId, AppError> {
    let session = MatchId::parse(match_id)?;
    if !session.contains(&party.party_id) {
        return Err(AppError::Forbidden(
            "Not a party to this match".to_string(),
        ));
    }
    Ok(session)
}

/// `GET /meetings/{match_id}` — 세션의 모든 기록과 현재 상태
pub async fn get_session(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = authorize(&match_id, &party)?;
    let snapshot = db::sessions::get_session(&state.pool, &session).await?;
    Ok(Json(snapshot))
}

/// `PUT /meetings/{match_id}/preferences` — 내 후보 목록 제출 (이전 제출 덮어쓰기)
///
/// `{ "places": ["Cafe"], "dates": ["2024-06-01"], "times": ["10am"] }`
pub async fn submit_preferences(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
    Json(req): Json<SubmitPreferencesRequest>,
) -> Result<Json<PreferenceSubmission>, AppError> {
    let session = authorize(&match_id, &party)?;
    let submission = db::preferences::submit_preferences(
        &state.pool,
        &session,
        &party.party_id,
        req.places,
        req.dates,
        req.times,
    )
    .await?;
    Ok(Json(submission))
}

/// `GET /meetings/{match_id}/preferences/me` — 내 제출 조회 (없으면 404)
pub async fn get_my_preferences(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
) -> Result<Json<PreferenceSubmission>, AppError> {
    let session = authorize(&match_id, &party)?;
    let submission =
        db::preferences::get_preferences(&state.pool, session.as_str(), &party.party_id)
            .await?
            .ok_or(AppError::NotFound)?;
    Ok(Json(submission))
}

/// `GET /meetings/{match_id}/first-entry` → `{ "is_first_entry": true }`
///
/// 두 사람 중 한 명이라도 아직 제출하지 않았으면 true.
pub async fn check_first_entry(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session = authorize(&match_id, &party)?;
    let (party_a, party_b) = session.parties();
    let first =
        db::preferences::is_first_entry(&state.pool, session.as_str(), party_a, party_b).await?;
    Ok(Json(json!({ "is_first_entry": first })))
}

/// `POST /meetings/{match_id}/mutual` — 교집합 계산 (`handleMutualSelection`)
///
/// 본문에 목록을 보내면 그 목록을, 생략한 카테고리는 저장된 내 제출을 사용합니다.
/// 합의가 새로 생기면 `MutualFound` 이벤트를 발행합니다.
pub async fn resolve_mutual(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
    body: Option<Json<ResolveMutualRequest>>,
) -> Result<Json<ResolveMutualResponse>, AppError> {
    let session = authorize(&match_id, &party)?;
    // 본문이 없으면 기본값(모두 None)
    let Json(req) = body.unwrap_or_default();

    let stored = if req.places.is_none() || req.dates.is_none() || req.times.is_none() {
        db::preferences::get_preferences(&state.pool, session.as_str(), &party.party_id).await?
    } else {
        None
    };
    // 요청 값 → 저장된 제출 → 빈 목록 순으로 사용
    let pick = |requested: Option<Vec<String>>, stored: Option<&Vec<String>>| {
        requested.or_else(|| stored.cloned()).unwrap_or_default()
    };
    let places = pick(req.places, stored.as_ref().map(|s| &s.places));
    let dates = pick(req.dates, stored.as_ref().map(|s| &s.dates));
    let times = pick(req.times, stored.as_ref().map(|s| &s.times));

    let has_mutual = db::mutual::resolve_mutual(
        &state.pool,
        &session,
        &party.party_id,
        &places,
        &dates,
        &times,
        state.mutual_write_retries,
    )
    .await?;

    if has_mutual {
        state.events.publish(MeetingEvent::MutualFound {
            session_id: session.to_string(),
            party_id: party.party_id.clone(),
        });
    }
    Ok(Json(ResolveMutualResponse { has_mutual }))
}

/// `GET /meetings/{match_id}/fixed` → `{ "place": true, "date": true, "time": false }`
pub async fn check_fixed_details(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
) -> Result<Json<CategoryFlags>, AppError> {
    let session = authorize(&match_id, &party)?;
    let fixed = db::mutual::check_fixed_meet_details(&state.pool, session.as_str()).await?;
    Ok(Json(fixed))
}

/// `POST /meetings/{match_id}/final` — 약속 확정 (`createFinalMeet`)
///
/// 새로 확정된 경우에만 `Finalized` 이벤트를 발행합니다.
pub async fn finalize_meeting(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
) -> Result<Json<FinalizedMeeting>, AppError> {
    let session = authorize(&match_id, &party)?;
    let finalization = db::finals::finalize(&state.pool, &session).await?;

    if finalization.created {
        state.events.publish(MeetingEvent::Finalized {
            session_id: session.to_string(),
            meeting: finalization.meeting.clone(),
        });
    }
    Ok(Json(finalization.meeting))
}

/// `GET /meetings/{match_id}/final` — 확정된 약속 조회 (없으면 404)
pub async fn get_final_meeting(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
) -> Result<Json<FinalizedMeeting>, AppError> {
    let session = authorize(&match_id, &party)?;
    let meeting = db::finals::get_final(&state.pool, session.as_str())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(meeting))
}

/// `POST /meetings/{match_id}/rejections` — 카테고리 거절 (`handleReject`)
///
/// `{ "categories": ["dates"], "reason": "too busy" }`
///
/// 세션의 합의와 확정이 초기화되고, 상대방에게 `Rejected` 이벤트가 갑니다.
pub async fn reject_categories(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<RejectionRecord>, AppError> {
    let session = authorize(&match_id, &party)?;

    // 문자열 → Category 변환. 하나라도 모르는 이름이면 400.
    // collect::<Result<Vec<_>, _>>(): 첫 번째 Err에서 멈추고 그 에러를 반환합니다.
    let mut categories = req
        .categories
        .iter()
        .map(|name| name.parse::<Category>())
        .collect::<Result<Vec<_>, _>>()?;
    categories.sort();
    categories.dedup();

    let record = db::rejections::reject(
        &state.pool,
        &session,
        &party.party_id,
        &categories,
        &req.reason,
    )
    .await?;

    state.events.publish(MeetingEvent::Rejected {
        session_id: session.to_string(),
        party_id: party.party_id.clone(),
        categories,
        reason: req.reason,
    });
    Ok(Json(record))
}

/// `GET /meetings/{match_id}/rejections/me` → 내가 거절한 카테고리
pub async fn check_rejection_status(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
) -> Result<Json<CategoryFlags>, AppError> {
    let session = authorize(&match_id, &party)?;
    let status =
        db::rejections::check_rejection_status(&state.pool, session.as_str(), &party.party_id)
            .await?;
    Ok(Json(status))
}

/// `GET /meetings/{match_id}/events` — 다음 세션 이벤트를 기다립니다 (롱폴링).
///
/// - 이벤트가 오면 200 + 이벤트 JSON
/// - 제한 시간 안에 아무 일도 없으면 204 No Content
///
/// 요청이 끝나면 구독을 해제합니다.
///
/// 구독은 요청마다 새로 시작하므로 두 폴링 사이에 발행된 이벤트는 전달되지 않습니다.
/// 이벤트는 "다시 조회하라"는 신호일 뿐이고, 놓친 거절/확정은
/// `GET /meetings/{match_id}` 스냅샷의 `rejected`, `rejection`, `finalized`로 확인합니다.
/// 클라이언트는 폴링을 다시 시작할 때마다 스냅샷을 먼저 읽어야 합니다.
pub async fn poll_events(
    State(state): State<AppState>,
    party: AuthParty,
    Path(match_id): Path<String>,
) -> Result<Response, AppError> {
    let session = authorize(&match_id, &party)?;
    let mut subscription = state.events.subscribe(&session);

    let next = tokio::time::timeout(state.event_poll_timeout, subscription.next()).await;
    subscription.close();

    match next {
        Ok(Some(event)) => Ok(Json(event).into_response()),
        Ok(None) => Err(AppError::Internal("Event hub closed".to_string())),
        Err(_) => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}
