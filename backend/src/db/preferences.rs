//! # 후보 제출(Preference Store) 쿼리 모듈
//!
//! 한 사람이 한 세션에 제출한 장소/날짜/시간 후보를 저장하고 조회합니다.
//! `(session_id, party_id)`가 기본키이므로 한 사람당 제출은 하나뿐이고,
//! 다시 제출하면 `ON CONFLICT ... DO UPDATE`로 통째로 덮어씁니다.
//!
//! 목록 컬럼은 JSON 배열 문자열입니다. `sqlx::types::Json<T>`가
//! `Vec<String>` ↔ `'["Cafe","Park"]'` 변환을 처리합니다.

use crate::error::AppError;
use crate::models::{validate_party_id, MatchId, PreferenceSubmission, RESERVED_KEYS};
use crate::services::negotiation;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};

/// `meeting_preferences` 테이블 한 행 (JSON 컬럼을 그대로 받는 중간 구조체)
#[derive(sqlx::FromRow)]
struct PreferenceRow {
    session_id: String,
    party_id: String,
    places: Json<Vec<String>>,
    dates: Json<Vec<String>>,
    times: Json<Vec<String>>,
    submitted_at: String,
}

impl From<PreferenceRow> for PreferenceSubmission {
    fn from(row: PreferenceRow) -> Self {
        Self {
            session_id: row.session_id,
            party_id: row.party_id,
            // Json(T)는 튜플 구조체이므로 .0으로 내부 값을 꺼냅니다
            places: row.places.0,
            dates: row.dates.0,
            times: row.times.0,
            submitted_at: row.submitted_at,
        }
    }
}

/// 후보 목록을 제출합니다. 같은 사람의 이전 제출은 통째로 덮어씁니다.
///
/// 각 목록은 비어 있어도 되고, 중복 값은 제거한 뒤 저장합니다.
///
/// ## 에러
/// - `BadRequest`: party ID가 비었거나 예약 키인 경우
/// - `Internal("Could not save preferences")`: 저장소 쓰기 실패
pub async fn submit_preferences(
    pool: &SqlitePool,
    session_id: &MatchId,
    party_id: &str,
    places: Vec<String>,
    dates: Vec<String>,
    times: Vec<String>,
) -> Result<PreferenceSubmission, AppError> {
    validate_party_id(party_id)?;

    let places = negotiation::dedupe(places);
    let dates = negotiation::dedupe(dates);
    let times = negotiation::dedupe(times);

    // excluded.컬럼: 충돌로 INSERT되지 못한 "새 값"을 가리키는 SQLite 문법
    sqlx::query(
        r#"
        INSERT INTO meeting_preferences (session_id, party_id, places, dates, times)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (session_id, party_id) DO UPDATE
        SET places = excluded.places,
            dates = excluded.dates,
            times = excluded.times,
            submitted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        "#,
    )
    .bind(session_id.as_str())
    .bind(party_id)
    .bind(Json(&places))
    .bind(Json(&dates))
    .bind(Json(&times))
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Could not save preferences: {}", e)))?;

    tracing::info!(
        %session_id,
        party_id,
        places = places.len(),
        dates = dates.len(),
        times = times.len(),
        "preferences submitted"
    );

    get_preferences(pool, session_id.as_str(), party_id)
        .await?
        .ok_or(AppError::Internal(
            "Failed to retrieve submitted preferences".to_string(),
        ))
}

/// 한 사람의 제출을 조회합니다. 아직 제출하지 않았으면 None.
pub async fn get_preferences(
    pool: &SqlitePool,
    session_id: &str,
    party_id: &str,
) -> Result<Option<PreferenceSubmission>, AppError> {
    let row = sqlx::query_as::<_, PreferenceRow>(
        r#"
        SELECT session_id, party_id, places, dates, times, submitted_at
        FROM meeting_preferences
        WHERE session_id = ? AND party_id = ?
        "#,
    )
    .bind(session_id)
    .bind(party_id)
    .fetch_optional(pool)
    .await?;

    // Option<PreferenceRow> → Option<PreferenceSubmission>
    Ok(row.map(Into::into))
}

/// 세션의 모든 제출을 제출 시각순으로 조회합니다 (세션 스냅샷용).
pub async fn list_preferences(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<PreferenceSubmission>, AppError> {
    let rows = sqlx::query_as::<_, PreferenceRow>(
        r#"
        SELECT session_id, party_id, places, dates, times, submitted_at
        FROM meeting_preferences
        WHERE session_id = ?
        ORDER BY submitted_at, party_id
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// 상대방의 제출을 조회합니다.
///
/// 세션에서 party ID가 호출자도 아니고 예약 키도 아닌 제출이 상대방입니다.
pub async fn get_counterpart_preferences(
    conn: &mut SqliteConnection,
    session_id: &str,
    party_id: &str,
) -> Result<Option<PreferenceSubmission>, AppError> {
    let row = sqlx::query_as::<_, PreferenceRow>(
        r#"
        SELECT session_id, party_id, places, dates, times, submitted_at
        FROM meeting_preferences
        WHERE session_id = ? AND party_id != ? AND party_id NOT IN (?, ?, ?)
        ORDER BY submitted_at DESC
        LIMIT 1
        "#,
    )
    .bind(session_id)
    .bind(party_id)
    .bind(RESERVED_KEYS[0])
    .bind(RESERVED_KEYS[1])
    .bind(RESERVED_KEYS[2])
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// 두 사람 중 한 명이라도 아직 제출하지 않았으면 true (`checkIsFirstEntry`).
///
/// 상대방 제출이 없으면 교집합을 계산할 의미가 없으므로,
/// 호출자는 이 값이 false일 때만 합의 계산을 시도합니다.
pub async fn is_first_entry(
    pool: &SqlitePool,
    session_id: &str,
    party_a: &str,
    party_b: &str,
) -> Result<bool, AppError> {
    // (i64,): 컬럼 하나짜리 행을 튜플로 받습니다
    let (submitted,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(DISTINCT party_id)
        FROM meeting_preferences
        WHERE session_id = ? AND party_id IN (?, ?)
        "#,
    )
    .bind(session_id)
    .bind(party_a)
    .bind(party_b)
    .fetch_one(pool)
    .await?;

    let expected = if party_a == party_b { 1 } else { 2 };
    Ok(submitted < expected)
}
