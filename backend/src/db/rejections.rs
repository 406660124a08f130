//! # 거절(Rejection Tracker) 쿼리 모듈
//!
//! 한 사람이 카테고리(장소/날짜/시간)를 "이건 안 된다"고 거절한 기록을 관리합니다.
//!
//! ## 거절 흐름
//! ```text
//! reject() ─┬─ 기존 거절 기록과 병합 (사유는 최신 값, 카테고리는 합집합)
//!           └─ invalidate_after_rejection(): 세션의 합의/확정 기록 삭제
//!              (둘 다 하나의 트랜잭션 안에서 실행)
//! ```
//!
//! 거절 기록은 약속이 확정될 때 `db::finals`가 지웁니다.
//! 다시 제출하는 것만으로는 지워지지 않습니다.

use crate::db::{finals, mutual};
use crate::error::AppError;
use crate::models::{validate_party_id, Category, CategoryFlags, MatchId, RejectionRecord};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, BTreeSet};

/// `meeting_rejections` 테이블 한 행
#[derive(sqlx::FromRow)]
struct RejectionRow {
    session_id: String,
    party_id: String,
    reasons: Json<BTreeMap<Category, String>>,
    rejected: Json<BTreeSet<Category>>,
    updated_at: String,
}

impl From<RejectionRow> for RejectionRecord {
    fn from(row: RejectionRow) -> Self {
        Self {
            session_id: row.session_id,
            party_id: row.party_id,
            reasons: row.reasons.0,
            rejected: row.rejected.0,
            updated_at: row.updated_at,
        }
    }
}

/// 세션의 거절 기록을 조회합니다.
pub async fn get_rejection(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Option<RejectionRecord>, AppError> {
    let mut conn = pool.acquire().await?;
    fetch_rejection(&mut conn, session_id).await
}

async fn fetch_rejection(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Option<RejectionRecord>, AppError> {
    let row = sqlx::query_as::<_, RejectionRow>(
        r#"
        SELECT session_id, party_id, reasons, rejected, updated_at
        FROM meeting_rejections
        WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// 카테고리를 거절합니다 (`handleReject`).
///
/// - 같은 카테고리를 다시 거절하면 사유만 최신 값으로 바뀝니다 (멱등).
/// - 거절된 카테고리 목록은 기존 목록과의 합집합입니다.
/// - 기록의 `party_id`는 이번에 거절한 사람으로 바뀝니다.
/// - 부수 효과로 세션의 합의/확정 기록이 지워집니다.
///
/// ## 에러
/// - `BadRequest`: 카테고리 목록이 비어 있는 경우
pub async fn reject(
    pool: &SqlitePool,
    session_id: &MatchId,
    party_id: &str,
    categories: &[Category],
    reason: &str,
) -> Result<RejectionRecord, AppError> {
    validate_party_id(party_id)?;
    if categories.is_empty() {
        return Err(AppError::BadRequest(
            "At least one category must be rejected".to_string(),
        ));
    }

    // 트랜잭션: 병합 쓰기와 합의/확정 삭제가 함께 반영되거나 함께 취소됩니다.
    // IMMEDIATE로 시작해 `finals::finalize`와 쓰기 순서가 직렬화됩니다.
    // tx가 commit 없이 drop되면 자동으로 롤백됩니다.
    let mut tx = pool.begin_with(super::BEGIN_IMMEDIATE).await?;

    let (mut reasons, mut rejected) = match fetch_rejection(&mut tx, session_id.as_str()).await? {
        Some(existing) => (existing.reasons, existing.rejected),
        None => (BTreeMap::new(), BTreeSet::new()),
    };
    for category in categories {
        reasons.insert(*category, reason.to_string());
        rejected.insert(*category);
    }

    sqlx::query(
        r#"
        INSERT INTO meeting_rejections (session_id, party_id, reasons, rejected)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (session_id) DO UPDATE
        SET party_id = excluded.party_id,
            reasons = excluded.reasons,
            rejected = excluded.rejected,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        "#,
    )
    .bind(session_id.as_str())
    .bind(party_id)
    .bind(Json(&reasons))
    .bind(Json(&rejected))
    .execute(&mut *tx)
    .await?;

    invalidate_after_rejection(&mut tx, session_id.as_str(), categories).await?;

    let record = fetch_rejection(&mut tx, session_id.as_str())
        .await?
        .ok_or(AppError::Internal(
            "Failed to retrieve rejection record".to_string(),
        ))?;
    tx.commit().await?;

    tracing::info!(
        %session_id,
        party_id,
        categories = ?categories,
        "categories rejected"
    );
    Ok(record)
}

/// 거절 후 무효화해야 할 기록을 지웁니다.
///
/// 지금은 어떤 카테고리가 거절되든 세션의 합의와 확정 전체를 지웁니다.
/// 거절된 카테고리만 지우도록 좁히려면 이 함수만 바꾸면 됩니다.
async fn invalidate_after_rejection(
    conn: &mut SqliteConnection,
    session_id: &str,
    categories: &[Category],
) -> Result<(), AppError> {
    let cleared_mutual = mutual::delete_mutual(conn, session_id).await?;
    let cleared_final = finals::delete_final(conn, session_id).await?;
    tracing::debug!(
        session_id,
        categories = ?categories,
        cleared_mutual,
        cleared_final,
        "session invalidated after rejection"
    );
    Ok(())
}

/// 조회한 사람 본인이 거절한 카테고리 (`checkRejectionStatus`).
///
/// 상대방이 거절한 경우는 여기서 보이지 않고 이벤트(`Rejected`)로 전달됩니다.
pub async fn check_rejection_status(
    pool: &SqlitePool,
    session_id: &str,
    party_id: &str,
) -> Result<CategoryFlags, AppError> {
    let record = get_rejection(pool, session_id).await?;
    Ok(record
        .map(|record| record.status_for(party_id))
        .unwrap_or_default())
}

/// 거절 기록을 삭제합니다 (확정 트랜잭션 안에서 호출). 지운 행이 있으면 true.
pub async fn delete_rejection(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM meeting_rejections WHERE session_id = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
