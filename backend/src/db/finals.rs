//! # 약속 확정(Finalizer) 쿼리 모듈
//!
//! 세 카테고리가 모두 합의되면 장소/날짜/시간을 하나씩 골라 약속을 확정합니다.
//!
//! ## 선택 규칙 (`services::negotiation::pick_final`)
//! - 장소, 시간: 합의 목록에서 무작위
//! - 날짜: 합의 목록에서 가장 이른 날짜 (무작위 아님)
//!
//! 확정된 약속은 바뀌지 않습니다. 다시 호출하면 기존 약속을 그대로 돌려줍니다.

use crate::db::{mutual, rejections};
use crate::error::AppError;
use crate::models::{FinalizedMeeting, MatchId};
use crate::services::negotiation;
use sqlx::{SqliteConnection, SqlitePool};

/// 세션의 확정된 약속을 조회합니다.
pub async fn get_final(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Option<FinalizedMeeting>, AppError> {
    let mut conn = pool.acquire().await?;
    fetch_final(&mut conn, session_id).await
}

async fn fetch_final(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Option<FinalizedMeeting>, AppError> {
    let meeting = sqlx::query_as::<_, FinalizedMeeting>(
        r#"
        SELECT session_id, place, date, time, finalized_at
        FROM meeting_finals
        WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(meeting)
}

/// `finalize` 결과. `created`는 이번 호출이 약속을 새로 썼는지 여부입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalization {
    pub meeting: FinalizedMeeting,
    pub created: bool,
}

/// 약속을 확정합니다 (`createFinalMeet`).
///
/// ## 처리 흐름 (하나의 IMMEDIATE 트랜잭션)
/// 1. 이미 확정된 약속이 있으면 그대로 반환
/// 2. 합의 기록을 읽어 장소/날짜/시간을 고름
/// 3. 확정 기록 INSERT
/// 4. 거절 기록 정리 (실패해도 확정은 유지)
/// 5. 커밋
///
/// `rejections::reject`도 IMMEDIATE 트랜잭션이라 둘은 한 줄로 실행됩니다.
/// 거절이 먼저면 합의가 지워져 있어 `NoMutualData`, 확정이 먼저면
/// 거절이 방금 쓴 확정을 지웁니다. 읽은 합의와 쓰는 확정이 어긋나지 않습니다.
///
/// ## 에러
/// - `NoMutualData`: 합의 기록이 아예 없는 경우
/// - `Conflict`: 합의 기록은 있지만 세 카테고리가 다 채워지지 않은 경우
///   (호출자는 먼저 `checkFixedMeetDetails`로 확인해야 함)
pub async fn finalize(pool: &SqlitePool, session_id: &MatchId) -> Result<Finalization, AppError> {
    let mut tx = pool.begin_with(super::BEGIN_IMMEDIATE).await?;

    if let Some(existing) = fetch_final(&mut tx, session_id.as_str()).await? {
        tracing::debug!(%session_id, "meeting already finalized");
        return Ok(Finalization {
            meeting: existing,
            created: false,
        });
    }

    let agreement = mutual::fetch_mutual(&mut tx, session_id.as_str())
        .await?
        .ok_or(AppError::NoMutualData)?;

    // thread_rng()는 이 문장이 끝나면 drop되므로 .await를 넘어가지 않습니다
    let choice = negotiation::pick_final(&agreement, &mut rand::thread_rng()).ok_or_else(|| {
        AppError::Conflict("Not all categories are mutually agreed yet".to_string())
    })?;

    sqlx::query(
        r#"
        INSERT INTO meeting_finals (session_id, place, date, time)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(session_id.as_str())
    .bind(&choice.place)
    .bind(&choice.date)
    .bind(&choice.time)
    .execute(&mut *tx)
    .await?;

    let meeting = fetch_final(&mut tx, session_id.as_str())
        .await?
        .ok_or(AppError::Internal(
            "Failed to retrieve finalized meeting".to_string(),
        ))?;

    clear_rejection(&mut tx, session_id).await;
    tx.commit().await?;

    tracing::info!(
        %session_id,
        place = %meeting.place,
        date = %meeting.date,
        time = %meeting.time,
        "meeting finalized"
    );
    Ok(Finalization {
        meeting,
        created: true,
    })
}

/// 확정 후 거절 기록을 지웁니다. 이미 없거나 삭제에 실패해도 확정은 성공으로 둡니다.
async fn clear_rejection(conn: &mut SqliteConnection, session_id: &MatchId) {
    match rejections::delete_rejection(conn, session_id.as_str()).await {
        Ok(true) => tracing::debug!(%session_id, "rejection cleared after finalize"),
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(%session_id, error = %e, "could not clear rejection after finalize")
        }
    }
}

/// 확정된 약속을 삭제합니다 (거절 시 무효화용). 지운 행이 있으면 true.
pub async fn delete_final(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM meeting_finals WHERE session_id = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{preferences::submit_preferences, test_pool};
    use crate::models::Category;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn session() -> MatchId {
        MatchId::for_parties("alice", "bob").unwrap()
    }

    async fn submit(
        pool: &SqlitePool,
        party: &str,
        places: &[&str],
        dates: &[&str],
        times: &[&str],
    ) {
        let (places, dates, times) = (strings(places), strings(dates), strings(times));
        submit_preferences(pool, &session(), party, places, dates, times)
            .await
            .unwrap();
    }

    async fn resolve_as(pool: &SqlitePool, party: &str) -> bool {
        let own = crate::db::preferences::get_preferences(pool, session().as_str(), party)
            .await
            .unwrap()
            .unwrap();
        mutual::resolve_mutual(pool, &session(), party, &own.places, &own.dates, &own.times, 3)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn finalize_without_mutual_fails() {
        let pool = test_pool().await;
        let result = finalize(&pool, &session()).await;
        assert!(matches!(result, Err(AppError::NoMutualData)));
    }

    #[tokio::test]
    async fn finalize_with_partial_mutual_is_a_conflict() {
        let pool = test_pool().await;
        submit(&pool, "alice", &["Park"], &["2024-06-01"], &["10am"]).await;
        submit(&pool, "bob", &["Park"], &["2024-06-02"], &["2pm"]).await;
        assert!(resolve_as(&pool, "alice").await);

        let result = finalize(&pool, &session()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(get_final(&pool, session().as_str()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn finalizes_the_documented_scenario() {
        let pool = test_pool().await;
        submit(&pool, "alice", &["Cafe", "Park"], &["2024-06-01"], &["10am"]).await;
        submit(
            &pool,
            "bob",
            &["Park", "Mall"],
            &["2024-06-01", "2024-06-02"],
            &["10am", "2pm"],
        )
        .await;
        assert!(resolve_as(&pool, "bob").await);

        let meeting = finalize(&pool, &session()).await.unwrap().meeting;
        assert_eq!(meeting.place, "Park");
        assert_eq!(meeting.date, "2024-06-01");
        assert_eq!(meeting.time, "10am");
    }

    #[tokio::test]
    async fn picks_earliest_date_and_is_immutable_once_written() {
        let pool = test_pool().await;
        let places = ["Park", "Cafe", "Museum"];
        let dates = ["2024-06-03", "2024-06-01", "2024-06-02"];
        let times = ["10am", "2pm", "6pm"];
        submit(&pool, "alice", &places, &dates, &times).await;
        submit(&pool, "bob", &places, &dates, &times).await;
        assert!(resolve_as(&pool, "alice").await);

        let first = finalize(&pool, &session()).await.unwrap();
        assert!(first.created);
        let first = first.meeting;
        assert_eq!(first.date, "2024-06-01");
        assert!(places.contains(&first.place.as_str()));
        assert!(times.contains(&first.time.as_str()));

        let second = finalize(&pool, &session()).await.unwrap();
        assert!(!second.created);
        assert_eq!(first, second.meeting);
    }

    #[tokio::test]
    async fn finalize_clears_a_previous_rejection() {
        let pool = test_pool().await;
        submit(&pool, "alice", &["Park"], &["2024-06-01"], &["10am"]).await;
        submit(&pool, "bob", &["Park"], &["2024-06-01"], &["10am"]).await;
        rejections::reject(&pool, &session(), "bob", &[Category::Times], "late")
            .await
            .unwrap();
        assert!(resolve_as(&pool, "bob").await);

        finalize(&pool, &session()).await.unwrap();

        assert!(rejections::get_rejection(&pool, session().as_str())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reject_never_leaves_a_stale_final() {
        let (pool, path) = crate::db::file_pool("finalize-vs-reject", 4).await;

        for round in 0..40 {
            let session =
                MatchId::for_parties(&format!("a{round}"), &format!("b{round}")).unwrap();
            let (party_a, party_b) = session.parties();
            for party in [party_a, party_b] {
                submit_preferences(
                    &pool,
                    &session,
                    party,
                    strings(&["Park"]),
                    strings(&["2024-06-01"]),
                    strings(&["10am"]),
                )
                .await
                .unwrap();
            }
            let own = strings(&["Park", "2024-06-01", "10am"]);
            let party_b = party_b.to_string();
            assert!(
                mutual::resolve_mutual(&pool, &session, party_a, &own, &own, &own, 3)
                    .await
                    .unwrap()
            );

            let finalizer = {
                let (pool, session) = (pool.clone(), session.clone());
                tokio::spawn(async move { finalize(&pool, &session).await })
            };
            let rejecter = {
                let (pool, session) = (pool.clone(), session.clone());
                tokio::spawn(async move {
                    rejections::reject(&pool, &session, &party_b, &[Category::Dates], "busy")
                        .await
                })
            };

            // 거절이 먼저면 합의가 없고, 확정이 먼저면 거절이 확정을 지움
            match finalizer.await.unwrap() {
                Ok(finalization) => assert!(finalization.created),
                Err(AppError::NoMutualData) => {}
                Err(e) => panic!("round {round}: unexpected finalize error: {e}"),
            }
            rejecter.await.unwrap().unwrap();

            let id = session.as_str();
            assert!(get_final(&pool, id).await.unwrap().is_none(), "round {round}");
            assert!(mutual::get_mutual(&pool, id).await.unwrap().is_none(), "round {round}");
            let rejection = rejections::get_rejection(&pool, id).await.unwrap();
            assert!(
                rejection.is_some_and(|r| r.rejected.contains(&Category::Dates)),
                "round {round}: rejection lost"
            );
        }

        crate::db::remove_file_pool(pool, path).await;
    }
}
