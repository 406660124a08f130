//! # 합의(Mutual Resolver) 쿼리 모듈
//!
//! 두 사람이 모두 제출하면 카테고리별 교집합을 계산해 `meeting_mutual`에 저장합니다.
//!
//! ## 동시성
//! 두 사람이 거의 동시에 합의를 계산하면 "읽고 → 병합하고 → 쓰는" 사이에
//! 서로의 결과를 덮어쓸 수 있습니다. 그래서 `version` 컬럼으로 낙관적 잠금을 겁니다:
//!
//! ```text
//! 1. 현재 합의와 version 읽기
//! 2. 새 교집합을 병합
//! 3. 기록 없음 → INSERT ... ON CONFLICT DO NOTHING
//!    기록 있음 → UPDATE ... WHERE version = (읽은 값)
//! 4. 영향받은 행이 0이면 누군가 먼저 썼다는 뜻 → 1번부터 다시
//! ```

use crate::db::preferences;
use crate::error::AppError;
use crate::models::{validate_party_id, CategoryFlags, MatchId, MutualAgreement};
use crate::services::negotiation;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};

/// `meeting_mutual` 테이블 한 행. 합의되지 않은 카테고리는 NULL.
#[derive(sqlx::FromRow)]
struct MutualRow {
    session_id: String,
    places: Option<Json<Vec<String>>>,
    dates: Option<Json<Vec<String>>>,
    times: Option<Json<Vec<String>>>,
    version: i64,
    computed_at: String,
}

impl From<MutualRow> for MutualAgreement {
    fn from(row: MutualRow) -> Self {
        Self {
            session_id: row.session_id,
            places: row.places.map(|list| list.0),
            dates: row.dates.map(|list| list.0),
            times: row.times.map(|list| list.0),
            version: row.version,
            computed_at: row.computed_at,
        }
    }
}

/// 세션의 합의 기록을 조회합니다. 아직 합의가 없거나 거절로 지워졌으면 None.
pub async fn get_mutual(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Option<MutualAgreement>, AppError> {
    let mut conn = pool.acquire().await?;
    fetch_mutual(&mut conn, session_id).await
}

/// `get_mutual`과 같지만 호출자의 연결(트랜잭션)에서 읽습니다.
pub async fn fetch_mutual(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Option<MutualAgreement>, AppError> {
    let row = sqlx::query_as::<_, MutualRow>(
        r#"
        SELECT session_id, places, dates, times, version, computed_at
        FROM meeting_mutual
        WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// 상대방의 제출과 내 선택의 교집합을 계산해 합의 기록에 병합합니다 (`handleMutualSelection`).
///
/// ## 동작
/// - 상대방 제출이 없으면 아무것도 하지 않고 `false`
/// - 카테고리마다 `상대방 ∩ 나`를 계산 (문자열 완전 일치)
/// - 교집합이 빈 카테고리는 쓰지 않음 → 이미 합의된 카테고리는 유지됨
/// - 하나라도 교집합이 생겼으면 `true`
///
/// ## 에러
/// - `Conflict`: `max_retries`번 재시도해도 버전 충돌이 계속된 경우
pub async fn resolve_mutual(
    pool: &SqlitePool,
    session_id: &MatchId,
    party_id: &str,
    places: &[String],
    dates: &[String],
    times: &[String],
    max_retries: u32,
) -> Result<bool, AppError> {
    validate_party_id(party_id)?;
    let mut conn = pool.acquire().await?;

    let Some(other) =
        preferences::get_counterpart_preferences(&mut conn, session_id.as_str(), party_id).await?
    else {
        tracing::debug!(
            %session_id,
            party_id,
            counterpart = ?session_id.counterpart_of(party_id),
            "no counterpart submission yet"
        );
        return Ok(false);
    };

    let resolution = negotiation::resolve(&other, places, dates, times);
    if !resolution.has_mutual() {
        tracing::debug!(%session_id, party_id, "no overlap yet");
        return Ok(false);
    }

    // 0..=max_retries: 첫 시도 + 재시도 max_retries번
    for attempt in 0..=max_retries {
        let existing = fetch_mutual(&mut conn, session_id.as_str()).await?;
        let (merged_places, merged_dates, merged_times) =
            negotiation::merge_mutual(existing.as_ref(), resolution.clone());

        let result = match &existing {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO meeting_mutual (session_id, places, dates, times)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT (session_id) DO NOTHING
                    "#,
                )
                .bind(session_id.as_str())
                .bind(merged_places.as_ref().map(Json))
                .bind(merged_dates.as_ref().map(Json))
                .bind(merged_times.as_ref().map(Json))
                .execute(&mut *conn)
                .await?
            }
            Some(current) => {
                sqlx::query(
                    r#"
                    UPDATE meeting_mutual
                    SET places = ?,
                        dates = ?,
                        times = ?,
                        version = version + 1,
                        computed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                    WHERE session_id = ? AND version = ?
                    "#,
                )
                .bind(merged_places.as_ref().map(Json))
                .bind(merged_dates.as_ref().map(Json))
                .bind(merged_times.as_ref().map(Json))
                .bind(session_id.as_str())
                .bind(current.version)
                .execute(&mut *conn)
                .await?
            }
        };

        if result.rows_affected() == 1 {
            tracing::info!(%session_id, party_id, attempt, "mutual agreement updated");
            return Ok(true);
        }
        tracing::debug!(
            %session_id,
            party_id,
            attempt,
            "mutual agreement changed underneath, retrying"
        );
    }

    tracing::warn!(
        %session_id,
        party_id,
        max_retries,
        "mutual agreement write kept conflicting"
    );
    Err(AppError::Conflict(
        "Mutual agreement was changed concurrently, try again".to_string(),
    ))
}

/// 카테고리별 확정 여부 (`checkFixedMeetDetails`).
///
/// 합의 기록이 없으면 전부 false입니다.
pub async fn check_fixed_meet_details(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<CategoryFlags, AppError> {
    let mutual = get_mutual(pool, session_id).await?;
    Ok(mutual.map(|m| m.fixed()).unwrap_or_default())
}

/// 합의 기록을 삭제합니다. 지운 행이 있으면 true.
pub async fn delete_mutual(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM meeting_mutual WHERE session_id = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{preferences::submit_preferences, test_pool};

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

    /// 다음 `skips`번의 합의 UPDATE를 건너뛰게 합니다.
    /// 다른 연결이 먼저 버전을 올려 조건부 UPDATE가 0행에 적용된 것과 같은 상황입니다.
    async fn lose_next_updates(pool: &SqlitePool, skips: i64) {
        sqlx::raw_sql(
            r#"
            CREATE TABLE mutual_write_skips (remaining INTEGER NOT NULL);
            CREATE TRIGGER skip_mutual_update BEFORE UPDATE ON meeting_mutual
            WHEN (SELECT remaining FROM mutual_write_skips) > 0
            BEGIN
                UPDATE mutual_write_skips SET remaining = remaining - 1;
                SELECT RAISE(IGNORE);
            END;
            "#,
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO mutual_write_skips (remaining) VALUES (?)")
            .bind(skips)
            .execute(pool)
            .await
            .unwrap();
    }

    /// 장소만 합의된 기록을 만든 뒤, 시간도 겹치도록 bob의 제출을 바꿉니다.
    async fn agree_on_place_then_offer_time(pool: &SqlitePool) {
        submit(pool, "bob", &["Park"], &[], &["2pm"]).await;
        let has_mutual = resolve_mutual(pool, &session(), "alice", &strings(&["Park"]), &[], &[], 3)
            .await
            .unwrap();
        assert!(has_mutual);
    }

    #[tokio::test]
    async fn no_counterpart_means_no_mutual() {
        let pool = test_pool().await;
        submit(&pool, "alice", &["Cafe"], &["2024-06-01"], &["10am"]).await;

        let own = strings(&["Cafe"]);
        let has_mutual = resolve_mutual(&pool, &session(), "alice", &own, &[], &[], 3)
            .await
            .unwrap();

        assert!(!has_mutual);
        assert!(get_mutual(&pool, session().as_str()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolves_the_documented_scenario_from_either_side() {
        for caller in ["alice", "bob"] {
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

            let own = crate::db::preferences::get_preferences(&pool, session().as_str(), caller)
                .await
                .unwrap()
                .unwrap();
            let has_mutual =
                resolve_mutual(&pool, &session(), caller, &own.places, &own.dates, &own.times, 3)
                    .await
                    .unwrap();
            assert!(has_mutual);

            let mutual = get_mutual(&pool, session().as_str()).await.unwrap().unwrap();
            assert_eq!(mutual.places, Some(strings(&["Park"])));
            assert_eq!(mutual.dates, Some(strings(&["2024-06-01"])));
            assert_eq!(mutual.times, Some(strings(&["10am"])));

            let fixed = check_fixed_meet_details(&pool, session().as_str()).await.unwrap();
            assert!(fixed.all());
        }
    }

    #[tokio::test]
    async fn later_resolution_does_not_erase_agreed_categories() {
        let pool = test_pool().await;
        submit(&pool, "alice", &["Park"], &["2024-06-01"], &[]).await;
        submit(&pool, "bob", &["Park"], &["2024-06-02"], &["2pm"]).await;

        let (park, june_first) = (strings(&["Park"]), strings(&["2024-06-01"]));
        let first = resolve_mutual(&pool, &session(), "alice", &park, &june_first, &[], 3)
            .await
            .unwrap();
        assert!(first);

        // 장소는 더 이상 겹치지 않지만 시간이 새로 겹침
        let (cafe, two_pm) = (strings(&["Cafe"]), strings(&["2pm"]));
        let second = resolve_mutual(&pool, &session(), "alice", &cafe, &[], &two_pm, 3)
            .await
            .unwrap();
        assert!(second);

        let mutual = get_mutual(&pool, session().as_str()).await.unwrap().unwrap();
        assert_eq!(mutual.places, Some(strings(&["Park"])));
        assert_eq!(mutual.dates, None);
        assert_eq!(mutual.times, Some(strings(&["2pm"])));
        assert_eq!(mutual.version, 2);
    }

    #[tokio::test]
    async fn comparison_is_case_sensitive() {
        let pool = test_pool().await;
        submit(&pool, "bob", &["park"], &[], &[]).await;

        let own = strings(&["Park"]);
        let has_mutual = resolve_mutual(&pool, &session(), "alice", &own, &[], &[], 3)
            .await
            .unwrap();
        assert!(!has_mutual);
        assert_eq!(
            check_fixed_meet_details(&pool, session().as_str()).await.unwrap(),
            CategoryFlags::default()
        );
    }

    #[tokio::test]
    async fn lost_version_race_is_retried() {
        let pool = test_pool().await;
        agree_on_place_then_offer_time(&pool).await;
        lose_next_updates(&pool, 1).await;

        let (park, two_pm) = (strings(&["Park"]), strings(&["2pm"]));
        let has_mutual = resolve_mutual(&pool, &session(), "alice", &park, &[], &two_pm, 1)
            .await
            .unwrap();
        assert!(has_mutual);

        let mutual = get_mutual(&pool, session().as_str()).await.unwrap().unwrap();
        assert_eq!(mutual.places, Some(strings(&["Park"])));
        assert_eq!(mutual.times, Some(strings(&["2pm"])));
        assert_eq!(mutual.version, 2);
    }

    #[tokio::test]
    async fn exhausted_retries_are_a_conflict() {
        let pool = test_pool().await;
        agree_on_place_then_offer_time(&pool).await;
        // 첫 시도 + 재시도 1번 = UPDATE 2번 모두 패배
        lose_next_updates(&pool, 2).await;

        let (park, two_pm) = (strings(&["Park"]), strings(&["2pm"]));
        let result = resolve_mutual(&pool, &session(), "alice", &park, &[], &two_pm, 1).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // 기록은 처음 합의 그대로
        let mutual = get_mutual(&pool, session().as_str()).await.unwrap().unwrap();
        assert_eq!(mutual.times, None);
        assert_eq!(mutual.version, 1);
    }
}
