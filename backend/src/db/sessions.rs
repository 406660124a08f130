//! # 약속 세션 조회 모듈
//!
//! 세션은 별도 테이블이 없습니다. 네 테이블의 기록을 모아
//! `SessionSnapshot`으로 만들고 현재 상태를 계산합니다.
//!
//! ## 세션 라이프사이클
//! ```text
//! [없음] 첫 제출 → 제출 2개 → 합의 계산 → 확정
//!                     ↑           │
//!                     └── 거절 ───┘  (합의/확정만 초기화, 제출은 유지)
//! ```

use crate::db::{finals, mutual, preferences, rejections};
use crate::error::AppError;
use crate::models::{MatchId, SessionSnapshot, SessionState};
use sqlx::SqlitePool;

/// 세션의 모든 기록과 파생 상태를 조회합니다.
///
/// 세션이 한 번도 쓰이지 않았어도 에러가 아니라 `Empty` 상태를 반환합니다.
pub async fn get_session(
    pool: &SqlitePool,
    session_id: &MatchId,
) -> Result<SessionSnapshot, AppError> {
    let id = session_id.as_str();
    let submissions = preferences::list_preferences(pool, id).await?;
    let mutual = mutual::get_mutual(pool, id).await?;
    let rejection = rejections::get_rejection(pool, id).await?;
    let finalized = finals::get_final(pool, id).await?;

    // .as_ref(): Option<T> → Option<&T> (소유권을 넘기지 않고 빌려서 계산)
    let state = SessionState::derive(submissions.len(), mutual.as_ref(), finalized.as_ref());

    Ok(SessionSnapshot {
        session_id: id.to_string(),
        state,
        rejected: rejection.is_some(),
        submissions,
        mutual,
        rejection,
        finalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::Category;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    async fn state(pool: &SqlitePool, session: &MatchId) -> SessionState {
        get_session(pool, session).await.unwrap().state
    }

    async fn submit(pool: &SqlitePool, session: &MatchId, party: &str, date: &str) {
        preferences::submit_preferences(
            pool,
            session,
            party,
            strings(&["Park"]),
            strings(&[date]),
            strings(&["10am"]),
        )
        .await
        .unwrap();
    }

    async fn resolve_as_alice(pool: &SqlitePool, session: &MatchId) {
        let own = strings(&["Park"]);
        let dates = strings(&["2024-06-01"]);
        let times = strings(&["10am"]);
        mutual::resolve_mutual(pool, session, "alice", &own, &dates, &times, 3)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn walks_through_the_state_machine() {
        let pool = test_pool().await;
        let session = MatchId::for_parties("alice", "bob").unwrap();

        assert_eq!(state(&pool, &session).await, SessionState::Empty);

        submit(&pool, &session, "alice", "2024-06-01").await;
        assert_eq!(state(&pool, &session).await, SessionState::PartiallySubmitted);

        submit(&pool, &session, "bob", "2024-06-02").await;
        assert_eq!(state(&pool, &session).await, SessionState::BothSubmitted);

        // 장소와 시간만 겹침
        resolve_as_alice(&pool, &session).await;
        assert_eq!(state(&pool, &session).await, SessionState::PartiallyMutual);

        submit(&pool, &session, "bob", "2024-06-01").await;
        resolve_as_alice(&pool, &session).await;
        assert_eq!(state(&pool, &session).await, SessionState::FullyMutual);

        finals::finalize(&pool, &session).await.unwrap();
        let finalized = get_session(&pool, &session).await.unwrap();
        assert_eq!(finalized.state, SessionState::Finalized);
        assert!(!finalized.rejected);

        rejections::reject(&pool, &session, "bob", &[Category::Places], "closed")
            .await
            .unwrap();
        let rejected = get_session(&pool, &session).await.unwrap();
        assert_eq!(rejected.state, SessionState::BothSubmitted);
        assert!(rejected.rejected);
        assert!(rejected.mutual.is_none());
        assert!(rejected.finalized.is_none());
        assert_eq!(rejected.submissions.len(), 2);
    }
}
