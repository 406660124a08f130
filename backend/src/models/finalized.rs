use serde::{Deserialize, Serialize};

/// 확정된 약속 — `meeting_finals` 테이블 한 행
///
/// `db::finals::finalize`만 만들 수 있고, 이후에는 바뀌지 않습니다.
/// 새 거절이 들어오면 삭제됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FinalizedMeeting {
    pub session_id: String,
    pub place: String,
    pub date: String,
    pub time: String,
    pub finalized_at: String,
}
