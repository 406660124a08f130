//! # 약속 세션 모델 정의
//!
//! 매칭된 두 사람이 만날 약속을 정하는 과정 전체를 "세션"이라고 부릅니다.
//! 세션 자체는 따로 저장되지 않고, 네 종류의 기록(제출/합의/거절/확정)을
//! 모아 보면 현재 상태를 알 수 있습니다.
//!
//! ## 세션 상태 흐름
//! ```text
//! Empty → PartiallySubmitted → BothSubmitted → PartiallyMutual → FullyMutual → Finalized
//!                  ↑                   ↑
//!                  └──── 거절(reject) ──┘  (합의/확정만 지워지고 제출은 유지됨)
//! ```

use super::{FinalizedMeeting, MutualAgreement, PreferenceSubmission, RejectionRecord};
use serde::{Deserialize, Serialize};

/// 세션의 파생 상태
///
/// 거절(Rejected)은 별도 상태가 아니라 `SessionSnapshot::rejection`이
/// 남아 있는 것으로 표현됩니다. 거절 직후에는 합의가 지워지므로
/// 상태는 `BothSubmitted`나 `PartiallySubmitted`로 돌아갑니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Empty,
    PartiallySubmitted,
    BothSubmitted,
    PartiallyMutual,
    FullyMutual,
    Finalized,
}

impl SessionState {
    /// 저장된 기록들로부터 상태를 계산합니다.
    ///
    /// 우선순위: 확정 > 전체 합의 > 부분 합의 > 제출 수
    pub fn derive(
        submissions: usize,
        mutual: Option<&MutualAgreement>,
        finalized: Option<&FinalizedMeeting>,
    ) -> Self {
        if finalized.is_some() {
            return SessionState::Finalized;
        }
        if let Some(mutual) = mutual {
            if mutual.is_complete() {
                return SessionState::FullyMutual;
            }
            if mutual.fixed().any() {
                return SessionState::PartiallyMutual;
            }
        }
        match submissions {
            0 => SessionState::Empty,
            1 => SessionState::PartiallySubmitted,
            _ => SessionState::BothSubmitted,
        }
    }
}

/// `GET /api/v1/meetings/{match_id}` 응답 — 세션의 모든 기록과 파생 상태
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub rejected: bool,
    pub submissions: Vec<PreferenceSubmission>,
    pub mutual: Option<MutualAgreement>,
    pub rejection: Option<RejectionRecord>,
    pub finalized: Option<FinalizedMeeting>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mutual(places: bool, dates: bool, times: bool) -> MutualAgreement {
        let list = |on: bool| on.then(|| vec!["x".to_string()]);
        MutualAgreement {
            session_id: "alice:bob".to_string(),
            places: list(places),
            dates: list(dates),
            times: list(times),
            version: 1,
            computed_at: String::new(),
        }
    }

    #[test]
    fn derives_states_in_priority_order() {
        assert_eq!(SessionState::derive(0, None, None), SessionState::Empty);
        assert_eq!(SessionState::derive(1, None, None), SessionState::PartiallySubmitted);
        assert_eq!(SessionState::derive(2, None, None), SessionState::BothSubmitted);

        let partial = mutual(true, false, false);
        assert_eq!(
            SessionState::derive(2, Some(&partial), None),
            SessionState::PartiallyMutual
        );

        let full = mutual(true, true, true);
        assert_eq!(SessionState::derive(2, Some(&full), None), SessionState::FullyMutual);

        let finalized = FinalizedMeeting {
            session_id: "alice:bob".to_string(),
            place: "Park".to_string(),
            date: "2024-06-01".to_string(),
            time: "10am".to_string(),
            finalized_at: String::new(),
        };
        assert_eq!(
            SessionState::derive(2, Some(&full), Some(&finalized)),
            SessionState::Finalized
        );
    }

    #[test]
    fn empty_mutual_record_falls_back_to_submission_count() {
        let none = mutual(false, false, false);
        assert_eq!(SessionState::derive(2, Some(&none), None), SessionState::BothSubmitted);
    }
}
