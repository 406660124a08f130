use super::{Category, CategoryFlags};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 세션의 카테고리 거절 기록 — `meeting_rejections` 테이블 한 행
///
/// 세션당 하나만 존재하고, 새 거절은 기존 기록에 병합됩니다.
/// `party_id`는 마지막으로 거절한 사람입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub session_id: String,
    pub party_id: String,
    /// 카테고리별 거절 사유. 같은 카테고리를 다시 거절하면 최신 사유로 바뀜.
    pub reasons: BTreeMap<Category, String>,
    /// 지금까지 거절된 카테고리 전체 (합집합)
    pub rejected: BTreeSet<Category>,
    pub updated_at: String,
}

impl RejectionRecord {
    /// `checkRejectionStatus`: 조회한 사람 본인이 거절한 기록일 때만 카테고리를 표시합니다.
    /// 상대방이 거절한 기록이면 모두 false입니다.
    pub fn status_for(&self, party_id: &str) -> CategoryFlags {
        let mut flags = CategoryFlags::default();
        if self.party_id == party_id {
            for category in &self.rejected {
                flags.set(*category, true);
            }
        }
        flags
    }
}

/// `POST /api/v1/meetings/{match_id}/rejections` 요청 본문
///
/// 카테고리 이름은 대소문자/단복수 구분 없이 받습니다 (`"dates"`, `"Date"`).
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub categories: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_reflects_own_rejections() {
        let record = RejectionRecord {
            session_id: "alice:bob".to_string(),
            party_id: "bob".to_string(),
            reasons: BTreeMap::from([(Category::Dates, "too busy".to_string())]),
            rejected: BTreeSet::from([Category::Dates]),
            updated_at: "2024-06-01T00:00:00.000Z".to_string(),
        };

        let own = record.status_for("bob");
        assert!(own.date);
        assert!(!own.place && !own.time);

        assert_eq!(record.status_for("alice"), CategoryFlags::default());
    }
}
