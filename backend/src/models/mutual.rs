//! # 합의(Mutual) 모델
//!
//! 두 사람의 제안을 카테고리별로 교집합한 결과입니다.
//! 교집합이 빈 카테고리는 `None`으로 남고, 빈 목록(`Some(vec![])`)으로는 저장하지 않습니다.

use super::{Category, CategoryFlags};
use serde::{Deserialize, Serialize};

/// 캐시된 합의 기록 — `meeting_mutual` 테이블 한 행
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutualAgreement {
    pub session_id: String,
    pub places: Option<Vec<String>>,
    pub dates: Option<Vec<String>>,
    pub times: Option<Vec<String>>,
    /// 낙관적 동시성 제어용 버전 (쓸 때마다 1씩 증가)
    #[serde(skip_serializing)]
    pub version: i64,
    pub computed_at: String,
}

impl MutualAgreement {
    /// 카테고리의 합의 목록. 합의되지 않았거나 비어 있으면 None.
    pub fn list(&self, category: Category) -> Option<&[String]> {
        let list = match category {
            Category::Places => &self.places,
            Category::Dates => &self.dates,
            Category::Times => &self.times,
        };
        list.as_deref().filter(|values| !values.is_empty())
    }

    /// 카테고리별 "확정됨" 여부 (`checkFixedMeetDetails`)
    pub fn fixed(&self) -> CategoryFlags {
        let mut flags = CategoryFlags::default();
        for category in Category::ALL {
            flags.set(category, self.list(category).is_some());
        }
        flags
    }

    /// 세 카테고리가 모두 합의되어 확정할 수 있는 상태인지
    pub fn is_complete(&self) -> bool {
        self.fixed().all()
    }
}

/// `POST /api/v1/meetings/{match_id}/mutual` 요청 본문
///
/// 호출한 사람의 현재 선택 목록입니다. 보내지 않으면 저장된 제출을 사용합니다.
#[derive(Debug, Default, Deserialize)]
pub struct ResolveMutualRequest {
    pub places: Option<Vec<String>>,
    pub dates: Option<Vec<String>>,
    pub times: Option<Vec<String>>,
}

/// 합의 계산 결과 — 하나라도 교집합이 생겼으면 `has_mutual: true`
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveMutualResponse {
    pub has_mutual: bool,
}
