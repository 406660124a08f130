use super::Category;
use serde::{Deserialize, Serialize};

/// 한 사람이 한 세션에 제출한 후보 목록 — `meeting_preferences` 테이블 한 행
///
/// 같은 사람이 다시 제출하면 이전 제출을 통째로 덮어씁니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSubmission {
    pub session_id: String,
    pub party_id: String,
    /// 장소 이름 (순서 무관, 중복 없음)
    pub places: Vec<String>,
    /// 날짜 문자열 (예: "2024-06-01") — 파싱하지 않고 문자열 그대로 비교
    pub dates: Vec<String>,
    /// 시간대 라벨 (예: "10am")
    pub times: Vec<String>,
    pub submitted_at: String,
}

impl PreferenceSubmission {
    pub fn list(&self, category: Category) -> &[String] {
        match category {
            Category::Places => &self.places,
            Category::Dates => &self.dates,
            Category::Times => &self.times,
        }
    }
}

/// `PUT /api/v1/meetings/{match_id}/preferences` 요청 본문
///
/// 카테고리를 비워 보내도 됩니다 (이미 정해진 카테고리라 제안할 게 없는 경우).
/// `#[serde(default)]`: 필드가 빠지면 빈 Vec으로 채웁니다.
#[derive(Debug, Deserialize)]
pub struct SubmitPreferencesRequest {
    #[serde(default)]
    pub places: Vec<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub times: Vec<String>,
}
