//! # 당사자(Party)와 매치(Match) 식별자
//!
//! 약속 세션은 매칭된 두 사람의 ID를 정렬해 이어 붙인 **매치 ID**로 식별합니다.
//! 같은 두 사람이면 누가 먼저 만들든 항상 같은 ID가 나옵니다.
//!
//! ```text
//! MatchId::for_parties("bob", "alice") == "alice:bob"
//! MatchId::for_parties("alice", "bob") == "alice:bob"
//! ```

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 매치 ID에서 두 party ID를 구분하는 문자
pub const MATCH_ID_SEPARATOR: char = ':';

/// 저장소에서 합의/거절/확정 기록을 가리키는 예약 키.
/// party ID로 쓸 수 없습니다.
pub const RESERVED_KEYS: [&str; 3] = ["mutual", "rejected", "confirm"];

/// party ID가 사용할 수 있는 값인지 검사합니다.
///
/// - 비어 있으면 안 됨
/// - 매치 ID 구분자(`:`)를 포함하면 안 됨
/// - 예약 키(`mutual`, `rejected`, `confirm`)와 같으면 안 됨
pub fn validate_party_id(party_id: &str) -> Result<(), AppError> {
    if party_id.is_empty() {
        return Err(AppError::BadRequest("Party id must not be empty".to_string()));
    }
    if party_id.contains(MATCH_ID_SEPARATOR) {
        return Err(AppError::BadRequest(format!(
            "Party id must not contain '{}'",
            MATCH_ID_SEPARATOR
        )));
    }
    if RESERVED_KEYS.contains(&party_id) {
        return Err(AppError::BadRequest(format!(
            "Party id '{}' is reserved",
            party_id
        )));
    }
    Ok(())
}

/// 약속 세션 식별자 — 정렬된 두 party ID를 `:`로 이은 문자열
///
/// `#[serde(transparent)]`: JSON에서는 감싼 String 그대로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    /// 두 사람의 ID로 매치 ID를 만듭니다. 인자 순서는 결과에 영향을 주지 않습니다.
    pub fn for_parties(a: &str, b: &str) -> Result<Self, AppError> {
        validate_party_id(a)?;
        validate_party_id(b)?;
        if a == b {
            return Err(AppError::BadRequest(
                "A match needs two different parties".to_string(),
            ));
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self(format!("{}{}{}", low, MATCH_ID_SEPARATOR, high)))
    }

    /// URL 경로 등에서 받은 문자열을 매치 ID로 해석합니다.
    ///
    /// 정렬되지 않은 형태(`bob:alice`)는 거부합니다. 같은 세션이 두 개의 ID를
    /// 갖게 되는 일을 막기 위해서입니다.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let (a, b) = raw
            .split_once(MATCH_ID_SEPARATOR)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid match id '{}'", raw)))?;
        let id = Self::for_parties(a, b)?;
        if id.0 != raw {
            return Err(AppError::BadRequest(format!(
                "Match id '{}' is not in canonical order",
                raw
            )));
        }
        Ok(id)
    }

    /// 매치를 이루는 두 party ID (정렬된 순서)
    pub fn parties(&self) -> (&str, &str) {
        // 생성자에서 구분자가 정확히 하나 들어가도록 보장합니다
        self.0
            .split_once(MATCH_ID_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }

    /// 이 매치의 당사자인지 확인합니다.
    pub fn contains(&self, party_id: &str) -> bool {
        let (a, b) = self.parties();
        a == party_id || b == party_id
    }

    /// 주어진 당사자의 상대방 ID. 당사자가 아니면 None.
    pub fn counterpart_of(&self, party_id: &str) -> Option<&str> {
        match self.parties() {
            (a, b) if a == party_id => Some(b),
            (a, b) if b == party_id => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
