//! # 데이터 모델 모듈
//!
//! 약속 협상에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 기록의 데이터 타입을 담당합니다:
//! - `category`: 장소/날짜/시간 카테고리와 카테고리별 플래그
//! - `party`: party ID 검증과 매치(세션) ID
//! - `preference`: 한 사람의 후보 제출
//! - `mutual`: 두 사람의 합의(교집합)
//! - `rejection`: 카테고리 거절 기록
//! - `finalized`: 확정된 약속
//! - `session`: 세션 스냅샷과 파생 상태
//!
//! `pub use X::*;`로 재공개하므로 `crate::models::MatchId`처럼 짧게 접근할 수 있습니다.

pub mod category;
pub mod finalized;
pub mod mutual;
pub mod party;
pub mod preference;
pub mod rejection;
pub mod session;

pub use category::*;
pub use finalized::*;
pub use mutual::*;
pub use party::*;
pub use preference::*;
pub use rejection::*;
pub use session::*;
