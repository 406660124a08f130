//! # 서비스 모듈
//!
//! DB 접근과 HTTP 처리 바깥의 로직을 모아둔 모듈입니다.
//! - `negotiation`: 교집합, 병합, 최종 선택 같은 협상 규칙 (순수 함수)
//! - `events`: 세션 이벤트 발행/구독

pub mod events;
pub mod negotiation;
