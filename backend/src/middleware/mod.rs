//! # 미들웨어 모듈
//!
//! - `auth`: Bearer 토큰에서 호출한 사람(party)을 꺼내는 Extractor

pub mod auth;
