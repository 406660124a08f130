//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로
//! - `JWT_SECRET`: 인증 서비스와 공유하는 JWT 서명 검증 키
//! - `HOST`: 서버 바인딩 주소
//! - `PORT`: 서버 포트 번호
//! - `MUTUAL_WRITE_RETRIES`: 합의 기록 낙관적 쓰기의 최대 재시도 횟수
//! - `EVENT_POLL_TIMEOUT_SECS`: 이벤트 롱폴링 대기 시간(초)

use std::env;
use std::str::FromStr;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 파일 경로 (예: "sqlite:data/matchmeet.db?mode=rwc")
    pub database_url: String,
    /// JWT 토큰 검증에 사용하는 비밀키
    pub jwt_secret: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
    /// 두 사람이 동시에 합의를 계산할 때 버전 충돌 재시도 횟수 (기본값: 5)
    pub mutual_write_retries: u32,
    /// `GET /meetings/{id}/events`가 다음 이벤트를 기다리는 최대 시간 (기본값: 25초)
    pub event_poll_timeout_secs: u64,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없거나 파싱에 실패해도 동작합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?, // 필수
            jwt_secret: env::var("JWT_SECRET")?,     // 필수
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),
            mutual_write_retries: parse_or("MUTUAL_WRITE_RETRIES", 5),
            event_poll_timeout_secs: parse_or("EVENT_POLL_TIMEOUT_SECS", 25),
        })
    }
}

/// 숫자형 환경변수를 읽습니다. 없거나 파싱에 실패하면 `default`를 사용합니다.
///
/// 제네릭 `T: FromStr`: "3000" → 3000u16, "5" → 5u32처럼
/// 문자열에서 만들 수 있는 타입이면 무엇이든 받을 수 있습니다.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
