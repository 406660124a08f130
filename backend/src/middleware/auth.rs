//! # 인증 Extractor
//!
//! 토큰은 외부 인증 서비스가 발급합니다. 이 서버는 공유 비밀키(`JWT_SECRET`)로
//! 서명과 만료만 검증하고, `sub` 클레임을 호출한 사람의 party ID로 사용합니다.
//!
//! ```text
//! Authorization: Bearer <jwt>  →  AuthParty { party_id: "alice" }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::models::validate_party_id;
use crate::routes::meetings::AppState;

/// 인증 서비스가 서명한 JWT 클레임
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// party ID
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// 검증된 토큰의 주인. 핸들러 인자로 받으면 인증이 강제됩니다.
#[derive(Debug, Clone)]
pub struct AuthParty {
    pub party_id: String,
}

impl FromRequestParts<AppState> for AuthParty {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = verify_access_token(token, &state.jwt_secret)?;

        // `:`가 들어있거나 예약어인 sub은 매치 ID를 만들 수 없으므로 토큰 자체를 거부
        validate_party_id(&claims.sub).map_err(|_| AuthError::InvalidSubject)?;

        Ok(AuthParty {
            party_id: claims.sub,
        })
    }
}

/// `Authorization` 헤더에서 Bearer 토큰 부분만 꺼냅니다.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidToken)
}

/// 인증 실패. 모두 401이고 `code`로 원인을 구분합니다.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization token is required")]
    MissingToken,
    #[error("Invalid authorization token")]
    InvalidToken,
    #[error("Authorization token has expired")]
    ExpiredToken,
    #[error("Token subject is not a valid party id")]
    InvalidSubject,
}

impl AuthError {
    fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::InvalidSubject => "invalid_subject",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(code = self.code(), "request rejected by auth");
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string()
            }
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// 서명과 만료를 검증하고 클레임을 돌려줍니다.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })
}

/// 인증 서비스와 같은 방식으로 토큰을 만듭니다. 테스트 전용.
#[cfg(test)]
pub fn create_access_token(party_id: &str, secret: &str, ttl: chrono::Duration) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = Claims {
        sub: party_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token encoding")
}
