//! # matchmeet 웹 서버 진입점
//!
//! 두 사람이 장소/날짜/시간 후보를 내고, 겹치는 후보로 약속을 확정하는
//! 약속 협상 API 서버입니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성
//! 4. 데이터베이스 마이그레이션 실행
//! 5. API 라우터 설정
//! 6. HTTP 서버 시작

// ── 모듈 선언 ──
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use anyhow::Result; // 어떤 에러 타입이든 담을 수 있는 범용 Result 타입
use axum::Router;
use config::Config;
use routes::meetings::AppState;
use services::events::EventHub;
use sqlx::sqlite::SqlitePoolOptions;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer}, // CORS 설정
    trace::TraceLayer,      // HTTP 요청/응답 로깅 미들웨어
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅 초기화 ──
    // RUST_LOG가 없으면 matchmeet, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchmeet=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!("Starting matchmeet server on {}:{}", config.host, config.port);

    // ── 4단계: SQLite 연결 풀 생성 ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // ── 5단계: 마이그레이션 실행 ──
    // 아직 실행되지 않은 마이그레이션만 순서대로 실행
    tracing::info!("Running database migrations...");
    db::MIGRATOR.run(&pool).await?;

    // ── 6단계: 애플리케이션 상태 생성 ──
    // 이벤트 허브는 프로세스 안에서만 공유됩니다 (서버를 여러 대 띄우면 각자 따로).
    let state = AppState {
        pool,
        jwt_secret: config.jwt_secret.clone(),
        events: EventHub::default(),
        mutual_write_retries: config.mutual_write_retries,
        event_poll_timeout: Duration::from_secs(config.event_poll_timeout_secs),
    };

    // ── 7단계: 라우터와 미들웨어 ──
    // 모바일 앱과 웹 미리보기에서 호출하므로 개발 단계에서는 모든 출처 허용
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/v1", routes::api_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // ── 8단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
