//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라우트 핸들러(routes/)에서 이 모듈의 함수를 호출하여 DB 작업을 수행합니다.
//!
//! 각 하위 모듈:
//! - `preferences`: 사람별 후보 제출 저장/조회
//! - `mutual`: 두 제출의 교집합 계산과 합의 기록
//! - `rejections`: 카테고리 거절 기록과 합의/확정 무효화
//! - `finals`: 약속 확정
//! - `sessions`: 세션 스냅샷과 상태 조회

pub mod finals;
pub mod mutual;
pub mod preferences;
pub mod rejections;
pub mod sessions;

use sqlx::migrate::Migrator;

/// ./migrations 폴더의 SQL 파일들을 컴파일 타임에 바이너리에 포함시킵니다.
/// 서버 시작과 테스트가 같은 스키마를 사용합니다.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// 읽고 나서 쓰는 트랜잭션의 시작 문장.
///
/// 기본 `BEGIN`(DEFERRED)은 첫 쓰기 때에야 쓰기 잠금을 잡으므로, 그 사이에
/// 다른 연결이 커밋한 내용을 못 보고 덮어쓸 수 있습니다. IMMEDIATE는 시작부터
/// 쓰기 잠금을 잡아 같은 세션의 거절/확정을 한 줄로 세웁니다.
pub const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

/// 테스트용 인메모리 SQLite 풀
///
/// `sqlite::memory:`는 연결마다 별도의 DB가 생기므로 연결을 하나로 고정하고,
/// 유휴 연결이 닫혀 DB가 사라지지 않도록 timeout을 끕니다.
#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    MIGRATOR.run(&pool).await.expect("migrations");
    pool
}

/// 테스트용 파일 기반 SQLite 풀 (연결 여러 개)
///
/// 인메모리 풀은 연결이 하나라 동시 실행이 생기지 않으므로,
/// 경합을 재현하는 테스트는 임시 파일 DB를 사용합니다.
/// 반환된 경로의 파일들(`-wal`, `-shm` 포함)은 호출자가 정리합니다.
#[cfg(test)]
pub async fn file_pool(
    name: &str,
    max_connections: u32,
) -> (sqlx::SqlitePool, std::path::PathBuf) {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    let path = std::env::temp_dir().join(format!(
        "matchmeet-{}-{}-{}.db",
        name,
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .expect("file sqlite");
    MIGRATOR.run(&pool).await.expect("migrations");
    (pool, path)
}

/// `file_pool`이 만든 DB 파일을 지웁니다.
#[cfg(test)]
pub async fn remove_file_pool(pool: sqlx::SqlitePool, path: std::path::PathBuf) {
    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}
