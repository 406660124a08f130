//! # 세션 이벤트 허브
//!
//! 합의가 생기거나, 상대방이 거절하거나, 약속이 확정되면 같은 세션을 보고 있는
//! 사람에게 알려야 합니다. `tokio::sync::broadcast` 채널 하나로 모든 세션의
//! 이벤트를 흘려보내고, 구독자는 자기 세션 이벤트만 골라 받습니다.
//!
//! 전역 리스너는 없습니다. 구독을 시작한 쪽이 `Subscription` 핸들을 소유하고,
//! 다 쓰면 `close()`로 해제합니다.
//!
//! ```text
//! routes ──publish()──▶ EventHub ──broadcast──▶ Subscription(session A)
//!                                          └──▶ Subscription(session B)
//! ```

use crate::models::{Category, FinalizedMeeting, MatchId};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

/// 구독자가 이 개수만큼 뒤처지면 오래된 이벤트부터 건너뜁니다.
const DEFAULT_CAPACITY: usize = 256;

/// 세션에서 일어난 일
///
/// JSON: `{ "type": "rejected", "session_id": "...", ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeetingEvent {
    /// 하나 이상의 카테고리에서 교집합이 생김
    MutualFound { session_id: String, party_id: String },
    /// 한 사람이 카테고리를 거절함 — 합의/확정이 초기화됨
    Rejected {
        session_id: String,
        party_id: String,
        categories: Vec<Category>,
        reason: String,
    },
    /// 약속이 확정됨
    Finalized {
        session_id: String,
        meeting: FinalizedMeeting,
    },
}

impl MeetingEvent {
    pub fn session_id(&self) -> &str {
        match self {
            MeetingEvent::MutualFound { session_id, .. }
            | MeetingEvent::Rejected { session_id, .. }
            | MeetingEvent::Finalized { session_id, .. } => session_id,
        }
    }
}

/// 이벤트 발행 지점. `Clone`은 같은 채널을 공유합니다 (AppState에 넣기 위함).
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<MeetingEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 이벤트를 발행합니다. 구독자가 없어도 에러가 아닙니다.
    pub fn publish(&self, event: MeetingEvent) {
        let session_id = event.session_id().to_string();
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(%session_id, receivers, "meeting event published"),
            Err(_) => tracing::trace!(%session_id, "meeting event dropped, no subscribers"),
        }
    }

    /// 한 세션의 이벤트만 받는 구독을 시작합니다.
    pub fn subscribe(&self, session_id: &MatchId) -> Subscription {
        Subscription {
            session_id: session_id.to_string(),
            receiver: self.sender.subscribe(),
        }
    }
}

/// 세션 하나에 대한 구독 핸들
pub struct Subscription {
    session_id: String,
    receiver: broadcast::Receiver<MeetingEvent>,
}

impl Subscription {
    /// 이 세션의 다음 이벤트를 기다립니다. 허브가 사라지면 None.
    ///
    /// 너무 뒤처져서 놓친 이벤트는 건너뛰고 그 이후 이벤트부터 계속 받습니다.
    pub async fn next(&mut self) -> Option<MeetingEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.session_id() == self.session_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %self.session_id, skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// 구독을 해제합니다.
    pub fn close(self) {
        tracing::trace!(session_id = %self.session_id, "subscription closed");
    }
}
