//! 세션 상태 저장소.
//!
//! 쓰기 핸들([`SnapshotWriter`])은 하나만 존재하고 복제할 수 없다.
//! 읽기 핸들([`SnapshotReader`])은 얼마든지 복제할 수 있으며, 갱신될 때마다
//! 동기적으로 변경 알림을 받는다.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::protocol::{Combatant, CombatantView, Side, Snapshot, StartSessionResponse};

/// 세션 시작 시 한 번 설정되고 이후 바뀌지 않는 두 전투원의 정보.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionIdentity {
    pub session_id: String,
    pub player: Combatant,
    pub opponent: Combatant,
}

impl SessionIdentity {
    pub fn combatant(&self, side: Side) -> &Combatant {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub identity: Arc<SessionIdentity>,
    pub snapshot: Snapshot,
}

/// 구독자가 보는 값. `None` 이면 활성 세션이 없다.
pub type StoreState = Option<ActiveSession>;

pub struct SnapshotWriter {
    tx: watch::Sender<StoreState>,
}

#[derive(Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<StoreState>,
}

pub fn snapshot_store() -> (SnapshotWriter, SnapshotReader) {
    let (tx, rx) = watch::channel(None);
    (SnapshotWriter { tx }, SnapshotReader { rx })
}

impl SnapshotWriter {
    /// 새 세션을 설정한다. 양쪽 HP는 각자의 최대 HP로 시작한다.
    pub fn set_session(&self, started: StartSessionResponse) -> ActiveSession {
        let StartSessionResponse {
            session_id,
            player,
            opponent,
            turn,
            log,
        } = started;

        let snapshot = Snapshot {
            player: CombatantView::full(player.stats.hp),
            opponent: CombatantView::full(opponent.stats.hp),
            turn,
            log,
            winner: None,
            tags: Vec::new(),
        };
        let active = ActiveSession {
            identity: Arc::new(SessionIdentity {
                session_id,
                player,
                opponent,
            }),
            snapshot,
        };

        info!(
            "Session {} started: {} vs {}",
            active.identity.session_id, active.identity.player.name, active.identity.opponent.name
        );
        self.tx.send_replace(Some(active.clone()));
        active
    }

    /// 현재 스냅샷을 통째로 교체한다. 활성 세션이 없으면 무시하고 `false`.
    pub fn update_snapshot(&self, next: Snapshot) -> bool {
        let mut replaced = false;
        self.tx.send_if_modified(|state| match state.as_mut() {
            Some(active) => {
                debug!(
                    "Snapshot replaced: log {} -> {}, turn {:?}, winner {:?}",
                    active.snapshot.log.len(),
                    next.log.len(),
                    next.turn,
                    next.winner
                );
                active.snapshot = next;
                replaced = true;
                true
            }
            None => false,
        });
        replaced
    }

    pub fn reset(&self) {
        info!("Session store reset");
        self.tx.send_replace(None);
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl SnapshotReader {
    pub fn current(&self) -> StoreState {
        self.rx.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.rx.borrow().as_ref().map(|active| active.snapshot.clone())
    }

    pub fn identity(&self) -> Option<Arc<SessionIdentity>> {
        self.rx.borrow().as_ref().map(|active| active.identity.clone())
    }

    pub fn has_session(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// 다음 갱신까지 대기한다. 저장소가 사라지면 `false`.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
