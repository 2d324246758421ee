use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::{
    api::BattleApi,
    env::Settings,
    error::ClientError,
    gate::{InputGate, Submission},
    protocol::{Snapshot, StartSessionRequest, Suggestion},
    reconciler::{reconcile, PaintFrame},
    replay::{
        DisplayState, EventExtractor, LineClassifier, ReplayScheduler, ReplayStep, ReplayView,
    },
    store::{snapshot_store, SessionIdentity, SnapshotReader, SnapshotWriter},
};

/// 하나의 전투 세션 컨텍스트.
///
/// 스냅샷 쓰기 핸들은 이 타입만 가지고 있다. 새 스냅샷은
/// 저장소 교체 -> 이벤트 추출 -> 리플레이 큐 순서로 흘러간다.
pub struct BattleClient {
    api: Arc<dyn BattleApi>,
    writer: SnapshotWriter,
    reader: SnapshotReader,
    extractor: Mutex<EventExtractor>,
    scheduler: ReplayScheduler,
    gate: InputGate,
}

impl BattleClient {
    pub fn new(api: Arc<dyn BattleApi>, settings: &Settings) -> Self {
        let (writer, reader) = snapshot_store();
        Self {
            api,
            writer,
            reader,
            extractor: Mutex::new(EventExtractor::default()),
            scheduler: ReplayScheduler::new(settings.replay),
            gate: InputGate::new(settings.gate),
        }
    }

    pub fn with_classifier(self, classifier: Box<dyn LineClassifier>) -> Self {
        Self {
            extractor: Mutex::new(EventExtractor::new(classifier)),
            ..self
        }
    }

    pub fn with_step_observer(self, step_tx: mpsc::UnboundedSender<ReplayStep>) -> Self {
        let settings = self.scheduler.settings();
        Self {
            scheduler: ReplayScheduler::new(settings).with_step_observer(step_tx),
            ..self
        }
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    pub fn scheduler(&self) -> &ReplayScheduler {
        &self.scheduler
    }

    pub fn gate(&self) -> &InputGate {
        &self.gate
    }

    pub fn subscribe_replay(&self) -> watch::Receiver<ReplayView> {
        self.scheduler.subscribe()
    }

    pub fn previous_log_length(&self) -> usize {
        self.extractor.lock().previous_log_length()
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Suggestion>, ClientError> {
        self.api.search_combatants(query).await
    }

    /// 새 세션을 시작한다. 실패하면 기존 상태는 그대로 남는다.
    pub async fn start(
        &self,
        request: StartSessionRequest,
    ) -> Result<Arc<SessionIdentity>, ClientError> {
        if request.player_combatant.trim().is_empty() {
            return Err(ClientError::InvalidChoice(
                "player combatant name is empty".to_string(),
            ));
        }

        let started = self.api.start_session(request).await?;

        let mut extractor = self.extractor.lock();
        self.scheduler.reset();
        extractor.reset();

        let active = self.writer.set_session(started);
        self.gate.release();
        extractor.prime(active.snapshot.log.len());
        self.scheduler
            .prime(DisplayState::from_snapshot(&active.snapshot));
        Ok(active.identity)
    }

    /// 서버가 돌려준 스냅샷을 반영하고 새 로그에서 나온 이벤트 수를 돌려준다.
    pub fn apply_snapshot(&self, next: Snapshot) -> usize {
        let mut extractor = self.extractor.lock();
        if !self.writer.update_snapshot(next) {
            warn!("Snapshot arrived without an active session; ignored");
            return 0;
        }
        let Some(active) = self.reader.current() else {
            return 0;
        };

        let events = extractor.extract(&active.identity, &active.snapshot);
        let count = events.len();
        self.scheduler.enqueue(events);
        count
    }

    /// 요청을 보낸 세션이 아직 살아 있을 때만 반영한다.
    fn apply_for_session(&self, session_id: &str, next: Snapshot) {
        let current = self.reader.identity();
        match current {
            Some(identity) if identity.session_id == session_id => {
                self.apply_snapshot(next);
            }
            _ => info!(
                "Dropping response for session {} which is no longer active",
                session_id
            ),
        }
    }

    pub fn can_act(&self) -> bool {
        match self.reader.snapshot() {
            Some(snapshot) => self.gate.can_act(&snapshot, self.scheduler.is_idle()),
            None => false,
        }
    }

    pub async fn submit(&self, move_id: &str) -> Result<Submission, ClientError> {
        let session = self.reader.current();
        let session_id = session
            .as_ref()
            .map(|active| active.identity.session_id.clone())
            .unwrap_or_default();

        self.gate
            .submit(
                self.api.as_ref(),
                session.as_ref(),
                self.scheduler.is_idle(),
                move_id,
                |next| self.apply_for_session(&session_id, next),
            )
            .await
    }

    /// 숫자 단축키 처리. 행동할 수 없으면 아무 일도 하지 않는다.
    pub async fn press_key(&self, key: char) -> Result<Submission, ClientError> {
        let active = self.reader.current().ok_or(ClientError::SessionAbsent)?;
        if !self.gate.can_act(&active.snapshot, self.scheduler.is_idle()) {
            return Ok(Submission::Blocked);
        }
        let Some(mv) = self.gate.move_for_key(&active.identity.player.moves, key) else {
            return Ok(Submission::UnknownKey);
        };
        let move_id = mv.id.clone();
        self.submit(&move_id).await
    }

    pub fn frame(&self) -> Option<PaintFrame> {
        let active = self.reader.current()?;
        let input_enabled = self.gate.can_act(&active.snapshot, self.scheduler.is_idle());
        Some(reconcile(
            &active,
            &self.scheduler.view(),
            input_enabled,
            self.gate.settings().max_shortcut,
        ))
    }

    /// 세션을 버리고 리플레이 타임라인을 처음 상태로 되돌린다.
    pub fn reset(&self) {
        let mut extractor = self.extractor.lock();
        self.scheduler.reset();
        extractor.reset();
        self.writer.reset();
        self.gate.release();
    }
}
