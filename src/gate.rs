use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::{
    api::BattleApi,
    env::GateSettings,
    error::ClientError,
    protocol::{MoveDescriptor, Side, Snapshot},
    store::ActiveSession,
};

/// 제출 시도의 결과. 에러가 아닌 무시(no-op)도 구분한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Sent,
    /// 내 턴이 아니거나, 승부가 났거나, 리플레이 중 차단 설정
    Blocked,
    AlreadyInFlight,
    UnknownKey,
}

const NO_TICKET: u64 = 0;

/// 행동 제출 가능 여부를 판단하고 동시에 하나의 요청만 나가도록 보장한다.
///
/// 진행 중인 요청은 티켓 번호로 표시된다. `release` 로 풀린 뒤에는
/// 이전 요청이 끝나도 새로 잡힌 티켓을 건드리지 못한다.
pub struct InputGate {
    settings: GateSettings,
    in_flight: AtomicU64,
    next_ticket: AtomicU64,
}

struct InFlightGuard<'a> {
    slot: &'a AtomicU64,
    ticket: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let _ = self.slot.compare_exchange(
            self.ticket,
            NO_TICKET,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

impl InputGate {
    pub fn new(settings: GateSettings) -> Self {
        Self {
            settings,
            in_flight: AtomicU64::new(NO_TICKET),
            next_ticket: AtomicU64::new(1),
        }
    }

    pub fn settings(&self) -> GateSettings {
        self.settings
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) != NO_TICKET
    }

    /// 세션이 바뀔 때 호출한다. 이전 세션의 요청은 더 이상 입력을 막지 않는다.
    pub fn release(&self) {
        let previous = self.in_flight.swap(NO_TICKET, Ordering::AcqRel);
        if previous != NO_TICKET {
            info!("Released in-flight ticket #{} of a previous session", previous);
        }
    }

    /// 턴/승패만 보고 판단한다. 리플레이 진행과는 `block_during_replay` 일 때만 엮인다.
    fn turn_allows(&self, snapshot: &Snapshot, replay_idle: bool) -> bool {
        snapshot.turn == Side::Player
            && snapshot.winner.is_none()
            && (!self.settings.block_during_replay || replay_idle)
    }

    pub fn can_act(&self, snapshot: &Snapshot, replay_idle: bool) -> bool {
        self.turn_allows(snapshot, replay_idle) && !self.in_flight()
    }

    /// 숫자 키 `1..=N` 을 기술 목록의 위치로 매핑한다.
    pub fn move_for_key<'m>(
        &self,
        moves: &'m [MoveDescriptor],
        key: char,
    ) -> Option<&'m MoveDescriptor> {
        let digit = key.to_digit(10)? as usize;
        if digit == 0 || digit > self.settings.max_shortcut as usize {
            return None;
        }
        moves.get(digit - 1)
    }

    /// 행동을 제출한다. 성공 응답은 in-flight 가 풀리기 전에 `apply` 로 넘겨진다.
    /// 실패하면 `apply` 는 호출되지 않고 에러가 그대로 돌아온다 (재시도 없음).
    pub async fn submit<A, F>(
        &self,
        api: &A,
        session: Option<&ActiveSession>,
        replay_idle: bool,
        move_id: &str,
        apply: F,
    ) -> Result<Submission, ClientError>
    where
        A: BattleApi + ?Sized,
        F: FnOnce(Snapshot),
    {
        let session = session.ok_or(ClientError::SessionAbsent)?;

        if !self.turn_allows(&session.snapshot, replay_idle) {
            debug!(
                "Submission of {} blocked: turn {:?}, winner {:?}",
                move_id, session.snapshot.turn, session.snapshot.winner
            );
            return Ok(Submission::Blocked);
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        if self
            .in_flight
            .compare_exchange(NO_TICKET, ticket, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Submission of {} ignored: request already in flight", move_id);
            return Ok(Submission::AlreadyInFlight);
        }
        let _guard = InFlightGuard {
            slot: &self.in_flight,
            ticket,
        };

        info!(
            "Submitting move {} for session {}",
            move_id, session.identity.session_id
        );
        match api.submit_action(&session.identity.session_id, move_id).await {
            Ok(snapshot) => {
                apply(snapshot);
                Ok(Submission::Sent)
            }
            Err(e) => {
                warn!("Action {} failed: {}", move_id, e);
                Err(e)
            }
        }
    }
}
