use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, watch},
    time::{sleep, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    env::ReplaySettings,
    protocol::Side,
    replay::{AnimationEvent, DisplayState},
};

/// 소비자 상태. `enqueue` 와 스텝 완료로만 전이한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Idle,
    Draining,
}

/// 렌더러가 구독하는 리플레이 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayView {
    /// 세션이 시작되기 전에는 `None`
    pub display: Option<DisplayState>,
    pub player_attacking: bool,
    pub opponent_attacking: bool,
    pub draining: bool,
}

impl ReplayView {
    pub fn attacking(&self, side: Side) -> bool {
        match side {
            Side::Player => self.player_attacking,
            Side::Opponent => self.opponent_attacking,
        }
    }

    fn set_attacking(&mut self, side: Side, on: bool) {
        match side {
            Side::Player => self.player_attacking = on,
            Side::Opponent => self.opponent_attacking = on,
        }
    }
}

/// 이벤트 하나가 반영된 순간의 기록.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStep {
    pub sequence: u64,
    pub event: AnimationEvent,
    pub display: Option<DisplayState>,
    pub at: Instant,
}

struct SchedulerInner {
    queue: VecDeque<AnimationEvent>,
    state: DrainState,
    /// reset 마다 증가. 이전 epoch 의 소비자는 아무것도 바꾸지 못한다.
    epoch: u64,
    shutdown_token: CancellationToken,
    played: u64,
    drain_cycles: u64,
}

/// 이벤트를 한 번에 하나씩, 정해진 시간 간격으로 재생하는 단일 소비자 큐.
///
/// `enqueue` 는 tokio 런타임 안에서 호출해야 한다.
pub struct ReplayScheduler {
    settings: ReplaySettings,
    inner: Arc<Mutex<SchedulerInner>>,
    view_tx: Arc<watch::Sender<ReplayView>>,
    step_tx: Option<mpsc::UnboundedSender<ReplayStep>>,
}

impl ReplayScheduler {
    pub fn new(settings: ReplaySettings) -> Self {
        let (view_tx, _) = watch::channel(ReplayView::default());
        Self {
            settings,
            inner: Arc::new(Mutex::new(SchedulerInner {
                queue: VecDeque::new(),
                state: DrainState::Idle,
                epoch: 0,
                shutdown_token: CancellationToken::new(),
                played: 0,
                drain_cycles: 0,
            })),
            view_tx: Arc::new(view_tx),
            step_tx: None,
        }
    }

    /// 재생된 스텝을 채널로 받아본다.
    pub fn with_step_observer(mut self, step_tx: mpsc::UnboundedSender<ReplayStep>) -> Self {
        self.step_tx = Some(step_tx);
        self
    }

    pub fn settings(&self) -> ReplaySettings {
        self.settings
    }

    pub fn subscribe(&self) -> watch::Receiver<ReplayView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> ReplayView {
        *self.view_tx.borrow()
    }

    pub fn state(&self) -> DrainState {
        self.inner.lock().state
    }

    pub fn is_idle(&self) -> bool {
        self.state() == DrainState::Idle
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn drain_cycles(&self) -> u64 {
        self.inner.lock().drain_cycles
    }

    /// 세션 시작 시 표시 HP를 스냅샷 값으로 초기화한다.
    pub fn prime(&self, display: DisplayState) {
        let _guard = self.inner.lock();
        self.view_tx.send_modify(|view| view.display = Some(display));
    }

    pub fn enqueue(&self, events: Vec<AnimationEvent>) {
        if events.is_empty() {
            return;
        }

        let mut inner = self.inner.lock();
        inner.queue.extend(events);
        debug!("Replay queue length: {}", inner.queue.len());

        if inner.state == DrainState::Draining {
            // 돌고 있는 소비자가 큐를 비울 때까지 가져간다.
            return;
        }

        inner.state = DrainState::Draining;
        inner.drain_cycles += 1;
        self.view_tx.send_modify(|view| view.draining = true);
        info!("Replay drain cycle #{} started", inner.drain_cycles);

        let consumer = DrainConsumer {
            settings: self.settings,
            inner: self.inner.clone(),
            view_tx: self.view_tx.clone(),
            step_tx: self.step_tx.clone(),
            epoch: inner.epoch,
            shutdown_token: inner.shutdown_token.clone(),
        };
        tokio::spawn(consumer.run());
    }

    /// 큐와 대기 중인 타이머를 버리고 표시 상태를 처음으로 되돌린다.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown_token.cancel();
        inner.shutdown_token = CancellationToken::new();
        inner.epoch += 1;
        inner.queue.clear();
        inner.state = DrainState::Idle;
        inner.played = 0;
        inner.drain_cycles = 0;
        self.view_tx.send_replace(ReplayView::default());
        info!("Replay timeline reset (epoch {})", inner.epoch);
    }

    /// 현재 drain cycle 이 끝날 때까지 기다린다.
    pub async fn wait_idle(&self) {
        let mut rx = self.view_tx.subscribe();
        let _ = rx.wait_for(|view| !view.draining).await;
    }
}

impl Drop for ReplayScheduler {
    fn drop(&mut self) {
        self.inner.lock().shutdown_token.cancel();
    }
}

struct DrainConsumer {
    settings: ReplaySettings,
    inner: Arc<Mutex<SchedulerInner>>,
    view_tx: Arc<watch::Sender<ReplayView>>,
    step_tx: Option<mpsc::UnboundedSender<ReplayStep>>,
    epoch: u64,
    shutdown_token: CancellationToken,
}

impl DrainConsumer {
    async fn run(self) {
        let settle = self.settings.step().saturating_sub(self.settings.flash());

        while let Some(event) = self.resolve_next() {
            if !self.hold(self.settings.flash()).await {
                return;
            }
            if !self.clear_flash(event.acting_side) {
                return;
            }
            if !self.hold(settle).await {
                return;
            }
        }
    }

    /// 큐에서 하나를 꺼내 표시 HP와 하이라이트에 반영한다. 큐가 비면 Idle 로 전이.
    fn resolve_next(&self) -> Option<AnimationEvent> {
        let mut inner = self.inner.lock();
        if inner.epoch != self.epoch {
            return None;
        }

        let Some(event) = inner.queue.pop_front() else {
            inner.state = DrainState::Idle;
            self.view_tx.send_modify(|view| view.draining = false);
            info!("Replay drain cycle finished after {} step(s)", inner.played);
            return None;
        };

        inner.played += 1;
        let sequence = inner.played;
        let mut resolved = ReplayView::default();
        self.view_tx.send_modify(|view| {
            if let Some(display) = view.display.as_mut() {
                display.apply(event.resulting_hp);
            }
            view.set_attacking(event.acting_side, true);
            resolved = *view;
        });
        debug!(
            "Replay step #{}: {:?} attacked, {:?} hp -> {}",
            sequence, event.acting_side, event.resulting_hp.for_side, event.resulting_hp.value
        );

        if let Some(step_tx) = &self.step_tx {
            let _ = step_tx.send(ReplayStep {
                sequence,
                event,
                display: resolved.display,
                at: Instant::now(),
            });
        }
        Some(event)
    }

    fn clear_flash(&self, side: Side) -> bool {
        let inner = self.inner.lock();
        if inner.epoch != self.epoch {
            return false;
        }
        self.view_tx.send_modify(|view| view.set_attacking(side, false));
        true
    }

    /// 취소되면 `false`
    async fn hold(&self, duration: std::time::Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown_token.cancelled() => {
                debug!("Replay consumer cancelled (epoch {})", self.epoch);
                false
            }
            _ = sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{protocol::EventKind, replay::ResultingHp};
    use std::time::Duration;

    fn hit(acting_side: Side, value: u32) -> AnimationEvent {
        AnimationEvent {
            acting_side,
            kind: EventKind::Attack,
            resulting_hp: ResultingHp {
                for_side: acting_side.opposite(),
                value,
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_event_resolves_immediately_and_flash_clears() {
        let scheduler = ReplayScheduler::new(ReplaySettings::default());
        scheduler.prime(DisplayState {
            player: 150,
            opponent: 140,
        });
        scheduler.enqueue(vec![hit(Side::Player, 100)]);
        assert_eq!(scheduler.state(), DrainState::Draining);

        sleep(Duration::from_millis(10)).await;
        let view = scheduler.view();
        assert_eq!(view.display.unwrap().opponent, 100);
        assert_eq!(view.display.unwrap().player, 150);
        assert!(view.player_attacking);
        assert!(!view.opponent_attacking);

        sleep(Duration::from_millis(800)).await;
        assert!(!scheduler.view().player_attacking);

        scheduler.wait_idle().await;
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.drain_cycles(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_enqueue_does_not_arm_consumer() {
        let scheduler = ReplayScheduler::new(ReplaySettings::default());
        scheduler.enqueue(Vec::new());
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.drain_cycles(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unprimed_display_is_left_alone() {
        let scheduler = ReplayScheduler::new(ReplaySettings::default());
        scheduler.enqueue(vec![hit(Side::Opponent, 30)]);
        sleep(Duration::from_millis(10)).await;
        let view = scheduler.view();
        assert_eq!(view.display, None);
        assert!(view.opponent_attacking);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_drops_queue_and_pending_timer() {
        let scheduler = ReplayScheduler::new(ReplaySettings::default());
        scheduler.prime(DisplayState {
            player: 150,
            opponent: 140,
        });
        scheduler.enqueue(vec![hit(Side::Player, 100), hit(Side::Opponent, 90)]);
        sleep(Duration::from_millis(10)).await;

        scheduler.reset();
        assert_eq!(scheduler.pending(), 0);
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.view(), ReplayView::default());

        // 이전 타이머가 만료될 시간이 지나도 아무것도 바뀌지 않는다.
        sleep(Duration::from_millis(5_000)).await;
        assert_eq!(scheduler.view(), ReplayView::default());
        assert!(scheduler.is_idle());
    }
}
