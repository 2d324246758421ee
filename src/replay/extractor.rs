use tracing::{debug, warn};

use crate::{
    protocol::{EventKind, Side, Snapshot},
    replay::{AnimationEvent, ResultingHp},
    store::SessionIdentity,
};

const ATTACK_MARKER: &str = "used";
const MISS_MARKER: &str = "missed";

/// 로그 한 줄을 연출 이벤트로 분류하는 전략.
pub trait LineClassifier: Send + Sync {
    /// `snapshot.log[index]` 에 해당하는 이벤트들을 로그 순서대로 돌려준다.
    fn classify(
        &self,
        identity: &SessionIdentity,
        snapshot: &Snapshot,
        index: usize,
    ) -> Vec<AnimationEvent>;
}

/// 서버 로그 문자열에서 이름, "used", "missed" 를 찾아 분류한다.
///
/// 한 쪽 이름이 다른 쪽 이름의 부분 문자열이면 한 줄이 양쪽 모두로 분류될 수 있다.
#[derive(Debug, Default, Clone, Copy)]
pub struct NamePatternClassifier;

impl NamePatternClassifier {
    fn is_attack_by(line: &str, log_name: &str) -> bool {
        line.contains(log_name) && line.contains(ATTACK_MARKER) && !line.contains(MISS_MARKER)
    }
}

impl LineClassifier for NamePatternClassifier {
    fn classify(
        &self,
        identity: &SessionIdentity,
        snapshot: &Snapshot,
        index: usize,
    ) -> Vec<AnimationEvent> {
        let Some(line) = snapshot.log.get(index) else {
            return Vec::new();
        };

        [Side::Player, Side::Opponent]
            .into_iter()
            .filter(|side| Self::is_attack_by(line, &identity.combatant(*side).log_name()))
            .map(|side| AnimationEvent::attack(side, snapshot))
            .collect()
    }
}

/// 서버가 태그를 붙여 준 줄은 그대로 통과시키고, 태그가 없는 줄만 문자열로 분류한다.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaggedClassifier {
    fallback: NamePatternClassifier,
}

impl LineClassifier for TaggedClassifier {
    fn classify(
        &self,
        identity: &SessionIdentity,
        snapshot: &Snapshot,
        index: usize,
    ) -> Vec<AnimationEvent> {
        match snapshot.tag_at(index) {
            Some(tag) => match tag.kind {
                EventKind::Attack => vec![AnimationEvent {
                    acting_side: tag.acting_side,
                    kind: tag.kind,
                    resulting_hp: ResultingHp {
                        for_side: tag.target_side,
                        value: snapshot.view(tag.target_side).hp,
                    },
                }],
            },
            None => self.fallback.classify(identity, snapshot, index),
        }
    }
}

/// 이전에 본 로그 길이를 기억하고 새로 붙은 줄만 이벤트로 바꾼다.
pub struct EventExtractor {
    previous_log_length: usize,
    classifier: Box<dyn LineClassifier>,
}

impl EventExtractor {
    pub fn new(classifier: Box<dyn LineClassifier>) -> Self {
        Self {
            previous_log_length: 0,
            classifier,
        }
    }

    pub fn previous_log_length(&self) -> usize {
        self.previous_log_length
    }

    /// 세션 시작 시 이미 있던 로그(인트로 등)는 연출하지 않는다.
    pub fn prime(&mut self, initial_log_length: usize) {
        self.previous_log_length = initial_log_length;
    }

    pub fn reset(&mut self) {
        self.previous_log_length = 0;
    }

    pub fn extract(
        &mut self,
        identity: &SessionIdentity,
        snapshot: &Snapshot,
    ) -> Vec<AnimationEvent> {
        let current = snapshot.log.len();
        if current < self.previous_log_length {
            // 로그는 append-only 여야 한다.
            warn!(
                "Log shrank from {} to {} lines; resynchronizing without replay",
                self.previous_log_length, current
            );
            self.previous_log_length = current;
            return Vec::new();
        }

        let events: Vec<AnimationEvent> = (self.previous_log_length..current)
            .flat_map(|index| self.classifier.classify(identity, snapshot, index))
            .collect();

        debug!(
            "Extracted {} event(s) from {} new line(s)",
            events.len(),
            current - self.previous_log_length
        );
        self.previous_log_length = current;
        events
    }
}

impl Default for EventExtractor {
    fn default() -> Self {
        Self::new(Box::new(NamePatternClassifier))
    }
}
