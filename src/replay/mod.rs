use crate::protocol::{EventKind, Side, Snapshot};

pub mod extractor;
pub mod scheduler;

pub use extractor::{EventExtractor, LineClassifier, NamePatternClassifier, TaggedClassifier};
pub use scheduler::{DrainState, ReplayScheduler, ReplayStep, ReplayView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultingHp {
    pub for_side: Side,
    pub value: u32,
}

/// 새 로그 한 줄에서 만들어진 연출 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationEvent {
    pub acting_side: Side,
    pub kind: EventKind,
    pub resulting_hp: ResultingHp,
}

impl AnimationEvent {
    /// `acting_side` 가 상대를 공격한 이벤트. 결과 HP는 추출 시점의 스냅샷 값이다.
    pub fn attack(acting_side: Side, snapshot: &Snapshot) -> Self {
        let target = acting_side.opposite();
        Self {
            acting_side,
            kind: EventKind::Attack,
            resulting_hp: ResultingHp {
                for_side: target,
                value: snapshot.view(target).hp,
            },
        }
    }
}

/// 화면에 실제로 그려지는 HP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    pub player: u32,
    pub opponent: u32,
}

impl DisplayState {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            player: snapshot.player.hp,
            opponent: snapshot.opponent.hp,
        }
    }

    pub fn hp(&self, side: Side) -> u32 {
        match side {
            Side::Player => self.player,
            Side::Opponent => self.opponent,
        }
    }

    pub fn apply(&mut self, resulting: ResultingHp) {
        match resulting.for_side {
            Side::Player => self.player = resulting.value,
            Side::Opponent => self.opponent = resulting.value,
        }
    }
}
