use crate::{
    protocol::{MoveDescriptor, Side, Snapshot},
    replay::ReplayView,
    store::ActiveSession,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTier {
    Healthy,
    Wounded,
    Critical,
}

impl HealthTier {
    fn from_percent(percent: f32) -> Self {
        if percent < 25.0 {
            HealthTier::Critical
        } else if percent < 50.0 {
            HealthTier::Wounded
        } else {
            HealthTier::Healthy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnBadge {
    Go,
    Thinking,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
}

/// 한 쪽 전투원의 그려질 값
#[derive(Debug, Clone, PartialEq)]
pub struct CombatantPaint {
    pub name: String,
    pub sprite: String,
    pub hp: u32,
    pub max_hp: u32,
    pub percent: f32,
    pub tier: HealthTier,
    pub attacking: bool,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveLabel {
    pub key: Option<u8>,
    pub move_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaintFrame {
    pub player: CombatantPaint,
    pub opponent: CombatantPaint,
    pub badge: TurnBadge,
    pub outcome: Option<Outcome>,
    pub log: Vec<String>,
    pub moves: Vec<MoveLabel>,
}

/// 스냅샷 위에 리플레이 상태를 덮어 실제로 그릴 값을 만든다.
///
/// 표시 HP가 한 번도 초기화되지 않았다면 스냅샷의 HP를 그대로 쓴다.
/// HP 정수는 이벤트가 반영될 때만 한 단계씩 바뀐다.
pub fn reconcile(
    session: &ActiveSession,
    replay: &ReplayView,
    input_enabled: bool,
    max_shortcut: u8,
) -> PaintFrame {
    let snapshot = &session.snapshot;
    let identity = &session.identity;

    let paint = |side: Side| {
        let combatant = identity.combatant(side);
        let view = snapshot.view(side);
        let hp = displayed_hp(snapshot, replay, side);
        let percent = if view.max_hp == 0 {
            0.0
        } else {
            hp as f32 / view.max_hp as f32 * 100.0
        };
        CombatantPaint {
            name: combatant.name.clone(),
            sprite: combatant.sprite.clone(),
            hp,
            max_hp: view.max_hp,
            percent,
            tier: HealthTier::from_percent(percent),
            attacking: replay.attacking(side),
            status: view.status.clone(),
        }
    };

    PaintFrame {
        player: paint(Side::Player),
        opponent: paint(Side::Opponent),
        badge: badge(snapshot),
        outcome: snapshot.winner.map(|winner| match winner {
            Side::Player => Outcome::Victory,
            Side::Opponent => Outcome::Defeat,
        }),
        log: snapshot.log.clone(),
        moves: move_labels(&identity.player.moves, input_enabled, max_shortcut),
    }
}

pub fn displayed_hp(snapshot: &Snapshot, replay: &ReplayView, side: Side) -> u32 {
    match replay.display {
        Some(display) => display.hp(side),
        None => snapshot.view(side).hp,
    }
}

fn badge(snapshot: &Snapshot) -> TurnBadge {
    if snapshot.winner.is_some() {
        return TurnBadge::Finished;
    }
    match snapshot.turn {
        Side::Player => TurnBadge::Go,
        Side::Opponent => TurnBadge::Thinking,
    }
}

fn move_labels(moves: &[MoveDescriptor], input_enabled: bool, max_shortcut: u8) -> Vec<MoveLabel> {
    moves
        .iter()
        .enumerate()
        .map(|(index, mv)| {
            let key = (index < max_shortcut as usize && input_enabled).then(|| index as u8 + 1);
            let mut text = format!("{} ({}) POW {}", mv.name, mv.move_type, mv.power);
            if mv.accuracy < 100 {
                text.push_str(&format!(" ACC {}%", mv.accuracy));
            }
            MoveLabel {
                key,
                move_id: mv.id.clone(),
                text,
            }
        })
        .collect()
}

impl std::fmt::Display for PaintFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let badge = match self.badge {
            TurnBadge::Go => "GO!",
            TurnBadge::Thinking => "Thinking...",
            TurnBadge::Finished => "FINISHED!",
        };
        writeln!(f, "=== BATTLE [{}] ===", badge)?;
        for paint in [&self.player, &self.opponent] {
            writeln!(
                f,
                "{}{:<12} HP {:>4}/{:<4} {:>3.0}% {:?}",
                if paint.attacking { "* " } else { "  " },
                paint.name.to_uppercase(),
                paint.hp,
                paint.max_hp,
                paint.percent,
                paint.tier
            )?;
        }
        if let Some(last) = self.log.last() {
            writeln!(f, "> {}", last)?;
        }
        for label in &self.moves {
            match label.key {
                Some(key) => writeln!(f, "  [{}] {}", key, label.text)?,
                None => writeln!(f, "      {}", label.text)?,
            }
        }
        match self.outcome {
            Some(Outcome::Victory) => writeln!(f, "VICTORY! You defeated your opponent!")?,
            Some(Outcome::Defeat) => writeln!(f, "DEFEAT! Try again, Trainer!")?,
            None => {}
        }
        Ok(())
    }
}
