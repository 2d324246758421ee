use serde::{Deserialize, Serialize};

// --- Shared enums ---

/// 전투에 참여하는 두 진영.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Opponent,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }
}

// --- Combatant reference data (세션 시작 시 한 번 설정) ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MoveDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub move_type: String,
    pub power: u32,
    pub class_: String,
    pub accuracy: u32,
    #[serde(default)]
    pub damage_class: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Stats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Combatant {
    pub name: String,
    pub sprite: String,
    #[serde(default)]
    pub types: Vec<String>,
    pub stats: Stats,
    pub moves: Vec<MoveDescriptor>,
}

impl Combatant {
    /// 서버 로그는 이름을 대문자로 기록한다.
    pub fn log_name(&self) -> String {
        self.name.to_uppercase()
    }
}

// --- Authoritative session state ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CombatantView {
    pub hp: u32,
    pub max_hp: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl CombatantView {
    pub fn full(max_hp: u32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            status: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Attack,
}

/// 로그 한 줄에 대응하는 구조화된 태그. 서버가 제공할 때만 존재한다.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogTag {
    pub acting_side: Side,
    pub target_side: Side,
    pub kind: EventKind,
}

/// 서버가 매 응답마다 통째로 돌려주는 세션 상태.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub player: CombatantView,
    pub opponent: CombatantView,
    pub turn: Side,
    pub log: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    /// `log`와 같은 인덱스로 정렬된 태그 목록 (선택 사항)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Option<LogTag>>,
}

impl Snapshot {
    pub fn view(&self, side: Side) -> &CombatantView {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }

    pub fn tag_at(&self, index: usize) -> Option<LogTag> {
        self.tags.get(index).copied().flatten()
    }
}

// --- Client to Server ---

pub const RANDOM_CHOICE: &str = "random";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StartSessionRequest {
    #[serde(rename = "player_pokemon")]
    pub player_combatant: String,
    pub opponent: String,
    pub difficulty: String,
}

impl StartSessionRequest {
    pub fn new(player_choice: impl Into<String>, opponent_choice: Option<String>) -> Self {
        Self {
            player_combatant: player_choice.into(),
            opponent: opponent_choice.unwrap_or_else(|| RANDOM_CHOICE.to_string()),
            difficulty: "normal".to_string(),
        }
    }

    pub fn random() -> Self {
        Self::new(RANDOM_CHOICE, None)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub move_id: String,
}

// --- Server to Client ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub player: Combatant,
    pub opponent: Combatant,
    pub turn: Side,
    pub log: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionResponse {
    pub state: Snapshot,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub name: String,
    #[serde(default)]
    pub sprite: String,
}

/// 에러 응답 본문 (`{"detail": "..."}`)
#[derive(Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_accepts_server_payload_without_optional_fields() {
        let raw = r#"{
            "player": {"hp": 120, "max_hp": 150},
            "opponent": {"hp": 90, "max_hp": 140, "status": null},
            "turn": "player",
            "log": ["Battle started! PIKACHU vs CHARIZARD"]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.turn, Side::Player);
        assert_eq!(snapshot.winner, None);
        assert!(snapshot.tags.is_empty());
        assert_eq!(snapshot.view(Side::Opponent).hp, 90);
        assert_eq!(snapshot.tag_at(0), None);
    }

    #[test]
    fn start_request_defaults_opponent_to_random() {
        let request = StartSessionRequest::new("pikachu", None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["player_pokemon"], "pikachu");
        assert_eq!(json["opponent"], "random");
        assert_eq!(json["difficulty"], "normal");
    }

    #[test]
    fn move_type_uses_wire_name() {
        let raw = r#"{"id":"thunderbolt","name":"thunderbolt","type":"electric",
                      "power":90,"class_":"special","accuracy":100}"#;
        let mv: MoveDescriptor = serde_json::from_str(raw).unwrap();
        assert_eq!(mv.move_type, "electric");
        assert_eq!(mv.damage_class, None);
    }
}
