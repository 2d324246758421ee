#![allow(dead_code)]

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use battle_replay::{
    api::BattleApi,
    error::ClientError,
    protocol::{
        Combatant, CombatantView, MoveDescriptor, Side, Snapshot, StartSessionRequest,
        StartSessionResponse, Stats, Suggestion,
    },
};
use parking_lot::Mutex;

pub const PLAYER_MAX_HP: u32 = 150;
pub const OPPONENT_MAX_HP: u32 = 140;
pub const INTRO: &str = "Battle started! PIKACHU vs CHARIZARD";

pub fn combatant(name: &str, hp: u32, moves: &[&str]) -> Combatant {
    Combatant {
        name: name.to_string(),
        sprite: format!("https://sprites.example/{}.gif", name),
        types: vec!["electric".to_string()],
        stats: Stats {
            hp,
            attack: 55,
            defense: 40,
            sp_attack: 50,
            sp_defense: 50,
            speed: 90,
        },
        moves: moves
            .iter()
            .map(|id| MoveDescriptor {
                id: id.to_string(),
                name: id.to_string(),
                move_type: "electric".to_string(),
                power: 90,
                class_: "special".to_string(),
                accuracy: 100,
                damage_class: Some("special".to_string()),
            })
            .collect(),
    }
}

pub fn started(session_id: &str) -> StartSessionResponse {
    StartSessionResponse {
        session_id: session_id.to_string(),
        player: combatant(
            "pikachu",
            PLAYER_MAX_HP,
            &["thunderbolt", "quick-attack", "iron-tail", "thunder"],
        ),
        opponent: combatant(
            "charizard",
            OPPONENT_MAX_HP,
            &["flamethrower", "wing-attack", "slash", "ember"],
        ),
        turn: Side::Player,
        log: vec![INTRO.to_string()],
    }
}

/// 인트로 뒤에 `lines` 가 붙은 스냅샷
pub fn snapshot(lines: &[&str], player_hp: u32, opponent_hp: u32) -> Snapshot {
    let mut log = vec![INTRO.to_string()];
    log.extend(lines.iter().map(|line| line.to_string()));
    Snapshot {
        player: CombatantView {
            hp: player_hp,
            max_hp: PLAYER_MAX_HP,
            status: None,
        },
        opponent: CombatantView {
            hp: opponent_hp,
            max_hp: OPPONENT_MAX_HP,
            status: None,
        },
        turn: Side::Player,
        log,
        winner: None,
        tags: Vec::new(),
    }
}

/// 미리 준비한 응답을 순서대로 돌려주는 가짜 전투 서버.
#[derive(Default)]
pub struct ScriptedApi {
    pub starts: Mutex<VecDeque<Result<StartSessionResponse, String>>>,
    pub actions: Mutex<VecDeque<Result<Snapshot, String>>>,
    pub submitted: Mutex<Vec<(String, String)>>,
    pub action_delay: Option<Duration>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action_delay(mut self, delay: Duration) -> Self {
        self.action_delay = Some(delay);
        self
    }

    pub fn push_start(&self, response: Result<StartSessionResponse, String>) {
        self.starts.lock().push_back(response);
    }

    pub fn push_action(&self, response: Result<Snapshot, String>) {
        self.actions.lock().push_back(response);
    }

    pub fn submitted(&self) -> Vec<(String, String)> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl BattleApi for ScriptedApi {
    async fn start_session(
        &self,
        _request: StartSessionRequest,
    ) -> Result<StartSessionResponse, ClientError> {
        let next = self.starts.lock().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(detail)) => Err(ClientError::Request(detail)),
            None => Err(ClientError::Request("no scripted session".to_string())),
        }
    }

    async fn submit_action(
        &self,
        session_id: &str,
        move_id: &str,
    ) -> Result<Snapshot, ClientError> {
        self.submitted
            .lock()
            .push((session_id.to_string(), move_id.to_string()));
        if let Some(delay) = self.action_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.actions.lock().pop_front();
        match next {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(detail)) => Err(ClientError::Request(detail)),
            None => Err(ClientError::Request("no scripted action".to_string())),
        }
    }

    async fn search_combatants(&self, query: &str) -> Result<Vec<Suggestion>, ClientError> {
        Ok(["pikachu", "pichu"]
            .iter()
            .filter(|name| name.starts_with(query))
            .map(|name| Suggestion {
                name: name.to_string(),
                sprite: format!("https://sprites.example/{}.gif", name),
            })
            .collect())
    }
}
