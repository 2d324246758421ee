use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub server: ServerSettings,
    pub replay: ReplaySettings,
    pub gate: GateSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ClientError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::for_mode(&run_mode)
    }

    pub fn for_mode(run_mode: &str) -> Result<Self, ClientError> {
        let s = Config::builder()
            // 기본값
            .add_source(Config::try_from(&Self::default())?)
            // 실행 모드별 설정 파일 (e.g., config/development.toml). 없어도 됨
            .add_source(
                File::with_name(&format!("config/{}", run_mode))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            // 환경 변수 오버라이드 (e.g., APP__REPLAY__STEP_MS=500)
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;
        debug!("Loaded configuration for RUN_MODE {}: {:?}", run_mode, settings);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        self.replay.validate()?;
        if self.gate.max_shortcut == 0 || self.gate.max_shortcut > 9 {
            return Err(ClientError::InvalidSettings(format!(
                "gate.max_shortcut must be 1~9, got {}",
                self.gate.max_shortcut
            )));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings {
                level: "info".to_string(),
                directory: "logs".to_string(),
                filename: "battle_replay.log".to_string(),
            },
            server: ServerSettings {
                base_url: "http://localhost:8000".to_string(),
                request_timeout_ms: 10_000,
            },
            replay: ReplaySettings::default(),
            gate: GateSettings::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub directory: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// 리플레이 연출 타이밍
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySettings {
    /// 공격 하이라이트가 켜져 있는 시간
    pub flash_ms: u64,
    /// 이벤트 하나가 점유하는 전체 시간 (flash 포함)
    pub step_ms: u64,
}

impl ReplaySettings {
    pub fn flash(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.flash_ms == 0 || self.step_ms == 0 {
            return Err(ClientError::InvalidSettings(
                "replay.flash_ms and replay.step_ms must be positive".to_string(),
            ));
        }
        if self.step_ms < self.flash_ms {
            return Err(ClientError::InvalidSettings(format!(
                "replay.step_ms ({}) must not be shorter than replay.flash_ms ({})",
                self.step_ms, self.flash_ms
            )));
        }
        Ok(())
    }
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            flash_ms: 800,
            step_ms: 900,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct GateSettings {
    /// true 이면 리플레이가 끝날 때까지 입력을 막는다.
    pub block_during_replay: bool,
    /// 단축키로 쓸 수 있는 최대 숫자 (1..=max_shortcut)
    pub max_shortcut: u8,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            block_during_replay: false,
            max_shortcut: 4,
        }
    }
}
