// 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("No active battle session")]
    SessionAbsent,
    #[error("{0}")]
    Request(String),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid combatant choice: {0}")]
    InvalidChoice(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl ClientError {
    /// 사용자에게 그대로 보여줄 메시지
    pub fn user_message(&self) -> String {
        match self {
            Self::Request(detail) => detail.clone(),
            other => other.to_string(),
        }
    }
}
