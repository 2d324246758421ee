use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    env::ServerSettings,
    error::ClientError,
    protocol::{
        ActionRequest, ActionResponse, ErrorBody, Snapshot, StartSessionRequest,
        StartSessionResponse, Suggestion,
    },
};

/// 전투 서버. 데미지 계산, 상성, AI 선택은 모두 서버 쪽 일이다.
#[async_trait]
pub trait BattleApi: Send + Sync {
    async fn start_session(
        &self,
        request: StartSessionRequest,
    ) -> Result<StartSessionResponse, ClientError>;

    /// 행동 처리 후의 전체 스냅샷을 돌려준다 (델타가 아님).
    async fn submit_action(&self, session_id: &str, move_id: &str)
        -> Result<Snapshot, ClientError>;

    async fn search_combatants(&self, query: &str) -> Result<Vec<Suggestion>, ClientError>;
}

pub struct HttpBattleApi {
    http_client: Client,
    base_url: String,
}

impl HttpBattleApi {
    pub fn new(settings: &ServerSettings) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 실패 응답이면 서버의 `detail` 을, 없으면 상태 코드를 메시지로 쓴다.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error_body) => error_body.detail,
                Err(_) => format!("Request failed with status {}", status),
            };
            warn!("Battle server returned {}: {}", status, message);
            return Err(ClientError::Request(message));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl BattleApi for HttpBattleApi {
    async fn start_session(
        &self,
        request: StartSessionRequest,
    ) -> Result<StartSessionResponse, ClientError> {
        debug!("POST /api/session {:?}", request);
        let response = self
            .http_client
            .post(self.url("/api/session"))
            .json(&request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn submit_action(
        &self,
        session_id: &str,
        move_id: &str,
    ) -> Result<Snapshot, ClientError> {
        debug!("POST /api/session/{}/action move={}", session_id, move_id);
        let response = self
            .http_client
            .post(self.url(&format!("/api/session/{}/action", session_id)))
            .json(&ActionRequest {
                move_id: move_id.to_string(),
            })
            .send()
            .await?;
        let action: ActionResponse = Self::decode(response).await?;
        Ok(action.state)
    }

    async fn search_combatants(&self, query: &str) -> Result<Vec<Suggestion>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .http_client
            .get(self.url("/api/pokemon/search"))
            .query(&[("q", query), ("with_sprites", "true")])
            .send()
            .await?;
        Self::decode(response).await
    }
}
