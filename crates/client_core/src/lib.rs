use async_trait::async_trait;
use leaderboard::{aggregate_with_criteria, merge_desserts, LeaderboardRow};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Participant, ParticipantId, ScoreId, StateSnapshot},
    error::ApiError,
    protocol::{
        AckResponse, Acknowledged, AuthRequest, AuthResponse, BackupResponse, EventRecord,
        EventsQuery, ExportBundle, ImportMode, ImportRequest, ParticipantResponse,
        ScoreResponse, ScoreSubmission, SetActiveRequest, SettingsUpdate,
        UpsertDessertRequest, UpsertParticipantRequest,
    },
};
use tracing::{info, warn};
use url::Url;

pub mod config;
pub mod error;
pub mod realtime;
pub mod snapshot;
pub mod status;
pub mod validation;

use config::{ClientConfig, ScoreEndpoint};
use error::ClientError;
use snapshot::StateSource;

/// Ranks the participants of a snapshot, with desserts and weights applied.
pub fn rank(snapshot: &StateSnapshot) -> Vec<LeaderboardRow> {
    let participants = merge_desserts(&snapshot.participants, &snapshot.desserts);
    aggregate_with_criteria(
        &participants,
        &snapshot.scores,
        &snapshot.settings.criteria,
    )
}

/// REST client for the bakeoff API.
pub struct BakeoffClient {
    http: Client,
    base: Url,
    score_endpoint: ScoreEndpoint,
    realtime_path: String,
    admin_token: Option<String>,
}

impl BakeoffClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(server_url.trim())?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "server_url must start with http:// or https://: {server_url}"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
            score_endpoint: ScoreEndpoint::default(),
            realtime_path: ClientConfig::default().realtime_path,
            admin_token: None,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut client = Self::new(&config.server_url)?;
        client.score_endpoint = config.score_endpoint;
        client.realtime_path = config.realtime_path.clone();
        client.admin_token = config.admin_token.clone();
        Ok(client)
    }

    pub fn server_url(&self) -> &Url {
        &self.base
    }

    pub fn realtime_url(&self) -> Result<Url, ClientError> {
        realtime::websocket_url(&self.base, &self.realtime_path)
    }

    pub fn has_admin_token(&self) -> bool {
        self.admin_token.is_some()
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    pub async fn fetch_state(&self) -> Result<StateSnapshot, ClientError> {
        let request = self.http.get(self.url("api/state")?);
        self.send(request).await
    }

    pub async fn submit_score(
        &self,
        submission: &ScoreSubmission,
    ) -> Result<ScoreResponse, ClientError> {
        let request = self
            .http
            .post(self.url(self.score_endpoint.path())?)
            .json(submission);
        let response: ScoreResponse = self.acknowledged(request).await?;
        info!(
            participant_id = submission.participant_id.0,
            judge = %submission.judge_name,
            total = ?response.total,
            "score submitted"
        );
        Ok(response)
    }

    /// Overwrites the whole roster in one call, as the first admin page did.
    pub async fn replace_participants(&self, participants: &[Participant]) -> Result<(), ClientError> {
        let request = self
            .http
            .post(self.url("api/participants")?)
            .json(participants);
        let _: AckResponse = self.acknowledged(request).await?;
        Ok(())
    }

    pub async fn authenticate(&mut self, password: &str) -> Result<(), ClientError> {
        let request = self
            .http
            .post(self.url("api/admin/auth")?)
            .json(&AuthRequest {
                password: password.to_string(),
            });
        let response: AuthResponse = self.acknowledged(request).await?;
        if response.token.is_none() {
            warn!("admin auth succeeded without a token; relying on server session");
        }
        self.admin_token = response.token;
        Ok(())
    }

    pub async fn upsert_participant(
        &self,
        name: &str,
        active: bool,
    ) -> Result<Option<Participant>, ClientError> {
        let body = UpsertParticipantRequest {
            name: validation::validate_participant_name(name)?,
            active,
        };
        let request = self.admin(Method::POST, "api/admin/participants")?.json(&body);
        let response: ParticipantResponse = self.acknowledged(request).await?;
        Ok(response.participant)
    }

    pub async fn set_participant_active(
        &self,
        participant_id: ParticipantId,
        active: bool,
    ) -> Result<(), ClientError> {
        let path = format!("api/admin/participants/{participant_id}/active");
        let request = self
            .admin(Method::POST, &path)?
            .json(&SetActiveRequest { active });
        let _: AckResponse = self.acknowledged(request).await?;
        Ok(())
    }

    pub async fn delete_participant(&self, participant_id: ParticipantId) -> Result<(), ClientError> {
        let path = format!("api/admin/participants/{participant_id}");
        let _: AckResponse = self.acknowledged(self.admin(Method::DELETE, &path)?).await?;
        Ok(())
    }

    pub async fn upsert_dessert(&self, dessert: &UpsertDessertRequest) -> Result<(), ClientError> {
        let request = self.admin(Method::POST, "api/admin/desserts")?.json(dessert);
        let _: AckResponse = self.acknowledged(request).await?;
        Ok(())
    }

    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<(), ClientError> {
        validation::validate_settings_update(update)?;
        let request = self.admin(Method::POST, "api/admin/settings")?.json(update);
        let _: AckResponse = self.acknowledged(request).await?;
        Ok(())
    }

    pub async fn delete_score(&self, score_id: ScoreId) -> Result<(), ClientError> {
        let path = format!("api/admin/scores/{score_id}");
        let _: AckResponse = self.acknowledged(self.admin(Method::DELETE, &path)?).await?;
        Ok(())
    }

    pub async fn list_events(&self, limit: u32) -> Result<Vec<EventRecord>, ClientError> {
        let request = self
            .admin(Method::GET, "api/admin/events")?
            .query(&EventsQuery { limit });
        self.send(request).await
    }

    pub async fn export(&self) -> Result<ExportBundle, ClientError> {
        self.send(self.admin(Method::GET, "api/admin/export")?).await
    }

    pub async fn backup(&self) -> Result<BackupResponse, ClientError> {
        self.acknowledged(self.admin(Method::POST, "api/admin/backup")?)
            .await
    }

    pub async fn import(&self, mode: ImportMode, data: ExportBundle) -> Result<(), ClientError> {
        let request = self
            .admin(Method::POST, "api/admin/import")?
            .json(&ImportRequest { mode, data });
        let _: AckResponse = self.acknowledged(request).await?;
        Ok(())
    }

    pub async fn reset(&self) -> Result<(), ClientError> {
        let _: AckResponse = self
            .acknowledged(self.admin(Method::POST, "api/admin/reset")?)
            .await?;
        Ok(())
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    fn admin(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let request = self.http.request(method, self.url(path)?);
        Ok(match &self.admin_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let body = checked_body(response).await?;
        serde_json::from_slice(&body).map_err(ClientError::Decode)
    }

    async fn acknowledged<T>(&self, request: RequestBuilder) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Acknowledged + Default,
    {
        let response = request.send().await?;
        let body = checked_body(response).await?;
        let parsed: T = if body.iter().all(u8::is_ascii_whitespace) {
            T::default()
        } else {
            serde_json::from_slice(&body).map_err(ClientError::Decode)?
        };
        match parsed.rejection() {
            Some(message) => Err(ClientError::Rejected(message)),
            None => Ok(parsed),
        }
    }
}

#[async_trait]
impl StateSource for BakeoffClient {
    async fn fetch_state(&self) -> Result<StateSnapshot, ClientError> {
        BakeoffClient::fetch_state(self).await
    }
}

async fn checked_body(response: Response) -> Result<Vec<u8>, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        return Ok(body.to_vec());
    }
    Err(ClientError::Status {
        status: status.as_u16(),
        message: error_message(status.canonical_reason(), &body),
    })
}

fn error_message(reason: Option<&str>, body: &[u8]) -> String {
    if let Ok(err) = serde_json::from_slice::<ApiError>(body) {
        return err.message;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        text.chars().take(200).collect()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
