use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{
        Criterion, Dessert, EventId, Participant, ParticipantId, Score, ScoreId, Settings,
        StatePatch,
    },
    error::ApiError,
    lenient,
};

/// Frames pushed over the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    Update(StatePatch),
    StateUpdate(StatePatch),
    Error(ApiError),
}

impl ServerEvent {
    pub fn into_patch(self) -> Option<StatePatch> {
        match self {
            ServerEvent::Update(patch) | ServerEvent::StateUpdate(patch) => Some(patch),
            ServerEvent::Error(_) => None,
        }
    }
}

/// Responses that may carry `{success: false, error}` with a 2xx status.
pub trait Acknowledged {
    fn rejection(&self) -> Option<String>;
}

macro_rules! acknowledged {
    ($name:ident) => {
        impl Acknowledged for $name {
            fn rejection(&self) -> Option<String> {
                match (&self.error, self.success) {
                    (Some(error), _) => Some(error.clone()),
                    (None, Some(false)) => Some("request was not accepted".to_string()),
                    _ => None,
                }
            }
        }
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub participant_id: ParticipantId,
    pub judge_name: String,
    pub criteria: BTreeMap<String, f64>,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub score_id: Option<ScoreId>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertParticipantRequest {
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub participant: Option<Participant>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertDessertRequest {
    pub participant_id: ParticipantId,
    pub dessert_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// Partial settings change; absent fields are left alone server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_multiple_scores_per_judge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Vec<Criterion>>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

acknowledged!(ScoreResponse);
acknowledged!(AckResponse);
acknowledged!(AuthResponse);
acknowledged!(ParticipantResponse);
acknowledged!(BackupResponse);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventsQuery {
    pub limit: u32,
}

/// Full dump produced by `/api/admin/export` and accepted by `/api/admin/import`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub desserts: Vec<Dessert>,
    #[serde(default)]
    pub scores: Vec<Score>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    #[default]
    Replace,
    Merge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    pub mode: ImportMode,
    pub data: ExportBundle,
}
