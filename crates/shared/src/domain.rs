use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::lenient;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ParticipantId);
id_newtype!(DessertId);
id_newtype!(ScoreId);
id_newtype!(EventId);

pub const DEFAULT_COMPETITION_NAME: &str = "2025 Holiday Bakeoff";

/// Roster the first prototype shipped with, used when seeding an empty competition.
pub const DEFAULT_ROSTER: [&str; 8] = [
    "Yesenia", "Bryan", "Lindsay", "Javier", "Vivana", "Bernie", "Daniella", "Rogelio",
];

pub const PLACEHOLDER_DESSERT: &str = "TBD";

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

fn default_max() -> f64 {
    10.0
}

fn default_competition_name() -> String {
    DEFAULT_COMPETITION_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(deserialize_with = "lenient::id")]
    pub id: ParticipantId,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, alias = "description", skip_serializing_if = "Option::is_none")]
    pub dessert: Option<String>,
    #[serde(default = "default_true", deserialize_with = "lenient::boolean")]
    pub active: bool,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dessert {
    #[serde(
        default,
        deserialize_with = "lenient::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<DessertId>,
    #[serde(deserialize_with = "lenient::id")]
    pub participant_id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
    pub dessert_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// One judge's ballot for one participant.
///
/// Criterion values and the total are kept as raw JSON: the aggregator decides
/// how to read them, so a malformed ballot never stops a snapshot from loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(
        default,
        deserialize_with = "lenient::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<ScoreId>,
    /// `None` when the ballot carried no usable id; such ballots are matched
    /// by `participant_name` instead.
    #[serde(
        default,
        alias = "participantId",
        deserialize_with = "lenient::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub participant_id: Option<ParticipantId>,
    #[serde(
        default,
        alias = "participant",
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub participant_name: Option<String>,
    #[serde(default, alias = "judge", deserialize_with = "lenient::string")]
    pub judge_name: String,
    #[serde(default, deserialize_with = "lenient::object")]
    pub criteria: BTreeMap<String, Value>,
    #[serde(default, alias = "score", skip_serializing_if = "Option::is_none")]
    pub total: Option<Value>,
    #[serde(default, alias = "comments", deserialize_with = "lenient::string")]
    pub comment: String,
    #[serde(
        default,
        alias = "createdAt",
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub key: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub label: String,
    #[serde(default = "default_max", deserialize_with = "lenient::float")]
    pub max: f64,
    #[serde(default = "default_weight", deserialize_with = "lenient::float")]
    pub weight: f64,
}

impl Criterion {
    pub fn new(key: &str, label: &str, max: f64) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            max,
            weight: 1.0,
        }
    }
}

pub fn default_criteria() -> Vec<Criterion> {
    vec![
        Criterion::new("taste", "Taste", 10.0),
        Criterion::new("presentation", "Presentation", 10.0),
        Criterion::new("creativity", "Creativity", 10.0),
        Criterion::new("holiday_spirit", "Holiday Spirit", 10.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_competition_name", alias = "competitionName")]
    pub competition_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(
        default = "default_true",
        alias = "votingOpen",
        deserialize_with = "lenient::boolean"
    )]
    pub voting_open: bool,
    #[serde(
        default,
        alias = "allowMultipleScoresPerJudge",
        deserialize_with = "lenient::boolean"
    )]
    pub allow_multiple_scores_per_judge: bool,
    #[serde(default = "default_criteria", deserialize_with = "lenient::list")]
    pub criteria: Vec<Criterion>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            competition_name: default_competition_name(),
            theme: None,
            voting_open: true,
            allow_multiple_scores_per_judge: false,
            criteria: default_criteria(),
        }
    }
}

impl Settings {
    pub fn criterion(&self, key: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.key == key)
    }
}

/// Everything `GET /api/state` returns. Treated as immutable once received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default, deserialize_with = "roster")]
    pub participants: Vec<Participant>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub scores: Vec<Score>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub desserts: Vec<Dessert>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub settings: Settings,
}

impl StateSnapshot {
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_by_name(&self, name: &str) -> Option<&Participant> {
        let name = name.trim();
        self.participants.iter().find(|p| p.name == name)
    }

    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.active)
    }

    pub fn dessert_for(&self, participant_id: ParticipantId) -> Option<&Dessert> {
        self.desserts
            .iter()
            .find(|d| d.participant_id == participant_id)
    }

    /// The participant a ballot is for: by id when it has one, otherwise by name.
    pub fn score_participant(&self, score: &Score) -> Option<&Participant> {
        match (score.participant_id, score.participant_name.as_deref()) {
            (Some(id), _) => self.participant(id),
            (None, Some(name)) => self.participant_by_name(name),
            (None, None) => None,
        }
    }

    pub fn judge_has_scored(&self, judge_name: &str, participant_id: ParticipantId) -> bool {
        let judge_name = judge_name.trim();
        self.scores.iter().any(|s| {
            s.judge_name.trim() == judge_name
                && self.score_participant(s).map(|p| p.id) == Some(participant_id)
        })
    }

    /// Returns a new snapshot with every field present in `patch` replaced.
    pub fn merged(&self, patch: StatePatch) -> StateSnapshot {
        StateSnapshot {
            participants: patch
                .participants
                .unwrap_or_else(|| self.participants.clone()),
            scores: patch.scores.unwrap_or_else(|| self.scores.clone()),
            desserts: patch.desserts.unwrap_or_else(|| self.desserts.clone()),
            settings: patch.settings.unwrap_or_else(|| self.settings.clone()),
        }
    }
}

/// A realtime push. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    #[serde(
        default,
        deserialize_with = "optional_roster",
        skip_serializing_if = "Option::is_none"
    )]
    pub participants: Option<Vec<Participant>>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub scores: Option<Vec<Score>>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub desserts: Option<Vec<Dessert>>,
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub settings: Option<Settings>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        self.participants.is_none()
            && self.scores.is_none()
            && self.desserts.is_none()
            && self.settings.is_none()
    }
}

fn roster<'de, D>(deserializer: D) -> Result<Vec<Participant>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_roster(deserializer)?.unwrap_or_default())
}

fn optional_roster<'de, D>(deserializer: D) -> Result<Option<Vec<Participant>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(entries) => Some(number_participants(entries)),
        _ => None,
    })
}

/// Decodes a roster, giving entries without a usable id the next free id in
/// input order. The first app stored its bakers by name only.
fn number_participants(entries: Vec<Value>) -> Vec<Participant> {
    let mut next = entries
        .iter()
        .filter_map(|entry| entry.get("id").and_then(lenient::parse_id))
        .max()
        .unwrap_or(0)
        .max(0);
    entries
        .into_iter()
        .filter_map(|mut entry| {
            let fields = entry.as_object_mut()?;
            if fields.get("id").and_then(lenient::parse_id).is_none() {
                next = next.checked_add(1)?;
                fields.insert("id".to_string(), Value::from(next));
            }
            serde_json::from_value(entry).ok()
        })
        .collect()
}

impl From<StateSnapshot> for StatePatch {
    fn from(value: StateSnapshot) -> Self {
        Self {
            participants: Some(value.participants),
            scores: Some(value.scores),
            desserts: Some(value.desserts),
            settings: Some(value.settings),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn snapshot_tolerates_legacy_and_sqlite_shapes() {
        let raw = json!({
            "participants": [
                {"id": 1, "name": "Yesenia", "dessert": "Flan", "active": 1},
                {"id": 2, "name": "Bryan", "active": "false", "created_at": "2025-12-01T18:00:00.000000+00:00"}
            ],
            "scores": [
                {"participantId": 1, "judge": "Ana", "criteria": {"taste": "9"}, "total": 9},
                {"participant_id": 2, "judge_name": "Luis", "criteria": null, "comment": null}
            ],
            "settings": {"competition_name": "Cookie Clash", "voting_open": "0"}
        });

        let snapshot: StateSnapshot = serde_json::from_value(raw).expect("snapshot");
        assert!(snapshot.participants[0].active);
        assert!(!snapshot.participants[1].active);
        assert!(snapshot.participants[1].created_at.is_some());
        assert_eq!(snapshot.scores[0].judge_name, "Ana");
        assert!(snapshot.scores[1].criteria.is_empty());
        assert_eq!(snapshot.scores[1].comment, "");
        assert!(!snapshot.settings.voting_open);
        assert_eq!(snapshot.settings.criteria, default_criteria());
        assert!(snapshot.desserts.is_empty());
    }

    #[test]
    fn malformed_ids_never_fail_the_snapshot() {
        let snapshot: StateSnapshot = serde_json::from_value(json!({
            "participants": [
                {"id": "1", "name": "A"},
                {"id": 2.0, "name": "B"},
                {"id": 3}
            ],
            "scores": [
                {"participant_id": 1, "total": 8},
                {"participant_id": "1", "total": 6},
                {"participant_id": "one", "total": 5},
                {"id": "x", "total": 4}
            ],
            "desserts": [
                {"participant_id": "2", "dessert_name": "Churros"},
                {"participant_id": null, "dessert_name": "Mystery"}
            ],
            "settings": {"criteria": [{"key": "taste", "label": "Taste"}, {"label": "no key"}]}
        }))
        .expect("snapshot");

        let ids: Vec<ParticipantId> = snapshot.participants.iter().map(|p| p.id).collect();
        assert_eq!(ids, [ParticipantId(1), ParticipantId(2)]);
        assert_eq!(snapshot.scores.len(), 4);
        assert_eq!(snapshot.scores[1].participant_id, Some(ParticipantId(1)));
        assert_eq!(snapshot.scores[2].participant_id, None);
        assert_eq!(snapshot.scores[3].id, None);
        assert_eq!(snapshot.desserts.len(), 1);
        assert_eq!(snapshot.desserts[0].participant_id, ParticipantId(2));
        assert_eq!(snapshot.settings.criteria, [Criterion::new("taste", "Taste", 10.0)]);
    }

    #[test]
    fn first_app_shape_gets_positional_ids() {
        let snapshot: StateSnapshot = serde_json::from_value(json!({
            "participants": [
                {"name": "Yesenia", "dessert": "TBD", "active": true},
                {"name": "Bryan", "dessert": "TBD", "active": true}
            ],
            "scores": [{"judge": "Ana", "participant": "Yesenia", "score": "9"}]
        }))
        .expect("snapshot");

        assert_eq!(snapshot.participants[0].id, ParticipantId(1));
        assert_eq!(snapshot.participants[1].id, ParticipantId(2));
        let score = &snapshot.scores[0];
        assert_eq!(score.participant_id, None);
        assert_eq!(score.participant_name.as_deref(), Some("Yesenia"));
        assert_eq!(score.total, Some(json!("9")));
        assert_eq!(score.judge_name, "Ana");
        assert_eq!(
            snapshot.score_participant(score).map(|p| p.id),
            Some(ParticipantId(1))
        );
        assert!(snapshot.judge_has_scored("Ana", ParticipantId(1)));
    }

    #[test]
    fn missing_ids_continue_after_the_highest_known_one() {
        let snapshot: StateSnapshot = serde_json::from_value(json!({
            "participants": [{"name": "New"}, {"id": 7, "name": "Old"}, {"id": "bad", "name": "Other"}]
        }))
        .expect("snapshot");

        let ids: Vec<i64> = snapshot.participants.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, [8, 7, 9]);
    }

    #[test]
    fn patch_with_bad_fields_still_applies() {
        let patch: StatePatch = serde_json::from_value(json!({
            "scores": [{"participant_id": "3", "total": 9}],
            "settings": "garbled"
        }))
        .expect("patch");

        assert_eq!(
            patch.scores.expect("scores")[0].participant_id,
            Some(ParticipantId(3))
        );
        assert!(patch.settings.is_none());
        assert!(patch.participants.is_none());
    }

    #[test]
    fn judge_lookup_ignores_surrounding_whitespace() {
        let snapshot: StateSnapshot = serde_json::from_value(json!({
            "participants": [{"id": 3, "name": "Lindsay"}],
            "scores": [{"participant_id": 3, "judge_name": "Ana "}]
        }))
        .expect("snapshot");

        assert!(snapshot.judge_has_scored(" Ana", ParticipantId(3)));
        assert!(!snapshot.judge_has_scored("ana", ParticipantId(3)));
        assert!(!snapshot.judge_has_scored("Ana", ParticipantId(4)));
    }

    #[test]
    fn merged_replaces_only_present_fields() {
        let base: StateSnapshot = serde_json::from_value(json!({
            "participants": [{"id": 1, "name": "Javier"}],
            "scores": [{"participant_id": 1, "judge_name": "Ana", "total": 5}]
        }))
        .expect("snapshot");

        let patch = StatePatch {
            scores: Some(Vec::new()),
            ..StatePatch::default()
        };
        let next = base.merged(patch);
        assert_eq!(next.participants, base.participants);
        assert!(next.scores.is_empty());
        assert_eq!(next.settings, base.settings);
    }
}
