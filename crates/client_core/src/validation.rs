//! Checks run before anything is sent to the server.
//!
//! The server enforces the same rules; running them locally lets the voting
//! page say why a ballot is refused without a round trip.

use std::collections::{BTreeMap, HashSet};

use shared::{
    domain::{Criterion, ParticipantId, StateSnapshot},
    protocol::{ExportBundle, ScoreSubmission, SettingsUpdate, UpsertDessertRequest},
};

use crate::error::ClientError;

#[derive(Debug, Clone, Default)]
pub struct BallotDraft {
    pub judge_name: String,
    pub participant: Option<ParticipantId>,
    pub criteria: BTreeMap<String, f64>,
    pub comment: String,
}

pub fn validate_ballot(
    snapshot: &StateSnapshot,
    draft: BallotDraft,
) -> Result<ScoreSubmission, ClientError> {
    let settings = &snapshot.settings;
    if !settings.voting_open {
        return Err(ClientError::validation("Voting is currently closed."));
    }

    let judge_name = draft.judge_name.trim();
    if judge_name.is_empty() {
        return Err(ClientError::validation("Judge name required."));
    }

    let participant_id = draft
        .participant
        .ok_or_else(|| ClientError::validation("Choose a participant to score."))?;
    let participant = snapshot
        .participant(participant_id)
        .ok_or_else(|| ClientError::validation(format!("Unknown participant {participant_id}.")))?;
    if !participant.active {
        return Err(ClientError::validation(format!(
            "{} is not accepting scores.",
            participant.name
        )));
    }

    for key in draft.criteria.keys() {
        if settings.criterion(key).is_none() {
            return Err(ClientError::validation(format!("Unknown criterion '{key}'.")));
        }
    }
    for criterion in &settings.criteria {
        let value = draft
            .criteria
            .get(&criterion.key)
            .copied()
            .ok_or_else(|| ClientError::validation(format!("Missing score for {}.", criterion.label)))?;
        if !value.is_finite() || value < 0.0 || value > criterion.max {
            return Err(ClientError::validation(format!(
                "{} must be between 0 and {}.",
                criterion.label, criterion.max
            )));
        }
    }

    if !settings.allow_multiple_scores_per_judge
        && snapshot.judge_has_scored(judge_name, participant_id)
    {
        return Err(ClientError::validation("You already scored this participant."));
    }

    let total = draft.criteria.values().sum::<f64>() + 0.0;
    Ok(ScoreSubmission {
        participant_id,
        judge_name: judge_name.to_string(),
        criteria: draft.criteria,
        comment: draft.comment.trim().to_string(),
        total: Some(total),
    })
}

pub fn validate_participant_name(name: &str) -> Result<String, ClientError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::validation("Participant name required."));
    }
    Ok(name.to_string())
}

pub fn validate_dessert(
    participant_id: ParticipantId,
    dessert_name: &str,
    description: &str,
    category: &str,
) -> Result<UpsertDessertRequest, ClientError> {
    let dessert_name = dessert_name.trim();
    if dessert_name.is_empty() {
        return Err(ClientError::validation("Dessert name required."));
    }
    Ok(UpsertDessertRequest {
        participant_id,
        dessert_name: dessert_name.to_string(),
        description: description.trim().to_string(),
        category: category.trim().to_string(),
    })
}

/// Parses an export file the admin pasted or pointed at.
pub fn parse_import(raw: &str) -> Result<ExportBundle, ClientError> {
    serde_json::from_str(raw).map_err(ClientError::MalformedInput)
}

/// Parses the criteria JSON typed into the settings form.
pub fn parse_criteria(raw: &str) -> Result<Vec<Criterion>, ClientError> {
    let criteria: Vec<Criterion> = serde_json::from_str(raw).map_err(ClientError::MalformedInput)?;
    if criteria.is_empty() {
        return Err(ClientError::validation("At least one criterion is required."));
    }

    let mut seen = HashSet::new();
    for criterion in &criteria {
        if criterion.key.trim().is_empty() {
            return Err(ClientError::validation("Criterion keys must not be empty."));
        }
        if !seen.insert(criterion.key.as_str()) {
            return Err(ClientError::validation(format!(
                "Duplicate criterion '{}'.",
                criterion.key
            )));
        }
        if !(criterion.max.is_finite() && criterion.max > 0.0) {
            return Err(ClientError::validation(format!(
                "Criterion '{}' needs a positive max.",
                criterion.key
            )));
        }
        if !(criterion.weight.is_finite() && criterion.weight >= 0.0) {
            return Err(ClientError::validation(format!(
                "Criterion '{}' needs a non-negative weight.",
                criterion.key
            )));
        }
    }
    Ok(criteria)
}

pub fn validate_settings_update(update: &SettingsUpdate) -> Result<(), ClientError> {
    if update.is_empty() {
        return Err(ClientError::validation("Nothing to update."));
    }
    if let Some(name) = &update.competition_name {
        if name.trim().is_empty() {
            return Err(ClientError::validation("Competition name must not be empty."));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
