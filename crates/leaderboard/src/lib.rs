//! Score aggregation for the bakeoff leaderboard.
//!
//! Everything here is a pure function of the participants and scores handed
//! in: no clock, no randomness, no I/O. Feeding the same snapshot twice yields
//! bit-identical rows.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use shared::{
    domain::{Criterion, Dessert, Participant, ParticipantId, Score, PLACEHOLDER_DESSERT},
    lenient,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub participant_id: ParticipantId,
    pub name: String,
    pub dessert: Option<String>,
    pub active: bool,
    pub count: u32,
    pub criteria_averages: BTreeMap<String, f64>,
    pub average_total: f64,
    pub weighted_total: f64,
}

impl LeaderboardRow {
    pub fn has_votes(&self) -> bool {
        self.count > 0
    }
}

#[derive(Default)]
struct Tally {
    count: u32,
    totals: Vec<f64>,
    criteria: BTreeMap<String, Vec<f64>>,
}

/// Ranks participants by their average total.
///
/// Scores that reference an unknown participant are skipped. A score without a
/// usable id is matched on the participant's exact name instead. Rows are ordered
/// by descending average total, then descending vote count; remaining ties keep
/// the order of `participants`.
pub fn aggregate(participants: &[Participant], scores: &[Score]) -> Vec<LeaderboardRow> {
    aggregate_with_criteria(participants, scores, &[])
}

/// Same ranking as [`aggregate`], with `weighted_total` computed from the
/// configured criterion weights. Every configured criterion appears in
/// `criteria_averages`, voted on or not.
pub fn aggregate_with_criteria(
    participants: &[Participant],
    scores: &[Score],
    criteria: &[Criterion],
) -> Vec<LeaderboardRow> {
    let mut index: HashMap<ParticipantId, usize> = HashMap::with_capacity(participants.len());
    let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(participants.len());
    for (position, participant) in participants.iter().enumerate() {
        index.entry(participant.id).or_insert(position);
        by_name.entry(participant.name.trim()).or_insert(position);
    }

    let mut tallies: Vec<Tally> = participants
        .iter()
        .map(|_| Tally {
            criteria: criteria
                .iter()
                .map(|c| (c.key.clone(), Vec::new()))
                .collect(),
            ..Tally::default()
        })
        .collect();

    for score in scores {
        let position = match (score.participant_id, score.participant_name.as_deref()) {
            (Some(id), _) => index.get(&id),
            (None, Some(name)) => by_name.get(name.trim()),
            (None, None) => None,
        };
        let Some(&position) = position else {
            continue;
        };
        let tally = &mut tallies[position];
        tally.count += 1;
        for (key, value) in &score.criteria {
            tally
                .criteria
                .entry(key.clone())
                .or_default()
                .push(lenient::number(value));
        }
        tally.totals.push(score_total(score));
    }

    let weights: HashMap<&str, f64> = criteria
        .iter()
        .map(|c| (c.key.as_str(), c.weight))
        .collect();

    let mut rows: Vec<LeaderboardRow> = participants
        .iter()
        .zip(tallies)
        .map(|(participant, tally)| {
            let count = tally.count;
            let divisor = f64::from(count.max(1));

            let criteria_averages: BTreeMap<String, f64> = tally
                .criteria
                .into_iter()
                .map(|(key, values)| {
                    let average = if count == 0 {
                        0.0
                    } else {
                        normalized(exact_sum(values) / divisor)
                    };
                    (key, average)
                })
                .collect();

            let average_total = if count == 0 {
                0.0
            } else {
                normalized(exact_sum(tally.totals) / divisor)
            };

            let weighted = criteria_averages
                .iter()
                .map(|(key, average)| average * weights.get(key.as_str()).copied().unwrap_or(1.0))
                .sum::<f64>();

            LeaderboardRow {
                participant_id: participant.id,
                name: participant.name.clone(),
                dessert: participant.dessert.clone(),
                active: participant.active,
                count,
                criteria_averages,
                average_total,
                weighted_total: normalized((weighted * 1000.0).round() / 1000.0),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.average_total
            .total_cmp(&a.average_total)
            .then_with(|| b.count.cmp(&a.count))
    });
    rows
}

/// The ballot's submitted total, or the sum of its criteria when none was sent.
pub fn score_total(score: &Score) -> f64 {
    match &score.total {
        Some(total) => lenient::number(total),
        None => normalized(exact_sum(
            score.criteria.values().map(lenient::number).collect(),
        )),
    }
}

/// Fills each participant's dessert from the dessert table when the record
/// itself has none (or only the placeholder).
pub fn merge_desserts(participants: &[Participant], desserts: &[Dessert]) -> Vec<Participant> {
    let by_participant: HashMap<ParticipantId, &Dessert> = desserts
        .iter()
        .map(|d| (d.participant_id, d))
        .collect();

    participants
        .iter()
        .map(|participant| {
            let mut participant = participant.clone();
            let missing = participant
                .dessert
                .as_deref()
                .map(|d| d.trim().is_empty() || d.trim() == PLACEHOLDER_DESSERT)
                .unwrap_or(true);
            if missing {
                if let Some(dessert) = by_participant.get(&participant.id) {
                    participant.dessert = Some(dessert.dessert_name.clone());
                }
            }
            participant
        })
        .collect()
}

// Summing in sorted order makes the result independent of score order.
fn exact_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

fn normalized(value: f64) -> f64 {
    if value.is_finite() {
        value + 0.0
    } else {
        0.0
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/property_tests.rs"]
mod property_tests;
