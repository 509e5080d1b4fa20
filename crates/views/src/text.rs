use std::fmt::Write;

use leaderboard::LeaderboardRow;
use shared::{
    domain::{Criterion, StateSnapshot},
    protocol::EventRecord,
};

use crate::{format_score, NO_VOTES};

pub fn leaderboard(rows: &[LeaderboardRow], criteria: &[Criterion]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Baker".len());

    let mut out = String::new();
    let _ = write!(out, "{:>3}  {:<name_width$}", "#", "Baker");
    for criterion in criteria {
        let _ = write!(out, "  {:>8}", truncate(&criterion.label, 8));
    }
    let _ = writeln!(out, "  {:>8}  {:>8}  {:>5}", "Average", "Weighted", "Votes");

    for (place, row) in rows.iter().enumerate() {
        let _ = write!(out, "{:>3}  {:<name_width$}", place + 1, row.name);
        if row.has_votes() {
            for criterion in criteria {
                let average = row
                    .criteria_averages
                    .get(&criterion.key)
                    .copied()
                    .unwrap_or(0.0);
                let _ = write!(out, "  {:>8}", format_score(average));
            }
            let _ = write!(out, "  {:>8}", format_score(row.average_total));
            let _ = write!(out, "  {:>8}", format_score(row.weighted_total));
        } else {
            let width = 10 * (criteria.len() + 1) + 8;
            let _ = write!(out, "  {:>width$}", NO_VOTES);
        }
        let _ = write!(out, "  {:>5}", row.count);
        if let Some(dessert) = &row.dessert {
            let _ = write!(out, "  {dessert}");
        }
        if !row.active {
            out.push_str("  (inactive)");
        }
        out.push('\n');
    }
    out
}

pub fn participants(snapshot: &StateSnapshot) -> String {
    let mut out = String::new();
    for participant in &snapshot.participants {
        let dessert = snapshot
            .dessert_for(participant.id)
            .map(|d| d.dessert_name.as_str())
            .or(participant.dessert.as_deref())
            .unwrap_or("-");
        let _ = writeln!(
            out,
            "{:>4}  {}{}  {}",
            participant.id.0,
            participant.name,
            if participant.active { "" } else { " (inactive)" },
            dessert
        );
    }
    out
}

pub fn scores(snapshot: &StateSnapshot) -> String {
    let mut out = String::new();
    for score in &snapshot.scores {
        let baker = snapshot
            .score_participant(score)
            .map(|p| p.name.as_str())
            .or(score.participant_name.as_deref())
            .unwrap_or("?");
        let id = score
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into());
        let _ = write!(
            out,
            "{id:>4}  {} -> {}: {}",
            score.judge_name,
            baker,
            format_score(leaderboard::score_total(score))
        );
        if !score.comment.is_empty() {
            let _ = write!(out, "  \"{}\"", score.comment);
        }
        out.push('\n');
    }
    out
}

pub fn settings(snapshot: &StateSnapshot) -> String {
    let settings = &snapshot.settings;
    let mut out = String::new();
    let _ = writeln!(out, "competition: {}", settings.competition_name);
    if let Some(theme) = &settings.theme {
        let _ = writeln!(out, "theme: {theme}");
    }
    let _ = writeln!(
        out,
        "voting: {}",
        if settings.voting_open { "open" } else { "closed" }
    );
    let _ = writeln!(
        out,
        "repeat scores: {}",
        if settings.allow_multiple_scores_per_judge {
            "allowed"
        } else {
            "one per baker"
        }
    );
    for criterion in &settings.criteria {
        let _ = writeln!(
            out,
            "  {} ({}): max {}, weight {}",
            criterion.label, criterion.key, criterion.max, criterion.weight
        );
    }
    out
}

pub fn events(events: &[EventRecord]) -> String {
    let mut out = String::new();
    for event in events {
        let at = event
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".into());
        let _ = writeln!(out, "{at}  {:<20} {}", event.event_type, event.payload);
    }
    out
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
#[path = "tests/text_tests.rs"]
mod tests;
