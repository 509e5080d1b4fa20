use client_core::status::StatusMessage;
use leaderboard::LeaderboardRow;
use maud::{html, Markup, DOCTYPE};
use shared::{
    domain::{Criterion, Participant, StateSnapshot},
    protocol::EventRecord,
};

use crate::{format_score, score_emoji, NO_VOTES};

fn page(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
            }
            body { (body) }
        }
    }
}

pub fn status_banner(status: Option<&StatusMessage>) -> Markup {
    html! {
        @if let Some(status) = status {
            div.status.error[status.is_error()] role="status" { (status.text) }
        }
    }
}

/// The public page: ballot form plus the live leaderboard.
pub fn voting_page(snapshot: &StateSnapshot, status: Option<&StatusMessage>) -> Markup {
    let settings = &snapshot.settings;
    let rows = client_core::rank(snapshot);
    let body = html! {
        h1 { (settings.competition_name) }
        (status_banner(status))
        @if settings.voting_open {
            form #ballot method="post" {
                label for="judge" { "Your name" }
                input #judge name="judge_name" type="text" required;
                label for="participant" { "Participant" }
                select #participant name="participant_id" required {
                    option value="" { "Choose a baker" }
                    @for participant in snapshot.active_participants() {
                        option value=(participant.id.0) {
                            (participant.name)
                            @if let Some(dessert) = dessert_label(snapshot, participant) {
                                " - " (dessert)
                            }
                        }
                    }
                }
                @for criterion in &settings.criteria {
                    (criterion_slider(criterion))
                }
                label for="comment" { "Comments" }
                textarea #comment name="comment" {}
                button type="submit" { "Submit score" }
            }
        } @else {
            p.closed { "Voting is currently closed." }
        }
        (leaderboard_table(&rows, &settings.criteria))
    };
    page(&settings.competition_name, body)
}

fn dessert_label<'a>(snapshot: &'a StateSnapshot, participant: &'a Participant) -> Option<&'a str> {
    snapshot
        .dessert_for(participant.id)
        .map(|d| d.dessert_name.as_str())
        .or(participant.dessert.as_deref())
}

fn criterion_slider(criterion: &Criterion) -> Markup {
    let start = (criterion.max / 2.0).round();
    html! {
        div.criterion {
            label for=(criterion.key) { (criterion.label) }
            input id=(criterion.key) name=(criterion.key) type="range" min="0"
                max=(criterion.max) step="1" value=(start);
            span.emoji { (score_emoji(start * 10.0 / criterion.max)) }
        }
    }
}

pub fn leaderboard_table(rows: &[LeaderboardRow], criteria: &[Criterion]) -> Markup {
    html! {
        table.leaderboard {
            thead {
                tr {
                    th { "#" }
                    th { "Baker" }
                    th { "Dessert" }
                    @for criterion in criteria {
                        th { (criterion.label) }
                    }
                    th { "Average" }
                    th { "Weighted" }
                    th { "Votes" }
                }
            }
            tbody {
                @for (place, row) in rows.iter().enumerate() {
                    tr.inactive[!row.active] {
                        td { (place + 1) }
                        td { (row.name) }
                        td { (row.dessert.as_deref().unwrap_or("")) }
                        @if row.has_votes() {
                            @for criterion in criteria {
                                td {
                                    (format_score(
                                        row.criteria_averages.get(&criterion.key).copied().unwrap_or(0.0)
                                    ))
                                }
                            }
                            td { (format_score(row.average_total)) }
                            td { (format_score(row.weighted_total)) }
                        } @else {
                            td.empty colspan=(criteria.len() + 2) { (NO_VOTES) }
                        }
                        td { (row.count) }
                    }
                }
            }
        }
    }
}

/// The admin console: roster, desserts, settings, ballots and the event log.
pub fn admin_page(
    snapshot: &StateSnapshot,
    events: &[EventRecord],
    status: Option<&StatusMessage>,
) -> Markup {
    let settings = &snapshot.settings;
    let body = html! {
        h1 { (settings.competition_name) " admin" }
        (status_banner(status))
        section #participants {
            h2 { "Participants" }
            table {
                thead { tr { th { "Name" } th { "Dessert" } th { "Active" } } }
                tbody {
                    @for participant in &snapshot.participants {
                        tr data-id=(participant.id.0) {
                            td { input name="name" value=(participant.name); }
                            td { input name="dessert" value=(dessert_label(snapshot, participant).unwrap_or("")); }
                            td { input name="active" type="checkbox" checked[participant.active]; }
                        }
                    }
                }
            }
        }
        section #settings {
            h2 { "Settings" }
            form {
                input name="competition_name" value=(settings.competition_name);
                label { input name="voting_open" type="checkbox" checked[settings.voting_open]; "Voting open" }
                label {
                    input name="allow_multiple_scores_per_judge" type="checkbox"
                        checked[settings.allow_multiple_scores_per_judge];
                    "Allow repeat scores"
                }
                ul.criteria {
                    @for criterion in &settings.criteria {
                        li { (criterion.label) " (" (criterion.key) ") max " (criterion.max) ", weight " (criterion.weight) }
                    }
                }
            }
        }
        section #scores {
            h2 { "Scores" }
            table {
                thead { tr { th { "Judge" } th { "Baker" } th { "Total" } th { "Comment" } } }
                tbody {
                    @for score in &snapshot.scores {
                        tr {
                            td { (score.judge_name) }
                            td {
                                (snapshot
                                    .score_participant(score)
                                    .map(|p| p.name.as_str())
                                    .or(score.participant_name.as_deref())
                                    .unwrap_or("?"))
                            }
                            td { (format_score(leaderboard::score_total(score))) }
                            td { (score.comment) }
                        }
                    }
                }
            }
        }
        @if !events.is_empty() {
            section #events {
                h2 { "Recent activity" }
                ol {
                    @for event in events {
                        li {
                            @if let Some(at) = event.created_at {
                                time datetime=(at.to_rfc3339()) { (at.format("%H:%M:%S").to_string()) } " "
                            }
                            (event.event_type)
                        }
                    }
                }
            }
        }
    };
    page(&format!("{} admin", settings.competition_name), body)
}

#[cfg(test)]
#[path = "tests/html_tests.rs"]
mod tests;
