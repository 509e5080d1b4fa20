use serde_json::json;

use super::*;

fn snapshot() -> StateSnapshot {
    serde_json::from_value(json!({
        "participants": [
            {"id": 1, "name": "A", "active": true},
            {"id": 2, "name": "B", "active": true},
            {"id": 3, "name": "C", "active": false}
        ],
        "scores": [
            {"participant_id": 1, "judge_name": "x", "total": 8},
            {"participant_id": 1, "judge_name": "y", "total": 6},
            {"participant_id": 2, "judge_name": "x", "total": 7, "comment": "crunchy"}
        ],
        "settings": {"criteria": [{"key": "taste", "label": "Taste", "max": 10}]}
    }))
    .expect("snapshot")
}

#[test]
fn leaderboard_lists_rows_in_rank_order() {
    let state = snapshot();
    let rows = client_core::rank(&state);
    let table = leaderboard(&rows, &state.settings.criteria);
    let lines: Vec<&str> = table.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("Average"));
    assert!(lines[1].trim_start().starts_with("1  A"));
    assert!(lines[2].trim_start().starts_with("2  B"));
    assert!(lines[3].contains(NO_VOTES));
    assert!(lines[3].ends_with("(inactive)"));
}

#[test]
fn scores_show_derived_totals_and_comments() {
    let listing = scores(&snapshot());
    assert!(listing.contains("x -> B: 7  \"crunchy\""));
    assert_eq!(listing.lines().count(), 3);
}

#[test]
fn settings_summary_reports_voting_state() {
    let mut state = snapshot();
    state.settings.voting_open = false;
    let summary = settings(&state);
    assert!(summary.contains("voting: closed"));
    assert!(summary.contains("Taste (taste): max 10, weight 1"));
}
