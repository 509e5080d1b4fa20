use std::collections::BTreeMap;

use serde_json::{json, Value};
use shared::domain::{default_criteria, Criterion, DessertId, StateSnapshot};

use super::*;

fn participant(id: i64, name: &str) -> Participant {
    Participant {
        id: ParticipantId(id),
        name: name.to_string(),
        dessert: None,
        active: true,
        created_at: None,
    }
}

fn ballot(participant_id: i64, criteria: Value, total: Option<Value>) -> Score {
    let criteria: BTreeMap<String, Value> = match criteria {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    };
    Score {
        id: None,
        participant_id: Some(ParticipantId(participant_id)),
        participant_name: None,
        judge_name: "judge".to_string(),
        criteria,
        total,
        comment: String::new(),
        created_at: None,
    }
}

fn totals(participant_id: i64, total: f64) -> Score {
    ballot(participant_id, json!({}), Some(json!(total)))
}

#[test]
fn higher_count_wins_an_average_tie() {
    let participants = vec![participant(1, "A"), participant(2, "B")];
    let scores = vec![totals(1, 8.0), totals(1, 6.0), totals(2, 7.0)];

    let rows = aggregate(&participants, &scores);
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["A", "B"]);
    assert_eq!(rows[0].count, 2);
    assert_eq!(rows[0].average_total, 7.0);
    assert_eq!(rows[1].count, 1);
    assert_eq!(rows[1].average_total, 7.0);
}

#[test]
fn count_breaks_ties_even_when_listed_second() {
    let participants = vec![participant(2, "B"), participant(1, "A")];
    let scores = vec![totals(1, 8.0), totals(1, 6.0), totals(2, 7.0)];

    let rows = aggregate(&participants, &scores);
    assert_eq!(rows[0].participant_id, ParticipantId(1));
    assert_eq!(rows[1].participant_id, ParticipantId(2));
}

#[test]
fn participants_without_votes_report_zero() {
    let participants = vec![participant(1, "Bernie")];
    let rows = aggregate_with_criteria(&participants, &[], &default_criteria());

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(!row.has_votes());
    assert_eq!(row.average_total, 0.0);
    assert_eq!(row.weighted_total, 0.0);
    assert_eq!(row.criteria_averages.len(), 4);
    assert!(row.criteria_averages.values().all(|v| *v == 0.0));
}

#[test]
fn unknown_participant_scores_are_ignored() {
    let participants = vec![participant(1, "Daniella")];
    let scores = vec![totals(1, 6.0), totals(99, 10.0)];

    let rows = aggregate(&participants, &scores);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].count, 1);
    assert_eq!(rows[0].average_total, 6.0);
}

#[test]
fn empty_inputs_produce_empty_board() {
    assert!(aggregate(&[], &[]).is_empty());
    assert!(aggregate(&[], &[totals(1, 9.0)]).is_empty());
}

#[test]
fn malformed_values_degrade_to_zero() {
    let participants = vec![participant(1, "Rogelio")];
    let scores = vec![
        ballot(1, json!({"taste": "9", "presentation": "pretty"}), None),
        ballot(1, json!({"taste": null, "presentation": 4}), Some(json!("abc"))),
    ];

    let rows = aggregate(&participants, &scores);
    let row = &rows[0];
    assert_eq!(row.count, 2);
    assert_eq!(row.criteria_averages["taste"], 4.5);
    assert_eq!(row.criteria_averages["presentation"], 2.0);
    // First ballot derives 9 from its criteria, second sent an unreadable total.
    assert_eq!(row.average_total, 4.5);
}

#[test]
fn missing_criterion_counts_as_zero_in_average() {
    let participants = vec![participant(1, "Vivana")];
    let scores = vec![
        ballot(1, json!({"taste": 10, "creativity": 6}), None),
        ballot(1, json!({"taste": 8}), None),
    ];

    let rows = aggregate(&participants, &scores);
    assert_eq!(rows[0].criteria_averages["taste"], 9.0);
    assert_eq!(rows[0].criteria_averages["creativity"], 3.0);
    assert_eq!(rows[0].average_total, 12.0);
}

#[test]
fn weighted_total_uses_configured_weights() {
    let mut criteria = vec![
        Criterion::new("taste", "Taste", 10.0),
        Criterion::new("presentation", "Presentation", 10.0),
    ];
    criteria[0].weight = 2.0;
    criteria[1].weight = 0.5;

    let participants = vec![participant(1, "Lindsay")];
    let scores = vec![
        ballot(1, json!({"taste": 9, "presentation": 6, "bonus": 1}), None),
        ballot(1, json!({"taste": 7, "presentation": 8}), None),
    ];

    let rows = aggregate_with_criteria(&participants, &scores, &criteria);
    // 8*2 + 7*0.5 + 0.5*1 (unconfigured keys weigh 1)
    assert_eq!(rows[0].weighted_total, 20.0);
}

#[test]
fn weighted_total_rounds_to_three_decimals() {
    let participants = vec![participant(1, "Javier")];
    let scores = vec![
        ballot(1, json!({"taste": 1}), None),
        ballot(1, json!({"taste": 1}), None),
        ballot(1, json!({"taste": 0}), None),
    ];

    let rows = aggregate(&participants, &scores);
    assert_eq!(rows[0].weighted_total, 0.667);
}

#[test]
fn inactive_participants_keep_their_rank() {
    let mut retired = participant(1, "Yesenia");
    retired.active = false;
    let participants = vec![participant(2, "Bryan"), retired];
    let scores = vec![totals(1, 9.0), totals(2, 5.0)];

    let rows = aggregate(&participants, &scores);
    assert_eq!(rows[0].name, "Yesenia");
    assert!(!rows[0].active);
}

#[test]
fn aggregate_is_deterministic() {
    let participants = vec![participant(1, "A"), participant(2, "B"), participant(3, "C")];
    let scores = vec![
        ballot(1, json!({"taste": 7.1, "presentation": 3.3}), None),
        ballot(2, json!({"taste": 0.1}), Some(json!(0.3))),
        ballot(1, json!({"taste": 2.2}), Some(json!(9.9))),
    ];

    let first = aggregate(&participants, &scores);
    let second = aggregate(&participants, &scores);
    assert_eq!(first, second);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.average_total.to_bits(), b.average_total.to_bits());
    }
}

#[test]
fn merge_desserts_fills_missing_and_placeholder_entries() {
    let mut flan = participant(1, "Yesenia");
    flan.dessert = Some("Flan".to_string());
    let mut tbd = participant(2, "Bryan");
    tbd.dessert = Some("TBD".to_string());
    let bare = participant(3, "Lindsay");

    let desserts = vec![
        Dessert {
            id: Some(DessertId(10)),
            participant_id: ParticipantId(1),
            participant_name: None,
            dessert_name: "Tres leches".to_string(),
            description: String::new(),
            category: String::new(),
            created_at: None,
        },
        Dessert {
            id: Some(DessertId(11)),
            participant_id: ParticipantId(2),
            participant_name: None,
            dessert_name: "Churros".to_string(),
            description: String::new(),
            category: "fried".to_string(),
            created_at: None,
        },
    ];

    let merged = merge_desserts(&[flan, tbd, bare], &desserts);
    assert_eq!(merged[0].dessert.as_deref(), Some("Flan"));
    assert_eq!(merged[1].dessert.as_deref(), Some("Churros"));
    assert_eq!(merged[2].dessert, None);
}

#[test]
fn string_ids_count_and_missing_ids_are_skipped() {
    let snapshot: StateSnapshot = serde_json::from_value(json!({
        "participants": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}],
        "scores": [
            {"participant_id": 1, "total": 8},
            {"participant_id": "1", "total": 6},
            {"participant_id": "2.0", "total": 7},
            {"participant_id": "A", "total": 10},
            {"total": 10}
        ]
    }))
    .expect("snapshot");

    let rows = aggregate(&snapshot.participants, &snapshot.scores);
    assert_eq!(rows[0].name, "A");
    assert_eq!(rows[0].count, 2);
    assert_eq!(rows[0].average_total, 7.0);
    assert_eq!(rows[1].count, 1);
}

#[test]
fn first_app_state_ranks_by_name() {
    // Participants without ids and `{judge, participant, score}` ballots.
    let snapshot: StateSnapshot = serde_json::from_value(json!({
        "participants": [
            {"name": "Yesenia", "dessert": "TBD", "active": true},
            {"name": "Bryan", "dessert": "TBD", "active": true}
        ],
        "scores": [
            {"judge": "Ana", "participant": "Bryan", "score": "9"},
            {"judge": "Luis", "participant": "Bryan", "score": 7},
            {"judge": "Ana", "participant": "Yesenia", "score": "6"},
            {"judge": "Ana", "participant": "Nobody", "score": 10}
        ]
    }))
    .expect("snapshot");

    let rows = aggregate(&snapshot.participants, &snapshot.scores);
    assert_eq!(rows[0].participant_id, ParticipantId(2));
    assert_eq!(rows[0].name, "Bryan");
    assert_eq!(rows[0].count, 2);
    assert_eq!(rows[0].average_total, 8.0);
    assert_eq!(rows[1].participant_id, ParticipantId(1));
    assert_eq!(rows[1].average_total, 6.0);
    let counted: u32 = rows.iter().map(|r| r.count).sum();
    assert_eq!(counted, 3);
}

#[test]
fn a_known_id_wins_over_the_name() {
    let participants = vec![participant(1, "A"), participant(2, "B")];
    let mut score = totals(1, 9.0);
    score.participant_name = Some("B".to_string());
    let mut stale = totals(5, 9.0);
    stale.participant_name = Some("B".to_string());

    let rows = aggregate(&participants, &[score, stale]);
    assert_eq!(rows[0].name, "A");
    assert_eq!(rows[0].count, 1);
    assert_eq!(rows[1].count, 0);
}
