use serde_json::json;

use super::*;

fn snapshot() -> StateSnapshot {
    serde_json::from_value(json!({
        "participants": [
            {"id": 1, "name": "<script>alert(1)</script>", "active": true},
            {"id": 2, "name": "Bryan", "dessert": "Churros & chocolate", "active": true},
            {"id": 3, "name": "Retired", "active": false}
        ],
        "scores": [
            {"id": 7, "participant_id": 2, "judge_name": "Ana", "criteria": {"taste": 9}, "comment": "\"wow\" <b>"}
        ],
        "settings": {"competition_name": "Bake & Shake"}
    }))
    .expect("snapshot")
}

#[test]
fn interpolated_values_are_escaped() {
    let page = voting_page(&snapshot(), None).into_string();
    assert!(!page.contains("<script>"));
    assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(page.contains("Churros &amp; chocolate"));
    assert!(page.contains("<title>Bake &amp; Shake</title>"));
}

#[test]
fn voting_page_lists_only_active_participants() {
    let page = voting_page(&snapshot(), None).into_string();
    assert!(page.contains("value=\"2\""));
    assert!(!page.contains("<option value=\"3\""));
    assert!(page.contains("name=\"holiday_spirit\""));
    assert!(page.contains(NO_VOTES));
}

#[test]
fn closed_voting_hides_the_form() {
    let mut state = snapshot();
    state.settings.voting_open = false;
    let page = voting_page(&state, None).into_string();
    assert!(!page.contains("id=\"ballot\""));
    assert!(page.contains("Voting is currently closed."));
}

#[test]
fn status_banner_marks_errors() {
    let status = StatusMessage::error("Judge name required.");
    let banner = status_banner(Some(&status)).into_string();
    assert!(banner.contains("class=\"status error\""));
    assert!(banner.contains("Judge name required."));
    assert_eq!(status_banner(None).into_string(), "");
}

#[test]
fn admin_page_escapes_comments_and_attributes() {
    let page = admin_page(&snapshot(), &[], None).into_string();
    assert!(page.contains("&quot;wow&quot; &lt;b&gt;"));
    assert!(page.contains("value=\"&lt;script&gt;alert(1)&lt;/script&gt;\""));
    assert!(!page.contains("Recent activity"));
}
