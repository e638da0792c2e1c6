mod test_support;

use serde_json::json;
use test_support::{cell, rows, spawn_sidecar, Sidecar};

fn add_scenario(sidecar: &mut Sidecar, title: &str) -> String {
    sidecar.request_ok("scenarios.edit", json!({}));
    let added = sidecar.request_ok(
        "scenarios.mission.add",
        json!({ "mission": { "name": "버튼 누르기", "expectedQuestions": ["몇 층?"] } }),
    );
    assert_eq!(added["rendered"], json!(true));
    let saved = sidecar.request_ok(
        "scenarios.submit",
        json!({ "form": { "title": title, "difficulty": "hard" } }),
    );
    assert_eq!(saved["outcome"], json!("saved"), "{}", saved);
    saved["recordId"].as_str().expect("recordId").to_string()
}

fn add_content(sidecar: &mut Sidecar, participant: &str, scenario: &str, at: &str) {
    sidecar.request_ok("contents.edit", json!({}));
    let saved = sidecar.request_ok(
        "contents.submit",
        json!({ "form": {
            "participantUid": participant,
            "scenarioUid": scenario,
            "participatedAt": at,
            "totalPlayTime": 3725
        } }),
    );
    assert_eq!(saved["outcome"], json!("saved"), "{}", saved);
}

#[test]
fn contents_default_to_three_month_window_and_reject_inverted_ranges() {
    let mut sidecar = spawn_sidecar();
    sidecar.open_workspace("scenariodesk-contents", "admin-1");
    let participant = sidecar.add_participant("김민수");
    let scenario = add_scenario(&mut sidecar, "엘리베이터 타기");
    add_content(&mut sidecar, &participant, &scenario, "2026-10-01T10:00");
    add_content(&mut sidecar, &participant, &scenario, "2026-05-01T10:00");
    sidecar.notices();

    let view = sidecar.request_ok("contents.view", json!({}));
    let shown = rows(&view);
    assert_eq!(shown.len(), 1);
    assert_eq!(
        view["frame"]["dateRange"],
        json!({ "from": "2026-07-18", "to": "2026-10-18" })
    );
    let row = &shown[0];
    assert_eq!(cell(row, "participantName").as_deref(), Some("김민수"));
    assert_eq!(cell(row, "scenarioTitle").as_deref(), Some("엘리베이터 타기"));
    assert_eq!(cell(row, "difficulty").as_deref(), Some("어려움"));
    assert_eq!(cell(row, "totalPlayTime").as_deref(), Some("1시간 02분 05초"));
    assert_eq!(cell(row, "success").as_deref(), Some("성공"));
    assert_eq!(cell(row, "participatedAt").as_deref(), Some("2026. 10. 1. 오전 10:00:00"));

    let rejected = sidecar.request_ok(
        "contents.dateRange",
        json!({ "from": "2026-10-10", "to": "2026-10-01" }),
    );
    assert_eq!(rejected["rendered"], json!(false));
    assert_eq!(
        rejected["restored"],
        json!({ "from": "2026-07-18", "to": "2026-10-18" })
    );
    let notices = sidecar.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0]["kind"], json!("warning"));
    assert_eq!(notices[0]["message"], json!("시작일은 종료일보다 늦을 수 없습니다."));

    let all = sidecar.request_ok("contents.dateRange", json!({ "from": null, "to": "" }));
    assert_eq!(rows(&all).len(), 2);

    assert_eq!(
        sidecar.error_code("contents.dateRange", json!({ "from": "10/01/2026" })),
        "bad_params"
    );
}

#[test]
fn mission_drafts_are_edited_in_place_before_submit() {
    let mut sidecar = spawn_sidecar();
    sidecar.open_workspace("scenariodesk-missions", "admin-1");

    sidecar.request_ok("scenarios.edit", json!({}));
    let rejected = sidecar.request_ok("scenarios.mission.add", json!({ "mission": { "name": " " } }));
    assert_eq!(rejected, json!({ "rendered": false }));

    sidecar.request_ok("scenarios.mission.add", json!({ "mission": { "name": "A" } }));
    sidecar.request_ok("scenarios.mission.add", json!({ "mission": { "name": "B" } }));
    let editing = sidecar.request_ok("scenarios.mission.edit", json!({ "index": 0 }));
    assert_eq!(editing["mission"]["name"], json!("A"));
    let updated =
        sidecar.request_ok("scenarios.mission.add", json!({ "mission": { "name": "A2" } }));
    let missions = updated["frame"]["editor"]["form"]["missions"].clone();
    assert_eq!(missions[0]["name"], json!("A2"));
    assert_eq!(missions.as_array().map(Vec::len), Some(2));

    let removed = sidecar.request_ok("scenarios.mission.remove", json!({ "index": 1 }));
    assert_eq!(
        removed["frame"]["editor"]["form"]["missions"].as_array().map(Vec::len),
        Some(1)
    );
    assert_eq!(
        sidecar.request_ok("scenarios.mission.remove", json!({ "index": 5 })),
        json!({ "rendered": false })
    );

    let saved = sidecar.request_ok(
        "scenarios.submit",
        json!({ "form": { "title": "버스 타기", "difficulty": "easy" } }),
    );
    assert_eq!(saved["outcome"], json!("saved"));
    assert_eq!(cell(&rows(&saved)[0], "title").as_deref(), Some("버스 타기"));
}
