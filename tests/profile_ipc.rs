mod test_support;

use serde_json::json;
use test_support::{spawn_sidecar, TODAY};

#[test]
fn profile_falls_back_then_persists_updates() {
    let mut sidecar = spawn_sidecar();
    let workspace = sidecar.open_workspace("scenariodesk-profile", "admin-1");

    let profile = sidecar.request_ok("profile.get", json!({}));
    assert_eq!(profile["profile"]["fullName"], json!("admin-1"));
    assert_eq!(profile["profile"]["username"], json!("admin-1"));
    assert_eq!(profile["profile"]["status"], json!("active"));

    let invalid = sidecar.request_ok("profile.update", json!({ "conditions": ["불안"] }));
    assert_eq!(invalid["outcome"], json!("invalid"));
    assert_eq!(invalid["message"], json!("거주지역을 입력해주세요."));
    let invalid = sidecar.request_ok("profile.update", json!({ "region": "서울" }));
    assert_eq!(invalid["message"], json!("질환명을 하나 이상 입력해주세요."));

    let saved = sidecar.request_ok(
        "profile.update",
        json!({ "region": "서울", "conditions": "불안, 공황", "notes": "메모" }),
    );
    assert_eq!(saved["outcome"], json!("saved"));
    assert_eq!(saved["profile"]["conditions"], json!(["불안", "공황"]));
    let notices = sidecar.notices();
    assert_eq!(notices.last().map(|n| n["message"].clone()), Some(json!("프로필이 업데이트되었습니다.")));

    drop(sidecar);
    let mut sidecar = spawn_sidecar();
    sidecar.request_ok(
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let login = sidecar.request_ok(
        "session.login",
        json!({ "adminId": "admin-1", "displayName": "다른 이름", "today": TODAY }),
    );
    assert_eq!(login["profile"]["region"], json!("서울"));
    assert_eq!(login["profile"]["fullName"], json!("admin-1"));
}

#[test]
fn denied_profile_write_keeps_local_changes() {
    let mut sidecar = spawn_sidecar();
    sidecar.open_workspace("scenariodesk-profile-denied", "admin-1");
    sidecar.request_ok(
        "access.set",
        json!({ "adminId": "admin-1", "collection": "users", "write": false }),
    );
    sidecar.notices();

    let resp = sidecar.request_ok(
        "profile.update",
        json!({ "region": "부산", "conditions": ["우울"] }),
    );
    assert_eq!(resp["outcome"], json!("localOnly"));
    assert_eq!(resp["profile"]["region"], json!("부산"));
    let notices = sidecar.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0]["kind"], json!("warning"));
}
