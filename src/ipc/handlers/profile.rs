use crate::ipc::error::{err, ok, ErrorCode};
use crate::ipc::types::{AppState, Request};
use crate::profile::{update_profile, ProfileUpdate};
use serde_json::json;

fn handle_profile_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, ErrorCode::NoSession, "log in first");
    };
    ok(&req.id, json!({ "profile": session.profile }))
}

fn handle_profile_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, ErrorCode::NoWorkspace, "select a workspace first");
    };
    let Some(session) = state.session.as_mut() else {
        return err(&req.id, ErrorCode::NoSession, "log in first");
    };
    let Some(form) = req.params.as_object() else {
        return err(&req.id, ErrorCode::BadParams, "params must be an object");
    };

    let outcome = update_profile(store, &mut session.profile, form, &mut state.notices);
    let status = match &outcome {
        ProfileUpdate::Saved => "saved",
        ProfileUpdate::LocalOnly => "localOnly",
        ProfileUpdate::Invalid(_) => "invalid",
        ProfileUpdate::Failed => "failed",
    };
    let mut result = json!({ "outcome": status, "profile": session.profile });
    if let ProfileUpdate::Invalid(e) = outcome {
        result["message"] = json!(e.to_string());
    }
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "profile.get" => Some(handle_profile_get(state, req)),
        "profile.update" => Some(handle_profile_update(state, req)),
        _ => None,
    }
}
