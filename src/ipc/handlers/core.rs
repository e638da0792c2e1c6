use crate::config::DeskConfig;
use crate::db::{self, SqliteStore};
use crate::ipc::error::{err, ok, ErrorCode};
use crate::ipc::types::{AppState, Request};
use crate::profile::AdminIdentity;
use crate::record::{parse_calendar_date, EntityKind};
use crate::session::Session;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "sessionOpen": state.session.is_some()
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, ErrorCode::BadParams, "missing params.path");
    };

    match SqliteStore::open(&path) {
        Ok(store) => {
            let config = match DeskConfig::load(store.conn()) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(error = %e, "settings unreadable; using defaults");
                    DeskConfig::default()
                }
            };
            state.notices.set_dismiss_after(config.dismiss_after_ms);
            state.config = config;
            state.workspace = Some(path.clone());
            state.store = Some(store);
            // A session belongs to the store it was loaded from.
            state.session = None;
            tracing::info!(workspace = %path.display(), "workspace opened");
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => {
            tracing::error!(workspace = %path.display(), error = %e, "workspace open failed");
            err(&req.id, ErrorCode::DbOpenFailed, format!("{e:?}"))
        }
    }
}

fn handle_session_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, ErrorCode::NoWorkspace, "select a workspace first");
    };
    let Some(uid) = req
        .params
        .get("adminId")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        return err(&req.id, ErrorCode::BadParams, "missing adminId");
    };
    let text = |key: &str| {
        req.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    let today = match text("today") {
        None => None,
        Some(raw) => match parse_calendar_date(&raw) {
            Some(d) => Some(d),
            None => return err(&req.id, ErrorCode::BadParams, "today must be YYYY-MM-DD"),
        },
    };
    let identity = AdminIdentity {
        uid: uid.to_string(),
        email: text("email"),
        display_name: text("displayName"),
    };

    match Session::begin(store, identity, &state.config, today, &mut state.notices) {
        Ok(session) => {
            let profile = serde_json::to_value(&session.profile).unwrap_or_default();
            let counts = json!({
                "participants": session.table(EntityKind::Participants).map(|t| t.records().len()),
                "scenarios": session.table(EntityKind::Scenarios).map(|t| t.records().len()),
                "contents": session.table(EntityKind::Contents).map(|t| t.records().len()),
            });
            state.session = Some(session);
            ok(&req.id, json!({ "profile": profile, "counts": counts }))
        }
        Err(e) => err(&req.id, ErrorCode::ProfileLoadFailed, e.to_string()),
    }
}

fn handle_session_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(mut session) = state.session.take() {
        session.clear();
        tracing::info!(admin = %session.admin_id(), "session closed");
    }
    state.notices.drain();
    ok(&req.id, json!({ "ok": true }))
}

fn handle_notices_drain(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "notices": state.notices.drain() }))
}

fn handle_access_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, ErrorCode::NoWorkspace, "select a workspace first");
    };
    let Some(admin_id) = req.params.get("adminId").and_then(|v| v.as_str()) else {
        return err(&req.id, ErrorCode::BadParams, "missing adminId");
    };
    let Some(collection) = req
        .params
        .get("collection")
        .and_then(|v| v.as_str())
        .and_then(EntityKind::parse)
    else {
        return err(&req.id, ErrorCode::BadParams, "unknown collection");
    };
    let flag = |key: &str| req.params.get(key).and_then(|v| v.as_bool()).unwrap_or(true);
    let (read, write) = (flag("read"), flag("write"));

    if let Err(e) = db::access_set(store.conn(), admin_id, collection.collection(), read, write) {
        return err(&req.id, ErrorCode::DbUpdateFailed, e.to_string());
    }
    tracing::info!(admin_id, collection = collection.collection(), read, write, "access rule set");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "session.login" => Some(handle_session_login(state, req)),
        "session.logout" => Some(handle_session_logout(state, req)),
        "notices.drain" => Some(handle_notices_drain(state, req)),
        "access.set" => Some(handle_access_set(state, req)),
        _ => None,
    }
}
