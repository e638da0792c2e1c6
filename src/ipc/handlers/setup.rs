use crate::config::{load_section, merge_section_patch, save_section, ConfigSection, DeskConfig};
use crate::ipc::error::{err, ok, ErrorCode};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, ErrorCode::NoWorkspace, "select a workspace first");
    };
    let mut out = Map::new();
    for section in ConfigSection::ALL {
        match load_section(store.conn(), section) {
            Ok(v) => {
                out.insert(section.name().to_string(), v);
            }
            Err(e) => return err(&req.id, ErrorCode::DbQueryFailed, format!("{e:#}")),
        }
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, ErrorCode::NoWorkspace, "select a workspace first");
    };
    let conn = store.conn();
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, ErrorCode::BadParams, "missing section");
    };
    let Some(section) = ConfigSection::parse(section_raw) else {
        return err(&req.id, ErrorCode::BadParams, "unknown section");
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, ErrorCode::BadParams, "patch must be an object");
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, ErrorCode::DbQueryFailed, format!("{e:#}")),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, ErrorCode::BadParams, msg);
    }
    if let Err(e) = save_section(conn, section, &current) {
        return err(&req.id, ErrorCode::DbUpdateFailed, format!("{e:#}"));
    }

    // Table settings reach open tables on the next login.
    match DeskConfig::load(conn) {
        Ok(config) => {
            state.notices.set_dismiss_after(config.dismiss_after_ms);
            state.config = config;
        }
        Err(e) => tracing::warn!(error = %e, "settings saved but not reloaded"),
    }
    tracing::info!(section = section.name(), "settings updated");
    ok(&req.id, json!({ "ok": true, "section": current }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
