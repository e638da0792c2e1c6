//! `<table>.<action>` methods for participants, scenarios and contents.
//!
//! Mutations answer with the re-rendered frame, or `{"rendered": false}`
//! when the view did not change.

use crate::db::SqliteStore;
use crate::entities::scenarios;
use crate::filter::DateRange;
use crate::ipc::error::{err, ok, ErrorCode};
use crate::ipc::render::{not_rendered, JsonRenderer};
use crate::ipc::types::{AppState, Request};
use crate::notify::Notifier;
use crate::record::{parse_calendar_date, EntityKind};
use crate::session::Session;
use crate::table::{
    DateRangeChange, SubmitOutcome, TableContext, TableController, TableError,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

fn split_method(method: &str) -> Option<(EntityKind, &str)> {
    let (table, action) = method.split_once('.')?;
    match EntityKind::parse(table)? {
        EntityKind::Users => None,
        kind => Some((kind, action)),
    }
}

fn render(table: &mut TableController, ctx: &TableContext<'_>) -> Value {
    let mut renderer = JsonRenderer::default();
    table.render(ctx, &mut renderer);
    renderer.into_response()
}

fn render_if(changed: bool, table: &mut TableController, ctx: &TableContext<'_>) -> Value {
    if changed {
        render(table, ctx)
    } else {
        not_rendered()
    }
}

fn table_err(id: &str, e: TableError) -> Value {
    let code = match e {
        TableError::UnknownRecord(_) => ErrorCode::NotFound,
        TableError::EditorClosed => ErrorCode::EditorClosed,
        TableError::UnknownSortKey(_) | TableError::UnknownFilter(_) | TableError::NoDateFilter(_) => {
            ErrorCode::BadParams
        }
    };
    err(id, code, e.to_string())
}

fn str_param<'p>(params: &'p Value, key: &str) -> Option<&'p str> {
    params.get(key).and_then(|v| v.as_str())
}

fn index_param(id: &str, params: &Value) -> Result<usize, Value> {
    params
        .get("index")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .ok_or_else(|| err(id, ErrorCode::BadParams, "missing index"))
}

/// Absent, null or blank means an open bound.
fn date_param(id: &str, params: &Value, key: &str) -> Result<Option<NaiveDate>, Value> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_calendar_date(s)
            .map(Some)
            .ok_or_else(|| err(id, ErrorCode::BadParams, format!("{key} must be YYYY-MM-DD"))),
        Some(_) => Err(err(id, ErrorCode::BadParams, format!("{key} must be a string"))),
    }
}

struct Call<'a> {
    id: &'a str,
    action: &'a str,
    params: &'a Value,
    admin_id: &'a str,
    store: &'a mut SqliteStore,
    notices: &'a mut Notifier,
}

fn dispatch(
    call: Call<'_>,
    kind: EntityKind,
    table: &mut TableController,
    ctx: &TableContext<'_>,
) -> Result<Value, Value> {
    let Call {
        id,
        action,
        params,
        admin_id,
        store,
        notices,
    } = call;
    let result = match action {
        "load" | "view" => render(table, ctx),
        "search" => {
            table.search(str_param(params, "query").unwrap_or_default());
            render(table, ctx)
        }
        "sort" => {
            let Some(key) = str_param(params, "key") else {
                return Err(err(id, ErrorCode::BadParams, "missing key"));
            };
            table.sort_click(key).map_err(|e| table_err(id, e))?;
            render(table, ctx)
        }
        "page" => {
            let Some(page) = params.get("page").and_then(|v| v.as_u64()) else {
                return Err(err(id, ErrorCode::BadParams, "missing page"));
            };
            let page = u32::try_from(page).unwrap_or(u32::MAX);
            let changed = table.page_click(page, ctx);
            render_if(changed, table, ctx)
        }
        "prev" => {
            let changed = table.prev(ctx);
            render_if(changed, table, ctx)
        }
        "next" => {
            let changed = table.next(ctx);
            render_if(changed, table, ctx)
        }
        "filter" => {
            let Some(key) = str_param(params, "key") else {
                return Err(err(id, ErrorCode::BadParams, "missing key"));
            };
            let value = str_param(params, "value").unwrap_or_default();
            table.set_category(key, value).map_err(|e| table_err(id, e))?;
            render(table, ctx)
        }
        "dateRange" => {
            let range = DateRange::new(
                date_param(id, params, "from")?,
                date_param(id, params, "to")?,
            );
            match table
                .set_date_range(range, ctx, notices)
                .map_err(|e| table_err(id, e))?
            {
                DateRangeChange::Applied => render(table, ctx),
                DateRangeChange::Rejected { restored } => {
                    json!({ "rendered": false, "rejected": true, "restored": restored })
                }
            }
        }
        "edit" => {
            table
                .open_editor(str_param(params, "recordId"), ctx)
                .map_err(|e| table_err(id, e))?;
            render(table, ctx)
        }
        "close" => {
            table.close_editor();
            render(table, ctx)
        }
        "submit" => {
            let Some(form) = params.get("form").and_then(|v| v.as_object()) else {
                return Err(err(id, ErrorCode::BadParams, "form must be an object"));
            };
            let outcome = table.submit(store, admin_id, form, ctx, notices);
            let mut resp = render(table, ctx);
            match outcome {
                SubmitOutcome::Saved { id: record_id } => {
                    resp["outcome"] = json!("saved");
                    resp["recordId"] = json!(record_id);
                }
                SubmitOutcome::Invalid(e) => {
                    resp["outcome"] = json!("invalid");
                    resp["message"] = json!(e.to_string());
                }
                SubmitOutcome::Denied => resp["outcome"] = json!("denied"),
                SubmitOutcome::Failed => resp["outcome"] = json!("failed"),
            }
            resp
        }
        "mission.add" if kind == EntityKind::Scenarios => {
            let draft = params.get("mission").cloned().unwrap_or_else(|| json!({}));
            let changed =
                scenarios::save_mission(table, &draft, notices).map_err(|e| table_err(id, e))?;
            render_if(changed, table, ctx)
        }
        "mission.edit" if kind == EntityKind::Scenarios => {
            let index = index_param(id, params)?;
            match scenarios::start_edit_mission(table, index).map_err(|e| table_err(id, e))? {
                Some(mission) => {
                    let mut resp = render(table, ctx);
                    resp["mission"] = mission;
                    resp
                }
                None => return Err(err(id, ErrorCode::NotFound, "no mission at index")),
            }
        }
        "mission.remove" if kind == EntityKind::Scenarios => {
            let index = index_param(id, params)?;
            let changed =
                scenarios::remove_mission(table, index).map_err(|e| table_err(id, e))?;
            render_if(changed, table, ctx)
        }
        _ => {
            let method = format!("unknown method: {}.{action}", kind.collection());
            return Err(err(id, ErrorCode::NotImplemented, method));
        }
    };
    Ok(result)
}

fn handle(state: &mut AppState, req: &Request, kind: EntityKind, action: &str) -> Value {
    let AppState {
        store,
        notices,
        session,
        ..
    } = state;
    let Some(store) = store.as_mut() else {
        return err(&req.id, ErrorCode::NoWorkspace, "select a workspace first");
    };
    let Some(session) = session.as_mut() else {
        return err(&req.id, ErrorCode::NoSession, "log in first");
    };

    if action == "load" {
        session.load(&*store, kind, notices);
    }
    let admin_id = session.admin_id().to_string();
    let call = Call {
        id: &req.id,
        action,
        params: &req.params,
        admin_id: &admin_id,
        store,
        notices,
    };
    let outcome = Session::with_table(session, kind, |table, ctx| dispatch(call, kind, table, ctx));
    match outcome {
        Some(Ok(result)) => ok(&req.id, result),
        Some(Err(resp)) => resp,
        None => err(&req.id, ErrorCode::NotImplemented, format!("unknown method: {}", req.method)),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let (kind, action) = split_method(&req.method)?;
    Some(handle(state, req, kind, action))
}
