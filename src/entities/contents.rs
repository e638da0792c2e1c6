//! Completion records written when a participant runs a scenario.
//!
//! A record succeeds when every entry of `missionStatuses` has status
//! `completed`. Older clients wrote `success: bool` per mission instead;
//! those entries are mapped to a status on load and logged, so the two
//! shapes never coexist inside the engine. Durations get the same
//! treatment: the test-record writer stored `{name, answerTimeSeconds}`
//! objects where the dashboard stores plain seconds.

use super::{difficulty_rank, number_value, timestamp, UNKNOWN_NAME};
use crate::compare::{SortDirection, SortValue};
use crate::config::DeskConfig;
use crate::format::{format_date_time, format_date_time_local, format_difficulty, format_duration_seconds};
use crate::forms::{self, ValidationError};
use crate::record::{parse_instant, EntityKind, FieldValue, Fields, Record};
use crate::table::{Row, TableConfig, TableContext};
use chrono::Utc;
use serde_json::{json, Map, Value};

pub const NO_RECORDS: &str =
    "콘텐츠 기록이 없습니다. 시나리오 진행 후 데이터가 저장되면 이곳에서 확인할 수 있습니다.";
pub const NO_MATCHES: &str = "조건에 맞는 콘텐츠 기록이 없습니다. 검색어나 기간을 조정해보세요.";
pub const CREATED: &str = "테스트용 콘텐츠 완료 기록이 추가되었습니다.";
pub const UPDATED: &str = "콘텐츠 기록이 수정되었습니다.";

pub const DEFAULT_TOTAL_PLAY_TIME: f64 = 300.0;
pub const DEFAULT_MISSION_SECONDS: f64 = 60.0;
pub const MISSION_STATUSES: [&str; 3] = ["completed", "skipped", "failed"];

pub fn config(desk: &DeskConfig) -> TableConfig {
    TableConfig::builder(EntityKind::Contents)
        .page_size(desk.page_size)
        .sort("participantName", SortDirection::Asc, |r, ctx| {
            SortValue::Text(participant_name(r, ctx))
        })
        .sort("participatedAt", SortDirection::Desc, |r, _| {
            SortValue::instant(r.date("participatedAt"))
        })
        .sort("scenarioTitle", SortDirection::Asc, |r, ctx| {
            SortValue::Text(scenario_title(r, ctx))
        })
        .sort("difficulty", SortDirection::Asc, |r, ctx| {
            match scenario_difficulty(r, ctx) {
                Some(d) => difficulty_rank(Some(&d)),
                None => SortValue::Number(0.0),
            }
        })
        .sort("totalPlayTime", SortDirection::Desc, |r, _| {
            SortValue::number(r.number("totalPlayTime"))
        })
        .default_sort("participatedAt")
        .search(|r, ctx| Some(participant_name(r, ctx)))
        .category("scenarioUid", |r, _| {
            r.non_blank("scenarioUid").map(str::to_string)
        })
        .category("difficulty", scenario_difficulty)
        .date_filter(
            |r| r.date("participatedAt"),
            Some(desk.default_date_window_months),
        )
        .empty_messages(NO_RECORDS, NO_MATCHES)
        .saved_messages(CREATED, UPDATED)
        .row(render_row)
        .normalize(normalize)
        .form(prefill, validate)
        .build()
}

pub fn participant_name(r: &Record, ctx: &TableContext<'_>) -> String {
    r.text("participantUid")
        .and_then(|uid| ctx.participant(uid))
        .and_then(|p| p.non_blank("fullName"))
        .unwrap_or(UNKNOWN_NAME)
        .to_string()
}

pub fn scenario_title(r: &Record, ctx: &TableContext<'_>) -> String {
    r.text("scenarioUid")
        .and_then(|uid| ctx.scenario(uid))
        .and_then(|s| s.non_blank("title"))
        .unwrap_or(UNKNOWN_NAME)
        .to_string()
}

fn scenario_difficulty(r: &Record, ctx: &TableContext<'_>) -> Option<String> {
    r.text("scenarioUid")
        .and_then(|uid| ctx.scenario(uid))
        .and_then(|s| s.non_blank("difficulty"))
        .map(str::to_string)
}

/// Every mission completed. A record without missions counts as a
/// success: it was finished on play time alone.
pub fn is_success(r: &Record) -> bool {
    r.items("missionStatuses")
        .iter()
        .all(|m| m.get("status").and_then(Value::as_str) == Some("completed"))
}

/// Canonical status entry; `true` when a legacy `success` flag was mapped.
fn canonical_status(entry: &Map<String, Value>) -> (Value, bool) {
    let mut out = entry.clone();
    if out.get("status").and_then(Value::as_str).is_some() {
        return (Value::Object(out), false);
    }
    match out.remove("success").and_then(|v| v.as_bool()) {
        Some(success) => {
            let status = if success { "completed" } else { "failed" };
            out.insert("status".into(), json!(status));
            (Value::Object(out), true)
        }
        None => {
            out.insert("status".into(), json!(""));
            (Value::Object(out), false)
        }
    }
}

/// Seconds from a plain number, a numeric string or a legacy
/// `{answerTimeSeconds}` entry.
fn duration_seconds(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Object(entry) => entry.get("answerTimeSeconds").and_then(duration_seconds),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn normalize(mut r: Record) -> Record {
    for key in ["adminId", "participantUid", "scenarioUid"] {
        if r.text(key).is_none() {
            r.set(key, FieldValue::Text(String::new()));
        }
    }

    let mut mapped = 0usize;
    let statuses: Vec<Value> = r
        .items("missionStatuses")
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            let (status, legacy) = canonical_status(entry);
            mapped += usize::from(legacy);
            status
        })
        .collect();
    if mapped > 0 {
        tracing::warn!(
            record = %r.id,
            mapped,
            "mission entries carried a legacy success flag; mapped to status"
        );
    }
    r.set("missionStatuses", FieldValue::Nested(Value::Array(statuses)));

    let raw_durations = r.items("missionDurations");
    let legacy_durations = raw_durations.iter().filter(|v| v.is_object()).count();
    if legacy_durations > 0 {
        tracing::warn!(
            record = %r.id,
            mapped = legacy_durations,
            "mission durations stored as objects; mapped to seconds"
        );
    }
    let durations: Vec<Value> = raw_durations
        .iter()
        .map(|v| number_value(duration_seconds(v).unwrap_or(0.0)))
        .collect();
    r.set("missionDurations", FieldValue::Nested(Value::Array(durations)));

    for key in ["retryCount", "totalPlayTime"] {
        if r.number(key).is_none() {
            r.set(key, FieldValue::Number(0.0));
        }
    }
    r
}

fn render_row(r: &Record, ctx: &TableContext<'_>, index: usize) -> Row {
    let difficulty = scenario_difficulty(r, ctx);
    Row::new(&r.id)
        .cell("index", index.to_string())
        .cell("participantName", participant_name(r, ctx))
        .cell(
            "participatedAt",
            format_date_time(r.date("participatedAt"), ctx.offset),
        )
        .cell("scenarioTitle", scenario_title(r, ctx))
        .cell("difficulty", format_difficulty(difficulty.as_deref()))
        .cell(
            "totalPlayTime",
            format_duration_seconds(r.number("totalPlayTime")),
        )
        .cell("success", if is_success(r) { "성공" } else { "미완료" })
}

/// Default mission rows for a scenario: every mission completed in 60s.
fn mission_defaults(scenario: Option<&Record>) -> (Vec<Value>, Vec<Value>) {
    let missions = scenario.map(|s| s.items("missions")).unwrap_or_default();
    let statuses = missions
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let name = m
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("mission-{}", i + 1));
            json!({ "name": name, "status": "completed" })
        })
        .collect();
    let durations = missions
        .iter()
        .map(|_| number_value(DEFAULT_MISSION_SECONDS))
        .collect();
    (statuses, durations)
}

fn prefill(record: Option<&Record>, ctx: &TableContext<'_>) -> Fields {
    let mut form = Fields::new();
    match record {
        Some(r) => {
            form.insert("participantUid".into(), json!(r.text("participantUid").unwrap_or_default()));
            form.insert("scenarioUid".into(), json!(r.text("scenarioUid").unwrap_or_default()));
            form.insert(
                "participatedAt".into(),
                json!(format_date_time_local(r.date("participatedAt"), ctx.offset)),
            );
            form.insert(
                "totalPlayTime".into(),
                number_value(r.number("totalPlayTime").unwrap_or(0.0)),
            );
            form.insert(
                "retryCount".into(),
                number_value(r.number("retryCount").unwrap_or(0.0)),
            );
            form.insert("notes".into(), json!(r.text("notes").unwrap_or_default()));
            form.insert("missionStatuses".into(), Value::Array(r.items("missionStatuses")));
            form.insert("missionDurations".into(), Value::Array(r.items("missionDurations")));
        }
        None => {
            let scenario = ctx.scenarios.first();
            let (statuses, durations) = mission_defaults(scenario);
            form.insert("participantUid".into(), json!(""));
            form.insert(
                "scenarioUid".into(),
                json!(scenario.map(|s| s.id.as_str()).unwrap_or_default()),
            );
            form.insert(
                "participatedAt".into(),
                json!(format_date_time_local(Some(Utc::now()), ctx.offset)),
            );
            form.insert("totalPlayTime".into(), number_value(DEFAULT_TOTAL_PLAY_TIME));
            form.insert("retryCount".into(), json!(0));
            form.insert("notes".into(), json!(""));
            form.insert("missionStatuses".into(), Value::Array(statuses));
            form.insert("missionDurations".into(), Value::Array(durations));
        }
    }
    form
}

fn validate(form: &Fields, ctx: &TableContext<'_>) -> Result<Fields, ValidationError> {
    let participant_uid = forms::text(form, "participantUid");
    if participant_uid.is_empty() {
        return Err(ValidationError::MissingParticipant);
    }
    let scenario_uid = forms::text(form, "scenarioUid");
    if scenario_uid.is_empty() {
        return Err(ValidationError::MissingScenario);
    }
    let participated_at = parse_instant(&forms::text(form, "participatedAt"), ctx.offset)
        .ok_or(ValidationError::MissingParticipatedAt)?;
    let total_play_time = forms::number_or(form, "totalPlayTime", DEFAULT_TOTAL_PLAY_TIME)?;
    let retry_count = forms::number_or(form, "retryCount", 0.0)?;
    if total_play_time < 0.0 || retry_count < 0.0 {
        return Err(ValidationError::NegativePlayStats);
    }

    let mut statuses = Vec::new();
    if let Some(Value::Array(items)) = form.get("missionStatuses") {
        for item in items {
            let name = item.get("name").and_then(Value::as_str).unwrap_or_default();
            let status = item.get("status").and_then(Value::as_str).unwrap_or_default();
            if !MISSION_STATUSES.contains(&status) {
                return Err(ValidationError::InvalidMissionStatus);
            }
            statuses.push(json!({ "name": name.trim(), "status": status }));
        }
    }
    let durations: Vec<Value> = match form.get("missionDurations") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| number_value(duration_seconds(v).unwrap_or(0.0)))
            .collect(),
        _ => Vec::new(),
    };

    let mut payload = Fields::new();
    payload.insert("participantUid".into(), json!(participant_uid));
    payload.insert("scenarioUid".into(), json!(scenario_uid));
    payload.insert("participatedAt".into(), timestamp(participated_at));
    payload.insert("totalPlayTime".into(), number_value(total_play_time));
    payload.insert("retryCount".into(), number_value(retry_count));
    payload.insert("missionStatuses".into(), Value::Array(statuses));
    payload.insert("missionDurations".into(), Value::Array(durations));
    payload.insert("notes".into(), json!(forms::text(form, "notes")));
    Ok(payload)
}
