use super::timestamp;
use crate::compare::{SortDirection, SortValue};
use crate::config::DeskConfig;
use crate::format::{
    calculate_age, format_birth_and_age, format_conditions, format_date, format_date_time,
    format_date_time_local, format_gender, format_status, normalize_conditions, EMPTY_CELL,
};
use crate::forms::{self, ValidationError};
use crate::record::{parse_calendar_date, parse_instant, EntityKind, Fields, Record};
use crate::table::{Row, TableConfig, TableContext};
use chrono::{NaiveTime, TimeZone, Utc};
use serde_json::{json, Value};

pub const NO_RECORDS: &str =
    "등록된 참가자가 없습니다. 오른쪽 상단의 참가자 추가 버튼을 눌러 새 데이터를 입력하세요.";
pub const NO_MATCHES: &str = "검색 결과가 없습니다. 이름 철자를 확인하거나 다른 키워드로 검색해보세요.";
pub const CREATED: &str = "새 참가자가 추가되었습니다.";
pub const UPDATED: &str = "참가자 정보가 수정되었습니다.";

pub fn config(desk: &DeskConfig) -> TableConfig {
    TableConfig::builder(EntityKind::Participants)
        .page_size(desk.page_size)
        .sort("fullName", SortDirection::Asc, |r, _| {
            SortValue::text(r.non_blank("fullName"))
        })
        .sort("email", SortDirection::Asc, |r, _| {
            SortValue::text(r.non_blank("email"))
        })
        .sort("createdAt", SortDirection::Desc, |r, _| {
            SortValue::instant(r.date("createdAt"))
        })
        .sort("birthDate", SortDirection::Desc, birth_sort_value)
        .sort("region", SortDirection::Asc, |r, _| {
            SortValue::text(r.non_blank("region"))
        })
        .sort("status", SortDirection::Asc, |r, _| status_rank(r.text("status")))
        .sort("lastSeen", SortDirection::Desc, |r, _| {
            SortValue::instant(r.date("lastSeen"))
        })
        .default_sort("createdAt")
        .search(|r, _| r.text("fullName").map(str::to_string))
        .category("status", |r, _| r.non_blank("status").map(str::to_string))
        .category("gender", |r, _| r.non_blank("gender").map(str::to_string))
        .date_filter(|r| r.date("createdAt"), None)
        .empty_messages(NO_RECORDS, NO_MATCHES)
        .saved_messages(CREATED, UPDATED)
        .row(render_row)
        .form(prefill, validate)
        .build()
}

/// active < paused < blocked; unknown values rank 0.
fn status_rank(status: Option<&str>) -> SortValue {
    match status {
        None => SortValue::Null,
        Some("active") => SortValue::Number(1.0),
        Some("paused") => SortValue::Number(2.0),
        Some("blocked") => SortValue::Number(3.0),
        Some(_) => SortValue::Number(0.0),
    }
}

/// Birth date as an instant, falling back to the stored age.
fn birth_sort_value(r: &Record, _: &TableContext<'_>) -> SortValue {
    let birth = r
        .text("birthDate")
        .and_then(parse_calendar_date)
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)));
    match birth {
        Some(dt) => SortValue::instant(Some(dt)),
        None => SortValue::number(r.number("age")),
    }
}

pub fn conditions_of(r: &Record) -> Vec<String> {
    let raw = r.get("conditions").or_else(|| r.get("condition"));
    normalize_conditions(raw.map(|v| v.to_json()).as_ref())
}

fn render_row(r: &Record, ctx: &TableContext<'_>, _: usize) -> Row {
    Row::new(&r.id)
        .cell("fullName", r.non_blank("fullName").unwrap_or(EMPTY_CELL))
        .cell("email", r.non_blank("email").unwrap_or(EMPTY_CELL))
        .cell("createdAt", format_date(r.date("createdAt"), ctx.offset))
        .cell(
            "birthDate",
            format_birth_and_age(r.text("birthDate"), r.number("age")),
        )
        .cell("gender", format_gender(r.text("gender")))
        .cell("region", r.non_blank("region").unwrap_or(EMPTY_CELL))
        .cell("conditions", format_conditions(&conditions_of(r)))
        .cell("status", format_status(r.text("status")))
        .cell("notes", r.non_blank("notes").unwrap_or(EMPTY_CELL))
        .cell("lastSeen", format_date_time(r.date("lastSeen"), ctx.offset))
}

fn prefill(record: Option<&Record>, ctx: &TableContext<'_>) -> Fields {
    let text = |key: &str| -> Value {
        json!(record.and_then(|r| r.text(key)).unwrap_or_default())
    };
    let mut form = Fields::new();
    form.insert("fullName".into(), text("fullName"));
    form.insert("email".into(), text("email"));
    form.insert("birthDate".into(), text("birthDate"));
    form.insert(
        "age".into(),
        record
            .and_then(|r| r.number("age"))
            .map(|a| json!(a as i64))
            .unwrap_or(Value::Null),
    );
    form.insert("gender".into(), text("gender"));
    form.insert("region".into(), text("region"));
    form.insert(
        "status".into(),
        json!(record
            .and_then(|r| r.non_blank("status"))
            .unwrap_or("active")),
    );
    form.insert(
        "lastSeen".into(),
        json!(format_date_time_local(
            record.and_then(|r| r.date("lastSeen")),
            ctx.offset
        )),
    );
    form.insert("notes".into(), text("notes"));
    form.insert(
        "conditions".into(),
        json!(record.map(conditions_of).unwrap_or_default()),
    );
    form
}

fn validate(form: &Fields, ctx: &TableContext<'_>) -> Result<Fields, ValidationError> {
    let full_name = forms::text(form, "fullName");
    let email = forms::text(form, "email");
    let birth_date = forms::text(form, "birthDate");
    let gender = forms::text(form, "gender");
    let region = forms::text(form, "region");
    let status = forms::text(form, "status");
    let notes = forms::text(form, "notes");
    let last_seen = forms::text(form, "lastSeen");
    let conditions = normalize_conditions(form.get("conditions"));

    if [&full_name, &email, &birth_date, &gender, &region, &status]
        .iter()
        .any(|v| v.is_empty())
    {
        return Err(ValidationError::MissingRequired);
    }
    if conditions.is_empty() {
        return Err(ValidationError::NoConditions);
    }
    forms::ensure_unique(&conditions)?;

    let birth = parse_calendar_date(&birth_date).ok_or(ValidationError::InvalidBirthDate)?;
    let age = calculate_age(birth, ctx.today);
    if age < 0 {
        return Err(ValidationError::InvalidBirthDate);
    }

    let mut payload = Fields::new();
    payload.insert("fullName".into(), json!(full_name));
    payload.insert("email".into(), json!(email));
    payload.insert("birthDate".into(), json!(birth_date));
    payload.insert("age".into(), json!(age));
    payload.insert("gender".into(), json!(gender));
    payload.insert("region".into(), json!(region));
    payload.insert("status".into(), json!(status));
    payload.insert("notes".into(), json!(notes));
    payload.insert("conditions".into(), json!(conditions));
    if !last_seen.is_empty() {
        let at = parse_instant(&last_seen, ctx.offset).ok_or(ValidationError::InvalidLastSeen)?;
        payload.insert("lastSeen".into(), timestamp(at));
    }
    Ok(payload)
}
