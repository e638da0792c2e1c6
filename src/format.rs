//! Display formatting for table cells, in the dashboard's Korean locale.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};
use serde_json::Value;

pub const EMPTY_CELL: &str = "-";

pub fn format_gender(value: Option<&str>) -> &'static str {
    match value {
        Some("male") => "남성",
        Some("female") => "여성",
        Some("other") => "기타/응답 안함",
        _ => EMPTY_CELL,
    }
}

pub fn format_status(value: Option<&str>) -> &'static str {
    match value {
        Some("active") => "활동 중",
        Some("paused") => "일시 중단",
        Some("completed") => "참여 완료",
        Some("blocked") => "차단됨",
        _ => EMPTY_CELL,
    }
}

pub fn format_difficulty(value: Option<&str>) -> &'static str {
    match value {
        Some("medium") => "보통",
        Some("hard") => "어려움",
        _ => "쉬움",
    }
}

pub fn format_duration_seconds(seconds: Option<f64>) -> String {
    let Some(s) = seconds.filter(|s| s.is_finite() && *s >= 0.0) else {
        return EMPTY_CELL.to_string();
    };
    let total = s.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let rest = total % 60;
    if hours > 0 {
        format!("{}시간 {:02}분 {:02}초", hours, minutes, rest)
    } else {
        format!("{}분 {:02}초", minutes, rest)
    }
}

/// `2026년 10월 18일`
pub fn format_date(value: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    let Some(dt) = value else {
        return EMPTY_CELL.to_string();
    };
    let local = dt.with_timezone(&offset);
    format!("{}년 {}월 {}일", local.year(), local.month(), local.day())
}

/// `2026. 10. 18. 오후 3:04:05`
pub fn format_date_time(value: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    let Some(dt) = value else {
        return EMPTY_CELL.to_string();
    };
    let local = dt.with_timezone(&offset);
    let (pm, hour12) = local.hour12();
    format!(
        "{}. {}. {}. {} {}:{:02}:{:02}",
        local.year(),
        local.month(),
        local.day(),
        if pm { "오후" } else { "오전" },
        hour12,
        local.minute(),
        local.second()
    )
}

/// Value for a `datetime-local` input.
pub fn format_date_time_local(value: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    value
        .map(|dt| dt.with_timezone(&offset).format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default()
}

pub fn format_birth_and_age(birth_date: Option<&str>, age: Option<f64>) -> String {
    let birth = birth_date.filter(|b| !b.is_empty()).unwrap_or(EMPTY_CELL);
    let age = age
        .filter(|a| a.is_finite())
        .map(|a| format!("{}세", a as i64))
        .unwrap_or_else(|| EMPTY_CELL.to_string());
    format!("{} / {}", birth, age)
}

/// Accepts a list or a comma-separated string; trims and drops blanks.
pub fn normalize_conditions(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string().trim().to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn format_conditions(list: &[String]) -> String {
    if list.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        list.join(", ")
    }
}

/// Whole years elapsed on `today`.
pub fn calculate_age(birth: NaiveDate, today: NaiveDate) -> i64 {
    let mut age = today.year() as i64 - birth.year() as i64;
    let birthday_passed = (today.month(), today.day()) >= (birth.month(), birth.day());
    if !birthday_passed {
        age -= 1;
    }
    age
}
