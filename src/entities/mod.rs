//! Per-entity table configurations.

pub mod contents;
pub mod participants;
pub mod scenarios;

use crate::compare::SortValue;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

pub const UNKNOWN_NAME: &str = "알 수 없음";

/// easy < medium < hard; unknown values rank 0, absent values are null.
pub fn difficulty_rank(difficulty: Option<&str>) -> SortValue {
    match difficulty {
        None => SortValue::Null,
        Some("easy") => SortValue::Number(1.0),
        Some("medium") => SortValue::Number(2.0),
        Some("hard") => SortValue::Number(3.0),
        Some(_) => SortValue::Number(0.0),
    }
}

pub fn is_known_difficulty(value: &str) -> bool {
    matches!(value, "easy" | "medium" | "hard")
}

/// Storage form of an instant.
pub fn timestamp(dt: DateTime<Utc>) -> Value {
    Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Whole numbers are stored as integers.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}
