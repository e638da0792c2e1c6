//! Form payload helpers and the validation errors shown to the admin.

use crate::record::Fields;
use serde_json::Value;
use thiserror::Error;

pub const MAX_EXPECTED_ITEMS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("필수 항목을 모두 입력해주세요.")]
    MissingRequired,
    #[error("질환명을 하나 이상 입력해주세요.")]
    NoConditions,
    #[error("이미 추가된 질환명입니다.")]
    DuplicateCondition,
    #[error("생년월일을 올바르게 입력해주세요.")]
    InvalidBirthDate,
    #[error("최근 접속일을 올바르게 입력해주세요.")]
    InvalidLastSeen,
    #[error("거주지역을 입력해주세요.")]
    MissingRegion,
    #[error("제목과 난이도를 입력해주세요.")]
    MissingTitleOrDifficulty,
    #[error("최소 1개의 미션을 추가해주세요.")]
    NoMissions,
    #[error("미션 이름을 입력해주세요.")]
    MissingMissionName,
    #[error("예상 질문/답변은 각각 최대 3개까지 입력할 수 있습니다.")]
    TooManyExpectedItems,
    #[error("참가자를 선택해주세요.")]
    MissingParticipant,
    #[error("시나리오를 선택해주세요.")]
    MissingScenario,
    #[error("완료 일시를 입력해주세요.")]
    MissingParticipatedAt,
    #[error("플레이 시간과 재도전 횟수는 0 이상이어야 합니다.")]
    NegativePlayStats,
    #[error("숫자를 올바르게 입력해주세요.")]
    InvalidNumber,
    #[error("미션 상태는 completed, skipped, failed 중 하나여야 합니다.")]
    InvalidMissionStatus,
}

/// Trimmed string field; numbers are stringified, anything else is blank.
pub fn text(form: &Fields, key: &str) -> String {
    match form.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Numeric field from a number or a numeric string. Blank is `None`.
pub fn number(form: &Fields, key: &str) -> Option<f64> {
    match form.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Like [`number`], but blank falls back to `default` and text that does
/// not parse is rejected.
pub fn number_or(form: &Fields, key: &str, default: f64) -> Result<f64, ValidationError> {
    match form.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(default),
        _ => number(form, key)
            .filter(|n| n.is_finite())
            .ok_or(ValidationError::InvalidNumber),
    }
}

/// Items as trimmed strings with blanks dropped.
pub fn string_items(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Rejects a list that names the same condition twice.
pub fn ensure_unique(conditions: &[String]) -> Result<(), ValidationError> {
    for (i, c) in conditions.iter().enumerate() {
        if conditions[..i].contains(c) {
            return Err(ValidationError::DuplicateCondition);
        }
    }
    Ok(())
}
