use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field map as it travels to and from the document store.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Participants,
    Scenarios,
    Contents,
    Users,
}

impl EntityKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "participants" => Some(Self::Participants),
            "scenarios" => Some(Self::Scenarios),
            "contents" => Some(Self::Contents),
            "users" => Some(Self::Users),
            _ => None,
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            Self::Participants => "participants",
            Self::Scenarios => "scenarios",
            Self::Contents => "contents",
            Self::Users => "users",
        }
    }

    /// Fields stored as RFC 3339 strings that decode into instants.
    /// `birthDate` is deliberately absent: it is a plain calendar string.
    pub fn date_fields(self) -> &'static [&'static str] {
        match self {
            Self::Participants => &["createdAt", "updatedAt", "lastSeen"],
            Self::Scenarios => &["createdAt", "updatedAt"],
            Self::Contents => &["participatedAt", "createdAt", "updatedAt"],
            Self::Users => &["createdAt", "updatedAt"],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
    List(Vec<String>),
    Nested(Value),
}

impl FieldValue {
    fn decode(value: &Value, is_date: bool) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => {
                let n = n.as_f64()?;
                if is_date {
                    // Epoch milliseconds, as some clients write them.
                    return Utc
                        .timestamp_millis_opt(n as i64)
                        .single()
                        .map(Self::Date)
                        .or(Some(Self::Number(n)));
                }
                Some(Self::Number(n))
            }
            Value::String(s) => {
                if is_date {
                    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                        return Some(Self::Date(dt.with_timezone(&Utc)));
                    }
                }
                Some(Self::Text(s.clone()))
            }
            Value::Array(items) => {
                if items.iter().all(|v| v.is_string()) {
                    Some(Self::List(
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect(),
                    ))
                } else {
                    Some(Self::Nested(value.clone()))
                }
            }
            Value::Object(_) => Some(Self::Nested(value.clone())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) => Value::String(s.clone()),
            Self::Date(dt) => Value::String(dt.to_rfc3339()),
            Self::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            Self::Nested(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn from_document(kind: EntityKind, id: &str, body: &Fields) -> Self {
        let date_fields = kind.date_fields();
        let fields = body
            .iter()
            .filter(|(k, _)| k.as_str() != "id")
            .filter_map(|(k, v)| {
                FieldValue::decode(v, date_fields.contains(&k.as_str())).map(|fv| (k.clone(), fv))
            })
            .collect();
        Self {
            id: id.to_string(),
            fields,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: &str, value: FieldValue) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Like `text`, but blank strings count as missing.
    pub fn non_blank(&self, key: &str) -> Option<&str> {
        self.text(key).filter(|s| !s.trim().is_empty())
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key) {
            Some(FieldValue::Number(n)) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn date(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(key) {
            Some(FieldValue::Date(dt)) => Some(*dt),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.fields.get(key) {
            Some(FieldValue::List(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Array-valued field as raw JSON items, whatever the element type.
    pub fn items(&self, key: &str) -> Vec<Value> {
        match self.fields.get(key) {
            Some(FieldValue::Nested(Value::Array(items))) => items.clone(),
            Some(FieldValue::List(items)) => items.iter().cloned().map(Value::String).collect(),
            _ => Vec::new(),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("id".into(), Value::String(self.id.clone()));
        for (k, v) in &self.fields {
            out.insert(k.clone(), v.to_json());
        }
        Value::Object(out)
    }
}

/// Parses the date/time shapes the dashboard forms submit: RFC 3339,
/// `datetime-local` (`YYYY-MM-DDTHH:MM[:SS]`) and bare `YYYY-MM-DD`.
/// Local shapes are read in the admin's offset.
pub fn parse_instant(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.with_timezone(&Utc));
    }
    let local = NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            parse_calendar_date(t).and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
