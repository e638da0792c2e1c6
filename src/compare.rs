use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// A field value projected for ordering. Absent fields become `Null`,
/// never an empty string or zero.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Null,
    Text(String),
    Number(f64),
}

impl SortValue {
    pub fn text(s: Option<&str>) -> Self {
        s.map(|v| Self::Text(v.to_string())).unwrap_or(Self::Null)
    }

    pub fn number(n: Option<f64>) -> Self {
        n.map(Self::Number).unwrap_or(Self::Null)
    }

    pub fn instant(dt: Option<DateTime<Utc>>) -> Self {
        dt.map(|d| Self::Number(d.timestamp_millis() as f64))
            .unwrap_or(Self::Null)
    }

    fn as_display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => number_text(*n),
        }
    }
}

fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Total order over projected values for one direction.
///
/// Empties are the weakest values: last when ascending, first when
/// descending. A string on either side switches to collation; otherwise
/// values compare numerically.
pub fn compare_values(a: &SortValue, b: &SortValue, direction: SortDirection) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let asc = direction == SortDirection::Asc;
    match (a, b) {
        (SortValue::Null, SortValue::Null) => Ordering::Equal,
        (SortValue::Null, _) => {
            if asc {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (_, SortValue::Null) => {
            if asc {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (SortValue::Number(x), SortValue::Number(y)) => {
            let ord = x.total_cmp(y);
            if asc {
                ord
            } else {
                ord.reverse()
            }
        }
        _ => {
            let (x, y) = (a.as_display(), b.as_display());
            if asc {
                collate(&x, &y)
            } else {
                collate(&y, &x)
            }
        }
    }
}

// Script groups in Korean collation order: Hangul and Hanja are reordered
// ahead of Latin.
fn script_group(c: char) -> u8 {
    if !c.is_alphanumeric() {
        return 0;
    }
    if c.is_numeric() {
        return 1;
    }
    match c as u32 {
        0x1100..=0x11FF | 0x3130..=0x318F | 0xA960..=0xA97F | 0xAC00..=0xD7AF | 0xD7B0..=0xD7FF => 2,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF => 3,
        0x0000..=0x024F | 0x1E00..=0x1EFF => 4,
        _ => 5,
    }
}

struct CollationKey {
    primary: Vec<(u8, char)>,
    secondary: Vec<char>,
    tertiary: Vec<bool>,
}

impl CollationKey {
    fn new(s: &str) -> Self {
        let mut primary = Vec::new();
        let mut secondary = Vec::new();
        let mut tertiary = Vec::new();
        for c in s.nfd() {
            if is_combining_mark(c) {
                secondary.push(c);
                continue;
            }
            let lower = c.to_lowercase().next().unwrap_or(c);
            primary.push((script_group(c), lower));
            tertiary.push(c != lower);
        }
        Self {
            primary,
            secondary,
            tertiary,
        }
    }
}

/// Korean-locale string collation: script group, then base letters
/// case-insensitively, then accents, then lowercase before uppercase.
/// Hangul syllables decompose to jamo, which preserves dictionary order.
pub fn collate(a: &str, b: &str) -> Ordering {
    let ka = CollationKey::new(a);
    let kb = CollationKey::new(b);
    ka.primary
        .cmp(&kb.primary)
        .then_with(|| ka.secondary.cmp(&kb.secondary))
        .then_with(|| ka.tertiary.cmp(&kb.tertiary))
        .then_with(|| a.cmp(b))
}
