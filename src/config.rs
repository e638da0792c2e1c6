use crate::db;
use crate::notify::DEFAULT_DISMISS_AFTER_MS;
use crate::pager::DEFAULT_PAGE_SIZE;
use anyhow::Context;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const DEFAULT_DATE_WINDOW_MONTHS: u32 = 3;
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigSection {
    Tables,
    Notices,
    Locale,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 3] = [Self::Tables, Self::Notices, Self::Locale];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tables" => Some(Self::Tables),
            "notices" => Some(Self::Notices),
            "locale" => Some(Self::Locale),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Notices => "notices",
            Self::Locale => "locale",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Tables => "setup.tables",
            Self::Notices => "setup.notices",
            Self::Locale => "setup.locale",
        }
    }
}

pub fn default_section(section: ConfigSection) -> Value {
    match section {
        ConfigSection::Tables => json!({
            "pageSize": DEFAULT_PAGE_SIZE,
            "defaultDateWindowMonths": DEFAULT_DATE_WINDOW_MONTHS
        }),
        ConfigSection::Notices => json!({
            "dismissAfterMs": DEFAULT_DISMISS_AFTER_MS
        }),
        ConfigSection::Locale => json!({
            "utcOffsetMinutes": DEFAULT_UTC_OFFSET_MINUTES
        }),
    }
}

fn parse_int_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let Some(n) = v.as_i64() else {
        return Err(format!("{} must be an integer", key));
    };
    if n < min || n > max {
        return Err(format!("{} must be between {} and {}", key, min, max));
    }
    Ok(n)
}

/// Applies a validated patch; unknown or out-of-range fields reject the
/// whole patch before anything is written.
pub fn merge_section_patch(
    section: ConfigSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let mut staged = current.clone();
    let Some(obj) = staged.as_object_mut() else {
        return Err("section is not an object".into());
    };
    for (k, v) in patch {
        let parsed = match (section, k.as_str()) {
            (ConfigSection::Tables, "pageSize") => parse_int_range(v, k, 1, 200)?,
            (ConfigSection::Tables, "defaultDateWindowMonths") => parse_int_range(v, k, 0, 24)?,
            (ConfigSection::Notices, "dismissAfterMs") => parse_int_range(v, k, 500, 60_000)?,
            (ConfigSection::Locale, "utcOffsetMinutes") => parse_int_range(v, k, -720, 840)?,
            _ => return Err(format!("unknown {} field: {}", section.name(), k)),
        };
        obj.insert(k.clone(), json!(parsed));
    }
    *current = staged;
    Ok(())
}

pub fn load_section(conn: &rusqlite::Connection, section: ConfigSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

pub fn save_section(
    conn: &rusqlite::Connection,
    section: ConfigSection,
    value: &Value,
) -> anyhow::Result<()> {
    db::settings_set_json(conn, section.key(), value)
        .with_context(|| format!("failed to save {} settings", section.name()))
}

/// Typed view over the sections the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskConfig {
    pub page_size: usize,
    pub default_date_window_months: u32,
    pub dismiss_after_ms: u64,
    pub utc_offset_minutes: i32,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            default_date_window_months: DEFAULT_DATE_WINDOW_MONTHS,
            dismiss_after_ms: DEFAULT_DISMISS_AFTER_MS,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

impl DeskConfig {
    pub fn load(conn: &rusqlite::Connection) -> anyhow::Result<Self> {
        let tables = load_section(conn, ConfigSection::Tables).context("load tables settings")?;
        let notices = load_section(conn, ConfigSection::Notices).context("load notices settings")?;
        let locale = load_section(conn, ConfigSection::Locale).context("load locale settings")?;
        Ok(Self::from_sections(&tables, &notices, &locale))
    }

    pub fn from_sections(tables: &Value, notices: &Value, locale: &Value) -> Self {
        let d = Self::default();
        Self {
            page_size: tables
                .get("pageSize")
                .and_then(|v| v.as_u64())
                .map(|v| v as usize)
                .unwrap_or(d.page_size),
            default_date_window_months: tables
                .get("defaultDateWindowMonths")
                .and_then(|v| v.as_u64())
                .map(|v| v as u32)
                .unwrap_or(d.default_date_window_months),
            dismiss_after_ms: notices
                .get("dismissAfterMs")
                .and_then(|v| v.as_u64())
                .unwrap_or(d.dismiss_after_ms),
            utc_offset_minutes: locale
                .get("utcOffsetMinutes")
                .and_then(|v| v.as_i64())
                .map(|v| v as i32)
                .unwrap_or(d.utc_offset_minutes),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}
