use crate::record::Record;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive calendar-date window. A missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn is_bounded(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(f), Some(t)) if f > t)
    }

    /// Undated records only pass an unbounded window.
    pub fn admits(&self, date: Option<NaiveDate>) -> bool {
        if !self.is_bounded() {
            return true;
        }
        let Some(d) = date else {
            return false;
        };
        self.from.map(|f| d >= f).unwrap_or(true) && self.to.map(|t| d <= t).unwrap_or(true)
    }
}

/// The window shown before the admin picks one: `months` calendar months
/// back from `today`, through `today`.
pub fn default_date_range(today: NaiveDate, months: u32) -> DateRange {
    let from = today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN);
    DateRange::new(Some(from), Some(today))
}

/// Per-entity projections the filter reads. Implemented by the table
/// binding so the filter stays independent of entity configuration.
pub trait FilterFields {
    fn search_text(&self, record: &Record) -> Option<String>;
    fn record_date(&self, record: &Record) -> Option<NaiveDate>;
    fn category(&self, record: &Record, key: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub search: String,
    pub date_range: DateRange,
    pub categories: BTreeMap<String, String>,
}

pub fn matches_search(text: Option<&str>, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    text.map(|t| t.to_lowercase().contains(&q)).unwrap_or(false)
}

fn matches_categories<F: FilterFields + ?Sized>(
    fields: &F,
    record: &Record,
    categories: &BTreeMap<String, String>,
) -> bool {
    categories.iter().all(|(key, wanted)| {
        if wanted.is_empty() {
            return true;
        }
        fields.category(record, key).as_deref() == Some(wanted.as_str())
    })
}

/// Records passing every active criterion, in input order.
pub fn filter_records<'r, F: FilterFields + ?Sized>(
    records: &'r [Record],
    criteria: &Criteria,
    fields: &F,
) -> Vec<&'r Record> {
    records
        .iter()
        .filter(|r| matches_search(fields.search_text(r).as_deref(), &criteria.search))
        .filter(|r| criteria.date_range.admits(fields.record_date(r)))
        .filter(|r| matches_categories(fields, r, &criteria.categories))
        .collect()
}
