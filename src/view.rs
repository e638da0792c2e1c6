use crate::compare::SortDirection;
use crate::filter::DateRange;
use crate::pager;
use serde::Serialize;
use std::collections::BTreeMap;

/// Transient search/sort/filter/page configuration of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub search_query: String,
    pub sort_key: String,
    pub sort_direction: SortDirection,
    pub current_page: u32,
    /// `None` until the admin picks a range; the table's default window
    /// applies meanwhile without being stored here.
    pub date_range: Option<DateRange>,
    pub categories: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateRangeRejected {
    /// Last valid range, for restoring the inputs.
    pub restored: DateRange,
}

impl ViewState {
    pub fn new(sort_key: &str, sort_direction: SortDirection) -> Self {
        Self {
            search_query: String::new(),
            sort_key: sort_key.to_string(),
            sort_direction,
            current_page: 1,
            date_range: None,
            categories: BTreeMap::new(),
        }
    }

    pub fn set_search(&mut self, query: &str) {
        self.search_query = query.to_string();
        self.current_page = 1;
    }

    /// An empty value clears the dimension.
    pub fn set_category(&mut self, key: &str, value: &str) {
        let v = value.trim();
        if v.is_empty() {
            self.categories.remove(key);
        } else {
            self.categories.insert(key.to_string(), v.to_string());
        }
        self.current_page = 1;
    }

    /// `effective` is the range currently shown (explicit or default).
    pub fn set_date_range(
        &mut self,
        range: DateRange,
        effective: DateRange,
    ) -> Result<(), DateRangeRejected> {
        if range.is_inverted() {
            return Err(DateRangeRejected {
                restored: effective,
            });
        }
        self.date_range = Some(range);
        self.current_page = 1;
        Ok(())
    }

    /// Same key toggles; a new key starts at its column default.
    pub fn sort_click(&mut self, key: &str, default_direction: SortDirection) {
        if self.sort_key == key {
            self.sort_direction = self.sort_direction.toggled();
        } else {
            self.sort_key = key.to_string();
            self.sort_direction = default_direction;
        }
        self.current_page = 1;
    }

    pub fn clamp_page(&mut self, filtered_count: usize, page_size: usize) {
        self.current_page = pager::clamp_page(self.current_page, filtered_count, page_size);
    }
}
