//! Generic record table: load -> filter -> sort -> paginate -> render for
//! one entity kind. Entity modules supply a [`TableConfig`] built with
//! [`TableConfigBuilder`]; everything else is shared.

use crate::compare::{compare_values, SortDirection, SortValue};
use crate::filter::{default_date_range, filter_records, Criteria, DateRange, FilterFields};
use crate::forms::ValidationError;
use crate::notify::Notifier;
use crate::pager::{self, pager_state, PagerState, DEFAULT_PAGE_SIZE};
use crate::record::{EntityKind, Fields, Record};
use crate::store::{RecordStore, StoreError};
use crate::view::ViewState;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub const LOAD_FAILED_MESSAGE: &str = "데이터를 불러오는 중 문제가 발생했습니다. 잠시 후 다시 시도해주세요.";
pub const SAVE_DENIED_MESSAGE: &str =
    "데이터베이스 권한이 없어 저장하지 못했습니다. 관리자에게 접근 권한을 요청해주세요.";
pub const SAVE_FAILED_MESSAGE: &str = "저장 중 문제가 발생했습니다. 잠시 후 다시 시도해주세요.";
pub const RANGE_INVERTED_MESSAGE: &str = "시작일은 종료일보다 늦을 수 없습니다.";

/// Read-only data a table needs besides its own collection: lookups into
/// the other collections and the admin's calendar.
#[derive(Debug, Clone, Copy)]
pub struct TableContext<'a> {
    pub participants: &'a [Record],
    pub scenarios: &'a [Record],
    pub today: NaiveDate,
    pub offset: FixedOffset,
}

impl<'a> TableContext<'a> {
    /// A context with no lookup collections.
    pub fn detached(today: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            participants: &[],
            scenarios: &[],
            today,
            offset,
        }
    }

    pub fn participant(&self, id: &str) -> Option<&'a Record> {
        find_by_id(self.participants, id)
    }

    pub fn scenario(&self, id: &str) -> Option<&'a Record> {
        find_by_id(self.scenarios, id)
    }
}

/// Matches the document id or a legacy `uid` field.
fn find_by_id<'a>(records: &'a [Record], id: &str) -> Option<&'a Record> {
    if id.is_empty() {
        return None;
    }
    records
        .iter()
        .find(|r| r.id == id || r.text("uid") == Some(id))
}

pub type SortAccessor = fn(&Record, &TableContext<'_>) -> SortValue;
pub type TextAccessor = fn(&Record, &TableContext<'_>) -> Option<String>;
pub type DateAccessor = fn(&Record) -> Option<DateTime<Utc>>;
pub type RowRenderer = fn(&Record, &TableContext<'_>, usize) -> Row;
pub type Normalizer = fn(Record) -> Record;
pub type FormFiller = fn(Option<&Record>, &TableContext<'_>) -> Fields;
pub type Validator = fn(&Fields, &TableContext<'_>) -> Result<Fields, ValidationError>;

#[derive(Clone, Copy)]
pub struct SortColumn {
    pub key: &'static str,
    pub default_direction: SortDirection,
    pub accessor: SortAccessor,
}

#[derive(Clone, Copy)]
pub struct CategoryFilter {
    pub key: &'static str,
    pub accessor: TextAccessor,
}

#[derive(Clone, Copy)]
pub struct DateFilter {
    pub accessor: DateAccessor,
    /// Window applied while the admin has not picked a range.
    pub default_window_months: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct TableMessages {
    pub no_records: &'static str,
    pub no_matches: &'static str,
    pub created: &'static str,
    pub updated: &'static str,
}

#[derive(Clone)]
pub struct TableConfig {
    pub kind: EntityKind,
    pub page_size: usize,
    pub default_sort_key: &'static str,
    pub columns: Vec<SortColumn>,
    pub search: TextAccessor,
    pub categories: Vec<CategoryFilter>,
    pub date_filter: Option<DateFilter>,
    pub messages: TableMessages,
    pub row: RowRenderer,
    pub normalize: Option<Normalizer>,
    pub form: FormFiller,
    pub validate: Validator,
}

impl TableConfig {
    pub fn builder(kind: EntityKind) -> TableConfigBuilder {
        TableConfigBuilder::new(kind)
    }

    pub fn column(&self, key: &str) -> Option<&SortColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn category(&self, key: &str) -> Option<&CategoryFilter> {
        self.categories.iter().find(|c| c.key == key)
    }

    fn default_direction(&self) -> SortDirection {
        self.column(self.default_sort_key)
            .map(|c| c.default_direction)
            .unwrap_or(SortDirection::Desc)
    }
}

fn no_search_text(_: &Record, _: &TableContext<'_>) -> Option<String> {
    None
}

fn id_only_row(record: &Record, _: &TableContext<'_>, _: usize) -> Row {
    Row::new(&record.id)
}

fn empty_form(_: Option<&Record>, _: &TableContext<'_>) -> Fields {
    Fields::new()
}

fn accept_form(form: &Fields, _: &TableContext<'_>) -> Result<Fields, ValidationError> {
    Ok(form.clone())
}

pub struct TableConfigBuilder {
    config: TableConfig,
}

impl TableConfigBuilder {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            config: TableConfig {
                kind,
                page_size: DEFAULT_PAGE_SIZE,
                default_sort_key: "",
                columns: Vec::new(),
                search: no_search_text,
                categories: Vec::new(),
                date_filter: None,
                messages: TableMessages {
                    no_records: "",
                    no_matches: "",
                    created: "",
                    updated: "",
                },
                row: id_only_row,
                normalize: None,
                form: empty_form,
                validate: accept_form,
            },
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size.max(1);
        self
    }

    pub fn sort(mut self, key: &'static str, default_direction: SortDirection, accessor: SortAccessor) -> Self {
        self.config.columns.push(SortColumn {
            key,
            default_direction,
            accessor,
        });
        self
    }

    pub fn default_sort(mut self, key: &'static str) -> Self {
        self.config.default_sort_key = key;
        self
    }

    pub fn search(mut self, accessor: TextAccessor) -> Self {
        self.config.search = accessor;
        self
    }

    pub fn category(mut self, key: &'static str, accessor: TextAccessor) -> Self {
        self.config.categories.push(CategoryFilter { key, accessor });
        self
    }

    pub fn date_filter(mut self, accessor: DateAccessor, default_window_months: Option<u32>) -> Self {
        self.config.date_filter = Some(DateFilter {
            accessor,
            default_window_months: default_window_months.filter(|m| *m > 0),
        });
        self
    }

    pub fn empty_messages(mut self, no_records: &'static str, no_matches: &'static str) -> Self {
        self.config.messages.no_records = no_records;
        self.config.messages.no_matches = no_matches;
        self
    }

    pub fn saved_messages(mut self, created: &'static str, updated: &'static str) -> Self {
        self.config.messages.created = created;
        self.config.messages.updated = updated;
        self
    }

    pub fn row(mut self, renderer: RowRenderer) -> Self {
        self.config.row = renderer;
        self
    }

    pub fn normalize(mut self, normalizer: Normalizer) -> Self {
        self.config.normalize = Some(normalizer);
        self
    }

    pub fn form(mut self, filler: FormFiller, validator: Validator) -> Self {
        self.config.form = filler;
        self.config.validate = validator;
        self
    }

    pub fn build(mut self) -> TableConfig {
        if self.config.column(self.config.default_sort_key).is_none() {
            self.config.default_sort_key = self.config.columns.first().map(|c| c.key).unwrap_or("");
        }
        self.config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub key: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub id: String,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, text: impl Into<String>) -> Self {
        self.cells.push(Cell {
            key,
            text: text.into(),
        });
        self
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.text.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TableStatus {
    Idle,
    Loading,
    Loaded,
    LoadFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Editor {
    pub editing_id: Option<String>,
    pub form: Fields,
    /// Index of the nested item (e.g. a mission) being edited in the form.
    pub editing_item: Option<usize>,
}

/// Everything the shell needs to draw one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFrame {
    pub table: EntityKind,
    pub status: TableStatus,
    pub rows: Vec<Row>,
    pub pager: PagerState,
    pub empty_message: Option<String>,
    pub total_count: usize,
    pub filtered_count: usize,
    pub search_query: String,
    pub sort_key: String,
    pub sort_direction: SortDirection,
    /// Range currently applied, explicit or default. `None` for tables
    /// without a date filter.
    pub date_range: Option<DateRange>,
    pub categories: BTreeMap<String, String>,
    pub editor: Option<Editor>,
}

/// Drawing collaborator. The pipeline never touches a UI runtime.
pub trait TableRenderer {
    fn render(&mut self, frame: &TableFrame);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("unknown sort key: {0}")]
    UnknownSortKey(String),
    #[error("unknown filter: {0}")]
    UnknownFilter(String),
    #[error("{0} has no date filter")]
    NoDateFilter(&'static str),
    #[error("record not found: {0}")]
    UnknownRecord(String),
    #[error("editor is not open")]
    EditorClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRangeChange {
    Applied,
    /// Inverted input; the previous range stays in force.
    Rejected { restored: DateRange },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved { id: String },
    Invalid(ValidationError),
    Denied,
    Failed,
}

struct Binding<'c, 'x> {
    config: &'c TableConfig,
    ctx: &'c TableContext<'x>,
}

impl FilterFields for Binding<'_, '_> {
    fn search_text(&self, record: &Record) -> Option<String> {
        (self.config.search)(record, self.ctx)
    }

    fn record_date(&self, record: &Record) -> Option<NaiveDate> {
        let filter = self.config.date_filter?;
        (filter.accessor)(record).map(|dt| dt.with_timezone(&self.ctx.offset).date_naive())
    }

    fn category(&self, record: &Record, key: &str) -> Option<String> {
        let filter = self.config.category(key)?;
        (filter.accessor)(record, self.ctx)
    }
}

pub struct TableController {
    config: TableConfig,
    records: Vec<Record>,
    view: ViewState,
    status: TableStatus,
    editor: Option<Editor>,
}

impl TableController {
    pub fn new(config: TableConfig) -> Self {
        let view = ViewState::new(config.default_sort_key, config.default_direction());
        Self {
            config,
            records: Vec::new(),
            view,
            status: TableStatus::Idle,
            editor: None,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[cfg(test)]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    #[cfg(test)]
    pub fn editor(&self) -> Option<&Editor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut Editor> {
        self.editor.as_mut()
    }

    /// Back to the state of a fresh session.
    pub fn clear(&mut self) {
        self.records.clear();
        self.view = ViewState::new(self.config.default_sort_key, self.config.default_direction());
        self.status = TableStatus::Idle;
        self.editor = None;
    }

    /// Replaces the collection wholesale. A denied read leaves an empty
    /// collection without telling the admin; any other failure keeps the
    /// previous collection and raises one warning.
    pub fn load<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        admin_id: &str,
        ctx: &TableContext<'_>,
        notifier: &mut Notifier,
    ) -> TableStatus {
        let collection = self.config.kind.collection();
        self.status = TableStatus::Loading;
        match store.list(collection, admin_id) {
            Ok(docs) => {
                let kind = self.config.kind;
                let normalize = self.config.normalize;
                self.records = docs
                    .iter()
                    .map(|d| {
                        let r = Record::from_document(kind, &d.id, &d.body);
                        match normalize {
                            Some(f) => f(r),
                            None => r,
                        }
                    })
                    .collect();
                self.status = TableStatus::Loaded;
                tracing::debug!(collection, count = self.records.len(), "collection loaded");
            }
            Err(StoreError::AccessDenied { .. }) => {
                self.records.clear();
                self.status = TableStatus::Loaded;
                tracing::info!(collection, admin_id, "read access denied; showing empty collection");
            }
            Err(StoreError::Other(message)) => {
                self.status = TableStatus::LoadFailed;
                tracing::warn!(collection, error = %message, "collection load failed");
                notifier.warning(LOAD_FAILED_MESSAGE);
            }
        }
        self.reclamp(ctx);
        self.status
    }

    fn criteria(&self, today: NaiveDate) -> Criteria {
        Criteria {
            search: self.view.search_query.clone(),
            date_range: self.effective_date_range(today).unwrap_or_default(),
            categories: self.view.categories.clone(),
        }
    }

    /// Explicit range if set, else the configured default window.
    pub fn effective_date_range(&self, today: NaiveDate) -> Option<DateRange> {
        let filter = self.config.date_filter?;
        if let Some(range) = self.view.date_range {
            return Some(range);
        }
        Some(
            filter
                .default_window_months
                .map(|months| default_date_range(today, months))
                .unwrap_or_default(),
        )
    }

    fn filtered<'r>(&'r self, ctx: &TableContext<'_>) -> Vec<&'r Record> {
        let binding = Binding {
            config: &self.config,
            ctx,
        };
        filter_records(&self.records, &self.criteria(ctx.today), &binding)
    }

    /// Filtered records in display order.
    pub fn visible<'r>(&'r self, ctx: &TableContext<'_>) -> Vec<&'r Record> {
        let filtered = self.filtered(ctx);
        let Some(column) = self.config.column(&self.view.sort_key) else {
            return filtered;
        };
        let direction = self.view.sort_direction;
        let mut keyed: Vec<(SortValue, &Record)> = filtered
            .into_iter()
            .map(|r| ((column.accessor)(r, ctx), r))
            .collect();
        keyed.sort_by(|a, b| compare_values(&a.0, &b.0, direction));
        keyed.into_iter().map(|(_, r)| r).collect()
    }

    pub fn reclamp(&mut self, ctx: &TableContext<'_>) {
        let count = self.filtered(ctx).len();
        self.view.clamp_page(count, self.config.page_size);
    }

    pub fn frame(&mut self, ctx: &TableContext<'_>) -> TableFrame {
        self.reclamp(ctx);
        self.build_frame(ctx)
    }

    pub fn render(&mut self, ctx: &TableContext<'_>, renderer: &mut dyn TableRenderer) {
        let frame = self.frame(ctx);
        renderer.render(&frame);
    }

    fn build_frame(&self, ctx: &TableContext<'_>) -> TableFrame {
        let visible = self.visible(ctx);
        let page_size = self.config.page_size;
        let pager = pager_state(visible.len(), self.view.current_page, page_size);
        let page = pager::paginate(&visible, self.view.current_page, page_size);
        let rows = page
            .slice
            .iter()
            .enumerate()
            .map(|(i, r)| (self.config.row)(*r, ctx, pager.first_row_index + i + 1))
            .collect();

        let empty_message = if visible.is_empty() {
            let text = if self.records.is_empty() {
                self.config.messages.no_records
            } else {
                self.config.messages.no_matches
            };
            Some(text.to_string())
        } else {
            None
        };

        TableFrame {
            table: self.config.kind,
            status: self.status,
            rows,
            pager,
            empty_message,
            total_count: self.records.len(),
            filtered_count: visible.len(),
            search_query: self.view.search_query.clone(),
            sort_key: self.view.sort_key.clone(),
            sort_direction: self.view.sort_direction,
            date_range: self.effective_date_range(ctx.today),
            categories: self.view.categories.clone(),
            editor: self.editor.clone(),
        }
    }

    pub fn search(&mut self, query: &str) {
        self.view.set_search(query);
    }

    pub fn sort_click(&mut self, key: &str) -> Result<(), TableError> {
        let column = self
            .config
            .column(key)
            .ok_or_else(|| TableError::UnknownSortKey(key.to_string()))?;
        let default_direction = column.default_direction;
        self.view.sort_click(key, default_direction);
        Ok(())
    }

    pub fn set_category(&mut self, key: &str, value: &str) -> Result<(), TableError> {
        if self.config.category(key).is_none() {
            return Err(TableError::UnknownFilter(key.to_string()));
        }
        self.view.set_category(key, value);
        Ok(())
    }

    pub fn set_date_range(
        &mut self,
        range: DateRange,
        ctx: &TableContext<'_>,
        notifier: &mut Notifier,
    ) -> Result<DateRangeChange, TableError> {
        let effective = self
            .effective_date_range(ctx.today)
            .ok_or(TableError::NoDateFilter(self.config.kind.collection()))?;
        match self.view.set_date_range(range, effective) {
            Ok(()) => Ok(DateRangeChange::Applied),
            Err(rejected) => {
                notifier.warning(RANGE_INVERTED_MESSAGE);
                Ok(DateRangeChange::Rejected {
                    restored: rejected.restored,
                })
            }
        }
    }

    /// `false` when the page did not change and nothing needs drawing.
    pub fn page_click(&mut self, page: u32, ctx: &TableContext<'_>) -> bool {
        let count = self.filtered(ctx).len();
        let target = pager::clamp_page(page, count, self.config.page_size);
        if target == self.view.current_page {
            return false;
        }
        self.view.current_page = target;
        true
    }

    pub fn prev(&mut self, ctx: &TableContext<'_>) -> bool {
        if self.view.current_page <= 1 {
            return false;
        }
        self.page_click(self.view.current_page - 1, ctx)
    }

    pub fn next(&mut self, ctx: &TableContext<'_>) -> bool {
        self.page_click(self.view.current_page.saturating_add(1), ctx)
    }

    /// Opens the editor, prefilled from the record when `record_id` is set.
    pub fn open_editor(&mut self, record_id: Option<&str>, ctx: &TableContext<'_>) -> Result<(), TableError> {
        let record = match record_id {
            Some(id) => Some(
                self.records
                    .iter()
                    .find(|r| r.id == id)
                    .ok_or_else(|| TableError::UnknownRecord(id.to_string()))?,
            ),
            None => None,
        };
        let form = (self.config.form)(record, ctx);
        self.editor = Some(Editor {
            editing_id: record.map(|r| r.id.clone()),
            form,
            editing_item: None,
        });
        Ok(())
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    /// Validates and writes the form, updating when the editor holds an
    /// id and inserting otherwise. A successful save reloads the whole
    /// collection before the editor closes; failures leave it open.
    pub fn submit<S: RecordStore + ?Sized>(
        &mut self,
        store: &mut S,
        admin_id: &str,
        form: &Fields,
        ctx: &TableContext<'_>,
        notifier: &mut Notifier,
    ) -> SubmitOutcome {
        let merged = match self.editor.as_mut() {
            Some(editor) => {
                for (k, v) in form {
                    editor.form.insert(k.clone(), v.clone());
                }
                editor.form.clone()
            }
            None => form.clone(),
        };
        let mut payload = match (self.config.validate)(&merged, ctx) {
            Ok(p) => p,
            Err(e) => {
                notifier.error(e.to_string());
                return SubmitOutcome::Invalid(e);
            }
        };
        payload.insert("adminId".into(), Value::String(admin_id.to_string()));

        let collection = self.config.kind.collection();
        let editing_id = self.editor.as_ref().and_then(|e| e.editing_id.clone());
        let result = match &editing_id {
            Some(id) => store
                .update(collection, admin_id, id, payload)
                .map(|_| id.clone()),
            None => store.insert(collection, admin_id, payload),
        };

        match result {
            Ok(id) => {
                let message = if editing_id.is_some() {
                    self.config.messages.updated
                } else {
                    self.config.messages.created
                };
                tracing::info!(collection, id = %id, updated = editing_id.is_some(), "record saved");
                notifier.success(message);
                self.load(&*store, admin_id, ctx, notifier);
                self.editor = None;
                SubmitOutcome::Saved { id }
            }
            Err(StoreError::AccessDenied { .. }) => {
                tracing::warn!(collection, admin_id, "write access denied");
                notifier.warning(SAVE_DENIED_MESSAGE);
                SubmitOutcome::Denied
            }
            Err(StoreError::Other(message)) => {
                tracing::error!(collection, error = %message, "record save failed");
                notifier.error(SAVE_FAILED_MESSAGE);
                SubmitOutcome::Failed
            }
        }
    }
}
