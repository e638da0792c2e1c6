use super::{difficulty_rank, is_known_difficulty};
use crate::compare::{SortDirection, SortValue};
use crate::config::DeskConfig;
use crate::format::{format_date, format_difficulty, EMPTY_CELL};
use crate::forms::{self, ValidationError, MAX_EXPECTED_ITEMS};
use crate::notify::Notifier;
use crate::record::{EntityKind, Fields, Record};
use crate::table::{Editor, Row, TableConfig, TableContext, TableController, TableError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const NO_RECORDS: &str =
    "등록된 시나리오가 없습니다. 오른쪽 상단의 시나리오 추가 버튼을 눌러 새 데이터를 입력하세요.";
pub const NO_MATCHES: &str = "조건에 맞는 시나리오가 없습니다. 제목이나 난이도 조건을 조정해보세요.";
pub const CREATED: &str = "새 시나리오가 추가되었습니다.";
pub const UPDATED: &str = "시나리오가 수정되었습니다.";
pub const MISSION_ADDED: &str = "미션이 추가되었습니다.";
pub const MISSION_UPDATED: &str = "미션이 업데이트되었습니다.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub expected_questions: Vec<String>,
    #[serde(default)]
    pub expected_answers: Vec<String>,
}

impl Mission {
    /// Trims every text, drops blanks and keeps at most three of each
    /// expected item.
    pub fn normalized(value: &Value) -> Self {
        let items = |key: &str| {
            let mut list = forms::string_items(value.get(key));
            list.truncate(MAX_EXPECTED_ITEMS);
            list
        };
        Self {
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            expected_questions: items("expectedQuestions"),
            expected_answers: items("expectedAnswers"),
        }
    }

    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub fn config(desk: &DeskConfig) -> TableConfig {
    TableConfig::builder(EntityKind::Scenarios)
        .page_size(desk.page_size)
        .sort("title", SortDirection::Asc, |r, _| {
            SortValue::text(r.non_blank("title"))
        })
        .sort("difficulty", SortDirection::Asc, |r, _| {
            difficulty_rank(r.non_blank("difficulty"))
        })
        .sort("createdAt", SortDirection::Desc, |r, _| {
            SortValue::instant(r.date("createdAt"))
        })
        .sort("missionCount", SortDirection::Desc, |r, _| {
            SortValue::Number(r.items("missions").len() as f64)
        })
        .default_sort("createdAt")
        .search(|r, _| r.text("title").map(str::to_string))
        .category("difficulty", |r, _| {
            r.non_blank("difficulty").map(str::to_string)
        })
        .date_filter(|r| r.date("createdAt"), None)
        .empty_messages(NO_RECORDS, NO_MATCHES)
        .saved_messages(CREATED, UPDATED)
        .row(render_row)
        .form(prefill, validate)
        .build()
}

pub fn missions_of(r: &Record) -> Vec<Mission> {
    r.items("missions").iter().map(Mission::normalized).collect()
}

fn render_row(r: &Record, ctx: &TableContext<'_>, _: usize) -> Row {
    Row::new(&r.id)
        .cell("title", r.non_blank("title").unwrap_or(EMPTY_CELL))
        .cell("difficulty", format_difficulty(r.text("difficulty")))
        .cell("createdAt", format_date(r.date("createdAt"), ctx.offset))
        .cell("missionCount", r.items("missions").len().to_string())
}

fn prefill(record: Option<&Record>, _: &TableContext<'_>) -> Fields {
    let missions: Vec<Value> = record
        .map(missions_of)
        .unwrap_or_default()
        .iter()
        .map(Mission::to_json)
        .collect();
    let mut form = Fields::new();
    form.insert(
        "title".into(),
        json!(record.and_then(|r| r.text("title")).unwrap_or_default()),
    );
    form.insert(
        "difficulty".into(),
        json!(record.and_then(|r| r.text("difficulty")).unwrap_or_default()),
    );
    form.insert("missions".into(), Value::Array(missions));
    form
}

fn validate(form: &Fields, _: &TableContext<'_>) -> Result<Fields, ValidationError> {
    let title = forms::text(form, "title");
    let difficulty = forms::text(form, "difficulty");
    if title.is_empty() || !is_known_difficulty(&difficulty) {
        return Err(ValidationError::MissingTitleOrDifficulty);
    }
    let items: &[Value] = match form.get("missions") {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    };
    for item in items {
        check_expected_items(item)?;
    }
    let missions: Vec<Mission> = items.iter().map(Mission::normalized).collect();
    if missions.is_empty() {
        return Err(ValidationError::NoMissions);
    }
    if missions.iter().any(|m| m.name.is_empty()) {
        return Err(ValidationError::MissingMissionName);
    }

    let mut payload = Fields::new();
    payload.insert("title".into(), json!(title));
    payload.insert("difficulty".into(), json!(difficulty));
    payload.insert(
        "missions".into(),
        Value::Array(missions.iter().map(Mission::to_json).collect()),
    );
    Ok(payload)
}

/// At most three expected questions and three expected answers per mission.
fn check_expected_items(mission: &Value) -> Result<(), ValidationError> {
    let too_many = ["expectedQuestions", "expectedAnswers"]
        .iter()
        .any(|k| forms::string_items(mission.get(*k)).len() > MAX_EXPECTED_ITEMS);
    if too_many {
        return Err(ValidationError::TooManyExpectedItems);
    }
    Ok(())
}

fn draft_missions(editor: &Editor) -> Vec<Value> {
    editor
        .form
        .get("missions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn put_missions(editor: &mut Editor, missions: Vec<Value>) {
    editor.form.insert("missions".into(), Value::Array(missions));
}

/// Adds the draft, or replaces the mission being edited.
fn save_draft(editor: &mut Editor, draft: &Value) -> Result<&'static str, ValidationError> {
    let name = draft
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default();
    if name.is_empty() {
        return Err(ValidationError::MissingMissionName);
    }
    check_expected_items(draft)?;

    let mission = Mission::normalized(draft).to_json();
    let mut missions = draft_missions(editor);
    let message = match editor.editing_item.take() {
        Some(i) if i < missions.len() => {
            missions[i] = mission;
            MISSION_UPDATED
        }
        _ => {
            missions.push(mission);
            MISSION_ADDED
        }
    };
    put_missions(editor, missions);
    Ok(message)
}

fn open_editor(table: &mut TableController) -> Result<&mut Editor, TableError> {
    table.editor_mut().ok_or(TableError::EditorClosed)
}

/// `Ok(false)` when the draft was rejected; the reason is in the notices.
pub fn save_mission(
    table: &mut TableController,
    draft: &Value,
    notifier: &mut Notifier,
) -> Result<bool, TableError> {
    let editor = open_editor(table)?;
    match save_draft(editor, draft) {
        Ok(message) => {
            notifier.success(message);
            Ok(true)
        }
        Err(e) => {
            notifier.error(e.to_string());
            Ok(false)
        }
    }
}

/// Marks a mission for editing and returns it for the draft inputs.
pub fn start_edit_mission(
    table: &mut TableController,
    index: usize,
) -> Result<Option<Value>, TableError> {
    let editor = open_editor(table)?;
    let Some(mission) = draft_missions(editor).get(index).cloned() else {
        return Ok(None);
    };
    editor.editing_item = Some(index);
    Ok(Some(mission))
}

pub fn remove_mission(table: &mut TableController, index: usize) -> Result<bool, TableError> {
    let editor = open_editor(table)?;
    let mut missions = draft_missions(editor);
    if index >= missions.len() {
        return Ok(false);
    }
    missions.remove(index);
    put_missions(editor, missions);
    editor.editing_item = None;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeKind;
    use crate::store::MemoryStore;
    use crate::table::SubmitOutcome;
    use chrono::{FixedOffset, NaiveDate};

    fn ctx() -> TableContext<'static> {
        TableContext::detached(
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            FixedOffset::east_opt(9 * 3600).unwrap(),
        )
    }

    fn table() -> TableController {
        let mut t = TableController::new(config(&DeskConfig::default()));
        t.open_editor(None, &ctx()).unwrap();
        t
    }

    #[test]
    fn mission_is_normalized_and_capped() {
        let m = Mission::normalized(&json!({
            "name": "  엘리베이터 타기 ",
            "expectedQuestions": ["몇 층?", " ", "누구와?", "왜?", "언제?"],
        }));
        assert_eq!(m.name, "엘리베이터 타기");
        assert_eq!(m.expected_questions, vec!["몇 층?", "누구와?", "왜?"]);
        assert!(m.expected_answers.is_empty());
    }

    #[test]
    fn mission_drafts_add_edit_and_remove() {
        let mut t = table();
        let mut notifier = Notifier::default();

        assert!(save_mission(&mut t, &json!({ "name": "첫 미션" }), &mut notifier).unwrap());
        assert!(save_mission(&mut t, &json!({ "name": "둘째 미션" }), &mut notifier).unwrap());
        assert_eq!(notifier.drain()[1].message, MISSION_ADDED);

        let picked = start_edit_mission(&mut t, 0).unwrap().unwrap();
        assert_eq!(picked["name"], json!("첫 미션"));
        assert!(save_mission(&mut t, &json!({ "name": "고친 미션" }), &mut notifier).unwrap());
        assert_eq!(notifier.drain()[0].message, MISSION_UPDATED);

        let missions = t.editor().unwrap().form["missions"].clone();
        assert_eq!(missions[0]["name"], json!("고친 미션"));
        assert_eq!(missions.as_array().map(Vec::len), Some(2));

        assert!(remove_mission(&mut t, 1).unwrap());
        assert!(!remove_mission(&mut t, 5).unwrap());
        assert_eq!(start_edit_mission(&mut t, 3).unwrap(), None);
    }

    #[test]
    fn rejected_drafts_leave_missions_untouched() {
        let mut t = table();
        let mut notifier = Notifier::default();

        assert!(!save_mission(&mut t, &json!({ "name": " " }), &mut notifier).unwrap());
        let too_many = json!({ "name": "질문 많음", "expectedAnswers": ["a", "b", "c", "d"] });
        assert!(!save_mission(&mut t, &too_many, &mut notifier).unwrap());

        let notices = notifier.drain();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.kind == NoticeKind::Error));
        assert_eq!(
            t.editor().unwrap().form["missions"].as_array().map(Vec::len),
            Some(0)
        );

        t.close_editor();
        assert_eq!(
            save_mission(&mut t, &json!({ "name": "x" }), &mut notifier),
            Err(TableError::EditorClosed)
        );
    }

    #[test]
    fn submit_requires_title_difficulty_and_missions() {
        let mut t = table();
        let mut store = MemoryStore::new();
        let mut notifier = Notifier::default();
        let c = ctx();

        let form = json!({ "title": "엘리베이터", "difficulty": "medium", "missions": [] });
        assert_eq!(
            t.submit(&mut store, "admin", form.as_object().unwrap(), &c, &mut notifier),
            SubmitOutcome::Invalid(ValidationError::NoMissions)
        );
        let form = json!({ "title": "", "difficulty": "medium" });
        assert_eq!(
            t.submit(&mut store, "admin", form.as_object().unwrap(), &c, &mut notifier),
            SubmitOutcome::Invalid(ValidationError::MissingTitleOrDifficulty)
        );

        save_mission(&mut t, &json!({ "name": "버튼 누르기" }), &mut notifier).unwrap();
        let mut form = t.editor().unwrap().form.clone();
        form.insert("title".into(), json!("엘리베이터"));
        form.insert("difficulty".into(), json!("hard"));
        let outcome = t.submit(&mut store, "admin", &form, &c, &mut notifier);
        assert!(matches!(outcome, SubmitOutcome::Saved { .. }));

        let row = &t.frame(&c).rows[0];
        assert_eq!(row.text("difficulty"), Some("어려움"));
        assert_eq!(row.text("missionCount"), Some("1"));
    }

    #[test]
    fn submit_rejects_more_than_three_expected_items() {
        let mut t = table();
        let mut store = MemoryStore::new();
        let mut notifier = Notifier::default();
        let c = ctx();

        let form = json!({
            "title": "엘리베이터",
            "difficulty": "easy",
            "missions": [{ "name": "인사하기", "expectedQuestions": ["a", "b", "c", "d"] }]
        });
        assert_eq!(
            t.submit(&mut store, "admin", form.as_object().unwrap(), &c, &mut notifier),
            SubmitOutcome::Invalid(ValidationError::TooManyExpectedItems)
        );
        assert_eq!(store.len("scenarios"), 0);
        assert!(t.editor().is_some());
    }
}
