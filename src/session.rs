use crate::config::DeskConfig;
use crate::entities;
use crate::notify::Notifier;
use crate::profile::{load_profile, AdminIdentity, AdminProfile};
use crate::record::EntityKind;
use crate::store::{RecordStore, StoreError};
use crate::table::{TableContext, TableController, TableStatus};
use chrono::{FixedOffset, NaiveDate, Utc};

pub const TABLE_KINDS: [EntityKind; 3] = [
    EntityKind::Participants,
    EntityKind::Scenarios,
    EntityKind::Contents,
];

/// One signed-in admin: profile plus the three dashboard tables.
pub struct Session {
    identity: AdminIdentity,
    pub profile: AdminProfile,
    participants: TableController,
    scenarios: TableController,
    contents: TableController,
    today_override: Option<NaiveDate>,
    offset: FixedOffset,
}

impl Session {
    pub fn new(identity: AdminIdentity, profile: AdminProfile, desk: &DeskConfig) -> Self {
        Self {
            identity,
            profile,
            participants: TableController::new(entities::participants::config(desk)),
            scenarios: TableController::new(entities::scenarios::config(desk)),
            contents: TableController::new(entities::contents::config(desk)),
            today_override: None,
            offset: desk.offset(),
        }
    }

    /// Loads the profile, then each collection in order. Contents come
    /// last so their name and title lookups see fresh data.
    pub fn begin<S: RecordStore + ?Sized>(
        store: &mut S,
        identity: AdminIdentity,
        desk: &DeskConfig,
        today_override: Option<NaiveDate>,
        notifier: &mut Notifier,
    ) -> Result<Self, StoreError> {
        let profile = load_profile(store, &identity)?;
        let mut session = Self::new(identity, profile, desk);
        session.today_override = today_override;
        session.reload(&*store, notifier);
        tracing::info!(
            admin = %session.admin_id(),
            participants = session.participants.records().len(),
            scenarios = session.scenarios.records().len(),
            contents = session.contents.records().len(),
            "session started"
        );
        Ok(session)
    }

    pub fn admin_id(&self) -> &str {
        &self.identity.uid
    }

    /// Calendar date in the admin's offset.
    pub fn today(&self) -> NaiveDate {
        self.today_override
            .unwrap_or_else(|| Utc::now().with_timezone(&self.offset).date_naive())
    }

    pub fn table(&self, kind: EntityKind) -> Option<&TableController> {
        match kind {
            EntityKind::Participants => Some(&self.participants),
            EntityKind::Scenarios => Some(&self.scenarios),
            EntityKind::Contents => Some(&self.contents),
            EntityKind::Users => None,
        }
    }

    /// Runs `f` on one table with the lookup context it renders against.
    pub fn with_table<R>(
        &mut self,
        kind: EntityKind,
        f: impl FnOnce(&mut TableController, &TableContext<'_>) -> R,
    ) -> Option<R> {
        let today = self.today();
        let offset = self.offset;
        let Self {
            participants,
            scenarios,
            contents,
            ..
        } = self;
        match kind {
            EntityKind::Participants => Some(f(participants, &TableContext::detached(today, offset))),
            EntityKind::Scenarios => Some(f(scenarios, &TableContext::detached(today, offset))),
            EntityKind::Contents => {
                let ctx = TableContext {
                    participants: participants.records(),
                    scenarios: scenarios.records(),
                    today,
                    offset,
                };
                Some(f(contents, &ctx))
            }
            EntityKind::Users => None,
        }
    }

    pub fn load<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        kind: EntityKind,
        notifier: &mut Notifier,
    ) -> Option<TableStatus> {
        let admin = self.identity.uid.clone();
        self.with_table(kind, |table, ctx| table.load(store, &admin, ctx, notifier))
    }

    pub fn reload<S: RecordStore + ?Sized>(&mut self, store: &S, notifier: &mut Notifier) {
        for kind in TABLE_KINDS {
            self.load(store, kind, notifier);
        }
    }

    /// Drops records, view state and editors.
    pub fn clear(&mut self) {
        self.participants.clear();
        self.scenarios.clear();
        self.contents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Fields;
    use crate::table::SubmitOutcome;
    use serde_json::{json, Value};

    fn body(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    fn identity() -> AdminIdentity {
        AdminIdentity {
            uid: "admin".into(),
            email: Some("admin@example.com".into()),
            display_name: Some("관리자".into()),
        }
    }

    fn seeded() -> crate::store::MemoryStore {
        let mut store = crate::store::MemoryStore::new();
        store.seed("participants", "admin", "p1", body(json!({ "fullName": "김민수" })));
        store.seed("scenarios", "admin", "s1", body(json!({ "title": "엘리베이터", "difficulty": "medium" })));
        store.seed(
            "contents",
            "admin",
            "c1",
            body(json!({ "participantUid": "p1", "scenarioUid": "s1",
                         "participatedAt": "2026-10-10T03:00:00Z" })),
        );
        store
    }

    fn today() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, 10, 18)
    }

    #[test]
    fn begin_loads_profile_then_tables_with_lookups() {
        let mut store = seeded();
        let mut notifier = Notifier::default();
        let mut session =
            Session::begin(&mut store, identity(), &DeskConfig::default(), today(), &mut notifier)
                .unwrap();

        assert_eq!(session.profile.full_name, "관리자");
        assert!(notifier.pending().is_empty());
        let frame = session
            .with_table(EntityKind::Contents, |t, ctx| t.frame(ctx))
            .unwrap();
        assert_eq!(frame.rows[0].text("participantName"), Some("김민수"));
        assert_eq!(frame.rows[0].text("scenarioTitle"), Some("엘리베이터"));
        assert_eq!(frame.rows[0].text("difficulty"), Some("보통"));
        assert!(session.with_table(EntityKind::Users, |_, _| ()).is_none());
    }

    #[test]
    fn denied_collection_loads_empty_without_notice() {
        let mut store = seeded();
        store.deny_reads("participants");
        let mut notifier = Notifier::default();
        let mut session =
            Session::begin(&mut store, identity(), &DeskConfig::default(), today(), &mut notifier)
                .unwrap();

        assert!(notifier.pending().is_empty());
        assert_eq!(session.table(EntityKind::Participants).map(|t| t.records().len()), Some(0));
        let frame = session
            .with_table(EntityKind::Contents, |t, ctx| t.frame(ctx))
            .unwrap();
        assert_eq!(frame.rows[0].text("participantName"), Some(entities::UNKNOWN_NAME));
    }

    #[test]
    fn profile_store_failure_aborts_login() {
        let mut store = seeded();
        store.fail("users", "backend down");
        let mut notifier = Notifier::default();
        let result =
            Session::begin(&mut store, identity(), &DeskConfig::default(), today(), &mut notifier);
        assert!(matches!(result, Err(StoreError::Other(_))));
    }

    #[test]
    fn participant_save_refreshes_contents_lookups() {
        let mut store = seeded();
        let mut notifier = Notifier::default();
        let mut session =
            Session::begin(&mut store, identity(), &DeskConfig::default(), today(), &mut notifier)
                .unwrap();

        let admin = session.admin_id().to_string();
        let outcome = session
            .with_table(EntityKind::Participants, |t, ctx| {
                t.open_editor(Some("p1"), ctx).unwrap();
                let form = body(json!({
                    "fullName": "김민준", "email": "m@example.com", "birthDate": "1990-01-01",
                    "gender": "male", "region": "서울", "status": "active", "conditions": ["불안"]
                }));
                t.submit(&mut store, &admin, &form, ctx, &mut notifier)
            })
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Saved { .. }));

        let frame = session
            .with_table(EntityKind::Contents, |t, ctx| t.frame(ctx))
            .unwrap();
        assert_eq!(frame.rows[0].text("participantName"), Some("김민준"));

        session.clear();
        assert_eq!(session.table(EntityKind::Contents).map(|t| t.records().len()), Some(0));
    }
}
