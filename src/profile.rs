//! The signed-in admin's own `users/<uid>` document.

use crate::format::normalize_conditions;
use crate::forms::{self, ValidationError};
use crate::notify::Notifier;
use crate::record::Fields;
use crate::store::{RecordStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const USERS: &str = "users";
pub const UPDATED: &str = "프로필이 업데이트되었습니다.";
pub const UPDATE_DENIED: &str =
    "프로필을 저장할 권한이 없습니다. 변경 사항은 이 화면에만 반영되었습니다.";
pub const UPDATE_FAILED: &str = "프로필을 저장하지 못했습니다. 잠시 후 다시 시도해주세요.";

/// Who signed in, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl AdminIdentity {
    fn email_local_part(&self) -> Option<&str> {
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub uid: String,
    pub email: String,
    pub full_name: String,
    pub username: String,
    pub affiliation: String,
    pub position: String,
    pub birth_date: String,
    pub age: Option<i64>,
    pub gender: String,
    pub region: String,
    pub conditions: Vec<String>,
    pub status: String,
    pub notes: String,
    pub created_at: Option<String>,
}

impl AdminProfile {
    pub fn fallback(identity: &AdminIdentity) -> Self {
        let full_name = identity
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| identity.email_local_part())
            .unwrap_or("사용자")
            .to_string();
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone().unwrap_or_default(),
            full_name,
            username: identity.email_local_part().unwrap_or("user").to_string(),
            affiliation: String::new(),
            position: String::new(),
            birth_date: String::new(),
            age: None,
            gender: String::new(),
            region: String::new(),
            conditions: Vec::new(),
            status: "active".into(),
            notes: String::new(),
            created_at: None,
        }
    }

    /// Stored fields over the fallback; absent or mistyped fields keep it.
    pub fn from_document(identity: &AdminIdentity, body: &Fields) -> Self {
        let mut p = Self::fallback(identity);
        p.apply(body);
        p
    }

    fn apply(&mut self, body: &Fields) {
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        if let Some(v) = text("email") {
            self.email = v;
        }
        if let Some(v) = text("fullName").filter(|s| !s.trim().is_empty()) {
            self.full_name = v;
        }
        if let Some(v) = text("username").filter(|s| !s.trim().is_empty()) {
            self.username = v;
        }
        for (key, slot) in [
            ("affiliation", &mut self.affiliation),
            ("position", &mut self.position),
            ("birthDate", &mut self.birth_date),
            ("gender", &mut self.gender),
            ("region", &mut self.region),
            ("notes", &mut self.notes),
        ] {
            if let Some(v) = text(key) {
                *slot = v;
            }
        }
        if let Some(v) = text("status").filter(|s| !s.trim().is_empty()) {
            self.status = v;
        }
        if let Some(age) = body.get("age").and_then(Value::as_f64) {
            self.age = Some(age as i64);
        }
        if body.contains_key("conditions") || body.contains_key("condition") {
            self.conditions =
                normalize_conditions(body.get("conditions").or_else(|| body.get("condition")));
        }
        if let Some(v) = text("createdAt") {
            self.created_at = Some(v);
        }
    }

    fn to_fields(&self) -> Fields {
        let mut f = Fields::new();
        f.insert("uid".into(), json!(self.uid));
        f.insert("email".into(), json!(self.email));
        f.insert("fullName".into(), json!(self.full_name));
        f.insert("username".into(), json!(self.username));
        f.insert("status".into(), json!(self.status));
        f.insert("region".into(), json!(self.region));
        f.insert("conditions".into(), json!(self.conditions));
        f.insert("notes".into(), json!(self.notes));
        f
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileUpdate {
    Saved,
    /// Kept locally; the store refused the write.
    LocalOnly,
    Invalid(ValidationError),
    Failed,
}

/// Reads the admin's profile, seeding a fallback document when none exists.
pub fn load_profile<S: RecordStore + ?Sized>(
    store: &mut S,
    identity: &AdminIdentity,
) -> Result<AdminProfile, StoreError> {
    match store.get(USERS, &identity.uid, &identity.uid) {
        Ok(Some(doc)) => Ok(AdminProfile::from_document(identity, &doc.body)),
        Ok(None) => {
            let profile = AdminProfile::fallback(identity);
            match store.set(USERS, &identity.uid, &identity.uid, profile.to_fields(), false) {
                Ok(()) => tracing::info!(uid = %identity.uid, "created fallback profile"),
                Err(StoreError::AccessDenied { .. }) => {
                    tracing::debug!(uid = %identity.uid, "fallback profile not persisted: access denied");
                }
                Err(e) => tracing::warn!(uid = %identity.uid, error = %e, "fallback profile not persisted"),
            }
            Ok(profile)
        }
        Err(StoreError::AccessDenied { .. }) => {
            tracing::debug!(uid = %identity.uid, "profile read denied; using fallback");
            Ok(AdminProfile::fallback(identity))
        }
        Err(e) => {
            tracing::error!(uid = %identity.uid, error = %e, "profile load failed");
            Err(e)
        }
    }
}

/// Validates and merge-writes the editable profile fields.
pub fn update_profile<S: RecordStore + ?Sized>(
    store: &mut S,
    profile: &mut AdminProfile,
    form: &Fields,
    notifier: &mut Notifier,
) -> ProfileUpdate {
    let region = forms::text(form, "region");
    if region.is_empty() {
        notifier.error(ValidationError::MissingRegion.to_string());
        return ProfileUpdate::Invalid(ValidationError::MissingRegion);
    }
    let conditions = normalize_conditions(form.get("conditions"));
    if conditions.is_empty() {
        notifier.error(ValidationError::NoConditions.to_string());
        return ProfileUpdate::Invalid(ValidationError::NoConditions);
    }
    if let Err(e) = forms::ensure_unique(&conditions) {
        notifier.error(e.to_string());
        return ProfileUpdate::Invalid(e);
    }

    let status = match forms::text(form, "status") {
        s if s.is_empty() => profile.status.clone(),
        s => s,
    };
    let mut patch = Fields::new();
    patch.insert("region".into(), json!(region));
    patch.insert("status".into(), json!(status));
    patch.insert("notes".into(), json!(forms::text(form, "notes")));
    patch.insert("conditions".into(), json!(conditions));

    let uid = profile.uid.clone();
    match store.set(USERS, &uid, &uid, patch.clone(), true) {
        Ok(()) => {
            profile.apply(&patch);
            notifier.success(UPDATED);
            ProfileUpdate::Saved
        }
        Err(StoreError::AccessDenied { .. }) => {
            tracing::warn!(uid = %uid, "profile write denied; keeping local changes");
            profile.apply(&patch);
            notifier.warning(UPDATE_DENIED);
            ProfileUpdate::LocalOnly
        }
        Err(e) => {
            tracing::error!(uid = %uid, error = %e, "profile update failed");
            notifier.error(UPDATE_FAILED);
            ProfileUpdate::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeKind;
    use crate::store::MemoryStore;

    fn identity() -> AdminIdentity {
        AdminIdentity {
            uid: "admin-1".into(),
            email: Some("jiwoo@example.com".into()),
            display_name: None,
        }
    }

    fn form(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_profile_falls_back_and_is_seeded() {
        let mut store = MemoryStore::new();
        let profile = load_profile(&mut store, &identity()).unwrap();
        assert_eq!(profile.full_name, "jiwoo");
        assert_eq!(profile.username, "jiwoo");
        assert_eq!(profile.status, "active");
        assert_eq!(store.len(USERS), 1);

        let anonymous = AdminProfile::fallback(&AdminIdentity {
            uid: "x".into(),
            ..Default::default()
        });
        assert_eq!(anonymous.full_name, "사용자");
        assert_eq!(anonymous.username, "user");
    }

    #[test]
    fn denied_reads_and_seed_writes_are_tolerated() {
        let mut store = MemoryStore::new();
        store.deny_writes(USERS);
        assert!(load_profile(&mut store, &identity()).is_ok());
        assert_eq!(store.len(USERS), 0);

        store.deny_reads(USERS);
        let profile = load_profile(&mut store, &identity()).unwrap();
        assert_eq!(profile.full_name, "jiwoo");

        store.fail(USERS, "unavailable");
        assert!(load_profile(&mut store, &identity()).is_err());
    }

    #[test]
    fn stored_document_wins_over_fallback() {
        let mut store = MemoryStore::new();
        store.seed(
            USERS,
            "admin-1",
            "admin-1",
            form(json!({ "fullName": "이지우", "region": "부산", "conditions": "불안, 우울" })),
        );
        let profile = load_profile(&mut store, &identity()).unwrap();
        assert_eq!(profile.full_name, "이지우");
        assert_eq!(profile.region, "부산");
        assert_eq!(profile.conditions, vec!["불안", "우울"]);
    }

    #[test]
    fn update_validates_then_merges() {
        let mut store = MemoryStore::new();
        let mut notifier = Notifier::default();
        let mut profile = load_profile(&mut store, &identity()).unwrap();

        let outcome = update_profile(
            &mut store,
            &mut profile,
            &form(json!({ "region": " ", "conditions": ["불안"] })),
            &mut notifier,
        );
        assert_eq!(outcome, ProfileUpdate::Invalid(ValidationError::MissingRegion));

        let outcome = update_profile(
            &mut store,
            &mut profile,
            &form(json!({ "region": "서울", "conditions": [] })),
            &mut notifier,
        );
        assert_eq!(outcome, ProfileUpdate::Invalid(ValidationError::NoConditions));

        let outcome = update_profile(
            &mut store,
            &mut profile,
            &form(json!({ "region": "서울", "conditions": ["불안"], "notes": "메모" })),
            &mut notifier,
        );
        assert_eq!(outcome, ProfileUpdate::Saved);
        assert_eq!(profile.region, "서울");
        let stored = store.get(USERS, "admin-1", "admin-1").unwrap().unwrap();
        assert_eq!(stored.body["notes"], json!("메모"));
        assert_eq!(stored.body["username"], json!("jiwoo"));
        assert_eq!(notifier.drain().last().map(|n| n.kind), Some(NoticeKind::Success));
    }

    #[test]
    fn denied_update_keeps_local_merge() {
        let mut store = MemoryStore::new();
        let mut notifier = Notifier::default();
        let mut profile = load_profile(&mut store, &identity()).unwrap();
        store.deny_writes(USERS);

        let outcome = update_profile(
            &mut store,
            &mut profile,
            &form(json!({ "region": "대구", "conditions": "공황" })),
            &mut notifier,
        );
        assert_eq!(outcome, ProfileUpdate::LocalOnly);
        assert_eq!(profile.region, "대구");
        let notices = notifier.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Warning);
    }
}
