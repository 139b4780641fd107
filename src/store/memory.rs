//! Process-local store backends.
//!
//! These keep all records in memory and apply the same validation the note
//! service does, so the gateway can be served and exercised without a
//! remote account.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{
    BootstrapInfo, BootstrapProfile, BootstrapSettings, LinkedNotebook, Notebook, PremiumInfo,
    PrivilegeLevel, PublicUserInfo, SavedSearch, SyncState, Tag, User,
};
use super::{NoteStoreOperations, StoreError, StoreResult, UserStoreOperations};
use crate::logging::debug;

/// Protocol version implemented by the service
pub const EDAM_VERSION_MAJOR: i16 = 1;
pub const EDAM_VERSION_MINOR: i16 = 28;

const DEFAULT_NOTEBOOK_NAME: &str = "Default Notebook";

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn new_guid() -> String {
    Uuid::new_v4().to_string()
}

/// Require a non-blank string field
fn required<'a>(value: &'a Option<String>, parameter: &str) -> StoreResult<&'a str> {
    match value.as_deref() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(StoreError::required(parameter)),
    }
}

/// Whether any record other than `except` already uses `name`
fn name_taken<'a, I>(mut names: I, name: &str, except: Option<&str>) -> bool
where
    I: Iterator<Item = (&'a String, Option<&'a String>)>,
{
    names.any(|(guid, existing)| {
        Some(guid.as_str()) != except
            && existing.is_some_and(|existing| existing.eq_ignore_ascii_case(name))
    })
}

/// In-memory user store serving a single account
pub struct MemoryUserStore {
    user: User,
    premium: PremiumInfo,
    note_store_url: String,
    web_api_url_prefix: String,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    /// Create a store for a local demo account
    pub fn new() -> Self {
        let created = now_millis();
        Self::with_user(User {
            id: Some(1),
            username: Some("local".to_string()),
            email: Some("local@localhost".to_string()),
            name: Some("Local User".to_string()),
            timezone: Some("UTC".to_string()),
            privilege: Some(PrivilegeLevel::Normal),
            created: Some(created),
            updated: Some(created),
            active: Some(true),
            shard_id: Some("s1".to_string()),
            ..User::default()
        })
    }

    /// Create a store for the given account
    pub fn with_user(user: User) -> Self {
        let shard = user.shard_id.clone().unwrap_or_else(|| "s1".to_string());
        Self {
            premium: PremiumInfo {
                premium: Some(user.privilege == Some(PrivilegeLevel::Premium)),
                premium_recurring: Some(false),
                premium_extendable: Some(false),
                premium_pending: Some(false),
                premium_cancellation_pending: Some(false),
                can_purchase_upload_allowance: Some(false),
                premium_upgradable: Some(true),
                ..PremiumInfo::default()
            },
            note_store_url: format!("http://localhost/shard/{shard}/notestore"),
            web_api_url_prefix: format!("http://localhost/shard/{shard}/"),
            user,
        }
    }
}

#[async_trait]
impl UserStoreOperations for MemoryUserStore {
    async fn check_version(
        &self,
        client_name: String,
        edam_version_major: i16,
        edam_version_minor: i16,
    ) -> StoreResult<bool> {
        debug!(
            "checkVersion from [{}]: {}.{}",
            client_name, edam_version_major, edam_version_minor
        );
        Ok(edam_version_major == EDAM_VERSION_MAJOR && edam_version_minor <= EDAM_VERSION_MINOR)
    }

    async fn get_bootstrap_info(&self, locale: String) -> StoreResult<BootstrapInfo> {
        let profile = |name: &str, host: &str| BootstrapProfile {
            name: Some(name.to_string()),
            settings: Some(BootstrapSettings {
                service_host: Some(host.to_string()),
                marketing_url: Some(format!("https://{host}/")),
                support_url: Some(format!("https://{host}/support")),
                account_email_domain: Some(host.to_string()),
                enable_sharing: Some(true),
            }),
        };

        let mut profiles = vec![profile("Evernote", "www.evernote.com")];
        if locale.starts_with("zh_CN") {
            profiles.insert(0, profile("Evernote-China", "app.yinxiang.com"));
        }
        Ok(BootstrapInfo { profiles })
    }

    async fn get_user(&self) -> StoreResult<User> {
        Ok(self.user.clone())
    }

    async fn get_public_user_info(&self, username: String) -> StoreResult<PublicUserInfo> {
        if self.user.username.as_deref() != Some(username.as_str()) {
            return Err(StoreError::not_found("User.username", username));
        }
        Ok(PublicUserInfo {
            user_id: self.user.id,
            shard_id: self.user.shard_id.clone(),
            privilege: self.user.privilege,
            username: self.user.username.clone(),
            note_store_url: Some(self.note_store_url.clone()),
            web_api_url_prefix: Some(self.web_api_url_prefix.clone()),
        })
    }

    async fn get_premium_info(&self) -> StoreResult<PremiumInfo> {
        Ok(PremiumInfo {
            current_time: Some(now_millis()),
            ..self.premium.clone()
        })
    }

    async fn get_note_store_url(&self) -> StoreResult<String> {
        Ok(self.note_store_url.clone())
    }
}

#[derive(Default)]
struct NoteState {
    update_count: i32,
    notebooks: BTreeMap<String, Notebook>,
    tags: BTreeMap<String, Tag>,
    searches: BTreeMap<String, SavedSearch>,
    linked_notebooks: BTreeMap<String, LinkedNotebook>,
}

impl NoteState {
    fn next_usn(&mut self) -> i32 {
        self.update_count += 1;
        self.update_count
    }

    fn default_notebook_guid(&self) -> Option<String> {
        self.notebooks
            .iter()
            .find(|(_, notebook)| notebook.default_notebook == Some(true))
            .map(|(guid, _)| guid.clone())
    }

    /// Whether `guid` is `start` or one of its ancestors
    fn is_tag_ancestor(&self, guid: &str, start: &str) -> bool {
        let mut current = Some(start);
        // a parent chain never holds more links than there are tags
        for _ in 0..=self.tags.len() {
            match current {
                Some(candidate) if candidate == guid => return true,
                Some(candidate) => {
                    current = self
                        .tags
                        .get(candidate)
                        .and_then(|tag| tag.parent_guid.as_deref());
                }
                None => return false,
            }
        }
        false
    }

    fn clear_default_except(&mut self, keep: &str) {
        for (guid, notebook) in self.notebooks.iter_mut() {
            if guid != keep && notebook.default_notebook == Some(true) {
                notebook.default_notebook = Some(false);
            }
        }
    }
}

/// In-memory note store
pub struct MemoryNoteStore {
    state: RwLock<NoteState>,
}

impl Default for MemoryNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNoteStore {
    /// Create a store holding only a default notebook
    pub fn new() -> Self {
        let mut state = NoteState::default();
        let guid = new_guid();
        let now = now_millis();
        let usn = state.next_usn();
        state.notebooks.insert(
            guid.clone(),
            Notebook {
                guid: Some(guid),
                name: Some(DEFAULT_NOTEBOOK_NAME.to_string()),
                update_sequence_num: Some(usn),
                default_notebook: Some(true),
                service_created: Some(now),
                service_updated: Some(now),
                ..Notebook::default()
            },
        );
        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl NoteStoreOperations for MemoryNoteStore {
    async fn get_sync_state(&self) -> StoreResult<SyncState> {
        let state = self.state.read().await;
        Ok(SyncState {
            current_time: Some(now_millis()),
            full_sync_before: Some(0),
            update_count: Some(state.update_count),
            uploaded: Some(0),
        })
    }

    async fn list_notebooks(&self) -> StoreResult<Vec<Notebook>> {
        let state = self.state.read().await;
        Ok(state.notebooks.values().cloned().collect())
    }

    async fn get_notebook(&self, guid: String) -> StoreResult<Notebook> {
        let state = self.state.read().await;
        state
            .notebooks
            .get(&guid)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Notebook.guid", guid))
    }

    async fn get_default_notebook(&self) -> StoreResult<Notebook> {
        let state = self.state.read().await;
        state
            .default_notebook_guid()
            .and_then(|guid| state.notebooks.get(&guid).cloned())
            .ok_or_else(|| StoreError::not_found("Notebook.defaultNotebook", "true"))
    }

    async fn create_notebook(&self, notebook: Notebook) -> StoreResult<Notebook> {
        let mut state = self.state.write().await;
        let name = required(&notebook.name, "Notebook.name")?;
        let names = state
            .notebooks
            .iter()
            .map(|(guid, nb)| (guid, nb.name.as_ref()));
        if name_taken(names, name, None) {
            return Err(StoreError::conflict("Notebook.name"));
        }

        let guid = new_guid();
        let now = now_millis();
        let created = Notebook {
            guid: Some(guid.clone()),
            update_sequence_num: Some(state.next_usn()),
            default_notebook: Some(notebook.default_notebook == Some(true)),
            service_created: Some(now),
            service_updated: Some(now),
            ..notebook
        };
        if created.default_notebook == Some(true) {
            state.clear_default_except(&guid);
        }
        state.notebooks.insert(guid, created.clone());
        Ok(created)
    }

    async fn update_notebook(&self, notebook: Notebook) -> StoreResult<i32> {
        let mut state = self.state.write().await;
        let guid = required(&notebook.guid, "Notebook.guid")?.to_string();
        let name = required(&notebook.name, "Notebook.name")?;
        let Some(existing) = state.notebooks.get(&guid) else {
            return Err(StoreError::not_found("Notebook.guid", guid));
        };
        let service_created = existing.service_created;
        let was_default = existing.default_notebook;
        let names = state
            .notebooks
            .iter()
            .map(|(guid, nb)| (guid, nb.name.as_ref()));
        if name_taken(names, name, Some(&guid)) {
            return Err(StoreError::conflict("Notebook.name"));
        }

        let usn = state.next_usn();
        let becomes_default = notebook.default_notebook == Some(true);
        let updated = Notebook {
            update_sequence_num: Some(usn),
            service_created,
            service_updated: Some(now_millis()),
            default_notebook: if becomes_default {
                Some(true)
            } else {
                was_default
            },
            ..notebook
        };
        if becomes_default {
            state.clear_default_except(&guid);
        }
        state.notebooks.insert(guid, updated);
        Ok(usn)
    }

    async fn expunge_notebook(&self, guid: String) -> StoreResult<i32> {
        let mut state = self.state.write().await;
        match state.notebooks.get(&guid) {
            None => return Err(StoreError::not_found("Notebook.guid", guid)),
            Some(notebook) if notebook.default_notebook == Some(true) => {
                return Err(StoreError::conflict("Notebook.guid"));
            }
            Some(_) => {}
        }
        state.notebooks.remove(&guid);
        Ok(state.next_usn())
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let state = self.state.read().await;
        Ok(state.tags.values().cloned().collect())
    }

    async fn get_tag(&self, guid: String) -> StoreResult<Tag> {
        let state = self.state.read().await;
        state
            .tags
            .get(&guid)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Tag.guid", guid))
    }

    async fn create_tag(&self, tag: Tag) -> StoreResult<Tag> {
        let mut state = self.state.write().await;
        let name = required(&tag.name, "Tag.name")?;
        let names = state.tags.iter().map(|(guid, t)| (guid, t.name.as_ref()));
        if name_taken(names, name, None) {
            return Err(StoreError::conflict("Tag.name"));
        }
        if let Some(parent) = &tag.parent_guid {
            if !state.tags.contains_key(parent) {
                return Err(StoreError::not_found("Tag.parentGuid", parent.clone()));
            }
        }

        let guid = new_guid();
        let created = Tag {
            guid: Some(guid.clone()),
            update_sequence_num: Some(state.next_usn()),
            ..tag
        };
        state.tags.insert(guid, created.clone());
        Ok(created)
    }

    async fn update_tag(&self, tag: Tag) -> StoreResult<i32> {
        let mut state = self.state.write().await;
        let guid = required(&tag.guid, "Tag.guid")?.to_string();
        let name = required(&tag.name, "Tag.name")?;
        if !state.tags.contains_key(&guid) {
            return Err(StoreError::not_found("Tag.guid", guid));
        }
        let names = state.tags.iter().map(|(guid, t)| (guid, t.name.as_ref()));
        if name_taken(names, name, Some(&guid)) {
            return Err(StoreError::conflict("Tag.name"));
        }
        if let Some(parent) = &tag.parent_guid {
            if !state.tags.contains_key(parent) {
                return Err(StoreError::not_found("Tag.parentGuid", parent.clone()));
            }
            if state.is_tag_ancestor(&guid, parent) {
                return Err(StoreError::conflict("Tag.parentGuid"));
            }
        }

        let usn = state.next_usn();
        state.tags.insert(
            guid,
            Tag {
                update_sequence_num: Some(usn),
                ..tag
            },
        );
        Ok(usn)
    }

    async fn expunge_tag(&self, guid: String) -> StoreResult<i32> {
        let mut state = self.state.write().await;
        if state.tags.remove(&guid).is_none() {
            return Err(StoreError::not_found("Tag.guid", guid));
        }
        // children of an expunged tag move to the top level
        for child in state.tags.values_mut() {
            if child.parent_guid.as_deref() == Some(guid.as_str()) {
                child.parent_guid = None;
            }
        }
        Ok(state.next_usn())
    }

    async fn list_searches(&self) -> StoreResult<Vec<SavedSearch>> {
        let state = self.state.read().await;
        Ok(state.searches.values().cloned().collect())
    }

    async fn get_search(&self, guid: String) -> StoreResult<SavedSearch> {
        let state = self.state.read().await;
        state
            .searches
            .get(&guid)
            .cloned()
            .ok_or_else(|| StoreError::not_found("SavedSearch.guid", guid))
    }

    async fn create_search(&self, search: SavedSearch) -> StoreResult<SavedSearch> {
        let mut state = self.state.write().await;
        let name = required(&search.name, "SavedSearch.name")?;
        required(&search.query, "SavedSearch.query")?;
        let names = state
            .searches
            .iter()
            .map(|(guid, s)| (guid, s.name.as_ref()));
        if name_taken(names, name, None) {
            return Err(StoreError::conflict("SavedSearch.name"));
        }

        let guid = new_guid();
        let created = SavedSearch {
            guid: Some(guid.clone()),
            update_sequence_num: Some(state.next_usn()),
            ..search
        };
        state.searches.insert(guid, created.clone());
        Ok(created)
    }

    async fn update_search(&self, search: SavedSearch) -> StoreResult<i32> {
        let mut state = self.state.write().await;
        let guid = required(&search.guid, "SavedSearch.guid")?.to_string();
        let name = required(&search.name, "SavedSearch.name")?;
        required(&search.query, "SavedSearch.query")?;
        if !state.searches.contains_key(&guid) {
            return Err(StoreError::not_found("SavedSearch.guid", guid));
        }
        let names = state
            .searches
            .iter()
            .map(|(guid, s)| (guid, s.name.as_ref()));
        if name_taken(names, name, Some(&guid)) {
            return Err(StoreError::conflict("SavedSearch.name"));
        }

        let usn = state.next_usn();
        state.searches.insert(
            guid,
            SavedSearch {
                update_sequence_num: Some(usn),
                ..search
            },
        );
        Ok(usn)
    }

    async fn expunge_search(&self, guid: String) -> StoreResult<i32> {
        let mut state = self.state.write().await;
        if state.searches.remove(&guid).is_none() {
            return Err(StoreError::not_found("SavedSearch.guid", guid));
        }
        Ok(state.next_usn())
    }

    async fn list_linked_notebooks(&self) -> StoreResult<Vec<LinkedNotebook>> {
        let state = self.state.read().await;
        Ok(state.linked_notebooks.values().cloned().collect())
    }

    async fn create_linked_notebook(
        &self,
        linked_notebook: LinkedNotebook,
    ) -> StoreResult<LinkedNotebook> {
        let mut state = self.state.write().await;
        required(&linked_notebook.share_name, "LinkedNotebook.shareName")?;
        required(&linked_notebook.username, "LinkedNotebook.username")?;

        let guid = new_guid();
        let created = LinkedNotebook {
            guid: Some(guid.clone()),
            update_sequence_num: Some(state.next_usn()),
            ..linked_notebook
        };
        state.linked_notebooks.insert(guid, created.clone());
        Ok(created)
    }

    async fn update_linked_notebook(&self, linked_notebook: LinkedNotebook) -> StoreResult<i32> {
        let mut state = self.state.write().await;
        let guid = required(&linked_notebook.guid, "LinkedNotebook.guid")?.to_string();
        required(&linked_notebook.share_name, "LinkedNotebook.shareName")?;
        if !state.linked_notebooks.contains_key(&guid) {
            return Err(StoreError::not_found("LinkedNotebook.guid", guid));
        }

        let usn = state.next_usn();
        state.linked_notebooks.insert(
            guid,
            LinkedNotebook {
                update_sequence_num: Some(usn),
                ..linked_notebook
            },
        );
        Ok(usn)
    }

    async fn expunge_linked_notebook(&self, guid: String) -> StoreResult<i32> {
        let mut state = self.state.write().await;
        if state.linked_notebooks.remove(&guid).is_none() {
            return Err(StoreError::not_found("LinkedNotebook.guid", guid));
        }
        Ok(state.next_usn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ErrorCode;

    fn tag(name: &str) -> Tag {
        Tag {
            name: Some(name.to_string()),
            ..Tag::default()
        }
    }

    #[tokio::test]
    async fn test_new_store_has_default_notebook() {
        let store = MemoryNoteStore::new();

        let notebooks = store.list_notebooks().await.unwrap();
        assert_eq!(notebooks.len(), 1);

        let default = store.get_default_notebook().await.unwrap();
        assert_eq!(default.name.as_deref(), Some(DEFAULT_NOTEBOOK_NAME));
        assert_eq!(default.guid, notebooks[0].guid);
    }

    #[tokio::test]
    async fn test_create_and_get_tag() {
        let store = MemoryNoteStore::new();

        let created = store.create_tag(tag("TAG_NAME")).await.unwrap();
        let guid = created.guid.clone().unwrap();
        assert!(created.update_sequence_num.unwrap() > 1);

        let fetched = store.get_tag(guid).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_tag_validation() {
        let store = MemoryNoteStore::new();
        store.create_tag(tag("work")).await.unwrap();

        let err = store.create_tag(tag("WORK")).await.unwrap_err();
        assert_eq!(err, StoreError::conflict("Tag.name"));

        let err = store.create_tag(Tag::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::User { code: ErrorCode::DataRequired, .. }));

        let orphan = Tag {
            parent_guid: Some("missing".to_string()),
            ..tag("child")
        };
        let err = store.create_tag(orphan).await.unwrap_err();
        assert_eq!(err, StoreError::not_found("Tag.parentGuid", "missing"));
    }

    #[tokio::test]
    async fn test_expunge_tag_releases_children() {
        let store = MemoryNoteStore::new();
        let parent = store.create_tag(tag("parent")).await.unwrap();
        let child = store
            .create_tag(Tag {
                parent_guid: parent.guid.clone(),
                ..tag("child")
            })
            .await
            .unwrap();

        store.expunge_tag(parent.guid.clone().unwrap()).await.unwrap();

        let child = store.get_tag(child.guid.unwrap()).await.unwrap();
        assert_eq!(child.parent_guid, None);
        let err = store.get_tag(parent.guid.unwrap()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_sequence_numbers_increase() {
        let store = MemoryNoteStore::new();
        let created = store.create_tag(tag("a")).await.unwrap();

        let usn = store
            .update_tag(Tag {
                name: Some("b".to_string()),
                ..created.clone()
            })
            .await
            .unwrap();
        assert!(usn > created.update_sequence_num.unwrap());

        let state = store.get_sync_state().await.unwrap();
        assert_eq!(state.update_count, Some(usn));
    }

    #[tokio::test]
    async fn test_tag_cannot_move_under_its_descendant() {
        let store = MemoryNoteStore::new();
        let a = store.create_tag(tag("a")).await.unwrap();
        let b = store
            .create_tag(Tag {
                parent_guid: a.guid.clone(),
                ..tag("b")
            })
            .await
            .unwrap();
        let c = store
            .create_tag(Tag {
                parent_guid: b.guid.clone(),
                ..tag("c")
            })
            .await
            .unwrap();

        for parent in [&a, &b, &c] {
            let err = store
                .update_tag(Tag {
                    parent_guid: parent.guid.clone(),
                    ..a.clone()
                })
                .await
                .unwrap_err();
            assert_eq!(err, StoreError::conflict("Tag.parentGuid"));
        }
        let unchanged = store.get_tag(a.guid.clone().unwrap()).await.unwrap();
        assert_eq!(unchanged.parent_guid, None);

        // moving a leaf under a sibling branch is fine
        let d = store.create_tag(tag("d")).await.unwrap();
        store
            .update_tag(Tag {
                parent_guid: d.guid.clone(),
                ..c.clone()
            })
            .await
            .unwrap();
        let moved = store.get_tag(c.guid.unwrap()).await.unwrap();
        assert_eq!(moved.parent_guid, d.guid);
    }

    #[tokio::test]
    async fn test_default_notebook_moves() {
        let store = MemoryNoteStore::new();
        let original = store.get_default_notebook().await.unwrap();

        let created = store
            .create_notebook(Notebook {
                name: Some("Work".to_string()),
                default_notebook: Some(true),
                ..Notebook::default()
            })
            .await
            .unwrap();

        let default = store.get_default_notebook().await.unwrap();
        assert_eq!(default.guid, created.guid);

        // the previous default can now be expunged
        store.expunge_notebook(original.guid.unwrap()).await.unwrap();
        let err = store.expunge_notebook(created.guid.unwrap()).await.unwrap_err();
        assert_eq!(err, StoreError::conflict("Notebook.guid"));
    }

    #[tokio::test]
    async fn test_saved_search_requires_query() {
        let store = MemoryNoteStore::new();
        let err = store
            .create_search(SavedSearch {
                name: Some("recent".to_string()),
                ..SavedSearch::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::required("SavedSearch.query"));
    }

    #[tokio::test]
    async fn test_user_store() {
        let store = MemoryUserStore::new();

        assert!(store.check_version("test".to_string(), 1, 28).await.unwrap());
        assert!(!store.check_version("test".to_string(), 2, 0).await.unwrap());

        let info = store.get_public_user_info("local".to_string()).await.unwrap();
        assert_eq!(info.user_id, Some(1));
        let err = store
            .get_public_user_info("nobody".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::not_found("User.username", "nobody"));

        let bootstrap = store.get_bootstrap_info("zh_CN".to_string()).await.unwrap();
        assert_eq!(bootstrap.profiles.len(), 2);
    }
}
