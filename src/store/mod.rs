//! Store operation sets and the accessor selecting one per route.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::gateway::Gateway;

pub mod error;
pub mod memory;
pub mod registry;
pub mod types;

pub use error::{ErrorCode, StoreError, StoreResult};

use types::{
    BootstrapInfo, LinkedNotebook, Notebook, PremiumInfo, PublicUserInfo, SavedSearch, SyncState,
    Tag, User,
};

/// Account-level operations of the note service
#[async_trait]
pub trait UserStoreOperations: Send + Sync {
    /// Whether the client's protocol version is accepted by the service
    async fn check_version(
        &self,
        client_name: String,
        edam_version_major: i16,
        edam_version_minor: i16,
    ) -> StoreResult<bool>;

    /// Service profiles available to a client in the given locale
    async fn get_bootstrap_info(&self, locale: String) -> StoreResult<BootstrapInfo>;

    /// The account the store is bound to
    async fn get_user(&self) -> StoreResult<User>;

    /// Publicly visible details of the named user
    async fn get_public_user_info(&self, username: String) -> StoreResult<PublicUserInfo>;

    /// Subscription state of the account
    async fn get_premium_info(&self) -> StoreResult<PremiumInfo>;

    /// URL of the account's note store
    async fn get_note_store_url(&self) -> StoreResult<String>;
}

/// Content-level operations of a note store
///
/// Every change to a store bumps its update count. The update sequence
/// number (USN) returned by a mutation is the count that change was
/// assigned; clients compare it with `SyncState::update_count` to tell what
/// they have already seen.
#[async_trait]
pub trait NoteStoreOperations: Send + Sync {
    /// Current update count and sync timestamps
    async fn get_sync_state(&self) -> StoreResult<SyncState>;

    /// Every notebook in the store
    async fn list_notebooks(&self) -> StoreResult<Vec<Notebook>>;

    /// The notebook with `guid`
    async fn get_notebook(&self, guid: String) -> StoreResult<Notebook>;

    /// The notebook new notes land in
    async fn get_default_notebook(&self) -> StoreResult<Notebook>;

    /// Store a new notebook, returning it with its assigned GUID
    async fn create_notebook(&self, notebook: Notebook) -> StoreResult<Notebook>;

    /// Replace the notebook named by `notebook.guid`; returns its new update sequence number
    async fn update_notebook(&self, notebook: Notebook) -> StoreResult<i32>;

    /// Permanently remove a notebook; returns the update sequence number of the removal
    async fn expunge_notebook(&self, guid: String) -> StoreResult<i32>;

    /// Every tag in the store
    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;

    /// The tag with `guid`
    async fn get_tag(&self, guid: String) -> StoreResult<Tag>;

    /// Store a new tag, returning it with its assigned GUID
    async fn create_tag(&self, tag: Tag) -> StoreResult<Tag>;

    /// Replace the tag named by `tag.guid`; returns its new update sequence number
    async fn update_tag(&self, tag: Tag) -> StoreResult<i32>;

    /// Permanently remove a tag, detaching its children; returns the update sequence number of the removal
    async fn expunge_tag(&self, guid: String) -> StoreResult<i32>;

    /// Every saved search in the store
    async fn list_searches(&self) -> StoreResult<Vec<SavedSearch>>;

    /// The saved search with `guid`
    async fn get_search(&self, guid: String) -> StoreResult<SavedSearch>;

    /// Store a new saved search, returning it with its assigned GUID
    async fn create_search(&self, search: SavedSearch) -> StoreResult<SavedSearch>;

    /// Replace the search named by `search.guid`; returns its new update sequence number
    async fn update_search(&self, search: SavedSearch) -> StoreResult<i32>;

    /// Permanently remove a saved search; returns the update sequence number of the removal
    async fn expunge_search(&self, guid: String) -> StoreResult<i32>;

    /// Every notebook shared into this account
    async fn list_linked_notebooks(&self) -> StoreResult<Vec<LinkedNotebook>>;

    /// Link a shared notebook into this account
    async fn create_linked_notebook(
        &self,
        linked_notebook: LinkedNotebook,
    ) -> StoreResult<LinkedNotebook>;

    /// Replace a linked notebook; returns its new update sequence number
    async fn update_linked_notebook(&self, linked_notebook: LinkedNotebook) -> StoreResult<i32>;

    /// Remove a linked notebook; returns the update sequence number of the removal
    async fn expunge_linked_notebook(&self, guid: String) -> StoreResult<i32>;
}

/// Store variants, each served under its own route segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    User,
    Note,
    BusinessNote,
}

impl Store {
    /// All variants in route order
    pub const ALL: [Store; 3] = [Store::User, Store::Note, Store::BusinessNote];

    /// Route segment of the store
    pub fn segment(&self) -> &'static str {
        match self {
            Store::User => "userStore",
            Store::Note => "noteStore",
            Store::BusinessNote => "businessNoteStore",
        }
    }

    /// Store named by a route segment
    pub fn from_segment(segment: &str) -> Option<Store> {
        Store::ALL.into_iter().find(|store| store.segment() == segment)
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Supplies the operation set served for each store
#[derive(Default, Clone)]
pub struct StoreAccessor {
    gateways: HashMap<Store, Arc<Gateway>>,
}

impl StoreAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `gateway` for `store`, replacing any earlier one
    pub fn insert(&mut self, store: Store, gateway: Gateway) {
        self.gateways.insert(store, Arc::new(gateway));
    }

    /// Operation set of `store`, if it is served
    pub fn operations(&self, store: Store) -> Option<Arc<Gateway>> {
        self.gateways.get(&store).cloned()
    }

    /// Served stores in route order
    pub fn stores(&self) -> Vec<Store> {
        Store::ALL
            .into_iter()
            .filter(|store| self.gateways.contains_key(store))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_round_trip() {
        for store in Store::ALL {
            assert_eq!(Store::from_segment(store.segment()), Some(store));
        }
        assert_eq!(Store::from_segment("UserStore"), None);
        assert_eq!(Store::Note.to_string(), "noteStore");
    }

    #[test]
    fn test_accessor_selects_by_store() {
        let mut accessor = StoreAccessor::new();
        accessor.insert(Store::Note, Gateway::new("noteStore"));
        accessor.insert(Store::User, Gateway::new("userStore"));

        assert_eq!(accessor.operations(Store::Note).unwrap().target(), "noteStore");
        assert_eq!(accessor.operations(Store::User).unwrap().target(), "userStore");
        assert!(accessor.operations(Store::BusinessNote).is_none());
        assert_eq!(accessor.stores(), vec![Store::User, Store::Note]);
    }
}
