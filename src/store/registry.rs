//! Declaration lists binding wire operations to store traits.
//!
//! Each entry names the operation as it appears on the wire and its formal
//! parameters in signature order. Payload field names must match these
//! exactly.

use std::sync::Arc;

use super::types::{LinkedNotebook, Notebook, SavedSearch, Tag};
use super::{NoteStoreOperations, Store, UserStoreOperations};
use crate::gateway::Gateway;
use crate::params::ParamNames;

/// Build the user store gateway over `ops`
pub fn user_store_gateway(ops: Arc<dyn UserStoreOperations>) -> Gateway {
    let mut gateway = Gateway::new(Store::User.segment());

    let o = ops.clone();
    gateway.register(
        "checkVersion",
        ["clientName", "edamVersionMajor", "edamVersionMinor"],
        move |client_name: String, major: i16, minor: i16| {
            let o = o.clone();
            async move { o.check_version(client_name, major, minor).await }
        },
    );

    let o = ops.clone();
    gateway.register("getBootstrapInfo", ["locale"], move |locale: String| {
        let o = o.clone();
        async move { o.get_bootstrap_info(locale).await }
    });

    let o = ops.clone();
    gateway.register("getUser", ParamNames::none(), move || {
        let o = o.clone();
        async move { o.get_user().await }
    });

    let o = ops.clone();
    gateway.register("getPublicUserInfo", ["username"], move |username: String| {
        let o = o.clone();
        async move { o.get_public_user_info(username).await }
    });

    let o = ops.clone();
    gateway.register("getPremiumInfo", ParamNames::none(), move || {
        let o = o.clone();
        async move { o.get_premium_info().await }
    });

    let o = ops;
    gateway.register("getNoteStoreUrl", ParamNames::none(), move || {
        let o = o.clone();
        async move { o.get_note_store_url().await }
    });

    gateway
}

/// Build a note store gateway over `ops`, labelled with `store`
///
/// The personal and business note stores share this operation list.
pub fn note_store_gateway(store: Store, ops: Arc<dyn NoteStoreOperations>) -> Gateway {
    let mut gateway = Gateway::new(store.segment());

    let o = ops.clone();
    gateway.register("getSyncState", ParamNames::none(), move || {
        let o = o.clone();
        async move { o.get_sync_state().await }
    });

    // Notebooks
    let o = ops.clone();
    gateway.register("listNotebooks", ParamNames::none(), move || {
        let o = o.clone();
        async move { o.list_notebooks().await }
    });

    let o = ops.clone();
    gateway.register("getNotebook", ["guid"], move |guid: String| {
        let o = o.clone();
        async move { o.get_notebook(guid).await }
    });

    let o = ops.clone();
    gateway.register("getDefaultNotebook", ParamNames::none(), move || {
        let o = o.clone();
        async move { o.get_default_notebook().await }
    });

    let o = ops.clone();
    gateway.register("createNotebook", ["notebook"], move |notebook: Notebook| {
        let o = o.clone();
        async move { o.create_notebook(notebook).await }
    });

    let o = ops.clone();
    gateway.register("updateNotebook", ["notebook"], move |notebook: Notebook| {
        let o = o.clone();
        async move { o.update_notebook(notebook).await }
    });

    let o = ops.clone();
    gateway.register("expungeNotebook", ["guid"], move |guid: String| {
        let o = o.clone();
        async move { o.expunge_notebook(guid).await }
    });

    // Tags
    let o = ops.clone();
    gateway.register("listTags", ParamNames::none(), move || {
        let o = o.clone();
        async move { o.list_tags().await }
    });

    let o = ops.clone();
    gateway.register("getTag", ["guid"], move |guid: String| {
        let o = o.clone();
        async move { o.get_tag(guid).await }
    });

    let o = ops.clone();
    gateway.register("createTag", ["tag"], move |tag: Tag| {
        let o = o.clone();
        async move { o.create_tag(tag).await }
    });

    let o = ops.clone();
    gateway.register("updateTag", ["tag"], move |tag: Tag| {
        let o = o.clone();
        async move { o.update_tag(tag).await }
    });

    let o = ops.clone();
    gateway.register("expungeTag", ["guid"], move |guid: String| {
        let o = o.clone();
        async move { o.expunge_tag(guid).await }
    });

    // Saved searches
    let o = ops.clone();
    gateway.register("listSearches", ParamNames::none(), move || {
        let o = o.clone();
        async move { o.list_searches().await }
    });

    let o = ops.clone();
    gateway.register("getSearch", ["guid"], move |guid: String| {
        let o = o.clone();
        async move { o.get_search(guid).await }
    });

    let o = ops.clone();
    gateway.register("createSearch", ["search"], move |search: SavedSearch| {
        let o = o.clone();
        async move { o.create_search(search).await }
    });

    let o = ops.clone();
    gateway.register("updateSearch", ["search"], move |search: SavedSearch| {
        let o = o.clone();
        async move { o.update_search(search).await }
    });

    let o = ops.clone();
    gateway.register("expungeSearch", ["guid"], move |guid: String| {
        let o = o.clone();
        async move { o.expunge_search(guid).await }
    });

    // Linked notebooks
    let o = ops.clone();
    gateway.register("listLinkedNotebooks", ParamNames::none(), move || {
        let o = o.clone();
        async move { o.list_linked_notebooks().await }
    });

    let o = ops.clone();
    gateway.register(
        "createLinkedNotebook",
        ["linkedNotebook"],
        move |linked_notebook: LinkedNotebook| {
            let o = o.clone();
            async move { o.create_linked_notebook(linked_notebook).await }
        },
    );

    let o = ops.clone();
    gateway.register(
        "updateLinkedNotebook",
        ["linkedNotebook"],
        move |linked_notebook: LinkedNotebook| {
            let o = o.clone();
            async move { o.update_linked_notebook(linked_notebook).await }
        },
    );

    let o = ops;
    gateway.register("expungeLinkedNotebook", ["guid"], move |guid: String| {
        let o = o.clone();
        async move { o.expunge_linked_notebook(guid).await }
    });

    gateway
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::store::StoreError;
    use crate::store::memory::{MemoryNoteStore, MemoryUserStore};
    use serde_json::{Value, json};

    fn note_gateway() -> Gateway {
        note_store_gateway(Store::Note, Arc::new(MemoryNoteStore::new()))
    }

    #[tokio::test]
    async fn test_every_declaration_resolves() {
        let user = user_store_gateway(Arc::new(MemoryUserStore::new()));
        let note = note_gateway();

        for gateway in [&user, &note] {
            for descriptor in gateway.catalog() {
                assert_eq!(
                    descriptor.parameter_names().len(),
                    descriptor.parameters.len(),
                    "undeclared parameter names on {}",
                    descriptor.name
                );
            }
        }
        assert_eq!(user.methods().len(), 6);
        assert_eq!(note.methods().len(), 21);
    }

    #[tokio::test]
    async fn test_check_version_through_gateway() {
        let gateway = user_store_gateway(Arc::new(MemoryUserStore::new()));

        let payload = json!({
            "clientName": "gateway-test",
            "edamVersionMajor": 1,
            "edamVersionMinor": 28
        });
        let result = gateway.invoke("checkVersion", payload).await.unwrap();
        assert_eq!(result, Value::Bool(true));

        // an omitted version decodes as zero and is rejected by the store
        let result = gateway
            .invoke("checkVersion", json!({"clientName": "gateway-test"}))
            .await
            .unwrap();
        assert_eq!(result, Value::Bool(false));
    }

    #[tokio::test]
    async fn test_tag_lifecycle_through_gateway() {
        let gateway = note_gateway();

        let created = gateway
            .invoke("createTag", json!({"tag": {"name": "TAG_NAME"}}))
            .await
            .unwrap();
        let guid = created["guid"].as_str().unwrap().to_string();

        let fetched = gateway.invoke("getTag", json!({"guid": guid})).await.unwrap();
        assert_eq!(fetched, created);

        let listed = gateway.invoke("listTags", Value::Null).await.unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        gateway
            .invoke("expungeTag", json!({"guid": guid}))
            .await
            .unwrap();
        let err = gateway
            .invoke("getTag", json!({"guid": guid}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_record_reaches_store_validation() {
        let gateway = note_gateway();

        let err = gateway.invoke("createTag", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::User { ref parameter, .. }) if parameter == "Tag.name"));
    }

    #[test]
    fn test_business_store_shares_operation_list() {
        let note = note_gateway();
        let business =
            note_store_gateway(Store::BusinessNote, Arc::new(MemoryNoteStore::new()));

        assert_eq!(business.target(), "businessNoteStore");
        assert_eq!(note.methods(), business.methods());
    }

    #[test]
    fn test_stores_are_independent() {
        let note = note_gateway();
        let business =
            note_store_gateway(Store::BusinessNote, Arc::new(MemoryNoteStore::new()));

        tokio_test::block_on(async {
            note.invoke("createTag", json!({"tag": {"name": "personal"}}))
                .await
                .unwrap();
            let tags = business.invoke("listTags", Value::Null).await.unwrap();
            assert_eq!(tags, json!([]));
        });
    }
}
