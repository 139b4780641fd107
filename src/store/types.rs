//! Records exchanged with the note service.
//!
//! Every field is optional and absent fields are omitted when serialized.
//! Unknown fields are rejected so that misspelled input is reported rather
//! than silently dropped.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Syntax of a saved search query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryFormat {
    User,
    Sexp,
}

/// Ordering of notes in a published notebook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteSortOrder {
    Created,
    Updated,
    Relevance,
    UpdateSequenceNumber,
    Title,
}

/// Service privilege of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivilegeLevel {
    Normal,
    Premium,
    Vip,
    Manager,
    Support,
    Admin,
}

/// A label attached to notes; tags form a hierarchy through `parentGuid`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Tag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_sequence_num: Option<i32>,
}

/// Public web presence of a notebook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Publishing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<NoteSortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascending: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Notebook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_sequence_num: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_notebook: Option<bool>,
    /// Milliseconds since the Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_created: Option<i64>,
    /// Milliseconds since the Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_updated: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publishing: Option<Publishing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Which notebooks a saved search covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SavedSearchScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_account: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_personal_linked_notebooks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_business_linked_notebooks: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SavedSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<QueryFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_sequence_num: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<SavedSearchScope>,
}

/// A notebook shared from another account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LinkedNotebook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_sequence_num: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_store_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_api_url_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privilege: Option<PrivilegeLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_id: Option<String>,
}

/// The subset of account data visible to anyone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PublicUserInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privilege: Option<PrivilegeLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_store_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_api_url_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PremiumInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_recurring: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_expiration_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_extendable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_pending: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_cancellation_pending: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_purchase_upload_allowance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsored_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_upgradable: Option<bool>,
}

/// Per-service settings handed to clients at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BootstrapSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketing_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_email_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_sharing: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BootstrapProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<BootstrapSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BootstrapInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<BootstrapProfile>,
}

/// Synchronization position of a note store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SyncState {
    /// Milliseconds since the Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_sync_before: Option<i64>,
    /// Highest update sequence number issued by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<i64>,
}
