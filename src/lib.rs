//! Generic JSON gateway for note store operations.
//!
//! This library exposes the user store and note store operation sets of a
//! note-taking service through a single generic endpoint per store. A call
//! names an operation and carries a JSON object whose fields are the
//! operation's named parameters; the gateway decodes each field into the
//! parameter's declared type, invokes the operation and returns its result
//! as JSON.

use std::sync::Arc;

use serde_json::{Value, json};

pub mod config;
pub mod gateway;
pub mod jsonrpc;
pub mod logging;
pub mod params;
pub mod schema;
pub mod server;
pub mod store;

// Re-export key types
pub use config::Config;
pub use gateway::Gateway;
pub use params::ParamNames;
pub use store::{Store, StoreAccessor, StoreError};

/// Longest JSON fragment quoted back in a deserialization error
const SNIPPET_LIMIT: usize = 256;

/// Custom error type for the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested method is not registered on the target store
    #[error("Cannot find method [{method}] on [{target}]")]
    MethodNotFound { method: String, target: String },

    /// The declared parameter names do not match the operation's signature
    #[error("Cannot find parameter names for method [{method}]")]
    ParameterNamesUnavailable { method: String },

    /// A payload field could not be decoded into its parameter type
    #[error("Cannot parse part of the json for parameter [{parameter}]: json=[{json}]")]
    ParameterDeserialization {
        parameter: String,
        json: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request body is not a JSON object
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The route names a store that is unknown or not served
    #[error("Store not available: {0}")]
    StoreUnavailable(String),

    /// Error raised by the invoked operation itself
    #[error(transparent)]
    Store(#[from] StoreError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a deserialization error, quoting at most a bounded fragment of the raw JSON
    pub(crate) fn parameter_deserialization(
        parameter: &str,
        raw: &Value,
        source: serde_json::Error,
    ) -> Self {
        let text = raw.to_string();
        let json = if text.chars().count() > SNIPPET_LIMIT {
            let mut truncated: String = text.chars().take(SNIPPET_LIMIT).collect();
            truncated.push_str("...");
            truncated
        } else {
            text
        };
        Error::ParameterDeserialization {
            parameter: parameter.to_string(),
            json,
            source,
        }
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MethodNotFound { .. } => "method_not_found",
            Error::ParameterNamesUnavailable { .. } => "parameter_names_unavailable",
            Error::ParameterDeserialization { .. } => "parameter_deserialization",
            Error::InvalidPayload(_) => "invalid_payload",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::Store(err) => err.kind(),
            Error::Json(_) => "json",
        }
    }

    /// Structured diagnostics attached to error responses
    pub fn details(&self) -> Value {
        match self {
            Error::MethodNotFound { method, target } => json!({ "method": method, "target": target }),
            Error::ParameterNamesUnavailable { method } => json!({ "method": method }),
            Error::ParameterDeserialization {
                parameter, json, ..
            } => json!({ "parameter": parameter, "json": json }),
            Error::Store(err) => serde_json::to_value(err).unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

/// Type alias for library results
pub type Result<T> = std::result::Result<T, Error>;

/// Build a store accessor over in-memory backends, honouring the configured store set
pub fn create_default_accessor(config: &Config) -> StoreAccessor {
    let mut accessor = StoreAccessor::new();

    accessor.insert(
        Store::User,
        store::registry::user_store_gateway(Arc::new(store::memory::MemoryUserStore::new())),
    );
    accessor.insert(
        Store::Note,
        store::registry::note_store_gateway(
            Store::Note,
            Arc::new(store::memory::MemoryNoteStore::new()),
        ),
    );

    if !config.no_business_store {
        accessor.insert(
            Store::BusinessNote,
            store::registry::note_store_gateway(
                Store::BusinessNote,
                Arc::new(store::memory::MemoryNoteStore::new()),
            ),
        );
    }

    accessor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialization_snippet_is_truncated() {
        let raw = Value::String("x".repeat(1000));
        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = Error::parameter_deserialization("tag", &raw, source);

        match err {
            Error::ParameterDeserialization { parameter, json, .. } => {
                assert_eq!(parameter, "tag");
                assert!(json.ends_with("..."));
                assert_eq!(json.chars().count(), SNIPPET_LIMIT + 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_details() {
        let err = Error::MethodNotFound {
            method: "bogus".to_string(),
            target: "noteStore".to_string(),
        };
        assert_eq!(err.kind(), "method_not_found");
        assert_eq!(err.details()["method"], "bogus");
        assert_eq!(err.details()["target"], "noteStore");
    }

    #[test]
    fn test_default_accessor_honours_business_flag() {
        let config = Config {
            no_business_store: true,
            ..Config::default()
        };
        let accessor = create_default_accessor(&config);
        assert!(accessor.operations(Store::User).is_some());
        assert!(accessor.operations(Store::Note).is_some());
        assert!(accessor.operations(Store::BusinessNote).is_none());

        let accessor = create_default_accessor(&Config::default());
        assert!(accessor.operations(Store::BusinessNote).is_some());
    }
}
