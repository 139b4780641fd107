//! Axum router exposing the store gateways over HTTP.
//!
//! ```text
//! GET  /health                - liveness probe
//! GET  /{store}               - operation catalog of a store
//! POST /{store}               - JSONRPC 2.0 envelope
//! POST /{store}/{method}      - invoke, body is the named-parameter object
//! ```
//!
//! `{store}` is one of `userStore`, `noteStore` or `businessNoteStore`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::gateway::Gateway;
use crate::jsonrpc;
use crate::logging::{debug, warn};
use crate::store::{Store, StoreAccessor, StoreError};
use crate::{Error, Result};

/// HTTP status reported for a gateway error
pub fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::MethodNotFound { .. }
        | Error::ParameterDeserialization { .. }
        | Error::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        Error::StoreUnavailable(_) => StatusCode::NOT_FOUND,
        Error::Store(StoreError::User { .. }) => StatusCode::BAD_REQUEST,
        Error::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        Error::Store(StoreError::System { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Error::ParameterNamesUnavailable { .. } | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = error_status(&self);
        let body = Json(json!({
            "error": {
                "code": self.kind(),
                "message": self.to_string(),
                "details": self.details(),
            }
        }));
        (status, body).into_response()
    }
}

/// Build the router serving every store held by `accessor`
pub fn router(accessor: Arc<StoreAccessor>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/{store}", get(catalog).post(rpc))
        .route("/{store}/{method}", post(invoke))
        .with_state(accessor)
}

/// Resolve the gateway for a route segment
fn operations(accessor: &StoreAccessor, segment: &str) -> Result<Arc<Gateway>> {
    Store::from_segment(segment)
        .and_then(|store| accessor.operations(store))
        .ok_or_else(|| Error::StoreUnavailable(segment.to_string()))
}

async fn health(State(accessor): State<Arc<StoreAccessor>>) -> Json<Value> {
    let stores: Vec<&str> = accessor.stores().iter().map(Store::segment).collect();
    Json(json!({ "status": "ok", "stores": stores }))
}

async fn catalog(
    State(accessor): State<Arc<StoreAccessor>>,
    Path(store): Path<String>,
) -> Result<Json<Value>> {
    let gateway = operations(&accessor, &store)?;
    Ok(Json(json!({
        "store": gateway.target(),
        "operations": gateway.catalog(),
    })))
}

async fn rpc(
    State(accessor): State<Arc<StoreAccessor>>,
    Path(store): Path<String>,
    body: String,
) -> Result<Response> {
    let gateway = operations(&accessor, &store)?;
    let response = jsonrpc::dispatch(&gateway, &body).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], response).into_response())
}

async fn invoke(
    State(accessor): State<Arc<StoreAccessor>>,
    Path((store, method)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>> {
    let gateway = operations(&accessor, &store)?;

    // an empty body is a call without parameters
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|err| Error::InvalidPayload(err.to_string()))?
    };

    debug!("POST /{}/{}", store, method);
    match gateway.invoke(&method, payload).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            warn!("[{}] on [{}] failed: {}", method, store, err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                Error::MethodNotFound {
                    method: "m".to_string(),
                    target: "t".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::ParameterNamesUnavailable {
                    method: "m".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Json(serde_json::from_str::<u8>("\"x\"").unwrap_err()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::InvalidPayload("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::StoreUnavailable("s".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                Error::Store(StoreError::required("Tag.name")),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::Store(StoreError::not_found("Tag.guid", "g")),
                StatusCode::NOT_FOUND,
            ),
            (
                Error::Store(StoreError::System {
                    code: crate::store::ErrorCode::Internal,
                    message: "down".to_string(),
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error_status(&error), status, "{error}");
        }
    }
}
