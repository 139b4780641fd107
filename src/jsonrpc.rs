//! JSONRPC protocol structures and handling.
//!
//! A store endpoint also accepts a JSONRPC 2.0 envelope whose `params`
//! object carries the named parameters of `method`. The envelope path always
//! answers with an envelope; failures travel in its `error` member.

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::gateway::Gateway;
use crate::logging::{debug, warn};
use crate::store::StoreError;

/// JSONRPC version accepted and emitted
pub const VERSION: &str = "2.0";

/// JSONRPC request with JSON Value parameters
#[derive(Debug, Deserialize, Serialize)]
pub struct RawRequest {
    /// JSONRPC version (should be "2.0")
    pub jsonrpc: String,
    /// Method name
    pub method: String,
    /// Method parameters as raw JSON
    #[serde(default)]
    pub params: serde_json::Value,
    /// Request ID
    #[serde(default)]
    pub id: serde_json::Value,
}

/// JSONRPC success response structure
#[derive(Debug, Deserialize, Serialize)]
pub struct SuccessResponse<T> {
    /// JSONRPC version (should be "2.0")
    pub jsonrpc: String,
    /// Response result
    pub result: T,
    /// Request ID (same as in the request)
    pub id: serde_json::Value,
}

/// JSONRPC error response structure
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// JSONRPC version (should be "2.0")
    pub jsonrpc: String,
    /// Error details
    pub error: RpcError,
    /// Request ID (same as in the request)
    pub id: serde_json::Value,
}

/// JSONRPC error object
#[derive(Debug, Deserialize, Serialize)]
pub struct RpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// JSONRPC response (either success or error)
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Response<T> {
    /// Success response
    Success(SuccessResponse<T>),
    /// Error response
    Error(ErrorResponse),
}

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const STORE_ERROR: i32 = -32000;
pub const STORE_SYSTEM_ERROR: i32 = -32001;

/// JSONRPC error code for a gateway error
pub fn error_code(error: &Error) -> i32 {
    match error {
        Error::MethodNotFound { .. } => METHOD_NOT_FOUND,
        Error::ParameterDeserialization { .. } | Error::InvalidPayload(_) => INVALID_PARAMS,
        Error::ParameterNamesUnavailable { .. } | Error::StoreUnavailable(_) | Error::Json(_) => {
            INTERNAL_ERROR
        }
        Error::Store(StoreError::User { .. } | StoreError::NotFound { .. }) => STORE_ERROR,
        Error::Store(StoreError::System { .. }) => STORE_SYSTEM_ERROR,
    }
}

/// Create a JSONRPC success response
pub fn success<T>(result: T, id: serde_json::Value) -> Response<T> {
    Response::Success(SuccessResponse {
        jsonrpc: VERSION.to_string(),
        result,
        id,
    })
}

/// Create a JSONRPC error response
pub fn error<T>(error: Error, id: serde_json::Value) -> Response<T> {
    let details = error.details();
    Response::Error(ErrorResponse {
        jsonrpc: VERSION.to_string(),
        error: RpcError {
            code: error_code(&error),
            message: error.to_string(),
            data: (!details.is_null()).then_some(details),
        },
        id,
    })
}

/// Create an invalid request error response
pub fn invalid_request<T>(message: &str, id: serde_json::Value) -> Response<T> {
    Response::Error(ErrorResponse {
        jsonrpc: VERSION.to_string(),
        error: RpcError {
            code: INVALID_REQUEST,
            message: format!("Invalid request: {}", message),
            data: None,
        },
        id,
    })
}

/// Create a parse error response; the request id is unknown
pub fn parse_error<T>(message: &str) -> Response<T> {
    Response::Error(ErrorResponse {
        jsonrpc: VERSION.to_string(),
        error: RpcError {
            code: PARSE_ERROR,
            message: format!("Parse error: {}", message),
            data: None,
        },
        id: serde_json::Value::Null,
    })
}

/// Dispatch a JSONRPC request against `gateway`
pub async fn dispatch(gateway: &Gateway, request_str: &str) -> crate::Result<String> {
    let value: serde_json::Value = match serde_json::from_str(request_str) {
        Ok(value) => value,
        Err(err) => {
            warn!("Unparseable JSONRPC request for [{}]: {}", gateway.target(), err);
            let resp = parse_error::<serde_json::Value>(&err.to_string());
            return Ok(serde_json::to_string(&resp)?);
        }
    };

    // well-formed JSON that is not a request keeps whatever id it carries
    let id = value.get("id").cloned().unwrap_or_default();
    let raw_request: RawRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(err) => {
            warn!("Invalid JSONRPC request for [{}]: {}", gateway.target(), err);
            let resp = invalid_request::<serde_json::Value>(&err.to_string(), id);
            return Ok(serde_json::to_string(&resp)?);
        }
    };

    let response = if raw_request.jsonrpc != VERSION {
        invalid_request::<serde_json::Value>("Invalid JSONRPC version", raw_request.id)
    } else {
        debug!(
            "JSONRPC [{}] on [{}] id={}",
            raw_request.method,
            gateway.target(),
            raw_request.id
        );
        match gateway.invoke(&raw_request.method, raw_request.params).await {
            Ok(result) => success(result, raw_request.id),
            Err(e) => {
                warn!("JSONRPC [{}] failed: {}", raw_request.method, e);
                error::<serde_json::Value>(e, raw_request.id)
            }
        }
    };

    Ok(serde_json::to_string(&response)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::store::memory::MemoryNoteStore;
    use crate::store::registry::note_store_gateway;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn gateway() -> Gateway {
        note_store_gateway(Store::Note, Arc::new(MemoryNoteStore::new()))
    }

    async fn call(gateway: &Gateway, request: Value) -> Value {
        let response = dispatch(gateway, &request.to_string()).await.unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let gateway = gateway();
        let response = call(
            &gateway,
            json!({
                "jsonrpc": VERSION,
                "method": "createTag",
                "params": {"tag": {"name": "TAG_NAME"}},
                "id": 7
            }),
        )
        .await;
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"]["name"], "TAG_NAME");
        assert!(response.get("error").is_none());
    }

    #[tokio::test]
    async fn test_dispatch_method_not_found() {
        let gateway = gateway();
        let response = call(
            &gateway,
            json!({"jsonrpc": "2.0", "method": "nope", "params": {}, "id": "a"}),
        )
        .await;

        assert_eq!(response["id"], "a");
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(response["error"]["data"]["target"], "noteStore");
    }

    #[tokio::test]
    async fn test_dispatch_invalid_params() {
        let gateway = gateway();
        let response = call(
            &gateway,
            json!({"jsonrpc": "2.0", "method": "createTag", "params": {"tag": {"name": 123}}, "id": 1}),
        )
        .await;

        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["data"]["parameter"], "tag");
    }

    #[tokio::test]
    async fn test_dispatch_store_error() {
        let gateway = gateway();
        let response = call(
            &gateway,
            json!({"jsonrpc": "2.0", "method": "getTag", "params": {"guid": "missing"}, "id": 2}),
        )
        .await;

        assert_eq!(response["error"]["code"], STORE_ERROR);
        assert_eq!(response["error"]["data"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_dispatch_rejects_version_and_garbage() {
        let gateway = gateway();

        let response = call(
            &gateway,
            json!({"jsonrpc": "1.0", "method": "listTags", "id": 3}),
        )
        .await;
        assert_eq!(response["error"]["code"], INVALID_REQUEST);

        let response = dispatch(&gateway, "{not json").await.unwrap();
        let response: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(response["error"]["code"], PARSE_ERROR);
        assert_eq!(response["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_dispatch_well_formed_non_request() {
        let gateway = gateway();

        // valid JSON without a method
        let response = call(&gateway, json!({"jsonrpc": "2.0", "id": 5})).await;
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
        assert_eq!(response["id"], 5);

        // valid JSON that is not an object at all
        let response = call(&gateway, json!([1, 2, 3])).await;
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
        assert_eq!(response["id"], Value::Null);
    }

    #[test]
    fn test_serialization_failure_is_internal() {
        let err = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        assert_eq!(error_code(&Error::Json(err)), INTERNAL_ERROR);
    }
}
