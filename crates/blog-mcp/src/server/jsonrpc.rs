//! JSON-RPC 2.0 message model and payload classification.
//!
//! An inbound body is either one element or a batch array. Every element is
//! classified independently so one malformed entry never poisons its batch.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// A call that expects exactly one response.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// Opaque id, echoed verbatim.
    pub id: Value,
    pub method: String,
    pub params: Option<Value>,
}

/// A one-way message; never answered.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcNotification {
    pub method: String,
    pub params: Option<Value>,
}

/// One classified element of an inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    /// A response sent by the client (e.g. to a server request). Acknowledged only.
    Response { id: Value },
    /// Not a valid JSON-RPC message; answered with `Invalid Request`.
    Invalid { id: Value, reason: String },
}

impl Inbound {
    /// Whether the sender expects a reply to this element.
    #[must_use]
    pub const fn expects_response(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Invalid { .. })
    }
}

/// JSON-RPC 2.0 error object.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    fn with_detail(code: i32, message: &str, detail: impl Into<String>) -> Self {
        Self { code, message: message.to_string(), data: Some(Value::String(detail.into())) }
    }

    #[must_use]
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::with_detail(codes::PARSE_ERROR, "Parse error", detail)
    }

    #[must_use]
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::with_detail(codes::INVALID_REQUEST, "Invalid Request", detail)
    }

    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::with_detail(codes::METHOD_NOT_FOUND, "Method not found", method)
    }

    #[must_use]
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::with_detail(codes::INVALID_PARAMS, "Invalid params", detail)
    }

    #[must_use]
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::with_detail(codes::INTERNAL_ERROR, "Internal error", detail)
    }
}

/// JSON-RPC 2.0 response. `id` is always present, `null` when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: Cow::Borrowed(JSONRPC_VERSION), result: Some(result), error: None, id }
    }

    #[must_use]
    pub fn error(id: Value, error: RpcError) -> Self {
        Self { jsonrpc: Cow::Borrowed(JSONRPC_VERSION), result: None, error: Some(error), id }
    }
}

/// Parse a request body into classified elements.
///
/// Only a body that is not JSON at all is an error. An empty batch yields a
/// single `Invalid` element.
pub fn parse_payload(body: &[u8]) -> Result<Vec<Inbound>, RpcError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| RpcError::parse_error(e.to_string()))?;

    Ok(match value {
        Value::Array(items) if items.is_empty() => {
            vec![Inbound::Invalid { id: Value::Null, reason: "empty batch".to_string() }]
        }
        Value::Array(items) => items.into_iter().map(classify).collect(),
        single => vec![classify(single)],
    })
}

/// Classify a single element.
#[must_use]
pub fn classify(value: Value) -> Inbound {
    let Value::Object(mut object) = value else {
        return invalid(Value::Null, "message must be a JSON object");
    };

    let id = match object.remove("id") {
        None => None,
        Some(id @ (Value::String(_) | Value::Number(_) | Value::Null)) => Some(id),
        Some(_) => return invalid(Value::Null, "id must be a string, number or null"),
    };
    let reply_id = id.clone().unwrap_or(Value::Null);

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return invalid(reply_id, "jsonrpc must be \"2.0\"");
    }

    match object.remove("method") {
        Some(Value::String(method)) => {
            let params = match take_params(&mut object) {
                Ok(params) => params,
                Err(reason) => return invalid(reply_id, reason),
            };
            match id {
                Some(id) => Inbound::Request(JsonRpcRequest { id, method, params }),
                None => Inbound::Notification(JsonRpcNotification { method, params }),
            }
        }
        Some(_) => invalid(reply_id, "method must be a string"),
        None if id.is_some() && (object.contains_key("result") || object.contains_key("error")) => {
            Inbound::Response { id: reply_id }
        }
        None => invalid(reply_id, "missing method"),
    }
}

fn take_params(object: &mut Map<String, Value>) -> Result<Option<Value>, &'static str> {
    match object.remove("params") {
        None => Ok(None),
        Some(params @ (Value::Object(_) | Value::Array(_))) => Ok(Some(params)),
        Some(_) => Err("params must be an object or array"),
    }
}

fn invalid(id: Value, reason: &str) -> Inbound {
    Inbound::Invalid { id, reason: reason.to_string() }
}
