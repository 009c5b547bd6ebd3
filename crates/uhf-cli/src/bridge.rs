//! Method-call bridge.
//!
//! Requests arrive one JSON object per line:
//!
//! ```text
//! {"id": 1, "method": "setPower", "arguments": {"power": 26}}
//! ```
//!
//! and are answered with `{"id", "result"}`, `{"id", "error"}` or
//! `{"id", "notImplemented": true}`. Reader events are written as
//! `{"channel": "tags" | "state", "event": ...}` frames on the same output.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use uhf_core::{ReaderState, TagEvent};
use uhf_reader::Reader;

/// A request read from the input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodCall {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Error payload of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodError {
    pub code: String,
    pub message: String,
}

/// Reply to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MethodError>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub not_implemented: bool,
}

impl MethodResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
            not_implemented: false,
        }
    }

    pub fn error(id: Option<Value>, code: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(MethodError {
                code: code.to_string(),
                message: message.into(),
            }),
            not_implemented: false,
        }
    }

    pub fn not_implemented(id: Option<Value>) -> Self {
        Self {
            id,
            result: None,
            error: None,
            not_implemented: true,
        }
    }
}

/// Event written alongside method responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "channel", content = "event", rename_all = "lowercase")]
pub enum EventFrame {
    Tags(TagEvent),
    State(ReaderState),
}

/// Invoke `call` on `reader`.
pub async fn dispatch(reader: &Reader, call: MethodCall) -> MethodResponse {
    let MethodCall {
        id,
        method,
        arguments,
    } = call;
    debug!(method = %method, "method call");

    let result = match method.as_str() {
        "init" => json!(reader.init().await),
        "dispose" => {
            reader.dispose().await;
            json!(true)
        }
        "setPower" => match power_argument(&arguments) {
            Some(dbm) => json!(reader.set_power(dbm).await),
            None => {
                return MethodResponse::error(id, "INVALID_ARGUMENT", "Power value is required");
            }
        },
        "getPower" => json!(reader.get_power().await),
        "startInventory" => json!(reader.start_inventory().await),
        "stopInventory" => json!(reader.stop_inventory().await),
        "isInitialized" => json!(reader.is_initialized().await),
        other => {
            warn!(method = %other, "unknown method");
            return MethodResponse::not_implemented(id);
        }
    };

    MethodResponse::success(id, result)
}

fn power_argument(arguments: &Value) -> Option<i32> {
    arguments
        .get("power")
        .and_then(Value::as_i64)
        .and_then(|power| i32::try_from(power).ok())
}

/// Handle one input line. Blank lines produce no response.
pub async fn handle_line(reader: &Reader, line: &str) -> Option<MethodResponse> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<MethodCall>(line) {
        Ok(call) => Some(dispatch(reader, call).await),
        Err(e) => {
            warn!(error = %e, "malformed request");
            Some(MethodResponse::error(None, "INVALID_REQUEST", e.to_string()))
        }
    }
}
