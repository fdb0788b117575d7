//! Request and envelope types for the line protocol.
//!
//! Every input line carries one request object:
//!
//! ```text
//! {"id": 7, "method": "health/version", "params": {}}
//! ```
//!
//! and every handled line produces exactly one envelope:
//!
//! ```text
//! {"version":"0.1","id":7,"result":{...},"meta":{"durationMs":0}}
//! {"version":"0.1","id":7,"error":{"code":40400,"message":"...","data":null},"meta":{"durationMs":0}}
//! ```
//!
//! Envelopes are plain data. The caller supplies the timing metadata, so
//! nothing here reads a clock.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The envelope version stamped on every response.
pub const PROTOCOL_VERSION: &str = "0.1";

/// Server name reported by `health/version`.
pub const SERVER_NAME: &str = "ish-mcp";

/// A request ID, echoed verbatim in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// Numeric request ID above `i64::MAX`.
    Unsigned(u64),
    /// String request ID.
    String(String),
    /// Explicit `null`, or no ID at all.
    Null,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Unsigned(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A parsed request line.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Opaque caller-chosen identifier.
    pub id: RequestId,
    /// Built-in method or registered tool name.
    pub method: String,
    /// Parameters; an absent or `null` field becomes an empty object.
    pub params: Value,
}

/// Protocol error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The input line is not valid JSON.
    ParseError,
    /// The JSON is not a request object.
    InvalidRequest,
    /// Parameters failed schema validation.
    ValidationFailed,
    /// Unknown method, prompt or resource.
    NotFound,
    /// A tool failed during execution.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::ValidationFailed => 40001,
            Self::NotFound => 40400,
            Self::InternalError => 500,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid request",
            Self::ValidationFailed => "Invalid params",
            Self::NotFound => "Not found",
            Self::InternalError => "Internal error",
        }
    }
}

/// The `error` member of a failed envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    /// The error code.
    pub code: i64,

    /// A short description of the error.
    pub message: String,

    /// Additional information, `null` when absent.
    pub data: Value,
}

impl ErrorBody {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: Value::Null,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Creates a "method not found" error.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::with_message(ErrorCode::NotFound, format!("Method not found: {method}"))
    }

    /// Creates a schema validation error carrying the violation list.
    #[must_use]
    pub fn validation_failed(violations: Vec<String>) -> Self {
        Self::from_code(ErrorCode::ValidationFailed).with_data(Value::from(violations))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, message)
    }
}

/// Timing metadata attached to every envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Wall-clock time spent handling the request.
    pub duration_ms: u64,
}

impl Meta {
    /// Builds metadata from a measured duration, saturating on overflow.
    #[must_use]
    pub fn from_duration(elapsed: Duration) -> Self {
        Self {
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Success or failure payload. Exactly one is ever serialised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Successful result object.
    Result(Map<String, Value>),
    /// Error details.
    Error(ErrorBody),
}

/// A response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Always [`PROTOCOL_VERSION`].
    pub version: &'static str,

    /// The request ID this envelope answers.
    pub id: RequestId,

    /// Result or error.
    #[serde(flatten)]
    pub outcome: Outcome,

    /// Timing metadata.
    pub meta: Meta,
}

impl Envelope {
    /// Creates a success envelope.
    #[must_use]
    pub const fn success(id: RequestId, result: Map<String, Value>, meta: Meta) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            id,
            outcome: Outcome::Result(result),
            meta,
        }
    }

    /// Creates an error envelope.
    #[must_use]
    pub fn error(
        id: RequestId,
        code: ErrorCode,
        message: impl Into<String>,
        data: Option<Value>,
        meta: Meta,
    ) -> Self {
        let body = ErrorBody::with_message(code, message).with_data(data.unwrap_or(Value::Null));
        Self::from_error(id, body, meta)
    }

    /// Creates an error envelope from a prepared error body.
    #[must_use]
    pub const fn from_error(id: RequestId, error: ErrorBody, meta: Meta) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            id,
            outcome: Outcome::Error(error),
            meta,
        }
    }

    /// Wraps a dispatch outcome.
    #[must_use]
    pub fn from_result(
        id: RequestId,
        result: Result<Map<String, Value>, ErrorBody>,
        meta: Meta,
    ) -> Self {
        match result {
            Ok(result) => Self::success(id, result, meta),
            Err(error) => Self::from_error(id, error, meta),
        }
    }

    /// The envelope for an unparsable input line. The ID cannot be known.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::from_error(
            RequestId::Null,
            ErrorBody::from_code(ErrorCode::ParseError),
            Meta::default(),
        )
    }

    /// Returns the error details, if this is an error envelope.
    #[must_use]
    pub const fn error_body(&self) -> Option<&ErrorBody> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            Outcome::Result(_) => None,
        }
    }

    /// Returns the result object, if this is a success envelope.
    #[must_use]
    pub const fn result(&self) -> Option<&Map<String, Value>> {
        match &self.outcome {
            Outcome::Result(result) => Some(result),
            Outcome::Error(_) => None,
        }
    }
}

/// Parses one non-empty input line into a request.
///
/// # Errors
///
/// Returns a ready-to-send error envelope if the line is not JSON
/// (`-32700`) or not a usable request object (`-32600`).
pub fn parse_request(line: &str) -> Result<Request, Envelope> {
    let value: Value = serde_json::from_str(line).map_err(|_| Envelope::parse_error())?;

    let Value::Object(mut obj) = value else {
        return Err(invalid_request(RequestId::Null, "request must be a JSON object"));
    };

    let id = match obj.remove("id") {
        None => RequestId::Null,
        Some(raw) => serde_json::from_value(raw).map_err(|_| {
            invalid_request(RequestId::Null, "id must be an integer, a string or null")
        })?,
    };

    let method = match obj.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => return Err(invalid_request(id, "method must be a non-empty string")),
    };

    let params = match obj.remove("params") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(params) => params,
    };

    Ok(Request { id, method, params })
}

fn invalid_request(id: RequestId, message: &str) -> Envelope {
    Envelope::from_error(
        id,
        ErrorBody::with_message(ErrorCode::InvalidRequest, message),
        Meta::default(),
    )
}
