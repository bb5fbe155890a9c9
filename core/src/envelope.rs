//! Response envelope decoding and error normalization.
//!
//! # Design
//! The backend wraps payloads as `{"data": ...}` and reports failures through
//! either `{"error": ...}` or `{"message": ...}`. Login responses have been
//! seen with the token nested (`{"data": {"token"}}`) and at the top level
//! (`{"token"}`). All of these shapes are decoded exactly once, here, into
//! `Envelope`; parse methods only ever see its explicit optional fields.
//!
//! Every function in this module produces exactly one of a payload or an
//! `ApiError`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::types::{LoginSession, UserIdentity};

/// `message` value the backend sends with a successful login.
pub const LOGIN_SUCCESS_MARKER: &str = "Login successful";

/// Fallback message for a 2xx response that does not carry what the
/// operation needs.
pub const INVALID_RESPONSE: &str = "Invalid response from server";

/// The backend's JSON wrapper, decoded once at the boundary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    token: Option<Value>,
    #[serde(default)]
    user: Option<Value>,
}

/// Login payload found under `data`.
#[derive(Debug, Default, Deserialize)]
struct LoginData {
    #[serde(default)]
    token: Option<Value>,
    #[serde(default)]
    user: Option<UserIdentity>,
}

impl Envelope {
    /// Decode a response body. `None` means the body is not a JSON object.
    /// An empty body decodes to an empty envelope.
    pub fn decode(body: &str) -> Option<Envelope> {
        if body.trim().is_empty() {
            return Some(Envelope::default());
        }
        match serde_json::from_str::<Value>(body).ok()? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<String> {
        self.error.as_ref().and_then(truthy_text)
    }

    pub fn message(&self) -> Option<String> {
        self.message.as_ref().and_then(truthy_text)
    }

    /// Normalized failure text: `error`, else `message`.
    pub fn failure_text(&self) -> Option<String> {
        self.error().or_else(|| self.message())
    }

    fn is_login_success(&self) -> bool {
        self.message().as_deref() == Some(LOGIN_SUCCESS_MARKER)
    }
}

/// JavaScript-style truthiness for the text fields: empty strings, `null` and
/// `false` carry no message.
fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|token| !token.trim().is_empty())
        .map(str::to_string)
}

fn synthesized(response: &HttpResponse) -> String {
    format!("HTTP {} {}", response.status, response.status_text())
}

fn contract(response: &HttpResponse, message: impl Into<String>) -> ApiError {
    ApiError::Contract {
        status: response.status,
        message: message.into(),
    }
}

/// Map a response to its envelope, or to the normalized failure.
///
/// Non-2xx statuses always fail with the status kept, whether or not the body
/// is JSON. A 2xx with a body that is not a JSON object is a contract failure.
pub fn check(response: &HttpResponse) -> Result<Envelope, ApiError> {
    let envelope = Envelope::decode(&response.body);

    if !response.is_success() {
        let message = envelope
            .as_ref()
            .and_then(Envelope::failure_text)
            .unwrap_or_else(|| synthesized(response));
        return Err(ApiError::Http {
            status: response.status,
            message,
        });
    }

    envelope.ok_or_else(|| {
        contract(
            response,
            format!("Malformed response body ({})", synthesized(response)),
        )
    })
}

/// Unwrap a single record found under `data`.
pub fn data<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    let envelope = check(response)?;
    match envelope.data {
        None | Some(Value::Null) => {
            let message = envelope
                .error()
                .unwrap_or_else(|| INVALID_RESPONSE.to_string());
            Err(contract(response, message))
        }
        Some(value) => serde_json::from_value(value)
            .map_err(|e| contract(response, format!("{INVALID_RESPONSE}: {e}"))),
    }
}

/// Unwrap a list found under `data`.
///
/// Absent or null `data` is an empty list unless the body carries an
/// `error`. Paginated search results (`{"items": [...], "total": ..}`) are
/// unwrapped to their items.
pub fn list<T: DeserializeOwned>(response: &HttpResponse) -> Result<Vec<T>, ApiError> {
    let envelope = check(response)?;
    let items = match envelope.data {
        None | Some(Value::Null) => match envelope.error() {
            Some(error) => return Err(contract(response, error)),
            None => return Ok(Vec::new()),
        },
        Some(Value::Object(mut page)) if page.contains_key("items") => {
            match page.remove("items") {
                None | Some(Value::Null) => return Ok(Vec::new()),
                Some(items) => items,
            }
        }
        Some(other) => other,
    };
    serde_json::from_value(items)
        .map_err(|e| contract(response, format!("{INVALID_RESPONSE}: {e}")))
}

/// Accept any 2xx regardless of payload.
pub fn unit(response: &HttpResponse) -> Result<(), ApiError> {
    check(response).map(|_| ())
}

/// Decode a login response.
///
/// Succeeds only when the status is 2xx, `message` equals
/// [`LOGIN_SUCCESS_MARKER`] and a non-empty token is present, nested under
/// `data` or at the top level.
pub fn login(response: &HttpResponse) -> Result<LoginSession, ApiError> {
    let envelope = check(response)?;

    let nested: LoginData = envelope
        .data
        .clone()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();

    let token = non_blank(nested.token.as_ref()).or_else(|| non_blank(envelope.token.as_ref()));

    let token = match token {
        Some(token) if envelope.is_login_success() => token,
        _ => {
            let message = envelope
                .error()
                .or_else(|| envelope.message().filter(|m| m != LOGIN_SUCCESS_MARKER))
                .unwrap_or_else(|| INVALID_RESPONSE.to_string());
            return Err(contract(response, message));
        }
    };

    let user = nested
        .user
        .or_else(|| {
            envelope
                .user
                .clone()
                .and_then(|value| serde_json::from_value(value).ok())
        })
        .unwrap_or_default();

    Ok(LoginSession { token, user })
}
