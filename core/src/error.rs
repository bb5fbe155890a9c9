//! Error types for the AfyaLink API client.
//!
//! # Design
//! Every failure surfaces as one `ApiError` whose `Display` output is the
//! human-readable message a UI can show as-is. `kind()` sorts failures into
//! transport (nothing came back), protocol (non-2xx) and contract (2xx but
//! unusable, or a request that could not be built). The HTTP status stays
//! inspectable through `status()`.

use thiserror::Error;

/// Coarse classification of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never reached the server or no response came back.
    Transport,
    /// The server answered with a status outside 200-299.
    Protocol,
    /// The request could not be built, or a 2xx response was unusable.
    Contract,
}

/// Errors returned by `AfyaClient` and `ApiService` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An authenticated operation was called without a session token.
    #[error("Authorization token is missing")]
    MissingToken,

    /// DNS failure, refused connection, timeout or a broken body stream.
    #[error("{message}")]
    Transport { message: String, timed_out: bool },

    /// Non-2xx status with the normalized backend message.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// 2xx status but the payload is missing required fields or malformed.
    #[error("{message}")]
    Contract { status: u16, message: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport { .. } => ErrorKind::Transport,
            ApiError::Http { .. } => ErrorKind::Protocol,
            ApiError::MissingToken | ApiError::Contract { .. } | ApiError::Serialization(_) => {
                ErrorKind::Contract
            }
        }
    }

    /// HTTP status of the response that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::Contract { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::MissingToken) || self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Transport { timed_out: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_backend_message() {
        let err = ApiError::Http {
            status: 401,
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.is_unauthorized());
    }

    #[test]
    fn transport_errors_have_no_status() {
        let err = ApiError::Transport {
            message: "connection refused".to_string(),
            timed_out: false,
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.status(), None);
        assert!(!err.is_timeout());
    }

    #[test]
    fn missing_token_is_a_contract_failure() {
        let err = ApiError::MissingToken;
        assert_eq!(err.kind(), ErrorKind::Contract);
        assert_eq!(err.status(), None);
        assert!(err.is_unauthorized());
    }
}
