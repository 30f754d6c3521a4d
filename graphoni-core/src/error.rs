//! Error types for the Graphoni client.
//!
//! Every operation fails with a single [`GraphoniError`]. Application errors
//! keep the server's status code so callers can tell not-found, forbidden and
//! validation failures apart by number; transport failures are a separate
//! variant so callers can decide whether to retry.

use serde_json::Value;

/// Why a request never produced an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// Connection refused, DNS failure, TLS handshake failure.
    Connect,
    /// The configured deadline elapsed before a response arrived.
    Timeout,
    /// Any other I/O failure while sending or receiving.
    Other,
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportFailure::Connect => write!(f, "connect"),
            TransportFailure::Timeout => write!(f, "timeout"),
            TransportFailure::Other => write!(f, "io"),
        }
    }
}

/// Top-level error type for the Graphoni client.
#[derive(Debug, thiserror::Error)]
pub enum GraphoniError {
    #[error("HTTP {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Transport error ({kind}): {message}")]
    Transport {
        message: String,
        kind: TransportFailure,
    },

    #[error("Invalid response: {message}")]
    Decode { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl GraphoniError {
    /// Build an application error from a non-success response body.
    ///
    /// Uses the `error` field of a JSON body when present, otherwise the raw
    /// body text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| match v.get("error")? {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| body.to_string());
        GraphoniError::Api { status, detail }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        GraphoniError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        GraphoniError::Decode {
            message: message.into(),
        }
    }

    /// The HTTP status code, for application errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            GraphoniError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// True when the server was never reached, so repeating the call may help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GraphoniError::Transport { .. })
    }
}

impl From<reqwest::Error> for GraphoniError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportFailure::Timeout
        } else if err.is_connect() {
            TransportFailure::Connect
        } else {
            TransportFailure::Other
        };
        GraphoniError::Transport {
            message: err.to_string(),
            kind,
        }
    }
}

impl From<serde_json::Error> for GraphoniError {
    fn from(err: serde_json::Error) -> Self {
        GraphoniError::decode(err.to_string())
    }
}

/// A type alias for results using [`GraphoniError`].
pub type Result<T> = std::result::Result<T, GraphoniError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_from_error_field() {
        let err = GraphoniError::from_response(404, r#"{"error": "proposal not found"}"#);
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        match err {
            GraphoniError::Api { detail, .. } => assert_eq!(detail, "proposal not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_detail_falls_back_to_body() {
        let err = GraphoniError::from_response(502, "<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), "HTTP 502: <html>Bad Gateway</html>");
    }

    #[test]
    fn test_detail_json_without_error_field() {
        let body = r#"{"message": "nope"}"#;
        let err = GraphoniError::from_response(400, body);
        assert_eq!(err.to_string(), format!("HTTP 400: {body}"));
    }

    #[test]
    fn test_structured_error_field() {
        let err = GraphoniError::from_response(422, r#"{"error": {"field": "reason"}}"#);
        assert_eq!(err.to_string(), r#"HTTP 422: {"field":"reason"}"#);
    }

    #[test]
    fn test_forbidden_codes() {
        assert!(GraphoniError::from_response(401, "").is_forbidden());
        assert!(GraphoniError::from_response(403, "").is_forbidden());
        assert!(!GraphoniError::from_response(404, "").is_forbidden());
    }

    #[test]
    fn test_only_transport_is_retryable() {
        let err = GraphoniError::Transport {
            message: "connection refused".into(),
            kind: TransportFailure::Connect,
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), None);
        assert!(!GraphoniError::from_response(503, "").is_retryable());
        assert!(!GraphoniError::invalid_request("x").is_retryable());
    }

    #[test]
    fn test_display_transport() {
        let err = GraphoniError::Transport {
            message: "deadline".into(),
            kind: TransportFailure::Timeout,
        };
        assert_eq!(err.to_string(), "Transport error (timeout): deadline");
    }
}
