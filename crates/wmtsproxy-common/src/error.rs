//! Error types for wmtsproxy.
//!
//! Every error carries a message that is safe to hand back to API callers and
//! an optional diagnostic message with the underlying cause, which is only
//! ever logged.

use std::fmt;

use thiserror::Error;

/// Result type alias using ProxyError.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Caller-facing message plus optional diagnostic detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub user_msg: String,
    pub system_msg: Option<String>,
}

impl ErrorDetail {
    pub fn new(user_msg: impl Into<String>) -> Self {
        Self {
            user_msg: user_msg.into(),
            system_msg: None,
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_msg)
    }
}

/// Primary error type for wmtsproxy operations.
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// Capabilities document could not be fetched, was not well-formed or did
    /// not have the expected shape.
    #[error("{0}")]
    Capabilities(ErrorDetail),

    /// Valid request with a selection the document does not offer.
    #[error("{0}")]
    User(ErrorDetail),

    /// Configuration could not be written for a stored registration.
    #[error("{0}")]
    ConfigWriter(ErrorDetail),

    /// Selection is valid but not supported (SRS, tile matrix set shape).
    #[error("{0}")]
    Feature(ErrorDetail),

    /// Registration store failures.
    #[error("{0}")]
    Service(ErrorDetail),
}

impl ProxyError {
    pub fn capabilities(user_msg: impl Into<String>) -> Self {
        ProxyError::Capabilities(ErrorDetail::new(user_msg))
    }

    pub fn user(user_msg: impl Into<String>) -> Self {
        ProxyError::User(ErrorDetail::new(user_msg))
    }

    pub fn config_writer(user_msg: impl Into<String>) -> Self {
        ProxyError::ConfigWriter(ErrorDetail::new(user_msg))
    }

    pub fn feature(user_msg: impl Into<String>) -> Self {
        ProxyError::Feature(ErrorDetail::new(user_msg))
    }

    pub fn service(user_msg: impl Into<String>) -> Self {
        ProxyError::Service(ErrorDetail::new(user_msg))
    }

    /// Attach the underlying cause as diagnostic message.
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.detail_mut().system_msg = Some(cause.to_string());
        self
    }

    pub fn detail(&self) -> &ErrorDetail {
        match self {
            ProxyError::Capabilities(d)
            | ProxyError::User(d)
            | ProxyError::ConfigWriter(d)
            | ProxyError::Feature(d)
            | ProxyError::Service(d) => d,
        }
    }

    fn detail_mut(&mut self) -> &mut ErrorDetail {
        match self {
            ProxyError::Capabilities(d)
            | ProxyError::User(d)
            | ProxyError::ConfigWriter(d)
            | ProxyError::Feature(d)
            | ProxyError::Service(d) => d,
        }
    }

    /// Message that may be shown to API callers.
    pub fn user_msg(&self) -> &str {
        &self.detail().user_msg
    }

    /// Diagnostic message for logs; the user message when no cause is attached.
    pub fn system_msg(&self) -> &str {
        let detail = self.detail();
        detail.system_msg.as_deref().unwrap_or(&detail.user_msg)
    }

    /// Short name of the error kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Capabilities(_) => "capabilities",
            ProxyError::User(_) => "user",
            ProxyError::ConfigWriter(_) => "config_writer",
            ProxyError::Feature(_) => "feature",
            ProxyError::Service(_) => "service",
        }
    }

    /// Whether the failure is the caller's to fix.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ProxyError::Capabilities(_) | ProxyError::User(_))
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::service("Storage access failed").with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_msg_falls_back_to_user_msg() {
        let err = ProxyError::user("Layer \"foo\" not found");
        assert_eq!(err.system_msg(), "Layer \"foo\" not found");

        let err = err.with_cause("lookup miss");
        assert_eq!(err.user_msg(), "Layer \"foo\" not found");
        assert_eq!(err.system_msg(), "lookup miss");
    }

    #[test]
    fn test_display_shows_only_user_msg() {
        let err = ProxyError::capabilities("not a valid capabilities document")
            .with_cause("unexpected root element");
        assert_eq!(err.to_string(), "not a valid capabilities document");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(ProxyError::capabilities("x").http_status_code(), 400);
        assert_eq!(ProxyError::user("x").http_status_code(), 400);
        assert_eq!(ProxyError::feature("x").http_status_code(), 500);
        assert_eq!(ProxyError::service("x").http_status_code(), 500);
        assert_eq!(ProxyError::config_writer("x").http_status_code(), 500);
    }

    #[test]
    fn test_io_error_is_service_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ProxyError = io.into();
        assert_eq!(err.kind(), "service");
        assert_eq!(err.system_msg(), "denied");
    }
}
