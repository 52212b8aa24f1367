//! Error handling module
//!
//! Failures of the session-level plumbing around the interaction core.

use std::path::PathBuf;

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("browser error: {0}")]
    Adapter(#[from] AdapterError),
}

impl SessionError {
    pub fn config(message: impl Into<String>) -> Self {
        SessionError::Config(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Io {
            path: path.into(),
            source,
        }
    }

    /// Navigation failure class: `timeout`, `net` or `invalid-url`.
    pub fn navigation_class(&self) -> Option<&'static str> {
        match self {
            SessionError::Adapter(err) => navigation_class(err),
            _ => None,
        }
    }
}

pub fn navigation_class(err: &AdapterError) -> Option<&'static str> {
    match err.kind {
        AdapterErrorKind::NavTimeout => Some("timeout"),
        AdapterErrorKind::NavFailed => Some("net"),
        AdapterErrorKind::InvalidUrl => Some("invalid-url"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_errors_are_classified() {
        let timeout: SessionError = AdapterError::new(AdapterErrorKind::NavTimeout).into();
        assert_eq!(timeout.navigation_class(), Some("timeout"));

        let net: SessionError = AdapterError::new(AdapterErrorKind::NavFailed)
            .with_hint("net::ERR_NAME_NOT_RESOLVED")
            .into();
        assert_eq!(net.navigation_class(), Some("net"));
        assert!(net.to_string().contains("ERR_NAME_NOT_RESOLVED"));

        let other: SessionError = AdapterError::new(AdapterErrorKind::CdpIo).into();
        assert_eq!(other.navigation_class(), None);
        assert_eq!(SessionError::config("bad").navigation_class(), None);
    }
}
