//! User-facing scan error taxonomy.
//!
//! Everything that goes wrong inside a scan is folded into a [`ScanError`] at
//! the orchestrator boundary. All categories are recoverable: the user can
//! simply scan again.

use std::io;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ScanErrorKind {
    Network,
    Camera,
    Recognition,
    Provider,
    Timeout,
    Unknown,
}

impl ScanErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ScanErrorKind::Network => "Network connection lost. Check your connection and scan again.",
            ScanErrorKind::Camera => "Camera is unavailable or permission was denied.",
            ScanErrorKind::Recognition => "Couldn't identify this comic. Try adjusting the angle or lighting.",
            ScanErrorKind::Provider => "The recognition service is temporarily unavailable. Try again shortly.",
            ScanErrorKind::Timeout => "The scan took too long. Please try again.",
            ScanErrorKind::Unknown => "Something went wrong while scanning. Please try again.",
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub message: String,
    pub recoverable: bool,
    /// Underlying cause, for logs.
    #[serde(skip)]
    pub detail: Option<String>,
}

impl ScanError {
    pub fn new(kind: ScanErrorKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
            recoverable: true,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Classify a collaborator failure by walking its cause chain.
    pub fn categorize(err: &anyhow::Error) -> Self {
        let kind = err
            .chain()
            .find_map(kind_of_cause)
            .unwrap_or_else(|| kind_from_message(&format!("{err:#}")));
        Self::new(kind).with_detail(format!("{err:#}"))
    }
}

/// Typed failures collaborator implementations can return so categorization
/// does not rely on message text.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("network error: {0}")]
    Network(String),

    #[error("camera permission denied: {0}")]
    Permission(String),

    #[error("comic not recognized: {0}")]
    NotRecognized(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),
}

impl CollaboratorError {
    pub fn kind(&self) -> ScanErrorKind {
        match self {
            CollaboratorError::Network(_) => ScanErrorKind::Network,
            CollaboratorError::Permission(_) => ScanErrorKind::Camera,
            CollaboratorError::NotRecognized(_) => ScanErrorKind::Recognition,
            CollaboratorError::Unavailable(_) => ScanErrorKind::Provider,
            CollaboratorError::Timeout(_) => ScanErrorKind::Timeout,
        }
    }
}

fn kind_of_cause(cause: &(dyn std::error::Error + 'static)) -> Option<ScanErrorKind> {
    if let Some(err) = cause.downcast_ref::<CollaboratorError>() {
        return Some(err.kind());
    }
    if cause.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
        return Some(ScanErrorKind::Timeout);
    }
    if cause.downcast_ref::<image::ImageError>().is_some() {
        return Some(ScanErrorKind::Camera);
    }
    cause.downcast_ref::<io::Error>().and_then(io_kind)
}

fn io_kind(err: &io::Error) -> Option<ScanErrorKind> {
    use io::ErrorKind::*;
    match err.kind() {
        TimedOut => Some(ScanErrorKind::Timeout),
        PermissionDenied => Some(ScanErrorKind::Camera),
        ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected
        | AddrNotAvailable | BrokenPipe | UnexpectedEof => Some(ScanErrorKind::Network),
        _ => None,
    }
}

fn kind_from_message(message: &str) -> ScanErrorKind {
    let message = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|needle| message.contains(needle));

    if has(&["timeout", "timed out", "deadline"]) {
        ScanErrorKind::Timeout
    } else if has(&["camera", "permission", "notallowed", "not allowed"]) {
        ScanErrorKind::Camera
    } else if has(&["network", "fetch", "connection", "offline", "dns"]) {
        ScanErrorKind::Network
    } else if has(&["not recognized", "no match", "could not identify", "unrecognized"]) {
        ScanErrorKind::Recognition
    } else if has(&["unavailable", "rate limit", "429", "502", "503", "overloaded", "quota"]) {
        ScanErrorKind::Provider
    } else {
        ScanErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn typed_collaborator_errors_map_directly() {
        let err = anyhow::Error::new(CollaboratorError::Unavailable("vision api".into()))
            .context("recognition call failed");
        assert_eq!(ScanError::categorize(&err).kind, ScanErrorKind::Provider);
    }

    #[test]
    fn io_errors_map_by_kind() {
        let refused = anyhow::Error::new(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(ScanError::categorize(&refused).kind, ScanErrorKind::Network);

        let denied = anyhow::Error::new(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(ScanError::categorize(&denied).kind, ScanErrorKind::Camera);
    }

    #[test]
    fn message_keywords_are_the_fallback() {
        let cases = [
            ("request timed out", ScanErrorKind::Timeout),
            ("Failed to fetch", ScanErrorKind::Network),
            ("NotAllowedError: camera", ScanErrorKind::Camera),
            ("HTTP 503 Service Unavailable", ScanErrorKind::Provider),
            ("could not identify cover", ScanErrorKind::Recognition),
            ("boom", ScanErrorKind::Unknown),
        ];
        for (message, expected) in cases {
            assert_eq!(ScanError::categorize(&anyhow!(message)).kind, expected, "{message}");
        }
    }

    #[test]
    fn context_does_not_hide_the_cause() {
        let result: Result<(), io::Error> = Err(io::Error::from(io::ErrorKind::TimedOut));
        let err = result.context("valuation lookup").unwrap_err();
        assert_eq!(ScanError::categorize(&err).kind, ScanErrorKind::Timeout);
    }

    #[test]
    fn every_category_is_recoverable_with_a_message() {
        for kind in [
            ScanErrorKind::Network,
            ScanErrorKind::Camera,
            ScanErrorKind::Recognition,
            ScanErrorKind::Provider,
            ScanErrorKind::Timeout,
            ScanErrorKind::Unknown,
        ] {
            let err = ScanError::new(kind);
            assert!(err.recoverable);
            assert!(!err.message.is_empty());
            assert_eq!(err.to_string(), kind.message());
        }
    }
}
