//! Shared error types for the services crate.

use thiserror::Error;

/// Errors emitted by HTTP transport adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The backend answered 404; callers usually treat this as "nothing yet".
    #[error("resource not found")]
    NotFound,
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Errors emitted by the push channel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PushError {
    #[error("push channel closed")]
    Closed,
    #[error("malformed socket frame: {0:?}")]
    Protocol(String),
    #[error("unsupported base url scheme: {0}")]
    Scheme(String),
    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {raw:?}")]
    Invalid { key: &'static str, raw: String },
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Errors emitted by the dashboard session runtime.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("lesson has not been started")]
    LessonNotStarted,
    #[error("no lesson theme selected")]
    MissingTheme,
    #[error("exercise time is up; reset the timer first")]
    TimeUp,
    #[error("exercise duration must be at least one minute")]
    InvalidDuration,
    #[error("dashboard session has stopped")]
    Stopped,
    #[error(transparent)]
    Api(#[from] ApiError),
}
