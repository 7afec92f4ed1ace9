// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for reqsnoop
//!
//! A caller of the interception API sees configuration errors, engine-fatal
//! errors, the outer guard timeout and cancellation. Per-request filter errors
//! are absorbed by the classifier, and a session timeout is a normal (possibly
//! empty) result.

use thiserror::Error;

/// Result type alias for reqsnoop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reqsnoop
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid interception or engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL pattern failed to compile
    #[error("Invalid URL pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The rendering engine could not load the page
    #[error("Navigation failed to {url}: {reason}")]
    NavigationFailed {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// Script execution failed inside the engine sandbox
    #[error("JavaScript error: {message}")]
    JavaScript { message: String },

    /// The rendering engine could not be created or is unusable
    #[error("Engine error: {0}")]
    Engine(String),

    /// The engine thread has shut down
    #[error("Rendering engine has been closed")]
    EngineClosed,

    /// Outer guard timeout
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        url: Option<String>,
    },

    /// The caller cancelled the operation before it resolved
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Error::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    /// Create a navigation error with full context
    pub fn navigation_failed(
        url: impl Into<String>,
        status: Option<u16>,
        reason: impl Into<String>,
    ) -> Self {
        Error::NavigationFailed {
            url: url.into(),
            status,
            reason: reason.into(),
        }
    }

    /// Create a JavaScript error
    pub fn js<S: Into<String>>(msg: S) -> Self {
        Error::JavaScript {
            message: msg.into(),
        }
    }

    /// Create an engine error
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        Error::Engine(msg.into())
    }

    /// Create a timeout error with URL
    pub fn timeout_with_url(
        operation: impl Into<String>,
        duration_ms: u64,
        url: impl Into<String>,
    ) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration_ms,
            url: Some(url.into()),
        }
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if the operation was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Check if this error was raised before any engine interaction
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::InvalidPattern { .. })
    }

    /// Get HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::NavigationFailed { status, .. } => *status,
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Get URL if available
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::NavigationFailed { url, .. } => Some(url),
            Error::Timeout { url: Some(u), .. } => Some(u),
            _ => None,
        }
    }
}
