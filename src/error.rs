//! Error handling for the patchbay application
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application. Errors only surface at the transport and
//! configuration boundaries; the editor core never fails.

use thiserror::Error;

/// Main error type for patchbay operations
#[derive(Error, Debug)]
pub enum PatchbayError {
    /// Errors from the REST client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Errors from the event feed socket
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),

    /// The server answered with a non-success status
    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The event feed is not connected
    #[error("Event feed disconnected")]
    Disconnected,

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PatchbayError>,
    },
}

impl PatchbayError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PatchbayError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<tungstenite::Error> for PatchbayError {
    fn from(err: tungstenite::Error) -> Self {
        PatchbayError::WebSocket(Box::new(err))
    }
}

impl From<serde_json::Error> for PatchbayError {
    fn from(err: serde_json::Error) -> Self {
        PatchbayError::Serialization(err.to_string())
    }
}

/// Result type alias for patchbay operations
pub type Result<T> = std::result::Result<T, PatchbayError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PatchbayError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
