//! Centralized error handling for the flow builder.
//!
//! Every fallible library operation returns [`Result<T>`], whose error is a
//! [`SheetpilotError`]. Errors never terminate the application: the GUI turns
//! them into an alert through [`SheetpilotError::user_message`] and returns to
//! an interactive state.
//!
//! ## Error categories
//!
//! ```
//! use sheetpilot::error::SheetpilotError;
//!
//! fn describe(err: &SheetpilotError) -> &'static str {
//!     match err {
//!         SheetpilotError::Validation(_) => "shown inline",
//!         SheetpilotError::Api { .. } | SheetpilotError::Http(_) => "shown as an alert",
//!         SheetpilotError::Parse(_) => "logged and ignored",
//!         _ => "shown as an alert",
//!     }
//! }
//! ```
//!
//! ## Context Extension Trait
//!
//! The [`ResultExt`] trait adds `.context()` to any `Result` whose error
//! converts into [`SheetpilotError`]:
//!
//! ```no_run
//! use sheetpilot::error::ResultExt as _;
//!
//! fn read_settings() -> sheetpilot::error::Result<String> {
//!     std::fs::read_to_string("settings.json").context("Failed to read settings")
//! }
//! ```

use std::fmt;

/// Main error type for flow builder operations.
#[derive(Debug)]
pub enum SheetpilotError {
    /// I/O errors (downloads, settings file, picked files)
    Io(std::io::Error),

    /// Transport level failure talking to the backend
    Http(String),

    /// The backend answered with a non-success status
    Api {
        status: u16,
        /// Server-provided `detail` message, when the body carried one
        detail: Option<String>,
    },

    /// Input rejected before any request was made
    Validation(String),

    /// Malformed payload (drag-drop template, JSON body)
    Parse(String),

    /// Configuration errors
    Config(String),

    /// Operation aborted by user
    Aborted,

    /// Generic error with context
    Other(String),
}

impl SheetpilotError {
    /// Message to show in a user-facing alert.
    ///
    /// Server details and validation messages are shown verbatim; everything
    /// else falls back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            Self::Validation(msg) => msg.clone(),
            _ => fallback.to_owned(),
        }
    }

    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for SheetpilotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Http(msg) => write!(f, "Network error: {msg}"),
            Self::Api {
                status,
                detail: Some(detail),
            } => write!(f, "Server error ({status}): {detail}"),
            Self::Api {
                status,
                detail: None,
            } => write!(f, "Server error ({status})"),
            Self::Validation(msg) => write!(f, "Invalid input: {msg}"),
            Self::Parse(msg) => write!(f, "Parse error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Aborted => write!(f, "Operation aborted by user"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SheetpilotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SheetpilotError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for SheetpilotError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for SheetpilotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("JSON error: {err}"))
    }
}

impl From<reqwest::Error> for SheetpilotError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Api {
                status: status.as_u16(),
                detail: None,
            };
        }
        if err.is_decode() {
            return Self::Parse(err.to_string());
        }
        Self::Http(err.to_string())
    }
}

/// Result type alias for flow builder operations.
pub type Result<T> = std::result::Result<T, SheetpilotError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SheetpilotError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: SheetpilotError = e.into();
            SheetpilotError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: SheetpilotError = e.into();
            SheetpilotError::Other(format!("{}: {}", f(), err))
        })
    }
}

/// Extracts a human readable `detail` from an error response body.
///
/// Handles `{"detail": "..."}` and the validation shape
/// `{"detail": [{"msg": "..."}, ...]}`; anything else yields `None`.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}
