//! Structured error types for sheetsync.
//!
//! Collaborators (remote API, token provider) and the sync façade all report
//! through [`SheetSyncError`].

/// All errors that can occur while loading, saving or authenticating.
#[derive(Debug, thiserror::Error)]
pub enum SheetSyncError {
    /// The remote table could not be fetched. Nothing was loaded.
    #[error("fetch of {range} failed: {reason}")]
    Fetch { range: String, reason: String },

    /// The changed rectangle could not be written. The baseline is unchanged.
    #[error("write to {range} failed: {reason}")]
    Write { range: String, reason: String },

    /// Any other remote API call (adding a tab, creating a spreadsheet).
    #[error("{operation} failed: {reason}")]
    Api {
        operation: &'static str,
        reason: String,
    },

    /// The service account credential is not usable.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// The token endpoint refused or failed the assertion exchange.
    #[error("access token request failed: {0}")]
    Token(String),

    /// Invalid configuration value.
    #[error("configuration: {0}")]
    Config(String),

    /// Invalid A1 cell reference or range.
    #[error("invalid cell reference: {0}")]
    CellRef(String),

    /// Transport-level HTTP failure.
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failure.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SheetSyncError>;

impl SheetSyncError {
    /// Whether this error came from the write collaborator.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    /// Whether this error came from the fetch collaborator.
    #[must_use]
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}
