//! Environment-driven client configuration.

use std::time::Duration;

use crate::error::{Result, SheetSyncError};

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the service account JSON (raw or base64).
pub const CREDENTIAL_ENV: &str = "GOOGLE_SERVICE_ACCOUNT";
/// Environment variable holding a pre-issued access token.
pub const ACCESS_TOKEN_ENV: &str = "SHEETSYNC_ACCESS_TOKEN";

const BASE_URL_ENV: &str = "SHEETSYNC_SHEETS_BASE_URL";
const TOKEN_URI_ENV: &str = "SHEETSYNC_TOKEN_URI";
const TIMEOUT_ENV: &str = "SHEETSYNC_TIMEOUT_SECS";

/// Settings shared by the Sheets client and the token provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub sheets_base_url: String,
    /// Overrides the credential's own `token_uri` when set.
    pub token_uri: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            token_uri: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read `SHEETSYNC_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let sheets_base_url = non_empty(BASE_URL_ENV).unwrap_or(defaults.sheets_base_url);
        let token_uri = non_empty(TOKEN_URI_ENV);
        let timeout = match non_empty(TIMEOUT_ENV) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    SheetSyncError::Config(format!("{TIMEOUT_ENV}={raw:?}: {e}"))
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.timeout,
        };

        Ok(Self {
            sheets_base_url,
            token_uri,
            timeout,
        })
    }
}
