//! Bearer tokens for the remote API.
//!
//! [`ServiceAccountAuth`] implements the OAuth 2.0 JWT-bearer flow for a
//! service account: it signs an RS256 assertion with the account's private
//! key, exchanges it at the token endpoint and caches the access token until
//! less than a minute of validity remains.

use std::fmt;
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{ClientConfig, DEFAULT_TOKEN_URI};
use crate::error::{Result, SheetSyncError};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;
const MAX_EXPIRES_IN_SECS: i64 = 86_400;

/// Anything that can hand out a currently valid bearer token.
pub trait TokenProvider {
    fn bearer_token(&self) -> Result<String>;
}

impl<T: TokenProvider + ?Sized> TokenProvider for Box<T> {
    fn bearer_token(&self) -> Result<String> {
        (**self).bearer_token()
    }
}

/// A pre-issued token, used as is.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// The fields of a service account key file that the flow needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse the key file JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(json)
            .map_err(|e| SheetSyncError::MalformedCredential(e.to_string()))?;
        if key.client_email.trim().is_empty() {
            return Err(SheetSyncError::MalformedCredential(
                "client_email is empty".into(),
            ));
        }
        Ok(key)
    }

    /// Parse an environment value holding either the JSON itself or its
    /// base64 encoding.
    pub fn from_env_value(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            return Self::from_json(trimmed);
        }
        let decoded = B64
            .decode(trimmed)
            .map_err(|e| SheetSyncError::MalformedCredential(format!("not JSON or base64: {e}")))?;
        let json = String::from_utf8(decoded)
            .map_err(|e| SheetSyncError::MalformedCredential(format!("base64 payload: {e}")))?;
        Self::from_json(&json)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// JWT claims of the assertion sent to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Service account token provider with an in-memory token cache.
pub struct ServiceAccountAuth {
    client_email: String,
    key_id: Option<String>,
    encoding_key: EncodingKey,
    scopes: Vec<String>,
    token_uri: String,
    http: reqwest::blocking::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl ServiceAccountAuth {
    /// Validate the key and prepare the HTTP client.
    ///
    /// A private key that is not RSA PEM fails here with
    /// [`SheetSyncError::MalformedCredential`].
    pub fn new(key: ServiceAccountKey, scopes: Vec<String>, config: &ClientConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetSyncError::MalformedCredential(format!("private_key: {e}")))?;
        let token_uri = config
            .token_uri
            .clone()
            .or(key.token_uri)
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client_email: key.client_email,
            key_id: key.private_key_id,
            encoding_key,
            scopes,
            token_uri,
            http,
            cached: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    #[must_use]
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Drop the cached token so the next call re-authenticates.
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = None;
        }
    }

    pub(crate) fn claims_at(&self, now: DateTime<Utc>) -> AssertionClaims {
        let iat = now.timestamp();
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }

    pub(crate) fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key_id);
        jsonwebtoken::encode(&header, &self.claims_at(now), &self.encoding_key)
            .map_err(|e| SheetSyncError::MalformedCredential(format!("signing assertion: {e}")))
    }

    fn request_token(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        let assertion = self.sign_assertion(now)?;
        debug!("requesting access token from {}", self.token_uri);

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| SheetSyncError::Token(e.to_string()))?;
        let status = response.status();
        let body = response.text().map_err(|e| SheetSyncError::Token(e.to_string()))?;
        if !status.is_success() {
            return Err(SheetSyncError::Token(format!("status {status}: {body}")));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        let lifetime = parsed.expires_in.clamp(0, MAX_EXPIRES_IN_SECS);
        info!("access token issued for {}, valid {lifetime}s", self.client_email);
        Ok(AccessToken {
            token: parsed.access_token,
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}

impl TokenProvider for ServiceAccountAuth {
    fn bearer_token(&self) -> Result<String> {
        let now = Utc::now();
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| SheetSyncError::Token("token cache lock poisoned".into()))?;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        let token = self.request_token(now)?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}

impl fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("client_email", &self.client_email)
            .field("scopes", &self.scopes)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}
