//! OAuth bearer tokens for the Sheets API
//!
//! A fixed access token is used as is. A service-account key is exchanged
//! for short-lived tokens with the JWT-bearer grant (RFC 7523): an RS256
//! assertion signed with the key is posted to the key's `token_uri`, and the
//! returned token is cached until shortly before it expires.

use crate::error::RemoteError;
use crate::state::{Credentials, ServiceAccountKey};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Longest assertion lifetime Google accepts
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Fetch a new token this long before the cached one expires
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Source of the bearer token sent with every API request
pub enum Authenticator {
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        scopes: Vec<String>,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl Authenticator {
    pub fn new(credentials: Credentials, scopes: &[String]) -> Self {
        match credentials {
            Credentials::AccessToken(token) => Authenticator::Static(token),
            Credentials::ServiceAccount(key) => Authenticator::ServiceAccount {
                key,
                scopes: scopes.to_vec(),
                cached: Mutex::new(None),
            },
        }
    }

    /// Current bearer token, exchanging the key for a fresh one when needed
    pub fn bearer(&self, http: &Client) -> Result<String, RemoteError> {
        let (key, scopes, cached) = match self {
            Authenticator::Static(token) => return Ok(token.clone()),
            Authenticator::ServiceAccount {
                key,
                scopes,
                cached,
            } => (key, scopes, cached),
        };

        let mut cached = cached.lock().unwrap_or_else(|e| e.into_inner());
        let now = SystemTime::now();
        if let Some(token) = cached.as_ref().filter(|t| is_fresh(t, now)) {
            return Ok(token.token.clone());
        }

        let assertion = sign_assertion(key, scopes, unix_seconds(now))?;
        let response = exchange(http, &key.token_uri, &assertion)?;
        debug!(
            "Obtained access token for {} (expires in {}s)",
            key.client_email, response.expires_in
        );
        let token = CachedToken {
            token: response.access_token,
            expires_at: now + Duration::from_secs(response.expires_in),
        };
        let bearer = token.token.clone();
        *cached = Some(token);
        Ok(bearer)
    }
}

fn is_fresh(token: &CachedToken, now: SystemTime) -> bool {
    now + REFRESH_MARGIN < token.expires_at
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// RS256 assertion for the JWT-bearer grant
fn sign_assertion(
    key: &ServiceAccountKey,
    scopes: &[String],
    issued_at: u64,
) -> Result<String, RemoteError> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: scopes.join(" "),
        aud: key.token_uri.clone(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
        RemoteError::PermissionDenied(format!(
            "unusable private key for {}: {e}",
            key.client_email
        ))
    })?;
    jsonwebtoken::encode(&header, &claims, &signing_key)
        .map_err(|e| RemoteError::PermissionDenied(format!("failed to sign assertion: {e}")))
}

fn exchange(
    http: &Client,
    token_uri: &str,
    assertion: &str,
) -> Result<TokenResponse, RemoteError> {
    debug!("POST {}", token_uri);
    let response = http
        .post(token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
        .send()
        .map_err(|e| RemoteError::Transport(e.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| RemoteError::Transport(e.to_string()))?;
    if !status.is_success() {
        return Err(token_error(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

/// Token endpoint failures: `{"error": "invalid_grant", "error_description": ...}`
fn token_error(status: u16, body: &str) -> RemoteError {
    let message = match serde_json::from_str::<TokenErrorBody>(body) {
        Ok(TokenErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{error}: {description}"),
        Ok(TokenErrorBody { error, .. }) => error,
        Err(_) => body.trim().to_string(),
    };
    match status {
        400 | 401 | 403 => RemoteError::PermissionDenied(message),
        429 => RemoteError::QuotaExceeded(message),
        _ => RemoteError::Api { status, message },
    }
}
