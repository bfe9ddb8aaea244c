//! OAuth2 authentication management for the Gmail API
//!
//! Credential material comes from three places, tried in order:
//! `GOOGLE_TOKEN_BASE64` (base64-encoded authorized-user token JSON, the
//! headless deployment path: tokens are minted from the refresh token with
//! no browser involved), a local `credentials.json` file, or
//! `GOOGLE_CREDENTIALS_BASE64` (base64-encoded client secret JSON). The
//! latter two drive the interactive installed-app flow with the access
//! token cached on disk.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use yup_oauth2::authorized_user::AuthorizedUserSecret;
use yup_oauth2::ApplicationSecret;

use crate::config::GmailConfig;
use crate::error::{Result, StatementError};

/// Read-only mailbox access is all the extraction pipeline needs.
pub const READONLY_SCOPES: &[&str] = &["https://www.googleapis.com/auth/gmail.readonly"];

/// Environment variable holding base64-encoded OAuth2 client secret JSON
pub const CREDENTIALS_ENV: &str = "GOOGLE_CREDENTIALS_BASE64";

/// Environment variable holding a base64-encoded authorized user token JSON
pub const TOKEN_ENV: &str = "GOOGLE_TOKEN_BASE64";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Initialize a Gmail API hub for the configured credential material.
///
/// When `GOOGLE_TOKEN_BASE64` is set the hub authenticates from that token
/// without any interactive flow; an unusable env token is an error, not a
/// fallthrough to the browser. Otherwise the installed-app flow runs with
/// the client secret from the credentials file (preferred) or
/// `GOOGLE_CREDENTIALS_BASE64`.
pub async fn gmail_hub(config: &GmailConfig) -> Result<GmailHub> {
    if env::var(TOKEN_ENV).is_ok() {
        return authorized_user_hub(config).await;
    }

    let secret = if config.credentials_path.exists() {
        yup_oauth2::read_application_secret(&config.credentials_path)
            .await
            .map_err(|e| StatementError::AuthError(format!("Failed to read credentials: {}", e)))?
    } else {
        credentials_from_env()?
    };

    initialize_gmail_hub(secret, &config.token_cache_path).await
}

/// Initialize Gmail API hub with OAuth2 authentication
///
/// Sets up the complete Gmail API client with:
/// - OAuth2 authentication using InstalledFlow (desktop app flow)
/// - Token persistence to disk for automatic refresh
/// - HTTP/1 client with TLS support
pub async fn initialize_gmail_hub(
    secret: ApplicationSecret,
    token_cache_path: &Path,
) -> Result<GmailHub> {
    // Build authenticator with token persistence
    // HTTPRedirect opens a browser for user authorization
    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| StatementError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Pre-authenticate so the cached token carries the readonly scope
    let _token = auth
        .token(READONLY_SCOPES)
        .await
        .map_err(|e| StatementError::AuthError(format!("Failed to obtain token: {}", e)))?;

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(https_connector()?);

    Ok(Gmail::new(client, auth))
}

/// Initialize a hub from the env-encoded authorized user token.
///
/// The cached token is evaluated against the clock first: a token that is
/// expired with no refresh token surfaces as an authentication error. A
/// refreshable token drives the authorized-user flow (with refreshed tokens
/// persisted to the cache path); a still-valid token without refresh
/// material is used as-is.
async fn authorized_user_hub(config: &GmailConfig) -> Result<GmailHub> {
    let raw = decode_env(TOKEN_ENV)?;

    match env_token_strategy(&raw, Utc::now())? {
        EnvTokenStrategy::Refresh(secret) => {
            let auth = yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
                .persist_tokens_to_disk(&config.token_cache_path)
                .build()
                .await
                .map_err(|e| {
                    StatementError::AuthError(format!("Failed to build authenticator: {}", e))
                })?;

            let _token = auth
                .token(READONLY_SCOPES)
                .await
                .map_err(|e| StatementError::AuthError(format!("Failed to obtain token: {}", e)))?;

            let client =
                hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                    .build(https_connector()?);

            Ok(Gmail::new(client, auth))
        }
        EnvTokenStrategy::Static(access_token) => {
            let auth = yup_oauth2::AccessTokenAuthenticator::builder(access_token)
                .build()
                .await
                .map_err(|e| {
                    StatementError::AuthError(format!("Failed to build authenticator: {}", e))
                })?;

            let client =
                hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                    .build(https_connector()?);

            Ok(Gmail::new(client, auth))
        }
    }
}

/// TLS connector shared by every hub flavor.
fn https_connector(
) -> Result<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>> {
    Ok(hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|e| StatementError::AuthError(format!("Failed to load TLS roots: {}", e)))?
        .https_or_http()
        .enable_http1()
        .build())
}

/// Load the OAuth2 client secret from `GOOGLE_CREDENTIALS_BASE64`.
pub fn credentials_from_env() -> Result<ApplicationSecret> {
    let decoded = decode_env(CREDENTIALS_ENV)?;
    yup_oauth2::parse_application_secret(&decoded)
        .map_err(|e| StatementError::AuthError(format!("Failed to parse credentials from env: {}", e)))
}

fn decode_env(var: &str) -> Result<Vec<u8>> {
    let encoded =
        env::var(var).map_err(|_| StatementError::ConfigError(format!("{} is not set", var)))?;
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| StatementError::AuthError(format!("Failed to decode {}: {}", var, e)))
}

/// Authorized user token in Google's `authorized_user` JSON layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

/// Outcome of evaluating a cached token against a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// Access token is present and unexpired
    Valid,
    /// Access token expired but a refresh token is available
    RefreshRequired,
    /// No usable token material; interactive re-authorization needed
    ReauthRequired,
}

/// Evaluate a cached token against the given clock.
///
/// Pure function: no refresh is performed and nothing is mutated. The caller
/// decides whether to refresh and is responsible for persisting the result.
pub fn evaluate_token(token: &CachedToken, now: DateTime<Utc>) -> TokenStatus {
    let expired = match (&token.token, token.expiry) {
        (None, _) => true,
        (Some(_), Some(expiry)) => expiry <= now,
        // No recorded expiry: treat as usable until the API rejects it
        (Some(_), None) => false,
    };

    if !expired {
        return TokenStatus::Valid;
    }
    if token.refresh_token.is_some() {
        TokenStatus::RefreshRequired
    } else {
        TokenStatus::ReauthRequired
    }
}

/// How to authenticate from the env-encoded token material.
#[derive(Debug)]
enum EnvTokenStrategy {
    /// Mint access tokens from the refresh token via the authorized-user flow
    Refresh(AuthorizedUserSecret),
    /// Use the still-valid access token as-is (no refresh material)
    Static(String),
}

/// Decide how to authenticate from decoded authorized-user token JSON.
///
/// Pure: the decision only depends on the token material and the clock.
fn env_token_strategy(raw: &[u8], now: DateTime<Utc>) -> Result<EnvTokenStrategy> {
    let cached: CachedToken = serde_json::from_slice(raw)
        .map_err(|e| StatementError::AuthError(format!("Failed to parse token from env: {}", e)))?;

    match evaluate_token(&cached, now) {
        TokenStatus::ReauthRequired => Err(StatementError::AuthError(
            "Token expired or invalid, re-authorization required".to_string(),
        )),
        TokenStatus::RefreshRequired => Ok(EnvTokenStrategy::Refresh(authorized_secret(raw)?)),
        TokenStatus::Valid => match (&cached.refresh_token, &cached.token) {
            (Some(_), _) => Ok(EnvTokenStrategy::Refresh(authorized_secret(raw)?)),
            (None, Some(access_token)) => Ok(EnvTokenStrategy::Static(access_token.clone())),
            // Unreachable: Valid implies an access token is present
            (None, None) => Err(StatementError::AuthError(
                "Token expired or invalid, re-authorization required".to_string(),
            )),
        },
    }
}

fn authorized_secret(raw: &[u8]) -> Result<AuthorizedUserSecret> {
    serde_json::from_slice(raw).map_err(|e| {
        StatementError::AuthError(format!(
            "Env token is not a usable authorized_user secret: {}",
            e
        ))
    })
}

/// Secure token file permissions on Unix systems
///
/// Sets file permissions to 0600 (read/write for owner only)
/// to prevent unauthorized access to OAuth2 tokens
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600); // Read/write for owner only
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Secure token file on Windows (stub implementation)
///
/// Windows uses ACLs instead of Unix permissions
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
