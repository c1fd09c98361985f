//! Inbox-access credentials: the persisted OAuth token and the component that
//! keeps it valid.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no usable Gmail credential in {path}; run `spam-scanner authorize` first")]
    NotAuthorized { path: PathBuf },
    #[error("failed to access token file {path}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("token file {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read client secrets {path}: {reason}")]
    ClientSecrets { path: PathBuf, reason: String },
    #[error("token endpoint rejected the request: {0}")]
    Rejected(String),
    #[error("token endpoint unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authorization flow failed: {0}")]
    Flow(String),
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// `None` means unknown and is treated as expired.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Expired, or within a minute of expiring.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at - Duration::seconds(60),
            None => true,
        }
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &mask(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn mask(token: &str) -> String {
    match token.get(..4) {
        Some(prefix) if token.len() > 4 => format!("{prefix}***"),
        _ => "***".to_string(),
    }
}

/// JSON token file written with owner-only permissions.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<OAuthToken>, CredentialError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CredentialError::Store {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let token = serde_json::from_str(&raw).map_err(|source| CredentialError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(token))
    }

    pub fn save(&self, token: &OAuthToken) -> Result<(), CredentialError> {
        let store_err = |source| CredentialError::Store {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(store_err)?;
        }
        let content = serde_json::to_string_pretty(token).map_err(|source| {
            CredentialError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, content).map_err(store_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)).map_err(store_err)?;
        }
        tracing::debug!(target: "gmail", path = %self.path.display(), "token persisted");
        Ok(())
    }
}

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Google "installed app" client registration, as downloaded from the cloud console.
#[derive(Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let fail = |reason: String| CredentialError::ClientSecrets {
            path: path.to_path_buf(),
            reason,
        };
        let raw = fs::read_to_string(path).map_err(|err| fail(err.to_string()))?;
        let file: ClientSecretsFile =
            serde_json::from_str(&raw).map_err(|err| fail(err.to_string()))?;
        file.installed
            .or(file.web)
            .ok_or_else(|| fail("expected an \"installed\" or \"web\" client".to_string()))
    }
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    /// Google only rotates the refresh token sometimes; keep the old one otherwise.
    pub(crate) fn into_token(self, previous_refresh: Option<String>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: Some(Utc::now() + Duration::seconds(self.expires_in.unwrap_or(3600))),
        }
    }
}

/// Posts a form to the token endpoint and decodes the token or the error body.
pub(crate) async fn request_token(
    http: &Client,
    token_uri: &str,
    params: &[(&str, &str)],
) -> Result<TokenResponse, CredentialError> {
    let response = http.post(token_uri).form(params).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let reason = match response.json::<TokenErrorResponse>().await {
            Ok(body) => match body.error_description {
                Some(description) => format!("{}: {description}", body.error),
                None => body.error,
            },
            Err(_) => status.to_string(),
        };
        return Err(CredentialError::Rejected(reason));
    }
    Ok(response.json().await?)
}

/// Owns the refresh-and-persist cycle for the inbox credential.
///
/// Callers ask for a valid access token; this returns the cached one when it
/// is still fresh, otherwise refreshes it and writes the new token back. When
/// no refresh is possible the caller is told to re-run authorization.
pub struct CredentialManager {
    store: TokenStore,
    client_secrets_path: PathBuf,
    http: Client,
    cached: Mutex<Option<OAuthToken>>,
}

impl CredentialManager {
    pub fn new(store: TokenStore, client_secrets_path: PathBuf, http: Client) -> Self {
        Self {
            store,
            client_secrets_path,
            http,
            cached: Mutex::new(None),
        }
    }

    pub async fn get_valid_credential(&self) -> Result<String, CredentialError> {
        let mut cached = self.cached.lock().await;
        // `authorize` may have rewritten the file since this token was cached.
        if cached.as_ref().map_or(true, OAuthToken::is_expired) {
            *cached = self.store.load()?;
        }

        let refresh_token = match cached.as_ref() {
            Some(token) if !token.is_expired() => return Ok(token.access_token.clone()),
            Some(token) => token.refresh_token.clone(),
            None => None,
        };
        let Some(refresh_token) = refresh_token else {
            return Err(CredentialError::NotAuthorized {
                path: self.store.path().to_path_buf(),
            });
        };

        tracing::info!(target: "gmail", "access token expired; refreshing");
        let secrets = ClientSecrets::load(&self.client_secrets_path)?;
        let mut params = vec![
            ("client_id", secrets.client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = secrets.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        let token = request_token(&self.http, &secrets.token_uri, &params)
            .await?
            .into_token(Some(refresh_token.clone()));
        self.store.save(&token)?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Marks `rejected` as expired, in memory and on disk, so the next call
    /// refreshes it instead of handing it out again. A token rewritten by
    /// `authorize` in the meantime is left untouched.
    pub async fn invalidate(&self, rejected: &str) -> Result<(), CredentialError> {
        let mut cached = self.cached.lock().await;
        *cached = self.store.load()?;
        if let Some(token) = cached.as_mut().filter(|token| token.access_token == rejected) {
            token.expires_at = None;
            self.store.save(token)?;
            tracing::info!(target: "gmail", "rejected access token dropped");
        }
        Ok(())
    }
}
