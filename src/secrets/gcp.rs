//! Google Cloud Secret Manager over its REST API.
//!
//! The bearer token comes from, in order: `GOOGLE_OAUTH_ACCESS_TOKEN`, an
//! Application Default Credentials file holding a user refresh token, and the
//! GCE metadata server of the instance the relay runs on.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64_ENGINE;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::types::SecretsConfig;
use crate::error::{RelayError, Result};
use crate::secrets::traits::SecretStore;

const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
const CREDENTIALS_FILE_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

pub struct GcpSecretManager {
    client: Client,
    api_url: String,
    metadata_url: String,
    token_url: String,
    token_source: TokenSource,
    // Secrets are only read at startup, so the token is never refreshed.
    token: OnceCell<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenSource {
    Static(String),
    CredentialsFile(PathBuf),
    Metadata,
}

impl TokenSource {
    fn discover(config: &SecretsConfig) -> Self {
        if let Some(path) = &config.credentials_file {
            return Self::CredentialsFile(path.clone());
        }
        if let Some(token) = std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
        {
            return Self::Static(token);
        }
        if let Some(path) = std::env::var_os(CREDENTIALS_FILE_ENV).filter(|path| !path.is_empty()) {
            return Self::CredentialsFile(PathBuf::from(path));
        }
        match gcloud_credentials_path().filter(|path| path.is_file()) {
            Some(path) => Self::CredentialsFile(path),
            None => Self::Metadata,
        }
    }
}

/// Where `gcloud auth application-default login` writes its credentials.
fn gcloud_credentials_path() -> Option<PathBuf> {
    let dirs = directories::BaseDirs::new()?;
    let config_dir = if cfg!(windows) {
        dirs.config_dir().to_path_buf()
    } else {
        dirs.home_dir().join(".config")
    };
    Some(
        config_dir
            .join("gcloud")
            .join("application_default_credentials.json"),
    )
}

impl GcpSecretManager {
    pub fn new(config: &SecretsConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.secret_manager_url.trim_end_matches('/').to_string(),
            metadata_url: config.metadata_url.trim_end_matches('/').to_string(),
            token_url: config.oauth_token_url.clone(),
            token_source: TokenSource::discover(config),
            token: OnceCell::new(),
        }
    }

    fn secret_version_url(&self, name: &str, scope: &str) -> String {
        format!(
            "{}/v1/projects/{}/secrets/{}/versions/latest:access",
            self.api_url, scope, name
        )
    }

    async fn metadata_get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}/computeMetadata/v1/{}", self.metadata_url, path);
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| RelayError::SecretStore(format!("metadata server unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(RelayError::SecretStore(format!(
                "metadata server returned {} for {}",
                response.status(),
                path
            )));
        }

        Ok(response)
    }

    async fn access_token(&self) -> Result<String> {
        self.token
            .get_or_try_init(|| self.fetch_token())
            .await
            .cloned()
    }

    async fn fetch_token(&self) -> Result<String> {
        match &self.token_source {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::CredentialsFile(path) => self.token_from_file(path).await,
            TokenSource::Metadata => {
                let token: TokenResponse = self
                    .metadata_get("instance/service-accounts/default/token")
                    .await?
                    .json()
                    .await
                    .map_err(|e| RelayError::SecretStore(format!("invalid token response: {e}")))?;
                Ok(token.access_token)
            }
        }
    }

    async fn token_from_file(&self, path: &Path) -> Result<String> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            RelayError::SecretStore(format!(
                "cannot read credentials file {}: {e}",
                path.display()
            ))
        })?;
        let credentials: CredentialsFile = serde_json::from_slice(&raw).map_err(|e| {
            RelayError::SecretStore(format!(
                "unsupported credentials file {}: {e}",
                path.display()
            ))
        })?;

        match credentials {
            CredentialsFile::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
            } => {
                debug!(path = %path.display(), "Redeeming refresh token from credentials file");
                let response = self
                    .client
                    .post(&self.token_url)
                    .form(&[
                        ("grant_type", "refresh_token"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                        ("refresh_token", refresh_token.as_str()),
                    ])
                    .send()
                    .await
                    .map_err(|e| {
                        RelayError::SecretStore(format!("token endpoint unreachable: {e}"))
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(RelayError::SecretStore(format!(
                        "token endpoint returned {status}: {error_text}"
                    )));
                }

                let token: TokenResponse = response.json().await.map_err(|e| {
                    RelayError::SecretStore(format!("invalid token response: {e}"))
                })?;
                Ok(token.access_token)
            }
            CredentialsFile::ServiceAccount { client_email } => {
                Err(RelayError::SecretStore(format!(
                    "service account key for {client_email} cannot be used directly; \
                     set {ACCESS_TOKEN_ENV} (gcloud auth print-access-token) or run on GCE"
                )))
            }
        }
    }
}

#[async_trait]
impl SecretStore for GcpSecretManager {
    fn name(&self) -> &str {
        "gcp"
    }

    async fn default_scope(&self) -> Result<String> {
        let project = self
            .metadata_get("project/project-id")
            .await?
            .text()
            .await
            .map_err(|e| RelayError::SecretStore(format!("invalid project id response: {e}")))?;

        let project = project.trim();
        if project.is_empty() {
            return Err(RelayError::SecretStore(
                "metadata server returned an empty project id".to_string(),
            ));
        }
        Ok(project.to_string())
    }

    async fn get(&self, name: &str, scope: &str) -> Result<Option<Vec<u8>>> {
        let url = self.secret_version_url(name, scope);
        let token = self.access_token().await?;

        debug!(secret = name, scope = scope, "Accessing secret version");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RelayError::SecretStore(format!("Secret Manager unreachable: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RelayError::SecretStore(format!(
                "Secret Manager returned {status}: {error_text}"
            )));
        }

        let body: AccessSecretVersionResponse = response
            .json()
            .await
            .map_err(|e| RelayError::SecretStore(format!("invalid secret response: {e}")))?;

        body.decode()
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialsFile {
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
    ServiceAccount {
        client_email: String,
    },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: Option<SecretPayload>,
}

#[derive(Deserialize)]
struct SecretPayload {
    data: Option<String>,
}

impl AccessSecretVersionResponse {
    fn decode(self) -> Result<Option<Vec<u8>>> {
        let Some(data) = self.payload.and_then(|payload| payload.data) else {
            return Ok(None);
        };

        B64_ENGINE
            .decode(data.as_bytes())
            .map(Some)
            .map_err(|e| RelayError::SecretStore(format!("secret payload is not base64: {e}")))
    }
}
