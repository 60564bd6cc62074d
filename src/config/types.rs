use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::providers::ProviderId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub secrets: SecretsConfig,
    pub providers: ProvidersConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to listen on
    pub port: u16,
    /// Origins allowed by CORS. An empty list allows any origin.
    pub allowed_origins: Vec<String>,
    /// Directory for temporary uploads (system temp dir if unset)
    pub upload_dir: Option<PathBuf>,
    /// Maximum accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            upload_dir: None,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Where provider API keys are fetched from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackend {
    /// Google Cloud Secret Manager
    #[default]
    Gcp,
    /// Process environment (and .env file)
    Env,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    pub backend: SecretBackend,
    /// Secret scope. Queried from the store when unset.
    pub project_id: Option<String>,
    /// Secret Manager REST endpoint
    pub secret_manager_url: String,
    /// GCE metadata server, used for the access token and default project
    pub metadata_url: String,
    /// Application Default Credentials file. Falls back to
    /// `GOOGLE_APPLICATION_CREDENTIALS`, then the gcloud default location.
    pub credentials_file: Option<PathBuf>,
    /// OAuth token endpoint used to redeem a user refresh token
    pub oauth_token_url: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackend::default(),
            project_id: None,
            secret_manager_url: "https://secretmanager.googleapis.com".to_string(),
            metadata_url: "http://metadata.google.internal".to_string(),
            credentials_file: None,
            oauth_token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub chatgpt: ProviderConfig,
    pub gemini: ProviderConfig,
    pub claude: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, id: ProviderId) -> &ProviderConfig {
        match id {
            ProviderId::ChatGpt => &self.chatgpt,
            ProviderId::Gemini => &self.gemini,
            ProviderId::Claude => &self.claude,
        }
    }

    pub fn get_mut(&mut self, id: ProviderId) -> &mut ProviderConfig {
        match id {
            ProviderId::ChatGpt => &mut self.chatgpt,
            ProviderId::Gemini => &mut self.gemini,
            ProviderId::Claude => &mut self.claude,
        }
    }

    /// Providers switched on in configuration, in response key order.
    pub fn enabled(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.get(*id).enabled)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Disabled providers need no credential and always answer null
    pub enabled: bool,
    /// Name of the secret holding the API key (provider default if unset)
    pub secret_name: Option<String>,
    /// Model identifier (provider default if unset)
    pub model: Option<String>,
    /// Override for the provider's API base URL
    pub base_url: Option<String>,
    pub max_tokens: u32,
}

impl ProviderConfig {
    pub fn secret_name_for(&self, id: ProviderId) -> String {
        self.secret_name
            .clone()
            .unwrap_or_else(|| id.default_secret_name().to_string())
    }

    pub fn model_for(&self, id: ProviderId) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| id.default_model().to_string())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            secret_name: None,
            model: None,
            base_url: None,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound for a single provider call
    pub provider_timeout_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            provider_timeout_seconds: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [providers.gemini]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.providers.gemini.enabled);
        assert_eq!(config.providers.chatgpt.model_for(ProviderId::ChatGpt), "gpt-4o");
        assert_eq!(
            config.providers.gemini.model_for(ProviderId::Gemini),
            "gemini-1.5-flash"
        );
        assert_eq!(
            config.providers.claude.secret_name_for(ProviderId::Claude),
            "anthropic-api-key"
        );
        assert_eq!(
            config.providers.enabled(),
            vec![ProviderId::ChatGpt, ProviderId::Claude]
        );
    }

    #[test]
    fn test_secret_backend_parses_lowercase() {
        let config: RelayConfig = toml::from_str("[secrets]\nbackend = \"env\"\n").unwrap();
        assert_eq!(config.secrets.backend, SecretBackend::Env);
        assert_eq!(
            config.secrets.secret_manager_url,
            "https://secretmanager.googleapis.com"
        );
    }
}
