//! Startup-time credential resolution.

pub mod env;
pub mod gcp;
pub mod traits;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{error, info};

use crate::config::types::{ProvidersConfig, SecretBackend, SecretsConfig};
use crate::error::{RelayError, Result};
use crate::providers::ProviderId;

pub use env::EnvSecretStore;
pub use gcp::GcpSecretManager;
pub use traits::SecretStore;

/// An API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

pub fn build_store(config: &SecretsConfig) -> Arc<dyn SecretStore> {
    match config.backend {
        SecretBackend::Gcp => Arc::new(GcpSecretManager::new(config)),
        SecretBackend::Env => Arc::new(EnvSecretStore::new()),
    }
}

/// Resolves named secrets within one scope.
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
    scope: String,
}

impl SecretResolver {
    /// Use `scope` if given, otherwise ask the store for its default.
    pub async fn new(store: Arc<dyn SecretStore>, scope: Option<String>) -> Result<Self> {
        let scope = match scope.filter(|scope| !scope.trim().is_empty()) {
            Some(scope) => scope,
            None => store.default_scope().await.map_err(|e| {
                RelayError::SecretStore(format!("could not determine secret scope: {e}"))
            })?,
        };

        info!(store = store.name(), scope = %scope, "Secret scope resolved");
        Ok(Self { store, scope })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub async fn resolve(&self, name: &str) -> Result<Credential> {
        let outcome = match self.store.get(name, &self.scope).await {
            Ok(Some(bytes)) => credential_from_bytes(name, bytes),
            Ok(None) => Err(unavailable(name, "no value in secret store")),
            Err(e) => Err(unavailable(name, &e.to_string())),
        };

        match &outcome {
            Ok(_) => info!(secret = name, "Fetched secret"),
            Err(e) => error!(secret = name, error = %e, "Failed to access secret"),
        }

        outcome
    }

    /// Resolve the key of every enabled provider, concurrently.
    pub async fn resolve_providers(
        &self,
        config: &ProvidersConfig,
    ) -> Result<HashMap<ProviderId, Credential>> {
        let lookups = config.enabled().into_iter().map(|id| {
            let name = config.get(id).secret_name_for(id);
            async move { self.resolve(&name).await.map(|credential| (id, credential)) }
        });

        Ok(try_join_all(lookups).await?.into_iter().collect())
    }
}

fn credential_from_bytes(name: &str, bytes: Vec<u8>) -> Result<Credential> {
    let value =
        String::from_utf8(bytes).map_err(|_| unavailable(name, "payload is not valid UTF-8"))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(unavailable(name, "empty payload"));
    }
    Ok(Credential::new(value))
}

fn unavailable(name: &str, reason: &str) -> RelayError {
    RelayError::SecretUnavailable {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
