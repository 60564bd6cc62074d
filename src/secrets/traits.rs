use async_trait::async_trait;

use crate::error::Result;

/// A store of named secrets, partitioned by scope (e.g. a GCP project).
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store name identifier
    fn name(&self) -> &str;

    /// Scope to use when none is configured
    async fn default_scope(&self) -> Result<String>;

    /// Raw secret bytes, or `None` if the store has no such secret
    async fn get(&self, name: &str, scope: &str) -> Result<Option<Vec<u8>>>;
}
