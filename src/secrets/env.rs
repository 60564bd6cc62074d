use async_trait::async_trait;

use crate::error::Result;
use crate::secrets::traits::SecretStore;

/// Variables also accepted for a secret, after its own name.
const ENV_ALIASES: &[(&str, &str)] = &[("google-api-key", "GEMINI_API_KEY")];

/// Secrets taken from the process environment.
///
/// `openai-api-key` is read from `OPENAI_API_KEY`. Scope is ignored.
#[derive(Debug, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }
}

pub fn env_var_name(secret_name: &str) -> String {
    secret_name
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Variables consulted for `secret_name`, in order.
pub fn env_var_candidates(secret_name: &str) -> Vec<String> {
    let mut names = vec![env_var_name(secret_name)];
    names.extend(
        ENV_ALIASES
            .iter()
            .filter(|(secret, _)| *secret == secret_name)
            .map(|(_, var)| var.to_string()),
    );
    names
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    async fn default_scope(&self) -> Result<String> {
        Ok("local".to_string())
    }

    async fn get(&self, name: &str, _scope: &str) -> Result<Option<Vec<u8>>> {
        let value = env_var_candidates(name).iter().find_map(|var| {
            std::env::var(var)
                .ok()
                .filter(|value| !value.trim().is_empty())
        });
        Ok(value.map(String::into_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("openai-api-key"), "OPENAI_API_KEY");
        assert_eq!(env_var_name("google.api-key"), "GOOGLE_API_KEY");
    }

    #[test]
    fn test_gemini_key_has_legacy_variable() {
        assert_eq!(
            env_var_candidates("google-api-key"),
            vec!["GOOGLE_API_KEY".to_string(), "GEMINI_API_KEY".to_string()]
        );
        assert_eq!(
            env_var_candidates("anthropic-api-key"),
            vec!["ANTHROPIC_API_KEY".to_string()]
        );
    }

    #[tokio::test]
    async fn test_reads_environment() {
        std::env::set_var("CHAT_RELAY_TEST_ENV_STORE_KEY", "value-1");
        let store = EnvSecretStore::new();

        let value = store
            .get("chat-relay-test-env-store-key", "ignored")
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some(&b"value-1"[..]));

        let missing = store
            .get("chat-relay-test-env-store-missing", "ignored")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_falls_back_to_gemini_api_key() {
        std::env::remove_var("GOOGLE_API_KEY");
        std::env::set_var("GEMINI_API_KEY", "gemini-from-dotenv");
        let store = EnvSecretStore::new();

        let value = store.get("google-api-key", "ignored").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"gemini-from-dotenv"[..]));

        std::env::remove_var("GEMINI_API_KEY");
    }
}
