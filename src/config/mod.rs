pub mod loader;
pub mod types;

pub use types::{
    DispatchConfig, ProviderConfig, ProvidersConfig, RelayConfig, SecretBackend, SecretsConfig,
    ServerConfig,
};
