use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::types::{RelayConfig, SecretBackend};
use crate::providers::ProviderId;

#[derive(Parser, Debug)]
#[clap(name = "chat-relay")]
#[clap(version, about = "Fan a prompt out to ChatGPT, Gemini and Claude")]
#[clap(propagate_version = true)]
pub struct Cli {
    #[clap(flatten)]
    pub global_opts: GlobalOpts,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Configuration file path
    #[clap(short, long, global = true, env = "CHAT_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[clap(long, global = true, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP relay
    Serve(ServeArgs),

    /// Send one prompt to every provider and print the answers
    Ask(AskArgs),

    /// Initialize a new chat-relay configuration
    Init(InitArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

// ============================================================================
// Relay Commands
// ============================================================================

/// Overrides shared by every command that talks to providers.
#[derive(Args, Debug)]
pub struct ProviderOpts {
    /// Where to read provider API keys from
    #[clap(long, env = "CHAT_RELAY_SECRETS", value_enum)]
    pub secrets_backend: Option<SecretBackend>,

    /// Secret scope (GCP project id)
    #[clap(long, env = "GCP_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Disable a provider for this run (repeatable)
    #[clap(long = "disable", value_enum)]
    pub disabled: Vec<ProviderId>,

    /// Per-provider timeout in seconds
    #[clap(long)]
    pub timeout: Option<u64>,
}

impl ProviderOpts {
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(backend) = self.secrets_backend {
            config.secrets.backend = backend;
        }
        if let Some(project_id) = &self.project_id {
            config.secrets.project_id = Some(project_id.clone());
        }
        for id in &self.disabled {
            config.providers.get_mut(*id).enabled = false;
        }
        if let Some(timeout) = self.timeout {
            config.dispatch.provider_timeout_seconds = timeout;
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind
    #[clap(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[clap(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Directory for temporary uploads
    #[clap(long)]
    pub upload_dir: Option<PathBuf>,

    #[clap(flatten)]
    pub providers: ProviderOpts,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Prompt text
    pub prompt: Option<String>,

    /// File to attach
    #[clap(long, short = 'm')]
    pub media: Option<PathBuf>,

    /// MIME type of the attached file (application/octet-stream if omitted)
    #[clap(long, requires = "media")]
    pub mime: Option<String>,

    #[clap(flatten)]
    pub providers: ProviderOpts,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force overwrite existing configuration
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[clap(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
}

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "chat-relay",
            "serve",
            "--port",
            "8080",
            "--secrets-backend",
            "env",
            "--disable",
            "gemini",
        ])
        .unwrap();

        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(8080));

        let mut config = RelayConfig::default();
        args.providers.apply(&mut config);
        assert_eq!(config.secrets.backend, SecretBackend::Env);
        assert_eq!(
            config.providers.enabled(),
            vec![ProviderId::ChatGpt, ProviderId::Claude]
        );
    }

    #[test]
    fn test_mime_requires_media() {
        assert!(Cli::try_parse_from(["chat-relay", "ask", "hi", "--mime", "image/png"]).is_err());
        let cli = Cli::try_parse_from([
            "chat-relay",
            "ask",
            "Describe this logo",
            "--media",
            "logo.png",
            "--mime",
            "image/png",
        ])
        .unwrap();
        let Commands::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.mime.as_deref(), Some("image/png"));
    }
}
