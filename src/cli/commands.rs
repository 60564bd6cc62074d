use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cli::args::{AskArgs, ConfigAction, ConfigArgs, InitArgs, OutputFormat, ServeArgs};
use crate::config::loader::get_config_path;
use crate::config::types::RelayConfig;
use crate::dispatch::{AggregatedResponse, Dispatcher};
use crate::error::{RelayError, Result};
use crate::media::normalize;
use crate::providers::{ProviderId, ProviderRegistry};
use crate::secrets::{build_store, SecretResolver};
use crate::server::{self, AppState};

// ============================================================================
// Relay Commands
// ============================================================================

/// Resolve secrets, build the provider registry, then serve HTTP
pub async fn serve(args: ServeArgs, mut config: RelayConfig) -> Result<()> {
    args.providers.apply(&mut config);
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(upload_dir) = args.upload_dir {
        config.server.upload_dir = Some(upload_dir);
    }

    info!("Initializing AI clients");
    let dispatcher = build_dispatcher(&config).await?;
    info!(
        providers = ?dispatcher.registry().configured_ids(),
        "AI clients initialized, starting server"
    );

    let state = AppState::new(Arc::new(dispatcher), config.server.upload_dir.clone());
    server::serve(state, &config.server).await
}

/// Fan a single prompt out from the terminal
pub async fn ask(args: AskArgs, mut config: RelayConfig, format: OutputFormat) -> Result<()> {
    args.providers.apply(&mut config);

    let media = match &args.media {
        Some(path) => {
            let bytes = tokio::fs::read(path).await?;
            let mime_type = args.mime.as_deref().unwrap_or("application/octet-stream");
            Some(normalize(bytes, mime_type))
        }
        None => None,
    };

    let dispatcher = build_dispatcher(&config).await?;
    let response = dispatcher.dispatch(args.prompt, media).await?;

    output_response(&response, format)
}

/// Startup sequence shared by `serve` and `ask`.
///
/// Any secret or client failure is returned before traffic is accepted.
pub async fn build_dispatcher(config: &RelayConfig) -> Result<Dispatcher> {
    let enabled = config.providers.enabled();

    let registry = if enabled.is_empty() {
        info!("No providers enabled, every answer will be null");
        ProviderRegistry::empty()
    } else {
        let store = build_store(&config.secrets);
        let resolver = SecretResolver::new(store, config.secrets.project_id.clone()).await?;
        let credentials = resolver.resolve_providers(&config.providers).await?;
        ProviderRegistry::initialize(&config.providers, &credentials)?
    };

    Ok(Dispatcher::new(
        Arc::new(registry),
        Duration::from_secs(config.dispatch.provider_timeout_seconds),
    ))
}

// ============================================================================
// Config Commands
// ============================================================================

pub async fn init(args: InitArgs) -> Result<()> {
    let config_path = get_config_path();

    if config_path.exists() && !args.force {
        println!("Configuration already exists at: {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    // Create parent directories if needed
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let default_config = RelayConfig::default();
    let toml_str =
        toml::to_string_pretty(&default_config).map_err(|e| RelayError::Config(e.to_string()))?;

    std::fs::write(&config_path, toml_str)?;

    println!("Created configuration at: {}", config_path.display());
    println!("\nQuick start:");
    println!("  # Read API keys from OPENAI_API_KEY, GOOGLE_API_KEY, ANTHROPIC_API_KEY");
    println!("  chat-relay serve --secrets-backend env");
    println!();
    println!("  # Or from Google Secret Manager");
    println!("  chat-relay serve --project-id my-project");
    println!();
    println!("  # Ask every provider once from the terminal");
    println!("  chat-relay ask \"Describe this logo\" --media logo.png --mime image/png");

    Ok(())
}

pub async fn config(args: ConfigArgs, config: RelayConfig) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let toml_str =
                toml::to_string_pretty(&config).map_err(|e| RelayError::Config(e.to_string()))?;
            println!("{}", toml_str);
        }
        ConfigAction::Path => {
            println!("{}", get_config_path().display());
        }
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn output_response(response: &AggregatedResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_text(response)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
    }
    Ok(())
}

fn render_text(response: &AggregatedResponse) -> String {
    let mut out = String::new();
    for id in ProviderId::ALL {
        out.push_str(&format!("== {id}\n"));
        out.push_str(response.get(id).unwrap_or("(no answer)"));
        out.push_str("\n\n");
    }
    out
}
