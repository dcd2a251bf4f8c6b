//! factpod-gateway - OAuth enablement for Fact Pod sites
//!
#![doc = "Main entry point for the factpod-gateway command-line tool."]

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use factpod_gateway::cli::{Cli, Commands};
use factpod_gateway::config::Config;
use factpod_gateway::{
    EnableFactPodTool, EnableInput, FactPodOAuthService, OpenIdClient, SledRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let repository = Arc::new(SledRepository::open(&config)?);
    let discovery = Arc::new(OpenIdClient::new(&config)?);
    let service = Arc::new(FactPodOAuthService::new(repository, discovery, config));

    match cli.command {
        Commands::Enable { user_id, site } => {
            tracing::info!(tool = EnableFactPodTool::NAME, "Starting fact pod enablement");
            let tool = EnableFactPodTool::new(service);
            let response = tool.call(EnableInput { user_id, site }).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response.status == "error" {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::VerifyState { state, consume } => {
            let claim = if consume {
                service.consume_state(&state).await?
            } else {
                service.verify_state(&state).await?
            };
            let output = match claim {
                Some(claim) => serde_json::json!({
                    "valid": true,
                    "user_id": claim.user_id,
                    "site": claim.site
                }),
                None => serde_json::json!({"valid": false}),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Commands::ShowConnection { user_id, site } => {
            let connection = service.connection(&user_id, &site).await?;
            let output = match connection {
                Some(conn) => serde_json::to_value(conn.redacted())?,
                None => serde_json::Value::Null,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "factpod_gateway=debug"
    } else {
        "factpod_gateway=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
