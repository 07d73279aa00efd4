use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use youtube_transcription_api::cli::{Cli, Commands};
use youtube_transcription_api::config::Config;
use youtube_transcription_api::server;
use youtube_transcription_api::youtube::client::YoutubeClientFactory;

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "youtube_transcription_api=debug,tower_http=debug"
    } else {
        "youtube_transcription_api=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(Commands::default_serve);

    let development = matches!(command, Commands::Serve { development: true, .. })
        || std::env::var("ENVIRONMENT").is_ok_and(|env| env.eq_ignore_ascii_case("development"));
    init_tracing(cli.verbose || development);

    let mut config = Config::load(cli.config.as_deref())?;

    match command {
        Commands::Serve {
            host,
            port,
            development,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.server.development |= development;

            if config.server.development {
                tracing::info!("Development mode enabled");
            }

            let timeout = Duration::from_secs(config.upstream.request_timeout_secs);
            let factory = Arc::new(YoutubeClientFactory::new(timeout));

            server::run(Arc::new(config), factory).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Configuration is read from transcription-api.yaml (or --config) and the environment.");
                println!("Run with --show to print the effective values.");
            }
        }
    }

    Ok(())
}
