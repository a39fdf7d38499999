use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nexmind::config::Config;
use nexmind::server;

#[derive(Parser)]
#[command(name = "nexmind")]
#[command(about = "AI-powered investment research backend for Chinese companies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show or update configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
        /// Set the LLM API key
        #[arg(long)]
        api_key: Option<String>,
        /// Set the LLM model
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexmind=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = Config::load()?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::start_server(config).await?;
        }
        Commands::Config {
            show,
            api_key,
            model,
        } => {
            handle_config(show, api_key, model)?;
        }
    }

    Ok(())
}

fn handle_config(show: bool, api_key: Option<String>, model: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    let mut changed = false;

    if let Some(key) = api_key {
        config.llm.api_key = Some(key);
        changed = true;
    }
    if let Some(model) = model {
        config.llm.model = model;
        changed = true;
    }

    if changed {
        config.save()?;
        println!("Configuration saved to {}", Config::config_path()?.display());
    }

    if show || !changed {
        // Hide the key itself when printing
        let mut printable = config.clone();
        if let Some(key) = printable.llm.api_key.as_mut() {
            let prefix: String = key.chars().take(8).collect();
            *key = format!("{}...", prefix);
        }
        println!("{}", toml::to_string_pretty(&printable)?);
    }

    Ok(())
}
