mod check_cmd;
mod config;
mod render;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use terrareview_core::session::cookie::generate_secret_hex;
use terrareview_core::summarize::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

use config::{ServeOverrides, TerrareviewConfig};

/// Env var consulted by `check --summarize` when `--api-key` is absent.
const API_KEY_ENV: &str = "TERRAREVIEW_API_KEY";

#[derive(Parser)]
#[command(name = "terrareview", about = "Terraform plan validator with AI summaries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a terrareview config file with a fresh session secret
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run the web server
    Serve {
        /// Address to bind (overrides TERRAREVIEW_BIND)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides TERRAREVIEW_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Directory for in-flight uploads (overrides TERRAREVIEW_UPLOAD_DIR)
        #[arg(long)]
        upload_dir: Option<PathBuf>,
    },
    /// Validate a local plan file (exit code 1 if invalid)
    Check {
        /// Path to a .json or .txt plan
        file: PathBuf,
        /// Also request an AI summary
        #[arg(long)]
        summarize: bool,
        /// API key for the summary (defaults to TERRAREVIEW_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },
}

/// Execute the `terrareview init` command: write config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let secret = generate_secret_hex();

    let cfg = config::ConfigFile {
        server: config::ServerSection {
            bind: Some(config::DEFAULT_BIND.to_string()),
            port: Some(config::DEFAULT_PORT),
            upload_dir: Some(PathBuf::from(config::DEFAULT_UPLOAD_DIR)),
        },
        session: config::SessionSection {
            secret: Some(secret.clone()),
            idle_ttl_secs: None,
        },
        summarizer: config::SummarizerSection {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            model: Some(DEFAULT_MODEL.to_string()),
            timeout_secs: None,
        },
        markers: None,
    };

    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  server = {}:{}", config::DEFAULT_BIND, config::DEFAULT_PORT);
    println!("  session.secret = {}...{}", &secret[..8], &secret[56..]);
    println!("  summarizer.model = {DEFAULT_MODEL}");
    println!();
    println!("Next: run `terrareview serve`.");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(force)?;
        }
        Commands::Serve {
            bind,
            port,
            upload_dir,
        } => {
            let overrides = ServeOverrides {
                bind,
                port,
                upload_dir,
            };
            let resolved = TerrareviewConfig::resolve(&overrides)?;
            serve_cmd::run_serve(resolved).await?;
        }
        Commands::Check {
            file,
            summarize,
            api_key,
        } => {
            let resolved = TerrareviewConfig::resolve(&ServeOverrides::default())?;
            let api_key = api_key.or_else(|| std::env::var(API_KEY_ENV).ok());
            let valid =
                check_cmd::run_check(&resolved, &file, summarize, api_key.as_deref()).await?;
            if !valid {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
