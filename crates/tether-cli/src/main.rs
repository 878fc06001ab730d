//! `tether`: the fetch, merge, upload and path-monitor samples as one CLI.
//!
//! # Usage
//!
//! ```text
//! tether messages
//! tether upload --name "Cate Blanchett" --movie "Elizabeth"
//! tether monitor --fetch
//! tether --config ~/.config/tether/tether.toml monitor --once --simulate wifi
//! ```

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use commands::monitor::MonitorArgs;
use settings::Settings;
use tether_core::{model::MovieStar, path::InterfaceType};
use tether_http::HttpClient;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tether", version, about = "Reactive network call samples")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, env = "TETHER_CONFIG", default_value = "tether.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Fetch messages and favorites concurrently and list them.
  Messages,

  /// Upload a movie star record and print the name the server echoes back.
  Upload {
    #[arg(long, default_value = "Cate Blanchett")]
    name: String,

    /// A film to list; repeat for several.
    #[arg(
      long = "movie",
      value_name = "TITLE",
      default_values = ["The Lord of the Rings", "Elizabeth"]
    )]
    movies: Vec<String>,
  },

  /// Print connectivity changes until interrupted.
  Monitor {
    /// Also fetch the probe page, refusing expensive or constrained paths.
    #[arg(long)]
    fetch: bool,

    /// Exit after the first reported path.
    #[arg(long)]
    once: bool,

    /// Report a fixed path over these interfaces instead of probing sysfs.
    #[arg(long, value_name = "TYPE", value_delimiter = ',')]
    simulate: Vec<InterfaceType>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  match cli.command {
    Command::Messages => {
      let client = build_client(&settings)?;
      commands::messages::run(&client, &settings.endpoints).await
    }
    Command::Upload { name, movies } => {
      let client = build_client(&settings)?;
      let star = MovieStar::new(name, movies);
      commands::upload::run(&client, &settings.endpoints.upload_url, star).await
    }
    Command::Monitor { fetch, once, simulate } => {
      commands::monitor::run(&settings, MonitorArgs { fetch, once, simulate }).await
    }
  }
}

fn build_client(settings: &Settings) -> anyhow::Result<HttpClient> {
  HttpClient::new(settings.client_config()).context("failed to build HTTP client")
}
