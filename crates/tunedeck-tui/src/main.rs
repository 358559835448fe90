mod action;
mod app;
mod app_state;
mod component;
mod components;
mod focus;
mod intent;
mod theme;
mod widgets;
mod workspace;

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use tunedeck_proto::client::ApiClient;
use tunedeck_proto::config::Config;
use tunedeck_proto::platform;
use tunedeck_proto::session::SessionStore;

/// Terminal client for the music search and listening-analytics server.
#[derive(Debug, Parser)]
#[command(name = "tunedeck", version, about)]
struct Args {
    /// Server base URL, overriding `server.base_url` from the config file.
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Load configuration from this file instead of the default location.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Discard the stored session (likes, last search, cached metrics).
    #[arg(long)]
    new_session: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // ── Paths ────────────────────────────────────────────────────────────────
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = platform::log_file();

    // ── Logging: file only, the terminal belongs to the UI ───────────────────
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals at warn.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("tunedeck log: {}", log_path.display());
    info!("tunedeck starting…");

    // ── Config ───────────────────────────────────────────────────────────────
    let config_path = args.config.clone().unwrap_or_else(Config::config_path);
    let mut config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!("failed to load {}: {:#}; using defaults", config_path.display(), e);
            Config::default()
        }
    };
    if let Some(server) = args.server {
        config.server.base_url = server;
    }
    info!("server: {}", config.server.base_url);

    // ── Session ──────────────────────────────────────────────────────────────
    let session_path = platform::session_file();
    let mut session = match SessionStore::open(&session_path, config.session.idle_ttl()) {
        Ok(session) => session,
        Err(e) => {
            warn!("session store unavailable ({:#}); keeping this session in memory", e);
            SessionStore::in_memory()
        }
    };
    if args.new_session {
        info!("--new-session: discarding stored session");
        session.clear()?;
    }

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let client = ApiClient::new(&config.server)?;
    let app = app::App::new(&config, client, session, log_path);
    app.run().await?;

    Ok(())
}
