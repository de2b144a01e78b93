//! arc-api - CultureArc REST backend
//!
//! Serves the artifact catalog: submission with AI-assisted moderation,
//! browsing, likes, comments, collections, and the admin moderation
//! queue. Authentication happens upstream; an authenticating gateway
//! forwards the caller's identity in a request header.

use anyhow::Result;
use arc_api::config::resolve_gemini_api_key;
use arc_api::services::{ModerationService, ModerationSettings};
use arc_api::AppState;
use arc_common::config::{prepare_root_folder, resolve_root_folder, TomlConfig};
use clap::Parser;
use tracing::info;

const DEFAULT_PORT: u16 = 5710;

#[derive(Parser, Debug)]
#[command(name = "arc-api", about = "CultureArc REST backend")]
struct Args {
    /// Root data folder (overrides CULTUREARC_ROOT and config.toml)
    #[arg(long)]
    root_folder: Option<String>,

    /// HTTP listen port (overrides config.toml)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting CultureArc API (arc-api) v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let toml_config = TomlConfig::load()?;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = prepare_root_folder(&root_folder)?;
    info!("Database path: {}", db_path.display());

    let pool = arc_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    let api_key = resolve_gemini_api_key(&pool, &toml_config).await?;
    let settings = ModerationSettings::from_config(&toml_config);
    info!(
        model = %settings.model,
        approve_threshold = settings.approve_threshold,
        moderation_enabled = api_key.is_some(),
        "Moderation configuration resolved"
    );

    let moderation = ModerationService::new(settings, api_key)?;
    let state = AppState::new(pool, moderation);
    let app = arc_api::build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("arc-api listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
