//! sitelapse-api - HTTP surface for the timeline viewer

use anyhow::Result;
use clap::Parser;
use sitelapse_api::{build_router, AppState};
use sitelapse_common::config::{resolve_config_path, ProjectConfig};
use sitelapse_engine::fetch::AssetApiClient;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sitelapse-api", about = "Timeline viewer HTTP API")]
struct Args {
    /// Path to the project config file (TOML)
    #[arg(long)]
    config: Option<String>,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1:5080", env = "SITELAPSE_BIND")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting sitelapse-api v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref())?;
    let config = ProjectConfig::load(&config_path)?;
    info!(
        project = %config.project_id,
        timeline = %format!("{} .. {}", config.start_date, config.end_date),
        "loaded project config from {}",
        config_path.display()
    );

    let client = AssetApiClient::new()?;
    let state = AppState::new(config, client);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!("sitelapse-api listening on http://{}", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
