use anyhow::Context;
use mentor_server::{build_handler, Listener, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let config = ServerConfig::from_env().context("invalid configuration")?;
    info!(mode = %config.mode, addr = %config.addr, "starting mentord");

    let handler = build_handler(&config).await.context("startup failed")?;
    let listener = Listener::bind(&config.addr, handler, config.max_connections).await?;

    let shutdown = listener.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            shutdown.shutdown();
        }
    });

    listener.serve().await?;
    Ok(())
}
