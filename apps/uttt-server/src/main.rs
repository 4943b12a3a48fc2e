use tracing_subscriber::EnvFilter;
use uttt::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        addr = %config.bind_addr,
        origin = config.allowed_origin.as_deref().unwrap_or("*"),
        idle_timeout_secs = ?config.idle_timeout.map(|limit| limit.as_secs()),
        "starting uttt server"
    );

    let server = UtttServerBuilder::from_config(config).build().await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
