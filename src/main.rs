use anyhow::Context;

use chatbridge::{logger, run_server, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    logger::init_tracing(&config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting chatbridge"
    );

    run_server(config).await.context("server exited with error")?;
    Ok(())
}
