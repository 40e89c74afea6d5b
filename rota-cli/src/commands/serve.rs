//! Serve command - run the HTTP API

use std::net::SocketAddr;

use clap::Args;
use rota_api::AppState;
use rota_core::Config;

/// Run the HTTP API until interrupted
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides config and env)
    #[arg(short, long, env = "ROTA_LISTEN")]
    listen: Option<String>,
}

impl ServeArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let config = config.with_cli_overrides(None, self.listen.clone());
        let addr: SocketAddr = config
            .server
            .listen
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address '{}': {}", config.server.listen, e))?;

        let (engine, roster) = super::services(&config).await?;
        tracing::info!(
            database = %config.database.path.display(),
            timeout = ?config.engine.operation_timeout,
            "Starting Rota"
        );

        rota_api::serve(AppState::new(engine, roster), addr).await?;
        Ok(())
    }
}
