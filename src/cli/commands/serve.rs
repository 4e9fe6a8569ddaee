use super::{local_api, runtime};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::rpc::server::serve;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Serve { bind } = cmd else {
        return Ok(());
    };
    let addr = bind.clone().unwrap_or_else(|| cfg.server.bind.clone());
    let api = local_api(cfg)?;

    runtime()?.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        println!("🌐 Serving attendance RPC on http://{}", listener.local_addr()?);
        serve(listener, api, shutdown_signal()).await
    })
}
