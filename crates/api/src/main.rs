use anyhow::Context;

use bankledger_infra::LedgerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bankledger_observability::init();

    let config = LedgerConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let services = bankledger_api::app::build_services(&config).await?;
    tracing::info!(issuer = %services.engine.issuer().id, "bank issuer ready");

    let app = bankledger_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
