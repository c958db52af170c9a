use anyhow::Context;

use beyondwork_api::config::ApiConfig;
use beyondwork_infra::scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    beyondwork_observability::init(config.log_format);

    if config.jwt_secret_defaulted {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let (app, services) = beyondwork_api::app::build_app(&config)
        .await
        .context("failed to initialize backends")?;

    let leaderboard = &config.infra.leaderboard;
    let scheduler = leaderboard
        .schedule_enabled
        .then(|| scheduler::spawn_daily(services.aggregator.clone(), leaderboard.schedule));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    if let Some(handle) = scheduler {
        handle.shutdown().await;
    }
    Ok(())
}
