use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use greenhouse_dashboard::{
    api::{self, AppState},
    config::Config,
    dashboard::{DashboardCache, DashboardCompiler, RefreshService},
    gateway::GatewayClient,
    notifications::{NotificationHub, SignalRTransport},
};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let gateway = GatewayClient::new(&config);
    if !gateway.has_token().await {
        info!("No BACKEND_TOKEN set; backend requests will be unauthenticated");
    }

    // Latest compiled dashboard, shared by the refresh loop and the API
    let cache = DashboardCache::new();

    {
        let refresh = RefreshService::new(
            DashboardCompiler::new(gateway.clone()),
            cache.clone(),
            config.gardener_id,
            config.refresh_interval(),
        );
        tokio::spawn(refresh.run());
    }

    // Push notifications: the subscription keeps the hub connection open
    let hub = NotificationHub::new(
        SignalRTransport::from_config(gateway.clone(), &config),
        config.hub_reconnect_delay(),
    );
    {
        let mut subscription = hub.subscribe();
        tokio::spawn(async move {
            while let Some(n) = subscription.recv().await {
                info!(id = n.id, kind = %n.kind, message = %n.message, "Notification");
            }
        });
    }

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, gardener_id = config.gardener_id, "HTTP server listening");

    let state = AppState::new(gateway, cache, config.gardener_id);
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
