use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use sprintspace_api::app::{AppServices, build_app};
use sprintspace_api::config::AppConfig;
use sprintspace_infra::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    sprintspace_observability::init(config.log_format);

    if config.uses_default_secret() {
        warn!("JWT_SECRET not set; using insecure dev default");
    }

    let store: Arc<dyn CatalogStore> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresCatalogStore::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to database")?;
            info!(max_connections = config.database_max_connections, "using postgres store");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            Arc::new(InMemoryCatalogStore::new())
        }
    };

    let bind_addr = config.bind_addr;
    let services = Arc::new(AppServices::new(config, store.clone()));
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
