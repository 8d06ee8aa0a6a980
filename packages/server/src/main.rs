use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::storage::filesystem::FilesystemImageStore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use server::config::AppConfig;
use server::database::{ensure_indexes, init_db};
use server::notification::{NotificationDispatcher, run_retry_sweeper, transport};
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clubreg_server=info,server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(host = %config.server.host, port = config.server.port, "Loaded configuration");

    let db = init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    ensure_indexes(&db).await?;
    info!("Database ready");

    let images = FilesystemImageStore::new(
        config.storage.images_dir.clone(),
        config.storage.max_image_size,
    )
    .await
    .context("Failed to open image store")?;

    let notifier = transport::from_config(&config.notification)
        .context("Failed to set up notification transport")?;
    info!(transport = notifier.name(), "Notification transport ready");

    let dispatcher = NotificationDispatcher::new(db.clone(), notifier, config.notification.clone());
    tokio::spawn(run_retry_sweeper(dispatcher.clone()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        config: Arc::new(config),
        images: Arc::new(images),
        dispatcher,
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
