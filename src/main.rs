use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_sync::api::router;
use offline_sync::cancel::CancelToken;
use offline_sync::canvas::{CanvasHttpClient, CanvasTransport};
use offline_sync::config::AppConfig;
use offline_sync::connectivity::{self, ConnectivityMonitor};
use offline_sync::data_source::NetworkDataSource;
use offline_sync::db;
use offline_sync::filter::ActiveCourses;
use offline_sync::models::UserId;
use offline_sync::services::SyncScheduler;
use offline_sync::session::{LocalStoreCleanup, Session, User};
use offline_sync::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "offline_sync=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;

    let pool = db::connect(&config.database_url, 5).await?;

    let session = Arc::new(Session::new(vec![Arc::new(LocalStoreCleanup::new(pool.clone()))]));
    let transport: Arc<dyn CanvasTransport> =
        Arc::new(CanvasHttpClient::new(&config.canvas, session.clone())?);

    if let Some(token) = config.canvas.api_token.clone() {
        let configured = config.user_id.map(|id| User {
            id: UserId(id),
            name: config.user_name.clone().unwrap_or_default(),
        });
        let network = NetworkDataSource::new(transport.clone());
        if let Err(e) = session.start(token, configured, &network).await {
            warn!(
                "could not resolve current user, starting signed out (set CANVAS_USER_ID to start offline): {}",
                e
            );
        }
    } else {
        warn!("CANVAS_TOKEN is not set; network reads will fail until a session exists");
    }

    let shutdown = CancelToken::new();
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let checker = connectivity::spawn_checker(
        monitor.clone(),
        transport.clone(),
        config.check_interval,
        shutdown.clone(),
    );

    let state = AppState::new(
        pool.clone(),
        transport,
        session,
        monitor,
        Arc::new(ActiveCourses),
        shutdown.clone(),
    );

    let scheduler = SyncScheduler::new(
        state.sync.clone(),
        state.local.clone(),
        state.connectivity.clone(),
        config.sync_interval,
    );
    let scheduler = tokio::spawn(scheduler.start(shutdown.clone()));

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("failed to listen for ctrl-c: {}", e);
                    shutdown.cancelled().await;
                }
                info!("shutting down");
                shutdown.cancel();
            }
        })
        .await?;

    shutdown.cancel();
    let _ = tokio::join!(checker, scheduler);

    Ok(())
}
