use mimalloc::MiMalloc;
use satchel::{
    bootstrap,
    config::Config,
    server::{AppState, satchel_router},
    workers::sweeper::Sweeper,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        workers = cfg.basic.workers,
        data_dir = %cfg.storage.data_dir.display(),
        database = %cfg.storage.database_path.display(),
        loglevel = %cfg.basic.loglevel,
        rate_limit = cfg.limits.enabled,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.basic.workers)
        .enable_all()
        .build()?;

    runtime.block_on(serve(Arc::new(cfg)))
}

async fn serve(cfg: Arc<Config>) -> Result<(), Box<dyn std::error::Error>> {
    let report = bootstrap::prepare(&cfg.storage).await?;
    info!(
        created_data_dir = report.created_data_dir,
        initialized_database = report.initialized_database,
        "Startup sequence complete"
    );

    if cfg.basic.public_url.is_none() {
        warn!("basic.public_url is unset; download links are built from the request Host header");
    }

    let db = satchel::db::spawn(&cfg.storage.database_url()).await?;
    let state = AppState::new(db.clone(), cfg.clone());

    let sweeper = Sweeper::new(db, state.blobs.clone(), state.limiter.clone())
        .spawn(Duration::from_secs(cfg.storage.sweep_interval_secs));

    let app = satchel_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
