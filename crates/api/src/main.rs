use leadflow_api::{
    build_router,
    state::{AppState, Backends},
};
use leadflow_config::Settings;
use leadflow_db::{connect, indexes::ensure_indexes};
use leadflow_services::{FcmGateway, PushGateway};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "leadflow_api=debug,leadflow_services=debug,leadflow_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting Leadflow API on {}:{}", settings.app.host, settings.app.port);

    let backends = if settings.database.is_memory() {
        warn!("Using in-memory storage; data is lost on exit");
        Backends::memory()
    } else {
        let db = connect(&settings.database).await?;
        ensure_indexes(&db).await?;
        Backends::mongo(&db)
    };

    let gateway = push_gateway(&settings)?;
    let app_state = AppState::new(settings.clone(), backends, gateway);
    let app = build_router(app_state.clone());

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.shutdown().await;
    info!("Server stopped");
    Ok(())
}

fn push_gateway(settings: &Settings) -> anyhow::Result<Option<Arc<dyn PushGateway>>> {
    if !settings.push.enabled {
        info!("Push notifications disabled");
        return Ok(None);
    }
    let Some(path) = settings.push.credentials_path.as_deref() else {
        warn!("Push enabled but push.credentials_path is unset; push disabled");
        return Ok(None);
    };
    let gateway = FcmGateway::from_file(path)?;
    info!(credentials = %path, "FCM gateway ready");
    Ok(Some(Arc::new(gateway)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(%e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
