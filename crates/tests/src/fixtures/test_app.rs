use leadflow_api::{
    build_router,
    state::{AppState, Backends},
};
use leadflow_config::{AppSettings, DatabaseSettings, JwtSettings, PushSettings, Settings};
use leadflow_db::{connect, indexes::ensure_indexes};
use leadflow_services::PushGateway;
use leadflow_services::testing::RecordingGateway;
use mongodb::Database;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

const DATABASE_URL_VAR: &str = "LEADFLOW__DATABASE__URL";
const DEFAULT_MONGO_URL: &str = "mongodb://localhost:27017";

/// A running server on an ephemeral port with a push gateway that records
/// instead of sending.
///
/// Storage follows `LEADFLOW__DATABASE__URL`: a `mongodb://` URL gives each
/// test its own freshly indexed database, anything else (or unset) runs on
/// the in-memory stores.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub settings: Settings,
    pub backends: Backends,
    /// Set when the app runs against MongoDB.
    pub db: Option<Database>,
    pub push: Arc<RecordingGateway>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_gateway(RecordingGateway::new()).await
    }

    pub async fn spawn_with_gateway(gateway: RecordingGateway) -> Self {
        let mut settings = test_settings();
        if let Ok(url) = std::env::var(DATABASE_URL_VAR) {
            settings.database.url = url;
        }
        Self::start(settings, gateway).await
    }

    /// Always runs against MongoDB, defaulting to a local server when
    /// `LEADFLOW__DATABASE__URL` is unset.
    pub async fn spawn_mongo() -> Self {
        Self::spawn_mongo_with_gateway(RecordingGateway::new()).await
    }

    pub async fn spawn_mongo_with_gateway(gateway: RecordingGateway) -> Self {
        let mut settings = test_settings();
        settings.database.url = std::env::var(DATABASE_URL_VAR)
            .ok()
            .filter(|url| !url.starts_with("memory://"))
            .unwrap_or_else(|| DEFAULT_MONGO_URL.to_string());
        Self::start(settings, gateway).await
    }

    async fn start(mut settings: Settings, gateway: RecordingGateway) -> Self {
        let (backends, db) = if settings.database.is_memory() {
            (Backends::memory(), None)
        } else {
            settings.database.name = format!("leadflow_test_{}", uuid::Uuid::new_v4().simple());
            let db = connect(&settings.database)
                .await
                .expect("Failed to connect to MongoDB");
            ensure_indexes(&db).await.expect("Failed to create indexes");
            (Backends::mongo(&db), Some(db))
        };

        let push = Arc::new(gateway);
        let gateway: Arc<dyn PushGateway> = push.clone();

        let app_state = AppState::new(settings.clone(), backends.clone(), Some(gateway));
        let app = build_router(app_state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            base_url,
            settings,
            backends,
            db,
            push,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/ws?token={}", self.addr, token)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(db) = self.db.take() {
            // best effort: the runtime may already be shutting down
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = db.drop().await;
                });
            }
        }
    }
}

fn test_settings() -> Settings {
    Settings {
        app: AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
        },
        database: DatabaseSettings {
            url: "memory://".to_string(),
            name: "leadflow_test".to_string(),
            app_name: "leadflow-tests".to_string(),
            server_selection_timeout_secs: 5,
            max_pool_size: Some(5),
            min_pool_size: Some(1),
        },
        jwt: JwtSettings {
            secret: "test-secret-key-for-jwt-signing-minimum-32-chars".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 604800,
            issuer: "leadflow".to_string(),
        },
        push: PushSettings {
            enabled: true,
            credentials_path: None,
            queue_capacity: 64,
            timeout_secs: 2,
            click_action: "FLUTTER_NOTIFICATION_CLICK".to_string(),
        },
    }
}
