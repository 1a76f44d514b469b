use leadflow_config::DatabaseSettings;
use mongodb::{Client, Database, options::ClientOptions};
use std::time::Duration;
use tracing::info;

/// Builds a client from `settings` and pings the target database before
/// handing it out, so a bad URL fails at startup rather than on first use.
pub async fn connect(settings: &DatabaseSettings) -> Result<Database, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&settings.url).await?;
    options.app_name = Some(settings.app_name.clone());
    options.server_selection_timeout =
        Some(Duration::from_secs(settings.server_selection_timeout_secs));
    options.max_pool_size = settings.max_pool_size.or(options.max_pool_size);
    options.min_pool_size = settings.min_pool_size.or(options.min_pool_size);

    let db = Client::with_options(options)?.database(&settings.name);
    db.run_command(bson::doc! { "ping": 1 }).await?;

    info!(db = %settings.name, app_name = %settings.app_name, "Connected to MongoDB");
    Ok(db)
}
