use std::sync::Arc;

use mockable::DefaultClock;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use masjid_board::cache::MemoryCache;
use masjid_board::calendar::LocalCalendar;
use masjid_board::config::Config;
use masjid_board::db::Database;
use masjid_board::media::LocalMediaStore;
use masjid_board::providers::provider_chain;
use masjid_board::resolver::PrayerTimeResolver;
use masjid_board::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "masjid_board=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path =
        std::env::var("MASJID_CONFIG").unwrap_or_else(|_| "masjid.toml".to_string());
    let config = Config::load(&config_path)?;
    info!(
        "Loaded configuration for {} with {} admin(s)",
        config.location.name,
        config.admins.len()
    );

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database_url.clone());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    info!("Database initialized");
    let db = Arc::new(db);

    let clock = Arc::new(DefaultClock);
    let calendar = LocalCalendar::with_offset_hours(clock.clone(), config.location.utc_offset_hours)?;
    let cache = Arc::new(MemoryCache::new(clock));
    let providers = provider_chain(&config)?;
    let resolver = PrayerTimeResolver::new(providers, cache, db.clone(), calendar);

    let state = Arc::new(AppState {
        db,
        resolver: Arc::new(resolver),
        location: config.location.clone(),
        admins: config.admins.clone(),
        media: Arc::new(LocalMediaStore::new(&config.media_dir)),
    });

    let app = routes::router(state)
        .nest_service("/storage", ServeDir::new(&config.media_dir))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server starting on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
