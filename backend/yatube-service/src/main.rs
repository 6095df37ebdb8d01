use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yatube_service::cache::ListingCache;
use yatube_service::config::{Config, StorageBackend};
use yatube_service::repository::{
    ContentRepository, MemoryContentRepository, PostgresContentRepository,
};
use yatube_service::services::MediaStorage;
use yatube_service::{db, handlers, metrics, AppState};

fn init_tracing(log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn ContentRepository>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryContentRepository::new()))
        }
        StorageBackend::Postgres => {
            config.database.log_config();
            let pool = db::create_pool(&config.database)
                .await
                .context("Database pool creation failed")?;

            if config.storage.run_migrations {
                db::run_migrations(&pool)
                    .await
                    .context("Database migrations failed")?;
            }

            Ok(Arc::new(PostgresContentRepository::new(pool)))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_format);

    tracing::info!("Starting yatube-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        env = %config.app.env,
        storage = ?config.storage.backend,
        "Configuration loaded"
    );

    let repo = build_repository(&config).await?;

    let cache = Arc::new(ListingCache::from_config(&config.cache));
    tracing::info!(
        enabled = cache.is_enabled(),
        ttl_secs = config.cache.listing_ttl_secs,
        invalidate_on_write = cache.invalidates_on_write(),
        "Listing cache initialized"
    );

    tokio::fs::create_dir_all(&config.media.root)
        .await
        .with_context(|| format!("Cannot create media root {}", config.media.root.display()))?;
    let media = MediaStorage::new(config.media.root.clone());

    let state = web::Data::new(AppState::new(
        repo,
        cache,
        media,
        config.media.max_upload_bytes,
        config.pagination.clone(),
    ));

    // JSON bodies carry base64 images, which are about 4/3 of the raw size
    let json_limit = config.media.max_upload_bytes.saturating_mul(4) / 3 + 64 * 1024;

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in cors_config.origins() {
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(json_limit))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::configure)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await
    .context("HTTP server failed")?;

    tracing::info!("yatube-service shut down");
    Ok(())
}
