/// Yatube Service Library
///
/// Blogging backend: users author posts (optionally grouped and illustrated),
/// comment on them and follow other authors to build a personal feed.
///
/// # Modules
///
/// - `handlers`: JSON HTTP endpoints
/// - `models`: users, groups, posts, comments, follow edges
/// - `services`: authoring, listings, follow graph, registration
/// - `repository`: storage trait with PostgreSQL and in-memory backends
/// - `db`: PostgreSQL pool and migrations
/// - `cache`: short-TTL cache of listing pages
/// - `middleware`: request identity extraction
/// - `error`: error types and HTTP mapping
/// - `config`: configuration management
/// - `metrics`: Prometheus counters
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::AppState;
