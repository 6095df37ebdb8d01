/// Configuration management for Yatube Service
///
/// All settings come from environment variables (a `.env` file is loaded by
/// the binary first). Every value has a development default; production
/// refuses a wildcard CORS origin.
use crate::db::DbConfig;
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DbConfig,
    pub storage: StorageConfig,
    /// Listing cache configuration
    pub cache: CacheConfig,
    pub pagination: PaginationConfig,
    /// Post image storage
    pub media: MediaConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    /// `json` switches log output to JSON lines
    pub log_format: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or `*`
    pub allowed_origins: String,
}

impl CorsConfig {
    pub fn origins(&self) -> Vec<&str> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local store, contents are lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "unknown STORAGE_BACKEND '{}', expected postgres or memory",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Apply embedded migrations on startup (postgres only)
    pub run_migrations: bool,
}

/// Listing cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub listing_ttl_secs: u64,
    pub max_entries: usize,
    /// Drop affected listings on every post write instead of waiting for the TTL
    pub invalidate_on_write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listing_ttl_secs: 20,
            max_entries: 10_000,
            invalidate_on_write: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Index, group and follow feed page size
    pub page_size: u32,
    pub profile_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            profile_page_size: 5,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let cors = {
            let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                Ok(value) => value,
                Err(_) if production => {
                    return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                }
                Err(_) => "http://localhost:3000".to_string(),
            };

            if production && allowed_origins.trim() == "*" {
                return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
            }

            CorsConfig { allowed_origins }
        };

        let pagination_defaults = PaginationConfig::default();
        let pagination = PaginationConfig {
            page_size: parse_env_or_default("PAGE_SIZE", pagination_defaults.page_size)?,
            profile_page_size: parse_env_or_default(
                "PROFILE_PAGE_SIZE",
                pagination_defaults.profile_page_size,
            )?,
            max_page_size: parse_env_or_default(
                "MAX_PAGE_SIZE",
                pagination_defaults.max_page_size,
            )?,
        };
        for (name, size) in [
            ("PAGE_SIZE", pagination.page_size),
            ("PROFILE_PAGE_SIZE", pagination.profile_page_size),
        ] {
            if size == 0 || size > pagination.max_page_size {
                return Err(format!(
                    "{} must be between 1 and {}",
                    name, pagination.max_page_size
                ));
            }
        }

        let cache_defaults = CacheConfig::default();
        let media_defaults = MediaConfig::default();

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("YATUBE_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("YATUBE_SERVICE_PORT", 8080)?,
                log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            },
            cors,
            database: DbConfig::from_env(),
            storage: StorageConfig {
                backend: parse_env_or_default("STORAGE_BACKEND", StorageBackend::Postgres)?,
                run_migrations: parse_env_or_default("RUN_MIGRATIONS", true)?,
            },
            cache: CacheConfig {
                enabled: parse_env_or_default("CACHE_ENABLED", cache_defaults.enabled)?,
                listing_ttl_secs: parse_env_or_default(
                    "CACHE_LISTING_TTL_SECS",
                    cache_defaults.listing_ttl_secs,
                )?,
                max_entries: parse_env_or_default(
                    "CACHE_MAX_ENTRIES",
                    cache_defaults.max_entries,
                )?,
                invalidate_on_write: parse_env_or_default(
                    "CACHE_INVALIDATE_ON_WRITE",
                    cache_defaults.invalidate_on_write,
                )?,
            },
            pagination,
            media: MediaConfig {
                root: std::env::var("MEDIA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(media_defaults.root),
                max_upload_bytes: parse_env_or_default(
                    "MEDIA_MAX_UPLOAD_BYTES",
                    media_defaults.max_upload_bytes,
                )?,
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
