use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub swagger: SwaggerConfig,
    pub minio: MinIOConfig,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub title: String,
    pub version: String,
    pub description: String,
}

/// MinIO/S3 storage configuration for uploaded blobs
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Public endpoint used when building file URLs (defaults to endpoint)
    pub public_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
    /// Key prefix every uploaded blob lives under (e.g., "uploads")
    pub upload_prefix: String,
}

/// Timing of the file lifecycle protocol and its consumers
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// How long an unreferenced upload survives before the deletion check fires
    pub expiration_delay: Duration,
    /// Idle wait between queue polls when no message was due
    pub poll_interval: Duration,
    /// Messages leased per poll
    pub batch_size: i64,
    /// Lease length; an unacknowledged message becomes visible again after it
    pub visibility_timeout: Duration,
    /// Deliveries before a message is parked as dead
    pub max_attempts: i32,
    /// Base delay before a failed message is retried
    pub retry_backoff: Duration,
    /// Competing worker instances per consumer type
    pub workers_per_consumer: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            minio: MinIOConfig::from_env()?,
            lifecycle: LifecycleConfig::from_env()?,
        })
    }
}

/// Read an optional variable, falling back to `default` and parsing either
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String>
where
    T: ToString,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .map_err(|_| format!("{} must be a valid number", key))
}

impl AppConfig {
    const DEFAULT_MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024; // 20MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_upload_size = parse_env("MAX_UPLOAD_SIZE", Self::DEFAULT_MAX_UPLOAD_SIZE)?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_upload_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_env(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        let title =
            env::var("SWAGGER_TITLE").unwrap_or_else(|_| "File Lifecycle API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION").unwrap_or_else(|_| {
            "Upload, reference tracking and reclamation of shared files".to_string()
        });

        Ok(Self {
            title,
            version,
            description,
        })
    }
}

impl MinIOConfig {
    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        // Public endpoint defaults to the main endpoint if not specified
        let public_endpoint =
            env::var("MINIO_PUBLIC_ENDPOINT").unwrap_or_else(|_| endpoint.clone());

        let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "shared-files".to_string());
        let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let upload_prefix = env::var("MINIO_UPLOAD_PREFIX")
            .map(|p| p.trim_matches('/').to_string())
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "uploads".to_string());

        Ok(Self {
            endpoint,
            public_endpoint,
            access_key,
            secret_key,
            bucket,
            region,
            upload_prefix,
        })
    }
}

impl LifecycleConfig {
    const DEFAULT_EXPIRATION_SECS: u64 = 86_400; // 1 day
    const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
    const DEFAULT_BATCH_SIZE: i64 = 20;
    const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 60;
    const DEFAULT_MAX_ATTEMPTS: i32 = 10;
    const DEFAULT_RETRY_BACKOFF_SECS: u64 = 5;
    const DEFAULT_WORKERS_PER_CONSUMER: usize = 2;
    /// 100 years; anything longer cannot be turned into a delivery timestamp
    pub const MAX_EXPIRATION_SECS: u64 = 100 * 365 * 86_400;

    pub fn from_env() -> Result<Self, String> {
        let expiration_delay = Self::expiration_delay(parse_env(
            "FILE_EXPIRATION_SECS",
            Self::DEFAULT_EXPIRATION_SECS,
        )?)?;
        let poll_interval_ms =
            parse_env("CONSUMER_POLL_INTERVAL_MS", Self::DEFAULT_POLL_INTERVAL_MS)?;
        let batch_size = parse_env("CONSUMER_BATCH_SIZE", Self::DEFAULT_BATCH_SIZE)?;
        let visibility_timeout_secs = parse_env(
            "CONSUMER_VISIBILITY_TIMEOUT_SECS",
            Self::DEFAULT_VISIBILITY_TIMEOUT_SECS,
        )?;
        let max_attempts = parse_env("CONSUMER_MAX_ATTEMPTS", Self::DEFAULT_MAX_ATTEMPTS)?;
        let retry_backoff_secs =
            parse_env("CONSUMER_RETRY_BACKOFF_SECS", Self::DEFAULT_RETRY_BACKOFF_SECS)?;
        let workers_per_consumer =
            parse_env("CONSUMER_WORKERS", Self::DEFAULT_WORKERS_PER_CONSUMER)?;

        if batch_size < 1 {
            return Err("CONSUMER_BATCH_SIZE must be at least 1".to_string());
        }
        if max_attempts < 1 {
            return Err("CONSUMER_MAX_ATTEMPTS must be at least 1".to_string());
        }
        if workers_per_consumer < 1 {
            return Err("CONSUMER_WORKERS must be at least 1".to_string());
        }

        Ok(Self {
            expiration_delay,
            poll_interval: Duration::from_millis(poll_interval_ms),
            batch_size,
            visibility_timeout: Duration::from_secs(visibility_timeout_secs),
            max_attempts,
            retry_backoff: Duration::from_secs(retry_backoff_secs),
            workers_per_consumer,
        })
    }

    fn expiration_delay(secs: u64) -> Result<Duration, String> {
        if secs > Self::MAX_EXPIRATION_SECS {
            return Err(format!(
                "FILE_EXPIRATION_SECS must be a valid number of seconds up to {}",
                Self::MAX_EXPIRATION_SECS
            ));
        }
        Ok(Duration::from_secs(secs))
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            expiration_delay: Duration::from_secs(Self::DEFAULT_EXPIRATION_SECS),
            poll_interval: Duration::from_millis(Self::DEFAULT_POLL_INTERVAL_MS),
            batch_size: Self::DEFAULT_BATCH_SIZE,
            visibility_timeout: Duration::from_secs(Self::DEFAULT_VISIBILITY_TIMEOUT_SECS),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_backoff: Duration::from_secs(Self::DEFAULT_RETRY_BACKOFF_SECS),
            workers_per_consumer: Self::DEFAULT_WORKERS_PER_CONSUMER,
        }
    }
}
