use anyhow::{bail, Context, Result};
use rand::distr::{Alphanumeric, SampleString};

/// HS256 keys shorter than this are refused.
pub const MIN_JWT_SECRET_LEN: usize = 32;
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;
const GENERATED_SECRET_LEN: usize = 64;

/// Per-process signing secret for when `JWT_SECRET` is unset. Sessions do not
/// survive a restart.
fn generated_secret() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), GENERATED_SECRET_LEN)
}

/// Where uploaded files go.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    Local {
        dir: String,
        /// URL prefix the directory is served under.
        public_prefix: String,
    },
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        /// Base URL objects are publicly reachable at; defaults to the
        /// path-style endpoint URL.
        public_url: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// `None` runs the in-memory store.
    pub database_url: Option<String>,
    pub db_pool_max: u32,
    pub db_pool_min: u32,
    pub db_idle_timeout_secs: u64,
    pub jwt_secret: String,
    /// `true` when `jwt_secret` was drawn at startup rather than configured.
    pub jwt_secret_generated: bool,
    pub session_ttl_days: i64,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
    pub github_owner_username: Option<String>,
    pub owner_github_id: Option<String>,
    pub public_url: Option<String>,
    pub allowed_origins: Vec<String>,
    /// Honour `x-forwarded-for` for client identification. Only safe behind a
    /// proxy that overwrites the header.
    pub trust_proxy: bool,
    pub storage: StorageConfig,
    pub notify_webhook_url: Option<String>,
    pub log_level: Option<String>,
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            database_url: None,
            db_pool_max: 10,
            db_pool_min: 2,
            db_idle_timeout_secs: 300,
            jwt_secret: generated_secret(),
            jwt_secret_generated: true,
            session_ttl_days: 365,
            github_client_id: None,
            github_client_secret: None,
            github_owner_username: None,
            owner_github_id: None,
            public_url: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            trust_proxy: false,
            storage: StorageConfig::Local {
                dir: "uploads".to_string(),
                public_prefix: "/uploads".to_string(),
            },
            notify_webhook_url: None,
            log_level: None,
            log_dir: "logs".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();

        let allowed_origins = optional_env("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .or_else(|| optional_env("FRONTEND_ORIGIN").map(|o| vec![o]))
            .unwrap_or(defaults.allowed_origins);

        let storage = match optional_env("STORAGE_BACKEND").as_deref() {
            None | Some("local") => StorageConfig::Local {
                dir: optional_env("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
                public_prefix: optional_env("UPLOAD_PUBLIC_PREFIX")
                    .unwrap_or_else(|| "/uploads".to_string()),
            },
            Some("s3") => StorageConfig::S3 {
                bucket: require_env("S3_BUCKET")?,
                region: optional_env("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: optional_env("S3_ENDPOINT"),
                public_url: optional_env("S3_PUBLIC_URL"),
                access_key_id: optional_env("AWS_ACCESS_KEY_ID"),
                secret_access_key: optional_env("AWS_SECRET_ACCESS_KEY"),
            },
            Some(other) => bail!("STORAGE_BACKEND must be 'local' or 's3', got '{other}'"),
        };

        let (jwt_secret, jwt_secret_generated) = match optional_env("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (defaults.jwt_secret, true),
        };

        let config = Config {
            environment: optional_env("ENVIRONMENT").unwrap_or(defaults.environment),
            host: optional_env("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT", defaults.port)?,
            database_url: optional_env("DATABASE_URL"),
            db_pool_max: parse_env("DB_POOL_MAX", defaults.db_pool_max)?,
            db_pool_min: parse_env("DB_POOL_MIN", defaults.db_pool_min)?,
            db_idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT", defaults.db_idle_timeout_secs)?,
            jwt_secret,
            jwt_secret_generated,
            session_ttl_days: parse_env("SESSION_TTL_DAYS", defaults.session_ttl_days)?,
            github_client_id: optional_env("GITHUB_CLIENT_ID"),
            github_client_secret: optional_env("GITHUB_CLIENT_SECRET"),
            github_owner_username: optional_env("GITHUB_OWNER_USERNAME"),
            owner_github_id: optional_env("OWNER_GITHUB_ID"),
            public_url: optional_env("PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string()),
            allowed_origins,
            trust_proxy: parse_env("TRUST_PROXY", defaults.trust_proxy)?,
            storage,
            notify_webhook_url: optional_env("NOTIFY_WEBHOOK_URL"),
            log_level: optional_env("LOG_LEVEL"),
            log_dir: optional_env("LOG_DIR").unwrap_or(defaults.log_dir),
        };

        config.check()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Refuse insecure production setups; warn about incomplete ones.
    pub fn check(&self) -> Result<()> {
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&self.session_ttl_days) {
            bail!("SESSION_TTL_DAYS must be between 1 and {MAX_SESSION_TTL_DAYS}");
        }

        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes");
        }
        if self.jwt_secret_generated {
            if self.is_production() {
                bail!("JWT_SECRET must be set in production");
            }
            tracing::warn!(
                "JWT_SECRET not set; using a random per-process secret. Sessions end on restart."
            );
        }

        if self.github_client_id.is_none() || self.github_client_secret.is_none() {
            tracing::warn!("GITHUB_CLIENT_ID / GITHUB_CLIENT_SECRET not set; login is disabled");
        }
        if self.github_owner_username.is_none() {
            tracing::warn!("GITHUB_OWNER_USERNAME not set; no account will be promoted to admin");
        }

        Ok(())
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_env(key: &str) -> Result<String> {
    optional_env(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
