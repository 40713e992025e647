use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub verify_ttl_hours: i64,
    pub change_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Base used to build the public URL of an uploaded object.
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Frontend origin embedded in emailed confirmation links.
    pub page_url: String,
    pub exchange_api_key: String,
    pub offer_sweep_seconds: u64,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub s3: S3Config,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            access_ttl_minutes: env_parse_or("JWT_ACCESS_TTL_MINUTES", 60),
            refresh_ttl_days: env_parse_or("JWT_REFRESH_TTL_DAYS", 7),
            verify_ttl_hours: env_parse_or("JWT_VERIFY_TTL_HOURS", 24),
            change_ttl_minutes: env_parse_or("JWT_CHANGE_TTL_MINUTES", 10),
        };
        let smtp = SmtpConfig {
            host: env_or("SMTP_HOST", "smtp.gmail.com"),
            port: env_parse_or("SMTP_PORT", 465),
            username: std::env::var("SMTP_USER").context("SMTP_USER")?,
            password: std::env::var("SMTP_PASS").context("SMTP_PASS")?,
            from: env_or("SMTP_FROM", "NexoMarket <no-reply@nexomarket.test>"),
        };
        let s3 = S3Config {
            endpoint: std::env::var("S3_ENDPOINT").context("S3_ENDPOINT")?,
            bucket: env_or("S3_BUCKET", "nexomarket"),
            access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY")?,
            secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY")?,
            public_url: std::env::var("S3_PUBLIC_URL").context("S3_PUBLIC_URL")?,
        };
        Ok(Self {
            database_url,
            page_url: env_or("PAGE_URL", "http://localhost:5173"),
            exchange_api_key: std::env::var("EXCHANGE_RATE_API_KEY")
                .context("EXCHANGE_RATE_API_KEY")?,
            offer_sweep_seconds: env_parse_or("OFFER_SWEEP_SECONDS", 60),
            jwt,
            smtp,
            s3,
        })
    }
}
