use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    /// Directory avatar uploads are written to. The default avatar
    /// (`default.jpg`) is expected to live here as a fixed asset.
    pub upload_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "askaway".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "askaway-users".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let upload_dir =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/images/users".into());
        Ok(Self {
            database_url,
            session,
            upload_dir,
        })
    }
}
