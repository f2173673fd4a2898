use anyhow::Context;

/// Application settings, loaded once at startup from the environment
/// (with `.env` support via dotenv).
#[derive(Clone, Debug)]
pub struct Settings {
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,

    pub database_url: String,
    pub bind_addr: String,
    pub uploads_dir: String,

    pub app_name: String,
    pub session_expire_hours: i64,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Settings> {
        Ok(Settings {
            google_client_id: dotenv::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID not set")?,
            google_client_secret: dotenv::var("GOOGLE_CLIENT_SECRET")
                .context("GOOGLE_CLIENT_SECRET not set")?,
            google_redirect_uri: dotenv::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8080/auth/callback/google".to_owned()),
            database_url: dotenv::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://database.db".to_owned()),
            bind_addr: dotenv::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            uploads_dir: dotenv::var("UPLOADS_DIR")
                .unwrap_or_else(|_| "uploads".to_owned()),
            app_name: dotenv::var("APP_NAME")
                .unwrap_or_else(|_| "BAPI".to_owned()),
            session_expire_hours: dotenv::var("SESSION_EXPIRE_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24),
        })
    }
}
