/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development; production
/// deployments override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8002`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// SQLite database URL (default: `sqlite://contractors.db`).
    pub database_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var        | Default                    |
    /// |----------------|----------------------------|
    /// | `HOST`         | `0.0.0.0`                  |
    /// | `PORT`         | `8002`                     |
    /// | `CORS_ORIGINS` | `http://localhost:5173`    |
    /// | `DATABASE_URL` | `sqlite://contractors.db`  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8002".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://contractors.db".into());

        Self {
            host,
            port,
            cors_origins,
            database_url,
        }
    }
}
