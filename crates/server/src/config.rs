use std::env;

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub db_max_connections: u32,
    /// Allowed CORS origin; the request origin is mirrored when unset.
    pub cors_origin: Option<String>,
    /// Mixed into the message body encoding. Not a confidentiality key.
    pub cipher_secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./agora.db".into()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            cipher_secret: env::var("CIPHER_SECRET").unwrap_or_default(),
        }
    }
}
