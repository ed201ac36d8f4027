use std::path::PathBuf;

/// Runtime configuration, read once from the environment at startup.
pub struct Config {
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let db_path =
            PathBuf::from(std::env::var("BANTER_DB_PATH").unwrap_or_else(|_| "banter.db".into()));
        let jwt_secret =
            std::env::var("BANTER_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
        let host = std::env::var("BANTER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("BANTER_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()?;

        Ok(Self {
            db_path,
            jwt_secret,
            host,
            port,
        })
    }
}
