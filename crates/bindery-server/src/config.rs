use tracing::info;

pub struct Config {
    pub db_path: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            db_path: var_or("BINDERY_DB_PATH", "bindery.db"),
            host: var_or("BINDERY_HOST", "0.0.0.0"),
            port: var_or("BINDERY_PORT", "3000").parse()?,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}
