use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub storage_base_url: String,
    pub storage_bucket: String,
    pub storage_token: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3004".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            storage_base_url: std::env::var("STORAGE_BASE_URL")
                .map_err(|_| anyhow::anyhow!("STORAGE_BASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("STORAGE_BASE_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("STORAGE_BASE_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })?,
            storage_bucket: std::env::var("STORAGE_BUCKET")
                .map_err(|_| anyhow::anyhow!("STORAGE_BUCKET environment variable required"))
                .and_then(|bucket| {
                    if bucket.trim().is_empty() {
                        anyhow::bail!("STORAGE_BUCKET cannot be empty");
                    }
                    Ok(bucket)
                })?,
            storage_token: std::env::var("STORAGE_TOKEN")
                .map_err(|_| anyhow::anyhow!("STORAGE_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("STORAGE_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Storage base URL: {}", config.storage_base_url);
        tracing::debug!("Storage bucket: {}", config.storage_bucket);
        tracing::debug!("Server port: {}", config.port);

        Ok(config)
    }
}
