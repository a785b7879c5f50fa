use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub docstore_url: String,
    pub docstore_api_key: String,
    pub jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            docstore_url: env::var("DOCSTORE_URL")
                .unwrap_or_else(|_| {
                    warn!("DOCSTORE_URL not set, using empty value");
                    String::new()
                }),
            docstore_api_key: env::var("DOCSTORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("DOCSTORE_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.docstore_url.is_empty()
            && !self.docstore_api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}
