//! Environment-style configuration with documented defaults.

/// Pipeline configuration, loaded once at startup.
///
/// | Variable | Default |
/// |---|---|
/// | `SHELTERHUB_TEXT_MODEL` | `gpt-4o` |
/// | `SHELTERHUB_PHOTO_MODEL` | `gpt-4o` |
/// | `SHELTERHUB_BIO_MODEL` | `gpt-4o-mini` |
/// | `SHELTERHUB_EMBEDDING_MODEL` | `text-embedding-3-small` |
/// | `SHELTERHUB_SYNC_INTERVAL_MINUTES` | `60` |
/// | `OPENAI_API_KEY` | (none) |
/// | `SHELTERHUB_VECTOR_INDEX_URL` | (none) |
/// | `SHELTERHUB_VECTOR_INDEX_TOKEN` | (none) |
#[derive(Debug, Clone)]
pub struct Config {
    /// Model for text attribute extraction
    pub text_model: String,
    /// Model for photo attribute extraction
    pub photo_model: String,
    /// Model for bio generation
    pub bio_model: String,
    /// Model for search-document embeddings
    pub embedding_model: String,
    /// A shelter is due when `last_sync` is older than this many minutes
    pub sync_interval_minutes: i64,
    pub openai_api_key: Option<String>,
    pub vector_index_url: Option<String>,
    pub vector_index_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text_model: "gpt-4o".to_string(),
            photo_model: "gpt-4o".to_string(),
            bio_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            sync_interval_minutes: 60,
            openai_api_key: None,
            vector_index_url: None,
            vector_index_token: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            text_model: env_or("SHELTERHUB_TEXT_MODEL", &defaults.text_model),
            photo_model: env_or("SHELTERHUB_PHOTO_MODEL", &defaults.photo_model),
            bio_model: env_or("SHELTERHUB_BIO_MODEL", &defaults.bio_model),
            embedding_model: env_or("SHELTERHUB_EMBEDDING_MODEL", &defaults.embedding_model),
            sync_interval_minutes: std::env::var("SHELTERHUB_SYNC_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sync_interval_minutes),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            vector_index_url: std::env::var("SHELTERHUB_VECTOR_INDEX_URL").ok(),
            vector_index_token: std::env::var("SHELTERHUB_VECTOR_INDEX_TOKEN").ok(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let config = Config::default();
        assert_eq!(config.text_model, "gpt-4o");
        assert_eq!(config.bio_model, "gpt-4o-mini");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.sync_interval_minutes, 60);
        assert!(config.openai_api_key.is_none());
    }
}
