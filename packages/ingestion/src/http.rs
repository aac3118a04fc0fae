//! Injected HTTP capability for adapters.
//!
//! Adapters never construct their own network client; they receive a
//! `HttpFetch` so tests can substitute canned pages without patching any
//! global state.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Transport-level fetch failure.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request failed for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Minimal GET-a-page capability injected into adapters.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch a URL and return the response body as text.
    async fn get_text(&self, url: &str) -> Result<String, HttpError>;
}

/// Production `HttpFetch` backed by reqwest.
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new() -> Result<Self, HttpError> {
        // Browser-like User-Agent to avoid naive bot detection on shelter sites
        let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| HttpError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestHttp {
    async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HttpError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| HttpError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
