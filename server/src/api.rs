//! Client for the community REST API.
//!
//! Every endpoint answers with the same `{code, message, data}` envelope; a
//! call succeeds only when `code == 200` and `data` is present.

use nexus_stats::{DateRange, Envelope, StatsResponse};
use reqwest::Method;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} answered {code}: {message}")]
    Rejected {
        path: String,
        code: i64,
        message: String,
    },
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request and unwrap the envelope.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "calling community api");

        let mut request = self.http.request(method, &url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        let envelope: Envelope<T> = response.json().await.map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })?;

        match envelope {
            Envelope {
                code: 200,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope { code, message, .. } => {
                let message = message.unwrap_or_else(|| "no data".to_string());
                warn!(path, code, %message, "community api rejected request");
                Err(ApiError::Rejected {
                    path: path.to_string(),
                    code,
                    message,
                })
            }
        }
    }

    /// `GET /stats`, optionally narrowed to a week picked in the calendar.
    pub async fn fetch_stats(&self, range: Option<DateRange>) -> Result<StatsResponse, ApiError> {
        let query: Vec<(&str, String)> = range
            .map(|r| r.to_query().into_iter().collect())
            .unwrap_or_default();
        self.request(Method::GET, "/stats", &query).await
    }
}
