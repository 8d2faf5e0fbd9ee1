use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::{Method, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::config::HttpConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid HTTP client configuration: {0}")]
    InvalidConfig(String),

    /// The last attempt failed in transport (connect, timeout, body read).
    #[error("Failed to fetch {url} after {attempts} attempt(s): {source}")]
    Request {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The last attempt got a response with a status other than 200.
    #[error("Failed to fetch {url} after {attempts} attempt(s): final status {status}")]
    Status {
        url: String,
        attempts: u32,
        status: StatusCode,
    },
}

impl FetchError {
    /// Status code of the final attempt, if it got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

enum AttemptError {
    Request(reqwest::Error),
    Status(StatusCode),
}

/// HTTP client that retries failed requests with a linearly growing delay.
///
/// An attempt fails on a transport error or on any status other than 200.
/// After failed attempt `n` (except the last) the client sleeps `n * backoff_unit`.
#[derive(Debug, Clone)]
pub struct RetryClient {
    http: reqwest::Client,
    max_attempts: u32,
    backoff_unit: Duration,
}

impl RetryClient {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        if config.max_attempts < 1 {
            return Err(FetchError::InvalidConfig(format!(
                "max_attempts must be at least 1, got {}",
                config.max_attempts
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http,
            max_attempts: config.max_attempts,
            backoff_unit: config.backoff_unit(),
        })
    }

    pub async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch(Method::GET, url, None).await
    }

    /// POSTs a form-encoded body, with the target url as referer.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<Vec<u8>, FetchError> {
        self.fetch(Method::POST, url, Some(form)).await
    }

    #[instrument(name = "Fetch", skip(self, form))]
    pub async fn fetch(
        &self,
        method: Method,
        url: &str,
        form: Option<&[(String, String)]>,
    ) -> Result<Vec<u8>, FetchError> {
        let body = form.map(|pairs| {
            url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish()
        });

        let mut attempt = 1;
        loop {
            let err = match self.attempt(method.clone(), url, body.as_deref()).await {
                Ok(bytes) => {
                    debug!("Fetched {} bytes on attempt {}", bytes.len(), attempt);
                    return Ok(bytes);
                }
                Err(err) => err,
            };

            if attempt >= self.max_attempts {
                warn!("Giving up on {} after {} attempt(s)", url, attempt);
                return Err(match err {
                    AttemptError::Request(source) => FetchError::Request {
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    },
                    AttemptError::Status(status) => FetchError::Status {
                        url: url.to_string(),
                        attempts: attempt,
                        status,
                    },
                });
            }

            match &err {
                AttemptError::Request(e) => debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, self.max_attempts, e
                ),
                AttemptError::Status(s) => debug!(
                    "Attempt {}/{} returned {}. Retrying...",
                    attempt, self.max_attempts, s
                ),
            }
            tokio::time::sleep(self.backoff_unit * attempt).await;
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
    ) -> Result<Vec<u8>, AttemptError> {
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(REFERER, url)
                .body(body.to_string());
        }

        let response = request.send().await.map_err(AttemptError::Request)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(AttemptError::Status(status));
        }

        let bytes = response.bytes().await.map_err(AttemptError::Request)?;
        Ok(bytes.to_vec())
    }
}
