//! Request Tracker REST 1.0 client
//!
//! Logs in once with the configured credentials (RT hands back a session
//! cookie that the client's cookie store replays) and then reads the ticket
//! feed and per-ticket history in the `format=l` record layout.

use super::retry::{classify_reqwest, with_retry, RetryConfig, RetryDecision, RetryableError};
use super::rt_format::{parse_response, RawRecord};
use super::TrackerClient;
use crate::config::{HttpSettings, RtConfig};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

/// Errors raised by the Tracker client
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("RT authentication failed: {0}")]
    Auth(String),
    #[error("RT API error: {status} {message}")]
    Api { status: u16, message: String },
    #[error("RT response could not be parsed: {0}")]
    Parse(String),
    #[error("RT network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl RetryableError for TrackerError {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            TrackerError::Network(e) => classify_reqwest(e),
            TrackerError::Api { status, .. } if *status >= 500 => RetryDecision::Retry,
            TrackerError::Api { .. } | TrackerError::Auth(_) | TrackerError::Parse(_) => {
                RetryDecision::NoRetry
            }
        }
    }
}

/// RT REST 1.0 client
pub struct RtClient {
    client: Client,
    base_url: String,
    search_suffix: String,
    retry: RetryConfig,
}

impl RtClient {
    /// Build the client and establish an authenticated session
    pub async fn connect(config: &RtConfig, http: &HttpSettings) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()?;

        let rt = Self {
            client,
            base_url: normalize_base_url(&config.api_url_prefix),
            search_suffix: config.api_search_suffix.clone(),
            retry: RetryConfig::with_max_retries(http.max_retries),
        };
        rt.login(&config.username, &config.password).await?;
        Ok(rt)
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), TrackerError> {
        debug!(url = %self.base_url, user = %username, "Logging in to RT");

        let response = self
            .client
            .post(&self.base_url)
            .form(&[("user", username), ("pass", password)])
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(TrackerError::Auth(format!("login rejected for {}", username)));
        }
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TrackerError::Api {
                status: status.as_u16(),
                message: body.lines().next().unwrap_or_default().to_string(),
            });
        }

        // RT answers the login POST itself with a REST status document
        parse_response(&body)?;
        info!(url = %self.base_url, "Connected to RT");
        Ok(())
    }

    /// The search path configured for the incremental feed
    pub fn search_suffix(&self) -> &str {
        &self.search_suffix
    }

    async fn get_records(&self, path: &str) -> Result<Vec<RawRecord>, TrackerError> {
        let url = format!("{}{}", self.base_url, path);
        let url = url.as_str();
        let client = &self.client;
        with_retry(&self.retry, path, || async move {
            debug!(url = %url, "Fetching RT resource");
            let response = client.get(url).send().await?;
            let status = response.status();
            let body = response.text().await?;
            if status == StatusCode::UNAUTHORIZED {
                return Err(TrackerError::Auth("session rejected".to_string()));
            }
            if !status.is_success() {
                return Err(TrackerError::Api {
                    status: status.as_u16(),
                    message: body.lines().next().unwrap_or_default().to_string(),
                });
            }
            parse_response(&body)
        })
        .await
    }
}

#[async_trait]
impl TrackerClient for RtClient {
    async fn fetch_feed(&self, query: &str) -> Result<Vec<RawRecord>, TrackerError> {
        let records = self.get_records(query).await?;
        info!(count = records.len(), "Fetched RT ticket feed");
        Ok(records)
    }

    async fn fetch_history(&self, ticket_id: &str) -> Result<Vec<RawRecord>, TrackerError> {
        let path = format!(
            "ticket/{}/history?format=l",
            urlencoding::encode(ticket_id)
        );
        let records = self.get_records(&path).await?;
        debug!(ticket = %ticket_id, count = records.len(), "Fetched RT ticket history");
        Ok(records)
    }
}

/// RT paths are appended directly, so the prefix must end with `/`
fn normalize_base_url(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}
