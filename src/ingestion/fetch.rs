//! Fetch functions - retrieve company records from the LinkedIn enrichment API

use crate::ingestion::utils::{RateLimiter, RetryPolicy};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

pub const DEFAULT_BASE_URL: &str = "https://nubela.co/proxycurl/api";

/// Enrichment API client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {0}")]
    Http(StatusCode),

    #[error("Max retries reached after {0} attempts")]
    RetriesExhausted(u32),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Client settings for one kind of enrichment call
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub api_key: String,
    pub requests_per_period: u32,
    pub period: Duration,
    pub retry: RetryPolicy,
}

impl ClientSettings {
    /// 2 requests per minute, 3 attempts, retrying only 429
    pub fn company_data(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            requests_per_period: 2,
            period: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    /// 5 requests per minute, 5 attempts, retrying 429 and 5xx
    pub fn profile_pictures(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            requests_per_period: 5,
            period: Duration::from_secs(60),
            retry: RetryPolicy {
                max_retries: 5,
                base_delay: Duration::from_secs(1),
                retry_server_errors: true,
                ..RetryPolicy::default()
            },
        }
    }
}

/// LinkedIn company enrichment API client
pub struct ProxycurlClient {
    http_client: Client,
    rate_limiter: RateLimiter,
    settings: ClientSettings,
}

impl ProxycurlClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::per_period(settings.requests_per_period, settings.period),
            settings,
        })
    }

    /// Shared HTTP client, also used for downloading images
    pub fn http(&self) -> &Client {
        &self.http_client
    }

    /// Rate-limited GET with capped exponential backoff on throttling
    pub async fn request(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, ClientError> {
        let url = format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path);
        let retry = &self.settings.retry;

        for attempt in 0..retry.max_retries {
            self.rate_limiter.wait().await;

            debug!(url = %url, attempt, "Querying enrichment API");

            let response = self
                .http_client
                .get(&url)
                .bearer_auth(&self.settings.api_key)
                .query(params)
                .send()
                .await
                .map_err(|e| {
                    error!("An error occurred: {}", e);
                    ClientError::Network(e)
                })?;

            let status = response.status();

            if status.is_success() {
                return response
                    .json::<Value>()
                    .await
                    .map_err(|e| ClientError::Parse(e.to_string()));
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS
                || (retry.retry_server_errors && status.is_server_error());

            if !retryable {
                error!("HTTP error occurred: {}", status);
                return Err(ClientError::Http(status));
            }

            warn!(
                "Request throttled ({}). Attempt {} of {}",
                status,
                attempt + 1,
                retry.max_retries
            );
            let delay = retry.backoff_delay(attempt);
            warn!("Backing off for {:.2} seconds", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }

        error!("Max retries reached. Skipping this request.");
        Err(ClientError::RetriesExhausted(retry.max_retries))
    }

    /// Resolve a company name to its LinkedIn URL
    pub async fn lookup_company_url(&self, company_name: &str) -> Result<Option<String>, ClientError> {
        let result = self
            .request(
                "linkedin/company/resolve",
                &[("company_name", company_name), ("enrich_profile", "false")],
            )
            .await?;

        Ok(non_empty_str(&result, "url"))
    }

    /// Fetch the full company profile, including funding and extra data
    pub async fn fetch_company_profile(&self, company_url: &str) -> Result<Value, ClientError> {
        self.request(
            "linkedin/company",
            &[
                ("url", company_url),
                ("categories", "include"),
                ("funding_data", "include"),
                ("exit_data", "include"),
                ("acquisitions", "include"),
                ("extra", "include"),
                ("use_cache", "if-present"),
                ("fallback_to_cache", "on-error"),
            ],
        )
        .await
    }

    /// Temporary URL of the company's profile picture
    pub async fn fetch_profile_picture_url(
        &self,
        company_url: &str,
    ) -> Result<Option<String>, ClientError> {
        let result = self
            .request(
                "linkedin/company/profile-picture",
                &[("linkedin_company_profile_url", company_url)],
            )
            .await?;

        Ok(non_empty_str(&result, "tmp_profile_pic_url"))
    }
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fast_settings(base_url: String) -> ClientSettings {
        ClientSettings {
            base_url,
            api_key: "test-key".to_string(),
            requests_per_period: 1000,
            period: Duration::from_secs(1),
            retry: RetryPolicy {
                max_retries: 3,
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                jitter: Duration::ZERO,
                retry_server_errors: false,
            },
        }
    }

    #[tokio::test]
    async fn test_lookup_sends_auth_and_params() {
        let app = Router::new().route(
            "/linkedin/company/resolve",
            get(
                |headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(headers["authorization"], "Bearer test-key");
                    assert_eq!(params["enrich_profile"], "false");
                    Json(json!({
                        "url": format!("https://www.linkedin.com/company/{}", params["company_name"])
                    }))
                },
            ),
        );
        let client = ProxycurlClient::new(fast_settings(serve(app).await)).unwrap();

        let url = client.lookup_company_url("canva").await.unwrap();

        assert_eq!(url.as_deref(), Some("https://www.linkedin.com/company/canva"));
    }

    #[tokio::test]
    async fn test_lookup_without_url() {
        let app = Router::new().route(
            "/linkedin/company/resolve",
            get(|| async { Json(json!({ "url": null })) }),
        );
        let client = ProxycurlClient::new(fast_settings(serve(app).await)).unwrap();

        assert_eq!(client.lookup_company_url("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_retries_on_rate_limit_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/linkedin/company",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(AxumStatus::TOO_MANY_REQUESTS)
                    } else {
                        Ok(Json(json!({ "name": "Canva" })))
                    }
                }
            }),
        );
        let client = ProxycurlClient::new(fast_settings(serve(app).await)).unwrap();

        let profile = client
            .fetch_company_profile("https://www.linkedin.com/company/canva")
            .await
            .unwrap();

        assert_eq!(profile["name"], "Canva");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/linkedin/company",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    AxumStatus::TOO_MANY_REQUESTS
                }
            }),
        );
        let client = ProxycurlClient::new(fast_settings(serve(app).await)).unwrap();

        let result = client.fetch_company_profile("https://example.com").await;

        assert!(matches!(result, Err(ClientError::RetriesExhausted(3))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_http_errors_fail_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/linkedin/company",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    AxumStatus::INTERNAL_SERVER_ERROR
                }
            }),
        );
        let client = ProxycurlClient::new(fast_settings(serve(app).await)).unwrap();

        let result = client.fetch_company_profile("https://example.com").await;

        assert!(matches!(result, Err(ClientError::Http(s)) if s.as_u16() == 500));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_retried_when_enabled() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/linkedin/company/profile-picture",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(AxumStatus::BAD_GATEWAY)
                    } else {
                        Ok(Json(json!({ "tmp_profile_pic_url": "https://cdn.example.com/a.png" })))
                    }
                }
            }),
        );
        let mut settings = fast_settings(serve(app).await);
        settings.retry.retry_server_errors = true;
        let client = ProxycurlClient::new(settings).unwrap();

        let url = client
            .fetch_profile_picture_url("https://www.linkedin.com/company/canva")
            .await
            .unwrap();

        assert_eq!(url.as_deref(), Some("https://cdn.example.com/a.png"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_default_settings() {
        let settings = ClientSettings::company_data("key");
        assert_eq!(settings.requests_per_period, 2);
        assert_eq!(settings.retry.max_retries, 3);
        assert!(!settings.retry.retry_server_errors);

        let settings = ClientSettings::profile_pictures("key");
        assert_eq!(settings.requests_per_period, 5);
        assert!(settings.retry.retry_server_errors);
    }
}
