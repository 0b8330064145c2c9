//! Utility functions for common operations

use anyhow::Result;
use rand::Rng;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Download a file via HTTP
pub async fn http_get(client: &Client, url: &str) -> Result<bytes::Bytes> {
    debug!("Downloading from {}", url);

    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(anyhow::anyhow!("HTTP request failed: {}", status));
    }

    let bytes = response.bytes().await?;
    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}

/// Flatten a JSON object into ordered `(column, cell)` pairs.
///
/// Nested objects join their keys with `_`, arrays are kept as compact JSON
/// text and `null` becomes an empty cell. Anything that is not an object
/// flattens to nothing.
pub fn flatten_json(value: &Value) -> Vec<(String, Option<String>)> {
    let mut items = Vec::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut items);
    }
    items
}

fn flatten_into(
    map: &serde_json::Map<String, Value>,
    parent_key: &str,
    items: &mut Vec<(String, Option<String>)>,
) {
    for (key, value) in map {
        let new_key = if parent_key.is_empty() {
            key.clone()
        } else {
            format!("{}_{}", parent_key, key)
        };

        match value {
            Value::Object(nested) => flatten_into(nested, &new_key, items),
            Value::Array(_) => items.push((new_key, Some(value.to_string()))),
            Value::String(s) => items.push((new_key, Some(s.clone()))),
            Value::Null => items.push((new_key, None)),
            other => items.push((new_key, Some(other.to_string()))),
        }
    }
}

/// Enforces a minimum interval between consecutive requests
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// `requests` per `period`, e.g. 2 per minute is one request every 30s
    pub fn per_period(requests: u32, period: Duration) -> Self {
        Self::new(period / requests.max(1))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait if necessary to comply with the rate limit
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                info!(
                    "Waiting for {:.2} seconds to respect rate limit",
                    wait_time.as_secs_f64()
                );
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Retry behaviour for rate-limited API calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
    /// Also retry 5xx responses, not just 429
    pub retry_server_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(300),
            jitter: Duration::from_secs(1),
            retry_server_errors: false,
        }
    }
}

impl RetryPolicy {
    /// Capped exponential backoff: `min(base * 2^attempt + jitter, max)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        let jitter = self.jitter.mul_f64(rand::thread_rng().gen_range(0.0..1.0));
        let delay = self
            .base_delay
            .saturating_mul(factor)
            .saturating_add(jitter);

        delay.min(self.max_delay)
    }
}

/// File extension of the last path segment of an image URL, `.jpg` when absent
pub fn image_extension(url: &str) -> String {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let path = path
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or(""))
        .unwrap_or(path);
    let file_name = path.rsplit('/').next().unwrap_or_default();

    match file_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file_name.len() => file_name[idx..].to_string(),
        _ => ".jpg".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_objects() {
        let value = json!({
            "name": "Atlassian",
            "follower_count": 1200,
            "extra": { "number_of_funding_rounds": 5, "ipo": { "status": "Public" } },
            "hq": null,
        });

        let flat = flatten_json(&value);
        let get = |k: &str| flat.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());

        assert_eq!(get("name"), Some(Some("Atlassian".to_string())));
        assert_eq!(get("follower_count"), Some(Some("1200".to_string())));
        assert_eq!(get("extra_number_of_funding_rounds"), Some(Some("5".to_string())));
        assert_eq!(get("extra_ipo_status"), Some(Some("Public".to_string())));
        assert_eq!(get("hq"), Some(None));
    }

    #[test]
    fn test_flatten_keeps_lists_as_json() {
        let value = json!({
            "locations": [{ "country": "AU", "state": "NSW" }],
            "company_size": [51, 200],
        });

        let flat = flatten_json(&value);
        let get = |k: &str| flat.iter().find(|(key, _)| key == k).and_then(|(_, v)| v.clone());

        assert_eq!(flat.len(), 2);
        assert_eq!(
            get("locations").as_deref(),
            Some(r#"[{"country":"AU","state":"NSW"}]"#)
        );
        assert_eq!(get("company_size").as_deref(), Some("[51,200]"));
    }

    #[test]
    fn test_flatten_non_object() {
        assert!(flatten_json(&json!([1, 2, 3])).is_empty());
        assert!(flatten_json(&json!("text")).is_empty());
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy {
            jitter: Duration::ZERO,
            ..RetryPolicy::default()
        };

        assert_eq!(policy.backoff_delay(0), Duration::from_secs(60));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(120));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(240));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(300));
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..20 {
            let delay = policy.backoff_delay(0);
            assert!(delay >= Duration::from_secs(60));
            assert!(delay < Duration::from_secs(61));
        }
    }

    #[test]
    fn test_rate_limiter_interval() {
        let limiter = RateLimiter::per_period(2, Duration::from_secs(60));
        assert_eq!(limiter.min_interval(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(Duration::from_millis(200));
        let start = Instant::now();

        // First request never waits
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(100));

        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("https://cdn.example.com/logos/acme.png?x=1"), ".png");
        assert_eq!(image_extension("https://cdn.example.com/logos/acme"), ".jpg");
        assert_eq!(image_extension("https://cdn.example.com/"), ".jpg");
        assert_eq!(image_extension("https://cdn.example.com/a.b/pic.jpeg#frag"), ".jpeg");
    }
}
