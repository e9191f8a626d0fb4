//! The HTTP request engine shared by both backend clients.
//!
//! Retry algorithm per attempt (1..=max_retries):
//! 1. transport failure: retry if attempts remain, else surface
//! 2. HTTP status >= 500 or 429: retry if attempts remain
//! 3. other 4xx: surface immediately
//! 4. 2xx: decode JSON; decode failures are retried
//! 5. body-level rate-limit markers: retry; the final attempt returns the
//!    payload as-is and lets envelope extraction surface the message
//!
//! Backoff between retries is linear: `backoff * attempt`.

use serde_json::Value;
use std::time::Duration;

use crate::error::ClientError;

/// Request engine tuning.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Hard per-attempt timeout.
    pub timeout: Duration,
    /// Total attempts; the first try is attempt 1.
    pub max_retries: u32,
    /// Base backoff; the sleep before attempt n+1 is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Blocking-free HTTP GET/POST with retry and in-body rate-limit detection.
///
/// `backend` labels parse failures ("Etherscan", "RPC").
#[derive(Debug, Clone)]
pub struct HttpEngine {
    http: reqwest::Client,
    config: RetryConfig,
    backend: &'static str,
}

impl HttpEngine {
    pub fn new(backend: &'static str, config: RetryConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");
        Self { http, config, backend }
    }

    /// GET `url` with query parameters, returning the decoded JSON payload.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Value, ClientError> {
        self.request_with_retry(|| self.http.get(url).query(params)).await
    }

    /// POST a JSON body to `url`, returning the decoded JSON payload.
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ClientError> {
        let body = body.clone();
        self.request_with_retry(move || self.http.post(url).json(&body)).await
    }

    async fn request_with_retry<F>(&self, build: F) -> Result<Value, ClientError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let max_retries = self.config.max_retries.max(1);
        let mut last_error: Option<ClientError> = None;

        for attempt in 1..=max_retries {
            let is_last = attempt == max_retries;

            let response = match build().send().await {
                Ok(response) => response,
                Err(err) => {
                    let error = ClientError::Transport(err.to_string());
                    if is_last {
                        return Err(error);
                    }
                    self.sleep(attempt, &error).await;
                    last_error = Some(error);
                    continue;
                }
            };

            let status = response.status().as_u16();
            if status >= 500 || status == 429 {
                let detail = response.text().await.unwrap_or_default();
                let error = ClientError::Status { status, detail };
                if is_last {
                    return Err(error);
                }
                self.sleep(attempt, &error).await;
                last_error = Some(error);
                continue;
            }
            if status >= 400 {
                let detail = response.text().await.unwrap_or_default();
                return Err(ClientError::Status { status, detail });
            }

            let payload = match response.json::<Value>().await {
                Ok(payload) => payload,
                Err(_) => {
                    let error = ClientError::Parse { backend: self.backend.into() };
                    if is_last {
                        return Err(error);
                    }
                    self.sleep(attempt, &error).await;
                    last_error = Some(error);
                    continue;
                }
            };

            if is_rate_limit_payload(&payload) && !is_last {
                let error = ClientError::Status { status: 429, detail: "in-body rate limit".into() };
                self.sleep(attempt, &error).await;
                last_error = Some(error);
                continue;
            }

            return Ok(payload);
        }

        Err(last_error.unwrap_or_else(|| ClientError::Transport("request failed".into())))
    }

    async fn sleep(&self, attempt: u32, error: &ClientError) {
        let delay = self.config.backoff * attempt;
        tracing::warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying request"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Detect a rate-limit message carried in a 200-OK body.
///
/// Checks `message`, `result`, `error.message`, and `error.data` for the
/// usual phrasings, case-insensitively.
pub fn is_rate_limit_payload(payload: &Value) -> bool {
    let Some(object) = payload.as_object() else {
        return false;
    };

    let mut haystack = String::new();
    for key in ["message", "result"] {
        if let Some(text) = object.get(key).and_then(Value::as_str) {
            haystack.push_str(text);
            haystack.push(' ');
        }
    }
    if let Some(error) = object.get("error").and_then(Value::as_object) {
        for key in ["message", "data"] {
            if let Some(text) = error.get(key).and_then(Value::as_str) {
                haystack.push_str(text);
                haystack.push(' ');
            }
        }
    }

    let haystack = haystack.to_ascii_lowercase();
    ["rate limit", "max calls per sec", "max calls per second", "too many requests"]
        .iter()
        .any(|marker| haystack.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rate_limit_in_result() {
        let payload = json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Max calls per sec rate limit reached (5/sec)"
        });
        assert!(is_rate_limit_payload(&payload));
    }

    #[test]
    fn rate_limit_in_error_object() {
        let payload = json!({"error": {"message": "Too Many Requests"}});
        assert!(is_rate_limit_payload(&payload));
    }

    #[test]
    fn plain_error_is_not_rate_limit() {
        let payload = json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"});
        assert!(!is_rate_limit_payload(&payload));
    }

    #[test]
    fn empty_result_is_not_rate_limit() {
        let payload = json!({"status": "0", "message": "No transactions found", "result": []});
        assert!(!is_rate_limit_payload(&payload));
    }

    #[test]
    fn non_object_payload() {
        assert!(!is_rate_limit_payload(&json!(["a", "b"])));
    }
}
