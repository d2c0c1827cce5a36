//! HTTP plumbing shared by the vendor adapters

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;

use crate::error::{DispatchError, DispatchResult, VendorError};

/// One pooled client per adapter
pub fn build_client(request_timeout: Duration) -> DispatchResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .build()
        .map_err(|e| DispatchError::Config {
            message: format!("Failed to build HTTP client: {e}"),
        })
}

/// Missing credentials fail as authentication errors before any I/O
pub fn require_key<'a>(api_key: Option<&'a str>, vendor: &str) -> Result<&'a str, VendorError> {
    api_key.ok_or_else(|| VendorError::Auth {
        status: 401,
        message: format!("No API key configured for {vendor}"),
    })
}

/// `Retry-After` in delta-seconds form
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// POST a JSON body with bearer auth and return the decoded JSON response
pub async fn post_json(client: &reqwest::Client, url: &str, api_key: &str, body: &Value) -> Result<Value, VendorError> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .header("Accept", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| VendorError::from_transport(&e))?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        return Err(VendorError::from_status(status.as_u16(), retry_after, &text));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| VendorError::protocol(format!("Failed to parse response: {e}")))
}

/// Read an unsigned counter, treating absent fields as zero
pub fn count(value: Option<&Value>, field: &str) -> u64 {
    value.and_then(|v| v.get(field)).and_then(|v| v.as_u64()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_missing_key_is_auth_error() {
        assert!(matches!(require_key(None, "openai"), Err(VendorError::Auth { status: 401, .. })));
        assert_eq!(require_key(Some("k"), "openai").unwrap(), "k");
    }

    #[test]
    fn test_count_defaults_to_zero() {
        let usage = serde_json::json!({"prompt_tokens": 4});
        assert_eq!(count(Some(&usage), "prompt_tokens"), 4);
        assert_eq!(count(Some(&usage), "completion_tokens"), 0);
        assert_eq!(count(None, "prompt_tokens"), 0);
    }
}
