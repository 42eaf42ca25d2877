//! Shared HTTP plumbing for the remote data sources

use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, error, warn};

use crate::{MorningBotError, Result};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("MorningBot/", env!("CARGO_PKG_VERSION"));

/// Build a client with the configured request timeout
pub fn build_client(timeout_seconds: u32) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.into()))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| MorningBotError::config(format!("Failed to create HTTP client: {e}")))
}

/// Turn a non-success response into the matching error kind.
///
/// `service` names the remote side in the error message.
pub async fn check_status(response: Response, service: &str, started: Instant) -> Result<Response> {
    let status = response.status();
    let elapsed = started.elapsed();
    debug!(
        "{service} responded {status} in {:.3}s",
        elapsed.as_secs_f64()
    );
    if elapsed.as_secs() > 5 {
        warn!("Slow {service} response: {:.3}s", elapsed.as_secs_f64());
    }

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = if body.is_empty() {
        status.canonical_reason().unwrap_or("Unknown error").to_string()
    } else {
        body
    };

    error!("{service} request failed with {status}");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            MorningBotError::auth(format!("{service} rejected the credentials ({status}): {detail}"))
        }
        StatusCode::NOT_FOUND => {
            MorningBotError::not_found(format!("{service} resource ({status}): {detail}"))
        }
        _ => MorningBotError::api(format!("{service} request failed with status {status}: {detail}")),
    })
}

/// Replace every occurrence of `secret` in `text` for logging
#[must_use]
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, "***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_secret() {
        assert_eq!(
            redact("https://x/forecast?id=1&appid=abc123", "abc123"),
            "https://x/forecast?id=1&appid=***"
        );
    }

    #[test]
    fn test_redact_empty_secret_is_noop() {
        assert_eq!(redact("plain", ""), "plain");
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(30).is_ok());
    }
}
