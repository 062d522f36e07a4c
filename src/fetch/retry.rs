use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};
use url::Url;

/// How often and how patiently a GET is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before the `retry`-th retry (1-based); doubles every time.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Throttling and server-side errors are worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

enum Failure {
    Transient(anyhow::Error),
    Permanent(anyhow::Error),
}

async fn get_once(client: &Client, url: &Url) -> Result<Vec<u8>, Failure> {
    let resp = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Failure::Transient(anyhow::Error::new(e).context(format!("GET {}", url))))?;

    let status = resp.status();
    if !status.is_success() {
        let err = anyhow!("GET {} returned {}", url, status);
        return Err(if is_retryable_status(status) {
            Failure::Transient(err)
        } else {
            Failure::Permanent(err)
        });
    }

    resp.bytes().await.map(|b| b.to_vec()).map_err(|e| {
        Failure::Transient(anyhow::Error::new(e).context(format!("reading body from {}", url)))
    })
}

/// GET `url` and return the body, retrying transport errors, 429 and 5xx
/// with exponential backoff.
pub async fn get_bytes(client: &Client, url: &Url, policy: RetryPolicy) -> Result<Vec<u8>> {
    let mut retries = 0;
    loop {
        match get_once(client, url).await {
            Ok(body) => return Ok(body),
            Err(Failure::Transient(e)) if retries < policy.max_retries => {
                retries += 1;
                let delay = policy.backoff(retries);
                warn!(%url, attempt = retries, delay_ms = delay.as_millis() as u64, error = %e, "retrying");
                sleep(delay).await;
            }
            Err(Failure::Transient(e) | Failure::Permanent(e)) => {
                error!(%url, retries, error = %e, "giving up");
                return Err(e);
            }
        }
    }
}
