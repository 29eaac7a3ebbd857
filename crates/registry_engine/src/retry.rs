use std::time::Duration;

use registry_core::{extract_list, EntityKind};
use registry_logging::{registry_debug, registry_warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::decode::safe_parse_json;
use crate::fetch::{fetch_with_timeout, Transport};
use crate::{FailureKind, FetchError, HttpRequest, HttpResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts_per_url: u32,
    /// Delay after the first failed attempt; doubles after each further one.
    pub base_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts_per_url: 3,
            base_delay: Duration::from_millis(200),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff after failed attempt `attempt` (0-based): `base_delay * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    pub fn single_attempt(&self) -> Self {
        Self {
            max_attempts_per_url: 1,
            ..self.clone()
        }
    }
}

/// One candidate URL that never produced a usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub url: Url,
    pub attempts: u32,
    pub last_error: FetchError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListFetch {
    /// Raw records; empty when the winning response had none or nothing won.
    pub list: Vec<Value>,
    pub response: Option<HttpResponse>,
    pub winning_url: Option<Url>,
    pub failures: Vec<CandidateFailure>,
}

impl ListFetch {
    /// True when every candidate failed.
    pub fn is_exhausted(&self) -> bool {
        self.response.is_none()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.failures.last().map(|failure| &failure.last_error)
    }
}

/// Probes `candidates` in order until one yields a list.
///
/// Each candidate gets `policy.max_attempts_per_url` attempts with
/// exponential backoff between them. The first 2xx response wins, even when
/// its list is empty, and later candidates are not tried. When every
/// candidate fails the result is an empty, exhausted [`ListFetch`]. The only
/// error returned is [`FailureKind::Cancelled`].
pub async fn fetch_list_with_fallback(
    transport: &dyn Transport,
    candidates: &[Url],
    template: &HttpRequest,
    kind: EntityKind,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<ListFetch, FetchError> {
    let max_attempts = policy.max_attempts_per_url.max(1);
    let mut failures = Vec::new();

    for url in candidates {
        let request = template.with_url(url.clone());
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if cancel.is_cancelled() {
                return Err(FetchError::cancelled());
            }

            match attempt_once(transport, &request, kind, policy, cancel).await {
                Ok((list, response)) => {
                    registry_debug!(
                        "{} answered on attempt {} with {} records",
                        url,
                        attempt + 1,
                        list.len()
                    );
                    return Ok(ListFetch {
                        list,
                        response: Some(response),
                        winning_url: Some(url.clone()),
                        failures,
                    });
                }
                Err(err) if err.is_cancelled() => {
                    registry_debug!("list fetch cancelled at {}", url);
                    return Err(err);
                }
                Err(err) => {
                    registry_debug!("attempt {} for {} failed: {}", attempt + 1, url, err);
                    last_error = Some(err);
                }
            }

            if attempt + 1 < max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(FetchError::cancelled()),
                    _ = tokio::time::sleep(policy.delay_for(attempt)) => {}
                }
            }
        }

        let last_error = last_error
            .unwrap_or_else(|| FetchError::new(FailureKind::Network, "no attempt was made"));
        registry_warn!("Failed to fetch from {}: {}", url, last_error);
        failures.push(CandidateFailure {
            url: url.clone(),
            attempts: max_attempts,
            last_error,
        });
    }

    Ok(ListFetch {
        list: Vec::new(),
        response: None,
        winning_url: None,
        failures,
    })
}

async fn attempt_once(
    transport: &dyn Transport,
    request: &HttpRequest,
    kind: EntityKind,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<(Vec<Value>, HttpResponse), FetchError> {
    let response = fetch_with_timeout(transport, request, policy.request_timeout, cancel).await?;
    if cancel.is_cancelled() {
        return Err(FetchError::cancelled());
    }
    if !response.is_success() {
        return Err(FetchError::new(
            FailureKind::HttpStatus(response.status),
            format!("{} returned {}", response.url, response.status),
        ));
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok((Vec::new(), response));
    }
    match safe_parse_json(&response.body, response.content_type()) {
        Some(payload) => Ok((extract_list(&payload, kind), response)),
        None => Err(FetchError::new(
            FailureKind::Undecodable,
            format!("{} returned a body that is not JSON", response.url),
        )),
    }
}
