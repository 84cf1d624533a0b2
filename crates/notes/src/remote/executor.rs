//! Resilient request execution
//!
//! One request, three outcomes: a success response, a passthrough HTTP or
//! network failure, or [`ApiError::AuthFatal`]. Retryable failures are
//! retried with exponential backoff; a rejected token is refreshed once.

use log::{debug, info, warn};
use std::sync::Arc;

use super::auth::TokenProvider;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Sleeper};
use super::ApiError;
use crate::config::SyncTiming;

/// Executes requests with status-aware retry and credential refresh
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    timing: SyncTiming,
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        timing: SyncTiming,
    ) -> Self {
        Self {
            transport,
            sleeper,
            timing,
        }
    }

    pub fn timing(&self) -> SyncTiming {
        self.timing
    }

    /// Pause using the injected sleeper
    pub fn pause(&self, duration: std::time::Duration) {
        self.sleeper.sleep(duration);
    }

    /// Execute a request
    ///
    /// * 2xx: returned immediately.
    /// * 401/403: `tokens.refresh()` once, then a single retry with the new
    ///   bearer token. A second rejection or a failed refresh is AuthFatal.
    ///   Without a token provider the rejection is returned as-is.
    /// * 429, 5xx, network failure: up to `max_attempts` attempts with
    ///   `base * 2^attempt` backoff (429 honours `Retry-After`).
    /// * Any other status: returned immediately.
    pub fn execute(
        &self,
        request: &HttpRequest,
        tokens: Option<&dyn TokenProvider>,
    ) -> Result<HttpResponse, ApiError> {
        let mut attempt = 0;

        loop {
            let err = match self.send(request) {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if err.is_auth_rejection() {
                return match tokens {
                    Some(tokens) => self.retry_with_refreshed_token(request, tokens),
                    None => Err(err),
                };
            }

            if !err.is_retryable() || attempt + 1 >= self.timing.max_attempts {
                return Err(err);
            }

            let delay = self.timing.backoff(attempt, err.retry_after());
            warn!(
                "Request to {} failed (attempt {}/{}): {}; retrying in {}ms",
                request.url,
                attempt + 1,
                self.timing.max_attempts,
                err,
                delay.as_millis()
            );
            self.sleeper.sleep(delay);
            attempt += 1;
        }
    }

    /// Send once, mapping non-2xx statuses to [`ApiError::Http`]
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!("{:?} {}", request.method, request.url);
        let response = self.transport.send(request)?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Http {
                status: response.status,
                retry_after: response.retry_after,
                body: response.body,
            })
        }
    }

    fn retry_with_refreshed_token(
        &self,
        request: &HttpRequest,
        tokens: &dyn TokenProvider,
    ) -> Result<HttpResponse, ApiError> {
        info!("Access token rejected for {}; refreshing", request.url);

        let token = tokens.refresh().map_err(|e| {
            warn!("Token refresh failed: {}", e);
            ApiError::AuthFatal(format!("token refresh failed: {}", e))
        })?;

        match self.send(&request.with_bearer(&token)) {
            Err(err) if err.is_auth_rejection() => Err(ApiError::AuthFatal(format!(
                "token rejected again after refresh ({})",
                err
            ))),
            other => other,
        }
    }
}
