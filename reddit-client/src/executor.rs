use crate::rate_limiter::{RateLimitConfig, RateLimitStatus, RateLimiter};
use crate::response::{check_response_errors, status_error};
use flairbot_core::{CoreError, RedditApiError};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// The one path every Reddit request takes: rate limiting, transport error
/// mapping, and embedded error payload checks.
#[derive(Debug)]
pub struct RequestExecutor {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    user_agent: String,
}

impl RequestExecutor {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
        Self::with_rate_limit(user_agent, timeout, RateLimitConfig::reddit_oauth())
    }

    pub fn with_rate_limit(
        user_agent: impl Into<String>,
        timeout: Duration,
        rate_config: RateLimitConfig,
    ) -> Result<Self, CoreError> {
        let user_agent = user_agent.into();
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(rate_config)),
            user_agent,
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Sends the request and fails on any non-success status.
    pub async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, CoreError> {
        let start_time = Instant::now();
        let permit = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} after {:?}",
            endpoint, permit.queue_wait_time
        );

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Request to {} timed out", endpoint);
                return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
            }
            Err(e) => {
                error!("Network error for {}: {}", endpoint, e);
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            error!("Request failed with status: {} for {}", status, endpoint);
            return Err(CoreError::RedditApi(status_error(endpoint, status, retry_after)));
        }

        debug!(
            "Request successful: {} {} in {:?}",
            status,
            endpoint,
            start_time.elapsed()
        );
        Ok(response)
    }

    /// Sends the request and returns its JSON body once it is known to carry no errors.
    pub async fn execute(&self, request: RequestBuilder, endpoint: &str) -> Result<Value, CoreError> {
        let response = self.send(request, endpoint).await?;

        let body: Value = response.json().await.map_err(|e| {
            error!("Failed to decode response from {}: {}", endpoint, e);
            if e.is_timeout() {
                CoreError::RedditApi(RedditApiError::RequestTimeout)
            } else {
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("'{}' returned a body that is not JSON", endpoint),
                })
            }
        })?;

        check_response_errors(endpoint, &body)?;
        Ok(body)
    }

    /// Bridges the `oauth2` crate's HTTP hook onto [`RequestExecutor::send`].
    pub async fn exchange(
        &self,
        request: oauth2::HttpRequest,
        endpoint: &str,
    ) -> Result<oauth2::HttpResponse, CoreError> {
        let builder = self
            .http_client
            .request(request.method, request.url.as_str())
            .headers(request.headers)
            .body(request.body);

        let response = self.send(builder, endpoint).await?;
        let status_code = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(oauth2::HttpResponse {
            status_code,
            headers,
            body,
        })
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.get_rate_limit_status().await
    }
}
