use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rate_limit::{client_identifier, RateLimitOutcome, RateLimiter};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Runs the rate limiter for the caller. `Err` is the finished response to
/// return as is: a 429, or a 500 if the store failed. Both carry the
/// rate-limit headers.
pub async fn admit(
    limiter: &RateLimiter,
    headers: &HeaderMap,
) -> Result<RateLimitOutcome, Response> {
    let identifier = client_identifier(headers);
    let outcome = match limiter.check(&identifier).await {
        Ok(outcome) => outcome,
        Err(err) => {
            // Nothing was counted, so report an exhausted window ending now.
            let unknown = RateLimitOutcome {
                success: false,
                limit: limiter.limit(),
                remaining: 0,
                reset: limiter.now(),
            };
            return Err(with_headers(err.into_response(), &unknown));
        }
    };

    if outcome.success {
        return Ok(outcome);
    }

    let retry_after = outcome.retry_after_secs(limiter.now());
    tracing::debug!(client = %identifier, retry_after, "Rate limit exceeded");

    let mut response = (
        ApiError::RateLimited.status(),
        Json(json!({ "error": "Too many requests", "retryAfter": retry_after })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    Err(with_headers(response, &outcome))
}

pub fn with_headers(mut response: Response, outcome: &RateLimitOutcome) -> Response {
    apply_headers(response.headers_mut(), outcome);
    response
}

pub fn apply_headers(headers: &mut HeaderMap, outcome: &RateLimitOutcome) {
    headers.insert(HeaderName::from_static(LIMIT_HEADER), HeaderValue::from(outcome.limit));
    headers.insert(
        HeaderName::from_static(REMAINING_HEADER),
        HeaderValue::from(outcome.remaining),
    );
    headers.insert(
        HeaderName::from_static(RESET_HEADER),
        HeaderValue::from(outcome.reset.timestamp_millis()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::RateLimitSettings;
    use crate::rate_limit::{RateLimitStore, SystemClock, WindowHit};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Arc;

    struct UnreachableStore;

    #[async_trait]
    impl RateLimitStore for UnreachableStore {
        async fn hit(
            &self,
            _key: &str,
            _now: DateTime<Utc>,
            _window: Duration,
            _limit: u32,
        ) -> Result<WindowHit, ApiError> {
            Err(ApiError::internal("store unreachable"))
        }

        async fn sweep(&self, _now: DateTime<Utc>) -> Result<usize, ApiError> {
            Err(ApiError::internal("store unreachable"))
        }
    }

    #[tokio::test]
    async fn store_failure_still_reports_limit_headers() {
        let limiter = RateLimiter::new(
            &RateLimitSettings::default(),
            Arc::new(UnreachableStore),
            Arc::new(SystemClock),
        );

        let response = admit(&limiter, &HeaderMap::new())
            .await
            .expect_err("store failure");
        limiter.shutdown().await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let headers = response.headers();
        assert_eq!(headers[LIMIT_HEADER], "20");
        assert_eq!(headers[REMAINING_HEADER], "0");
        assert!(headers.contains_key(RESET_HEADER));
    }

    #[test]
    fn headers_carry_epoch_millis() {
        let outcome = RateLimitOutcome {
            success: true,
            limit: 20,
            remaining: 7,
            reset: DateTime::from_timestamp_millis(1_700_000_060_000).expect("valid timestamp"),
        };
        let response = with_headers(StatusCode::OK.into_response(), &outcome);

        let headers = response.headers();
        assert_eq!(headers[LIMIT_HEADER], "20");
        assert_eq!(headers[REMAINING_HEADER], "7");
        assert_eq!(headers[RESET_HEADER], "1700000060000");
    }
}
