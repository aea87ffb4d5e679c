//! HTTP client construction for provider adapters.
//!
//! LLM-bound traffic can be routed through an observability gateway. The
//! gateway is enabled by the presence of `providers.observability.api_key`;
//! when enabled, every request made by the returned client carries the
//! gateway's auth header.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::core::config::settings::{ObservabilitySettings, ProviderSettings};
use crate::core::errors::ApiError;

const OBSERVABILITY_AUTH_HEADER: &str = "helicone-auth";

/// Client for providers that never see the observability gateway.
pub fn build_plain_client(settings: &ProviderSettings) -> Result<Client, ApiError> {
    ClientDecorator::new(settings.request_timeout_secs).build()
}

/// Client for LLM and embedding calls, decorated with the gateway header
/// when an observability credential is configured.
pub fn build_observed_client(settings: &ProviderSettings) -> Result<Client, ApiError> {
    ClientDecorator::new(settings.request_timeout_secs)
        .with_observability(&settings.observability)
        .build()
}

/// Base URL for LLM-bound calls: the gateway when one is configured
/// alongside a credential, else the provider's own endpoint.
pub fn resolve_llm_base_url(
    provider_base_url: &str,
    observability: &ObservabilitySettings,
) -> String {
    match (&observability.api_key, &observability.base_url) {
        (Some(key), Some(gateway)) if !key.trim().is_empty() && !gateway.trim().is_empty() => {
            gateway.trim_end_matches('/').to_string()
        }
        _ => provider_base_url.trim_end_matches('/').to_string(),
    }
}

struct ClientDecorator {
    timeout: Duration,
    headers: HeaderMap,
}

impl ClientDecorator {
    fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            headers: HeaderMap::new(),
        }
    }

    fn with_observability(mut self, observability: &ObservabilitySettings) -> Self {
        let Some(key) = observability
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
        else {
            return self;
        };

        match HeaderValue::from_str(&format!("Bearer {}", key)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers
                    .insert(HeaderName::from_static(OBSERVABILITY_AUTH_HEADER), value);
                tracing::info!("LLM observability gateway enabled");
            }
            Err(err) => {
                tracing::warn!("Ignoring unusable observability credential: {}", err);
            }
        }
        self
    }

    fn build(self) -> Result<Client, ApiError> {
        Client::builder()
            .timeout(self.timeout)
            .default_headers(self.headers)
            .build()
            .map_err(ApiError::internal)
    }
}
