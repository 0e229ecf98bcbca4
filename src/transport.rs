/*!
 * HTTP plumbing shared by the provider adapters.
 *
 * Owns the conversion of `reqwest` failures and upstream status codes into
 * `ProviderError`, so no `reqwest::Error` ever leaves an adapter.
 */

use std::time::Duration;

use log::{debug, error};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{AppError, ProviderError};
use crate::providers::ProviderKind;

/// Build the pooled client shared by every adapter of a registry
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

fn transport_error(provider: ProviderKind, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Connectivity(format!("Request to {} timed out", provider))
    } else {
        ProviderError::Connectivity(format!("Error connecting to {}: {}", provider, e))
    }
}

/// Send a request, mapping transport failures to `Connectivity`
pub async fn send(provider: ProviderKind, request: RequestBuilder) -> Result<Response, ProviderError> {
    let response = request.send().await.map_err(|e| transport_error(provider, e))?;
    debug!("{} responded {} for {}", provider, response.status(), response.url().path());
    Ok(response)
}

/// Map 401, 429 and every other non-2xx status to the error taxonomy
pub async fn ensure_success(provider: ProviderKind, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!("{} API error ({}): {}", provider, status, body);

    Err(match status {
        StatusCode::UNAUTHORIZED => {
            ProviderError::Authentication(format!("Invalid or expired {} API key", provider))
        }
        StatusCode::TOO_MANY_REQUESTS => rate_limited(&body),
        _ => ProviderError::upstream(status.as_u16(), format!("{} API error: {}", provider, body)),
    })
}

fn rate_limited(body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|value| value.get(name))
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };

    ProviderError::RateLimited {
        message: field("message").unwrap_or_else(|| "Rate limit exceeded".to_string()),
        reset_time: field("reset_time_utc").or_else(|| field("reset_time")),
    }
}

/// Read the body as text
pub async fn read_text(provider: ProviderKind, response: Response) -> Result<String, ProviderError> {
    let status = response.status().as_u16();
    response
        .text()
        .await
        .map_err(|e| ProviderError::upstream(status, format!("Failed to read {} response: {}", provider, e)))
}

/// Read and decode a JSON body
pub async fn read_json<T: DeserializeOwned>(provider: ProviderKind, response: Response) -> Result<T, ProviderError> {
    let status = response.status().as_u16();
    let text = read_text(provider, response).await?;
    serde_json::from_str(&text).map_err(|e| {
        error!("Error decoding JSON response from {}: {}", provider, e);
        ProviderError::upstream(status, format!("Invalid response from {} API", provider))
    })
}

/// Last non-empty path segment of a URL or relative path
pub fn last_segment(location: &str) -> &str {
    location
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or_default()
}
