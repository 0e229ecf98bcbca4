/*!
 * HTTP binding of the gateway.
 *
 * - `GET /subtitles/search`: search parameters and `provider` in the query string
 * - `POST /subtitles/download`: download request as JSON body, optional `provider` query
 * - `GET /subtitles/languages`, `GET /subtitles/formats`: provider listings, optional `provider` query
 * - `GET /health`
 *
 * Every failure is answered with `{"error": ..., "status_code": ...}`.
 */

use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::app_config::Config;
use crate::errors::{AppError, ProviderError};
use crate::gateway::Gateway;
use crate::models::{DownloadRequest, DownloadResult, SearchRequest, SearchResult};
use crate::providers::ProviderKind;

/// Header carrying the caller's upstream API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
}

/// `provider` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct ProviderParam {
    #[serde(default)]
    pub provider: Option<String>,
}

impl ProviderParam {
    fn kind(&self) -> Result<Option<ProviderKind>, AppError> {
        match self.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(name) => Ok(Some(name.parse()?)),
            None => Ok(None),
        }
    }
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let reset_time = match &self {
            AppError::Provider(ProviderError::RateLimited { reset_time, .. }) => reset_time.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.to_string(),
            status_code,
            reset_time,
        };
        (status, Json(body)).into_response()
    }
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

async fn search_subtitles(
    State(state): State<AppState>,
    headers: HeaderMap,
    provider: Result<Query<ProviderParam>, QueryRejection>,
    request: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<SearchResult>, AppError> {
    let Query(provider) = provider.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let Query(request) = request.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let result = state
        .gateway
        .search(provider.kind()?, api_key(&headers), &request)
        .await?;
    Ok(Json(result))
}

async fn download_subtitle(
    State(state): State<AppState>,
    headers: HeaderMap,
    provider: Result<Query<ProviderParam>, QueryRejection>,
    request: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResult>, AppError> {
    let Query(provider) = provider.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let Json(request) = request.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let result = state
        .gateway
        .download(provider.kind()?, api_key(&headers), &request)
        .await?;
    Ok(Json(result))
}

async fn list_languages(
    State(state): State<AppState>,
    headers: HeaderMap,
    provider: Result<Query<ProviderParam>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(provider) = provider.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let languages = state.gateway.languages(provider.kind()?, api_key(&headers)).await?;
    Ok(Json(languages))
}

async fn list_formats(
    State(state): State<AppState>,
    headers: HeaderMap,
    provider: Result<Query<ProviderParam>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(provider) = provider.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let formats = state.gateway.formats(provider.kind()?, api_key(&headers)).await?;
    Ok(Json(formats))
}

async fn health() -> &'static str {
    "OK"
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the gateway router
pub fn router(gateway: Gateway, cors_origins: &[String]) -> Router {
    let state = AppState {
        gateway: Arc::new(gateway),
    };

    Router::new()
        .route("/health", get(health))
        .route("/subtitles/search", get(search_subtitles))
        .route("/subtitles/download", post(download_subtitle))
        .route("/subtitles/languages", get(list_languages))
        .route("/subtitles/formats", get(list_formats))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Bind the configured address and serve until the process stops
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let gateway = Gateway::from_config(config)?;
    let app = router(gateway, &config.server.cors_origins);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Subtitle gateway listening on {}", address);

    axum::serve(listener, app).await.context("Server stopped unexpectedly")?;
    Ok(())
}
