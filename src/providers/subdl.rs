use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::ProviderError;
use crate::language_utils::canonical_language_code;
use crate::models::{DownloadRequest, DownloadResult, FeatureDetails, SearchRequest, SearchResult};
use crate::normalize::{SubtitleDraft, collect_subtitles};
use crate::providers::{ProviderKind, SubtitleProvider};
use crate::transport;

/// Public SubDL REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.subdl.com/api/v1";

/// Host serving SubDL subtitle archives
pub const DEFAULT_DOWNLOAD_ENDPOINT: &str = "https://dl.subdl.com";

/// Subtitles requested per page
const SUBS_PER_PAGE: u32 = 30;

/// SubDL client
#[derive(Debug, Clone)]
pub struct SubDl {
    client: Client,
    api_key: String,
    endpoint: String,
    download_endpoint: String,
}

/// Envelope of every SubDL response
#[derive(Debug, Deserialize)]
struct SubDlResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    subtitles: Option<Vec<Value>>,
    #[serde(default, rename = "totalPages")]
    total_pages: Option<u64>,
    #[serde(default, rename = "currentPage")]
    current_page: Option<u64>,
}

/// One SubDL subtitle item, every field optional
#[derive(Debug, Deserialize, Default)]
struct SubDlItem {
    #[serde(default)]
    sd_id: Option<Value>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    hi: Option<bool>,
    #[serde(default)]
    release_name: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    season: Option<Value>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl SubDl {
    /// Create a new SubDL client
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            download_endpoint: DEFAULT_DOWNLOAD_ENDPOINT.to_string(),
        }
    }

    /// Use another API base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Use another download host
    pub fn with_download_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.download_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn search_params(&self, request: &SearchRequest) -> Vec<(&'static str, String)> {
        let is_tv = request.is_episode() || request.season_number.is_some();
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("type", if is_tv { "tv" } else { "movie" }.to_string()),
            ("languages", request.language_list().join(",")),
            ("subs_per_page", SUBS_PER_PAGE.to_string()),
        ];

        if let Some(imdb_id) = request.prefixed_imdb_id() {
            params.push(("imdb_id", imdb_id));
        }
        if let Some(tmdb_id) = request.tmdb_id {
            params.push(("tmdb_id", tmdb_id.to_string()));
        }
        if let Some(query) = request.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("film_name", query.to_string()));
        }
        if is_tv {
            if let Some(season) = request.season_number {
                params.push(("season_number", season.to_string()));
            }
            if let Some(episode) = request.episode_number {
                params.push(("episode_number", episode.to_string()));
            }
        }
        if let Some(page) = request.page {
            params.push(("page", page.to_string()));
        }

        params
    }
}

impl SubDl {
    /// Fetch a SubDL listing (`languages`, `formats`)
    async fn listing(&self, name: &str) -> Result<Value, ProviderError> {
        let request = self
            .client
            .get(format!("{}/{}", self.endpoint, name))
            .header("Accept", "application/json")
            .query(&[("api_key", self.api_key.as_str())]);

        let response = transport::send(self.kind(), request).await?;
        let status = response.status();
        let body = transport::read_text(self.kind(), response).await?;
        debug!("SubDL {} answered {}", name, status);

        parse_listing_body(&body).map_err(|e| match e {
            ProviderError::Upstream { message, .. } if !status.is_success() => {
                ProviderError::upstream(status.as_u16(), message)
            }
            other => other,
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn has_season(season: Option<&Value>) -> bool {
    match season {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) > 0,
        Some(Value::String(s)) => !s.trim().is_empty() && s.trim() != "0",
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

fn extract_item(raw: Value) -> Option<SubtitleDraft> {
    let item: SubDlItem = serde_json::from_value(raw).ok()?;
    let id = item.sd_id.as_ref().and_then(scalar_to_string)?;
    let language = canonical_language_code(item.language.as_deref().unwrap_or_default());
    let release = item.release_name.unwrap_or_default();

    let feature = FeatureDetails {
        feature_id: id.parse().unwrap_or_default(),
        feature_type: if has_season(item.season.as_ref()) { "tv" } else { "movie" }.to_string(),
        title: release.clone(),
        movie_name: release.clone(),
        ..Default::default()
    };

    let file_name = item
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| release.clone());
    let author = item
        .author
        .filter(|author| !author.trim().is_empty())
        .unwrap_or_else(|| "Anonymous".to_string());

    Some(
        SubtitleDraft::new(id, language)
            .release(release)
            .hearing_impaired(item.hi.unwrap_or(false))
            .url(item.url.unwrap_or_default())
            .uploader(author, "anonymous")
            .feature(feature)
            .file(0, file_name),
    )
}

/// Fold a raw SubDL search body into a search result
pub fn parse_search_body(body: &str) -> Result<SearchResult, ProviderError> {
    let response: SubDlResponse = serde_json::from_str(body).map_err(|e| {
        error!("Error decoding JSON response from SubDL: {}", e);
        ProviderError::upstream(500, "Invalid response from SubDL API")
    })?;

    if !response.status {
        let message = response
            .message
            .unwrap_or_else(|| "Unknown error from SubDL".to_string());
        error!("SubDL API error: {}", message);
        return Err(ProviderError::upstream(500, message));
    }

    let data = collect_subtitles(
        ProviderKind::SubDl,
        response.subtitles.unwrap_or_default(),
        extract_item,
    );

    Ok(SearchResult {
        total_count: data.len() as u64,
        data,
        total_pages: response.total_pages.unwrap_or(1),
        page: response.current_page.unwrap_or(1),
    })
}

/// Check the `status` envelope of a SubDL listing body and hand the body back
pub fn parse_listing_body(body: &str) -> Result<Value, ProviderError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        error!("Error decoding JSON response from SubDL: {}", e);
        ProviderError::upstream(500, "Invalid response from SubDL API")
    })?;

    if value.get("status").and_then(Value::as_bool) != Some(true) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error from SubDL")
            .to_string();
        error!("SubDL API error: {}", message);
        return Err(ProviderError::upstream(500, message));
    }

    Ok(value)
}

#[async_trait]
impl SubtitleProvider for SubDl {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SubDl
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResult, ProviderError> {
        let url = format!("{}/subtitles", self.endpoint);
        let request = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .query(&self.search_params(request));

        let response = transport::send(self.kind(), request).await?;
        let status = response.status();
        let body = transport::read_text(self.kind(), response).await?;
        debug!("SubDL search answered {} with {} bytes", status, body.len());

        parse_search_body(&body).map_err(|e| match e {
            ProviderError::Upstream { message, .. } if !status.is_success() => {
                ProviderError::upstream(status.as_u16(), message)
            }
            other => other,
        })
    }

    async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult, ProviderError> {
        let path = request
            .location()
            .ok_or_else(|| ProviderError::Validation("URL is required for SubDL downloads".to_string()))?;

        let link = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.download_endpoint, path.trim_start_matches('/'))
        };

        Ok(DownloadResult::link_only(link, transport::last_segment(path)))
    }

    async fn languages(&self) -> Result<Value, ProviderError> {
        self.listing("languages").await
    }

    async fn formats(&self) -> Result<Value, ProviderError> {
        self.listing("formats").await
    }
}
