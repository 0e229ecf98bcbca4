use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::errors::ProviderError;
use crate::models::{DownloadRequest, DownloadResult, SearchRequest, SearchResult, SubtitleAttributes};
use crate::normalize::{SubtitleDraft, collect_subtitles};
use crate::providers::{ProviderKind, SubtitleProvider};
use crate::transport;

/// Public OpenSubtitles REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.opensubtitles.com/api/v1";

/// User agent OpenSubtitles expects from registered API consumers
const USER_AGENT: &str = "SubtitlesAPI v1.0";

/// OpenSubtitles client
///
/// The upstream already speaks the canonical schema, so records are decoded
/// one by one and only re-validated.
#[derive(Debug, Clone)]
pub struct OpenSubtitles {
    /// HTTP client shared with the registry
    client: Client,
    /// API key sent as `Api-Key`
    api_key: String,
    /// Base URL of the API
    endpoint: String,
}

/// Body of the `/download` call
#[derive(Debug, Serialize)]
struct DownloadBody<'a> {
    file_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub_format: Option<&'a str>,
}

impl OpenSubtitles {
    /// Create a new OpenSubtitles client
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Use another base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Query parameters for a search, unset fields omitted
    fn search_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let mut push = |name: &'static str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                params.push((name, value));
            }
        };

        push("query", request.query.clone());
        push("imdb_id", request.imdb_id.clone());
        push("tmdb_id", request.tmdb_id.map(|v| v.to_string()));
        push("type", request.media_type.map(|v| v.to_string()));
        push("year", request.year.map(|v| v.to_string()));
        push("languages", Some(request.language_list().join(",")));
        push("season_number", request.season_number.map(|v| v.to_string()));
        push("episode_number", request.episode_number.map(|v| v.to_string()));
        push("page", request.page.map(|v| v.to_string()));
        push("parent_imdb_id", request.parent_imdb_id.clone());
        push("parent_tmdb_id", request.parent_tmdb_id.map(|v| v.to_string()));
        push("moviehash", request.moviehash.clone());

        params
    }

    /// Fetch one of the `/infos/*` listings as-is
    async fn info(&self, name: &str) -> Result<Value, ProviderError> {
        let url = format!("{}/infos/{}", self.endpoint, name);
        let response = transport::send(self.kind(), self.authorized(self.client.get(url))).await?;
        let response = transport::ensure_success(self.kind(), response).await?;
        transport::read_json(self.kind(), response).await
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
    }
}

/// Convert one upstream record, `None` when it does not fit the schema
fn extract_record(record: Value) -> Option<SubtitleDraft> {
    let id = match record.get("id")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };

    let attributes = record.get("attributes")?.clone();
    match serde_json::from_value::<SubtitleAttributes>(attributes) {
        Ok(attributes) => Some(SubtitleDraft::from_attributes(id, attributes)),
        Err(e) => {
            warn!("Dropping OpenSubtitles record {}: {}", id, e);
            None
        }
    }
}

/// Fold a raw `/subtitles` response into a search result
pub fn parse_search_response(body: Value) -> SearchResult {
    let number = |name: &str, default: u64| body.get(name).and_then(Value::as_u64).unwrap_or(default);
    let total_count = number("total_count", 0);
    let total_pages = number("total_pages", 1);
    let page = number("page", 1);

    let records = match body.get("data") {
        Some(Value::Array(records)) => records.clone(),
        _ => Vec::new(),
    };

    let data = collect_subtitles(ProviderKind::OpenSubtitles, records, extract_record);
    SearchResult {
        total_count: total_count.max(data.len() as u64),
        data,
        total_pages,
        page,
    }
}

#[async_trait]
impl SubtitleProvider for OpenSubtitles {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenSubtitles
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResult, ProviderError> {
        let params = Self::search_params(request);
        debug!("OpenSubtitles search with {} parameter(s)", params.len());

        let url = format!("{}/subtitles", self.endpoint);
        let response = transport::send(self.kind(), self.authorized(self.client.get(url)).query(&params)).await?;
        let response = transport::ensure_success(self.kind(), response).await?;
        let body: Value = transport::read_json(self.kind(), response).await?;

        Ok(parse_search_response(body))
    }

    async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult, ProviderError> {
        let file_id = request
            .file_id
            .ok_or_else(|| ProviderError::Validation("file_id is required for OpenSubtitles downloads".to_string()))?;

        let body = DownloadBody {
            file_id,
            sub_format: request.sub_format.as_deref(),
        };

        let url = format!("{}/download", self.endpoint);
        let response = transport::send(self.kind(), self.authorized(self.client.post(url)).json(&body)).await?;
        let response = transport::ensure_success(self.kind(), response).await?;

        transport::read_json(self.kind(), response).await
    }

    async fn languages(&self) -> Result<Value, ProviderError> {
        self.info("languages").await
    }

    async fn formats(&self) -> Result<Value, ProviderError> {
        self.info("formats").await
    }
}
