use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use crate::errors::ProviderError;
use crate::models::{DownloadRequest, DownloadResult, SearchRequest, SearchResult};
use crate::normalize::{SubtitleDraft, collect_subtitles};
use crate::providers::{ProviderKind, SubtitleProvider, format_listing, language_listing};
use crate::transport;

/// Public SubSource API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.subsource.net/api";

/// SubSource language names that do not lowercase into a usable code
const LANGUAGE_MAP: &[(&str, &str)] = &[
    ("Big 5 code", "zh"),
    ("Brazilian Portuguese", "pt-BR"),
    ("Bulgarian", "bg"),
    ("Chinese BG code", "zh"),
    ("Farsi/Persian", "fa"),
    ("Chinese(Simplified)", "zh-Hans"),
    ("Chinese(Traditional)", "zh-Hant"),
    ("French(France)", "fr-FR"),
    ("Icelandic", "is"),
    ("Spanish(Latin America)", "es-419"),
    ("Spanish(Spain)", "es-ES"),
];

/// Map a SubSource language name to a code, lowercasing unknown names
pub fn map_language(name: &str) -> String {
    LANGUAGE_MAP
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, code)| code.to_string())
        .unwrap_or_else(|| name.to_lowercase())
}

/// Movie, language and id of a SubSource subtitle page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleLocation {
    pub movie: String,
    pub lang: String,
    pub id: String,
}

impl SubtitleLocation {
    /// Parse `movie/lang/id` or `subtitle/movie/lang/id`, relative or absolute
    pub fn parse(location: &str) -> Result<Self, ProviderError> {
        let path = match Url::parse(location) {
            Ok(url) => url.path().to_string(),
            Err(_) => location.split(['?', '#']).next().unwrap_or_default().to_string(),
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let parts = match segments.as_slice() {
            [movie, lang, id] | ["subtitle", movie, lang, id] => [*movie, *lang, *id],
            _ => {
                return Err(ProviderError::Validation(format!(
                    "Invalid SubSource subtitle URL: {}",
                    location
                )));
            }
        };

        let [movie, lang, id] = parts.map(str::to_string);
        Ok(Self { movie, lang, id })
    }
}

/// SubSource client
///
/// Search is two strictly sequential calls (`searchMovie` then `getMovie`),
/// download one more (`getSub`) to obtain a download token.
#[derive(Debug, Clone)]
pub struct SubSource {
    client: Client,
    endpoint: String,
}

impl SubSource {
    /// Create a new SubSource client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Use another API base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    async fn call(&self, action: &str, body: &Value) -> Result<Value, ProviderError> {
        let url = format!("{}/{}", self.endpoint, action);
        debug!("SubSource {} request", action);

        let request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(body);

        let response = transport::send(self.kind(), request).await?;
        let response = transport::ensure_success(self.kind(), response).await?;
        transport::read_json(self.kind(), response).await
    }

    fn search_term(request: &SearchRequest) -> Option<String> {
        [request.imdb_id.as_deref(), request.query.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|term| !term.is_empty())
            .map(str::to_string)
    }
}

fn text(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn number(item: &Value, key: &str) -> f64 {
    match item.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    }
}

fn extract_sub(item: Value) -> Option<SubtitleDraft> {
    let id = text(&item, "subId");
    let language = map_language(&text(&item, "lang"));
    let release = text(&item, "releaseName");
    let hearing_impaired = match item.get("hi") {
        Some(Value::Bool(b)) => *b,
        _ => number(&item, "hi") != 0.0,
    };

    Some(
        SubtitleDraft::new(id, language)
            .release(release.clone())
            .hearing_impaired(hearing_impaired)
            .ratings(number(&item, "rating"))
            .url(text(&item, "fullLink"))
            .file(0, release),
    )
}

/// Fold a `getMovie` response into a search result
pub fn parse_movie_response(body: Value) -> SearchResult {
    match body.get("subs") {
        Some(Value::Array(subs)) => {
            SearchResult::single_page(collect_subtitles(ProviderKind::SubSource, subs.clone(), extract_sub))
        }
        _ => SearchResult::empty(),
    }
}

#[async_trait]
impl SubtitleProvider for SubSource {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SubSource
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResult, ProviderError> {
        let Some(term) = Self::search_term(request) else {
            debug!("SubSource search without imdb_id or query, nothing to look up");
            return Ok(SearchResult::empty());
        };

        let found = self.call("searchMovie", &json!({ "query": term })).await?;
        let link_name = found
            .get("found")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .map(|first| text(first, "linkName"))
            .filter(|name| !name.is_empty());

        let Some(movie_name) = link_name else {
            debug!("SubSource found nothing for '{}'", term);
            return Ok(SearchResult::empty());
        };

        let mut body = json!({
            "movieName": movie_name,
            "langs": request.language_list(),
        });
        if let Some(season) = request.season_number {
            body["season"] = Value::String(format!("season-{}", season));
        }

        let movie = self.call("getMovie", &body).await?;
        Ok(parse_movie_response(movie))
    }

    async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult, ProviderError> {
        let location = request
            .location()
            .ok_or_else(|| ProviderError::Validation("URL is required for SubSource downloads".to_string()))?;
        let location = SubtitleLocation::parse(location)?;

        let sub = self.call("getSub", &json!(location)).await?;
        let token = sub
            .get("sub")
            .map(|sub| text(sub, "downloadToken"))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                error!("SubSource getSub returned no download token for {}", location.id);
                ProviderError::upstream(500, "SubSource did not return a download token")
            })?;

        Ok(DownloadResult::link_only(
            format!("{}/downloadSub/{}", self.endpoint, token),
            format!("{}_{}.srt", location.movie, location.lang),
        ))
    }

    async fn languages(&self) -> Result<Value, ProviderError> {
        Ok(language_listing(LANGUAGE_MAP.iter().map(|(_, code)| *code)))
    }

    async fn formats(&self) -> Result<Value, ProviderError> {
        Ok(format_listing(&["srt"]))
    }
}
