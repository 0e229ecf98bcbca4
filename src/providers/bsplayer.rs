/*!
 * BSPlayer SOAP adapter.
 *
 * Every search runs its own session: `logIn` returns a token, the token is
 * used for exactly one `searchSubtitles` call, then `logOut` is sent without
 * waiting for its outcome. The session travels as a value, so one adapter can
 * serve concurrent searches.
 */

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use log::{debug, error, warn};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use url::Url;

use crate::errors::ProviderError;
use crate::language_utils::{canonical_language_code, normalize_to_part2t};
use crate::models::{DownloadRequest, DownloadResult, SearchRequest, SearchResult};
use crate::normalize::{SubtitleDraft, collect_subtitles};
use crate::providers::{ProviderKind, SubtitleProvider, format_listing, language_listing};
use crate::transport;

/// Numbered API hosts, picked by the current second
const SUBDOMAINS: [u16; 17] = [1, 2, 3, 4, 5, 6, 7, 8, 101, 102, 103, 104, 105, 106, 107, 108, 109];

const USER_AGENT: &str = "BSPlayer/2.x (1022.12362)";
const APP_ID: &str = "BSPlayer v2.72";

/// Languages the BSPlayer catalogue carries, as ISO 639-1 codes
const LANGUAGES: [&str; 25] = [
    "ar", "bg", "cs", "da", "de", "el", "en", "es", "fi", "fr", "he", "hr", "hu", "it", "ja", "ko", "nl", "pl", "pt",
    "ro", "ru", "sr", "sv", "tr", "zh",
];

/// Result code of a successful SOAP call
const RESULT_OK: &str = "200";

/// How long a login token is trusted
const SESSION_TTL_MINUTES: i64 = 10;

/// A logged-in BSPlayer session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for a freshly issued token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: Utc::now() + Duration::minutes(SESSION_TTL_MINUTES),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// The `return` block of a SOAP response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvelopeReturn {
    /// `return/result`, or `return/result/result` for searches
    pub result: Option<String>,
    /// Text of `return/data`
    pub data: Option<String>,
    /// Children of every `return/data/item`, by element name
    pub items: Vec<HashMap<String, String>>,
}

impl EnvelopeReturn {
    pub fn is_ok(&self) -> bool {
        self.result.as_deref() == Some(RESULT_OK)
    }
}

/// Parse the `return` block out of a SOAP response body
pub fn parse_envelope(xml: &str) -> Result<EnvelopeReturn, quick_xml::Error> {
    let mut reader = Reader::from_str(xml.trim());
    reader.config_mut().trim_text(true);

    let mut parsed = EnvelopeReturn::default();
    let mut stack: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "item" && matches!(relative_path(&stack), Some([data]) if data == "data") {
                    parsed.items.push(HashMap::new());
                }
                stack.push(name);
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                assign_text(&mut parsed, &stack, text);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                assign_text(&mut parsed, &stack, text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(parsed)
}

/// Path below the innermost open `return` element
fn relative_path(stack: &[String]) -> Option<&[String]> {
    let position = stack.iter().rposition(|name| name == "return")?;
    Some(&stack[position + 1..])
}

fn assign_text(parsed: &mut EnvelopeReturn, stack: &[String], text: String) {
    let Some(path) = relative_path(stack) else {
        return;
    };

    match path {
        [result] if result == "result" => parsed.result = Some(text),
        [outer, inner] if outer == "result" && inner == "result" => parsed.result = Some(text),
        [data] if data == "data" => parsed.data = Some(text),
        [data, item, field] if data == "data" && item == "item" => {
            if let Some(current) = parsed.items.last_mut() {
                current.insert(field.clone(), text);
            }
        }
        _ => {}
    }
}

/// Build a SOAP envelope for `action` on the host at `url`
pub fn soap_envelope(url: &str, action: &str, params: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\" ",
            "xmlns:SOAP-ENC=\"http://schemas.xmlsoap.org/soap/encoding/\" ",
            "xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ",
            "xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" ",
            "xmlns:ns1=\"{url}\">",
            "<SOAP-ENV:Body SOAP-ENV:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">",
            "<ns1:{action}>{params}</ns1:{action}>",
            "</SOAP-ENV:Body>",
            "</SOAP-ENV:Envelope>"
        ),
        url = escape(url),
        action = action,
        params = params
    )
}

fn soap_request(client: &Client, url: &str, action: &str, params: &str) -> RequestBuilder {
    client
        .post(url)
        .header("User-Agent", USER_AGENT)
        .header("Content-Type", "text/xml; charset=utf-8")
        .header("Connection", "close")
        .header("SOAPAction", format!("\"{}#{}\"", url, action))
        .body(soap_envelope(url, action, params))
}

fn element(name: &str, value: &str) -> String {
    format!("<{name}>{}</{name}>", escape(value), name = name)
}

fn extract_item(item: HashMap<String, String>) -> Option<SubtitleDraft> {
    let field = |name: &str| item.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
    let release = field("subName");

    Some(
        SubtitleDraft::new(field("subID"), canonical_language_code(&field("subLang")))
            .release(release.clone())
            .download_count(field("subDownloadsCnt").parse().unwrap_or(0))
            .ratings(field("subRating").parse().unwrap_or(0.0))
            .url(field("subDownloadLink"))
            .file(0, release),
    )
}

/// BSPlayer client
#[derive(Debug, Clone)]
pub struct BsPlayer {
    client: Client,
    /// Fixed endpoint replacing the rotating host pool
    endpoint: Option<String>,
}

impl BsPlayer {
    /// Create a new BSPlayer client using the public host pool
    pub fn new(client: Client) -> Self {
        Self { client, endpoint: None }
    }

    /// Always talk to `endpoint` instead of rotating through the host pool
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Host for the next call
    fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                let subdomain = SUBDOMAINS[Utc::now().second() as usize % SUBDOMAINS.len()];
                format!("http://s{}.api.bsplayer-subtitles.com/v1.php", subdomain)
            }
        }
    }

    /// Open a session
    pub async fn login(&self) -> Result<Session, ProviderError> {
        let params = format!(
            "<username></username><password></password>{}",
            element("AppID", APP_ID)
        );
        let url = self.base_url();
        let response = transport::send(self.kind(), soap_request(&self.client, &url, "logIn", &params)).await?;

        if !response.status().is_success() {
            error!("BSPlayer login answered {}", response.status());
            return Err(ProviderError::Authentication(
                "Failed to authenticate with BSPlayer service".to_string(),
            ));
        }

        let body = transport::read_text(self.kind(), response).await?;
        let envelope = parse_envelope(&body).map_err(|e| {
            error!("Unreadable BSPlayer login response: {}", e);
            ProviderError::Authentication("Failed to authenticate with BSPlayer service".to_string())
        })?;

        match envelope.data.filter(|token| !token.is_empty()) {
            Some(token) if envelope.result.as_deref() == Some(RESULT_OK) => {
                debug!("BSPlayer session opened");
                Ok(Session::new(token))
            }
            _ => Err(ProviderError::Authentication(format!(
                "BSPlayer login rejected with result {}",
                envelope.result.as_deref().unwrap_or("none")
            ))),
        }
    }

    /// Run one search inside an open session
    pub async fn search_in_session(&self, session: &Session, request: &SearchRequest) -> Result<SearchResult, ProviderError> {
        if session.is_expired() {
            return Err(ProviderError::Authentication("BSPlayer session expired".to_string()));
        }

        let languages: Vec<String> = request
            .language_list()
            .iter()
            .map(|code| normalize_to_part2t(code).unwrap_or_else(|| code.clone()))
            .collect();
        let imdb_id = request
            .prefixed_imdb_id()
            .map(|id| id.trim_start_matches("tt").to_string())
            .unwrap_or_else(|| "0".to_string());
        let movie_hash = request
            .moviehash
            .clone()
            .filter(|hash| !hash.trim().is_empty())
            .unwrap_or_else(|| "0".to_string());
        let movie_size = request.moviesize.unwrap_or(0).to_string();

        let params = [
            element("handle", session.token()),
            element("movieHash", &movie_hash),
            element("movieSize", &movie_size),
            element("languageId", &languages.join(",")),
            element("imdbId", &imdb_id),
        ]
        .concat();

        let url = self.base_url();
        let response = transport::send(self.kind(), soap_request(&self.client, &url, "searchSubtitles", &params)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::upstream(status.as_u16(), "Failed to search subtitles"));
        }

        let body = transport::read_text(self.kind(), response).await?;
        Ok(parse_search_envelope(&body))
    }

    /// Close a session in the background; the outcome is only logged
    pub fn spawn_logout(&self, session: Session) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, skipping BSPlayer logout");
            return;
        };

        let client = self.client.clone();
        let url = self.base_url();
        handle.spawn(async move {
            let params = element("handle", session.token());
            match soap_request(&client, &url, "logOut", &params).send().await {
                Ok(response) => debug!("BSPlayer logout answered {}", response.status()),
                Err(e) => warn!("BSPlayer logout failed: {}", e),
            }
        });
    }
}

/// Fold a `searchSubtitles` response into a search result
///
/// An unreadable envelope or a non-200 result code yields an empty result.
pub fn parse_search_envelope(body: &str) -> SearchResult {
    let envelope = match parse_envelope(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Unreadable BSPlayer search response: {}", e);
            return SearchResult::empty();
        }
    };

    if !envelope.is_ok() {
        debug!("BSPlayer search result code {:?}", envelope.result);
        return SearchResult::empty();
    }

    SearchResult::single_page(collect_subtitles(ProviderKind::BsPlayer, envelope.items, extract_item))
}

#[async_trait]
impl SubtitleProvider for BsPlayer {
    fn kind(&self) -> ProviderKind {
        ProviderKind::BsPlayer
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResult, ProviderError> {
        let session = self.login().await?;
        let result = self.search_in_session(&session, request).await;
        self.spawn_logout(session);
        result
    }

    async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult, ProviderError> {
        let location = request
            .location()
            .ok_or_else(|| ProviderError::Validation("URL is required for BSPlayer downloads".to_string()))?;
        if Url::parse(location).is_err() {
            return Err(ProviderError::Validation(format!("Invalid BSPlayer download URL: {}", location)));
        }

        let response = transport::send(self.kind(), self.client.get(location).header("User-Agent", USER_AGENT)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::upstream(status.as_u16(), "Failed to download subtitle"));
        }

        Ok(DownloadResult::link_only(location, transport::last_segment(location)))
    }

    async fn languages(&self) -> Result<Value, ProviderError> {
        Ok(language_listing(LANGUAGES.iter().copied()))
    }

    async fn formats(&self) -> Result<Value, ProviderError> {
        Ok(format_listing(&["srt", "sub", "txt"]))
    }
}
