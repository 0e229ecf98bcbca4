use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::errors::ProviderError;
use crate::language_utils::{LanguageMatch, language_code_from_name};
use crate::models::{DownloadRequest, DownloadResult, SearchRequest, SearchResult, Subtitle};
use crate::normalize::{SubtitleDraft, collect_subtitles};
use crate::providers::{ProviderKind, SubtitleProvider, format_listing, language_listing};
use crate::transport;

/// Public Addic7ed site
pub const DEFAULT_ENDPOINT: &str = "https://www.addic7ed.com";

const USER_AGENT: &str = "Mozilla/5.0";

/// Addic7ed language ids by ISO 639-1 code
const LANGUAGE_IDS: &[(&str, &str)] = &[
    ("en", "1"),
    ("es", "5"),
    ("it", "7"),
    ("fr", "8"),
    ("pt", "10"),
    ("de", "11"),
];

/// One table row of the season page: season, episode, language, version, HI flag, link
static ROW_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)<td>(\d+)</td>",
        r"<td>(\d+)</td>",
        r"<td>.*?</td>",
        r"<td>(.*?)</td>",
        r"<td.*?>(.*?)</td>",
        r"\s*?<td.*?>.*?</td>",
        r"<td.*?>(.*?)</td>",
        r"<td.*?>.*?</td>",
        r"<td.*?>.*?</td>",
        r#"<td.*?>.*?href="(.*?)".*?</td>"#,
    ))
    .unwrap()
});

/// Addic7ed language ids for the requested codes, English for unknown codes
pub fn language_ids(languages: &[String]) -> Vec<&'static str> {
    languages
        .iter()
        .map(|code| {
            LANGUAGE_IDS
                .iter()
                .find(|(known, _)| *known == code.to_lowercase())
                .map(|(_, id)| *id)
                .unwrap_or("1")
        })
        .collect()
}

/// A subtitle row scraped from the season page
#[derive(Debug, Clone, PartialEq)]
pub struct ShowRow {
    pub season: u32,
    pub episode: u32,
    pub language: String,
    pub version: String,
    pub hearing_impaired: bool,
    pub link: String,
}

/// Extract every subtitle row of a season page
pub fn parse_rows(html: &str) -> Vec<ShowRow> {
    ROW_PATTERN
        .captures_iter(html)
        .filter_map(|caps| {
            Some(ShowRow {
                season: caps[1].parse().ok()?,
                episode: caps[2].parse().ok()?,
                language: caps[3].trim().to_string(),
                version: caps[4].trim().to_string(),
                hearing_impaired: !caps[5].trim().is_empty(),
                link: caps[6].to_string(),
            })
        })
        .collect()
}

/// Addic7ed scraper
///
/// Only TV episodes are searchable.
#[derive(Debug, Clone)]
pub struct Addic7ed {
    client: Client,
    endpoint: String,
    language_match: LanguageMatch,
}

impl Addic7ed {
    /// Create a new Addic7ed client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            language_match: LanguageMatch::default(),
        }
    }

    /// Use another site root
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Change how row language names are matched against requested codes
    pub fn with_language_match(mut self, language_match: LanguageMatch) -> Self {
        self.language_match = language_match;
        self
    }

    fn absolute(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}", self.endpoint, link.trim_start_matches('/'))
        }
    }

    /// Canonical subtitles for one episode out of a season page
    pub fn parse_episode(&self, html: &str, season: u32, episode: u32, languages: &[String]) -> Vec<Subtitle> {
        let rows = parse_rows(html)
            .into_iter()
            .filter(|row| row.season == season && row.episode == episode)
            .filter(|row| self.language_match.matches(languages, &row.language));

        collect_subtitles(ProviderKind::Addic7ed, rows, |row| {
            let link = self.absolute(&row.link);
            let language = language_code_from_name(&row.language)
                .unwrap_or_else(|| row.language.chars().take(2).collect::<String>().to_lowercase());

            Some(
                SubtitleDraft::new(link.clone(), language)
                    .release(row.version)
                    .hearing_impaired(row.hearing_impaired)
                    .url(link),
            )
        })
    }
}

#[async_trait]
impl SubtitleProvider for Addic7ed {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Addic7ed
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResult, ProviderError> {
        let show = request.query.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let (Some(show), Some(season), Some(episode), true) =
            (show, request.season_number, request.episode_number, request.is_episode())
        else {
            debug!("Addic7ed only serves episode searches with show, season and episode");
            return Ok(SearchResult::empty());
        };

        let show = show.replace(' ', "_");
        let languages = request.language_list();
        let langs = format!("|{}|", language_ids(&languages).join("|"));
        let season_text = season.to_string();

        let request = self
            .client
            .get(format!("{}/ajax_loadShow.php", self.endpoint))
            .query(&[("show", show.as_str()), ("season", season_text.as_str()), ("langs", langs.as_str())])
            .header("Referer", format!("{}/serie/{}/{}/{}", self.endpoint, show, season, episode))
            .header("User-Agent", USER_AGENT);

        let response = transport::send(self.kind(), request).await?;
        if !response.status().is_success() {
            warn!("Addic7ed season page answered {}", response.status());
            return Ok(SearchResult::empty());
        }

        let html = transport::read_text(self.kind(), response).await?;
        Ok(SearchResult::single_page(self.parse_episode(&html, season, episode, &languages)))
    }

    async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult, ProviderError> {
        let location = request
            .location()
            .ok_or_else(|| ProviderError::Validation("URL is required for Addic7ed downloads".to_string()))?;
        let link = self.absolute(location);
        if Url::parse(&link).is_err() {
            return Err(ProviderError::Validation(format!("Invalid Addic7ed download URL '{}'", location)));
        }

        let request = self
            .client
            .get(&link)
            .header("Referer", self.endpoint.as_str())
            .header("User-Agent", USER_AGENT);
        let response = transport::send(self.kind(), request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::upstream(status.as_u16(), "Failed to download subtitle"));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::upstream(status.as_u16(), format!("Failed to read Addic7ed subtitle: {}", e)))?;

        let file_name = format!("subtitle_{}.srt", transport::last_segment(&link));
        let mut result = DownloadResult::link_only(link, file_name);
        result.content = Some(String::from_utf8_lossy(&bytes).into_owned());
        Ok(result)
    }

    async fn languages(&self) -> Result<Value, ProviderError> {
        Ok(language_listing(LANGUAGE_IDS.iter().map(|(code, _)| *code)))
    }

    async fn formats(&self) -> Result<Value, ProviderError> {
        Ok(format_listing(&["srt"]))
    }
}
