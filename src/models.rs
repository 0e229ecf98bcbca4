/*!
 * Canonical schema shared by every provider adapter.
 *
 * Every upstream response is folded into these types. All attribute fields
 * except `subtitle_id` and `language` have defaults, and a `null` coming from
 * an upstream is treated the same as a missing field.
 */

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Value of `Subtitle::kind`, serialized as `type`
pub const SUBTITLE_TYPE: &str = "subtitle";

/// Deserialize a possibly-null field into its default value
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_subtitle_type() -> String {
    SUBTITLE_TYPE.to_string()
}

fn default_cd_number() -> u32 {
    1
}

fn default_page() -> u64 {
    1
}

fn default_languages() -> String {
    "en".to_string()
}

/// Uploader of a subtitle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Uploader {
    #[serde(default)]
    pub uploader_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub rank: String,
}

/// Movie or episode a subtitle belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureDetails {
    #[serde(default, deserialize_with = "nullable")]
    pub feature_id: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub feature_type: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub movie_name: String,
    #[serde(default)]
    pub imdb_id: Option<i64>,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
}

/// One downloadable file of a subtitle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleFile {
    #[serde(default, deserialize_with = "nullable")]
    pub file_id: i64,
    #[serde(default = "default_cd_number")]
    pub cd_number: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub file_name: String,
}

impl SubtitleFile {
    /// Create a single-CD file entry
    pub fn new(file_id: i64, file_name: impl Into<String>) -> Self {
        Self {
            file_id,
            cd_number: default_cd_number(),
            file_name: file_name.into(),
        }
    }
}

/// Attribute block of a canonical subtitle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtitleAttributes {
    pub subtitle_id: String,
    pub language: String,
    #[serde(default, deserialize_with = "nullable")]
    pub download_count: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub new_download_count: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub hearing_impaired: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub hd: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub fps: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub votes: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub points: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub ratings: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub from_trusted: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub foreign_parts_only: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub ai_translated: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub machine_translated: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub upload_date: String,
    #[serde(default, deserialize_with = "nullable")]
    pub release: String,
    #[serde(default, deserialize_with = "nullable")]
    pub comments: String,
    #[serde(default)]
    pub legacy_subtitle_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub provider: String,
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub uploader: Uploader,
    #[serde(default, deserialize_with = "nullable")]
    pub feature_details: FeatureDetails,
    #[serde(default, deserialize_with = "nullable")]
    pub files: Vec<SubtitleFile>,
}

/// Canonical subtitle record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    pub id: String,
    #[serde(rename = "type", default = "default_subtitle_type")]
    pub kind: String,
    pub attributes: SubtitleAttributes,
}

impl Subtitle {
    /// Wrap an attribute block into a subtitle record
    pub fn new(id: impl Into<String>, attributes: SubtitleAttributes) -> Self {
        Self {
            id: id.into(),
            kind: default_subtitle_type(),
            attributes,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub data: Vec<Subtitle>,
    #[serde(default, deserialize_with = "nullable")]
    pub total_count: u64,
    #[serde(default = "default_page")]
    pub total_pages: u64,
    #[serde(default = "default_page")]
    pub page: u64,
}

impl SearchResult {
    /// Result returned when a provider has nothing for the request
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            total_count: 0,
            total_pages: 1,
            page: 1,
        }
    }

    /// Single-page result over the given subtitles
    pub fn single_page(data: Vec<Subtitle>) -> Self {
        Self {
            total_count: data.len() as u64,
            data,
            total_pages: 1,
            page: 1,
        }
    }
}

/// Download link plus the rate-limit telemetry reported by the upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    #[serde(default, deserialize_with = "nullable")]
    pub link: String,
    #[serde(default, deserialize_with = "nullable")]
    pub file_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub requests: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub remaining: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    #[serde(default, deserialize_with = "nullable")]
    pub reset_time: String,
    #[serde(default, deserialize_with = "nullable")]
    pub reset_time_utc: String,
    /// Subtitle body, for providers that only serve the file itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl DownloadResult {
    /// Result for providers that hand out a link without any telemetry
    pub fn link_only(link: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            file_name: file_name.into(),
            message: "Success".to_string(),
            ..Default::default()
        }
    }
}

/// Kind of media a search targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Episode,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Episode => write!(f, "episode"),
        }
    }
}

/// Inbound search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(rename = "type", default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub year: Option<u32>,
    /// Comma-separated language codes
    #[serde(default = "default_languages")]
    pub languages: String,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub parent_imdb_id: Option<String>,
    #[serde(default)]
    pub parent_tmdb_id: Option<u64>,
    #[serde(default)]
    pub moviehash: Option<String>,
    #[serde(default)]
    pub moviesize: Option<u64>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: None,
            imdb_id: None,
            tmdb_id: None,
            media_type: None,
            year: None,
            languages: default_languages(),
            season_number: None,
            episode_number: None,
            page: None,
            parent_imdb_id: None,
            parent_tmdb_id: None,
            moviehash: None,
            moviesize: None,
        }
    }
}

impl SearchRequest {
    /// Requested language codes, lowercased, in request order
    pub fn language_list(&self) -> Vec<String> {
        self.languages
            .split(',')
            .map(|code| code.trim().to_lowercase())
            .filter(|code| !code.is_empty())
            .collect()
    }

    /// Whether the request targets a TV episode
    pub fn is_episode(&self) -> bool {
        self.media_type == Some(MediaType::Episode)
    }

    /// IMDB id with the `tt` prefix, if one was given
    pub fn prefixed_imdb_id(&self) -> Option<String> {
        let id = self.imdb_id.as_deref()?.trim();
        if id.is_empty() {
            return None;
        }
        Some(if id.starts_with("tt") { id.to_string() } else { format!("tt{}", id) })
    }
}

/// Inbound download parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Numeric file id (OpenSubtitles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_format: Option<String>,
    /// Provider-relative or absolute subtitle location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_link: Option<String>,
}

impl DownloadRequest {
    /// First populated location, `full_link` before `url`
    pub fn location(&self) -> Option<&str> {
        [self.full_link.as_deref(), self.url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}
