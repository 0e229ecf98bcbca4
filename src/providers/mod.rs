/*!
 * Provider adapters and the registry that selects them.
 *
 * This module contains one adapter per upstream subtitle service:
 * - OpenSubtitles: REST API, response already close to the canonical shape
 * - SubDL: REST API with a `status` envelope
 * - SubSource: multi-step REST protocol
 * - BSPlayer: SOAP protocol with a login/logout session
 * - Addic7ed: scraped HTML
 */

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::time::Duration;

use crate::app_config::ProvidersConfig;
use crate::errors::{AppError, ProviderError};
use crate::models::{DownloadRequest, DownloadResult, SearchRequest, SearchResult};
use crate::transport;

pub mod addic7ed;
pub mod bsplayer;
pub mod opensubtitles;
pub mod subdl;
pub mod subsource;

use addic7ed::Addic7ed;
use bsplayer::BsPlayer;
use opensubtitles::OpenSubtitles;
use subdl::SubDl;
use subsource::SubSource;

/// Common trait for all subtitle providers
///
/// Implementations only ever return the canonical schema and `ProviderError`.
#[async_trait]
pub trait SubtitleProvider: Send + Sync + Debug {
    /// Which provider this adapter talks to
    fn kind(&self) -> ProviderKind;

    /// Search subtitles
    async fn search(&self, request: &SearchRequest) -> Result<SearchResult, ProviderError>;

    /// Resolve a download link (and, for some providers, the file itself)
    async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult, ProviderError>;

    /// Languages the provider serves, in the provider's own listing shape
    async fn languages(&self) -> Result<Value, ProviderError>;

    /// Subtitle formats the provider serves
    async fn formats(&self) -> Result<Value, ProviderError>;
}

/// `{"languages": [...]}` listing out of a static code table, duplicates dropped
pub fn language_listing<'a>(codes: impl IntoIterator<Item = &'a str>) -> Value {
    let mut unique: Vec<&str> = Vec::new();
    for code in codes {
        if !unique.contains(&code) {
            unique.push(code);
        }
    }
    json!({ "languages": unique })
}

/// `{"formats": [...]}` listing
pub fn format_listing(formats: &[&str]) -> Value {
    json!({ "formats": formats })
}

/// Supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenSubtitles,
    SubDl,
    SubSource,
    BsPlayer,
    Addic7ed,
}

impl ProviderKind {
    /// Every provider, in registry order
    pub const ALL: [ProviderKind; 5] = [
        Self::OpenSubtitles,
        Self::SubDl,
        Self::SubSource,
        Self::BsPlayer,
        Self::Addic7ed,
    ];

    // @returns: Lowercase provider identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenSubtitles => "opensubtitles",
            Self::SubDl => "subdl",
            Self::SubSource => "subsource",
            Self::BsPlayer => "bsplayer",
            Self::Addic7ed => "addic7ed",
        }
    }

    /// Whether the upstream refuses calls without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenSubtitles | Self::SubDl)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| AppError::UnknownProvider(s.to_string()))
    }
}

/// Guess the provider of a download request from its shape
///
/// This is a heuristic over substrings of the location, checked in this order:
/// "subsource", "bsplayer", "addic7ed", then any other location is taken as a
/// SubDL path. Without a location the request is an OpenSubtitles `file_id`
/// download. A path that happens to contain another provider's name is
/// misattributed; pass the provider explicitly when that matters.
pub fn infer_download_provider(request: &DownloadRequest) -> ProviderKind {
    let Some(location) = request.location() else {
        return ProviderKind::OpenSubtitles;
    };

    let location = location.to_lowercase();
    [ProviderKind::SubSource, ProviderKind::BsPlayer, ProviderKind::Addic7ed]
        .into_iter()
        .find(|kind| location.contains(kind.as_str()))
        .unwrap_or(ProviderKind::SubDl)
}

/// Builds adapters on demand around one shared HTTP client
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    client: Client,
    settings: ProvidersConfig,
}

impl ProviderRegistry {
    /// Create a registry with a fresh pooled client
    pub fn new(settings: ProvidersConfig, timeout: Duration, user_agent: &str) -> Result<Self, AppError> {
        let client = transport::build_client(timeout, user_agent)?;
        Ok(Self::with_client(client, settings))
    }

    /// Create a registry around an existing client
    pub fn with_client(client: Client, settings: ProvidersConfig) -> Self {
        Self { client, settings }
    }

    /// Provider settings this registry was built with
    pub fn settings(&self) -> &ProvidersConfig {
        &self.settings
    }

    /// Create an adapter by provider name
    pub fn create_by_name(&self, name: &str, api_key: Option<&str>) -> Result<Box<dyn SubtitleProvider>, AppError> {
        self.create(name.parse()?, api_key)
    }

    /// Create an adapter, `api_key` overriding the configured key when given
    pub fn create(&self, kind: ProviderKind, api_key: Option<&str>) -> Result<Box<dyn SubtitleProvider>, AppError> {
        let settings = self.settings.get(kind);
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .unwrap_or(settings.api_key.as_str())
            .to_string();

        if kind.requires_api_key() && api_key.is_empty() {
            return Err(ProviderError::Authentication(format!(
                "X-API-Key header is required for {}",
                kind
            ))
            .into());
        }

        let client = self.client.clone();
        let endpoint = Some(settings.endpoint.as_str()).filter(|e| !e.is_empty());

        let adapter: Box<dyn SubtitleProvider> = match kind {
            ProviderKind::OpenSubtitles => {
                let mut adapter = OpenSubtitles::new(client, api_key);
                if let Some(endpoint) = endpoint {
                    adapter = adapter.with_endpoint(endpoint);
                }
                Box::new(adapter)
            }
            ProviderKind::SubDl => {
                let mut adapter = SubDl::new(client, api_key);
                if let Some(endpoint) = endpoint {
                    adapter = adapter.with_endpoint(endpoint);
                }
                if !settings.download_endpoint.is_empty() {
                    adapter = adapter.with_download_endpoint(&settings.download_endpoint);
                }
                Box::new(adapter)
            }
            ProviderKind::SubSource => {
                let mut adapter = SubSource::new(client);
                if let Some(endpoint) = endpoint {
                    adapter = adapter.with_endpoint(endpoint);
                }
                Box::new(adapter)
            }
            ProviderKind::BsPlayer => {
                let mut adapter = BsPlayer::new(client);
                if let Some(endpoint) = endpoint {
                    adapter = adapter.with_endpoint(endpoint);
                }
                Box::new(adapter)
            }
            ProviderKind::Addic7ed => {
                let mut adapter =
                    Addic7ed::new(client).with_language_match(self.settings.addic7ed_language_match);
                if let Some(endpoint) = endpoint {
                    adapter = adapter.with_endpoint(endpoint);
                }
                Box::new(adapter)
            }
        };

        Ok(adapter)
    }
}
