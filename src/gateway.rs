/*!
 * Gateway service: picks the adapter for a request and runs it.
 *
 * Shared by the HTTP layer and the one-shot CLI commands.
 */

use log::{debug, info};
use serde_json::Value;

use crate::app_config::Config;
use crate::errors::AppError;
use crate::models::{DownloadRequest, DownloadResult, SearchRequest, SearchResult};
use crate::providers::{ProviderKind, ProviderRegistry, infer_download_provider};

/// Provider used when a search names none
pub const DEFAULT_PROVIDER: ProviderKind = ProviderKind::OpenSubtitles;

/// Entry point for search and download requests
#[derive(Debug, Clone)]
pub struct Gateway {
    registry: ProviderRegistry,
}

impl Gateway {
    /// Create a gateway over an existing registry
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Create a gateway and its registry from the configuration
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let registry = ProviderRegistry::new(config.providers.clone(), config.timeout(), &config.user_agent)?;
        Ok(Self::new(registry))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Search one provider
    pub async fn search(
        &self,
        provider: Option<ProviderKind>,
        api_key: Option<&str>,
        request: &SearchRequest,
    ) -> Result<SearchResult, AppError> {
        let provider = provider.unwrap_or(DEFAULT_PROVIDER);
        let adapter = self.registry.create(provider, api_key)?;

        info!(
            "Searching {} (languages: {}, type: {})",
            provider,
            request.languages,
            request.media_type.map(|t| t.to_string()).unwrap_or_else(|| "any".to_string())
        );
        let result = adapter.search(request).await?;
        debug!("{} returned {} subtitle(s)", provider, result.data.len());

        Ok(result)
    }

    /// Resolve a download, inferring the provider from the request when none is given
    pub async fn download(
        &self,
        provider: Option<ProviderKind>,
        api_key: Option<&str>,
        request: &DownloadRequest,
    ) -> Result<DownloadResult, AppError> {
        let provider = match provider {
            Some(provider) => provider,
            None => {
                let inferred = infer_download_provider(request);
                debug!("Inferred download provider {}", inferred);
                inferred
            }
        };

        let adapter = self.registry.create(provider, api_key)?;
        info!("Downloading from {}", provider);
        Ok(adapter.download(request).await?)
    }

    /// Languages served by one provider
    pub async fn languages(&self, provider: Option<ProviderKind>, api_key: Option<&str>) -> Result<Value, AppError> {
        let provider = provider.unwrap_or(DEFAULT_PROVIDER);
        let adapter = self.registry.create(provider, api_key)?;
        debug!("Listing {} languages", provider);
        Ok(adapter.languages().await?)
    }

    /// Subtitle formats served by one provider
    pub async fn formats(&self, provider: Option<ProviderKind>, api_key: Option<&str>) -> Result<Value, AppError> {
        let provider = provider.unwrap_or(DEFAULT_PROVIDER);
        let adapter = self.registry.create(provider, api_key)?;
        debug!("Listing {} formats", provider);
        Ok(adapter.formats().await?)
    }
}
