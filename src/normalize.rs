/*!
 * Shared normalization of upstream records into the canonical `Subtitle`.
 *
 * Adapters only describe what they could extract from one upstream item as a
 * `SubtitleDraft`; the defaulting rules and invariants live here, once:
 * - an item without an id or a language is dropped
 * - `subtitle_id` falls back to the id
 * - `provider` is stamped with the adapter name when the upstream left it empty
 * - file entries without a file name are removed
 */

use log::warn;

use crate::models::{FeatureDetails, Subtitle, SubtitleAttributes, SubtitleFile, Uploader};
use crate::providers::ProviderKind;

/// What an adapter extracted from one upstream subtitle item
#[derive(Debug, Clone, Default)]
pub struct SubtitleDraft {
    id: String,
    attributes: SubtitleAttributes,
}

impl SubtitleDraft {
    /// Start a draft from the two fields every provider must supply
    pub fn new(id: impl Into<String>, language: impl Into<String>) -> Self {
        let mut attributes = SubtitleAttributes::default();
        attributes.language = language.into();
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Start a draft from an attribute block that is already canonical
    pub fn from_attributes(id: impl Into<String>, attributes: SubtitleAttributes) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    pub fn subtitle_id(mut self, subtitle_id: impl Into<String>) -> Self {
        self.attributes.subtitle_id = subtitle_id.into();
        self
    }

    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.attributes.release = release.into();
        self
    }

    pub fn hearing_impaired(mut self, hearing_impaired: bool) -> Self {
        self.attributes.hearing_impaired = hearing_impaired;
        self
    }

    pub fn download_count(mut self, download_count: u64) -> Self {
        self.attributes.download_count = download_count;
        self
    }

    pub fn ratings(mut self, ratings: f64) -> Self {
        self.attributes.ratings = ratings;
        self
    }

    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.attributes.comments = comments.into();
        self
    }

    pub fn upload_date(mut self, upload_date: impl Into<String>) -> Self {
        self.attributes.upload_date = upload_date.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.attributes.url = url.into();
        self
    }

    pub fn uploader(mut self, name: impl Into<String>, rank: impl Into<String>) -> Self {
        self.attributes.uploader = Uploader {
            uploader_id: None,
            name: name.into(),
            rank: rank.into(),
        };
        self
    }

    pub fn feature(mut self, feature_details: FeatureDetails) -> Self {
        self.attributes.feature_details = feature_details;
        self
    }

    /// Add a single-CD file entry
    pub fn file(mut self, file_id: i64, file_name: impl Into<String>) -> Self {
        self.attributes.files.push(SubtitleFile::new(file_id, file_name));
        self
    }
}

/// Apply the canonical defaulting rules to one draft
///
/// Returns `None` when the draft lacks an id or a language.
pub fn build_subtitle(provider: ProviderKind, draft: SubtitleDraft) -> Option<Subtitle> {
    let SubtitleDraft { id, mut attributes } = draft;

    let id = id.trim().to_string();
    if id.is_empty() {
        return None;
    }

    attributes.language = attributes.language.trim().to_string();
    if attributes.language.is_empty() {
        return None;
    }

    if attributes.subtitle_id.trim().is_empty() {
        attributes.subtitle_id = id.clone();
    }
    if attributes.provider.is_empty() {
        attributes.provider = provider.to_string();
    }
    attributes.files.retain(|file| !file.file_name.trim().is_empty());

    Some(Subtitle::new(id, attributes))
}

/// Normalize a list of upstream items, keeping upstream order
///
/// `extract` returns `None` for items it cannot read; those items, and items
/// the builder rejects, are skipped without failing the page.
pub fn collect_subtitles<T, F>(provider: ProviderKind, items: impl IntoIterator<Item = T>, mut extract: F) -> Vec<Subtitle>
where
    F: FnMut(T) -> Option<SubtitleDraft>,
{
    let mut subtitles = Vec::new();
    let mut skipped = 0usize;

    for item in items {
        match extract(item).and_then(|draft| build_subtitle(provider, draft)) {
            Some(subtitle) => subtitles.push(subtitle),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("{}: skipped {} unreadable subtitle item(s)", provider, skipped);
    }

    subtitles
}
