//! Playlist items and filtering
//!
//! Raw playlists come from the embedding page or a config file and may use
//! either the `file`/`type` shorthand or an explicit `sources` list. The
//! [`PlaylistFilter`] turns them into [`PlaylistItem`]s that only carry
//! sources some registered provider can play.

use crate::{provider::ProviderRegistry, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Source descriptor as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub default: bool,
}

/// Playlist entry as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPlaylistItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mediaid: Option<String>,
    /// Single-source shorthand
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<RawSource>,
}

impl RawPlaylistItem {
    /// Item with a single file
    pub fn from_file(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..Default::default()
        }
    }

    /// Sources of this item, expanding the `file` shorthand
    pub fn raw_sources(&self) -> Vec<RawSource> {
        if !self.sources.is_empty() {
            return self.sources.clone();
        }
        match &self.file {
            Some(file) => vec![RawSource {
                file: Some(file.clone()),
                media_type: self.media_type.clone(),
                ..Default::default()
            }],
            None => Vec::new(),
        }
    }
}

/// A playable source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub file: String,
    /// Media type, e.g. "mp4", "hls", "youtube"
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub default: bool,
}

impl Source {
    pub fn new(file: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            media_type: media_type.into(),
            label: None,
            default: false,
        }
    }
}

/// A filtered playlist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Poster image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mediaid: Option<String>,
    pub sources: Vec<Source>,
}

impl PlaylistItem {
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            title: None,
            description: None,
            image: None,
            mediaid: None,
            sources,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Source used to pick the provider
    pub fn primary_source(&self) -> Option<&Source> {
        self.sources.first()
    }
}

/// Parse a raw playlist from JSON. Accepts an array of items or a single item.
pub fn parse_playlist(json: &str) -> Result<Vec<RawPlaylistItem>> {
    let value: Value = serde_json::from_str(json)?;
    let items = match value {
        Value::Array(_) => serde_json::from_value(value),
        Value::Object(_) => serde_json::from_value(value).map(|item| vec![item]),
        _ => {
            return Err(Error::InvalidPlaylist(
                "expected an array of items or a single item".to_string(),
            ))
        }
    };
    items.map_err(|e| Error::InvalidPlaylist(e.to_string()))
}

/// Lowercased extension of the file part of `file`, ignoring query and fragment
pub fn file_extension(file: &str) -> Option<String> {
    let path = match Url::parse(file) {
        Ok(url) => url.path().to_string(),
        Err(_) => file.split(['?', '#']).next().unwrap_or(file).to_string(),
    };

    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Infer a media type from a file location
pub fn infer_media_type(file: &str) -> Option<String> {
    if let Ok(url) = Url::parse(file) {
        if let Some(host) = url.host_str() {
            if host.ends_with("youtube.com") || host == "youtu.be" {
                return Some("youtube".to_string());
            }
        }
    }

    let ext = file_extension(file)?;
    let media_type = match ext.as_str() {
        "m3u8" | "m3u" => "hls",
        "mpd" => "dash",
        "m4v" | "mov" => "mp4",
        "m4a" => "aac",
        "ogv" | "oga" => "ogg",
        other => other,
    };
    Some(media_type.to_string())
}

/// Turns a raw playlist into playable items
pub trait PlaylistFilter: Send {
    fn filter(
        &self,
        raw: &[RawPlaylistItem],
        registry: &ProviderRegistry,
        androidhls: bool,
    ) -> Vec<PlaylistItem>;
}

/// Default playlist filter.
///
/// Keeps, per item, the sources sharing the media type of the first
/// playable source; items left without sources are dropped.
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    /// The platform cannot play HLS natively unless `androidhls` is set
    restricted_hls: bool,
}

impl SourceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_restricted_hls(mut self, restricted: bool) -> Self {
        self.restricted_hls = restricted;
        self
    }

    fn normalize_source(&self, raw: &RawSource, androidhls: bool) -> Option<Source> {
        let file = raw.file.as_deref().map(str::trim).filter(|f| !f.is_empty())?;

        let media_type = raw
            .media_type
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .or_else(|| infer_media_type(file))?;

        if media_type == "hls" && self.restricted_hls && !androidhls {
            debug!(file, "Skipping HLS source on restricted platform");
            return None;
        }

        Some(Source {
            file: file.to_string(),
            media_type,
            label: raw.label.clone(),
            default: raw.default,
        })
    }
}

impl PlaylistFilter for SourceFilter {
    fn filter(
        &self,
        raw: &[RawPlaylistItem],
        registry: &ProviderRegistry,
        androidhls: bool,
    ) -> Vec<PlaylistItem> {
        raw.iter()
            .filter_map(|item| {
                let mut selected_type: Option<String> = None;
                let sources: Vec<Source> = item
                    .raw_sources()
                    .iter()
                    .filter_map(|s| self.normalize_source(s, androidhls))
                    .filter(|s| registry.supports(s))
                    .filter(|s| {
                        let selected = selected_type.get_or_insert_with(|| s.media_type.clone());
                        *selected == s.media_type
                    })
                    .collect();

                if sources.is_empty() {
                    debug!(title = ?item.title, "Dropping item without playable sources");
                    return None;
                }

                Some(PlaylistItem {
                    title: item.title.clone(),
                    description: item.description.clone(),
                    image: item.image.clone(),
                    mediaid: item.mediaid.clone(),
                    sources,
                })
            })
            .collect()
    }
}

/// Shapes the playlist handed to `playlist-loaded` subscribers
pub trait PlaylistView: Send {
    fn view(&self, playlist: &[PlaylistItem]) -> Vec<PlaylistItem>;
}

impl<F> PlaylistView for F
where
    F: Fn(&[PlaylistItem]) -> Vec<PlaylistItem> + Send,
{
    fn view(&self, playlist: &[PlaylistItem]) -> Vec<PlaylistItem> {
        self(playlist)
    }
}

/// Publishes the filtered playlist as is
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityView;

impl PlaylistView for IdentityView {
    fn view(&self, playlist: &[PlaylistItem]) -> Vec<PlaylistItem> {
        playlist.to_vec()
    }
}
