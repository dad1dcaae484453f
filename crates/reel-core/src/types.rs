//! Core types for Reel

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public player state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerState {
    /// Initial state, nothing playing
    #[default]
    Idle,
    /// Waiting for media data
    Buffering,
    /// Content is playing
    Playing,
    /// Playback paused
    Paused,
    /// Playback reached the end of the item
    Completed,
    /// Provider reported an error
    Error,
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Idle => write!(f, "idle"),
            PlayerState::Buffering => write!(f, "buffering"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::Completed => write!(f, "completed"),
            PlayerState::Error => write!(f, "error"),
        }
    }
}

/// States a provider may report.
///
/// `Loading` and `Stalled` only exist inside providers; the session
/// controller never exposes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderState {
    Idle,
    Loading,
    Stalled,
    Buffering,
    Playing,
    Paused,
    Completed,
    Error,
}

impl ProviderState {
    /// Collapse into the public state enumeration
    pub fn collapse(self) -> PlayerState {
        match self {
            ProviderState::Idle => PlayerState::Idle,
            ProviderState::Loading | ProviderState::Stalled | ProviderState::Buffering => {
                PlayerState::Buffering
            }
            ProviderState::Playing => PlayerState::Playing,
            ProviderState::Paused => PlayerState::Paused,
            ProviderState::Completed => PlayerState::Completed,
            ProviderState::Error => PlayerState::Error,
        }
    }
}

impl From<ProviderState> for PlayerState {
    fn from(state: ProviderState) -> Self {
        state.collapse()
    }
}

impl std::fmt::Display for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderState::Idle => write!(f, "idle"),
            ProviderState::Loading => write!(f, "loading"),
            ProviderState::Stalled => write!(f, "stalled"),
            ProviderState::Buffering => write!(f, "buffering"),
            ProviderState::Playing => write!(f, "playing"),
            ProviderState::Paused => write!(f, "paused"),
            ProviderState::Completed => write!(f, "completed"),
            ProviderState::Error => write!(f, "error"),
        }
    }
}

/// Identifier of a provider type.
///
/// Two provider instances are interchangeable for an item exactly when
/// their kinds compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderKind(String);

impl ProviderKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle to the rendering surface a provider draws into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Container(pub Uuid);

impl Container {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "container-{}", self.0)
    }
}

/// How media is scaled into the display area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stretching {
    /// Fit inside, keep aspect ratio
    #[default]
    Uniform,
    /// Cover, keep aspect ratio
    Fill,
    /// Fill exactly, ignore aspect ratio
    Exactfit,
    /// Native size
    None,
}

impl std::fmt::Display for Stretching {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stretching::Uniform => write!(f, "uniform"),
            Stretching::Fill => write!(f, "fill"),
            Stretching::Exactfit => write!(f, "exactfit"),
            Stretching::None => write!(f, "none"),
        }
    }
}

/// Layout dimension, either pixels or a relative value such as "100%"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Pixels(u32),
    Relative(String),
}

impl Dimension {
    /// Pixel value, if absolute
    pub fn pixels(&self) -> Option<u32> {
        match self {
            Dimension::Pixels(px) => Some(*px),
            Dimension::Relative(_) => None,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Pixels(px) => write!(f, "{}px", px),
            Dimension::Relative(value) => f.write_str(value),
        }
    }
}
