//! Canonical player events and their dispatcher
//!
//! Subscribers either register synchronous handlers, keyed by event kind
//! or for every kind, or take a broadcast receiver for async consumption.

use crate::{playlist::PlaylistItem, types::PlayerState};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the broadcast stream before slow receivers lag
const STREAM_CAPACITY: usize = 256;

/// Event kinds, named as external subscribers see them
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    MediaMute,
    MediaVolume,
    PlayerState,
    MediaBuffer,
    MediaTime,
    Fullscreen,
    Error,
    PlaylistLoaded,
    PlaylistItem,
    /// Provider event the controller forwards without interpreting
    Custom(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::MediaMute => "media-mute-changed",
            EventKind::MediaVolume => "media-volume-changed",
            EventKind::PlayerState => "player-state-changed",
            EventKind::MediaBuffer => "media-buffer-changed",
            EventKind::MediaTime => "media-time-changed",
            EventKind::Fullscreen => "fullscreen-changed",
            EventKind::Error => "error",
            EventKind::PlaylistLoaded => "playlist-loaded",
            EventKind::PlaylistItem => "playlist-item-changed",
            EventKind::Custom(name) => name,
        }
    }

    /// Kind for a wire name; names of canonical kinds map to their variant
    pub fn from_name(name: &str) -> Self {
        match name {
            "media-mute-changed" => EventKind::MediaMute,
            "media-volume-changed" => EventKind::MediaVolume,
            "player-state-changed" => EventKind::PlayerState,
            "media-buffer-changed" => EventKind::MediaBuffer,
            "media-time-changed" => EventKind::MediaTime,
            "fullscreen-changed" => EventKind::Fullscreen,
            "error" => EventKind::Error,
            "playlist-loaded" => EventKind::PlaylistLoaded,
            "playlist-item-changed" => EventKind::PlaylistItem,
            other => EventKind::Custom(other.to_string()),
        }
    }

    /// True for kinds outside the canonical set
    pub fn is_custom(&self) -> bool {
        matches!(self, EventKind::Custom(_))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event published by the session controller.
///
/// Serializes as a flat object whose `type` is the event kind name.
/// Pass-through provider events carry the provider's own kind and have
/// their object payload flattened next to it.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    MuteChanged { mute: bool },
    VolumeChanged { volume: u8 },
    StateChanged { new_state: PlayerState },
    BufferChanged { buffer_percent: f64 },
    TimeChanged { position: f64, duration: f64 },
    FullscreenChanged { fullscreen: bool },
    Error { message: String },
    PlaylistLoaded { playlist: Vec<PlaylistItem> },
    /// `index` is `None` once the selection has been cleared
    PlaylistItemChanged { index: Option<usize> },
    /// Provider event of a kind the controller does not interpret
    Provider { kind: String, payload: Value },
}

impl Serialize for PlayerEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind().as_str())?;

        match self {
            PlayerEvent::MuteChanged { mute } => map.serialize_entry("mute", mute)?,
            PlayerEvent::VolumeChanged { volume } => map.serialize_entry("volume", volume)?,
            PlayerEvent::StateChanged { new_state } => map.serialize_entry("newState", new_state)?,
            PlayerEvent::BufferChanged { buffer_percent } => {
                map.serialize_entry("bufferPercent", buffer_percent)?
            }
            PlayerEvent::TimeChanged { position, duration } => {
                map.serialize_entry("position", position)?;
                map.serialize_entry("duration", duration)?;
            }
            PlayerEvent::FullscreenChanged { fullscreen } => {
                map.serialize_entry("fullscreen", fullscreen)?
            }
            PlayerEvent::Error { message } => map.serialize_entry("message", message)?,
            PlayerEvent::PlaylistLoaded { playlist } => map.serialize_entry("playlist", playlist)?,
            PlayerEvent::PlaylistItemChanged { index } => map.serialize_entry("index", index)?,
            PlayerEvent::Provider { payload, .. } => match payload {
                Value::Object(fields) => {
                    // `type` always names the event kind
                    for (key, value) in fields.iter().filter(|(key, _)| *key != "type") {
                        map.serialize_entry(key, value)?;
                    }
                }
                Value::Null => {}
                other => map.serialize_entry("payload", other)?,
            },
        }

        map.end()
    }
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::MuteChanged { .. } => EventKind::MediaMute,
            PlayerEvent::VolumeChanged { .. } => EventKind::MediaVolume,
            PlayerEvent::StateChanged { .. } => EventKind::PlayerState,
            PlayerEvent::BufferChanged { .. } => EventKind::MediaBuffer,
            PlayerEvent::TimeChanged { .. } => EventKind::MediaTime,
            PlayerEvent::FullscreenChanged { .. } => EventKind::Fullscreen,
            PlayerEvent::Error { .. } => EventKind::Error,
            PlayerEvent::PlaylistLoaded { .. } => EventKind::PlaylistLoaded,
            PlayerEvent::PlaylistItemChanged { .. } => EventKind::PlaylistItem,
            PlayerEvent::Provider { kind, .. } => EventKind::Custom(kind.clone()),
        }
    }
}

/// Synchronous event handler
pub type EventHandler = Box<dyn FnMut(&PlayerEvent) + Send>;

/// Handle returned by subscribe calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Publish/subscribe hub owned by the session controller
pub struct EventDispatcher {
    next_id: u64,
    handlers: HashMap<EventKind, Vec<(SubscriptionId, EventHandler)>>,
    global: Vec<(SubscriptionId, EventHandler)>,
    stream_tx: broadcast::Sender<PlayerEvent>,
    published: u64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        let (stream_tx, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            next_id: 0,
            handlers: HashMap::new(),
            global: Vec::new(),
            stream_tx,
            published: 0,
        }
    }

    fn next_subscription(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    /// Call `handler` for every event of `kind`
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&PlayerEvent) + Send + 'static,
    {
        let id = self.next_subscription();
        self.handlers
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Call `handler` for every event
    pub fn subscribe_all<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&PlayerEvent) + Send + 'static,
    {
        let id = self.next_subscription();
        self.global.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handler_count();
        self.global.retain(|(sub, _)| *sub != id);
        for handlers in self.handlers.values_mut() {
            handlers.retain(|(sub, _)| *sub != id);
        }
        self.handlers.retain(|_, handlers| !handlers.is_empty());
        self.handler_count() < before
    }

    /// Receiver of every event published from now on
    pub fn stream(&self) -> broadcast::Receiver<PlayerEvent> {
        self.stream_tx.subscribe()
    }

    /// Deliver `event` to kind handlers, then global handlers, then the stream
    pub fn publish(&mut self, event: PlayerEvent) {
        let kind = event.kind();
        trace!(kind = %kind, "Publishing event");

        if let Some(handlers) = self.handlers.get_mut(&kind) {
            for (_, handler) in handlers.iter_mut() {
                handler(&event);
            }
        }
        for (_, handler) in self.global.iter_mut() {
            handler(&event);
        }

        self.published += 1;
        // no receivers is fine
        let _ = self.stream_tx.send(event);
    }

    /// Number of events published so far
    pub fn published_count(&self) -> u64 {
        self.published
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.global.len() + self.handlers.values().map(Vec::len).sum::<usize>()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handler_count())
            .field("published", &self.published)
            .finish()
    }
}
