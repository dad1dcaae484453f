//! Session Controller - single owner of live playback state
//!
//! Coordinates:
//! - Configuration merge at construction
//! - Playlist loading and item selection
//! - Provider choice, binding and teardown
//! - Translation of provider events into canonical player events
//! - Volume / mute / fullscreen / seek-drag mutators

use crate::{
    config::{default_config, merge_config, ConfigSnapshot, PlayerConfig},
    events::{EventDispatcher, EventKind, PlayerEvent, SubscriptionId},
    persistence::SettingsStore,
    playlist::{IdentityView, PlaylistFilter, PlaylistItem, PlaylistView, RawPlaylistItem, SourceFilter},
    provider::{ListenerMessage, MediaProvider, ProviderEvent, ProviderListener, ProviderRegistry},
    types::*,
    Error, Result,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Volume applied when muting at volume 0, so unmuting is audible
pub const MUTED_FALLBACK_VOLUME: u8 = 20;

/// Message published when a playlist filters down to nothing
pub const EMPTY_PLAYLIST_MESSAGE: &str = "Error loading playlist: No playable sources found";

/// Sub-components that get a configuration block
const COMPONENTS: [&str; 2] = ["controlbar", "display"];

/// Live playback state, mutated by provider events and mutators
#[derive(Debug, Clone, PartialEq)]
struct LiveState {
    state: PlayerState,
    position: f64,
    duration: Option<f64>,
    buffer: f64,
    volume: u8,
    mute: bool,
    fullscreen: bool,
    dragging: bool,
}

impl LiveState {
    fn from_config(config: &PlayerConfig) -> Self {
        Self {
            state: PlayerState::Idle,
            position: 0.0,
            duration: None,
            buffer: 0.0,
            volume: clamp_volume(config.volume),
            mute: config.mute,
            fullscreen: config.fullscreen,
            dragging: config.dragging,
        }
    }
}

/// Round and clamp a requested volume into 0-100
fn clamp_volume(volume: f64) -> u8 {
    if volume.is_nan() {
        return 0;
    }
    volume.round().clamp(0.0, 100.0) as u8
}

/// Serializable view of the live state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub session_id: SessionId,
    pub state: PlayerState,
    pub position: f64,
    pub duration: Option<f64>,
    pub buffer: f64,
    pub volume: u8,
    pub mute: bool,
    pub fullscreen: bool,
    pub dragging: bool,
    pub item: Option<usize>,
    pub playlist_len: usize,
    pub provider: Option<ProviderKind>,
}

/// Session controller managing one embedded player
pub struct SessionController {
    /// Unique session ID
    id: SessionId,
    /// Merged configuration, fixed after construction
    config: PlayerConfig,
    snapshot: ConfigSnapshot,
    /// Live state
    live: LiveState,
    /// State change broadcaster
    state_tx: watch::Sender<PlayerState>,
    /// Filtered playlist and selected index
    playlist: Vec<PlaylistItem>,
    item: Option<usize>,
    /// Active provider and the id of its listener binding
    provider: Option<Box<dyn MediaProvider>>,
    binding: u64,
    listener: Option<ProviderListener>,
    listener_tx: mpsc::UnboundedSender<ListenerMessage>,
    listener_rx: mpsc::UnboundedReceiver<ListenerMessage>,
    /// Collaborators
    registry: ProviderRegistry,
    filter: Box<dyn PlaylistFilter>,
    view: Box<dyn PlaylistView>,
    settings: Box<dyn SettingsStore>,
    events: EventDispatcher,
    components: HashMap<String, Map<String, Value>>,
}

impl SessionController {
    /// Create a session from caller overrides, merged over persisted
    /// settings and the default table.
    ///
    /// Options are not validated. The merged snapshot keeps every value as
    /// given; options the session reads fall back to their default when
    /// they have the wrong type.
    pub fn new(
        user_config: Map<String, Value>,
        mut registry: ProviderRegistry,
        settings: Box<dyn SettingsStore>,
    ) -> Result<Self> {
        let persisted = settings.load().unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable persisted settings");
            Map::new()
        });

        let snapshot = merge_config(&default_config(), &persisted, &user_config);
        let config = snapshot.lenient();

        if let Some(primary) = config.primary.as_deref() {
            registry.set_primary(primary);
        }

        let live = LiveState::from_config(&config);
        let (state_tx, _) = watch::channel(live.state);
        let (listener_tx, listener_rx) = mpsc::unbounded_channel();

        let components = COMPONENTS
            .iter()
            .map(|name| (name.to_string(), Map::new()))
            .collect();

        let id = SessionId::new();
        info!(
            session_id = %id,
            player_id = config.id.as_deref().unwrap_or("-"),
            volume = live.volume,
            mute = live.mute,
            providers = registry.len(),
            "Session created"
        );

        Ok(Self {
            id,
            config,
            snapshot,
            live,
            state_tx,
            playlist: Vec::new(),
            item: None,
            provider: None,
            binding: 0,
            listener: None,
            listener_tx,
            listener_rx,
            registry,
            filter: Box::new(SourceFilter::new()),
            view: Box::new(IdentityView),
            settings,
            events: EventDispatcher::new(),
            components,
        })
    }

    /// Replace the playlist filter
    pub fn with_playlist_filter(mut self, filter: impl PlaylistFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Replace the view applied to `playlist-loaded` payloads
    pub fn with_playlist_view(mut self, view: impl PlaylistView + 'static) -> Self {
        self.view = Box::new(view);
        self
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Typed configuration
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Merged configuration as stored
    pub fn config_snapshot(&self) -> &ConfigSnapshot {
        &self.snapshot
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    // =========================================================================
    // Live state
    // =========================================================================

    pub fn state(&self) -> PlayerState {
        self.live.state
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<PlayerState> {
        self.state_tx.subscribe()
    }

    pub fn position(&self) -> f64 {
        self.live.position
    }

    /// Content duration, `None` until the provider reports one
    pub fn duration(&self) -> Option<f64> {
        self.live.duration
    }

    pub fn buffer(&self) -> f64 {
        self.live.buffer
    }

    pub fn volume(&self) -> u8 {
        self.live.volume
    }

    pub fn mute(&self) -> bool {
        self.live.mute
    }

    pub fn fullscreen(&self) -> bool {
        self.live.fullscreen
    }

    pub fn dragging(&self) -> bool {
        self.live.dragging
    }

    pub fn playlist(&self) -> &[PlaylistItem] {
        &self.playlist
    }

    /// Selected playlist index
    pub fn item(&self) -> Option<usize> {
        self.item
    }

    /// Active provider
    pub fn provider(&self) -> Option<&dyn MediaProvider> {
        self.provider.as_deref()
    }

    pub fn provider_mut(&mut self) -> Option<&mut (dyn MediaProvider + 'static)> {
        self.provider.as_deref_mut()
    }

    pub fn provider_kind(&self) -> Option<ProviderKind> {
        self.provider.as_ref().map(|p| p.kind())
    }

    /// Configuration block of a sub-component
    pub fn component_config(&self, name: &str) -> Option<&Map<String, Value>> {
        self.components.get(name)
    }

    pub fn component_config_mut(&mut self, name: &str) -> Option<&mut Map<String, Value>> {
        self.components.get_mut(name)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            session_id: self.id,
            state: self.live.state,
            position: self.live.position,
            duration: self.live.duration,
            buffer: self.live.buffer,
            volume: self.live.volume,
            mute: self.live.mute,
            fullscreen: self.live.fullscreen,
            dragging: self.live.dragging,
            item: self.item,
            playlist_len: self.playlist.len(),
            provider: self.provider_kind(),
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Call `handler` for every event of `kind`
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&PlayerEvent) + Send + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    /// Call `handler` for every event
    pub fn subscribe_all<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&PlayerEvent) + Send + 'static,
    {
        self.events.subscribe_all(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Async stream of every event published from now on
    pub fn event_stream(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.stream()
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    // =========================================================================
    // Provider binding
    // =========================================================================

    /// Make `provider` the active provider.
    ///
    /// The previous provider's listener is detached before anything else;
    /// its container, if any, moves to the new provider, then the previous
    /// provider is destroyed. The new provider receives volume and mute
    /// before its listener is attached.
    #[instrument(skip(self, provider), fields(session_id = %self.id, kind = %provider.kind()))]
    pub fn bind_provider(&mut self, mut provider: Box<dyn MediaProvider>) {
        if let Some(mut old) = self.provider.take() {
            if let Some(listener) = self.listener.take() {
                old.remove_global_listener(&listener);
            }
            if let Some(container) = old.container() {
                old.remove();
                provider.set_container(container);
                debug!(container = %container, from = %old.kind(), "Container handed over");
            }
            old.destroy();
        }

        self.binding += 1;
        let listener = ProviderListener::new(self.binding, self.listener_tx.clone());

        provider.set_volume(self.live.volume);
        provider.set_mute(self.live.mute);
        provider.add_global_listener(listener.clone());

        info!(binding = self.binding, "Provider bound");

        self.listener = Some(listener);
        self.provider = Some(provider);
    }

    /// Detach from and destroy the active provider. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        let Some(mut provider) = self.provider.take() else {
            return;
        };

        if let Some(listener) = self.listener.take() {
            provider.remove_global_listener(&listener);
        }
        provider.destroy();

        info!(session_id = %self.id, kind = %provider.kind(), "Provider torn down");
    }

    /// Translate a provider event, update live state and re-publish it
    pub fn handle_provider_event(&mut self, event: ProviderEvent) {
        let event = match event {
            ProviderEvent::Mute { mute } => {
                self.live.mute = mute;
                PlayerEvent::MuteChanged { mute }
            }
            ProviderEvent::Volume { volume } => {
                let volume = volume.min(100);
                self.live.volume = volume;
                PlayerEvent::VolumeChanged { volume }
            }
            ProviderEvent::State { new_state } => {
                let state = new_state.collapse();
                if state != self.live.state {
                    debug!(from = %self.live.state, to = %state, reported = %new_state, "State transition");
                }
                self.live.state = state;
                self.state_tx.send_replace(state);
                PlayerEvent::StateChanged { new_state: state }
            }
            ProviderEvent::Buffer { buffer_percent } => {
                self.live.buffer = buffer_percent;
                PlayerEvent::BufferChanged { buffer_percent }
            }
            ProviderEvent::Time { position, duration } => {
                self.live.position = position;
                self.live.duration = (duration >= 0.0).then_some(duration);
                PlayerEvent::TimeChanged { position, duration }
            }
            ProviderEvent::Error { message } => {
                warn!(session_id = %self.id, message = %message, "Provider error");
                PlayerEvent::Error { message }
            }
            ProviderEvent::Other { kind, payload } => {
                if !EventKind::from_name(&kind).is_custom() {
                    warn!(session_id = %self.id, kind = %kind, "Dropping untyped provider event with a canonical kind");
                    return;
                }
                PlayerEvent::Provider { kind, payload }
            }
        };

        self.events.publish(event);
    }

    /// Process every event queued by the active provider's listener.
    ///
    /// Events emitted through listeners of earlier bindings are dropped.
    /// Returns the number of events handled.
    pub fn drain_provider_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.listener_rx.try_recv() {
            if message.binding != self.binding || self.listener.is_none() {
                debug!(binding = message.binding, current = self.binding, "Dropping stale provider event");
                continue;
            }
            self.handle_provider_event(message.event);
            handled += 1;
        }
        handled
    }

    // =========================================================================
    // Playlist
    // =========================================================================

    /// Filter and load a raw playlist, then select its first item
    #[instrument(skip(self, raw), fields(session_id = %self.id, items = raw.len()))]
    pub fn set_playlist(&mut self, raw: &[RawPlaylistItem]) -> Result<()> {
        let playlist = self.filter.filter(raw, &self.registry, self.config.androidhls);

        if playlist.is_empty() {
            warn!("Playlist has no playable sources");
            self.events.publish(PlayerEvent::Error {
                message: EMPTY_PLAYLIST_MESSAGE.to_string(),
            });
            return Ok(());
        }

        info!(playable = playlist.len(), "Playlist loaded");
        self.playlist = playlist;

        let published = self.view.view(&self.playlist);
        self.events.publish(PlayerEvent::PlaylistLoaded { playlist: published });

        self.item = None;
        self.set_item(0)
    }

    /// Select the item at `index`.
    ///
    /// `len` and anything below -1 wrap to the first item and always
    /// re-select it; -1 and anything above `len` select the last item.
    /// Selecting the current item again does nothing.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn set_item(&mut self, index: i64) -> Result<()> {
        let len = self.playlist.len() as i64;

        let (target, repeat) = if index == len || index < -1 {
            (0, true)
        } else if index == -1 || index > len {
            (len - 1, false)
        } else {
            (index, false)
        };
        let target = usize::try_from(target).ok();

        if !repeat && target == self.item {
            debug!(index, "Item already selected");
            return Ok(());
        }

        self.item = target;
        self.live.position = 0.0;
        self.live.duration = None;
        self.events.publish(PlayerEvent::PlaylistItemChanged { index: target });

        let Some(item) = target.and_then(|i| self.playlist.get(i)).cloned() else {
            debug!(index, "No item to select");
            return Ok(());
        };
        let Some(source) = item.primary_source() else {
            debug!(index, "Item has no sources");
            return Ok(());
        };

        let kind = self.registry.choose(source).ok_or_else(|| Error::NoSuitableProvider {
            file: source.file.clone(),
            media_type: source.media_type.clone(),
        })?;

        if self.provider_kind().as_ref() != Some(&kind) {
            let provider = self.registry.create(&kind, &self.id)?;
            self.bind_provider(provider);
        }

        if let Some(provider) = self.provider.as_mut() {
            provider.init(&item);
        }

        info!(item = ?target, kind = %kind, repeat, "Item selected");
        Ok(())
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Set the volume (rounded and clamped to 0-100). A positive volume unmutes.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn set_volume(&mut self, volume: f64) {
        if self.live.mute && volume > 0.0 {
            self.set_mute(Some(false));
        }
        self.apply_volume(clamp_volume(volume));
    }

    fn apply_volume(&mut self, volume: u8) {
        if !self.live.mute {
            self.persist("volume", Value::from(volume));
        }
        self.live.volume = volume;
        if let Some(provider) = self.provider.as_mut() {
            provider.set_volume(volume);
        }
    }

    /// Set mute, or toggle it when `state` is `None`.
    /// Muting at volume 0 raises the volume so unmuting is audible.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn set_mute(&mut self, state: Option<bool>) {
        let mute = state.unwrap_or(!self.live.mute);

        self.persist("mute", Value::Bool(mute));
        self.live.mute = mute;

        if mute && self.live.volume == 0 {
            self.apply_volume(MUTED_FALLBACK_VOLUME);
        }

        if let Some(provider) = self.provider.as_mut() {
            provider.set_mute(mute);
        }
    }

    /// Enter or leave fullscreen; publishes only on change
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if fullscreen == self.live.fullscreen {
            return;
        }
        self.live.fullscreen = fullscreen;
        self.events.publish(PlayerEvent::FullscreenChanged { fullscreen });
    }

    /// Pause the provider while the seek bar is dragged, resume after
    pub fn seek_drag(&mut self, dragging: bool) {
        self.live.dragging = dragging;

        let Some(provider) = self.provider.as_mut() else {
            debug!(dragging, "Seek drag without provider");
            return;
        };

        if dragging {
            provider.pause();
        } else {
            provider.play();
        }
    }

    fn persist(&mut self, key: &str, value: Value) {
        if let Err(e) = self.settings.save(key, value) {
            warn!(key, error = %e, code = e.error_code(), "Failed to persist setting");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.id)
            .field("live", &self.live)
            .field("item", &self.item)
            .field("playlist", &self.playlist.len())
            .field("provider", &self.provider_kind())
            .finish()
    }
}
