//! Media providers
//!
//! A provider decodes and renders one kind of media source. The session
//! controller owns at most one provider at a time, talks to it through
//! [`MediaProvider`], and receives its events through a
//! [`ProviderListener`].
//!
//! Provider types are looked up through the [`ProviderRegistry`], which
//! keeps an ordered list of registrations. The first registration whose
//! predicate accepts a source wins.

use crate::{
    playlist::{PlaylistItem, Source},
    types::{Container, ProviderKind, ProviderState, SessionId},
    Error, Result,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

/// Events a provider reports about its media element
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// Mute flag changed
    Mute { mute: bool },
    /// Volume changed
    Volume { volume: u8 },
    /// Playback state changed, may be a provider-only sub-state
    State { new_state: ProviderState },
    /// Buffered amount in percent
    Buffer { buffer_percent: f64 },
    /// Playback progress; negative duration means unknown
    Time { position: f64, duration: f64 },
    /// Media error
    Error { message: String },
    /// Any other provider event, forwarded untouched.
    ///
    /// `kind` must not be a canonical player event name; such events are
    /// dropped, since canonical events only come from the typed variants.
    Other { kind: String, payload: Value },
}

/// Message queued by a listener
#[derive(Debug, Clone)]
pub struct ListenerMessage {
    /// Binding the emitting listener belongs to
    pub binding: u64,
    pub event: ProviderEvent,
}

/// Handle through which a provider reports events to the session.
///
/// Each binding gets a listener with a fresh id; events emitted through
/// a listener from an earlier binding are discarded by the session.
#[derive(Debug, Clone)]
pub struct ProviderListener {
    binding: u64,
    tx: mpsc::UnboundedSender<ListenerMessage>,
}

impl ProviderListener {
    pub fn new(binding: u64, tx: mpsc::UnboundedSender<ListenerMessage>) -> Self {
        Self { binding, tx }
    }

    /// Binding id of this listener
    pub fn id(&self) -> u64 {
        self.binding
    }

    /// Queue an event for the session. Returns false once the session is gone.
    pub fn emit(&self, event: ProviderEvent) -> bool {
        self.tx
            .send(ListenerMessage {
                binding: self.binding,
                event,
            })
            .is_ok()
    }
}

impl PartialEq for ProviderListener {
    fn eq(&self, other: &Self) -> bool {
        self.binding == other.binding
    }
}

/// Capability set the session controller needs from a provider
pub trait MediaProvider: Send {
    /// Type identifier used to decide whether an instance can be reused
    fn kind(&self) -> ProviderKind;

    fn set_volume(&mut self, volume: u8);

    fn set_mute(&mut self, mute: bool);

    fn play(&mut self);

    fn pause(&mut self);

    /// Detach from the rendering container
    fn remove(&mut self);

    /// Release every resource held by the provider
    fn destroy(&mut self);

    /// Container the provider currently renders into
    fn container(&self) -> Option<Container>;

    fn set_container(&mut self, container: Container);

    fn add_global_listener(&mut self, listener: ProviderListener);

    fn remove_global_listener(&mut self, listener: &ProviderListener);

    /// Called every time an item is selected on this provider.
    /// Providers use it to prefetch preview data.
    fn init(&mut self, _item: &PlaylistItem) {}
}

/// Provider factory function type
pub type ProviderFactory = Box<dyn Fn(&SessionId) -> Box<dyn MediaProvider> + Send + Sync>;

/// Predicate deciding whether a provider type can play a source
pub type SourcePredicate = Box<dyn Fn(&Source) -> bool + Send + Sync>;

struct Registration {
    kind: ProviderKind,
    supports: SourcePredicate,
    factory: ProviderFactory,
}

/// Ordered registry of provider types
pub struct ProviderRegistry {
    registrations: Vec<Registration>,
}

impl ProviderRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Register a provider type.
    ///
    /// Registering an existing kind replaces it in place.
    pub fn register(
        &mut self,
        kind: impl Into<ProviderKind>,
        supports: SourcePredicate,
        factory: ProviderFactory,
    ) {
        let registration = Registration {
            kind: kind.into(),
            supports,
            factory,
        };

        match self
            .registrations
            .iter_mut()
            .find(|r| r.kind == registration.kind)
        {
            Some(existing) => *existing = registration,
            None => self.registrations.push(registration),
        }
    }

    /// Register a provider type that plays a fixed set of media types
    pub fn register_types(
        &mut self,
        kind: impl Into<ProviderKind>,
        media_types: &[&str],
        factory: ProviderFactory,
    ) {
        let media_types: Vec<String> = media_types.iter().map(|t| t.to_ascii_lowercase()).collect();
        self.register(
            kind,
            Box::new(move |source: &Source| media_types.iter().any(|t| *t == source.media_type)),
            factory,
        );
    }

    /// Move `kind` to the front of the lookup order
    pub fn set_primary(&mut self, kind: &str) {
        if let Some(pos) = self.registrations.iter().position(|r| r.kind.as_str() == kind) {
            let registration = self.registrations.remove(pos);
            self.registrations.insert(0, registration);
            debug!(primary = kind, "Primary provider set");
        }
    }

    /// Builder form of [`ProviderRegistry::set_primary`]
    pub fn with_primary(mut self, kind: &str) -> Self {
        self.set_primary(kind);
        self
    }

    /// Provider type able to play `source`, if any
    pub fn choose(&self, source: &Source) -> Option<ProviderKind> {
        self.registrations
            .iter()
            .find(|r| (r.supports)(source))
            .map(|r| r.kind.clone())
    }

    pub fn supports(&self, source: &Source) -> bool {
        self.registrations.iter().any(|r| (r.supports)(source))
    }

    /// Construct a new instance of `kind`
    pub fn create(&self, kind: &ProviderKind, session: &SessionId) -> Result<Box<dyn MediaProvider>> {
        let registration = self
            .registrations
            .iter()
            .find(|r| r.kind == *kind)
            .ok_or_else(|| Error::ProviderNotRegistered(kind.to_string()))?;

        Ok((registration.factory)(session))
    }

    /// Registered kinds in lookup order
    pub fn kinds(&self) -> Vec<&ProviderKind> {
        self.registrations.iter().map(|r| &r.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{recording_factory, CallLog};

    fn registry(log: &CallLog) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register_types("html5", &["mp4", "webm", "hls"], recording_factory("html5", log));
        registry.register_types("flash", &["mp4", "flv"], recording_factory("flash", log));
        registry
    }

    #[test]
    fn test_choose_in_registration_order() {
        let log = CallLog::default();
        let registry = registry(&log);

        assert_eq!(registry.choose(&Source::new("a.mp4", "mp4")), Some(ProviderKind::new("html5")));
        assert_eq!(registry.choose(&Source::new("a.flv", "flv")), Some(ProviderKind::new("flash")));
        assert_eq!(registry.choose(&Source::new("a.xyz", "xyz")), None);
        assert!(!registry.supports(&Source::new("a.xyz", "xyz")));
    }

    #[test]
    fn test_primary_moves_kind_first() {
        let log = CallLog::default();
        let registry = registry(&log).with_primary("flash");

        assert_eq!(registry.kinds()[0].as_str(), "flash");
        assert_eq!(registry.choose(&Source::new("a.mp4", "mp4")), Some(ProviderKind::new("flash")));

        // unknown primary leaves the order alone
        let registry = registry.with_primary("silverlight");
        assert_eq!(registry.kinds()[0].as_str(), "flash");
    }

    #[test]
    fn test_register_replaces_existing_kind() {
        let log = CallLog::default();
        let mut registry = registry(&log);
        registry.register_types("html5", &["ogg"], recording_factory("html5", &log));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.choose(&Source::new("a.mp4", "mp4")), Some(ProviderKind::new("flash")));
        assert_eq!(registry.choose(&Source::new("a.ogg", "ogg")), Some(ProviderKind::new("html5")));
    }

    #[test]
    fn test_create_unknown_kind() {
        let registry = ProviderRegistry::new();
        let err = registry
            .create(&ProviderKind::new("youtube"), &SessionId::new())
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_listener_emit_and_identity() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = ProviderListener::new(7, tx);

        assert!(listener.emit(ProviderEvent::Mute { mute: true }));
        let message = rx.try_recv().unwrap();
        assert_eq!(message.binding, 7);
        assert_eq!(message.event, ProviderEvent::Mute { mute: true });
        assert_eq!(listener, listener.clone());

        drop(rx);
        assert!(!listener.emit(ProviderEvent::Mute { mute: false }));
    }
}
