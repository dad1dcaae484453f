//! Simulated providers for headless playback
//!
//! A [`SimulatedProvider`] has no media element. When asked to play it
//! reports a scripted run through its listener: loading, buffering,
//! playing with periodic time updates, then completion.

use reel_core::{
    Container, MediaProvider, PlaylistItem, ProviderEvent, ProviderKind, ProviderListener,
    ProviderRegistry, ProviderState, SessionId,
};
use serde_json::json;
use tracing::debug;

/// Media types the simulated html5 provider accepts
pub const HTML5_TYPES: &[&str] = &["mp4", "webm", "ogg", "aac", "mp3", "hls", "dash"];

/// Simulated playback settings
#[derive(Debug, Clone, Copy)]
pub struct Script {
    /// Reported duration of every item, in seconds
    pub duration: f64,
    /// Interval between time updates, in seconds
    pub step: f64,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            duration: 10.0,
            step: 2.5,
        }
    }
}

pub struct SimulatedProvider {
    kind: ProviderKind,
    script: Script,
    listener: Option<ProviderListener>,
    container: Option<Container>,
    item: Option<String>,
    position: f64,
    paused: bool,
}

impl SimulatedProvider {
    pub fn new(kind: &str, script: Script) -> Self {
        Self {
            kind: ProviderKind::new(kind),
            script,
            listener: None,
            container: None,
            item: None,
            position: 0.0,
            paused: false,
        }
    }

    fn emit(&self, event: ProviderEvent) {
        if let Some(listener) = &self.listener {
            listener.emit(event);
        }
    }
}

impl MediaProvider for SimulatedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind.clone()
    }

    fn set_volume(&mut self, volume: u8) {
        self.emit(ProviderEvent::Volume { volume });
    }

    fn set_mute(&mut self, mute: bool) {
        self.emit(ProviderEvent::Mute { mute });
    }

    fn play(&mut self) {
        let Some(file) = self.item.clone() else {
            self.emit(ProviderEvent::Error {
                message: "Nothing to play".to_string(),
            });
            return;
        };

        if !self.paused {
            self.position = 0.0;
            self.emit(ProviderEvent::State { new_state: ProviderState::Loading });
            self.emit(ProviderEvent::Other {
                kind: "media-meta".to_string(),
                payload: json!({ "file": file, "duration": self.script.duration }),
            });
            self.emit(ProviderEvent::Buffer { buffer_percent: 100.0 });
        }
        self.paused = false;
        self.emit(ProviderEvent::State { new_state: ProviderState::Playing });

        while self.position < self.script.duration {
            self.position = (self.position + self.script.step).min(self.script.duration);
            self.emit(ProviderEvent::Time {
                position: self.position,
                duration: self.script.duration,
            });
        }
        self.emit(ProviderEvent::State { new_state: ProviderState::Completed });
    }

    fn pause(&mut self) {
        self.paused = true;
        self.emit(ProviderEvent::State { new_state: ProviderState::Paused });
    }

    fn remove(&mut self) {
        self.container = None;
    }

    fn destroy(&mut self) {
        debug!(kind = %self.kind, "Simulated provider destroyed");
        self.listener = None;
        self.container = None;
    }

    fn container(&self) -> Option<Container> {
        self.container
    }

    fn set_container(&mut self, container: Container) {
        self.container = Some(container);
    }

    fn add_global_listener(&mut self, listener: ProviderListener) {
        self.listener = Some(listener);
    }

    fn remove_global_listener(&mut self, listener: &ProviderListener) {
        if self.listener.as_ref() == Some(listener) {
            self.listener = None;
        }
    }

    fn init(&mut self, item: &PlaylistItem) {
        self.item = item.primary_source().map(|s| s.file.clone());
        self.position = 0.0;
        self.paused = false;
    }
}

/// Registry with simulated html5 and youtube providers
pub fn registry(script: Script) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register_types(
        "html5",
        HTML5_TYPES,
        Box::new(move |_session: &SessionId| {
            Box::new(SimulatedProvider::new("html5", script)) as Box<dyn MediaProvider>
        }),
    );
    registry.register_types(
        "youtube",
        &["youtube"],
        Box::new(move |_session: &SessionId| {
            Box::new(SimulatedProvider::new("youtube", script)) as Box<dyn MediaProvider>
        }),
    );
    registry
}
