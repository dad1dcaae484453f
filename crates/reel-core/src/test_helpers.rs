//! Test helpers and fixtures for reel-core tests
//!
//! [`RecordingProvider`] writes every call it receives into a shared
//! [`CallLog`], so tests can assert on the exact order of provider
//! interactions across several provider instances.

use crate::{
    playlist::{PlaylistItem, RawPlaylistItem},
    provider::{MediaProvider, ProviderFactory, ProviderListener},
    types::{Container, ProviderKind, SessionId},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct CallLogInner {
    calls: Vec<String>,
    listeners: HashMap<String, ProviderListener>,
    created: HashMap<String, usize>,
}

/// Shared record of provider calls
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inner: Arc<Mutex<CallLogInner>>,
}

impl CallLog {
    fn record(&self, call: String) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.calls.push(call);
        }
    }

    fn next_label(&self, kind: &str) -> String {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        let count = inner.created.entry(kind.to_string()).or_default();
        *count += 1;
        format!("{}#{}", kind, count)
    }

    /// Every call recorded so far, as `label:call`
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().map(|i| i.calls.clone()).unwrap_or_default()
    }

    /// Calls received by one provider instance, without the label prefix
    pub fn calls_for(&self, label: &str) -> Vec<String> {
        let prefix = format!("{}:", label);
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Position of the first call equal to `call`
    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    /// Listener currently attached to the provider with `label`
    pub fn listener(&self, label: &str) -> Option<ProviderListener> {
        self.inner.lock().ok()?.listeners.get(label).cloned()
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.calls.clear();
        }
    }
}

/// Provider that records its calls. Instances are labelled `kind#n`.
#[derive(Debug)]
pub struct RecordingProvider {
    label: String,
    kind: ProviderKind,
    log: CallLog,
    container: Option<Container>,
    pub volume: Option<u8>,
    pub mute: Option<bool>,
}

impl RecordingProvider {
    pub fn new(kind: &str, log: &CallLog) -> Self {
        Self {
            label: log.next_label(kind),
            kind: ProviderKind::new(kind),
            log: log.clone(),
            container: None,
            volume: None,
            mute: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn record(&self, call: impl std::fmt::Display) {
        self.log.record(format!("{}:{}", self.label, call));
    }
}

impl MediaProvider for RecordingProvider {
    fn kind(&self) -> ProviderKind {
        self.kind.clone()
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = Some(volume);
        self.record(format!("volume({})", volume));
    }

    fn set_mute(&mut self, mute: bool) {
        self.mute = Some(mute);
        self.record(format!("mute({})", mute));
    }

    fn play(&mut self) {
        self.record("play");
    }

    fn pause(&mut self) {
        self.record("pause");
    }

    fn remove(&mut self) {
        self.container = None;
        self.record("remove");
    }

    fn destroy(&mut self) {
        self.record("destroy");
    }

    fn container(&self) -> Option<Container> {
        self.container
    }

    fn set_container(&mut self, container: Container) {
        self.container = Some(container);
        self.record(format!("set_container({})", container));
    }

    fn add_global_listener(&mut self, listener: ProviderListener) {
        self.record(format!("add_listener({})", listener.id()));
        if let Ok(mut inner) = self.log.inner.lock() {
            inner.listeners.insert(self.label.clone(), listener);
        }
    }

    fn remove_global_listener(&mut self, listener: &ProviderListener) {
        self.record(format!("remove_listener({})", listener.id()));
        if let Ok(mut inner) = self.log.inner.lock() {
            if inner.listeners.get(&self.label) == Some(listener) {
                inner.listeners.remove(&self.label);
            }
        }
    }

    fn init(&mut self, item: &PlaylistItem) {
        let name = item
            .title
            .clone()
            .or_else(|| item.primary_source().map(|s| s.file.clone()))
            .unwrap_or_default();
        self.record(format!("init({})", name));
    }
}

/// Factory producing [`RecordingProvider`]s of `kind`
pub fn recording_factory(kind: &str, log: &CallLog) -> ProviderFactory {
    let kind = kind.to_string();
    let log = log.clone();
    Box::new(move |_session: &SessionId| Box::new(RecordingProvider::new(&kind, &log)) as Box<dyn MediaProvider>)
}

/// Raw playlist of single-file items
pub fn raw_playlist(files: &[&str]) -> Vec<RawPlaylistItem> {
    files.iter().map(|f| RawPlaylistItem::from_file(*f)).collect()
}
