//! Reel Core - Session Controller for an Embeddable Media Player
//!
//! This crate provides the orchestration layer between media providers
//! and the public player state:
//! - Configuration merge (defaults, persisted settings, caller overrides)
//! - Playlist filtering and item navigation with wrap-around
//! - Provider selection, binding and teardown
//! - Canonical event stream built from heterogeneous provider events
//! - Volume / mute coupling and persistence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Reel Core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │    Config    │  │   Playlist   │  │   Provider   │          │
//! │  │    Merger    │  │    Filter    │  │   Registry   │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Session   │◄──── provider events         │
//! │                    │ Controller  │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐                              │
//! │  │   Settings   │  │    Event    │────► player events           │
//! │  │    Store     │  │  Dispatcher │                              │
//! │  └──────────────┘  └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod events;
pub mod provider;
pub mod playlist;
pub mod persistence;
pub mod session;
pub mod test_helpers;

pub use error::{Error, Result};
pub use types::*;
pub use config::{ConfigSnapshot, PlayerConfig};
pub use events::{EventDispatcher, EventKind, PlayerEvent, SubscriptionId};
pub use provider::{MediaProvider, ProviderEvent, ProviderListener, ProviderRegistry};
pub use playlist::{PlaylistFilter, PlaylistItem, PlaylistView, RawPlaylistItem, Source, SourceFilter};
pub use persistence::{JsonFileStore, MemoryStore, SettingsStore};
pub use session::{PlaybackSnapshot, SessionController};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Reel Core initialized");
}
