//! Session controller example
//!
//! Loads a mixed playlist, walks through its items and shows how provider
//! events surface as player events.
//!
//! Run with: cargo run -p reel-core --example session

use reel_core::test_helpers::{raw_playlist, recording_factory, CallLog};
use reel_core::{
    MemoryStore, PlayerEvent, ProviderEvent, ProviderRegistry, ProviderState, SessionController,
};
use serde_json::Map;

fn main() -> reel_core::Result<()> {
    println!("Reel Core - Session Controller Example");
    println!("======================================\n");

    let log = CallLog::default();
    let mut registry = ProviderRegistry::new();
    registry.register_types("html5", &["mp4", "webm", "hls"], recording_factory("html5", &log));
    registry.register_types("youtube", &["youtube"], recording_factory("youtube", &log));

    let mut session = SessionController::new(Map::new(), registry, Box::new(MemoryStore::new()))?;

    session.subscribe_all(|event: &PlayerEvent| match event {
        PlayerEvent::PlaylistLoaded { playlist } => {
            println!("  event: {} ({} items)", event.kind(), playlist.len())
        }
        other => println!("  event: {}", serde_json::to_string(other).unwrap_or_default()),
    });

    println!("Loading playlist...");
    session.set_playlist(&raw_playlist(&[
        "https://cdn.example.com/intro.mp4",
        "https://cdn.example.com/legacy.flv",
        "https://www.youtube.com/watch?v=abc123",
        "https://cdn.example.com/live.m3u8",
    ]))?;

    println!("\nSelecting next items...");
    session.set_item(1)?;
    session.set_item(2)?;
    println!("  provider: {:?}", session.provider_kind());

    println!("\nProvider reports playback...");
    if let Some(listener) = log.listener("html5#2") {
        listener.emit(ProviderEvent::State { new_state: ProviderState::Loading });
        listener.emit(ProviderEvent::Buffer { buffer_percent: 35.0 });
        listener.emit(ProviderEvent::State { new_state: ProviderState::Playing });
        listener.emit(ProviderEvent::Time { position: 4.2, duration: 120.0 });
    }
    let handled = session.drain_provider_events();
    println!("  handled {} provider events, state is {}", handled, session.state());

    println!("\nMuting and changing volume...");
    session.set_mute(Some(true));
    session.set_volume(55.0);
    println!("  volume={} mute={}", session.volume(), session.mute());

    println!("\nProvider calls:");
    for call in log.calls() {
        println!("  {}", call);
    }

    Ok(())
}
