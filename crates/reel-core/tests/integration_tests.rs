//! Integration tests for Reel Core

use reel_core::{
    session::{EMPTY_PLAYLIST_MESSAGE, MUTED_FALLBACK_VOLUME},
    test_helpers::{raw_playlist, recording_factory, CallLog},
    Container, EventKind, JsonFileStore, MemoryStore, PlayerEvent, PlayerState, PlaylistItem,
    ProviderEvent, ProviderKind, ProviderRegistry, ProviderState, RawPlaylistItem,
    SessionController, Source,
};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

// =============================================================================
// Helpers
// =============================================================================

fn registry(log: &CallLog) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register_types("html5", &["mp4", "webm", "hls"], recording_factory("html5", log));
    registry.register_types("youtube", &["youtube"], recording_factory("youtube", log));
    registry
}

fn user_config(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn new_session(log: &CallLog) -> SessionController {
    SessionController::new(Map::new(), registry(log), Box::new(MemoryStore::new())).unwrap()
}

fn collect_events(session: &mut SessionController) -> Arc<Mutex<Vec<PlayerEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session.subscribe_all(move |e| sink.lock().unwrap().push(e.clone()));
    seen
}

fn item_events(seen: &Arc<Mutex<Vec<PlayerEvent>>>) -> Vec<Option<usize>> {
    seen.lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::PlaylistItemChanged { index } => Some(*index),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Item Navigation Tests
// =============================================================================

#[test]
fn test_index_normalization_for_every_input() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session
        .set_playlist(&raw_playlist(&["a.mp4", "b.mp4", "c.mp4", "d.mp4"]))
        .unwrap();
    let len = session.playlist().len() as i64;

    for index in -10..=10 {
        // move away first so every selection is a real change
        session.set_item(1).unwrap();
        session.set_item(2).unwrap();

        session.set_item(index).unwrap();

        let expected = if index == len || index < -1 {
            0
        } else if index == -1 || index > len {
            (len - 1) as usize
        } else {
            index as usize
        };
        assert_eq!(session.item(), Some(expected), "index {}", index);
    }
}

#[test]
fn test_same_index_publishes_once() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session.set_playlist(&raw_playlist(&["a.mp4", "b.mp4", "c.mp4"])).unwrap();
    let seen = collect_events(&mut session);

    session.set_item(2).unwrap();
    session.set_item(2).unwrap();

    assert_eq!(item_events(&seen), vec![Some(2)]);
}

#[test]
fn test_repeat_reselects_first_item() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session.set_playlist(&raw_playlist(&["a.mp4", "b.mp4"])).unwrap();
    assert_eq!(session.item(), Some(0));
    let seen = collect_events(&mut session);

    session.set_item(2).unwrap();
    session.set_item(-2).unwrap();

    assert_eq!(item_events(&seen), vec![Some(0), Some(0)]);
    // provider init runs on every selection
    assert_eq!(
        log.calls_for("html5#1")
            .iter()
            .filter(|c| c.starts_with("init"))
            .count(),
        3
    );
}

#[test]
fn test_item_change_resets_position() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session.set_playlist(&raw_playlist(&["a.mp4", "b.mp4"])).unwrap();
    session.handle_provider_event(ProviderEvent::Time { position: 12.0, duration: 30.0 });

    session.set_item(1).unwrap();

    assert_eq!(session.position(), 0.0);
    assert_eq!(session.duration(), None);
}

#[test]
fn test_unmatched_source_is_fatal() {
    // keeps every file, typed as something no provider plays
    struct Unfiltered;
    impl reel_core::PlaylistFilter for Unfiltered {
        fn filter(&self, raw: &[RawPlaylistItem], _: &ProviderRegistry, _: bool) -> Vec<PlaylistItem> {
            raw.iter()
                .map(|r| PlaylistItem::new(vec![Source::new(r.file.clone().unwrap_or_default(), "flv")]))
                .collect()
        }
    }

    let log = CallLog::default();
    let mut session = new_session(&log).with_playlist_filter(Unfiltered);
    let err = session.set_playlist(&raw_playlist(&["a.flv"])).unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.error_code(), "NO_PROVIDER");
    assert_eq!(session.item(), Some(0));
    assert!(session.provider().is_none());
}

#[test]
fn test_item_without_sources_is_silent() {
    struct Sourceless;
    impl reel_core::PlaylistFilter for Sourceless {
        fn filter(&self, raw: &[RawPlaylistItem], _: &ProviderRegistry, _: bool) -> Vec<PlaylistItem> {
            raw.iter().map(|_| PlaylistItem::new(Vec::new())).collect()
        }
    }

    let log = CallLog::default();
    let mut session = new_session(&log).with_playlist_filter(Sourceless);
    let seen = collect_events(&mut session);

    session.set_playlist(&raw_playlist(&["a.mp4"])).unwrap();

    assert_eq!(session.item(), Some(0));
    assert_eq!(item_events(&seen), vec![Some(0)]);
    assert!(session.provider().is_none());
}

// =============================================================================
// Playlist Tests
// =============================================================================

#[test]
fn test_empty_playlist_publishes_only_an_error() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    let seen = collect_events(&mut session);

    session.set_playlist(&[]).unwrap();
    session.set_playlist(&raw_playlist(&["clip.flv"])).unwrap();

    let events = seen.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            PlayerEvent::Error { message: EMPTY_PLAYLIST_MESSAGE.to_string() },
            PlayerEvent::Error { message: EMPTY_PLAYLIST_MESSAGE.to_string() },
        ]
    );
    assert_eq!(session.item(), None);
    assert_eq!(session.state(), PlayerState::Idle);
}

#[test]
fn test_empty_playlist_keeps_current_selection() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session.set_playlist(&raw_playlist(&["a.mp4", "b.mp4"])).unwrap();
    session.set_item(1).unwrap();

    session.set_playlist(&[]).unwrap();

    assert_eq!(session.item(), Some(1));
    assert_eq!(session.playlist().len(), 2);
}

#[test]
fn test_playlist_loaded_then_first_item() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    let seen = collect_events(&mut session);

    session
        .set_playlist(&raw_playlist(&["a.mp4", "bad.flv", "https://youtu.be/abc"]))
        .unwrap();

    let events = seen.lock().unwrap().clone();
    assert_eq!(events.len(), 2);
    match &events[0] {
        PlayerEvent::PlaylistLoaded { playlist } => assert_eq!(playlist.len(), 2),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(events[1], PlayerEvent::PlaylistItemChanged { index: Some(0) });
}

#[test]
fn test_playlist_view_shapes_loaded_payload() {
    let log = CallLog::default();
    let mut session = new_session(&log).with_playlist_view(|playlist: &[PlaylistItem]| {
        playlist
            .iter()
            .cloned()
            .map(|item| item.with_title("shown"))
            .collect::<Vec<_>>()
    });
    let loaded = Arc::new(Mutex::new(Vec::new()));
    let sink = loaded.clone();
    session.subscribe(EventKind::PlaylistLoaded, move |e| {
        if let PlayerEvent::PlaylistLoaded { playlist } = e {
            sink.lock().unwrap().extend(playlist.iter().cloned());
        }
    });

    session.set_playlist(&raw_playlist(&["a.mp4"])).unwrap();

    assert_eq!(loaded.lock().unwrap()[0].title.as_deref(), Some("shown"));
    // the session keeps the filtered playlist itself
    assert_eq!(session.playlist()[0].title, None);
}

// =============================================================================
// Provider Binding Tests
// =============================================================================

#[test]
fn test_provider_swap_hands_over_container() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session
        .set_playlist(&raw_playlist(&["a.mp4", "https://www.youtube.com/watch?v=xyz"]))
        .unwrap();

    let container = Container::new();
    session.provider_mut().unwrap().set_container(container);
    log.clear();

    session.set_item(1).unwrap();

    assert_eq!(session.provider_kind(), Some(ProviderKind::new("youtube")));
    assert_eq!(log.calls_for("html5#1"), vec!["remove_listener(1)", "remove", "destroy"]);
    assert_eq!(
        log.calls_for("youtube#1"),
        vec![
            format!("set_container({})", container),
            "volume(90)".to_string(),
            "mute(false)".to_string(),
            "add_listener(2)".to_string(),
            "init(https://www.youtube.com/watch?v=xyz)".to_string(),
        ]
    );

    let detached = log.position("html5#1:remove_listener(1)").unwrap();
    let handed_over = log.position(&format!("youtube#1:set_container({})", container)).unwrap();
    let destroyed = log.position("html5#1:destroy").unwrap();
    let first_command = log.position("youtube#1:volume(90)").unwrap();
    let attached = log.position("youtube#1:add_listener(2)").unwrap();
    assert!(detached < handed_over);
    assert!(handed_over < destroyed);
    assert!(destroyed < first_command);
    assert!(first_command < attached);
    assert_eq!(session.provider().unwrap().container(), Some(container));
}

#[test]
fn test_swap_without_container() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session
        .set_playlist(&raw_playlist(&["a.mp4", "https://youtu.be/xyz"]))
        .unwrap();
    log.clear();

    session.set_item(1).unwrap();

    assert_eq!(log.calls_for("html5#1"), vec!["remove_listener(1)", "destroy"]);
    assert!(session.provider().unwrap().container().is_none());
}

#[test]
fn test_bind_pushes_audio_settings() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session.set_volume(35.0);
    session.set_mute(Some(true));

    session.bind_provider(Box::new(reel_core::test_helpers::RecordingProvider::new("html5", &log)));

    assert_eq!(
        log.calls_for("html5#1"),
        vec!["volume(35)", "mute(true)", "add_listener(1)"]
    );
}

#[test]
fn test_stale_listener_events_are_dropped() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session
        .set_playlist(&raw_playlist(&["a.mp4", "https://youtu.be/xyz"]))
        .unwrap();
    let old_listener = log.listener("html5#1").unwrap();

    session.set_item(1).unwrap();
    let new_listener = log.listener("youtube#1").unwrap();
    assert!(log.listener("html5#1").is_none());

    old_listener.emit(ProviderEvent::State { new_state: ProviderState::Playing });
    new_listener.emit(ProviderEvent::State { new_state: ProviderState::Paused });

    assert_eq!(session.drain_provider_events(), 1);
    assert_eq!(session.state(), PlayerState::Paused);
}

#[test]
fn test_events_after_teardown_are_dropped() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session.set_playlist(&raw_playlist(&["a.mp4"])).unwrap();
    let listener = log.listener("html5#1").unwrap();

    session.teardown();
    listener.emit(ProviderEvent::Mute { mute: true });

    assert_eq!(session.drain_provider_events(), 0);
    assert!(!session.mute());
}

// =============================================================================
// Event Translation Tests
// =============================================================================

#[test]
fn test_loading_and_stalled_become_buffering() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session.set_playlist(&raw_playlist(&["a.mp4"])).unwrap();
    let seen = collect_events(&mut session);
    let listener = log.listener("html5#1").unwrap();

    listener.emit(ProviderEvent::State { new_state: ProviderState::Loading });
    listener.emit(ProviderEvent::State { new_state: ProviderState::Playing });
    listener.emit(ProviderEvent::State { new_state: ProviderState::Stalled });
    session.drain_provider_events();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            PlayerEvent::StateChanged { new_state: PlayerState::Buffering },
            PlayerEvent::StateChanged { new_state: PlayerState::Playing },
            PlayerEvent::StateChanged { new_state: PlayerState::Buffering },
        ]
    );
    assert_eq!(session.state(), PlayerState::Buffering);
}

#[test]
fn test_every_provider_event_is_forwarded() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    let seen = collect_events(&mut session);

    session.handle_provider_event(ProviderEvent::Mute { mute: true });
    session.handle_provider_event(ProviderEvent::Volume { volume: 12 });
    session.handle_provider_event(ProviderEvent::Buffer { buffer_percent: 80.0 });
    session.handle_provider_event(ProviderEvent::Time { position: 1.5, duration: 20.0 });
    session.handle_provider_event(ProviderEvent::Error { message: "decode failed".to_string() });
    session.handle_provider_event(ProviderEvent::Other {
        kind: "mediaMeta".to_string(),
        payload: json!({ "width": 1280 }),
    });

    let kinds: Vec<String> = seen.lock().unwrap().iter().map(|e| e.kind().to_string()).collect();
    assert_eq!(
        kinds,
        vec![
            "media-mute-changed",
            "media-volume-changed",
            "media-buffer-changed",
            "media-time-changed",
            "error",
            "mediaMeta",
        ]
    );
    assert!(session.mute());
    assert_eq!(session.volume(), 12);
    assert_eq!(session.buffer(), 80.0);
    assert_eq!(session.position(), 1.5);
    assert_eq!(session.duration(), Some(20.0));
}

#[test]
fn test_event_stream_receives_published_events() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    let mut rx = session.event_stream();

    session.set_fullscreen(true);

    let event = tokio_test::block_on(rx.recv()).unwrap();
    assert_eq!(event, PlayerEvent::FullscreenChanged { fullscreen: true });
}

#[test]
fn test_provider_volume_is_clamped() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    let seen = collect_events(&mut session);

    session.handle_provider_event(ProviderEvent::Volume { volume: 200 });

    assert_eq!(session.volume(), 100);
    assert_eq!(*seen.lock().unwrap(), vec![PlayerEvent::VolumeChanged { volume: 100 }]);
}

#[test]
fn test_untyped_event_with_canonical_kind_is_dropped() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    let seen = collect_events(&mut session);

    session.handle_provider_event(ProviderEvent::Other {
        kind: "player-state-changed".to_string(),
        payload: json!({ "newState": "LOADING" }),
    });
    session.handle_provider_event(ProviderEvent::Other {
        kind: "mediaMeta".to_string(),
        payload: json!({ "w": 1 }),
    });

    assert_eq!(session.state(), PlayerState::Idle);
    let events = seen.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(
        serde_json::to_value(&events[0]).unwrap(),
        json!({ "type": "mediaMeta", "w": 1 })
    );
}

// =============================================================================
// Volume / Mute Tests
// =============================================================================

#[test]
fn test_volume_while_muted_unmutes() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session.set_mute(Some(true));

    session.set_volume(50.0);

    assert!(!session.mute());
    assert_eq!(session.volume(), 50);
}

#[test]
fn test_mute_at_zero_volume() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    session.set_volume(0.0);

    session.set_mute(Some(true));

    assert!(session.mute());
    assert_eq!(session.volume(), MUTED_FALLBACK_VOLUME);
}

#[test]
fn test_end_to_end_defaults_mute_and_toggle() {
    let log = CallLog::default();
    let mut session = new_session(&log);
    assert_eq!(session.volume(), 90);
    assert!(!session.mute());

    session.set_mute(Some(true));
    assert_eq!(session.volume(), 90);
    assert!(session.mute());

    session.set_mute(None);
    assert!(!session.mute());
    assert_eq!(session.volume(), 90);
}

#[test]
fn test_settings_survive_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let log = CallLog::default();

    {
        let mut session =
            SessionController::new(Map::new(), registry(&log), Box::new(JsonFileStore::new(path.clone())))
                .unwrap();
        session.set_volume(42.0);
        session.set_mute(Some(true));
    }

    let session =
        SessionController::new(Map::new(), registry(&log), Box::new(JsonFileStore::new(path.clone())))
            .unwrap();
    assert_eq!(session.volume(), 42);
    assert!(session.mute());
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_user_config_overrides_persisted_settings() {
    let log = CallLog::default();
    let mut stored = Map::new();
    stored.insert("volume".to_string(), json!(10));

    let session = SessionController::new(
        user_config(json!({ "volume": "65", "fullscreen": "true", "primary": "youtube" })),
        registry(&log),
        Box::new(MemoryStore::with_settings(stored)),
    )
    .unwrap();

    assert_eq!(session.volume(), 65);
    assert!(session.fullscreen());
    assert_eq!(session.registry().kinds()[0].as_str(), "youtube");
    assert_eq!(session.config_snapshot().get("playlistsize"), Some(&json!(180)));
}

#[test]
fn test_malformed_options_still_build_session() {
    let log = CallLog::default();
    let mut stored = Map::new();
    stored.insert("mute".to_string(), json!("maybe"));
    stored.insert("volume".to_string(), json!(35));

    let mut session = SessionController::new(
        user_config(json!({
            "playlistsize": "big",
            "controls": "yes",
            "playlist": "https://example.com/feed.rss",
            "height": 320.5,
            "stretching": 7,
        })),
        registry(&log),
        Box::new(MemoryStore::with_settings(stored)),
    )
    .unwrap();

    assert_eq!(session.volume(), 35);
    assert!(!session.mute());
    assert_eq!(session.config_snapshot().get("playlistsize"), Some(&json!("big")));
    assert_eq!(session.config_snapshot().get("height"), Some(&json!(320.5)));

    session.set_playlist(&raw_playlist(&["a.mp4"])).unwrap();
    assert_eq!(session.item(), Some(0));
    assert_eq!(session.provider_kind(), Some(ProviderKind::new("html5")));
}
