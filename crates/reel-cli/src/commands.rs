//! CLI command implementations

use crate::demo::{self, Script};
use crate::output::{format_output, scalar, OutputFormat};
use anyhow::Context;
use console::style;
use reel_core::config::{default_config, merge_config, read_config_file};
use reel_core::playlist::parse_playlist;
use reel_core::{
    JsonFileStore, MemoryStore, PlayerEvent, PlaylistFilter, RawPlaylistItem, SessionController,
    SettingsStore, SourceFilter,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Build the caller config layer from an optional file and `key=value` overrides
pub fn user_config(file: Option<&Path>, overrides: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut config = match file {
        Some(path) => read_config_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => Map::new(),
    };

    for entry in overrides {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("Expected key=value, got '{}'", entry))?;
        // strings are typed later by the config merge
        config.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
    }

    Ok(config)
}

/// Settings store backing the session
pub fn settings_store(path: Option<PathBuf>) -> Box<dyn SettingsStore> {
    match path {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(MemoryStore::new()),
    }
}

/// Show the merged configuration
pub async fn config(
    user: Map<String, Value>,
    settings: Box<dyn SettingsStore>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let persisted = settings.load().context("Failed to load settings")?;
    let snapshot = merge_config(&default_config(), &persisted, &user);
    let validation = snapshot.typed().err();

    // the playlist is listed by `inspect`
    let mut values = snapshot.as_map().clone();
    if let Some(Value::Array(items)) = values.get("playlist") {
        let summary = format!("{} items", items.len());
        values.insert("playlist".to_string(), Value::String(summary));
    }

    if format != OutputFormat::Json {
        println!("{}", style("Configuration").bold());
    }
    println!("{}", format_output(&values, format));

    // malformed options do not stop a session, they fall back to defaults
    if let Some(e) = validation {
        eprintln!("{} {}", style("warning:").yellow(), e);
    }
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
struct PlaylistRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Type")]
    media_type: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Sources")]
    sources: usize,
    #[tabled(rename = "File")]
    file: String,
}

/// Read a raw playlist from a JSON file
fn read_playlist(path: &Path) -> anyhow::Result<Vec<RawPlaylistItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read playlist {}", path.display()))?;
    Ok(parse_playlist(&content)?)
}

/// Filter a playlist and show what each item would play with
pub async fn inspect(
    playlist: &Path,
    user: Map<String, Value>,
    restricted_hls: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let raw = read_playlist(playlist)?;
    let config = merge_config(&default_config(), &Map::new(), &user).lenient();

    let mut registry = demo::registry(Script::default());
    if let Some(primary) = config.primary.as_deref() {
        registry.set_primary(primary);
    }

    let filtered = SourceFilter::new()
        .with_restricted_hls(restricted_hls)
        .filter(&raw, &registry, config.androidhls);
    debug!(raw = raw.len(), playable = filtered.len(), "Playlist filtered");

    let rows: Vec<PlaylistRow> = filtered
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let source = item.primary_source()?;
            Some(PlaylistRow {
                index,
                title: item.title.clone().unwrap_or_else(|| "-".to_string()),
                media_type: source.media_type.clone(),
                provider: registry
                    .choose(source)
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                sources: item.sources.len(),
                file: source.file.clone(),
            })
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            println!("{}", Table::new(&rows).with(Style::rounded()));
        }
        OutputFormat::Text => {
            println!("Playlist: {}", playlist.display());
            println!("  Items: {}", raw.len());
            println!("  Playable: {}", rows.len());
            for row in &rows {
                println!(
                    "  {}. {} [{} via {}] {}",
                    row.index, row.title, row.media_type, row.provider, row.file
                );
            }
        }
    }

    if rows.is_empty() {
        println!("{}", style("No playable sources found").red());
    }
    Ok(())
}

/// Options of the `play` command
#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub playlist: Option<PathBuf>,
    pub start: i64,
    pub volume: Option<f64>,
    pub mute: bool,
    pub restricted_hls: bool,
    pub script: Script,
    /// Upper bound on items played when the config repeats
    pub max_items: usize,
}

fn describe(event: &PlayerEvent) -> String {
    match event {
        PlayerEvent::StateChanged { new_state } => format!("state     {}", new_state),
        PlayerEvent::TimeChanged { position, duration } => {
            format!("time      {:.1}s / {:.1}s", position, duration)
        }
        PlayerEvent::BufferChanged { buffer_percent } => format!("buffer    {:.0}%", buffer_percent),
        PlayerEvent::MuteChanged { mute } => format!("mute      {}", mute),
        PlayerEvent::VolumeChanged { volume } => format!("volume    {}", volume),
        PlayerEvent::FullscreenChanged { fullscreen } => format!("fullscreen {}", fullscreen),
        PlayerEvent::PlaylistLoaded { playlist } => format!("playlist  {} items", playlist.len()),
        PlayerEvent::PlaylistItemChanged { index } => match index {
            Some(i) => format!("item      {}", i),
            None => "item      -".to_string(),
        },
        PlayerEvent::Error { message } => format!("{} {}", style("error").red(), message),
        PlayerEvent::Provider { kind, payload } => format!("{:<9} {}", kind, scalar(payload)),
    }
}

/// Run a playlist through a session with simulated providers
pub async fn play(
    options: PlayOptions,
    user: Map<String, Value>,
    settings: Box<dyn SettingsStore>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let filter = SourceFilter::new().with_restricted_hls(options.restricted_hls);
    let mut session = SessionController::new(user, demo::registry(options.script), settings)?
        .with_playlist_filter(filter);

    // print events as they are published
    let mut events = session.event_stream();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string(&event).unwrap_or_default())
                    }
                    _ => println!("  {}", describe(&event)),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Some(volume) = options.volume {
        session.set_volume(volume);
    }
    if options.mute {
        session.set_mute(Some(true));
    }

    let raw = match &options.playlist {
        Some(path) => read_playlist(path)?,
        None => session.config().playlist.clone(),
    };

    session.set_playlist(&raw)?;
    if !session.playlist().is_empty() && options.start != 0 {
        session.set_item(options.start)?;
    }

    let len = session.playlist().len();
    let limit = if session.config().repeat { options.max_items } else { len };

    let mut played = 0;
    while played < limit {
        let Some(current) = session.item() else {
            break;
        };
        if let Some(provider) = session.provider_mut() {
            provider.play();
        }
        let handled = session.drain_provider_events();
        debug!(item = current, handled, "Item played");
        played += 1;
        tokio::task::yield_now().await;

        if current + 1 == len && !session.config().repeat {
            break;
        }
        if played < limit {
            session.set_item(current as i64 + 1)?;
        }
    }

    let snapshot = session.snapshot();
    drop(session);
    printer.await?;

    if format != OutputFormat::Json {
        println!("\n{}", style("Session").bold());
        println!("{}", format_output(&snapshot, format));
        println!("  items played: {}", played);
    }
    Ok(())
}
