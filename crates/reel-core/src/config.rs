//! Player configuration
//!
//! The configuration snapshot is built once per session by layering
//! persisted user settings and caller overrides on top of the default
//! table. Every layer goes through [`normalize_value`] so that string
//! values coming from storage or the command line recover their type.

use crate::{
    playlist::RawPlaylistItem,
    types::{Dimension, Stretching},
    Error, Result,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::path::Path;
use tracing::{debug, warn};

/// Longest numeric string that is still coerced into a number
const MAX_NUMERIC_LEN: usize = 5;

/// Typed view of the player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Start playback on load (consumed by the embedding player)
    pub autostart: bool,
    /// Show the control bar
    pub controls: bool,
    /// Initial seek-drag flag
    pub dragging: bool,
    /// Initial fullscreen flag
    pub fullscreen: bool,
    pub height: Dimension,
    pub mobilecontrols: bool,
    /// Initial mute flag
    pub mute: bool,
    /// Initial raw playlist
    pub playlist: Vec<RawPlaylistItem>,
    pub playlistposition: String,
    pub playlistsize: u32,
    pub playlistlayout: String,
    pub repeat: bool,
    pub stretching: Stretching,
    pub width: Dimension,
    /// Initial volume (0-100)
    pub volume: f64,
    /// Player id used in log fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Provider kind to try first when several can play a source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    /// Allow HLS sources on platforms with restricted native HLS
    pub androidhls: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            autostart: false,
            controls: true,
            dragging: false,
            fullscreen: false,
            height: Dimension::Pixels(320),
            mobilecontrols: false,
            mute: false,
            playlist: Vec::new(),
            playlistposition: "none".to_string(),
            playlistsize: 180,
            playlistlayout: "extended".to_string(),
            repeat: false,
            stretching: Stretching::Uniform,
            width: Dimension::Pixels(480),
            volume: 90.0,
            id: None,
            primary: None,
            androidhls: false,
        }
    }
}

/// The built-in default table
pub fn default_config() -> Map<String, Value> {
    match serde_json::to_value(PlayerConfig::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Restore the type of a value that may have been stored as a string.
///
/// `"true"`/`"false"` become booleans, short numeric strings become
/// numbers, anything else is returned untouched.
pub fn normalize_value(value: Value) -> Value {
    let Value::String(text) = value else {
        return value;
    };

    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if text.is_empty() || text.len() > MAX_NUMERIC_LEN {
        return Value::String(text);
    }

    match text.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Value::from(n as i64)
            } else {
                Number::from_f64(n).map(Value::Number).unwrap_or(Value::String(text))
            }
        }
        _ => Value::String(text),
    }
}

/// Merge defaults, persisted settings and user config, in that order
pub fn merge_config(
    defaults: &Map<String, Value>,
    persisted: &Map<String, Value>,
    user: &Map<String, Value>,
) -> ConfigSnapshot {
    let mut values = defaults.clone();
    for (key, value) in persisted.iter().chain(user.iter()) {
        values.insert(key.clone(), value.clone());
    }

    let values: Map<String, Value> = values
        .into_iter()
        .map(|(key, value)| (key, normalize_value(value)))
        .collect();

    debug!(keys = values.len(), "Configuration merged");

    ConfigSnapshot { values }
}

/// Read a JSON object of config overrides from disk
pub fn read_config_file(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str(&content)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidConfig(format!(
            "{} must contain a JSON object, found {}",
            path.display(),
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Immutable merged configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigSnapshot {
    values: Map<String, Value>,
}

impl ConfigSnapshot {
    /// Snapshot of the default table alone
    pub fn defaults() -> Self {
        merge_config(&default_config(), &Map::new(), &Map::new())
    }

    /// Look up an option
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Option names in the snapshot
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Decode the snapshot into the typed view, failing on the first
    /// malformed option
    pub fn typed(&self) -> Result<PlayerConfig> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Decode the snapshot option by option. A malformed option is logged
    /// and replaced by its default in the typed view; the snapshot itself
    /// keeps the value as given.
    pub fn lenient(&self) -> PlayerConfig {
        let defaults = PlayerConfig::default();
        PlayerConfig {
            autostart: self.option("autostart", defaults.autostart),
            controls: self.option("controls", defaults.controls),
            dragging: self.option("dragging", defaults.dragging),
            fullscreen: self.option("fullscreen", defaults.fullscreen),
            height: self.option("height", defaults.height),
            mobilecontrols: self.option("mobilecontrols", defaults.mobilecontrols),
            mute: self.option("mute", defaults.mute),
            playlist: self.option("playlist", defaults.playlist),
            playlistposition: self.option("playlistposition", defaults.playlistposition),
            playlistsize: self.option("playlistsize", defaults.playlistsize),
            playlistlayout: self.option("playlistlayout", defaults.playlistlayout),
            repeat: self.option("repeat", defaults.repeat),
            stretching: self.option("stretching", defaults.stretching),
            width: self.option("width", defaults.width),
            volume: self.option("volume", defaults.volume),
            id: self.option("id", defaults.id),
            primary: self.option("primary", defaults.primary),
            androidhls: self.option("androidhls", defaults.androidhls),
        }
    }

    fn option<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(value) = self.values.get(key) else {
            return default;
        };
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(key, value = %value, error = %e, "Ignoring malformed option");
                default
            }
        }
    }
}
