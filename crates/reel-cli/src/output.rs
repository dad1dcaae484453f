//! Output formatting for CLI

use serde::Serialize;
use serde_json::Value;
use tabled::{builder::Builder, settings::Style};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Format output based on selected format
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> String {
    let value = serde_json::to_value(data).unwrap_or_default();
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => key_value_table(&value),
        OutputFormat::Text => key_value_lines(&value),
    }
}

/// Render a JSON value as a compact scalar
pub fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn entries(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), scalar(v))).collect(),
        other => vec![("value".to_string(), scalar(other))],
    }
}

fn key_value_lines(value: &Value) -> String {
    let entries = entries(value);
    let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|(k, v)| format!("  {:width$}  {}", k, v, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn key_value_table(value: &Value) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Key", "Value"]);
    for (k, v) in entries(value) {
        builder.push_record([k, v]);
    }
    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Text);
    }

    #[test]
    fn test_text_output_aligns_keys() {
        let text = format_output(&json!({ "mute": false, "volume": 90 }), OutputFormat::Text);
        assert_eq!(text, "  mute    false\n  volume  90");
    }

    #[test]
    fn test_json_output() {
        let text = format_output(&json!({ "id": null }), OutputFormat::Json);
        assert_eq!(text, "{\n  \"id\": null\n}");
    }
}
