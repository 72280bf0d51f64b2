//! Run configuration: the raw option record and the documents it comes from.
//!
//! A [`RawQuery`] is what the command line (or one entry of a `Records`
//! config file) says, before any expansion. It is never mutated after
//! construction; [`crate::query::expand`] clones what it needs.

mod error;
mod filters;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

pub use error::ConfigError;
pub use filters::{FilterOption, FilterTable};

/// Default number of results per query when `limit` is unset.
pub const DEFAULT_LIMIT: u32 = 1;

/// Default output root when `output_directory` is unset.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "Downloads";

/// Names of the options that select a filter-table fragment.
pub const FILTER_OPTIONS: [&str; 8] = [
    "color",
    "color_type",
    "usage_rights",
    "size",
    "type",
    "time",
    "aspect_ratio",
    "format",
];

/// One configuration record, exactly as supplied.
///
/// Unset options are `None`/`false`. An empty string is treated as unset
/// everywhere it is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawQuery {
    /// Comma-delimited keywords.
    pub keywords: Option<String>,
    /// Path to a `.txt`/`.csv` file of additional keywords.
    pub keywords_from_file: Option<String>,
    /// Comma-delimited words placed before each keyword.
    pub prefix_keywords: Option<String>,
    /// Comma-delimited words placed after each keyword.
    pub suffix_keywords: Option<String>,
    /// Results to download per query.
    #[serde(deserialize_with = "lenient_u32")]
    pub limit: Option<u32>,
    /// Results to skip before counting toward `limit`.
    #[serde(deserialize_with = "lenient_u32")]
    pub offset: Option<u32>,
    /// Image format filter.
    pub format: Option<String>,
    /// Dominant color filter; also names the sub-directory.
    pub color: Option<String>,
    /// Color type filter.
    pub color_type: Option<String>,
    /// Usage rights filter.
    pub usage_rights: Option<String>,
    /// Image size filter.
    pub size: Option<String>,
    /// Image type filter.
    #[serde(rename = "type")]
    pub image_type: Option<String>,
    /// Image age filter.
    pub time: Option<String>,
    /// Aspect ratio filter.
    pub aspect_ratio: Option<String>,
    /// Explicit result-page URL; skips term assembly.
    pub url: Option<String>,
    /// One image URL to download directly; skips searching.
    pub single_image: Option<String>,
    /// Image URL whose visually similar images are searched.
    pub similar_images: Option<String>,
    /// Restrict results to one domain.
    pub specific_site: Option<String>,
    /// Output root directory.
    pub output_directory: Option<String>,
    /// Extra directory level above the keyword sub-directory.
    pub image_directory: Option<String>,
    /// Write straight into the output root.
    #[serde(deserialize_with = "lenient_bool")]
    pub no_directory: bool,
    /// Proxy address (`host:port`).
    pub proxy: Option<String>,
    /// Log each image URL as it is discovered.
    #[serde(deserialize_with = "lenient_bool")]
    pub print_urls: bool,
    /// Include file sizes in completion messages.
    #[serde(deserialize_with = "lenient_bool")]
    pub print_size: bool,
    /// Per-fetch timeout in seconds.
    #[serde(deserialize_with = "lenient_f64")]
    pub socket_timeout: Option<f64>,
    /// Also download each result's thumbnail.
    #[serde(deserialize_with = "lenient_bool")]
    pub thumbnail: bool,
    /// Download only thumbnails.
    #[serde(deserialize_with = "lenient_bool")]
    pub thumbnail_only: bool,
    /// Word placed before every saved file name.
    pub prefix: Option<String>,
    /// Word placed after every saved file stem.
    pub suffix: Option<String>,
    /// Ask the index to filter explicit results.
    #[serde(deserialize_with = "lenient_bool")]
    pub safe_search: bool,
    /// Discover and report results without downloading them.
    #[serde(deserialize_with = "lenient_bool")]
    pub no_download: bool,
    /// Comma-delimited substrings; matching image URLs are skipped.
    pub ignore_urls: Option<String>,
    /// Suppress console narration.
    #[serde(deserialize_with = "lenient_bool")]
    pub silent_mode: bool,
    /// File (under the output root) receiving one line per saved image.
    pub save_source: Option<String>,
}

impl RawQuery {
    /// Returns the selected value of the named filter option, if any.
    #[must_use]
    pub fn filter_value(&self, option: &str) -> Option<&str> {
        let value = match option {
            "color" => &self.color,
            "color_type" => &self.color_type,
            "usage_rights" => &self.usage_rights,
            "size" => &self.size,
            "type" => &self.image_type,
            "time" => &self.time,
            "aspect_ratio" => &self.aspect_ratio,
            "format" => &self.format,
            _ => return None,
        };
        non_empty(value.as_ref())
    }

    /// Selected filter values keyed by option name.
    #[must_use]
    pub fn filter_selection(&self) -> BTreeMap<String, String> {
        FILTER_OPTIONS
            .iter()
            .filter_map(|name| {
                self.filter_value(name)
                    .map(|value| ((*name).to_string(), value.to_string()))
            })
            .collect()
    }

    /// Configured per-fetch timeout, if any and positive.
    #[must_use]
    pub fn socket_timeout(&self) -> Option<Duration> {
        self.socket_timeout
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// Returns `Some(s)` only for a non-empty string.
#[must_use]
pub fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Loads every record of a `{"Records": [...]}` document, each overlaid on
/// `base` (record keys win, everything else is inherited).
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, is not JSON, has no
/// `Records` array, or a record has a value of the wrong type.
pub fn load_records(path: &Path, base: &RawQuery) -> Result<Vec<RawQuery>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
    let document: Value =
        serde_json::from_str(&contents).map_err(|e| ConfigError::parse(path, e))?;
    let Some(records) = document.get("Records").and_then(Value::as_array) else {
        return Err(ConfigError::MissingRecords {
            path: path.to_path_buf(),
        });
    };

    debug!(path = %path.display(), records = records.len(), "loaded config records");

    records
        .iter()
        .enumerate()
        .map(|(index, record)| overlay(base, record, index))
        .collect()
}

fn overlay(base: &RawQuery, record: &Value, index: usize) -> Result<RawQuery, ConfigError> {
    let mut merged = serde_json::to_value(base).map_err(|e| ConfigError::Record { index, source: e })?;
    if let (Value::Object(target), Value::Object(fields)) = (&mut merged, record) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(merged).map_err(|e| ConfigError::Record { index, source: e })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(flag),
        Some(Value::String(s)) => Ok(matches!(
            s.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )),
        Some(Value::Number(n)) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a boolean, got {other}"
        ))),
    }
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected a whole number, got {s:?}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a whole number, got {n}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a whole number, got {other}"
        ))),
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}"))),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_raw_query_deserializes_lenient_values() {
        let raw: RawQuery = serde_json::from_str(
            r#"{"keywords":"cat","limit":"5","offset":2,"thumbnail":null,
                "safe_search":"true","socket_timeout":"3.5","type":"photo"}"#,
        )
        .unwrap();
        assert_eq!(raw.keywords.as_deref(), Some("cat"));
        assert_eq!(raw.limit, Some(5));
        assert_eq!(raw.offset, Some(2));
        assert!(!raw.thumbnail);
        assert!(raw.safe_search);
        assert_eq!(raw.socket_timeout, Some(3.5));
        assert_eq!(raw.image_type.as_deref(), Some("photo"));
    }

    #[test]
    fn test_raw_query_rejects_negative_limit() {
        let result: Result<RawQuery, _> = serde_json::from_str(r#"{"limit":-1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_raw_query_ignores_unknown_keys() {
        let raw: RawQuery =
            serde_json::from_str(r#"{"keywords":"cat","chromedriver":"/usr/bin/cd"}"#).unwrap();
        assert_eq!(raw.keywords.as_deref(), Some("cat"));
    }

    #[test]
    fn test_filter_selection_skips_empty_values() {
        let raw = RawQuery {
            color: Some("red".to_string()),
            size: Some(String::new()),
            image_type: Some("photo".to_string()),
            ..RawQuery::default()
        };
        let selection = raw.filter_selection();
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.get("color").map(String::as_str), Some("red"));
        assert_eq!(selection.get("type").map(String::as_str), Some("photo"));
    }

    #[test]
    fn test_socket_timeout_ignores_non_positive() {
        let mut raw = RawQuery::default();
        assert_eq!(raw.socket_timeout(), None);
        raw.socket_timeout = Some(0.0);
        assert_eq!(raw.socket_timeout(), None);
        raw.socket_timeout = Some(2.5);
        assert_eq!(raw.socket_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_load_records_overlays_base() {
        let file = write_config(
            r#"{"Records":[
                {"keywords":"cat","limit":3},
                {"url":"https://example.com/search?q=dog","safe_search":true}
            ]}"#,
        );
        let base = RawQuery {
            output_directory: Some("out".to_string()),
            limit: Some(1),
            ..RawQuery::default()
        };

        let records = load_records(file.path(), &base).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].keywords.as_deref(), Some("cat"));
        assert_eq!(records[0].limit, Some(3));
        assert_eq!(records[0].output_directory.as_deref(), Some("out"));
        assert_eq!(records[1].limit, Some(1));
        assert!(records[1].safe_search);
        assert!(records[1].keywords.is_none());
    }

    #[test]
    fn test_load_records_missing_array() {
        let file = write_config(r#"{"records":[]}"#);
        let result = load_records(file.path(), &RawQuery::default());
        assert!(matches!(result, Err(ConfigError::MissingRecords { .. })));
    }

    #[test]
    fn test_load_records_bad_json() {
        let file = write_config("{not json");
        let result = load_records(file.path(), &RawQuery::default());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_records_missing_file() {
        let result = load_records(Path::new("/nonexistent/records.json"), &RawQuery::default());
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_load_records_reports_bad_record_index() {
        let file = write_config(r#"{"Records":[{"keywords":"cat"},{"limit":"many"}]}"#);
        let result = load_records(file.path(), &RawQuery::default());
        assert!(matches!(result, Err(ConfigError::Record { index: 1, .. })));
    }
}
