//! The filter-parameter table: option name → selected value → URL fragment.
//!
//! The table is loaded once per run and shared read-only by every URL
//! build. Its declared order is the order fragments appear in the query.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::ConfigError;

/// One filter option and its value → fragment lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    /// Option name, matching a [`RawQuery`](super::RawQuery) field.
    pub name: String,
    /// Selected value → encoded fragment.
    pub values: HashMap<String, String>,
}

/// Ordered filter-parameter table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterTable {
    options: Vec<FilterOption>,
}

impl FilterTable {
    /// Creates a table from options in walk order.
    #[must_use]
    pub fn new(options: Vec<FilterOption>) -> Self {
        Self { options }
    }

    /// The table the image index understands out of the box.
    #[must_use]
    pub fn builtin() -> Self {
        let colors = [
            "red", "orange", "yellow", "green", "teal", "blue", "purple", "pink", "white", "gray",
            "black", "brown",
        ];
        let sizes = [
            ("large", "isz:l"),
            ("medium", "isz:m"),
            ("icon", "isz:i"),
            (">400*300", "isz:lt,islt:qsvga"),
            (">640*480", "isz:lt,islt:vga"),
            (">800*600", "isz:lt,islt:svga"),
            (">1024*768", "visz:lt,islt:xga"),
            (">2MP", "isz:lt,islt:2mp"),
            (">4MP", "isz:lt,islt:4mp"),
            (">6MP", "isz:lt,islt:6mp"),
            (">8MP", "isz:lt,islt:8mp"),
            (">10MP", "isz:lt,islt:10mp"),
            (">12MP", "isz:lt,islt:12mp"),
            (">15MP", "isz:lt,islt:15mp"),
            (">20MP", "isz:lt,islt:20mp"),
            (">40MP", "isz:lt,islt:40mp"),
            (">70MP", "isz:lt,islt:70mp"),
        ];

        let color_values: Vec<(String, String)> = colors
            .iter()
            .map(|c| ((*c).to_string(), format!("ic:specific,isc:{c}")))
            .collect();

        Self::new(vec![
            option_from("color", color_values),
            option(
                "color_type",
                &[
                    ("full-color", "ic:color"),
                    ("black-and-white", "ic:gray"),
                    ("transparent", "ic:trans"),
                ],
            ),
            option(
                "usage_rights",
                &[
                    ("labeled-for-reuse-with-modifications", "sur:fmc"),
                    ("labeled-for-reuse", "sur:fc"),
                    ("labeled-for-noncommercial-reuse-with-modification", "sur:fm"),
                    ("labeled-for-nocommercial-reuse", "sur:f"),
                ],
            ),
            option("size", &sizes),
            option(
                "type",
                &[
                    ("face", "itp:face"),
                    ("photo", "itp:photo"),
                    ("clipart", "itp:clipart"),
                    ("line-drawing", "itp:lineart"),
                    ("animated", "itp:animated"),
                ],
            ),
            option(
                "time",
                &[
                    ("past-24-hours", "qdr:d"),
                    ("past-7-days", "qdr:w"),
                    ("past-month", "qdr:m"),
                    ("past-year", "qdr:y"),
                ],
            ),
            option(
                "aspect_ratio",
                &[
                    ("tall", "iar:t"),
                    ("square", "iar:s"),
                    ("wide", "iar:w"),
                    ("panoramic", "iar:xw"),
                ],
            ),
            option(
                "format",
                &[
                    ("jpg", "ift:jpg"),
                    ("gif", "ift:gif"),
                    ("png", "ift:png"),
                    ("bmp", "ift:bmp"),
                    ("svg", "ift:svg"),
                    ("webp", "webp"),
                    ("ico", "ift:ico"),
                    ("raw", "ift:craw"),
                ],
            ),
        ])
    }

    /// Parses a `{option: [placeholder, {value: fragment}]}` document,
    /// keeping the document's key order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] naming `origin` when the document has
    /// the wrong shape.
    pub fn from_json_str(json: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::parse(origin, e))
    }

    /// Loads a table document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        Self::from_json_str(&contents, path)
    }

    /// Options in walk order.
    #[must_use]
    pub fn options(&self) -> &[FilterOption] {
        &self.options
    }

    /// Rejects selected values the table has no fragment for.
    ///
    /// Options absent from the table are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first unknown value.
    pub fn validate(&self, selection: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        for option in &self.options {
            if let Some(value) = selection.get(&option.name)
                && !option.values.contains_key(value)
            {
                return Err(ConfigError::invalid(
                    &option.name,
                    format!("unknown value '{value}'"),
                ));
            }
        }
        Ok(())
    }

    /// Builds the `&tbs=` query fragment for the selected values.
    ///
    /// Fragments appear in table order, joined by `,`. Unselected options
    /// contribute nothing; the `&tbs=` key is always present.
    #[must_use]
    pub fn fragment(&self, selection: &BTreeMap<String, String>) -> String {
        let parts: Vec<&str> = self
            .options
            .iter()
            .filter_map(|option| {
                let value = selection.get(&option.name)?;
                let fragment = option.values.get(value);
                if fragment.is_none() {
                    warn!(option = %option.name, %value, "no fragment for selected filter value");
                }
                fragment.map(String::as_str)
            })
            .collect();
        format!("&tbs={}", parts.join(","))
    }
}

fn option(name: &str, values: &[(&str, &str)]) -> FilterOption {
    option_from(
        name,
        values
            .iter()
            .map(|(value, fragment)| ((*value).to_string(), (*fragment).to_string()))
            .collect(),
    )
}

fn option_from(name: &str, values: Vec<(String, String)>) -> FilterOption {
    FilterOption {
        name: name.to_string(),
        values: values.into_iter().collect(),
    }
}

impl<'de> Deserialize<'de> for FilterTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = FilterTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of option name to [placeholder, {value: fragment}]")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut options = Vec::new();
                while let Some((name, (_placeholder, values))) =
                    map.next_entry::<String, (IgnoredAny, HashMap<String, String>)>()?
                {
                    options.push(FilterOption { name, values });
                }
                Ok(FilterTable { options })
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn selection(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_fragment_empty_selection() {
        assert_eq!(FilterTable::builtin().fragment(&BTreeMap::new()), "&tbs=");
    }

    #[test]
    fn test_fragment_follows_table_order_not_selection_order() {
        let table = FilterTable::builtin();
        let fragment = table.fragment(&selection(&[("format", "png"), ("color", "red")]));
        assert_eq!(fragment, "&tbs=ic:specific,isc:red,ift:png");
    }

    #[test]
    fn test_fragment_no_leading_comma_when_first_option_unselected() {
        let table = FilterTable::builtin();
        let fragment = table.fragment(&selection(&[("time", "past-year")]));
        assert_eq!(fragment, "&tbs=qdr:y");
    }

    #[test]
    fn test_fragment_skips_unknown_value() {
        let table = FilterTable::builtin();
        let fragment = table.fragment(&selection(&[("color", "mauve"), ("type", "face")]));
        assert_eq!(fragment, "&tbs=itp:face");
    }

    #[test]
    fn test_validate_rejects_unknown_value() {
        let table = FilterTable::builtin();
        assert!(table.validate(&selection(&[("size", "large")])).is_ok());
        let err = table
            .validate(&selection(&[("size", "gigantic")]))
            .unwrap_err();
        assert!(err.to_string().contains("gigantic"));
    }

    #[test]
    fn test_from_json_preserves_document_order() {
        let json = r#"{
            "time": [null, {"past-year": "qdr:y"}],
            "color": [null, {"red": "ic:specific,isc:red"}]
        }"#;
        let table = FilterTable::from_json_str(json, Path::new("url_parms.json")).unwrap();

        let names: Vec<&str> = table.options().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["time", "color"]);
        assert_eq!(
            table.fragment(&selection(&[("color", "red"), ("time", "past-year")])),
            "&tbs=qdr:y,ic:specific,isc:red"
        );
    }

    #[test]
    fn test_from_json_wrong_shape_names_origin() {
        let err =
            FilterTable::from_json_str(r#"{"color": "red"}"#, Path::new("url_parms.json"))
                .unwrap_err();
        assert!(err.to_string().contains("url_parms.json"));
    }

    #[test]
    fn test_builtin_covers_every_filter_option() {
        let table = FilterTable::builtin();
        for name in super::super::FILTER_OPTIONS {
            assert!(
                table.options().iter().any(|o| o.name == name),
                "missing option {name}"
            );
        }
    }
}
