//! Resolved units of search work.
//!
//! [`expand`] turns one [`RawQuery`](crate::config::RawQuery) into an ordered
//! list of [`QueryRecord`]s. Each record owns its own copy of every option,
//! so records can be handed to independent tasks without sharing state.

mod expand;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub use expand::{expand, read_keywords_file};

use crate::config::{DEFAULT_LIMIT, DEFAULT_OUTPUT_DIRECTORY, RawQuery, non_empty};

/// The single search-mode discriminator of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// One keyword combination.
    Keywords {
        /// Word placed before the keyword (may be empty).
        prefix: String,
        /// The keyword (may be empty when only prefix/suffix were given).
        keyword: String,
        /// Word placed after the keyword (may be empty).
        suffix: String,
    },
    /// An explicit result-page URL.
    Url(String),
    /// An image URL whose visually similar images are searched.
    SimilarImages(String),
    /// A single image downloaded directly, with no search.
    SingleImage(String),
}

/// Every option a record needs besides its search mode.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Results to download.
    pub limit: u32,
    /// Results skipped before counting toward `limit`.
    pub offset: u32,
    /// Selected filter values keyed by option name.
    pub filters: BTreeMap<String, String>,
    /// Color filter, also part of the sub-directory name.
    pub color: Option<String>,
    /// Domain restriction.
    pub specific_site: Option<String>,
    /// Append the safe-search qualifier.
    pub safe_search: bool,
    /// Output root.
    pub output_directory: PathBuf,
    /// Extra directory level above the keyword directory.
    pub image_directory: Option<String>,
    /// Write into the output root directly.
    pub no_directory: bool,
    /// Log discovered image URLs.
    pub print_urls: bool,
    /// Include sizes in completion messages.
    pub print_size: bool,
    /// Also fetch thumbnails.
    pub thumbnail: bool,
    /// Fetch thumbnails only.
    pub thumbnail_only: bool,
    /// Discover without downloading.
    pub no_download: bool,
    /// Saved file name prefix.
    pub prefix: Option<String>,
    /// Saved file name suffix.
    pub suffix: Option<String>,
    /// Image URL substrings to skip.
    pub ignore_urls: Vec<String>,
    /// Source log file name under the output root.
    pub save_source: Option<String>,
    /// Per-fetch timeout override.
    pub socket_timeout: Option<Duration>,
    /// Keep this record's narration out of the console.
    pub silent_mode: bool,
}

impl QueryOptions {
    /// Extracts the non-discriminator options of `raw`.
    #[must_use]
    pub fn from_raw(raw: &RawQuery) -> Self {
        let owned = |value: Option<&String>| non_empty(value).map(str::to_string);
        Self {
            limit: raw.limit.unwrap_or(DEFAULT_LIMIT),
            offset: raw.offset.unwrap_or(0),
            filters: raw.filter_selection(),
            color: owned(raw.color.as_ref()),
            specific_site: owned(raw.specific_site.as_ref()),
            safe_search: raw.safe_search,
            output_directory: PathBuf::from(
                non_empty(raw.output_directory.as_ref()).unwrap_or(DEFAULT_OUTPUT_DIRECTORY),
            ),
            image_directory: owned(raw.image_directory.as_ref()),
            no_directory: raw.no_directory,
            print_urls: raw.print_urls,
            print_size: raw.print_size,
            thumbnail: raw.thumbnail,
            thumbnail_only: raw.thumbnail_only,
            no_download: raw.no_download,
            prefix: owned(raw.prefix.as_ref()),
            suffix: owned(raw.suffix.as_ref()),
            ignore_urls: non_empty(raw.ignore_urls.as_ref())
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            save_source: owned(raw.save_source.as_ref()),
            socket_timeout: raw.socket_timeout(),
            silent_mode: raw.silent_mode,
        }
    }
}

/// One fully bound unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    /// What this record searches for.
    pub mode: SearchMode,
    /// Everything else.
    pub options: QueryOptions,
}

impl QueryRecord {
    /// Creates a record from a mode and options.
    #[must_use]
    pub fn new(mode: SearchMode, options: QueryOptions) -> Self {
        Self { mode, options }
    }

    /// Bound keyword, or `""` outside keyword mode.
    #[must_use]
    pub fn keywords(&self) -> &str {
        match &self.mode {
            SearchMode::Keywords { keyword, .. } => keyword,
            _ => "",
        }
    }

    /// Bound prefix keyword, or `""` outside keyword mode.
    #[must_use]
    pub fn prefix_keywords(&self) -> &str {
        match &self.mode {
            SearchMode::Keywords { prefix, .. } => prefix,
            _ => "",
        }
    }

    /// Bound suffix keyword, or `""` outside keyword mode.
    #[must_use]
    pub fn suffix_keywords(&self) -> &str {
        match &self.mode {
            SearchMode::Keywords { suffix, .. } => suffix,
            _ => "",
        }
    }

    /// Bound result-page URL, if in URL mode.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match &self.mode {
            SearchMode::Url(url) => Some(url),
            _ => None,
        }
    }

    /// Bound similar-image URL, if in similar-images mode.
    #[must_use]
    pub fn similar_images(&self) -> Option<&str> {
        match &self.mode {
            SearchMode::SimilarImages(url) => Some(url),
            _ => None,
        }
    }

    /// Bound single-image URL, if this record bypasses search.
    #[must_use]
    pub fn single_image(&self) -> Option<&str> {
        match &self.mode {
            SearchMode::SingleImage(url) => Some(url),
            _ => None,
        }
    }

    /// Output sub-directory for this record's results.
    ///
    /// `""` when `no_directory` is set; otherwise
    /// `[image_directory/][prefix ]keyword[ suffix][ - color]`.
    #[must_use]
    pub fn sub_directory(&self) -> String {
        let options = &self.options;
        if options.no_directory {
            return String::new();
        }

        let mut sub_dir = String::new();
        if let Some(image_directory) = &options.image_directory {
            sub_dir.push_str(image_directory);
            sub_dir.push('/');
        }
        if !self.prefix_keywords().is_empty() {
            sub_dir.push_str(self.prefix_keywords());
            sub_dir.push(' ');
        }
        sub_dir.push_str(self.keywords());
        if !self.suffix_keywords().is_empty() {
            sub_dir.push(' ');
            sub_dir.push_str(self.suffix_keywords());
        }
        if let Some(color) = &options.color {
            sub_dir.push_str(" - ");
            sub_dir.push_str(color);
        }
        sub_dir
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn keyword_record(prefix: &str, keyword: &str, suffix: &str, raw: &RawQuery) -> QueryRecord {
        QueryRecord::new(
            SearchMode::Keywords {
                prefix: prefix.to_string(),
                keyword: keyword.to_string(),
                suffix: suffix.to_string(),
            },
            QueryOptions::from_raw(raw),
        )
    }

    #[test]
    fn test_options_defaults() {
        let options = QueryOptions::from_raw(&RawQuery::default());
        assert_eq!(options.limit, 1);
        assert_eq!(options.offset, 0);
        assert_eq!(options.output_directory, PathBuf::from("Downloads"));
        assert!(options.ignore_urls.is_empty());
        assert!(options.filters.is_empty());
    }

    #[test]
    fn test_options_split_ignore_urls() {
        let raw = RawQuery {
            ignore_urls: Some("ads.example, ,tracker.net".to_string()),
            ..RawQuery::default()
        };
        assert_eq!(
            QueryOptions::from_raw(&raw).ignore_urls,
            ["ads.example", "tracker.net"]
        );
    }

    #[test]
    fn test_options_carry_silent_mode() {
        assert!(!QueryOptions::from_raw(&RawQuery::default()).silent_mode);
        let raw = RawQuery {
            silent_mode: true,
            ..RawQuery::default()
        };
        assert!(QueryOptions::from_raw(&raw).silent_mode);
    }

    #[test]
    fn test_accessors_clear_keyword_family_outside_keyword_mode() {
        let record = QueryRecord::new(
            SearchMode::Url("https://example.com/search".to_string()),
            QueryOptions::from_raw(&RawQuery::default()),
        );
        assert_eq!(record.keywords(), "");
        assert_eq!(record.prefix_keywords(), "");
        assert_eq!(record.suffix_keywords(), "");
        assert_eq!(record.url(), Some("https://example.com/search"));
        assert!(record.similar_images().is_none());
        assert!(record.single_image().is_none());
    }

    #[test]
    fn test_sub_directory_keyword_only() {
        let record = keyword_record("", "cat", "", &RawQuery::default());
        assert_eq!(record.sub_directory(), "cat");
    }

    #[test]
    fn test_sub_directory_full_policy() {
        let raw = RawQuery {
            image_directory: Some("pets".to_string()),
            color: Some("red".to_string()),
            ..RawQuery::default()
        };
        let record = keyword_record("big", "cat", "toy", &raw);
        assert_eq!(record.sub_directory(), "pets/big cat toy - red");
    }

    #[test]
    fn test_sub_directory_no_directory_wins() {
        let raw = RawQuery {
            image_directory: Some("pets".to_string()),
            no_directory: true,
            ..RawQuery::default()
        };
        let record = keyword_record("big", "cat", "", &raw);
        assert_eq!(record.sub_directory(), "");
    }
}
