//! Expansion of one raw record into independent query records.

use std::path::Path;

use tracing::{debug, instrument, warn};

use super::{QueryOptions, QueryRecord, SearchMode};
use crate::config::{ConfigError, RawQuery, non_empty};

/// Keyword files must have one of these extensions.
const KEYWORD_FILE_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// Expands `raw` into one record per unit of work.
///
/// Order: the URL record, then the similar-images record, then the keyword
/// product (prefix outer, suffix middle, keyword inner). A `single_image`
/// record short-circuits everything else. Duplicate combinations are kept.
///
/// # Errors
///
/// Returns [`ConfigError::NoSearchTerms`] if `raw` yields no record.
#[instrument(level = "debug", skip(raw))]
pub fn expand(raw: &RawQuery) -> Result<Vec<QueryRecord>, ConfigError> {
    let options = QueryOptions::from_raw(raw);

    if let Some(single_image) = non_empty(raw.single_image.as_ref()) {
        return Ok(vec![QueryRecord::new(
            SearchMode::SingleImage(single_image.to_string()),
            options,
        )]);
    }

    let mut keywords = raw.keywords.clone().unwrap_or_default();
    if let Some(path) = non_empty(raw.keywords_from_file.as_ref()) {
        let imported = read_keywords_file(Path::new(path));
        if !imported.is_empty() {
            if !keywords.is_empty() {
                keywords.push(',');
            }
            keywords.push_str(&imported);
        }
    }

    let mut records = Vec::new();

    if let Some(url) = non_empty(raw.url.as_ref()) {
        records.push(QueryRecord::new(
            SearchMode::Url(url.to_string()),
            options.clone(),
        ));
    }

    if let Some(similar) = non_empty(raw.similar_images.as_ref()) {
        records.push(QueryRecord::new(
            SearchMode::SimilarImages(similar.to_string()),
            options.clone(),
        ));
    }

    let prefix_keywords = raw.prefix_keywords.as_deref().unwrap_or_default();
    let suffix_keywords = raw.suffix_keywords.as_deref().unwrap_or_default();
    if !keywords.is_empty() || !prefix_keywords.is_empty() || !suffix_keywords.is_empty() {
        for prefix in prefix_keywords.split(',') {
            for suffix in suffix_keywords.split(',') {
                for keyword in keywords.split(',') {
                    records.push(QueryRecord::new(
                        SearchMode::Keywords {
                            prefix: prefix.to_string(),
                            keyword: keyword.to_string(),
                            suffix: suffix.to_string(),
                        },
                        options.clone(),
                    ));
                }
            }
        }
    }

    if records.is_empty() {
        return Err(ConfigError::NoSearchTerms);
    }

    debug!(records = records.len(), "expanded query");
    Ok(records)
}

/// Reads a keyword file into one comma-delimited list.
///
/// Each non-empty line is trimmed and joined with `,`. Unsupported
/// extensions and unreadable files yield `""` with a warning.
#[must_use]
pub fn read_keywords_file(path: &Path) -> String {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            KEYWORD_FILE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        });
    if !supported {
        warn!(
            path = %path.display(),
            allowed = ?KEYWORD_FILE_EXTENSIONS,
            "unable to import keywords file: unsupported extension"
        );
        return String::new();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(","),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unable to import keywords file");
            String::new()
        }
    }
}
