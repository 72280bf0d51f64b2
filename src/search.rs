//! Search URL construction.
//!
//! Turns a [`QueryRecord`] into the result-page URL to fetch. Explicit URLs
//! pass through; keyword and similar-image records get a term that is
//! percent-encoded into the image-search query together with the filter
//! fragment.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::FilterTable;
use crate::download::Fetcher;
use crate::query::{QueryRecord, SearchMode};

/// Appended last when safe search is requested.
pub const SAFE_SEARCH_QUALIFIER: &str = "&safe=active";

const SEARCH_PARAMS: &str = "&espv=2&biw=1366&bih=667&site=webhp&source=lnms&tbm=isch";
const SEARCH_TRAILER: &str = "&sa=X&ei=XosDVaCXD8TasATItgE&ved=0CAcQ_AUoAg";

/// Start of the image-match token in a search-by-image response.
const TOKEN_START: &str = "AMhZZ";
/// Start of the resolved phrase in a token-qualified search response.
const PHRASE_START: &str = "/search?sa=X&amp;q=";

/// Base URLs of the image index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEndpoints {
    /// Keyword search endpoint.
    pub search: String,
    /// Search-by-image endpoint.
    pub search_by_image: String,
}

impl Default for SearchEndpoints {
    fn default() -> Self {
        Self {
            search: "https://www.google.com/search".to_string(),
            search_by_image: "https://www.google.com/searchbyimage".to_string(),
        }
    }
}

impl SearchEndpoints {
    /// Points both endpoints at `base` (`{base}/search`, `{base}/searchbyimage`).
    #[must_use]
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            search: format!("{base}/search"),
            search_by_image: format!("{base}/searchbyimage"),
        }
    }
}

/// Joins the non-empty parts of `prefix keyword suffix` with single spaces.
#[must_use]
pub fn keyword_term(prefix: &str, keyword: &str, suffix: &str) -> String {
    [prefix, keyword, suffix]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Assembles the image-search URL for an already resolved `term`.
#[must_use]
pub fn assemble_search_url(endpoints: &SearchEndpoints, term: &str, filter_fragment: &str) -> String {
    format!(
        "{}?q={}{SEARCH_PARAMS}{filter_fragment}{SEARCH_TRAILER}",
        endpoints.search,
        urlencoding::encode(term)
    )
}

/// Builds the result-page URL for `record`.
///
/// Returns `None` for single-image records, which are never searched.
/// Resolving a similar-images record issues two fetches through `fetcher`;
/// if either fails the term degrades to empty and the URL is still built.
#[instrument(level = "debug", skip_all, fields(mode = ?record.mode))]
pub async fn build_search_url(
    record: &QueryRecord,
    filters: &FilterTable,
    endpoints: &SearchEndpoints,
    fetcher: &dyn Fetcher,
    timeout: Duration,
) -> Option<String> {
    let options = &record.options;
    let site = options
        .specific_site
        .as_ref()
        .map(|domain| format!("+site:{domain}"))
        .unwrap_or_default();

    let mut url = match &record.mode {
        SearchMode::SingleImage(_) => return None,
        SearchMode::Url(url) => url.clone(),
        SearchMode::Keywords {
            prefix,
            keyword,
            suffix,
        } => {
            let term = format!("{}{site}", keyword_term(prefix, keyword, suffix));
            assemble_search_url(endpoints, &term, &filters.fragment(&options.filters))
        }
        SearchMode::SimilarImages(image_url) => {
            let phrase = resolve_similar_term(image_url, endpoints, fetcher, timeout)
                .await
                .unwrap_or_default();
            let term = format!("{phrase}{site}");
            assemble_search_url(endpoints, &term, &filters.fragment(&options.filters))
        }
    };

    if options.safe_search {
        url.push_str(SAFE_SEARCH_QUALIFIER);
    }
    debug!(url = %url, "built search url");
    Some(url)
}

/// Resolves the search phrase the index associates with `image_url`.
///
/// Returns `None` (after logging a warning) when either fetch fails or a
/// delimiter is missing from a response.
pub async fn resolve_similar_term(
    image_url: &str,
    endpoints: &SearchEndpoints,
    fetcher: &dyn Fetcher,
    timeout: Duration,
) -> Option<String> {
    let lookup_url = format!(
        "{}?site=search&sa=X&image_url={image_url}",
        endpoints.search_by_image
    );
    debug!(url = %lookup_url, "looking up images similar to source");

    let lookup = match fetcher.fetch_text(&lookup_url, timeout).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "unable to complete similar image search");
            return None;
        }
    };
    let Some(token) = delimited(&lookup, TOKEN_START, "&", true) else {
        warn!(url = %lookup_url, "no image-match token in similar image response");
        return None;
    };

    let token_url = format!("{}?tbs=sbi:{token}&site=search&sa=X", endpoints.search);
    let results = match fetcher.fetch_text(&token_url, timeout).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "unable to complete similar image search");
            return None;
        }
    };
    let Some(phrase) = delimited(&results, PHRASE_START, ";", false) else {
        warn!(url = %token_url, "no search phrase in similar image response");
        return None;
    };

    debug!(phrase, "resolved similar image phrase");
    Some(phrase.to_string())
}

/// Text from `start` (kept when `inclusive`) up to the next `end` after it.
fn delimited<'a>(text: &'a str, start: &str, end: &str, inclusive: bool) -> Option<&'a str> {
    let from = text.find(start)?;
    let body_start = if inclusive { from } else { from + start.len() };
    let len = text[from + start.len()..].find(end)? + (from + start.len() - body_start);
    Some(&text[body_start..body_start + len])
}
