//! Incremental scanner for per-result metadata embedded in result pages.
//!
//! A result page carries one metadata block per result:
//!
//! ```text
//! <div class="rg_meta notranslate">{"ou":"https://...","tu":"...", ...}</div>
//! ```
//!
//! [`next_result`] finds the next block at or after a cursor, decodes it and
//! returns the cursor to resume from. A block that fails to decode is
//! reported as [`ScanStep::Malformed`] and skipped; it never stops the scan.

mod escape;

use serde::Deserialize;
use tracing::{debug, trace};

pub use escape::{EscapeError, decode_escapes};

/// Text that immediately precedes every metadata block.
pub const META_MARKER: &str = r#"class="rg_meta notranslate">"#;

/// Text that closes a metadata block.
pub const BLOCK_END: &str = "</div>";

/// Decoded metadata of one search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResultMetadata {
    /// Full-size image URL.
    #[serde(rename = "ou")]
    pub image_link: String,
    /// Thumbnail URL.
    #[serde(rename = "tu")]
    pub thumbnail_link: String,
    /// Image width in pixels.
    #[serde(rename = "ow")]
    pub width: u32,
    /// Image height in pixels.
    #[serde(rename = "oh")]
    pub height: u32,
    /// Format tag (`jpg`, `png`, ... or empty).
    #[serde(rename = "ity")]
    pub format: String,
    /// Result description.
    #[serde(rename = "pt")]
    pub description: String,
    /// Host of the page the image appears on.
    #[serde(rename = "rh")]
    pub host: String,
    /// Page the image appears on.
    #[serde(rename = "ru")]
    pub source_page: String,
}

/// Outcome of one scanner step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStep {
    /// A well-formed block was decoded.
    Found(ResultMetadata),
    /// A block was located but could not be decoded.
    Malformed(String),
    /// No marker at or after the cursor; stop scanning this page.
    NoMoreResults,
}

/// Finds and decodes the next metadata block at or after `cursor`.
///
/// # Arguments
///
/// * `page` - Raw result-page markup
/// * `cursor` - Byte offset to resume from (`0` for a fresh page)
///
/// # Returns
///
/// The step and the cursor to pass to the next call:
/// - `NoMoreResults` always comes with cursor `0`.
/// - `Found` and `Malformed` come with the offset right after the block's
///   closing `</div>`, or `page.len()` if the block has no `{` or is never
///   closed.
///
/// The function is pure: the same `(page, cursor)` always yields the same
/// answer.
///
/// # Examples
///
/// ```
/// use image_harvester::scanner::{ScanStep, next_result};
///
/// let (step, cursor) = next_result("<html>no results</html>", 0);
/// assert_eq!(step, ScanStep::NoMoreResults);
/// assert_eq!(cursor, 0);
/// ```
#[must_use]
pub fn next_result(page: &str, cursor: usize) -> (ScanStep, usize) {
    let Some(marker_at) = page.get(cursor..).and_then(|rest| rest.find(META_MARKER)) else {
        return (ScanStep::NoMoreResults, 0);
    };
    let after_marker = cursor + marker_at + META_MARKER.len();

    let Some(open) = page[after_marker..].find('{') else {
        return (
            ScanStep::Malformed("block has no opening brace".to_string()),
            page.len(),
        );
    };
    let block_start = after_marker + open;

    let Some(close) = page[block_start..].find(BLOCK_END) else {
        return (
            ScanStep::Malformed("block is never closed".to_string()),
            page.len(),
        );
    };
    let block_end = block_start + close;
    let next_cursor = block_end + BLOCK_END.len();

    trace!(start = block_start, end = block_end, "located metadata block");
    (parse_block(&page[block_start..block_end]), next_cursor)
}

fn parse_block(block: &str) -> ScanStep {
    let decoded = match decode_escapes(block) {
        Ok(decoded) => decoded,
        Err(e) => return ScanStep::Malformed(e.to_string()),
    };
    match serde_json::from_str::<ResultMetadata>(&decoded) {
        Ok(metadata) => ScanStep::Found(metadata),
        Err(e) => ScanStep::Malformed(e.to_string()),
    }
}

/// Results accepted from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    /// Accepted results, in page order.
    pub results: Vec<ResultMetadata>,
    /// Blocks skipped because they failed to decode.
    pub malformed: usize,
    /// Well-formed results skipped by the offset.
    pub skipped: usize,
    /// Cursor after the last block consumed.
    pub cursor: usize,
}

/// Scans `page` from the start, skipping the first `offset` well-formed
/// results and accepting up to `limit` after them.
///
/// Malformed blocks count toward neither.
#[must_use]
pub fn scan_page(page: &str, offset: u32, limit: u32) -> PageScan {
    let mut scan = PageScan::default();
    let limit = limit as usize;
    let offset = offset as usize;

    while scan.results.len() < limit {
        let (step, next) = next_result(page, scan.cursor);
        match step {
            ScanStep::NoMoreResults => break,
            ScanStep::Malformed(reason) => {
                debug!(cursor = scan.cursor, %reason, "skipping malformed result block");
                scan.malformed += 1;
            }
            ScanStep::Found(metadata) => {
                if scan.skipped < offset {
                    scan.skipped += 1;
                } else {
                    scan.results.push(metadata);
                }
            }
        }
        scan.cursor = next;
    }

    debug!(
        accepted = scan.results.len(),
        skipped = scan.skipped,
        malformed = scan.malformed,
        "scanned result page"
    );
    scan
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn block(image: &str) -> String {
        format!(
            r#"<div class="rg_meta notranslate">{{"ou":"{image}","tu":"https://t.example/{image_tail}","ow":640,"oh":480,"ity":"png","pt":"a picture","rh":"example.com","ru":"https://example.com/page"}}</div>"#,
            image_tail = image.rsplit('/').next().unwrap()
        )
    }

    fn found(step: ScanStep) -> ResultMetadata {
        match step {
            ScanStep::Found(metadata) => metadata,
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_no_marker_returns_no_more_results_at_zero() {
        let long = "<div>plain</div>".repeat(500);
        for page in ["", "x", long.as_str()] {
            for cursor in [0, page.len()] {
                assert_eq!(next_result(page, cursor), (ScanStep::NoMoreResults, 0));
            }
        }
    }

    #[test]
    fn test_cursor_past_end_is_no_more_results() {
        let page = block("https://example.com/a.png");
        assert_eq!(next_result(&page, page.len() + 10), (ScanStep::NoMoreResults, 0));
    }

    #[test]
    fn test_found_decodes_all_fields() {
        let page = format!("<html>{}</html>", block("https://example.com/a.png"));
        let (step, cursor) = next_result(&page, 0);
        let metadata = found(step);
        assert_eq!(metadata.image_link, "https://example.com/a.png");
        assert_eq!(metadata.thumbnail_link, "https://t.example/a.png");
        assert_eq!((metadata.width, metadata.height), (640, 480));
        assert_eq!(metadata.format, "png");
        assert_eq!(metadata.description, "a picture");
        assert_eq!(metadata.host, "example.com");
        assert_eq!(metadata.source_page, "https://example.com/page");
        assert_eq!(cursor, page.len() - "</html>".len());
    }

    #[test]
    fn test_found_decodes_escaped_link() {
        let page = block(r"https:\/\/example.com\/a.png?w\u003d1");
        let metadata = found(next_result(&page, 0).0);
        assert_eq!(metadata.image_link, "https://example.com/a.png?w=1");
    }

    #[test]
    fn test_replay_is_idempotent() {
        let page = format!(
            "{}{}",
            block("https://example.com/a.png"),
            block("https://example.com/b.png")
        );
        let first = next_result(&page, 0);
        assert_eq!(first, next_result(&page, 0));
        let second = next_result(&page, first.1);
        assert_eq!(second, next_result(&page, first.1));
        assert_eq!(found(second.0).image_link, "https://example.com/b.png");
    }

    #[test]
    fn test_missing_key_is_malformed_and_advances() {
        let page = r#"<div class="rg_meta notranslate">{"ou":"https://example.com/a.png"}</div>tail"#;
        let (step, cursor) = next_result(page, 0);
        assert!(matches!(step, ScanStep::Malformed(_)));
        assert_eq!(&page[cursor..], "tail");
    }

    #[test]
    fn test_unclosed_block_is_malformed_at_page_end() {
        let page = r#"<div class="rg_meta notranslate">{"ou":"#;
        let (step, cursor) = next_result(page, 0);
        assert!(matches!(step, ScanStep::Malformed(_)));
        assert_eq!(cursor, page.len());
        assert_eq!(next_result(page, cursor), (ScanStep::NoMoreResults, 0));
    }

    #[test]
    fn test_block_without_brace_is_malformed_at_page_end() {
        let page = r#"<div class="rg_meta notranslate">nothing here"#;
        assert_eq!(next_result(page, 0).1, page.len());
    }

    #[test]
    fn test_malformed_then_well_formed() {
        let bad = r#"<div class="rg_meta notranslate">{"ou": broken</div>"#;
        let page = format!("{bad}{}", block("https://example.com/b.png"));

        let scan = scan_page(&page, 0, 10);
        assert_eq!(scan.results.len(), 1);
        assert_eq!(scan.results[0].image_link, "https://example.com/b.png");
        assert_eq!(scan.malformed, 1);
        assert_eq!(scan.cursor, page.len());
    }

    #[test]
    fn test_scan_page_applies_offset_then_limit() {
        let page: String = ["a", "b", "c", "d"]
            .iter()
            .map(|n| block(&format!("https://example.com/{n}.png")))
            .collect();

        let scan = scan_page(&page, 1, 2);
        let links: Vec<&str> = scan.results.iter().map(|r| r.image_link.as_str()).collect();
        assert_eq!(links, ["https://example.com/b.png", "https://example.com/c.png"]);
        assert_eq!(scan.skipped, 1);
    }

    #[test]
    fn test_scan_page_offset_ignores_malformed_blocks() {
        let bad = r#"<div class="rg_meta notranslate">{}</div>"#;
        let page = format!(
            "{bad}{}{}",
            block("https://example.com/a.png"),
            block("https://example.com/b.png")
        );
        let scan = scan_page(&page, 1, 5);
        assert_eq!(scan.results.len(), 1);
        assert_eq!(scan.results[0].image_link, "https://example.com/b.png");
    }

    #[test]
    fn test_scan_page_zero_limit_reads_nothing() {
        let page = block("https://example.com/a.png");
        assert_eq!(scan_page(&page, 0, 0), PageScan::default());
    }
}
