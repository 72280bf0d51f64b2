//! File naming for persisted images.
//!
//! Names come from the last path segment of the (already percent-decoded)
//! image URL. The query string is dropped, a known image extension is kept
//! or `.jpg` is forced, and the configured prefix/suffix wrap the stem.

use std::path::{Component, Path};

/// Extensions kept as-is; anything else gets `.jpg` appended.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 8] =
    ["jpg", "jpeg", "gif", "png", "bmp", "svg", "webp", "ico"];

/// Extension forced onto names without an allowed one.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Stem used when a URL has no usable last segment.
const FALLBACK_STEM: &str = "image";

/// What to do when the target file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Pick `name_2.ext`, `name_3.ext`, ... instead.
    Rename,
}

/// Prefix and suffix applied to every saved file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileNaming {
    /// Placed before the stem, separated by a space.
    pub prefix: Option<String>,
    /// Placed after the stem, before the extension, separated by a space.
    pub suffix: Option<String>,
}

impl FileNaming {
    /// Creates a naming rule; empty strings count as unset.
    #[must_use]
    pub fn new(prefix: Option<String>, suffix: Option<String>) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()),
            suffix: suffix.filter(|s| !s.is_empty()),
        }
    }

    /// Derives the file name for `image_url`.
    ///
    /// # Examples
    ///
    /// ```
    /// use image_harvester::storage::FileNaming;
    ///
    /// let plain = FileNaming::default();
    /// assert_eq!(plain.file_name("https://example.com/a.png?x=1"), "a.png");
    ///
    /// let wrapped = FileNaming::new(Some("pre".into()), Some("suf".into()));
    /// assert_eq!(wrapped.file_name("https://example.com/a.png?x=1"), "pre a suf.png");
    /// ```
    #[must_use]
    pub fn file_name(&self, image_url: &str) -> String {
        let segment = image_url.rsplit('/').next().unwrap_or_default();
        let segment = segment.split('?').next().unwrap_or_default();

        let (mut stem, extension) = split_image_extension(segment);
        if stem.is_empty() {
            stem = FALLBACK_STEM;
        }

        let mut name = String::new();
        if let Some(prefix) = &self.prefix {
            name.push_str(prefix);
            name.push(' ');
        }
        name.push_str(stem);
        if let Some(suffix) = &self.suffix {
            name.push(' ');
            name.push_str(suffix);
        }
        name.push('.');
        name.push_str(extension);

        sanitize_filename(&name)
    }
}

/// Splits `segment` into stem and allowed extension, forcing
/// [`DEFAULT_EXTENSION`] when the segment has none.
fn split_image_extension(segment: &str) -> (&str, &str) {
    if let Some((stem, ext)) = segment.rsplit_once('.')
        && ALLOWED_IMAGE_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed))
    {
        return (stem, ext);
    }
    (segment, DEFAULT_EXTENSION)
}

/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Candidate name for the `index`-th collision of `file_name`
/// (`a.png` → `a_2.png` for index 2).
pub(crate) fn numbered_file_name(file_name: &str, index: usize) -> String {
    match file_name.rfind('.') {
        Some(pos) => format!("{}_{index}{}", &file_name[..pos], &file_name[pos..]),
        None => format!("{file_name}_{index}"),
    }
}

/// Human-readable size, e.g. `12.3 KB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
