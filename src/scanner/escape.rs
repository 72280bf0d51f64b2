//! Backslash-escape decoding for embedded metadata blocks.

use thiserror::Error;

/// Why a block could not be unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscapeError {
    /// A `\x`, `\u` or `\U` escape was cut short or held non-hex digits.
    #[error("truncated or non-hex escape at byte {at}")]
    BadHex {
        /// Byte offset of the backslash within the block.
        at: usize,
    },
    /// A `\u`/`\U` escape named a value that is not a Unicode scalar.
    #[error("escape at byte {at} names invalid code point {value:#x}")]
    InvalidCodePoint {
        /// Byte offset of the backslash within the block.
        at: usize,
        /// The decoded value.
        value: u32,
    },
}

/// Decodes backslash escapes in `input`.
///
/// Recognised: `\n \r \t \\ \' \" \/ \b \f \a \v \0`, `\xHH`, `\uHHHH` and
/// `\UHHHHHHHH`. Any other escape is kept verbatim, backslash included.
///
/// # Errors
///
/// Returns [`EscapeError`] when a hex escape is truncated, holds a non-hex
/// digit, or names a surrogate or out-of-range code point.
pub fn decode_escapes(input: &str) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices();

    while let Some((at, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some((_, escape)) = chars.next() else {
            // Trailing lone backslash.
            out.push('\\');
            break;
        };
        let simple = match escape {
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            '\\' => Some('\\'),
            '\'' => Some('\''),
            '"' => Some('"'),
            '/' => Some('/'),
            'b' => Some('\u{08}'),
            'f' => Some('\u{0c}'),
            'a' => Some('\u{07}'),
            'v' => Some('\u{0b}'),
            '0' => Some('\0'),
            _ => None,
        };
        if let Some(decoded) = simple {
            out.push(decoded);
            continue;
        }

        let digits = match escape {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            other => {
                out.push('\\');
                out.push(other);
                continue;
            }
        };

        let mut value: u32 = 0;
        for _ in 0..digits {
            let digit = chars
                .next()
                .and_then(|(_, d)| d.to_digit(16))
                .ok_or(EscapeError::BadHex { at })?;
            value = value * 16 + digit;
        }
        let decoded = char::from_u32(value).ok_or(EscapeError::InvalidCodePoint { at, value })?;
        out.push(decoded);
    }

    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_text_unchanged() {
        assert_eq!(decode_escapes("{\"ou\":\"a\"}").unwrap(), "{\"ou\":\"a\"}");
    }

    #[test]
    fn test_decode_simple_escapes() {
        assert_eq!(
            decode_escapes(r"a\nb\tc\\d\/e\'f").unwrap(),
            "a\nb\tc\\d/e'f"
        );
    }

    #[test]
    fn test_decode_hex_and_unicode_escapes() {
        assert_eq!(
            decode_escapes(r"q\u003dcat\x26x\U0001F600").unwrap(),
            "q=cat&x\u{1F600}"
        );
    }

    #[test]
    fn test_decode_unknown_escape_kept_verbatim() {
        assert_eq!(decode_escapes(r"C:\q\z").unwrap(), r"C:\q\z");
    }

    #[test]
    fn test_decode_trailing_backslash_kept() {
        assert_eq!(decode_escapes("abc\\").unwrap(), "abc\\");
    }

    #[test]
    fn test_decode_truncated_hex_is_error() {
        assert_eq!(decode_escapes(r"ab\u00").unwrap_err(), EscapeError::BadHex { at: 2 });
        assert_eq!(decode_escapes(r"\xzz").unwrap_err(), EscapeError::BadHex { at: 0 });
    }

    #[test]
    fn test_decode_surrogate_is_error() {
        let err = decode_escapes(r"\ud83d").unwrap_err();
        assert!(matches!(err, EscapeError::InvalidCodePoint { value: 0xd83d, .. }));
    }
}
