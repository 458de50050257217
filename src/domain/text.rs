//! Text helpers for Telegram entity ranges.
//!
//! Telegram reports entity offsets and lengths in UTF-16 code units: a code point above
//! U+FFFF takes 2 units, everything else takes 1.

/// Number of UTF-16 code units `c` occupies.
fn utf16_width(c: char) -> usize {
    if (c as u32) > 0xFFFF { 2 } else { 1 }
}

/// Extract the substring covering `[offset, offset + length)` in UTF-16 code units.
///
/// Returns an empty string for a negative offset, a non-positive length, or a range that
/// runs past the end of `s`.
pub fn extract_utf16_substring(s: &str, offset: i32, length: i32) -> String {
    if offset < 0 || length <= 0 {
        return String::new();
    }
    let offset = offset as usize;
    let end = offset + length as usize;

    let mut pos = 0usize;
    let mut start: Option<usize> = None;
    let mut stop: Option<usize> = None;

    for (byte_idx, c) in s.char_indices() {
        if start.is_none() && pos >= offset {
            start = Some(byte_idx);
        }
        pos += utf16_width(c);
        if pos >= end {
            stop = Some(byte_idx + c.len_utf8());
            break;
        }
    }

    match (start, stop) {
        (Some(a), Some(b)) if a < b => s[a..b].to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        assert_eq!(extract_utf16_substring("Hello, World!", 7, 5), "World");
        assert_eq!(extract_utf16_substring("Hello", 0, 5), "Hello");
        assert_eq!(extract_utf16_substring("A", 0, 1), "A");
    }

    #[test]
    fn test_cyrillic_counts_one_unit_per_char() {
        assert_eq!(extract_utf16_substring("Привет, мир!", 8, 3), "мир");
        assert_eq!(extract_utf16_substring("Привет", 0, 6), "Привет");
        assert_eq!(
            extract_utf16_substring("Ссылка: https://example.com", 8, 19),
            "https://example.com"
        );
    }

    #[test]
    fn test_surrogate_pairs_count_two_units() {
        assert_eq!(extract_utf16_substring("Hello 👋 World", 6, 2), "👋");
        assert_eq!(extract_utf16_substring("Hello 👋 World", 9, 5), "World");
        assert_eq!(extract_utf16_substring("🎉🎊🎁", 2, 2), "🎊");
        assert_eq!(extract_utf16_substring("Привет 👋 мир", 7, 2), "👋");
        assert_eq!(extract_utf16_substring("🔥", 0, 2), "🔥");
        assert_eq!(extract_utf16_substring("Hi 🇺🇸 there", 3, 4), "🇺🇸");
    }

    #[test]
    fn test_invalid_ranges_yield_empty() {
        assert_eq!(extract_utf16_substring("", 0, 1), "");
        assert_eq!(extract_utf16_substring("Hello", -1, 3), "");
        assert_eq!(extract_utf16_substring("Hello", 0, 0), "");
        assert_eq!(extract_utf16_substring("Hello", 0, -1), "");
        assert_eq!(extract_utf16_substring("Hello", 10, 1), "");
        assert_eq!(extract_utf16_substring("Hello", 0, 100), "");
    }
}
