//! Post-processing: deterministic cleanup of raw OCR output.
//!
//! Tesseract ends every page with a form feed, keeps whatever line endings
//! the platform gives it, and pads lines with trailing spaces where it
//! guessed at column layout. None of that is content. The rules here strip
//! it without touching the recognised words, so the text that reaches the
//! translator is exactly what was on the page.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule can assume `\n`.
//! Blank-line collapsing runs after whitespace trimming, otherwise lines
//! holding only spaces would survive as "non-blank".

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one page of raw OCR output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF, CR → LF)
/// 2. Strip form feeds and other page-break control characters
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive newlines down to one blank line
/// 6. Trim blank lines at the start and end of the page
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_page_breaks(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    trim_blank_edges(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip page breaks ────────────────────────────────────────────────

fn strip_page_breaks(input: &str) -> String {
    input.replace(['\u{000C}', '\u{000B}'], "")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Trim blank edges ─────────────────────────────────────────────────

fn trim_blank_edges(input: &str) -> String {
    input.trim_matches('\n').to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_strip_form_feed() {
        assert_eq!(strip_page_breaks("Seite eins\n\u{000C}"), "Seite eins\n");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hallo   \nwelt  "),
            "  hallo\nwelt"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_typical_tesseract_page() {
        let raw = "Guten Tag   \r\n\r\n\r\n\r\nWie geht's?\n\n\u{000C}";
        assert_eq!(clean_page_text(raw), "Guten Tag\n\nWie geht's?");
    }

    #[test]
    fn test_blank_page_becomes_empty() {
        assert_eq!(clean_page_text(" \n\u{000C}\n  \n"), "");
    }

    #[test]
    fn test_leading_indent_is_kept() {
        assert_eq!(clean_page_text("\n\n    indented\n"), "    indented");
    }
}
