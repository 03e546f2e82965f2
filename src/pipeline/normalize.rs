//! Markdown normalisation of extracted page content.
//!
//! Page content arrives either as HTML (from HTML-producing extractors) or as
//! the plain text layer lopdf decodes. HTML goes through `htmd`, which emits
//! ATX headings (`#`, `##`, …) and keeps lists and emphasis; plain text has no
//! structure to recover and passes through.
//!
//! Both paths then run the same cheap, deterministic cleanup rules, in order:
//!
//! 1. Normalise line endings (CRLF/CR → LF)
//! 2. Trim trailing whitespace per line
//! 3. Collapse 3+ consecutive blank lines down to 2
//! 4. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//!
//! Every function here is pure except [`save_markdown`].

use crate::error::SummaryError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

static RE_HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)<(?:html|body|p|div|span|br|h[1-6]|ul|ol|li|table|tr|td|th|strong|em|b|i|u|a|pre|code|blockquote)\b[^>]*>",
    )
    .unwrap()
});

/// `true` when the input contains at least one recognisable HTML tag.
pub fn looks_like_html(input: &str) -> bool {
    RE_HTML_TAG.is_match(input)
}

/// Convert one page of HTML or plain text into clean markdown.
pub fn to_markdown(input: &str) -> Result<String, SummaryError> {
    let converted = if looks_like_html(input) {
        htmd::convert(input).map_err(|e| {
            SummaryError::Internal(format!("HTML to markdown conversion failed: {e}"))
        })?
    } else {
        input.to_string()
    };
    Ok(clean_text(&converted))
}

/// Apply the cleanup rules without any HTML conversion.
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    remove_invisible_chars(&s)
}

/// Join page markdown with a blank line and write it as one UTF-8 file.
///
/// Parent directories are created as needed; an existing file is replaced.
pub fn save_markdown<S: AsRef<str>>(
    pages: &[S],
    output_path: impl AsRef<Path>,
) -> Result<PathBuf, SummaryError> {
    let path = output_path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SummaryError::render(path, e))?;
    }
    let joined = join_pages(pages);
    std::fs::write(path, joined.as_bytes()).map_err(|e| SummaryError::render(path, e))?;
    debug!("Saved {} pages of markdown to {}", pages.len(), path.display());
    Ok(path.to_path_buf())
}

/// Pages joined by a blank-line separator.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n")
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

/// Remove a single code fence wrapping the whole input, if present.
pub(crate) fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 3: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 4: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let input = "Patient seen on 01/02/2020.\nFollow-up in 2 weeks.";
        assert_eq!(to_markdown(input).unwrap(), input);
    }

    #[test]
    fn plain_text_is_not_mistaken_for_html() {
        assert!(!looks_like_html("BP < 120 and HR > 60"));
        assert!(looks_like_html("<p>hello</p>"));
        assert!(looks_like_html("<H2 class=\"x\">Title</H2>"));
    }

    #[test]
    fn html_headings_become_atx() {
        let md = to_markdown("<h1>Progress Note</h1><h2>Assessment</h2><p>Stable.</p>").unwrap();
        assert!(md.contains("# Progress Note"), "got: {md}");
        assert!(md.contains("## Assessment"), "got: {md}");
        assert!(md.contains("Stable."));
        assert!(!md.contains("<h1>"));
    }

    #[test]
    fn html_lists_and_emphasis_survive() {
        let md = to_markdown("<ul><li>Lisinopril</li><li>Metformin</li></ul><p><strong>Allergies</strong></p>")
            .unwrap();
        assert!(md.contains("Lisinopril"));
        assert!(md.contains("Metformin"));
        assert!(md.contains("**Allergies**"), "got: {md}");
        assert!(!md.contains("<li>"));
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("  hello   \nworld  "), "  hello\nworld");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(
            remove_invisible_chars("hello\u{200B}world\u{FEFF}foo\u{00AD}bar"),
            "helloworldfoobar"
        );
    }

    #[test]
    fn strip_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn save_markdown_creates_parents_and_joins_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/pages.md");
        save_markdown(&["# Page 1", "Page 2 text"], &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "# Page 1\n\nPage 2 text");
    }
}
