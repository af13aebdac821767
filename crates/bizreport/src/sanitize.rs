//! Helpers for keeping paths, service responses and identifiers safe to log
//! and safe to use as file names.

use std::path::Path;

/// Maximum length of an upstream error body kept in logs and job records.
pub const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Truncates a response body from an external service so it can be logged or
/// stored as an error message without flooding either.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut cut = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (truncated)", &body[..cut])
}

/// Returns true when `name` can be used verbatim as a file stem: lowercase
/// ASCII letters, digits, `_` and `-`, not empty and not starting with `-`.
pub fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Escapes the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/srv/reports/job-1/manifest.json")),
            "manifest.json"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_truncate_body_short_is_unchanged() {
        assert_eq!(truncate_body("rate limited"), "rate limited");
    }

    #[test]
    fn test_truncate_body_long_is_cut() {
        let body = "x".repeat(500);
        let out = truncate_body(&body);
        assert!(out.ends_with("... (truncated)"));
        assert_eq!(out.len(), MAX_ERROR_BODY_LENGTH + "... (truncated)".len());
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(300);
        let out = truncate_body(&body);
        assert!(out.ends_with("... (truncated)"));
    }

    #[test]
    fn test_safe_file_stem() {
        assert!(is_safe_file_stem("executive_summary"));
        assert!(is_safe_file_stem("swot-analysis2"));
        assert!(!is_safe_file_stem(""));
        assert!(!is_safe_file_stem("../etc"));
        assert!(!is_safe_file_stem("-flag"));
        assert!(!is_safe_file_stem("Upper"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"A&B's"</b>"#),
            "&lt;b&gt;&quot;A&amp;B&#39;s&quot;&lt;/b&gt;"
        );
    }
}
