//! Filesystem-safe tokens for artifact names.
//!
//! School names arrive in mixed scripts with spaces, parentheses and
//! punctuation. Word characters (which include CJK ideographs) and `-` are
//! kept; every other run becomes a single `_`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest token [`sanitize`] returns, in characters.
pub const MAX_TOKEN_CHARS: usize = 80;

static UNSAFE_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\w\x{4e00}-\x{9fff}-]+").expect("valid sanitiser regex")
});

/// Map an arbitrary label to a token safe to embed in a file name.
///
/// Pure and total: the empty string maps to the empty string.
pub fn sanitize(label: &str) -> String {
    let replaced = UNSAFE_RUN.replace_all(label, "_");
    replaced
        .trim_matches('_')
        .chars()
        .take(MAX_TOKEN_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_become_underscore() {
        assert_eq!(sanitize("Alpha High"), "Alpha_High");
    }

    #[test]
    fn runs_collapse_and_edges_trim() {
        assert_eq!(sanitize("  (Alpha)  / High!! "), "Alpha_High");
    }

    #[test]
    fn cjk_and_hyphen_survive() {
        assert_eq!(sanitize("臺北市立 建國高中-夜間部"), "臺北市立_建國高中-夜間部");
    }

    #[test]
    fn truncates_to_eighty_chars() {
        let long = "校".repeat(100);
        let token = sanitize(&long);
        assert_eq!(token.chars().count(), MAX_TOKEN_CHARS);
    }

    #[test]
    fn path_separators_are_removed() {
        let token = sanitize("../etc/passwd");
        assert!(!token.contains('/'));
        assert!(!token.contains('.'));
        assert_eq!(token, "etc_passwd");
    }

    #[test]
    fn punctuation_only_is_empty() {
        assert_eq!(sanitize("()!!"), "");
        assert_eq!(sanitize(""), "");
    }
}
