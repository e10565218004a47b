//! # Interpolation primitives
//!
//! Table macros in the backing store cannot take bound parameters, so any
//! value that reaches macro-call SQL text goes through exactly one of these
//! two functions:
//!
//! - [`sanitize_identifier`] for table, column, macro and argument names
//! - [`escape_string_literal`] for values placed inside `'...'`

/// Keep only ASCII letters, digits and underscore.
///
/// Every other character is dropped silently. The result is always a
/// subsequence of the input and may be empty.
pub fn sanitize_identifier(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Double every single quote. No other transformation is applied.
pub fn escape_string_literal(s: &str) -> String {
    s.replace('\'', "''")
}

/// Quote an already-escaped value as a SQL string literal.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", escape_string_literal(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_subsequence(needle: &str, haystack: &str) -> bool {
        let mut rest = haystack.chars();
        needle.chars().all(|c| rest.any(|h| h == c))
    }

    #[test]
    fn test_sanitize_injection_attempt() {
        assert_eq!(
            sanitize_identifier("html; DROP TABLE users;--"),
            "htmlDROPTABLEusers"
        );
    }

    #[test]
    fn test_sanitize_keeps_valid_identifiers() {
        assert_eq!(sanitize_identifier("render_index"), "render_index");
        assert_eq!(sanitize_identifier("Pages2024"), "Pages2024");
    }

    #[test]
    fn test_sanitize_drops_quotes_dots_and_unicode() {
        assert_eq!(sanitize_identifier("\"main\".\"pages\""), "mainpages");
        assert_eq!(sanitize_identifier("päge-ñame"), "pgeame");
        assert_eq!(sanitize_identifier("(){}[]"), "");
        assert_eq!(sanitize_identifier(""), "");
    }

    #[test]
    fn test_sanitize_output_alphabet_and_subsequence() {
        let inputs = [
            "a b\tc",
            "x'; DROP TABLE t; --",
            "макро_1",
            "__init__",
            "1=1 OR 'a'='a'",
            "tab\u{0}le",
        ];
        for input in inputs {
            let out = sanitize_identifier(input);
            assert!(out
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_'));
            assert!(is_subsequence(&out, input), "{out:?} not in {input:?}");
        }
    }

    #[test]
    fn test_escape_doubles_single_quotes_only() {
        assert_eq!(escape_string_literal("it's"), "it''s");
        assert_eq!(escape_string_literal("''"), "''''");
        assert_eq!(escape_string_literal("no quotes"), "no quotes");
        assert_eq!(escape_string_literal("\"double\" \\ ; --"), "\"double\" \\ ; --");
    }

    #[test]
    fn test_escape_count_invariant() {
        let inputs = ["'", "a'b'c", "'; DROP TABLE users; --", "ü'ñ'"];
        for input in inputs {
            let out = escape_string_literal(input);
            let quotes_in = input.matches('\'').count();
            assert_eq!(out.matches('\'').count(), quotes_in * 2);
            assert_eq!(out.len(), input.len() + quotes_in);
            assert_eq!(out.replace("''", "'"), input);
        }
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_literal(""), "''");
    }
}
