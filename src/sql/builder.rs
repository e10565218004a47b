//! # Query builder
//!
//! Turns a classified route into SQL text plus bindings.
//!
//! Direct table lookups bind the identifier as a parameter. Macro calls
//! cannot be parameterized, so their arguments are interpolated through
//! [`sanitize_identifier`] and [`escape_string_literal`] only.
//!
//! [`escape_string_literal`]: super::escape_string_literal

use crate::config::HandlerConfig;

use super::query::{Literal, MacroInvocation, SqlQuery};
use super::sanitize::sanitize_identifier;

/// Maximum number of characters of a search term sent to the search macro
pub const MAX_SEARCH_TERM_CHARS: usize = 200;

/// Argument name every macro receives for link generation
pub const BASE_PATH_ARG: &str = "base_path";

/// Builds SQL for one handler configuration
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    config: &'a HandlerConfig,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(config: &'a HandlerConfig) -> Self {
        Self { config }
    }

    /// Single record, either through the record macro or a bound lookup
    pub fn record(&self, id: &str) -> SqlQuery {
        let html_column = sanitize_identifier(&self.config.html_column);

        if let Some(record_macro) = &self.config.record_macro {
            return MacroInvocation::new(record_macro.as_str())
                .arg("id", Literal::Text(id.to_string()))
                .select(&html_column);
        }

        let mut text = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            html_column,
            sanitize_identifier(&self.config.table),
            sanitize_identifier(&self.config.id_column),
        );
        // Operator configuration, not request input.
        if let Some(clause) = &self.config.where_clause {
            text.push_str(&format!(" AND ({})", clause));
        }

        SqlQuery::new(text).bind(id)
    }

    /// Paginated index page
    pub fn index(&self, page: u32, base_path: &str) -> SqlQuery {
        MacroInvocation::new(self.config.index_macro.as_str())
            .arg("page", Literal::Integer(i64::from(page)))
            .arg(BASE_PATH_ARG, Literal::Text(base_path.to_string()))
            .select("html")
    }

    /// Search results fragment for a (normalized) term
    pub fn search(&self, term: &str, base_path: &str) -> SqlQuery {
        MacroInvocation::new(self.config.search_macro.as_str())
            .arg("term", Literal::Text(normalize_search_term(term)))
            .arg(BASE_PATH_ARG, Literal::Text(base_path.to_string()))
            .select("html")
    }

    /// Tabular report; every query parameter becomes a named argument.
    ///
    /// Only the first value of a repeated parameter is used. A `base_path`
    /// argument is added unless the caller supplied a non-empty one.
    pub fn table_report(&self, params: &[(String, String)], base_path: &str) -> SqlQuery {
        let macro_name = self.config.table_macro.as_deref().unwrap_or_default();
        let mut invocation = MacroInvocation::new(macro_name);

        for (name, value) in params {
            let sanitized = sanitize_identifier(name);
            if sanitized.is_empty() || invocation.has_arg(&sanitized) {
                continue;
            }
            if sanitized == BASE_PATH_ARG && value.is_empty() {
                continue;
            }
            invocation.push_arg(&sanitized, Literal::infer(value));
        }

        if !invocation.has_arg(BASE_PATH_ARG) {
            invocation.push_arg(BASE_PATH_ARG, Literal::Text(base_path.to_string()));
        }

        invocation.select("*")
    }

    /// Bounded read against the configured table
    pub fn table_probe(&self) -> SqlQuery {
        SqlQuery::new(format!(
            "SELECT 1 FROM {} LIMIT 1",
            sanitize_identifier(&self.config.table)
        ))
    }

    /// Catalog lookup for a table macro by name
    pub fn macro_probe(&self, macro_name: &str) -> SqlQuery {
        SqlQuery::new(
            "SELECT 1 FROM duckdb_functions() \
             WHERE function_name = ? AND function_type = 'table_macro' LIMIT 1",
        )
        .bind(macro_name)
    }
}

/// Trim surrounding whitespace and keep at most 200 characters
pub fn normalize_search_term(term: &str) -> String {
    term.trim().chars().take(MAX_SEARCH_TERM_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HandlerConfig {
        let mut config = HandlerConfig::for_table("pages");
        config.validate().unwrap();
        config
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_record_plain_binds_identifier() {
        let config = config();
        let query = QueryBuilder::new(&config).record("x'; DROP TABLE pages; --");

        assert_eq!(query.text, "SELECT html FROM pages WHERE id = ?");
        assert_eq!(query.params, vec!["x'; DROP TABLE pages; --".to_string()]);
    }

    #[test]
    fn test_record_plain_with_where_clause() {
        let mut config = config();
        config.where_clause = Some("status = 'published'".to_string());
        config.table = "site.pages".to_string();
        config.html_column = "body html".to_string();

        let query = QueryBuilder::new(&config).record("home");
        assert_eq!(
            query.text,
            "SELECT bodyhtml FROM sitepages WHERE id = ? AND (status = 'published')"
        );
    }

    #[test]
    fn test_record_macro_interpolates_escaped_identifier() {
        let mut config = config();
        config.record_macro = Some("render_page".to_string());

        let query = QueryBuilder::new(&config).record("o'brien");
        assert_eq!(
            query.text,
            "SELECT html FROM render_page(id := 'o''brien')"
        );
        assert!(!query.has_params());
    }

    #[test]
    fn test_index_page_is_bare_number() {
        let config = config();
        let query = QueryBuilder::new(&config).index(4, "/docs");
        assert_eq!(
            query.text,
            "SELECT html FROM render_index(page := 4, base_path := '/docs')"
        );
    }

    #[test]
    fn test_search_escapes_term_and_base_path() {
        let config = config();
        let query = QueryBuilder::new(&config).search("  rock 'n' roll  ", "/it's");
        assert_eq!(
            query.text,
            "SELECT html FROM render_search(term := 'rock ''n'' roll', base_path := '/it''s')"
        );
    }

    #[test]
    fn test_search_term_truncated_to_200_chars() {
        let config = config();
        let term = "a".repeat(250);
        let query = QueryBuilder::new(&config).search(&term, "");

        let expected = format!(
            "SELECT html FROM render_search(term := '{}', base_path := '')",
            "a".repeat(200)
        );
        assert_eq!(query.text, expected);
    }

    #[test]
    fn test_normalize_search_term_counts_characters() {
        let term = "é".repeat(201);
        assert_eq!(normalize_search_term(&term).chars().count(), 200);
        assert_eq!(normalize_search_term("\t hi \n"), "hi");
    }

    #[test]
    fn test_table_report_params() {
        let mut config = config();
        config.table_macro = Some("sales_report".to_string());

        let query = QueryBuilder::new(&config).table_report(
            &params(&[("year", "2024"), ("region", "north'east"), ("--", "x")]),
            "/reports",
        );
        assert_eq!(
            query.text,
            "SELECT * FROM sales_report(year := 2024, region := 'north''east', base_path := '/reports')"
        );
    }

    #[test]
    fn test_table_report_caller_base_path_wins() {
        let mut config = config();
        config.table_macro = Some("report".to_string());

        let query = QueryBuilder::new(&config)
            .table_report(&params(&[("base_path", "/custom")]), "/reports");
        assert_eq!(query.text, "SELECT * FROM report(base_path := '/custom')");

        let query =
            QueryBuilder::new(&config).table_report(&params(&[("base_path", "")]), "/reports");
        assert_eq!(query.text, "SELECT * FROM report(base_path := '/reports')");
    }

    #[test]
    fn test_table_report_first_value_wins() {
        let mut config = config();
        config.table_macro = Some("report".to_string());

        let query = QueryBuilder::new(&config)
            .table_report(&params(&[("n", "1"), ("n", "2")]), "/r");
        assert_eq!(query.text, "SELECT * FROM report(n := 1, base_path := '/r')");
    }

    #[test]
    fn test_probes() {
        let config = config();
        let builder = QueryBuilder::new(&config);

        assert_eq!(builder.table_probe().text, "SELECT 1 FROM pages LIMIT 1");

        let probe = builder.macro_probe("render_index");
        assert!(probe.text.contains("duckdb_functions()"));
        assert!(probe.text.contains("function_type = 'table_macro'"));
        assert_eq!(probe.params, vec!["render_index".to_string()]);
    }
}
