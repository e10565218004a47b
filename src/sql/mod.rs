//! # SQL construction
//!
//! Identifier sanitization, literal escaping, macro invocations and the
//! per-route query builder. Nothing else in the crate writes SQL text that
//! contains request input.

mod builder;
mod query;
mod sanitize;

pub use builder::{normalize_search_term, QueryBuilder, BASE_PATH_ARG, MAX_SEARCH_TERM_CHARS};
pub use query::{Literal, MacroInvocation, SqlQuery};
pub use sanitize::{escape_string_literal, quote_literal, sanitize_identifier};
