//! SQL text plus bindings, and table-macro invocations.

use std::fmt;

use super::sanitize::{quote_literal, sanitize_identifier};

/// Executable SQL text with positional bound parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlQuery {
    pub text: String,
    pub params: Vec<String>,
}

impl SqlQuery {
    /// SQL text with no bound parameters
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Append a positional parameter
    pub fn bind(mut self, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A literal passed as a named macro argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Emitted bare, never quoted
    Integer(i64),
    /// Emitted quoted, with single quotes doubled
    Text(String),
}

impl Literal {
    /// Integers that parse fully become numeric literals, everything else text
    pub fn infer(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) => Literal::Integer(n),
            Err(_) => Literal::Text(raw.to_string()),
        }
    }

    fn to_sql(&self) -> String {
        match self {
            Literal::Integer(n) => n.to_string(),
            Literal::Text(s) => quote_literal(s),
        }
    }
}

/// A call to a store-side table macro with ordered named arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroInvocation {
    pub macro_name: String,
    pub named_args: Vec<(String, Literal)>,
}

impl MacroInvocation {
    pub fn new(macro_name: impl Into<String>) -> Self {
        Self {
            macro_name: macro_name.into(),
            named_args: Vec::new(),
        }
    }

    /// Add a named argument. Names that sanitize to nothing are dropped.
    pub fn arg(mut self, name: &str, value: Literal) -> Self {
        self.push_arg(name, value);
        self
    }

    pub fn push_arg(&mut self, name: &str, value: Literal) {
        let name = sanitize_identifier(name);
        if !name.is_empty() {
            self.named_args.push((name, value));
        }
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.named_args.iter().any(|(n, _)| n == name)
    }

    /// `SELECT <projection> FROM macro(a := 1, b := 'x')`
    ///
    /// The projection is operator-controlled: either `*` or a sanitized
    /// column name.
    pub fn select(&self, projection: &str) -> SqlQuery {
        let args = self
            .named_args
            .iter()
            .map(|(name, value)| format!("{} := {}", name, value.to_sql()))
            .collect::<Vec<_>>()
            .join(", ");

        SqlQuery::new(format!(
            "SELECT {} FROM {}({})",
            projection,
            sanitize_identifier(&self.macro_name),
            args
        ))
    }
}
