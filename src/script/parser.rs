//! Statement boundary parser for init scripts.
//!
//! This is not a SQL parser. It only tracks quotes and comments well
//! enough to find the `;` that end statements.
//!
//! Quotes inside literals are escaped by doubling (`'it''s'`), which falls
//! out of plain toggling: the first quote closes the literal and the second
//! reopens it. A backslash has no special meaning, so `'C:\'` is a complete
//! literal.

use serde::Serialize;

/// One executable statement, numbered from 1 in script order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptStatement {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
}

/// Split a script into statements.
///
/// Comments are removed: a line comment is replaced by the newline that
/// ends it turned into a space, a block comment by a single space. Empty
/// segments are skipped, and trailing text without a terminating `;` is
/// still returned as the last statement.
pub fn parse_statements(script: &str) -> Vec<ScriptStatement> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut prev: Option<char> = None;

    for ch in script.chars() {
        match state {
            State::Normal => match ch {
                '-' if prev == Some('-') => {
                    current.pop();
                    state = State::LineComment;
                }
                '*' if prev == Some('/') => {
                    current.pop();
                    state = State::BlockComment;
                    // the opener's `*` must not pair with a following `/`
                    prev = None;
                    continue;
                }
                '\'' => {
                    current.push(ch);
                    state = State::SingleQuote;
                }
                '"' => {
                    current.push(ch);
                    state = State::DoubleQuote;
                }
                ';' => push_statement(&mut statements, &mut current),
                _ => current.push(ch),
            },
            State::SingleQuote => {
                current.push(ch);
                if ch == '\'' {
                    state = State::Normal;
                }
            }
            State::DoubleQuote => {
                current.push(ch);
                if ch == '"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if ch == '\n' {
                    current.push(' ');
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if ch == '/' && prev == Some('*') {
                    current.push(' ');
                    state = State::Normal;
                    prev = None;
                    continue;
                }
            }
        }
        prev = Some(ch);
    }

    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<ScriptStatement>, current: &mut String) {
    let text = current.trim();
    if !text.is_empty() {
        statements.push(ScriptStatement {
            index: statements.len() + 1,
            text: text.to_string(),
        });
    }
    current.clear();
}

/// Collapse whitespace runs and cap at `max_chars`, appending `...` when cut
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= max_chars {
        return normalized;
    }
    let mut truncated: String = normalized.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
